//! Wiring & DI. Entry point: bootstrap adapters, inject into the session, run UI.
//! No business logic here.

use dotenv::dotenv;
use note_assistant::adapters::ai::{GeminiAdapter, MockAiAdapter, OpenAiAdapter};
use note_assistant::adapters::document::FileDocument;
use note_assistant::adapters::persistence::{JsonSessionStore, NoteDocument, SqliteNoteRepo};
use note_assistant::adapters::ui::tui::{TuiInputPort, TuiNotifier};
use note_assistant::ports::{
    DocumentPort, GenerationPort, InputPort, NoteRepoPort, NotifierPort, SessionStorePort,
};
use note_assistant::shared::config::{AiProvider, AppConfig};
use note_assistant::usecases::AssistantSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    // Logs go to stderr so they don't interleave with prompts on stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    note_assistant::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config load failed; using defaults");
        AppConfig::default()
    });

    let data_dir = cfg.data_dir_or_default();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("create data dir: {}", e))?;
    let data_dir_abs = data_dir.canonicalize().unwrap_or_else(|_| data_dir.clone());
    info!(path = %data_dir_abs.display(), "data directory");

    // --- Generator ---
    let generator = create_generator(&cfg)?;

    // --- Document: markdown file if configured, otherwise a stored note ---
    let document: Arc<dyn DocumentPort> = match cfg.document_path.as_deref() {
        Some(path) => {
            let file = FileDocument::new(path);
            info!(path = %file.path().display(), "editing markdown file");
            Arc::new(file)
        }
        None => open_note_document(&data_dir, cfg.note_id).await?,
    };

    // --- Session ---
    let notifier: Arc<dyn NotifierPort> = Arc::new(TuiNotifier);
    let session = Arc::new(AssistantSession::new(
        generator,
        Arc::clone(&document),
        notifier,
    ));

    let store: Arc<dyn SessionStorePort> =
        Arc::new(JsonSessionStore::new(cfg.session_path_or_default()));
    if let Some(snapshot) = store.load().await.map_err(|e| anyhow::anyhow!("{}", e))? {
        session
            .restore(snapshot)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        Arc::clone(&session),
        document,
        store,
        data_dir.join("exports"),
    ));

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

/// Pick the generation backend from config. Falls back to the mock when no key is set.
fn create_generator(cfg: &AppConfig) -> anyhow::Result<Arc<dyn GenerationPort>> {
    let provider = cfg.ai_provider().map_err(|e| anyhow::anyhow!("{}", e))?;
    let key = cfg.ai_api_key();

    let generator: Arc<dyn GenerationPort> = match (provider, key) {
        (AiProvider::Mock, _) => {
            warn!("NOTE_ASSIST_AI_API_KEY not set, using mock AI adapter");
            Arc::new(MockAiAdapter::new().with_delay(cfg.mock_delay_ms_or_default()))
        }
        (AiProvider::OpenAi, Some(key)) => {
            let model = cfg.ai_model_or_default(provider);
            let url = cfg.ai_api_url_or_default(provider);
            info!(model = %model, url = %url, "generation via OpenAI-compatible API");
            Arc::new(OpenAiAdapter::new(url, key, model))
        }
        (AiProvider::Gemini, Some(key)) => {
            let model = cfg.ai_model_or_default(provider);
            let url = cfg.ai_api_url_or_default(provider);
            info!(model = %model, url = %url, "generation via Gemini");
            Arc::new(GeminiAdapter::new(url, key, model))
        }
        (_, None) => {
            anyhow::bail!("Set NOTE_ASSIST_AI_API_KEY (env or .env) for the {:?} provider", provider)
        }
    };
    Ok(generator)
}

/// Open the configured note, or create an empty one on first run.
async fn open_note_document(
    data_dir: &Path,
    note_id: Option<i64>,
) -> anyhow::Result<Arc<dyn DocumentPort>> {
    let sqlite = SqliteNoteRepo::connect(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?;
    let db_path = sqlite.db_path().to_path_buf();
    let repo: Arc<dyn NoteRepoPort> = Arc::new(sqlite);

    let note = match note_id {
        Some(id) => repo
            .get_note(id)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?
            .ok_or_else(|| anyhow::anyhow!("note {} not found", id))?,
        None => match repo
            .list_notes()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?
            .into_iter()
            .next()
        {
            Some(latest) => latest,
            None => repo
                .create_note("Untitled", "")
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?,
        },
    };
    info!(
        note_id = note.id,
        title = %note.title,
        db = %db_path.display(),
        "editing stored note"
    );

    Ok(Arc::new(NoteDocument::new(repo, note.id)))
}
