//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Main menu loop over the assistant session: chat, merge into the note,
//! edit/regenerate/delete turns, context editing and marker tools.

use crate::adapters::ui::progress;
use crate::domain::{markers, AssistantContext, ChatTurn, DomainError, Notice, NoticeLevel, Role};
use crate::ports::{DocumentPort, InputPort, NotifierPort, SessionStorePort};
use crate::usecases::AssistantSession;
use async_trait::async_trait;
use chrono::Utc;
use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use inquire::ui::{Color as PromptColor, RenderConfig, Styled};
use inquire::{Confirm, InquireError, Select, Text};
use std::fmt;
use std::io::{Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies the neon prompt theme to all subsequent inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(PromptColor::LightCyan))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(PromptColor::LightMagenta));
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Send,
    Append,
    Replace,
    Edit,
    Regenerate,
    Delete,
    Clear,
    History,
    Context,
    Document,
    Stats,
    Preview,
    Validate,
    StripMarkers,
    Export,
    Save,
    Quit,
}

const MENU: &[Action] = &[
    Action::Send,
    Action::Append,
    Action::Replace,
    Action::Edit,
    Action::Regenerate,
    Action::Delete,
    Action::Clear,
    Action::History,
    Action::Context,
    Action::Document,
    Action::Stats,
    Action::Preview,
    Action::Validate,
    Action::StripMarkers,
    Action::Export,
    Action::Save,
    Action::Quit,
];

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Send => "Send request",
            Action::Append => "Append response to note (AI marker)",
            Action::Replace => "Replace note with response",
            Action::Edit => "Edit response",
            Action::Regenerate => "Regenerate response",
            Action::Delete => "Delete message",
            Action::Clear => "Clear chat history",
            Action::History => "Show chat history",
            Action::Context => "Edit document context",
            Action::Document => "Show note",
            Action::Stats => "AI content statistics",
            Action::Preview => "Preview with AI sections highlighted",
            Action::Validate => "Check AI markers",
            Action::StripMarkers => "Remove AI markers from note",
            Action::Export => "Export transcript (CSV)",
            Action::Save => "Save session",
            Action::Quit => "Save and quit",
        };
        f.write_str(label)
    }
}

/// One selectable chat turn.
struct TurnOption {
    index: usize,
    label: String,
}

impl fmt::Display for TurnOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 60;
    let flat = text.trim().replace('\n', " ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        format!("{}...", flat.chars().take(MAX).collect::<String>())
    }
}

/// `Ok(None)` when the user backs out of a prompt (Esc / Ctrl-C).
fn answer<T>(result: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Ui(e.to_string())),
    }
}

/// The session already notified a failed generation; only other errors propagate.
fn regenerated(result: Result<ChatTurn, DomainError>) -> Result<Option<ChatTurn>, DomainError> {
    match result {
        Ok(turn) => Ok(Some(turn)),
        Err(DomainError::Generation(e)) => {
            debug!(error = %e, "regenerate failed; already notified");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn print_colored(color: Color, text: &str) {
    let mut out = stdout();
    let _ = out.execute(SetForegroundColor(color));
    let _ = out.execute(Print(text));
    let _ = out.execute(Print("\r\n"));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

fn print_turn(index: usize, turn: &ChatTurn) {
    let (color, who) = match turn.role {
        Role::User => (Color::Cyan, "You"),
        Role::Assistant => (Color::Magenta, "Assistant"),
    };
    print_colored(
        color,
        &format!("[{}] {} · {}", index, who, turn.created_at.format("%H:%M:%S")),
    );
    println!("{}\n", turn.text);
}

/// Prints notices as coloured status lines.
#[derive(Debug, Default)]
pub struct TuiNotifier;

impl NotifierPort for TuiNotifier {
    fn notify(&self, notice: Notice) {
        debug!(level = ?notice.level, notice = %notice.message, "notice");
        match notice.level {
            NoticeLevel::Success => print_colored(Color::Green, &format!("✔ {}", notice.message)),
            NoticeLevel::Failure => print_colored(Color::Red, &format!("✖ {}", notice.message)),
        }
    }
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    session: Arc<AssistantSession>,
    document: Arc<dyn DocumentPort>,
    store: Arc<dyn SessionStorePort>,
    export_dir: PathBuf,
}

impl TuiInputPort {
    pub fn new(
        session: Arc<AssistantSession>,
        document: Arc<dyn DocumentPort>,
        store: Arc<dyn SessionStorePort>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            session,
            document,
            store,
            export_dir,
        }
    }

    /// Dispatch one menu action. Returns `false` when the loop should stop.
    async fn handle(&self, action: Action) -> Result<bool, DomainError> {
        match action {
            Action::Send => self.send().await?,
            Action::Append => {
                if let Some(i) = self.pick_turn("Append which response?", true)? {
                    self.session.merge_append(i).await?;
                }
            }
            Action::Replace => {
                if let Some(i) = self.pick_turn("Replace note with which response?", true)? {
                    let confirmed = answer(
                        Confirm::new("Overwrite the whole note?")
                            .with_default(false)
                            .prompt(),
                    )?;
                    if confirmed == Some(true) {
                        self.session.merge_replace(i).await?;
                    }
                }
            }
            Action::Edit => self.edit().await?,
            Action::Regenerate => {
                if let Some(i) = self.pick_turn("Regenerate which response?", true)? {
                    let pb = progress::spinner("Regenerating...");
                    let result = self.session.regenerate(i).await;
                    pb.finish_and_clear();
                    if let Some(turn) = regenerated(result)? {
                        print_turn(i, &turn);
                    }
                }
            }
            Action::Delete => {
                if let Some(i) = self.pick_turn("Delete which message?", false)? {
                    self.session.delete_turn(i)?;
                }
            }
            Action::Clear => {
                let confirmed = answer(
                    Confirm::new("Drop the whole conversation?")
                        .with_default(false)
                        .prompt(),
                )?;
                if confirmed == Some(true) {
                    self.session.clear_history()?;
                    print_colored(Color::Green, "✔ Chat history cleared");
                }
            }
            Action::History => {
                let history = self.session.history();
                if history.is_empty() {
                    println!("Enter a request like \"write section 1\" or \"expand on introduction\"\n");
                }
                for (i, turn) in history.iter().enumerate() {
                    print_turn(i, turn);
                }
            }
            Action::Context => self.edit_context()?,
            Action::Document => println!("{}\n", self.document.get().await?),
            Action::Stats => {
                let s = markers::stats(&self.document.get().await?);
                println!(
                    "AI sections: {}\nTotal characters: {}\nAI characters: {}\nManual characters: {}\nAI share: {:.1}%\n",
                    s.total_sections,
                    s.total_characters,
                    s.ai_characters,
                    s.manual_characters,
                    s.ai_percentage
                );
            }
            Action::Preview => println!("{}\n", markers::annotate(&self.document.get().await?)),
            Action::Validate => match markers::validate(&self.document.get().await?) {
                Ok(()) => print_colored(Color::Green, "✔ AI markers are well formed"),
                Err(e) => print_colored(Color::Yellow, &format!("⚠ {}", e)),
            },
            Action::StripMarkers => {
                let confirmed = answer(
                    Confirm::new("Remove all AI markers (content is kept)?")
                        .with_default(false)
                        .prompt(),
                )?;
                if confirmed == Some(true) {
                    let content = self.document.get().await?;
                    self.document.set(&markers::strip_markers(&content)).await?;
                    print_colored(Color::Green, "✔ AI markers removed");
                }
            }
            Action::Export => self.export().await?,
            Action::Save => self.save().await?,
            Action::Quit => {
                self.save().await?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn send(&self) -> Result<(), DomainError> {
        let Some(request) = answer(
            Text::new("Request:")
                .with_placeholder("E.g., 'write section 3' or 'expand the introduction'")
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let pb = progress::spinner("Generating...");
        let result = self.session.send_message(&request).await;
        pb.finish_and_clear();
        let turn = result?;
        print_turn(self.session.len().saturating_sub(1), &turn);
        Ok(())
    }

    async fn edit(&self) -> Result<(), DomainError> {
        let Some(index) = self.pick_turn("Edit which response?", true)? else {
            return Ok(());
        };
        let draft = self.session.edit_start(index)?;
        let edited = answer(Text::new("Edit response:").with_initial_value(&draft).prompt())?;
        match edited {
            Some(text) => {
                self.session.edit_update(text.clone())?;
                self.session.edit_commit(text)?;
            }
            None => self.session.edit_cancel(),
        }
        Ok(())
    }

    fn edit_context(&self) -> Result<(), DomainError> {
        let current = self.session.context();
        let field = |label: &str, placeholder: &str, value: &Option<String>| {
            answer(
                Text::new(label)
                    .with_placeholder(placeholder)
                    .with_initial_value(value.as_deref().unwrap_or(""))
                    .prompt(),
            )
        };

        let Some(document_type) = field(
            "Document Type:",
            "e.g., Essay, Report, Article",
            &current.document_type,
        )?
        else {
            return Ok(());
        };
        let Some(tone) = field("Tone:", "e.g., Academic, Casual, Technical", &current.tone)? else {
            return Ok(());
        };
        let Some(audience) = field(
            "Target Audience:",
            "e.g., Researchers, Students, General Public",
            &current.audience,
        )?
        else {
            return Ok(());
        };
        let Some(table_of_contents) = field(
            "Table of Contents (use \\n for new lines):",
            "1. Introduction\\n2. Main Point A",
            &current.table_of_contents.as_ref().map(|s| s.replace('\n', "\\n")),
        )?
        else {
            return Ok(());
        };
        let Some(key_points) = field(
            "Key Consistency Points (use \\n for new lines):",
            "- Terminology to use\\n- Important themes",
            &current.key_points.as_ref().map(|s| s.replace('\n', "\\n")),
        )?
        else {
            return Ok(());
        };

        let opt = |s: String| Some(s).filter(|s| !s.trim().is_empty());
        self.session.set_context(AssistantContext {
            document_type: opt(document_type),
            tone: opt(tone),
            audience: opt(audience),
            table_of_contents: opt(table_of_contents.replace("\\n", "\n")),
            key_points: opt(key_points.replace("\\n", "\n")),
        });
        print_colored(Color::Green, "✔ Context updated");
        Ok(())
    }

    async fn export(&self) -> Result<(), DomainError> {
        let csv = self.session.transcript_csv()?;
        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|e| DomainError::Repo(format!("create export dir: {}", e)))?;
        let path = self
            .export_dir
            .join(format!("transcript_{}.csv", Utc::now().format("%Y%m%d_%H%M%S")));
        tokio::fs::write(&path, csv)
            .await
            .map_err(|e| DomainError::Repo(format!("write transcript: {}", e)))?;
        print_colored(Color::Green, &format!("✔ Transcript written to {}", path.display()));
        Ok(())
    }

    async fn save(&self) -> Result<(), DomainError> {
        self.store.save(&self.session.snapshot()).await
    }

    /// Let the user choose a turn. `assistant_only` hides user turns.
    fn pick_turn(&self, prompt: &str, assistant_only: bool) -> Result<Option<usize>, DomainError> {
        let options: Vec<TurnOption> = self
            .session
            .history()
            .iter()
            .enumerate()
            .filter(|(_, t)| !assistant_only || t.is_assistant())
            .map(|(index, t)| TurnOption {
                index,
                label: format!("[{}] {}: {}", index, t.role, preview(&t.text)),
            })
            .collect();
        if options.is_empty() {
            print_colored(Color::Yellow, "⚠ No matching messages yet");
            return Ok(None);
        }
        Ok(answer(Select::new(prompt, options).prompt())?.map(|o| o.index))
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let Some(action) = answer(Select::new("Document Assistant", MENU.to_vec()).prompt())?
            else {
                self.save().await?;
                return Ok(());
            };
            match self.handle(action).await {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(DomainError::Ui(e)) => return Err(DomainError::Ui(e)),
                Err(e) => {
                    warn!(error = %e, action = %action, "action failed");
                    print_colored(Color::Red, &format!("✖ {}", e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_and_flattens() {
        assert_eq!(preview("  a\nb  "), "a b");
        let long = "x".repeat(100);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(60)));
    }

    #[test]
    fn test_answer_maps_cancel_to_none() {
        let r: Result<String, InquireError> = Err(InquireError::OperationCanceled);
        assert_eq!(answer(r), Ok(None));
    }

    #[test]
    fn test_regenerate_failure_is_not_reported_twice() {
        let failed = Err(DomainError::Generation("timeout".into()));
        assert_eq!(regenerated(failed), Ok(None));

        let missing = Err(DomainError::NotFound("turn 3".into()));
        assert_eq!(
            regenerated(missing),
            Err(DomainError::NotFound("turn 3".into()))
        );
    }
}
