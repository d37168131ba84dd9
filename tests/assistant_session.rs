//! End-to-end scenarios for the assistant session against in-memory adapters.

use note_assistant::adapters::ai::{MockAiAdapter, MockReply};
use note_assistant::adapters::document::MemoryDocument;
use note_assistant::adapters::notify::RecordingNotifier;
use note_assistant::domain::{markers, AssistantContext, DomainError, NoticeLevel, Role};
use note_assistant::ports::DocumentPort;
use note_assistant::usecases::AssistantSession;
use std::sync::Arc;

struct Harness {
    session: Arc<AssistantSession>,
    ai: Arc<MockAiAdapter>,
    document: Arc<MemoryDocument>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(ai: MockAiAdapter, document: &str) -> Harness {
    let ai = Arc::new(ai);
    let document = Arc::new(MemoryDocument::new(document));
    let notifier = Arc::new(RecordingNotifier::new());
    let session = Arc::new(AssistantSession::new(
        ai.clone(),
        document.clone(),
        notifier.clone(),
    ));
    Harness {
        session,
        ai,
        document,
        notifier,
    }
}

#[tokio::test]
async fn send_message_streams_into_assistant_turn() {
    let h = harness(MockAiAdapter::with_chunks(["Hello ", "world"]), "");

    let reply = h.session.send_message("write intro").await.unwrap();

    let history = h.session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].text, "write intro");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].text, "Hello world");
    assert_eq!(reply.text, "Hello world");
    assert!(!h.session.is_pending());
}

#[tokio::test]
async fn blank_request_is_rejected_without_state_change() {
    let h = harness(MockAiAdapter::new(), "");

    for request in ["", "   ", "\n\t"] {
        let err = h.session.send_message(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
    assert!(h.session.is_empty());
    assert!(h.ai.prompts().is_empty());
}

#[tokio::test]
async fn generation_failure_lands_in_transcript() {
    let h = harness(MockAiAdapter::failing("invalid API key"), "");

    let reply = h.session.send_message("write intro").await.unwrap();

    assert_eq!(reply.role, Role::Assistant);
    assert!(reply.text.starts_with("**Error:**"));
    assert!(reply.text.contains("invalid API key"));
    assert_eq!(h.session.len(), 2);
    assert!(!h.session.is_pending());
    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Failure);
}

#[tokio::test]
async fn mid_stream_failure_lands_in_transcript() {
    let h = harness(
        MockAiAdapter::with_reply(MockReply::FailAfter(
            vec!["partial".into()],
            "connection reset".into(),
        )),
        "",
    );

    let reply = h.session.send_message("go").await.unwrap();
    assert!(reply.text.starts_with("**Error:**"));
    assert!(reply.text.contains("connection reset"));
}

#[tokio::test]
async fn prompt_carries_context_document_and_request() {
    let h = harness(MockAiAdapter::with_chunks(["ok"]), "Existing text.");
    h.session.set_context(AssistantContext {
        document_type: Some("Essay".into()),
        key_points: Some("- concise".into()),
        ..Default::default()
    });

    h.session.send_message("expand intro").await.unwrap();

    let prompts = h.ai.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.starts_with("Document Type: Essay\n## Key Points\n- concise\n\n"));
    assert!(prompt.contains("Current document content:\nExisting text.\n\n"));
    assert!(prompt.contains("User request: expand intro\n\n"));
    assert!(prompt.ends_with("existing content."));
    assert!(!prompt.contains("Tone:"));
}

#[tokio::test]
async fn build_prompt_is_deterministic() {
    let h = harness(MockAiAdapter::new(), "Doc");
    h.session.set_context(AssistantContext {
        tone: Some("Technical".into()),
        ..Default::default()
    });

    let first = h.session.build_prompt("r").await.unwrap();
    let second = h.session.build_prompt("r").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn regenerate_replaces_turn_in_place() {
    let ai = MockAiAdapter::new();
    ai.push_reply(MockReply::chunks(["y"]));
    ai.push_reply(MockReply::chunks(["z"]));
    let h = harness(ai, "");
    h.session.send_message("x").await.unwrap();
    let before = h.session.turn(1).unwrap();

    let turn = h.session.regenerate(1).await.unwrap();

    assert_eq!(turn.text, "z");
    assert_eq!(h.session.len(), 2);
    assert_eq!(h.session.turn(0).unwrap().text, "x");
    assert_eq!(h.session.turn(0).unwrap().role, Role::User);
    let after = h.session.turn(1).unwrap();
    assert_eq!(after.role, Role::Assistant);
    assert_eq!(after.text, "z");
    assert!(after.created_at >= before.created_at);
    // Regeneration reuses the preceding user request.
    assert!(h.ai.prompts()[1].contains("User request: x\n"));
    assert_eq!(
        h.notifier.messages().last().unwrap(),
        "Response regenerated"
    );
}

#[tokio::test]
async fn regenerate_uses_nearest_preceding_user_turn() {
    let ai = MockAiAdapter::with_chunks(["reply"]);
    let h = harness(ai, "");
    h.session.send_message("first").await.unwrap();
    h.session.send_message("second").await.unwrap();

    h.session.regenerate(1).await.unwrap();
    h.session.regenerate(3).await.unwrap();

    let prompts = h.ai.prompts();
    assert!(prompts[2].contains("User request: first\n"));
    assert!(prompts[3].contains("User request: second\n"));
}

#[tokio::test]
async fn delete_then_regenerate_is_not_found() {
    let h = harness(MockAiAdapter::new(), "");
    h.session.send_message("x").await.unwrap();
    h.session.delete_turn(1).unwrap();
    assert_eq!(h.session.len(), 1);

    h.session.delete_turn(0).unwrap();
    assert!(h.session.is_empty());

    assert!(matches!(
        h.session.regenerate(0).await,
        Err(DomainError::NotFound(_))
    ));
    assert_eq!(
        h.session.delete_turn(0),
        Err(DomainError::Index { index: 0, len: 0 })
    );
}

#[tokio::test]
async fn regenerate_without_preceding_user_turn_is_not_found() {
    let h = harness(MockAiAdapter::with_chunks(["a"]), "");
    h.session.send_message("x").await.unwrap();
    h.session.delete_turn(0).unwrap();

    assert!(matches!(
        h.session.regenerate(0).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn merge_append_wraps_with_marker() {
    let h = harness(MockAiAdapter::with_chunks(["New para"]), "Old.");
    h.session.send_message("more").await.unwrap();

    h.session.merge_append(1).await.unwrap();

    let content = h.document.get().await.unwrap();
    assert!(content.starts_with("Old.\n<!-- AI-GENERATED-START: "));
    assert!(content.ends_with(" -->\nNew para\n<!-- AI-GENERATED-END -->\n"));
    assert!(markers::has_markers(&content));

    let sections = markers::extract_sections(&content);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].content, "New para");
    assert_eq!(
        content,
        format!(
            "Old.{}",
            markers::wrap_at("New para", sections[0].parsed_timestamp().unwrap())
        )
    );
    assert_eq!(
        h.notifier.messages().last().unwrap(),
        "Content appended to note with AI marker"
    );
}

#[tokio::test]
async fn merge_replace_overwrites_without_marker() {
    let h = harness(MockAiAdapter::with_chunks(["Fresh"]), "Old.");
    h.session.send_message("rewrite").await.unwrap();

    h.session.merge_replace(1).await.unwrap();

    let content = h.document.get().await.unwrap();
    assert_eq!(content, "Fresh");
    assert!(!markers::has_markers(&content));
}

#[tokio::test]
async fn merge_rejects_user_turn_and_bad_index() {
    let h = harness(MockAiAdapter::new(), "Old.");
    h.session.send_message("x").await.unwrap();

    assert_eq!(
        h.session.merge_append(0).await,
        Err(DomainError::Role {
            index: 0,
            expected: Role::Assistant
        })
    );
    assert_eq!(
        h.session.merge_replace(9).await,
        Err(DomainError::Index { index: 9, len: 2 })
    );
    assert_eq!(h.document.get().await.unwrap(), "Old.");
}

#[tokio::test]
async fn second_send_while_pending_is_busy() {
    let h = harness(
        MockAiAdapter::with_chunks(["slow ", "reply"]).with_delay(50),
        "",
    );

    let session = Arc::clone(&h.session);
    let first = tokio::spawn(async move { session.send_message("first").await });

    while !h.session.is_pending() {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        h.session.send_message("second").await,
        Err(DomainError::Busy)
    );
    assert!(matches!(h.session.regenerate(1).await, Err(DomainError::Busy)));

    first.await.unwrap().unwrap();
    assert!(!h.session.is_pending());
    assert_eq!(h.session.len(), 2);
}

#[tokio::test]
async fn dropped_generation_releases_pending() {
    let h = harness(MockAiAdapter::with_chunks(["a", "b"]).with_delay(200), "");

    let session = Arc::clone(&h.session);
    let task = tokio::spawn(async move { session.send_message("x").await });
    while !h.session.is_pending() {
        tokio::task::yield_now().await;
    }
    task.abort();
    let _ = task.await;

    assert!(!h.session.is_pending());
    // The user turn stays; no assistant turn was appended.
    assert_eq!(h.session.len(), 1);
    h.session.send_message("again").await.unwrap();
}

#[tokio::test]
async fn regenerate_result_discarded_when_turn_deleted_meanwhile() {
    let ai = MockAiAdapter::new();
    ai.push_reply(MockReply::chunks(["y"]));
    let h = harness(ai.with_delay(50), "");
    h.session.send_message("x").await.unwrap();
    h.ai.push_reply(MockReply::chunks(["z"]));

    let session = Arc::clone(&h.session);
    let regen = tokio::spawn(async move { session.regenerate(1).await });
    while !h.session.is_pending() {
        tokio::task::yield_now().await;
    }
    h.session.delete_turn(1).unwrap();

    assert!(matches!(
        regen.await.unwrap(),
        Err(DomainError::NotFound(_))
    ));
    assert_eq!(h.session.len(), 1);
    assert_eq!(h.session.turn(0).unwrap().text, "x");
}
