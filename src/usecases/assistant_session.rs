//! Assistant session. Owns context + chat history and drives generation.
//!
//! Coordinates between the generator (LLM), the document store (note content)
//! and the notifier (UI toasts). All history access goes through this type.
//! State sits behind one mutex that is never held across an `.await`; the
//! `pending` flag is the generation lock.

use crate::adapters::ai::turns_to_csv;
use crate::domain::{
    markers, prompt, AssistantContext, ChatTurn, DomainError, Notice, Role, SessionSnapshot,
};
use crate::ports::{DocumentPort, GenerationPort, NotifierPort};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SessionState {
    context: AssistantContext,
    history: Vec<ChatTurn>,
    pending: bool,
    editing: Option<EditState>,
    next_seq: u64,
}

#[derive(Debug)]
struct EditState {
    seq: u64,
    draft: String,
}

impl SessionState {
    fn push(&mut self, role: Role, text: impl Into<String>) -> ChatTurn {
        let turn = ChatTurn::new(role, text, self.next_seq);
        self.next_seq += 1;
        self.history.push(turn.clone());
        turn
    }

    fn position(&self, seq: u64) -> Option<usize> {
        self.history.iter().position(|t| t.seq == seq)
    }

    fn turn_at(&self, index: usize) -> Result<&ChatTurn, DomainError> {
        self.history.get(index).ok_or(DomainError::Index {
            index,
            len: self.history.len(),
        })
    }

    fn assistant_at(&self, index: usize) -> Result<&ChatTurn, DomainError> {
        let turn = self.turn_at(index)?;
        if !turn.is_assistant() {
            return Err(DomainError::Role {
                index,
                expected: Role::Assistant,
            });
        }
        Ok(turn)
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `pending` on drop, so a cancelled generation future releases the session.
struct PendingGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).pending = false;
    }
}

/// One editing interaction: context, linear chat history, and merges into the document.
pub struct AssistantSession {
    generator: Arc<dyn GenerationPort>,
    document: Arc<dyn DocumentPort>,
    notifier: Arc<dyn NotifierPort>,
    state: Mutex<SessionState>,
}

impl AssistantSession {
    /// Create a session with empty context and history.
    ///
    /// # Arguments
    /// * `generator` - Text-generation backend (OpenAI, Gemini, Mock)
    /// * `document` - Store for the note being edited
    /// * `notifier` - Sink for advisory UI events
    pub fn new(
        generator: Arc<dyn GenerationPort>,
        document: Arc<dyn DocumentPort>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            generator,
            document,
            notifier,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn context(&self) -> AssistantContext {
        lock(&self.state).context.clone()
    }

    /// Replace the whole context. Takes effect from the next prompt.
    pub fn set_context(&self, context: AssistantContext) {
        debug!(?context, "context replaced");
        lock(&self.state).context = context;
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        lock(&self.state).history.clone()
    }

    pub fn turn(&self, index: usize) -> Result<ChatTurn, DomainError> {
        lock(&self.state).turn_at(index).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).history.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).history.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending
    }

    /// Current edit target as `(index, draft)`, if an edit is in progress.
    pub fn editing(&self) -> Option<(usize, String)> {
        let state = lock(&self.state);
        let edit = state.editing.as_ref()?;
        state.position(edit.seq).map(|i| (i, edit.draft.clone()))
    }

    /// Prompt for `request` against the current context and document content.
    pub async fn build_prompt(&self, request: &str) -> Result<String, DomainError> {
        let context = self.context();
        let document = self.document.get().await?;
        Ok(prompt::compose(&context, &document, request))
    }

    /// Submit a request and append the generated reply.
    ///
    /// The user turn is visible in history before the reply arrives. Generator
    /// failures do not surface as errors: they become an `**Error:**` assistant
    /// turn so the conversation keeps its context.
    ///
    /// # Errors
    /// * `Validation` if `request` is blank (history unchanged)
    /// * `Busy` if a generation is already in flight
    pub async fn send_message(&self, request: &str) -> Result<ChatTurn, DomainError> {
        if request.trim().is_empty() {
            return Err(DomainError::Validation("Please enter a message".into()));
        }

        {
            let mut state = lock(&self.state);
            if state.pending {
                return Err(DomainError::Busy);
            }
            state.pending = true;
            state.push(Role::User, request);
        }
        let _pending = PendingGuard { state: &self.state };

        info!(request_len = request.len(), "sending message to generator");

        let result = self.generate_for(request).await;
        let failed = result.is_err();
        let turn = {
            let mut state = lock(&self.state);
            match result {
                Ok(text) => state.push(Role::Assistant, text),
                Err(e) => {
                    warn!(error = %e, "generation failed; recording error in transcript");
                    state.push(Role::Assistant, format!("**Error:** {}", e))
                }
            }
        };

        if failed {
            self.notifier.notify(Notice::failure(
                "Failed to generate content. Please check your API key.",
            ));
        } else {
            info!(reply_len = turn.text.len(), "assistant reply appended");
        }
        Ok(turn)
    }

    /// Regenerate the assistant turn at `index` from the nearest preceding user turn.
    ///
    /// The turn keeps its position and role; text and timestamp are replaced.
    /// On generator failure history is left untouched.
    ///
    /// # Errors
    /// * `Busy` if a generation is already in flight
    /// * `NotFound` if there is no turn at `index`, no user turn before it,
    ///   or the turn was deleted while regenerating
    /// * `Role` if the turn at `index` is a user turn
    /// * `Generation` if the generator failed
    pub async fn regenerate(&self, index: usize) -> Result<ChatTurn, DomainError> {
        let (target_seq, request) = {
            let mut state = lock(&self.state);
            if state.pending {
                return Err(DomainError::Busy);
            }
            let turn = state
                .history
                .get(index)
                .ok_or_else(|| DomainError::NotFound(format!("no turn at index {}", index)))?;
            if !turn.is_assistant() {
                return Err(DomainError::Role {
                    index,
                    expected: Role::Assistant,
                });
            }
            let target_seq = turn.seq;
            let request = state.history[..=index]
                .iter()
                .rev()
                .find(|t| t.role == Role::User)
                .map(|t| t.text.clone())
                .ok_or_else(|| {
                    DomainError::NotFound(format!("no user turn at or before index {}", index))
                })?;
            state.pending = true;
            (target_seq, request)
        };
        let _pending = PendingGuard { state: &self.state };

        info!(index, "regenerating response");

        let text = match self.generate_for(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(index, error = %e, "regeneration failed; history unchanged");
                self.notifier
                    .notify(Notice::failure("Failed to regenerate content"));
                return Err(e);
            }
        };

        let updated = {
            let mut state = lock(&self.state);
            match state.position(target_seq) {
                Some(pos) => {
                    let turn = &mut state.history[pos];
                    turn.text = text;
                    turn.created_at = Utc::now();
                    Some(turn.clone())
                }
                None => None,
            }
        };

        match updated {
            Some(turn) => {
                self.notifier.notify(Notice::success("Response regenerated"));
                Ok(turn)
            }
            None => {
                warn!(index, "turn deleted during regeneration; result discarded");
                Err(DomainError::NotFound(
                    "turn was deleted while regenerating".into(),
                ))
            }
        }
    }

    /// Enter edit mode for the assistant turn at `index`. Returns the initial draft.
    ///
    /// Only one turn may be edited at a time; a second `edit_start` is rejected.
    pub fn edit_start(&self, index: usize) -> Result<String, DomainError> {
        let mut state = lock(&self.state);
        if let Some(edit) = &state.editing {
            let current = state
                .position(edit.seq)
                .map(|i| i.to_string())
                .unwrap_or_else(|| "?".into());
            return Err(DomainError::Conflict(format!(
                "turn {} is already being edited",
                current
            )));
        }
        let turn = state.assistant_at(index)?;
        let edit = EditState {
            seq: turn.seq,
            draft: turn.text.clone(),
        };
        let draft = edit.draft.clone();
        state.editing = Some(edit);
        debug!(index, "edit started");
        Ok(draft)
    }

    /// Replace the working draft without committing it.
    pub fn edit_update(&self, draft: impl Into<String>) -> Result<(), DomainError> {
        let mut state = lock(&self.state);
        let edit = state
            .editing
            .as_mut()
            .ok_or_else(|| DomainError::Conflict("no edit in progress".into()))?;
        edit.draft = draft.into();
        Ok(())
    }

    /// Overwrite the edited turn's text and leave edit mode.
    pub fn edit_commit(&self, new_text: impl Into<String>) -> Result<ChatTurn, DomainError> {
        let turn = {
            let mut state = lock(&self.state);
            let edit = state
                .editing
                .take()
                .ok_or_else(|| DomainError::Conflict("no edit in progress".into()))?;
            let pos = state
                .position(edit.seq)
                .ok_or_else(|| DomainError::NotFound("edited turn no longer exists".into()))?;
            let turn = &mut state.history[pos];
            turn.text = new_text.into();
            turn.clone()
        };
        self.notifier.notify(Notice::success("Response updated"));
        Ok(turn)
    }

    /// Leave edit mode, discarding the draft. No-op when not editing.
    pub fn edit_cancel(&self) {
        if lock(&self.state).editing.take().is_some() {
            debug!("edit cancelled");
        }
    }

    /// Remove the turn at `index`. Later turns shift down by one.
    /// An edit targeting the removed turn is cancelled.
    pub fn delete_turn(&self, index: usize) -> Result<ChatTurn, DomainError> {
        let removed = {
            let mut state = lock(&self.state);
            state.turn_at(index)?;
            let removed = state.history.remove(index);
            if state.editing.as_ref().is_some_and(|e| e.seq == removed.seq) {
                state.editing = None;
            }
            removed
        };
        info!(index, role = %removed.role, "turn deleted");
        self.notifier.notify(Notice::success("Message deleted"));
        Ok(removed)
    }

    /// Append the assistant turn at `index` to the document, wrapped in AI markers.
    pub async fn merge_append(&self, index: usize) -> Result<(), DomainError> {
        let text = lock(&self.state).assistant_at(index)?.text.clone();
        let current = self.document.get().await?;
        let merged = format!("{}{}", current, markers::wrap(&text));
        self.document.set(&merged).await?;
        info!(index, appended = text.len(), "content appended with AI marker");
        self.notifier
            .notify(Notice::success("Content appended to note with AI marker"));
        Ok(())
    }

    /// Overwrite the document with the raw text of the assistant turn at `index`.
    pub async fn merge_replace(&self, index: usize) -> Result<(), DomainError> {
        let text = lock(&self.state).assistant_at(index)?.text.clone();
        self.document.set(&text).await?;
        info!(index, len = text.len(), "note content replaced");
        self.notifier.notify(Notice::success("Note content replaced"));
        Ok(())
    }

    /// Drop all turns and any edit in progress.
    pub fn clear_history(&self) -> Result<(), DomainError> {
        let mut state = lock(&self.state);
        if state.pending {
            return Err(DomainError::Busy);
        }
        state.history.clear();
        state.editing = None;
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = lock(&self.state);
        SessionSnapshot {
            context: state.context.clone(),
            history: state.history.clone(),
        }
    }

    /// Replace context and history with a saved snapshot.
    pub fn restore(&self, snapshot: SessionSnapshot) -> Result<(), DomainError> {
        let mut state = lock(&self.state);
        if state.pending {
            return Err(DomainError::Busy);
        }
        state.context = snapshot.context;
        state.editing = None;
        state.history.clear();
        for mut turn in snapshot.history {
            turn.seq = state.next_seq;
            state.next_seq += 1;
            state.history.push(turn);
        }
        info!(turns = state.history.len(), "session restored");
        Ok(())
    }

    /// History as `Role;Date;Message` CSV.
    pub fn transcript_csv(&self) -> Result<String, DomainError> {
        let history = self.history();
        turns_to_csv(&history)
            .map_err(|e| DomainError::Repo(format!("Failed to generate CSV: {}", e)))
    }

    /// Build the prompt, run the generator and concatenate the streamed chunks.
    async fn generate_for(&self, request: &str) -> Result<String, DomainError> {
        let prompt = self.build_prompt(request).await?;
        let mut rx = self.generator.generate(&prompt).await?;

        let mut text = String::new();
        let mut chunks = 0usize;
        while let Some(chunk) = rx.recv().await {
            text.push_str(&chunk?);
            chunks += 1;
        }
        debug!(chunks, len = text.len(), "generation stream finished");
        Ok(text)
    }
}
