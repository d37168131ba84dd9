//! Notification sinks. Implement NotifierPort.
//!
//! The terminal sink lives with the TUI (`adapters::ui::tui::TuiNotifier`).

use crate::domain::Notice;
use crate::ports::NotifierPort;
use std::sync::{Mutex, PoisonError};

/// Keeps every notice in memory. For tests and headless hosts.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Message texts only, in order.
    pub fn messages(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.message).collect()
    }
}

impl NotifierPort for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
