//! Infrastructure adapters. Implement outbound ports.
//!
//! LLM backends, document stores, persistence, notifications, terminal UI.
//! Map errors to DomainError.

pub mod ai;
pub mod document;
pub mod notify;
pub mod persistence;
pub mod ui;
