//! Application use cases. Orchestrate domain logic via ports.

pub mod assistant_session;

pub use assistant_session::AssistantSession;
