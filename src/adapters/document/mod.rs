//! Document stores. Implement DocumentPort.

pub mod file;
pub mod memory;

pub use file::FileDocument;
pub use memory::MemoryDocument;
