//! Built-in transactional backend implementations
//!
//! Contains MockBackend (in-memory) and FileBackend (JSON-lines on disk).

mod file;
mod mock;

pub use self::file::FileBackend;
pub use self::mock::MockBackend;
