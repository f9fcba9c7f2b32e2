//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery Model
//! - Records are routed by destination key and committed in bounded batches
//! - At-least-once per in-memory session; retry replays uncommitted writes

mod blueprint;
mod error;
mod record;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use record::Record;
pub use sink::*;
