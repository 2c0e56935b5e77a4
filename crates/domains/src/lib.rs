//! civic-board/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for civic-board:
//! users report problems, others propose solutions, everyone votes and comments.

pub mod errors;
pub mod models;
pub mod policy;
pub mod ports;
pub mod votes;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;
