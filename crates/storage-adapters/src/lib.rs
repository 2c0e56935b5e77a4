//! # storage-adapters
//!
//! Persistence and media implementations of the `domains` ports.
//!
//! - [`memory::InMemoryStore`]: always available
//! - `postgres::PgContentStore`: feature `db-postgres`
//! - `media::LocalMediaStorage`: feature `media-local`
//! - `media::CloudinaryMediaStorage`: feature `media-cloudinary`

pub mod media;
pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::InMemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgContentStore;
