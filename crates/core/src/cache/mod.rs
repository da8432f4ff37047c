//! Generation-scoped cache store for intercepted responses.
//!
//! - Backend-agnostic [`CacheStorage`] trait
//! - SQLite backend (`CacheDb`) with WAL mode and automatic migrations
//! - In-memory backend (`MemoryStore`)
//! - SHA-256 request keys over method + URL

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::RequestKey;
pub use memory::MemoryStore;
pub use store::{CacheHandle, CacheStorage, CacheStore, GenerationName, GenerationSummary};
