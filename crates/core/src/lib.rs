//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response descriptors with single-consumption bodies
//! - The classifier rule table and strategy selector
//! - Generation-scoped cache storage (SQLite and in-memory backends)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod request;
pub mod strategy;

pub use cache::{CacheDb, CacheHandle, CacheStorage, CacheStore, GenerationName, MemoryStore, RequestKey};
pub use classify::{Classifier, RequestClass};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{Request, Response, StoredResponse};
pub use strategy::{ShellPolicy, Strategy, StrategySelector};
