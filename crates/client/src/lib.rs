//! Worker runtime for swcache.
//!
//! This crate provides the network seam, generation lifecycle, install-time
//! population, and per-request interception that together make up a
//! [`ServiceWorker`].

pub mod generation;
pub mod intercept;
pub mod network;
pub mod populate;
pub mod worker;

#[cfg(test)]
mod testing;

pub use generation::GenerationManager;
pub use intercept::{FetchOutcome, FetchState, Interceptor, ResponseSource};
pub use network::{HttpNetwork, Network, NetworkConfig};
pub use populate::{InstallPopulator, InstallReport, SeedFailure};
pub use worker::{ActivationReport, Command, LifecycleHost, LifecycleState, MessageReply, ServiceWorker};
