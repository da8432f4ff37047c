//! Cache inspection and maintenance tools.

pub mod get;
pub mod list;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};
pub use purge::purge_impl;
