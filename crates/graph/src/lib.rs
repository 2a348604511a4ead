//! Collaborator interfaces consumed by the analytics engine.
//!
//! This crate provides:
//! - async traits for the asset graph, attribute, time-series and ticket stores
//! - `MemoryStore`, an in-process implementation of all four
//! - YAML fixture loading for `MemoryStore`

pub mod error;
pub mod fixture;
pub mod store;
pub mod traits;

pub use error::StoreError;
pub use fixture::StoreFixture;
pub use store::MemoryStore;
pub use traits::*;
