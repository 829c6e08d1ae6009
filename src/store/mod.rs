//! Durable job persistence on top of Fjall (embedded LSM key-value store).
//!
//! The store holds one record per job in a `jobs` partition, JSON-encoded.
//! It carries no business logic: the registry decides what to write and when,
//! the store only guarantees that written records survive a process restart.

pub mod error;
pub mod keys;
pub mod store;

pub use error::{Result, StoreError};
pub use store::JobStore;
