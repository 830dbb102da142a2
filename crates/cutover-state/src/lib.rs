//! # Cutover State - Durable deployment state
//!
//! Persists one [`DeploymentState`](cutover_types::DeploymentState) record
//! per logical service.
//!
//! ## Guarantees
//!
//! - **Atomic save**: a reader never observes a partially written record.
//!   The file backend writes a temp file, syncs it and renames it over the
//!   live document.
//! - **Validated load**: documents that break the aggregate invariants are
//!   reported as [`StateError::Corrupt`] instead of being handed to callers.
//! - **Exclusivity hook**: [`StateStore::try_lock`] lets the engine extend its
//!   in-process lock across processes (advisory file lock for the file
//!   backend).
//!
//! The store does no locking of its own around `load`/`save`; writers are
//! serialized by the cutover engine.

#![deny(unsafe_code)]

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use error::{StateError, StateResult};
pub use file::JsonFileStateStore;
pub use memory::InMemoryStateStore;
pub use store::{provision, StateStore, StoreLock};
