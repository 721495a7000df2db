//! Immutable, event-sourced entity/component store.
//!
//! This crate holds typed simulation state as persistent (copy-on-write)
//! data structures and records every mutation as an append-only event.
//! State transitions are pure `Database -> Database` functions: the old
//! database stays valid after every mutation, so history can be replayed,
//! branched, undone, or redone without ever mutating shared state in place.
//!
//! # Modules
//!
//! - [`pmap`] -- [`PersistentMap`], the structural-sharing ordered map
//!   underneath everything else.
//! - [`table`] -- [`PersistentTable`], one immutable column per component
//!   type.
//! - [`singleton`] -- [`SingletonSlot`], type-keyed entity-less values.
//! - [`event`] -- [`DatabaseEvent`], [`EventLog`], and logical timestamps.
//! - [`database`] -- [`Database`], the aggregate root tying tables,
//!   singletons, and the log together.
//! - [`error`] -- [`StoreError`].
//!
//! # Concurrency
//!
//! Nothing here blocks, awaits, or performs I/O. Any historical `Database`
//! snapshot may be read from other threads without synchronization;
//! immutability guarantees no torn reads. The only mutable state in a
//! simulation built on this crate is whatever slot the orchestrator keeps
//! its "current" database in.

pub mod database;
pub mod error;
pub mod event;
pub mod pmap;
pub mod singleton;
pub mod table;

pub use database::Database;
pub use error::StoreError;
pub use event::{ChangeRecord, DatabaseEvent, EventKind, EventLog, Timestamp};
pub use pmap::PersistentMap;
pub use singleton::SingletonSlot;
pub use table::PersistentTable;
