//! Tick orchestration for the Chronicle store.
//!
//! This crate layers a simulation loop over `chronicle-store`'s immutable
//! [`Database`](chronicle_store::Database):
//!
//! - [`System`] is the contract for a named, pure state transition.
//! - [`Game`] owns the registry of systems and the single current-database
//!   slot, folding the systems over it once per tick. A year is 8760 hourly
//!   ticks by default, configurable via [`EngineConfig`].
//! - [`systems`] ships the stock calendar and aging systems.
//!
//! Failure handling is all-or-nothing per tick: the first failing system
//! aborts the tick with [`SimulationError`] naming the tick and system, and
//! the orchestrator keeps the last good snapshot.

pub mod config;
pub mod error;
pub mod game;
pub mod system;
pub mod systems;

pub use config::{ConfigError, EngineConfig};
pub use error::{SimulationError, SystemError};
pub use game::{Game, TickSummary, YearSummary};
pub use system::System;
