//! Error types for the `chronicle-engine` crate.
//!
//! System failures are never swallowed: a failing system aborts its tick and
//! surfaces through [`SimulationError`] with the tick index and system name
//! attached, while the orchestrator keeps the last good database snapshot.

use chronicle_store::StoreError;

/// Errors a [`System`] can produce while initializing or running.
///
/// [`System`]: crate::system::System
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// A store operation failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The system failed for a domain reason of its own.
    #[error("system failed: {reason}")]
    Failed {
        /// Explanation of the failure.
        reason: String,
    },
}

/// Errors that can occur while orchestrating the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// A system failed during a tick. The tick was discarded; the
    /// orchestrator's current database is the last good snapshot.
    #[error("system '{system}' failed at tick {tick}: {source}")]
    System {
        /// The tick that was being executed.
        tick: u64,
        /// Name of the failing system.
        system: String,
        /// The underlying system error.
        source: SystemError,
    },

    /// The tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}
