//! The [`System`] contract: a named, pure state transition.
//!
//! A system consumes a [`Database`] and produces an updated one. Systems are
//! composed by the orchestrator into a single simulation step, folded in
//! registration order; a system must not rely on hidden state for the
//! correctness of [`System::run`] -- anything it needs it either finds in
//! the database or seeds during [`System::initialize`].

use chronicle_store::Database;

use crate::error::SystemError;

/// A pure transition function with identity and lifecycle hooks.
pub trait System: Send {
    /// Stable name of this system, used in logs and failure reports.
    fn name(&self) -> &str;

    /// One-time setup before the first tick: registering tables, seeding
    /// singletons. Runs in registration order; later systems see the state
    /// earlier ones produced. Must not be required for the correctness of
    /// [`System::run`] beyond that seeding.
    ///
    /// The default implementation is the identity transition.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError`] if setup fails.
    fn initialize(&mut self, db: Database) -> Result<Database, SystemError> {
        Ok(db)
    }

    /// Execute one tick's worth of this system's logic.
    ///
    /// Must be deterministic given the same input database. Either the whole
    /// transition succeeds and the returned database is adopted, or it fails
    /// and the orchestrator discards every intermediate state it produced.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError`] if the transition cannot be applied.
    fn run(&self, db: Database) -> Result<Database, SystemError>;

    /// Teardown hook, called once when the orchestrator shuts down. Purely
    /// observational; the database can no longer be changed from here.
    fn shutdown(&mut self, _db: &Database) {}
}
