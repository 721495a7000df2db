//! Mutation events and the append-only event log.
//!
//! Every mutation of a [`Database`] produces exactly one [`DatabaseEvent`]
//! describing what changed, with the old and new values snapshotted as JSON.
//! Events are the source of truth for the database's history: replaying a
//! log against a freshly registered empty database reconstructs the same
//! table and singleton state.
//!
//! The log itself is immutable. `add` returns a new log sharing structure
//! with the old one, so historical snapshots keep their own view of history
//! at zero copying cost. The empty log allocates nothing.
//!
//! [`Database`]: crate::database::Database

use chronicle_types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pmap::PersistentMap;

/// The kind of mutation an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A row was inserted into a table. Carries the new value only.
    Inserted,
    /// A row was replaced in a table. Carries both old and new values.
    Updated,
    /// A row was removed from a table. Carries the old value only.
    Removed,
    /// A singleton slot was set or replaced. Carries the new value, and the
    /// old value when the slot was previously occupied.
    SingletonChanged,
    /// A table or singleton slot was registered. Carries no values.
    TableRegistered,
}

/// Logical timestamp of an event within a log.
///
/// Timestamps are sequence numbers assigned by the database at append time:
/// monotonically non-decreasing within one log, restarting after
/// [`Database::clear_events`].
///
/// [`Database::clear_events`]: crate::database::Database::clear_events
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single recorded mutation.
///
/// Value snapshots are [`serde_json::Value`] so one log can hold events for
/// every component type; the typed deserializer is resolved through the
/// table registration when the log is replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseEvent {
    /// What happened.
    pub kind: EventKind,
    /// Name of the table or singleton slot the event belongs to.
    pub table: String,
    /// The affected entity; absent for singleton and registration events.
    pub entity: Option<EntityId>,
    /// JSON snapshot of the value before the mutation. Absent for
    /// [`EventKind::Inserted`] and [`EventKind::TableRegistered`].
    pub old_value: Option<Value>,
    /// JSON snapshot of the value after the mutation. Absent for
    /// [`EventKind::Removed`] and [`EventKind::TableRegistered`].
    pub new_value: Option<Value>,
    /// Position of the event in its log.
    pub timestamp: Timestamp,
}

/// A mutation described by a table or singleton slot, before the database
/// has assigned it a timestamp.
///
/// Tables return a `ChangeRecord` alongside their new version; the database
/// stamps it and appends the resulting [`DatabaseEvent`] in the same logical
/// step as the structural change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// What happened.
    pub kind: EventKind,
    /// The affected entity, when the change is row-level.
    pub entity: Option<EntityId>,
    /// JSON snapshot of the prior value, when one existed.
    pub old_value: Option<Value>,
    /// JSON snapshot of the new value, when one exists.
    pub new_value: Option<Value>,
}

impl ChangeRecord {
    /// Stamp this change into a full event for the given table name.
    pub fn into_event(self, table: &str, timestamp: Timestamp) -> DatabaseEvent {
        DatabaseEvent {
            kind: self.kind,
            table: table.to_owned(),
            entity: self.entity,
            old_value: self.old_value,
            new_value: self.new_value,
            timestamp,
        }
    }
}

/// Immutable, ordered, append-only sequence of [`DatabaseEvent`] records.
///
/// Backed by a persistent map keyed by log position, so `add` is O(log n)
/// and old log versions share structure with new ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventLog {
    entries: PersistentMap<u64, DatabaseEvent>,
}

impl EventLog {
    /// The empty log. Allocates nothing.
    pub const fn new() -> Self {
        Self {
            entries: PersistentMap::new(),
        }
    }

    /// Number of events in the log.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no events.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The timestamp the next appended event will receive.
    pub fn next_timestamp(&self) -> Timestamp {
        Timestamp(u64::try_from(self.entries.len()).unwrap_or(u64::MAX))
    }

    /// Append one event, returning the extended log.
    pub fn add(&self, event: DatabaseEvent) -> Self {
        let position = u64::try_from(self.entries.len()).unwrap_or(u64::MAX);
        let (entries, _) = self.entries.insert(position, event);
        Self { entries }
    }

    /// Append a sequence of events in order, returning the extended log.
    pub fn add_range<I>(&self, events: I) -> Self
    where
        I: IntoIterator<Item = DatabaseEvent>,
    {
        let mut log = self.clone();
        for event in events {
            log = log.add(event);
        }
        log
    }

    /// Drop all events, returning the empty log.
    pub const fn clear(&self) -> Self {
        Self::new()
    }

    /// Iterate all events in append order.
    pub fn iter(&self) -> impl Iterator<Item = &DatabaseEvent> {
        self.entries.iter().map(|(_, event)| event)
    }

    /// Events of one kind, in append order.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &DatabaseEvent> {
        self.iter().filter(move |event| event.kind == kind)
    }

    /// Events touching one entity in one table, in append order.
    pub fn for_entity<'a>(
        &'a self,
        table: &'a str,
        entity: EntityId,
    ) -> impl Iterator<Item = &'a DatabaseEvent> {
        self.iter()
            .filter(move |event| event.entity == Some(entity) && event.table == table)
    }

    /// Events with a timestamp at or after `since`, in append order.
    pub fn since(&self, since: Timestamp) -> impl Iterator<Item = &DatabaseEvent> {
        self.iter().filter(move |event| event.timestamp >= since)
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a DatabaseEvent;
    type IntoIter = Box<dyn Iterator<Item = &'a DatabaseEvent> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
