//! The immutable database aggregate.
//!
//! A [`Database`] bundles every registered component table, every singleton
//! slot, and the event log into one persistent value. All mutation methods
//! return a new `Database`; the old reference remains valid and inspectable
//! forever (snapshot semantics). Each mutation that changes a table or slot
//! appends exactly one [`DatabaseEvent`] to the log in the same logical
//! step, so the log alone is sufficient to reconstruct the final state from
//! a freshly registered empty database.
//!
//! # Registration and dispatch
//!
//! Tables and slots are registered per component type, keyed by the type's
//! stable `NAME`. Registration resolves a typed replay adapter once, so
//! applying a recorded event stream needs no runtime reflection -- just one
//! keyed lookup per event. A failed operation aborts without touching the
//! caller's database.

use core::fmt;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use chronicle_types::{Component, EntityId, Singleton};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::event::{ChangeRecord, DatabaseEvent, EventKind, EventLog};
use crate::pmap::PersistentMap;
use crate::singleton::SingletonSlot;
use crate::table::PersistentTable;

/// A registered component table plus its replay adapter.
#[derive(Clone)]
struct TableEntry {
    /// The `PersistentTable<T>` behind a type-erased handle.
    table: Arc<dyn Any + Send + Sync>,
    /// Typed replay dispatch, resolved at registration time.
    ops: Arc<dyn ReplayOps>,
}

/// A registered singleton slot plus its replay adapter.
#[derive(Clone)]
struct SingletonEntry {
    /// The `SingletonSlot<T>` behind a type-erased handle.
    slot: Arc<dyn Any + Send + Sync>,
    /// Typed replay dispatch, resolved at registration time.
    ops: Arc<dyn ReplayOps>,
}

/// Applies one recorded event to a database through the concrete component
/// type it was registered with.
trait ReplayOps: Send + Sync {
    /// Apply `event` to `db`, returning the advanced database.
    fn apply(&self, db: &Database, event: &DatabaseEvent) -> Result<Database, StoreError>;
}

/// Replay adapter for a component table of type `T`.
struct TableReplayer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> ReplayOps for TableReplayer<T> {
    fn apply(&self, db: &Database, event: &DatabaseEvent) -> Result<Database, StoreError> {
        let entity = event
            .entity
            .ok_or_else(|| replay_error(event, "row event is missing its entity id"))?;
        match event.kind {
            EventKind::Inserted => db.insert::<T>(entity, decode::<T>(event, event.new_value.as_ref())?),
            EventKind::Updated => db.update::<T>(entity, decode::<T>(event, event.new_value.as_ref())?),
            EventKind::Removed => db.remove::<T>(entity),
            EventKind::SingletonChanged | EventKind::TableRegistered => {
                Err(replay_error(event, "event kind does not target a table row"))
            }
        }
    }
}

/// Replay adapter for a singleton slot of type `T`.
struct SingletonReplayer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Singleton> ReplayOps for SingletonReplayer<T> {
    fn apply(&self, db: &Database, event: &DatabaseEvent) -> Result<Database, StoreError> {
        match event.kind {
            EventKind::SingletonChanged => {
                db.set_singleton::<T>(decode::<T>(event, event.new_value.as_ref())?)
            }
            _ => Err(replay_error(event, "event kind does not target a singleton")),
        }
    }
}

/// Deserialize an event's value snapshot into the registered concrete type.
fn decode<T: DeserializeOwned>(
    event: &DatabaseEvent,
    value: Option<&Value>,
) -> Result<T, StoreError> {
    let value = value.ok_or_else(|| replay_error(event, "event is missing its value snapshot"))?;
    serde_json::from_value(value.clone()).map_err(StoreError::from)
}

fn replay_error(event: &DatabaseEvent, reason: &str) -> StoreError {
    StoreError::Replay {
        timestamp: event.timestamp,
        reason: reason.to_owned(),
    }
}

/// An immutable bundle of component tables, singleton slots, and the event
/// log. Cloning is O(1); every mutation returns a new value.
#[derive(Clone, Default)]
pub struct Database {
    tables: PersistentMap<&'static str, TableEntry>,
    singletons: PersistentMap<&'static str, SingletonEntry>,
    log: EventLog,
}

impl Database {
    /// Create an empty database with no registrations and an empty log.
    pub const fn new() -> Self {
        Self {
            tables: PersistentMap::new(),
            singletons: PersistentMap::new(),
            log: EventLog::new(),
        }
    }

    /// The event log of this database version.
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a component table for `T`, emitting [`EventKind::TableRegistered`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyRegistered`] if `T::NAME` is already
    /// taken by a table or a singleton slot.
    pub fn register_table<T: Component>(&self) -> Result<Self, StoreError> {
        self.ensure_name_free(T::NAME)?;
        let entry = TableEntry {
            table: Arc::new(PersistentTable::<T>::new()),
            ops: Arc::new(TableReplayer::<T> {
                _marker: PhantomData,
            }),
        };
        let (tables, _) = self.tables.insert(T::NAME, entry);
        debug!(table = T::NAME, "table registered");
        Ok(Self {
            tables,
            singletons: self.singletons.clone(),
            log: self.append_registration(T::NAME),
        })
    }

    /// Register a singleton slot for `T`, emitting [`EventKind::TableRegistered`].
    ///
    /// Slots are registered explicitly, like tables, so that a recorded log
    /// can be replayed against a freshly registered empty database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyRegistered`] if `T::NAME` is already
    /// taken by a table or a singleton slot.
    pub fn register_singleton<T: Singleton>(&self) -> Result<Self, StoreError> {
        self.ensure_name_free(T::NAME)?;
        let entry = SingletonEntry {
            slot: Arc::new(SingletonSlot::<T>::new()),
            ops: Arc::new(SingletonReplayer::<T> {
                _marker: PhantomData,
            }),
        };
        let (singletons, _) = self.singletons.insert(T::NAME, entry);
        debug!(singleton = T::NAME, "singleton registered");
        Ok(Self {
            tables: self.tables.clone(),
            singletons,
            log: self.append_registration(T::NAME),
        })
    }

    /// Whether a table is registered for `T`.
    pub fn has_table<T: Component>(&self) -> bool {
        self.tables.contains_key(T::NAME)
    }

    /// Whether a singleton slot is registered for `T`.
    pub fn has_singleton<T: Singleton>(&self) -> bool {
        self.singletons.contains_key(T::NAME)
    }

    fn ensure_name_free(&self, name: &'static str) -> Result<(), StoreError> {
        if self.tables.contains_key(name) || self.singletons.contains_key(name) {
            return Err(StoreError::AlreadyRegistered {
                table: name.to_owned(),
            });
        }
        Ok(())
    }

    fn append_registration(&self, name: &'static str) -> EventLog {
        let change = ChangeRecord {
            kind: EventKind::TableRegistered,
            entity: None,
            old_value: None,
            new_value: None,
        };
        self.log.add(change.into_event(name, self.log.next_timestamp()))
    }

    // ------------------------------------------------------------------
    // Table operations
    // ------------------------------------------------------------------

    /// Insert a row into `T`'s table, emitting [`EventKind::Inserted`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no table and
    /// propagates [`StoreError::DuplicateKey`] from the table itself.
    pub fn insert<T: Component>(&self, id: EntityId, value: T) -> Result<Self, StoreError> {
        let (table, entry) = self.typed_table::<T>()?;
        let (next, change) = table.insert(id, value)?;
        Ok(self.commit_table::<T>(entry, next, change))
    }

    /// Replace a row in `T`'s table, emitting [`EventKind::Updated`] with
    /// both the old and the new value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no table and
    /// propagates [`StoreError::KeyNotFound`] from the table itself.
    pub fn update<T: Component>(&self, id: EntityId, value: T) -> Result<Self, StoreError> {
        let (table, entry) = self.typed_table::<T>()?;
        let (next, change) = table.update(id, value)?;
        Ok(self.commit_table::<T>(entry, next, change))
    }

    /// Remove a row from `T`'s table, emitting [`EventKind::Removed`] with
    /// the old value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no table and
    /// propagates [`StoreError::KeyNotFound`] from the table itself.
    pub fn remove<T: Component>(&self, id: EntityId) -> Result<Self, StoreError> {
        let (table, entry) = self.typed_table::<T>()?;
        let (next, change) = table.remove(id)?;
        Ok(self.commit_table::<T>(entry, next, change))
    }

    /// Read a row from `T`'s table. Pure; appends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no table.
    /// An absent row is `Ok(None)`, not an error.
    pub fn get<T: Component>(&self, id: EntityId) -> Result<Option<&T>, StoreError> {
        Ok(self.typed_table::<T>()?.0.get(id))
    }

    /// Read a row's shared handle from `T`'s table. Pure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no table.
    pub fn get_shared<T: Component>(&self, id: EntityId) -> Result<Option<&Arc<T>>, StoreError> {
        Ok(self.typed_table::<T>()?.0.get_shared(id))
    }

    /// Borrow `T`'s whole table for iteration and bulk reads.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no table.
    pub fn table<T: Component>(&self) -> Result<&PersistentTable<T>, StoreError> {
        Ok(self.typed_table::<T>()?.0)
    }

    /// Bulk mutation: apply `update` to every row of `T`'s table and replace
    /// the rows for which it returns `Some`.
    ///
    /// This is a derived operation -- a fold of [`Database::update`] over
    /// the matching rows -- so the log records one [`EventKind::Updated`]
    /// event per affected row and replay fidelity is exact.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no table;
    /// a failure partway through discards the partial fold (the receiver is
    /// unaffected either way).
    pub fn update_where<T, F>(&self, mut update: F) -> Result<Self, StoreError>
    where
        T: Component,
        F: FnMut(EntityId, &T) -> Option<T>,
    {
        let (table, _) = self.typed_table::<T>()?;
        let replacements: Vec<(EntityId, T)> = table
            .iter()
            .filter_map(|(id, value)| update(id, value).map(|next| (id, next)))
            .collect();
        let mut db = self.clone();
        for (id, next) in replacements {
            db = db.update::<T>(id, next)?;
        }
        Ok(db)
    }

    fn typed_table<T: Component>(&self) -> Result<(&PersistentTable<T>, &TableEntry), StoreError> {
        let entry = self
            .tables
            .get(T::NAME)
            .ok_or_else(|| StoreError::TableNotRegistered {
                table: T::NAME.to_owned(),
            })?;
        let table = entry
            .table
            .downcast_ref::<PersistentTable<T>>()
            .ok_or_else(|| StoreError::TypeMismatch {
                table: T::NAME.to_owned(),
            })?;
        Ok((table, entry))
    }

    fn commit_table<T: Component>(
        &self,
        entry: &TableEntry,
        table: PersistentTable<T>,
        change: ChangeRecord,
    ) -> Self {
        let event = change.into_event(T::NAME, self.log.next_timestamp());
        let (tables, _) = self.tables.insert(
            T::NAME,
            TableEntry {
                table: Arc::new(table),
                ops: entry.ops.clone(),
            },
        );
        Self {
            tables,
            singletons: self.singletons.clone(),
            log: self.log.add(event),
        }
    }

    // ------------------------------------------------------------------
    // Singleton operations
    // ------------------------------------------------------------------

    /// Set or replace `T`'s singleton (upsert), emitting
    /// [`EventKind::SingletonChanged`] with the old value when one existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no slot.
    pub fn set_singleton<T: Singleton>(&self, value: T) -> Result<Self, StoreError> {
        let (slot, entry) = self.typed_singleton::<T>()?;
        let (next, change) = slot.set(value)?;
        let event = change.into_event(T::NAME, self.log.next_timestamp());
        let (singletons, _) = self.singletons.insert(
            T::NAME,
            SingletonEntry {
                slot: Arc::new(next),
                ops: entry.ops.clone(),
            },
        );
        Ok(Self {
            tables: self.tables.clone(),
            singletons,
            log: self.log.add(event),
        })
    }

    /// Read `T`'s singleton. Pure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotRegistered`] when `T` has no slot and
    /// [`StoreError::SingletonNotSet`] when the slot exists but has never
    /// been written.
    pub fn singleton<T: Singleton>(&self) -> Result<&T, StoreError> {
        let (slot, _) = self.typed_singleton::<T>()?;
        slot.get().ok_or_else(|| StoreError::SingletonNotSet {
            name: T::NAME.to_owned(),
        })
    }

    /// Whether `T`'s singleton slot is registered and has been written.
    pub fn singleton_is_set<T: Singleton>(&self) -> bool {
        self.typed_singleton::<T>()
            .map(|(slot, _)| slot.is_set())
            .unwrap_or(false)
    }

    fn typed_singleton<T: Singleton>(
        &self,
    ) -> Result<(&SingletonSlot<T>, &SingletonEntry), StoreError> {
        let entry = self
            .singletons
            .get(T::NAME)
            .ok_or_else(|| StoreError::TableNotRegistered {
                table: T::NAME.to_owned(),
            })?;
        let slot = entry
            .slot
            .downcast_ref::<SingletonSlot<T>>()
            .ok_or_else(|| StoreError::TypeMismatch {
                table: T::NAME.to_owned(),
            })?;
        Ok((slot, entry))
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Same tables and singletons, empty log.
    ///
    /// Truncates replay bookkeeping without losing state -- used to reset
    /// between measurement runs.
    pub fn clear_events(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            singletons: self.singletons.clone(),
            log: EventLog::new(),
        }
    }

    /// Apply a recorded event stream to this database, in order.
    ///
    /// Replaying the log of a database built from empty against a freshly
    /// registered empty database (same registrations) reconstructs
    /// observationally equal table and singleton state. Registration events
    /// are verified against the existing registrations rather than
    /// re-applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Replay`] when an event names an unknown table
    /// or is missing a required payload, and propagates the underlying
    /// operation error when an event does not apply cleanly (for example an
    /// `Inserted` event for a key that is already present).
    pub fn replay<'a, I>(&self, events: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = &'a DatabaseEvent>,
    {
        let mut db = self.clone();
        for event in events {
            db = db.apply_event(event)?;
        }
        Ok(db)
    }

    fn apply_event(&self, event: &DatabaseEvent) -> Result<Self, StoreError> {
        match event.kind {
            EventKind::TableRegistered => {
                if self.tables.contains_key(event.table.as_str())
                    || self.singletons.contains_key(event.table.as_str())
                {
                    Ok(self.clone())
                } else {
                    Err(replay_error(
                        event,
                        "registration event names a table this database does not register",
                    ))
                }
            }
            EventKind::SingletonChanged => {
                let entry = self
                    .singletons
                    .get(event.table.as_str())
                    .ok_or_else(|| replay_error(event, "no singleton registered under this name"))?;
                entry.ops.apply(self, event)
            }
            EventKind::Inserted | EventKind::Updated | EventKind::Removed => {
                let entry = self
                    .tables
                    .get(event.table.as_str())
                    .ok_or_else(|| replay_error(event, "no table registered under this name"))?;
                entry.ops.apply(self, event)
            }
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables: Vec<&str> = self.tables.iter().map(|(name, _)| *name).collect();
        let singletons: Vec<&str> = self.singletons.iter().map(|(name, _)| *name).collect();
        f.debug_struct("Database")
            .field("tables", &tables)
            .field("singletons", &singletons)
            .field("events", &self.log.len())
            .finish()
    }
}
