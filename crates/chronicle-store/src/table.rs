//! Typed component tables.
//!
//! A [`PersistentTable`] maps entity identifiers to values of one component
//! type -- one table per type, a column store. Tables are immutable: every
//! mutation returns a new table plus a [`ChangeRecord`] describing what
//! changed, and the old table keeps serving reads unchanged. Values are held
//! behind [`Arc`], so the copy-on-write path never clones component data --
//! after an update, every untouched row of the new table is
//! pointer-identical to the old one.
//!
//! # Invariants
//!
//! - No duplicate keys: `insert` hard-fails on an occupied key rather than
//!   silently upserting.
//! - Lookups are pure; only `insert`/`update`/`remove` produce change
//!   records.
//! - Mutation cost is O(log n) in the number of rows, never O(n).

use std::sync::Arc;

use chronicle_types::{Component, EntityId};

use crate::error::StoreError;
use crate::event::{ChangeRecord, EventKind};
use crate::pmap::PersistentMap;

/// An immutable map from [`EntityId`] to a component value of type `T`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistentTable<T> {
    entries: PersistentMap<EntityId, Arc<T>>,
}

impl<T: Component> PersistentTable<T> {
    /// Create an empty table. Allocates nothing.
    pub const fn new() -> Self {
        Self {
            entries: PersistentMap::new(),
        }
    }

    /// Number of rows in the table.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no rows.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a row exists for `id`.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Look up the value for `id`. Pure; no change record.
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entries.get(&id).map(AsRef::as_ref)
    }

    /// Look up the shared handle for `id`.
    ///
    /// Handles compare by pointer through [`Arc::ptr_eq`], which is how the
    /// structural-sharing guarantee is observable from outside: an update of
    /// one row leaves every other row's handle identical across versions.
    pub fn get_shared(&self, id: EntityId) -> Option<&Arc<T>> {
        self.entries.get(&id)
    }

    /// Iterate all rows in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value.as_ref()))
    }

    /// Iterate all row identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if `id` is already present, and
    /// [`StoreError::Serialization`] if the value cannot be snapshotted for
    /// the event log.
    pub fn insert(&self, id: EntityId, value: T) -> Result<(Self, ChangeRecord), StoreError> {
        if self.entries.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                table: T::NAME.to_owned(),
                entity: id,
            });
        }
        let snapshot = serde_json::to_value(&value)?;
        let (entries, _) = self.entries.insert(id, Arc::new(value));
        Ok((
            Self { entries },
            ChangeRecord {
                kind: EventKind::Inserted,
                entity: Some(id),
                old_value: None,
                new_value: Some(snapshot),
            },
        ))
    }

    /// Replace the row under `id`.
    ///
    /// The change record carries both the old and the new value, so the
    /// transition is replayable and invertible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if `id` is absent, and
    /// [`StoreError::Serialization`] if either value cannot be snapshotted.
    pub fn update(&self, id: EntityId, value: T) -> Result<(Self, ChangeRecord), StoreError> {
        let previous = self.entries.get(&id).ok_or_else(|| StoreError::KeyNotFound {
            table: T::NAME.to_owned(),
            entity: id,
        })?;
        let old_snapshot = serde_json::to_value(previous.as_ref())?;
        let new_snapshot = serde_json::to_value(&value)?;
        let (entries, _) = self.entries.insert(id, Arc::new(value));
        Ok((
            Self { entries },
            ChangeRecord {
                kind: EventKind::Updated,
                entity: Some(id),
                old_value: Some(old_snapshot),
                new_value: Some(new_snapshot),
            },
        ))
    }

    /// Remove the row under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if `id` is absent, and
    /// [`StoreError::Serialization`] if the removed value cannot be
    /// snapshotted.
    pub fn remove(&self, id: EntityId) -> Result<(Self, ChangeRecord), StoreError> {
        let (entries, removed) =
            self.entries.remove(&id).ok_or_else(|| StoreError::KeyNotFound {
                table: T::NAME.to_owned(),
                entity: id,
            })?;
        let old_snapshot = serde_json::to_value(removed.as_ref())?;
        Ok((
            Self { entries },
            ChangeRecord {
                kind: EventKind::Removed,
                entity: Some(id),
                old_value: Some(old_snapshot),
                new_value: None,
            },
        ))
    }
}
