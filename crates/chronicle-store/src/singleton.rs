//! Type-keyed singleton slots.
//!
//! A [`SingletonSlot`] is the degenerate table: one value, no entity key,
//! the type itself is the address. The same copy-on-write discipline
//! applies -- `set` returns a new slot and a [`ChangeRecord`], and an empty
//! slot is observably distinct from a slot holding a default value.

use std::sync::Arc;

use chronicle_types::Singleton;

use crate::error::StoreError;
use crate::event::{ChangeRecord, EventKind};

/// An immutable single-value cell for a singleton type `T`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SingletonSlot<T> {
    value: Option<Arc<T>>,
}

impl<T: Singleton> SingletonSlot<T> {
    /// Create an empty slot. Allocates nothing.
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Whether the slot has been set.
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Read the current value, if one has been set. Pure; no change record.
    pub fn get(&self) -> Option<&T> {
        self.value.as_deref()
    }

    /// Read the shared handle, if one has been set.
    pub const fn get_shared(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    /// Set or replace the value (upsert semantics).
    ///
    /// The change record carries the old value when the slot was occupied,
    /// so a replacement is replayable and invertible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if either value cannot be
    /// snapshotted for the event log.
    pub fn set(&self, value: T) -> Result<(Self, ChangeRecord), StoreError> {
        let old_snapshot = match &self.value {
            Some(previous) => Some(serde_json::to_value(previous.as_ref())?),
            None => None,
        };
        let new_snapshot = serde_json::to_value(&value)?;
        Ok((
            Self {
                value: Some(Arc::new(value)),
            },
            ChangeRecord {
                kind: EventKind::SingletonChanged,
                entity: None,
                old_value: old_snapshot,
                new_value: Some(new_snapshot),
            },
        ))
    }
}
