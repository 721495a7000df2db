//! Type-safe identifier wrapper around [`Uuid`].
//!
//! Every entity in a Chronicle database is addressed by an [`EntityId`].
//! Fresh identifiers use UUID v7 (time-ordered) so that insertion into the
//! ordered persistent tables stays well distributed over time. Deterministic
//! constructors exist for tests and replay harnesses, where reproducible
//! identifiers matter more than uniqueness across machines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identifier for an entity.
///
/// An entity is nothing more than the union of the component rows stored
/// under its `EntityId` across tables; there is no central entity record.
/// Identifiers are comparable and ordered so tables can iterate their rows
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The nil identifier (all zeroes).
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Build an identifier from a raw 128-bit value.
    ///
    /// Intended for tests and replay fixtures that need reproducible
    /// identifiers (`EntityId::from_u128(7)` is the same on every run).
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<EntityId> for Uuid {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_ne!(a, EntityId::nil());
    }

    #[test]
    fn from_u128_is_deterministic() {
        assert_eq!(EntityId::from_u128(42), EntityId::from_u128(42));
        assert_ne!(EntityId::from_u128(42), EntityId::from_u128(43));
    }

    #[test]
    fn ids_order_by_raw_value() {
        let low = EntityId::from_u128(1);
        let high = EntityId::from_u128(2);
        assert!(low < high);
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = EntityId::new();
        let json = serde_json::to_string(&original).unwrap();
        let restored: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = EntityId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
