//! Contract traits for values stored in a Chronicle database.
//!
//! A database holds two kinds of state: per-entity component rows (one table
//! per component type, a column store) and entity-less singleton values
//! (at most one per type). Both contracts require serde support because every
//! mutation snapshots its old/new values into the event log as JSON, which is
//! what makes a heterogeneous log replayable without runtime reflection.

use core::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A typed value associated with an entity in exactly one table.
///
/// `NAME` is the stable table name used for registration, event records, and
/// replay dispatch. Two component types must not share a name; registration
/// is keyed by it.
pub trait Component:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Stable, unique table name for this component type.
    const NAME: &'static str;
}

/// A type-keyed, entity-less value with at most one instance per database.
///
/// Singletons carry global simulation state such as the current game date.
/// "Not yet set" is an observable state distinct from any default value.
pub trait Singleton:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Stable, unique slot name for this singleton type.
    const NAME: &'static str;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Population {
        count: u64,
    }

    impl Component for Population {
        const NAME: &'static str = "population";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Treasury {
        ducats: i64,
    }

    impl Singleton for Treasury {
        const NAME: &'static str = "treasury";
    }

    #[test]
    fn component_values_roundtrip_through_json() {
        let value = Population { count: 1204 };
        let json = serde_json::to_value(&value).unwrap();
        let back: Population = serde_json::from_value(json).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn names_are_accessible_through_the_trait() {
        assert_eq!(Population::NAME, "population");
        assert_eq!(Treasury::NAME, "treasury");
    }
}
