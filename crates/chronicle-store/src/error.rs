//! Error types for the `chronicle-store` crate.
//!
//! Every fallible store operation returns [`StoreError`] through the
//! standard [`Result`] type. A failed operation never leaves a partially
//! mutated database behind: the caller's reference is untouched and the
//! error carries enough context (operation, table, entity) to reproduce the
//! failing transition from that snapshot.

use chronicle_types::EntityId;

use crate::event::Timestamp;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert targeted a key that is already present in the table.
    #[error("duplicate key {entity} in table '{table}'")]
    DuplicateKey {
        /// The table that rejected the insert.
        table: String,
        /// The occupied key.
        entity: EntityId,
    },

    /// An update or removal targeted a key that is absent from the table.
    #[error("key {entity} not found in table '{table}'")]
    KeyNotFound {
        /// The table that was searched.
        table: String,
        /// The missing key.
        entity: EntityId,
    },

    /// An operation targeted a component or singleton type that has no
    /// registered table or slot.
    #[error("table '{table}' is not registered")]
    TableNotRegistered {
        /// The unregistered name.
        table: String,
    },

    /// A registration targeted a name that is already registered.
    #[error("table '{table}' is already registered")]
    AlreadyRegistered {
        /// The duplicated name.
        table: String,
    },

    /// A singleton was read before its first write.
    #[error("singleton '{name}' has not been set")]
    SingletonNotSet {
        /// The empty slot's name.
        name: String,
    },

    /// Two distinct component types were registered under the same name.
    ///
    /// Registration is keyed by `NAME`, so a lookup can only hit the wrong
    /// concrete type if two types share one.
    #[error("table '{table}' is registered for a different component type")]
    TypeMismatch {
        /// The contested name.
        table: String,
    },

    /// A value snapshot could not be serialized or deserialized.
    #[error("value serialization failed: {source}")]
    Serialization {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// A recorded event stream could not be applied to this database.
    #[error("replay failed at timestamp {timestamp}: {reason}")]
    Replay {
        /// Position of the offending event in its log.
        timestamp: Timestamp,
        /// Explanation of what was malformed.
        reason: String,
    },
}
