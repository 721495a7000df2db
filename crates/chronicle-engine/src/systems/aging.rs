//! Demographic aging: every entity with an [`Age`] component grows one hour
//! older per tick.

use chronicle_store::Database;
use chronicle_types::Component;
use serde::{Deserialize, Serialize};

use crate::error::SystemError;
use crate::system::System;

/// An entity's age, counted in simulated hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Age {
    /// Hours lived so far.
    pub hours: u64,
}

impl Component for Age {
    const NAME: &'static str = "age";
}

impl Age {
    /// A newborn entity.
    #[must_use]
    pub const fn newborn() -> Self {
        Self { hours: 0 }
    }

    /// Whole years lived, rounded down (8760 hours per year).
    #[must_use]
    pub const fn years(&self) -> u64 {
        self.hours / 8_760
    }
}

/// Increments every [`Age`] row by one hour each tick.
///
/// One update event is recorded per aged entity, so the log stays a faithful
/// row-level account even for bulk passes.
#[derive(Debug, Default)]
pub struct AgingSystem;

impl System for AgingSystem {
    fn name(&self) -> &str {
        "aging"
    }

    fn initialize(&mut self, db: Database) -> Result<Database, SystemError> {
        if db.has_table::<Age>() {
            return Ok(db);
        }
        Ok(db.register_table::<Age>()?)
    }

    fn run(&self, db: Database) -> Result<Database, SystemError> {
        Ok(db.update_where::<Age, _>(|_, age| {
            Some(Age {
                hours: age.hours.saturating_add(1),
            })
        })?)
    }
}
