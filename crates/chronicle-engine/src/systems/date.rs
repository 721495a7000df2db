//! The campaign calendar: a [`GameDate`] singleton advanced one hour per tick.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use chronicle_store::Database;
use chronicle_types::Singleton;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SystemError;
use crate::system::System;

/// The current in-game date and time, stored as a singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameDate {
    /// Naive calendar time; the simulated world has no time zones.
    pub datetime: NaiveDateTime,
}

impl Singleton for GameDate {
    const NAME: &'static str = "game_date";
}

impl GameDate {
    /// The stock campaign start: 11 November 1444, midnight.
    #[must_use]
    pub fn campaign_start() -> Self {
        let datetime = NaiveDate::from_ymd_opt(1444, 11, 11)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self { datetime }
    }

    /// This date advanced by `hours`, or `None` past the calendar's range.
    #[must_use]
    pub fn plus_hours(&self, hours: i64) -> Option<Self> {
        self.datetime
            .checked_add_signed(TimeDelta::hours(hours))
            .map(|datetime| Self { datetime })
    }

    /// The calendar year of this date.
    #[must_use]
    pub fn year(&self) -> i32 {
        chrono::Datelike::year(&self.datetime.date())
    }
}

impl std::fmt::Display for GameDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.datetime.format("%Y-%m-%d %H:%M"))
    }
}

/// Advances the [`GameDate`] singleton by one hour each tick.
///
/// Registered first by convention so every later system in the same tick
/// reads the tick's own date rather than the previous one.
#[derive(Debug, Default)]
pub struct DateSystem;

impl System for DateSystem {
    fn name(&self) -> &str {
        "date"
    }

    fn initialize(&mut self, db: Database) -> Result<Database, SystemError> {
        let db = if db.has_singleton::<GameDate>() {
            db
        } else {
            db.register_singleton::<GameDate>()?
        };
        if db.singleton_is_set::<GameDate>() {
            return Ok(db);
        }
        let start = GameDate::campaign_start();
        debug!(date = %start, "seeding campaign start date");
        Ok(db.set_singleton(start)?)
    }

    fn run(&self, db: Database) -> Result<Database, SystemError> {
        let current = *db.singleton::<GameDate>()?;
        let next = current.plus_hours(1).ok_or_else(|| SystemError::Failed {
            reason: format!("calendar overflow advancing past {current}"),
        })?;
        Ok(db.set_singleton(next)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn campaign_starts_at_midnight_1444() {
        let start = GameDate::campaign_start();
        assert_eq!(start.year(), 1444);
        assert_eq!(start.to_string(), "1444-11-11 00:00");
    }

    #[test]
    fn one_run_advances_one_hour() {
        let mut system = DateSystem;
        let db = system.initialize(Database::new()).unwrap();
        let db = system.run(db).unwrap();
        assert_eq!(
            db.singleton::<GameDate>().unwrap().to_string(),
            "1444-11-11 01:00"
        );
    }

    #[test]
    fn initialize_keeps_an_existing_date() {
        let mut system = DateSystem;
        let db = Database::new().register_singleton::<GameDate>().unwrap();
        let later = GameDate::campaign_start().plus_hours(48).unwrap();
        let db = db.set_singleton(later).unwrap();
        let db = system.initialize(db).unwrap();
        assert_eq!(*db.singleton::<GameDate>().unwrap(), later);
    }

    #[test]
    fn a_year_of_hours_lands_on_the_anniversary() {
        let start = GameDate::campaign_start();
        let next = start.plus_hours(8_760).unwrap();
        assert_eq!(next.to_string(), "1445-11-11 00:00");
    }
}
