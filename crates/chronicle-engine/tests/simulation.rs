//! End-to-end simulation scenarios: large-table ticks, full-year runs,
//! replay reconstruction, and failure isolation.

#![allow(clippy::unwrap_used)]

use chronicle_engine::systems::{Age, AgingSystem, DateSystem, GameDate};
use chronicle_engine::{EngineConfig, Game, SimulationError, System, SystemError};
use chronicle_store::{Database, EventKind};
use chronicle_types::{Component, EntityId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Name {
    value: String,
}

impl Component for Name {
    const NAME: &'static str = "name";
}

fn populated_game(entities: u128) -> Game {
    let mut db = Database::new().register_table::<Age>().unwrap();
    for i in 1..=entities {
        db = db.insert(EntityId::from_u128(i), Age::newborn()).unwrap();
    }
    let mut game = Game::new(db);
    game.add_system("aging", Box::new(AgingSystem));
    game
}

#[test]
fn ten_thousand_entities_age_in_one_tick() {
    let mut game = populated_game(10_000);
    let before = game.snapshot();

    let summary = game.simulate_tick().unwrap();
    assert_eq!(summary.events_appended, 10_000);

    let table = game.current().table::<Age>().unwrap();
    assert_eq!(table.len(), 10_000);
    assert!(table.iter().all(|(_, age)| age.hours == 1));

    // The pre-tick snapshot is untouched by the tick.
    let old = before.table::<Age>().unwrap();
    assert!(old.iter().all(|(_, age)| age.hours == 0));
}

#[test]
fn untouched_tables_share_rows_across_ticks() {
    let mut db = Database::new()
        .register_table::<Age>()
        .unwrap()
        .register_table::<Name>()
        .unwrap();
    for i in 1..=100_u128 {
        db = db
            .insert(EntityId::from_u128(i), Age::newborn())
            .unwrap()
            .insert(
                EntityId::from_u128(i),
                Name {
                    value: format!("entity-{i}"),
                },
            )
            .unwrap();
    }
    let mut game = Game::new(db);
    game.add_system("aging", Box::new(AgingSystem));

    let before = game.snapshot();
    game.simulate_tick().unwrap();

    // Aging rewrote every Age row but never looked at the Name table, so
    // every Name row is still the same allocation in both snapshots.
    for i in 1..=100_u128 {
        let id = EntityId::from_u128(i);
        let old = before.get_shared::<Name>(id).unwrap().unwrap();
        let new = game.current().get_shared::<Name>(id).unwrap().unwrap();
        assert!(std::sync::Arc::ptr_eq(old, new));
    }
}

#[test]
fn a_simulated_year_lands_on_the_anniversary() {
    let mut game = Game::new(Database::new());
    game.add_system("date", Box::new(DateSystem));
    game.initialize_systems().unwrap();
    assert_eq!(
        game.current().singleton::<GameDate>().unwrap().to_string(),
        "1444-11-11 00:00"
    );

    let summary = game.simulate_year().unwrap();
    assert_eq!(summary.ticks, 8_760);
    assert_eq!(summary.first_tick, 1);
    assert_eq!(summary.last_tick, 8_760);
    assert_eq!(game.tick(), 8_760);
    assert_eq!(
        game.current().singleton::<GameDate>().unwrap().to_string(),
        "1445-11-11 00:00"
    );
}

#[test]
fn shorter_configured_years_run_fewer_ticks() {
    let mut config = EngineConfig::default();
    config.time.ticks_per_year = 24;
    let mut game = Game::with_config(Database::new(), &config);
    game.add_system("date", Box::new(DateSystem));
    game.initialize_systems().unwrap();

    game.simulate_year().unwrap();
    assert_eq!(game.tick(), 24);
    assert_eq!(
        game.current().singleton::<GameDate>().unwrap().to_string(),
        "1444-11-12 00:00"
    );
}

#[test]
fn replaying_the_log_reconstructs_the_final_state() {
    // Seeded random churn: inserts, updates, and removals in one stream.
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut db = Database::new().register_table::<Age>().unwrap();
    let mut live: Vec<u128> = Vec::new();

    for step in 0_u64..500 {
        let roll: u8 = rng.random_range(0..10);
        if roll < 6 || live.is_empty() {
            let id = u128::from(step) + 1;
            db = db
                .insert(EntityId::from_u128(id), Age { hours: step })
                .unwrap();
            live.push(id);
        } else if roll < 8 {
            let idx = rng.random_range(0..live.len());
            db = db
                .update(EntityId::from_u128(live[idx]), Age { hours: step })
                .unwrap();
        } else {
            let idx = rng.random_range(0..live.len());
            let id = live.swap_remove(idx);
            db = db.remove::<Age>(EntityId::from_u128(id)).unwrap();
        }
    }

    let fresh = Database::new().register_table::<Age>().unwrap();
    let rebuilt = fresh.replay(db.log()).unwrap();

    let original: Vec<(EntityId, Age)> = db
        .table::<Age>()
        .unwrap()
        .iter()
        .map(|(id, age)| (id, age.clone()))
        .collect();
    let replayed: Vec<(EntityId, Age)> = rebuilt
        .table::<Age>()
        .unwrap()
        .iter()
        .map(|(id, age)| (id, age.clone()))
        .collect();
    assert_eq!(original, replayed);
}

#[test]
fn identical_games_tick_identically() {
    let run = || {
        let mut game = populated_game(50);
        game.add_system("date", Box::new(DateSystem));
        game.initialize_systems().unwrap();
        for _ in 0..10 {
            game.simulate_tick().unwrap();
        }
        game.snapshot()
    };
    let a = run();
    let b = run();

    let ages = |db: &Database| -> Vec<(EntityId, Age)> {
        db.table::<Age>()
            .unwrap()
            .iter()
            .map(|(id, age)| (id, age.clone()))
            .collect()
    };
    assert_eq!(ages(&a), ages(&b));
    assert_eq!(a.log().len(), b.log().len());
    let kinds = |db: &Database| -> Vec<EventKind> { db.log().iter().map(|e| e.kind).collect() };
    assert_eq!(kinds(&a), kinds(&b));
}

/// Fails on the third run, to prove mid-run failures leave the last good
/// snapshot in place.
struct FailsOnThirdRun {
    runs: std::cell::Cell<u32>,
}

impl System for FailsOnThirdRun {
    fn name(&self) -> &str {
        "fails_on_third_run"
    }

    fn run(&self, db: Database) -> Result<Database, SystemError> {
        let runs = self.runs.get() + 1;
        self.runs.set(runs);
        if runs >= 3 {
            return Err(SystemError::Failed {
                reason: "scripted failure".to_owned(),
            });
        }
        Ok(db)
    }
}

#[test]
fn a_failing_system_names_itself_and_its_tick() {
    let mut game = populated_game(10);
    game.add_system(
        "fails_on_third_run",
        Box::new(FailsOnThirdRun {
            runs: std::cell::Cell::new(0),
        }),
    );
    game.simulate_tick().unwrap();
    game.simulate_tick().unwrap();

    let err = game.simulate_tick().unwrap_err();
    match err {
        SimulationError::System { tick, system, .. } => {
            assert_eq!(tick, 3);
            assert_eq!(system, "fails_on_third_run");
        }
        SimulationError::TickOverflow => panic!("unexpected overflow"),
    }
    // The aborted tick committed nothing, not even the aging that ran
    // before the failure.
    assert_eq!(game.tick(), 2);
    let table = game.current().table::<Age>().unwrap();
    assert!(table.iter().all(|(_, age)| age.hours == 2));
}
