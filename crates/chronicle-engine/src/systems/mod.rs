//! Stock systems shipped with the engine.
//!
//! These are deliberately small: the calendar and demographic aging. They
//! double as worked examples of the [`System`](crate::system::System)
//! contract for game-specific systems to follow.

pub mod aging;
pub mod date;

pub use aging::{Age, AgingSystem};
pub use date::{DateSystem, GameDate};
