//! Simulation rules for the Orchard farming game.
//!
//! Everything in this crate is pure: functions take the catalog, the record
//! being evaluated, the current instant and (where chance is involved) a
//! random source, and return the new state. Persistence and scheduling live
//! in `orchard-core`.
//!
//! # Modules
//!
//! - [`catalog`] -- The immutable lookup tables every rule consults.
//! - [`consumables`] -- One-shot growth boosts and timed plot effects.
//! - [`error`] -- Error types for rule evaluation.
//! - [`growth`] -- Stage advancement from elapsed and boosted time.
//! - [`pricing`] -- Sale value from weight, colour and weather.
//! - [`spawn`] -- Spawn eligibility, colour-boost redistribution and the
//!   weighted fruit-type draw.
//! - [`starter_catalog`] -- Built-in catalog for fresh installs and tests.
//! - [`weather`] -- Ambient weather rerolls and per-fruit weather effects.

pub mod catalog;
pub mod consumables;
pub mod error;
pub mod growth;
pub mod pricing;
pub mod spawn;
pub mod starter_catalog;
pub mod weather;

// Re-export primary types at crate root.
pub use catalog::Catalog;
pub use consumables::{ConsumableOutcome, ConsumableRules, apply_consumable};
pub use error::WorldError;
pub use pricing::{sale_value, weather_multiplier};
pub use spawn::{BoostPolicy, SpawnGuard, SpawnRules, selection_weights, spawn_fruit};
pub use starter_catalog::starter_catalog;
pub use weather::{WeatherRules, WeatherState};
