//! Mutable per-farmer records: plots, fruit and their attached effects.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BoostKind;
use crate::ids::{FruitId, FruitTypeId, PlantTypeId, PlotId, UserId, WeatherId};

/// Lifetime of a weather effect once it sticks to a fruit.
pub const WEATHER_EFFECT_DURATION_SECONDS: u32 = 120;

// ---------------------------------------------------------------------------
// Farmer
// ---------------------------------------------------------------------------

/// A player account as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Farmer {
    /// Unique identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Currency balance.
    pub balance: i64,
}

// ---------------------------------------------------------------------------
// Plot effects
// ---------------------------------------------------------------------------

/// A timed consumable effect on a plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimedEffect {
    /// The effect is active strictly before this instant.
    pub expires_at: DateTime<Utc>,
    /// Strength of the effect.
    pub magnitude: f64,
}

impl TimedEffect {
    /// Whether the effect is still active at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Timed effects on a plot, keyed by kind. One entry per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlotEffects(pub BTreeMap<BoostKind, TimedEffect>);

impl PlotEffects {
    /// Create an empty effect map.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Return the effect of `kind` if present and unexpired at `now`.
    pub fn active(&self, kind: BoostKind, now: DateTime<Utc>) -> Option<&TimedEffect> {
        self.0.get(&kind).filter(|effect| effect.is_active(now))
    }

    /// Store `effect` under `kind`, replacing any previous entry.
    pub fn set(&mut self, kind: BoostKind, effect: TimedEffect) {
        self.0.insert(kind, effect);
    }

    /// Iterate over all stored effects, expired or not.
    pub fn iter(&self) -> impl Iterator<Item = (&BoostKind, &TimedEffect)> {
        self.0.iter()
    }

    /// Whether no effect is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Plot
// ---------------------------------------------------------------------------

/// A farmer's plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Plot {
    /// Unique identifier.
    pub id: PlotId,
    /// Owning farmer.
    pub user_id: UserId,
    /// Slot number on the farm (1-based).
    pub plot_number: u32,
    /// Planted crop, `None` when the plot is empty.
    pub plant_type_id: Option<PlantTypeId>,
    /// Current growth stage; 0 when empty.
    pub growth_stage: u32,
    /// When the current crop was planted.
    pub planted_at: Option<DateTime<Utc>>,
    /// When the growth stage last changed.
    pub last_growth_update: Option<DateTime<Utc>>,
    /// Growth time credited by time-boost consumables.
    pub growth_boost_seconds: f64,
    /// When fruit last spawned on this plot.
    pub last_spawn_attempt_at: Option<DateTime<Utc>>,
    /// When fruit was last harvested from this plot.
    pub last_harvest_at: Option<DateTime<Utc>>,
    /// Active timed consumable effects.
    pub effects: PlotEffects,
}

impl Plot {
    /// Create an empty plot for `user_id` in slot `plot_number`.
    pub fn empty(user_id: UserId, plot_number: u32) -> Self {
        Self {
            id: PlotId::new(),
            user_id,
            plot_number,
            plant_type_id: None,
            growth_stage: 0,
            planted_at: None,
            last_growth_update: None,
            growth_boost_seconds: 0.0,
            last_spawn_attempt_at: None,
            last_harvest_at: None,
            effects: PlotEffects::new(),
        }
    }

    /// Whether a crop is planted.
    pub const fn is_planted(&self) -> bool {
        self.plant_type_id.is_some()
    }

    /// Clear the crop and every piece of growth state, keeping identity.
    pub fn reset(&mut self) {
        self.plant_type_id = None;
        self.growth_stage = 0;
        self.planted_at = None;
        self.last_growth_update = None;
        self.growth_boost_seconds = 0.0;
        self.last_spawn_attempt_at = None;
        self.last_harvest_at = None;
        self.effects = PlotEffects::new();
    }
}

// ---------------------------------------------------------------------------
// Fruit
// ---------------------------------------------------------------------------

/// A weather effect attached to a fruit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WeatherEffect {
    /// The weather that stuck.
    pub weather_id: WeatherId,
    /// When it stuck.
    pub applied_at: DateTime<Utc>,
    /// How long it lasts.
    pub duration_seconds: u32,
}

impl WeatherEffect {
    /// A new effect stamped at `now` with the standard duration.
    pub const fn new(weather_id: WeatherId, now: DateTime<Utc>) -> Self {
        Self {
            weather_id,
            applied_at: now,
            duration_seconds: WEATHER_EFFECT_DURATION_SECONDS,
        }
    }

    /// Whether the effect has outlived its duration at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.applied_at)
            >= TimeDelta::seconds(i64::from(self.duration_seconds))
    }
}

/// A single fruit, on a plot or in the farmer's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Fruit {
    /// Unique identifier.
    pub id: FruitId,
    /// Owning farmer.
    pub user_id: UserId,
    /// Plot the fruit hangs on; `None` once picked into inventory.
    pub plot_id: Option<PlotId>,
    /// Colour variant.
    pub fruit_type_id: FruitTypeId,
    /// Physical mass, one decimal place.
    pub weight: f64,
    /// Set once the fruit has been sold.
    pub harvested: bool,
    /// Weather effects currently attached.
    pub weather_effects: Vec<WeatherEffect>,
    /// When the fruit spawned.
    pub created_at: DateTime<Utc>,
}

impl Fruit {
    /// Whether the fruit is still hanging on a plot.
    pub const fn is_on_plot(&self) -> bool {
        self.plot_id.is_some() && !self.harvested
    }

    /// Whether the fruit is in inventory and unsold.
    pub const fn is_in_inventory(&self) -> bool {
        self.plot_id.is_none() && !self.harvested
    }
}
