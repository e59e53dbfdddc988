//! Immutable catalog records.
//!
//! These are loaded once at startup and never mutated. Prices and
//! multipliers are plain `f64` because the sale formula multiplies several
//! of them and rounds once at the end.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ColorTier, EffectKind, HarvestBehavior};
use crate::ids::{CombinationId, ConsumableId, FruitTypeId, PlantTypeId, WeatherId};

/// A plant that can be grown on a plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlantType {
    /// Catalog key.
    pub id: PlantTypeId,
    /// Display name.
    pub name: String,
    /// Sale price per unit of fruit mass before multipliers.
    pub base_price: f64,
    /// Price of one seed.
    pub seed_price: i64,
    /// Highest growth stage the plant can reach.
    pub max_growth_stage: u32,
    /// Seconds spent in each growth stage.
    pub growth_time_per_stage_seconds: u32,
    /// How the plant yields fruit once mature.
    pub harvest_behavior: HarvestBehavior,
}

/// A colour variant of a plant's fruit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FruitType {
    /// Catalog key.
    pub id: FruitTypeId,
    /// The plant that produces this fruit.
    pub plant_type_id: PlantTypeId,
    /// Display name of the colour.
    pub color_name: String,
    /// Structured colour tag, e.g. `normal`, `gold`, `gold_blue`.
    pub color_tag: String,
    /// Relative spawn weight.
    pub rarity_weight: f64,
    /// Multiplier applied to the sale price.
    pub price_multiplier: f64,
}

impl FruitType {
    /// Rarity tier derived from the colour tag.
    pub fn tier(&self) -> ColorTier {
        ColorTier::classify(&self.color_tag)
    }
}

/// A consumable (fertilizer) that can be applied to a planted plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConsumableType {
    /// Catalog key.
    pub id: ConsumableId,
    /// Display name.
    pub name: String,
    /// Shop price.
    pub price: i64,
    /// What the consumable does.
    pub effect: EffectKind,
    /// Strength of the effect (a fraction for every current kind).
    pub magnitude: f64,
}

/// A kind of ambient weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WeatherType {
    /// Catalog key.
    pub id: WeatherId,
    /// Display name.
    pub name: String,
    /// Probability of being active after an ambient refresh.
    pub spawn_probability: f64,
    /// Probability of sticking to a fruit each time it is exposed.
    pub stick_probability: f64,
    /// Sale multiplier when this is the fruit's only weather effect.
    pub price_multiplier: f64,
}

/// Sale multiplier for a fruit carrying an exact set of weather effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WeatherCombination {
    /// Catalog key.
    pub id: CombinationId,
    /// The weather types in the combination (unordered).
    pub weather_ids: BTreeSet<WeatherId>,
    /// Sale multiplier for the combination.
    pub price_multiplier: f64,
}
