//! Enumeration types for the Orchard simulation.
//!
//! String forms (serde `snake_case`) are the values stored in the catalog
//! tables and inside persisted effect records, so renaming a variant is a
//! data migration.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Harvest behaviour
// ---------------------------------------------------------------------------

/// How a plant yields fruit once it matures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum HarvestBehavior {
    /// The mature plant turns into exactly one fruit; harvesting it clears
    /// the plot.
    SingleHarvest,
    /// The mature plant keeps producing fruit on a cadence.
    Perennial,
}

impl HarvestBehavior {
    /// Return the stored string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleHarvest => "single_harvest",
            Self::Perennial => "perennial",
        }
    }

    /// Parse the stored string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single_harvest" => Some(Self::SingleHarvest),
            "perennial" => Some(Self::Perennial),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Consumable effects
// ---------------------------------------------------------------------------

/// The effect a consumable has when applied to a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// One-shot credit of growth time. Never stored as a timed effect.
    GrowthBoost,
    /// Multiplies the mass of spawned fruit while active.
    FruitSizeBoost,
    /// Shifts spawn weight from the baseline colour to every special colour.
    FruitColorBoost,
    /// Shifts spawn weight mostly toward dual-colour fruit.
    DualColorBoost,
    /// Shifts spawn weight mostly toward tri-colour fruit.
    TriColorBoost,
}

impl EffectKind {
    /// Return the timed boost this effect becomes on a plot, or `None` for
    /// the one-shot growth boost.
    pub const fn boost_kind(self) -> Option<BoostKind> {
        match self {
            Self::GrowthBoost => None,
            Self::FruitSizeBoost => Some(BoostKind::FruitSizeBoost),
            Self::FruitColorBoost => Some(BoostKind::FruitColorBoost),
            Self::DualColorBoost => Some(BoostKind::DualColorBoost),
            Self::TriColorBoost => Some(BoostKind::TriColorBoost),
        }
    }

    /// Return the stored string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GrowthBoost => "growth_boost",
            Self::FruitSizeBoost => "fruit_size_boost",
            Self::FruitColorBoost => "fruit_color_boost",
            Self::DualColorBoost => "dual_color_boost",
            Self::TriColorBoost => "tri_color_boost",
        }
    }

    /// Parse the stored string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "growth_boost" => Some(Self::GrowthBoost),
            "fruit_size_boost" => Some(Self::FruitSizeBoost),
            "fruit_color_boost" => Some(Self::FruitColorBoost),
            "dual_color_boost" => Some(Self::DualColorBoost),
            "tri_color_boost" => Some(Self::TriColorBoost),
            _ => None,
        }
    }
}

/// A timed effect that can sit in a plot's effect map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum BoostKind {
    /// See [`EffectKind::FruitSizeBoost`].
    FruitSizeBoost,
    /// See [`EffectKind::FruitColorBoost`].
    FruitColorBoost,
    /// See [`EffectKind::DualColorBoost`].
    DualColorBoost,
    /// See [`EffectKind::TriColorBoost`].
    TriColorBoost,
}

// ---------------------------------------------------------------------------
// Colour tiers
// ---------------------------------------------------------------------------

/// Rarity tier of a fruit type, derived from the structure of its colour tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ColorTier {
    /// The common colour (tag contains `normal`).
    Baseline,
    /// A special colour with no delimiter in its tag.
    Single,
    /// Two colours joined by one `_`.
    Dual,
    /// Three colours joined by two `_`.
    Tri,
    /// Any other tag shape. Keeps its raw weight under every boost.
    Unranked,
}

impl ColorTier {
    /// Classify a colour tag.
    ///
    /// A tag mentioning `normal` (any case) is the baseline. Otherwise the
    /// number of `_` delimiters decides the tier.
    pub fn classify(tag: &str) -> Self {
        if tag.to_lowercase().contains("normal") {
            return Self::Baseline;
        }
        match tag.matches('_').count() {
            0 => Self::Single,
            1 => Self::Dual,
            2 => Self::Tri,
            _ => Self::Unranked,
        }
    }
}
