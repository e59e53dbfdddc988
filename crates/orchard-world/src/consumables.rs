//! Applying consumables to plots.
//!
//! A growth boost credits a fraction of the time left in the current stage
//! as extra growth time, once. Every other kind becomes a timed effect on
//! the plot, keyed by kind; reapplying before expiry overwrites the earlier
//! application.

use chrono::{DateTime, TimeDelta, Utc};
use orchard_types::{BoostKind, ConsumableType, PlantType, Plot, TimedEffect};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::growth::seconds_remaining_in_stage;

/// Tunables for consumable effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumableRules {
    /// Lifetime of a timed effect.
    pub effect_duration_seconds: u32,
}

impl Default for ConsumableRules {
    fn default() -> Self {
        Self {
            effect_duration_seconds: 600,
        }
    }
}

/// What applying a consumable changed on the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsumableOutcome {
    /// Growth time was credited to the plot.
    GrowthBoost {
        /// Seconds added to the plot's growth boost.
        seconds: f64,
    },
    /// A timed effect was stored on the plot.
    Timed {
        /// The effect slot written.
        kind: BoostKind,
        /// The stored effect.
        effect: TimedEffect,
    },
}

/// Apply `consumable` to a planted `plot` growing `plant`.
///
/// # Errors
///
/// Returns [`WorldError::PlotNotPlanted`] if the plot is empty or is not
/// growing `plant`.
pub fn apply_consumable(
    plot: &mut Plot,
    plant: &PlantType,
    consumable: &ConsumableType,
    rules: &ConsumableRules,
    now: DateTime<Utc>,
) -> Result<ConsumableOutcome, WorldError> {
    if plot.plant_type_id != Some(plant.id) || plot.planted_at.is_none() {
        return Err(WorldError::PlotNotPlanted(plot.id));
    }

    let Some(kind) = consumable.effect.boost_kind() else {
        let remaining = seconds_remaining_in_stage(plot, plant, now).unwrap_or(0.0);
        let seconds = remaining * consumable.magnitude;
        plot.growth_boost_seconds += seconds;
        return Ok(ConsumableOutcome::GrowthBoost { seconds });
    };

    let expires_at = now
        .checked_add_signed(TimeDelta::seconds(i64::from(rules.effect_duration_seconds)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let effect = TimedEffect {
        expires_at,
        magnitude: consumable.magnitude,
    };
    plot.effects.set(kind, effect);
    Ok(ConsumableOutcome::Timed { kind, effect })
}
