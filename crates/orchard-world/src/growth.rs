//! Growth-stage advancement.
//!
//! A planted crop moves through stages on a fixed per-stage timer. Time
//! credited by time-boost consumables counts as elapsed time. The stage is a
//! pure function of `(planted_at, growth_boost_seconds, now)`, so repeated
//! evaluation is idempotent and the stage never decreases while time moves
//! forward.
//!
//! ```text
//! effective = (now - planted_at) + growth_boost_seconds
//! stage     = min(max_stage, floor(effective / per_stage) + 1)
//! ```

use chrono::{DateTime, Utc};
use orchard_types::{PlantType, Plot};

/// Seconds between `from` and `to`, clamped at zero.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    to.signed_duration_since(from)
        .to_std()
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

/// Effective growth time of the plot's crop at `now`, including boosts.
///
/// Returns `None` when nothing is planted.
pub fn effective_elapsed_seconds(plot: &Plot, now: DateTime<Utc>) -> Option<f64> {
    let planted_at = plot.planted_at?;
    plot.plant_type_id?;
    Some(seconds_between(planted_at, now) + plot.growth_boost_seconds.max(0.0))
}

/// The stage the crop should be in after `effective_seconds` of growth.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn stage_for_elapsed(plant: &PlantType, effective_seconds: f64) -> u32 {
    if plant.growth_time_per_stage_seconds == 0 {
        return plant.max_growth_stage;
    }
    let per_stage = f64::from(plant.growth_time_per_stage_seconds);
    let completed = (effective_seconds.max(0.0) / per_stage).floor();
    // Clamp in floating point first so the cast cannot wrap.
    let capped = completed.min(f64::from(plant.max_growth_stage));
    let completed = capped as u32;
    completed.saturating_add(1).min(plant.max_growth_stage)
}

/// The stage the plot's crop should be in at `now`.
pub fn target_stage(plot: &Plot, plant: &PlantType, now: DateTime<Utc>) -> Option<u32> {
    effective_elapsed_seconds(plot, now).map(|elapsed| stage_for_elapsed(plant, elapsed))
}

/// Advance the plot's stage if its timer has moved past the current stage.
///
/// On advancement the stage and `last_growth_update` are updated in place
/// and the new stage is returned. Returns `None` (and leaves the plot
/// untouched) when nothing is planted or the stage is already current.
pub fn advance(plot: &mut Plot, plant: &PlantType, now: DateTime<Utc>) -> Option<u32> {
    let new_stage = target_stage(plot, plant, now)?;
    if new_stage > plot.growth_stage {
        plot.growth_stage = new_stage;
        plot.last_growth_update = Some(now);
        Some(new_stage)
    } else {
        None
    }
}

/// Whether the crop has reached the plant's final stage.
pub const fn is_fully_grown(plot: &Plot, plant: &PlantType) -> bool {
    plot.growth_stage >= plant.max_growth_stage
}

/// Seconds left before the crop completes its current stage.
///
/// Returns `None` when nothing is planted or the plant has a zero-length
/// stage timer.
pub fn seconds_remaining_in_stage(plot: &Plot, plant: &PlantType, now: DateTime<Utc>) -> Option<f64> {
    if plant.growth_time_per_stage_seconds == 0 {
        return None;
    }
    let per_stage = f64::from(plant.growth_time_per_stage_seconds);
    let elapsed = effective_elapsed_seconds(plot, now)?;
    Some(per_stage - elapsed.rem_euclid(per_stage))
}
