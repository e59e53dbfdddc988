//! Fruit spawning: eligibility, colour-boost weight redistribution and the
//! weighted fruit-type draw.
//!
//! # Eligibility
//!
//! - **Perennial** plots at or past the mature stage spawn at most once per
//!   cadence minute, while they hold fewer than the per-plot fruit cap.
//! - **Single-harvest** plots spawn exactly one fruit once fully grown, and
//!   only while no unharvested fruit is left on them.
//!
//! # Weights
//!
//! The first active colour boost wins, in order tri > dual > simple:
//!
//! | Boost  | Stolen from baseline | Dual pool | Tri pool | Other specials |
//! |--------|----------------------|-----------|----------|----------------|
//! | tri    | 90%                  | 20%       | 80%      | raw            |
//! | dual   | 80%                  | 80%       | 20%      | raw            |
//! | simple | `magnitude`          | 100% across every non-baseline type  ||
//!
//! The stolen amount is always handed back out in full, so the boosted
//! weights sum to the raw total.

use chrono::{DateTime, Timelike, Utc};
use orchard_types::{
    BoostKind, ColorTier, Fruit, FruitId, FruitType, HarvestBehavior, PlantType, PlantTypeId,
    Plot, PlotEffects,
};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::weather::minute_of;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Tunables for fruit spawning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRules {
    /// Growth stage from which perennial plots start producing.
    pub mature_stage: u32,
    /// Perennial plots spawn only on minutes divisible by this value.
    pub perennial_cadence_minutes: u32,
    /// A perennial plot stops producing at this many unharvested fruit.
    pub max_unharvested: usize,
    /// Lower bound of the fruit mass roll.
    pub min_weight: f64,
    /// Upper bound of the fruit mass roll.
    pub max_weight: f64,
}

impl Default for SpawnRules {
    fn default() -> Self {
        Self {
            mature_stage: 16,
            perennial_cadence_minutes: 2,
            max_unharvested: 10,
            min_weight: 0.5,
            max_weight: 50.0,
        }
    }
}

/// The part of spawn eligibility that depends on mutable plot state.
///
/// Stores re-check it when the fruit is written, under the same lock or
/// transaction as the write, so two triggers racing on one plot cannot
/// both spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnGuard {
    /// The plot must hold fewer unharvested fruit than this.
    pub max_unharvested: usize,
    /// The plot must not have spawned earlier in the same minute.
    pub once_per_minute: bool,
}

impl SpawnGuard {
    /// The guard for a plot growing `plant`.
    pub const fn for_plant(plant: &PlantType, rules: &SpawnRules) -> Self {
        match plant.harvest_behavior {
            HarvestBehavior::SingleHarvest => Self {
                max_unharvested: 1,
                once_per_minute: false,
            },
            HarvestBehavior::Perennial => Self {
                max_unharvested: rules.max_unharvested,
                once_per_minute: true,
            },
        }
    }

    /// Whether a plot last stamped at `last_spawn` and holding
    /// `unharvested` fruit may spawn at `now`.
    pub fn admits(&self, last_spawn: Option<DateTime<Utc>>, unharvested: usize, now: DateTime<Utc>) -> bool {
        unharvested < self.max_unharvested
            && !(self.once_per_minute && last_spawn.map(minute_of) == Some(minute_of(now)))
    }
}

/// Whether `plot` may spawn a fruit at `now`.
///
/// `unharvested` is the number of unharvested fruit currently on the plot.
pub fn is_eligible(
    plot: &Plot,
    plant: &PlantType,
    unharvested: usize,
    rules: &SpawnRules,
    now: DateTime<Utc>,
) -> bool {
    if plot.plant_type_id != Some(plant.id) {
        return false;
    }
    let grown = match plant.harvest_behavior {
        HarvestBehavior::SingleHarvest => plot.growth_stage >= plant.max_growth_stage,
        HarvestBehavior::Perennial => {
            let cadence = rules.perennial_cadence_minutes.max(1);
            plot.growth_stage >= rules.mature_stage && now.minute().is_multiple_of(cadence)
        }
    };
    grown
        && SpawnGuard::for_plant(plant, rules).admits(plot.last_spawn_attempt_at, unharvested, now)
}

// ---------------------------------------------------------------------------
// Weight redistribution
// ---------------------------------------------------------------------------

/// How a dual or tri colour boost moves weight out of the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostPolicy {
    /// Fraction of the baseline weight taken.
    pub steal: f64,
    /// Fraction of the taken weight given to the dual tier.
    pub dual_share: f64,
    /// Fraction of the taken weight given to the tri tier.
    pub tri_share: f64,
}

impl BoostPolicy {
    /// Tri-colour boost.
    pub const TRI: Self = Self {
        steal: 0.9,
        dual_share: 0.2,
        tri_share: 0.8,
    };

    /// Dual-colour boost.
    pub const DUAL: Self = Self {
        steal: 0.8,
        dual_share: 0.8,
        tri_share: 0.2,
    };
}

fn raw_weights(fruit: &[&FruitType]) -> Vec<f64> {
    fruit.iter().map(|f| f.rarity_weight).collect()
}

/// Index of the baseline type: the first baseline-tier type in order.
fn baseline_index(fruit: &[&FruitType]) -> Option<usize> {
    fruit.iter().position(|f| f.tier() == ColorTier::Baseline)
}

/// Remove `fraction` of the baseline weight and return the amount taken.
fn take_from_baseline(weights: &mut [f64], baseline: usize, fraction: f64) -> f64 {
    weights.get_mut(baseline).map_or(0.0, |base| {
        let stolen = *base * fraction;
        *base -= stolen;
        stolen
    })
}

/// Add `bonus` across `members` of `weights`, in proportion to their
/// current weight, or equally when the pool's weights sum to zero.
fn distribute(weights: &mut [f64], members: &[usize], bonus: f64) {
    if members.is_empty() {
        return;
    }
    let pool_total: f64 = members
        .iter()
        .filter_map(|&i| weights.get(i))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let equal_share = 1.0 / members.len() as f64;
    let shares: Vec<f64> = members
        .iter()
        .map(|&i| {
            if pool_total > 0.0 {
                weights.get(i).map_or(0.0, |w| w / pool_total)
            } else {
                equal_share
            }
        })
        .collect();
    for (&i, share) in members.iter().zip(shares) {
        if let Some(w) = weights.get_mut(i) {
            *w += bonus * share;
        }
    }
}

/// Redistribute baseline weight into the dual and tri tiers.
///
/// Single-tier, unranked and any further baseline-tier types keep their raw
/// weight. When one of the two pools is empty its share goes to the other;
/// when both are empty (or there is no baseline) the raw weights are
/// returned.
pub fn redistribute_pools(fruit: &[&FruitType], policy: BoostPolicy) -> Vec<f64> {
    let mut weights = raw_weights(fruit);
    let Some(baseline) = baseline_index(fruit) else {
        return weights;
    };
    let members = |tier: ColorTier| -> Vec<usize> {
        fruit
            .iter()
            .enumerate()
            .filter(|(_, f)| f.tier() == tier)
            .map(|(i, _)| i)
            .collect()
    };
    let dual = members(ColorTier::Dual);
    let tri = members(ColorTier::Tri);
    let (dual_share, tri_share) = match (dual.is_empty(), tri.is_empty()) {
        (true, true) => return weights,
        (true, false) => (0.0, 1.0),
        (false, true) => (1.0, 0.0),
        (false, false) => (policy.dual_share, policy.tri_share),
    };

    let stolen = take_from_baseline(&mut weights, baseline, policy.steal);

    distribute(&mut weights, &dual, stolen * dual_share);
    distribute(&mut weights, &tri, stolen * tri_share);
    weights
}

/// Redistribute `magnitude` of the baseline weight across every
/// non-baseline type.
///
/// Returns the raw weights when there is no baseline or no non-baseline
/// type.
pub fn redistribute_simple(fruit: &[&FruitType], magnitude: f64) -> Vec<f64> {
    let mut weights = raw_weights(fruit);
    let Some(baseline) = baseline_index(fruit) else {
        return weights;
    };
    let specials: Vec<usize> = fruit
        .iter()
        .enumerate()
        .filter(|(_, f)| f.tier() != ColorTier::Baseline)
        .map(|(i, _)| i)
        .collect();
    if specials.is_empty() {
        return weights;
    }
    let stolen = take_from_baseline(&mut weights, baseline, magnitude);
    distribute(&mut weights, &specials, stolen);
    weights
}

/// Selection weights for `fruit` under the plot's active effects at `now`.
pub fn selection_weights(fruit: &[&FruitType], effects: &PlotEffects, now: DateTime<Utc>) -> Vec<f64> {
    if effects.active(BoostKind::TriColorBoost, now).is_some() {
        redistribute_pools(fruit, BoostPolicy::TRI)
    } else if effects.active(BoostKind::DualColorBoost, now).is_some() {
        redistribute_pools(fruit, BoostPolicy::DUAL)
    } else if let Some(boost) = effects.active(BoostKind::FruitColorBoost, now) {
        redistribute_simple(fruit, boost.magnitude)
    } else {
        raw_weights(fruit)
    }
}

// ---------------------------------------------------------------------------
// Draws
// ---------------------------------------------------------------------------

/// Draw one fruit type by weight.
///
/// # Errors
///
/// Returns [`WorldError::InvalidSpawnWeights`] if there are no candidates,
/// the weights do not line up with them, or they do not form a positive,
/// finite distribution.
pub fn choose_fruit_type<'a>(
    plant: PlantTypeId,
    fruit: &[&'a FruitType],
    weights: &[f64],
    rng: &mut impl Rng,
) -> Result<&'a FruitType, WorldError> {
    let invalid = || WorldError::InvalidSpawnWeights { plant };
    if fruit.is_empty() || fruit.len() != weights.len() {
        return Err(invalid());
    }
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(invalid());
    }
    let index = WeightedIndex::new(weights).map_err(|_| invalid())?;
    fruit.get(index.sample(rng)).copied().ok_or_else(invalid)
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Roll a fruit mass, applying an active size boost.
///
/// The base roll is uniform over the configured range and rounded to one
/// decimal; a size boost scales it by `1 + magnitude` and the result is
/// rounded again.
pub fn roll_weight(
    effects: &PlotEffects,
    rules: &SpawnRules,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> f64 {
    let low = rules.min_weight.min(rules.max_weight);
    let high = rules.min_weight.max(rules.max_weight);
    let base = round_to_tenth(rng.random_range(low..=high));
    effects
        .active(BoostKind::FruitSizeBoost, now)
        .map_or(base, |boost| round_to_tenth(base * (1.0 + boost.magnitude)))
}

/// Produce a new fruit for `plot`.
///
/// The plot itself is not modified; the caller persists the fruit and then
/// stamps the plot's spawn time.
///
/// # Errors
///
/// Returns [`WorldError::InvalidSpawnWeights`] when no fruit type can be
/// drawn for the plant.
pub fn spawn_fruit(
    plot: &Plot,
    plant: &PlantType,
    candidates: &[&FruitType],
    rules: &SpawnRules,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<Fruit, WorldError> {
    let weights = selection_weights(candidates, &plot.effects, now);
    let chosen = choose_fruit_type(plant.id, candidates, &weights, rng)?;
    let weight = roll_weight(&plot.effects, rules, now, rng);
    Ok(Fruit {
        id: FruitId::new(),
        user_id: plot.user_id,
        plot_id: Some(plot.id),
        fruit_type_id: chosen.id,
        weight,
        harvested: false,
        weather_effects: Vec::new(),
        created_at: now,
    })
}
