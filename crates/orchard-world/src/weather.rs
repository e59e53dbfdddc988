//! Ambient weather and per-fruit weather effects.
//!
//! # Ambient weather
//!
//! A single global set of active weather types, rerolled at most once per
//! calendar minute and only on minutes divisible by the refresh cadence.
//! Each weather type joins the set through an independent Bernoulli trial
//! with its spawn probability.
//!
//! # Per-fruit effects
//!
//! Every unharvested fruit hanging on a plot carries a list of weather
//! effects. Expired effects are dropped, then each ambient weather type the
//! fruit does not already carry gets one Bernoulli trial with its stick
//! probability. Effects are never refreshed in place, so a fruit can hold at
//! most one effect per weather type.

use std::collections::BTreeSet;

use chrono::{DateTime, Timelike, Utc};
use orchard_types::{WeatherEffect, WeatherId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Catalog;

/// Timing rules for the weather systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherRules {
    /// Ambient weather is rerolled only on minutes divisible by this value.
    pub refresh_cadence_minutes: u32,
    /// Lifetime of a weather effect once it sticks to a fruit.
    pub effect_duration_seconds: u32,
}

impl Default for WeatherRules {
    fn default() -> Self {
        Self {
            refresh_cadence_minutes: 5,
            effect_duration_seconds: orchard_types::WEATHER_EFFECT_DURATION_SECONDS,
        }
    }
}

/// The global ambient weather, owned by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherState {
    /// Weather types currently active.
    pub active: BTreeSet<WeatherId>,
    /// The calendar minute of the last reroll, truncated to the minute.
    pub last_refreshed_minute: Option<DateTime<Utc>>,
}

impl WeatherState {
    /// A state with no weather and no refresh recorded.
    pub const fn new() -> Self {
        Self {
            active: BTreeSet::new(),
            last_refreshed_minute: None,
        }
    }
}

/// `now` truncated to the start of its calendar minute.
pub fn minute_of(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

/// Whether `now` falls on a refresh minute not yet handled by `state`.
pub fn is_refresh_due(state: &WeatherState, rules: &WeatherRules, now: DateTime<Utc>) -> bool {
    let cadence = rules.refresh_cadence_minutes.max(1);
    if !now.minute().is_multiple_of(cadence) {
        return false;
    }
    state.last_refreshed_minute != Some(minute_of(now))
}

/// Independent Bernoulli trial. Out-of-range probabilities saturate.
fn trial(rng: &mut impl Rng, probability: f64) -> bool {
    rng.random::<f64>() < probability
}

/// Reroll the ambient weather if a refresh is due.
///
/// Returns `true` when the state was rerolled (even if the new set equals
/// the old one).
pub fn refresh_ambient(
    state: &mut WeatherState,
    catalog: &Catalog,
    rules: &WeatherRules,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> bool {
    if !is_refresh_due(state, rules, now) {
        return false;
    }
    state.active = catalog
        .weather_types()
        .filter(|w| trial(rng, w.spawn_probability))
        .map(|w| w.id)
        .collect();
    state.last_refreshed_minute = Some(minute_of(now));
    info!(
        minute = %minute_of(now),
        active = ?state.active,
        "Ambient weather refreshed"
    );
    true
}

/// Drop effects whose age has reached their duration.
///
/// Returns `true` if anything was removed.
pub fn expire_effects(effects: &mut Vec<WeatherEffect>, now: DateTime<Utc>) -> bool {
    let before = effects.len();
    effects.retain(|effect| !effect.is_expired(now));
    effects.len() != before
}

/// Expire old effects on one fruit and roll new ones from the ambient set.
///
/// Weather ids that are not in the catalog are ignored. Returns `true` when
/// the list changed and must be written back.
pub fn accumulate(
    effects: &mut Vec<WeatherEffect>,
    ambient: &BTreeSet<WeatherId>,
    catalog: &Catalog,
    rules: &WeatherRules,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> bool {
    let mut changed = expire_effects(effects, now);
    let present: BTreeSet<WeatherId> = effects.iter().map(|e| e.weather_id).collect();
    for weather_id in ambient.difference(&present) {
        let Some(weather) = catalog.weather(*weather_id) else {
            continue;
        };
        if trial(rng, weather.stick_probability) {
            effects.push(WeatherEffect {
                weather_id: *weather_id,
                applied_at: now,
                duration_seconds: rules.effect_duration_seconds,
            });
            changed = true;
        }
    }
    changed
}
