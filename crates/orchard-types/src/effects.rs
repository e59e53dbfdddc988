//! Storage codec for effect lists.
//!
//! Both a fruit's weather effects and a plot's timed consumable effects are
//! persisted as an ordered list of [`EffectRecord`]s, serialized as JSON
//! objects tagged by `kind`:
//!
//! ```json
//! [
//!   {"kind": "weather", "weather_id": 2, "applied_at": "2025-06-01T12:00:00Z", "duration_seconds": 120},
//!   {"kind": "fruit_size_boost", "expiry": "2025-06-01T12:10:00Z", "value": 0.5}
//! ]
//! ```
//!
//! Timestamps are RFC 3339 with full sub-second precision and floats use the
//! shortest round-trip form, so a decode of an encode returns the exact
//! input. Plot effect lists are written in [`BoostKind`] order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BoostKind;
use crate::ids::WeatherId;
use crate::structs::{PlotEffects, TimedEffect, WeatherEffect};

/// Errors raised while decoding stored effect lists.
#[derive(Debug, thiserror::Error)]
pub enum EffectCodecError {
    /// The stored payload is not valid JSON for an effect list.
    #[error("malformed effect list: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A record of the wrong family appeared in the list.
    #[error("unexpected `{found}` record in a {list} effect list")]
    UnexpectedKind {
        /// Kind tag of the offending record.
        found: &'static str,
        /// Which list was being decoded.
        list: &'static str,
    },
}

/// One persisted effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectRecord {
    /// A weather effect on a fruit.
    Weather {
        /// The weather that stuck.
        weather_id: WeatherId,
        /// When it stuck.
        applied_at: DateTime<Utc>,
        /// How long it lasts.
        duration_seconds: u32,
    },
    /// A size boost on a plot.
    FruitSizeBoost {
        /// End of the effect.
        expiry: DateTime<Utc>,
        /// Magnitude.
        value: f64,
    },
    /// A simple colour boost on a plot.
    FruitColorBoost {
        /// End of the effect.
        expiry: DateTime<Utc>,
        /// Magnitude.
        value: f64,
    },
    /// A dual-colour boost on a plot.
    DualColorBoost {
        /// End of the effect.
        expiry: DateTime<Utc>,
        /// Magnitude.
        value: f64,
    },
    /// A tri-colour boost on a plot.
    TriColorBoost {
        /// End of the effect.
        expiry: DateTime<Utc>,
        /// Magnitude.
        value: f64,
    },
}

impl EffectRecord {
    /// The `kind` tag this record serializes with.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Weather { .. } => "weather",
            Self::FruitSizeBoost { .. } => "fruit_size_boost",
            Self::FruitColorBoost { .. } => "fruit_color_boost",
            Self::DualColorBoost { .. } => "dual_color_boost",
            Self::TriColorBoost { .. } => "tri_color_boost",
        }
    }

    const fn from_boost(kind: BoostKind, effect: TimedEffect) -> Self {
        let expiry = effect.expires_at;
        let value = effect.magnitude;
        match kind {
            BoostKind::FruitSizeBoost => Self::FruitSizeBoost { expiry, value },
            BoostKind::FruitColorBoost => Self::FruitColorBoost { expiry, value },
            BoostKind::DualColorBoost => Self::DualColorBoost { expiry, value },
            BoostKind::TriColorBoost => Self::TriColorBoost { expiry, value },
        }
    }
}

// ---------------------------------------------------------------------------
// Fruit weather effects
// ---------------------------------------------------------------------------

/// Encode a fruit's weather effects, preserving order.
pub fn encode_weather_effects(effects: &[WeatherEffect]) -> Vec<EffectRecord> {
    effects
        .iter()
        .map(|e| EffectRecord::Weather {
            weather_id: e.weather_id,
            applied_at: e.applied_at,
            duration_seconds: e.duration_seconds,
        })
        .collect()
}

/// Decode a fruit's weather effects.
///
/// # Errors
///
/// Returns [`EffectCodecError::UnexpectedKind`] if a plot boost record is
/// present.
pub fn decode_weather_effects(
    records: &[EffectRecord],
) -> Result<Vec<WeatherEffect>, EffectCodecError> {
    records
        .iter()
        .map(|record| match *record {
            EffectRecord::Weather {
                weather_id,
                applied_at,
                duration_seconds,
            } => Ok(WeatherEffect {
                weather_id,
                applied_at,
                duration_seconds,
            }),
            other => Err(EffectCodecError::UnexpectedKind {
                found: other.kind(),
                list: "weather",
            }),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Plot effects
// ---------------------------------------------------------------------------

/// Encode a plot's timed effects in [`BoostKind`] order.
pub fn encode_plot_effects(effects: &PlotEffects) -> Vec<EffectRecord> {
    effects
        .iter()
        .map(|(kind, effect)| EffectRecord::from_boost(*kind, *effect))
        .collect()
}

/// Decode a plot's timed effects. A later record of the same kind replaces
/// an earlier one.
///
/// # Errors
///
/// Returns [`EffectCodecError::UnexpectedKind`] if a weather record is
/// present.
pub fn decode_plot_effects(records: &[EffectRecord]) -> Result<PlotEffects, EffectCodecError> {
    let mut effects = PlotEffects::new();
    for record in records {
        let (kind, expires_at, magnitude) = match *record {
            EffectRecord::FruitSizeBoost { expiry, value } => {
                (BoostKind::FruitSizeBoost, expiry, value)
            }
            EffectRecord::FruitColorBoost { expiry, value } => {
                (BoostKind::FruitColorBoost, expiry, value)
            }
            EffectRecord::DualColorBoost { expiry, value } => {
                (BoostKind::DualColorBoost, expiry, value)
            }
            EffectRecord::TriColorBoost { expiry, value } => {
                (BoostKind::TriColorBoost, expiry, value)
            }
            EffectRecord::Weather { .. } => {
                return Err(EffectCodecError::UnexpectedKind {
                    found: record.kind(),
                    list: "plot",
                });
            }
        };
        effects.set(
            kind,
            TimedEffect {
                expires_at,
                magnitude,
            },
        );
    }
    Ok(effects)
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Serialize a record list to a JSON value for a `JSONB` column.
///
/// # Errors
///
/// Returns [`EffectCodecError::Malformed`] if serialization fails.
pub fn records_to_json(records: &[EffectRecord]) -> Result<serde_json::Value, EffectCodecError> {
    Ok(serde_json::to_value(records)?)
}

/// Parse a record list from a JSON value. `null` decodes as empty.
///
/// # Errors
///
/// Returns [`EffectCodecError::Malformed`] if the value is not a record list.
pub fn records_from_json(value: serde_json::Value) -> Result<Vec<EffectRecord>, EffectCodecError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}
