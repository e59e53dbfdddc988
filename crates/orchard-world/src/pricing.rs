//! Sale pricing.
//!
//! ```text
//! earned = round(base_price * weight * fruit_multiplier * weather_multiplier)
//! ```
//!
//! Rounding is half-to-even. The weather multiplier depends on how many
//! weather effects the fruit carries: none is neutral, one uses that weather
//! type's own multiplier, and two or more must match a catalog combination
//! exactly (as a set) or fall back to neutral.

use std::collections::BTreeSet;

use orchard_types::{Fruit, WeatherEffect, WeatherId};

use crate::catalog::Catalog;

/// Multiplier contributed by a fruit's weather effects.
pub fn weather_multiplier(catalog: &Catalog, effects: &[WeatherEffect]) -> f64 {
    let ids: BTreeSet<WeatherId> = effects.iter().map(|e| e.weather_id).collect();
    let mut iter = ids.iter();
    match (iter.next(), iter.next()) {
        (None, _) => 1.0,
        (Some(only), None) => catalog.weather(*only).map_or(1.0, |w| w.price_multiplier),
        (Some(_), Some(_)) => catalog
            .combination_for(&ids)
            .map_or(1.0, |c| c.price_multiplier),
    }
}

/// Sale value of `fruit`.
///
/// Returns `None` when the fruit type or its plant is not in the catalog.
#[allow(clippy::cast_possible_truncation)]
pub fn sale_value(catalog: &Catalog, fruit: &Fruit) -> Option<i64> {
    let fruit_type = catalog.fruit_type(fruit.fruit_type_id)?;
    let plant = catalog.plant(fruit_type.plant_type_id)?;
    let raw = plant.base_price
        * fruit.weight
        * fruit_type.price_multiplier
        * weather_multiplier(catalog, &fruit.weather_effects);
    // Saturating float-to-int cast; NaN becomes 0.
    Some(raw.round_ties_even() as i64)
}
