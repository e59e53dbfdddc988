//! Built-in starter catalog.
//!
//! Four plants (two single-harvest, two perennial), five colour variants per
//! plant covering every rarity tier, one consumable of each effect kind, five
//! weather types and four weather combinations. Used when the database
//! catalog is empty and as the fixture for tests.

use std::collections::BTreeSet;

use orchard_types::{
    CombinationId, ConsumableId, ConsumableType, EffectKind, FruitType, FruitTypeId,
    HarvestBehavior, PlantType, PlantTypeId, WeatherCombination, WeatherId, WeatherType,
};

use crate::catalog::Catalog;
use crate::error::WorldError;

/// Colour variants shared by every starter plant:
/// `(id suffix, colour name, colour tag, rarity weight, price multiplier)`.
const COLOR_VARIANTS: [(u32, &str, &str, f64, f64); 5] = [
    (1, "Common", "normal", 100.0, 1.0),
    (2, "Golden", "gold", 10.0, 2.0),
    (3, "Crimson", "crimson", 8.0, 1.8),
    (4, "Gold-Crimson", "gold_crimson", 4.0, 4.0),
    (5, "Prismatic", "gold_crimson_azure", 1.0, 10.0),
];

fn plant(
    id: u32,
    name: &str,
    base_price: f64,
    seed_price: i64,
    max_growth_stage: u32,
    growth_time_per_stage_seconds: u32,
    harvest_behavior: HarvestBehavior,
) -> PlantType {
    PlantType {
        id: PlantTypeId(id),
        name: name.to_owned(),
        base_price,
        seed_price,
        max_growth_stage,
        growth_time_per_stage_seconds,
        harvest_behavior,
    }
}

fn plants() -> Vec<PlantType> {
    vec![
        plant(1, "Carrot", 2.0, 15, 4, 90, HarvestBehavior::SingleHarvest),
        plant(2, "Pumpkin", 3.5, 60, 6, 180, HarvestBehavior::SingleHarvest),
        plant(3, "Apple Tree", 1.0, 250, 20, 120, HarvestBehavior::Perennial),
        plant(4, "Grape Vine", 1.4, 400, 18, 90, HarvestBehavior::Perennial),
    ]
}

fn fruit_types(plants: &[PlantType]) -> Vec<FruitType> {
    let mut out = Vec::new();
    for plant in plants {
        for (suffix, color_name, color_tag, rarity_weight, price_multiplier) in COLOR_VARIANTS {
            let id = plant
                .id
                .get()
                .saturating_mul(10)
                .saturating_add(suffix);
            out.push(FruitType {
                id: FruitTypeId(id),
                plant_type_id: plant.id,
                color_name: format!("{color_name} {}", plant.name),
                color_tag: color_tag.to_owned(),
                rarity_weight,
                price_multiplier,
            });
        }
    }
    out
}

fn consumables() -> Vec<ConsumableType> {
    let item = |id: u32, name: &str, price: i64, effect: EffectKind, magnitude: f64| {
        ConsumableType {
            id: ConsumableId(id),
            name: name.to_owned(),
            price,
            effect,
            magnitude,
        }
    };
    vec![
        item(1, "Quick-Grow", 50, EffectKind::GrowthBoost, 0.5),
        item(2, "Bulk Feed", 120, EffectKind::FruitSizeBoost, 0.5),
        item(3, "Colour Dust", 150, EffectKind::FruitColorBoost, 0.3),
        item(4, "Twin Bloom", 400, EffectKind::DualColorBoost, 1.0),
        item(5, "Prism Bloom", 900, EffectKind::TriColorBoost, 1.0),
    ]
}

fn weather_types() -> Vec<WeatherType> {
    let weather = |id: u32, name: &str, spawn: f64, stick: f64, price: f64| WeatherType {
        id: WeatherId(id),
        name: name.to_owned(),
        spawn_probability: spawn,
        stick_probability: stick,
        price_multiplier: price,
    };
    vec![
        weather(1, "Sunny", 0.5, 0.3, 1.1),
        weather(2, "Rain", 0.3, 0.25, 1.2),
        weather(3, "Frost", 0.1, 0.2, 1.5),
        weather(4, "Thunder", 0.05, 0.15, 2.0),
        weather(5, "Rainbow", 0.03, 0.1, 3.0),
    ]
}

fn combinations() -> Vec<WeatherCombination> {
    let combo = |id: u32, ids: &[u32], price: f64| WeatherCombination {
        id: CombinationId(id),
        weather_ids: ids.iter().copied().map(WeatherId).collect::<BTreeSet<_>>(),
        price_multiplier: price,
    };
    vec![
        combo(1, &[1, 2], 1.5),
        combo(2, &[2, 5], 1.8),
        combo(3, &[3, 4], 3.5),
        combo(4, &[1, 2, 5], 5.0),
    ]
}

/// Build the starter catalog.
///
/// # Errors
///
/// Returns [`WorldError::DuplicateCatalogEntry`] only if the built-in tables
/// are edited into an inconsistent state.
pub fn starter_catalog() -> Result<Catalog, WorldError> {
    let plants = plants();
    let fruit = fruit_types(&plants);
    Catalog::new(
        plants,
        fruit,
        consumables(),
        weather_types(),
        combinations(),
    )
}
