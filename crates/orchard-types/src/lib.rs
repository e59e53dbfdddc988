//! Shared type definitions for the Orchard farming simulation.
//!
//! This crate is the single source of truth for the records exchanged
//! between the engine, the storage layer and the outer request handlers.
//! Types flow to `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers (UUID for player data, `u32` for catalog keys)
//! - [`enums`] -- Harvest behaviours, consumable effect kinds, colour tiers
//! - [`catalog`] -- Immutable catalog records (plants, fruit, consumables, weather)
//! - [`structs`] -- Mutable per-farmer records (plots, fruit, attached effects)
//! - [`effects`] -- Tagged storage codec for effect lists

pub mod catalog;
pub mod effects;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use catalog::{ConsumableType, FruitType, PlantType, WeatherCombination, WeatherType};
pub use effects::{
    EffectCodecError, EffectRecord, decode_plot_effects, decode_weather_effects,
    encode_plot_effects, encode_weather_effects, records_from_json, records_to_json,
};
pub use enums::{BoostKind, ColorTier, EffectKind, HarvestBehavior};
pub use ids::{CombinationId, ConsumableId, FruitId, FruitTypeId, PlantTypeId, PlotId, UserId, WeatherId};
pub use structs::{
    Farmer, Fruit, Plot, PlotEffects, TimedEffect, WEATHER_EFFECT_DURATION_SECONDS, WeatherEffect,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the files under `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::UserId::export_all();
        let _ = crate::ids::PlotId::export_all();
        let _ = crate::ids::FruitId::export_all();
        let _ = crate::ids::PlantTypeId::export_all();
        let _ = crate::ids::FruitTypeId::export_all();
        let _ = crate::ids::ConsumableId::export_all();
        let _ = crate::ids::WeatherId::export_all();
        let _ = crate::ids::CombinationId::export_all();

        // Enums
        let _ = crate::enums::HarvestBehavior::export_all();
        let _ = crate::enums::EffectKind::export_all();
        let _ = crate::enums::BoostKind::export_all();
        let _ = crate::enums::ColorTier::export_all();

        // Catalog
        let _ = crate::catalog::PlantType::export_all();
        let _ = crate::catalog::FruitType::export_all();
        let _ = crate::catalog::ConsumableType::export_all();
        let _ = crate::catalog::WeatherType::export_all();
        let _ = crate::catalog::WeatherCombination::export_all();

        // Farm records
        let _ = crate::structs::Farmer::export_all();
        let _ = crate::structs::TimedEffect::export_all();
        let _ = crate::structs::PlotEffects::export_all();
        let _ = crate::structs::Plot::export_all();
        let _ = crate::structs::WeatherEffect::export_all();
        let _ = crate::structs::Fruit::export_all();
        let _ = crate::effects::EffectRecord::export_all();
    }
}
