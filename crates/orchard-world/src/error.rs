//! Error types for the `orchard-world` crate.

use orchard_types::{ConsumableId, FruitTypeId, PlantTypeId, PlotId, WeatherId};

/// Errors raised by the simulation rules.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A plant type id is not in the catalog.
    #[error("unknown plant type: {0}")]
    UnknownPlantType(PlantTypeId),

    /// A fruit type id is not in the catalog.
    #[error("unknown fruit type: {0}")]
    UnknownFruitType(FruitTypeId),

    /// A weather id is not in the catalog.
    #[error("unknown weather type: {0}")]
    UnknownWeather(WeatherId),

    /// A consumable id is not in the catalog.
    #[error("unknown consumable: {0}")]
    UnknownConsumable(ConsumableId),

    /// The operation needs a planted crop.
    #[error("plot {0} has nothing planted")]
    PlotNotPlanted(PlotId),

    /// No positive-sum weight vector exists for the plant's fruit types.
    #[error("no valid spawn weights for plant type {plant}")]
    InvalidSpawnWeights {
        /// The plant whose fruit could not be chosen.
        plant: PlantTypeId,
    },

    /// Two catalog records share a key.
    #[error("duplicate {table} id: {id}")]
    DuplicateCatalogEntry {
        /// The catalog table.
        table: &'static str,
        /// The repeated key.
        id: u32,
    },
}
