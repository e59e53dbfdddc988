//! The immutable catalog: every lookup table the rules consult.
//!
//! Built once at startup (from the database or the starter catalog) and then
//! shared by reference. Nothing in the engine mutates it.

use std::collections::{BTreeMap, BTreeSet};

use orchard_types::{
    CombinationId, ConsumableId, ConsumableType, FruitType, FruitTypeId, PlantType, PlantTypeId,
    WeatherCombination, WeatherId, WeatherType,
};

use crate::error::WorldError;

/// All catalog records, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    plant_types: BTreeMap<PlantTypeId, PlantType>,
    fruit_types: BTreeMap<FruitTypeId, FruitType>,
    consumables: BTreeMap<ConsumableId, ConsumableType>,
    weather_types: BTreeMap<WeatherId, WeatherType>,
    combinations: BTreeMap<CombinationId, WeatherCombination>,
}

/// Insert each record into `map`, rejecting repeated keys.
fn index<K, V>(
    records: Vec<V>,
    table: &'static str,
    key: impl Fn(&V) -> K,
    raw: impl Fn(K) -> u32,
) -> Result<BTreeMap<K, V>, WorldError>
where
    K: Ord + Copy,
{
    let mut map = BTreeMap::new();
    for record in records {
        let id = key(&record);
        if map.insert(id, record).is_some() {
            return Err(WorldError::DuplicateCatalogEntry { table, id: raw(id) });
        }
    }
    Ok(map)
}

impl Catalog {
    /// Build a catalog from raw record lists.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateCatalogEntry`] if two records in the
    /// same table share an id.
    pub fn new(
        plant_types: Vec<PlantType>,
        fruit_types: Vec<FruitType>,
        consumables: Vec<ConsumableType>,
        weather_types: Vec<WeatherType>,
        combinations: Vec<WeatherCombination>,
    ) -> Result<Self, WorldError> {
        Ok(Self {
            plant_types: index(plant_types, "plant type", |p| p.id, PlantTypeId::get)?,
            fruit_types: index(fruit_types, "fruit type", |f| f.id, FruitTypeId::get)?,
            consumables: index(consumables, "consumable", |c| c.id, ConsumableId::get)?,
            weather_types: index(weather_types, "weather type", |w| w.id, WeatherId::get)?,
            combinations: index(
                combinations,
                "weather combination",
                |c| c.id,
                CombinationId::get,
            )?,
        })
    }

    /// Look up a plant type.
    pub fn plant(&self, id: PlantTypeId) -> Option<&PlantType> {
        self.plant_types.get(&id)
    }

    /// Look up a fruit type.
    pub fn fruit_type(&self, id: FruitTypeId) -> Option<&FruitType> {
        self.fruit_types.get(&id)
    }

    /// Look up a consumable.
    pub fn consumable(&self, id: ConsumableId) -> Option<&ConsumableType> {
        self.consumables.get(&id)
    }

    /// Look up a weather type.
    pub fn weather(&self, id: WeatherId) -> Option<&WeatherType> {
        self.weather_types.get(&id)
    }

    /// All weather types in id order.
    pub fn weather_types(&self) -> impl Iterator<Item = &WeatherType> {
        self.weather_types.values()
    }

    /// All plant types in id order.
    pub fn plant_types(&self) -> impl Iterator<Item = &PlantType> {
        self.plant_types.values()
    }

    /// All fruit types in id order.
    pub fn fruit_types(&self) -> impl Iterator<Item = &FruitType> {
        self.fruit_types.values()
    }

    /// All consumables in id order.
    pub fn consumables(&self) -> impl Iterator<Item = &ConsumableType> {
        self.consumables.values()
    }

    /// All weather combinations in id order.
    pub fn combinations(&self) -> impl Iterator<Item = &WeatherCombination> {
        self.combinations.values()
    }

    /// The fruit types a plant can produce, in id order.
    pub fn fruit_types_for(&self, plant: PlantTypeId) -> Vec<&FruitType> {
        self.fruit_types
            .values()
            .filter(|f| f.plant_type_id == plant)
            .collect()
    }

    /// The combination whose weather set equals `weather_ids` exactly.
    pub fn combination_for(&self, weather_ids: &BTreeSet<WeatherId>) -> Option<&WeatherCombination> {
        self.combinations
            .values()
            .find(|c| &c.weather_ids == weather_ids)
    }

    /// Whether the catalog has no plants (nothing can be grown).
    pub fn is_empty(&self) -> bool {
        self.plant_types.is_empty()
    }

    /// Number of records per table: plants, fruit, consumables, weather,
    /// combinations.
    pub fn counts(&self) -> [usize; 5] {
        [
            self.plant_types.len(),
            self.fruit_types.len(),
            self.consumables.len(),
            self.weather_types.len(),
            self.combinations.len(),
        ]
    }
}
