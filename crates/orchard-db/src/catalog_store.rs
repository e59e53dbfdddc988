//! Loading and seeding the catalog tables.
//!
//! The catalog is read once at startup. An empty database is seeded from
//! the built-in starter catalog so a fresh install has something to grow.

use std::collections::BTreeSet;

use orchard_types::{
    CombinationId, ConsumableId, ConsumableType, EffectKind, FruitType, FruitTypeId,
    HarvestBehavior, PlantType, PlantTypeId, WeatherCombination, WeatherId, WeatherType,
};
use orchard_world::{Catalog, starter_catalog};
use sqlx::PgPool;

use crate::error::DbError;

/// Convert a stored `INTEGER` to an unsigned domain value.
pub(crate) fn unsigned(table: &'static str, column: &str, value: i32) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|err| DbError::InvalidRow {
        table,
        reason: format!("{column} {value}: {err}"),
    })
}

/// Convert an unsigned domain value to a stored `INTEGER`.
pub(crate) fn signed(table: &'static str, column: &str, value: u32) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|err| DbError::InvalidRow {
        table,
        reason: format!("{column} {value}: {err}"),
    })
}

/// Operations on the catalog tables.
pub struct CatalogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogStore<'a> {
    /// Create a catalog store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read every catalog table into a [`Catalog`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails,
    /// [`DbError::InvalidRow`] for values outside their domain, or
    /// [`DbError::Catalog`] for duplicate ids.
    pub async fn load(&self) -> Result<Catalog, DbError> {
        let plants = sqlx::query_as::<_, PlantRow>(
            r"SELECT id, name, base_price, seed_price, max_growth_stage,
                     growth_time_per_stage_seconds, harvest_behavior
              FROM plant_types ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(PlantType::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let fruit = sqlx::query_as::<_, FruitTypeRow>(
            r"SELECT id, plant_type_id, color_name, color_tag, rarity_weight, price_multiplier
              FROM fruit_types ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(FruitType::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let consumables = sqlx::query_as::<_, ConsumableRow>(
            "SELECT id, name, price, effect, magnitude FROM consumable_types ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(ConsumableType::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let weather = sqlx::query_as::<_, WeatherRow>(
            r"SELECT id, name, spawn_probability, stick_probability, price_multiplier
              FROM weather_types ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(WeatherType::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let combinations = sqlx::query_as::<_, CombinationRow>(
            "SELECT id, weather_ids, price_multiplier FROM weather_combinations ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(WeatherCombination::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let catalog = Catalog::new(plants, fruit, consumables, weather, combinations)?;
        let [plants, fruit, consumables, weather, combinations] = catalog.counts();
        tracing::info!(plants, fruit, consumables, weather, combinations, "Catalog loaded");
        Ok(catalog)
    }

    /// Write every record of `catalog`, leaving existing ids untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an insert fails. Either every
    /// record is written or none are.
    pub async fn seed(&self, catalog: &Catalog) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for plant in catalog.plant_types() {
            sqlx::query(
                r"INSERT INTO plant_types
                  (id, name, base_price, seed_price, max_growth_stage, growth_time_per_stage_seconds, harvest_behavior)
                  VALUES ($1, $2, $3, $4, $5, $6, $7)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(signed("plant_types", "id", plant.id.get())?)
            .bind(&plant.name)
            .bind(plant.base_price)
            .bind(plant.seed_price)
            .bind(signed("plant_types", "max_growth_stage", plant.max_growth_stage)?)
            .bind(signed(
                "plant_types",
                "growth_time_per_stage_seconds",
                plant.growth_time_per_stage_seconds,
            )?)
            .bind(plant.harvest_behavior.as_str())
            .execute(&mut *tx)
            .await?;
        }

        for fruit in catalog.fruit_types() {
            sqlx::query(
                r"INSERT INTO fruit_types
                  (id, plant_type_id, color_name, color_tag, rarity_weight, price_multiplier)
                  VALUES ($1, $2, $3, $4, $5, $6)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(signed("fruit_types", "id", fruit.id.get())?)
            .bind(signed("fruit_types", "plant_type_id", fruit.plant_type_id.get())?)
            .bind(&fruit.color_name)
            .bind(&fruit.color_tag)
            .bind(fruit.rarity_weight)
            .bind(fruit.price_multiplier)
            .execute(&mut *tx)
            .await?;
        }

        for item in catalog.consumables() {
            sqlx::query(
                r"INSERT INTO consumable_types (id, name, price, effect, magnitude)
                  VALUES ($1, $2, $3, $4, $5)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(signed("consumable_types", "id", item.id.get())?)
            .bind(&item.name)
            .bind(item.price)
            .bind(item.effect.as_str())
            .bind(item.magnitude)
            .execute(&mut *tx)
            .await?;
        }

        for weather in catalog.weather_types() {
            sqlx::query(
                r"INSERT INTO weather_types (id, name, spawn_probability, stick_probability, price_multiplier)
                  VALUES ($1, $2, $3, $4, $5)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(signed("weather_types", "id", weather.id.get())?)
            .bind(&weather.name)
            .bind(weather.spawn_probability)
            .bind(weather.stick_probability)
            .bind(weather.price_multiplier)
            .execute(&mut *tx)
            .await?;
        }

        for combo in catalog.combinations() {
            let ids = combo
                .weather_ids
                .iter()
                .map(|id| signed("weather_combinations", "weather_ids", id.get()))
                .collect::<Result<Vec<_>, _>>()?;
            sqlx::query(
                r"INSERT INTO weather_combinations (id, weather_ids, price_multiplier)
                  VALUES ($1, $2, $3)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(signed("weather_combinations", "id", combo.id.get())?)
            .bind(&ids)
            .bind(combo.price_multiplier)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Catalog seeded");
        Ok(())
    }

    /// Load the stored catalog, seeding the starter catalog first if the
    /// database has no plants.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if loading or seeding fails.
    pub async fn load_or_seed(&self) -> Result<Catalog, DbError> {
        let catalog = self.load().await?;
        if !catalog.is_empty() {
            return Ok(catalog);
        }
        tracing::warn!("Catalog tables are empty, seeding the starter catalog");
        self.seed(&starter_catalog()?).await?;
        self.load().await
    }
}

// =============================================================================
// Row types
// =============================================================================

/// A row from the `plant_types` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlantRow {
    /// Plant id.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Base sale price per unit of mass.
    pub base_price: f64,
    /// Seed cost.
    pub seed_price: i64,
    /// Final growth stage.
    pub max_growth_stage: i32,
    /// Seconds per stage.
    pub growth_time_per_stage_seconds: i32,
    /// `single_harvest` or `perennial`.
    pub harvest_behavior: String,
}

impl TryFrom<PlantRow> for PlantType {
    type Error = DbError;

    fn try_from(row: PlantRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "plant_types";
        let harvest_behavior =
            HarvestBehavior::parse(&row.harvest_behavior).ok_or_else(|| DbError::InvalidRow {
                table: TABLE,
                reason: format!("unknown harvest behaviour `{}`", row.harvest_behavior),
            })?;
        Ok(Self {
            id: PlantTypeId(unsigned(TABLE, "id", row.id)?),
            name: row.name,
            base_price: row.base_price,
            seed_price: row.seed_price,
            max_growth_stage: unsigned(TABLE, "max_growth_stage", row.max_growth_stage)?,
            growth_time_per_stage_seconds: unsigned(
                TABLE,
                "growth_time_per_stage_seconds",
                row.growth_time_per_stage_seconds,
            )?,
            harvest_behavior,
        })
    }
}

/// A row from the `fruit_types` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FruitTypeRow {
    /// Fruit type id.
    pub id: i32,
    /// Producing plant.
    pub plant_type_id: i32,
    /// Display name.
    pub color_name: String,
    /// Colour tag that decides the rarity tier.
    pub color_tag: String,
    /// Relative spawn weight.
    pub rarity_weight: f64,
    /// Sale price multiplier.
    pub price_multiplier: f64,
}

impl TryFrom<FruitTypeRow> for FruitType {
    type Error = DbError;

    fn try_from(row: FruitTypeRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "fruit_types";
        Ok(Self {
            id: FruitTypeId(unsigned(TABLE, "id", row.id)?),
            plant_type_id: PlantTypeId(unsigned(TABLE, "plant_type_id", row.plant_type_id)?),
            color_name: row.color_name,
            color_tag: row.color_tag,
            rarity_weight: row.rarity_weight,
            price_multiplier: row.price_multiplier,
        })
    }
}

/// A row from the `consumable_types` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConsumableRow {
    /// Consumable id.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Shop price.
    pub price: i64,
    /// Stored effect kind.
    pub effect: String,
    /// Effect strength.
    pub magnitude: f64,
}

impl TryFrom<ConsumableRow> for ConsumableType {
    type Error = DbError;

    fn try_from(row: ConsumableRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "consumable_types";
        let effect = EffectKind::parse(&row.effect).ok_or_else(|| DbError::InvalidRow {
            table: TABLE,
            reason: format!("unknown effect `{}`", row.effect),
        })?;
        Ok(Self {
            id: ConsumableId(unsigned(TABLE, "id", row.id)?),
            name: row.name,
            price: row.price,
            effect,
            magnitude: row.magnitude,
        })
    }
}

/// A row from the `weather_types` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeatherRow {
    /// Weather id.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Chance of becoming ambient on a refresh.
    pub spawn_probability: f64,
    /// Chance of sticking to a fruit per update.
    pub stick_probability: f64,
    /// Sale multiplier on its own.
    pub price_multiplier: f64,
}

impl TryFrom<WeatherRow> for WeatherType {
    type Error = DbError;

    fn try_from(row: WeatherRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: WeatherId(unsigned("weather_types", "id", row.id)?),
            name: row.name,
            spawn_probability: row.spawn_probability,
            stick_probability: row.stick_probability,
            price_multiplier: row.price_multiplier,
        })
    }
}

/// A row from the `weather_combinations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CombinationRow {
    /// Combination id.
    pub id: i32,
    /// Member weather ids.
    pub weather_ids: Vec<i32>,
    /// Sale multiplier when a fruit carries exactly these weathers.
    pub price_multiplier: f64,
}

impl TryFrom<CombinationRow> for WeatherCombination {
    type Error = DbError;

    fn try_from(row: CombinationRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "weather_combinations";
        let weather_ids = row
            .weather_ids
            .into_iter()
            .map(|id| unsigned(TABLE, "weather_ids", id).map(WeatherId))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            id: CombinationId(unsigned(TABLE, "id", row.id)?),
            weather_ids,
            price_multiplier: row.price_multiplier,
        })
    }
}
