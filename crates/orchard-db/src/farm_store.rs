//! [`FarmStore`] over the `farmers`, `plots` and `fruits` tables.
//!
//! Effect lists are stored as `JSONB` arrays of tagged records. Growth
//! writes are conditional on the stored stage, so concurrent updates for
//! the same farmer can only raise it. Spawns and sales run in a transaction
//! that re-checks the plot or fruit state it depends on.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use orchard_core::{FarmStore, StoreError};
use orchard_types::{
    Farmer, Fruit, FruitId, FruitTypeId, PlantTypeId, Plot, PlotEffects, PlotId, UserId,
    WeatherEffect, decode_plot_effects, decode_weather_effects, encode_plot_effects,
    encode_weather_effects, records_from_json, records_to_json,
};
use orchard_world::SpawnGuard;
use orchard_world::weather::minute_of;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::catalog_store::{signed, unsigned};
use crate::error::DbError;

const PLOT_COLUMNS: &str = "id, user_id, plot_number, plant_type_id, growth_stage, planted_at, \
     last_growth_update, growth_boost_seconds, last_spawn_attempt_at, last_harvest_at, effects";

const FRUIT_COLUMNS: &str =
    "id, user_id, plot_id, fruit_type_id, weight, harvested, weather_effects, created_at";

/// `PostgreSQL`-backed farm state.
#[derive(Debug, Clone)]
pub struct PgFarmStore {
    pool: PgPool,
}

impl PgFarmStore {
    /// Create a store over a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a farmer with `plot_count` empty plots numbered from 1.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an insert fails; nothing is written
    /// in that case.
    pub async fn register_farmer(&self, farmer: &Farmer, plot_count: u32) -> Result<Vec<Plot>, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO farmers (id, username, balance) VALUES ($1, $2, $3)")
            .bind(farmer.id.into_inner())
            .bind(&farmer.username)
            .bind(farmer.balance)
            .execute(&mut *tx)
            .await?;

        let mut plots = Vec::new();
        for number in 1..=plot_count {
            let plot = Plot::empty(farmer.id, number);
            sqlx::query("INSERT INTO plots (id, user_id, plot_number) VALUES ($1, $2, $3)")
                .bind(plot.id.into_inner())
                .bind(farmer.id.into_inner())
                .bind(signed("plots", "plot_number", number)?)
                .execute(&mut *tx)
                .await?;
            plots.push(plot);
        }
        tx.commit().await?;
        tracing::info!(user = %farmer.id, plots = plot_count, "Farmer registered");
        Ok(plots)
    }

    async fn fetch_plots(&self, query: &str, user: UserId) -> Result<Vec<Plot>, DbError> {
        sqlx::query_as::<_, PlotRow>(query)
            .bind(user.into_inner())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Plot::try_from)
            .collect()
    }

    async fn fetch_fruit(&self, query: &str, key: Uuid) -> Result<Vec<Fruit>, DbError> {
        sqlx::query_as::<_, FruitRow>(query)
            .bind(key)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Fruit::try_from)
            .collect()
    }

    async fn execute(&self, query: Query<'_, Postgres, PgArguments>) -> Result<u64, DbError> {
        Ok(query.execute(&self.pool).await?.rows_affected())
    }
}

impl FarmStore for PgFarmStore {
    async fn list_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM farmers ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().map(|(id,)| UserId::from(id)).collect())
    }

    async fn user_plots(&self, user: UserId) -> Result<Vec<Plot>, StoreError> {
        let query = format!("SELECT {PLOT_COLUMNS} FROM plots WHERE user_id = $1 ORDER BY plot_number");
        Ok(self.fetch_plots(&query, user).await?)
    }

    async fn planted_plots(&self, user: UserId) -> Result<Vec<Plot>, StoreError> {
        let query = format!(
            "SELECT {PLOT_COLUMNS} FROM plots \
             WHERE user_id = $1 AND plant_type_id IS NOT NULL ORDER BY plot_number"
        );
        Ok(self.fetch_plots(&query, user).await?)
    }

    async fn get_plot(&self, user: UserId, plot: PlotId) -> Result<Option<Plot>, StoreError> {
        let query = format!("SELECT {PLOT_COLUMNS} FROM plots WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, PlotRow>(&query)
            .bind(plot.into_inner())
            .bind(user.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(Plot::try_from).transpose()?)
    }

    async fn update_plot_growth(
        &self,
        plot: PlotId,
        stage: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let stage = signed("plots", "growth_stage", stage)?;
        let changed = self
            .execute(
                sqlx::query(
                    r"UPDATE plots SET growth_stage = $2, last_growth_update = $3
                      WHERE id = $1 AND growth_stage < $2",
                )
                .bind(plot.into_inner())
                .bind(stage)
                .bind(at),
            )
            .await?;
        Ok(changed > 0)
    }

    async fn plot_fruit(&self, plot: PlotId) -> Result<Vec<Fruit>, StoreError> {
        let query = format!(
            "SELECT {FRUIT_COLUMNS} FROM fruits \
             WHERE plot_id = $1 AND NOT harvested ORDER BY created_at"
        );
        Ok(self.fetch_fruit(&query, plot.into_inner()).await?)
    }

    async fn count_plot_fruit(&self, plot: PlotId) -> Result<usize, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM fruits WHERE plot_id = $1 AND NOT harvested")
                .bind(plot.into_inner())
                .fetch_one(&self.pool)
                .await
                .map_err(DbError::from)?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    async fn update_fruit_weather(
        &self,
        fruit: FruitId,
        effects: &[WeatherEffect],
    ) -> Result<(), StoreError> {
        let json = records_to_json(&encode_weather_effects(effects)).map_err(DbError::from)?;
        self.execute(
            sqlx::query("UPDATE fruits SET weather_effects = $2 WHERE id = $1")
                .bind(fruit.into_inner())
                .bind(json),
        )
        .await?;
        Ok(())
    }

    async fn insert_spawned_fruit(
        &self,
        plot: PlotId,
        fruit: &Fruit,
        guard: SpawnGuard,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let json =
            records_to_json(&encode_weather_effects(&fruit.weather_effects)).map_err(DbError::from)?;
        let fruit_type = signed("fruits", "fruit_type_id", fruit.fruit_type_id.get())?;
        let limit = i64::try_from(guard.max_unharvested).unwrap_or(i64::MAX);

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        // Stamping first holds the plot row lock until commit, so a racing
        // spawn on the same plot waits and then sees this one.
        let claimed = sqlx::query(
            r"UPDATE plots SET last_spawn_attempt_at = $2
              WHERE id = $1
                AND (NOT $3
                     OR last_spawn_attempt_at IS NULL
                     OR last_spawn_attempt_at < $4
                     OR last_spawn_attempt_at >= $4 + INTERVAL '1 minute')",
        )
        .bind(plot.into_inner())
        .bind(at)
        .bind(guard.once_per_minute)
        .bind(minute_of(at))
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?
        .rows_affected();
        if claimed == 0 {
            tx.rollback().await.map_err(DbError::from)?;
            return Ok(false);
        }

        let (unharvested,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM fruits WHERE plot_id = $1 AND NOT harvested")
                .bind(plot.into_inner())
                .fetch_one(&mut *tx)
                .await
                .map_err(DbError::from)?;
        if unharvested >= limit {
            tx.rollback().await.map_err(DbError::from)?;
            return Ok(false);
        }

        sqlx::query(
            r"INSERT INTO fruits
              (id, user_id, plot_id, fruit_type_id, weight, harvested, weather_effects, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(fruit.id.into_inner())
        .bind(fruit.user_id.into_inner())
        .bind(plot.into_inner())
        .bind(fruit_type)
        .bind(fruit.weight)
        .bind(fruit.harvested)
        .bind(json)
        .bind(fruit.created_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(true)
    }

    async fn update_plot_effects(
        &self,
        plot: PlotId,
        effects: &PlotEffects,
    ) -> Result<(), StoreError> {
        let json = records_to_json(&encode_plot_effects(effects)).map_err(DbError::from)?;
        self.execute(
            sqlx::query("UPDATE plots SET effects = $2 WHERE id = $1")
                .bind(plot.into_inner())
                .bind(json),
        )
        .await?;
        Ok(())
    }

    async fn add_growth_boost(&self, plot: PlotId, seconds: f64) -> Result<(), StoreError> {
        self.execute(
            sqlx::query("UPDATE plots SET growth_boost_seconds = growth_boost_seconds + $2 WHERE id = $1")
                .bind(plot.into_inner())
                .bind(seconds),
        )
        .await?;
        Ok(())
    }

    async fn plant(
        &self,
        plot: PlotId,
        plant: PlantTypeId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.execute(
            sqlx::query(
                r"UPDATE plots SET
                    plant_type_id = $2, growth_stage = 1, planted_at = $3, last_growth_update = $3,
                    growth_boost_seconds = 0, last_spawn_attempt_at = NULL, last_harvest_at = NULL,
                    effects = '[]'::jsonb
                  WHERE id = $1",
            )
            .bind(plot.into_inner())
            .bind(signed("plots", "plant_type_id", plant.get())?)
            .bind(at),
        )
        .await?;
        Ok(())
    }

    async fn reset_plot(&self, plot: PlotId) -> Result<(), StoreError> {
        self.execute(
            sqlx::query(
                r"UPDATE plots SET
                    plant_type_id = NULL, growth_stage = 0, planted_at = NULL, last_growth_update = NULL,
                    growth_boost_seconds = 0, last_spawn_attempt_at = NULL, last_harvest_at = NULL,
                    effects = '[]'::jsonb
                  WHERE id = $1",
            )
            .bind(plot.into_inner()),
        )
        .await?;
        Ok(())
    }

    async fn harvest_fruit(
        &self,
        fruit: FruitId,
        plot: PlotId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        sqlx::query("UPDATE fruits SET plot_id = NULL WHERE id = $1 AND plot_id = $2")
            .bind(fruit.into_inner())
            .bind(plot.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        sqlx::query("UPDATE plots SET last_harvest_at = $2 WHERE id = $1")
            .bind(plot.into_inner())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn get_fruit(&self, user: UserId, fruit: FruitId) -> Result<Option<Fruit>, StoreError> {
        let query = format!("SELECT {FRUIT_COLUMNS} FROM fruits WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, FruitRow>(&query)
            .bind(fruit.into_inner())
            .bind(user.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(Fruit::try_from).transpose()?)
    }

    async fn inventory_fruit(&self, user: UserId) -> Result<Vec<Fruit>, StoreError> {
        let query = format!(
            "SELECT {FRUIT_COLUMNS} FROM fruits \
             WHERE user_id = $1 AND plot_id IS NULL AND NOT harvested ORDER BY created_at"
        );
        Ok(self.fetch_fruit(&query, user.into_inner()).await?)
    }

    async fn balance(&self, user: UserId) -> Result<Option<i64>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT balance FROM farmers WHERE id = $1")
            .bind(user.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(|(balance,)| balance))
    }

    async fn settle_sale(
        &self,
        user: UserId,
        sales: &[(FruitId, i64)],
    ) -> Result<Vec<FruitId>, StoreError> {
        let mut values = BTreeMap::new();
        for &(id, value) in sales {
            values.entry(id).or_insert(value);
        }
        let ids: Vec<Uuid> = values.keys().copied().map(FruitId::into_inner).collect();

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r"UPDATE fruits SET harvested = TRUE
              WHERE id = ANY($1) AND user_id = $2 AND plot_id IS NULL AND NOT harvested
              RETURNING id",
        )
        .bind(ids)
        .bind(user.into_inner())
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::from)?;
        let sold: Vec<FruitId> = rows.into_iter().map(|(id,)| FruitId::from(id)).collect();
        let earned = sold
            .iter()
            .filter_map(|id| values.get(id))
            .fold(0_i64, |sum, &value| sum.saturating_add(value));

        let credited = sqlx::query("UPDATE farmers SET balance = balance + $2 WHERE id = $1")
            .bind(user.into_inner())
            .bind(earned)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?
            .rows_affected();
        if credited == 0 {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(StoreError::Backend {
                message: format!("no farmer {user}"),
            });
        }
        tx.commit().await.map_err(DbError::from)?;
        tracing::debug!(%user, sold = sold.len(), earned, "Sale settled");
        Ok(sold)
    }

    async fn delete_plot_fruit(&self, plot: PlotId) -> Result<(), StoreError> {
        let deleted = self
            .execute(sqlx::query("DELETE FROM fruits WHERE plot_id = $1").bind(plot.into_inner()))
            .await?;
        tracing::debug!(plot = %plot, deleted, "Plot fruit deleted");
        Ok(())
    }
}

// =============================================================================
// Row types
// =============================================================================

/// A row from the `plots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlotRow {
    /// Plot id.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Slot number on the farm.
    pub plot_number: i32,
    /// Planted crop, if any.
    pub plant_type_id: Option<i32>,
    /// Current stage.
    pub growth_stage: i32,
    /// When the crop was planted.
    pub planted_at: Option<DateTime<Utc>>,
    /// When the stage last changed.
    pub last_growth_update: Option<DateTime<Utc>>,
    /// Credited growth time.
    pub growth_boost_seconds: f64,
    /// Last spawn time.
    pub last_spawn_attempt_at: Option<DateTime<Utc>>,
    /// Last harvest time.
    pub last_harvest_at: Option<DateTime<Utc>>,
    /// Timed effects as stored records.
    pub effects: serde_json::Value,
}

impl TryFrom<PlotRow> for Plot {
    type Error = DbError;

    fn try_from(row: PlotRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "plots";
        Ok(Self {
            id: PlotId::from(row.id),
            user_id: UserId::from(row.user_id),
            plot_number: unsigned(TABLE, "plot_number", row.plot_number)?,
            plant_type_id: row
                .plant_type_id
                .map(|id| unsigned(TABLE, "plant_type_id", id).map(PlantTypeId))
                .transpose()?,
            growth_stage: unsigned(TABLE, "growth_stage", row.growth_stage)?,
            planted_at: row.planted_at,
            last_growth_update: row.last_growth_update,
            growth_boost_seconds: row.growth_boost_seconds,
            last_spawn_attempt_at: row.last_spawn_attempt_at,
            last_harvest_at: row.last_harvest_at,
            effects: decode_plot_effects(&records_from_json(row.effects)?)?,
        })
    }
}

/// A row from the `fruits` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FruitRow {
    /// Fruit id.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Plot the fruit hangs on; `NULL` once harvested.
    pub plot_id: Option<Uuid>,
    /// Fruit type.
    pub fruit_type_id: i32,
    /// Mass.
    pub weight: f64,
    /// Sold flag.
    pub harvested: bool,
    /// Weather effects as stored records.
    pub weather_effects: serde_json::Value,
    /// Spawn time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FruitRow> for Fruit {
    type Error = DbError;

    fn try_from(row: FruitRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FruitId::from(row.id),
            user_id: UserId::from(row.user_id),
            plot_id: row.plot_id.map(PlotId::from),
            fruit_type_id: FruitTypeId(unsigned("fruits", "fruit_type_id", row.fruit_type_id)?),
            weight: row.weight,
            harvested: row.harvested,
            weather_effects: decode_weather_effects(&records_from_json(row.weather_effects)?)?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use orchard_types::{BoostKind, TimedEffect, WeatherId};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn empty_plot_row_converts() {
        let row = PlotRow {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            plot_number: 2,
            plant_type_id: None,
            growth_stage: 0,
            planted_at: None,
            last_growth_update: None,
            growth_boost_seconds: 0.0,
            last_spawn_attempt_at: None,
            last_harvest_at: None,
            effects: serde_json::Value::Null,
        };
        let plot = Plot::try_from(row).unwrap();
        assert!(!plot.is_planted());
        assert!(plot.effects.is_empty());
    }

    #[test]
    fn plot_effects_are_decoded() {
        let mut effects = PlotEffects::new();
        effects.set(
            BoostKind::FruitSizeBoost,
            TimedEffect {
                expires_at: t0(),
                magnitude: 0.5,
            },
        );
        let row = PlotRow {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            plot_number: 1,
            plant_type_id: Some(1),
            growth_stage: 3,
            planted_at: Some(t0()),
            last_growth_update: Some(t0()),
            growth_boost_seconds: 12.5,
            last_spawn_attempt_at: None,
            last_harvest_at: None,
            effects: records_to_json(&encode_plot_effects(&effects)).unwrap(),
        };
        let plot = Plot::try_from(row).unwrap();
        assert_eq!(plot.plant_type_id, Some(PlantTypeId(1)));
        assert_eq!(plot.effects, effects);
    }

    #[test]
    fn weather_record_in_plot_effects_is_corrupt() {
        let weather = encode_weather_effects(&[WeatherEffect::new(WeatherId(1), t0())]);
        let row = PlotRow {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            plot_number: 1,
            plant_type_id: None,
            growth_stage: 0,
            planted_at: None,
            last_growth_update: None,
            growth_boost_seconds: 0.0,
            last_spawn_attempt_at: None,
            last_harvest_at: None,
            effects: records_to_json(&weather).unwrap(),
        };
        let err = Plot::try_from(row).unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Corrupt { .. }));
    }

    #[test]
    fn fruit_row_converts() {
        let effects = vec![WeatherEffect::new(WeatherId(2), t0())];
        let row = FruitRow {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            plot_id: None,
            fruit_type_id: 12,
            weight: 10.0,
            harvested: false,
            weather_effects: records_to_json(&encode_weather_effects(&effects)).unwrap(),
            created_at: t0(),
        };
        let fruit = Fruit::try_from(row).unwrap();
        assert!(fruit.is_in_inventory());
        assert_eq!(fruit.weather_effects, effects);
    }
}
