//! Farmer-initiated actions and the foreground farm read.
//!
//! Each action validates ownership and state through the store, applies the
//! matching rule from `orchard-world`, and persists the result. Unlike the
//! tick phases, actions report failures to the caller instead of skipping.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use orchard_types::{
    ConsumableId, Fruit, FruitId, HarvestBehavior, PlantTypeId, Plot, PlotId, UserId, WeatherId,
};
use orchard_world::{ConsumableOutcome, WorldError, growth, pricing};
use serde::Serialize;
use tracing::{info, warn};

use crate::store::{FarmStore, StoreError};
use crate::tick::{Engine, UserUpdate};

/// Errors returned by farm actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A rule rejected the action.
    #[error("rule error: {source}")]
    World {
        /// The underlying rule error.
        #[from]
        source: WorldError,
    },

    /// The farmer does not exist.
    #[error("unknown farmer {0}")]
    UnknownFarmer(UserId),

    /// The plot does not exist or belongs to someone else.
    #[error("plot {0} not found")]
    PlotNotFound(PlotId),

    /// The plot already has a crop.
    #[error("plot {0} is already planted")]
    PlotOccupied(PlotId),

    /// The plot has no crop.
    #[error("plot {0} is empty")]
    PlotEmpty(PlotId),

    /// The fruit does not exist, belongs to someone else, or is not where
    /// the action needs it.
    #[error("fruit {0} not found on a plot")]
    FruitNotFound(FruitId),

    /// A sale was requested with no fruit.
    #[error("no fruit given to sell")]
    EmptySale,
}

/// Result of a sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaleReceipt {
    /// Fruit marked as sold.
    pub sold: Vec<FruitId>,
    /// Fruit ids that were rejected (unknown, foreign, on a plot, already
    /// sold, or not priceable).
    pub rejected: Vec<FruitId>,
    /// Currency credited.
    pub earned: i64,
}

/// One plot with the fruit hanging on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotView {
    /// The plot.
    pub plot: Plot,
    /// Unharvested fruit on the plot.
    pub fruit: Vec<Fruit>,
    /// Seconds until the crop reaches its next stage; `None` when the plot
    /// is empty or fully grown.
    pub seconds_to_next_stage: Option<f64>,
}

/// Everything a farmer sees after a foreground refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmView {
    /// Currency balance.
    pub balance: i64,
    /// Plots in plot-number order.
    pub plots: Vec<PlotView>,
    /// Unsold fruit in inventory.
    pub inventory: Vec<Fruit>,
    /// Ambient weather ids.
    pub ambient_weather: BTreeSet<WeatherId>,
}

impl<S: FarmStore> Engine<S> {
    async fn owned_plot(&self, user: UserId, plot: PlotId) -> Result<Plot, ActionError> {
        self.store()
            .get_plot(user, plot)
            .await?
            .ok_or(ActionError::PlotNotFound(plot))
    }

    /// Plant a seed in an empty plot.
    ///
    /// # Errors
    ///
    /// [`ActionError::PlotNotFound`], [`ActionError::PlotOccupied`], a
    /// [`WorldError::UnknownPlantType`], or a store failure.
    pub async fn plant_seed(
        &self,
        user: UserId,
        plot_id: PlotId,
        plant: PlantTypeId,
        now: DateTime<Utc>,
    ) -> Result<Plot, ActionError> {
        if self.catalog().plant(plant).is_none() {
            return Err(WorldError::UnknownPlantType(plant).into());
        }
        let plot = self.owned_plot(user, plot_id).await?;
        if plot.is_planted() {
            return Err(ActionError::PlotOccupied(plot_id));
        }
        self.store().plant(plot_id, plant, now).await?;
        info!(%user, plot = plot.plot_number, %plant, "Seed planted");
        self.owned_plot(user, plot_id).await
    }

    /// Apply a consumable to a planted plot.
    ///
    /// # Errors
    ///
    /// [`ActionError::PlotNotFound`], [`ActionError::PlotEmpty`], a
    /// [`WorldError`] for unknown catalog references, or a store failure.
    pub async fn apply_consumable(
        &self,
        user: UserId,
        plot_id: PlotId,
        consumable: ConsumableId,
        now: DateTime<Utc>,
    ) -> Result<ConsumableOutcome, ActionError> {
        let item = self
            .catalog()
            .consumable(consumable)
            .ok_or(WorldError::UnknownConsumable(consumable))?;
        let mut plot = self.owned_plot(user, plot_id).await?;
        let plant_id = plot.plant_type_id.ok_or(ActionError::PlotEmpty(plot_id))?;
        let plant = self
            .catalog()
            .plant(plant_id)
            .ok_or(WorldError::UnknownPlantType(plant_id))?;

        let outcome = orchard_world::apply_consumable(
            &mut plot,
            plant,
            item,
            &self.rules().consumables,
            now,
        )?;
        match outcome {
            ConsumableOutcome::GrowthBoost { seconds } => {
                self.store().add_growth_boost(plot_id, seconds).await?;
            }
            ConsumableOutcome::Timed { .. } => {
                self.store().update_plot_effects(plot_id, &plot.effects).await?;
            }
        }
        info!(%user, plot = plot.plot_number, consumable = %item.name, ?outcome, "Consumable applied");
        Ok(outcome)
    }

    /// Pick a fruit from its plot into inventory.
    ///
    /// Single-harvest plots are cleared once their fruit is picked.
    ///
    /// # Errors
    ///
    /// [`ActionError::FruitNotFound`] unless the fruit is the farmer's and
    /// hanging on a plot; otherwise a store failure.
    pub async fn harvest_fruit(
        &self,
        user: UserId,
        fruit_id: FruitId,
        now: DateTime<Utc>,
    ) -> Result<Fruit, ActionError> {
        let mut fruit = self
            .store()
            .get_fruit(user, fruit_id)
            .await?
            .filter(Fruit::is_on_plot)
            .ok_or(ActionError::FruitNotFound(fruit_id))?;
        let plot_id = fruit.plot_id.ok_or(ActionError::FruitNotFound(fruit_id))?;
        let plot = self.owned_plot(user, plot_id).await?;

        self.store().harvest_fruit(fruit_id, plot_id, now).await?;
        fruit.plot_id = None;

        let behavior = plot
            .plant_type_id
            .and_then(|id| self.catalog().plant(id))
            .map(|p| p.harvest_behavior);
        if behavior == Some(HarvestBehavior::SingleHarvest) {
            self.store().reset_plot(plot_id).await?;
            info!(%user, plot = plot.plot_number, "Single-harvest plot cleared");
        }
        info!(%user, fruit = %fruit_id, "Fruit harvested");
        Ok(fruit)
    }

    /// Sell inventory fruit.
    ///
    /// Every priceable fruit in inventory is priced, and if the total is
    /// positive the store flags them sold and credits the balance in one
    /// atomic write. A sale worth nothing leaves the fruit in inventory. Ids
    /// that are unknown, foreign, still on a plot, already sold, reference
    /// missing catalog entries or are worth nothing are returned in
    /// [`SaleReceipt::rejected`], as is fruit another sale settled first.
    ///
    /// # Errors
    ///
    /// [`ActionError::EmptySale`] for an empty list; otherwise a store
    /// failure, in which case nothing was sold or credited.
    pub async fn sell_fruits(&self, user: UserId, fruit_ids: &[FruitId]) -> Result<SaleReceipt, ActionError> {
        if fruit_ids.is_empty() {
            return Err(ActionError::EmptySale);
        }
        let mut receipt = SaleReceipt::default();
        let mut priced: Vec<(FruitId, i64)> = Vec::new();
        let mut seen = BTreeSet::new();
        for &id in fruit_ids {
            if !seen.insert(id) {
                continue;
            }
            let fruit = self
                .store()
                .get_fruit(user, id)
                .await?
                .filter(Fruit::is_in_inventory);
            match fruit.and_then(|f| pricing::sale_value(self.catalog(), &f)) {
                Some(value) => priced.push((id, value)),
                None => {
                    warn!(%user, fruit = %id, "Fruit cannot be sold, skipping");
                    receipt.rejected.push(id);
                }
            }
        }

        let total = priced.iter().fold(0_i64, |sum, &(_, value)| sum.saturating_add(value));
        if total <= 0 {
            if !priced.is_empty() {
                warn!(%user, fruit = priced.len(), "Sale is worth nothing, keeping fruit");
            }
            receipt.rejected.extend(priced.iter().map(|&(id, _)| id));
            return Ok(receipt);
        }

        let sold: BTreeSet<FruitId> = self.store().settle_sale(user, &priced).await?.into_iter().collect();
        for (id, value) in priced {
            if sold.contains(&id) {
                receipt.earned = receipt.earned.saturating_add(value);
                receipt.sold.push(id);
            } else {
                warn!(%user, fruit = %id, "Fruit was sold elsewhere first, skipping");
                receipt.rejected.push(id);
            }
        }
        info!(%user, sold = receipt.sold.len(), earned = receipt.earned, "Fruit sold");
        Ok(receipt)
    }

    /// Dig up a planted plot, destroying its crop and any fruit on it.
    ///
    /// # Errors
    ///
    /// [`ActionError::PlotNotFound`], [`ActionError::PlotEmpty`], or a store
    /// failure.
    pub async fn dig_up_plot(&self, user: UserId, plot_id: PlotId) -> Result<(), ActionError> {
        let plot = self.owned_plot(user, plot_id).await?;
        if !plot.is_planted() {
            return Err(ActionError::PlotEmpty(plot_id));
        }
        self.store().delete_plot_fruit(plot_id).await?;
        self.store().reset_plot(plot_id).await?;
        info!(%user, plot = plot.plot_number, "Plot dug up");
        Ok(())
    }

    /// Bring the farm up to date and return what the farmer sees.
    ///
    /// A failing update is logged and the current stored state is returned
    /// anyway.
    ///
    /// # Errors
    ///
    /// [`ActionError::UnknownFarmer`] or a store failure while reading.
    pub async fn farm_state(&self, user: UserId, now: DateTime<Utc>) -> Result<FarmView, ActionError> {
        let balance = self
            .store()
            .balance(user)
            .await?
            .ok_or(ActionError::UnknownFarmer(user))?;
        match self.update_user(user, now).await {
            Ok(UserUpdate { fruit_spawned, .. }) if fruit_spawned > 0 => {
                info!(%user, fruit_spawned, "Foreground refresh spawned fruit");
            }
            Ok(_) => {}
            Err(err) => warn!(%user, %err, "Foreground refresh failed, serving stored state"),
        }

        let mut plots = Vec::new();
        for plot in self.store().user_plots(user).await? {
            let fruit = self.store().plot_fruit(plot.id).await?;
            let seconds_to_next_stage = plot
                .plant_type_id
                .and_then(|id| self.catalog().plant(id))
                .filter(|plant| !growth::is_fully_grown(&plot, plant))
                .and_then(|plant| growth::seconds_remaining_in_stage(&plot, plant, now));
            plots.push(PlotView {
                plot,
                fruit,
                seconds_to_next_stage,
            });
        }

        Ok(FarmView {
            balance,
            plots,
            inventory: self.store().inventory_fruit(user).await?,
            ambient_weather: self.ambient_weather(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone};
    use orchard_types::{BoostKind, Farmer, FruitTypeId, WeatherEffect};
    use orchard_world::starter_catalog;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::tick::EngineRules;

    fn at(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, second)
            .single()
            .unwrap()
    }

    struct Fixture {
        engine: Engine<MemoryStore>,
        user: UserId,
        plot: PlotId,
    }

    async fn fixture() -> Fixture {
        let catalog = Arc::new(starter_catalog().unwrap());
        let engine = Engine::new(catalog, MemoryStore::new(), EngineRules::default(), Some(3));
        let user = UserId::new();
        engine
            .store()
            .add_farmer(Farmer {
                id: user,
                username: "grower".to_owned(),
                balance: 100,
            })
            .await;
        let plot = Plot::empty(user, 1);
        let plot_id = plot.id;
        engine.store().add_plot(plot).await;
        Fixture {
            engine,
            user,
            plot: plot_id,
        }
    }

    fn inventory_fruit(user: UserId, fruit_type: u32, weight: f64, weather: &[u32]) -> Fruit {
        Fruit {
            id: FruitId::new(),
            user_id: user,
            plot_id: None,
            fruit_type_id: FruitTypeId(fruit_type),
            weight,
            harvested: false,
            weather_effects: weather
                .iter()
                .map(|&id| WeatherEffect::new(WeatherId(id), at(0, 0)))
                .collect(),
            created_at: at(0, 0),
        }
    }

    #[tokio::test]
    async fn plant_requires_empty_owned_plot() {
        let f = fixture().await;
        let plot = f.engine.plant_seed(f.user, f.plot, PlantTypeId(1), at(0, 0)).await.unwrap();
        assert_eq!(plot.growth_stage, 1);
        assert_eq!(plot.planted_at, Some(at(0, 0)));

        let again = f.engine.plant_seed(f.user, f.plot, PlantTypeId(2), at(0, 5)).await;
        assert!(matches!(again, Err(ActionError::PlotOccupied(_))));

        let stranger = f.engine.plant_seed(UserId::new(), f.plot, PlantTypeId(1), at(0, 5)).await;
        assert!(matches!(stranger, Err(ActionError::PlotNotFound(_))));

        let unknown = f.engine.plant_seed(f.user, f.plot, PlantTypeId(77), at(0, 5)).await;
        assert!(matches!(unknown, Err(ActionError::World { .. })));
    }

    #[tokio::test]
    async fn growth_boost_is_persisted_and_speeds_growth() {
        let f = fixture().await;
        // Carrot: 90 s stages.
        let _ = f.engine.plant_seed(f.user, f.plot, PlantTypeId(1), at(0, 0)).await.unwrap();
        let outcome = f
            .engine
            .apply_consumable(f.user, f.plot, ConsumableId(1), at(0, 30))
            .await
            .unwrap();
        // 60 s left in the stage, half credited.
        assert!(matches!(outcome, ConsumableOutcome::GrowthBoost { seconds } if (seconds - 30.0).abs() < 1e-9));
        let plot = f.engine.store().plot(f.plot).await.unwrap();
        assert!((plot.growth_boost_seconds - 30.0).abs() < 1e-9);

        let update = f.engine.update_user(f.user, at(1, 0)).await.unwrap();
        assert_eq!(update.stages_advanced, 1);
        assert_eq!(f.engine.store().plot(f.plot).await.unwrap().growth_stage, 2);
    }

    #[tokio::test]
    async fn timed_consumable_is_stored_on_the_plot() {
        let f = fixture().await;
        let _ = f.engine.plant_seed(f.user, f.plot, PlantTypeId(1), at(0, 0)).await.unwrap();
        let _ = f
            .engine
            .apply_consumable(f.user, f.plot, ConsumableId(5), at(0, 0))
            .await
            .unwrap();
        let plot = f.engine.store().plot(f.plot).await.unwrap();
        let effect = plot.effects.active(BoostKind::TriColorBoost, at(9, 59)).unwrap();
        assert_eq!(effect.expires_at, at(10, 0));
    }

    #[tokio::test]
    async fn consumable_on_empty_plot_fails() {
        let f = fixture().await;
        let result = f.engine.apply_consumable(f.user, f.plot, ConsumableId(1), at(0, 0)).await;
        assert!(matches!(result, Err(ActionError::PlotEmpty(_))));
    }

    #[tokio::test]
    async fn harvesting_single_harvest_fruit_clears_the_plot() {
        let f = fixture().await;
        let _ = f.engine.plant_seed(f.user, f.plot, PlantTypeId(1), at(0, 0)).await.unwrap();
        let view = f.engine.farm_state(f.user, at(7, 0)).await.unwrap();
        let fruit = &view.plots[0].fruit;
        assert_eq!(fruit.len(), 1);

        let picked = f.engine.harvest_fruit(f.user, fruit[0].id, at(7, 30)).await.unwrap();
        assert!(picked.is_in_inventory());
        let plot = f.engine.store().plot(f.plot).await.unwrap();
        assert!(!plot.is_planted());

        let view = f.engine.farm_state(f.user, at(8, 0)).await.unwrap();
        assert_eq!(view.inventory.len(), 1);
        assert!(view.plots[0].fruit.is_empty());

        let twice = f.engine.harvest_fruit(f.user, picked.id, at(8, 0)).await;
        assert!(matches!(twice, Err(ActionError::FruitNotFound(_))));
    }

    #[tokio::test]
    async fn harvesting_perennial_fruit_keeps_the_plant() {
        let f = fixture().await;
        let _ = f.engine.plant_seed(f.user, f.plot, PlantTypeId(3), at(0, 0)).await.unwrap();
        let two_hours = at(0, 0) + TimeDelta::hours(2);
        let _ = f.engine.update_user(f.user, two_hours).await.unwrap();
        let fruit = f.engine.store().plot_fruit(f.plot).await.unwrap();
        assert_eq!(fruit.len(), 1);

        let _ = f.engine.harvest_fruit(f.user, fruit[0].id, two_hours).await.unwrap();
        let plot = f.engine.store().plot(f.plot).await.unwrap();
        assert!(plot.is_planted());
        assert_eq!(plot.last_harvest_at, Some(two_hours));
    }

    #[tokio::test]
    async fn selling_credits_valid_fruit_and_rejects_the_rest() {
        let f = fixture().await;
        // Golden Carrot, 10.0 mass, Rain + Rainbow: 2.0 * 10 * 2.0 * 1.8 = 72.
        let good = inventory_fruit(f.user, 12, 10.0, &[2, 5]);
        let foreign = inventory_fruit(UserId::new(), 11, 10.0, &[]);
        let unknown_type = inventory_fruit(f.user, 999, 10.0, &[]);
        let mut hanging = inventory_fruit(f.user, 11, 10.0, &[]);
        hanging.plot_id = Some(f.plot);
        for fruit in [&good, &foreign, &unknown_type, &hanging] {
            f.engine.store().add_fruit(fruit.clone()).await;
        }

        let ids = [good.id, foreign.id, unknown_type.id, hanging.id, good.id];
        let receipt = f.engine.sell_fruits(f.user, &ids).await.unwrap();
        assert_eq!(receipt.sold, vec![good.id]);
        assert_eq!(receipt.earned, 72);
        assert_eq!(receipt.rejected.len(), 3);
        assert_eq!(f.engine.store().balance(f.user).await.unwrap(), Some(172));

        let again = f.engine.sell_fruits(f.user, &[good.id]).await.unwrap();
        assert!(again.sold.is_empty());
        assert_eq!(f.engine.store().balance(f.user).await.unwrap(), Some(172));
    }

    #[tokio::test]
    async fn failed_sale_neither_pays_nor_sells() {
        let f = fixture().await;
        let good = inventory_fruit(f.user, 12, 10.0, &[2, 5]);
        f.engine.store().add_fruit(good.clone()).await;
        f.engine.store().fail_sales_for(f.user).await;

        let failed = f.engine.sell_fruits(f.user, &[good.id]).await;
        assert!(matches!(failed, Err(ActionError::Store { .. })));
        assert_eq!(f.engine.store().balance(f.user).await.unwrap(), Some(100));
        assert_eq!(f.engine.store().inventory_fruit(f.user).await.unwrap(), vec![good.clone()]);

        f.engine.store().clear_failures().await;
        let retry = f.engine.sell_fruits(f.user, &[good.id]).await.unwrap();
        assert_eq!(retry.earned, 72);
        let again = f.engine.sell_fruits(f.user, &[good.id]).await.unwrap();
        assert_eq!(again.earned, 0);
        assert_eq!(f.engine.store().balance(f.user).await.unwrap(), Some(172));
    }

    #[tokio::test]
    async fn concurrent_sales_pay_once() {
        let f = fixture().await;
        let good = inventory_fruit(f.user, 12, 10.0, &[2, 5]);
        f.engine.store().add_fruit(good.clone()).await;

        let ids = [good.id];
        let (a, b) = tokio::join!(
            f.engine.sell_fruits(f.user, &ids),
            f.engine.sell_fruits(f.user, &ids)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.earned + b.earned, 72);
        assert_eq!(a.sold.len() + b.sold.len(), 1);
        assert_eq!(f.engine.store().balance(f.user).await.unwrap(), Some(172));
    }

    #[tokio::test]
    async fn worthless_sale_keeps_fruit() {
        let f = fixture().await;
        // Carrot at 0.1 mass rounds to nothing.
        let tiny = inventory_fruit(f.user, 11, 0.1, &[]);
        f.engine.store().add_fruit(tiny.clone()).await;

        let receipt = f.engine.sell_fruits(f.user, &[tiny.id]).await.unwrap();
        assert!(receipt.sold.is_empty());
        assert_eq!(receipt.rejected, vec![tiny.id]);
        assert_eq!(receipt.earned, 0);
        assert_eq!(f.engine.store().balance(f.user).await.unwrap(), Some(100));
        assert_eq!(f.engine.store().inventory_fruit(f.user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_sale_is_rejected() {
        let f = fixture().await;
        assert!(matches!(f.engine.sell_fruits(f.user, &[]).await, Err(ActionError::EmptySale)));
    }

    #[tokio::test]
    async fn dig_up_removes_crop_and_fruit() {
        let f = fixture().await;
        let _ = f.engine.plant_seed(f.user, f.plot, PlantTypeId(1), at(0, 0)).await.unwrap();
        let _ = f.engine.update_user(f.user, at(7, 0)).await.unwrap();
        assert_eq!(f.engine.store().count_plot_fruit(f.plot).await.unwrap(), 1);

        f.engine.dig_up_plot(f.user, f.plot).await.unwrap();
        assert_eq!(f.engine.store().count_plot_fruit(f.plot).await.unwrap(), 0);
        assert!(!f.engine.store().plot(f.plot).await.unwrap().is_planted());

        let empty = f.engine.dig_up_plot(f.user, f.plot).await;
        assert!(matches!(empty, Err(ActionError::PlotEmpty(_))));
    }

    #[tokio::test]
    async fn farm_state_reports_progress() {
        let f = fixture().await;
        let _ = f.engine.plant_seed(f.user, f.plot, PlantTypeId(1), at(0, 0)).await.unwrap();
        let view = f.engine.farm_state(f.user, at(1, 0)).await.unwrap();
        assert_eq!(view.balance, 100);
        assert_eq!(view.plots.len(), 1);
        assert_eq!(view.plots[0].plot.growth_stage, 1);
        let remaining = view.plots[0].seconds_to_next_stage.unwrap();
        assert!((remaining - 30.0).abs() < 1e-9);

        let unknown = f.engine.farm_state(UserId::new(), at(1, 0)).await;
        assert!(matches!(unknown, Err(ActionError::UnknownFarmer(_))));
    }
}
