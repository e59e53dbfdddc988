//! In-process [`FarmStore`] backed by ordered maps.
//!
//! Used by the engine's tests and for running the simulation without a
//! database. Writes to plots registered with [`MemoryStore::fail_writes_to`],
//! and sales by farmers registered with [`MemoryStore::fail_sales_for`],
//! return [`StoreError::Backend`], which lets callers exercise the
//! failure paths.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use orchard_types::{
    Farmer, Fruit, FruitId, PlantTypeId, Plot, PlotEffects, PlotId, UserId, WeatherEffect,
};
use orchard_world::SpawnGuard;
use tokio::sync::RwLock;

use crate::store::{FarmStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    farmers: BTreeMap<UserId, Farmer>,
    plots: BTreeMap<PlotId, Plot>,
    fruit: BTreeMap<FruitId, Fruit>,
    failing_plots: BTreeSet<PlotId>,
    failing_sales: BTreeSet<UserId>,
}

impl MemoryState {
    fn check_writable(&self, plot: PlotId) -> Result<(), StoreError> {
        if self.failing_plots.contains(&plot) {
            return Err(StoreError::Backend {
                message: format!("writes to plot {plot} are failing"),
            });
        }
        Ok(())
    }

    fn plot_mut(&mut self, plot: PlotId) -> Result<&mut Plot, StoreError> {
        self.check_writable(plot)?;
        self.plots.get_mut(&plot).ok_or_else(|| StoreError::Backend {
            message: format!("no plot {plot}"),
        })
    }

    fn fruit_mut(&mut self, fruit: FruitId) -> Result<&mut Fruit, StoreError> {
        let plot = self.fruit.get(&fruit).and_then(|f| f.plot_id);
        if let Some(plot) = plot {
            self.check_writable(plot)?;
        }
        self.fruit.get_mut(&fruit).ok_or_else(|| StoreError::Backend {
            message: format!("no fruit {fruit}"),
        })
    }

    fn unharvested_on(&self, plot: PlotId) -> usize {
        self.fruit
            .values()
            .filter(|f| f.plot_id == Some(plot) && !f.harvested)
            .count()
    }

    fn sorted_plots(&self, user: UserId, planted_only: bool) -> Vec<Plot> {
        let mut plots: Vec<Plot> = self
            .plots
            .values()
            .filter(|p| p.user_id == user && (!planted_only || p.is_planted()))
            .cloned()
            .collect();
        plots.sort_by_key(|p| p.plot_number);
        plots
    }

    fn fruit_where(&self, keep: impl Fn(&Fruit) -> bool) -> Vec<Fruit> {
        let mut fruit: Vec<Fruit> = self.fruit.values().filter(|&f| keep(f)).cloned().collect();
        fruit.sort_by_key(|f| f.created_at);
        fruit
    }
}

/// A [`FarmStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a farmer.
    pub async fn add_farmer(&self, farmer: Farmer) {
        self.state.write().await.farmers.insert(farmer.id, farmer);
    }

    /// Register a plot.
    pub async fn add_plot(&self, plot: Plot) {
        self.state.write().await.plots.insert(plot.id, plot);
    }

    /// Register a fruit directly, bypassing spawning.
    pub async fn add_fruit(&self, fruit: Fruit) {
        self.state.write().await.fruit.insert(fruit.id, fruit);
    }

    /// Make every subsequent write touching `plot` (or its fruit) fail.
    pub async fn fail_writes_to(&self, plot: PlotId) {
        self.state.write().await.failing_plots.insert(plot);
    }

    /// Make every subsequent sale by `user` fail.
    pub async fn fail_sales_for(&self, user: UserId) {
        self.state.write().await.failing_sales.insert(user);
    }

    /// Stop injecting failures.
    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failing_plots.clear();
        state.failing_sales.clear();
    }

    /// Snapshot of a plot regardless of owner.
    pub async fn plot(&self, plot: PlotId) -> Option<Plot> {
        self.state.read().await.plots.get(&plot).cloned()
    }

    /// Snapshot of every fruit, sold or not, ordered by creation time.
    pub async fn all_fruit(&self) -> Vec<Fruit> {
        self.state.read().await.fruit_where(|_| true)
    }
}

impl FarmStore for MemoryStore {
    async fn list_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.state.read().await.farmers.keys().copied().collect())
    }

    async fn user_plots(&self, user: UserId) -> Result<Vec<Plot>, StoreError> {
        Ok(self.state.read().await.sorted_plots(user, false))
    }

    async fn planted_plots(&self, user: UserId) -> Result<Vec<Plot>, StoreError> {
        Ok(self.state.read().await.sorted_plots(user, true))
    }

    async fn get_plot(&self, user: UserId, plot: PlotId) -> Result<Option<Plot>, StoreError> {
        let state = self.state.read().await;
        Ok(state.plots.get(&plot).filter(|p| p.user_id == user).cloned())
    }

    async fn update_plot_growth(
        &self,
        plot: PlotId,
        stage: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let plot = state.plot_mut(plot)?;
        if plot.growth_stage >= stage {
            return Ok(false);
        }
        plot.growth_stage = stage;
        plot.last_growth_update = Some(at);
        Ok(true)
    }

    async fn plot_fruit(&self, plot: PlotId) -> Result<Vec<Fruit>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .fruit_where(|f| f.plot_id == Some(plot) && !f.harvested))
    }

    async fn count_plot_fruit(&self, plot: PlotId) -> Result<usize, StoreError> {
        Ok(self.state.read().await.unharvested_on(plot))
    }

    async fn update_fruit_weather(
        &self,
        fruit: FruitId,
        effects: &[WeatherEffect],
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.fruit_mut(fruit)?.weather_effects = effects.to_vec();
        Ok(())
    }

    async fn insert_spawned_fruit(
        &self,
        plot: PlotId,
        fruit: &Fruit,
        guard: SpawnGuard,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let unharvested = state.unharvested_on(plot);
        let stored = state.plot_mut(plot)?;
        if !guard.admits(stored.last_spawn_attempt_at, unharvested, at) {
            return Ok(false);
        }
        stored.last_spawn_attempt_at = Some(at);
        state.fruit.insert(fruit.id, fruit.clone());
        Ok(true)
    }

    async fn update_plot_effects(
        &self,
        plot: PlotId,
        effects: &PlotEffects,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.plot_mut(plot)?.effects = effects.clone();
        Ok(())
    }

    async fn add_growth_boost(&self, plot: PlotId, seconds: f64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.plot_mut(plot)?.growth_boost_seconds += seconds;
        Ok(())
    }

    async fn plant(
        &self,
        plot: PlotId,
        plant: PlantTypeId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let plot = state.plot_mut(plot)?;
        plot.reset();
        plot.plant_type_id = Some(plant);
        plot.growth_stage = 1;
        plot.planted_at = Some(at);
        plot.last_growth_update = Some(at);
        Ok(())
    }

    async fn reset_plot(&self, plot: PlotId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.plot_mut(plot)?.reset();
        Ok(())
    }

    async fn harvest_fruit(
        &self,
        fruit: FruitId,
        plot: PlotId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.plot_mut(plot)?.last_harvest_at = Some(at);
        state.fruit_mut(fruit)?.plot_id = None;
        Ok(())
    }

    async fn get_fruit(&self, user: UserId, fruit: FruitId) -> Result<Option<Fruit>, StoreError> {
        let state = self.state.read().await;
        Ok(state.fruit.get(&fruit).filter(|f| f.user_id == user).cloned())
    }

    async fn inventory_fruit(&self, user: UserId) -> Result<Vec<Fruit>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .fruit_where(|f| f.user_id == user && f.is_in_inventory()))
    }

    async fn balance(&self, user: UserId) -> Result<Option<i64>, StoreError> {
        Ok(self.state.read().await.farmers.get(&user).map(|f| f.balance))
    }

    async fn settle_sale(
        &self,
        user: UserId,
        sales: &[(FruitId, i64)],
    ) -> Result<Vec<FruitId>, StoreError> {
        let mut state = self.state.write().await;
        if state.failing_sales.contains(&user) {
            return Err(StoreError::Backend {
                message: format!("sales by {user} are failing"),
            });
        }
        if !state.farmers.contains_key(&user) {
            return Err(StoreError::Backend {
                message: format!("no farmer {user}"),
            });
        }

        let mut sold = Vec::new();
        let mut earned: i64 = 0;
        for &(id, value) in sales {
            let unsold = state
                .fruit
                .get_mut(&id)
                .filter(|f| f.user_id == user && f.is_in_inventory());
            if let Some(fruit) = unsold {
                fruit.harvested = true;
                sold.push(id);
                earned = earned.saturating_add(value);
            }
        }
        if let Some(farmer) = state.farmers.get_mut(&user) {
            farmer.balance = farmer.balance.saturating_add(earned);
        }
        Ok(sold)
    }

    async fn delete_plot_fruit(&self, plot: PlotId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_writable(plot)?;
        state.fruit.retain(|_, f| f.plot_id != Some(plot));
        Ok(())
    }
}
