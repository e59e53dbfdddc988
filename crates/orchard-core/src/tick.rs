//! Per-user update: the three-phase routine shared by the background sweep
//! and the foreground read path.
//!
//! 1. **Growth** -- advance every planted plot's stage from elapsed and
//!    boosted time.
//!
//! 2. **Weather** -- reroll ambient weather if a refresh minute has come
//!    round, then expire and roll weather effects on every fruit still
//!    hanging on a plot.
//!
//! 3. **Spawn** -- create fruit on eligible plots.
//!
//! Each phase is idempotent or monotonic, so the routine can run for the
//! same user from several triggers without coordination: growth writes only
//! raise a stage and spawn writes re-check eligibility in the store. A
//! failure on one plot or fruit is logged and skipped, and a plot whose
//! growth write fails sits out the later phases. Only failing to list the
//! user's plots aborts the update.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use orchard_types::{Plot, UserId, WeatherId};
use orchard_world::{
    Catalog, ConsumableRules, SpawnGuard, SpawnRules, WeatherRules, WeatherState, growth, spawn,
    weather,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::config::FarmConfig;
use crate::store::{FarmStore, StoreError};

/// Errors that abort a whole per-user update.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The user's plots could not be listed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// The rule sets the engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineRules {
    /// Ambient weather and weather effect timing.
    pub weather: WeatherRules,
    /// Fruit spawning.
    pub spawn: SpawnRules,
    /// Consumable effects.
    pub consumables: ConsumableRules,
}

impl EngineRules {
    /// Rule sets taken from `config`.
    pub const fn from_config(config: &FarmConfig) -> Self {
        Self {
            weather: config.weather_rules(),
            spawn: config.spawn_rules(),
            consumables: config.consumable_rules(),
        }
    }
}

/// What one per-user update did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// The farmer updated.
    pub user: UserId,
    /// Plots whose stage advanced.
    pub stages_advanced: u32,
    /// Whether this update rerolled the ambient weather.
    pub weather_refreshed: bool,
    /// Fruit whose weather effect list was rewritten.
    pub fruit_weather_updated: u32,
    /// Fruit spawned.
    pub fruit_spawned: u32,
    /// Plots or fruit skipped after a failure.
    pub skipped: u32,
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

/// The simulation engine: catalog, store, ambient weather and randomness.
#[derive(Debug)]
pub struct Engine<S> {
    catalog: Arc<Catalog>,
    store: S,
    rules: EngineRules,
    weather: Mutex<WeatherState>,
    rng: Mutex<SmallRng>,
}

impl<S: FarmStore> Engine<S> {
    /// Create an engine. `seed` fixes the random source; `None` seeds from
    /// the operating system.
    pub fn new(catalog: Arc<Catalog>, store: S, rules: EngineRules, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        Self {
            catalog,
            store,
            rules,
            weather: Mutex::new(WeatherState::new()),
            rng: Mutex::new(rng),
        }
    }

    /// The catalog the engine evaluates against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The engine's rule sets.
    pub const fn rules(&self) -> &EngineRules {
        &self.rules
    }

    /// The ambient weather ids currently active.
    pub fn ambient_weather(&self) -> BTreeSet<WeatherId> {
        self.weather
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .clone()
    }

    /// A fresh random source derived from the engine's.
    ///
    /// The shared generator is locked only for the derivation, never across
    /// an await point.
    pub(crate) fn fork_rng(&self) -> SmallRng {
        let mut shared = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        SmallRng::from_rng(&mut *shared)
    }

    /// Reroll the ambient weather if due and return the active set.
    fn refresh_weather(&self, now: DateTime<Utc>, rng: &mut SmallRng) -> (bool, BTreeSet<WeatherId>) {
        let mut state = self.weather.lock().unwrap_or_else(PoisonError::into_inner);
        let refreshed = weather::refresh_ambient(&mut state, &self.catalog, &self.rules.weather, now, rng);
        (refreshed, state.active.clone())
    }

    /// Run Growth -> Weather -> Spawn for one farmer.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Store`] only if the farmer's plots cannot be
    /// listed; failures on individual plots or fruit are logged and counted
    /// in [`UserUpdate::skipped`].
    pub async fn update_user(&self, user: UserId, now: DateTime<Utc>) -> Result<UserUpdate, TickError> {
        let mut plots = self.store.planted_plots(user).await?;
        let mut rng = self.fork_rng();
        let mut update = UserUpdate {
            user,
            ..UserUpdate::default()
        };

        self.grow(&mut plots, now, &mut update).await;
        self.weather_phase(&plots, now, &mut rng, &mut update).await;
        self.spawn_phase(&plots, now, &mut rng, &mut update).await;

        debug!(
            %user,
            stages_advanced = update.stages_advanced,
            fruit_weather_updated = update.fruit_weather_updated,
            fruit_spawned = update.fruit_spawned,
            skipped = update.skipped,
            "User updated"
        );
        Ok(update)
    }

    // -----------------------------------------------------------------------
    // Phase 1: Growth
    // -----------------------------------------------------------------------

    async fn grow(&self, plots: &mut Vec<Plot>, now: DateTime<Utc>, update: &mut UserUpdate) {
        let mut failed = BTreeSet::new();
        for plot in plots.iter_mut() {
            let Some(plant) = plot.plant_type_id.and_then(|id| self.catalog.plant(id)) else {
                warn!(plot = %plot.id, plant = ?plot.plant_type_id, "Plot references unknown plant type, skipping");
                bump(&mut update.skipped);
                continue;
            };
            let Some(stage) = growth::advance(plot, plant, now) else {
                continue;
            };
            match self.store.update_plot_growth(plot.id, stage, now).await {
                Ok(true) => {
                    debug!(plot = %plot.id, stage, "Plot advanced");
                    bump(&mut update.stages_advanced);
                }
                // Another trigger already wrote this stage.
                Ok(false) => {}
                Err(err) => {
                    warn!(plot = %plot.id, %err, "Growth write failed, skipping plot");
                    bump(&mut update.skipped);
                    failed.insert(plot.id);
                }
            }
        }
        plots.retain(|plot| !failed.contains(&plot.id));
    }

    // -----------------------------------------------------------------------
    // Phase 2: Weather
    // -----------------------------------------------------------------------

    async fn weather_phase(
        &self,
        plots: &[Plot],
        now: DateTime<Utc>,
        rng: &mut SmallRng,
        update: &mut UserUpdate,
    ) {
        let (refreshed, ambient) = self.refresh_weather(now, rng);
        update.weather_refreshed = refreshed;

        for plot in plots {
            let fruit = match self.store.plot_fruit(plot.id).await {
                Ok(fruit) => fruit,
                Err(err) => {
                    warn!(plot = %plot.id, %err, "Could not load fruit, skipping plot");
                    bump(&mut update.skipped);
                    continue;
                }
            };
            for mut fruit in fruit {
                let changed = weather::accumulate(
                    &mut fruit.weather_effects,
                    &ambient,
                    &self.catalog,
                    &self.rules.weather,
                    now,
                    rng,
                );
                if !changed {
                    continue;
                }
                match self.store.update_fruit_weather(fruit.id, &fruit.weather_effects).await {
                    Ok(()) => bump(&mut update.fruit_weather_updated),
                    Err(err) => {
                        warn!(fruit = %fruit.id, %err, "Weather write failed, skipping fruit");
                        bump(&mut update.skipped);
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Spawn
    // -----------------------------------------------------------------------

    async fn spawn_phase(
        &self,
        plots: &[Plot],
        now: DateTime<Utc>,
        rng: &mut SmallRng,
        update: &mut UserUpdate,
    ) {
        for plot in plots {
            let Some(plant) = plot.plant_type_id.and_then(|id| self.catalog.plant(id)) else {
                continue;
            };
            let unharvested = match self.store.count_plot_fruit(plot.id).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(plot = %plot.id, %err, "Could not count fruit, skipping spawn");
                    bump(&mut update.skipped);
                    continue;
                }
            };
            if !spawn::is_eligible(plot, plant, unharvested, &self.rules.spawn, now) {
                continue;
            }

            let candidates = self.catalog.fruit_types_for(plant.id);
            let fruit = match spawn::spawn_fruit(plot, plant, &candidates, &self.rules.spawn, now, rng) {
                Ok(fruit) => fruit,
                Err(err) => {
                    warn!(plot = %plot.id, plant = %plant.id, %err, "Aborting fruit spawn");
                    bump(&mut update.skipped);
                    continue;
                }
            };
            let guard = SpawnGuard::for_plant(plant, &self.rules.spawn);
            match self.store.insert_spawned_fruit(plot.id, &fruit, guard, now).await {
                Ok(true) => {}
                // Another trigger spawned on this plot first.
                Ok(false) => {
                    debug!(plot = %plot.id, "Spawn already taken, discarding fruit");
                    continue;
                }
                Err(err) => {
                    warn!(plot = %plot.id, %err, "Fruit insert failed, skipping plot");
                    bump(&mut update.skipped);
                    continue;
                }
            }
            info!(
                user = %plot.user_id,
                plot = plot.plot_number,
                fruit = %fruit.id,
                fruit_type = %fruit.fruit_type_id,
                weight = fruit.weight,
                "Fruit spawned"
            );
            bump(&mut update.fruit_spawned);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use orchard_types::{
        BoostKind, Farmer, Fruit, FruitId, FruitType, FruitTypeId, HarvestBehavior, PlantType,
        PlantTypeId, PlotEffects, PlotId, TimedEffect, WeatherEffect, WeatherType,
    };
    use orchard_world::starter_catalog;

    use super::*;
    use crate::memory::MemoryStore;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, second)
            .single()
            .unwrap()
    }

    async fn farm(store: &MemoryStore, plant: Option<PlantTypeId>, planted_at: DateTime<Utc>) -> Plot {
        let user = UserId::new();
        store
            .add_farmer(Farmer {
                id: user,
                username: "tester".to_owned(),
                balance: 0,
            })
            .await;
        let mut plot = Plot::empty(user, 1);
        if let Some(plant) = plant {
            plot.plant_type_id = Some(plant);
            plot.growth_stage = 1;
            plot.planted_at = Some(planted_at);
            plot.last_growth_update = Some(planted_at);
        }
        store.add_plot(plot.clone()).await;
        plot
    }

    fn engine(catalog: Catalog) -> Engine<MemoryStore> {
        Engine::new(Arc::new(catalog), MemoryStore::new(), EngineRules::default(), Some(17))
    }

    /// Yields after counting fruit, so concurrent updates interleave between
    /// the eligibility read and the spawn write.
    struct YieldingStore(MemoryStore);

    impl FarmStore for YieldingStore {
        async fn list_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
            self.0.list_user_ids().await
        }

        async fn user_plots(&self, user: UserId) -> Result<Vec<Plot>, StoreError> {
            self.0.user_plots(user).await
        }

        async fn planted_plots(&self, user: UserId) -> Result<Vec<Plot>, StoreError> {
            self.0.planted_plots(user).await
        }

        async fn get_plot(&self, user: UserId, plot: PlotId) -> Result<Option<Plot>, StoreError> {
            self.0.get_plot(user, plot).await
        }

        async fn update_plot_growth(
            &self,
            plot: PlotId,
            stage: u32,
            at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            self.0.update_plot_growth(plot, stage, at).await
        }

        async fn plot_fruit(&self, plot: PlotId) -> Result<Vec<Fruit>, StoreError> {
            self.0.plot_fruit(plot).await
        }

        async fn count_plot_fruit(&self, plot: PlotId) -> Result<usize, StoreError> {
            let count = self.0.count_plot_fruit(plot).await;
            tokio::task::yield_now().await;
            count
        }

        async fn update_fruit_weather(
            &self,
            fruit: FruitId,
            effects: &[WeatherEffect],
        ) -> Result<(), StoreError> {
            self.0.update_fruit_weather(fruit, effects).await
        }

        async fn insert_spawned_fruit(
            &self,
            plot: PlotId,
            fruit: &Fruit,
            guard: SpawnGuard,
            at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            self.0.insert_spawned_fruit(plot, fruit, guard, at).await
        }

        async fn update_plot_effects(
            &self,
            plot: PlotId,
            effects: &PlotEffects,
        ) -> Result<(), StoreError> {
            self.0.update_plot_effects(plot, effects).await
        }

        async fn add_growth_boost(&self, plot: PlotId, seconds: f64) -> Result<(), StoreError> {
            self.0.add_growth_boost(plot, seconds).await
        }

        async fn plant(
            &self,
            plot: PlotId,
            plant: PlantTypeId,
            at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.0.plant(plot, plant, at).await
        }

        async fn reset_plot(&self, plot: PlotId) -> Result<(), StoreError> {
            self.0.reset_plot(plot).await
        }

        async fn harvest_fruit(
            &self,
            fruit: FruitId,
            plot: PlotId,
            at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.0.harvest_fruit(fruit, plot, at).await
        }

        async fn get_fruit(&self, user: UserId, fruit: FruitId) -> Result<Option<Fruit>, StoreError> {
            self.0.get_fruit(user, fruit).await
        }

        async fn inventory_fruit(&self, user: UserId) -> Result<Vec<Fruit>, StoreError> {
            self.0.inventory_fruit(user).await
        }

        async fn balance(&self, user: UserId) -> Result<Option<i64>, StoreError> {
            self.0.balance(user).await
        }

        async fn settle_sale(
            &self,
            user: UserId,
            sales: &[(FruitId, i64)],
        ) -> Result<Vec<FruitId>, StoreError> {
            self.0.settle_sale(user, sales).await
        }

        async fn delete_plot_fruit(&self, plot: PlotId) -> Result<(), StoreError> {
            self.0.delete_plot_fruit(plot).await
        }
    }

    fn yielding_engine() -> Engine<YieldingStore> {
        Engine::new(
            Arc::new(starter_catalog().unwrap()),
            YieldingStore(MemoryStore::new()),
            EngineRules::default(),
            Some(17),
        )
    }

    #[tokio::test]
    async fn single_harvest_plot_grows_then_spawns_once() {
        let engine = engine(starter_catalog().unwrap());
        // Carrot: 4 stages of 90 s.
        let plot = farm(engine.store(), Some(PlantTypeId(1)), at(12, 0, 0)).await;

        let first = engine.update_user(plot.user_id, at(12, 3, 0)).await.unwrap();
        assert_eq!(first.stages_advanced, 1);
        assert_eq!(first.fruit_spawned, 0);
        assert_eq!(engine.store().plot(plot.id).await.unwrap().growth_stage, 3);

        let second = engine.update_user(plot.user_id, at(12, 5, 1)).await.unwrap();
        assert_eq!(second.fruit_spawned, 1);
        let stored = engine.store().plot(plot.id).await.unwrap();
        assert_eq!(stored.growth_stage, 4);
        assert_eq!(stored.last_spawn_attempt_at, Some(at(12, 5, 1)));

        let third = engine.update_user(plot.user_id, at(12, 9, 0)).await.unwrap();
        assert_eq!(third.fruit_spawned, 0);
        assert_eq!(engine.store().all_fruit().await.len(), 1);
    }

    #[tokio::test]
    async fn repeated_update_at_same_instant_is_a_no_op() {
        let engine = engine(starter_catalog().unwrap());
        let plot = farm(engine.store(), Some(PlantTypeId(1)), at(12, 0, 0)).await;
        let now = at(12, 7, 0);

        let _ = engine.update_user(plot.user_id, now).await.unwrap();
        let plot_after = engine.store().plot(plot.id).await.unwrap();
        let fruit_after = engine.store().all_fruit().await;

        let again = engine.update_user(plot.user_id, now).await.unwrap();
        assert_eq!(again.stages_advanced, 0);
        assert_eq!(again.fruit_spawned, 0);
        assert_eq!(engine.store().plot(plot.id).await.unwrap(), plot_after);
        assert_eq!(engine.store().all_fruit().await.len(), fruit_after.len());
    }

    #[tokio::test]
    async fn overlapping_updates_spawn_single_harvest_fruit_once() {
        let engine = yielding_engine();
        let plot = farm(&engine.store().0, Some(PlantTypeId(1)), at(12, 0, 0)).await;
        let now = at(12, 7, 0);

        let (a, b) = tokio::join!(
            engine.update_user(plot.user_id, now),
            engine.update_user(plot.user_id, now)
        );
        assert_eq!(a.unwrap().fruit_spawned + b.unwrap().fruit_spawned, 1);
        assert_eq!(engine.store().0.count_plot_fruit(plot.id).await.unwrap(), 1);
        assert_eq!(engine.store().0.all_fruit().await.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_updates_spawn_perennial_fruit_once_per_minute() {
        let engine = yielding_engine();
        let plot = farm(&engine.store().0, Some(PlantTypeId(3)), at(11, 0, 0)).await;

        let (a, b) = tokio::join!(
            engine.update_user(plot.user_id, at(12, 0, 10)),
            engine.update_user(plot.user_id, at(12, 0, 40))
        );
        assert_eq!(a.unwrap().fruit_spawned + b.unwrap().fruit_spawned, 1);
        assert_eq!(engine.store().0.all_fruit().await.len(), 1);
    }

    #[tokio::test]
    async fn perennial_spawns_once_per_even_minute() {
        let engine = engine(starter_catalog().unwrap());
        // Apple Tree: 120 s per stage; 16 stages need 30 min.
        let plot = farm(engine.store(), Some(PlantTypeId(3)), at(11, 0, 0)).await;

        let even = engine.update_user(plot.user_id, at(12, 0, 10)).await.unwrap();
        assert_eq!(even.fruit_spawned, 1);
        let same_minute = engine.update_user(plot.user_id, at(12, 0, 50)).await.unwrap();
        assert_eq!(same_minute.fruit_spawned, 0);
        let odd = engine.update_user(plot.user_id, at(12, 1, 0)).await.unwrap();
        assert_eq!(odd.fruit_spawned, 0);
        let next_even = engine.update_user(plot.user_id, at(12, 2, 0)).await.unwrap();
        assert_eq!(next_even.fruit_spawned, 1);
    }

    #[tokio::test]
    async fn perennial_stops_at_fruit_cap() {
        let engine = engine(starter_catalog().unwrap());
        let plot = farm(engine.store(), Some(PlantTypeId(3)), at(10, 0, 0)).await;
        for minute in (0..40).step_by(2) {
            let _ = engine.update_user(plot.user_id, at(12, minute, 0)).await.unwrap();
        }
        assert_eq!(engine.store().count_plot_fruit(plot.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn zero_weight_plant_aborts_spawn_without_stamping() {
        let plant = PlantType {
            id: PlantTypeId(1),
            name: "Barren".to_owned(),
            base_price: 1.0,
            seed_price: 1,
            max_growth_stage: 1,
            growth_time_per_stage_seconds: 60,
            harvest_behavior: HarvestBehavior::SingleHarvest,
        };
        let fruit = FruitType {
            id: FruitTypeId(1),
            plant_type_id: PlantTypeId(1),
            color_name: "Grey".to_owned(),
            color_tag: "normal".to_owned(),
            rarity_weight: 0.0,
            price_multiplier: 1.0,
        };
        let catalog = Catalog::new(vec![plant], vec![fruit], Vec::new(), Vec::new(), Vec::new()).unwrap();
        let engine = engine(catalog);
        let plot = farm(engine.store(), Some(PlantTypeId(1)), at(12, 0, 0)).await;

        let update = engine.update_user(plot.user_id, at(12, 1, 0)).await.unwrap();
        assert_eq!(update.fruit_spawned, 0);
        assert_eq!(update.skipped, 1);
        assert!(engine.store().all_fruit().await.is_empty());
        assert_eq!(engine.store().plot(plot.id).await.unwrap().last_spawn_attempt_at, None);
    }

    #[tokio::test]
    async fn weather_sticks_to_hanging_fruit() {
        let plant = PlantType {
            id: PlantTypeId(1),
            name: "Sprout".to_owned(),
            base_price: 1.0,
            seed_price: 1,
            max_growth_stage: 1,
            growth_time_per_stage_seconds: 60,
            harvest_behavior: HarvestBehavior::SingleHarvest,
        };
        let fruit = FruitType {
            id: FruitTypeId(1),
            plant_type_id: PlantTypeId(1),
            color_name: "Green".to_owned(),
            color_tag: "normal".to_owned(),
            rarity_weight: 1.0,
            price_multiplier: 1.0,
        };
        let storm = WeatherType {
            id: WeatherId(1),
            name: "Storm".to_owned(),
            spawn_probability: 1.0,
            stick_probability: 1.0,
            price_multiplier: 2.0,
        };
        let catalog =
            Catalog::new(vec![plant], vec![fruit], Vec::new(), vec![storm], Vec::new()).unwrap();
        let engine = engine(catalog);
        let plot = farm(engine.store(), Some(PlantTypeId(1)), at(12, 0, 0)).await;

        // Minute 4: no weather yet; the fruit spawns bare.
        let spawned = engine.update_user(plot.user_id, at(12, 4, 0)).await.unwrap();
        assert_eq!(spawned.fruit_spawned, 1);
        assert!(!spawned.weather_refreshed);

        // Minute 5: storm rolls in and sticks.
        let stormy = engine.update_user(plot.user_id, at(12, 5, 0)).await.unwrap();
        assert!(stormy.weather_refreshed);
        assert_eq!(stormy.fruit_weather_updated, 1);
        let fruit = engine.store().plot_fruit(plot.id).await.unwrap();
        assert_eq!(fruit[0].weather_effects.len(), 1);
        assert_eq!(fruit[0].weather_effects[0].applied_at, at(12, 5, 0));

        // Still inside the effect lifetime: nothing is rewritten.
        let calm = engine.update_user(plot.user_id, at(12, 6, 0)).await.unwrap();
        assert_eq!(calm.fruit_weather_updated, 0);

        // Expired: dropped and immediately re-rolled from the ambient storm.
        let later = at(12, 5, 0) + TimeDelta::seconds(120);
        let renewed = engine.update_user(plot.user_id, later).await.unwrap();
        assert_eq!(renewed.fruit_weather_updated, 1);
        let fruit = engine.store().plot_fruit(plot.id).await.unwrap();
        assert_eq!(fruit[0].weather_effects[0].applied_at, later);
    }

    #[tokio::test]
    async fn boosted_plot_still_spawns_catalog_fruit() {
        let engine = engine(starter_catalog().unwrap());
        let mut plot = farm(engine.store(), Some(PlantTypeId(1)), at(12, 0, 0)).await;
        plot.effects.set(
            BoostKind::TriColorBoost,
            TimedEffect {
                expires_at: at(13, 0, 0),
                magnitude: 1.0,
            },
        );
        engine.store().add_plot(plot.clone()).await;
        let update = engine.update_user(plot.user_id, at(12, 10, 0)).await.unwrap();
        assert_eq!(update.fruit_spawned, 1);
        let fruit = engine.store().all_fruit().await;
        assert!(engine.catalog().fruit_type(fruit[0].fruit_type_id).is_some());
    }

    #[tokio::test]
    async fn store_failure_skips_only_the_failing_plot() {
        let engine = engine(starter_catalog().unwrap());
        let healthy = farm(engine.store(), Some(PlantTypeId(1)), at(12, 0, 0)).await;
        let mut broken = Plot::empty(healthy.user_id, 2);
        broken.plant_type_id = Some(PlantTypeId(1));
        broken.growth_stage = 1;
        broken.planted_at = Some(at(12, 0, 0));
        engine.store().add_plot(broken.clone()).await;
        engine.store().fail_writes_to(broken.id).await;

        let update = engine.update_user(healthy.user_id, at(12, 10, 0)).await.unwrap();
        assert_eq!(update.stages_advanced, 1);
        assert_eq!(update.fruit_spawned, 1);
        // Only the growth write is attempted; the plot then sits out weather
        // and spawn instead of spawning from its unsaved stage.
        assert_eq!(update.skipped, 1);
        assert_eq!(engine.store().plot(broken.id).await.unwrap().growth_stage, 1);
        assert!(engine.store().all_fruit().await.iter().all(|f| f.plot_id == Some(healthy.id)));
        assert_eq!(engine.store().plot(healthy.id).await.unwrap().growth_stage, 4);
    }

    #[tokio::test]
    async fn unknown_plant_type_is_skipped() {
        let engine = engine(starter_catalog().unwrap());
        let plot = farm(engine.store(), Some(PlantTypeId(404)), at(12, 0, 0)).await;
        let update = engine.update_user(plot.user_id, at(12, 10, 0)).await.unwrap();
        assert_eq!(update.skipped, 1);
        assert_eq!(update.fruit_spawned, 0);
    }

    #[tokio::test]
    async fn empty_plots_are_ignored() {
        let engine = engine(starter_catalog().unwrap());
        let plot = farm(engine.store(), None, at(12, 0, 0)).await;
        let update = engine.update_user(plot.user_id, at(12, 10, 0)).await.unwrap();
        assert_eq!(update, UserUpdate { user: plot.user_id, weather_refreshed: true, ..UserUpdate::default() });
    }
}
