//! The persistence contract the engine runs against.
//!
//! All durable state lives behind [`FarmStore`]. The engine never holds a
//! transaction across calls, so every method must be safe to run
//! concurrently with the same method from another trigger. Writes that
//! depend on state the engine read earlier re-check that state when they
//! land: [`FarmStore::update_plot_growth`] only ever raises a stage,
//! [`FarmStore::insert_spawned_fruit`] re-applies the [`SpawnGuard`], and
//! [`FarmStore::settle_sale`] only sells fruit that is still unsold.

use std::future::Future;

use chrono::{DateTime, Utc};
use orchard_types::{
    Fruit, FruitId, PlantTypeId, Plot, PlotEffects, PlotId, UserId, WeatherEffect,
};
use orchard_world::SpawnGuard;

/// Errors surfaced by a [`FarmStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not complete the request.
    #[error("store backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// A stored record could not be decoded.
    #[error("corrupt stored record: {message}")]
    Corrupt {
        /// Description of the bad record.
        message: String,
    },
}

/// Storage operations used by the tick orchestrator and the farm actions.
///
/// Lookups scoped by [`UserId`] return `None` for records owned by another
/// farmer.
pub trait FarmStore: Send + Sync {
    /// Every farmer id, in a stable order.
    fn list_user_ids(&self) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;

    /// Every plot owned by `user`, ordered by plot number.
    fn user_plots(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<Plot>, StoreError>> + Send;

    /// Plots owned by `user` with a crop in them, ordered by plot number.
    fn planted_plots(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<Plot>, StoreError>> + Send;

    /// A single plot owned by `user`.
    fn get_plot(
        &self,
        user: UserId,
        plot: PlotId,
    ) -> impl Future<Output = Result<Option<Plot>, StoreError>> + Send;

    /// Raise the plot's stage to `stage` and stamp `at`, only if the stored
    /// stage is lower. Returns whether a row changed.
    fn update_plot_growth(
        &self,
        plot: PlotId,
        stage: u32,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Unharvested fruit hanging on `plot`, oldest first.
    fn plot_fruit(&self, plot: PlotId)
    -> impl Future<Output = Result<Vec<Fruit>, StoreError>> + Send;

    /// Number of unharvested fruit hanging on `plot`.
    fn count_plot_fruit(&self, plot: PlotId)
    -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Replace a fruit's weather effect list.
    fn update_fruit_weather(
        &self,
        fruit: FruitId,
        effects: &[WeatherEffect],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert a newly spawned fruit on `plot` and stamp the plot's last
    /// spawn time with `at`, as one atomic write.
    ///
    /// Nothing is written unless the stored plot still passes `guard` at
    /// `at`. Returns whether the fruit was inserted.
    fn insert_spawned_fruit(
        &self,
        plot: PlotId,
        fruit: &Fruit,
        guard: SpawnGuard,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Replace the plot's timed effect map.
    fn update_plot_effects(
        &self,
        plot: PlotId,
        effects: &PlotEffects,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Add `seconds` to the plot's accumulated growth boost.
    fn add_growth_boost(
        &self,
        plot: PlotId,
        seconds: f64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Plant `plant` in an empty plot: stage 1, timestamps `at`, no boost.
    fn plant(
        &self,
        plot: PlotId,
        plant: PlantTypeId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Clear the plot's crop and all growth state.
    fn reset_plot(&self, plot: PlotId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Move a fruit from its plot into inventory and stamp the plot's last
    /// harvest time.
    fn harvest_fruit(
        &self,
        fruit: FruitId,
        plot: PlotId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// A single fruit owned by `user`.
    fn get_fruit(
        &self,
        user: UserId,
        fruit: FruitId,
    ) -> impl Future<Output = Result<Option<Fruit>, StoreError>> + Send;

    /// Unsold fruit in `user`'s inventory, oldest first.
    fn inventory_fruit(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<Fruit>, StoreError>> + Send;

    /// The farmer's balance, `None` if the farmer does not exist.
    fn balance(&self, user: UserId)
    -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Sell fruit from `user`'s inventory as one atomic write.
    ///
    /// Each `(fruit, value)` pair whose fruit is still unsold in `user`'s
    /// inventory is flagged sold, and the sum of their values is credited
    /// to the balance. Other pairs are left alone. Returns the fruit that
    /// was sold.
    fn settle_sale(
        &self,
        user: UserId,
        sales: &[(FruitId, i64)],
    ) -> impl Future<Output = Result<Vec<FruitId>, StoreError>> + Send;

    /// Delete every fruit, harvested or not, still attached to `plot`.
    fn delete_plot_fruit(&self, plot: PlotId)
    -> impl Future<Output = Result<(), StoreError>> + Send;
}
