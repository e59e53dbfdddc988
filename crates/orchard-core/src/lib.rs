//! Orchestration for the Orchard farming simulation.
//!
//! This crate owns the per-user update (Growth, Weather, Spawn) that both
//! the background sweep and foreground reads run, the storage contract the
//! update runs against, and the farmer actions that change a farm.
//!
//! # Modules
//!
//! - [`actions`] -- Planting, consumables, harvesting, selling, digging up
//!   and the refreshed farm view.
//! - [`config`] -- Configuration loading from `orchard-config.yaml` into
//!   strongly-typed structs.
//! - [`memory`] -- In-memory [`FarmStore`] for tests and database-free runs.
//! - [`runner`] -- The periodic sweep and its scheduler.
//! - [`store`] -- The [`FarmStore`] persistence trait.
//! - [`tick`] -- The [`Engine`] and its three-phase per-user update.
//!
//! [`FarmStore`]: store::FarmStore
//! [`Engine`]: tick::Engine

pub mod actions;
pub mod config;
pub mod memory;
pub mod runner;
pub mod store;
pub mod tick;

pub use actions::{ActionError, FarmView, PlotView, SaleReceipt};
pub use config::{ConfigError, FarmConfig};
pub use memory::MemoryStore;
pub use runner::{SchedulerEnd, SchedulerResult, SweepSummary, run_scheduler, run_sweep};
pub use store::{FarmStore, StoreError};
pub use tick::{Engine, EngineRules, TickError, UserUpdate};
