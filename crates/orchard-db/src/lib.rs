//! `PostgreSQL` data layer for the Orchard farming simulation.
//!
//! ```text
//! startup ----> CatalogStore::load_or_seed ---> Catalog (shared, immutable)
//!
//! Engine -----> PgFarmStore (FarmStore) ------> farmers / plots / fruits
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, configuration and migrations
//! - [`catalog_store`] -- Catalog table loading and starter seeding
//! - [`farm_store`] -- [`FarmStore`] implementation over the farm tables
//! - [`error`] -- Shared error types
//!
//! [`FarmStore`]: orchard_core::FarmStore

pub mod catalog_store;
pub mod error;
pub mod farm_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use catalog_store::CatalogStore;
pub use error::DbError;
pub use farm_store::PgFarmStore;
pub use postgres::{Database, PoolSettings};
