//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

use orchard_core::StoreError;
use orchard_types::EffectCodecError;
use orchard_world::WorldError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored effect list could not be encoded or decoded.
    #[error("effect codec error: {0}")]
    Effects(#[from] EffectCodecError),

    /// A stored catalog does not form a consistent catalog.
    #[error("catalog error: {0}")]
    Catalog(#[from] WorldError),

    /// A row held a value outside its domain.
    #[error("invalid {table} row: {reason}")]
    InvalidRow {
        /// Table the row came from.
        table: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Effects(_) | DbError::InvalidRow { .. } | DbError::Catalog(_) => {
                Self::Corrupt {
                    message: err.to_string(),
                }
            }
            DbError::Postgres(_) | DbError::Migration(_) | DbError::Config(_) => Self::Backend {
                message: err.to_string(),
            },
        }
    }
}
