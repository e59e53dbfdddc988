//! Type-safe identifier wrappers.
//!
//! Player-owned records (farmers, plots, fruit) use UUID v7 (time-ordered)
//! identifiers so they index well and can be generated app-side. Catalog
//! records (plants, fruit types, consumables, weather) are authored data with
//! small stable integer ids that appear verbatim in weather combinations and
//! in stored effect lists.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around a `u32` catalog key.
macro_rules! define_catalog_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u32);

        impl $name {
            /// Return the raw catalog key.
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a farmer (player account).
    UserId
}

define_id! {
    /// Unique identifier for a plot owned by a farmer.
    PlotId
}

define_id! {
    /// Unique identifier for a single fruit instance.
    FruitId
}

define_catalog_id! {
    /// Catalog key of a plant type.
    PlantTypeId
}

define_catalog_id! {
    /// Catalog key of a fruit type (a colour variant of a plant).
    FruitTypeId
}

define_catalog_id! {
    /// Catalog key of a consumable (fertilizer) type.
    ConsumableId
}

define_catalog_id! {
    /// Catalog key of a weather type.
    WeatherId
}

define_catalog_id! {
    /// Catalog key of a multi-weather combination.
    CombinationId
}
