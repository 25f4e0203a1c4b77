//! Data structures for stats files.
//!
//! Building hitpoints and troop combat stats are data-driven. The types here
//! mirror the JSON stats file one-to-one; [`StatsTable`] turns them into the
//! lookups the engine consumes.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `raid_headless`.

mod building_data;
mod stats_table;
mod troop_data;

pub use building_data::{BuildingData, HitpointTable};
pub use stats_table::{StatsFile, StatsTable};
pub use troop_data::TroopData;
