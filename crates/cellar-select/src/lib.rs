pub mod config;
pub mod error;
pub mod selection;
pub mod telemetry;

/// Sample catalog shipped with the crate, used when no catalog path is configured.
pub const BUNDLED_CATALOG_CSV: &str = include_str!("../wine_catalog.csv");
