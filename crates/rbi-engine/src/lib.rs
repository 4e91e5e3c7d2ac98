//! Classification, harmonization and road buffering for RBI base-map data.
//!
//! # Architecture
//!
//! - **loaders**: `LayerLoader` trait with geodatabase and shapefile-directory
//!   variants, selected through an explicit `LoaderRegistry`
//! - **catalog**: layer enumeration with geometry-type and category inference
//! - **harmonize**: projection of drifting column schemas onto a reference
//! - **roads**: remark-driven road classes and per-feature buffers
//! - **engine**: `RbiEngine`, which owns the configuration and catalog cache

pub mod catalog;
pub mod engine;
pub mod harmonize;
pub mod loaders;
pub mod roads;

pub use catalog::{
    LayerCatalog, LayerCatalogEntry, build_catalog, detect_category, infer_geometry_type,
};
pub use engine::{CategoryQuery, RbiEngine};
pub use harmonize::harmonize;
pub use loaders::{GdbLoader, LayerLoader, LoaderRegistry, ShapefileLoader};
pub use roads::{DEFAULT_BUFFER_WIDTH, RoadClassification, classify_road};
