//! Core types for the RBI engine.
//!
//! Provides the declarative configuration model ([`config::RbiConfig`]), the
//! in-memory feature table ([`table::FeatureTable`]), and the collaborator
//! traits through which the engine reaches the geospatial stack
//! ([`geo::GeoReader`], [`geo::Reprojector`], [`geo::Bufferer`]).

pub mod config;
pub mod geo;
pub mod table;

pub use config::{
    ConfigError, ConfigIssue, LandUseCategory, LayerPattern, RbiConfig, RoadBuffer, Source,
    SourceType,
};
pub use geo::{Bufferer, GeoBackend, GeoError, GeoReader, GeometryType, Reprojector};
pub use table::{Feature, FeatureTable, Value};
