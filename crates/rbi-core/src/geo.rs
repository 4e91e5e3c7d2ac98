//! Geometry kinds and the geospatial collaborators the engine delegates to.
//!
//! Reading containers, transforming coordinates, and offsetting geometries
//! are left to whatever geospatial stack a deployment links in. The engine
//! only talks to the three traits below.

use crate::table::FeatureTable;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Coarse geometry kind of a layer, as encoded in RBI layer names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    Polygon,
    Line,
    Point,
}

impl GeometryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polygon => "polygon",
            Self::Line => "line",
            Self::Point => "point",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polygon" => Ok(Self::Polygon),
            "line" => Ok(Self::Line),
            "point" => Ok(Self::Point),
            other => Err(format!(
                "unknown geometry type '{other}' (expected polygon, line or point)"
            )),
        }
    }
}

/// Errors reported by geospatial collaborators.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("layer '{layer}' not found in {}", .path.display())]
    LayerNotFound { path: PathBuf, layer: String },
    #[error("table has no CRS; cannot transform to {target}")]
    MissingCrs { target: String },
    #[error("cannot transform from {from} to {to}: {reason}")]
    Transform {
        from: String,
        to: String,
        reason: String,
    },
    #[error("buffer failed: {0}")]
    Buffer(String),
    #[error("geospatial backend error: {0}")]
    Backend(String),
}

/// Reads layers out of geodatabases and shapefiles.
pub trait GeoReader: Send + Sync {
    /// List the layers contained in a multi-layer container (e.g. a `.gdb`).
    fn list_layers(&self, container: &Path) -> Result<Vec<String>, GeoError>;

    /// Read one layer as a feature table in its native CRS.
    ///
    /// `layer` is `None` for single-layer files such as a `.shp`.
    fn read_layer(&self, path: &Path, layer: Option<&str>) -> Result<FeatureTable, GeoError>;
}

/// Transforms geometries between coordinate reference systems.
pub trait Reprojector: Send + Sync {
    fn reproject(
        &self,
        geometry: &Geometry<f64>,
        from_crs: &str,
        to_crs: &str,
    ) -> Result<Geometry<f64>, GeoError>;
}

/// Produces the polygon offset from a geometry by a linear distance.
pub trait Bufferer: Send + Sync {
    /// `distance` is in the linear unit of the geometry's CRS.
    fn buffer(&self, geometry: &Geometry<f64>, distance: f64) -> Result<Geometry<f64>, GeoError>;
}

/// The set of collaborators an engine runs against.
#[derive(Clone)]
pub struct GeoBackend {
    pub reader: Arc<dyn GeoReader>,
    pub reprojector: Arc<dyn Reprojector>,
    pub bufferer: Arc<dyn Bufferer>,
}

impl GeoBackend {
    pub fn new(
        reader: Arc<dyn GeoReader>,
        reprojector: Arc<dyn Reprojector>,
        bufferer: Arc<dyn Bufferer>,
    ) -> Self {
        Self {
            reader,
            reprojector,
            bufferer,
        }
    }
}

impl fmt::Debug for GeoBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoBackend").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_type_parse() {
        assert_eq!("polygon".parse::<GeometryType>(), Ok(GeometryType::Polygon));
        assert_eq!("LINE".parse::<GeometryType>(), Ok(GeometryType::Line));
        assert_eq!("point".parse::<GeometryType>(), Ok(GeometryType::Point));
        assert!("multipolygon".parse::<GeometryType>().is_err());
    }

    #[test]
    fn test_geometry_type_serde_lowercase() {
        let json = serde_json::to_string(&GeometryType::Line).unwrap();
        assert_eq!(json, "\"line\"");
        let parsed: GeometryType = serde_json::from_str("\"polygon\"").unwrap();
        assert_eq!(parsed, GeometryType::Polygon);
    }

    #[test]
    fn test_geo_error_display() {
        let err = GeoError::LayerNotFound {
            path: PathBuf::from("/data/jabar.gdb"),
            layer: "JALAN_LN_25K".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "layer 'JALAN_LN_25K' not found in /data/jabar.gdb"
        );
    }
}
