//! Source-type-specific layer listing and loading.
//!
//! Loaders never fail: listing and loading errors are logged and turned into
//! an empty list or an empty table, so one bad source or layer cannot abort
//! a multi-source catalog or category load.

use rbi_core::config::{Source, SourceType};
use rbi_core::geo::{GeoError, GeoReader, Reprojector};
use rbi_core::table::{FeatureTable, LAYER_COLUMN, SOURCE_COLUMN, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Capability set shared by every container shape.
pub trait LayerLoader: Send + Sync {
    /// Names of the layers available in the source.
    fn list_layers(&self, source: &Source) -> Vec<String>;

    /// Load one layer, reprojected into `target_crs` and stamped with the
    /// `_source` / `_layer` provenance columns.
    fn load(&self, source: &Source, layer_name: &str, target_crs: &str) -> FeatureTable;
}

/// Reproject and stamp provenance onto a freshly read table.
fn finish(
    table: FeatureTable,
    reprojector: &dyn Reprojector,
    source: &Source,
    layer_name: &str,
    target_crs: &str,
) -> Result<FeatureTable, GeoError> {
    let mut table = table.to_crs(reprojector, target_crs)?;
    table.fill_column(SOURCE_COLUMN, &Value::from(source.region.as_str()));
    table.fill_column(LAYER_COLUMN, &Value::from(layer_name));
    Ok(table)
}

/// Multi-layer container files (file geodatabases).
pub struct GdbLoader {
    reader: Arc<dyn GeoReader>,
    reprojector: Arc<dyn Reprojector>,
}

impl GdbLoader {
    pub fn new(reader: Arc<dyn GeoReader>, reprojector: Arc<dyn Reprojector>) -> Self {
        Self {
            reader,
            reprojector,
        }
    }
}

impl LayerLoader for GdbLoader {
    fn list_layers(&self, source: &Source) -> Vec<String> {
        match self.reader.list_layers(&source.path) {
            Ok(layers) => layers,
            Err(e) => {
                tracing::error!("Failed listing GDB layers in {}: {}", source.name, e);
                Vec::new()
            }
        }
    }

    fn load(&self, source: &Source, layer_name: &str, target_crs: &str) -> FeatureTable {
        let result = self
            .reader
            .read_layer(&source.path, Some(layer_name))
            .and_then(|table| {
                finish(table, self.reprojector.as_ref(), source, layer_name, target_crs)
            });
        match result {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("Failed loading {} from {}: {}", layer_name, source.name, e);
                FeatureTable::empty()
            }
        }
    }
}

/// Directories of single-layer `.shp` files.
pub struct ShapefileLoader {
    reader: Arc<dyn GeoReader>,
    reprojector: Arc<dyn Reprojector>,
}

impl ShapefileLoader {
    pub fn new(reader: Arc<dyn GeoReader>, reprojector: Arc<dyn Reprojector>) -> Self {
        Self {
            reader,
            reprojector,
        }
    }
}

/// Stems of `*.shp` files directly inside `dir`, sorted.
fn shapefile_stems(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("shp") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

impl LayerLoader for ShapefileLoader {
    fn list_layers(&self, source: &Source) -> Vec<String> {
        if !source.path.is_dir() {
            return Vec::new();
        }
        match shapefile_stems(&source.path) {
            Ok(stems) => stems,
            Err(e) => {
                tracing::error!(
                    "Failed listing shapefiles in {}: {}",
                    source.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn load(&self, source: &Source, layer_name: &str, target_crs: &str) -> FeatureTable {
        let shp_path = source.path.join(format!("{layer_name}.shp"));
        if !shp_path.exists() {
            tracing::warn!("Shapefile not found: {}", shp_path.display());
            return FeatureTable::empty();
        }

        let result = self.reader.read_layer(&shp_path, None).and_then(|table| {
            finish(table, self.reprojector.as_ref(), source, layer_name, target_crs)
        });
        match result {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("Failed loading {}: {}", shp_path.display(), e);
                FeatureTable::empty()
            }
        }
    }
}

/// Explicit source-type → loader table.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<SourceType, Box<dyn LayerLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the geodatabase and shapefile-directory loaders.
    pub fn standard(reader: Arc<dyn GeoReader>, reprojector: Arc<dyn Reprojector>) -> Self {
        let mut registry = Self::new();
        registry.register(
            SourceType::Gdb,
            Box::new(GdbLoader::new(Arc::clone(&reader), Arc::clone(&reprojector))),
        );
        registry.register(
            SourceType::Shapefile,
            Box::new(ShapefileLoader::new(reader, reprojector)),
        );
        registry
    }

    /// Add or replace the loader for a source type.
    pub fn register(&mut self, source_type: SourceType, loader: Box<dyn LayerLoader>) {
        self.loaders.insert(source_type, loader);
    }

    pub fn get(&self, source_type: SourceType) -> Option<&dyn LayerLoader> {
        self.loaders.get(&source_type).map(|loader| &**loader)
    }

    pub fn contains(&self, source_type: SourceType) -> bool {
        self.loaders.contains_key(&source_type)
    }
}
