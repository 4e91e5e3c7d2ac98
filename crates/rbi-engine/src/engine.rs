//! `RbiEngine`: catalog caching, category loading and road buffering over a
//! fixed configuration.

use crate::catalog::{LayerCatalog, LayerCatalogEntry, build_catalog};
use crate::harmonize::harmonize_to_columns;
use crate::loaders::LoaderRegistry;
use crate::roads::{ROAD_CATEGORY, assign_road_classes, buffer_features};
use rbi_core::config::{ConfigError, RbiConfig};
use rbi_core::geo::{Bufferer, GeoBackend, GeometryType, Reprojector};
use rbi_core::table::FeatureTable;
use std::path::Path;
use std::sync::Arc;

/// Filters for [`RbiEngine::load_category`].
#[derive(Debug, Clone)]
pub struct CategoryQuery {
    /// Only layers from these regions. `None` or an empty list loads all.
    pub regions: Option<Vec<String>>,
    pub geometry_type: Option<GeometryType>,
    /// Project every loaded table onto the first one's columns.
    pub harmonize_fields: bool,
}

impl Default for CategoryQuery {
    fn default() -> Self {
        Self {
            regions: None,
            geometry_type: None,
            harmonize_fields: true,
        }
    }
}

impl CategoryQuery {
    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    pub fn geometry_type(mut self, geometry_type: GeometryType) -> Self {
        self.geometry_type = Some(geometry_type);
        self
    }

    pub fn harmonize_fields(mut self, harmonize: bool) -> Self {
        self.harmonize_fields = harmonize;
        self
    }
}

/// Single-threaded pipeline over one configuration.
///
/// The catalog is computed on first use and cached until
/// [`invalidate_catalog`](Self::invalidate_catalog) or a forced refresh;
/// it does not notice changes in the underlying sources.
pub struct RbiEngine {
    config: RbiConfig,
    loaders: LoaderRegistry,
    reprojector: Arc<dyn Reprojector>,
    bufferer: Arc<dyn Bufferer>,
    catalog: Option<LayerCatalog>,
}

impl RbiEngine {
    /// Engine with the standard geodatabase and shapefile loaders.
    pub fn new(config: RbiConfig, backend: GeoBackend) -> Self {
        let loaders =
            LoaderRegistry::standard(Arc::clone(&backend.reader), Arc::clone(&backend.reprojector));
        Self::with_loaders(config, loaders, backend)
    }

    /// Engine with a caller-supplied loader registry.
    pub fn with_loaders(config: RbiConfig, loaders: LoaderRegistry, backend: GeoBackend) -> Self {
        Self {
            config,
            loaders,
            reprojector: backend.reprojector,
            bufferer: backend.bufferer,
            catalog: None,
        }
    }

    pub fn from_config_file(path: &Path, backend: GeoBackend) -> Result<Self, ConfigError> {
        Ok(Self::new(RbiConfig::load(path)?, backend))
    }

    pub fn config(&self) -> &RbiConfig {
        &self.config
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    /// The cached catalog, if one has been built.
    pub fn cached_catalog(&self) -> Option<&LayerCatalog> {
        self.catalog.as_ref()
    }

    /// Drop the cached catalog; the next request rebuilds it.
    pub fn invalidate_catalog(&mut self) {
        self.catalog = None;
    }

    /// Catalog of every (source, layer) pair. Rebuilt only when nothing is
    /// cached or `force_refresh` is set.
    pub fn catalog_layers(&mut self, force_refresh: bool) -> &LayerCatalog {
        if force_refresh {
            self.invalidate_catalog();
        }
        self.catalog
            .get_or_insert_with(|| build_catalog(&self.config, &self.loaders))
    }

    /// Load every catalogued layer of `category` into one table in the
    /// target CRS. No matching data yields an empty table.
    pub fn load_category(&mut self, category: &str, query: &CategoryQuery) -> FeatureTable {
        tracing::info!("Loading category: {}", category.to_uppercase());

        let selected: Vec<LayerCatalogEntry> = self
            .catalog_layers(false)
            .select(category, query.regions.as_deref(), query.geometry_type)
            .cloned()
            .collect();

        let target_crs = self.config.target_crs.as_str();
        let mut tables = Vec::with_capacity(selected.len());
        for entry in &selected {
            let Some(source) = self.config.source(&entry.source) else {
                tracing::warn!("Catalog references unknown source {}", entry.source);
                continue;
            };
            let Some(loader) = self.loaders.get(source.source_type) else {
                continue;
            };
            let table = loader.load(source, &entry.layer, target_crs);
            if !table.is_empty() {
                tables.push(table);
            }
        }

        if tables.is_empty() {
            return FeatureTable::empty_with_crs(target_crs);
        }

        if query.harmonize_fields {
            let reference: Vec<String> = tables[0]
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            tables = tables
                .into_iter()
                .map(|table| harmonize_to_columns(table, &reference))
                .collect();
        }

        let merged = FeatureTable::concat(tables, Some(target_crs.to_string()));
        tracing::info!("Loaded {} {} features", merged.len(), category);
        merged
    }

    /// Load line roads, classify them by remark, buffer each by its class
    /// width in the metric CRS, and return the polygons in the target CRS.
    pub fn load_roads_buffered(
        &mut self,
        regions: Option<&[String]>,
        default_buffer: f64,
    ) -> FeatureTable {
        tracing::info!("Loading road...");
        let mut query = CategoryQuery::default().geometry_type(GeometryType::Line);
        query.regions = regions.map(<[String]>::to_vec);

        let roads = self.load_category(ROAD_CATEGORY, &query);
        let target_crs = self.config.target_crs.clone();
        if roads.is_empty() {
            return FeatureTable::empty_with_crs(&target_crs);
        }

        let mut roads = match roads.to_crs(self.reprojector.as_ref(), &self.config.metric_crs) {
            Ok(roads) => roads,
            Err(e) => {
                tracing::error!(
                    "Failed reprojecting roads to {}: {}",
                    self.config.metric_crs,
                    e
                );
                return FeatureTable::empty_with_crs(&target_crs);
            }
        };

        assign_road_classes(&mut roads, &self.config.road_buffers, default_buffer);
        let buffered = buffer_features(roads, self.bufferer.as_ref(), default_buffer);

        match buffered.to_crs(self.reprojector.as_ref(), &target_crs) {
            Ok(buffered) => buffered,
            Err(e) => {
                tracing::error!("Failed reprojecting road buffers to {}: {}", target_crs, e);
                FeatureTable::empty_with_crs(&target_crs)
            }
        }
    }
}

impl std::fmt::Debug for RbiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbiEngine")
            .field("sources", &self.config.sources.len())
            .field("catalog_cached", &self.catalog.is_some())
            .finish_non_exhaustive()
    }
}
