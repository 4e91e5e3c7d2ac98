//! Layer catalog: every (source, layer) pair tagged with its inferred
//! geometry type and semantic category.

use crate::loaders::LoaderRegistry;
use rbi_core::config::RbiConfig;
use rbi_core::geo::GeometryType;

/// One (source, layer) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerCatalogEntry {
    pub source: String,
    pub region: String,
    pub layer: String,
    pub category: Option<String>,
    pub geometry_type: Option<GeometryType>,
}

/// Ordered catalog entries, in source then listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerCatalog {
    entries: Vec<LayerCatalogEntry>,
}

impl LayerCatalog {
    pub fn new(entries: Vec<LayerCatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LayerCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerCatalogEntry> {
        self.entries.iter()
    }

    /// Entries of exactly `category`, optionally narrowed to `regions`
    /// (an empty slice means no region filter) and a geometry type.
    pub fn select<'a>(
        &'a self,
        category: &'a str,
        regions: Option<&'a [String]>,
        geometry_type: Option<GeometryType>,
    ) -> impl Iterator<Item = &'a LayerCatalogEntry> + 'a {
        self.entries.iter().filter(move |entry| {
            entry.category.as_deref() == Some(category)
                && regions.is_none_or(|r| r.is_empty() || r.contains(&entry.region))
                && geometry_type.is_none_or(|g| entry.geometry_type == Some(g))
        })
    }
}

impl<'a> IntoIterator for &'a LayerCatalog {
    type Item = &'a LayerCatalogEntry;
    type IntoIter = std::slice::Iter<'a, LayerCatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Geometry type from RBI layer-name tokens: `_AR_`/`_AR` polygon,
/// `_LN_`/`_LN` line, `_PT_`/`_PT` point, checked in that order.
pub fn infer_geometry_type(layer_name: &str) -> Option<GeometryType> {
    const TOKENS: [(&str, &str, GeometryType); 3] = [
        ("_AR_", "_AR", GeometryType::Polygon),
        ("_LN_", "_LN", GeometryType::Line),
        ("_PT_", "_PT", GeometryType::Point),
    ];
    TOKENS
        .iter()
        .find(|(infix, suffix, _)| layer_name.contains(infix) || layer_name.ends_with(suffix))
        .map(|(_, _, geometry_type)| *geometry_type)
}

/// Category of the first layer pattern, in declaration order, matching the name.
pub fn detect_category<'a>(config: &'a RbiConfig, layer_name: &str) -> Option<&'a str> {
    config
        .layer_patterns
        .iter()
        .find(|pattern| pattern.matches(layer_name))
        .map(|pattern| pattern.category.as_str())
}

/// Enumerate every configured source through its registered loader.
/// Sources whose type has no loader are skipped.
pub fn build_catalog(config: &RbiConfig, loaders: &LoaderRegistry) -> LayerCatalog {
    tracing::info!("Cataloging RBI layers...");
    let mut entries = Vec::new();

    for source in &config.sources {
        let Some(loader) = loaders.get(source.source_type) else {
            tracing::debug!(
                "No loader registered for {} source {}; skipping",
                source.source_type,
                source.name
            );
            continue;
        };

        for layer in loader.list_layers(source) {
            entries.push(LayerCatalogEntry {
                source: source.name.clone(),
                region: source.region.clone(),
                category: detect_category(config, &layer).map(str::to_string),
                geometry_type: infer_geometry_type(&layer),
                layer,
            });
        }
    }

    tracing::info!("Found {} layers", entries.len());
    LayerCatalog::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbi_core::config::LayerPattern;

    fn config_with(patterns: Vec<LayerPattern>) -> RbiConfig {
        RbiConfig {
            layer_patterns: patterns,
            ..RbiConfig::default()
        }
    }

    #[test]
    fn test_infer_geometry_type_infix_and_suffix() {
        assert_eq!(
            infer_geometry_type("BANGUNAN_AR_25K"),
            Some(GeometryType::Polygon)
        );
        assert_eq!(infer_geometry_type("BANGUNAN_AR"), Some(GeometryType::Polygon));
        assert_eq!(infer_geometry_type("JALAN_LN_25K"), Some(GeometryType::Line));
        assert_eq!(infer_geometry_type("JALAN_LN"), Some(GeometryType::Line));
        assert_eq!(infer_geometry_type("TOPONIMI_PT_50K"), Some(GeometryType::Point));
        assert_eq!(infer_geometry_type("TOPONIMI_PT"), Some(GeometryType::Point));
    }

    #[test]
    fn test_infer_geometry_type_unknown() {
        assert_eq!(infer_geometry_type("ADMINISTRASI"), None);
        assert_eq!(infer_geometry_type("JALAN_LNX"), None);
        assert_eq!(infer_geometry_type("jalan_ln_25k"), None);
        assert_eq!(infer_geometry_type(""), None);
    }

    #[test]
    fn test_infer_geometry_type_polygon_before_line() {
        assert_eq!(
            infer_geometry_type("SUNGAI_LN_AR_25K"),
            Some(GeometryType::Polygon)
        );
        assert_eq!(infer_geometry_type("X_PT_Y_LN"), Some(GeometryType::Line));
    }

    #[test]
    fn test_detect_category_first_match_wins() {
        let config = config_with(vec![
            LayerPattern::new("road", Vec::<String>::new(), &["JALAN"]).unwrap(),
            LayerPattern::new("railway", Vec::<String>::new(), &["JALAN_KA"]).unwrap(),
        ]);
        assert_eq!(detect_category(&config, "JALAN_KA_LN_25K"), Some("road"));

        let reversed = config_with(vec![
            LayerPattern::new("railway", Vec::<String>::new(), &["JALAN_KA"]).unwrap(),
            LayerPattern::new("road", Vec::<String>::new(), &["JALAN"]).unwrap(),
        ]);
        assert_eq!(detect_category(&reversed, "JALAN_KA_LN_25K"), Some("railway"));
        assert_eq!(detect_category(&reversed, "JALAN_LN_25K"), Some("road"));
    }

    #[test]
    fn test_detect_category_none() {
        let config = config_with(vec![
            LayerPattern::new("building", ["BANGUNAN_AR_25K"], &[]).unwrap(),
        ]);
        assert_eq!(detect_category(&config, "SUNGAI_LN_25K"), None);
    }

    #[test]
    fn test_select_filters() {
        let entry = |region: &str, layer: &str, category: Option<&str>| LayerCatalogEntry {
            source: format!("{region}_src"),
            region: region.to_string(),
            layer: layer.to_string(),
            category: category.map(str::to_string),
            geometry_type: infer_geometry_type(layer),
        };
        let catalog = LayerCatalog::new(vec![
            entry("jabar", "JALAN_LN_25K", Some("road")),
            entry("jabar", "JALAN_AR_25K", Some("road")),
            entry("banten", "JALAN_LN_25K", Some("road")),
            entry("banten", "BANGUNAN_AR_25K", Some("building")),
            entry("banten", "LAINNYA", None),
        ]);

        assert_eq!(catalog.select("road", None, None).count(), 3);
        let regions = vec!["banten".to_string()];
        assert_eq!(catalog.select("road", Some(regions.as_slice()), None).count(), 1);
        assert_eq!(catalog.select("road", Some(&[][..]), None).count(), 3);
        assert_eq!(
            catalog
                .select("road", None, Some(GeometryType::Line))
                .count(),
            2
        );
        assert_eq!(catalog.select("Road", None, None).count(), 0);
        assert_eq!(catalog.select("landuse", None, None).count(), 0);
    }
}
