//! Declarative configuration: sources, layer pattern rules, land-use
//! categories, road buffer rules and CRS settings.
//!
//! YAML is the native format; files ending in `.toml` are read as TOML.
//! Both are parsed into an order-preserving document tree and validated
//! entry by entry, so every malformed entry is reported in one pass.

use crate::geo::GeometryType;
use regex::{Regex, RegexBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Doc};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_TARGET_CRS: &str = "EPSG:4326";
pub const DEFAULT_METRIC_CRS: &str = "EPSG:32748";

const KNOWN_KEYS: &[&str] = &[
    "sources",
    "layer_patterns",
    "landuse_categories",
    "road_buffers",
    "target_crs",
    "metric_crs",
];

/// Errors from loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Syntax(String),
    #[error("invalid configuration ({} issue(s)):\n{}", .0.len(), format_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

/// One malformed entry, located by its path in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub location: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Container shape of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Gdb,
    Shapefile,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gdb => "gdb",
            Self::Shapefile => "shapefile",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One regional dataset container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
    pub name: String,
    pub region: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub path: PathBuf,
}

/// Rule mapping layer names to a semantic category.
#[derive(Debug, Clone)]
pub struct LayerPattern {
    pub category: String,
    pub layer_names: BTreeSet<String>,
    pub name_patterns: Vec<Regex>,
    pub geometry_type: Option<GeometryType>,
}

impl LayerPattern {
    /// Build a rule, compiling `name_patterns` case-insensitively.
    pub fn new<I, S>(
        category: &str,
        layer_names: I,
        name_patterns: &[&str],
    ) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            category: category.to_string(),
            layer_names: layer_names.into_iter().map(Into::into).collect(),
            name_patterns: name_patterns
                .iter()
                .map(|p| compile_name_pattern(p))
                .collect::<Result<_, _>>()?,
            geometry_type: None,
        })
    }

    /// True if the name is listed exactly or any pattern matches somewhere in it.
    pub fn matches(&self, layer_name: &str) -> bool {
        self.layer_names.contains(layer_name)
            || self.name_patterns.iter().any(|re| re.is_match(layer_name))
    }
}

fn compile_name_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayerPatternEntry {
    #[serde(default)]
    layer_names: Vec<String>,
    #[serde(default)]
    name_patterns: Vec<String>,
    #[serde(default)]
    geometry_type: Option<GeometryType>,
}

/// Weighting rule for land-use remark text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LandUseCategory {
    pub name: String,
    pub weight: f64,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub description: String,
}

impl LandUseCategory {
    pub fn matches_remark(&self, remark: &str) -> bool {
        remark_contains_any(remark, &self.patterns)
    }
}

/// Buffer width assigned to roads whose remark matches one of `patterns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoadBuffer {
    pub class_name: String,
    pub width_meters: f64,
    pub patterns: Vec<String>,
}

impl RoadBuffer {
    pub fn matches_remark(&self, remark: &str) -> bool {
        remark_contains_any(remark, &self.patterns)
    }
}

/// Case-insensitive substring containment of any pattern.
fn remark_contains_any(remark: &str, patterns: &[String]) -> bool {
    let remark = remark.to_uppercase();
    patterns.iter().any(|p| remark.contains(&p.to_uppercase()))
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct RbiConfig {
    pub sources: Vec<Source>,
    /// Category rules in declaration order.
    pub layer_patterns: Vec<LayerPattern>,
    pub landuse_categories: Vec<LandUseCategory>,
    /// Road buffer rules in declaration order.
    pub road_buffers: Vec<RoadBuffer>,
    pub target_crs: String,
    pub metric_crs: String,
}

impl Default for RbiConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            layer_patterns: Vec::new(),
            landuse_categories: Vec::new(),
            road_buffers: Vec::new(),
            target_crs: DEFAULT_TARGET_CRS.to_string(),
            metric_crs: DEFAULT_METRIC_CRS.to_string(),
        }
    }
}

impl RbiConfig {
    /// Load a configuration file. `.toml` files are read as TOML, anything
    /// else as YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Self::from_document(Doc::Null);
        }
        let doc: Doc =
            serde_yml::from_str(content).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        Self::from_document(doc)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let doc: Doc = toml::from_str(content).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        Self::from_document(doc)
    }

    /// Validate a parsed document. Every malformed entry is collected before
    /// failing; missing source paths only produce warnings.
    pub fn from_document(doc: Doc) -> Result<Self, ConfigError> {
        let mut root = match doc {
            Doc::Object(map) => map,
            Doc::Null => Map::new(),
            other => {
                return Err(ConfigError::Invalid(vec![ConfigIssue {
                    location: "<root>".to_string(),
                    message: format!("expected a mapping, found {}", kind_of(&other)),
                }]));
            }
        };

        for key in root.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!("Ignoring unknown configuration key '{}'", key);
            }
        }

        let mut issues = Vec::new();

        let sources: Vec<Source> = parse_list(&mut root, "sources", &mut issues);
        let mut seen = HashSet::new();
        for (i, source) in sources.iter().enumerate() {
            if !seen.insert(source.name.as_str()) {
                issues.push(issue(
                    format!("sources[{i}].name"),
                    format!("duplicate source name '{}'", source.name),
                ));
            }
        }

        let layer_patterns = parse_layer_patterns(&mut root, &mut issues);

        let landuse_categories: Vec<LandUseCategory> =
            parse_list(&mut root, "landuse_categories", &mut issues);
        for (i, category) in landuse_categories.iter().enumerate() {
            if !category.weight.is_finite() {
                issues.push(issue(
                    format!("landuse_categories[{i}].weight"),
                    "weight must be a finite number",
                ));
            }
        }

        let road_buffers: Vec<RoadBuffer> = parse_list(&mut root, "road_buffers", &mut issues);
        for (i, rule) in road_buffers.iter().enumerate() {
            if !rule.width_meters.is_finite() || rule.width_meters < 0.0 {
                issues.push(issue(
                    format!("road_buffers[{i}].width_meters"),
                    "width must be a non-negative finite number",
                ));
            }
        }

        let target_crs = parse_crs(&mut root, "target_crs", DEFAULT_TARGET_CRS, &mut issues);
        let metric_crs = parse_crs(&mut root, "metric_crs", DEFAULT_METRIC_CRS, &mut issues);

        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }

        for source in &sources {
            if !source.path.exists() {
                tracing::warn!("Path not found: {}", source.path.display());
            }
        }

        Ok(Self {
            sources,
            layer_patterns,
            landuse_categories,
            road_buffers,
            target_crs,
            metric_crs,
        })
    }

    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Look up a layer pattern rule by category.
    pub fn layer_pattern(&self, category: &str) -> Option<&LayerPattern> {
        self.layer_patterns.iter().find(|p| p.category == category)
    }
}

fn issue(location: impl Into<String>, message: impl Into<String>) -> ConfigIssue {
    ConfigIssue {
        location: location.into(),
        message: message.into(),
    }
}

fn kind_of(doc: &Doc) -> &'static str {
    match doc {
        Doc::Null => "null",
        Doc::Bool(_) => "a boolean",
        Doc::Number(_) => "a number",
        Doc::String(_) => "a string",
        Doc::Array(_) => "a list",
        Doc::Object(_) => "a mapping",
    }
}

fn parse_list<T: DeserializeOwned>(
    root: &mut Map<String, Doc>,
    key: &str,
    issues: &mut Vec<ConfigIssue>,
) -> Vec<T> {
    let entries = match root.remove(key) {
        None | Some(Doc::Null) => return Vec::new(),
        Some(Doc::Array(entries)) => entries,
        Some(other) => {
            issues.push(issue(key, format!("expected a list, found {}", kind_of(&other))));
            return Vec::new();
        }
    };

    let mut parsed = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value(entry) {
            Ok(value) => parsed.push(value),
            Err(e) => issues.push(issue(format!("{key}[{i}]"), e.to_string())),
        }
    }
    parsed
}

fn parse_layer_patterns(
    root: &mut Map<String, Doc>,
    issues: &mut Vec<ConfigIssue>,
) -> Vec<LayerPattern> {
    let entries = match root.remove("layer_patterns") {
        None | Some(Doc::Null) => return Vec::new(),
        Some(Doc::Object(entries)) => entries,
        Some(other) => {
            issues.push(issue(
                "layer_patterns",
                format!("expected a mapping, found {}", kind_of(&other)),
            ));
            return Vec::new();
        }
    };

    let mut patterns = Vec::with_capacity(entries.len());
    for (category, mut entry) in entries {
        let location = format!("layer_patterns.{category}");
        // The mapping key is the category; an inline `category` is redundant.
        if let Doc::Object(fields) = &mut entry {
            fields.remove("category");
        }
        let entry: LayerPatternEntry = match serde_json::from_value(entry) {
            Ok(entry) => entry,
            Err(e) => {
                issues.push(issue(location, e.to_string()));
                continue;
            }
        };

        let mut name_patterns = Vec::with_capacity(entry.name_patterns.len());
        let mut valid = true;
        for (i, pattern) in entry.name_patterns.iter().enumerate() {
            match compile_name_pattern(pattern) {
                Ok(re) => name_patterns.push(re),
                Err(e) => {
                    valid = false;
                    issues.push(issue(format!("{location}.name_patterns[{i}]"), e.to_string()));
                }
            }
        }
        if valid {
            patterns.push(LayerPattern {
                category,
                layer_names: entry.layer_names.into_iter().collect(),
                name_patterns,
                geometry_type: entry.geometry_type,
            });
        }
    }
    patterns
}

fn parse_crs(
    root: &mut Map<String, Doc>,
    key: &str,
    default: &str,
    issues: &mut Vec<ConfigIssue>,
) -> String {
    match root.remove(key) {
        None | Some(Doc::Null) => default.to_string(),
        Some(Doc::String(crs)) if !crs.trim().is_empty() => crs,
        Some(other) => {
            issues.push(issue(
                key,
                format!("expected a non-empty string, found {}", kind_of(&other)),
            ));
            default.to_string()
        }
    }
}
