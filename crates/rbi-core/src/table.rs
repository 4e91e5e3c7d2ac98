//! In-memory feature tables: one geometry per row plus ordered attribute columns.

use crate::geo::{GeoError, Reprojector};
use geo_types::Geometry;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Name under which the geometry column is reported.
pub const GEOMETRY_COLUMN: &str = "geometry";
/// Provenance column holding the source region.
pub const SOURCE_COLUMN: &str = "_source";
/// Provenance column holding the layer name.
pub const LAYER_COLUMN: &str = "_layer";

/// A single attribute cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// One row: a geometry and attribute values aligned with the table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: Vec<Value>,
}

/// A geometry-bearing table with source-defined attribute columns.
///
/// Geometry lives in its own slot on each [`Feature`]; [`column_names`](Self::column_names)
/// reports it as a trailing `geometry` column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    crs: Option<String>,
    columns: Vec<String>,
    features: Vec<Feature>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>, crs: Option<String>) -> Self {
        Self {
            crs,
            columns,
            features: Vec::new(),
        }
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty table tagged with a CRS.
    pub fn empty_with_crs(crs: &str) -> Self {
        Self::new(Vec::new(), Some(crs.to_string()))
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn set_crs(&mut self, crs: Option<String>) {
        self.crs = crs;
    }

    /// Attribute columns, without geometry.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All columns including the trailing geometry column.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(GEOMETRY_COLUMN))
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == GEOMETRY_COLUMN || self.column_index(name).is_some()
    }

    /// Position of an attribute column. Geometry has no index.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    /// Append a row. `attributes` must line up with [`columns`](Self::columns).
    pub fn push(&mut self, geometry: Geometry<f64>, attributes: Vec<Value>) {
        assert_eq!(
            attributes.len(),
            self.columns.len(),
            "attribute count must match column count"
        );
        self.features.push(Feature {
            geometry,
            attributes,
        });
    }

    /// Cell value by row and attribute column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.features.get(row).map(|f| &f.attributes[idx])
    }

    /// Iterate one attribute column; `None` if the column does not exist.
    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a Value>> {
        let idx = self.column_index(column)?;
        Some(self.features.iter().map(move |f| &f.attributes[idx]))
    }

    /// Set `column` to `value` on every row, appending the column if missing.
    /// Returns the column index.
    pub fn fill_column(&mut self, column: &str, value: &Value) -> usize {
        let idx = self.ensure_column(column);
        for feature in &mut self.features {
            feature.attributes[idx] = value.clone();
        }
        idx
    }

    /// Overwrite a single cell. Out-of-range positions are ignored.
    pub fn set_value(&mut self, row: usize, column_idx: usize, value: Value) {
        if let Some(cell) = self
            .features
            .get_mut(row)
            .and_then(|f| f.attributes.get_mut(column_idx))
        {
            *cell = value;
        }
    }

    fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(idx) = self.column_index(column) {
            return idx;
        }
        self.columns.push(column.to_string());
        for feature in &mut self.features {
            feature.attributes.push(Value::Null);
        }
        self.columns.len() - 1
    }

    /// Rename attribute columns; names not present are ignored. A rename
    /// whose target already names another column is skipped.
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        let map: HashMap<&str, &str> = renames.iter().copied().collect();
        for i in 0..self.columns.len() {
            let Some(&new_name) = map.get(self.columns[i].as_str()) else {
                continue;
            };
            if self.columns.iter().any(|c| c == new_name) {
                tracing::warn!(
                    "Not renaming column '{}': '{}' already exists",
                    self.columns[i],
                    new_name
                );
                continue;
            }
            self.columns[i] = new_name.to_string();
        }
    }

    /// Keep only the named attribute columns, in the given order. Geometry is
    /// always kept; names that do not exist or repeat are skipped.
    pub fn select(self, columns: &[&str]) -> FeatureTable {
        let mut indices: Vec<usize> = Vec::with_capacity(columns.len());
        for idx in columns
            .iter()
            .filter(|c| **c != GEOMETRY_COLUMN)
            .filter_map(|c| self.column_index(c))
        {
            if !indices.contains(&idx) {
                indices.push(idx);
            }
        }
        let new_columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let features = self
            .features
            .into_iter()
            .map(|f| Feature {
                attributes: indices.iter().map(|&i| f.attributes[i].clone()).collect(),
                geometry: f.geometry,
            })
            .collect();
        FeatureTable {
            crs: self.crs,
            columns: new_columns,
            features,
        }
    }

    /// Transform every geometry into `target_crs`. A table already in the
    /// target CRS, or with no rows, is only retagged.
    pub fn to_crs(
        mut self,
        reprojector: &dyn Reprojector,
        target_crs: &str,
    ) -> Result<FeatureTable, GeoError> {
        if self.features.is_empty() || self.crs.as_deref() == Some(target_crs) {
            self.crs = Some(target_crs.to_string());
            return Ok(self);
        }
        let Some(from) = self.crs.clone() else {
            return Err(GeoError::MissingCrs {
                target: target_crs.to_string(),
            });
        };
        for feature in &mut self.features {
            feature.geometry = reprojector.reproject(&feature.geometry, &from, target_crs)?;
        }
        self.crs = Some(target_crs.to_string());
        Ok(self)
    }

    /// Row-wise concatenation. Columns are unioned in first-seen order and
    /// cells missing from a table are filled with [`Value::Null`].
    pub fn concat(tables: Vec<FeatureTable>, crs: Option<String>) -> FeatureTable {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut result = FeatureTable::new(columns, crs);
        for table in tables {
            let mapping: Vec<Option<usize>> = result
                .columns
                .iter()
                .map(|c| table.column_index(c))
                .collect();
            for feature in table.features {
                let attributes = mapping
                    .iter()
                    .map(|idx| idx.map_or(Value::Null, |i| feature.attributes[i].clone()))
                    .collect();
                result.features.push(Feature {
                    geometry: feature.geometry,
                    attributes,
                });
            }
        }
        result
    }
}
