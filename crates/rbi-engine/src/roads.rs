//! Road classification by remark text and per-feature buffering.
//!
//! Rules are applied in declaration order and every match overwrites the
//! previous assignment, so the last matching rule wins. This is the reverse
//! of the catalog's first-match-wins category detection.

use rbi_core::config::RoadBuffer;
use rbi_core::geo::Bufferer;
use rbi_core::table::{Feature, FeatureTable, Value};
use serde::Serialize;

pub const ROAD_CATEGORY: &str = "road";
pub const REMARK_COLUMN: &str = "REMARK";
pub const ROAD_CLASS_COLUMN: &str = "road_class";
pub const BUFFER_WIDTH_COLUMN: &str = "buffer_width";
pub const DEFAULT_ROAD_CLASS: &str = "other";
pub const DEFAULT_BUFFER_WIDTH: f64 = 3.0;

/// Resolved class and buffer width for one road.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadClassification {
    pub road_class: String,
    pub buffer_width: f64,
}

/// Classify a single remark. A missing remark matches no rule.
pub fn classify_road(
    remark: Option<&str>,
    rules: &[RoadBuffer],
    default_buffer: f64,
) -> RoadClassification {
    let mut result = RoadClassification {
        road_class: DEFAULT_ROAD_CLASS.to_string(),
        buffer_width: default_buffer,
    };
    let Some(remark) = remark else {
        return result;
    };
    for rule in rules {
        if rule.matches_remark(remark) {
            result.road_class.clone_from(&rule.class_name);
            result.buffer_width = rule.width_meters;
        }
    }
    result
}

/// Write `road_class` and `buffer_width` onto every feature.
///
/// Every row starts as `other` with `default_buffer`; each rule then
/// overwrites the rows whose `REMARK` text it matches. Non-text remarks and
/// tables without a `REMARK` column match nothing.
pub fn assign_road_classes(table: &mut FeatureTable, rules: &[RoadBuffer], default_buffer: f64) {
    let class_idx = table.fill_column(ROAD_CLASS_COLUMN, &Value::from(DEFAULT_ROAD_CLASS));
    let width_idx = table.fill_column(BUFFER_WIDTH_COLUMN, &Value::Float(default_buffer));

    let remarks: Vec<Option<String>> = match table.column_values(REMARK_COLUMN) {
        Some(values) => values.map(|v| v.as_str().map(str::to_string)).collect(),
        None => return,
    };

    for rule in rules {
        for (row, remark) in remarks.iter().enumerate() {
            if remark.as_deref().is_some_and(|r| rule.matches_remark(r)) {
                table.set_value(row, class_idx, Value::from(rule.class_name.as_str()));
                table.set_value(row, width_idx, Value::Float(rule.width_meters));
            }
        }
    }
}

/// Replace each geometry with its buffer by the row's `buffer_width`.
///
/// Rows without a numeric width use `default_buffer`. A row whose buffer
/// fails is dropped with a warning.
pub fn buffer_features(
    table: FeatureTable,
    bufferer: &dyn Bufferer,
    default_buffer: f64,
) -> FeatureTable {
    let width_idx = table.column_index(BUFFER_WIDTH_COLUMN);
    let mut result = FeatureTable::new(table.columns().to_vec(), table.crs().map(str::to_string));

    for Feature {
        geometry,
        attributes,
    } in table.into_features()
    {
        let width = width_idx
            .and_then(|i| attributes[i].as_f64())
            .unwrap_or(default_buffer);
        match bufferer.buffer(&geometry, width) {
            Ok(buffered) => result.push(buffered, attributes),
            Err(e) => tracing::warn!("Dropping road feature, buffer of {} failed: {}", width, e),
        }
    }
    result
}
