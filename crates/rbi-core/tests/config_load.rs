use rbi_core::config::{ConfigError, RbiConfig, SourceType};
use std::fs;

#[test]
fn test_load_yaml_file() {
    let tmpdir = tempfile::tempdir().unwrap();
    let gdb = tmpdir.path().join("jabar.gdb");
    fs::create_dir_all(&gdb).unwrap();

    let path = tmpdir.path().join("rbi.yaml");
    fs::write(
        &path,
        format!(
            r#"
sources:
  - name: jabar
    region: jawa_barat
    type: gdb
    path: {}
layer_patterns:
  road:
    name_patterns: ["^JALAN"]
road_buffers:
  - class_name: arterial
    width_meters: 15
    patterns: [ARTERI]
"#,
            gdb.display()
        ),
    )
    .unwrap();

    let config = RbiConfig::load(&path).unwrap();
    assert_eq!(config.sources.len(), 1);
    assert_eq!(config.sources[0].path, gdb);
    assert_eq!(config.sources[0].source_type, SourceType::Gdb);
    assert!(config.layer_pattern("road").unwrap().matches("JALAN_LN_25K"));
}

#[test]
fn test_load_toml_file_preserves_rule_order() {
    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("rbi.toml");
    fs::write(
        &path,
        r#"
target_crs = "EPSG:4326"
metric_crs = "EPSG:32749"

[[sources]]
name = "banten"
region = "banten"
type = "shapefile"
path = "/nonexistent/banten"

[layer_patterns.waterbody]
name_patterns = ["SUNGAI", "DANAU"]

[layer_patterns.road]
layer_names = ["JALAN_LN_25K"]

[layer_patterns.building]
name_patterns = ["BANGUNAN"]

[[road_buffers]]
class_name = "collector"
width_meters = 8.0
patterns = ["KOLEKTOR"]
"#,
    )
    .unwrap();

    let config = RbiConfig::load(&path).unwrap();
    assert_eq!(config.metric_crs, "EPSG:32749");
    let order: Vec<&str> = config
        .layer_patterns
        .iter()
        .map(|p| p.category.as_str())
        .collect();
    assert_eq!(order, vec!["waterbody", "road", "building"]);
    assert_eq!(config.road_buffers[0].class_name, "collector");
}

#[test]
fn test_load_missing_file() {
    let tmpdir = tempfile::tempdir().unwrap();
    let err = RbiConfig::load(&tmpdir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_load_syntax_error() {
    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("broken.yaml");
    fs::write(&path, "sources: [unclosed\n").unwrap();
    let err = RbiConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Syntax(_)));
}

#[test]
fn test_unknown_fields_in_rules_are_reported() {
    let err = RbiConfig::from_yaml_str(
        r#"
road_buffers:
  - class_name: arterial
    width: 15
    patterns: [ARTERI]
"#,
    )
    .unwrap_err();
    let ConfigError::Invalid(issues) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].location, "road_buffers[0]");
    assert!(issues[0].message.contains("width"));
}
