//! CLI binary for the RBI engine: validate configurations and exercise their
//! classification rules without touching any dataset.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rbi_core::config::RbiConfig;
use rbi_engine::{DEFAULT_BUFFER_WIDTH, classify_road, detect_category, infer_geometry_type};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rbi", about = "RBI base-map classification and harmonization engine")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and summarize its rules
    Check {
        /// Path to the YAML (or .toml) configuration
        config: PathBuf,
    },

    /// Classify layer names and remark texts with a configuration's rules
    Classify {
        /// Path to the YAML (or .toml) configuration
        config: PathBuf,

        /// Layer name to classify (repeatable)
        #[arg(short, long)]
        layer: Vec<String>,

        /// Remark text to classify (repeatable)
        #[arg(short, long)]
        remark: Vec<String>,

        /// Buffer width for roads matching no rule
        #[arg(long, default_value_t = DEFAULT_BUFFER_WIDTH)]
        default_buffer: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => cmd_check(&config, cli.json),
        Commands::Classify {
            config,
            layer,
            remark,
            default_buffer,
        } => cmd_classify(&config, &layer, &remark, default_buffer, cli.json),
    }
}

fn load_config(path: &Path) -> Result<RbiConfig> {
    RbiConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn cmd_check(path: &Path, as_json: bool) -> Result<()> {
    let config = load_config(path)?;

    if as_json {
        let report = json!({
            "target_crs": config.target_crs,
            "metric_crs": config.metric_crs,
            "sources": config.sources.iter().map(|s| json!({
                "name": s.name,
                "region": s.region,
                "type": s.source_type,
                "path": s.path,
                "exists": s.path.exists(),
            })).collect::<Vec<_>>(),
            "layer_patterns": config.layer_patterns.iter().map(|p| json!({
                "category": p.category,
                "layer_names": p.layer_names,
                "name_patterns": p.name_patterns.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
                "geometry_type": p.geometry_type,
            })).collect::<Vec<_>>(),
            "landuse_categories": config.landuse_categories,
            "road_buffers": config.road_buffers,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Configuration OK: {}", path.display());
    println!("  Target CRS: {}", config.target_crs);
    println!("  Metric CRS: {}", config.metric_crs);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        let marker = if source.path.exists() { "" } else { "  [missing]" };
        println!(
            "  {:<20} {:<16} {:<10} {}{}",
            source.name,
            source.region,
            source.source_type,
            source.path.display(),
            marker
        );
    }

    println!("\nLayer patterns (first match wins):");
    for (i, pattern) in config.layer_patterns.iter().enumerate() {
        println!(
            "  {}. {} ({} exact names, {} patterns)",
            i + 1,
            pattern.category,
            pattern.layer_names.len(),
            pattern.name_patterns.len()
        );
    }

    println!("\nLand-use categories:");
    for category in &config.landuse_categories {
        println!(
            "  {:<20} weight={} priority={} patterns={:?}",
            category.name, category.weight, category.priority, category.patterns
        );
    }

    println!("\nRoad buffers (last match wins):");
    for (i, rule) in config.road_buffers.iter().enumerate() {
        println!(
            "  {}. {:<20} {} m  patterns={:?}",
            i + 1,
            rule.class_name,
            rule.width_meters,
            rule.patterns
        );
    }

    Ok(())
}

fn cmd_classify(
    path: &Path,
    layers: &[String],
    remarks: &[String],
    default_buffer: f64,
    as_json: bool,
) -> Result<()> {
    let config = load_config(path)?;
    if layers.is_empty() && remarks.is_empty() {
        anyhow::bail!("nothing to classify: pass --layer and/or --remark");
    }

    let layer_results: Vec<_> = layers
        .iter()
        .map(|layer| {
            json!({
                "layer": layer,
                "geometry_type": infer_geometry_type(layer),
                "category": detect_category(&config, layer),
            })
        })
        .collect();

    let mut remark_results = Vec::with_capacity(remarks.len());
    for remark in remarks {
        let road = classify_road(Some(remark.as_str()), &config.road_buffers, default_buffer);
        let landuse: Vec<&str> = config
            .landuse_categories
            .iter()
            .filter(|c| c.matches_remark(remark))
            .map(|c| c.name.as_str())
            .collect();
        let mut entry = serde_json::to_value(&road)?;
        entry["remark"] = json!(remark);
        entry["landuse_matches"] = json!(landuse);
        remark_results.push(entry);
    }

    if as_json {
        let report = json!({ "layers": layer_results, "remarks": remark_results });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for result in &layer_results {
        println!(
            "layer  {:<30} geometry={:<8} category={}",
            result["layer"].as_str().unwrap_or_default(),
            result["geometry_type"].as_str().unwrap_or("-"),
            result["category"].as_str().unwrap_or("-"),
        );
    }
    for result in &remark_results {
        let landuse: Vec<&str> = result["landuse_matches"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        println!(
            "remark {:<30} road_class={} buffer_width={} landuse=[{}]",
            result["remark"].as_str().unwrap_or_default(),
            result["road_class"].as_str().unwrap_or_default(),
            result["buffer_width"],
            landuse.join(", "),
        );
    }

    Ok(())
}
