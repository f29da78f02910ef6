//! # Aggregate Command Implementation
//!
//! This module implements the `aggregate` subcommand, which runs the complete
//! aggregation pipeline for the chart of a directory and writes the merged
//! document.
//!
//! ## Inputs
//!
//! - **Chart metadata**: `Chart.yaml` of the chart directory.
//! - **Configuration**: `.helm-values.yaml` (optional) with the schema
//!   repositories.
//! - **Downloaded schemas**: the mirror written by the download step,
//!   `<downloads>/<host>/<path>`.
//! - **Extracted schemas**: the tree of packaged dependencies.
//! - **Sibling charts**: aggregated documents of charts stored next to this one.
//! - **Patches**: `aggregated-values.schema.patch.json` and
//!   `values.schema.patch.json` in the chart directory, or explicit files.
//!
//! Every location has a default relative to the chart directory, and an
//! environment variable fallback.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};

use helm_values::aggregate::local::chart_schema_path;
use helm_values::aggregate::{Aggregator, MergedDocument};
use helm_values::config::{self, CONFIG_FILE};
use helm_values::filesystem::MemoryFS;
use helm_values::model::Chart;
use helm_values::output::{Marker, OutputConfig};
use helm_values::patch::{OverlayPatch, PatchStage};
use helm_values::source::{DirectorySchemaLocator, DownloadDirectory};

/// Directory, relative to a chart directory, holding generated files.
pub const BUILD_DIR: &str = "build/helm-values";

/// Aggregate the values schema of a chart with the schemas of its dependencies
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Chart directory, holding Chart.yaml.
    #[arg(long, value_name = "DIR", default_value = ".", env = "HELM_VALUES_CHART_DIR")]
    pub chart_dir: PathBuf,

    /// Configuration file. Defaults to `.helm-values.yaml` in the chart directory.
    #[arg(short, long, value_name = "FILE", env = "HELM_VALUES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the downloaded schemas. Defaults to `build/helm-values/downloads`.
    #[arg(long, value_name = "DIR", env = "HELM_VALUES_DOWNLOADS")]
    pub downloads: Option<PathBuf>,

    /// Root of the schemas extracted from packaged dependencies. Defaults to
    /// `build/helm-values/extracted`.
    #[arg(long, value_name = "DIR", env = "HELM_VALUES_EXTRACTED")]
    pub extracted: Option<PathBuf>,

    /// Directory holding the sibling charts. Defaults to the parent of the
    /// chart directory.
    #[arg(long, value_name = "DIR", env = "HELM_VALUES_SIBLINGS")]
    pub siblings: Option<PathBuf>,

    /// Directory, inside each sibling chart, holding its aggregated document.
    #[arg(long, value_name = "PATH", default_value = BUILD_DIR, env = "HELM_VALUES_SIBLING_SUB_PATH")]
    pub sibling_sub_path: PathBuf,

    /// Base document to aggregate. Generated from Chart.yaml when omitted.
    #[arg(long, value_name = "FILE", env = "HELM_VALUES_BASE")]
    pub base: Option<PathBuf>,

    /// Patch applied before aggregation (JSON or YAML).
    #[arg(long, value_name = "FILE", env = "HELM_VALUES_PRE_PATCH")]
    pub pre_patch: Option<PathBuf>,

    /// Patch applied after aggregation (JSON or YAML).
    #[arg(long, value_name = "FILE", env = "HELM_VALUES_POST_PATCH")]
    pub post_patch: Option<PathBuf>,

    /// Overrides `id-base-uri` of the configuration.
    #[arg(long, value_name = "URI", env = "HELM_VALUES_ID_BASE_URI")]
    pub id_base_uri: Option<String>,

    /// Output file, `-` for stdout. Defaults to
    /// `build/helm-values/aggregated-values.schema.json`.
    #[arg(short, long, value_name = "FILE", env = "HELM_VALUES_OUTPUT")]
    pub output: Option<String>,
}

impl AggregateArgs {
    fn build_dir(&self) -> PathBuf {
        self.chart_dir.join(BUILD_DIR)
    }

    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.chart_dir.join(CONFIG_FILE))
    }

    fn downloads_dir(&self) -> PathBuf {
        self.downloads
            .clone()
            .unwrap_or_else(|| self.build_dir().join("downloads"))
    }

    fn extracted_dir(&self) -> PathBuf {
        self.extracted
            .clone()
            .unwrap_or_else(|| self.build_dir().join("extracted"))
    }

    fn siblings_dir(&self) -> PathBuf {
        self.siblings
            .clone()
            .unwrap_or_else(|| self.chart_dir.join(".."))
    }

    fn output_target(&self) -> Output {
        match self.output.as_deref() {
            Some("-") => Output::Stdout,
            Some(path) => Output::File(PathBuf::from(path)),
            None => Output::File(
                self.build_dir()
                    .join(helm_values::schema::AGGREGATED_SCHEMA_FILE),
            ),
        }
    }
}

enum Output {
    Stdout,
    File(PathBuf),
}

/// Execute the `aggregate` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: AggregateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let target = args.output_target();
    // Keep stdout for the document when it is the output
    let report = |marker: Marker, line: String| match &target {
        Output::Stdout => eprintln!("{} {}", out.marker(marker), line),
        Output::File(_) => println!("{} {}", out.marker(marker), line),
    };

    let chart = config::load_chart(&args.chart_dir)?;
    report(
        Marker::Scan,
        format!(
            "Aggregating values schema of chart {} ({} dependencies)",
            chart.label(),
            chart.dependencies.len()
        ),
    );

    let config_path = args.config_path();
    let config = config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let extracted = MemoryFS::load_from_disk(&args.extracted_dir()).with_context(|| {
        format!(
            "Failed to read extracted schemas from {}",
            args.extracted_dir().display()
        )
    })?;

    let mut aggregator = Aggregator::new(
        config.repositories,
        Box::new(DownloadDirectory::new(args.downloads_dir())),
        Box::new(
            DirectorySchemaLocator::new(args.siblings_dir())
                .with_sub_path(args.sibling_sub_path.clone()),
        ),
    )
    .with_extracted(extracted)
    .with_id_base_uri(args.id_base_uri.clone().unwrap_or(config.id_base_uri));

    let schema_path = chart_schema_path(&args.chart_dir);
    if schema_path.is_file() {
        let content = std::fs::read(&schema_path)
            .with_context(|| format!("Failed to read {}", schema_path.display()))?;
        aggregator = aggregator.with_chart_schema(schema_path, content);
    }

    let pre_patch = load_patch(args.pre_patch.as_deref(), &args.chart_dir, PatchStage::PreAggregation)?;
    let post_patch =
        load_patch(args.post_patch.as_deref(), &args.chart_dir, PatchStage::PostAggregation)?;
    for patch in pre_patch.iter().chain(post_patch.iter()) {
        report(
            Marker::Info,
            format!("Using patch {} ({} operations)", patch.origin(), patch.len()),
        );
    }

    let merged = match &args.base {
        Some(path) => {
            let base = load_base_document(path)?;
            aggregator.aggregate(&chart, base, pre_patch.as_ref(), post_patch.as_ref())?
        }
        None => aggregator.aggregate_generated(&chart, pre_patch.as_ref(), post_patch.as_ref())?,
    };

    report(
        Marker::Ok,
        format!("Embedded {} schemas", merged.registry.len()),
    );
    if !merged.removed_references.is_empty() {
        report(
            Marker::Warn,
            format!(
                "Removed {} invalid references",
                merged.removed_references.len()
            ),
        );
    }

    write_output(&merged, &target, &chart)?;
    if let Output::File(path) = &target {
        report(Marker::Write, format!("Wrote {}", path.display()));
    }
    Ok(())
}

fn load_patch(
    explicit: Option<&Path>,
    chart_dir: &Path,
    stage: PatchStage,
) -> Result<Option<OverlayPatch>> {
    match explicit {
        Some(path) => OverlayPatch::from_file(path)
            .map(Some)
            .with_context(|| format!("Failed to load {} patch {}", stage, path.display())),
        None => OverlayPatch::load_optional(chart_dir, stage)
            .with_context(|| format!("Failed to load {} patch from {}", stage, chart_dir.display())),
    }
}

fn load_base_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read base document {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse base document {}", path.display()))
}

fn write_output(merged: &MergedDocument, target: &Output, chart: &Chart) -> Result<()> {
    match target {
        Output::Stdout => {
            print!("{}", merged.to_json_string()?);
            Ok(())
        }
        Output::File(path) => merged.write_to(path).with_context(|| {
            format!(
                "Failed to write the aggregated schema of {} to {}",
                chart.label(),
                path.display()
            )
        }),
    }
}
