//! CLI commands

use crate::config::Config;
use crate::core::feature::MutableFeature;
use crate::core::segment::{Segment, TraceData};
use crate::core::time::TimeReference;
use crate::storage::memory::Recording;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::debug;

/// Trace-Segments CLI
#[derive(Parser)]
#[command(name = "trace-segments")]
#[command(about = "Segment-bounded access to recorded electrophysiology traces")]
pub struct Cli {
    /// Local configuration file
    #[arg(short, long, global = true, default_value = crate::config::LOCAL_CONFIG_FILE)]
    pub config: PathBuf,

    /// Write log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Trace selection: a trace name, or a signal role looked up in the configuration
#[derive(Args, Debug, Clone)]
pub struct TraceSelection {
    /// Trace name
    #[arg(short, long, conflicts_with = "role")]
    pub trace: Option<String>,
    /// Signal role, e.g. "membrane voltage"
    #[arg(short, long)]
    pub role: Option<String>,
    /// Plugin whose trace configuration resolves the role
    #[arg(short, long, default_value = "default")]
    pub plugin: String,
}

/// Padding and time reference of a read
#[derive(Args, Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Seconds to read before segment start
    #[arg(short, long, default_value_t = 0.0)]
    pub before: f64,
    /// Seconds to read after segment stop
    #[arg(short, long, default_value_t = 0.0)]
    pub after: f64,
    /// Report times in absolute data time instead of relative to segment start
    #[arg(long)]
    pub absolute: bool,
}

impl ReadOptions {
    fn reference(&self) -> TimeReference {
        if self.absolute {
            TimeReference::Absolute
        } else {
            TimeReference::Zero
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the segments of a recording
    Segments {
        /// Recording file
        file: PathBuf,
    },
    /// List the traces of a recording
    Traces {
        /// Recording file
        file: PathBuf,
    },
    /// Read trace data for one segment
    Extract {
        /// Recording file
        file: PathBuf,
        /// Tag name of the segment
        #[arg(short, long)]
        segment: String,
        /// Instance index for multi-instance tags
        #[arg(short, long)]
        index: Option<usize>,
        #[command(flatten)]
        selection: TraceSelection,
        #[command(flatten)]
        options: ReadOptions,
        /// Limit padding to the segment's delay and the next segment start
        #[arg(long)]
        limited: bool,
    },
    /// Read a feature value of one segment
    Feature {
        /// Recording file
        file: PathBuf,
        /// Tag name of the segment
        #[arg(short, long)]
        segment: String,
        /// Instance index for multi-instance tags
        #[arg(short, long)]
        index: Option<usize>,
        /// Feature name
        #[arg(short, long)]
        name: String,
    },
    /// Print data links for all segments
    Links {
        /// Recording file
        file: PathBuf,
        /// Dataset name stored in the links, defaults to the recording name
        #[arg(short, long)]
        dataset: Option<String>,
    },
    /// Read one trace for every segment that references it
    Export {
        /// Recording file
        file: PathBuf,
        #[command(flatten)]
        selection: TraceSelection,
        #[command(flatten)]
        options: ReadOptions,
    },
}

/// Data read for one segment during export
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub segment: String,
    pub index: Option<usize>,
    pub start_time: f64,
    pub data: TraceData,
}

#[derive(Serialize)]
struct SegmentRow<'a> {
    name: &'a str,
    segment_type: &'a str,
    index: Option<usize>,
    start_time: f64,
    duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    absolute_start_time: Option<f64>,
    traces: Vec<String>,
    mutable_features: Vec<MutableFeature>,
}

#[derive(Serialize)]
struct TraceRow<'a> {
    name: &'a str,
    kind: String,
    array_type: &'a str,
    max_time: f64,
}

fn open(file: &Path) -> Result<Recording> {
    Recording::open(file).with_context(|| format!("cannot open recording {}", file.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn trace_name(selection: &TraceSelection, config: &Config, segment: &Segment) -> Result<String> {
    match (&selection.trace, &selection.role) {
        (Some(trace), _) => Ok(trace.clone()),
        (None, Some(role)) => config
            .resolve_trace(&selection.plugin, role, segment)
            .with_context(|| {
                format!(
                    "no trace configured for {role} (plugin {}) in segment {}",
                    selection.plugin,
                    segment.name()
                )
            }),
        (None, None) => bail!("either --trace or --role is required"),
    }
}

/// Run a command and return its output
pub async fn run(command: Commands, config: &Config) -> Result<String> {
    match command {
        Commands::Segments { file } => {
            let recording = open(&file)?;
            let segments = recording.segments()?;
            let rows: Vec<_> = segments
                .iter()
                .map(|s| SegmentRow {
                    name: s.name(),
                    segment_type: s.segment_type(),
                    index: s.index(),
                    start_time: s.start_time(),
                    duration: s.duration(),
                    absolute_start_time: s.absolute_start_time(),
                    traces: s.traces(),
                    mutable_features: s.mutable_features(),
                })
                .collect();
            to_json(&rows)
        }
        Commands::Traces { file } => {
            let recording = open(&file)?;
            let rows: Vec<_> = recording
                .registry()
                .iter()
                .map(|t| TraceRow {
                    name: t.name(),
                    kind: format!("{:?}", t.data_kind()),
                    array_type: t.array_type(),
                    max_time: t.max_time(),
                })
                .collect();
            to_json(&rows)
        }
        Commands::Extract {
            file,
            segment,
            index,
            selection,
            options,
            limited,
        } => {
            let recording = open(&file)?;
            let segment = recording.segment(&segment, index)?;
            let trace = trace_name(&selection, config, &segment)?;
            let data = if limited {
                segment.extract_limited(&trace, options.before, options.after, options.reference())?
            } else {
                segment.extract(&trace, options.before, options.after, options.reference())?
            };
            to_json(&data)
        }
        Commands::Feature {
            file,
            segment,
            index,
            name,
        } => {
            let recording = open(&file)?;
            let segment = recording.segment(&segment, index)?;
            to_json(&segment.feature(&name)?)
        }
        Commands::Links { file, dataset } => {
            let recording = open(&file)?;
            let dataset = dataset.unwrap_or_else(|| recording.name().to_string());
            let links: Vec<_> = recording
                .segments()?
                .iter()
                .filter_map(|s| s.data_link(&dataset))
                .collect();
            to_json(&links)
        }
        Commands::Export {
            file,
            selection,
            options,
        } => {
            let recording = open(&file)?;
            let rows = export(recording.segments()?, &selection, config, options).await?;
            to_json(&rows)
        }
    }
}

/// Read one trace from all segments concurrently, in segment order
pub async fn export(
    segments: Vec<Segment>,
    selection: &TraceSelection,
    config: &Config,
    options: ReadOptions,
) -> Result<Vec<ExportRow>> {
    let mut tasks = JoinSet::new();
    for (position, segment) in segments.into_iter().enumerate() {
        let trace = match trace_name(selection, config, &segment) {
            Ok(trace) if segment.traces().contains(&trace) => trace,
            _ => {
                debug!(segment = %segment.name(), "segment does not reference the trace, skipped");
                continue;
            }
        };
        tasks.spawn_blocking(move || {
            let data = segment.extract(&trace, options.before, options.after, options.reference());
            (position, segment, data)
        });
    }

    let mut rows = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (position, segment, data) = joined.context("extraction task failed")?;
        rows.push((
            position,
            ExportRow {
                segment: segment.name().to_string(),
                index: segment.index(),
                start_time: segment.start_time(),
                data: data?,
            },
        ));
    }
    rows.sort_by_key(|(position, _)| *position);
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}
