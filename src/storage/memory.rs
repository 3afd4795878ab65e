//! In-memory store: recordings loaded from JSON into memory
//!
//! A `Recording` holds sampled arrays, event arrays and tags, and implements
//! the store contract segments are built on. It is used by the command line
//! tool and in tests.

use crate::core::feature::{FeatureInfo, FeatureValue};
use crate::core::segment::{Instance, Segment};
use crate::core::trace::{DataKind, DataTrace, MappingVersion, TraceKind};
use crate::error::{Error, Result};
use crate::storage::cache::FeatureCache;
use crate::storage::registry::TraceRegistry;
use crate::storage::store::{ContinuousSource, EventSource, TagLayout, TagSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Regularly sampled data held in memory
#[derive(Debug, Clone)]
pub struct SampledArray {
    interval: f64,
    offset: f64,
    values: Vec<f64>,
}

impl SampledArray {
    /// Create a sampled array; sample `i` is taken at `offset + i * interval`
    pub fn new(interval: f64, offset: f64, values: Vec<f64>) -> Self {
        Self {
            interval,
            offset,
            values,
        }
    }
}

impl ContinuousSource for SampledArray {
    fn get_slice(&self, start: f64, extent: f64) -> Result<Vec<f64>> {
        if extent < 0.0 || !extent.is_finite() || !start.is_finite() {
            return Err(Error::StoreRead(format!(
                "invalid slice start {start} extent {extent}"
            )));
        }
        let position = ((start - self.offset) / self.interval).round();
        if position < 0.0 {
            return Err(Error::StoreRead(format!(
                "slice start {start} before first sample at {}",
                self.offset
            )));
        }
        let first = position as usize;
        if first >= self.values.len() {
            return Err(Error::StoreRead(format!(
                "slice start {start} beyond end of data at {}",
                self.max_time()
            )));
        }
        let count = (extent / self.interval).round() as usize;
        let last = first.saturating_add(count).min(self.values.len());
        Ok(self.values[first..last].to_vec())
    }

    fn axis(&self, count: usize) -> Vec<f64> {
        (0..count).map(|i| i as f64 * self.interval).collect()
    }

    fn sampling_interval(&self) -> f64 {
        self.interval
    }

    fn max_time(&self) -> f64 {
        self.offset + self.values.len() as f64 * self.interval
    }
}

/// Sorted event times held in memory
#[derive(Debug, Clone)]
pub struct EventArray {
    times: Vec<f64>,
}

impl EventArray {
    /// Create an event array, times are sorted on construction
    pub fn new(mut times: Vec<f64>) -> Self {
        times.sort_by(|a, b| a.total_cmp(b));
        Self { times }
    }
}

impl EventSource for EventArray {
    fn get_slice(&self, start: f64, extent: f64) -> Result<Vec<f64>> {
        if extent < 0.0 {
            return Err(Error::StoreRead(format!(
                "invalid slice start {start} extent {extent}"
            )));
        }
        let stop = start + extent;
        let first = self.times.partition_point(|t| *t < start);
        let last = self.times.partition_point(|t| *t < stop);
        Ok(self.times[first..last.max(first)].to_vec())
    }

    fn max_time(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// Stored description of a trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub array_type: String,
    /// Required for sampled traces
    #[serde(default)]
    pub sampling_interval: Option<f64>,
    #[serde(default)]
    pub offset: f64,
    pub values: Vec<f64>,
}

/// Stored feature: descriptor and full column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub feature_type: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub data: FeatureValue,
}

/// Stored tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: String,
    #[serde(flatten)]
    pub layout: TagLayout,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub features: Vec<FeatureRecord>,
}

/// On-disk layout of a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingFile {
    pub name: String,
    #[serde(default)]
    pub mapping_version: MappingVersion,
    #[serde(default)]
    pub traces: Vec<TraceRecord>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    /// Arrays that feature links point to
    #[serde(default)]
    pub arrays: HashMap<String, FeatureValue>,
}

/// A tag held in memory
#[derive(Debug)]
pub struct MemoryTag {
    id: String,
    name: String,
    tag_type: String,
    layout: TagLayout,
    references: Vec<String>,
    features: Vec<FeatureRecord>,
    arrays: Arc<HashMap<String, FeatureValue>>,
}

impl MemoryTag {
    fn from_record(record: TagRecord, arrays: Arc<HashMap<String, FeatureValue>>) -> Self {
        Self {
            id: record.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: record.name,
            tag_type: record.tag_type,
            layout: record.layout,
            references: record.references,
            features: record.features,
            arrays,
        }
    }
}

impl TagSource for MemoryTag {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn tag_type(&self) -> String {
        self.tag_type.clone()
    }

    fn layout(&self) -> TagLayout {
        self.layout.clone()
    }

    fn references(&self) -> Vec<String> {
        self.references.clone()
    }

    fn features(&self) -> Vec<FeatureInfo> {
        self.features
            .iter()
            .enumerate()
            .map(|(index, f)| FeatureInfo {
                index,
                name: f.name.clone(),
                feature_type: f.feature_type.clone(),
                unit: f.unit.clone(),
            })
            .collect()
    }

    fn feature_column(&self, name: &str) -> Result<FeatureValue> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.data.clone())
            .ok_or_else(|| {
                Error::UnknownFeature(format!("{name} is not a feature of {}", self.name))
            })
    }

    fn resolve_link(&self, target: &str) -> Result<FeatureValue> {
        self.arrays
            .get(target)
            .cloned()
            .ok_or_else(|| Error::StoreRead(format!("linked array {target} not found")))
    }
}

/// A recording session held in memory
pub struct Recording {
    name: String,
    mapping: MappingVersion,
    registry: TraceRegistry,
    tags: Vec<Arc<MemoryTag>>,
    cache: FeatureCache,
}

impl Recording {
    /// Build a recording from its stored layout
    pub fn from_file(file: RecordingFile) -> Result<Self> {
        let mapping = file.mapping_version;
        let mut registry = TraceRegistry::new();
        for record in file.traces {
            registry.insert(build_trace(record, mapping)?);
        }

        let arrays = Arc::new(file.arrays);
        let tags = file
            .tags
            .into_iter()
            .map(|record| Arc::new(MemoryTag::from_record(record, Arc::clone(&arrays))))
            .collect::<Vec<_>>();

        info!(
            recording = %file.name,
            traces = registry.len(),
            tags = tags.len(),
            "recording loaded"
        );
        Ok(Self {
            name: file.name,
            mapping,
            registry,
            tags,
            cache: FeatureCache::new(),
        })
    }

    /// Parse a recording from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_file(serde_json::from_str(json)?)
    }

    /// Load a recording from a JSON file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening recording");
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Recording name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mapping version
    pub fn mapping(&self) -> MappingVersion {
        self.mapping
    }

    /// All traces of the recording
    pub fn registry(&self) -> &TraceRegistry {
        &self.registry
    }

    /// Feature cache shared by all segments of this recording
    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    /// Names of the stored tags
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }

    /// Segment for a tag instance
    pub fn segment(&self, tag_name: &str, index: Option<usize>) -> Result<Segment> {
        let tag = self
            .tags
            .iter()
            .find(|t| t.name == tag_name)
            .ok_or_else(|| {
                Error::InvalidSegmentDescriptor(format!("no tag named {tag_name} in {}", self.name))
            })?;
        let tag_source: Arc<dyn TagSource> = tag.clone();
        let segment = Segment::new(tag_source, &self.registry, index)?;
        Ok(self.finish(segment, &tag.layout))
    }

    /// One segment per single tag and per instance of each multi tag
    pub fn segments(&self) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        for tag in &self.tags {
            let instances = if tag.layout.is_multi() {
                (0..tag.layout.instance_count()).map(Instance::Multi).collect()
            } else {
                vec![Instance::Single]
            };
            for instance in instances {
                let tag_source: Arc<dyn TagSource> = tag.clone();
                let segment = Segment::from_instance(tag_source, &self.registry, instance)?;
                segments.push(self.finish(segment, &tag.layout));
            }
        }
        Ok(segments)
    }

    fn finish(&self, segment: Segment, layout: &TagLayout) -> Segment {
        let segment = segment
            .with_mapping(self.mapping)
            .with_cache(self.cache.clone());
        match (layout, segment.index()) {
            (TagLayout::Multi { positions, .. }, Some(index)) => match positions.get(index + 1) {
                Some(next) => segment.with_next_start(*next),
                None => segment,
            },
            _ => segment,
        }
    }
}

fn build_trace(record: TraceRecord, mapping: MappingVersion) -> Result<DataTrace> {
    let id = record.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let kind = match mapping.classify(&record.array_type) {
        Some(DataKind::Continuous) => {
            let interval = record.sampling_interval.filter(|si| *si > 0.0).ok_or_else(|| {
                Error::InvalidTrace(format!(
                    "sampled trace {} needs a positive sampling interval",
                    record.name
                ))
            })?;
            TraceKind::Continuous(Arc::new(SampledArray::new(
                interval,
                record.offset,
                record.values,
            )))
        }
        Some(DataKind::Event) => TraceKind::Event(Arc::new(EventArray::new(record.values))),
        _ => {
            return Err(Error::InvalidTrace(format!(
                "array {} of type {} is not a trace",
                record.name, record.array_type
            )))
        }
    };
    DataTrace::new(record.name, id, record.array_type, mapping, kind)
}
