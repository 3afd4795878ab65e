//! Segment: a bounded time interval of a recording and windowed access to its traces

use crate::core::data_link::{DataLink, SegmentType};
use crate::core::feature::{FeatureInfo, FeatureValue, MutableFeature};
use crate::core::time::{PaddingLimits, TimeReference, TimeWindow};
use crate::core::trace::{DataKind, DataTrace, MappingVersion, TraceKind};
use crate::error::{Error, Result};
use crate::storage::cache::FeatureCache;
use crate::storage::registry::TraceRegistry;
use crate::storage::store::{TagLayout, TagSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

/// Which interval of the underlying tag a segment covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instance {
    /// The tag marks exactly one interval
    Single,
    /// One of several intervals of a multi-instance tag
    Multi(usize),
}

impl Instance {
    /// Resolve the instance for a tag layout and an optional index
    pub fn resolve(layout: &TagLayout, index: Option<usize>) -> Result<Self> {
        match (layout, index) {
            (TagLayout::Single { .. }, None) => Ok(Self::Single),
            (TagLayout::Single { .. }, Some(index)) => {
                warn!(index, "index given for a single-instance tag, ignored");
                Ok(Self::Single)
            }
            (TagLayout::Multi { .. }, None) => Err(Error::InvalidSegmentDescriptor(
                "index must be given for a multi-instance tag".to_string(),
            )),
            (TagLayout::Multi { positions, .. }, Some(index)) if index >= positions.len() => {
                Err(Error::InvalidSegmentDescriptor(format!(
                    "index {index} out of bounds for tag with {} instances",
                    positions.len()
                )))
            }
            (TagLayout::Multi { .. }, Some(index)) => Ok(Self::Multi(index)),
        }
    }

    /// Instance index, if any
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Single => None,
            Self::Multi(index) => Some(*index),
        }
    }
}

fn instance_window(layout: &TagLayout, instance: Instance) -> Result<TimeWindow> {
    match (layout, instance) {
        (TagLayout::Single { position, extent }, _) => {
            Ok(TimeWindow::new(*position, extent.unwrap_or(0.0)))
        }
        (TagLayout::Multi { positions, extents }, Instance::Multi(index)) => {
            let start = positions.get(index).copied().ok_or_else(|| {
                Error::InvalidSegmentDescriptor(format!("no position for instance {index}"))
            })?;
            let duration = match extents {
                Some(extents) => extents.get(index).copied().ok_or_else(|| {
                    Error::InvalidSegmentDescriptor(format!("no extent for instance {index}"))
                })?,
                None => 0.0,
            };
            Ok(TimeWindow::new(start, duration))
        }
        (TagLayout::Multi { .. }, Instance::Single) => Err(Error::InvalidSegmentDescriptor(
            "multi-instance tag used as single instance".to_string(),
        )),
    }
}

/// Values read for a segment
///
/// For continuous traces `time` holds one timestamp per value. For event
/// traces the values are the event times and `time` is `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraceData {
    pub values: Vec<f64>,
    pub time: Option<Vec<f64>>,
}

impl TraceData {
    /// No data, no time axis
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if no values were read
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// One bounded time interval of interest within a recording
pub struct Segment {
    tag: Arc<dyn TagSource>,
    id: String,
    name: String,
    segment_type: String,
    instance: Instance,
    window: TimeWindow,
    traces: TraceRegistry,
    mapping: MappingVersion,
    cache: FeatureCache,
    /// Computed on first access
    features: OnceLock<Vec<FeatureInfo>>,
    next_start: Option<f64>,
}

impl Segment {
    /// Create a segment for a tag, optionally selecting one of its instances
    ///
    /// The segment sees the traces that are both referenced by the tag and
    /// present in `registry`.
    pub fn new(
        tag: Arc<dyn TagSource>,
        registry: &TraceRegistry,
        index: Option<usize>,
    ) -> Result<Self> {
        let layout = tag.layout();
        let instance = Instance::resolve(&layout, index).map_err(|e| {
            error!(tag = %tag.name(), ?index, "cannot create segment: {e}");
            e
        })?;
        Self::from_instance(tag, registry, instance)
    }

    /// Create a segment for an already resolved instance
    pub fn from_instance(
        tag: Arc<dyn TagSource>,
        registry: &TraceRegistry,
        instance: Instance,
    ) -> Result<Self> {
        let window = instance_window(&tag.layout(), instance)?;
        let traces = registry.view(&tag.references());
        Ok(Self {
            id: tag.id(),
            name: tag.name(),
            segment_type: tag.tag_type(),
            tag,
            instance,
            window,
            traces,
            mapping: MappingVersion::default(),
            cache: FeatureCache::new(),
            features: OnceLock::new(),
            next_start: None,
        })
    }

    /// Share a feature cache with other segments
    pub fn with_cache(mut self, cache: FeatureCache) -> Self {
        self.cache = cache;
        self
    }

    /// Set mapping version
    pub fn with_mapping(mut self, mapping: MappingVersion) -> Self {
        self.mapping = mapping;
        self
    }

    /// Set the start time of the following segment, limits trailing padding
    pub fn with_next_start(mut self, next_start: f64) -> Self {
        self.next_start = Some(next_start);
        self
    }

    /// Identifier of the underlying tag
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the underlying tag
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type string of the underlying tag
    pub fn segment_type(&self) -> &str {
        &self.segment_type
    }

    /// Instance within the underlying tag
    pub fn instance(&self) -> Instance {
        self.instance
    }

    /// Instance index, `None` for single-instance tags
    pub fn index(&self) -> Option<usize> {
        self.instance.index()
    }

    /// Time interval
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Start time in data time
    pub fn start_time(&self) -> f64 {
        self.window.start()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.window.duration()
    }

    /// Stop time in data time
    pub fn stop_time(&self) -> f64 {
        self.window.stop()
    }

    /// Start of the following segment, if known
    pub fn next_start(&self) -> Option<f64> {
        self.next_start
    }

    /// Mapping version
    pub fn mapping(&self) -> MappingVersion {
        self.mapping
    }

    /// Feature cache used by this segment
    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    /// Names of the traces visible to this segment
    pub fn traces(&self) -> Vec<String> {
        self.traces.names()
    }

    /// Trace metadata; unknown names are logged and yield `None`
    pub fn trace_info(&self, name: &str) -> Option<&Arc<DataTrace>> {
        let trace = self.traces.get(name);
        if trace.is_none() {
            error!(segment = %self.name, trace = name, "not a known trace name");
        }
        trace
    }

    /// Features attached to the underlying tag
    pub fn features(&self) -> &[FeatureInfo] {
        self.features.get_or_init(|| self.tag.features())
    }

    /// First feature named `<segment name><suffix>`
    pub fn find_feature(&self, suffix: &str) -> Option<String> {
        let wanted = format!("{}{}", self.name, suffix);
        self.features()
            .iter()
            .find(|f| f.name.contains(&wanted))
            .map(|f| f.name.clone())
    }

    /// Start of the segment relative to the onset of the recording
    ///
    /// Read from the `<name>_abs_time` feature. Data is not necessarily
    /// stored during the whole recording, so this may differ from
    /// [`Segment::start_time`].
    pub fn absolute_start_time(&self) -> Option<f64> {
        let name = self.find_feature("_abs_time")?;
        match self.feature(&name) {
            Ok(value) => value.as_f64(),
            Err(e) => {
                warn!(
                    segment = %self.name,
                    feature = %name,
                    "cannot read absolute start time: {e}"
                );
                None
            }
        }
    }

    /// Values of the features whose type marks them as mutable
    ///
    /// Features that cannot be read are logged and skipped.
    pub fn mutable_features(&self) -> Vec<MutableFeature> {
        let prefix = format!("{}_", self.name);
        self.features()
            .iter()
            .filter(|info| info.feature_type.contains("mutable"))
            .filter_map(|info| match self.feature(&info.name) {
                Ok(value) => Some(MutableFeature {
                    suffix: info
                        .name
                        .rsplit(prefix.as_str())
                        .next()
                        .unwrap_or(&info.name)
                        .to_string(),
                    value,
                    unit: info.unit.clone(),
                }),
                Err(e) => {
                    error!(
                        segment = %self.name,
                        feature = %info.name,
                        "cannot read feature data, skipped: {e}"
                    );
                    None
                }
            })
            .collect()
    }

    /// Read trace data recorded during this segment
    ///
    /// `before` and `after` extend the window at the front and the back. For
    /// continuous traces the window is clamped to the end of the recorded
    /// data, which may shrink it below the unpadded segment. Invalid windows
    /// and failed reads give empty data instead of an error.
    pub fn extract(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
        let start_time = self.start_time();
        let stop_time = self.stop_time();
        if !self.window.is_valid() {
            warn!(
                segment = %self.name,
                trace = trace_name,
                start_time,
                stop_time,
                "segment window is invalid, interrupted recording?"
            );
            return Ok(TraceData::empty());
        }

        debug!(segment = %self.name, trace = trace_name, %reference, "reading trace data");
        let trace = self.traces.get(trace_name).ok_or_else(|| {
            Error::UnknownTrace(format!("{trace_name} is not referenced by {}", self.name))
        })?;

        let mut after = after;
        if let TraceKind::Continuous(source) = trace.kind() {
            let max_time = source.max_time();
            let requested_stop = stop_time + after;
            if requested_stop > max_time {
                after = max_time - stop_time;
                warn!(
                    trace = trace_name,
                    requested_stop,
                    max_time,
                    clamped_stop = stop_time + after,
                    "segment stop time beyond end of trace, after reduced to {after:.5}"
                );
            }
        }

        let requested = self.window.padded(before, after);
        debug!(
            trace = trace_name,
            "get data slice from {:.5} to {:.5}",
            requested.start(),
            requested.stop()
        );

        let mut values = match trace.kind().get_slice(requested.start(), requested.duration()) {
            Ok(values) => values,
            Err(e) => {
                warn!(trace = trace_name, window = %requested, "reading slice failed: {e}");
                Vec::new()
            }
        };

        let time = match trace.kind() {
            TraceKind::Continuous(source) => {
                let shift = match reference {
                    TimeReference::Absolute => requested.start(),
                    TimeReference::Zero => -before,
                };
                let axis = source
                    .axis(values.len())
                    .into_iter()
                    .map(|t| t + shift)
                    .collect();
                Some(axis)
            }
            TraceKind::Event(_) => {
                if reference == TimeReference::Zero {
                    values.iter_mut().for_each(|t| *t -= start_time);
                }
                None
            }
        };

        Ok(TraceData { values, time })
    }

    /// How far around this segment data may be read
    ///
    /// Leading padding is limited by the `<name>_delay` feature, trailing
    /// padding by the start of the next segment (zero if there is none).
    pub fn padding_limits(&self) -> PaddingLimits {
        let max_before = self
            .find_feature("_delay")
            .and_then(|name| match self.feature(&name) {
                Ok(value) => value.as_f64(),
                Err(e) => {
                    warn!(segment = %self.name, feature = %name, "cannot read delay: {e}");
                    None
                }
            })
            .unwrap_or(f64::INFINITY);
        let max_after = self
            .next_start
            .map(|next| next - self.stop_time())
            .unwrap_or(0.0);
        PaddingLimits::new(max_before, max_after)
    }

    /// Like [`Segment::extract`], with padding reduced to [`Segment::padding_limits`]
    pub fn extract_limited(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
        let limits = self.padding_limits();
        let (limited_before, limited_after) = limits.apply(before, after);
        if limited_before != before {
            warn!(
                segment = %self.name,
                before,
                max_before = limits.max_before,
                "before reduced to limit"
            );
        }
        if limited_after != after {
            warn!(
                segment = %self.name,
                after,
                max_after = limits.max_after,
                "after reduced to limit"
            );
        }
        self.extract(trace_name, limited_before, limited_after, reference)
    }

    /// Read a feature value for this segment
    ///
    /// The full feature column is cached per (segment id, feature name). For
    /// multi-instance tags the entry of this instance is returned, a link to
    /// another stored array is resolved once.
    pub fn feature(&self, name: &str) -> Result<FeatureValue> {
        let column = self
            .cache
            .get_or_fetch(&self.id, name, || self.tag.feature_column(name))?;

        let selected = match self.instance {
            Instance::Single => {
                debug!(segment = %self.name, feature = name, "reading feature data");
                (*column).clone()
            }
            Instance::Multi(index) => {
                debug!(segment = %self.name, feature = name, index, "reading feature data");
                column.get(index).cloned().ok_or_else(|| {
                    error!(
                        segment = %self.name,
                        feature = name,
                        index,
                        entries = column.len(),
                        "feature column does not cover this instance"
                    );
                    Error::InconsistentSegmentState(format!(
                        "feature {name} has no entry for instance {index} of {}",
                        self.name
                    ))
                })?
            }
        };

        match selected {
            FeatureValue::Link { link } => self.tag.resolve_link(&link),
            value => Ok(value),
        }
    }

    /// Pointer to this segment for later retrieval; `None` for empty or inverted windows
    pub fn data_link(&self, dataset_name: &str) -> Option<DataLink> {
        let segment_type = match self.mapping.classify(&self.segment_type) {
            Some(DataKind::StimulusSegment) => SegmentType::StimulusSegment,
            _ => SegmentType::ReproRun,
        };
        let limits = self.padding_limits();
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };

        let link = DataLink::new(
            dataset_name,
            &self.id,
            segment_type,
            self.start_time(),
            self.stop_time(),
        );
        match link {
            Ok(link) => {
                let link = link
                    .with_padding(finite(limits.max_before), finite(limits.max_after))
                    .with_mapping_version(self.mapping);
                Some(match self.instance {
                    Instance::Multi(index) => link.with_index(index),
                    Instance::Single => link,
                })
            }
            Err(e) => {
                warn!(segment = %self.name, "no data link: {e}");
                None
            }
        }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("segment_type", &self.segment_type)
            .field("instance", &self.instance)
            .field("window", &self.window)
            .field("traces", &self.traces.names())
            .finish()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \t type: {}\n\tstart time: {:.2}s, duration: {:.2}s",
            self.name,
            self.segment_type,
            self.start_time(),
            self.duration()
        )?;
        if let Some(index) = self.index() {
            write!(f, ", instance {index}")?;
        }
        Ok(())
    }
}
