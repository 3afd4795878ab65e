//! Data links: serialisable pointers that identify a segment in a dataset

use crate::core::trace::MappingVersion;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// What a data link points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentType {
    /// A complete run of a recording protocol
    ReproRun,
    /// A single stimulus presentation
    StimulusSegment,
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReproRun => write!(f, "ReproRun"),
            Self::StimulusSegment => write!(f, "StimulusSegment"),
        }
    }
}

/// Everything needed to find a segment again and read it from its dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLink {
    pub dataset_name: String,
    pub tag_id: String,
    pub segment_type: SegmentType,
    pub start_time: f64,
    pub stop_time: f64,
    pub index: Option<usize>,
    pub max_before: f64,
    pub max_after: f64,
    pub mapping_version: MappingVersion,
}

impl DataLink {
    /// Create a data link; the time range must not be empty or inverted
    pub fn new(
        dataset_name: impl Into<String>,
        tag_id: impl Into<String>,
        segment_type: SegmentType,
        start_time: f64,
        stop_time: f64,
    ) -> Result<Self> {
        if stop_time <= start_time {
            error!(
                %segment_type,
                start_time, stop_time, "data link stop time is not after start time"
            );
            return Err(Error::InvalidDataLink(format!(
                "{segment_type} stop time {stop_time} is less or equal to start time {start_time}"
            )));
        }
        Ok(Self {
            dataset_name: dataset_name.into(),
            tag_id: tag_id.into(),
            segment_type,
            start_time,
            stop_time,
            index: None,
            max_before: 0.0,
            max_after: 0.0,
            mapping_version: MappingVersion::default(),
        })
    }

    /// Set the instance index within a multi-instance tag
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Set how far around the segment data may be read
    pub fn with_padding(mut self, max_before: f64, max_after: f64) -> Self {
        self.max_before = max_before;
        self.max_after = max_after;
        self
    }

    /// Set mapping version
    pub fn with_mapping_version(mut self, version: MappingVersion) -> Self {
        self.mapping_version = version;
        self
    }

    /// Segment duration
    pub fn duration(&self) -> f64 {
        self.stop_time - self.start_time
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
