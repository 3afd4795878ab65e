//! Recorded data traces: continuous (sampled) and event traces

use crate::error::{Error, Result};
use crate::storage::store::{ContinuousSource, EventSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Version of the mapping from recorder entities to store types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MappingVersion {
    #[serde(rename = "1.0")]
    V1_0,
    #[serde(rename = "1.1")]
    #[default]
    V1_1,
}

impl MappingVersion {
    /// Type string used for data of the given kind
    pub fn type_name(&self, kind: DataKind) -> &'static str {
        match (self, kind) {
            (Self::V1_0, DataKind::Continuous) => "nix.data.sampled",
            (Self::V1_0, DataKind::Event) => "nix.events.position",
            (Self::V1_0, DataKind::StimulusSegment) => "nix.event.stimulus",
            (Self::V1_1, DataKind::Continuous) => "relacs.data.sampled",
            (Self::V1_1, DataKind::Event) => "relacs.data.event",
            (Self::V1_1, DataKind::StimulusSegment) => "relacs.stimulus",
        }
    }

    /// Classify a store type string; `None` if it is none of the known kinds
    pub fn classify(&self, type_string: &str) -> Option<DataKind> {
        [
            DataKind::Continuous,
            DataKind::Event,
            DataKind::StimulusSegment,
        ]
        .into_iter()
        .find(|kind| type_string.contains(self.type_name(*kind)))
    }
}

impl fmt::Display for MappingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_0 => write!(f, "1.0"),
            Self::V1_1 => write!(f, "1.1"),
        }
    }
}

/// Kind of stored entity, as encoded in its type string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Continuous,
    Event,
    StimulusSegment,
}

/// Trace data handle, one variant per kind of trace
#[derive(Clone)]
pub enum TraceKind {
    /// Sampled signal with a derivable time axis
    Continuous(Arc<dyn ContinuousSource>),
    /// Sparse event times without a separate axis
    Event(Arc<dyn EventSource>),
}

impl TraceKind {
    /// The corresponding data kind
    pub fn data_kind(&self) -> DataKind {
        match self {
            Self::Continuous(_) => DataKind::Continuous,
            Self::Event(_) => DataKind::Event,
        }
    }

    /// Read values overlapping [start, start + extent)
    pub fn get_slice(&self, start: f64, extent: f64) -> Result<Vec<f64>> {
        match self {
            Self::Continuous(source) => source.get_slice(start, extent),
            Self::Event(source) => source.get_slice(start, extent),
        }
    }

    /// Latest time represented in the trace
    pub fn max_time(&self) -> f64 {
        match self {
            Self::Continuous(source) => source.max_time(),
            Self::Event(source) => source.max_time(),
        }
    }
}

impl fmt::Debug for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous(source) => f
                .debug_struct("Continuous")
                .field("sampling_interval", &source.sampling_interval())
                .field("max_time", &source.max_time())
                .finish(),
            Self::Event(source) => f
                .debug_struct("Event")
                .field("max_time", &source.max_time())
                .finish(),
        }
    }
}

/// A recorded data trace and its metadata
#[derive(Debug, Clone)]
pub struct DataTrace {
    name: String,
    id: String,
    array_type: String,
    kind: TraceKind,
}

impl DataTrace {
    /// Create a trace, checking that the array type matches the handle
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        array_type: impl Into<String>,
        mapping: MappingVersion,
        kind: TraceKind,
    ) -> Result<Self> {
        let name = name.into();
        let array_type = array_type.into();
        match mapping.classify(&array_type) {
            Some(found) if found == kind.data_kind() => Ok(Self {
                name,
                id: id.into(),
                array_type,
                kind,
            }),
            _ => Err(Error::InvalidTrace(format!(
                "array {} of type {} is not a {:?} trace (mapping version {})",
                name,
                array_type,
                kind.data_kind(),
                mapping
            ))),
        }
    }

    /// Trace name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store identifier of the underlying array
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Store type string of the underlying array
    pub fn array_type(&self) -> &str {
        &self.array_type
    }

    /// Data handle
    pub fn kind(&self) -> &TraceKind {
        &self.kind
    }

    /// Continuous or event
    pub fn data_kind(&self) -> DataKind {
        self.kind.data_kind()
    }

    /// Latest time represented in this trace
    pub fn max_time(&self) -> f64 {
        self.kind.max_time()
    }

    /// Sampling interval; event traces have none
    pub fn sampling_interval(&self) -> Option<f64> {
        match &self.kind {
            TraceKind::Continuous(source) => Some(source.sampling_interval()),
            TraceKind::Event(_) => {
                warn!(trace = %self.name, "sampling interval makes no sense for event traces");
                None
            }
        }
    }
}

impl fmt::Display for DataTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {:?}, type {}, maximum time {:.5}s",
            self.name,
            self.id,
            self.data_kind(),
            self.array_type,
            self.max_time()
        )
    }
}
