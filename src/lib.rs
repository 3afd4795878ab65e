//! Trace-Segments: segment-bounded access to recorded electrophysiology traces
//!
//! A recording session holds continuous (sampled) and event traces. Segments
//! mark intervals of interest, such as protocol runs or single stimulus
//! presentations, in a tagged time-series store. This crate reads the data
//! of a trace for a segment, with optional padding, clamped to the recorded
//! data and in absolute or segment-relative time.
//!
//! # Core Concepts
//!
//! - **Segments**: a time interval with identity, features and visible traces
//! - **Traces**: continuous traces with a derived time axis, or event times
//! - **Features**: metadata columns attached to a segment's tag, cached on read
//! - **Time reference**: absolute data time, or zero at segment start
//!
//! # Example
//!
//! ```no_run
//! use trace_segments::prelude::*;
//!
//! # fn example() -> trace_segments::error::Result<()> {
//! let recording = Recording::open("2021-11-11-aa.json")?;
//! let segment = recording.segment("SAM_1", Some(0))?;
//!
//! // Membrane voltage with 100 ms before and after the stimulus
//! let data = segment.extract("V-1", 0.1, 0.1, TimeReference::Zero)?;
//! println!("{} samples", data.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{Config, ConfigSource};
    pub use crate::core::*;
    pub use crate::error::{Error, Result};
    pub use crate::storage::*;
}
