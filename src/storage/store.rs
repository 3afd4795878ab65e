//! Store contract: the capabilities segments need from a tagged time-series store
//!
//! Segments never open files or own store objects. They talk to the store
//! through the traits below, one per kind of stored entity.

use crate::core::feature::{FeatureInfo, FeatureValue};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A continuously sampled data array
#[cfg_attr(test, mockall::automock)]
pub trait ContinuousSource: Send + Sync {
    /// Values overlapping [start, start + extent)
    fn get_slice(&self, start: f64, extent: f64) -> Result<Vec<f64>>;

    /// Sample times of a slice with `count` samples, relative to its first sample
    fn axis(&self, count: usize) -> Vec<f64>;

    /// Sampling interval in seconds
    fn sampling_interval(&self) -> f64;

    /// Latest time for which data exists
    fn max_time(&self) -> f64;
}

/// An array of event times
#[cfg_attr(test, mockall::automock)]
pub trait EventSource: Send + Sync {
    /// Event times within [start, start + extent)
    fn get_slice(&self, start: f64, extent: f64) -> Result<Vec<f64>>;

    /// Time of the last event, 0.0 if there are none
    fn max_time(&self) -> f64;
}

/// Positions and extents of a tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum TagLayout {
    /// Tag marking one interval
    Single {
        position: f64,
        #[serde(default)]
        extent: Option<f64>,
    },
    /// Tag marking several intervals that share references and features
    Multi {
        positions: Vec<f64>,
        #[serde(default)]
        extents: Option<Vec<f64>>,
    },
}

impl TagLayout {
    /// Number of intervals marked by the tag
    pub fn instance_count(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Multi { positions, .. } => positions.len(),
        }
    }

    /// Check for a multi-instance layout
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi { .. })
    }
}

/// A tag descriptor: the store entity a segment is built from
#[cfg_attr(test, mockall::automock)]
pub trait TagSource: Send + Sync {
    /// Unique, stable identifier
    fn id(&self) -> String;

    /// Tag name
    fn name(&self) -> String;

    /// Tag type string
    fn tag_type(&self) -> String;

    /// Positions and extents
    fn layout(&self) -> TagLayout;

    /// Names of the data arrays the tag references
    fn references(&self) -> Vec<String>;

    /// Features attached to the tag, in storage order
    fn features(&self) -> Vec<FeatureInfo>;

    /// Full column of values stored for a feature
    fn feature_column(&self, name: &str) -> Result<FeatureValue>;

    /// Read the array a feature link points to
    fn resolve_link(&self, target: &str) -> Result<FeatureValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_instances() {
        let single = TagLayout::Single {
            position: 1.0,
            extent: Some(2.0),
        };
        assert_eq!(single.instance_count(), 1);
        assert!(!single.is_multi());

        let multi = TagLayout::Multi {
            positions: vec![1.0, 2.0, 3.0],
            extents: None,
        };
        assert_eq!(multi.instance_count(), 3);
        assert!(multi.is_multi());
    }

    #[test]
    fn test_layout_json() {
        let layout: TagLayout =
            serde_json::from_str(r#"{"layout": "multi", "positions": [0.5, 1.5]}"#).unwrap();
        assert_eq!(
            layout,
            TagLayout::Multi {
                positions: vec![0.5, 1.5],
                extents: None
            }
        );
    }
}
