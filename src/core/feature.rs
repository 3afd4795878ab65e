//! Feature values attached to segment descriptors

use serde::{Deserialize, Serialize};

/// Value stored in a feature column
///
/// A column of a multi-instance tag is a `List` with one entry per instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Plain number
    Scalar(f64),
    /// Plain string
    Text(String),
    /// Array of values (rows for multi-instance columns)
    List(Vec<FeatureValue>),
    /// Reference to another stored array, resolved on read
    Link {
        /// Name of the referenced array in the store
        link: String,
    },
}

impl FeatureValue {
    /// Create a list of scalars
    pub fn from_f64s(values: &[f64]) -> Self {
        Self::List(values.iter().copied().map(Self::Scalar).collect())
    }

    /// Create a link to a stored array
    pub fn link(target: impl Into<String>) -> Self {
        Self::Link {
            link: target.into(),
        }
    }

    /// Element at an instance index (lists only)
    pub fn get(&self, index: usize) -> Option<&FeatureValue> {
        match self {
            Self::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Number of elements; scalars and strings count as one
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            _ => 1,
        }
    }

    /// Check for an empty list
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::List(items) if items.is_empty())
    }

    /// Single number, unwrapping one-element lists
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::List(items) if items.len() == 1 => items[0].as_f64(),
            _ => None,
        }
    }
}

/// Descriptor of a feature attached to a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Position in the descriptor's feature list
    pub index: usize,
    /// Feature name
    pub name: String,
    /// Type string of the feature data
    pub feature_type: String,
    /// Unit of the feature data
    pub unit: Option<String>,
}

impl FeatureInfo {
    /// Create a feature descriptor
    pub fn new(index: usize, name: impl Into<String>, feature_type: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            feature_type: feature_type.into(),
            unit: None,
        }
    }

    /// Set unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Value of a feature that changes between runs of a protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutableFeature {
    /// Feature name without the `<segment name>_` prefix
    pub suffix: String,
    pub value: FeatureValue,
    pub unit: Option<String>,
}
