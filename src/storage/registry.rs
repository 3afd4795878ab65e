//! Trace registry: ordered name -> trace lookup

use crate::core::trace::DataTrace;
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered map from trace name to trace metadata
///
/// Traces are shared, not copied: views handed to segments hold the same
/// `Arc`s as the registry they were taken from.
#[derive(Debug, Clone, Default)]
pub struct TraceRegistry {
    traces: Vec<Arc<DataTrace>>,
    by_name: HashMap<String, usize>,
}

impl TraceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trace; a trace with the same name is replaced in place
    pub fn insert(&mut self, trace: DataTrace) {
        self.insert_shared(Arc::new(trace));
    }

    fn insert_shared(&mut self, trace: Arc<DataTrace>) {
        match self.by_name.get(trace.name()) {
            Some(&slot) => self.traces[slot] = trace,
            None => {
                self.by_name.insert(trace.name().to_string(), self.traces.len());
                self.traces.push(trace);
            }
        }
    }

    /// Look up a trace by name
    pub fn get(&self, name: &str) -> Option<&Arc<DataTrace>> {
        self.by_name.get(name).map(|&slot| &self.traces[slot])
    }

    /// Check if a trace is known
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Trace names in registry order
    pub fn names(&self) -> Vec<String> {
        self.traces.iter().map(|t| t.name().to_string()).collect()
    }

    /// Iterate over traces in registry order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DataTrace>> {
        self.traces.iter()
    }

    /// Scoped view containing the given names in the given order
    ///
    /// Names the registry does not know are dropped, duplicates are kept once.
    pub fn view<S: AsRef<str>>(&self, names: &[S]) -> TraceRegistry {
        let mut view = TraceRegistry::new();
        for name in names {
            if let Some(trace) = self.get(name.as_ref()) {
                if !view.contains(trace.name()) {
                    view.insert_shared(Arc::clone(trace));
                }
            }
        }
        view
    }

    /// Number of traces
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}
