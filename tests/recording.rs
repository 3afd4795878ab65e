//! Integration tests over a complete in-memory recording

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use trace_segments::cli::{export, ReadOptions, TraceSelection};
use trace_segments::config::ConfigFile;
use trace_segments::prelude::*;

const RECORDING: &str = r#"{
    "name": "2021-11-11-aa",
    "mapping_version": "1.1",
    "traces": [
        {"name": "V-1", "type": "relacs.data.sampled", "sampling_interval": 0.1,
         "values": [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19,
                    20, 21, 22, 23, 24, 25, 26, 27, 28, 29,
                    30, 31, 32, 33, 34, 35, 36, 37, 38, 39]},
        {"name": "Spikes-1", "type": "relacs.data.event", "values": [0.15, 1.05, 1.55, 2.25, 3.45]},
        {"name": "EOD", "type": "relacs.data.sampled", "sampling_interval": 0.5,
         "values": [1, -1, 1, -1, 1, -1, 1, -1]}
    ],
    "tags": [
        {"id": "repro-1", "name": "BaselineActivity_1", "type": "relacs.repro_run",
         "layout": "single", "position": 0.0, "extent": 1.0,
         "references": ["V-1", "Spikes-1", "EOD"]},
        {"id": "stim-1", "name": "SAM_1", "type": "relacs.stimulus",
         "layout": "multi", "positions": [1.0, 2.0, 3.0], "extents": [0.5, 0.5, 0.5],
         "references": ["V-1", "Spikes-1"],
         "features": [
            {"name": "SAM_1_delay", "type": "relacs.feature", "unit": "s", "data": [0.2, 0.2, 0.2]},
            {"name": "SAM_1_contrast", "type": "relacs.feature.mutable", "unit": "%",
             "data": [10, 20, 30]},
            {"name": "SAM_1_abs_time", "type": "relacs.feature", "unit": "s",
             "data": [101.0, 102.0, 103.0]}
         ]},
        {"id": "stim-2", "name": "Interrupted_1", "type": "relacs.stimulus",
         "layout": "single", "position": 3.8, "extent": -0.5,
         "references": ["V-1"]}
    ]
}"#;

fn recording() -> Recording {
    Recording::from_json(RECORDING).unwrap()
}

#[test]
fn test_stimulus_extraction() {
    let recording = recording();
    let segment = recording.segment("SAM_1", Some(1)).unwrap();

    let data = segment.extract("V-1", 0.0, 0.0, TimeReference::Zero).unwrap();
    assert_eq!(data.values, vec![20.0, 21.0, 22.0, 23.0, 24.0]);
    assert_eq!(data.time.as_ref().unwrap()[0], 0.0);

    let spikes = segment.extract("Spikes-1", 0.0, 0.0, TimeReference::Zero).unwrap();
    assert_eq!(spikes.values.len(), 1);
    assert!((spikes.values[0] - 0.25).abs() < 1e-12);
    assert!(spikes.time.is_none());

    assert!(matches!(
        segment.extract("EOD", 0.0, 0.0, TimeReference::Zero),
        Err(Error::UnknownTrace(_))
    ));
}

#[test]
fn test_padding_limits() {
    let recording = recording();
    let segment = recording.segment("SAM_1", Some(0)).unwrap();

    let limits = segment.padding_limits();
    assert_eq!(limits.max_before, 0.2);
    assert!((limits.max_after - 0.5).abs() < 1e-12);

    let limited = segment
        .extract_limited("V-1", 1.0, 1.0, TimeReference::Zero)
        .unwrap();
    let unlimited = segment
        .extract("V-1", 0.2, 0.5, TimeReference::Zero)
        .unwrap();
    assert_eq!(limited, unlimited);

    // the last instance has no following stimulus
    let last = recording.segment("SAM_1", Some(2)).unwrap();
    assert_eq!(last.padding_limits().max_after, 0.0);
}

#[test]
fn test_interrupted_segment() {
    let recording = recording();
    let segment = recording.segment("Interrupted_1", None).unwrap();
    let data = segment.extract("V-1", 0.1, 0.1, TimeReference::Absolute).unwrap();
    assert_eq!(data, TraceData::empty());
    assert!(segment.data_link("2021-11-11-aa").is_none());
}

#[test]
fn test_features_shared_between_instances() {
    let recording = recording();
    let first = recording.segment("SAM_1", Some(0)).unwrap();
    let third = recording.segment("SAM_1", Some(2)).unwrap();

    assert_eq!(first.feature("SAM_1_contrast").unwrap().as_f64(), Some(10.0));
    assert_eq!(third.feature("SAM_1_contrast").unwrap().as_f64(), Some(30.0));
    assert!(recording.cache().contains("stim-1", "SAM_1_contrast"));
    assert_eq!(first.features().len(), 3);
    assert_eq!(first.features()[1].unit.as_deref(), Some("%"));
}

#[test]
fn test_stimulus_metadata() {
    let recording = recording();
    let segment = recording.segment("SAM_1", Some(1)).unwrap();

    assert_eq!(segment.absolute_start_time(), Some(102.0));
    let mutable = segment.mutable_features();
    assert_eq!(mutable.len(), 1);
    assert_eq!(mutable[0].suffix, "contrast");
    assert_eq!(mutable[0].value.as_f64(), Some(20.0));
    assert_eq!(mutable[0].unit.as_deref(), Some("%"));

    let baseline = recording.segment("BaselineActivity_1", None).unwrap();
    assert_eq!(baseline.absolute_start_time(), None);
    assert!(baseline.mutable_features().is_empty());
}

#[test]
fn test_data_links() {
    let recording = recording();
    let links: Vec<DataLink> = recording
        .segments()
        .unwrap()
        .iter()
        .filter_map(|s| s.data_link("2021-11-11-aa"))
        .collect();

    assert_eq!(links.len(), 4);
    assert_eq!(links[0].segment_type, SegmentType::ReproRun);
    assert_eq!(links[1].segment_type, SegmentType::StimulusSegment);
    assert_eq!(links[1].index, Some(0));
    assert_eq!(links[1].max_before, 0.2);
    assert_eq!(links[3].max_after, 0.0);
}

#[test]
fn test_resolve_trace_from_config() {
    let recording = recording();
    let segment = recording.segment("BaselineActivity_1", None).unwrap();
    let local = ConfigFile::from_json(
        r#"{"trace_configs": {"efish": {"eod": ["LocalEOD-1", "EOD"], "spikes": ["Spikes-2"]}}}"#,
    )
    .unwrap();
    let config = Config::new(ConfigFile::default(), local);

    assert_eq!(config.resolve_trace("efish", "eod", &segment), Some("EOD".to_string()));
    assert_eq!(config.resolve_trace("efish", "spikes", &segment), None);
    assert_eq!(config.resolve_trace("efish", "unknown", &segment), None);
}

#[test]
fn test_open_recording_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(RECORDING.as_bytes()).unwrap();

    let recording = Recording::open(file.path()).unwrap();
    assert_eq!(recording.segments().unwrap().len(), 5);
    assert!(Recording::open(file.path().with_extension("missing")).is_err());
}

#[tokio::test]
async fn test_export_keeps_segment_order() {
    let recording = recording();
    let selection = TraceSelection {
        trace: Some("Spikes-1".to_string()),
        role: None,
        plugin: "default".to_string(),
    };
    let options = ReadOptions {
        before: 0.0,
        after: 0.0,
        absolute: true,
    };
    let rows = export(recording.segments().unwrap(), &selection, &Config::default(), options)
        .await
        .unwrap();

    // Interrupted_1 does not reference the spikes
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].segment, "BaselineActivity_1");
    assert_eq!(rows[0].data.values, vec![0.15]);
    assert_eq!(rows[1].index, Some(0));
    assert_eq!(rows[1].data.values, vec![1.05]);
    assert_eq!(rows[2].data.values, vec![2.25]);
    assert_eq!(rows[3].data.values, vec![3.45]);
}

/// Tag that counts how often feature columns are read from the store
struct CountingTag {
    reads: AtomicUsize,
}

impl TagSource for CountingTag {
    fn id(&self) -> String {
        "counting".to_string()
    }

    fn name(&self) -> String {
        "FICurve_1".to_string()
    }

    fn tag_type(&self) -> String {
        "relacs.repro_run".to_string()
    }

    fn layout(&self) -> TagLayout {
        TagLayout::Single {
            position: 0.0,
            extent: Some(1.0),
        }
    }

    fn references(&self) -> Vec<String> {
        Vec::new()
    }

    fn features(&self) -> Vec<FeatureInfo> {
        vec![
            FeatureInfo::new(0, "FICurve_1_intensity", "relacs.feature"),
            FeatureInfo::new(1, "FICurve_1_duration", "relacs.feature"),
        ]
    }

    fn feature_column(&self, name: &str) -> Result<FeatureValue> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match name {
            "FICurve_1_intensity" => Ok(FeatureValue::from_f64s(&[1.0, 2.0, 3.0])),
            "FICurve_1_duration" => Ok(FeatureValue::Scalar(0.4)),
            _ => Err(Error::UnknownFeature(name.to_string())),
        }
    }

    fn resolve_link(&self, target: &str) -> Result<FeatureValue> {
        Err(Error::StoreRead(target.to_string()))
    }
}

#[test]
fn test_feature_lookup_reads_store_once() {
    let tag = Arc::new(CountingTag {
        reads: AtomicUsize::new(0),
    });
    let segment = Segment::new(tag.clone(), &TraceRegistry::new(), None).unwrap();

    let first = segment.feature("FICurve_1_intensity").unwrap();
    let second = segment.feature("FICurve_1_intensity").unwrap();
    assert_eq!(first, second);
    assert_eq!(tag.reads.load(Ordering::SeqCst), 1);

    // a different feature of the same segment gets its own entry
    assert_eq!(segment.feature("FICurve_1_duration").unwrap(), FeatureValue::Scalar(0.4));
    assert_eq!(tag.reads.load(Ordering::SeqCst), 2);
    assert_eq!(segment.cache().len(), 2);
    assert_eq!(
        *segment.cache().get("counting", "FICurve_1_intensity").unwrap(),
        FeatureValue::from_f64s(&[1.0, 2.0, 3.0])
    );

    // failed reads are not cached
    assert!(segment.feature("FICurve_1_contrast").is_err());
    assert!(segment.feature("FICurve_1_contrast").is_err());
    assert_eq!(tag.reads.load(Ordering::SeqCst), 4);
}
