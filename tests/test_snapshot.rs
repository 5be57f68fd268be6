mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use textzones::snapshot::{self, SnapshotError, SnapshotMeta};

fn sample_results() -> ResultSet {
    ResultSet::from_records(vec![
        DetectionRecord {
            image_path: "/corpus/b.jpg".into(),
            image_height: 100,
            image_width: 80,
            boxes: vec![BBox::fractional(Rect::new(0.1, 0.2, 0.9, 0.3)).with_label("Text").with_score(0.75)],
        },
        DetectionRecord {
            image_path: "/corpus/a.jpg".into(),
            image_height: 50,
            image_width: 40,
            boxes: vec![],
        },
    ])
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/run.bin.zst");
    let meta = SnapshotMeta::new("stub", dir.path(), Slice::new(0, 10));
    let results = sample_results();

    snapshot::save(&path, &meta, &results).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("partial").exists());

    let (loaded_meta, loaded) = snapshot::load(&path).unwrap();
    assert_eq!(loaded_meta, meta);
    assert_eq!(loaded, results);
    assert_eq!(loaded.records()[0].image_path, std::path::PathBuf::from("/corpus/a.jpg"));
}

#[test]
fn test_load_matching() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.bin.zst");
    let meta = SnapshotMeta::new("stub", dir.path(), Slice::all());

    assert!(snapshot::load_matching(&path, &meta).unwrap().is_none());

    snapshot::save(&path, &meta, &sample_results()).unwrap();
    assert_eq!(snapshot::load_matching(&path, &meta).unwrap(), Some(sample_results()));

    let other_model = SnapshotMeta::new("contour", dir.path(), Slice::all());
    assert!(matches!(
        snapshot::load_matching(&path, &other_model),
        Err(SnapshotError::Mismatch { .. })
    ));

    let other_slice = SnapshotMeta::new("stub", dir.path(), Slice::new(0, 1));
    assert!(snapshot::load_matching(&path, &other_slice).is_err());
}

#[test]
fn test_equivalent_whole_corpus_slices_match() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.bin.zst");
    snapshot::save(&path, &SnapshotMeta::new("stub", dir.path(), Slice::all()), &sample_results()).unwrap();

    // 5..5 selects the whole corpus just like -1..-1
    let same_range = SnapshotMeta::new("stub", dir.path(), Slice::new(5, 5));
    assert_eq!(snapshot::load_matching(&path, &same_range).unwrap(), Some(sample_results()));
}

#[test]
fn test_load_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.bin.zst");
    std::fs::write(&path, b"not zstd at all").unwrap();

    assert!(snapshot::load(&path).is_err());
}

#[test]
fn test_default_file_name() {
    assert_eq!(snapshot::default_file_name("contour", Slice::new(0, 100)), "contour_0_100.bin.zst");
    assert_eq!(snapshot::default_file_name("stub", Slice::all()), "stub_-1_-1.bin.zst");
}

#[test]
fn test_resume_skips_detection() {
    let corpus = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    create_corpus(corpus.path());
    let snapshot_path = out.path().join("stub.bin.zst");
    let calls = Arc::new(AtomicUsize::new(0));

    let batch = |calls: &Arc<AtomicUsize>| {
        let model = StubModel::new(default_regions()).with_counter(Arc::clone(calls));
        BatchDetector::new(Detector::new(model), BatchConfig::default())
    };

    // 1. First run detects every decodable image and writes the snapshot
    let first = batch(&calls).run_or_resume(corpus.path(), Slice::all(), &snapshot_path).unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(snapshot_path.exists());

    // 2. Same model, root and slice: loaded without touching the model
    let second = batch(&calls).run_or_resume(corpus.path(), Slice::all(), &snapshot_path).unwrap();
    assert_eq!(second, first);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // 3. A different slice must not silently reuse the file
    let mismatched = batch(&calls).run_or_resume(corpus.path(), Slice::new(0, 2), &snapshot_path);
    assert!(mismatched.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
