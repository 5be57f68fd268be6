mod common;

use common::*;
use tempfile::TempDir;
use textzones::config::{AppConfig, Backend};
use textzones::detection::LayoutDataset;
use textzones::{MatchMode, ScoreMode};

#[test]
fn test_defaults() {
    let config = AppConfig::load_or_default(None).unwrap();

    assert_eq!(config.batch.pool, PoolKind::Parallel);
    assert_eq!(config.batch.extensions, vec!["jpg", "jpeg", "png"]);
    assert_eq!(config.detector.backend, Backend::Contour);
    assert!(config.detector.keep_text_only);
    assert_eq!(config.evaluation.policy.match_mode, MatchMode::Strict);
    assert_eq!(config.evaluation.policy.join_threshold, 0.2);
    assert_eq!(config.evaluation.filter.min_width, 0.5);
    assert_eq!(config.detector.build_model().name(), "contour");
}

#[test]
fn test_partial_toml() {
    let config = AppConfig::from_toml(
        r#"
        [batch]
        pool = "concurrent"
        workers = 8

        [detector]
        backend = "sidecar"
        dataset = "PubLayNet"
        keep_text_only = false

        [evaluation.policy]
        match_mode = "accumulated"
        score_mode = "ioa"
        join_threshold = 0.0
        "#,
    )
    .unwrap();

    assert_eq!(config.batch.pool, PoolKind::Concurrent);
    assert_eq!(config.batch.workers, Some(8));
    assert_eq!(config.batch.extensions.len(), 3);
    assert_eq!(config.detector.dataset, Some(LayoutDataset::PubLayNet));
    assert!(!config.detector.keep_text_only);
    assert_eq!(config.detector.build_model().name(), "sidecar-publaynet");
    assert_eq!(config.evaluation.policy.match_mode, MatchMode::Accumulated);
    assert_eq!(config.evaluation.policy.score_mode, ScoreMode::Ioa);
    assert_eq!(config.evaluation.policy.offset, 1.0);
    assert_eq!(config.transcribe.pad_x, 0.02);
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("textzones.toml");
    std::fs::write(&path, "[detector.contour]\nmerge_radius = 3\n").unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.detector.contour.merge_radius, 3);
    assert_eq!(config.detector.contour.min_width, 20);

    std::fs::write(&path, "[batch]\npool = \"carrier-pigeon\"\n").unwrap();
    assert!(AppConfig::load(&path).is_err());
    assert!(AppConfig::load(&dir.path().join("absent.toml")).is_err());
}
