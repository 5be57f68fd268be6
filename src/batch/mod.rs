pub mod corpus;
pub mod pool;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::detection::{load_image, DetectionError, Detector, LayoutModel};
use crate::models::{DetectionRecord, ResultSet};
use crate::snapshot::{self, SnapshotMeta};

pub use corpus::{enumerate_images, Slice, DEFAULT_EXTENSIONS};
pub use pool::{PoolKind, TaskPanic, WorkerPool};

/// Batch orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// File extensions treated as page images (case-insensitive)
    pub extensions: Vec<String>,
    pub pool: PoolKind,
    /// Worker count; `None` uses the number of available cores
    pub workers: Option<usize>,
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            pool: PoolKind::Parallel,
            workers: None,
            show_progress: false,
        }
    }
}

/// An image that produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: ResultSet,
    pub failures: Vec<ImageFailure>,
}

impl BatchReport {
    /// Number of images dispatched
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

/// Runs a [`Detector`] over every image of a corpus on a worker pool
pub struct BatchDetector<M> {
    detector: Arc<Detector<M>>,
    config: BatchConfig,
}

impl<M: LayoutModel + 'static> BatchDetector<M> {
    pub fn new(detector: Detector<M>, config: BatchConfig) -> Self {
        Self {
            detector: Arc::new(detector),
            config,
        }
    }

    pub fn detector(&self) -> &Detector<M> {
        &self.detector
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Sorted, sliced list of image paths to process
    pub fn plan(&self, root: &Path, slice: Slice) -> anyhow::Result<Vec<PathBuf>> {
        let paths = enumerate_images(root, &self.config.extensions)
            .with_context(|| format!("Failed to enumerate images under {:?}", root))?;
        let total = paths.len();
        let paths = slice.apply(paths);
        tracing::info!(found = total, selected = paths.len(), slice = %slice, "Process {} images", paths.len());
        Ok(paths)
    }

    /// Detect every selected image, blocking until the batch completes.
    pub fn run(&self, root: &Path, slice: Slice) -> anyhow::Result<BatchReport> {
        let paths = self.plan(root, slice)?;
        let progress = self.progress_bar(paths.len())?;
        let pool = WorkerPool::new(self.config.pool, self.config.workers);
        let outcomes = pool.map(paths.clone(), detection_task(Arc::clone(&self.detector), progress.clone()))?;
        progress.finish_and_clear();
        Ok(self.collect(paths, outcomes))
    }

    /// Async counterpart of [`BatchDetector::run`] for callers inside a tokio runtime.
    pub async fn run_async(&self, root: &Path, slice: Slice) -> anyhow::Result<BatchReport> {
        let paths = self.plan(root, slice)?;
        let progress = self.progress_bar(paths.len())?;
        let pool = WorkerPool::new(self.config.pool, self.config.workers);
        let task = detection_task(Arc::clone(&self.detector), progress.clone());
        let outcomes = pool.map_async(paths.clone(), task).await?;
        progress.finish_and_clear();
        Ok(self.collect(paths, outcomes))
    }

    /// `start`/`end` follow [`Slice`]: pass `-1, -1` for the whole corpus.
    pub fn batch_detect(&self, root: &Path, start: i64, end: i64) -> anyhow::Result<ResultSet> {
        Ok(self.run(root, Slice::new(start, end))?.results)
    }

    /// Load `snapshot_path` if it holds a run of this model over the same
    /// root and slice; otherwise run the batch and write the snapshot.
    pub fn run_or_resume(&self, root: &Path, slice: Slice, snapshot_path: &Path) -> anyhow::Result<ResultSet> {
        let meta = SnapshotMeta::new(self.detector.model().name(), root, slice);

        if let Some(results) = snapshot::load_matching(snapshot_path, &meta)? {
            tracing::info!(snapshot = %snapshot_path.display(), records = results.len(), "Reusing cached detections");
            return Ok(results);
        }

        let report = self.run(root, slice)?;
        snapshot::save(snapshot_path, &meta, &report.results)?;
        tracing::info!(
            snapshot = %snapshot_path.display(),
            records = report.results.len(),
            failures = report.failures.len(),
            "Detection results saved"
        );
        Ok(report.results)
    }

    fn progress_bar(&self, len: usize) -> anyhow::Result<ProgressBar> {
        if !self.config.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}<{eta_precise}]")?);
        Ok(bar)
    }

    fn collect(
        &self,
        paths: Vec<PathBuf>,
        outcomes: Vec<Result<Result<DetectionRecord, DetectionError>, TaskPanic>>,
    ) -> BatchReport {
        let mut records = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();

        for (path, outcome) in paths.into_iter().zip(outcomes) {
            let reason = match outcome {
                Ok(Ok(record)) => {
                    records.push(record);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(TaskPanic(msg)) => format!("worker panicked: {}", msg),
            };
            tracing::warn!(image = %path.display(), "Error: {}", reason);
            failures.push(ImageFailure { path, reason });
        }

        if !failures.is_empty() {
            tracing::warn!("{} of {} images failed", failures.len(), records.len() + failures.len());
        }

        BatchReport {
            results: ResultSet::from_records(records),
            failures,
        }
    }
}

fn detection_task<M: LayoutModel + 'static>(
    detector: Arc<Detector<M>>,
    progress: ProgressBar,
) -> impl Fn(PathBuf) -> Result<DetectionRecord, DetectionError> + Send + Sync + 'static {
    move |path: PathBuf| {
        let outcome = detect_one(&detector, path);
        progress.inc(1);
        outcome
    }
}

/// Decode one image, note its dimensions, and run detection on it
fn detect_one<M: LayoutModel>(detector: &Detector<M>, path: PathBuf) -> Result<DetectionRecord, DetectionError> {
    let image = load_image(&path)?;
    let boxes = detector.detect_image(&image, Some(&path))?;
    Ok(DetectionRecord {
        image_height: image.height(),
        image_width: image.width(),
        image_path: path,
        boxes,
    })
}
