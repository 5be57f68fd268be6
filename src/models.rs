use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::geometry::{BBox, Rect};

/// Detection output for one page image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub image_path: PathBuf,
    pub image_height: u32,
    pub image_width: u32,
    /// Ordered by descending confidence
    pub boxes: Vec<BBox>,
}

impl DetectionRecord {
    /// Base file name of the image, used as the join key against ground truth
    pub fn file_name(&self) -> Option<&str> {
        self.image_path.file_name().and_then(|n| n.to_str())
    }

    /// Path relative to `root`, falling back to the full path
    pub fn relative_path(&self, root: &Path) -> PathBuf {
        self.image_path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.image_path.clone())
    }

    pub fn pixel_rects(&self) -> Vec<Rect> {
        self.boxes
            .iter()
            .map(|b| b.pixel_rect(self.image_height, self.image_width))
            .collect()
    }
}

/// One labelled object from a ground-truth annotation
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthBox {
    pub label: String,
    /// Pixel space, inclusive boundaries
    pub rect: Rect,
}

/// Hand-labelled boxes for one image
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthEntry {
    pub image_file_name: String,
    pub boxes: Vec<GroundTruthBox>,
}

/// Ordered collection of detection records produced by one batch run.
///
/// Records are kept sorted by image path with no duplicate paths, whatever
/// order the workers finished in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<DetectionRecord>", into = "Vec<DetectionRecord>")]
pub struct ResultSet {
    records: Vec<DetectionRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary records; sorts by path and keeps the first record per path.
    pub fn from_records(mut records: Vec<DetectionRecord>) -> Self {
        records.sort_by(|a, b| a.image_path.as_os_str().cmp(b.image_path.as_os_str()));
        records.dedup_by(|b, a| a.image_path == b.image_path);
        Self { records }
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DetectionRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&DetectionRecord> {
        self.records
            .binary_search_by(|r| r.image_path.as_os_str().cmp(path.as_os_str()))
            .ok()
            .map(|i| &self.records[i])
    }

    /// First record whose base file name matches
    pub fn find_by_file_name(&self, file_name: &str) -> Option<&DetectionRecord> {
        self.records.iter().find(|r| r.file_name() == Some(file_name))
    }
}

impl From<Vec<DetectionRecord>> for ResultSet {
    fn from(records: Vec<DetectionRecord>) -> Self {
        Self::from_records(records)
    }
}

impl From<ResultSet> for Vec<DetectionRecord> {
    fn from(results: ResultSet) -> Self {
        results.records
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DetectionRecord;
    type IntoIter = std::slice::Iter<'a, DetectionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
