//! Persisted result sets.
//!
//! A snapshot is a zstd-compressed bincode blob holding a small metadata header
//! followed by the [`ResultSet`]. The header records which model, corpus root
//! and slice produced the results so a rerun can tell whether it may reuse them.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

use crate::batch::Slice;
use crate::models::ResultSet;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub model: String,
    pub root: PathBuf,
    pub slice: Slice,
    /// Crate version that wrote the snapshot (informational)
    pub version: String,
}

impl SnapshotMeta {
    pub fn new(model: impl Into<String>, root: &Path, slice: Slice) -> Self {
        Self {
            model: model.into(),
            root: root.to_path_buf(),
            slice,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Same model, root and selected range; the version is ignored
    pub fn matches(&self, other: &SnapshotMeta) -> bool {
        self.model == other.model && self.root == other.root && self.slice.bounds() == other.slice.bounds()
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    meta: SnapshotMeta,
    results: ResultSet,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {} is not a valid result set: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("snapshot {} was produced by model {found_model} over {found_root} [{found_slice}], expected {expected_model} over {expected_root} [{expected_slice}]", .path.display())]
    Mismatch {
        path: PathBuf,
        found_model: String,
        found_root: String,
        found_slice: Slice,
        expected_model: String,
        expected_root: String,
        expected_slice: Slice,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io { path: path.to_path_buf(), source }
}

/// Write a snapshot, replacing any existing file at `path` only once the new one is complete.
pub fn save(path: &Path, meta: &SnapshotMeta, results: &ResultSet) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let tmp = path.with_extension("partial");
    let file = File::create(&tmp).map_err(io_err(&tmp))?;
    let mut encoder = ZstdEncoder::new(BufWriter::new(file), ZSTD_LEVEL).map_err(io_err(&tmp))?;

    let snapshot = SnapshotFile {
        meta: meta.clone(),
        results: results.clone(),
    };
    bincode::serialize_into(&mut encoder, &snapshot).map_err(|source| SnapshotError::Codec {
        path: tmp.clone(),
        source,
    })?;

    let writer = encoder.finish().map_err(io_err(&tmp))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|f| f.sync_all())
        .map_err(io_err(&tmp))?;

    fs::rename(&tmp, path).map_err(io_err(path))
}

/// Read a snapshot back.
pub fn load(path: &Path) -> Result<(SnapshotMeta, ResultSet), SnapshotError> {
    let file = File::open(path).map_err(io_err(path))?;
    let decoder = ZstdDecoder::new(BufReader::new(file)).map_err(io_err(path))?;
    let snapshot: SnapshotFile = bincode::deserialize_from(decoder).map_err(|source| SnapshotError::Codec {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((snapshot.meta, snapshot.results))
}

/// Load the snapshot at `path` if it exists.
///
/// Returns `Ok(None)` when there is no file, and an error when the file was
/// produced by a different model, root or slice.
pub fn load_matching(path: &Path, expected: &SnapshotMeta) -> Result<Option<ResultSet>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let (meta, results) = load(path)?;
    if !meta.matches(expected) {
        return Err(SnapshotError::Mismatch {
            path: path.to_path_buf(),
            found_model: meta.model,
            found_root: meta.root.display().to_string(),
            found_slice: meta.slice,
            expected_model: expected.model.clone(),
            expected_root: expected.root.display().to_string(),
            expected_slice: expected.slice,
        });
    }
    Ok(Some(results))
}

/// Conventional snapshot file name for a model and slice, e.g. `contour_0_100.bin.zst`
pub fn default_file_name(model: &str, slice: Slice) -> String {
    format!("{}_{}.bin.zst", model, slice)
}
