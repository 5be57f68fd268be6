use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Half-open `[start, end)` chunk of the sorted corpus.
///
/// Only applied when `start >= 0` and `end > start`; anything else selects the
/// whole corpus. `-1..-1` is the conventional "everything" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub start: i64,
    pub end: i64,
}

impl Slice {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self { start: -1, end: -1 }
    }

    /// Index bounds, or `None` when the slice selects everything
    pub fn bounds(&self) -> Option<(usize, usize)> {
        if self.start >= 0 && self.end > self.start {
            Some((self.start as usize, self.end as usize))
        } else {
            None
        }
    }

    /// Restrict `items` to this slice, clamped to their length
    pub fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        match self.bounds() {
            Some((start, end)) => {
                let end = end.min(items.len());
                let start = start.min(end);
                items.truncate(end);
                items.drain(..start);
                items
            }
            None => items,
        }
    }
}

impl Default for Slice {
    fn default() -> Self {
        Self::all()
    }
}

impl std::fmt::Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.start, self.end)
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Recursively collect image files under `root` whose extension is in
/// `extensions` (case-insensitive), sorted lexicographically by full path string.
///
/// Symlinked files are included; symlinked directories are not followed.
pub fn enumerate_images(root: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            // Linked files count, linked directories are not descended into
            let is_file = if file_type.is_symlink() {
                std::fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false)
            } else {
                file_type.is_file()
            };
            if is_file && has_extension(&path, extensions) {
                found.push(path);
            }
        }
    }

    found.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(found)
}
