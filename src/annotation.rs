//! Pascal-VOC style ground-truth annotations.
//!
//! ```xml
//! <annotation>
//!   <filename>page-0.jpg</filename>
//!   <object>
//!     <name>text</name>
//!     <bndbox><xmin>10</xmin><ymin>20</ymin><xmax>300</xmax><ymax>80</ymax></bndbox>
//!   </object>
//! </annotation>
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geometry::Rect;
use crate::models::{GroundTruthBox, GroundTruthEntry};

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("failed to read annotation {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed annotation {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: quick_xml::de::DeError,
    },
    #[error("malformed annotation {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Deserialize)]
struct VocAnnotation {
    filename: String,
    #[serde(rename = "object", default)]
    objects: Vec<VocObject>,
}

#[derive(Debug, Deserialize)]
struct VocObject {
    name: String,
    bndbox: VocBndBox,
}

#[derive(Debug, Deserialize)]
struct VocBndBox {
    xmin: i64,
    ymin: i64,
    xmax: i64,
    ymax: i64,
}

/// Parse annotation XML; `origin` names the source in errors.
pub fn parse_annotation(xml: &str, origin: &Path) -> Result<GroundTruthEntry, AnnotationError> {
    let voc: VocAnnotation = quick_xml::de::from_str(xml).map_err(|source| AnnotationError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;

    let image_file_name = Path::new(voc.filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| AnnotationError::Invalid {
            path: origin.to_path_buf(),
            reason: format!("filename {:?} has no base name", voc.filename),
        })?;

    let boxes = voc
        .objects
        .into_iter()
        .map(|obj| {
            let b = obj.bndbox;
            if b.xmax < b.xmin || b.ymax < b.ymin {
                return Err(AnnotationError::Invalid {
                    path: origin.to_path_buf(),
                    reason: format!(
                        "inverted box for {:?}: ({}, {}, {}, {})",
                        obj.name, b.xmin, b.ymin, b.xmax, b.ymax
                    ),
                });
            }
            Ok(GroundTruthBox {
                label: obj.name,
                rect: Rect::new(b.xmin as f64, b.ymin as f64, b.xmax as f64, b.ymax as f64),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GroundTruthEntry { image_file_name, boxes })
}

/// Load one annotation file.
pub fn load_annotation(path: &Path) -> Result<GroundTruthEntry, AnnotationError> {
    let xml = std::fs::read_to_string(path).map_err(|source| AnnotationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_annotation(&xml, path)
}

/// Load every `*.xml` file directly inside `dir`, sorted by path.
///
/// Fails on the first malformed file.
pub fn load_annotation_dir(dir: &Path) -> Result<Vec<GroundTruthEntry>, AnnotationError> {
    let io = |source| AnnotationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        let is_xml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
        if is_xml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let entries = paths
        .iter()
        .map(|p| load_annotation(p))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(dir = %dir.display(), files = entries.len(), "loaded annotations");
    Ok(entries)
}
