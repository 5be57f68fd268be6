use anyhow::Context;
use image::DynamicImage;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{LayoutDataset, LayoutModel, LayoutRegion};
use crate::geometry::Rect;

pub const DEFAULT_SIDECAR_EXTENSION: &str = "layout.json";

/// One region as written by the external model, pixel coordinates
#[derive(Debug, Deserialize)]
struct SidecarRegion {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    class_id: Option<u32>,
    #[serde(default = "default_score")]
    score: f32,
}

fn default_score() -> f32 {
    1.0
}

/// Adapter for a layout model run out of process.
///
/// The external model writes its detections for `page.jpg` to
/// `page.layout.json` as a JSON array of `{x1, y1, x2, y2, label?, class_id?, score?}`.
/// Class ids are resolved through the dataset's preset label map.
pub struct SidecarLayoutModel {
    extension: String,
    dataset: Option<LayoutDataset>,
    name: String,
}

impl SidecarLayoutModel {
    pub fn new(dataset: Option<LayoutDataset>) -> Self {
        let name = match dataset {
            Some(d) => format!("sidecar-{:?}", d).to_lowercase(),
            None => "sidecar".to_string(),
        };
        Self {
            extension: DEFAULT_SIDECAR_EXTENSION.to_string(),
            dataset,
            name,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn sidecar_path(&self, image_path: &Path) -> PathBuf {
        image_path.with_extension(&self.extension)
    }

    fn resolve_label(&self, region: &SidecarRegion) -> Option<String> {
        if let Some(label) = &region.label {
            return Some(label.clone());
        }
        let id = region.class_id?;
        self.dataset.and_then(|d| d.label(id)).map(str::to_string)
    }
}

impl LayoutModel for SidecarLayoutModel {
    fn infer(&self, _image: &DynamicImage, source: Option<&Path>) -> anyhow::Result<Vec<LayoutRegion>> {
        let source = source.context("sidecar model needs the image path")?;
        let path = self.sidecar_path(source);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read sidecar {:?}", path))?;
        let raw: Vec<SidecarRegion> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid sidecar JSON in {:?}", path))?;

        raw.iter()
            .map(|r| {
                if r.x2 < r.x1 || r.y2 < r.y1 {
                    anyhow::bail!("inverted region ({}, {}, {}, {}) in {:?}", r.x1, r.y1, r.x2, r.y2, path);
                }
                Ok(LayoutRegion {
                    rect: Rect::new(r.x1, r.y1, r.x2, r.y2),
                    label: self.resolve_label(r),
                    score: r.score,
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
