use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{contours, preprocessing, LayoutModel, LayoutRegion};
use crate::geometry::Rect;

/// Tuning for [`ContourLayoutModel`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    pub blur_sigma: f32,
    /// Dilation radius in pixels used to fuse glyphs into blocks
    pub merge_radius: u8,
    pub min_width: u32,
    pub min_height: u32,
    /// Blocks denser than this are labelled as images rather than text
    pub image_density: f32,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            merge_radius: 6,
            min_width: 20,
            min_height: 8,
            image_density: 0.55,
        }
    }
}

/// Classical layout detector: binarise, fuse glyphs, label connected blocks.
///
/// Text blocks come out as `TextRegion`, near-solid blocks as `ImageRegion`.
/// The score peaks for blocks whose ink density is typical of printed text.
pub struct ContourLayoutModel {
    params: ContourParams,
}

impl ContourLayoutModel {
    pub fn new(params: ContourParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ContourParams {
        &self.params
    }
}

impl Default for ContourLayoutModel {
    fn default() -> Self {
        Self::new(ContourParams::default())
    }
}

const TYPICAL_TEXT_DENSITY: f32 = 0.25;

fn text_score(density: f32) -> f32 {
    (1.0 - (density - TYPICAL_TEXT_DENSITY).abs() / (1.0 - TYPICAL_TEXT_DENSITY)).clamp(0.0, 1.0)
}

impl LayoutModel for ContourLayoutModel {
    fn infer(&self, image: &DynamicImage, _source: Option<&Path>) -> anyhow::Result<Vec<LayoutRegion>> {
        if image.width() == 0 || image.height() == 0 {
            anyhow::bail!("empty image");
        }

        let gray = preprocessing::to_grayscale(image);
        let blurred = preprocessing::apply_blur(&gray, self.params.blur_sigma);
        let ink = preprocessing::binarize_ink(&blurred);
        let merged = preprocessing::merge_glyphs(&ink, self.params.merge_radius);

        let blocks = contours::find_blocks(&merged, self.params.min_width, self.params.min_height);
        tracing::debug!(blocks = blocks.len(), "contour layout pass");

        let regions = blocks
            .into_iter()
            .map(|b| {
                let density = b.ink_density(&ink);
                let (label, score) = if density > self.params.image_density {
                    ("ImageRegion", density)
                } else {
                    ("TextRegion", text_score(density))
                };
                LayoutRegion {
                    rect: Rect::new(b.min_x as f64, b.min_y as f64, b.max_x as f64, b.max_y as f64),
                    label: Some(label.to_string()),
                    score,
                }
            })
            .collect();

        Ok(regions)
    }

    fn name(&self) -> &str {
        "contour"
    }
}
