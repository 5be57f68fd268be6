pub mod preprocessing;
pub mod contours;
pub mod contour_model;
pub mod labels;
pub mod sidecar;

use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geometry::{BBox, Rect};

pub use contour_model::{ContourLayoutModel, ContourParams};
pub use labels::LayoutDataset;
pub use sidecar::SidecarLayoutModel;

/// Label substrings that mark a region as text-bearing
const TEXT_KEYWORDS: [&str; 3] = ["text", "title", "headline"];

/// A region as emitted by a layout model, in pixel coordinates of the input image
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRegion {
    pub rect: Rect,
    pub label: Option<String>,
    pub score: f32,
}

/// A concrete layout model backend.
///
/// Implementations are initialised once and must be safe to call from many
/// worker threads at the same time.
pub trait LayoutModel: Send + Sync {
    /// Run raw inference on a decoded image.
    ///
    /// `source` is the image's path when the caller knows it.
    fn infer(&self, image: &DynamicImage, source: Option<&Path>) -> anyhow::Result<Vec<LayoutRegion>>;

    /// Human-readable name for this model (used in logs and snapshot metadata)
    fn name(&self) -> &str;
}

impl<T: LayoutModel + ?Sized> LayoutModel for Box<T> {
    fn infer(&self, image: &DynamicImage, source: Option<&Path>) -> anyhow::Result<Vec<LayoutRegion>> {
        (**self).infer(image, source)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("failed to decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("inference failed for {image}: {reason}")]
    Inference { image: String, reason: String },
}

/// Image handed to [`Detector::detect`]: a file to decode, or an already decoded image
#[derive(Clone, Copy)]
pub enum ImageInput<'a> {
    Path(&'a Path),
    Image(&'a DynamicImage),
}

impl<'a> From<&'a Path> for ImageInput<'a> {
    fn from(path: &'a Path) -> Self {
        ImageInput::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for ImageInput<'a> {
    fn from(path: &'a PathBuf) -> Self {
        ImageInput::Path(path.as_path())
    }
}

impl<'a> From<&'a DynamicImage> for ImageInput<'a> {
    fn from(image: &'a DynamicImage) -> Self {
        ImageInput::Image(image)
    }
}

/// Decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, DetectionError> {
    image::open(path).map_err(|source| DetectionError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether a class label denotes a text-bearing region.
///
/// A missing label counts as text so that unlabelled detections are kept.
pub fn is_text_label(label: Option<&str>) -> bool {
    match label {
        Some(label) => {
            let s = label.to_lowercase();
            TEXT_KEYWORDS.iter().any(|k| s.contains(k))
        }
        None => true,
    }
}

/// Convert native regions into fractional boxes sorted by descending score.
pub fn dump(regions: &[LayoutRegion], image_height: u32, image_width: u32) -> Vec<BBox> {
    let mut boxes: Vec<BBox> = regions
        .iter()
        .map(|r| {
            let mut b = BBox::pixel(r.rect)
                .to_fractional(image_height, image_width)
                .with_score(r.score);
            b.label = r.label.clone();
            b
        })
        .collect();

    boxes.sort_by(|a, b| {
        let sa = a.score.unwrap_or(0.0);
        let sb = b.score.unwrap_or(0.0);
        sb.total_cmp(&sa)
    });
    boxes
}

/// Detection options applied on top of raw inference
#[derive(Debug, Clone, Copy)]
pub struct DetectOptions {
    /// Keep only text-like regions
    pub keep_text_only: bool,
    /// Drop regions scoring below this
    pub min_score: f32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            keep_text_only: true,
            min_score: 0.0,
        }
    }
}

/// Wraps a [`LayoutModel`] with input decoding, filtering and fault isolation
pub struct Detector<M> {
    model: M,
    options: DetectOptions,
}

impl<M: LayoutModel> Detector<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            options: DetectOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DetectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_keep_text_only(mut self, keep_text_only: bool) -> Self {
        self.options.keep_text_only = keep_text_only;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.options.min_score = min_score;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn options(&self) -> DetectOptions {
        self.options
    }

    /// Raw model regions after score and text filtering, in pixel coordinates.
    pub fn regions(&self, image: &DynamicImage, source: Option<&Path>) -> Result<Vec<LayoutRegion>, DetectionError> {
        let regions = self.model.infer(image, source).map_err(|e| DetectionError::Inference {
            image: describe(source),
            reason: format!("{:#}", e),
        })?;

        Ok(regions
            .into_iter()
            .filter(|r| r.score >= self.options.min_score)
            .filter(|r| !self.options.keep_text_only || is_text_label(r.label.as_deref()))
            .collect())
    }

    /// Detect on a decoded image and dump to fractional boxes.
    pub fn detect_image(&self, image: &DynamicImage, source: Option<&Path>) -> Result<Vec<BBox>, DetectionError> {
        let regions = self.regions(image, source)?;
        Ok(dump(&regions, image.height(), image.width()))
    }

    /// Detect, surfacing decode and inference failures to the caller.
    pub fn try_detect<'a>(&self, input: impl Into<ImageInput<'a>>) -> Result<Vec<BBox>, DetectionError> {
        match input.into() {
            ImageInput::Path(path) => {
                let image = load_image(path)?;
                self.detect_image(&image, Some(path))
            }
            ImageInput::Image(image) => self.detect_image(image, None),
        }
    }

    /// Detect with failures contained: an error is logged with the image
    /// identifier and yields `None`.
    pub fn detect<'a>(&self, input: impl Into<ImageInput<'a>>) -> Option<Vec<BBox>> {
        let input = input.into();
        match self.try_detect(input) {
            Ok(boxes) => Some(boxes),
            Err(e) => {
                let id = match input {
                    ImageInput::Path(p) => p.display().to_string(),
                    ImageInput::Image(_) => describe(None),
                };
                tracing::warn!(image = %id, model = self.model.name(), "detection failed: {}", e);
                None
            }
        }
    }

    /// Render the filtered detections of `image` onto a copy of it.
    pub fn draw(&self, image: &DynamicImage, regions: &[LayoutRegion]) -> RgbImage {
        let boxes: Vec<BBox> = regions.iter().map(|r| BBox::pixel(r.rect)).collect();
        crate::render::draw_boxes(image, &boxes, crate::render::DEFAULT_COLOR)
    }
}

fn describe(source: Option<&Path>) -> String {
    source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<in-memory image>".to_string())
}
