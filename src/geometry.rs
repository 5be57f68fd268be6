use serde::{Deserialize, Serialize};

/// Inclusive-boundary offset used for pixel-space area and intersection.
pub const PIXEL_OFFSET: f64 = 1.0;

/// Coordinate space a box is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordSpace {
    /// Proportions of image width/height in `[0, 1]`
    Fractional,
    /// Integer pixel positions
    Pixel,
}

impl CoordSpace {
    /// Guess the space of an untagged box: fractional iff `right < 1 && bottom < 1`.
    ///
    /// Tiny pixel boxes at the image origin are misread as fractional, so only
    /// use this for legacy data that carries no tag.
    pub fn infer(right: f64, bottom: f64) -> Self {
        if right < 1.0 && bottom < 1.0 {
            CoordSpace::Fractional
        } else {
            CoordSpace::Pixel
        }
    }
}

/// Axis-aligned rectangle `(left, top, right, bottom)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Scale fractional coordinates to pixels, rounding to the nearest integer.
    pub fn scale_to_pixel(&self, image_height: u32, image_width: u32) -> Rect {
        let w = image_width as f64;
        let h = image_height as f64;
        Rect {
            left: (self.left * w).round(),
            top: (self.top * h).round(),
            right: (self.right * w).round(),
            bottom: (self.bottom * h).round(),
        }
    }

    /// Divide pixel coordinates by the image dimensions.
    pub fn scale_to_fractional(&self, image_height: u32, image_width: u32) -> Rect {
        let w = image_width.max(1) as f64;
        let h = image_height.max(1) as f64;
        Rect {
            left: self.left / w,
            top: self.top / h,
            right: self.right / w,
            bottom: self.bottom / h,
        }
    }

    /// `(right - left + offset) * (bottom - top + offset)`, each side clamped at zero
    pub fn area(&self, offset: f64) -> f64 {
        let w = (self.right - self.left + offset).max(0.0);
        let h = (self.bottom - self.top + offset).max(0.0);
        w * h
    }

    /// Overlap area with `other`; zero when the rectangles do not overlap on either axis.
    pub fn intersection_area(&self, other: &Rect, offset: f64) -> f64 {
        let w = (self.right.min(other.right) + offset - self.left.max(other.left)).max(0.0);
        let h = (self.bottom.min(other.bottom) + offset - self.top.max(other.top)).max(0.0);
        w * h
    }

    /// Smallest rectangle covering every input, `None` for an empty input.
    pub fn enclosing<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects.into_iter().fold(None, |acc, r| {
            Some(match acc {
                None => *r,
                Some(m) => Rect {
                    left: m.left.min(r.left),
                    top: m.top.min(r.top),
                    right: m.right.max(r.right),
                    bottom: m.bottom.max(r.bottom),
                },
            })
        })
    }
}

/// Intersection of every predicted rectangle with a single reference rectangle.
pub fn intersections(preds: &[Rect], reference: &Rect, offset: f64) -> Vec<f64> {
    preds
        .iter()
        .map(|p| p.intersection_area(reference, offset))
        .collect()
}

/// In-bounds pixel region, suitable for `crop_imm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A detected or drawable box tagged with its coordinate space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub rect: Rect,
    pub space: CoordSpace,
    pub label: Option<String>,
    pub score: Option<f32>,
}

impl BBox {
    pub fn fractional(rect: Rect) -> Self {
        Self { rect, space: CoordSpace::Fractional, label: None, score: None }
    }

    pub fn pixel(rect: Rect) -> Self {
        Self { rect, space: CoordSpace::Pixel, label: None, score: None }
    }

    /// Build a box from legacy untagged coordinates (see [`CoordSpace::infer`]).
    pub fn untagged(rect: Rect) -> Self {
        let space = CoordSpace::infer(rect.right, rect.bottom);
        Self { rect, space, label: None, score: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Convert to pixel space; no-op if already pixel-valued.
    pub fn to_pixel(&self, image_height: u32, image_width: u32) -> BBox {
        match self.space {
            CoordSpace::Pixel => self.clone(),
            CoordSpace::Fractional => BBox {
                rect: self.rect.scale_to_pixel(image_height, image_width),
                space: CoordSpace::Pixel,
                label: self.label.clone(),
                score: self.score,
            },
        }
    }

    /// Convert to fractional space; no-op if already fractional.
    pub fn to_fractional(&self, image_height: u32, image_width: u32) -> BBox {
        match self.space {
            CoordSpace::Fractional => self.clone(),
            CoordSpace::Pixel => BBox {
                rect: self.rect.scale_to_fractional(image_height, image_width),
                space: CoordSpace::Fractional,
                label: self.label.clone(),
                score: self.score,
            },
        }
    }

    /// Pixel-space rectangle of this box.
    pub fn pixel_rect(&self, image_height: u32, image_width: u32) -> Rect {
        self.to_pixel(image_height, image_width).rect
    }

    /// Width as a fraction of the image width.
    pub fn fractional_width(&self, image_height: u32, image_width: u32) -> f64 {
        self.to_fractional(image_height, image_width).rect.width()
    }

    /// Crop region for this box, widened horizontally by `pad_x` (a fraction of
    /// the image width) and clamped to the image. `None` if nothing remains.
    pub fn crop_region(&self, image_height: u32, image_width: u32, pad_x: f64) -> Option<PixelRegion> {
        let f = self.to_fractional(image_height, image_width).rect;
        let padded = Rect {
            left: (f.left - pad_x).max(0.0),
            top: f.top.max(0.0),
            right: (f.right + pad_x).min(1.0),
            bottom: f.bottom.min(1.0),
        };
        let px = padded.scale_to_pixel(image_height, image_width);

        let x = (px.left.max(0.0) as u32).min(image_width);
        let y = (px.top.max(0.0) as u32).min(image_height);
        let right = (px.right.max(0.0) as u32).min(image_width);
        let bottom = (px.bottom.max(0.0) as u32).min(image_height);

        if right <= x || bottom <= y {
            return None;
        }

        Some(PixelRegion { x, y, width: right - x, height: bottom - y })
    }
}
