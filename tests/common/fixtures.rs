#![allow(dead_code)]

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use textzones::detection::{LayoutModel, LayoutRegion};
use textzones::geometry::Rect;

/// Creates a white page image of the given size at `dir/rel` and returns its path.
pub fn create_page_image(dir: &Path, rel: &str, width: u32, height: u32) -> PathBuf {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([255u8, 255u8, 255u8]));
    save_image(dir, rel, &img)
}

pub fn save_image(dir: &Path, rel: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create image directory");
    }
    img.save(&path).expect("Failed to save test image");
    path
}

/// Writes bytes that no image decoder accepts under an image extension.
pub fn write_corrupt_image(dir: &Path, rel: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create image directory");
    }
    std::fs::write(&path, b"definitely not an image").expect("Failed to write corrupt image");
    path
}

/// White page with a block of dashed "text lines" and a solid "photo" square.
///
/// Returns the image with the inclusive bounds of the text block and of the photo.
pub fn synthetic_page() -> (DynamicImage, Rect, Rect) {
    let (width, height) = (400u32, 300u32);
    let text = (40u32, 40u32, 239u32, 119u32);
    let photo = (300u32, 180u32, 359u32, 239u32);

    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let in_text = x >= text.0 && x <= text.2 && y >= text.1 && y <= text.3;
        let in_photo = x >= photo.0 && x <= photo.2 && y >= photo.1 && y <= photo.3;
        let ink = (in_text && (y - text.1) % 10 < 4 && (x - text.0) % 8 < 5) || in_photo;
        if ink { Rgb([0u8, 0u8, 0u8]) } else { Rgb([255u8, 255u8, 255u8]) }
    });

    (
        DynamicImage::ImageRgb8(img),
        Rect::new(text.0 as f64, text.1 as f64, text.2 as f64, text.3 as f64),
        Rect::new(photo.0 as f64, photo.1 as f64, photo.2 as f64, photo.3 as f64),
    )
}

pub fn region(l: f64, t: f64, r: f64, b: f64, label: Option<&str>, score: f32) -> LayoutRegion {
    LayoutRegion {
        rect: Rect::new(l, t, r, b),
        label: label.map(str::to_string),
        score,
    }
}

/// Layout model returning fixed regions, counting calls and failing on chosen file names.
pub struct StubModel {
    pub regions: Vec<LayoutRegion>,
    pub calls: Arc<AtomicUsize>,
    pub fail_on: Option<String>,
}

impl StubModel {
    pub fn new(regions: Vec<LayoutRegion>) -> Self {
        Self {
            regions,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.fail_on = Some(file_name.to_string());
        self
    }

    pub fn with_counter(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = calls;
        self
    }
}

impl LayoutModel for StubModel {
    fn infer(&self, _image: &DynamicImage, source: Option<&Path>) -> anyhow::Result<Vec<LayoutRegion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = source.and_then(|p| p.file_name()).and_then(|n| n.to_str());
        if let (Some(fail), Some(name)) = (&self.fail_on, name) {
            if fail == name {
                anyhow::bail!("model exploded on {}", name);
            }
        }
        Ok(self.regions.clone())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Regions used by most batch tests: one text line, one figure
pub fn default_regions() -> Vec<LayoutRegion> {
    vec![
        region(10.0, 10.0, 90.0, 20.0, Some("Text"), 0.7),
        region(10.0, 30.0, 90.0, 70.0, Some("Figure"), 0.95),
        region(10.0, 75.0, 90.0, 90.0, Some("Title"), 0.9),
    ]
}

/// Corpus of three valid 100x100 pages in nested folders, one corrupt page,
/// and a non-image file.
pub fn create_corpus(dir: &Path) -> Vec<PathBuf> {
    let mut valid = vec![
        create_page_image(dir, "b/page-2.png", 100, 100),
        create_page_image(dir, "a/page-1.png", 100, 100),
        create_page_image(dir, "a/deeper/page-0.jpg", 100, 100),
    ];
    write_corrupt_image(dir, "a/broken.jpg");
    std::fs::write(dir.join("notes.txt"), "not a page").expect("Failed to write notes");
    valid.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    valid
}
