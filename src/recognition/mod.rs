//! Boundary to downstream text recognition and translation.
//!
//! Detected regions are cropped out of their page, handed to a
//! [`TextRecognizer`], optionally passed through a [`Translator`], and written
//! to one text file per page.

pub mod ocr;

use anyhow::Context;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::{DetectionRecord, ResultSet};

pub use ocr::OcrsRecognizer;

/// Turns a cropped region into text
pub trait TextRecognizer {
    fn recognize_text(&self, image: &DynamicImage) -> anyhow::Result<String>;
}

/// Translates recognized text
pub trait Translator {
    fn translate(&self, text: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscribeConfig {
    /// Regions narrower than this fraction of the page width are skipped
    pub min_width: f64,
    /// Horizontal padding added on both sides of a crop, as a fraction of the page width
    pub pad_x: f64,
    /// Directory holding the ocrs model files; defaults to `$HOME/.cache/ocrs`
    pub model_dir: Option<PathBuf>,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            min_width: 0.5,
            pad_x: 0.02,
            model_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscribeStats {
    pub pages: usize,
    pub detected: usize,
    pub kept: usize,
    pub recognized: usize,
}

/// Recognize the regions of one page, top to bottom. Failed regions are logged and skipped.
pub fn transcribe_record(
    record: &DetectionRecord,
    image: &DynamicImage,
    recognizer: &dyn TextRecognizer,
    translator: Option<&dyn Translator>,
    config: &TranscribeConfig,
    stats: &mut TranscribeStats,
) -> Vec<String> {
    let (h, w) = (record.image_height, record.image_width);

    let mut boxes: Vec<_> = record.boxes.iter().collect();
    boxes.sort_by(|a, b| {
        let ta = a.to_fractional(h, w).rect.top;
        let tb = b.to_fractional(h, w).rect.top;
        ta.total_cmp(&tb)
    });
    stats.detected += boxes.len();

    let mut lines = Vec::new();
    for (i, b) in boxes.into_iter().enumerate() {
        if b.fractional_width(h, w) < config.min_width {
            continue;
        }
        let Some(region) = b.crop_region(h, w, config.pad_x) else {
            continue;
        };
        stats.kept += 1;
        let crop = image.crop_imm(region.x, region.y, region.width, region.height);

        let text = recognizer.recognize_text(&crop).and_then(|text| match translator {
            Some(t) => t.translate(&text),
            None => Ok(text),
        });

        match text {
            Ok(text) => {
                stats.recognized += 1;
                lines.push(text);
            }
            Err(e) => {
                tracing::warn!(image = %record.image_path.display(), region = i, "recognition failed: {:#}", e);
            }
        }
    }
    lines
}

/// Output text path for a page: `<out_dir>/<image stem>.txt`
pub fn text_output_path(record: &DetectionRecord, out_dir: &Path) -> PathBuf {
    let stem = record
        .image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    out_dir.join(format!("{}.txt", stem))
}

/// Transcribe every page of `results` into `out_dir`.
///
/// Pages whose image cannot be opened are logged and skipped.
pub fn transcribe_result_set(
    results: &ResultSet,
    recognizer: &dyn TextRecognizer,
    translator: Option<&dyn Translator>,
    config: &TranscribeConfig,
    out_dir: &Path,
) -> anyhow::Result<TranscribeStats> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {:?}", out_dir))?;

    let mut stats = TranscribeStats::default();
    for record in results {
        let image = match image::open(&record.image_path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(image = %record.image_path.display(), "cannot open page: {}", e);
                continue;
            }
        };

        let lines = transcribe_record(record, &image, recognizer, translator, config, &mut stats);

        let out_path = text_output_path(record, out_dir);
        let file = File::create(&out_path).with_context(|| format!("Failed to create {:?}", out_path))?;
        let mut writer = BufWriter::new(file);
        for line in &lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        stats.pages += 1;
    }

    tracing::info!("{} regions detected, {} kept, {} recognized", stats.detected, stats.kept, stats.recognized);
    Ok(stats)
}
