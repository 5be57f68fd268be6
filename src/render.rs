use anyhow::Context;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;
use std::path::{Path, PathBuf};

use crate::batch::{PoolKind, TaskPanic, WorkerPool};
use crate::geometry::BBox;
use crate::models::{DetectionRecord, ResultSet};

pub const DEFAULT_COLOR: Rgb<u8> = Rgb([128, 128, 128]);
pub const LINE_THICKNESS: u32 = 5;

/// Draw every box onto a copy of `image` as a hollow rectangle.
pub fn draw_boxes(image: &DynamicImage, boxes: &[BBox], color: Rgb<u8>) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (w, h) = canvas.dimensions();

    for b in boxes {
        let r = b.pixel_rect(h, w);
        let left = r.left.max(0.0) as i32;
        let top = r.top.max(0.0) as i32;
        let right = r.right.max(0.0) as i32;
        let bottom = r.bottom.max(0.0) as i32;

        // Thick outline by drawing nested rectangles inward
        for inset in 0..LINE_THICKNESS as i32 {
            let width = right - left + 1 - 2 * inset;
            let height = bottom - top + 1 - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = DrawRect::at(left + inset, top + inset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }

    canvas
}

/// Output file name for a record: its path relative to `root` with separators replaced by `-`
pub fn render_file_name(record: &DetectionRecord, root: &Path) -> String {
    record
        .relative_path(root)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| c != "/")
        .collect::<Vec<_>>()
        .join("-")
}

fn render_one(record: &DetectionRecord, root: &Path, out_dir: &Path) -> anyhow::Result<PathBuf> {
    let image = image::open(&record.image_path)
        .with_context(|| format!("Failed to open {:?}", record.image_path))?;
    let canvas = draw_boxes(&image, &record.boxes, DEFAULT_COLOR);
    let out_path = out_dir.join(render_file_name(record, root));
    canvas
        .save(&out_path)
        .with_context(|| format!("Failed to save {:?}", out_path))?;
    Ok(out_path)
}

/// Draw each record's boxes onto its image and write the result under `out_dir`.
///
/// Image I/O dominates, so records are fanned out over concurrent tasks.
/// Returns the number of images written; failures are logged and skipped.
pub fn render_result_set(results: &ResultSet, root: &Path, out_dir: &Path, workers: Option<usize>) -> anyhow::Result<usize> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {:?}", out_dir))?;

    let root = root.to_path_buf();
    let out_dir = out_dir.to_path_buf();
    let pool = WorkerPool::new(PoolKind::Concurrent, workers);

    let outcomes = pool.map(results.records().to_vec(), move |record| {
        render_one(&record, &root, &out_dir).map_err(|e| (record.image_path.clone(), e))
    })?;

    let mut written = 0;
    for outcome in outcomes {
        match outcome {
            Ok(Ok(path)) => {
                tracing::debug!(output = %path.display(), "rendered");
                written += 1;
            }
            Ok(Err((path, e))) => tracing::warn!(image = %path.display(), "render failed: {:#}", e),
            Err(TaskPanic(msg)) => tracing::warn!("render task panicked: {}", msg),
        }
    }
    Ok(written)
}
