use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;

/// Bounding box of one connected ink block, inclusive bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InkBlock {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl InkBlock {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn bbox_area(&self) -> u32 {
        self.width() * self.height()
    }

    /// Fraction of `ink` pixels that are set inside this block's bounding box
    pub fn ink_density(&self, ink: &GrayImage) -> f32 {
        let mut set = 0u64;
        for y in self.min_y..=self.max_y.min(ink.height().saturating_sub(1)) {
            for x in self.min_x..=self.max_x.min(ink.width().saturating_sub(1)) {
                if ink.get_pixel(x, y)[0] > 0 {
                    set += 1;
                }
            }
        }
        set as f32 / self.bbox_area().max(1) as f32
    }
}

/// Find connected blocks of foreground pixels, sorted top-to-bottom then left-to-right
pub fn find_blocks(binary: &GrayImage, min_width: u32, min_height: u32) -> Vec<InkBlock> {
    // Label connected components (white pixels = ink)
    let labeled = connected_components(binary, Connectivity::Eight, Luma([0]));

    let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue; // Skip background
        }

        regions.entry(label_val)
            .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
                *count += 1;
            })
            .or_insert((x, y, x, y, 1));
    }

    let mut blocks: Vec<InkBlock> = regions.into_values()
        .map(|(min_x, min_y, max_x, max_y, pixel_count)| InkBlock {
            min_x,
            min_y,
            max_x,
            max_y,
            pixel_count,
        })
        .filter(|b| b.width() >= min_width && b.height() >= min_height)
        .collect();

    // HashMap iteration order is random
    blocks.sort_by_key(|b| (b.min_y, b.min_x));
    blocks
}
