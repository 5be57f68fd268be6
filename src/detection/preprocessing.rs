use image::{DynamicImage, GrayImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce scan noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Otsu binarisation with ink as foreground (255) and paper as background (0)
pub fn binarize_ink(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    threshold(img, level, ThresholdType::BinaryInverted)
}

/// Grow ink by `radius` pixels so neighbouring glyphs and lines fuse into blocks
pub fn merge_glyphs(ink: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return ink.clone();
    }
    dilate(ink, Norm::LInf, radius)
}
