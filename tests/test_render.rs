mod common;

use common::*;
use image::Rgb;
use tempfile::TempDir;
use textzones::render::{draw_boxes, render_file_name, render_result_set, DEFAULT_COLOR, LINE_THICKNESS};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[test]
fn test_draw_boxes_outlines_only() {
    let image = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(100, 100, WHITE));
    let boxes = vec![BBox::fractional(Rect::new(0.1, 0.1, 0.8, 0.8))];

    let canvas = draw_boxes(&image, &boxes, DEFAULT_COLOR);

    assert_eq!(*canvas.get_pixel(10, 10), DEFAULT_COLOR);
    assert_eq!(*canvas.get_pixel(80, 50), DEFAULT_COLOR);
    assert_eq!(*canvas.get_pixel(10 + LINE_THICKNESS - 1, 50), DEFAULT_COLOR);
    // Interior and exterior untouched
    assert_eq!(*canvas.get_pixel(45, 45), WHITE);
    assert_eq!(*canvas.get_pixel(90, 90), WHITE);
    assert_eq!(*canvas.get_pixel(10 + LINE_THICKNESS, 50), WHITE);
}

#[test]
fn test_render_file_name_flattens_path() {
    let record = DetectionRecord {
        image_path: "/corpus/2001/march/page-3.jpg".into(),
        image_height: 10,
        image_width: 10,
        boxes: vec![],
    };
    assert_eq!(render_file_name(&record, std::path::Path::new("/corpus")), "2001-march-page-3.jpg");
}

#[test]
fn test_render_result_set() {
    let corpus = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let page = create_page_image(corpus.path(), "scans/page.png", 60, 40);

    let results = ResultSet::from_records(vec![
        DetectionRecord {
            image_path: page,
            image_height: 40,
            image_width: 60,
            boxes: vec![BBox::fractional(Rect::new(0.1, 0.1, 0.9, 0.9))],
        },
        DetectionRecord {
            image_path: corpus.path().join("vanished.png"),
            image_height: 40,
            image_width: 60,
            boxes: vec![],
        },
    ]);

    let written = render_result_set(&results, corpus.path(), out.path(), Some(2)).unwrap();
    assert_eq!(written, 1);

    let rendered = image::open(out.path().join("scans-page.png")).unwrap().to_rgb8();
    assert_eq!(*rendered.get_pixel(6, 4), DEFAULT_COLOR);
}

#[test]
fn test_detector_draw_uses_native_regions() {
    let image = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(100, 100, WHITE));
    let detector = Detector::new(StubModel::new(default_regions()));

    let regions = detector.regions(&image, None).unwrap();
    let canvas = detector.draw(&image, &regions);

    // Text line at (10, 10)-(90, 20); the figure is filtered out
    assert_eq!(*canvas.get_pixel(10, 10), DEFAULT_COLOR);
    assert_eq!(*canvas.get_pixel(50, 50), WHITE);
    assert_eq!(*canvas.get_pixel(10, 50), WHITE);
}
