mod common;

use common::*;
use image::DynamicImage;
use tempfile::TempDir;
use textzones::recognition::{
    text_output_path, transcribe_record, transcribe_result_set, TextRecognizer, TranscribeConfig,
    TranscribeStats, Translator,
};

/// Reports the size of each crop it is handed
struct SizeRecognizer;

impl TextRecognizer for SizeRecognizer {
    fn recognize_text(&self, image: &DynamicImage) -> anyhow::Result<String> {
        if image.height() == 13 {
            anyhow::bail!("unreadable crop");
        }
        Ok(format!("{}x{}", image.width(), image.height()))
    }
}

struct Shouting;

impl Translator for Shouting {
    fn translate(&self, text: &str) -> anyhow::Result<String> {
        Ok(format!("{}!", text.to_uppercase()))
    }
}

fn page_record(path: std::path::PathBuf) -> DetectionRecord {
    DetectionRecord {
        image_path: path,
        image_height: 100,
        image_width: 200,
        boxes: vec![
            // Sorted by score, not by position
            BBox::fractional(Rect::new(0.1, 0.5, 0.9, 0.6)).with_score(0.9),
            BBox::fractional(Rect::new(0.1, 0.1, 0.9, 0.2)).with_score(0.8),
            // Too narrow to transcribe
            BBox::fractional(Rect::new(0.1, 0.3, 0.2, 0.4)).with_score(0.7),
            // Recognizer fails on this 13 px tall crop
            BBox::fractional(Rect::new(0.0, 0.7, 1.0, 0.83)).with_score(0.6),
        ],
    }
}

#[test]
fn test_transcribe_record_reads_top_to_bottom() {
    let image = DynamicImage::new_rgb8(200, 100);
    let record = page_record("/corpus/page.png".into());
    let config = TranscribeConfig {
        pad_x: 0.0,
        ..TranscribeConfig::default()
    };
    let mut stats = TranscribeStats::default();

    let lines = transcribe_record(&record, &image, &SizeRecognizer, None, &config, &mut stats);

    assert_eq!(lines, vec!["160x10".to_string(), "160x10".to_string()]);
    assert_eq!(stats.detected, 4);
    assert_eq!(stats.kept, 3);
    assert_eq!(stats.recognized, 2);
}

#[test]
fn test_transcribe_applies_padding_and_translation() {
    let image = DynamicImage::new_rgb8(200, 100);
    let record = DetectionRecord {
        boxes: vec![BBox::fractional(Rect::new(0.1, 0.1, 0.9, 0.2))],
        ..page_record("/corpus/page.png".into())
    };
    let mut stats = TranscribeStats::default();

    let lines = transcribe_record(&record, &image, &SizeRecognizer, Some(&Shouting as &dyn Translator), &TranscribeConfig::default(), &mut stats);

    // 0.02 of 200 px on each side
    assert_eq!(lines, vec!["168X10!".to_string()]);
}

#[test]
fn test_transcribe_result_set_writes_text_files() {
    let corpus = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let page = create_page_image(corpus.path(), "page-7.png", 200, 100);

    let results = ResultSet::from_records(vec![
        page_record(page),
        page_record(corpus.path().join("missing.png")),
    ]);
    let config = TranscribeConfig {
        pad_x: 0.0,
        ..TranscribeConfig::default()
    };

    let stats = transcribe_result_set(&results, &SizeRecognizer, None, &config, out.path()).unwrap();
    assert_eq!(stats.pages, 1);

    let text_path = text_output_path(&results.records()[1], out.path());
    assert_eq!(text_path, out.path().join("page-7.txt"));
    let text = std::fs::read_to_string(text_path).unwrap();
    assert_eq!(text, "160x10\n160x10\n");
    assert!(!out.path().join("missing.txt").exists());
}

#[test]
fn test_regions_cropped_away_are_not_kept() {
    let image = DynamicImage::new_rgb8(200, 100);
    let record = DetectionRecord {
        boxes: vec![
            BBox::fractional(Rect::new(0.1, 0.1, 0.9, 0.2)),
            // Wide enough, but entirely below the page
            BBox::fractional(Rect::new(0.1, 1.2, 0.9, 1.4)),
        ],
        ..page_record("/corpus/page.png".into())
    };
    let mut stats = TranscribeStats::default();

    let lines = transcribe_record(&record, &image, &SizeRecognizer, None, &TranscribeConfig::default(), &mut stats);

    assert_eq!(lines.len(), 1);
    assert_eq!(stats.detected, 2);
    assert_eq!(stats.kept, 1);
    assert_eq!(stats.recognized, 1);
}
