//! Overlap scoring of detections against ground truth.
//!
//! Two matching postures are supported. `Strict` picks the single predicted box
//! with the largest intersection. `Accumulated` merges every predicted box that
//! covers enough of the ground truth into one enclosing rectangle first, which
//! suits models that split a paragraph into several line boxes.

use serde::{Deserialize, Serialize};

use crate::geometry::{intersections, Rect, PIXEL_OFFSET};
use crate::models::{DetectionRecord, GroundTruthEntry, ResultSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Intersection over union
    #[default]
    Iou,
    /// Intersection over the ground-truth area
    Ioa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Strict,
    Accumulated,
}

/// Scoring policy for one evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    pub match_mode: MatchMode,
    pub score_mode: ScoreMode,
    /// Minimum share of the ground-truth area a box must cover to be merged
    pub join_threshold: f64,
    pub offset: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::Strict,
            score_mode: ScoreMode::Iou,
            join_threshold: 0.2,
            offset: PIXEL_OFFSET,
        }
    }
}

fn ratio(pred: &Rect, gt: &Rect, intersection: f64, mode: ScoreMode, offset: f64) -> f64 {
    let gt_area = gt.area(offset);
    let denom = match mode {
        ScoreMode::Ioa => gt_area,
        ScoreMode::Iou => pred.area(offset) + gt_area - intersection,
    };
    if denom <= 0.0 { 0.0 } else { intersection / denom }
}

/// Score of the single predicted box overlapping `gt` the most.
///
/// Zero when there are no predictions or none overlaps `gt`.
pub fn max_match(preds: &[Rect], gt: &Rect, mode: ScoreMode, offset: f64) -> f64 {
    let inters = intersections(preds, gt, offset);

    // First maximum wins ties
    let best = inters
        .iter()
        .enumerate()
        .fold(None::<(usize, f64)>, |acc, (i, &a)| match acc {
            Some((_, m)) if m >= a => acc,
            _ => Some((i, a)),
        });

    match best {
        Some((k, inter)) if inter > 0.0 => ratio(&preds[k], gt, inter, mode, offset),
        _ => 0.0,
    }
}

/// Merge every predicted box whose intersection with `gt` exceeds
/// `join_threshold * area(gt)` and score the enclosing rectangle.
///
/// Returns `(0.0, None)` when no box qualifies.
pub fn accumulated_match(
    preds: &[Rect],
    gt: &Rect,
    join_threshold: f64,
    mode: ScoreMode,
    offset: f64,
) -> (f64, Option<Rect>) {
    let thresh = gt.area(offset) * join_threshold;
    let inters = intersections(preds, gt, offset);

    let kept: Vec<&Rect> = preds
        .iter()
        .zip(&inters)
        .filter(|(_, a)| **a > thresh)
        .map(|(p, _)| p)
        .collect();

    let Some(merged) = Rect::enclosing(kept) else {
        return (0.0, None);
    };

    let inter = merged.intersection_area(gt, offset);
    (ratio(&merged, gt, inter, mode, offset), Some(merged))
}

impl MatchPolicy {
    /// Score `preds` against one ground-truth box under this policy.
    pub fn score(&self, preds: &[Rect], gt: &Rect) -> (f64, Option<Rect>) {
        match self.match_mode {
            MatchMode::Strict => (max_match(preds, gt, self.score_mode, self.offset), None),
            MatchMode::Accumulated => accumulated_match(preds, gt, self.join_threshold, self.score_mode, self.offset),
        }
    }
}

/// Which detections take part in scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionFilter {
    /// Minimum width as a fraction of the image width
    pub min_width: f64,
    pub min_score: f32,
}

impl Default for PredictionFilter {
    fn default() -> Self {
        Self {
            min_width: 0.5,
            min_score: 0.5,
        }
    }
}

impl PredictionFilter {
    /// Pixel rectangles of the boxes in `record` passing the filter.
    ///
    /// Boxes without a score are kept.
    pub fn pixel_predictions(&self, record: &DetectionRecord) -> Vec<Rect> {
        let (h, w) = (record.image_height, record.image_width);
        record
            .boxes
            .iter()
            .filter(|b| b.fractional_width(h, w) >= self.min_width)
            .filter(|b| b.score.is_none_or(|s| s >= self.min_score))
            .map(|b| b.pixel_rect(h, w))
            .collect()
    }
}

/// Score of one ground-truth box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxScore {
    pub image_file_name: String,
    pub label: String,
    pub ground_truth: Rect,
    pub score: f64,
    pub merged: Option<Rect>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    pub scores: Vec<BoxScore>,
    /// Ground-truth images with no detection record
    pub missing_images: Vec<String>,
}

impl EvaluationReport {
    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|s| s.score).sum::<f64>() / self.scores.len() as f64
    }

    /// Fraction of ground-truth boxes scoring at least `threshold`
    pub fn hit_rate(&self, threshold: f64) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let hits = self.scores.iter().filter(|s| s.score >= threshold).count();
        hits as f64 / self.scores.len() as f64
    }
}

/// Score every ground-truth box against the detections of its image.
///
/// Images are joined on base file name. Boxes of images missing from
/// `results` score zero.
pub fn evaluate(
    results: &ResultSet,
    ground_truth: &[GroundTruthEntry],
    policy: &MatchPolicy,
    filter: &PredictionFilter,
) -> EvaluationReport {
    let mut report = EvaluationReport::default();

    for entry in ground_truth {
        let preds = match results.find_by_file_name(&entry.image_file_name) {
            Some(record) => filter.pixel_predictions(record),
            None => {
                tracing::warn!(image = %entry.image_file_name, "no detections for annotated image");
                report.missing_images.push(entry.image_file_name.clone());
                Vec::new()
            }
        };

        for gt in &entry.boxes {
            let (score, merged) = policy.score(&preds, &gt.rect);
            report.scores.push(BoxScore {
                image_file_name: entry.image_file_name.clone(),
                label: gt.label.clone(),
                ground_truth: gt.rect,
                score,
                merged,
            });
        }
    }

    tracing::info!(
        boxes = report.scores.len(),
        missing = report.missing_images.len(),
        mean = report.mean_score(),
        "evaluation finished"
    );
    report
}
