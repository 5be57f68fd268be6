pub mod annotation;
pub mod batch;
pub mod config;
pub mod detection;
pub mod evaluation;
pub mod geometry;
pub mod models;
pub mod recognition;
pub mod render;
pub mod snapshot;

pub use models::{DetectionRecord, GroundTruthBox, GroundTruthEntry, ResultSet};
pub use geometry::{BBox, CoordSpace, Rect};
pub use detection::{Detector, LayoutModel, LayoutRegion};
pub use batch::{BatchConfig, BatchDetector, BatchReport, PoolKind, Slice};
pub use evaluation::{MatchMode, MatchPolicy, PredictionFilter, ScoreMode};
