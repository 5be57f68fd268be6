mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from textzones for tests
pub use textzones::{
    BBox, BatchConfig, BatchDetector, CoordSpace, DetectionRecord, Detector, GroundTruthBox,
    GroundTruthEntry, LayoutModel, LayoutRegion, PoolKind, Rect, ResultSet, Slice,
};
