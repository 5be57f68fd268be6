use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::batch::BatchConfig;
use crate::detection::{ContourLayoutModel, ContourParams, DetectOptions, LayoutDataset, LayoutModel, SidecarLayoutModel};
use crate::evaluation::{MatchPolicy, PredictionFilter};
use crate::recognition::TranscribeConfig;

/// Which layout model backend to initialise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Contour,
    Sidecar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub backend: Backend,
    pub keep_text_only: bool,
    pub min_score: f32,
    /// Preset label map for backends emitting class ids
    pub dataset: Option<LayoutDataset>,
    pub contour: ContourParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Contour,
            keep_text_only: true,
            min_score: 0.0,
            dataset: None,
            contour: ContourParams::default(),
        }
    }
}

impl DetectorConfig {
    pub fn options(&self) -> DetectOptions {
        DetectOptions {
            keep_text_only: self.keep_text_only,
            min_score: self.min_score,
        }
    }

    /// Initialise the configured backend
    pub fn build_model(&self) -> Box<dyn LayoutModel> {
        match self.backend {
            Backend::Contour => Box::new(ContourLayoutModel::new(self.contour.clone())),
            Backend::Sidecar => Box::new(SidecarLayoutModel::new(self.dataset)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub policy: MatchPolicy,
    pub filter: PredictionFilter,
    /// Score at or above which a ground-truth box counts as found
    pub hit_threshold: Option<f64>,
}

/// Application settings, loaded from an optional TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub batch: BatchConfig,
    pub detector: DetectorConfig,
    pub evaluation: EvaluationConfig,
    pub transcribe: TranscribeConfig,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
