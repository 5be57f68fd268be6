use serde::{Deserialize, Serialize};

/// Datasets whose layout models emit integer class ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutDataset {
    #[serde(rename = "HJDataset")]
    HjDataset,
    PubLayNet,
    PrimaLayout,
    NewspaperNavigator,
}

const HJ_DATASET: &[(u32, &str)] = &[
    (1, "Page Frame"),
    (2, "Row"),
    (3, "Title Region"),
    (4, "Text Region"),
    (5, "Title"),
    (6, "Subtitle"),
    (7, "Other"),
];

const PUBLAYNET: &[(u32, &str)] = &[
    (0, "Text"),
    (1, "Title"),
    (2, "List"),
    (3, "Table"),
    (4, "Figure"),
];

const PRIMA_LAYOUT: &[(u32, &str)] = &[
    (1, "TextRegion"),
    (2, "ImageRegion"),
    (3, "TableRegion"),
    (4, "MathsRegion"),
    (5, "SeparatorRegion"),
    (6, "OtherRegion"),
];

const NEWSPAPER_NAVIGATOR: &[(u32, &str)] = &[
    (0, "Photograph"),
    (1, "Illustration"),
    (2, "Map"),
    (3, "Comics/Cartoon"),
    (4, "Editorial Cartoon"),
    (5, "Headline"),
    (6, "Advertisement"),
];

impl LayoutDataset {
    pub fn labels(&self) -> &'static [(u32, &'static str)] {
        match self {
            LayoutDataset::HjDataset => HJ_DATASET,
            LayoutDataset::PubLayNet => PUBLAYNET,
            LayoutDataset::PrimaLayout => PRIMA_LAYOUT,
            LayoutDataset::NewspaperNavigator => NEWSPAPER_NAVIGATOR,
        }
    }

    /// Label for a class id, `None` if the id is not in the preset
    pub fn label(&self, class_id: u32) -> Option<&'static str> {
        self.labels()
            .iter()
            .find(|(id, _)| *id == class_id)
            .map(|(_, name)| *name)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "hjdataset" => Some(LayoutDataset::HjDataset),
            "publaynet" => Some(LayoutDataset::PubLayNet),
            "prima" | "primalayout" => Some(LayoutDataset::PrimaLayout),
            "newspaper" | "newspapernavigator" => Some(LayoutDataset::NewspaperNavigator),
            _ => None,
        }
    }
}
