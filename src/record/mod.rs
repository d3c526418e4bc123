pub mod writer;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use writer::{write_rows, RowWriter};

/// Placeholder quality score carried by every row in the dataset.
pub const DEFAULT_SCORE: u32 = 15;

/// Column order of every normalized CSV.
pub const OUTPUT_HEADER: [&str; 5] = ["origin_id", "img_url", "target", "writing_type", "score"];

/// Script style label derived from reviewer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WritingType {
    Uchen,
    #[serde(rename = "Non_Uchen")]
    NonUchen,
    Others,
}

impl WritingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingType::Uchen => "Uchen",
            WritingType::NonUchen => "Non_Uchen",
            WritingType::Others => "Others",
        }
    }
}

impl fmt::Display for WritingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the normalized dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub origin_id: String,
    pub img_url: String,
    pub target: String,
    pub writing_type: WritingType,
    pub score: u32,
}
