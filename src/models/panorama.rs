use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Which capture a panorama record refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearLabel {
    Current,
    Year(String),
    Unknown,
}

impl YearLabel {
    pub fn is_current(&self) -> bool {
        matches!(self, YearLabel::Current)
    }

    pub fn matches(&self, year: &str) -> bool {
        match self {
            YearLabel::Year(label) => label == year,
            _ => false,
        }
    }
}

impl Display for YearLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearLabel::Current => write!(f, "current"),
            YearLabel::Year(year) => write!(f, "{}", year),
            YearLabel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanoramaRecord {
    pub year: YearLabel,
    pub id: String,
    /// Capture date as reported by the metadata endpoint (e.g. `201905`), when present.
    pub timeline: Option<String>,
}

impl PanoramaRecord {
    pub fn current(id: &str) -> Self {
        PanoramaRecord {
            year: YearLabel::Current,
            id: id.to_string(),
            timeline: None,
        }
    }
}
