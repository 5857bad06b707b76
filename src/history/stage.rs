// src/history/stage.rs

/// Pipeline stage a workbook has passed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Downloaded,
    Normalized,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Downloaded => "Downloaded",
            Stage::Normalized => "Normalized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "downloaded" => Some(Stage::Downloaded),
            "normalized" => Some(Stage::Normalized),
            _ => None,
        }
    }
}
