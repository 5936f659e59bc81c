// src/cities/categories.rs
use crate::errors::ServerError;

/// The attraction categories the upstream POI API understands.
/// `code` is the wire value, `display_key` the label the frontend groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttractionCategory {
    Historic,
    Cultural,
    Architecture,
    Natural,
    Religion,
    Sport,
}

pub const ALL_CATEGORIES: [AttractionCategory; 6] = [
    AttractionCategory::Historic,
    AttractionCategory::Cultural,
    AttractionCategory::Architecture,
    AttractionCategory::Natural,
    AttractionCategory::Religion,
    AttractionCategory::Sport,
];

impl AttractionCategory {
    pub fn code(self) -> &'static str {
        match self {
            AttractionCategory::Historic => "historic",
            AttractionCategory::Cultural => "cultural",
            AttractionCategory::Architecture => "architecture",
            AttractionCategory::Natural => "natural",
            AttractionCategory::Religion => "religion",
            AttractionCategory::Sport => "sport",
        }
    }

    /// Inverse mapping used for display grouping.
    pub fn display_key(self) -> &'static str {
        match self {
            AttractionCategory::Historic => "Historical",
            AttractionCategory::Cultural => "Cultural",
            AttractionCategory::Architecture => "Architecture",
            AttractionCategory::Natural => "Natural",
            AttractionCategory::Religion => "Religion",
            AttractionCategory::Sport => "Sport",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        ALL_CATEGORIES.iter().copied().find(|c| c.code() == code)
    }
}

/// Parse the `categories` query parameter: a URL-decoded JSON array of
/// category codes. Anything else is a validation error.
pub fn parse_selected(raw: &str) -> Result<Vec<AttractionCategory>, ServerError> {
    let values: Vec<String> = serde_json::from_str(raw)
        .map_err(|_| ServerError::BadRequest("categories must be a JSON array".into()))?;

    values
        .iter()
        .map(|code| {
            AttractionCategory::from_code(code)
                .ok_or_else(|| ServerError::BadRequest(format!("unknown category: {code}")))
        })
        .collect()
}
