use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::render::SourceFormat;

/// YAML front matter of a Markdown document. Both fields are optional.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
}

/// An entry of the document list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub slug: String,
    pub date: Option<NaiveDate>,
    pub format: SourceFormat,
    pub file_name: String,
}

impl Document {
    pub fn display_date(&self) -> Option<String> {
        self.date.map(|date| date.format("%B %-d, %Y").to_string())
    }
}

/// Body of `POST /api/render`.
#[derive(Deserialize, Debug)]
pub struct RenderRequest {
    pub source: String,
    #[serde(default)]
    pub format: SourceFormat,
}

#[derive(Serialize, Debug)]
pub struct RenderResponse {
    pub html: String,
}

/// Accepts `YYYY-MM-DD`, with or without a time part after it.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
