//! JSON payload delivered by the fetching layer, and its conversion into the
//! coverage model.
//!
//! ```json
//! { "path": "src/lib.rs",
//!   "lines": [{ "number": 1, "hitUploadIds": ["ci-a"], "branches": {"total": 2, "hit": 1},
//!               "flags": ["unit"], "components": ["core"], "content": "fn main() {" }],
//!   "baseLines": [...],
//!   "segments": [{ "header": "-6,16 +6,16",
//!                  "rows": [{ "baseNumber": 6, "headNumber": 6, "content": " x", "isDiffMarker": false }] }] }
//! ```
//!
//! A line without `hitUploadIds`, or with `"instrumented": false`, is not
//! instrumented.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::model::{BranchCounts, CoverageFact, DiffRow, DiffSegment, SourceLine, Token};

/// Line text, either whole or pre-split into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Tokens(Vec<Token>),
}

impl Content {
    fn into_tokens(self) -> Vec<Token> {
        match self {
            Content::Text(text) => vec![text],
            Content::Tokens(tokens) => tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePayload {
    pub number: u32,
    #[serde(default)]
    pub hit_upload_ids: Option<Vec<String>>,
    #[serde(default)]
    pub branches: Option<BranchCounts>,
    #[serde(default)]
    pub flags: Option<Vec<String>>,
    #[serde(default)]
    pub components: Option<Vec<String>>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub instrumented: Option<bool>,
}

impl LinePayload {
    fn into_source_line(self) -> SourceLine {
        let instrumented = self.instrumented.unwrap_or(true);
        let coverage = match self.hit_upload_ids {
            Some(hits) if instrumented => Some(CoverageFact {
                hit_upload_ids: hits.into_iter().collect(),
                branches: self.branches,
                flags: self.flags.map(|f| f.into_iter().collect()),
                components: self.components.map(|c| c.into_iter().collect()),
            }),
            _ => None,
        };
        SourceLine {
            number: self.number,
            content: self.content.map(Content::into_tokens).unwrap_or_default(),
            coverage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPayload {
    #[serde(default)]
    pub base_number: Option<u32>,
    #[serde(default)]
    pub head_number: Option<u32>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub is_diff_marker: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SegmentPayload {
    pub header: String,
    #[serde(default)]
    pub rows: Vec<RowPayload>,
}

/// Everything needed to render one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub lines: Vec<LinePayload>,
    #[serde(default)]
    pub base_lines: Vec<LinePayload>,
    #[serde(default)]
    pub segments: Vec<SegmentPayload>,
}

impl Payload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let payload: Payload = serde_json::from_slice(bytes)?;
        payload.log_loaded();
        Ok(payload)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let payload: Payload = serde_json::from_reader(reader)?;
        payload.log_loaded();
        Ok(payload)
    }

    /// Read a payload saved to disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    fn log_loaded(&self) {
        debug!(
            path = self.path.as_deref().unwrap_or(""),
            lines = self.lines.len(),
            base_lines = self.base_lines.len(),
            segments = self.segments.len(),
            "loaded coverage payload"
        );
    }

    /// Head-side lines, sorted by number.
    pub fn source_lines(&self) -> Vec<SourceLine> {
        to_source_lines(&self.lines)
    }

    /// Base-side lines, sorted by number.
    pub fn base_source_lines(&self) -> Vec<SourceLine> {
        to_source_lines(&self.base_lines)
    }

    pub fn diff_segments(&self) -> Vec<DiffSegment> {
        self.segments
            .iter()
            .map(|segment| DiffSegment {
                header: segment.header.clone(),
                rows: segment.rows.iter().map(to_diff_row).collect(),
            })
            .collect()
    }
}

/// Line 0 is dropped; a repeated number keeps its last entry.
fn to_source_lines(lines: &[LinePayload]) -> Vec<SourceLine> {
    let mut by_number: BTreeMap<u32, SourceLine> = BTreeMap::new();
    for line in lines {
        if line.number == 0 {
            debug!("dropping payload line with number 0");
            continue;
        }
        by_number.insert(line.number, line.clone().into_source_line());
    }
    by_number.into_values().collect()
}

fn to_diff_row(row: &RowPayload) -> DiffRow {
    let mut out = DiffRow::new(
        row.base_number.filter(|&n| n > 0),
        row.head_number.filter(|&n| n > 0),
        row.is_diff_marker,
    );
    out.content = row
        .content
        .clone()
        .map(Content::into_tokens)
        .unwrap_or_default();
    out
}
