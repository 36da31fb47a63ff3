//! Diff segments: parsing a unified diff into aligned base/head rows, and
//! assembling rows for display with coverage states and highlighting.
//!
//! Segments normally arrive pre-aligned from the backend; [`parse_segments`]
//! covers hosts that only have raw `git diff` output.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::classify::LineClassifier;
use crate::filter::FilterContext;
use crate::model::{DiffRow, DiffSegment, RenderedDiffRow};

/// Rows at each end of a segment that are only highlighted when they are
/// themselves insertions or deletions.
pub const EDGE_ROWS: usize = 3;

/// `-old_start[,old_count] +new_start[,new_count]`, optionally wrapped in
/// `@@ ... @@` with trailing section text.
static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@@ )?-(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))?(?: @@.*)?$").unwrap()
});

// ---------------------------------------------------------------------------
// Hunk headers
// ---------------------------------------------------------------------------

/// Line ranges of one hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub base_start: u32,
    pub base_count: u32,
    pub head_start: u32,
    pub head_count: u32,
}

impl HunkHeader {
    /// Parse `@@ -10,5 +20,8 @@` or the bare `-10,5 +20,8` form. Omitted
    /// counts default to 1.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = HUNK_RE.captures(text.trim_end())?;
        let num = |i: usize, default: u32| -> Option<u32> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(default),
            }
        };
        Some(Self {
            base_start: num(1, 0)?,
            base_count: num(2, 1)?,
            head_start: num(3, 0)?,
            head_count: num(4, 1)?,
        })
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{},{} +{},{}",
            self.base_start, self.base_count, self.head_start, self.head_count
        )
    }
}

// ---------------------------------------------------------------------------
// Diff parsing
// ---------------------------------------------------------------------------

/// Strip common VCS prefixes: "b/" (default git), "a/" (some tools).
/// Also handles --no-prefix diffs where no prefix is present.
fn strip_vcs_prefix(path: &str) -> &str {
    path.strip_prefix("b/")
        .or_else(|| path.strip_prefix("a/"))
        .unwrap_or(path)
}

/// Line number at `counter`, then advance it. Line 0 is not a line and
/// yields `None`; running past `u32::MAX` sets `overflowed`.
fn step(counter: &mut u32, overflowed: &mut bool) -> Option<u32> {
    let current = *counter;
    match current.checked_add(1) {
        Some(next) => *counter = next,
        None => *overflowed = true,
    }
    (current > 0).then_some(current)
}

/// Parse a unified diff (e.g., `git diff`) into segments per file path.
///
/// Deleted files are keyed on their old path. Rows carry the line text
/// without its `+`/`-`/space prefix; coverage states are left empty.
pub fn parse_segments(diff_text: &str) -> BTreeMap<String, Vec<DiffSegment>> {
    let mut result: BTreeMap<String, Vec<DiffSegment>> = BTreeMap::new();
    let mut old_file: Option<String> = None;
    let mut current_file: Option<String> = None;
    let mut base_line: u32 = 0;
    let mut head_line: u32 = 0;
    let mut base_left: u32 = 0;
    let mut head_left: u32 = 0;

    for line in diff_text.lines() {
        let in_hunk = base_left > 0 || head_left > 0;

        if in_hunk {
            let Some(segment) = current_file
                .as_ref()
                .and_then(|f| result.get_mut(f))
                .and_then(|segments| segments.last_mut())
            else {
                base_left = 0;
                head_left = 0;
                continue;
            };

            if line.starts_with('\\') {
                // "\ No newline at end of file" is diff metadata, not a line
                continue;
            }

            let mut overflowed = false;
            let (mut row, text) = if let Some(text) = line.strip_prefix('+') {
                head_left = head_left.saturating_sub(1);
                let head = step(&mut head_line, &mut overflowed);
                (DiffRow::new(None, head, true), text)
            } else if let Some(text) = line.strip_prefix('-') {
                base_left = base_left.saturating_sub(1);
                let base = step(&mut base_line, &mut overflowed);
                (DiffRow::new(base, None, true), text)
            } else {
                // Context; some tools drop the leading space on empty lines
                let text = line.strip_prefix(' ').unwrap_or(line);
                base_left = base_left.saturating_sub(1);
                head_left = head_left.saturating_sub(1);
                let base = step(&mut base_line, &mut overflowed);
                let head = step(&mut head_line, &mut overflowed);
                (DiffRow::new(base, head, false), text)
            };
            if overflowed {
                // No line can follow u32::MAX; end the hunk here
                base_left = 0;
                head_left = 0;
            }

            row.content.push(text.to_string());
            segment.rows.push(row);
            continue;
        }

        if line.starts_with("diff ") {
            old_file = None;
            current_file = None;
        } else if let Some(rest) = line.strip_prefix("--- ") {
            old_file = (rest != "/dev/null").then(|| strip_vcs_prefix(rest).to_string());
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            current_file = if rest == "/dev/null" {
                // File was deleted
                old_file.clone()
            } else {
                Some(strip_vcs_prefix(rest).to_string())
            };
        } else if line.starts_with("@@ ") {
            let (Some(file), Some(header)) = (current_file.as_ref(), HunkHeader::parse(line))
            else {
                continue;
            };
            let text = line
                .trim_start_matches("@@ ")
                .split(" @@")
                .next()
                .unwrap_or_default()
                .to_string();
            result.entry(file.clone()).or_default().push(DiffSegment {
                header: text,
                rows: Vec::new(),
            });
            base_line = header.base_start;
            head_line = header.head_start;
            base_left = header.base_count;
            head_left = header.head_count;
        }
    }

    result
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Whether row `index` of a segment with `len` rows sits in the first or last
/// [`EDGE_ROWS`] rows.
#[must_use]
pub fn is_edge(index: usize, len: usize) -> bool {
    index < EDGE_ROWS || index + EDGE_ROWS >= len
}

/// Attach coverage states to every row and decide which rows are
/// highlighted. Rows are returned in input order; none are dropped.
///
/// A row is highlighted when it is a literal insertion/deletion or lies
/// outside the edge window. Segments shorter than seven rows therefore only
/// highlight their diff rows.
pub fn assemble<C>(
    segment: &DiffSegment,
    classifier: &C,
    ctx: &FilterContext,
) -> Vec<RenderedDiffRow>
where
    C: LineClassifier + ?Sized,
{
    let len = segment.rows.len();
    segment
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut row = row.clone();
            row.base_state = row.base_number.map(|n| classifier.classify_base(n, ctx));
            row.head_state = row.head_number.map(|n| classifier.classify_head(n, ctx));
            let highlighted = row.is_diff_marker || !is_edge(i, len);
            RenderedDiffRow { row, highlighted }
        })
        .collect()
}
