//! In-memory representation of a file's coverage overlay. Everything here is
//! rebuilt from the payload on each render; nothing is cached between renders.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Identifier of one coverage-report upload.
pub type UploadId = String;
/// User-defined label grouping uploads.
pub type FlagName = String;
pub type ComponentName = String;
/// Pre-tokenized display fragment. Opaque to the engine.
pub type Token = String;

/// Branch counts for a branch-capable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BranchCounts {
    pub total: u32,
    pub hit: u32,
}

impl BranchCounts {
    pub fn new(total: u32, hit: u32) -> Self {
        Self { total, hit }
    }

    /// Counts with `hit` clamped to `total`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            total: self.total,
            hit: self.hit.min(self.total),
        }
    }

    /// Some but not all branches were taken.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        let c = self.clamped();
        c.hit > 0 && c.hit < c.total
    }
}

/// Coverage recorded for one instrumented line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageFact {
    /// Uploads that executed this line. May be empty.
    pub hit_upload_ids: BTreeSet<UploadId>,
    pub branches: Option<BranchCounts>,
    /// Flags the fact is attributed to. `None` means the backend sent no
    /// attribution, which hides the fact under an active flag filter.
    pub flags: Option<BTreeSet<FlagName>>,
    pub components: Option<BTreeSet<ComponentName>>,
}

impl CoverageFact {
    pub fn new<I, S>(hit_upload_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UploadId>,
    {
        Self {
            hit_upload_ids: hit_upload_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_branches(mut self, total: u32, hit: u32) -> Self {
        self.branches = Some(BranchCounts::new(total, hit));
        self
    }

    #[must_use]
    pub fn with_flags<I: IntoIterator<Item = S>, S: Into<FlagName>>(mut self, flags: I) -> Self {
        self.flags = Some(flags.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_components<I: IntoIterator<Item = S>, S: Into<ComponentName>>(
        mut self,
        components: I,
    ) -> Self {
        self.components = Some(components.into_iter().map(Into::into).collect());
        self
    }
}

/// One physical line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: u32,
    pub content: Vec<Token>,
    /// `None` when the line is not instrumented (comments, blank lines).
    pub coverage: Option<CoverageFact>,
}

impl SourceLine {
    pub fn new(number: u32, coverage: Option<CoverageFact>) -> Self {
        Self {
            number,
            content: Vec::new(),
            coverage,
        }
    }
}

/// Display state of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineState {
    Covered,
    Uncovered,
    Partial,
    Blank,
}

impl LineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineState::Covered => "covered",
            LineState::Uncovered => "uncovered",
            LineState::Partial => "partial",
            LineState::Blank => "blank",
        }
    }
}

impl std::fmt::Display for LineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one line.
///
/// `suppressed` lines keep their computed state but must be drawn without
/// coverage emphasis. A `Blank` line is never suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub state: LineState,
    pub suppressed: bool,
}

impl Classification {
    pub const BLANK: Classification = Classification {
        state: LineState::Blank,
        suppressed: false,
    };

    /// Whether the presentation layer should draw coverage emphasis.
    #[must_use]
    pub fn is_emphasized(&self) -> bool {
        self.state != LineState::Blank && !self.suppressed
    }
}

/// A contiguous block of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    /// Hunk ranges without the `@@` delimiters, e.g. `-6,16 +6,16`.
    pub header: String,
    pub rows: Vec<DiffRow>,
}

/// One aligned base/head row of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRow {
    pub base_number: Option<u32>,
    pub head_number: Option<u32>,
    pub base_state: Option<Classification>,
    pub head_state: Option<Classification>,
    pub content: Vec<Token>,
    /// Set by the backend for literal insertions and deletions.
    pub is_diff_marker: bool,
}

impl DiffRow {
    /// A row with no coverage states yet.
    pub fn new(base_number: Option<u32>, head_number: Option<u32>, is_diff_marker: bool) -> Self {
        Self {
            base_number,
            head_number,
            base_state: None,
            head_state: None,
            content: Vec::new(),
            is_diff_marker,
        }
    }
}

/// A diff row ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDiffRow {
    #[serde(flatten)]
    pub row: DiffRow,
    pub highlighted: bool,
}

/// Number of lines in each state. Suppressed lines count under their
/// computed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StateCounts {
    pub covered: usize,
    pub uncovered: usize,
    pub partial: usize,
    pub blank: usize,
}

impl StateCounts {
    pub fn record(&mut self, state: LineState) {
        match state {
            LineState::Covered => self.covered += 1,
            LineState::Uncovered => self.uncovered += 1,
            LineState::Partial => self.partial += 1,
            LineState::Blank => self.blank += 1,
        }
    }

    #[must_use]
    pub fn get(&self, state: LineState) -> usize {
        match state {
            LineState::Covered => self.covered,
            LineState::Uncovered => self.uncovered,
            LineState::Partial => self.partial,
            LineState::Blank => self.blank,
        }
    }

    /// Lines carrying any instrumentation.
    #[must_use]
    pub fn instrumented(&self) -> usize {
        self.covered + self.uncovered + self.partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_counts_clamp() {
        let b = BranchCounts::new(2, 5).clamped();
        assert_eq!(b, BranchCounts::new(2, 2));
        assert!(!BranchCounts::new(2, 5).is_partial());
        assert!(BranchCounts::new(3, 1).is_partial());
        assert!(!BranchCounts::new(0, 0).is_partial());
    }

    #[test]
    fn test_state_counts() {
        let mut counts = StateCounts::default();
        for s in [LineState::Covered, LineState::Covered, LineState::Partial, LineState::Blank] {
            counts.record(s);
        }
        assert_eq!(counts.get(LineState::Covered), 2);
        assert_eq!(counts.instrumented(), 3);
        assert_eq!(counts.blank, 1);
    }

    #[test]
    fn test_blank_never_emphasized() {
        assert!(!Classification::BLANK.is_emphasized());
        let c = Classification {
            state: LineState::Uncovered,
            suppressed: true,
        };
        assert!(!c.is_emphasized());
    }
}
