//! Coverage classification: raw per-line facts plus the active filters
//! produce exactly one display state per line.
//!
//! Rules, in order:
//!   1. no fact, or the fact is hidden by a flag/component filter => Blank
//!   2. effective hits = hit uploads minus ignored uploads
//!   3. 0 < branches.hit < branches.total => Partial
//!   4. effective hits non-empty => Covered
//!   5. otherwise Uncovered, even when every hit was filtered away
//!
//! A non-blank state switched off in the visibility toggles is returned as
//! suppressed rather than replaced.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::filter::FilterContext;
use crate::model::{Classification, CoverageFact, LineState, SourceLine};

/// Classify one source line under the given filters.
#[must_use]
pub fn classify(line: &SourceLine, ctx: &FilterContext) -> Classification {
    classify_fact(line.coverage.as_ref(), ctx)
}

/// Classify a bare coverage fact. `None` means not instrumented.
#[must_use]
pub fn classify_fact(fact: Option<&CoverageFact>, ctx: &FilterContext) -> Classification {
    let Some(fact) = fact.filter(|f| is_visible(f, ctx)) else {
        return Classification::BLANK;
    };

    let state = match fact.branches {
        Some(branches) if branches.is_partial() => LineState::Partial,
        _ => {
            if let Some(branches) = fact.branches.filter(|b| b.hit > b.total) {
                trace!(hit = branches.hit, total = branches.total, "clamping branch hits");
            }
            if fact
                .hit_upload_ids
                .iter()
                .any(|id| !ctx.ignored_upload_ids.contains(id))
            {
                LineState::Covered
            } else {
                LineState::Uncovered
            }
        }
    };

    Classification {
        state,
        suppressed: !ctx.visibility.allows(state),
    }
}

/// A fact is visible when every non-empty selection is matched by the
/// fact's attribution. Missing attribution never matches.
fn is_visible(fact: &CoverageFact, ctx: &FilterContext) -> bool {
    selection_matches(&ctx.selected_flags, fact.flags.as_ref())
        && selection_matches(&ctx.selected_components, fact.components.as_ref())
}

fn selection_matches(selected: &BTreeSet<String>, attributed: Option<&BTreeSet<String>>) -> bool {
    if selected.is_empty() {
        return true;
    }
    attributed.is_some_and(|labels| !labels.is_disjoint(selected))
}

/// Classifies the two sides of a diff by line number.
pub trait LineClassifier {
    /// Classify line `number` of the base (old) file.
    fn classify_base(&self, number: u32, ctx: &FilterContext) -> Classification;

    /// Classify line `number` of the head (new) file.
    fn classify_head(&self, number: u32, ctx: &FilterContext) -> Classification;
}

/// Coverage facts of one file keyed by line number.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    facts: BTreeMap<u32, CoverageFact>,
}

impl LineIndex {
    pub fn new(lines: &[SourceLine]) -> Self {
        let facts = lines
            .iter()
            .filter_map(|l| l.coverage.clone().map(|c| (l.number, c)))
            .collect();
        Self { facts }
    }

    pub fn get(&self, number: u32) -> Option<&CoverageFact> {
        self.facts.get(&number)
    }

    #[must_use]
    pub fn classify(&self, number: u32, ctx: &FilterContext) -> Classification {
        classify_fact(self.get(number), ctx)
    }
}

/// Base and head coverage of a file under comparison.
#[derive(Debug, Clone, Default)]
pub struct DiffCoverage {
    pub base: LineIndex,
    pub head: LineIndex,
}

impl DiffCoverage {
    pub fn new(base: &[SourceLine], head: &[SourceLine]) -> Self {
        Self {
            base: LineIndex::new(base),
            head: LineIndex::new(head),
        }
    }
}

impl LineClassifier for DiffCoverage {
    fn classify_base(&self, number: u32, ctx: &FilterContext) -> Classification {
        self.base.classify(number, ctx)
    }

    fn classify_head(&self, number: u32, ctx: &FilterContext) -> Classification {
        self.head.classify(number, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Visibility;

    fn line(number: u32, fact: Option<CoverageFact>) -> SourceLine {
        SourceLine::new(number, fact)
    }

    fn state(line: &SourceLine, ctx: &FilterContext) -> LineState {
        classify(line, ctx).state
    }

    #[test]
    fn test_uninstrumented_is_blank() {
        let c = classify(&line(12, None), &FilterContext::default());
        assert_eq!(c, Classification::BLANK);
    }

    #[test]
    fn test_all_hits_ignored_is_uncovered() {
        let l = line(10, Some(CoverageFact::new(["ci-a", "ci-b"])));
        let ctx = FilterContext::new().with_ignored(["ci-a", "ci-b"]);
        assert_eq!(state(&l, &ctx), LineState::Uncovered);
        assert_eq!(state(&l, &FilterContext::default()), LineState::Covered);
    }

    #[test]
    fn test_partially_ignored_stays_covered() {
        let l = line(1, Some(CoverageFact::new(["ci-a", "ci-b"])));
        let ctx = FilterContext::new().with_ignored(["ci-a"]);
        assert_eq!(state(&l, &ctx), LineState::Covered);
    }

    #[test]
    fn test_zero_branches_no_hits_is_uncovered() {
        let l = line(11, Some(CoverageFact::new(Vec::<String>::new()).with_branches(0, 0)));
        assert_eq!(state(&l, &FilterContext::default()), LineState::Uncovered);
    }

    #[test]
    fn test_branch_partial_dominates() {
        let l = line(3, Some(CoverageFact::new(["ci-a"]).with_branches(2, 1)));
        assert_eq!(state(&l, &FilterContext::default()), LineState::Partial);

        // Even with every hit ignored.
        let ctx = FilterContext::new().with_ignored(["ci-a"]);
        assert_eq!(state(&l, &ctx), LineState::Partial);
    }

    #[test]
    fn test_fully_taken_branches_follow_hits() {
        let l = line(3, Some(CoverageFact::new(["ci-a"]).with_branches(2, 2)));
        assert_eq!(state(&l, &FilterContext::default()), LineState::Covered);
    }

    #[test]
    fn test_branch_hits_over_total_are_clamped() {
        // hit=5 clamps to 2 => every branch taken, not partial.
        let l = line(3, Some(CoverageFact::new(["ci-a"]).with_branches(2, 5)));
        assert_eq!(state(&l, &FilterContext::default()), LineState::Covered);

        let l = line(4, Some(CoverageFact::new(Vec::<String>::new()).with_branches(2, 5)));
        assert_eq!(state(&l, &FilterContext::default()), LineState::Uncovered);
    }

    #[test]
    fn test_flag_filter_requires_attribution() {
        let unattributed = line(1, Some(CoverageFact::new(["ci-a"])));
        let unit = line(2, Some(CoverageFact::new(["ci-a"]).with_flags(["unit"])));
        let e2e = line(3, Some(CoverageFact::new(["ci-a"]).with_flags(["e2e"])));
        let ctx = FilterContext::new().with_flags(["unit"]);

        assert_eq!(classify(&unattributed, &ctx), Classification::BLANK);
        assert_eq!(state(&unit, &ctx), LineState::Covered);
        assert_eq!(classify(&e2e, &ctx), Classification::BLANK);
    }

    #[test]
    fn test_component_filter() {
        let l = line(
            1,
            Some(CoverageFact::new(Vec::<String>::new()).with_components(["api", "web"])),
        );
        let ctx = FilterContext::new().with_components(["web"]);
        assert_eq!(state(&l, &ctx), LineState::Uncovered);

        let ctx = FilterContext::new().with_components(["db"]);
        assert_eq!(state(&l, &ctx), LineState::Blank);
    }

    #[test]
    fn test_flag_and_component_filters_combine() {
        let l = line(
            1,
            Some(
                CoverageFact::new(["ci-a"])
                    .with_flags(["unit"])
                    .with_components(["api"]),
            ),
        );
        let both = FilterContext::new().with_flags(["unit"]).with_components(["api"]);
        assert_eq!(state(&l, &both), LineState::Covered);

        let wrong_component = FilterContext::new().with_flags(["unit"]).with_components(["web"]);
        assert_eq!(state(&l, &wrong_component), LineState::Blank);
    }

    #[test]
    fn test_visibility_suppresses_but_keeps_state() {
        let ctx = FilterContext::new().with_visibility(Visibility {
            covered: false,
            uncovered: true,
            partial: true,
        });
        let covered = classify(&line(1, Some(CoverageFact::new(["ci-a"]))), &ctx);
        assert_eq!(covered.state, LineState::Covered);
        assert!(covered.suppressed);

        let uncovered = classify(&line(2, Some(CoverageFact::default())), &ctx);
        assert!(!uncovered.suppressed);

        let blank = classify(&line(3, None), &ctx);
        assert!(!blank.suppressed);
    }

    #[test]
    fn test_line_index_lookup() {
        let lines = vec![
            line(1, Some(CoverageFact::new(["ci-a"]))),
            line(2, None),
            line(3, Some(CoverageFact::default())),
        ];
        let index = LineIndex::new(&lines);
        let ctx = FilterContext::default();
        assert_eq!(index.classify(1, &ctx).state, LineState::Covered);
        assert_eq!(index.classify(2, &ctx).state, LineState::Blank);
        assert_eq!(index.classify(3, &ctx).state, LineState::Uncovered);
        assert_eq!(index.classify(99, &ctx).state, LineState::Blank);
    }
}
