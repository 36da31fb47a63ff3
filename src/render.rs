//! The render pipeline: payload + filters + fragment -> rows ready for a
//! presentation layer. A pure function of its inputs; call it again whenever
//! any of them changes.

use serde::Serialize;

use crate::anchor;
use crate::classify::{classify, DiffCoverage};
use crate::deeplink::{DeepLinkController, ScrollIntent};
use crate::diff::assemble;
use crate::filter::FilterContext;
use crate::model::{Classification, LineState, RenderedDiffRow, StateCounts, Token};
use crate::payload::Payload;

/// A source line with its overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedLine {
    pub number: u32,
    pub content: Vec<Token>,
    pub classification: Classification,
    /// Fragment addressing this line, e.g. `#af63bd4c8601b7df-L42`.
    pub anchor: String,
    pub targeted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSegment {
    pub header: String,
    pub rows: Vec<RenderedDiffRow>,
}

/// One file, fully rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedFile {
    pub path: String,
    pub lines: Vec<RenderedLine>,
    pub segments: Vec<RenderedSegment>,
    pub counts: StateCounts,
    pub targeted: Option<u32>,
    /// Set when a line became targeted in this render.
    pub scroll: Option<ScrollIntent>,
}

impl RenderedFile {
    /// Numbers of emphasized lines in `state`, ascending. Useful as
    /// candidates for next/previous navigation.
    pub fn lines_in_state(&self, state: LineState) -> Vec<u32> {
        self.lines
            .iter()
            .filter(|l| l.classification.state == state && l.classification.is_emphasized())
            .map(|l| l.number)
            .collect()
    }

    /// Controller for the fragment this file was rendered with.
    pub fn deep_links(&self, fragment: Option<&str>) -> DeepLinkController {
        DeepLinkController::new(&self.path, fragment)
    }
}

/// Render a file from scratch.
pub fn render_file(payload: &Payload, ctx: &FilterContext, fragment: Option<&str>) -> RenderedFile {
    rerender(None, payload, ctx, fragment)
}

/// Render a file after a previous render. Only differs from
/// [`render_file`] in emitting a scroll intent solely when the targeted
/// line changed.
pub fn rerender(
    previous: Option<&RenderedFile>,
    payload: &Payload,
    ctx: &FilterContext,
    fragment: Option<&str>,
) -> RenderedFile {
    let path = payload.path.clone().unwrap_or_default();
    let controller = DeepLinkController::new(&path, fragment);
    let source_lines = payload.source_lines();

    let mut counts = StateCounts::default();
    let lines: Vec<RenderedLine> = source_lines
        .iter()
        .map(|line| {
            let classification = classify(line, ctx);
            counts.record(classification.state);
            RenderedLine {
                number: line.number,
                content: line.content.clone(),
                classification,
                anchor: anchor::encode(&path, line.number).to_string(),
                targeted: false,
            }
        })
        .collect();

    let numbers = || lines.iter().map(|l| l.number);
    let targeted = controller.targeted(numbers());
    let scroll = controller.scroll_intent(previous.and_then(|p| p.targeted), numbers());

    let lines = lines
        .into_iter()
        .map(|mut line| {
            line.targeted = targeted == Some(line.number);
            line
        })
        .collect();

    let coverage = DiffCoverage::new(&payload.base_source_lines(), &source_lines);
    let segments = payload
        .diff_segments()
        .iter()
        .map(|segment| RenderedSegment {
            header: segment.header.clone(),
            rows: assemble(segment, &coverage, ctx),
        })
        .collect();

    RenderedFile {
        path,
        lines,
        segments,
        counts,
        targeted,
        scroll,
    }
}
