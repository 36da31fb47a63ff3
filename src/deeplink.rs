//! Deep-link targeting of a single line through the URL fragment.
//!
//! The controller never reads or writes the location itself: the current
//! fragment is passed in, and changes come back as [`FragmentUpdate`]s for
//! the host to apply. Scrolling is likewise returned as a [`ScrollIntent`].

use serde::Serialize;
use tracing::debug;

use crate::anchor::{self, Anchor, FileHash};

/// Derived per-line link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Targeted,
}

/// Change the host should make to the URL fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentUpdate {
    Set(String),
    Clear,
}

impl FragmentUpdate {
    /// The fragment after applying this update.
    pub fn into_fragment(self) -> Option<String> {
        match self {
            FragmentUpdate::Set(fragment) => Some(fragment),
            FragmentUpdate::Clear => None,
        }
    }
}

/// Request to bring a line into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollIntent {
    pub line: u32,
}

/// Link state of one file's lines for a given fragment.
#[derive(Debug, Clone)]
pub struct DeepLinkController {
    path: String,
    file_hash: FileHash,
    anchor: Option<Anchor>,
}

impl DeepLinkController {
    /// A fragment that fails to decode targets nothing.
    pub fn new(path: &str, fragment: Option<&str>) -> Self {
        let anchor = fragment
            .filter(|f| !f.is_empty() && *f != "#")
            .and_then(|f| match anchor::decode(f) {
                Ok(anchor) => Some(anchor),
                Err(err) => {
                    debug!(fragment = f, %err, "ignoring malformed fragment");
                    None
                }
            });
        Self {
            path: path.to_string(),
            file_hash: FileHash::of(path),
            anchor,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Hash of this file's path, computed once per controller.
    pub fn file_hash(&self) -> FileHash {
        self.file_hash
    }

    pub fn state(&self, line: u32) -> LinkState {
        if self.current_line() == Some(line) {
            LinkState::Targeted
        } else {
            LinkState::Idle
        }
    }

    /// The targeted line among `lines`, if any.
    pub fn targeted<I>(&self, lines: I) -> Option<u32>
    where
        I: IntoIterator<Item = u32>,
    {
        lines
            .into_iter()
            .find(|&line| self.state(line) == LinkState::Targeted)
    }

    /// Clicking a targeted line clears the fragment; clicking any other line
    /// targets it instead.
    pub fn toggle(&self, line: u32) -> FragmentUpdate {
        match self.state(line) {
            LinkState::Targeted => FragmentUpdate::Clear,
            LinkState::Idle => FragmentUpdate::Set(anchor::encode(&self.path, line).to_string()),
        }
    }

    /// Scroll request when the target among `lines` differs from
    /// `previous`, i.e. a line has just become targeted.
    pub fn scroll_intent<I>(&self, previous: Option<u32>, lines: I) -> Option<ScrollIntent>
    where
        I: IntoIterator<Item = u32>,
    {
        let current = self.targeted(lines)?;
        if previous == Some(current) {
            return None;
        }
        debug!(path = %self.path, line = current, "requesting scroll to targeted line");
        Some(ScrollIntent { line: current })
    }

    /// Target the first candidate after the current target, wrapping
    /// around. `candidates` must be in ascending order.
    pub fn next_target(&self, candidates: &[u32]) -> Option<FragmentUpdate> {
        let current = self.current_line();
        let line = candidates
            .iter()
            .copied()
            .find(|&n| current.map_or(true, |c| n > c))
            .or_else(|| candidates.first().copied())?;
        Some(self.set(line))
    }

    /// Target the last candidate before the current target, wrapping
    /// around. `candidates` must be in ascending order.
    pub fn previous_target(&self, candidates: &[u32]) -> Option<FragmentUpdate> {
        let current = self.current_line();
        let line = candidates
            .iter()
            .rev()
            .copied()
            .find(|&n| current.map_or(true, |c| n < c))
            .or_else(|| candidates.last().copied())?;
        Some(self.set(line))
    }

    /// Line number of the anchor when it belongs to this file.
    fn current_line(&self) -> Option<u32> {
        self.anchor
            .filter(|a| a.file_hash == self.file_hash)
            .map(|a| a.line)
    }

    fn set(&self, line: u32) -> FragmentUpdate {
        FragmentUpdate::Set(anchor::encode(&self.path, line).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "src/lib.rs";

    fn fragment(line: u32) -> String {
        anchor::encode(PATH, line).to_string()
    }

    #[test]
    fn test_no_fragment_targets_nothing() {
        let ctl = DeepLinkController::new(PATH, None);
        assert_eq!(ctl.targeted(1..=10), None);
        assert_eq!(ctl.state(1), LinkState::Idle);
        assert_eq!(DeepLinkController::new(PATH, Some("#")).targeted(1..=10), None);
    }

    #[test]
    fn test_fragment_targets_line() {
        let f = fragment(4);
        let ctl = DeepLinkController::new(PATH, Some(&f));
        assert_eq!(ctl.state(4), LinkState::Targeted);
        assert_eq!(ctl.state(5), LinkState::Idle);
        assert_eq!(ctl.targeted(1..=10), Some(4));
        // Line outside the rendered list.
        assert_eq!(ctl.targeted(5..=10), None);
    }

    #[test]
    fn test_state_agrees_with_anchor_matches() {
        let path = "web/src/pages/RepoPage/CoverageTab/Summary.tsx";
        let f = anchor::encode(path, 250).to_string();
        let ctl = DeepLinkController::new(path, Some(&f));
        assert_eq!(ctl.file_hash(), anchor::FileHash::of(path));

        let decoded = anchor::decode(&f).unwrap();
        for line in 1..=5000 {
            let expected = anchor::matches(&decoded, path, line);
            assert_eq!(ctl.state(line) == LinkState::Targeted, expected, "line {line}");
        }
        assert_eq!(ctl.targeted(1..=5000), Some(250));
    }

    #[test]
    fn test_other_file_fragment_is_ignored() {
        let f = anchor::encode("src/other.rs", 4).to_string();
        let ctl = DeepLinkController::new(PATH, Some(&f));
        assert_eq!(ctl.targeted(1..=10), None);
    }

    #[test]
    fn test_malformed_fragment_is_ignored() {
        for bad in ["#nope", "#L12", "#0123456789abcdef-L0", "garbage-Lx"] {
            let ctl = DeepLinkController::new(PATH, Some(bad));
            assert_eq!(ctl.targeted(0..=20), None, "{bad}");
        }
    }

    #[test]
    fn test_toggle() {
        let idle = DeepLinkController::new(PATH, None);
        let update = idle.toggle(7);
        assert_eq!(update, FragmentUpdate::Set(fragment(7)));

        let f = update.into_fragment();
        let targeted = DeepLinkController::new(PATH, f.as_deref());
        assert_eq!(targeted.targeted(1..=10), Some(7));

        // Clicking another line moves the target.
        let moved = targeted.toggle(3).into_fragment();
        let ctl = DeepLinkController::new(PATH, moved.as_deref());
        assert_eq!(ctl.targeted(1..=10), Some(3));
        assert_eq!(ctl.state(7), LinkState::Idle);

        // Clicking the targeted line clears.
        assert_eq!(targeted.toggle(7), FragmentUpdate::Clear);
        let cleared = targeted.toggle(7).into_fragment();
        assert_eq!(
            DeepLinkController::new(PATH, cleared.as_deref()).state(7),
            LinkState::Idle
        );
    }

    #[test]
    fn test_scroll_intent_only_on_transition() {
        let f = fragment(5);
        let ctl = DeepLinkController::new(PATH, Some(&f));
        assert_eq!(ctl.scroll_intent(None, 1..=10), Some(ScrollIntent { line: 5 }));
        assert_eq!(ctl.scroll_intent(Some(2), 1..=10), Some(ScrollIntent { line: 5 }));
        assert_eq!(ctl.scroll_intent(Some(5), 1..=10), None);

        let idle = DeepLinkController::new(PATH, None);
        assert_eq!(idle.scroll_intent(Some(5), 1..=10), None);
    }

    #[test]
    fn test_next_and_previous_target() {
        let candidates = [3, 8, 12];
        let idle = DeepLinkController::new(PATH, None);
        assert_eq!(idle.next_target(&candidates), Some(FragmentUpdate::Set(fragment(3))));
        assert_eq!(
            idle.previous_target(&candidates),
            Some(FragmentUpdate::Set(fragment(12)))
        );

        let f = fragment(8);
        let at_8 = DeepLinkController::new(PATH, Some(&f));
        assert_eq!(at_8.next_target(&candidates), Some(FragmentUpdate::Set(fragment(12))));
        assert_eq!(
            at_8.previous_target(&candidates),
            Some(FragmentUpdate::Set(fragment(3)))
        );

        let f = fragment(12);
        let at_end = DeepLinkController::new(PATH, Some(&f));
        assert_eq!(at_end.next_target(&candidates), Some(FragmentUpdate::Set(fragment(3))));

        assert_eq!(idle.next_target(&[]), None);
    }
}
