//! Filter context for one render, populated from the page's query string.
//!
//! Accepted keys:
//!   flags, components, ignoredUploads   repeatable; `k=v`, `k[]=v`, `k[0]=v`
//!   covered, uncovered, partial         `true|false|1|0`
//!
//! Unknown keys and undecodable pairs are ignored.

use std::collections::BTreeSet;
use std::fmt::Write;

use tracing::debug;

use crate::model::{ComponentName, FlagName, LineState, UploadId};

/// Which computed states may be drawn with emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub covered: bool,
    pub uncovered: bool,
    pub partial: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            covered: true,
            uncovered: true,
            partial: true,
        }
    }
}

impl Visibility {
    /// `Blank` has no toggle and is always visible.
    #[must_use]
    pub fn allows(&self, state: LineState) -> bool {
        match state {
            LineState::Covered => self.covered,
            LineState::Uncovered => self.uncovered,
            LineState::Partial => self.partial,
            LineState::Blank => true,
        }
    }
}

/// Immutable snapshot of the page filters used for a single render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterContext {
    pub ignored_upload_ids: BTreeSet<UploadId>,
    pub visibility: Visibility,
    pub selected_flags: BTreeSet<FlagName>,
    pub selected_components: BTreeSet<ComponentName>,
}

const KEY_FLAGS: &str = "flags";
const KEY_COMPONENTS: &str = "components";
const KEY_IGNORED: &str = "ignoredUploads";

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ignored<I: IntoIterator<Item = S>, S: Into<UploadId>>(mut self, ids: I) -> Self {
        self.ignored_upload_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_flags<I: IntoIterator<Item = S>, S: Into<FlagName>>(mut self, flags: I) -> Self {
        self.selected_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_components<I: IntoIterator<Item = S>, S: Into<ComponentName>>(
        mut self,
        components: I,
    ) -> Self {
        self.selected_components
            .extend(components.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Build a context from a query string such as
    /// `?flags[0]=unit&covered=false`.
    pub fn from_query(query: &str) -> Self {
        let mut ctx = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let (Some(key), Some(value)) = (decode_component(raw_key), decode_component(raw_value))
            else {
                debug!(pair, "ignoring undecodable query parameter");
                continue;
            };

            match base_key(&key) {
                KEY_FLAGS => push_value(&mut ctx.selected_flags, value),
                KEY_COMPONENTS => push_value(&mut ctx.selected_components, value),
                KEY_IGNORED => push_value(&mut ctx.ignored_upload_ids, value),
                "covered" => set_toggle(&mut ctx.visibility.covered, &value),
                "uncovered" => set_toggle(&mut ctx.visibility.uncovered, &value),
                "partial" => set_toggle(&mut ctx.visibility.partial, &value),
                other => debug!(key = other, "ignoring unknown query parameter"),
            }
        }

        ctx
    }

    /// Canonical query string for this context, without the leading `?`.
    /// Visibility keys are only written when switched off.
    pub fn to_query(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (key, set) in [
            (KEY_FLAGS, &self.selected_flags),
            (KEY_COMPONENTS, &self.selected_components),
            (KEY_IGNORED, &self.ignored_upload_ids),
        ] {
            for (i, value) in set.iter().enumerate() {
                let mut part = String::new();
                write!(part, "{key}[{i}]={}", urlencoding::encode(value)).unwrap();
                parts.push(part);
            }
        }
        for (key, on) in [
            ("covered", self.visibility.covered),
            ("uncovered", self.visibility.uncovered),
            ("partial", self.visibility.partial),
        ] {
            if !on {
                parts.push(format!("{key}=false"));
            }
        }
        parts.join("&")
    }
}

/// Percent-decode one query component, treating `+` as a space.
fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// `flags[]` and `flags[3]` both address `flags`.
fn base_key(key: &str) -> &str {
    match key.find('[') {
        Some(idx) if key.ends_with(']') => &key[..idx],
        _ => key,
    }
}

fn push_value(set: &mut BTreeSet<String>, value: String) {
    if !value.is_empty() {
        set.insert(value);
    }
}

fn set_toggle(slot: &mut bool, value: &str) {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => *slot = true,
        "false" | "0" => *slot = false,
        other => debug!(value = other, "ignoring unparseable visibility toggle"),
    }
}
