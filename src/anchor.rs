//! Deep-link anchors: `(file path, line)` <-> URL fragment.
//!
//! Wire format: `#<hash>-L<line>`, where `<hash>` is the 64-bit FNV-1a hash
//! of the percent-encoded path written as 16 lowercase hex digits, e.g.
//! `#af63bd4c8601b7df-L42`. The separator is always `-`.
//!
//! With 64 bits, a page holding a few thousand distinct paths has a
//! collision probability on the order of 1e-13. [`ensure_distinct`] turns
//! that residual risk into an error for callers that want it checked.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{AnchorError, CovError, Result};

/// Number of hex digits in an encoded file hash.
pub const HASH_WIDTH: usize = 16;

const SEPARATOR: char = '-';
const LINE_MARKER: char = 'L';

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Fixed-width hash identifying a file within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHash(pub u64);

impl FileHash {
    /// Hash a repository path. Only the bytes of `path` matter.
    #[must_use]
    pub fn of(path: &str) -> Self {
        let encoded = urlencoding::encode(path);
        Self(fnv1a64(encoded.as_bytes()))
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.0, width = HASH_WIDTH)
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A specific line of a specific file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub file_hash: FileHash,
    pub line: u32,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}{SEPARATOR}{LINE_MARKER}{}", self.file_hash, self.line)
    }
}

impl FromStr for Anchor {
    type Err = AnchorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        decode(s)
    }
}

/// Anchor for `line` of the file at `path`.
#[must_use]
pub fn encode(path: &str, line: u32) -> Anchor {
    Anchor {
        file_hash: FileHash::of(path),
        line,
    }
}

/// Parse a fragment such as `#af63bd4c8601b7df-L42`. The leading `#` is
/// optional since some hosts strip it.
pub fn decode(fragment: &str) -> std::result::Result<Anchor, AnchorError> {
    let body = fragment.strip_prefix('#').unwrap_or(fragment);
    if body.is_empty() {
        return Err(AnchorError::MissingHash);
    }

    let (hash, line) = body
        .split_once(SEPARATOR)
        .ok_or(AnchorError::MissingLine)?;
    if hash.is_empty() {
        return Err(AnchorError::MissingHash);
    }
    if hash.len() != HASH_WIDTH
        || !hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(AnchorError::BadHash(hash.to_string()));
    }
    let file_hash = u64::from_str_radix(hash, 16)
        .map_err(|_| AnchorError::BadHash(hash.to_string()))?;

    let digits = line
        .strip_prefix(LINE_MARKER)
        .ok_or(AnchorError::MissingLine)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AnchorError::BadLine(digits.to_string()));
    }
    let line: u32 = digits
        .parse()
        .map_err(|_| AnchorError::BadLine(digits.to_string()))?;
    if line == 0 {
        return Err(AnchorError::ZeroLine);
    }

    Ok(Anchor {
        file_hash: FileHash(file_hash),
        line,
    })
}

/// Whether `anchor` designates `line` of `path`. Compares against a fresh
/// encoding so callers never depend on the hash layout.
#[must_use]
pub fn matches(anchor: &Anchor, path: &str, line: u32) -> bool {
    encode(path, line) == *anchor
}

/// Fail if two distinct paths on the same page share a file hash.
pub fn ensure_distinct<'a, I>(paths: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<FileHash, &str> = HashMap::new();
    for path in paths {
        let hash = FileHash::of(path);
        match seen.get(&hash) {
            Some(&other) if other != path => {
                return Err(CovError::HashCollision {
                    first: other.to_string(),
                    second: path.to_string(),
                });
            }
            _ => {
                seen.insert(hash, path);
            }
        }
    }
    Ok(())
}
