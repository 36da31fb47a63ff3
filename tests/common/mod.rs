use std::path::PathBuf;

use covlines::model::{CoverageFact, SourceLine};
use tempfile::TempDir;

/// Write `json` to a payload file in a fresh temporary directory, returning
/// the dir handle and file path. The caller must hold onto `TempDir` to keep
/// the temp directory alive.
#[allow(dead_code)]
pub fn write_payload(json: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.json");
    std::fs::write(&path, json).unwrap();
    (dir, path)
}

/// An instrumented line hit by `uploads`.
#[allow(dead_code)]
pub fn hit_line(number: u32, uploads: &[&str]) -> SourceLine {
    SourceLine::new(number, Some(CoverageFact::new(uploads.iter().copied())))
}
