//! Recursive file-tree comparison between a local archive's contents and a candidate upstream's.
//!
//! Single-file comparison has three tiers: archives recurse into their own contents, a small set
//! of binary extensions get a byte compare, and everything else is compared as date-agnostic text.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use fs_err as fs;
use regex::Regex;

use crate::consts::{BINARY_FILE_TYPES, SUPPORTED_ARCHIVE_TYPES};
use crate::fs::secure_extract_archive;
use crate::package::MatchState;
use crate::utils::generate_random_string;

fn date_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{2}/\d{2}/\d{4}|\d{2}-\d{2}-\d{4}|\d{4}/\d{2}/\d{2}|\d{4}-\d{2}-\d{2})\b").unwrap()
    })
}

fn has_suffix(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| name.ends_with(s))
}

/// Replaces every date-shaped substring with `token`, so two files that differ only in an
/// embedded build date still compare equal once the same token is applied to both sides.
fn date_agnostic_text(text: &str, token: &str) -> String {
    date_pattern_re().replace_all(text, token).into_owned()
}

fn read_text_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes.clone()) {
        Ok(text) => Ok(text),
        Err(_) => {
            // UTF-16 is the only other encoding the ambient stack can decode without pulling in a
            // dedicated charset-detection crate; anything else falls back to a lossy decode.
            if bytes.len() % 2 == 0 && !bytes.is_empty() {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                if let Ok(text) = String::from_utf16(&units) {
                    return Ok(text);
                }
            }
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn bytes_equal(left: &Path, right: &Path) -> bool {
    match (fs::read(left), fs::read(right)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Compares one file pair, recursing into archive contents and falling back to a binary compare
/// when extraction of either side fails.
fn compare_single_file(left: &Path, right: &Path, left_name: &str, scratch: &Path) -> MatchState {
    if !right.exists() {
        return MatchState::NoCounterpart;
    }
    if left.is_dir() != right.is_dir() {
        return MatchState::Different;
    }
    if left.is_dir() {
        let nested = match_trees(left, right, scratch);
        return if nested.values().all(|s| *s == MatchState::Matching) {
            MatchState::Matching
        } else {
            MatchState::Different
        };
    }

    if has_suffix(left_name, SUPPORTED_ARCHIVE_TYPES) {
        if bytes_equal(left, right) {
            return MatchState::Matching;
        }

        let left_bytes = fs::read(left).ok();
        let right_bytes = fs::read(right).ok();
        let left_dest = scratch.join("left");
        let right_dest = scratch.join("right");

        let left_extracted = left_bytes
            .as_deref()
            .and_then(|b| secure_extract_archive(b, &left_dest).ok())
            .is_some();
        let right_extracted = right_bytes
            .as_deref()
            .and_then(|b| secure_extract_archive(b, &right_dest).ok())
            .is_some();

        return match (left_extracted, right_extracted) {
            (true, true) => {
                let nested = match_trees(&left_dest, &right_dest, &scratch.join("nested"));
                if nested.values().all(|s| *s == MatchState::Matching) {
                    MatchState::Matching
                } else {
                    MatchState::Different
                }
            }
            (false, false) => {
                if bytes_equal(left, right) {
                    MatchState::Matching
                } else {
                    MatchState::Different
                }
            }
            _ => MatchState::Different,
        };
    }

    if has_suffix(left_name, BINARY_FILE_TYPES) {
        return if bytes_equal(left, right) {
            MatchState::Matching
        } else {
            MatchState::Different
        };
    }

    match (read_text_lossy(left), read_text_lossy(right)) {
        (Ok(a), Ok(b)) => {
            let token = generate_random_string(16);
            if date_agnostic_text(&a, &token) == date_agnostic_text(&b, &token) {
                MatchState::Matching
            } else {
                MatchState::Different
            }
        }
        _ => MatchState::Different,
    }
}

/// Walks `left` recursively, comparing every file it finds against its counterpart under `right`
/// at the same relative path. `scratch` holds per-call extraction staging for nested archives.
pub fn match_trees(left: &Path, right: &Path, scratch: &Path) -> HashMap<String, MatchState> {
    let mut conflicts = HashMap::new();

    let Ok(files) = crate::fs::list_files_recursive(left) else {
        return conflicts;
    };

    for (index, relative) in files.iter().enumerate() {
        let left_path = left.join(relative);
        let right_path = right.join(relative);
        let name = relative.to_string_lossy().into_owned();
        let entry_scratch = scratch.join(format!("entry-{index}"));

        let state = compare_single_file(&left_path, &right_path, &name, &entry_scratch);
        conflicts.insert(name, state);
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_files_match() {
        let tmp = tempfile::tempdir().unwrap();
        let left = tmp.path().join("left");
        let right = tmp.path().join("right");
        fs::create_dir_all(&left).unwrap();
        fs::create_dir_all(&right).unwrap();
        fs::write(left.join("a.txt"), "hello world").unwrap();
        fs::write(right.join("a.txt"), "hello world").unwrap();

        let scratch = tmp.path().join("scratch");
        let conflicts = match_trees(&left, &right, &scratch);
        assert_eq!(conflicts.get("a.txt"), Some(&MatchState::Matching));
    }

    #[test]
    fn missing_counterpart_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let left = tmp.path().join("left");
        let right = tmp.path().join("right");
        fs::create_dir_all(&left).unwrap();
        fs::create_dir_all(&right).unwrap();
        fs::write(left.join("only-left.txt"), "x").unwrap();

        let scratch = tmp.path().join("scratch");
        let conflicts = match_trees(&left, &right, &scratch);
        assert_eq!(conflicts.get("only-left.txt"), Some(&MatchState::NoCounterpart));
    }

    #[test]
    fn date_only_difference_still_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let left = tmp.path().join("left");
        let right = tmp.path().join("right");
        fs::create_dir_all(&left).unwrap();
        fs::create_dir_all(&right).unwrap();
        fs::write(left.join("changelog.txt"), "released on 2024-01-05").unwrap();
        fs::write(right.join("changelog.txt"), "released on 2024-02-09").unwrap();

        let scratch = tmp.path().join("scratch");
        let conflicts = match_trees(&left, &right, &scratch);
        assert_eq!(conflicts.get("changelog.txt"), Some(&MatchState::Matching));
    }

    #[test]
    fn genuinely_different_text_differs() {
        let tmp = tempfile::tempdir().unwrap();
        let left = tmp.path().join("left");
        let right = tmp.path().join("right");
        fs::create_dir_all(&left).unwrap();
        fs::create_dir_all(&right).unwrap();
        fs::write(left.join("a.txt"), "version one").unwrap();
        fs::write(right.join("a.txt"), "version two").unwrap();

        let scratch = tmp.path().join("scratch");
        let conflicts = match_trees(&left, &right, &scratch);
        assert_eq!(conflicts.get("a.txt"), Some(&MatchState::Different));
    }
}
