use std::path::Path;

use anyhow::Result;

use crate::package::MatchState;
use crate::package::matching::file_matching::match_trees;

use super::support::emit_json;

/// Compares `left` against `right` file-by-file. Succeeds iff every file under `left` has a
/// matching counterpart under `right` (`left` is a content subset of `right`).
pub fn run(left: &Path, right: &Path, json: bool) -> Result<bool> {
    let scratch = tempfile::tempdir()?;
    let conflicts = match_trees(left, right, scratch.path());

    let subset = conflicts.values().all(|state| *state == MatchState::Matching);

    if json {
        emit_json(&conflicts, None)?;
    } else {
        for (path, state) in &conflicts {
            match state {
                MatchState::Matching => log::debug!("{path}: matching"),
                MatchState::Different => log::warn!("{path}: different"),
                MatchState::NoCounterpart => log::warn!("{path}: no counterpart in {}", right.display()),
            }
        }
    }

    Ok(subset)
}
