//! Archive-basename version parsing and release-tag matching.
//!
//! The archive basename encodes a version (and sometimes a date or commit hash) that we need to
//! line up against the upstream repository's tags. There's no crate in the ambient stack that
//! does sequence-similarity scoring (Python's `difflib`), so the tie-breaker is implemented here.

use std::sync::OnceLock;

use regex::Regex;

use crate::utils::remove_archive_suffix;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub version: Option<String>,
    pub date: Option<String>,
    pub suffix: Option<String>,
    pub is_commit_hash: bool,
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{8}$").unwrap())
}

fn commit_hash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{6,40}$").unwrap())
}

fn version_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d|[vr]\d)").unwrap())
}

fn np_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d[\w.]*)p(\d+)$").unwrap())
}

fn is_valid_date(segment: &str) -> bool {
    if !date_re().is_match(segment) {
        return false;
    }
    let year: u32 = segment[0..4].parse().unwrap_or(0);
    let month: u32 = segment[4..6].parse().unwrap_or(0);
    let day: u32 = segment[6..8].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day) && year >= 1000
}

fn is_commit_hash(segment: &str) -> bool {
    commit_hash_re().is_match(segment) && segment.chars().any(|c| c.is_ascii_hexdigit() && c.is_alphabetic())
}

fn is_version_start(segment: &str) -> bool {
    version_start_re().is_match(segment)
}

fn normalize_version(raw: &str) -> String {
    let stripped = raw.strip_prefix(['v', 'r']).unwrap_or(raw);
    stripped.replace(['.', '-'], "_")
}

/// Decomposes an archive basename into a [`VersionInfo`], peeling `-suffix` segments from the end
/// and classifying each as a date, commit hash, version, or free suffix. Stops as soon as a
/// version (or commit hash) is found, so segments further toward the front of the name never leak
/// into `suffix`.
pub fn extract_version_from_archive_name(archive_basename: &str) -> VersionInfo {
    let stem = remove_archive_suffix(archive_basename);

    let mut segments: Vec<&str> = stem.split('-').collect();
    let mut info = VersionInfo::default();

    while let Some(last) = segments.pop() {
        if is_valid_date(last) && info.date.is_none() {
            info.date = Some(last.to_string());
        } else if let Some(hash) = last.strip_prefix('g').filter(|h| is_commit_hash(h)) {
            // git-describe basenames (`glibc-2.42-21-g7a8f3c6ee4`) prefix the abbreviated hash
            // with a literal `g`.
            info.version = Some(hash.to_string());
            info.is_commit_hash = true;
            break;
        } else if is_commit_hash(last) {
            info.version = Some(last.to_string());
            info.is_commit_hash = true;
            break;
        } else if is_version_start(last) {
            info.version = Some(normalize_version(last));
            break;
        } else {
            info.suffix = Some(last.to_string());
        }

        if segments.is_empty() {
            break;
        }
    }

    // OpenSSH-portable-style `8.7p1` versions: split off the trailing `p<digits>` as a suffix.
    if let Some(version) = &info.version {
        let split = np_suffix_re()
            .captures(version)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()));
        if let Some((version, suffix)) = split {
            info.version = Some(version);
            info.suffix = Some(suffix);
        }
    }

    info
}

#[derive(Debug, Clone)]
pub struct TagInfo {
    pub commit_hash: String,
    pub tag: String,
}

/// Ratcliff/Obershelp similarity ratio (the algorithm behind Python's `difflib.SequenceMatcher`):
/// twice the total length of matching blocks, divided by the sum of both string lengths.
pub fn sequence_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matches = matching_blocks_length(&a, &b);
    (2.0 * matches as f64) / (a.len() + b.len()) as f64
}

fn matching_blocks_length(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (mut best_a, mut best_b, mut best_len) = (0, 0, 0);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut k = 0;
            while i + k < a.len() && j + k < b.len() && a[i + k] == b[j + k] {
                k += 1;
            }
            if k > best_len {
                best_len = k;
                best_a = i;
                best_b = j;
            }
        }
    }

    if best_len == 0 {
        return 0;
    }

    best_len + matching_blocks_length(&a[..best_a], &b[..best_b])
        + matching_blocks_length(&a[best_a + best_len..], &b[best_b + best_len..])
}

fn normalize_tag_for_compare(tag: &str) -> String {
    normalize_version(tag)
}

fn dotless(version: &str) -> String {
    // Remove trailing zero components except the last remaining one, then strip underscores.
    let mut parts: Vec<&str> = version.split('_').collect();
    while parts.len() > 1 && parts.last() == Some(&"0") {
        parts.pop();
    }
    parts.join("")
}

/// Finds the best tag matching `info`, trying progressively looser criteria, and breaking ties by
/// similarity to `archive_basename`.
pub fn verify_tag_exists(
    info: &VersionInfo,
    tags: &[TagInfo],
    archive_basename: &str,
) -> Option<TagInfo> {
    let Some(version) = &info.version else {
        return None;
    };
    let normalized_version = normalize_version(version);

    let candidates_for = |predicate: &dyn Fn(&TagInfo) -> bool| -> Vec<TagInfo> {
        tags.iter().filter(|t| predicate(t)).cloned().collect()
    };

    let tag_has_version = |t: &TagInfo| normalize_tag_for_compare(&t.tag).contains(&normalized_version);
    let tag_has_date = |t: &TagInfo| info.date.as_ref().is_some_and(|d| t.tag.contains(d.as_str()));
    let tag_has_suffix = |t: &TagInfo| info.suffix.as_ref().is_some_and(|s| t.tag.contains(s.as_str()));

    let strategies: Vec<Box<dyn Fn(&TagInfo) -> bool>> = vec![
        Box::new(move |t: &TagInfo| tag_has_version(t) && tag_has_date(t) && tag_has_suffix(t)),
        Box::new(move |t: &TagInfo| tag_has_version(t) && tag_has_date(t)),
        Box::new(move |t: &TagInfo| tag_has_version(t) && tag_has_suffix(t)),
        Box::new(move |t: &TagInfo| tag_has_version(t)),
    ];

    for strategy in &strategies {
        let candidates = candidates_for(strategy.as_ref());
        if let Some(best) = pick_best(candidates, archive_basename) {
            return Some(best);
        }
    }

    let dotless_version = dotless(&normalized_version);
    let candidates: Vec<TagInfo> = tags
        .iter()
        .filter(|t| dotless(&normalize_tag_for_compare(&t.tag)) == dotless_version)
        .cloned()
        .collect();
    pick_best(candidates, archive_basename)
}

fn pick_best(candidates: Vec<TagInfo>, archive_basename: &str) -> Option<TagInfo> {
    candidates.into_iter().max_by(|a, b| {
        let sim_a = sequence_similarity(&a.tag, archive_basename);
        let sim_b = sequence_similarity(&b.tag, archive_basename);
        sim_a.partial_cmp(&sim_b).unwrap_or(std::cmp::Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_version() {
        let info = extract_version_from_archive_name("acl-2.3.1.tar.gz");
        assert_eq!(info.version.as_deref(), Some("2_3_1"));
        assert!(!info.is_commit_hash);
        // breaks as soon as the version segment is found; "acl" never becomes a suffix
        assert_eq!(info.suffix, None);
    }

    #[test]
    fn extracts_git_describe_commit_hash() {
        let info = extract_version_from_archive_name("glibc-2.42-21-g7a8f3c6ee4.tar.xz");
        assert!(info.is_commit_hash);
        assert_eq!(info.version.as_deref(), Some("7a8f3c6ee4"));
    }

    #[test]
    fn extracts_version_with_date_suffix() {
        let info = extract_version_from_archive_name("foo-1.2.3-20230925.tar.gz");
        assert_eq!(info.version.as_deref(), Some("1_2_3"));
        assert_eq!(info.date.as_deref(), Some("20230925"));
    }

    #[test]
    fn extracts_commit_hash() {
        let info = extract_version_from_archive_name("foo-deadbeefcafe.tar.gz");
        assert!(info.is_commit_hash);
        assert_eq!(info.version.as_deref(), Some("deadbeefcafe"));
    }

    #[test]
    fn handles_np_suffix_pattern() {
        let info = extract_version_from_archive_name("expat-8.7p1.tar.gz");
        assert_eq!(info.version.as_deref(), Some("8_7"));
        assert_eq!(info.suffix.as_deref(), Some("1"));
    }

    #[test]
    fn similarity_of_identical_strings_is_one() {
        assert_eq!(sequence_similarity("abcdef", "abcdef"), 1.0);
    }

    #[test]
    fn similarity_of_disjoint_strings_is_zero() {
        assert_eq!(sequence_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn verify_tag_exists_prefers_full_match() {
        let info = VersionInfo {
            version: Some("2_3_1".to_string()),
            date: None,
            suffix: None,
            is_commit_hash: false,
        };
        let tags = vec![
            TagInfo { commit_hash: "a".into(), tag: "v2.3.1".into() },
            TagInfo { commit_hash: "b".into(), tag: "v2.3.10".into() },
        ];
        let best = verify_tag_exists(&info, &tags, "acl-2.3.1.tar.gz").unwrap();
        assert_eq!(best.tag, "v2.3.1");
    }
}
