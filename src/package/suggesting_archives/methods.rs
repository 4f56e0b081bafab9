//! Phase B of the archive-suggestion engine: methods that propose a remote archive URL for one
//! local archive, given the declared sources left over from Phase A. Each method never raises --
//! on failure to find anything it simply contributes nothing to the result `Vec`.

use url::Url;

use crate::fs::remove_archive_suffix;
use crate::http::is_url_accessible;
use crate::package::RemoteArchiveSuggestion;
use crate::package::suggesting_archives::config::SuggestionConfig;

fn suggestion(
    remote_archive: String,
    originating_spec_source: Option<String>,
    method_name: &str,
    notes: Option<String>,
    confidence: f64,
) -> RemoteArchiveSuggestion {
    RemoteArchiveSuggestion {
        remote_archive,
        originating_spec_source,
        method_name: method_name.to_string(),
        notes,
        confidence,
    }
}

/// 1. Exact basename appears in a declared source that is itself reachable.
fn suggest_exact_basename(local_basename: &str, declared_sources: &[String]) -> Vec<RemoteArchiveSuggestion> {
    declared_sources
        .iter()
        .filter(|source| source.contains(local_basename))
        .filter_map(|source| Url::parse(source).ok().map(|u| (source, u)))
        .filter(|(_, url)| is_url_accessible(url))
        .map(|(source, url)| {
            suggestion(
                url.to_string(),
                Some(source.clone()),
                "exact_basename",
                None,
                1.0,
            )
        })
        .collect()
}

/// 2. Split `name-version` on the last `-`; require both halves present in the declared source.
fn suggest_split_name_version(local_basename: &str, declared_sources: &[String]) -> Vec<RemoteArchiveSuggestion> {
    let stem = remove_archive_suffix(local_basename);
    let Some((name, version)) = stem.rsplit_once('-') else {
        return Vec::new();
    };

    declared_sources
        .iter()
        .filter(|source| source.contains(name) && source.contains(version))
        .filter_map(|source| Url::parse(source).ok().map(|u| (source, u)))
        .filter(|(_, url)| is_url_accessible(url))
        .map(|(source, url)| {
            suggestion(
                url.to_string(),
                Some(source.clone()),
                "split_name_version",
                None,
                1.0,
            )
        })
        .collect()
}

/// 3. An `ftp://` declared source rewritten to `https://`, if that's reachable.
fn suggest_ftp_to_https(_local_basename: &str, declared_sources: &[String]) -> Vec<RemoteArchiveSuggestion> {
    declared_sources
        .iter()
        .filter(|source| source.starts_with("ftp://"))
        .filter_map(|source| {
            let rewritten = format!("https://{}", source.trim_start_matches("ftp://"));
            let url = Url::parse(&rewritten).ok()?;
            Some((source, url))
        })
        .filter(|(_, url)| is_url_accessible(url))
        .map(|(source, url)| {
            suggestion(
                url.to_string(),
                Some(source.clone()),
                "ftp_to_https",
                None,
                1.0,
            )
        })
        .collect()
}

/// 4. Known hosting directories (from configuration) + the local basename.
fn suggest_known_urls(local_basename: &str, config: &SuggestionConfig) -> Vec<RemoteArchiveSuggestion> {
    config
        .known_urls
        .iter()
        .filter_map(|base| {
            let candidate = format!("{}/{local_basename}", base.trim_end_matches('/'));
            Url::parse(&candidate).ok()
        })
        .filter(is_url_accessible)
        .map(|url| suggestion(url.to_string(), None, "known_urls", None, 1.0))
        .collect()
}

/// 5. "Moved and recompressed": apply configured path substitutions to a matching declared
/// source, then try every known archive extension on the result.
fn suggest_moved_and_recompressed(
    local_basename: &str,
    declared_sources: &[String],
    config: &SuggestionConfig,
) -> Vec<RemoteArchiveSuggestion> {
    let stem = remove_archive_suffix(local_basename);
    let mut out = Vec::new();

    for source in declared_sources {
        for (from, to) in &config.moved_replacements {
            if !source.contains(from.as_str()) {
                continue;
            }
            let rewritten = source.replace(from.as_str(), to.as_str());
            for ext in crate::consts::SUPPORTED_ARCHIVE_TYPES {
                let candidate = format!("{}{ext}", remove_archive_suffix(&rewritten));
                let candidate = if candidate.ends_with(ext) {
                    candidate
                } else {
                    format!("{stem}{ext}")
                };
                if let Ok(url) = Url::parse(&candidate) {
                    if is_url_accessible(&url) {
                        out.push(suggestion(
                            url.to_string(),
                            Some(source.clone()),
                            "moved_and_recompressed",
                            None,
                            1.0,
                        ));
                        break;
                    }
                }
            }
        }
    }
    out
}

/// 6. Substitute the declared source host's first label with each configured alternative.
fn suggest_subdomain_substitution(
    _local_basename: &str,
    declared_sources: &[String],
    config: &SuggestionConfig,
) -> Vec<RemoteArchiveSuggestion> {
    let mut out = Vec::new();

    for source in declared_sources {
        let Ok(url) = Url::parse(source) else { continue };
        let Some(host) = url.host_str() else { continue };
        let mut labels: Vec<&str> = host.splitn(2, '.').collect();
        if labels.len() != 2 {
            continue;
        }

        for alt in &config.subdomains {
            labels[0] = alt;
            let new_host = labels.join(".");
            let mut candidate = url.clone();
            if candidate.set_host(Some(&new_host)).is_err() {
                continue;
            }
            if is_url_accessible(&candidate) {
                out.push(suggestion(
                    candidate.to_string(),
                    Some(source.clone()),
                    "subdomain_substitution",
                    None,
                    1.0,
                ));
            }
        }
    }
    out
}

/// Runs every Phase B method in the declared fixed order and concatenates the results.
pub fn suggest_remote_archives(
    local_basename: &str,
    declared_sources: &[String],
    config: &SuggestionConfig,
) -> Vec<RemoteArchiveSuggestion> {
    let mut results = Vec::new();
    results.extend(suggest_exact_basename(local_basename, declared_sources));
    results.extend(suggest_split_name_version(local_basename, declared_sources));
    results.extend(suggest_ftp_to_https(local_basename, declared_sources));
    results.extend(suggest_known_urls(local_basename, config));
    results.extend(suggest_moved_and_recompressed(local_basename, declared_sources, config));
    results.extend(suggest_subdomain_substitution(local_basename, declared_sources, config));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_basename_suggests_reachable_mock_url() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/acl-2.3.1.tar.gz").with_status(200).create();
        let url = format!("{}/acl-2.3.1.tar.gz", server.url());

        let sources = vec![url.clone()];
        let hits = suggest_exact_basename("acl-2.3.1.tar.gz", &sources);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].remote_archive, url);
        assert_eq!(hits[0].method_name, "exact_basename");
    }

    #[test]
    fn exact_basename_skips_unreachable_source() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/acl-2.3.1.tar.gz").with_status(404).create();
        let url = format!("{}/acl-2.3.1.tar.gz", server.url());

        let hits = suggest_exact_basename("acl-2.3.1.tar.gz", &[url]);
        assert!(hits.is_empty());
    }

    #[test]
    fn split_name_version_requires_both_halves() {
        let sources = vec!["https://example.invalid/dl/other-thing.tar.gz".to_string()];
        let hits = suggest_split_name_version("acl-2.3.1.tar.gz", &sources);
        assert!(hits.is_empty());
    }
}
