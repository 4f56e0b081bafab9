//! Phase A of the repo-suggestion engine: candidate-enumeration methods that propose a repository
//! URL for one local archive. Each method never raises -- on failure to find anything it simply
//! contributes nothing to the result `Vec`.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::consts::{
    GITHUB_TOKEN_ENV_VAR_NAME, KNOWN_HOSTING_TEMPLATES, MAX_RETURNED_CODE_SEARCH_REPOS,
    NOT_GIT_REPO_EXTENSIONS, NOT_GIT_REPO_HINTS,
};
use crate::git::is_git_repo;
use crate::http::{extract_links, get_api_agent, is_url_accessible};
use crate::package::RemoteRepoSuggestion;
use crate::package::suggesting_repos::config::RepoSuggestionConfig;

fn project_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\d[\w.]*$").unwrap())
}

/// Derives a project base name from an archive basename: drop the trailing `-version` suffix, then
/// any trailing digits and a dangling dot. Falls back to `source_package_name` if the remainder
/// would be a pure version marker (e.g. empty or all-numeric).
pub fn project_name(archive_stem: &str, source_package_name: &str) -> String {
    let without_version = project_name_re().replace(archive_stem, "").into_owned();
    let trimmed = without_version
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .trim_end_matches('.')
        .to_string();

    if trimmed.is_empty() || trimmed.chars().all(|c| c.is_ascii_digit()) {
        source_package_name.to_string()
    } else {
        trimmed
    }
}

fn suggestion(
    repo_url: String,
    originating_spec_source: Option<String>,
    method_name: &str,
    confidence: f64,
) -> RemoteRepoSuggestion {
    RemoteRepoSuggestion {
        repo_url,
        originating_spec_source,
        method_name: method_name.to_string(),
        notes: None,
        confidence,
        commit_hash: None,
        tag: None,
    }
}

/// Rejects candidates with query/fragment, an empty path, a path component matching a "not a repo"
/// hint (`issues`, `blob`, `wiki`, ...), or a non-code last-segment extension, then falls back to a
/// cached `git ls-remote` probe.
pub fn is_plausible_git_repo(url: &Url) -> bool {
    if url.query().is_some() || url.fragment().is_some() {
        return false;
    }
    let Some(segments) = url.path_segments() else {
        return false;
    };
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return false;
    }
    if segments.iter().any(|s| NOT_GIT_REPO_HINTS.contains(&s.to_lowercase().as_str())) {
        return false;
    }
    let Some(last) = segments.last() else {
        return false;
    };
    let last_lower = last.to_lowercase();
    if NOT_GIT_REPO_EXTENSIONS.iter().any(|ext| last_lower.ends_with(ext)) {
        return false;
    }

    is_git_repo(url.as_str())
}

/// 1. Every declared URL whose lowercased text contains the project name and passes the git probe.
pub fn suggest_from_declared_urls(
    project: &str,
    declared_sources: &[String],
) -> Vec<RemoteRepoSuggestion> {
    let project_lower = project.to_lowercase();
    declared_sources
        .iter()
        .filter(|source| source.to_lowercase().contains(&project_lower))
        .filter_map(|source| Url::parse(source).ok().map(|u| (source, u)))
        .filter(|(_, url)| is_plausible_git_repo(url))
        .map(|(source, url)| suggestion(url.to_string(), Some(source.clone()), "from_declared_urls", 1.0))
        .collect()
}

/// 2. Scrape each reachable, project-related declared URL's page for `href` targets matching the
/// project name, and probe each as a repo.
pub fn suggest_from_scraped_links(
    project: &str,
    declared_sources: &[String],
) -> Vec<RemoteRepoSuggestion> {
    let project_lower = project.to_lowercase();
    let mut out = Vec::new();

    for source in declared_sources {
        if !source.to_lowercase().contains(&project_lower) {
            continue;
        }
        let Ok(url) = Url::parse(source) else { continue };
        if !is_url_accessible(&url) {
            continue;
        }
        let Ok(body) = crate::http::download_to_string(&url) else { continue };

        for link in extract_links(&body, &url) {
            let scheme_ok = matches!(link.scheme(), "git" | "http" | "https");
            if !scheme_ok || !link.as_str().to_lowercase().contains(&project_lower) {
                continue;
            }
            if is_plausible_git_repo(&link) {
                out.push(suggestion(
                    link.to_string(),
                    Some(source.clone()),
                    "from_scraped_links",
                    0.8,
                ));
            }
        }
    }

    out
}

/// 3. Fixed hosting templates (GitHub, GitLab, SourceForge, Savannah, plus any configured extras).
pub fn suggest_from_known_hostings(project: &str, config: &RepoSuggestionConfig) -> Vec<RemoteRepoSuggestion> {
    let mut out = Vec::new();

    for (_platform, template) in KNOWN_HOSTING_TEMPLATES.iter().map(|(p, t)| (p.to_string(), t.to_string())).chain(
        config
            .extra_hosting_templates
            .iter()
            .map(|(p, t)| (p.clone(), t.clone())),
    ) {
        let candidate = template.replace("{p}", project);
        let Ok(url) = Url::parse(&candidate) else { continue };
        if is_plausible_git_repo(&url) {
            out.push(suggestion(url.to_string(), None, "known_hostings", 0.6));
        }
    }

    out
}

#[derive(Debug, serde::Deserialize)]
struct CodeSearchResponse {
    items: Vec<CodeSearchItem>,
}

#[derive(Debug, serde::Deserialize)]
struct CodeSearchItem {
    html_url: String,
}

/// 4. GitHub's code-search API for the project name, keeping up to
/// [`MAX_RETURNED_CODE_SEARCH_REPOS`] results whose URL contains the project name.
pub fn suggest_from_code_search(project: &str, config: &RepoSuggestionConfig) -> Vec<RemoteRepoSuggestion> {
    let Some(base) = &config.code_search_api_base_url else {
        return Vec::new();
    };
    let query = format!("{base}?q={project}+in:name");
    let Ok(url) = Url::parse(&query) else { return Vec::new() };

    let agent = get_api_agent();
    let mut request = agent.get(url.as_str());
    if let Ok(token) = std::env::var(GITHUB_TOKEN_ENV_VAR_NAME) {
        if let Some(headers) = request.headers_mut() {
            if let Ok(value) = ureq::http::HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(ureq::http::HeaderName::from_static("authorization"), value);
            }
        }
    }

    let Ok(mut response) = request.call() else { return Vec::new() };
    let Ok(body) = response.body_mut().read_to_string() else { return Vec::new() };
    let Ok(parsed) = serde_json::from_str::<CodeSearchResponse>(&body) else { return Vec::new() };

    let project_lower = project.to_lowercase();
    parsed
        .items
        .into_iter()
        .filter(|item| item.html_url.to_lowercase().contains(&project_lower))
        .take(MAX_RETURNED_CODE_SEARCH_REPOS)
        .map(|item| suggestion(item.html_url, None, "code_search", 0.5))
        .collect()
}

/// 5. A package-metadata site's project page, deduplicated by lowercased URL with trailing `/` and
/// `.git` removed.
pub fn suggest_from_metadata_site(project: &str, config: &RepoSuggestionConfig) -> Vec<RemoteRepoSuggestion> {
    let Some(base) = &config.metadata_site_base_url else {
        return Vec::new();
    };
    let candidate = format!("{}/{project}", base.trim_end_matches('/'));
    let Ok(url) = Url::parse(&candidate) else { return Vec::new() };
    let Ok(body) = crate::http::download_to_string(&url) else { return Vec::new() };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for link in extract_links(&body, &url) {
        if !is_plausible_git_repo(&link) {
            continue;
        }
        let key = link
            .as_str()
            .to_lowercase()
            .trim_end_matches('/')
            .trim_end_matches(".git")
            .to_string();
        if !seen.insert(key) {
            continue;
        }
        out.push(suggestion(link.to_string(), None, "metadata_site", 0.5));
    }
    out
}

/// Runs every Phase A method in the declared fixed order and concatenates the results.
pub fn suggest_remote_repos(
    archive_stem: &str,
    source_package_name: &str,
    declared_sources: &[String],
    config: &RepoSuggestionConfig,
) -> Vec<RemoteRepoSuggestion> {
    let project = project_name(archive_stem, source_package_name);

    let mut results = Vec::new();
    results.extend(suggest_from_declared_urls(&project, declared_sources));
    results.extend(suggest_from_scraped_links(&project, declared_sources));
    results.extend(suggest_from_known_hostings(&project, config));
    results.extend(suggest_from_code_search(&project, config));
    results.extend(suggest_from_metadata_site(&project, config));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_strips_version_suffix() {
        assert_eq!(project_name("acl-2.3.1", "acl"), "acl");
        assert_eq!(project_name("foo-1.2.3-20230925", "foo"), "foo");
    }

    #[test]
    fn project_name_falls_back_to_package_name_for_pure_version() {
        assert_eq!(project_name("123", "acl"), "acl");
    }

    #[test]
    fn plausible_repo_rejects_query_and_issue_paths() {
        let with_query = Url::parse("https://github.com/foo/bar?tab=readme").unwrap();
        assert!(!is_plausible_git_repo(&with_query));

        let issues = Url::parse("https://github.com/foo/bar/issues").unwrap();
        assert!(!is_plausible_git_repo(&issues));

        let archive_ext = Url::parse("https://example.com/foo/bar.tar.gz").unwrap();
        assert!(!is_plausible_git_repo(&archive_ext));
    }

    #[test]
    fn declared_urls_method_filters_by_project_substring() {
        let sources = vec!["https://example.invalid/unrelated/repo".to_string()];
        let hits = suggest_from_declared_urls("acl", &sources);
        assert!(hits.is_empty());
    }

    #[test]
    fn known_hostings_produces_candidate_for_every_template() {
        // With no network, is_plausible_git_repo's final ls-remote probe will reject every
        // candidate, so we only assert the method doesn't panic and returns no false positives.
        let config = RepoSuggestionConfig::default();
        let hits = suggest_from_known_hostings("definitely-not-a-real-project-xyz123", &config);
        assert!(hits.is_empty());
    }
}
