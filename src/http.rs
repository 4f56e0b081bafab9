use std::io::{BufReader, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use std::{fs, io};

use scraper::{Html, Selector};
use ureq::Agent;
use ureq::http::{HeaderName, HeaderValue};
use ureq::tls::{RootCerts, TlsConfig};
use url::Url;

use crate::consts::{API_TIMEOUT_SECONDS, DEFAULT_SOCKET_TIMEOUT_SECONDS, PROBE_TIMEOUT_SECONDS};

fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .tls_config(
            TlsConfig::builder()
                .root_certs(RootCerts::PlatformVerifier)
                .build(),
        )
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

/// Agent used for ordinary downloads, with the socket timeout sized by `PVT_SOCKET_TIMEOUT_SECONDS`
/// (default [`DEFAULT_SOCKET_TIMEOUT_SECONDS`]).
pub fn get_agent() -> Agent {
    build_agent(Duration::from_secs(crate::utils::socket_timeout_seconds()))
}

/// Agent used for reachability probes, where a slow/hanging host should fail fast rather than
/// stall the whole suggestion pipeline.
pub(crate) fn get_probe_agent() -> Agent {
    build_agent(Duration::from_secs(PROBE_TIMEOUT_SECONDS))
}

/// Agent used for GitHub/Repology API calls, which get a little more slack than a raw reachability
/// probe but still shouldn't be allowed to hang the process.
pub(crate) fn get_api_agent() -> Agent {
    build_agent(Duration::from_secs(API_TIMEOUT_SECONDS))
}

/// Downloads a remote content to the given writer.
/// Returns the number of bytes written to the writer, 0 for a 404 or an empty 200
pub fn download<W: Write>(
    url: &Url,
    writer: &mut W,
    headers: Vec<(&str, String)>,
) -> Result<u64, HttpError> {
    download_with_agent(&get_agent(), url, writer, headers)
}

fn download_with_agent<W: Write>(
    agent: &Agent,
    url: &Url,
    writer: &mut W,
    headers: Vec<(&str, String)>,
) -> Result<u64, HttpError> {
    let mut request_builder = agent.get(url.as_str());

    {
        let req_headers = request_builder.headers_mut().unwrap();
        for (key, val) in headers {
            req_headers.insert(
                HeaderName::from_bytes(key.as_bytes()).unwrap(),
                HeaderValue::from_str(val.as_str()).expect("Invalid header value"),
            );
        }
    }
    log::trace!("Starting download of file from {url}");
    let start_time = Instant::now();

    match request_builder.call() {
        Ok(mut res) => {
            let mut reader = BufReader::new(res.body_mut().with_config().reader());
            let out = std::io::copy(&mut reader, writer).map_err(|e| HttpError {
                url: url.to_string(),
                source: HttpErrorKind::Io(e),
            });
            log::debug!(
                "Downloaded from {url} in {}ms",
                start_time.elapsed().as_millis()
            );
            out
        }
        Err(e) => match e {
            ureq::Error::StatusCode(code) => Err(HttpError {
                url: url.to_string(),
                source: HttpErrorKind::Http(code),
            }),
            _ => Err(HttpError {
                url: url.to_string(),
                source: HttpErrorKind::Ureq(Box::new(e)),
            }),
        },
    }
}

/// Downloads a file from URL and saves it to the given path
pub fn download_to_file(url: &Url, path: &Path) -> Result<(), HttpError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| HttpError::from_io(url.as_str(), e))?;
    }
    let mut file = fs::File::create(path).map_err(|e| HttpError::from_io(url.as_str(), e))?;
    download(url, &mut file, vec![])?;
    Ok(())
}

/// Downloads a URL fully into memory. Used for the small JSON/HTML responses the suggestion
/// pipeline deals with (API payloads, declared-source HTML pages), never for archive bodies.
pub fn download_to_string(url: &Url) -> Result<String, HttpError> {
    let mut buffer = Vec::new();
    download_with_agent(&get_api_agent(), url, &mut buffer, vec![])?;
    String::from_utf8(buffer).map_err(|e| HttpError {
        url: url.to_string(),
        source: HttpErrorKind::Io(io::Error::new(io::ErrorKind::InvalidData, e)),
    })
}

/// Is `url` reachable, and does the final resolved URL still plausibly point at the same resource?
///
/// A 2xx/3xx-only check would accept a redirect to an unrelated landing page (many forges 302
/// dead project URLs to their homepage). We additionally require the final URL's basename to
/// still contain the original URL's basename -- true for GitHub's archive-to-codeload redirects,
/// false for a redirect into a generic "not found" page.
pub fn is_url_accessible(url: &Url) -> bool {
    let agent = get_probe_agent();
    let response = match agent.get(url.as_str()).call() {
        Ok(res) => res,
        Err(ureq::Error::StatusCode(code)) if (300..400).contains(&code) => return true,
        Err(_) => return false,
    };

    let status = response.status().as_u16();
    if !(200..400).contains(&status) {
        return false;
    }

    let final_url = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(url.as_str());

    let original_basename = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or("");

    if original_basename.is_empty() {
        return true;
    }

    final_url.contains(original_basename)
}

/// Extracts every `<a href>` link from an HTML page, resolved against `base_url` when relative.
/// Used to scan declared-source pages and package metadata sites for repository hints.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");

    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base_url.join(href).ok())
        .collect()
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to download file from `{url}`")]
#[non_exhaustive]
pub struct HttpError {
    pub url: String,
    pub source: HttpErrorKind,
}

impl HttpError {
    pub(crate) fn from_io(url: &str, e: io::Error) -> Self {
        Self {
            url: url.to_string(),
            source: HttpErrorKind::Io(e),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.source, HttpErrorKind::Http(404))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpErrorKind {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ureq(#[from] Box<ureq::Error>),
    #[error("Nothing found at URL")]
    Empty,
    #[error("HTTP error code: {0}")]
    Http(u16),
}

pub trait HttpDownload {
    /// Downloads a file to the given writer and returns how many bytes were read
    fn download<W: Write>(
        &self,
        url: &Url,
        writer: &mut W,
        headers: Vec<(&str, String)>,
    ) -> Result<u64, HttpError>;
}

pub struct Http;

impl HttpDownload for Http {
    fn download<W: Write>(
        &self,
        url: &Url,
        writer: &mut W,
        headers: Vec<(&str, String)>,
    ) -> Result<u64, HttpError> {
        let bytes_read = download(url, writer, headers)?;
        if bytes_read == 0 {
            Err(HttpError {
                url: url.to_string(),
                source: HttpErrorKind::Empty,
            })
        } else {
            Ok(bytes_read)
        }
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    #[test]
    fn mock_download_with_no_header() {
        let mut server = mockito::Server::new();
        let mock_url = server.url();
        let mock_endpoint = server
            .mock("GET", "/file.txt")
            .with_status(200)
            .with_header("Content-Type", "text/plain")
            .with_body("Mock file content")
            .create();

        let url = format!("{mock_url}/file.txt");
        let mut writer = std::io::Cursor::new(Vec::new());

        let result = super::download(&Url::parse(&url).unwrap(), &mut writer, Vec::new());
        assert!(result.is_ok());
        mock_endpoint.assert();
        assert_eq!(writer.into_inner(), b"Mock file content".to_vec());
    }

    #[test]
    fn mock_download_with_header() {
        let mut server = mockito::Server::new();
        let mock_url = server.url();
        let mock_endpoint = server
            .mock("GET", "/file.txt")
            .with_status(200)
            .with_header("Content-Type", "text/plain")
            .with_body("Mock file content")
            .create();

        let url = format!("{mock_url}/file.txt");
        let mut writer = std::io::Cursor::new(Vec::new());
        let headers = vec![("custom-header", "custom-value".to_string())];

        let result = super::download(&Url::parse(&url).unwrap(), &mut writer, headers);
        assert!(result.is_ok());
        mock_endpoint.assert();
        assert_eq!(writer.into_inner(), b"Mock file content".to_vec());
    }

    #[test]
    fn accessible_url_accepts_plain_200() {
        let mut server = mockito::Server::new();
        let mock_url = server.url();
        server
            .mock("GET", "/pkg-1.0.tar.gz")
            .with_status(200)
            .create();

        let url = Url::parse(&format!("{mock_url}/pkg-1.0.tar.gz")).unwrap();
        assert!(super::is_url_accessible(&url));
    }

    #[test]
    fn accessible_url_rejects_404() {
        let mut server = mockito::Server::new();
        let mock_url = server.url();
        server
            .mock("GET", "/pkg-1.0.tar.gz")
            .with_status(404)
            .create();

        let url = Url::parse(&format!("{mock_url}/pkg-1.0.tar.gz")).unwrap();
        assert!(!super::is_url_accessible(&url));
    }

    #[test]
    fn extracts_relative_and_absolute_links() {
        let base = Url::parse("https://example.com/project/").unwrap();
        let html = r#"<html><body>
            <a href="https://github.com/foo/bar">repo</a>
            <a href="../download/pkg.tar.gz">download</a>
        </body></html>"#;

        let links = super::extract_links(html, &base);
        assert!(links.iter().any(|u| u.as_str() == "https://github.com/foo/bar"));
        assert!(links.iter().any(|u| u.as_str().ends_with("download/pkg.tar.gz")));
    }
}
