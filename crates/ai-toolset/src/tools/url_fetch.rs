//! URL fetch tool for reading web pages.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Maximum body size accepted (2 MiB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Default number of characters returned.
const DEFAULT_MAX_LENGTH: i64 = 10_000;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; HomeAssistant/1.0)";

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Elements dropped before rendering page text.
const STRIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

/// Check if an IP address is private/internal (SSRF protection).
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private()
                || ipv4.is_loopback()
                // Link-local (169.254.0.0/16), includes cloud metadata services
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_documentation()
                // Shared address space (100.64.0.0/10)
                || (ipv4.octets()[0] == 100 && (ipv4.octets()[1] & 0xC0) == 64)
                || *ipv4 == Ipv4Addr::new(169, 254, 169, 254)
                || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6
                    .to_ipv4_mapped()
                    .map(|v4| is_private_ip(&IpAddr::V4(v4)))
                    .unwrap_or(false)
                // Unique local (fc00::/7)
                || (ipv6.segments()[0] & 0xFE00) == 0xFC00
                // Link-local (fe80::/10)
                || (ipv6.segments()[0] & 0xFFC0) == 0xFE80
        }
    }
}

/// Parse the URL and refuse hosts that resolve to internal addresses.
async fn validate_url_ssrf(url: &Url) -> Result<(), ToolError> {
    let host = url
        .host_str()
        .ok_or_else(|| ToolError::invalid("url", "URL must have a host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    let port = url.port_or_known_default().unwrap_or(80);

    let addrs = tokio::task::spawn_blocking(move || {
        (host.as_str(), port)
            .to_socket_addrs()
            .map(|iter| iter.collect::<Vec<_>>())
    })
    .await
    .map_err(|e| ToolError::ExecutionFailed(format!("DNS resolution task failed: {}", e)))?
    .map_err(|e| ToolError::Fetch(format!("failed to resolve hostname: {}", e)))?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(ToolError::invalid(
                "url",
                format!(
                    "URL resolves to private/internal IP address ({}). Access denied for security.",
                    addr.ip()
                ),
            ));
        }
    }

    Ok(())
}

/// First `max_chars` characters of `input`.
fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

fn element_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        STRIPPED_ELEMENTS
            .iter()
            .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok())
            .collect()
    })
}

fn title_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").ok())
        .as_ref()
}

fn meta_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?is)<meta\b[^>]*>").ok())
        .as_ref()
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let pattern = Regex::new(&format!(
        r#"(?is)\b{name}\s*=\s*(?:"([^"]*)"|'([^']*)')"#
    ))
    .ok()?;
    let captures = pattern.captures(tag)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_string())
}

/// Contents of the `<title>` element.
fn extract_title(html: &str) -> String {
    title_pattern()
        .and_then(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// `content` of `<meta name="description">`.
fn extract_description(html: &str) -> String {
    let Some(pattern) = meta_pattern() else {
        return String::new();
    };

    pattern
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|tag| {
            attribute(tag, "name")
                .map(|n| n.eq_ignore_ascii_case("description"))
                .unwrap_or(false)
        })
        .and_then(|tag| attribute(tag, "content"))
        .unwrap_or_default()
}

fn strip_elements(html: &str) -> String {
    element_patterns()
        .iter()
        .fold(html.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

/// Trim lines, split on double spaces and drop the empty pieces.
fn clean_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the readable text of an HTML page.
fn html_to_text(html: &str) -> Result<String, ToolError> {
    let stripped = strip_elements(html);
    let rendered = html2text::from_read(stripped.as_bytes(), 1000)
        .map_err(|e| ToolError::ExecutionFailed(format!("HTML parsing error: {}", e)))?;
    Ok(clean_whitespace(&rendered))
}

/// Where a redirect response points, resolved against the request URL.
///
/// `None` when the response is not a redirect or carries no `Location`.
fn redirect_target(current: &Url, response: &reqwest::Response) -> Result<Option<Url>, ToolError> {
    if !response.status().is_redirection() {
        return Ok(None);
    }

    let Some(location) = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|h| h.to_str().ok())
    else {
        return Ok(None);
    };

    let next = current
        .join(location)
        .map_err(|e| ToolError::Fetch(format!("invalid redirect location '{}': {}", location, e)))?;

    match next.scheme() {
        "http" | "https" => Ok(Some(next)),
        other => Err(ToolError::Fetch(format!("redirect to unsupported scheme '{}'", other))),
    }
}

/// Raw response of a fetch.
struct FetchedPage {
    content_type: String,
    body: String,
}

/// Tool that fetches a web page and extracts its readable text.
///
/// # Parameters
///
/// - `url` (required): `http://` or `https://` URL to fetch.
/// - `include_html` (optional, default: false): Also return the raw HTML.
/// - `max_length` (optional, default: 10000): Characters of text to return.
///
/// # Examples
///
/// ```json
/// {"url": "https://example.com"}
/// {"url": "https://docs.site/page", "include_html": true, "max_length": 2000}
/// ```
pub struct UrlFetch {
    client: reqwest::Client,
    allow_private: bool,
}

impl UrlFetch {
    /// Create a new url_fetch tool.
    pub fn new(allow_private: bool) -> Result<Self, ToolError> {
        // Redirects are followed in `fetch` so every hop gets the address check.
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            allow_private,
        })
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, ToolError> {
        let mut current = url.clone();
        let mut hops = 0;

        let response = loop {
            debug!("Fetching URL: {}", current);

            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| ToolError::Fetch(e.to_string()))?;

            let Some(next) = redirect_target(&current, &response)? else {
                break response;
            };

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(ToolError::Fetch(format!(
                    "too many redirects (max {})",
                    MAX_REDIRECTS
                )));
            }
            if !self.allow_private {
                validate_url_ssrf(&next).await?;
            }
            debug!("Following redirect {} -> {}", current, next);
            current = next;
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Fetch(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if let Some(length) = response.content_length() {
            if length as usize > MAX_BODY_BYTES {
                return Err(ToolError::Fetch(format!(
                    "content too large: {} bytes (max: {})",
                    length, MAX_BODY_BYTES
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::Fetch(e.to_string()))?;
        if bytes.len() > MAX_BODY_BYTES {
            return Err(ToolError::Fetch(format!(
                "content too large: {} bytes (max: {})",
                bytes.len(),
                MAX_BODY_BYTES
            )));
        }

        Ok(FetchedPage {
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[async_trait]
impl Tool for UrlFetch {
    fn name(&self) -> &str {
        "url_fetch"
    }

    fn description(&self) -> &str {
        "Fetch and extract content from a web page URL. \
         Returns the page title, text content, and metadata. \
         Useful for reading articles, documentation, or any web content."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The http(s) URL to fetch"},
                "include_html": {
                    "type": "boolean",
                    "description": "Also return the raw HTML",
                    "default": false
                },
                "max_length": {
                    "type": "integer",
                    "description": "Maximum number of characters of text to return",
                    "default": DEFAULT_MAX_LENGTH
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let url = args.get_string("url")?;
        let include_html = args.get_bool_opt("include_html")?.unwrap_or(false);
        let max_length = args.get_int_or("max_length", DEFAULT_MAX_LENGTH)?;
        if max_length < 0 {
            return Err(ToolError::invalid("max_length", "must not be negative"));
        }
        let max_length = max_length as usize;

        debug!("url_fetch: url={}, include_html={}", url, include_html);

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::invalid(
                "url",
                "URL must start with http:// or https://",
            ));
        }
        let parsed =
            Url::parse(&url).map_err(|e| ToolError::invalid("url", format!("Invalid URL: {}", e)))?;

        if !self.allow_private {
            validate_url_ssrf(&parsed).await?;
        }

        let page = match self.fetch(&parsed).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch URL {}: {}", url, e);
                return Err(e);
            }
        };

        let is_html = page.content_type.contains("text/html")
            || page.content_type.contains("application/xhtml");

        if !is_html {
            return Ok(ToolOutput::success(json!({
                "url": url,
                "content_type": page.content_type,
                "text": truncate_chars(&page.body, max_length),
                "length": page.body.chars().count(),
            })));
        }

        let text = html_to_text(&page.body)?;
        let mut output = ToolOutput::success(json!({
            "url": url,
            "title": extract_title(&page.body),
            "description": extract_description(&page.body),
            "text": truncate_chars(&text, max_length),
            "length": text.chars().count(),
        }));

        if include_html {
            output = output.with("html", truncate_chars(&page.body, max_length));
        }

        Ok(output)
    }
}
