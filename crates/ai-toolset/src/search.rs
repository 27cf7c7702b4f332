//! Multi-provider web search.
//!
//! [`SearchDispatcher`] picks one of the configured providers (Google Custom
//! Search, Kagi, Bing), issues exactly one HTTP request and maps the
//! provider-specific payload into [`SearchResultItem`]s. There is no retry and
//! no pagination.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ToolsetConfig;
use crate::error::ToolError;

const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const KAGI_ENDPOINT: &str = "https://kagi.com/api/v0/search";
const BING_WEB_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";
const BING_IMAGE_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/images/search";

/// Providers in resolution priority order.
const PRIORITY: [SearchEngine; 3] = [SearchEngine::Google, SearchEngine::Kagi, SearchEngine::Bing];

/// A supported search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEngine {
    Google,
    Kagi,
    Bing,
}

impl SearchEngine {
    /// Identifier used in arguments and results.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::Kagi => "kagi",
            SearchEngine::Bing => "bing",
        }
    }

    /// Human-readable provider name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            SearchEngine::Google => "Google",
            SearchEngine::Kagi => "Kagi",
            SearchEngine::Bing => "Bing",
        }
    }

    /// Largest result count the provider accepts for one request.
    fn result_cap(&self, search_type: SearchType) -> Option<usize> {
        match (self, search_type) {
            (SearchEngine::Google, _) => Some(10),
            (SearchEngine::Bing, SearchType::Text) => Some(50),
            (SearchEngine::Bing, SearchType::Image) => Some(150),
            (SearchEngine::Kagi, _) => None,
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchEngine {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(SearchEngine::Google),
            "kagi" => Ok(SearchEngine::Kagi),
            "bing" => Ok(SearchEngine::Bing),
            _ => Err(ToolError::UnknownEngine(s.to_string())),
        }
    }
}

/// Kind of results requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    Text,
    Image,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Text => "text",
            SearchType::Image => "image",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "web" => Ok(SearchType::Text),
            "image" | "images" => Ok(SearchType::Image),
            _ => Err(ToolError::invalid(
                "search_type",
                format!("expected 'text' or 'image', got '{}'", s),
            )),
        }
    }
}

/// One normalized search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl SearchResultItem {
    fn text(title: String, url: String, snippet: String) -> Self {
        Self {
            title,
            url,
            snippet,
            image_url: None,
            thumbnail_url: None,
        }
    }
}

/// Provider credentials.
#[derive(Debug, Clone, Default)]
pub struct SearchCredentials {
    pub google_api_key: Option<String>,
    pub google_cx: Option<String>,
    pub kagi_api_key: Option<String>,
    pub bing_api_key: Option<String>,
}

impl SearchCredentials {
    /// Take the credentials out of a toolset configuration.
    pub fn from_config(config: &ToolsetConfig) -> Self {
        Self {
            google_api_key: config.google_api_key.clone(),
            google_cx: config.google_cx.clone(),
            kagi_api_key: config.kagi_api_key.clone(),
            bing_api_key: config.bing_api_key.clone(),
        }
    }

    /// Whether the provider's primary key is present.
    fn has_key(&self, engine: SearchEngine) -> bool {
        let key = match engine {
            SearchEngine::Google => &self.google_api_key,
            SearchEngine::Kagi => &self.kagi_api_key,
            SearchEngine::Bing => &self.bing_api_key,
        };
        non_empty(key).is_some()
    }
}

/// Provider endpoint URLs. Overridable so tests can point at a mock server.
#[derive(Debug, Clone)]
pub struct SearchEndpoints {
    pub google: String,
    pub kagi: String,
    pub bing_web: String,
    pub bing_image: String,
}

impl Default for SearchEndpoints {
    fn default() -> Self {
        Self {
            google: GOOGLE_ENDPOINT.to_string(),
            kagi: KAGI_ENDPOINT.to_string(),
            bing_web: BING_WEB_ENDPOINT.to_string(),
            bing_image: BING_IMAGE_ENDPOINT.to_string(),
        }
    }
}

/// A search request after argument parsing.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub search_type: SearchType,
    pub engine: Option<SearchEngine>,
    pub max_results: usize,
}

/// Results of one dispatched search.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub engine: SearchEngine,
    pub results: Vec<SearchResultItem>,
}

/// Resolves a provider and performs the search.
pub struct SearchDispatcher {
    client: reqwest::Client,
    credentials: SearchCredentials,
    endpoints: SearchEndpoints,
}

impl SearchDispatcher {
    /// Create a dispatcher with the default public endpoints.
    pub fn new(credentials: SearchCredentials, timeout: Duration) -> Result<Self, ToolError> {
        Self::with_endpoints(credentials, SearchEndpoints::default(), timeout)
    }

    /// Create a dispatcher with explicit endpoints.
    pub fn with_endpoints(
        credentials: SearchCredentials,
        endpoints: SearchEndpoints,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .user_agent("HomeAssistant-AIToolset/1.0")
            .timeout(timeout)
            .build()?;

        let configured: Vec<&str> = PRIORITY
            .iter()
            .filter(|e| credentials.has_key(**e))
            .map(|e| e.as_str())
            .collect();
        info!("Search dispatcher initialized, configured engines: {:?}", configured);

        Ok(Self {
            client,
            credentials,
            endpoints,
        })
    }

    /// Pick the engine for a request.
    ///
    /// An explicit engine wins; otherwise the first provider in priority
    /// order whose key is present.
    pub fn resolve_engine(&self, requested: Option<SearchEngine>) -> Result<SearchEngine, ToolError> {
        if let Some(engine) = requested {
            return Ok(engine);
        }

        PRIORITY
            .iter()
            .copied()
            .find(|engine| self.credentials.has_key(*engine))
            .ok_or_else(|| ToolError::NotConfigured("No search engine configured".to_string()))
    }

    /// Run a search against the resolved provider.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ToolError> {
        let engine = self.resolve_engine(query.engine)?;
        let mut count = query.max_results.max(1);
        if let Some(cap) = engine.result_cap(query.search_type) {
            count = count.min(cap);
        }

        debug!(
            "Searching {} ({}) for '{}' with {} results",
            engine, query.search_type, query.query, count
        );

        let request = self.build_request(engine, &query.query, query.search_type, count)?;
        let payload = self.send(engine, request).await?;

        let results = match engine {
            SearchEngine::Google => map_google(&payload, query.search_type),
            SearchEngine::Kagi => map_kagi(&payload, query.search_type),
            SearchEngine::Bing => map_bing(&payload, query.search_type),
        };

        debug!("{} returned {} results", engine.label(), results.len());
        Ok(SearchResponse { engine, results })
    }

    /// Build the provider request, checking credentials first.
    fn build_request(
        &self,
        engine: SearchEngine,
        query: &str,
        search_type: SearchType,
        count: usize,
    ) -> Result<reqwest::RequestBuilder, ToolError> {
        let count = count.to_string();

        match engine {
            SearchEngine::Google => {
                let (key, cx) = match (
                    non_empty(&self.credentials.google_api_key),
                    non_empty(&self.credentials.google_cx),
                ) {
                    (Some(key), Some(cx)) => (key, cx),
                    _ => {
                        return Err(ToolError::NotConfigured(
                            "Google API key and CX are required".to_string(),
                        ))
                    }
                };

                let mut params = vec![("key", key), ("cx", cx), ("q", query), ("num", &count)];
                if search_type == SearchType::Image {
                    params.push(("searchType", "image"));
                }
                Ok(self.client.get(&self.endpoints.google).query(&params))
            }
            SearchEngine::Kagi => {
                let key = non_empty(&self.credentials.kagi_api_key).ok_or_else(|| {
                    ToolError::NotConfigured("Kagi API key is required".to_string())
                })?;

                Ok(self
                    .client
                    .get(&self.endpoints.kagi)
                    .header(AUTHORIZATION, format!("Bot {}", key))
                    .query(&[("q", query), ("limit", &count)]))
            }
            SearchEngine::Bing => {
                let key = non_empty(&self.credentials.bing_api_key).ok_or_else(|| {
                    ToolError::NotConfigured("Bing API key is required".to_string())
                })?;

                let endpoint = match search_type {
                    SearchType::Text => &self.endpoints.bing_web,
                    SearchType::Image => &self.endpoints.bing_image,
                };

                Ok(self
                    .client
                    .get(endpoint)
                    .header("Ocp-Apim-Subscription-Key", key)
                    .query(&[("q", query), ("count", &count)]))
            }
        }
    }

    async fn send(
        &self,
        engine: SearchEngine,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ToolError> {
        let search_failed = format!("{} search", engine.label());

        let response = request.send().await.map_err(|e| {
            warn!("{} request failed: {}", search_failed, e);
            ToolError::upstream(&search_failed, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned status {}", search_failed, status);
            return Err(ToolError::upstream(search_failed, format!("HTTP {}", status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ToolError::upstream(search_failed, format!("invalid response body: {}", e)))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn str_field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn items<'a>(payload: &'a Value, pointer: &str) -> &'a [Value] {
    payload
        .pointer(pointer)
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// Map a Google Custom Search payload (`items[]`).
pub fn map_google(payload: &Value, search_type: SearchType) -> Vec<SearchResultItem> {
    items(payload, "/items")
        .iter()
        .map(|item| {
            let link = str_field(item, "link");
            let mut result =
                SearchResultItem::text(str_field(item, "title"), link.clone(), str_field(item, "snippet"));
            if search_type == SearchType::Image {
                result.image_url = Some(link).filter(|l| !l.is_empty());
                result.thumbnail_url = item
                    .pointer("/image/thumbnailLink")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
            }
            result
        })
        .collect()
}

/// Map a Kagi payload (`data[]`). Related-search entries (`t == 1`) are skipped.
pub fn map_kagi(payload: &Value, search_type: SearchType) -> Vec<SearchResultItem> {
    items(payload, "/data")
        .iter()
        .filter(|item| item.get("t").and_then(|t| t.as_i64()) != Some(1))
        .map(|item| {
            let url = str_field(item, "url");
            let mut result =
                SearchResultItem::text(str_field(item, "title"), url.clone(), str_field(item, "snippet"));
            if search_type == SearchType::Image {
                let thumbnail = match item.get("thumbnail") {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Object(obj)) => {
                        obj.get("url").and_then(|v| v.as_str()).map(str::to_string)
                    }
                    _ => None,
                };
                if let Some(thumbnail) = thumbnail {
                    result.image_url = Some(url);
                    result.thumbnail_url = Some(thumbnail);
                }
            }
            result
        })
        .collect()
}

/// Map a Bing payload (`webPages.value[]` for text, `value[]` for images).
pub fn map_bing(payload: &Value, search_type: SearchType) -> Vec<SearchResultItem> {
    match search_type {
        SearchType::Text => items(payload, "/webPages/value")
            .iter()
            .map(|item| {
                SearchResultItem::text(
                    str_field(item, "name"),
                    str_field(item, "url"),
                    str_field(item, "snippet"),
                )
            })
            .collect(),
        SearchType::Image => items(payload, "/value")
            .iter()
            .map(|item| {
                let name = str_field(item, "name");
                let content_url = str_field(item, "contentUrl");
                SearchResultItem {
                    title: name.clone(),
                    url: content_url.clone(),
                    snippet: name,
                    image_url: Some(content_url).filter(|u| !u.is_empty()),
                    thumbnail_url: item
                        .get("thumbnailUrl")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispatcher(credentials: SearchCredentials) -> SearchDispatcher {
        SearchDispatcher::new(credentials, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_engine() {
        assert_eq!("Google".parse::<SearchEngine>().unwrap(), SearchEngine::Google);
        assert_eq!(" bing ".parse::<SearchEngine>().unwrap(), SearchEngine::Bing);
        let err = "yahoo".parse::<SearchEngine>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown search engine: yahoo");
    }

    #[test]
    fn test_parse_search_type() {
        assert_eq!("image".parse::<SearchType>().unwrap(), SearchType::Image);
        assert_eq!("text".parse::<SearchType>().unwrap(), SearchType::Text);
        assert!("video".parse::<SearchType>().is_err());
    }

    #[test]
    fn test_resolve_priority() {
        let d = dispatcher(SearchCredentials {
            kagi_api_key: Some("k".to_string()),
            bing_api_key: Some("b".to_string()),
            ..Default::default()
        });
        assert_eq!(d.resolve_engine(None).unwrap(), SearchEngine::Kagi);
        assert_eq!(
            d.resolve_engine(Some(SearchEngine::Bing)).unwrap(),
            SearchEngine::Bing
        );

        let d = dispatcher(SearchCredentials {
            google_api_key: Some("g".to_string()),
            google_cx: Some("cx".to_string()),
            bing_api_key: Some("b".to_string()),
            ..Default::default()
        });
        assert_eq!(d.resolve_engine(None).unwrap(), SearchEngine::Google);
    }

    #[test]
    fn test_resolve_ignores_blank_keys() {
        let d = dispatcher(SearchCredentials {
            google_api_key: Some("   ".to_string()),
            bing_api_key: Some("b".to_string()),
            ..Default::default()
        });
        assert_eq!(d.resolve_engine(None).unwrap(), SearchEngine::Bing);
    }

    #[test]
    fn test_resolve_none_configured() {
        let d = dispatcher(SearchCredentials::default());
        let err = d.resolve_engine(None).unwrap_err();
        assert_eq!(err.to_string(), "No search engine configured");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_request() {
        let d = dispatcher(SearchCredentials {
            google_api_key: Some("g".to_string()),
            ..Default::default()
        });
        let query = SearchQuery {
            query: "rust".to_string(),
            search_type: SearchType::Text,
            engine: None,
            max_results: 5,
        };
        let err = d.search(&query).await.unwrap_err();
        assert_eq!(err.to_string(), "Google API key and CX are required");

        let query = SearchQuery {
            engine: Some(SearchEngine::Kagi),
            ..query
        };
        let err = d.search(&query).await.unwrap_err();
        assert_eq!(err.to_string(), "Kagi API key is required");
    }

    #[test]
    fn test_map_google_text() {
        let payload = json!({
            "items": [
                {"title": "Rust", "link": "https://www.rust-lang.org", "snippet": "A language",
                 "image": {"thumbnailLink": "https://t/1.png"}},
                {"title": "Docs", "link": "https://doc.rust-lang.org"}
            ]
        });
        let results = map_google(&payload, SearchType::Text);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            SearchResultItem::text(
                "Rust".to_string(),
                "https://www.rust-lang.org".to_string(),
                "A language".to_string()
            )
        );
        assert_eq!(results[1].snippet, "");
        assert!(results.iter().all(|r| r.image_url.is_none() && r.thumbnail_url.is_none()));
    }

    #[test]
    fn test_map_google_image() {
        let payload = json!({
            "items": [
                {"title": "Crab", "link": "https://img/crab.png", "snippet": "crab",
                 "image": {"thumbnailLink": "https://t/crab.png"}},
                {"title": "No thumb", "link": "https://img/x.png", "snippet": ""}
            ]
        });
        let results = map_google(&payload, SearchType::Image);
        assert_eq!(results[0].image_url.as_deref(), Some("https://img/crab.png"));
        assert_eq!(results[0].thumbnail_url.as_deref(), Some("https://t/crab.png"));
        assert_eq!(results[1].image_url.as_deref(), Some("https://img/x.png"));
        assert!(results[1].thumbnail_url.is_none());
    }

    #[test]
    fn test_map_google_without_items() {
        assert!(map_google(&json!({"searchInformation": {}}), SearchType::Text).is_empty());
    }

    #[test]
    fn test_map_kagi() {
        let payload = json!({
            "data": [
                {"t": 0, "title": "Ferris", "url": "https://ferris.rs", "snippet": "crab",
                 "thumbnail": {"url": "https://kagi/thumb.jpg", "width": 100}},
                {"t": 1, "list": ["rust crab", "ferris mascot"]},
                {"t": 0, "title": "Plain", "url": "https://plain.rs", "snippet": "text",
                 "thumbnail": "https://kagi/plain.jpg"}
            ]
        });

        let text = map_kagi(&payload, SearchType::Text);
        assert_eq!(text.len(), 2);
        assert!(text.iter().all(|r| r.image_url.is_none()));

        let images = map_kagi(&payload, SearchType::Image);
        assert_eq!(images[0].image_url.as_deref(), Some("https://ferris.rs"));
        assert_eq!(images[0].thumbnail_url.as_deref(), Some("https://kagi/thumb.jpg"));
        assert_eq!(images[1].thumbnail_url.as_deref(), Some("https://kagi/plain.jpg"));
    }

    #[test]
    fn test_map_bing_text() {
        let payload = json!({
            "webPages": {"value": [
                {"name": "Tokio", "url": "https://tokio.rs", "snippet": "async runtime"}
            ]},
            "value": [{"name": "ignored"}]
        });
        let results = map_bing(&payload, SearchType::Text);
        assert_eq!(
            results,
            vec![SearchResultItem::text(
                "Tokio".to_string(),
                "https://tokio.rs".to_string(),
                "async runtime".to_string()
            )]
        );
    }

    #[test]
    fn test_map_bing_image() {
        let payload = json!({
            "value": [
                {"name": "Sunset", "contentUrl": "https://img/sunset.jpg",
                 "thumbnailUrl": "https://tse/sunset.jpg"}
            ]
        });
        let results = map_bing(&payload, SearchType::Image);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Sunset");
        assert_eq!(results[0].snippet, "Sunset");
        assert_eq!(results[0].url, "https://img/sunset.jpg");
        assert_eq!(results[0].image_url.as_deref(), Some("https://img/sunset.jpg"));
        assert_eq!(results[0].thumbnail_url.as_deref(), Some("https://tse/sunset.jpg"));
    }

    #[test]
    fn test_text_results_serialize_without_image_fields() {
        let item = SearchResultItem::text("a".into(), "b".into(), "c".into());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({"title": "a", "url": "b", "snippet": "c"}));
    }

    #[test]
    fn test_result_caps() {
        assert_eq!(SearchEngine::Google.result_cap(SearchType::Image), Some(10));
        assert_eq!(SearchEngine::Bing.result_cap(SearchType::Text), Some(50));
        assert_eq!(SearchEngine::Kagi.result_cap(SearchType::Text), None);
    }
}
