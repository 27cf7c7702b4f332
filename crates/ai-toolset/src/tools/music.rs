//! Media library search and playback tools.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use toolset_core::ServiceCall;
use tracing::debug;

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

const DEFAULT_LIMIT: i64 = 10;
const MEDIA_SOURCE_ROOT: &str = "media-source://media_source";

/// A playable (or browsable) item found in the media tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaMatch {
    pub title: Value,
    pub media_content_type: Value,
    pub media_content_id: Value,
    pub thumbnail: Value,
    pub can_play: bool,
}

impl MediaMatch {
    fn from_node(node: &Value) -> Self {
        let field = |key: &str| node.get(key).cloned().unwrap_or(Value::Null);
        Self {
            title: field("title"),
            media_content_type: field("media_content_type"),
            media_content_id: field("media_content_id"),
            thumbnail: field("thumbnail"),
            can_play: node.get("can_play").and_then(|v| v.as_bool()).unwrap_or(false),
        }
    }
}

/// Depth-first title search over a browse tree.
///
/// `query` must already be lowercase. Stops once `limit` matches are found.
fn search_tree(
    node: &Value,
    query: &str,
    content_type: Option<&str>,
    limit: usize,
    results: &mut Vec<MediaMatch>,
) {
    if results.len() >= limit {
        return;
    }

    let title = node
        .get("title")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_lowercase();
    let type_matches = content_type
        .map(|wanted| {
            node.get("media_content_type")
                .and_then(|t| t.as_str())
                .map(|t| t.eq_ignore_ascii_case(wanted))
                .unwrap_or(false)
        })
        .unwrap_or(true);

    if title.contains(query) && type_matches {
        results.push(MediaMatch::from_node(node));
    }

    if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
        for child in children {
            if results.len() >= limit {
                break;
            }
            search_tree(child, query, content_type, limit, results);
        }
    }
}

/// Browse trees contained in a service response.
///
/// The response is either a tree itself or an object keyed by entity id.
fn browse_roots(response: &Value) -> Vec<&Value> {
    match response {
        Value::Object(map) if map.contains_key("title") || map.contains_key("children") => {
            vec![response]
        }
        Value::Object(map) => map.values().filter(|v| v.is_object()).collect(),
        _ => Vec::new(),
    }
}

/// Searches the host media library by title.
///
/// # Parameters
///
/// - `query` (required): Case-insensitive title fragment (artist, album, track).
/// - `media_content_type` (optional): Only return items of this type.
/// - `limit` (optional, default: 10): Maximum number of matches.
pub struct MusicFind;

impl MusicFind {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MusicFind {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for MusicFind {
    fn name(&self) -> &str {
        "music_find"
    }

    fn description(&self) -> &str {
        "Search for music in the Home Assistant media library. \
         Search by artist, album, track name, or genre. \
         Returns a list of matching media items that can be played."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Artist, album, track or genre to look for"},
                "media_content_type": {"type": "string", "description": "Restrict matches to this media type"},
                "limit": {"type": "integer", "default": DEFAULT_LIMIT, "description": "Maximum number of results"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let query = args.get_string("query")?;
        let content_type = args.get_string_opt("media_content_type")?;
        let limit = args.get_int_or("limit", DEFAULT_LIMIT)?;
        if limit < 1 {
            return Err(ToolError::invalid("limit", "must be at least 1"));
        }
        let limit = limit as usize;
        let host = args.require_host(self.name())?;

        let mut trees = Vec::new();
        if host.has_component("media_source").await? {
            let call = ServiceCall::new("media_player", "browse_media")
                .with("media_content_type", "music")
                .with("media_content_id", MEDIA_SOURCE_ROOT)
                .returning_response();
            match host.call_service(call).await {
                Ok(Some(tree)) => trees.push(tree),
                Ok(None) => {}
                Err(e) => debug!("Could not browse media_source: {}", e),
            }
        }

        let needle = query.to_lowercase();
        let mut results = Vec::new();
        for tree in &trees {
            for root in browse_roots(tree) {
                search_tree(root, &needle, content_type.as_deref(), limit, &mut results);
            }
        }

        debug!("music_find: '{}' matched {} items", query, results.len());

        let message = if results.is_empty() {
            format!("No results found for '{}'", query)
        } else {
            format!("Found {} results for '{}'", results.len(), query)
        };

        Ok(ToolOutput::success(json!({
            "query": query,
            "result_count": results.len(),
            "results": results,
            "message": message,
        })))
    }
}

/// Plays media on a media player entity.
///
/// # Parameters
///
/// - `entity_id` (required): A `media_player.*` entity.
/// - `media_content_id` (required): Id from `music_find`, a URL or a provider URI.
/// - `media_content_type` (optional, default: "music"): music, playlist, album, ...
/// - `enqueue` (optional): play, next, add or replace.
/// - `announce` (optional): Play as an announcement.
pub struct MusicPlay;

impl MusicPlay {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MusicPlay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for MusicPlay {
    fn name(&self) -> &str {
        "music_play"
    }

    fn description(&self) -> &str {
        "Play music on a specific Home Assistant media player. \
         Provide the media player entity ID and the media content to play. \
         You can use media_content_id from music_find results, or provide a URL \
         or other media identifier. \
         Optionally specify the media content type (music, playlist, album, etc.)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity_id": {"type": "string", "description": "media_player entity id"},
                "media_content_id": {"type": "string", "description": "Media to play"},
                "media_content_type": {"type": "string", "default": "music"},
                "enqueue": {"type": "string", "enum": ["play", "next", "add", "replace"]},
                "announce": {"type": "boolean"}
            },
            "required": ["entity_id", "media_content_id"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let entity_id = args.get_string("entity_id")?;
        let media_content_id = args.get_string("media_content_id")?;
        let media_content_type = args
            .get_string_opt("media_content_type")?
            .unwrap_or_else(|| "music".to_string());
        let enqueue = args.get_string_opt("enqueue")?.filter(|e| !e.is_empty());
        let announce = args.get_bool_opt("announce")?.unwrap_or(false);
        let host = args.require_host(self.name())?;

        if host.entity_state(&entity_id).await?.is_none() {
            return Err(ToolError::EntityNotFound {
                kind: "Media player".to_string(),
                entity_id,
            });
        }

        if !entity_id.starts_with("media_player.") {
            return Err(ToolError::invalid(
                "entity_id",
                format!("Entity '{}' is not a media player", entity_id),
            ));
        }

        debug!("music_play: {} on {}", media_content_id, entity_id);

        let call = ServiceCall::new("media_player", "play_media")
            .with("entity_id", entity_id.as_str())
            .with("media_content_id", media_content_id.as_str())
            .with("media_content_type", media_content_type.as_str())
            .with_opt("enqueue", enqueue)
            .with_opt("announce", announce.then_some(true));
        host.call_service(call).await?;

        Ok(ToolOutput::success(json!({
            "entity_id": entity_id,
            "media_content_id": media_content_id,
            "media_content_type": media_content_type,
            "message": format!("Playing media on '{}'", entity_id),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::FakeHost;

    fn library() -> Value {
        json!({
            "title": "Media",
            "media_content_type": "app",
            "media_content_id": "media-source://media_source",
            "can_play": false,
            "children": [
                {
                    "title": "Daft Punk",
                    "media_content_type": "artist",
                    "media_content_id": "media-source://artist/daft-punk",
                    "can_play": false,
                    "children": [
                        {"title": "Discovery", "media_content_type": "album",
                         "media_content_id": "media-source://album/discovery", "can_play": true},
                        {"title": "One More Time (Daft Punk)", "media_content_type": "track",
                         "media_content_id": "media-source://track/omt", "can_play": true,
                         "thumbnail": "https://img/omt.jpg"}
                    ]
                },
                {"title": "daft punk live", "media_content_type": "playlist",
                 "media_content_id": "media-source://playlist/live", "can_play": true}
            ]
        })
    }

    #[test]
    fn test_search_tree_depth_first() {
        let mut results = Vec::new();
        search_tree(&library(), "daft punk", None, 10, &mut results);
        let titles: Vec<_> = results.iter().map(|r| r.title.clone()).collect();
        assert_eq!(
            titles,
            vec![
                json!("Daft Punk"),
                json!("One More Time (Daft Punk)"),
                json!("daft punk live")
            ]
        );
        assert_eq!(results[1].thumbnail, json!("https://img/omt.jpg"));
        assert!(results[1].can_play);
        assert_eq!(results[0].thumbnail, Value::Null);
    }

    #[test]
    fn test_search_tree_limit_and_type() {
        let mut results = Vec::new();
        search_tree(&library(), "daft", None, 2, &mut results);
        assert_eq!(results.len(), 2);

        let mut results = Vec::new();
        search_tree(&library(), "daft", Some("playlist"), 10, &mut results);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].media_content_id, json!("media-source://playlist/live"));
    }

    #[test]
    fn test_browse_roots_keyed_by_entity() {
        let response = json!({"media_player.kitchen": library()});
        let roots = browse_roots(&response);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["title"], json!("Media"));
    }

    #[tokio::test]
    async fn test_music_find() {
        let (host, args) = FakeHost::new()
            .with_component("media_source")
            .with_response("media_player.browse_media", library())
            .into_args(json!({"query": "Discovery"}));

        let output = MusicFind::new().execute(args).await.unwrap();
        assert_eq!(output.get("result_count"), Some(&json!(1)));
        assert_eq!(
            output.get("message"),
            Some(&json!("Found 1 results for 'Discovery'"))
        );

        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].data["media_content_id"], json!(MEDIA_SOURCE_ROOT));
    }

    #[tokio::test]
    async fn test_music_find_without_media_source() {
        let (host, args) = FakeHost::new().into_args(json!({"query": "jazz"}));
        let output = MusicFind::new().execute(args).await.unwrap();
        assert!(output.success);
        assert_eq!(output.get("result_count"), Some(&json!(0)));
        assert_eq!(output.get("message"), Some(&json!("No results found for 'jazz'")));
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_music_find_ignores_browse_failure() {
        let (_, args) = FakeHost::new()
            .with_component("media_source")
            .failing("media_player.browse_media", "not supported")
            .into_args(json!({"query": "jazz"}));
        let output = MusicFind::new().execute(args).await.unwrap();
        assert!(output.success);
        assert_eq!(output.get("result_count"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_music_play() {
        let (host, args) = FakeHost::new()
            .with_entity("media_player.kitchen")
            .into_args(json!({
                "entity_id": "media_player.kitchen",
                "media_content_id": "media-source://track/omt",
                "enqueue": "next"
            }));

        let output = MusicPlay::new().execute(args).await.unwrap();
        assert_eq!(output.get("media_content_type"), Some(&json!("music")));
        assert_eq!(
            output.get("message"),
            Some(&json!("Playing media on 'media_player.kitchen'"))
        );

        let data = &host.calls()[0].data;
        assert_eq!(data["enqueue"], json!("next"));
        assert!(!data.contains_key("announce"));
    }

    #[tokio::test]
    async fn test_music_play_unknown_entity() {
        let (host, args) = FakeHost::new().into_args(json!({
            "entity_id": "media_player.attic",
            "media_content_id": "x"
        }));
        let err = MusicPlay::new().execute(args).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Media player entity 'media_player.attic' not found"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_music_play_wrong_domain() {
        let (host, args) = FakeHost::new()
            .with_entity("light.kitchen")
            .into_args(json!({"entity_id": "light.kitchen", "media_content_id": "x"}));
        let err = MusicPlay::new().execute(args).await.unwrap_err();
        assert!(err.to_string().contains("is not a media player"));
        assert!(host.calls().is_empty());
    }
}
