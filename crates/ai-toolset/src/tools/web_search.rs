//! Web search tool backed by the search dispatcher.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ToolError;
use crate::search::{SearchDispatcher, SearchEngine, SearchQuery, SearchType};
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Web search tool.
///
/// # Parameters
///
/// - `query` (required): Search terms.
/// - `search_type` (optional, default: "text"): "text" or "image".
/// - `engine` (optional): "google", "kagi" or "bing". Defaults to the first
///   configured provider.
/// - `max_results` (optional): Number of results, defaults to the configured value.
///
/// # Examples
///
/// ```json
/// {"query": "rust async runtime"}
/// {"query": "aurora borealis", "search_type": "image", "engine": "bing", "max_results": 3}
/// ```
pub struct WebSearch {
    dispatcher: SearchDispatcher,
    default_max_results: usize,
}

impl WebSearch {
    pub fn new(dispatcher: SearchDispatcher, default_max_results: usize) -> Self {
        Self {
            dispatcher,
            default_max_results,
        }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web using Google, Kagi, or Bing. \
         Returns text results or image results. \
         Useful for finding current information, news, images, or general knowledge."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The search query"},
                "search_type": {
                    "type": "string",
                    "enum": ["text", "image"],
                    "default": "text",
                    "description": "Kind of results to return"
                },
                "engine": {
                    "type": "string",
                    "enum": ["google", "kagi", "bing"],
                    "description": "Search engine to use; defaults to the first configured one"
                },
                "max_results": {
                    "type": "integer",
                    "default": self.default_max_results,
                    "description": "Maximum number of results"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let query = args.get_string("query")?;
        let search_type = match args.get_string_opt("search_type")? {
            Some(raw) => raw.parse::<SearchType>()?,
            None => SearchType::Text,
        };
        let engine = args
            .get_string_opt("engine")?
            .filter(|e| !e.trim().is_empty())
            .map(|e| e.parse::<SearchEngine>())
            .transpose()?;
        let max_results = args
            .get_int_or("max_results", self.default_max_results as i64)?
            .max(1) as usize;

        debug!(
            "web_search: query='{}', type={}, engine={:?}, max_results={}",
            query, search_type, engine, max_results
        );

        let response = self
            .dispatcher
            .search(&SearchQuery {
                query: query.clone(),
                search_type,
                engine,
                max_results,
            })
            .await?;

        Ok(ToolOutput::success(json!({
            "query": query,
            "engine": response.engine.as_str(),
            "search_type": search_type.as_str(),
            "result_count": response.results.len(),
            "results": response.results,
        })))
    }
}
