use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::error::send_checked;
use super::{
    build_http_client, required_str, CapabilityError, DataCapability, MAX_SEARCH_RESULTS,
    WEB_SEARCH,
};
use crate::core::config::{SearchProvider, WebSearchSettings};

const DEFAULT_NUM_RESULTS: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search over a configured provider. Brave, Google and Bing fall back to
/// DuckDuckGo when their keys are missing or the call fails.
///
/// Parameters: `query` (required) and `num_results` (default 3).
pub struct WebSearchClient {
    client: Client,
    settings: WebSearchSettings,
}

impl WebSearchClient {
    pub fn new(settings: &WebSearchSettings) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: build_http_client(WEB_SEARCH, settings.timeout_secs)?,
            settings: settings.clone(),
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CapabilityError> {
        let primary = match self.settings.provider {
            SearchProvider::Duckduckgo => None,
            SearchProvider::Brave => match key(&self.settings.brave_search_api_key) {
                Some(api_key) => Some(self.brave(query, api_key).await),
                None => None,
            },
            SearchProvider::Bing => match key(&self.settings.bing_search_api_key) {
                Some(api_key) => Some(self.bing(query, api_key).await),
                None => None,
            },
            SearchProvider::Google => match (
                key(&self.settings.google_search_api_key),
                key(&self.settings.google_search_engine_id),
            ) {
                (Some(api_key), Some(engine_id)) => {
                    Some(self.google(query, api_key, engine_id).await)
                }
                _ => None,
            },
        };

        match primary {
            Some(Ok(results)) if !results.is_empty() => return Ok(results),
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                tracing::warn!("Web search provider failed, falling back to DuckDuckGo: {}", err)
            }
            None => {}
        }

        self.duckduckgo(query).await
    }

    async fn get_json(&self, request: reqwest::RequestBuilder) -> Result<Value, CapabilityError> {
        send_checked(WEB_SEARCH, request)
            .await?
            .json()
            .await
            .map_err(|err| CapabilityError::from_reqwest(WEB_SEARCH, err))
    }

    async fn google(
        &self,
        query: &str,
        api_key: &str,
        engine_id: &str,
    ) -> Result<Vec<SearchResult>, CapabilityError> {
        let request = self
            .client
            .get("https://www.googleapis.com/customsearch/v1")
            .query(&[("key", api_key), ("cx", engine_id), ("q", query)]);
        let payload = self.get_json(request).await?;
        Ok(collect_items(payload.get("items"), "title", "link", "snippet"))
    }

    async fn brave(
        &self,
        query: &str,
        api_key: &str,
    ) -> Result<Vec<SearchResult>, CapabilityError> {
        let request = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .query(&[("q", query)])
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json");
        let payload = self.get_json(request).await?;
        Ok(collect_items(
            payload.get("web").and_then(|w| w.get("results")),
            "title",
            "url",
            "description",
        ))
    }

    async fn bing(&self, query: &str, api_key: &str) -> Result<Vec<SearchResult>, CapabilityError> {
        let request = self
            .client
            .get("https://api.bing.microsoft.com/v7.0/search")
            .query(&[("q", query)])
            .header("Ocp-Apim-Subscription-Key", api_key);
        let payload = self.get_json(request).await?;
        Ok(collect_items(
            payload.get("webPages").and_then(|w| w.get("value")),
            "name",
            "url",
            "snippet",
        ))
    }

    async fn duckduckgo(&self, query: &str) -> Result<Vec<SearchResult>, CapabilityError> {
        let request = self.client.get("https://api.duckduckgo.com/").query(&[
            ("q", query),
            ("format", "json"),
            ("no_redirect", "1"),
            ("no_html", "1"),
        ]);
        let payload = self.get_json(request).await?;
        Ok(parse_duckduckgo(&payload))
    }
}

fn key(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn collect_items(
    items: Option<&Value>,
    title_key: &str,
    url_key: &str,
    snippet_key: &str,
) -> Vec<SearchResult> {
    let Some(items) = items.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let title = item.get(title_key).and_then(|v| v.as_str()).unwrap_or("");
            let url = item.get(url_key).and_then(|v| v.as_str()).unwrap_or("");
            let snippet = item.get(snippet_key).and_then(|v| v.as_str()).unwrap_or("");
            if title.is_empty() || url.is_empty() {
                return None;
            }
            Some(SearchResult {
                title: title.to_string(),
                url: url.to_string(),
                snippet: snippet.to_string(),
            })
        })
        .collect()
}

fn parse_duckduckgo(payload: &Value) -> Vec<SearchResult> {
    let mut results = Vec::new();

    let abstract_text = payload.get("AbstractText").and_then(|v| v.as_str()).unwrap_or("");
    let abstract_url = payload.get("AbstractURL").and_then(|v| v.as_str()).unwrap_or("");
    if !abstract_text.is_empty() && !abstract_url.is_empty() {
        let heading = payload
            .get("Heading")
            .and_then(|v| v.as_str())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| abstract_text.split(" - ").next().unwrap_or(abstract_text));
        results.push(SearchResult {
            title: heading.to_string(),
            url: abstract_url.to_string(),
            snippet: abstract_text.to_string(),
        });
    }

    for field in ["Results", "RelatedTopics"] {
        if let Some(items) = payload.get(field).and_then(|v| v.as_array()) {
            collect_ddg_topics(items, &mut results);
        }
    }
    results
}

fn collect_ddg_topics(items: &[Value], results: &mut Vec<SearchResult>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            collect_ddg_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            url: url.to_string(),
            snippet: text.to_string(),
        });
    }
}

pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }
    results
        .iter()
        .map(|r| format!("**{}**\n{}\nSource: {}\n", r.title, r.snippet, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl DataCapability for WebSearchClient {
    fn name(&self) -> &'static str {
        WEB_SEARCH
    }

    async fn invoke(&self, parameters: &Value) -> Result<String, CapabilityError> {
        let query = required_str(WEB_SEARCH, parameters, "query")?;
        let num_results = parameters
            .get("num_results")
            .and_then(|v| v.as_u64())
            .map(|n| (n as usize).clamp(1, MAX_SEARCH_RESULTS))
            .unwrap_or(DEFAULT_NUM_RESULTS);

        let mut results = self.search(query).await?;
        results.truncate(num_results);
        tracing::debug!("Web search for '{}' returned {} results", query, results.len());
        Ok(render_results(&results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duckduckgo_payload_flattens_nested_topics() {
        let payload = json!({
            "Heading": "Rust",
            "AbstractText": "Rust is a systems programming language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "RelatedTopics": [
                {
                    "Text": "Cargo - Rust package manager",
                    "FirstURL": "https://doc.rust-lang.org/cargo"
                },
                { "Name": "Group", "Topics": [
                    {
                        "Text": "Clippy - lints",
                        "FirstURL": "https://github.com/rust-lang/rust-clippy"
                    }
                ]},
                { "Text": "", "FirstURL": "https://ignored" }
            ]
        });

        let results = parse_duckduckgo(&payload);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Rust");
        assert_eq!(results[1].title, "Cargo");
        assert_eq!(results[2].url, "https://github.com/rust-lang/rust-clippy");
    }

    #[test]
    fn items_without_title_or_url_are_skipped() {
        let items = json!([
            { "name": "Bing result", "url": "https://a", "snippet": "s" },
            { "name": "", "url": "https://b" },
            { "name": "no url" }
        ]);
        let results = collect_items(Some(&items), "name", "url", "snippet");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Bing result");
    }

    #[test]
    fn rendering_lists_title_snippet_and_source() {
        let text = render_results(&[SearchResult {
            title: "Headline".to_string(),
            url: "https://news.example".to_string(),
            snippet: "Body".to_string(),
        }]);
        assert_eq!(text, "**Headline**\nBody\nSource: https://news.example\n");
        assert_eq!(render_results(&[]), "No results found.");
    }

    #[test]
    fn blank_keys_are_ignored() {
        assert_eq!(key(&Some("  ".to_string())), None);
        assert_eq!(key(&Some(" k ".to_string())), Some("k"));
        assert_eq!(key(&None), None);
    }
}
