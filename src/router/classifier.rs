use serde::Serialize;

use crate::handlers::HandlerKind;
use crate::text::{find_phrase, tokenize};

/// Meteorological and temporal terms. Checked first.
const STRUCTURED_DATA_KEYWORDS: &[&str] = &[
    "tempo", "clima", "weather", "temperatura", "chuva", "previsão", "previsao", "graus",
    "celsius", "calor", "frio", "sol", "forecast", "temperature", "rain",
];

/// Recency and "search the web" terms.
const LIVE_SEARCH_KEYWORDS: &[&str] = &[
    "notícia", "notícias", "noticia", "noticias", "news", "buscar", "buscar na web",
    "busca na web", "pesquisar", "pesquisa na web", "pesquisa na internet", "google",
    "atual", "atuais", "hoje", "recente", "recentes", "último", "últimas", "latest", "today",
    "recent", "search the web", "search online",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub handler: HandlerKind,
    /// Keyword that selected the handler; `None` for the default route.
    pub matched_keyword: Option<&'static str>,
}

impl RoutingDecision {
    pub fn reason(&self) -> String {
        match self.matched_keyword {
            Some(keyword) => format!("{} keyword '{}'", self.handler, keyword),
            None => "default route".to_string(),
        }
    }
}

/// Keyword membership in fixed priority order: structured data, then live
/// search, then the knowledge base as catch-all.
pub fn classify(text: &str) -> RoutingDecision {
    let tokens = tokenize(text);

    if let Some(keyword) = find_phrase(&tokens, STRUCTURED_DATA_KEYWORDS) {
        return RoutingDecision {
            handler: HandlerKind::StructuredData,
            matched_keyword: Some(keyword),
        };
    }

    if let Some(keyword) = find_phrase(&tokens, LIVE_SEARCH_KEYWORDS) {
        return RoutingDecision {
            handler: HandlerKind::LiveSearch,
            matched_keyword: Some(keyword),
        };
    }

    RoutingDecision {
        handler: HandlerKind::KnowledgeBase,
        matched_keyword: None,
    }
}
