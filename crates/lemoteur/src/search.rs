//! Hybrid search requests and results

use lenettoyage::ResultValue;
use serde::Serialize;
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Which kind of graph element a search returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Relationship edges carrying facts
    Edges,

    /// Entity and episodic nodes
    Nodes,
}

impl SearchScope {
    /// Name of the engine's hybrid search recipe for this scope
    pub fn recipe(&self) -> &'static str {
        match self {
            SearchScope::Edges => "edge_hybrid_search_rrf",
            SearchScope::Nodes => "node_hybrid_search_rrf",
        }
    }
}

/// A hybrid search request
///
/// # Example
///
/// ```
/// use lemoteur::{SearchRequest, SearchScope};
///
/// let request = SearchRequest::edges("who works at Acme")
///     .with_limit(5)
///     .with_reranking(true);
/// assert_eq!(request.scope, SearchScope::Edges);
/// assert_eq!(request.num_results, Some(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Free-text query; empty means "most recent"
    pub query: String,

    /// Element kind to search
    pub scope: SearchScope,

    /// Maximum number of results the engine should return
    pub num_results: Option<usize>,

    /// Node to bias results towards
    pub center_node_uuid: Option<String>,

    /// Re-rank results with the engine's cross-encoder
    pub rerank: bool,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    config: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    center_node_uuid: Option<&'a str>,
    cross_encoder: bool,
}

impl SearchRequest {
    fn new(query: impl Into<String>, scope: SearchScope) -> Self {
        Self {
            query: query.into(),
            scope,
            num_results: None,
            center_node_uuid: None,
            rerank: false,
        }
    }

    /// Edge-scoped search
    pub fn edges(query: impl Into<String>) -> Self {
        Self::new(query, SearchScope::Edges)
    }

    /// Node-scoped search
    pub fn nodes(query: impl Into<String>) -> Self {
        Self::new(query, SearchScope::Nodes)
    }

    /// Cap the number of results
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.num_results = Some(limit);
        self
    }

    /// Bias results towards a node
    pub fn with_center_node(mut self, uuid: Option<String>) -> Self {
        self.center_node_uuid = uuid;
        self
    }

    /// Toggle cross-encoder re-ranking
    pub fn with_reranking(mut self, rerank: bool) -> Self {
        self.rerank = rerank;
        self
    }

    /// JSON body sent to the engine's search endpoint
    pub fn to_body(&self) -> Result<Value> {
        let body = SearchBody {
            query: &self.query,
            config: self.scope.recipe(),
            num_results: self.num_results,
            center_node_uuid: self.center_node_uuid.as_deref(),
            cross_encoder: self.rerank,
        };
        Ok(serde_json::to_value(body)?)
    }
}

/// Raw elements returned by a search, not yet sanitized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Edges, in engine rank order
    pub edges: Vec<ResultValue>,

    /// Nodes, in engine rank order
    pub nodes: Vec<ResultValue>,
}

impl SearchResults {
    /// Decode an engine search response
    ///
    /// Accepts `{"edges": [...], "nodes": [...]}` (either key optional) or a
    /// flat `{"results": [...]}`, which is attributed to the requested scope.
    pub fn from_response(response: ResultValue, scope: SearchScope) -> Result<Self> {
        let fields = response.fields().ok_or_else(|| {
            EngineError::UnexpectedResponse("search response is not an object".to_string())
        })?;

        let list = |key: &str| -> Vec<ResultValue> {
            fields
                .get(key)
                .and_then(ResultValue::as_sequence)
                .map(<[ResultValue]>::to_vec)
                .unwrap_or_default()
        };

        let mut results = Self {
            edges: list("edges"),
            nodes: list("nodes"),
        };

        if !fields.contains_key("edges") && !fields.contains_key("nodes") {
            let flat = list("results");
            match scope {
                SearchScope::Edges => results.edges = flat,
                SearchScope::Nodes => results.nodes = flat,
            }
        }

        Ok(results)
    }
}

/// Whether an edge starts or ends at the given node
pub fn touches_node(edge: &ResultValue, node_uuid: &str) -> bool {
    ["source_node_uuid", "target_node_uuid"].iter().any(|key| {
        edge.get(key)
            .filter(|value| value.is_scalar())
            .is_some_and(|value| value.to_display_string() == node_uuid)
    })
}

/// Reduce raw edges to the facts a client asked for
///
/// Keeps edges carrying a `fact`, optionally only those touching
/// `center_node_uuid`, then truncates to `limit`.
pub fn select_facts(
    edges: Vec<ResultValue>,
    center_node_uuid: Option<&str>,
    limit: usize,
) -> Vec<ResultValue> {
    edges
        .into_iter()
        .filter(|edge| center_node_uuid.map_or(true, |uuid| touches_node(edge, uuid)))
        .filter(|edge| edge.get("fact").is_some())
        .take(limit)
        .collect()
}
