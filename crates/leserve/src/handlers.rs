//! HTTP handlers for REST endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use lemoteur::episode::{episode_identifier, page_episodes};
use lemoteur::search::select_facts;
use lemoteur::time::normalize_reference_time;
use lemoteur::{EngineError, EngineHandle, NewEpisode, SearchRequest, SourceKind};
use lenettoyage::{sanitize_each, sanitize_or_empty_mapping};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::responses::{
    ApiResponse, CypherData, EpisodeCreated, EpisodeDeleted, EpisodesData, FactsData,
    HealthResponse, NodesData, QueryResponse, RerankerStatus, ServiceInfo,
};

/// Default result count for fact and node searches
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Default page size for episode listing
pub const DEFAULT_EPISODE_LIMIT: usize = 20;

/// Default row cap for Cypher queries
pub const DEFAULT_CYPHER_LIMIT: usize = 100;

/// State shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Lazily connected engine and database clients
    pub engine: Arc<EngineHandle>,

    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(engine: EngineHandle, config: ServerConfig) -> Self {
        Self::new_from_arc(Arc::new(engine), config)
    }

    /// Create AppState from an existing `Arc<EngineHandle>`
    pub fn new_from_arc(engine: Arc<EngineHandle>, config: ServerConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }
}

/// Body of `POST /add_memory`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddMemoryRequest {
    /// Episode name
    pub name: String,

    /// Episode body
    pub content: String,

    /// `text` (default) or `json`
    pub source_type: Option<String>,

    /// Where the episode came from
    pub source_description: Option<String>,

    /// ISO 8601 time the episode happened; defaults to now
    pub reference_time: Option<String>,
}

/// Body of `POST /search_facts`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchFactsRequest {
    /// Search text
    pub query: String,

    /// Maximum facts returned
    pub limit: Option<usize>,

    /// Restrict to edges touching this node
    pub center_node_uuid: Option<String>,
}

/// Body of `POST /search_nodes`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchNodesRequest {
    /// Search text
    pub query: String,

    /// Maximum nodes returned
    pub limit: Option<usize>,
}

/// Query parameters of `GET /episodes`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EpisodesQuery {
    /// Page size; 0 means no cap
    pub limit: Option<usize>,

    /// Episodes to skip
    pub offset: Option<usize>,
}

/// Body of `POST /delete_episode`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteEpisodeRequest {
    /// Episode identifier
    pub episode_uuid: String,
}

/// Body of `POST /cypher_query`
#[derive(Debug, Deserialize)]
pub struct CypherQueryRequest {
    /// Cypher statement
    #[serde(default)]
    pub query: String,

    /// Row cap; `null` or 0 means no cap, absent means the default
    #[serde(default = "default_cypher_limit")]
    pub limit: Option<usize>,
}

fn default_cypher_limit() -> Option<usize> {
    Some(DEFAULT_CYPHER_LIMIT)
}

fn failed(context: &'static str) -> impl Fn(EngineError) -> ApiError {
    move |err| ApiError::from_engine(context, err)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn require_query(query: &str) -> ApiResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::validation("query must not be empty"));
    }
    Ok(query)
}

fn search_limit(limit: Option<usize>) -> ApiResult<usize> {
    match limit.unwrap_or(DEFAULT_SEARCH_LIMIT) {
        0 => Err(ApiError::validation("limit must be greater than zero")),
        limit => Ok(limit),
    }
}

fn parse_uuid(field: &str, raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::validation(format!("{} must be a valid UUID, got '{}'", field, raw)))
}

/// POST /add_memory - Store an episode
pub async fn add_memory(
    State(state): State<AppState>,
    payload: Result<Json<AddMemoryRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<EpisodeCreated>>> {
    let request = body(payload)?;
    let fail = failed("Failed to add episode");

    let source = match request.source_type.as_deref() {
        Some(raw) => raw.parse::<SourceKind>().map_err(&fail)?,
        None => SourceKind::Text,
    };
    let reference_time =
        normalize_reference_time(request.reference_time.as_deref()).map_err(&fail)?;
    debug!(reference_time = %reference_time, "Normalized reference time");

    let episode = NewEpisode::new(
        request.name,
        request.content,
        source,
        request.source_description,
        reference_time,
    )
    .map_err(&fail)?;
    let name = episode.name.clone();

    info!(name = %name, source = %source, "Adding episode");

    let engine = state.engine.engine().await.map_err(&fail)?;
    let raw = engine.add_episode(episode).await.map_err(&fail)?;
    let result = sanitize_or_empty_mapping(&raw);

    let episode_uuid = episode_identifier(&result).ok_or_else(|| {
        fail(EngineError::UnexpectedResponse(
            "engine returned no episode identifier".to_string(),
        ))
    })?;

    info!(name = %name, episode_uuid = %episode_uuid, "Episode added");

    Ok(Json(ApiResponse::success(
        format!("Episode '{}' added successfully", name),
        EpisodeCreated { episode_uuid },
    )))
}

/// POST /search_facts - Find relevant facts and relationships
pub async fn search_facts(
    State(state): State<AppState>,
    payload: Result<Json<SearchFactsRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<FactsData>>> {
    let request = body(payload)?;
    let fail = failed("Failed to search facts");

    let query = require_query(&request.query)?.to_string();
    let limit = search_limit(request.limit)?;
    let center = request
        .center_node_uuid
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_uuid("center_node_uuid", raw).map(|uuid| uuid.to_string()))
        .transpose()?;

    info!(query = %query, limit, center_node_uuid = ?center, "Searching facts");

    let engine = state.engine.engine().await.map_err(&fail)?;
    let search = SearchRequest::edges(query.clone())
        .with_limit(limit)
        .with_center_node(center.clone())
        .with_reranking(state.engine.reranker_active());
    let results = engine.search(search).await.map_err(&fail)?;

    let facts = sanitize_each(&select_facts(results.edges, center.as_deref(), limit));

    info!(query = %query, count = facts.len(), "Found facts");

    Ok(Json(ApiResponse::success(
        format!("Found {} facts", facts.len()),
        FactsData { facts, query },
    )))
}

/// POST /search_nodes - Search entity summaries
pub async fn search_nodes(
    State(state): State<AppState>,
    payload: Result<Json<SearchNodesRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<NodesData>>> {
    let request = body(payload)?;
    let fail = failed("Failed to search nodes");

    let query = require_query(&request.query)?.to_string();
    let limit = search_limit(request.limit)?;

    info!(query = %query, limit, "Searching nodes");

    let engine = state.engine.engine().await.map_err(&fail)?;
    let search = SearchRequest::nodes(query.clone())
        .with_limit(limit)
        .with_reranking(state.engine.reranker_active());
    let results = engine.search(search).await.map_err(&fail)?;

    let mut nodes = results.nodes;
    nodes.truncate(limit);
    let nodes = sanitize_each(&nodes);

    info!(query = %query, count = nodes.len(), "Found nodes");

    Ok(Json(ApiResponse::success(
        format!("Found {} nodes", nodes.len()),
        NodesData { nodes, query },
    )))
}

/// GET /episodes - List recent episodes
pub async fn get_episodes(
    State(state): State<AppState>,
    params: Result<Query<EpisodesQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<EpisodesData>>> {
    let Query(params) =
        params.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let fail = failed("Failed to retrieve episodes");

    let limit = params.limit.unwrap_or(DEFAULT_EPISODE_LIMIT);
    let offset = params.offset.unwrap_or(0);

    info!(limit, offset, "Retrieving episodes");

    let engine = state.engine.engine().await.map_err(&fail)?;
    let results = engine.search(SearchRequest::nodes("")).await.map_err(&fail)?;

    let (page, total) = page_episodes(results.nodes, offset, limit);
    let episodes = sanitize_each(&page);

    Ok(Json(ApiResponse::success(
        format!("Retrieved {} episodes", episodes.len()),
        EpisodesData { episodes, total },
    )))
}

/// POST /delete_episode - Remove an episode
pub async fn delete_episode(
    State(state): State<AppState>,
    payload: Result<Json<DeleteEpisodeRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<EpisodeDeleted>>> {
    let request = body(payload)?;
    let fail = failed("Failed to delete episode");

    let uuid = parse_uuid("episode_uuid", &request.episode_uuid)?;

    info!(episode_uuid = %uuid, "Deleting episode");

    let engine = state.engine.engine().await.map_err(&fail)?;
    engine.delete_episode(uuid).await.map_err(&fail)?;

    Ok(Json(ApiResponse::success(
        format!("Episode {} deleted successfully", uuid),
        EpisodeDeleted {
            deleted_uuid: uuid.to_string(),
        },
    )))
}

/// POST /cypher_query - Run a Cypher statement
pub async fn cypher_query(
    State(state): State<AppState>,
    payload: Result<Json<CypherQueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let request = body(payload)?;
    let fail = failed("Failed to execute query");

    let query = require_query(&request.query)?.to_string();
    let limit = request.limit.filter(|limit| *limit > 0);

    info!(query = %query, limit = ?limit, "Executing Cypher query");

    let started = Instant::now();
    let database = state.engine.database().await.map_err(&fail)?;
    let rows = database.execute_query(&query).await.map_err(&fail)?;
    let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut results: Vec<_> = rows.iter().map(sanitize_or_empty_mapping).collect();
    if let Some(limit) = limit {
        results.truncate(limit);
    }
    let total_results = results.len();
    let limited = limit.is_some_and(|limit| total_results == limit);

    let message = if total_results == 0 {
        "Query executed successfully. No results returned.".to_string()
    } else {
        format!("Query executed successfully. Found {} results.", total_results)
    };

    Ok(Json(QueryResponse {
        success: true,
        message,
        data: CypherData {
            results,
            total_results,
            limited,
        },
        query,
        execution_time_ms,
    }))
}

/// GET /health - Health check endpoint
///
/// Builds the engine clients on first use, so an engine that cannot be
/// constructed is reported as unhealthy.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = &state.engine;
    let (status, error) = match engine.clients().await {
        Ok(_) => ("healthy", None),
        Err(e) => {
            warn!("Health check failed: {}", e);
            ("unhealthy", Some(e.to_string()))
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        engine_initialized: engine.is_initialized(),
        reranker: RerankerStatus {
            enabled: engine.reranker_enabled(),
            available: engine.reranker_available(),
            active: engine.reranker_active(),
        },
        error,
    })
}

/// GET / - Service description
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::current())
}

/// Create router with all API endpoints
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/add_memory", post(add_memory))
        .route("/search_facts", post(search_facts))
        .route("/search_nodes", post(search_nodes))
        .route("/episodes", get(get_episodes))
        .route("/delete_episode", post(delete_episode))
        .route("/cypher_query", post(cypher_query))
}
