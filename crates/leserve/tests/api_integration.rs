// Integration Tests for LeServe
//
// Drive the full router (middleware included) with in-memory engine and
// database implementations.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use lemoteur::{
    EngineError, EngineHandle, GraphClients, GraphDatabase, GraphEngine, NewEpisode,
    SearchRequest, SearchResults, SearchScope,
};
use lenettoyage::{Fields, ResultValue};
use leserve::{build_app, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const EPISODE_UUID: &str = "7d3f4e0a-9a7b-4c39-8f43-6c1d2b9b4a10";
const CENTER_UUID: &str = "11111111-2222-4333-8444-555555555555";

fn embedding(len: usize) -> Value {
    json!((0..len).map(|i| i as f64 / 100.0).collect::<Vec<_>>())
}

/// Records calls and answers with canned graph data
#[derive(Default)]
struct FakeEngine {
    episodes: Mutex<Vec<NewEpisode>>,
    searches: Mutex<Vec<SearchRequest>>,
    deleted: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl GraphEngine for FakeEngine {
    async fn build_indices_and_constraints(&self) -> lemoteur::Result<()> {
        Ok(())
    }

    async fn add_episode(&self, episode: NewEpisode) -> lemoteur::Result<ResultValue> {
        self.episodes.lock().expect("lock").push(episode);
        Ok(ResultValue::from(json!({
            "episode": {"uuid": EPISODE_UUID, "name_embedding": embedding(64)},
            "nodes": [],
        })))
    }

    async fn search(&self, request: SearchRequest) -> lemoteur::Result<SearchResults> {
        let scope = request.scope;
        self.searches.lock().expect("lock").push(request);

        let results = match scope {
            SearchScope::Edges => SearchResults {
                edges: vec![
                    ResultValue::from(json!({
                        "uuid": "e1",
                        "fact": "Alice works at Acme",
                        "fact_embedding": embedding(128),
                        "source_node_uuid": CENTER_UUID,
                        "target_node_uuid": "n2",
                    })),
                    ResultValue::from(json!({
                        "uuid": "e2",
                        "fact": "Bob knows Carol",
                        "source_node_uuid": "n3",
                        "target_node_uuid": "n4",
                    })),
                    ResultValue::from(json!({"uuid": "e3", "name": "no fact"})),
                ],
                nodes: Vec::new(),
            },
            SearchScope::Nodes => {
                let mut attributes = Fields::new();
                attributes.insert("uuid", ResultValue::from("ep-3"));
                attributes.insert("name", ResultValue::from("object episode"));
                attributes.insert("attributes", ResultValue::from(json!({"internal": true})));
                SearchResults {
                    edges: Vec::new(),
                    nodes: vec![
                        ResultValue::from(json!({
                            "uuid": "ep-1",
                            "labels": ["Episodic"],
                            "name_embedding": embedding(64),
                        })),
                        ResultValue::from(json!({"uuid": "ent-1", "labels": ["Entity"], "summary": "Alice"})),
                        ResultValue::from(json!({"uuid": "ep-2", "labels": ["EpisodicNode"]})),
                        ResultValue::object("EpisodicNode", attributes),
                    ],
                }
            }
        };
        Ok(results)
    }

    async fn delete_episode(&self, uuid: Uuid) -> lemoteur::Result<()> {
        if uuid.is_nil() {
            return Err(EngineError::NotFound(format!("episode {}", uuid)));
        }
        self.deleted.lock().expect("lock").push(uuid);
        Ok(())
    }

    async fn supports_reranking(&self) -> lemoteur::Result<bool> {
        Ok(true)
    }
}

struct FakeDatabase;

#[async_trait]
impl GraphDatabase for FakeDatabase {
    async fn execute_query(&self, statement: &str) -> lemoteur::Result<Vec<ResultValue>> {
        if statement.starts_with("MATC ") {
            return Err(EngineError::Query(
                "Neo.ClientError.Statement.SyntaxError: Invalid input".to_string(),
            ));
        }
        let rows = (0..5)
            .map(|i| {
                ResultValue::from(json!({
                    "n": {"name": format!("node {}", i), "name_embedding": embedding(40)},
                    "vector": embedding(40),
                }))
            })
            .collect();
        Ok(rows)
    }
}

struct Harness {
    engine: Arc<FakeEngine>,
    handle: Arc<EngineHandle>,
}

impl Harness {
    fn new() -> Self {
        let engine = Arc::new(FakeEngine::default());
        let clients = GraphClients {
            engine: engine.clone(),
            database: Arc::new(FakeDatabase),
            reranker_available: true,
        };
        Self {
            engine,
            handle: Arc::new(EngineHandle::with_clients(clients, true)),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let app = build_app(Arc::clone(&self.handle), ServerConfig::default());
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }
}

fn contains_key(value: &Value, needle: &str) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(key, value)| key.contains(needle) || contains_key(value, needle)),
        Value::Array(items) => items.iter().any(|item| contains_key(item, needle)),
        _ => false,
    }
}

mod add_memory_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_memory_returns_episode_uuid() {
        let harness = Harness::new();
        let (status, body) = harness
            .post(
                "/add_memory",
                json!({
                    "name": "standup",
                    "content": "Alice joined Acme",
                    "source_type": "TEXT",
                    "reference_time": "2024-01-15T10:30:00+02:00",
                }),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Episode 'standup' added successfully"));
        assert_eq!(body["data"], json!({"episode_uuid": EPISODE_UUID}));

        let episodes = harness.engine.episodes.lock().expect("lock");
        assert_eq!(episodes.len(), 1);
        assert_eq!(
            episodes[0].reference_time.to_rfc3339(),
            "2024-01-15T08:30:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_add_memory_validation_errors() {
        let harness = Harness::new();
        let cases = [
            json!({"name": "", "content": "x"}),
            json!({"name": "n", "content": "  "}),
            json!({"name": "n", "content": "x", "source_type": "message"}),
            json!({"name": "n", "content": "{oops", "source_type": "json"}),
            json!({"name": "n", "content": "x", "reference_time": "yesterday"}),
        ];

        for case in cases {
            let (status, body) = harness.post("/add_memory", case.clone()).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "case {}", case);
            assert_eq!(body["success"], json!(false));
            assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        }
        assert!(harness.engine.episodes.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let harness = Harness::new();
        let request = Request::builder()
            .method("POST")
            .uri("/add_memory")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let (status, body) = harness.send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    }
}

mod search_tests {
    use super::*;

    #[tokio::test]
    async fn test_search_facts_sanitizes_and_filters() {
        let harness = Harness::new();
        let (status, body) = harness
            .post("/search_facts", json!({"query": "who works where"}))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["query"], json!("who works where"));
        let facts = body["data"]["facts"].as_array().expect("facts");
        assert_eq!(facts.len(), 2);
        assert!(!contains_key(&body, "embedding"));

        let searches = harness.engine.searches.lock().expect("lock");
        assert_eq!(searches[0].scope, SearchScope::Edges);
        assert_eq!(searches[0].num_results, Some(10));
        assert!(searches[0].rerank);
    }

    #[tokio::test]
    async fn test_search_facts_center_node() {
        let harness = Harness::new();
        let (status, body) = harness
            .post(
                "/search_facts",
                json!({"query": "alice", "limit": 5, "center_node_uuid": CENTER_UUID}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["facts"],
            json!([{
                "uuid": "e1",
                "fact": "Alice works at Acme",
                "source_node_uuid": CENTER_UUID,
                "target_node_uuid": "n2",
            }])
        );
    }

    #[tokio::test]
    async fn test_search_validation() {
        let harness = Harness::new();
        for (uri, body) in [
            ("/search_facts", json!({"query": "  "})),
            ("/search_facts", json!({"query": "x", "limit": 0})),
            ("/search_facts", json!({"query": "x", "center_node_uuid": "nope"})),
            ("/search_nodes", json!({"query": ""})),
        ] {
            let (status, _) = harness.post(uri, body).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[tokio::test]
    async fn test_search_nodes_limit_and_sanitize() {
        let harness = Harness::new();
        let (status, body) = harness
            .post("/search_nodes", json!({"query": "alice", "limit": 2}))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Found 2 nodes"));
        assert_eq!(
            body["data"]["nodes"],
            json!([
                {"uuid": "ep-1", "labels": ["Episodic"]},
                {"uuid": "ent-1", "labels": ["Entity"], "summary": "Alice"},
            ])
        );
    }
}

mod episode_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_episodes_pages_episodic_nodes() {
        let harness = Harness::new();
        let (status, body) = harness.get("/episodes?limit=2&offset=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], json!(3));
        assert_eq!(
            body["data"]["episodes"],
            json!([
                {"uuid": "ep-2", "labels": ["EpisodicNode"]},
                {"uuid": "ep-3", "name": "object episode"},
            ])
        );

        let searches = harness.engine.searches.lock().expect("lock");
        assert_eq!(searches[0].query, "");
        assert_eq!(searches[0].scope, SearchScope::Nodes);
    }

    #[tokio::test]
    async fn test_get_episodes_defaults() {
        let harness = Harness::new();
        let (status, body) = harness.get("/episodes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Retrieved 3 episodes"));
    }

    #[tokio::test]
    async fn test_get_episodes_bad_query_string() {
        let harness = Harness::new();
        let (status, _) = harness.get("/episodes?limit=-1").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_episode() {
        let harness = Harness::new();
        let (status, body) = harness
            .post("/delete_episode", json!({"episode_uuid": EPISODE_UUID}))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"deleted_uuid": EPISODE_UUID}));
        assert_eq!(harness.engine.deleted.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_episode_errors() {
        let harness = Harness::new();

        let (status, body) = harness
            .post("/delete_episode", json!({"episode_uuid": "not-a-uuid"}))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));

        let (status, body) = harness
            .post("/delete_episode", json!({"episode_uuid": Uuid::nil().to_string()}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], json!("NOT_FOUND"));
    }
}

mod cypher_tests {
    use super::*;

    #[tokio::test]
    async fn test_cypher_query_limit() {
        let harness = Harness::new();
        let (status, body) = harness
            .post("/cypher_query", json!({"query": "MATCH (n) RETURN n", "limit": 3}))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_results"], json!(3));
        assert_eq!(body["data"]["limited"], json!(true));
        assert_eq!(body["query"], json!("MATCH (n) RETURN n"));
        assert!(body["execution_time_ms"].is_number());
        assert_eq!(body["data"]["results"][0], json!({"n": {"name": "node 0"}}));
        assert!(!contains_key(&body, "embedding"));
    }

    #[tokio::test]
    async fn test_cypher_query_no_cap() {
        let harness = Harness::new();
        let (_, body) = harness
            .post("/cypher_query", json!({"query": "MATCH (n) RETURN n", "limit": null}))
            .await;
        assert_eq!(body["data"]["total_results"], json!(5));
        assert_eq!(body["data"]["limited"], json!(false));
    }

    #[tokio::test]
    async fn test_cypher_query_rejected() {
        let harness = Harness::new();
        let (status, body) = harness
            .post("/cypher_query", json!({"query": "MATC (n) RETURN n"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().expect("error").contains("SyntaxError"));
    }
}

mod service_tests {
    use super::*;
    use lemoteur::{ClientFactory, EngineConfig};

    #[tokio::test]
    async fn test_health_reports_reranker() {
        let harness = Harness::new();
        let (status, body) = harness.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "healthy",
                "engine_initialized": true,
                "reranker": {"enabled": true, "available": true, "active": true},
            })
        );
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let harness = Harness::new();
        let (status, body) = harness.get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], json!("LeSouvenir"));
        assert!(body["endpoints"].as_array().expect("endpoints").len() >= 7);
    }

    struct MisconfiguredFactory;

    #[async_trait]
    impl ClientFactory for MisconfiguredFactory {
        async fn connect(&self) -> lemoteur::Result<GraphClients> {
            Err(EngineConfig::from_lookup(|_| None).expect_err("config is incomplete"))
        }
    }

    #[tokio::test]
    async fn test_unconfigured_engine_is_unavailable() {
        let handle = Arc::new(EngineHandle::new(MisconfiguredFactory, true));
        let app = build_app(Arc::clone(&handle), ServerConfig::default());

        let request = Request::builder()
            .method("POST")
            .uri("/search_nodes")
            .header("content-type", "application/json")
            .body(Body::from(json!({"query": "alice"}).to_string()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        assert!(!handle.is_initialized());
    }

    #[tokio::test]
    async fn test_health_reports_unconfigured_engine() {
        let handle = Arc::new(EngineHandle::new(MisconfiguredFactory, true));
        let app = build_app(Arc::clone(&handle), ServerConfig::default());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["status"], json!("unhealthy"));
        assert_eq!(body["engine_initialized"], json!(false));
        assert!(!body["error"].as_str().expect("error message").is_empty());
    }
}
