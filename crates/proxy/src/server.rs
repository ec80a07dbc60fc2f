//! Router, handlers and upstream forwarding.

use crate::rewrite::rewrite_path;
use axum::{
    body::{to_bytes, Body},
    extract::{Path as UrlPath, Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docrag_core::{AppConfig, AppError, AppResult};
use docrag_knowledge::{
    create_provider, EmbeddingConfig, EngineStatus, IndexSource, SearchEngine, SearchResult,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

/// Largest request body forwarded upstream.
const MAX_FORWARD_BODY: usize = 16 * 1024 * 1024;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

pub struct ProxyState {
    http: reqwest::Client,
    upstream: String,
    /// Swapped whole on reload; handlers clone the `Arc` and release the
    /// lock before any network call.
    engine: RwLock<Arc<SearchEngine>>,
    index_file: Option<PathBuf>,
    default_k: usize,
}

impl ProxyState {
    pub fn new(upstream: impl Into<String>, engine: SearchEngine, default_k: usize) -> Self {
        let upstream: String = upstream.into();
        let index_file = match engine.source() {
            Some(IndexSource::File(path)) => Some(path.clone()),
            _ => None,
        };

        Self {
            http: reqwest::Client::new(),
            upstream: upstream.trim_end_matches('/').to_string(),
            engine: RwLock::new(Arc::new(engine)),
            index_file,
            default_k,
        }
    }

    async fn engine(&self) -> Arc<SearchEngine> {
        Arc::clone(&*self.engine.read().await)
    }
}

type SharedState = Arc<ProxyState>;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

/// Error body returned by the local API.
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = if err.is_embedding_error() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ApiError(status, err.to_string())
    }
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/data/:name", get(index_file))
        .route("/api/index", get(index_status))
        .route("/api/index/reload", post(reload_index))
        .route("/api/search", post(search))
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Load the index, then serve until the process is stopped.
///
/// A failed index load is logged and the server starts anyway; search then
/// returns no results until `/api/index/reload` succeeds.
pub async fn serve(config: &AppConfig) -> AppResult<()> {
    let provider = create_provider(&EmbeddingConfig::from(config))?;
    let source = match &config.index_url {
        Some(url) => IndexSource::Url(url.clone()),
        None => IndexSource::File(config.index_file()),
    };

    let mut engine = SearchEngine::new(source, provider);
    if let Err(e) = engine.load().await {
        warn!("Starting with an empty index: {}", e);
    }

    let state = Arc::new(ProxyState::new(&config.endpoint, engine, config.top_k));
    let app = router(state);

    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address '{}': {}", config.listen, e)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Proxy(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Proxy listening on http://{} (upstream {})", addr, config.endpoint);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Proxy(format!("Server error: {}", e)))
}

async fn health() -> &'static str {
    "ok"
}

async fn index_file(
    State(state): State<SharedState>,
    UrlPath(name): UrlPath<String>,
) -> Result<Response, ApiError> {
    let path = state
        .index_file
        .as_ref()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some(name.as_str()))
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("No such file: {}", name)))?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError(StatusCode::NOT_FOUND, format!("{}: {}", name, e)))?;

    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

async fn index_status(State(state): State<SharedState>) -> Json<EngineStatus> {
    Json(state.engine().await.status())
}

/// Load a fresh copy of the index, then swap it in.
///
/// Searches already in flight finish against the engine they started with.
async fn reload_index(State(state): State<SharedState>) -> Json<EngineStatus> {
    let current = state.engine().await;
    let Some(mut fresh) = current.unloaded() else {
        warn!("Index reload requested for an in-memory index");
        return Json(current.status());
    };

    if let Err(e) = fresh.load().await {
        warn!("Index reload failed: {}", e);
    }

    let status = fresh.status();
    *state.engine.write().await = Arc::new(fresh);
    Json(status)
}

async fn search(
    State(state): State<SharedState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let k = req.k.unwrap_or(state.default_k);
    let engine = state.engine().await;
    let results = engine.query(&req.query, k).await?;
    Ok(Json(results))
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP {
        out.remove(name);
    }
    out
}

/// Forward an `/api` request upstream and stream the answer back.
#[instrument(skip(state, req), fields(method = %req.method(), path = %req.uri().path()))]
async fn forward(State(state): State<SharedState>, req: Request) -> Response {
    let Some(target) = rewrite_path(req.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut url = format!("{}{}", state.upstream, target);
    if let Some(query) = req.uri().query() {
        url.push('?');
        url.push_str(query);
    }

    let (parts, body) = req.into_parts();
    let body = match to_bytes(body, MAX_FORWARD_BODY).await {
        Ok(body) => body,
        Err(e) => {
            return ApiError(StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };

    let mut headers = forwardable(&parts.headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let upstream = match state
        .http
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            warn!("Upstream request to {} failed: {}", url, e);
            return ApiError(StatusCode::BAD_GATEWAY, format!("Upstream unavailable: {}", e))
                .into_response();
        }
    };

    let status = upstream.status();
    let headers = forwardable(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use docrag_knowledge::embeddings::providers::{MockProvider, OllamaProvider};
    use docrag_knowledge::index::write_index;
    use docrag_knowledge::{EmbeddingProvider, IndexedRecord};
    use httpmock::prelude::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn engine_with(records: Vec<IndexedRecord>) -> SearchEngine {
        SearchEngine::from_records(records, Arc::new(MockProvider::new("trigram-v1", 64)))
    }

    fn app(upstream: &str, engine: SearchEngine) -> Router {
        router(Arc::new(ProxyState::new(upstream, engine, 3)))
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app("http://127.0.0.1:1", engine_with(Vec::new()))
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_embeddings_request_is_rewritten_upstream() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .query_param("keep", "1")
                    .body(r#"{"model":"nomic-embed-text","input":"hi"}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"embeddings":[[0.1,0.2]]}"#);
            })
            .await;

        let response = app(&server.base_url(), engine_with(Vec::new()))
            .oneshot(
                HttpRequest::post("/api/embeddings?keep=1")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"model":"nomic-embed-text","input":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"embeddings":[[0.1,0.2]]}"#);
    }

    #[tokio::test]
    async fn test_chat_goes_to_generate_and_other_paths_pass_through() {
        let server = MockServer::start_async().await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).body("generated");
            })
            .await;
        let tags = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(404).body("nope");
            })
            .await;

        let app = app(&server.base_url(), engine_with(Vec::new()));

        let chat = app
            .clone()
            .oneshot(HttpRequest::post("/api/chat").body(Body::from("{}")).unwrap())
            .await
            .unwrap();
        assert_eq!(chat.status(), StatusCode::OK);

        let other = app
            .oneshot(HttpRequest::get("/api/tags").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(other).await, "nope");

        generate.assert_async().await;
        tags.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let response = app("http://127.0.0.1:1", engine_with(Vec::new()))
            .oneshot(HttpRequest::get("/api/tags").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_non_api_paths_are_not_found() {
        let response = app("http://127.0.0.1:1", engine_with(Vec::new()))
            .oneshot(HttpRequest::get("/elsewhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let provider = MockProvider::new("trigram-v1", 64);
        let texts = [
            "Computed properties cache derived state.",
            "Teleport moves template content in the DOM.",
        ];
        let mut records = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            records.push(IndexedRecord {
                file: format!("doc{}.md", i),
                chunk: 0,
                text: text.to_string(),
                embedding: provider.embed(text).await.unwrap(),
            });
        }

        let response = app("http://127.0.0.1:1", engine_with(records))
            .oneshot(
                HttpRequest::post("/api/search")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "teleport DOM", "k": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let results: Vec<SearchResult> = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file, "doc1.md");
    }

    #[tokio::test]
    async fn test_index_status_and_file_serving() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vue-docs-embeddings.json");
        let records = vec![IndexedRecord {
            file: "a.md".to_string(),
            chunk: 0,
            text: "A paragraph long enough to be a chunk.".to_string(),
            embedding: vec![1.0, 0.0],
        }];
        write_index(&path, &records).await.unwrap();

        let mut engine = SearchEngine::new(
            IndexSource::File(path),
            Arc::new(MockProvider::new("trigram-v1", 2)),
        );
        engine.load().await.unwrap();
        let app = app("http://127.0.0.1:1", engine);

        let status = app
            .clone()
            .oneshot(HttpRequest::get("/api/index").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status: serde_json::Value = serde_json::from_str(&body_string(status).await).unwrap();
        assert_eq!(status["loaded"], true);
        assert_eq!(status["stats"]["records"], 1);

        let file = app
            .clone()
            .oneshot(
                HttpRequest::get("/data/vue-docs-embeddings.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(file.status(), StatusCode::OK);
        let served: Vec<IndexedRecord> = serde_json::from_str(&body_string(file).await).unwrap();
        assert_eq!(served, records);

        let other = app
            .oneshot(HttpRequest::get("/data/secrets.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reload_reports_failure() {
        let temp = TempDir::new().unwrap();
        let engine = SearchEngine::new(
            IndexSource::File(temp.path().join("missing.json")),
            Arc::new(MockProvider::new("trigram-v1", 2)),
        );

        let response = app("http://127.0.0.1:1", engine)
            .oneshot(
                HttpRequest::post("/api/index/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(status["loaded"], false);
        assert!(status["error"].is_string());
    }

    #[tokio::test]
    async fn test_unloaded_search_and_embedding_error_status() {
        let engine = SearchEngine::new(
            IndexSource::File(PathBuf::from("unused.json")),
            Arc::new(MockProvider::new("trigram-v1", 2)),
        );
        // Never loaded: empty engine answers without embedding.
        let response = app("http://127.0.0.1:1", engine)
            .oneshot(
                HttpRequest::post("/api/search")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "anything"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "[]");

        let err = ApiError::from(AppError::EmbeddingUnavailable("down".into())).into_response();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_slow_embedding_does_not_block_status_or_reload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(serde_json::json!({"embedding": [1.0, 0.0]}));
            })
            .await;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        let records = vec![IndexedRecord {
            file: "a.md".to_string(),
            chunk: 0,
            text: "A paragraph long enough to be a chunk.".to_string(),
            embedding: vec![1.0, 0.0],
        }];
        write_index(&path, &records).await.unwrap();

        let provider = OllamaProvider::new(&EmbeddingConfig {
            endpoint: server.base_url(),
            ..Default::default()
        })
        .unwrap();
        let mut engine = SearchEngine::new(IndexSource::File(path), Arc::new(provider));
        engine.load().await.unwrap();
        let app = app("http://127.0.0.1:1", engine);

        let slow_search = tokio::spawn(app.clone().oneshot(
            HttpRequest::post("/api/search")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query": "slow"}"#))
                .unwrap(),
        ));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        let reload = app
            .clone()
            .oneshot(HttpRequest::post("/api/index/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(reload.status(), StatusCode::OK);

        let status = app
            .clone()
            .oneshot(HttpRequest::get("/api/index").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_millis(1500));

        let status: serde_json::Value = serde_json::from_str(&body_string(status).await).unwrap();
        assert_eq!(status["loaded"], true);
        assert_eq!(status["stats"]["records"], 1);

        let searched = slow_search.await.unwrap().unwrap();
        assert_eq!(searched.status(), StatusCode::OK);
        let results: Vec<SearchResult> =
            serde_json::from_str(&body_string(searched).await).unwrap();
        assert_eq!(results.len(), 1);
    }
}
