//! HTTP surface exposing flattening and path analysis to the rendering/CLI
//! layer. Plain request/response JSON over axum, with CORS and tracing.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{KgflatError, Result};
use crate::flatten::{self, FlattenedRow};
use crate::paths;

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .is_ok()
}

/// KGFlat HTTP API server
pub struct ApiServer {
    config: Config,
}

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

impl ApiServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.create_router();

        let addr = format!("127.0.0.1:{}", port);
        log::info!("Starting KGFlat HTTP server on http://{}", addr);
        log::info!("Endpoints: POST /flatten, POST /paths, GET /health");

        if !check_port_available(port).await {
            return Err(KgflatError::Config(format!(
                "Port {} is already in use. Stop the other process or set http_server.port in config.toml.",
                port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| {
                KgflatError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("Failed to bind to {}: {}", addr, e),
                ))
            })?;

        axum::serve(listener, app).await.map_err(|e| {
            KgflatError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    fn create_router(&self) -> Router {
        let allowed_origins = &self.config.http_server.allowed_origins;

        // No restriction configured: allow all origins (local dev);
        // otherwise restrict to the configured list.
        let cors = if allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/flatten", post(handle_flatten))
            .route("/paths", post(handle_paths))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(AppState {
                config: Arc::new(self.config.clone()),
            })
    }
}

#[derive(Debug, Deserialize)]
struct FlattenRequest {
    /// The raw response object, in any of the supported envelope shapes.
    response: Value,
    pk: String,
    environment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathsRequest {
    rows: Vec<FlattenedRow>,
    subject: String,
    object: String,
    max_paths: Option<usize>,
}

type ApiError = (StatusCode, Json<Value>);

fn error_body(status: StatusCode, message: String) -> ApiError {
    (status, Json(json!({ "error": message })))
}

async fn handle_flatten(
    State(state): State<AppState>,
    Json(request): Json<FlattenRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    let request_id = Uuid::new_v4();
    let environment = request
        .environment
        .unwrap_or_else(|| state.config.kgflat.environment.clone());
    log::info!(
        "[{}] flatten request pk={} environment={}",
        request_id,
        request.pk,
        environment
    );

    match flatten::flatten(&request.response, &request.pk, &environment) {
        Ok(output) => {
            log::info!(
                "[{}] flatten produced {} rows",
                request_id,
                output.metadata.row_count
            );
            Ok(Json(json!({
                "rows": output.rows,
                "metadata": output.metadata,
            })))
        }
        Err(e @ KgflatError::MalformedResponse(_)) => {
            log::warn!("[{}] {}", request_id, e);
            Err(error_body(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e) => {
            log::error!("[{}] flatten failed: {}", request_id, e);
            Err(error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn handle_paths(
    State(state): State<AppState>,
    Json(request): Json<PathsRequest>,
) -> std::result::Result<Json<paths::PathAnalysis>, ApiError> {
    let request_id = Uuid::new_v4();
    if request.subject.trim().is_empty() || request.object.trim().is_empty() {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "subject and object must be non-empty".to_string(),
        ));
    }

    // Path analysis runs over the row subset for one result-subject
    let subset: Vec<FlattenedRow> = request
        .rows
        .into_iter()
        .filter(|r| r.result_subject_name == request.subject)
        .collect();
    let max_paths = request
        .max_paths
        .unwrap_or(state.config.paths.max_paths)
        .max(1);

    log::info!(
        "[{}] paths request {} -> {} over {} rows",
        request_id,
        request.subject,
        request.object,
        subset.len()
    );

    let analysis = paths::analyze_paths(&subset, &request.subject, &request.object, max_paths);
    Ok(Json(analysis))
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "kgflat",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> AppState {
        AppState {
            config: Arc::new(Config::default()),
        }
    }

    #[tokio::test]
    async fn test_handle_health() {
        let Json(body) = handle_health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "kgflat");
    }

    #[tokio::test]
    async fn test_handle_flatten_ok() {
        let request = FlattenRequest {
            response: json!({"message": {
                "results": [{
                    "node_bindings": {"sn": [{"id": "CHEBI:X"}], "on": [{"id": "MONDO:Y"}]},
                    "analyses": [{"edge_bindings": {"e": [{"id": "e1"}]}}]
                }],
                "knowledge_graph": {
                    "nodes": {"CHEBI:X": {"name": "X"}, "MONDO:Y": {"name": "Y"}},
                    "edges": {"e1": {"subject": "CHEBI:X", "object": "MONDO:Y", "predicate": "biolink:treats"}}
                }
            }}),
            pk: "pk1".to_string(),
            environment: None,
        };
        let Json(body) = handle_flatten(State(state()), Json(request)).await.unwrap();
        assert_eq!(body["metadata"]["row_count"], 1);
        assert_eq!(body["rows"][0]["phrase"], "X treats Y");
        // Environment defaulted from config
        assert_eq!(body["rows"][0]["environment"], "test");
    }

    #[tokio::test]
    async fn test_handle_flatten_malformed_is_422() {
        let request = FlattenRequest {
            response: json!({"status": "running"}),
            pk: "pk1".to_string(),
            environment: None,
        };
        let err = handle_flatten(State(state()), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_handle_paths_rejects_empty_subject() {
        let request = PathsRequest {
            rows: Vec::new(),
            subject: "  ".to_string(),
            object: "C".to_string(),
            max_paths: None,
        };
        let err = handle_paths(State(state()), Json(request)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_router_builds() {
        let server = ApiServer::new(Config::default());
        let _router = server.create_router();
    }
}
