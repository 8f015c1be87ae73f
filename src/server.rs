//! HTTP API for the admin console and the chat request handler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/documents` | List documents (`?search=`, `?type=`) |
//! | `POST` | `/api/documents` | Create a document (in memory) |
//! | `GET`  | `/api/documents/stats` | Counts by type, versions per key, sizes |
//! | `GET`  | `/api/documents/effective` | Documents in effect (`?date=` or `?month=&year=`, `&latest=true`) |
//! | `GET`  | `/api/documents/versions/{key}` | All versions of a logical document, newest first |
//! | `GET`  | `/api/documents/{id}` | One document |
//! | `PUT`  | `/api/documents/{id}` | Partial update |
//! | `DELETE` | `/api/documents/{id}` | Delete |
//! | `POST` | `/api/refresh` | Re-read all sources |
//! | `POST` | `/api/context` | Assemble prompt context for `{question, month, year}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: 42" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::engine::ContextEngine;
use crate::error::Error;
use crate::models::{DocumentPatch, DocumentStats, DocumentType, ManagedDocument, NewDocument};
use crate::relevance::BundleKind;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<ContextEngine>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Builds the engine from `config` first, so an invalid catalog aborts
/// start-up before the listener is bound.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(ContextEngine::from_config(config).await?);
    let app = build_router(engine);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "payslip context server listening");
    println!("Payslip context server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router around an existing engine.
pub fn build_router(engine: Arc<ContextEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/api/documents",
            get(handle_list_documents).post(handle_create_document),
        )
        .route("/api/documents/stats", get(handle_stats))
        .route("/api/documents/effective", get(handle_effective))
        .route("/api/documents/versions/{key}", get(handle_versions))
        .route(
            "/api/documents/{id}",
            get(handle_get_document)
                .put(handle_update_document)
                .delete(handle_delete_document),
        )
        .route("/api/refresh", post(handle_refresh))
        .route("/api/context", post(handle_context))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { .. } => not_found(err.to_string()),
            Error::InvalidPeriod { .. } | Error::InvertedWindow { .. } => {
                bad_request(err.to_string())
            }
            Error::Catalog(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: err.to_string(),
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /api/documents ============

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
    #[serde(rename = "type")]
    doc_type: Option<String>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ManagedDocument>>, AppError> {
    let mut docs = match q.search.as_deref() {
        Some(s) if !s.trim().is_empty() => state.engine.search(s),
        _ => state.engine.list(),
    };
    if let Some(t) = q.doc_type.as_deref() {
        let doc_type: DocumentType = t.parse().map_err(bad_request)?;
        docs.retain(|d| d.doc_type == doc_type);
    }
    Ok(Json(docs))
}

async fn handle_create_document(
    State(state): State<AppState>,
    Json(new): Json<NewDocument>,
) -> Result<(StatusCode, Json<ManagedDocument>), AppError> {
    if new.logical_key.trim().is_empty() || new.name.trim().is_empty() {
        return Err(bad_request("logical_key and name must not be empty"));
    }
    Ok((StatusCode::CREATED, Json(state.engine.create(new)?)))
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ManagedDocument>, AppError> {
    state
        .engine
        .get(&id)
        .map(Json)
        .ok_or_else(|| Error::NotFound { id }.into())
}

async fn handle_update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<DocumentPatch>,
) -> Result<Json<ManagedDocument>, AppError> {
    Ok(Json(state.engine.update(&id, patch)?))
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_stats(State(state): State<AppState>) -> Json<DocumentStats> {
    Json(state.engine.stats())
}

async fn handle_versions(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<Vec<ManagedDocument>> {
    Json(state.engine.versions_of(&key))
}

#[derive(Debug, Deserialize)]
struct EffectiveQuery {
    date: Option<NaiveDate>,
    month: Option<u32>,
    year: Option<i32>,
    #[serde(default)]
    latest: bool,
}

async fn handle_effective(
    State(state): State<AppState>,
    Query(q): Query<EffectiveQuery>,
) -> Result<Json<Vec<ManagedDocument>>, AppError> {
    let date = match (q.date, q.month, q.year) {
        (Some(date), None, None) => date,
        (None, Some(month), Some(year)) => crate::resolver::payslip_reference_date(month, year)?,
        _ => return Err(bad_request("provide either date, or month and year")),
    };
    let docs = if q.latest {
        state.engine.latest_for_date(date)
    } else {
        state.engine.documents_for_date(date)
    };
    Ok(Json(docs))
}

// ============ POST /api/refresh ============

#[derive(Serialize)]
struct RefreshResponse {
    documents: usize,
}

async fn handle_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    Json(RefreshResponse {
        documents: state.engine.refresh().await,
    })
}

// ============ POST /api/context ============

#[derive(Debug, Deserialize)]
struct ContextRequest {
    question: String,
    month: u32,
    year: i32,
}

#[derive(Serialize)]
struct ContextResponse {
    kind: BundleKind,
    period: NaiveDate,
    documents: Vec<String>,
    context: String,
}

async fn handle_context(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    let assembled = state.engine.assemble(&req.question, req.month, req.year)?;
    Ok(Json(ContextResponse {
        kind: assembled.bundle.kind,
        period: assembled.bundle.period,
        documents: assembled
            .bundle
            .documents()
            .map(|d| d.name.clone())
            .collect(),
        context: assembled.text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{default_documents, VersionCatalog};
    use crate::clock::FixedClock;
    use crate::loader::MemoryTextSource;
    use crate::relevance::KeywordMatcher;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_app() -> (Router, Arc<ContextEngine>) {
        let source = MemoryTextSource::new()
            .with("tax-calculation-reference.txt", "Brackets from April.")
            .with("overtime-policy.txt", "Weekend overtime pays double.");
        let engine = Arc::new(
            ContextEngine::new(
                VersionCatalog::from_specs(default_documents()).unwrap(),
                Arc::new(source),
                Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap())),
                Arc::new(KeywordMatcher::default()),
            )
            .await,
        );
        (build_router(engine.clone()), engine)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = test_app().await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_context_endpoint() {
        let (app, _) = test_app().await;
        let req = json_request(
            "POST",
            "/api/context",
            serde_json::json!({"question": "overtime on weekends?", "month": 8, "year": 2024}),
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "relevant");
        assert_eq!(body["period"], "2024-08-15");
        assert!(body["context"]
            .as_str()
            .unwrap()
            .contains("Weekend overtime pays double."));
    }

    #[tokio::test]
    async fn test_context_endpoint_rejects_bad_month() {
        let (app, _) = test_app().await;
        let req = json_request(
            "POST",
            "/api/context",
            serde_json::json!({"question": "tax?", "month": 0, "year": 2024}),
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_unknown_document_is_404() {
        let (app, _) = test_app().await;
        let req = json_request("PUT", "/api/documents/missing", serde_json::json!({"name": "x"}));

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_update_with_inverted_window_is_400() {
        let (app, engine) = test_app().await;
        let id = engine.versions_of("overtime-policy")[0].id.clone();
        let req = json_request(
            "PUT",
            &format!("/api/documents/{}", id),
            serde_json::json!({"effective_to": "2023-12-31"}),
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "bad_request");
        assert_eq!(engine.get(&id).unwrap().effective_to, None);
    }

    #[tokio::test]
    async fn test_effective_latest_by_period() {
        let (app, _) = test_app().await;
        let req = Request::builder()
            .uri("/api/documents/effective?month=6&year=2024&latest=true")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_create_then_delete() {
        let (app, engine) = test_app().await;
        let req = json_request(
            "POST",
            "/api/documents",
            serde_json::json!({
                "logical_key": "faq",
                "name": "Payroll FAQ v1.0",
                "type": "FAQ",
                "version": "1.0",
                "effective_from": "2024-01-01",
                "content": "Payday is the 25th."
            }),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();
        assert!(engine.get(&id).is_some());

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/documents/{}", id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(engine.get(&id).is_none());
    }

    #[tokio::test]
    async fn test_stats_and_versions_routes() {
        let (app, _) = test_app().await;
        let req = Request::builder()
            .uri("/api/documents/stats")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(body_json(response).await["total"], 8);

        let req = Request::builder()
            .uri("/api/documents/versions/tax-calculation")
            .body(Body::empty())
            .unwrap();
        let body = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(body[0]["version"], "3.2");
        assert_eq!(body[1]["version"], "3.1");
    }
}
