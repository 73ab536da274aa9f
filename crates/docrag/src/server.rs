//! HTTP service.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | liveness |
//! | `POST /extract-text` | multipart upload (`file`, `document_id`), ingest |
//! | `POST /query-document` | form, multipart or JSON (`document_id`, `query`, `limit?`) |
//! | `DELETE /documents/{document_id}` | drop a document |

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use docrag_core::{DocumentId, IngestReport, SearchResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::App;
use crate::response::{ApiError, BaseResponse};

/// Shared handler state.
pub struct AppState {
    pub app: App,
}

/// Query input accepted as JSON, urlencoded form, or multipart form.
#[derive(Debug, Default, Deserialize)]
struct QueryRequest {
    document_id: String,
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct QueryData {
    document_id: DocumentId,
    query: String,
    results: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
struct DeleteData {
    document_id: DocumentId,
    deleted: u64,
}

/// Build the router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/extract-text", post(extract_text))
        .route("/query-document", post(query_document))
        .route("/documents/:document_id", delete(delete_document))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(state: Arc<AppState>, bind: SocketAddr, max_upload_bytes: usize) -> anyhow::Result<()> {
    let app = router(state, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn health() -> BaseResponse<()> {
    BaseResponse::message(StatusCode::OK, "Service is healthy")
}

async fn extract_text(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<BaseResponse<IngestReport>, ApiError> {
    let mut document_id = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        match field.name() {
            Some("document_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                document_id = Some(parse_document_id(&text)?);
            }
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                upload = Some((data, filename, content_type));
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let document_id = document_id.ok_or_else(|| ApiError::bad_request("missing field `document_id`"))?;
    let (data, filename, content_type) =
        upload.ok_or_else(|| ApiError::bad_request("missing field `file`"))?;

    info!(
        "Ingesting {} ({} bytes, {})",
        document_id,
        data.len(),
        filename.as_deref().unwrap_or("unnamed")
    );
    let report = state
        .app
        .ingest
        .ingest(
            document_id,
            &data,
            content_type.as_deref(),
            filename.as_deref(),
        )
        .await?;

    Ok(BaseResponse::ok("Work completed", report))
}

async fn query_document(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<BaseResponse<QueryData>, ApiError> {
    let input = read_query_request(&state, request).await?;
    let document_id = parse_document_id(&input.document_id)?;

    let results = state
        .app
        .query
        .query_with_limit(document_id, &input.query, input.limit)
        .await?;

    Ok(BaseResponse::ok(
        format!("Top {} relevant chunks retrieved", results.len()),
        QueryData {
            document_id,
            query: input.query,
            results,
        },
    ))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<BaseResponse<DeleteData>, ApiError> {
    let document_id = parse_document_id(&document_id)?;
    let deleted = state.app.ingest.delete(document_id).await?;

    Ok(BaseResponse::ok(
        "Document deleted",
        DeleteData {
            document_id,
            deleted,
        },
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_document_id(raw: &str) -> Result<DocumentId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::bad_request(format!("document_id must be a UUID: {e}")))
}

/// Decode the query body according to its content type.
async fn read_query_request(
    state: &Arc<AppState>,
    request: Request,
) -> Result<QueryRequest, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let Json(input) = Json::<QueryRequest>::from_request(request, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        Ok(input)
    } else if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        read_query_multipart(multipart).await
    } else {
        let Form(input) = Form::<QueryRequest>::from_request(request, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        Ok(input)
    }
}

async fn read_query_multipart(mut multipart: Multipart) -> Result<QueryRequest, ApiError> {
    let mut document_id = None;
    let mut query = None;
    let mut limit = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        match name.as_deref() {
            Some("document_id") => document_id = Some(value),
            Some("query") => query = Some(value),
            Some("limit") => {
                limit = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|e| ApiError::bad_request(format!("invalid limit: {e}")))?,
                );
            }
            _ => {}
        }
    }

    Ok(QueryRequest {
        document_id: document_id.ok_or_else(|| ApiError::bad_request("missing field `document_id`"))?,
        query: query.ok_or_else(|| ApiError::bad_request("missing field `query`"))?,
        limit,
    })
}
