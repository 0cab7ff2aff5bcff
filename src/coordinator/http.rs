//! HTTP API for the coordinator
//!
//! | Route            | Method | Result                                |
//! |------------------|--------|---------------------------------------|
//! | `/list`          | GET    | JSON map of id → file record          |
//! | `/upload`        | POST   | 201, multipart field `file`           |
//! | `/nearest/:id`   | GET    | JSON descriptor of the closest node   |
//! | `/file/:id`      | GET    | 307 redirect to a node's file URL     |
//! | `/delete/:id`    | DELETE | plain-text confirmation               |
//! | `/health`        | GET    | liveness and counts                   |

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{Error, Result, StorageNode};
use crate::coordinator::metadata::FileRecord;
use crate::coordinator::Coordinator;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Shared coordinator state for HTTP handlers.
pub type CoordState = Arc<Coordinator>;

/// Response header carrying the id assigned to an upload
pub const FILE_ID_HEADER: &str = "X-File-ID";

/// Creates the HTTP router with all public endpoints.
pub fn create_router(state: CoordState) -> Router {
    let max_upload = state.config().max_upload_bytes;
    let static_dir = state.config().static_dir.clone();

    let mut router = Router::new()
        .route("/list", get(list_files))
        .route("/upload", post(upload))
        .route("/nearest/:id", get(nearest))
        .route("/file/:id", get(read_file))
        .route("/delete/:id", delete(delete_file))
        .route("/health", get(health));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    let body_limit = match max_upload {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    router
        .layer(body_limit)
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn list_files(State(coord): State<CoordState>) -> Json<BTreeMap<String, FileRecord>> {
    Json(coord.list())
}

/// Accepts one multipart field named `file`; other fields are ignored.
async fn upload(
    State(coord): State<CoordState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("malformed multipart body", e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("failed to read file part", e))?;
        upload = Some((filename, data));
        break;
    }

    let Some((filename, data)) = upload else {
        tracing::warn!("Upload rejected: no file part");
        return Err(Error::InvalidRequest("file required".into()));
    };

    let record = coord.ingest(&filename, data).await;
    Ok((StatusCode::CREATED, [(FILE_ID_HEADER, record.id)]))
}

/// Oversized bodies surface as multipart errors once the body limit trips.
fn multipart_error(context: &str, e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload rejected: body exceeds the configured limit");
        Error::PayloadTooLarge(format!("{}: {}", context, e.body_text()))
    } else {
        Error::InvalidRequest(format!("{}: {}", context, e.body_text()))
    }
}

async fn nearest(
    State(coord): State<CoordState>,
    Path(id): Path<String>,
) -> Result<Json<StorageNode>> {
    coord.locate_nearest_default(&id).map(Json)
}

async fn read_file(State(coord): State<CoordState>, Path(id): Path<String>) -> Result<Redirect> {
    let url = coord.resolve_for_read(&id)?;
    Ok(Redirect::temporary(&url))
}

async fn delete_file(State(coord): State<CoordState>, Path(id): Path<String>) -> &'static str {
    coord.delete(&id).await;
    "deleted"
}

async fn health(State(coord): State<CoordState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "nodes": coord.nodes().len(),
        "files": coord.file_count(),
        "version": crate::VERSION,
        "build": crate::BUILD_INFO,
    }))
}
