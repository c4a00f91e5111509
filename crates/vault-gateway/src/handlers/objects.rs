use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::handlers::{client_ip, maybe_wait_for_sync, presented_key, SyncQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ObjectsResponse {
    pub collection: String,
    pub objects: Vec<String>,
}

/// `GET /api/v1/collections/:collection/objects` — the names of every object
/// currently READY in `collection`, optionally waiting on the sync barrier
/// first so a client that just wrote files sees them without polling.
pub async fn list_objects(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(query): Query<SyncQuery>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> ApiResult<Json<ObjectsResponse>> {
    crate::auth::authenticate(&state, &collection, presented_key(&headers), client_ip(connect_info))
        .await?;

    maybe_wait_for_sync(&state, &collection, query.timeout()).await;

    let pool = state.catalog.pool();
    let objects = vault_catalog::ObjectRepository::list_ready_names(&pool, &collection)
        .await
        .map_err(vault_types::VaultError::catalog)?;

    Ok(Json(ObjectsResponse { collection, objects }))
}

/// `GET /api/v1/collections/:collection/objects/*name` — streams the object's
/// bytes straight from the backing store, with its hash and size as headers.
pub async fn download_object(
    State(state): State<AppState>,
    Path((collection, name)): Path<(String, String)>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    crate::auth::authenticate(&state, &collection, presented_key(&headers), client_ip(connect_info))
        .await?;

    let pool = state.catalog.pool();
    let object = vault_catalog::ObjectRepository::get_ready(&pool, &collection, &name)
        .await
        .map_err(vault_types::VaultError::catalog)?
        .ok_or(vault_types::VaultError::NotFound)?;

    let stream = state.store.open(&object.object_key).await?;
    let body = Body::from_stream(stream);

    let disposition = format!("attachment; filename=\"{}\"", sanitize_filename(&object.name));
    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, object.size_bytes.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("X-Object-Hash-SHA256", object.hash_sha256)
        .body(body)
        .map_err(|err| ApiError(vault_types::VaultError::Transient(err.to_string())))?;

    Ok(response.into_response())
}

/// Strips characters that would break a quoted `Content-Disposition` header;
/// the name is otherwise a path-derived string, not user free text.
fn sanitize_filename(name: &str) -> String {
    name.replace(['"', '\\'], "_")
}
