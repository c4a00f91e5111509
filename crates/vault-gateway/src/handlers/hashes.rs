use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::ApiResult;
use crate::handlers::{client_ip, maybe_wait_for_sync, presented_key, SyncQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HashItem {
    pub name: String,
    pub hash_sha256: String,
}

#[derive(Debug, Serialize)]
pub struct HashesResponse {
    pub collection: String,
    pub items: Vec<HashItem>,
}

/// `GET /api/v1/collections/:collection/hashes` — every READY object's name
/// and hash, for a client reconciling its own local copy against the vault.
pub async fn list_hashes(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(query): Query<SyncQuery>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> ApiResult<Json<HashesResponse>> {
    crate::auth::authenticate(&state, &collection, presented_key(&headers), client_ip(connect_info))
        .await?;

    maybe_wait_for_sync(&state, &collection, query.timeout()).await;

    let pool = state.catalog.pool();
    let objects = vault_catalog::ObjectRepository::list_ready(&pool, &collection)
        .await
        .map_err(vault_types::VaultError::catalog)?;

    let items = objects
        .into_iter()
        .map(|o| HashItem {
            name: o.name,
            hash_sha256: o.hash_sha256,
        })
        .collect();

    Ok(Json(HashesResponse { collection, items }))
}

#[derive(Debug, Serialize)]
pub struct HashResponse {
    pub collection: String,
    pub name: String,
    pub hash_sha256: String,
}

/// `GET /api/v1/collections/:collection/hashes/*name` — a single object's
/// hash, for a client that wants to skip downloading unchanged files.
pub async fn get_hash(
    State(state): State<AppState>,
    Path((collection, name)): Path<(String, String)>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> ApiResult<Json<HashResponse>> {
    crate::auth::authenticate(&state, &collection, presented_key(&headers), client_ip(connect_info))
        .await?;

    let pool = state.catalog.pool();
    let object = vault_catalog::ObjectRepository::get_ready(&pool, &collection, &name)
        .await
        .map_err(vault_types::VaultError::catalog)?
        .ok_or(vault_types::VaultError::NotFound)?;

    Ok(Json(HashResponse {
        collection,
        name: object.name,
        hash_sha256: object.hash_sha256,
    }))
}
