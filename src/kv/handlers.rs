use axum::{Extension, Json, Router, http::StatusCode, routing::post};
use std::sync::Arc;

use super::CasOutcome;
use super::memory::MemoryKv;
use super::protocol::*;

pub fn router(store: Arc<MemoryKv>) -> Router {
    Router::new()
        .route(ENDPOINT_KV_READ, post(handle_read))
        .route(ENDPOINT_KV_WRITE, post(handle_write))
        .route(ENDPOINT_KV_CAS, post(handle_cas))
        .layer(Extension(store))
}

pub async fn handle_read(
    Extension(store): Extension<Arc<MemoryKv>>,
    Json(req): Json<ReadRequest>,
) -> (StatusCode, Json<ReadResponse>) {
    match store.get(&req.key) {
        Some(value) => (StatusCode::OK, Json(ReadResponse { value: Some(value) })),
        None => (StatusCode::NOT_FOUND, Json(ReadResponse { value: None })),
    }
}

pub async fn handle_write(
    Extension(store): Extension<Arc<MemoryKv>>,
    Json(req): Json<WriteRequest>,
) -> (StatusCode, Json<KvAck>) {
    store.put(&req.key, req.value);
    tracing::trace!("kv write {}", req.key);
    (StatusCode::OK, Json(KvAck::default()))
}

pub async fn handle_cas(
    Extension(store): Extension<Arc<MemoryKv>>,
    Json(req): Json<CasRequest>,
) -> (StatusCode, Json<KvAck>) {
    match store.compare_and_swap(&req.key, req.from, req.to, req.create_if_not_exists) {
        CasOutcome::Swapped => (StatusCode::OK, Json(KvAck::default())),
        CasOutcome::Conflict => {
            tracing::debug!("kv cas conflict on {}", req.key);
            (StatusCode::PRECONDITION_FAILED, Json(KvAck::default()))
        }
    }
}
