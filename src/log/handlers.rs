use axum::{
    Extension, Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;

use super::error::LogError;
use super::node::LogNode;
use super::protocol::*;
use crate::kv::KvStore;
use crate::transport::Transport;
use crate::transport::protocol::{ENDPOINT_PEER, PeerReply, PeerRequest};

/// Converts a `LogError` into an HTTP error response. Every failed client
/// or peer request is logged here, once, at `error`.
///
/// Body: `{ "status": "error", "code": <u16>, "message": "..." }`.
pub struct ApiError(pub LogError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LogError::OffsetOutOfRange { .. } | LogError::Malformed(_) => StatusCode::BAD_REQUEST,
            LogError::Misrouted { .. } => StatusCode::CONFLICT,
            LogError::Routing { .. } => StatusCode::BAD_GATEWAY,
            LogError::SerializerClosed => StatusCode::SERVICE_UNAVAILABLE,
            LogError::Store(_) | LogError::CorruptState { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!("request failed ({}): {}", status, self.0);

        let body = ErrorResponse {
            status: "error".to_string(),
            code: self.0.code(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        ApiError(err)
    }
}

/// Client and peer routes of a log node.
pub fn router<T: Transport, S: KvStore>(node: Arc<LogNode<T, S>>) -> Router {
    Router::new()
        .route(ENDPOINT_SEND, post(handle_send::<T, S>))
        .route(ENDPOINT_POLL, post(handle_poll::<T, S>))
        .route(ENDPOINT_COMMIT_OFFSETS, post(handle_commit_offsets::<T, S>))
        .route(
            ENDPOINT_LIST_COMMITTED_OFFSETS,
            post(handle_list_committed_offsets::<T, S>),
        )
        .route(ENDPOINT_PEER, post(handle_peer::<T, S>))
        .layer(Extension(node))
}

/// Unpacks a JSON body, turning axum's rejection into a `Malformed` error.
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(req)| req)
        .map_err(|rejection| ApiError(LogError::Malformed(rejection.body_text())))
}

pub async fn handle_send<T: Transport, S: KvStore>(
    Extension(node): Extension<Arc<LogNode<T, S>>>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let req = parse_body(body)?;
    let offset = node.send(req.key, req.msg).await?;
    Ok(Json(SendResponse { offset }))
}

pub async fn handle_poll<T: Transport, S: KvStore>(
    Extension(node): Extension<Arc<LogNode<T, S>>>,
    body: Result<Json<PollRequest>, JsonRejection>,
) -> Result<Json<PollResponse>, ApiError> {
    let req = parse_body(body)?;
    let msgs = node.poll(req.offsets).await?;
    Ok(Json(PollResponse { msgs }))
}

pub async fn handle_commit_offsets<T: Transport, S: KvStore>(
    Extension(node): Extension<Arc<LogNode<T, S>>>,
    body: Result<Json<CommitOffsetsRequest>, JsonRejection>,
) -> Result<Json<CommitOffsetsResponse>, ApiError> {
    let req = parse_body(body)?;
    node.commit_offsets(&req.client, req.offsets).await?;
    Ok(Json(CommitOffsetsResponse::default()))
}

pub async fn handle_list_committed_offsets<T: Transport, S: KvStore>(
    Extension(node): Extension<Arc<LogNode<T, S>>>,
    body: Result<Json<ListCommittedOffsetsRequest>, JsonRejection>,
) -> Result<Json<ListCommittedOffsetsResponse>, ApiError> {
    let req = parse_body(body)?;
    let offsets = node.list_committed_offsets(&req.client, &req.keys).await?;
    Ok(Json(ListCommittedOffsetsResponse { offsets }))
}

pub async fn handle_peer<T: Transport, S: KvStore>(
    Extension(node): Extension<Arc<LogNode<T, S>>>,
    body: Result<Json<PeerRequest>, JsonRejection>,
) -> Result<Json<PeerReply>, ApiError> {
    let req = parse_body(body)?;
    let reply = node.handle_peer(req).await?;
    Ok(Json(reply))
}
