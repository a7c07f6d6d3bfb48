//! API Routes

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::actuator::Direction;
use crate::error::Result;
use crate::models::{ApiResponse, MoveResult};
use crate::state::AppState;
use crate::stream_hub::STREAM_CONTENT_TYPE;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Viewer
        .route("/", get(index))
        .route("/video_feed", get(video_feed))
        // Gimbal control
        .route("/move/:direction", get(move_camera))
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::device_status))
        .with_state(state)
}

/// GET /
/// Embedded viewer page
async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// GET /video_feed
/// Long-lived multipart stream; one hub session per viewer. The session
/// ends (and is dropped from the hub) when the client disconnects.
async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let (_id, rx) = state.hub.register();

    let body = Body::from_stream(
        ReceiverStream::new(rx).map(Ok::<_, std::convert::Infallible>),
    );

    ([(header::CONTENT_TYPE, STREAM_CONTENT_TYPE)], body)
}

/// GET /move/:direction
/// Accept a motion request. The direction token is validated here,
/// before anything reaches the actuator; unknown tokens have zero
/// hardware effect.
async fn move_camera(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<MoveResult>>> {
    let direction: Direction = token.parse()?;
    let axis = state.actuator.request(direction).await?;

    tracing::info!(direction = %direction, axis = %axis, "Move executed");

    Ok(Json(ApiResponse::success(MoveResult { direction, axis })))
}
