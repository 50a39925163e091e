//! Front-End HTTP Surface
//!
//! The upload/playback API the web binary serves: video registration and
//! listing against the metadata index, blob reads and writes through the
//! configured content service. Payloads are raw bytes; rendering, MIME
//! handling, and transcoding belong to clients.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use chrono::Utc;

use crate::content::ContentService;
use crate::error::ContentError;
use crate::storage::protocol::BODY_LIMIT_BYTES;
use crate::web::metadata::MetadataStore;

pub fn router(metadata: Arc<MetadataStore>, content: Arc<ContentService>) -> Router {
    Router::new()
        .route("/videos", get(handle_list_videos))
        .route(
            "/videos/:video_id",
            post(handle_create_video).get(handle_get_video),
        )
        .route(
            "/content/:video_id/:filename",
            put(handle_write_content).get(handle_read_content),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(Extension(metadata))
        .layer(Extension(content))
}

fn content_error_response(err: ContentError) -> Response {
    (err.status(), err.to_string()).into_response()
}

pub async fn handle_list_videos(
    Extension(metadata): Extension<Arc<MetadataStore>>,
) -> Response {
    match metadata.list().await {
        Ok(videos) => Json(videos).into_response(),
        Err(e) => {
            tracing::error!("failed to list videos: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn handle_create_video(
    Extension(metadata): Extension<Arc<MetadataStore>>,
    Path(video_id): Path<String>,
) -> Response {
    match metadata.read(&video_id).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                format!("video id already exists: {video_id}"),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("failed to check video id {}: {}", video_id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    }
    match metadata.create(&video_id, Utc::now()).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => {
            tracing::error!("failed to register video {}: {}", video_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn handle_get_video(
    Extension(metadata): Extension<Arc<MetadataStore>>,
    Path(video_id): Path<String>,
) -> Response {
    match metadata.read(&video_id).await {
        Ok(Some(video)) => Json(video).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, format!("no such video: {video_id}")).into_response(),
        Err(e) => {
            tracing::error!("failed to read video {}: {}", video_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn handle_write_content(
    Extension(content): Extension<Arc<ContentService>>,
    Path((video_id, filename)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    match content.write(&video_id, &filename, body.to_vec()).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!("failed to write {}/{}: {}", video_id, filename, e);
            content_error_response(e)
        }
    }
}

pub async fn handle_read_content(
    Extension(content): Extension<Arc<ContentService>>,
    Path((video_id, filename)): Path<(String, String)>,
) -> Response {
    match content.read(&video_id, &filename).await {
        Ok(data) => data.into_response(),
        Err(e) => content_error_response(e),
    }
}
