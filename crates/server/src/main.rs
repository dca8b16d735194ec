use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use server_api::{
    create_item, delete_item, delete_video, item_route, items_route, list_items, list_videos,
    reorder_items, reorder_route, store_video, update_item, ApiContext,
};
use shared::{
    domain::{Item, ItemDraft, ItemId, Video, VideoId},
    error::{ApiError, ErrorCode},
    protocol::{MessageResponse, ReorderResponse, UploadVideoResponse},
};
use storage::Storage;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url};

/// Headroom on top of the video size limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type Rejection = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    std::fs::create_dir_all(&settings.upload_dir)?;

    let api = ApiContext {
        storage,
        upload_dir: settings.upload_dir.clone(),
        max_upload_bytes: settings.max_upload_bytes,
    };
    let cors = cors_layer(&settings.allowed_origin);
    let app = build_router(Arc::new(AppState { api })).layer(cors);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, upload_dir = %settings.upload_dir.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .api
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let uploads = ServeDir::new(&state.api.upload_dir);

    Router::new()
        .route("/healthz", get(healthz))
        .route(items_route(), get(http_list_items).post(http_create_item))
        .route(reorder_route(), put(http_reorder_items))
        .route(item_route(), put(http_update_item).delete(http_delete_item))
        .route("/upload-video/", post(http_upload_video))
        .route("/videos/", get(http_list_videos))
        .route("/videos/:video_id", delete(http_delete_video))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(error) => {
            warn!(allowed_origin, %error, "invalid CORS origin; cross-origin requests disabled");
            layer
        }
    }
}

fn reject(err: ApiError) -> Rejection {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(code = ?err.code, message = %err.message, "request failed");
    } else {
        warn!(code = ?err.code, message = %err.message, "request rejected");
    }
    (status, Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_list_items(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Item>>, Rejection> {
    list_items(&state.api).await.map(Json).map_err(reject)
}

async fn http_create_item(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ItemDraft>,
) -> Result<Json<Item>, Rejection> {
    create_item(&state.api, draft).await.map(Json).map_err(reject)
}

async fn http_update_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
    Json(draft): Json<ItemDraft>,
) -> Result<Json<Item>, Rejection> {
    update_item(&state.api, ItemId(item_id), draft)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_delete_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> Result<Json<MessageResponse>, Rejection> {
    delete_item(&state.api, ItemId(item_id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_reorder_items(
    State(state): State<Arc<AppState>>,
    Json(item_ids): Json<Vec<ItemId>>,
) -> Result<Json<ReorderResponse>, Rejection> {
    reorder_items(&state.api, &item_ids)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_list_videos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Video>>, Rejection> {
    list_videos(&state.api).await.map(Json).map_err(reject)
}

async fn http_upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadVideoResponse>, Rejection> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        reject(ApiError::new(ErrorCode::Validation, e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(malformed)?;
        return store_video(&state.api, &filename, &bytes)
            .await
            .map(Json)
            .map_err(reject);
    }

    Err(reject(ApiError::new(
        ErrorCode::Validation,
        "multipart field 'file' is required",
    )))
}

async fn http_delete_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Json<MessageResponse>, Rejection> {
    delete_video(&state.api, VideoId(video_id))
        .await
        .map(Json)
        .map_err(reject)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
