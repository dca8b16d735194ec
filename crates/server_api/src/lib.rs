use std::path::{Path, PathBuf};

use shared::{
    domain::{Item, ItemDraft, ItemId, Video, VideoId},
    error::{ApiError, ErrorCode},
    protocol::{MessageResponse, ReorderResponse, UploadVideoResponse, REORDER_ACK_MESSAGE},
};
use storage::Storage;
use tracing::{info, warn};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const MAX_FILENAME_BYTES: usize = 180;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

pub fn items_route() -> &'static str {
    "/items/"
}

pub fn item_route() -> &'static str {
    "/items/:item_id"
}

pub fn reorder_route() -> &'static str {
    "/items/reorder/"
}

pub async fn list_items(ctx: &ApiContext) -> Result<Vec<Item>, ApiError> {
    ctx.storage.list_items().await.map_err(internal)
}

pub async fn create_item(ctx: &ApiContext, draft: ItemDraft) -> Result<Item, ApiError> {
    draft.validate()?;
    let item = ctx.storage.create_item(&draft).await.map_err(internal)?;
    info!(item_id = %item.id, sort_order = item.sort_order, "item created");
    Ok(item)
}

pub async fn update_item(
    ctx: &ApiContext,
    item_id: ItemId,
    draft: ItemDraft,
) -> Result<Item, ApiError> {
    draft.validate()?;
    ctx.storage
        .update_item(item_id, &draft)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("Item not found"))
}

pub async fn delete_item(ctx: &ApiContext, item_id: ItemId) -> Result<MessageResponse, ApiError> {
    if !ctx.storage.delete_item(item_id).await.map_err(internal)? {
        return Err(ApiError::not_found("Item not found"));
    }
    info!(%item_id, "item deleted");
    Ok(MessageResponse {
        message: "Item deleted".to_string(),
    })
}

/// Position in `item_ids` becomes the new `sort_order`.
pub async fn reorder_items(
    ctx: &ApiContext,
    item_ids: &[ItemId],
) -> Result<ReorderResponse, ApiError> {
    ctx.storage
        .reorder_items(item_ids)
        .await
        .map_err(|err| {
            ApiError::new(
                ErrorCode::Internal,
                format!("Error reordering items: {err:#}"),
            )
        })?;
    Ok(ReorderResponse {
        message: REORDER_ACK_MESSAGE.to_string(),
    })
}

pub async fn list_videos(ctx: &ApiContext) -> Result<Vec<Video>, ApiError> {
    ctx.storage.list_videos().await.map_err(internal)
}

pub async fn store_video(
    ctx: &ApiContext,
    filename: &str,
    bytes: &[u8],
) -> Result<UploadVideoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "video body cannot be empty",
        ));
    }
    if bytes.len() > ctx.max_upload_bytes {
        return Err(ApiError::new(
            ErrorCode::PayloadTooLarge,
            format!("File size exceeds {} bytes", ctx.max_upload_bytes),
        ));
    }
    let filename = sanitize_filename(filename)?;

    tokio::fs::create_dir_all(&ctx.upload_dir)
        .await
        .map_err(|e| internal(e.into()))?;
    let stored_path = ctx
        .upload_dir
        .join(format!("{}-{filename}", uuid::Uuid::new_v4()));
    tokio::fs::write(&stored_path, bytes)
        .await
        .map_err(|e| internal(e.into()))?;

    let stored_path = stored_path.to_string_lossy().replace('\\', "/");
    let video = ctx
        .storage
        .insert_video(filename, &stored_path)
        .await
        .map_err(internal)?;
    info!(video_id = %video.id, size_bytes = bytes.len(), "video stored");
    Ok(UploadVideoResponse {
        id: video.id,
        filename: video.filename,
    })
}

pub async fn delete_video(ctx: &ApiContext, video_id: VideoId) -> Result<MessageResponse, ApiError> {
    let stored_path = ctx
        .storage
        .delete_video(video_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    if let Err(error) = tokio::fs::remove_file(Path::new(&stored_path)).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            warn!(%video_id, %stored_path, %error, "failed to remove video file");
        }
    }

    Ok(MessageResponse {
        message: "Video deleted successfully".to_string(),
    })
}

fn sanitize_filename(raw: &str) -> Result<&str, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "filename is required"));
    }
    if name.len() > MAX_FILENAME_BYTES {
        return Err(ApiError::new(ErrorCode::Validation, "filename is too long"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "filename must not contain path separators",
        ));
    }
    Ok(name)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}
