use serde::{Deserialize, Serialize};

use crate::domain::VideoId;

/// Acknowledgment for `PUT /items/reorder/`. Does not echo the stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadVideoResponse {
    pub id: VideoId,
    pub filename: String,
}

pub const REORDER_ACK_MESSAGE: &str = "Items reordered successfully";
