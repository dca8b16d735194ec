use futures::Stream;
use reqwest::{
    multipart::{Form, Part},
    Body,
};
use shared::{
    domain::{Video, VideoId},
    protocol::UploadVideoResponse,
};

use crate::{error::NetworkError, gateway::HttpEndpoint};

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Client for the video resource. Uploads report whole-number percentages.
#[derive(Clone)]
pub struct VideoGateway {
    endpoint: HttpEndpoint,
}

impl VideoGateway {
    pub fn new(server_url: &str) -> Result<Self, NetworkError> {
        Ok(Self {
            endpoint: HttpEndpoint::new(server_url)?,
        })
    }

    pub async fn list_videos(&self) -> Result<Vec<Video>, NetworkError> {
        const OP: &str = "list videos";
        let url = self.endpoint.url(OP, "videos/")?;
        self.endpoint
            .send_json(OP, self.endpoint.http().get(url))
            .await
    }

    /// Streams `bytes` as the multipart field `file`.
    ///
    /// `on_progress` tracks bytes handed to the transport, so 100 can fire
    /// before the server has stored anything. Only a returned `Ok` means the
    /// video was saved.
    pub async fn upload_video<F>(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        on_progress: F,
    ) -> Result<UploadVideoResponse, NetworkError>
    where
        F: FnMut(u8) + Send + Sync + 'static,
    {
        const OP: &str = "upload video";
        let url = self.endpoint.url(OP, "upload-video/")?;
        let total = bytes.len() as u64;
        let body = Body::wrap_stream(progress_chunks(bytes, UPLOAD_CHUNK_BYTES, on_progress));
        let part = Part::stream_with_length(body, total).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        self.endpoint
            .send_json(OP, self.endpoint.http().post(url).multipart(form))
            .await
    }

    pub async fn delete_video(&self, video_id: VideoId) -> Result<(), NetworkError> {
        const OP: &str = "delete video";
        let url = self.endpoint.url(OP, &format!("videos/{video_id}"))?;
        self.endpoint
            .send(OP, self.endpoint.http().delete(url))
            .await?;
        Ok(())
    }
}

/// Splits `bytes` into chunks and reports the rounded percentage handed to the
/// transport as each chunk is pulled.
pub(crate) fn progress_chunks<F>(
    bytes: Vec<u8>,
    chunk_size: usize,
    mut on_progress: F,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + Sync + 'static
where
    F: FnMut(u8) + Send + Sync + 'static,
{
    let total = bytes.len() as u64;
    if total == 0 {
        on_progress(100);
    }
    let chunks: Vec<Vec<u8>> = bytes
        .chunks(chunk_size.max(1))
        .map(<[u8]>::to_vec)
        .collect();
    let mut sent = 0u64;
    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        on_progress(percent(sent, total));
        Ok(chunk)
    }))
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent * 100 + total / 2) / total).min(100) as u8
}

#[cfg(test)]
#[path = "tests/videos_tests.rs"]
mod tests;
