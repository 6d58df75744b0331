//! Keyframe and video generation.
//!
//! `GenerationProvider` is what the pipeline sees. It is assembled from one
//! image adapter and exactly one video adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GenerationConfig, VideoBackend};
use crate::error::{ClientError, ClientResult};
use crate::media_check::{validate_image, validate_video};

/// Generates keyframes and scene videos.
///
/// Failures are typed errors; partial or corrupt bytes are never returned as success.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate_keyframe(&self, prompt: &str) -> ClientResult<Vec<u8>>;

    async fn generate_video(
        &self,
        keyframe: &[u8],
        prompt: &str,
        duration_secs: u32,
    ) -> ClientResult<Vec<u8>>;
}

/// Text-to-image adapter.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> ClientResult<Vec<u8>>;
}

/// Image-to-video adapter.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn generate_video(
        &self,
        keyframe: &[u8],
        prompt: &str,
        duration_secs: u32,
    ) -> ClientResult<Vec<u8>>;
}

/// Routes keyframes to the image adapter and videos to the active video adapter.
pub struct CompositeProvider {
    image: Arc<dyn ImageGenerator>,
    video: Arc<dyn VideoGenerator>,
}

impl CompositeProvider {
    pub fn new(image: Arc<dyn ImageGenerator>, video: Arc<dyn VideoGenerator>) -> Self {
        Self { image, video }
    }
}

#[async_trait]
impl GenerationProvider for CompositeProvider {
    async fn generate_keyframe(&self, prompt: &str) -> ClientResult<Vec<u8>> {
        let bytes = self.image.generate_image(prompt).await?;
        validate_image(&bytes)?;
        Ok(bytes)
    }

    async fn generate_video(
        &self,
        keyframe: &[u8],
        prompt: &str,
        duration_secs: u32,
    ) -> ClientResult<Vec<u8>> {
        let bytes = self.video.generate_video(keyframe, prompt, duration_secs).await?;
        validate_video(&bytes)?;
        Ok(bytes)
    }
}

/// Build the configured provider.
pub fn build_generation_provider(config: &GenerationConfig) -> ClientResult<Arc<dyn GenerationProvider>> {
    let image: Arc<dyn ImageGenerator> = Arc::new(HttpImageGenerator::new(config)?);
    let video: Arc<dyn VideoGenerator> = match config.video_backend {
        VideoBackend::Direct => Arc::new(DirectVideoGenerator::new(config)?),
        VideoBackend::Operation => Arc::new(OperationVideoGenerator::new(config)?),
    };
    info!(video_backend = ?config.video_backend, "Generation provider configured");
    Ok(Arc::new(CompositeProvider::new(image, video)))
}

fn http_client(timeout: Duration) -> ClientResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ClientError::Network)
}

fn authorize(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

async fn error_for_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::http(status, body))
    }
}

fn map_timeout(e: reqwest::Error, timeout: Duration) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(timeout.as_secs())
    } else {
        ClientError::Network(e)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest<'a> {
    prompt: &'a str,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    image_base64: Option<String>,
}

/// `POST {image_api_url}/images` returning a base64 image in JSON.
pub struct HttpImageGenerator {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpImageGenerator {
    pub fn new(config: &GenerationConfig) -> ClientResult<Self> {
        Ok(Self {
            http: http_client(config.timeout)?,
            base_url: config.image_api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate_image(&self, prompt: &str) -> ClientResult<Vec<u8>> {
        let url = format!("{}/images", self.base_url);
        debug!(prompt_len = prompt.len(), "Requesting keyframe image");

        let request = self.http.post(&url).json(&ImageRequest {
            prompt,
            aspect_ratio: "16:9",
        });
        let response = authorize(request, self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| map_timeout(e, self.timeout))?;
        let response = error_for_status(response).await?;

        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("image response: {}", e)))?;
        let encoded = body
            .image_base64
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::unusable("image response has no image data"))?;

        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| ClientError::invalid_media(format!("image is not valid base64: {}", e)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoRequest<'a> {
    prompt: &'a str,
    image_base64: String,
    duration_seconds: u32,
    aspect_ratio: &'a str,
}

impl<'a> VideoRequest<'a> {
    fn new(keyframe: &[u8], prompt: &'a str, duration_secs: u32) -> Self {
        Self {
            prompt,
            image_base64: BASE64.encode(keyframe),
            duration_seconds: duration_secs,
            aspect_ratio: "16:9",
        }
    }
}

/// `POST {video_api_url}/videos` answering with the video bytes.
pub struct DirectVideoGenerator {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl DirectVideoGenerator {
    pub fn new(config: &GenerationConfig) -> ClientResult<Self> {
        Ok(Self {
            http: http_client(config.timeout)?,
            base_url: config.video_api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl VideoGenerator for DirectVideoGenerator {
    async fn generate_video(
        &self,
        keyframe: &[u8],
        prompt: &str,
        duration_secs: u32,
    ) -> ClientResult<Vec<u8>> {
        let url = format!("{}/videos", self.base_url);
        debug!(duration_secs, "Requesting scene video");

        let request = self
            .http
            .post(&url)
            .json(&VideoRequest::new(keyframe, prompt, duration_secs));
        let response = authorize(request, self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| map_timeout(e, self.timeout))?;
        let response = error_for_status(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_timeout(e, self.timeout))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct OperationHandle {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationStatus {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    video_uri: Option<String>,
}

/// Long-running operation adapter: submit, poll until done, download.
pub struct OperationVideoGenerator {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    poll_interval: Duration,
}

impl OperationVideoGenerator {
    pub fn new(config: &GenerationConfig) -> ClientResult<Self> {
        // Individual requests are short; the overall deadline is enforced by polling.
        Ok(Self {
            http: http_client(Duration::from_secs(60).min(config.timeout))?,
            base_url: config.video_api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            poll_interval: config.poll_interval,
        })
    }

    async fn submit(&self, keyframe: &[u8], prompt: &str, duration_secs: u32) -> ClientResult<String> {
        let url = format!("{}/operations", self.base_url);
        let request = self
            .http
            .post(&url)
            .json(&VideoRequest::new(keyframe, prompt, duration_secs));
        let response = error_for_status(authorize(request, self.api_key.as_deref()).send().await?).await?;
        let handle: OperationHandle = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("operation handle: {}", e)))?;
        Ok(handle.name)
    }

    async fn poll(&self, name: &str) -> ClientResult<String> {
        let url = format!("{}/operations/{}", self.base_url, urlencode_segment(name));
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            let request = self.http.get(&url);
            let response =
                error_for_status(authorize(request, self.api_key.as_deref()).send().await?).await?;
            let status: OperationStatus = response
                .json()
                .await
                .map_err(|e| ClientError::InvalidResponse(format!("operation status: {}", e)))?;

            if let Some(error) = status.error {
                return Err(ClientError::GenerationFailed(error.message));
            }
            if status.done {
                return status
                    .video_uri
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| ClientError::unusable("operation finished without a video"));
            }
            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(ClientError::Timeout(self.timeout.as_secs()));
            }
            debug!(operation = %name, "Video operation still running");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn download(&self, uri: &str) -> ClientResult<Vec<u8>> {
        let target = resolve_uri(&self.base_url, uri)?;
        let request = self.http.get(target);
        let response = error_for_status(authorize(request, self.api_key.as_deref()).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl VideoGenerator for OperationVideoGenerator {
    async fn generate_video(
        &self,
        keyframe: &[u8],
        prompt: &str,
        duration_secs: u32,
    ) -> ClientResult<Vec<u8>> {
        let name = self.submit(keyframe, prompt, duration_secs).await?;
        info!(operation = %name, "Video operation submitted");
        let uri = self.poll(&name).await?;
        self.download(&uri).await
    }
}

fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

/// Resolve a possibly relative URI against the service base URL.
fn resolve_uri(base: &str, uri: &str) -> ClientResult<url::Url> {
    let base = url::Url::parse(&format!("{}/", base.trim_end_matches('/')))
        .map_err(|e| ClientError::config(format!("invalid video API URL: {}", e)))?;
    base.join(uri)
        .map_err(|e| ClientError::InvalidResponse(format!("invalid video URI '{}': {}", uri, e)))
}
