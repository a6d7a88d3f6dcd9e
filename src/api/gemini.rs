//! Client for the Google Generative Language API: resumable file upload,
//! processing-state polling, and the combined video+prompt generation call.

use crate::error::AppError;
use anyhow::{Context, anyhow};
use reqwest::Client;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL_NAME: &str = "gemini-1.5-pro";
const VIDEO_MIME_TYPE: &str = "video/mp4";

// Multimodal inference over a whole video is slow; match the generous
// ceiling the service itself documents.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const MAX_POLLS: u32 = 60;

/// Remote processing state of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    Processing,
    Active,
    Failed,
    Unknown(String),
}

impl FileState {
    fn parse(raw: &str) -> FileState {
        match raw {
            "PROCESSING" => FileState::Processing,
            "ACTIVE" => FileState::Active,
            "FAILED" => FileState::Failed,
            other => FileState::Unknown(other.to_string()),
        }
    }
}

/// Opaque reference to a video held by the remote file service. The service
/// owns the resource; we only poll and reference it.
#[derive(Debug, Clone)]
pub struct RemoteVideo {
    pub name: String,
    pub uri: String,
    pub state: FileState,
}

pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: POLL_INTERVAL,
            max_polls: MAX_POLLS,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// Upload a local video file and return its remote handle. Two-step
    /// resumable protocol: a start request yields an upload URL, then one
    /// `upload, finalize` post carries the bytes.
    pub async fn upload_video(&self, path: &Path) -> Result<RemoteVideo, AppError> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("read video: {}", path.display()))?;

        info!("uploading {} bytes to file service", bytes.len());

        let start_url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        let start = self
            .http
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", VIDEO_MIME_TYPE)
            .json(&json!({ "file": { "display_name": "uploaded_video" } }))
            .send()
            .await
            .context("file upload start request failed")?;

        if !start.status().is_success() {
            return Err(anyhow!("file upload start failed: HTTP {}", start.status()).into());
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .context("upload response missing x-goog-upload-url header")?;

        let finalize = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(bytes)
            .send()
            .await
            .context("file upload request failed")?;

        if !finalize.status().is_success() {
            return Err(anyhow!("file upload failed: HTTP {}", finalize.status()).into());
        }

        let body: Value = finalize
            .json()
            .await
            .context("file upload response was not JSON")?;
        let video = parse_file_resource(body.get("file").unwrap_or(&body))
            .context("file upload response missing file metadata")?;

        info!("completed upload: {}", video.uri);
        Ok(video)
    }

    /// Fetch the current processing state of an uploaded file.
    pub async fn get_file_state(&self, name: &str) -> Result<FileState, AppError> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("file state request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!("file state request failed: HTTP {}", resp.status()).into());
        }

        let body: Value = resp
            .json()
            .await
            .context("file state response was not JSON")?;
        Ok(parse_state_response(&body)?)
    }

    /// Poll at a fixed interval until the file leaves PROCESSING. Bounded:
    /// after `max_polls` checks the wait is surfaced as a timeout instead of
    /// hanging on the remote service forever.
    pub async fn wait_until_active(&self, video: &RemoteVideo) -> Result<(), AppError> {
        let mut state = video.state.clone();
        let mut polls = 0u32;

        loop {
            match state {
                FileState::Active => return Ok(()),
                FileState::Failed => return Err(AppError::ProcessingFailed("FAILED".to_string())),
                FileState::Unknown(other) => return Err(AppError::ProcessingFailed(other)),
                FileState::Processing => {}
            }

            if polls >= self.max_polls {
                return Err(AppError::ProcessingTimeout);
            }
            polls += 1;

            tokio::time::sleep(self.poll_interval).await;
            state = self.get_file_state(&video.name).await?;
            debug!("file {} state after poll {}: {:?}", video.name, polls, state);
        }
    }

    /// Single combined generation call: the uploaded video reference plus
    /// the composed prompt. Returns the whitespace-trimmed script text.
    pub async fn generate_script(
        &self,
        video: &RemoteVideo,
        prompt: &str,
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, MODEL_NAME, self.api_key
        );

        let body = json!({
            "contents": [{
                "parts": [
                    { "file_data": { "mime_type": VIDEO_MIME_TYPE, "file_uri": video.uri } },
                    { "text": prompt },
                ]
            }]
        });

        info!("making LLM inference request");
        let resp = self
            .http
            .post(&url)
            .timeout(GENERATE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .context("generateContent request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!("generateContent failed: HTTP {}", resp.status()).into());
        }

        let body: Value = resp
            .json()
            .await
            .context("generateContent response was not JSON")?;
        let text =
            extract_text(&body).context("generateContent response had no text candidates")?;
        Ok(text.trim().to_string())
    }
}

// A state-fetch response without a state field is an error, not PROCESSING:
// defaulting would burn the whole poll budget on a malformed response before
// anything surfaced.
fn parse_state_response(body: &Value) -> anyhow::Result<FileState> {
    let raw = body
        .get("state")
        .and_then(|s| s.as_str())
        .context("file state response missing state field")?;
    Ok(FileState::parse(raw))
}

fn parse_file_resource(v: &Value) -> Option<RemoteVideo> {
    let name = v.get("name")?.as_str()?.to_string();
    let uri = v.get("uri")?.as_str()?.to_string();
    let state = v
        .get("state")
        .and_then(|s| s.as_str())
        .map(FileState::parse)
        .unwrap_or(FileState::Processing);
    Some(RemoteVideo { name, uri, state })
}

fn extract_text(root: &Value) -> Option<String> {
    let candidates = root.get("candidates")?.as_array()?;
    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array());
        let Some(parts) = parts else { continue };

        let mut out = String::new();
        for part in parts {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                out.push_str(text);
            }
        }
        if !out.is_empty() {
            return Some(out);
        }
    }
    None
}
