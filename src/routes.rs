//! HTTP surface: the two POST endpoints and their multipart form handling.

use crate::api::edge_tts::EdgeTtsClient;
use crate::api::gemini::GeminiClient;
use crate::error::AppError;
use crate::prompt::{self, Level};
use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ScriptResponse {
    pub script: String,
}

const DEFAULT_DURATION_SECS: i64 = 60;

// Uploaded clips are short but can still be tens of megabytes.
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub gemini: Arc<GeminiClient>,
    pub tts: Arc<EdgeTtsClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/getScript", post(get_script))
        .route("/generate-audio", post(generate_audio))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid multipart request: {err}"))
}

/// `POST /getScript` — video + duration + level in, narration script out.
async fn get_script(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScriptResponse>, AppError> {
    let mut video: Option<Vec<u8>> = None;
    let mut duration = DEFAULT_DURATION_SECS;
    let mut level_raw = Level::DEFAULT.number();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name().unwrap_or("") {
            "video" => {
                let data = field.bytes().await.map_err(bad_multipart)?;
                video = Some(data.to_vec());
            }
            "duration" => {
                let text = field.text().await.map_err(bad_multipart)?;
                duration = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::BadRequest("duration is missing or invalid".to_string()))?;
            }
            "level" => {
                let text = field.text().await.map_err(bad_multipart)?;
                level_raw = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::BadRequest("level is missing or invalid".to_string()))?;
            }
            _ => {}
        }
    }

    // All validation happens before the remote service is contacted.
    let video = video
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("no video file provided".to_string()))?;
    if duration < 1 {
        return Err(AppError::BadRequest(
            "duration must be a positive number of seconds".to_string(),
        ));
    }
    let level = Level::from_number(level_raw).ok_or_else(|| {
        AppError::BadRequest(format!("level must be between 1 and 5, got {level_raw}"))
    })?;

    info!(
        duration,
        level = level_raw,
        video_bytes = video.len(),
        "script generation request"
    );

    let script = make_script(&state.gemini, &video, duration, level).await?;
    Ok(Json(ScriptResponse { script }))
}

/// Upload-poll-generate against the remote model. The temp file holding the
/// video bytes is removed on every exit path when `tmp` drops.
async fn make_script(
    gemini: &GeminiClient,
    video: &[u8],
    duration: i64,
    level: Level,
) -> Result<String, AppError> {
    let tmp = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(".mp4")
        .tempfile()
        .context("failed to create temp video file")?;
    tokio::fs::write(tmp.path(), video)
        .await
        .context("failed to write temp video file")?;

    let remote = gemini.upload_video(tmp.path()).await?;
    gemini.wait_until_active(&remote).await?;

    let composed = prompt::compose(level, duration);
    let script = gemini.generate_script(&remote, &composed).await?;

    info!("script generation complete");
    Ok(script)
}

/// `POST /generate-audio` — script + voice in, MP3 attachment out.
async fn generate_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut script = String::new();
    let mut voice = String::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name().unwrap_or("") {
            "script" => script = field.text().await.map_err(bad_multipart)?,
            "voice" => voice = field.text().await.map_err(bad_multipart)?,
            _ => {}
        }
    }

    // Checked before the synthesis engine is contacted.
    if script.is_empty() {
        return Err(AppError::BadRequest("no text provided".to_string()));
    }

    info!(voice = %voice, script_chars = script.len(), "audio generation request");

    let audio = render_audio(&state.tts, &script, &voice).await?;
    let filename = audio_filename(Utc::now().timestamp());

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        audio,
    )
        .into_response())
}

/// Render the script to a scoped temp path, read the bytes back, and let the
/// path deletion run unconditionally when `tmp` drops.
async fn render_audio(tts: &EdgeTtsClient, script: &str, voice: &str) -> Result<Vec<u8>, AppError> {
    let tmp = tempfile::Builder::new()
        .prefix("tts_")
        .suffix(".mp3")
        .tempfile()
        .context("failed to create temp audio file")?
        .into_temp_path();

    tts.synthesize_to_file(script, voice, &tmp).await?;
    let audio = tokio::fs::read(&tmp)
        .await
        .context("failed to read rendered audio")?;
    Ok(audio)
}

fn audio_filename(unix_seconds: i64) -> String {
    format!("audio_{unix_seconds}.mp3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_filename_pattern() {
        let name = audio_filename(1_735_689_600);
        assert_eq!(name, "audio_1735689600.mp3");
        assert!(name.starts_with("audio_"));
        assert!(name.ends_with(".mp3"));
        assert!(
            name["audio_".len()..name.len() - ".mp3".len()]
                .chars()
                .all(|c| c.is_ascii_digit())
        );
    }

    #[test]
    fn scoped_temp_path_deletes_on_drop() {
        // Both handlers rely on drop-based deletion covering every exit path.
        let tmp = tempfile::Builder::new()
            .prefix("tts_")
            .suffix(".mp3")
            .tempfile()
            .expect("temp file")
            .into_temp_path();
        let path = tmp.to_path_buf();
        assert!(path.exists());
        drop(tmp);
        assert!(!path.exists());
    }
}
