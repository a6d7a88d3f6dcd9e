//! Client for the Edge read-aloud speech service.
//!
//! One websocket session per synthesis request: a `speech.config` message
//! selecting the MP3 output format, one SSML message carrying the script and
//! voice name, then binary audio frames until the service signals `turn.end`.
//! The voice identifier is passed through uninterpreted; an unknown voice is
//! whatever error the service produces.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::debug;
use uuid::Uuid;

const WSS_URL: &str =
    "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1";
const TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";
const CHROMIUM_FULL_VERSION: &str = "130.0.2849.68";
const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

// Seconds between the Windows file-time epoch (1601) and the Unix epoch.
const WINDOWS_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

pub struct EdgeTtsClient {
    endpoint: String,
}

impl Default for EdgeTtsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeTtsClient {
    pub fn new() -> Self {
        Self {
            endpoint: WSS_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Render `text` in the given voice and write the MP3 bytes to `out_path`.
    pub async fn synthesize_to_file(&self, text: &str, voice: &str, out_path: &Path) -> Result<()> {
        let audio = self.synthesize(text, voice).await?;
        fs::write(out_path, &audio)
            .await
            .with_context(|| format!("write audio: {}", out_path.display()))?;
        Ok(())
    }

    /// Render `text` in the given voice and return the raw MP3 bytes.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let connection_id = Uuid::new_v4().simple().to_string();
        // An authority-only endpoint needs an explicit `/` path or the
        // handshake request line is invalid.
        let has_path = self
            .endpoint
            .splitn(2, "://")
            .nth(1)
            .is_some_and(|rest| rest.contains('/'));
        let url = format!(
            "{}{}?TrustedClientToken={TRUSTED_CLIENT_TOKEN}\
             &Sec-MS-GEC={}&Sec-MS-GEC-Version=1-{CHROMIUM_FULL_VERSION}\
             &ConnectionId={connection_id}",
            self.endpoint,
            if has_path { "" } else { "/" },
            sec_ms_gec(Utc::now().timestamp())
        );

        let mut request = url
            .into_client_request()
            .context("invalid TTS endpoint URL")?;
        {
            let headers = request.headers_mut();
            headers.insert(
                "Origin",
                HeaderValue::from_static("chrome-extension://jdiccldimpdaibmpdkjnbmckianbfold"),
            );
            headers.insert(
                "User-Agent",
                HeaderValue::from_static(
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                     (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
                ),
            );
        }

        let (mut ws, _) = connect_async(request)
            .await
            .context("TTS websocket connect failed")?;

        let request_id = Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().to_rfc2822();

        let config = format!(
            "X-Timestamp:{timestamp}\r\n\
             Content-Type:application/json; charset=utf-8\r\n\
             Path:speech.config\r\n\r\n\
             {{\"context\":{{\"synthesis\":{{\"audio\":{{\"metadataoptions\":\
             {{\"sentenceBoundaryEnabled\":\"false\",\"wordBoundaryEnabled\":\"false\"}},\
             \"outputFormat\":\"{OUTPUT_FORMAT}\"}}}}}}}}"
        );
        ws.send(Message::Text(config.into()))
            .await
            .context("TTS config send failed")?;

        let ssml = build_ssml(text, voice);
        let speak = format!(
            "X-RequestId:{request_id}\r\n\
             Content-Type:application/ssml+xml\r\n\
             X-Timestamp:{timestamp}\r\n\
             Path:ssml\r\n\r\n\
             {ssml}"
        );
        ws.send(Message::Text(speak.into()))
            .await
            .context("TTS ssml send failed")?;

        let mut audio = Vec::new();
        while let Some(frame) = ws.next().await {
            let frame = frame.context("TTS websocket read failed")?;
            match frame {
                Message::Binary(data) => {
                    if let Some(payload) = audio_payload(&data) {
                        audio.extend_from_slice(payload);
                    }
                }
                Message::Text(meta) => {
                    if meta.contains("Path:turn.end") {
                        debug!("turn.end after {} audio bytes", audio.len());
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        let _ = ws.close(None).await;

        if audio.is_empty() {
            return Err(anyhow!("TTS service returned no audio for voice {voice:?}"));
        }
        Ok(audio)
    }
}

/// Clock-derived access token the read-aloud endpoint requires alongside the
/// trusted client token: Windows file-time ticks, rounded down to the last
/// five-minute boundary, hashed together with the token.
fn sec_ms_gec(now_unix: i64) -> String {
    let ticks = (now_unix + WINDOWS_EPOCH_OFFSET_SECS) / 300 * 300 * 10_000_000;
    let mut hasher = Sha256::new();
    hasher.update(format!("{ticks}{TRUSTED_CLIENT_TOKEN}").as_bytes());
    hex::encode_upper(hasher.finalize())
}

fn build_ssml(text: &str, voice: &str) -> String {
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='en-US'>\
         <voice name='{}'>{}</voice></speak>",
        xml_escape(voice),
        xml_escape(text)
    )
}

fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Binary frames carry a 2-byte big-endian header length, ASCII headers,
/// then the payload. Only frames whose headers name `Path:audio` carry
/// synthesized bytes.
fn audio_payload(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 2 {
        return None;
    }
    let header_len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    let body_start = 2 + header_len;
    if frame.len() < body_start {
        return None;
    }
    let headers = std::str::from_utf8(&frame[2..body_start]).ok()?;
    if !headers.contains("Path:audio") {
        return None;
    }
    Some(&frame[body_start..])
}
