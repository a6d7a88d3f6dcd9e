use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 5000;

/// Process-wide configuration, read once at startup and passed into the
/// handlers through the router state. Never mutated after load.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = std::env::var("GOOGLE_GEMINI_KEY")
            .context("GOOGLE_GEMINI_KEY is not set in environment variables")?;
        if gemini_api_key.trim().is_empty() {
            anyhow::bail!("GOOGLE_GEMINI_KEY is empty");
        }

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {raw}"))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            gemini_api_key,
            port,
        })
    }
}
