use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tryon_contracts::GenerationRequest;

use crate::client::{first_inline_image, GeneratedImage, GenerationClient};
use crate::config::EngineConfig;
use crate::error::TryOnError;

const ERROR_BODY_MAX_CHARS: usize = 512;

/// Gemini `generateContent` client for image-only output.
///
/// Constructed explicitly from an [`EngineConfig`] and passed to whoever
/// needs it; there is no process-global instance.
pub struct GeminiClient {
    config: EngineConfig,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn build_payload(request: &GenerationRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": request.wire_parts(),
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
            },
        })
    }

    async fn post(&self, payload: &Value) -> Result<Value> {
        let endpoint = self.config.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", self.config.api_key())
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Gemini response body read failed")?;
        if !status.is_success() {
            bail!(
                "Gemini request failed ({}): {}",
                status.as_u16(),
                truncate_text(&body, ERROR_BODY_MAX_CHARS)
            );
        }
        let parsed: Value =
            serde_json::from_str(&body).context("Gemini returned invalid JSON payload")?;
        if let Some(error) = parsed.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(anyhow!("Gemini error: {message}"));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, TryOnError> {
        let payload = Self::build_payload(request);
        tracing::debug!(
            model = self.config.model(),
            parts = request.parts().len(),
            "dispatching try-on request"
        );

        let response = match self.post(&payload).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    model = self.config.model(),
                    error = %error_chain_text(&err, 1024),
                    "Gemini API call failed"
                );
                return Err(TryOnError::remote(err));
            }
        };

        match first_inline_image(&response) {
            Some(image) => {
                tracing::info!(media_type = %image.media_type, "Gemini returned an image");
                Ok(image)
            }
            None => {
                let finish_reason = response
                    .pointer("/candidates/0/finishReason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                tracing::warn!(finish_reason, "Gemini response carried no inline image");
                Err(TryOnError::NoImageInResponse)
            }
        }
    }
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().is_some_and(|last| last == trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
