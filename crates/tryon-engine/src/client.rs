use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tryon_contracts::GenerationRequest;

use crate::error::TryOnError;

const DEFAULT_RESULT_MEDIA_TYPE: &str = "image/png";

/// Image returned by the model, still in transport encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub payload: String,
    pub media_type: String,
}

impl GeneratedImage {
    pub fn new(payload: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            media_type: media_type.into(),
        }
    }

    /// Directly renderable image source.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.payload)
    }

    pub fn decode_bytes(&self) -> anyhow::Result<Vec<u8>> {
        BASE64
            .decode(self.payload.as_bytes())
            .context("generated image base64 decode failed")
    }
}

/// One remote generation per call. Implementations must not retry or cache.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, TryOnError>;
}

/// Returns the first part of the first candidate that carries inline image
/// data. Later image parts are ignored.
pub fn first_inline_image(response: &Value) -> Option<GeneratedImage> {
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)?;

    parts.iter().find_map(|part| {
        let inline = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)?;
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .filter(|data| !data.is_empty())?;
        let media_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or(DEFAULT_RESULT_MEDIA_TYPE);
        Some(GeneratedImage::new(data, media_type))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{first_inline_image, GeneratedImage};

    #[test]
    fn scan_skips_text_parts_and_takes_first_image() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your outfit."},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "c2Vjb25k"}},
                        {"inlineData": {"mimeType": "image/png", "data": "dGhpcmQ="}}
                    ]
                }
            }]
        });
        assert_eq!(
            first_inline_image(&response),
            Some(GeneratedImage::new("c2Vjb25k", "image/jpeg"))
        );
    }

    #[test]
    fn scan_accepts_snake_case_and_defaults_media_type() {
        let response = json!({
            "candidates": [{
                "content": {"parts": [
                    {"inline_data": {"data": ""}},
                    {"inline_data": {"data": "aW1n"}}
                ]}
            }]
        });
        assert_eq!(
            first_inline_image(&response),
            Some(GeneratedImage::new("aW1n", "image/png"))
        );
    }

    #[test]
    fn scan_returns_none_without_image_data() {
        assert_eq!(first_inline_image(&json!({})), None);
        assert_eq!(first_inline_image(&json!({"candidates": []})), None);
        assert_eq!(
            first_inline_image(&json!({
                "candidates": [{"content": {"parts": [{"text": "no can do"}]}}]
            })),
            None
        );
    }

    #[test]
    fn data_url_wraps_payload_for_rendering() -> anyhow::Result<()> {
        let image = GeneratedImage::new("aGk=", "image/png");
        assert_eq!(image.data_url(), "data:image/png;base64,aGk=");
        assert_eq!(image.decode_bytes()?, b"hi".to_vec());
        Ok(())
    }
}
