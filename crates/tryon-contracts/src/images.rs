use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// One user-supplied image held in transport encoding.
///
/// Values are immutable once built: a re-upload produces a new
/// `EncodedImage` and replaces the old one in its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    payload: String,
    media_type: String,
    preview: String,
}

impl EncodedImage {
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        let payload = BASE64.encode(bytes);
        let preview = format!("data:{media_type};base64,{payload}");
        Self {
            payload,
            media_type,
            preview,
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Display-only data URL. Never sent to the model in this form.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Size of the decoded image, derived from the payload length.
    pub fn byte_len(&self) -> usize {
        let padding = self
            .payload
            .bytes()
            .rev()
            .take_while(|byte| *byte == b'=')
            .count();
        (self.payload.len() / 4 * 3).saturating_sub(padding)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.payload.as_bytes())
            .context("image payload base64 decode failed")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    Person,
    Clothing,
    Top,
    Bottom,
}

impl ImageSlot {
    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Person => "person",
            ImageSlot::Clothing => "clothing",
            ImageSlot::Top => "top",
            ImageSlot::Bottom => "bottom",
        }
    }
}

/// Garment configuration: one clothing item, or a separate top and bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GarmentVariant {
    #[default]
    Single,
    TopAndBottom,
}

impl GarmentVariant {
    /// Clothing slots in the order they follow the person image.
    pub fn clothing_slots(self) -> &'static [ImageSlot] {
        match self {
            GarmentVariant::Single => &[ImageSlot::Clothing],
            GarmentVariant::TopAndBottom => &[ImageSlot::Top, ImageSlot::Bottom],
        }
    }

    pub fn image_count(self) -> usize {
        1 + self.clothing_slots().len()
    }

    pub fn for_clothing_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(GarmentVariant::Single),
            2 => Some(GarmentVariant::TopAndBottom),
            _ => None,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" | "clothing" => Some(GarmentVariant::Single),
            "top-bottom" | "top_bottom" | "top+bottom" => Some(GarmentVariant::TopAndBottom),
            _ => None,
        }
    }
}
