//! Error taxonomy for the try-on pipeline.

use std::path::PathBuf;

use thiserror::Error;
use tryon_contracts::ImageSlot;

pub const REMOTE_FAILURE_MESSAGE: &str =
    "The AI model failed to process the images. Please try again with different images.";
pub const NO_IMAGE_MESSAGE: &str = "No image data found in the API response.";

/// Failures raised by ingestion and generation.
#[derive(Error, Debug)]
pub enum TryOnError {
    /// The local file could not be read.
    #[error("failed to read image {}", .path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The read completed but produced no bytes.
    #[error("image {} is empty", .path.display())]
    EmptyImage { path: PathBuf },

    /// Well-formed response without inline image data.
    #[error("No image data found in the API response.")]
    NoImageInResponse,

    /// Transport or remote-side failure. The cause is kept for diagnostics
    /// only; `Display` never includes it.
    #[error("The AI model failed to process the images. Please try again with different images.")]
    RemoteCall {
        #[source]
        source: anyhow::Error,
    },
}

impl TryOnError {
    pub fn remote(source: anyhow::Error) -> Self {
        TryOnError::RemoteCall { source }
    }

    pub fn is_image_read(&self) -> bool {
        matches!(
            self,
            TryOnError::ImageRead { .. } | TryOnError::EmptyImage { .. }
        )
    }

    /// Text safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            TryOnError::NoImageInResponse => NO_IMAGE_MESSAGE.to_string(),
            TryOnError::RemoteCall { .. } => REMOTE_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Fatal start-up configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API_KEY environment variable is not set (GEMINI_API_KEY and GOOGLE_API_KEY are also accepted)")]
    MissingCredential,

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Why a trigger was refused. The session is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerRejected {
    #[error("{}", missing_images_message(.0))]
    MissingImages(Vec<ImageSlot>),

    #[error("a try-on request is already in flight")]
    InFlight,
}

fn missing_images_message(missing: &[ImageSlot]) -> String {
    if missing.contains(&ImageSlot::Top) || missing.contains(&ImageSlot::Bottom) {
        return "Please upload a person, a top, and a bottom.".to_string();
    }
    "Please upload both a person and a clothing item.".to_string()
}

/// Slot-scoped message shown when an upload for `slot` fails.
pub fn slot_error_message(slot: ImageSlot) -> String {
    format!("Error processing {} image.", slot.label())
}

#[cfg(test)]
mod tests {
    use std::io;

    use tryon_contracts::ImageSlot;

    use super::{slot_error_message, TriggerRejected, TryOnError, REMOTE_FAILURE_MESSAGE};

    #[test]
    fn remote_call_hides_transport_text() {
        let err = TryOnError::remote(anyhow::anyhow!("connection reset by peer (10.0.0.7:443)"));
        assert_eq!(err.to_string(), REMOTE_FAILURE_MESSAGE);
        assert_eq!(err.user_message(), REMOTE_FAILURE_MESSAGE);
        let source = std::error::Error::source(&err).map(|cause| cause.to_string());
        assert_eq!(
            source.as_deref(),
            Some("connection reset by peer (10.0.0.7:443)")
        );
    }

    #[test]
    fn image_read_errors_are_classified() {
        let read = TryOnError::ImageRead {
            path: "missing.png".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        let empty = TryOnError::EmptyImage {
            path: "empty.png".into(),
        };
        assert!(read.is_image_read());
        assert!(empty.is_image_read());
        assert!(!TryOnError::NoImageInResponse.is_image_read());
        assert_eq!(read.user_message(), "failed to read image missing.png");
    }

    #[test]
    fn messages_match_ui_copy() {
        assert_eq!(
            TriggerRejected::MissingImages(vec![ImageSlot::Person]).to_string(),
            "Please upload both a person and a clothing item."
        );
        assert_eq!(
            TriggerRejected::MissingImages(vec![ImageSlot::Bottom]).to_string(),
            "Please upload a person, a top, and a bottom."
        );
        assert_eq!(
            slot_error_message(ImageSlot::Clothing),
            "Error processing clothing image."
        );
    }
}
