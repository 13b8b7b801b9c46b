use std::path::{Path, PathBuf};

use tryon_contracts::EncodedImage;

use crate::error::TryOnError;

const FALLBACK_MEDIA_TYPE: &str = "image/png";

/// A readable image file plus the media type it was declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    path: PathBuf,
    media_type: Option<String>,
}

impl ImageSource {
    pub fn new(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            media_type: Some(media_type.into()),
        }
    }

    /// Declares the media type from the file extension, if recognised.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = mime_for_path(&path).map(str::to_string);
        Self { path, media_type }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn declared_media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

/// Reads the whole file and encodes it for transport.
///
/// A failed or empty read returns an error and produces nothing, so the
/// caller's current image for the slot stays in place.
pub async fn ingest(source: &ImageSource) -> Result<EncodedImage, TryOnError> {
    let bytes = tokio::fs::read(&source.path)
        .await
        .map_err(|err| TryOnError::ImageRead {
            path: source.path.clone(),
            source: err,
        })?;
    if bytes.is_empty() {
        return Err(TryOnError::EmptyImage {
            path: source.path.clone(),
        });
    }

    let media_type = match source.declared_media_type() {
        Some(declared) => declared.to_string(),
        None => sniff_media_type(&bytes),
    };
    tracing::debug!(
        path = %source.path.display(),
        media_type = %media_type,
        bytes = bytes.len(),
        "image ingested"
    );
    Ok(EncodedImage::from_bytes(&bytes, media_type))
}

fn sniff_media_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MEDIA_TYPE.to_string())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())?;
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{ingest, ImageSource};
    use crate::error::TryOnError;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[tokio::test]
    async fn ingest_round_trips_bytes_and_keeps_declared_type() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("person.jpg");
        let bytes: Vec<u8> = (0u8..=255).cycle().take(1024).collect();
        fs::write(&path, &bytes)?;

        let image = ingest(&ImageSource::from_path(&path)).await?;
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.decode_bytes()?, bytes);
        assert_eq!(
            image.preview(),
            format!("data:image/jpeg;base64,{}", image.payload())
        );
        Ok(())
    }

    #[tokio::test]
    async fn explicit_declared_type_wins_over_extension() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("upload.bin");
        fs::write(&path, b"not sniffed")?;

        let image = ingest(&ImageSource::new(&path, "image/webp")).await?;
        assert_eq!(image.media_type(), "image/webp");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_extension_sniffs_bytes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let sniffed = temp.path().join("capture");
        fs::write(&sniffed, PNG_MAGIC)?;
        let unknown = temp.path().join("capture.raw");
        fs::write(&unknown, b"opaque")?;

        assert_eq!(
            ingest(&ImageSource::from_path(&sniffed)).await?.media_type(),
            "image/png"
        );
        assert_eq!(
            ingest(&ImageSource::from_path(&unknown)).await?.media_type(),
            "image/png"
        );
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_and_empty_files_fail() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let missing = ingest(&ImageSource::from_path(temp.path().join("missing.png"))).await;
        assert!(matches!(missing, Err(TryOnError::ImageRead { .. })));

        let empty_path = temp.path().join("empty.png");
        fs::write(&empty_path, b"")?;
        let empty = ingest(&ImageSource::from_path(&empty_path)).await;
        assert!(matches!(empty, Err(TryOnError::EmptyImage { .. })));
        Ok(())
    }
}
