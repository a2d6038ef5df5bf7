//! Optical text recognition of label photos.

mod tesseract;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::nutrition::{self, Nutrients};
use crate::storage::ImageStore;

pub use tesseract::TesseractCli;

/// Converts an image on local disk into raw text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn extract(&self, image_path: &Path) -> anyhow::Result<String>;
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("download image: {0:#}")]
    Download(anyhow::Error),

    #[error("write temp file: {0}")]
    TempFile(#[from] std::io::Error),

    #[error("text recognition failed: {0:#}")]
    Recognition(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelReading {
    pub raw_text: String,
    pub nutrients: Nutrients,
    pub serving_size: Option<String>,
}

#[derive(Clone)]
pub struct OcrService {
    store: Arc<dyn ImageStore>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl OcrService {
    pub fn new(store: Arc<dyn ImageStore>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { store, recognizer }
    }

    /// Downloads the stored image, recognizes it and parses the label text.
    pub async fn read_label(&self, image_ref: &str) -> Result<LabelReading, OcrError> {
        let bytes = self
            .store
            .get_object(image_ref)
            .await
            .map_err(OcrError::Download)?;

        let file = TempImage::new(image_ref);
        tokio::fs::write(file.path(), &bytes).await?;
        debug!(path = %file.path().display(), size = bytes.len(), "image staged for recognition");

        let raw_text = self
            .recognizer
            .extract(file.path())
            .await
            .map_err(OcrError::Recognition)?;

        let (nutrients, serving_size) = nutrition::parse_label(&raw_text);
        Ok(LabelReading {
            raw_text,
            nutrients,
            serving_size,
        })
    }
}

/// Uniquely named file under the system temp dir, removed on drop.
struct TempImage {
    path: PathBuf,
}

impl TempImage {
    fn new(image_ref: &str) -> Self {
        let ext = Path::new(image_ref)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("img");
        let path = std::env::temp_dir().join(format!("nutrisnap-ocr-{}.{}", Uuid::new_v4(), ext));
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove temp image");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryImageStore, StubRecognizer};
    use bytes::Bytes;

    #[tokio::test]
    async fn reads_label_from_stored_image() {
        let store = Arc::new(MemoryImageStore::default());
        store
            .put_object("scans/anonymous/a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        let recognizer = Arc::new(StubRecognizer::text(
            "Serving size 30 g\nTotal Fat 12,5g\nSugars 3g",
        ));
        let ocr = OcrService::new(store, recognizer.clone());

        let reading = ocr.read_label("scans/anonymous/a.jpg").await.unwrap();
        assert_eq!(reading.nutrients.fat_g, Some(12.5));
        assert_eq!(reading.nutrients.sugar_g, Some(3.0));
        assert_eq!(reading.serving_size.as_deref(), Some("30g"));
        assert!(reading.raw_text.contains("Total Fat"));

        let seen = recognizer.last_path().unwrap();
        assert!(seen.extension().is_some_and(|e| e == "jpg"));
        assert!(!seen.exists(), "temp image should be removed");
    }

    #[tokio::test]
    async fn missing_object_is_download_error() {
        let ocr = OcrService::new(
            Arc::new(MemoryImageStore::default()),
            Arc::new(StubRecognizer::text("")),
        );
        let err = ocr.read_label("scans/anonymous/missing.jpg").await.unwrap_err();
        assert!(matches!(err, OcrError::Download(_)));
    }

    #[tokio::test]
    async fn recognizer_failure_is_recognition_error() {
        let store = Arc::new(MemoryImageStore::default());
        store
            .put_object("k.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        let ocr = OcrService::new(store, Arc::new(StubRecognizer::failing()));
        let err = ocr.read_label("k.png").await.unwrap_err();
        assert!(matches!(err, OcrError::Recognition(_)));
    }
}
