//! Captured-image handles.
//!
//! The workflow treats images as opaque references: the capture surface
//! hands the core either a path on disk or raw bytes, and the core carries
//! that handle through extraction and publication without interpreting it.

use std::path::PathBuf;

/// A product image captured by the user, not yet published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An image file on local disk.
    Path(PathBuf),
    /// In-memory image data with a display file name.
    Bytes { data: Vec<u8>, file_name: String },
}

impl ImageSource {
    /// The opaque reference attached to a [`ProductInfo`](crate::product::ProductInfo)
    /// until the image is published to a durable location.
    pub fn reference(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    /// File name used for multipart uploads.
    pub fn file_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string()),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    /// MIME type guessed from the file name, defaulting to JPEG.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(self.file_name())
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string())
    }
}
