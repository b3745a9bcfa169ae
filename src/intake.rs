// Upload checks applied before an image is handed to the analyzer
use std::path::Path;

use log::debug;

use crate::utils::AnalyzerError;

pub const MIN_UPLOAD_BYTES: u64 = 1024;
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Map a file extension to the image MIME types accepted for upload.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "tiff" => Some("image/tiff"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub min_bytes: u64,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy { min_bytes: MIN_UPLOAD_BYTES, max_bytes: MAX_UPLOAD_BYTES }
    }
}

impl UploadPolicy {
    pub fn check_extension(&self, file_name: &str) -> Result<&'static str, AnalyzerError> {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_for_extension)
            .ok_or_else(|| {
                AnalyzerError::InvalidUpload(format!(
                    "Unsupported file type: {}. Allowed: jpg, jpeg, png, tiff, bmp, webp",
                    file_name
                ))
            })
    }

    pub fn check_content_type(&self, content_type: &str) -> Result<(), AnalyzerError> {
        let essence = content_type.split(';').next().unwrap_or("").trim().to_lowercase();
        let accepted = ["image/jpeg", "image/png", "image/tiff", "image/bmp", "image/webp"];
        if accepted.contains(&essence.as_str()) {
            Ok(())
        } else {
            Err(AnalyzerError::InvalidUpload(format!("File must be an image, got {}", content_type)))
        }
    }

    pub fn check_size(&self, size: u64) -> Result<(), AnalyzerError> {
        if size < self.min_bytes {
            return Err(AnalyzerError::InvalidUpload(format!(
                "File too small ({} bytes), possibly corrupted",
                size
            )));
        }
        if size > self.max_bytes {
            return Err(AnalyzerError::InvalidUpload(format!(
                "File too large ({} bytes), maximum is {} MB",
                size,
                self.max_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Check a file on disk by extension and size. A declared content
    /// type, when a caller has one, goes through `check_content_type`.
    pub fn validate_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AnalyzerError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AnalyzerError::InvalidUpload(format!("No file name in {:?}", path)))?;

        let content_type = self.check_extension(file_name)?;
        debug!("{} accepted as {}", file_name, content_type);

        let metadata = std::fs::metadata(path)
            .map_err(|_| AnalyzerError::ImageNotFound(path.display().to_string()))?;
        self.check_size(metadata.len())
    }
}
