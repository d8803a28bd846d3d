//! Media Models
//!
//! Source images handed to the optimizer and the records that point at
//! stored images.

use std::sync::OnceLock;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::preset::PresetName;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Image as supplied by a caller (file picker or storage download)
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Raw file bytes
    pub data: Vec<u8>,
    /// Declared MIME type
    pub mime_type: String,
    /// Original filename
    pub filename: String,
}

impl SourceImage {
    pub fn new(
        data: Vec<u8>,
        mime_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }

    /// Build from bytes whose type was not declared, sniffing the content
    /// first and falling back to the filename extension.
    pub fn sniffed(data: Vec<u8>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime_type = infer::get(&data)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });

        Self {
            data,
            mime_type,
            filename,
        }
    }

    /// Byte length
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Database row that owns a stored image (book, author, hero slide, post)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRecord {
    /// Owning row ID
    pub id: String,
    /// Use case the image was uploaded for
    pub preset: PresetName,
    /// Object path in storage
    pub path: String,
    /// Public URL
    pub url: String,
    /// Last time the image pointer changed
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sanitize filename for URL safety
pub fn sanitize_filename(filename: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("static pattern"));

    let path = std::path::Path::new(filename);
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    let sanitized = re.replace_all(name, "-").to_lowercase();

    if ext.is_empty() {
        sanitized
    } else {
        format!("{}.{}", sanitized, ext.to_lowercase())
    }
}

/// Format bytes to human-readable string
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a byte count as whole megabytes where possible ("50MB", "0.5MB")
pub fn format_megabytes(bytes: u64) -> String {
    if bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Cover Art.JPG"), "my-cover-art.jpg");
        assert_eq!(sanitize_filename("test@#$%.png"), "test----.png");
        assert_eq!(sanitize_filename("normal"), "normal");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1572864), "1.50 MB");
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(50 * 1024 * 1024), "50MB");
        assert_eq!(format_megabytes(80 * 1024 * 1024), "80MB");
        assert_eq!(format_megabytes(512 * 1024), "0.5MB");
    }

    #[test]
    fn test_sniffed_prefers_content() {
        // PNG signature under a misleading name
        let png_header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let source = SourceImage::sniffed(png_header, "cover.jpg");
        assert_eq!(source.mime_type, "image/png");

        let unknown = SourceImage::sniffed(vec![1, 2, 3], "photo.webp");
        assert_eq!(unknown.mime_type, "image/webp");
        assert_eq!(unknown.size(), 3);
    }
}
