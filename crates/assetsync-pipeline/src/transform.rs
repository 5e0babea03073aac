//! Normalization of fetched bytes into web-deliverable artifacts.
//!
//! Raster images are downscaled to fit the configured edge bound (never
//! upscaled) and re-encoded as JPEG. Everything else passes through
//! unchanged. No artifact is ever returned over the byte budget.

use std::path::Path;

use assetsync_core::PipelineConfig;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use sha2::{Digest, Sha256};

use crate::error::AssetError;

const JPEG_CONTENT_TYPE: &str = "image/jpeg";
const OCTET_STREAM: &str = "application/octet-stream";

/// Normalized binary ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetArtifact {
    pub bytes: Bytes,
    pub content_type: String,
    /// File extension used when generating the blob key, without the dot.
    pub extension: String,
}

impl AssetArtifact {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex SHA-256 of the payload. Stable across runs for identical input,
    /// unlike the blob key.
    #[must_use]
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

#[derive(Debug, Clone)]
pub struct Transformer {
    max_edge_length: u32,
    jpeg_quality: u8,
    max_file_size_bytes: u64,
    fallback_max_edge_length: u32,
    fallback_jpeg_quality: u8,
}

impl Transformer {
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_edge_length: config.max_edge_length.max(1),
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
            max_file_size_bytes: config.max_file_size_bytes,
            fallback_max_edge_length: config
                .fallback_max_edge_length
                .clamp(1, config.max_edge_length.max(1)),
            fallback_jpeg_quality: config.fallback_jpeg_quality.clamp(1, 100),
        }
    }

    /// Turns fetched bytes into an [`AssetArtifact`].
    ///
    /// `content_type` is the effective MIME type (server-declared, else
    /// catalog-declared); `filename` names the attachment for error messages
    /// and passthrough extensions.
    ///
    /// # Errors
    ///
    /// - [`AssetError::Decode`] when content identified as an image cannot be decoded or encoded.
    /// - [`AssetError::EncodingBudgetExceeded`] when the output is still over
    ///   `max_file_size_bytes` after the fallback pass, or passthrough content is over it.
    pub fn transform(
        &self,
        bytes: Bytes,
        content_type: Option<&str>,
        filename: &str,
    ) -> Result<AssetArtifact, AssetError> {
        if is_raster_image(&bytes, content_type) {
            self.reencode(&bytes, filename)
        } else {
            self.passthrough(bytes, content_type, filename)
        }
    }

    fn reencode(&self, bytes: &[u8], filename: &str) -> Result<AssetArtifact, AssetError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
            filename: filename.to_string(),
            message: e.to_string(),
        })?;

        let first = encode_jpeg(&decoded, self.max_edge_length, self.jpeg_quality, filename)?;
        if self.within_budget(first.len()) {
            return Ok(jpeg_artifact(first));
        }

        tracing::debug!(
            filename,
            size = first.len(),
            budget = self.max_file_size_bytes,
            "artifact over budget, retrying at reduced fidelity"
        );

        let second = encode_jpeg(
            &decoded,
            self.fallback_max_edge_length,
            self.fallback_jpeg_quality,
            filename,
        )?;
        if self.within_budget(second.len()) {
            return Ok(jpeg_artifact(second));
        }

        Err(AssetError::EncodingBudgetExceeded {
            filename: filename.to_string(),
            size: second.len() as u64,
            budget: self.max_file_size_bytes,
        })
    }

    fn passthrough(
        &self,
        bytes: Bytes,
        content_type: Option<&str>,
        filename: &str,
    ) -> Result<AssetArtifact, AssetError> {
        if !self.within_budget(bytes.len()) {
            return Err(AssetError::EncodingBudgetExceeded {
                filename: filename.to_string(),
                size: bytes.len() as u64,
                budget: self.max_file_size_bytes,
            });
        }
        Ok(AssetArtifact {
            bytes,
            content_type: content_type.unwrap_or(OCTET_STREAM).to_string(),
            extension: passthrough_extension(filename, content_type),
        })
    }

    fn within_budget(&self, len: usize) -> bool {
        len as u64 <= self.max_file_size_bytes
    }
}

fn jpeg_artifact(bytes: Vec<u8>) -> AssetArtifact {
    AssetArtifact {
        bytes: Bytes::from(bytes),
        content_type: JPEG_CONTENT_TYPE.to_string(),
        extension: "jpg".to_string(),
    }
}

fn encode_jpeg(
    image: &DynamicImage,
    max_edge: u32,
    quality: u8,
    filename: &str,
) -> Result<Vec<u8>, AssetError> {
    let resized;
    let source = if image.width() > max_edge || image.height() > max_edge {
        resized = image.resize(max_edge, max_edge, FilterType::Lanczos3);
        &resized
    } else {
        image
    };

    let rgb = source.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&rgb)
        .map_err(|e| AssetError::Decode {
            filename: filename.to_string(),
            message: format!("JPEG encoding failed: {e}"),
        })?;
    Ok(out)
}

/// Raster content is recognised by MIME type (SVG excluded). Bytes are only
/// sniffed when the type is missing or generic; any other declared type is
/// passed through as-is.
fn is_raster_image(bytes: &[u8], content_type: Option<&str>) -> bool {
    let Some(ct) = content_type.map(str::to_ascii_lowercase) else {
        return image::guess_format(bytes).is_ok();
    };
    match ct.as_str() {
        "image/svg+xml" => false,
        OCTET_STREAM | "binary/octet-stream" => image::guess_format(bytes).is_ok(),
        other => other.starts_with("image/"),
    }
}

fn passthrough_extension(filename: &str, content_type: Option<&str>) -> String {
    let from_name = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext;
    }
    let from_mime = match content_type.map(str::to_ascii_lowercase).as_deref() {
        Some("application/pdf") => "pdf",
        Some("image/svg+xml") => "svg",
        Some("text/plain") => "txt",
        Some("application/zip") => "zip",
        _ => "bin",
    };
    from_mime.to_string()
}
