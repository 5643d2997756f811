// src/tasks/compress.rs

//! Image optimisation: remote compression service and local fallbacks.

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat};
use serde::Deserialize;
use tracing::debug;

use crate::tasks::svg;

#[derive(Debug, Deserialize)]
struct ShrinkResponse {
    output: ShrinkOutput,
}

#[derive(Debug, Deserialize)]
struct ShrinkOutput {
    url: String,
}

/// Client for a TinyPNG-style compression API: POST the image, then GET the
/// compressed result from the returned `output.url`.
#[derive(Debug, Clone)]
pub struct RemoteCompressor {
    client: reqwest::Client,
    endpoint: String,
    key: String,
}

impl RemoteCompressor {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            key: key.into(),
        }
    }

    pub async fn compress(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.key))
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("uploading to {}", self.endpoint))?
            .error_for_status()?;

        let shrink: ShrinkResponse = response
            .json()
            .await
            .context("decoding compression response")?;
        debug!(url = %shrink.output.url, "downloading compressed image");

        let compressed = self
            .client
            .get(&shrink.output.url)
            .basic_auth("api", Some(&self.key))
            .send()
            .await
            .with_context(|| format!("downloading {}", shrink.output.url))?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(compressed.to_vec())
    }
}

/// Formats the optimiser distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Svg,
    Other,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => ImageKind::Png,
            Some("jpg") | Some("jpeg") => ImageKind::Jpeg,
            Some("svg") => ImageKind::Svg,
            _ => ImageKind::Other,
        }
    }

    /// Formats routed through the remote service in production.
    pub fn is_remote_compressible(self) -> bool {
        matches!(self, ImageKind::Png | ImageKind::Jpeg)
    }
}

/// Local optimisation: lossless PNG re-encoding (kept only when smaller) and
/// SVG cleanup. Other formats are returned unchanged.
pub fn optimize_locally(kind: ImageKind, bytes: Vec<u8>) -> Result<Vec<u8>> {
    match kind {
        ImageKind::Png => {
            let recompressed = recompress_png(&bytes)?;
            if recompressed.len() < bytes.len() {
                Ok(recompressed)
            } else {
                Ok(bytes)
            }
        }
        ImageKind::Svg => {
            let text = std::str::from_utf8(&bytes).context("SVG is not valid UTF-8")?;
            Ok(svg::cleanup(text)?.into_bytes())
        }
        ImageKind::Jpeg | ImageKind::Other => Ok(bytes),
    }
}

fn recompress_png(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .context("decoding PNG")?;
    let mut out = Cursor::new(Vec::new());
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .context("encoding PNG")?;
    Ok(out.into_inner())
}
