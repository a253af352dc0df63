//! OCR capability boundary and the institution check built on it
//!
//! Text recognition itself is not implemented here. Engines plug in through
//! [`OcrEngine`]; multi-page formats go through a [`PageRasterizer`] first.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::institution::{match_institution, MatchRule};

/// Media type of documents that must be rasterized before recognition
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Errors reported by the OCR capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    #[error("Unreadable document: {0}")]
    Unreadable(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Failed to render page 1: {0}")]
    Rasterization(String),

    #[error("OCR engine failure: {0}")]
    Engine(String),
}

/// An uploaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a document from disk, guessing the media type from the extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Ok(Self::new(file_name, media_type_for(&extension), bytes))
    }

    pub fn needs_rasterizing(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }
}

fn media_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => PDF_MEDIA_TYPE,
        "txt" | "text" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Recognized text with the engine's confidence (0-100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f32,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, document: &Document) -> Result<OcrOutput, OcrError>;
}

/// Renders page 1 of a multi-page document to an image
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn first_page(&self, document: &Document) -> Result<Document, OcrError>;
}

/// Treats the document bytes as already-extracted UTF-8 text.
///
/// Useful when text was pulled out upstream (a text layer, a previous OCR
/// pass) and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextOcr;

#[async_trait]
impl OcrEngine for PlainTextOcr {
    async fn recognize(&self, document: &Document) -> Result<OcrOutput, OcrError> {
        let text = std::str::from_utf8(&document.bytes).map_err(|e| {
            OcrError::Unreadable(format!("{} is not UTF-8 text ({e})", document.file_name))
        })?;
        Ok(OcrOutput {
            text: text.to_string(),
            confidence: 100.0,
        })
    }
}

/// Institution check as embedded in a verification record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionCheck {
    pub text: String,
    pub confidence: f32,
    pub found: Option<String>,
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<MatchRule>,
    /// Set when the OCR capability failed, as opposed to running and finding nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl InstitutionCheck {
    fn failed(error: &OcrError) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            found: None,
            matched: false,
            rule: None,
            error_detail: Some(error.to_string()),
        }
    }
}

/// Run OCR on `document` and match the text against `declared`.
///
/// Never fails: a capability error lands in `error_detail`.
pub async fn check_document(
    engine: &dyn OcrEngine,
    rasterizer: Option<&dyn PageRasterizer>,
    document: &Document,
    declared: &str,
) -> InstitutionCheck {
    match recognize(engine, rasterizer, document).await {
        Ok(output) => {
            let result = match_institution(&output.text, declared);
            debug!(
                file = %document.file_name,
                confidence = output.confidence,
                matched = result.matched,
                rule = ?result.rule,
                "Institution check finished"
            );
            InstitutionCheck {
                text: output.text,
                confidence: output.confidence.clamp(0.0, 100.0),
                found: result.found,
                matched: result.matched,
                rule: Some(result.rule),
                error_detail: None,
            }
        }
        Err(e) => {
            warn!(file = %document.file_name, "OCR failed: {}", e);
            InstitutionCheck::failed(&e)
        }
    }
}

async fn recognize(
    engine: &dyn OcrEngine,
    rasterizer: Option<&dyn PageRasterizer>,
    document: &Document,
) -> Result<OcrOutput, OcrError> {
    if !document.needs_rasterizing() {
        return engine.recognize(document).await;
    }

    let rasterizer =
        rasterizer.ok_or_else(|| OcrError::UnsupportedMediaType(document.media_type.clone()))?;
    let page = rasterizer.first_page(document).await?;
    engine.recognize(&page).await
}
