//! Extraction client: uploaded document → plain text via the vision model.

use crate::backend::{ModelBackend, ModelRequest};
use crate::config::PipelineConfig;
use crate::error::ExtractionError;
use crate::pipeline::llm::{call_model, CallFailure};
use crate::pipeline::{encode, postprocess};
use crate::prompts::{IMAGE_EXTRACTION_PROMPT, PDF_EXTRACTION_PROMPT};
use crate::types::{ExtractedText, UploadedDocument};
use std::sync::Arc;
use tracing::info;

/// Turns images and PDFs into text with one model call per document.
#[derive(Clone)]
pub struct ExtractionClient {
    backend: Arc<dyn ModelBackend>,
    config: PipelineConfig,
}

impl ExtractionClient {
    pub fn new(backend: Arc<dyn ModelBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    /// Extract all text from `doc`.
    ///
    /// # Errors
    /// - [`ExtractionError::UnsupportedFormat`] if the image cannot be decoded
    /// - [`ExtractionError::Upstream`] / [`ExtractionError::Timeout`] if the call fails
    /// - [`ExtractionError::EmptyText`] if the model found nothing to read
    pub async fn extract(&self, doc: &UploadedDocument) -> Result<ExtractedText, ExtractionError> {
        info!("Extracting text from {} '{}'", doc.kind.label(), doc.name);

        // Image decoding/re-encoding is CPU-bound.
        let owned = doc.clone();
        let max_pixels = self.config.max_image_pixels;
        let attachment = tokio::task::spawn_blocking(move || encode::encode_document(&owned, max_pixels))
            .await
            .map_err(|e| ExtractionError::Upstream {
                name: doc.name.clone(),
                detail: format!("encoding task panicked: {e}"),
            })??;

        let system = if doc.kind.is_pdf() {
            PDF_EXTRACTION_PROMPT
        } else {
            IMAGE_EXTRACTION_PROMPT
        };

        let request = ModelRequest {
            system: system.to_string(),
            user: format!("Extract the text from '{}'.", doc.name),
            attachments: vec![attachment],
            temperature: self.config.extraction_temperature,
            max_tokens: self.config.max_tokens,
        };

        let label = format!("extract:{}", doc.name);
        let reply = call_model(self.backend.as_ref(), &request, &self.config, &label)
            .await
            .map_err(|failure| match failure {
                CallFailure::Timeout { secs } => ExtractionError::Timeout {
                    name: doc.name.clone(),
                    secs,
                },
                CallFailure::Failed(detail) => ExtractionError::Upstream {
                    name: doc.name.clone(),
                    detail,
                },
            })?;

        let text = postprocess::clean_extracted_text(&reply.content);
        if text.is_empty() {
            return Err(ExtractionError::EmptyText {
                name: doc.name.clone(),
            });
        }

        info!("Extracted {} characters from '{}'", text.chars().count(), doc.name);
        Ok(ExtractedText {
            source: doc.name.clone(),
            text,
        })
    }
}
