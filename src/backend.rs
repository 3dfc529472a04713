//! The seam between the pipeline and the model provider SDK.
//!
//! Both clients talk to a [`ModelBackend`]: one request in, one text answer
//! out. The production implementation, [`EdgequakeBackend`], forwards to any
//! `edgequake_llm` provider (Gemini by default). Tests plug in a scripted
//! backend instead, so the whole pipeline runs without network access.

use crate::config::PipelineConfig;
use crate::error::StudyDeckError;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// An inline file sent along with the prompt (image or PDF), base64-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub base64: String,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("mime_type", &self.mime_type)
            .field("base64_len", &self.base64.len())
            .finish()
    }
}

/// A single-turn request: system instructions, user text and attachments.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub attachments: Vec<Attachment>,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// The model's answer plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Error reported by a backend. The message is shown to the user as-is.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Anything that can answer a [`ModelRequest`].
pub trait ModelBackend: Send + Sync {
    /// Short label for logs, e.g. `gemini/gemini-2.0-flash`.
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, BackendError>>;
}

/// [`ModelBackend`] over an `edgequake_llm` provider.
pub struct EdgequakeBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl EdgequakeBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    fn messages(request: &ModelRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(request.system.as_str())];
        if request.attachments.is_empty() {
            messages.push(ChatMessage::user(request.user.as_str()));
        } else {
            let files: Vec<ImageData> = request
                .attachments
                .iter()
                .map(|a| {
                    let data = ImageData::new(a.base64.clone(), a.mime_type.as_str());
                    // Fine print and small tables need the full tile budget.
                    if a.mime_type.starts_with("image/") {
                        data.with_detail("high")
                    } else {
                        data
                    }
                })
                .collect();
            messages.push(ChatMessage::user_with_images(request.user.as_str(), files));
        }
        messages
    }
}

impl ModelBackend for EdgequakeBackend {
    fn name(&self) -> &str {
        &self.label
    }

    fn complete<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, BackendError>> {
        Box::pin(async move {
            let messages = Self::messages(request);
            let options = CompletionOptions {
                temperature: Some(request.temperature),
                max_tokens: Some(request.max_tokens),
                ..Default::default()
            };

            let response = self
                .provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| BackendError::new(e.to_string()))?;

            debug!(
                "{}: {} input tokens, {} output tokens",
                self.label, response.prompt_tokens, response.completion_tokens
            );

            Ok(ModelReply {
                content: response.content,
                input_tokens: response.prompt_tokens as usize,
                output_tokens: response.completion_tokens as usize,
            })
        })
    }
}

/// Resolve the backend, most specific first:
///
/// 1. **Pre-built backend** (`config.backend`): used as-is (tests, custom
///    middleware).
/// 2. **Named provider + model**: `ProviderFactory` reads the provider's API
///    key from the environment (`GEMINI_API_KEY` for Gemini).
pub fn resolve_backend(config: &PipelineConfig) -> Result<Arc<dyn ModelBackend>, StudyDeckError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let provider = ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
        .map_err(|e| StudyDeckError::ProviderNotConfigured {
            provider: config.provider_name.clone(),
            hint: format!(
                "{e}\nSet GOOGLE_API_KEY (or the provider's own API key variable) and restart."
            ),
        })?;

    let label = format!("{}/{}", config.provider_name, config.model);
    Ok(Arc::new(EdgequakeBackend::new(provider, label)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_debug_omits_payload() {
        let a = Attachment {
            mime_type: "image/png".into(),
            base64: "A".repeat(5000),
        };
        let s = format!("{a:?}");
        assert!(s.contains("5000"));
        assert!(!s.contains("AAAA"));
    }

    #[test]
    fn edgequake_messages_put_attachments_on_user_turn() {
        let req = ModelRequest {
            system: "sys".into(),
            user: "go".into(),
            attachments: vec![Attachment {
                mime_type: "application/pdf".into(),
                base64: "JVBERi0=".into(),
            }],
            temperature: 0.1,
            max_tokens: 10,
        };
        assert_eq!(EdgequakeBackend::messages(&req).len(), 2);
    }

    #[test]
    fn prebuilt_backend_takes_priority() {
        struct Fixed;
        impl ModelBackend for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn complete<'a>(
                &'a self,
                _request: &'a ModelRequest,
            ) -> BoxFuture<'a, Result<ModelReply, BackendError>> {
                Box::pin(async { Ok(ModelReply::text("ok")) })
            }
        }

        let config = PipelineConfig::builder()
            .provider_name("definitely-not-a-provider")
            .backend(Arc::new(Fixed))
            .build()
            .unwrap();
        let backend = resolve_backend(&config).unwrap();
        assert_eq!(backend.name(), "fixed");
    }
}
