//! Generation client: extracted text + study goal → flashcards.

use crate::backend::{ModelBackend, ModelRequest};
use crate::config::{clamp_num_cards, PipelineConfig};
use crate::error::GenerationError;
use crate::pipeline::llm::{call_model, CallFailure};
use crate::pipeline::parse::parse_cards;
use crate::pipeline::postprocess;
use crate::prompts::{generation_request, refine_goal_request, GENERATION_SYSTEM_PROMPT, REFINE_GOAL_PROMPT};
use crate::types::FlashCard;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Asks the language model for cards and parses its answer.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn ModelBackend>,
    config: PipelineConfig,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn ModelBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    /// Generate up to `num_cards` cards (clamped to 1..=50) from `text`.
    ///
    /// The model is asked for exactly `num_cards`; whatever complete cards
    /// come back are returned in order.
    pub async fn generate(
        &self,
        text: &str,
        goal: &str,
        num_cards: usize,
    ) -> Result<Vec<FlashCard>, GenerationError> {
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyInput("no text was extracted"));
        }
        if goal.trim().is_empty() {
            return Err(GenerationError::EmptyInput("no study goal given"));
        }

        let num_cards = clamp_num_cards(num_cards);
        info!("Generating {} cards from {} characters", num_cards, text.chars().count());

        let request = ModelRequest {
            system: GENERATION_SYSTEM_PROMPT.to_string(),
            user: generation_request(text, goal.trim(), num_cards),
            attachments: Vec::new(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let reply = call_model(self.backend.as_ref(), &request, &self.config, "generate")
            .await
            .map_err(|failure| match failure {
                CallFailure::Timeout { secs } => GenerationError::Timeout { secs },
                CallFailure::Failed(detail) => GenerationError::Upstream { detail },
            })?;

        let answer = postprocess::clean_generation_output(&reply.content);
        let cards = parse_cards(&answer);
        if cards.is_empty() {
            return Err(GenerationError::MalformedResponse {
                chars: reply.content.chars().count(),
            });
        }
        if cards.len() != num_cards {
            debug!("Asked for {} cards, parsed {}", num_cards, cards.len());
        }

        info!("Generated {} cards", cards.len());
        Ok(cards)
    }

    /// Ask for a more specific study goal. Falls back to `goal` on any failure.
    pub async fn refine_goal(&self, text: &str, goal: &str) -> String {
        let request = ModelRequest {
            system: REFINE_GOAL_PROMPT.to_string(),
            user: refine_goal_request(text, goal),
            attachments: Vec::new(),
            temperature: self.config.temperature,
            max_tokens: 512,
        };

        match call_model(self.backend.as_ref(), &request, &self.config, "refine-goal").await {
            Ok(reply) => {
                let refined = postprocess::clean_generation_output(&reply.content);
                let refined = refined.trim();
                if refined.is_empty() {
                    goal.to_string()
                } else {
                    debug!("Refined goal: {}", refined);
                    refined.to_string()
                }
            }
            Err(failure) => {
                warn!("Goal refinement failed, keeping the original goal: {:?}", failure);
                goal.to_string()
            }
        }
    }
}
