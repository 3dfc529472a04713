//! Request orchestration shared by the web form and the CLI.
//!
//! ```text
//! validate ──▶ extract (per file) ──▶ join ──▶ refine goal? ──▶ generate
//!          ──▶ validate cards ──▶ prepend existing deck ──▶ .apkg / .json
//! ```
//!
//! Everything that can be checked locally (files present, goal resolvable,
//! existing deck readable) is checked before the first API call.

use crate::backend::resolve_backend;
use crate::config::{clamp_num_cards, PipelineConfig};
use crate::deck::{json_artifact, read_deck, DeckBuilder, ReadDeck};
use crate::error::{GenerationError, StudyDeckError};
use crate::pipeline::extract::ExtractionClient;
use crate::pipeline::generate::GenerationClient;
use crate::pipeline::parse::{preview_cards, validate_cards};
use crate::prompts::resolve_goal;
use crate::types::{Deck, DeckArtifact, DeckFormat, ExtractedText, FlashCard, UploadedDocument};
use chrono::Local;
use std::time::Instant;
use tracing::{info, warn};

/// Number of cards shown in the result preview.
pub const PREVIEW_CARDS: usize = 3;

/// One "generate deck" submission.
#[derive(Debug, Clone, Default)]
pub struct DeckRequest {
    pub documents: Vec<UploadedDocument>,
    /// Free-text study goal; may be empty when a preset is chosen.
    pub goal: String,
    /// Preset key or title.
    pub preset: Option<String>,
    /// Defaults to the configured `num_cards`.
    pub num_cards: Option<usize>,
    /// Blank → existing deck's name, then [`crate::types::DEFAULT_DECK_NAME`].
    pub deck_name: String,
    /// An `.apkg` whose cards are kept ahead of the new ones.
    pub existing_deck: Option<Vec<u8>>,
    pub refine_goal: bool,
    pub format: DeckFormat,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct GeneratedDeck {
    pub artifact: DeckArtifact,
    /// Every card that was packaged, existing ones first. Rebuilds pick
    /// their subset from here.
    pub deck: Deck,
    /// Cards created by this request.
    pub new_cards: Vec<FlashCard>,
    /// Cards carried over from the existing deck.
    pub existing_cards: usize,
    /// The goal actually sent to the model (after preset/refinement).
    pub goal: String,
    pub preview: String,
    pub status: String,
}

/// Extraction, generation and packaging behind one call.
pub struct StudyDeckService {
    config: PipelineConfig,
    extractor: ExtractionClient,
    generator: GenerationClient,
}

impl StudyDeckService {
    /// Resolve the model backend and build both clients.
    pub fn from_config(config: PipelineConfig) -> Result<Self, StudyDeckError> {
        let backend = resolve_backend(&config)?;
        info!("Using model backend {}", backend.name());
        Ok(Self {
            extractor: ExtractionClient::new(backend.clone(), config.clone()),
            generator: GenerationClient::new(backend, config.clone()),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole chain for one request.
    ///
    /// # Errors
    /// [`StudyDeckError::Validation`] before any external call; otherwise the
    /// first stage error. Nothing is returned (and no artifact produced) on
    /// failure.
    pub async fn create_deck(&self, mut request: DeckRequest) -> Result<GeneratedDeck, StudyDeckError> {
        let start = Instant::now();

        // ── Step 1: Local validation ─────────────────────────────────────────
        if request.documents.is_empty() {
            return Err(StudyDeckError::Validation(
                "Please upload at least one image or PDF file.".into(),
            ));
        }
        let goal = resolve_goal(&request.goal, request.preset.as_deref()).ok_or_else(|| {
            StudyDeckError::Validation(
                "Please describe what you want to learn or choose a preset.".into(),
            )
        })?;
        let existing = match request.existing_deck.take() {
            Some(bytes) if !bytes.is_empty() => Some(
                tokio::task::spawn_blocking(move || read_deck(&bytes))
                    .await
                    .map_err(|e| StudyDeckError::Internal(format!("deck reader panicked: {e}")))??,
            ),
            _ => None,
        };
        let num_cards = clamp_num_cards(request.num_cards.unwrap_or(self.config.num_cards));

        // ── Step 2: Extract text from every document ─────────────────────────
        let mut parts = Vec::with_capacity(request.documents.len());
        for doc in &request.documents {
            parts.push(self.extractor.extract(doc).await?);
        }
        let text = ExtractedText::combine(&parts);
        info!(
            "Extracted {} characters from {} source(s)",
            text.chars().count(),
            parts.len()
        );

        // ── Step 3: Optional goal refinement ─────────────────────────────────
        let goal = if request.refine_goal {
            self.generator.refine_goal(&text, &goal).await
        } else {
            goal
        };

        // ── Step 4: Generate and check cards ─────────────────────────────────
        let new_cards = self.generator.generate(&text, &goal, num_cards).await?;
        let validation = validate_cards(&new_cards);
        if !validation.is_valid() {
            warn!("Rejecting generation: {:?}", validation.errors);
            return Err(GenerationError::InvalidCards {
                errors: validation.errors,
            }
            .into());
        }

        // ── Step 5: Assemble and package ─────────────────────────────────────
        let deck = assemble_deck(&request.deck_name, existing.as_ref(), &new_cards, &parts);
        let existing_cards = deck.cards.len() - new_cards.len();

        let artifact = package(deck.clone(), request.format).await?;

        let status = status_message(&deck, new_cards.len(), existing_cards, parts.len(), request.format);
        info!("{} ({:.1}s)", status, start.elapsed().as_secs_f64());

        Ok(GeneratedDeck {
            artifact,
            preview: preview_cards(&deck.cards, PREVIEW_CARDS),
            deck,
            new_cards,
            existing_cards,
            goal,
            status,
        })
    }
}

/// A deck repackaged from a subset of a previous result's cards.
#[derive(Debug, Clone)]
pub struct RebuiltDeck {
    pub artifact: DeckArtifact,
    /// Indices into the candidate cards that made it in, ascending.
    pub selected: Vec<usize>,
    pub preview: String,
    pub status: String,
}

/// Package `deck` in the requested format.
pub async fn package(deck: Deck, format: DeckFormat) -> Result<DeckArtifact, StudyDeckError> {
    let artifact = match format {
        DeckFormat::Apkg => DeckBuilder::new().build_async(deck).await?,
        DeckFormat::Json => json_artifact(&deck, Local::now().naive_local()),
    };
    Ok(artifact)
}

/// Repackage `candidates` keeping only the cards at `selected`.
///
/// Out-of-range and repeated indices are ignored and card order follows
/// the candidates. An empty selection keeps every card. No model call is
/// made.
pub async fn rebuild_deck(
    candidates: &Deck,
    selected: &[usize],
    format: DeckFormat,
) -> Result<RebuiltDeck, StudyDeckError> {
    let total = candidates.cards.len();
    let mut chosen: Vec<usize> = selected.iter().copied().filter(|&i| i < total).collect();
    chosen.sort_unstable();
    chosen.dedup();

    let note = if chosen.is_empty() {
        chosen = (0..total).collect();
        "all cards, none were selected".to_string()
    } else {
        format!("{} of {total} cards selected", chosen.len())
    };

    let mut deck = candidates.clone();
    deck.cards = chosen.iter().map(|&i| candidates.cards[i].clone()).collect();
    let artifact = package(deck.clone(), format).await?;

    let status = format!(
        "Deck '{}' rebuilt with {} cards ({note})! Click download to save the .{} file.",
        deck.name,
        deck.cards.len(),
        format.extension()
    );
    info!("{}", status);

    Ok(RebuiltDeck {
        artifact,
        selected: chosen,
        preview: preview_cards(&deck.cards, PREVIEW_CARDS),
        status,
    })
}

/// Existing cards first, then the new ones. The deck keeps its old name
/// unless a new one is given.
fn assemble_deck(
    requested_name: &str,
    existing: Option<&ReadDeck>,
    new_cards: &[FlashCard],
    sources: &[ExtractedText],
) -> Deck {
    let name = match existing {
        Some(old) if requested_name.trim().is_empty() => old.name.as_str(),
        _ => requested_name,
    };

    let mut cards = existing.map(|old| old.cards.clone()).unwrap_or_default();
    cards.extend_from_slice(new_cards);

    let names: Vec<&str> = sources.iter().map(|s| s.source.as_str()).collect();
    let mut deck = Deck::new(name, cards).with_source(format!("Generated from {}", names.join(", ")));
    if let Some(old) = existing {
        deck = deck.with_description(old.description.clone());
    }
    deck
}

fn status_message(
    deck: &Deck,
    new_cards: usize,
    existing_cards: usize,
    sources: usize,
    format: DeckFormat,
) -> String {
    let mut msg = format!(
        "Generated {new_cards} study cards from {sources} source(s). Deck '{}' ",
        deck.name
    );
    if existing_cards > 0 {
        msg.push_str(&format!(
            "extended to {} cards ({existing_cards} existing)",
            deck.cards.len()
        ));
    } else {
        msg.push_str(&format!("created with {} cards", deck.cards.len()));
    }
    msg.push_str(&format!(
        "! Click download to save the .{} file.",
        format.extension()
    ));
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> ExtractedText {
        ExtractedText {
            source: name.into(),
            text: "t".into(),
        }
    }

    #[test]
    fn existing_cards_come_first_and_name_is_kept() {
        let old = ReadDeck {
            name: "Biology".into(),
            description: "cells".into(),
            cards: vec![FlashCard::new("old q", "old a")],
        };
        let deck = assemble_deck("", Some(&old), &[FlashCard::new("new q", "new a")], &[source("a.png")]);
        assert_eq!(deck.name, "Biology");
        assert_eq!(deck.description, "cells");
        assert_eq!(deck.cards[0].front, "old q");
        assert_eq!(deck.cards[1].front, "new q");
        assert_eq!(deck.source, "Generated from a.png");
    }

    #[test]
    fn explicit_name_wins_over_existing() {
        let old = ReadDeck {
            name: "Biology".into(),
            ..Default::default()
        };
        let deck = assemble_deck("Bio II", Some(&old), &[FlashCard::new("q", "a")], &[source("x")]);
        assert_eq!(deck.name, "Bio II");
    }

    #[test]
    fn blank_name_without_existing_uses_default() {
        let deck = assemble_deck(" ", None, &[FlashCard::new("q", "a")], &[source("x")]);
        assert_eq!(deck.name, crate::types::DEFAULT_DECK_NAME);
    }

    fn three_cards() -> Deck {
        Deck::new(
            "Capitals",
            vec![
                FlashCard::new("France?", "Paris"),
                FlashCard::new("Spain?", "Madrid"),
                FlashCard::new("Italy?", "Rome"),
            ],
        )
    }

    #[tokio::test]
    async fn rebuild_keeps_only_selected_cards_in_order() {
        let rebuilt = rebuild_deck(&three_cards(), &[2, 0, 2, 9], DeckFormat::Apkg)
            .await
            .unwrap();
        assert_eq!(rebuilt.selected, vec![0, 2]);
        assert_eq!(rebuilt.artifact.card_count, 2);
        assert!(rebuilt.status.contains("2 of 3 cards selected"), "{}", rebuilt.status);

        let deck = read_deck(&rebuilt.artifact.bytes).unwrap();
        assert_eq!(deck.name, "Capitals");
        let backs: Vec<&str> = deck.cards.iter().map(|c| c.back.as_str()).collect();
        assert_eq!(backs, ["Paris", "Rome"]);
    }

    #[tokio::test]
    async fn empty_selection_keeps_everything() {
        let rebuilt = rebuild_deck(&three_cards(), &[], DeckFormat::Json).await.unwrap();
        assert_eq!(rebuilt.selected, vec![0, 1, 2]);
        assert_eq!(rebuilt.artifact.card_count, 3);
        assert!(rebuilt.status.contains("none were selected"));
        assert!(rebuilt.artifact.file_name.ends_with(".json"));
    }

    #[test]
    fn status_mentions_extension() {
        let deck = Deck::new("D", vec![FlashCard::new("q", "a"), FlashCard::new("q2", "a2")]);
        let s = status_message(&deck, 1, 1, 2, DeckFormat::Json);
        assert!(s.contains("extended to 2 cards (1 existing)"), "{s}");
        assert!(s.ends_with(".json file."), "{s}");
    }
}
