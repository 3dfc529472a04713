//! # studydeck
//!
//! Turn photos, scans and PDFs into Anki flashcard decks.
//!
//! A vision model reads the uploaded files, a language model writes
//! question/answer cards for the learner's study goal, and the cards are
//! packaged as an `.apkg` that Anki imports directly. The same pipeline is
//! served as a small web form and as a CLI.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image / PDF
//!  │
//!  ├─ 1. Input     detect media kind (magic bytes, then extension)
//!  ├─ 2. Encode    base64; oversized or exotic images re-encoded as PNG
//!  ├─ 3. Extract   one vision call per file → cleaned plain text
//!  ├─ 4. Generate  one LLM call → `CARD n: / FRONT: / BACK:` answer → cards
//!  ├─ 5. Validate  every card has a front and a back
//!  └─ 6. Package   SQLite collection + media map, zipped as .apkg (or JSON)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studydeck::{DeckRequest, PipelineConfig, StudyDeckService};
//! use studydeck::pipeline::input::document_from_bytes;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Gemini by default; reads GEMINI_API_KEY.
//!     let service = StudyDeckService::from_config(PipelineConfig::default())?;
//!     let page = document_from_bytes("notes.png", std::fs::read("notes.png")?)?;
//!     let deck = service
//!         .create_deck(DeckRequest {
//!             documents: vec![page],
//!             goal: "Key terms and definitions".into(),
//!             ..Default::default()
//!         })
//!         .await?;
//!     std::fs::write(&deck.artifact.file_name, &deck.artifact.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `studydeck` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod deck;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod service;
pub mod types;
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{Attachment, BackendError, ModelBackend, ModelReply, ModelRequest};
pub use config::{Credentials, Environment, PipelineConfig, PipelineConfigBuilder, ServerConfig};
pub use deck::{export_json, import_json, read_deck, DeckBuilder, ReadDeck};
pub use error::{BuildError, DeckReadError, ExtractionError, GenerationError, StudyDeckError};
pub use pipeline::parse::{parse_cards, preview_cards, validate_cards, CardValidation};
pub use prompts::{Preset, PRESETS};
pub use service::{rebuild_deck, DeckRequest, GeneratedDeck, RebuiltDeck, StudyDeckService};
pub use types::{Deck, DeckArtifact, DeckFormat, ExtractedText, FlashCard, MediaKind, UploadedDocument};
