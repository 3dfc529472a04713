//! Error types for the studydeck library.
//!
//! Each pipeline stage owns its error type so callers can tell *where* a
//! request failed without string matching:
//!
//! * [`ExtractionError`]: the vision call could not turn the upload into text.
//! * [`GenerationError`]: the language model call failed or its answer could
//!   not be split into front/back pairs.
//! * [`BuildError`]: the card list could not be packaged.
//! * [`DeckReadError`]: an existing `.apkg` or JSON deck could not be read.
//!
//! [`StudyDeckError`] is the union returned by
//! [`crate::service::StudyDeckService`]. None of these are fatal to the
//! process: a failure only ever ends the request that caused it.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while turning an uploaded document into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Upload is neither a supported image nor a PDF, or could not be decoded.
    #[error("Unsupported file '{name}': {detail}\nUpload an image (PNG, JPG, WEBP, GIF, BMP, TIFF) or a PDF.")]
    UnsupportedFormat { name: String, detail: String },

    /// The model answered but no text was found in the document.
    #[error("No text could be extracted from '{name}'. Try a sharper image or a different file.")]
    EmptyText { name: String },

    /// The vision API returned an error (network, quota, authentication…).
    #[error("Text extraction failed for '{name}': {detail}")]
    Upstream { name: String, detail: String },

    /// The vision API did not answer within the configured timeout.
    #[error("Text extraction for '{name}' timed out after {secs}s")]
    Timeout { name: String, secs: u64 },
}

/// Failure while generating flashcards from extracted text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Nothing to generate from: empty text or empty study goal.
    #[error("Cannot generate cards: {0}")]
    EmptyInput(&'static str),

    /// The language model API returned an error.
    #[error("Card generation failed: {detail}")]
    Upstream { detail: String },

    /// The language model did not answer within the configured timeout.
    #[error("Card generation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The answer could not be split into FRONT/BACK pairs.
    #[error("Could not read any cards from the model's answer ({chars} chars received)")]
    MalformedResponse { chars: usize },

    /// Cards were parsed but some of them are incomplete.
    #[error("Generated cards have issues:\n{}", .errors.join("\n"))]
    InvalidCards { errors: Vec<String> },
}

/// Failure while packaging cards into an Anki deck.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The deck has no cards.
    #[error("No cards provided to create deck '{deck}'")]
    EmptyDeck { deck: String },

    /// A card has no front text.
    #[error("Card {index} has an empty front")]
    InvalidCard { index: usize },

    /// SQLite or ZIP writing failed.
    #[error("Failed to write Anki package: {0}")]
    Package(String),

    /// Temporary file handling failed.
    #[error("I/O error while building deck: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for BuildError {
    fn from(e: rusqlite::Error) -> Self {
        BuildError::Package(format!("sqlite: {e}"))
    }
}

impl From<zip::result::ZipError> for BuildError {
    fn from(e: zip::result::ZipError) -> Self {
        BuildError::Package(format!("zip: {e}"))
    }
}

/// Failure while reading an existing deck.
#[derive(Debug, Error)]
pub enum DeckReadError {
    /// Not a ZIP archive, so not an `.apkg`.
    #[error("Not an Anki package: {0}")]
    NotAZip(String),

    /// ZIP opened but has no collection database inside.
    #[error("Invalid Anki deck file: missing collection.anki2")]
    MissingCollection,

    /// The collection database could not be queried.
    #[error("Could not read deck database: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Malformed JSON (deck metadata or JSON deck file).
    #[error("Invalid deck JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Temporary file handling failed.
    #[error("I/O error while reading deck: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for DeckReadError {
    fn from(e: zip::result::ZipError) -> Self {
        DeckReadError::NotAZip(e.to_string())
    }
}

/// All errors surfaced by [`crate::service::StudyDeckService`] and the
/// configuration layer.
#[derive(Debug, Error)]
pub enum StudyDeckError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The request itself is incomplete (no file, no goal…). No external
    /// API is called when this is returned.
    #[error("{0}")]
    Validation(String),

    // ── Stage errors ──────────────────────────────────────────────────────
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    DeckRead(#[from] DeckReadError),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// URL input could not be downloaded.
    #[error("Failed to download '{url}': {reason}")]
    Download { url: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configured provider could not be created (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyDeckError {
    /// Message shown to the person using the web form.
    ///
    /// Prefixed by the stage that failed so the user knows whether to retry
    /// with a different file, a different goal, or later.
    pub fn user_message(&self) -> String {
        match self {
            StudyDeckError::Validation(msg) => msg.clone(),
            StudyDeckError::Extraction(e) => format!("Error processing file: {e}"),
            StudyDeckError::Generation(e) => format!("Error generating cards: {e}"),
            StudyDeckError::Build(e) => format!("Error creating Anki deck: {e}"),
            StudyDeckError::DeckRead(e) => format!("Error reading existing deck: {e}"),
            other => other.to_string(),
        }
    }

    /// True when the failure came from a slow upstream call.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            StudyDeckError::Extraction(ExtractionError::Timeout { .. })
                | StudyDeckError::Generation(GenerationError::Timeout { .. })
        )
    }

    /// True when the failure came from an external API rather than from us.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            StudyDeckError::Extraction(ExtractionError::Upstream { .. })
                | StudyDeckError::Generation(GenerationError::Upstream { .. })
                | StudyDeckError::Generation(GenerationError::MalformedResponse { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_cards_lists_every_problem() {
        let e = GenerationError::InvalidCards {
            errors: vec!["Card 1: missing or empty front".into(), "Card 4: missing or empty back".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("Card 1"), "got: {msg}");
        assert!(msg.contains("Card 4"), "got: {msg}");
    }

    #[test]
    fn user_message_names_the_stage() {
        let e: StudyDeckError = GenerationError::Timeout { secs: 30 }.into();
        let msg = e.user_message();
        assert!(msg.starts_with("Error generating cards"), "got: {msg}");
        assert!(msg.contains("30s"));
        assert!(e.is_timeout());
        assert!(!e.is_upstream());
    }

    #[test]
    fn validation_message_is_passed_through() {
        let e = StudyDeckError::Validation("Please upload a file.".into());
        assert_eq!(e.user_message(), "Please upload a file.");
    }

    #[test]
    fn empty_deck_display() {
        let e = BuildError::EmptyDeck { deck: "Biology".into() };
        assert!(e.to_string().contains("Biology"));
    }
}
