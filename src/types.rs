//! Data carried between pipeline stages.
//!
//! Everything here is request-scoped: created when a form is submitted and
//! dropped when the response is sent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default deck name when the user leaves the field blank.
pub const DEFAULT_DECK_NAME: &str = "AI Study Cards";

/// Source description stored in every generated note.
pub const DEFAULT_SOURCE: &str = "Generated with studydeck";

/// Kind of uploaded document, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Png,
    Jpeg,
    Webp,
    Gif,
    Bmp,
    Tiff,
    Pdf,
}

impl MediaKind {
    /// MIME type sent to the vision API.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaKind::Png => "image/png",
            MediaKind::Jpeg => "image/jpeg",
            MediaKind::Webp => "image/webp",
            MediaKind::Gif => "image/gif",
            MediaKind::Bmp => "image/bmp",
            MediaKind::Tiff => "image/tiff",
            MediaKind::Pdf => "application/pdf",
        }
    }

    pub fn is_pdf(self) -> bool {
        self == MediaKind::Pdf
    }

    /// Vision APIs accept these image encodings directly; the others are
    /// re-encoded as PNG first.
    pub fn is_natively_supported(self) -> bool {
        matches!(self, MediaKind::Png | MediaKind::Jpeg | MediaKind::Webp | MediaKind::Pdf)
    }

    /// Human-readable label used in status messages.
    pub fn label(self) -> &'static str {
        if self.is_pdf() {
            "PDF"
        } else {
            "image"
        }
    }
}

/// An uploaded file waiting for extraction.
#[derive(Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Text pulled out of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub source: String,
    pub text: String,
}

impl ExtractedText {
    /// Join several extractions into the single text the generator sees.
    pub fn combine(parts: &[ExtractedText]) -> String {
        parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The first `max_chars` characters, with an ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.text, max_chars)
    }
}

/// One question/answer study item. Both sides may contain HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashCard {
    pub front: String,
    pub back: String,
    /// Anki note tags. Empty for generated cards; kept from extended decks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl FlashCard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A named, ordered collection of cards ready for packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub name: String,
    pub description: String,
    pub source: String,
    pub cards: Vec<FlashCard>,
}

impl Deck {
    /// Create a deck; a blank name falls back to [`DEFAULT_DECK_NAME`].
    pub fn new(name: &str, cards: Vec<FlashCard>) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                DEFAULT_DECK_NAME.to_string()
            } else {
                name.to_string()
            },
            description: String::new(),
            source: DEFAULT_SOURCE.to_string(),
            cards,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Output file format offered for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeckFormat {
    /// Anki package (default).
    #[default]
    Apkg,
    /// Plain JSON `{deck_name, cards}`.
    Json,
}

impl DeckFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DeckFormat::Apkg => "apkg",
            DeckFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            DeckFormat::Apkg => "application/octet-stream",
            DeckFormat::Json => "application/json",
        }
    }

    /// Parse a form/CLI value; anything unknown is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apkg" | "anki" | "" => Some(DeckFormat::Apkg),
            "json" => Some(DeckFormat::Json),
            _ => None,
        }
    }
}

/// A serialized deck ready to hand to the user.
#[derive(Clone)]
pub struct DeckArtifact {
    pub file_name: String,
    pub format: DeckFormat,
    pub card_count: usize,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for DeckArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckArtifact")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("card_count", &self.card_count)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Download file name: spaces become underscores, plus a timestamp suffix.
pub fn artifact_file_name(deck_name: &str, format: DeckFormat, now: chrono::NaiveDateTime) -> String {
    let stem: String = deck_name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' | '"' | '<' | '>' | '|' | '?' | '*' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    format!(
        "{}_{}.{}",
        stem,
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Cut `s` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}
