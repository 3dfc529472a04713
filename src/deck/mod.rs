//! Anki deck packaging and reading.
//!
//! - [`builder`]: cards → `.apkg` (SQLite collection inside a ZIP)
//! - [`reader`]: `.apkg` → cards, for extending an existing deck
//! - [`json`]: plain JSON export/import
//! - [`schema`]: table DDL and the note type / deck JSON Anki expects

pub mod builder;
pub mod json;
pub mod reader;
pub mod schema;

pub use builder::DeckBuilder;
pub use json::{export_json, import_json, json_artifact};
pub use reader::{read_deck, strip_html, ReadDeck};
