//! Read cards back out of an `.apkg`.

use crate::deck::schema::{DEFAULT_DECK_ID, FIELD_SEPARATOR};
use crate::error::DeckReadError;
use crate::types::FlashCard;
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

/// Collection names in order of preference. Newer Anki exports carry a
/// legacy `collection.anki2` stub next to the real `collection.anki21`.
const COLLECTION_NAMES: [&str; 2] = ["collection.anki21", "collection.anki2"];

/// Cards and deck metadata found in a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadDeck {
    pub name: String,
    pub description: String,
    /// Cards in note order, each with its note tags.
    pub cards: Vec<FlashCard>,
}

/// Parse an `.apkg`. Fields are returned as stored (HTML included); notes
/// whose front or back is empty are skipped.
pub fn read_deck(bytes: &[u8]) -> Result<ReadDeck, DeckReadError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let index = COLLECTION_NAMES
        .iter()
        .find_map(|name| archive.index_for_name(name))
        .ok_or(DeckReadError::MissingCollection)?;

    let mut collection = Vec::new();
    archive.by_index(index)?.read_to_end(&mut collection)?;

    // SQLite needs a real file.
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("collection.db");
    std::fs::write(&path, &collection)?;

    let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut deck = ReadDeck::default();

    let decks_json: String = conn.query_row("SELECT decks FROM col", [], |row| row.get(0))?;
    let decks: Value = serde_json::from_str(&decks_json)?;
    if let Some(map) = decks.as_object() {
        let default_id = DEFAULT_DECK_ID.to_string();
        if let Some(info) = map.iter().find(|(id, _)| **id != default_id).map(|(_, v)| v) {
            deck.name = info["name"].as_str().unwrap_or_default().to_string();
            deck.description = info["desc"].as_str().unwrap_or_default().to_string();
        }
    }

    // One row per note; the first card decides which deck it lives in.
    let mut stmt = conn.prepare(
        "SELECT n.flds, n.tags FROM notes n \
         WHERE EXISTS (SELECT 1 FROM cards c WHERE c.nid = n.id AND c.did != ?1) \
         ORDER BY n.id",
    )?;
    let rows = stmt.query_map([DEFAULT_DECK_ID], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (flds, tags) = row?;
        let mut fields = flds.split(FIELD_SEPARATOR);
        let (Some(front), Some(back)) = (fields.next(), fields.next()) else {
            continue;
        };
        let (front, back) = (front.trim(), back.trim());
        if front.is_empty() || back.is_empty() {
            continue;
        }
        deck.cards
            .push(FlashCard::new(front, back).with_tags(tags.split_whitespace()));
    }

    debug!("Read {} cards from deck '{}'", deck.cards.len(), deck.name);
    Ok(deck)
}

static RE_BLOCK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(br|/p|/div|/li|/h[1-6])\b[^>]*>").unwrap());
static RE_ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Plain text for previews: tags removed, entities decoded, whitespace tidied.
pub fn strip_html(html: &str) -> String {
    let text = RE_BLOCK_TAG.replace_all(html, " ");
    let text = RE_ANY_TAG.replace_all(&text, "");
    let text = decode_html_entities(&text);
    RE_SPACES.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags_and_entities() {
        assert_eq!(strip_html("<b>H&lt;sub&gt;2</b>O"), "H<sub>2O");
        assert_eq!(strip_html("<p>one</p><p>two</p>"), "one two");
        assert_eq!(strip_html("a<br>b"), "a b");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn non_zip_is_rejected() {
        let err = read_deck(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, DeckReadError::NotAZip(_)));
    }

    #[test]
    fn zip_without_collection_is_rejected() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("media", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"{}").unwrap();
            zip.finish().unwrap();
        }
        let err = read_deck(buf.get_ref()).unwrap_err();
        assert!(matches!(err, DeckReadError::MissingCollection));
    }
}
