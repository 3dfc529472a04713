//! Package a [`Deck`] as an Anki `.apkg`: a ZIP holding `collection.anki2`
//! (SQLite) and an empty `media` map.

use crate::deck::reader::strip_html;
use crate::deck::schema::{self, FIELD_SEPARATOR, MODEL_ID};
use crate::error::BuildError;
use crate::types::{artifact_file_name, Deck, DeckArtifact, DeckFormat};
use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds `.apkg` artifacts. The timestamp feeds the file name, the
/// `Created` field and the Anki modification times.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeckBuilder {
    at: Option<NaiveDateTime>,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the build time (tests, reproducible output).
    pub fn at(time: NaiveDateTime) -> Self {
        Self { at: Some(time) }
    }

    /// Serialize `deck` to `.apkg` bytes.
    ///
    /// Blocking: SQLite and ZIP I/O. Use [`DeckBuilder::build_async`] from
    /// async code.
    ///
    /// # Errors
    /// - [`BuildError::EmptyDeck`] if there are no cards
    /// - [`BuildError::InvalidCard`] if a card has an empty front (1-based index)
    /// - [`BuildError::Package`] on SQLite or ZIP failure
    pub fn build(&self, deck: &Deck) -> Result<DeckArtifact, BuildError> {
        if deck.cards.is_empty() {
            return Err(BuildError::EmptyDeck {
                deck: deck.name.clone(),
            });
        }
        if let Some(i) = deck.cards.iter().position(|c| c.front.trim().is_empty()) {
            return Err(BuildError::InvalidCard { index: i + 1 });
        }

        let now = self.at.unwrap_or_else(|| Local::now().naive_local());
        let collection = write_collection(deck, now)?;

        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buf);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file("collection.anki2", options)?;
            zip.write_all(&collection)?;
            zip.start_file("media", options)?;
            zip.write_all(b"{}")?;
            zip.finish()?;
        }
        let bytes = buf.into_inner();

        info!(
            "Built deck '{}': {} cards, {} bytes",
            deck.name,
            deck.cards.len(),
            bytes.len()
        );
        Ok(DeckArtifact {
            file_name: artifact_file_name(&deck.name, DeckFormat::Apkg, now),
            format: DeckFormat::Apkg,
            card_count: deck.cards.len(),
            bytes,
        })
    }

    /// [`DeckBuilder::build`] on the blocking thread pool.
    pub async fn build_async(&self, deck: Deck) -> Result<DeckArtifact, BuildError> {
        let builder = *self;
        tokio::task::spawn_blocking(move || builder.build(&deck))
            .await
            .map_err(|e| BuildError::Package(format!("build task panicked: {e}")))?
    }
}

/// Write the SQLite collection to a temp file and return its bytes.
fn write_collection(deck: &Deck, now: NaiveDateTime) -> Result<Vec<u8>, BuildError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("collection.anki2");

    let secs = now.and_utc().timestamp();
    let millis = now.and_utc().timestamp_millis();
    let did = schema::deck_id(&deck.name);
    let created = now.format("%Y-%m-%d %H:%M").to_string();

    {
        let mut conn = Connection::open(&path)?;
        conn.execute_batch(schema::SCHEMA_SQL)?;

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO col VALUES (1, ?1, ?2, ?2, 11, 0, 0, 0, ?3, ?4, ?5, ?6, '{}')",
            params![
                secs - secs.rem_euclid(86_400),
                millis,
                schema::collection_conf(did).to_string(),
                schema::models(did, secs).to_string(),
                schema::decks(did, &deck.name, &deck.description, secs).to_string(),
                schema::deck_config(secs).to_string(),
            ],
        )?;

        for (i, card) in deck.cards.iter().enumerate() {
            // Ids are millisecond timestamps; offsetting keeps them unique and ordered.
            let note_id = millis + i as i64;
            let fields = [
                card.front.as_str(),
                card.back.as_str(),
                deck.source.as_str(),
                created.as_str(),
            ];
            let flds = fields.join(&FIELD_SEPARATOR.to_string());
            let sort_field = strip_html(&card.front);

            tx.execute(
                "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, ?5, ?6, ?7, ?8, 0, '')",
                params![
                    note_id,
                    note_guid(did, &card.front, &card.back),
                    MODEL_ID,
                    secs,
                    note_tags(&card.tags),
                    flds,
                    sort_field,
                    field_checksum(&sort_field),
                ],
            )?;
            // New card: type 0, queue 0, due = position in the new queue.
            tx.execute(
                "INSERT INTO cards VALUES (?1, ?2, ?3, 0, ?4, -1, 0, 0, ?5, 0, 0, 0, 0, 0, 0, 0, 0, '')",
                params![note_id, note_id, did, secs, i as i64 + 1],
            )?;
        }
        tx.commit()?;
    }

    let bytes = std::fs::read(&path)?;
    debug!("Collection for '{}' is {} bytes", deck.name, bytes.len());
    Ok(bytes)
}

/// Anki stores tags space-separated with a leading and trailing space.
fn note_tags(tags: &[String]) -> String {
    let tags: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
        .collect();
    if tags.is_empty() {
        String::new()
    } else {
        format!(" {} ", tags.join(" "))
    }
}

/// Stable note guid: the same card in the same deck imports as an update.
fn note_guid(deck_id: i64, front: &str, back: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(deck_id.to_be_bytes());
    hasher.update(front.as_bytes());
    hasher.update([0x1f]);
    hasher.update(back.as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Anki's duplicate-check checksum: first 8 hex digits of SHA-1 of the
/// stripped sort field, as an integer.
fn field_checksum(sort_field: &str) -> i64 {
    let digest = Sha1::digest(sort_field.as_bytes());
    let mut head = [0u8; 4];
    head.copy_from_slice(&digest[..4]);
    u32::from_be_bytes(head) as i64
}
