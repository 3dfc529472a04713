//! JSON interchange: `{"deck_name": …, "cards": [{"front": …, "back": …}]}`.

use crate::error::DeckReadError;
use crate::types::{artifact_file_name, Deck, DeckArtifact, DeckFormat, FlashCard};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::json;

/// Name used when an imported file carries none.
pub const IMPORTED_DECK_NAME: &str = "Imported Deck";

#[derive(Debug, Deserialize)]
struct DeckFile {
    #[serde(default)]
    deck_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cards: Vec<FlashCard>,
}

/// Pretty-printed JSON for `deck`.
pub fn export_json(deck: &Deck) -> String {
    let mut value = json!({
        "deck_name": deck.name,
        "cards": deck.cards,
    });
    if !deck.description.is_empty() {
        value["description"] = json!(deck.description);
    }
    format!("{value:#}")
}

/// Parse a deck previously written by [`export_json`] (or by hand).
pub fn import_json(input: &str) -> Result<Deck, DeckReadError> {
    let file: DeckFile = serde_json::from_str(input)?;
    let name = file
        .deck_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| IMPORTED_DECK_NAME.to_string());
    Ok(Deck::new(&name, file.cards).with_description(file.description))
}

/// [`export_json`] wrapped as a downloadable artifact.
pub fn json_artifact(deck: &Deck, now: NaiveDateTime) -> DeckArtifact {
    DeckArtifact {
        file_name: artifact_file_name(&deck.name, DeckFormat::Json, now),
        format: DeckFormat::Json,
        card_count: deck.cards.len(),
        bytes: export_json(deck).into_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_has_expected_shape() {
        let deck = Deck::new("Chem", vec![FlashCard::new("H<sub>2</sub>O", "water")]);
        let value: serde_json::Value = serde_json::from_str(&export_json(&deck)).unwrap();
        assert_eq!(value["deck_name"], "Chem");
        assert_eq!(value["cards"][0]["front"], "H<sub>2</sub>O");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn missing_name_becomes_imported_deck() {
        let deck = import_json(r#"{"cards": [{"front": "q", "back": "a"}]}"#).unwrap();
        assert_eq!(deck.name, IMPORTED_DECK_NAME);
        assert_eq!(deck.cards, vec![FlashCard::new("q", "a")]);
    }

    #[test]
    fn extra_card_keys_are_ignored() {
        let deck = import_json(
            r#"{"deck_name": "X", "cards": [{"front": "q", "back": "a", "tags": "t", "card_type": 0}]}"#,
        )
        .unwrap();
        assert_eq!(deck.cards.len(), 1);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(import_json("{"), Err(DeckReadError::Json(_))));
    }
}
