//! Packaging and re-reading decks without any model calls.

use chrono::NaiveDate;
use studydeck::error::BuildError;
use studydeck::{export_json, import_json, read_deck, Deck, DeckBuilder, FlashCard};

fn sample() -> Deck {
    Deck::new(
        "Biology 101",
        vec![
            FlashCard::new("What is <b>mitosis</b>?", "Cell division producing two identical cells"),
            FlashCard::new("Powerhouse of the cell?", "The <em>mitochondrion</em>"),
            FlashCard::new("DNA stands for?", "Deoxyribonucleic acid &amp; friends"),
        ],
    )
    .with_description("Chapter 3 review")
}

#[test]
fn apkg_round_trip_keeps_cards_in_order() {
    let at = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap().and_hms_opt(9, 30, 0).unwrap();
    let deck = sample();
    let artifact = DeckBuilder::at(at).build(&deck).unwrap();

    assert_eq!(artifact.file_name, "Biology_101_20240517_093000.apkg");
    assert_eq!(artifact.card_count, 3);

    let read = read_deck(&artifact.bytes).unwrap();
    assert_eq!(read.name, "Biology 101");
    assert_eq!(read.description, "Chapter 3 review");
    assert_eq!(read.cards, deck.cards);
}

#[test]
fn rebuilding_a_read_deck_is_stable() {
    let first = DeckBuilder::new().build(&sample()).unwrap();
    let read = read_deck(&first.bytes).unwrap();
    let again = DeckBuilder::new()
        .build(&Deck::new(&read.name, read.cards.clone()))
        .unwrap();
    assert_eq!(read_deck(&again.bytes).unwrap().cards, read.cards);
}

#[test]
fn json_round_trip() {
    let deck = sample();
    let back = import_json(&export_json(&deck)).unwrap();
    assert_eq!(back.name, deck.name);
    assert_eq!(back.cards, deck.cards);
}

#[test]
fn empty_deck_is_refused() {
    let err = DeckBuilder::new().build(&Deck::new("Nothing", vec![])).unwrap_err();
    assert!(matches!(err, BuildError::EmptyDeck { .. }));
}

#[test]
fn reader_rejects_non_packages() {
    assert!(read_deck(b"definitely not a zip").is_err());
    assert!(read_deck(&[]).is_err());
}
