//! Card parsing: split the model's `CARD n: / FRONT: / BACK:` answer into
//! [`FlashCard`]s, plus validation and preview helpers.
//!
//! The format is line-based. A line starting with `CARD` closes the current
//! card; `FRONT:` and `BACK:` open a side; any other non-empty line continues
//! whichever side is open. Models like to bold the markers (`**FRONT:**`),
//! so leading `*`, `#` and `-` are ignored when matching them.

use crate::types::{truncate_chars, FlashCard};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Front,
    Back,
}

#[derive(Default)]
struct Pending {
    front: Option<String>,
    back: Option<String>,
}

impl Pending {
    /// Emit the card when both sides are present and non-empty.
    fn finish(self, out: &mut Vec<FlashCard>) {
        if let (Some(front), Some(back)) = (self.front, self.back) {
            let (front, back) = (front.trim().to_string(), back.trim().to_string());
            if !front.is_empty() && !back.is_empty() {
                out.push(FlashCard::new(front, back));
            }
        }
    }
}

/// Parse the generation answer into cards, dropping incomplete ones.
pub fn parse_cards(response: &str) -> Vec<FlashCard> {
    let mut cards = Vec::new();
    let mut current = Pending::default();
    let mut open: Option<Side> = None;

    for raw in response.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        match marker(line) {
            Some(Marker::Card) => {
                std::mem::take(&mut current).finish(&mut cards);
                open = None;
            }
            Some(Marker::Front(rest)) => {
                // A second FRONT without a CARD line starts a new card.
                if current.front.is_some() {
                    std::mem::take(&mut current).finish(&mut cards);
                }
                current.front = Some(rest.to_string());
                open = Some(Side::Front);
            }
            Some(Marker::Back(rest)) => {
                current.back = Some(rest.to_string());
                open = Some(Side::Back);
            }
            None => {
                let target = match open {
                    Some(Side::Front) => current.front.as_mut(),
                    Some(Side::Back) => current.back.as_mut(),
                    None => None,
                };
                if let Some(text) = target {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(line);
                }
            }
        }
    }

    current.finish(&mut cards);
    cards
}

enum Marker<'a> {
    Card,
    Front(&'a str),
    Back(&'a str),
}

fn marker(line: &str) -> Option<Marker<'_>> {
    let stripped = line.trim_start_matches(['*', '#', '-', ' ']);
    if starts_with_ci(stripped, "CARD ") || starts_with_ci(stripped, "CARD:") {
        let rest = &stripped[4..];
        // "CARD 3:" / "CARD 3" / "CARD:" only; "Cardiology is…" is content.
        let head = rest.trim_start_matches([' ', ':']);
        if head.is_empty()
            || head.trim_end_matches([':', '*']).chars().all(|c| c.is_ascii_digit())
        {
            return Some(Marker::Card);
        }
    }
    if starts_with_ci(stripped, "FRONT:") {
        return Some(Marker::Front(side_text(&stripped[6..])));
    }
    if starts_with_ci(stripped, "BACK:") {
        return Some(Marker::Back(side_text(&stripped[5..])));
    }
    None
}

/// Text after a marker, minus bold closers left over from `**FRONT:**`.
fn side_text(rest: &str) -> &str {
    rest.trim_start_matches('*').trim()
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

// ── Validation ───────────────────────────────────────────────────────────

/// Result of checking a card list before packaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardValidation {
    pub total_cards: usize,
    pub valid_cards: usize,
    pub invalid_cards: usize,
    pub errors: Vec<String>,
}

impl CardValidation {
    pub fn is_valid(&self) -> bool {
        self.total_cards > 0 && self.invalid_cards == 0
    }
}

/// Check that every card has a non-empty front and back.
pub fn validate_cards(cards: &[FlashCard]) -> CardValidation {
    let mut errors = Vec::new();
    if cards.is_empty() {
        errors.push("No cards provided".to_string());
    }
    for (i, card) in cards.iter().enumerate() {
        if card.front.trim().is_empty() {
            errors.push(format!("Card {}: missing or empty front", i + 1));
        } else if card.back.trim().is_empty() {
            errors.push(format!("Card {}: missing or empty back", i + 1));
        }
    }
    let invalid = if cards.is_empty() { 0 } else { errors.len() };
    CardValidation {
        total_cards: cards.len(),
        valid_cards: cards.len() - invalid,
        invalid_cards: invalid,
        errors,
    }
}

/// Plain-text preview of the first `max_preview` cards.
pub fn preview_cards(cards: &[FlashCard], max_preview: usize) -> String {
    if cards.is_empty() {
        return "No cards to preview.".to_string();
    }

    let shown = cards.len().min(max_preview);
    let mut out = format!("Preview of {} cards (Total: {}):\n\n", shown, cards.len());
    for (i, card) in cards.iter().take(max_preview).enumerate() {
        out.push_str(&format!("--- Card {} ---\n", i + 1));
        out.push_str(&format!("Q: {}\n", truncate_chars(&card.front, 100)));
        out.push_str(&format!("A: {}\n\n", truncate_chars(&card.back, 100)));
    }
    if cards.len() > max_preview {
        out.push_str(&format!("... and {} more cards", cards.len() - max_preview));
    }
    out
}
