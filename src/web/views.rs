//! HTML pages. Every interpolated value goes through `html_escape`.

use crate::config::clamp_num_cards;
use crate::prompts::PRESETS;
use crate::service::{GeneratedDeck, RebuiltDeck};
use crate::types::{DeckArtifact, DeckFormat, FlashCard};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use uuid::Uuid;

/// Form values echoed back when the page is re-rendered.
#[derive(Debug, Clone)]
pub struct FormValues {
    pub goal: String,
    pub preset: String,
    pub num_cards: usize,
    pub deck_name: String,
    pub refine_goal: bool,
    pub format: DeckFormat,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            goal: String::new(),
            preset: String::new(),
            num_cards: 10,
            deck_name: String::new(),
            refine_goal: false,
            format: DeckFormat::Apkg,
        }
    }
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { margin-bottom: .25rem; }
.lead { color: #555; margin-top: 0; }
label { display: block; font-weight: 600; margin: 1rem 0 .25rem; }
input[type=text], input[type=number], select, textarea { width: 100%; padding: .5rem; box-sizing: border-box; }
textarea { min-height: 7rem; }
.inline { display: inline; font-weight: normal; }
button { margin-top: 1.5rem; padding: .6rem 1.4rem; font-size: 1rem; cursor: pointer; }
.error { background: #fdecea; border-left: 4px solid #c0392b; padding: .75rem 1rem; white-space: pre-wrap; }
.status { background: #e8f5e8; border-left: 4px solid #27ae60; padding: .75rem 1rem; }
pre.preview { background: #f6f8fa; padding: 1rem; white-space: pre-wrap; }
.hint { color: #666; font-size: .9rem; }
ol.cards li { margin: .4rem 0; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        text(title)
    )
}

/// The upload form, optionally with an error message above it.
pub fn form_page(values: &FormValues, error: Option<&str>) -> String {
    let mut body = String::from(
        "<h1>Study Deck Generator</h1>\n\
         <p class=\"lead\">Upload images or PDFs, describe what you want to learn, \
         and download a ready-to-import Anki deck.</p>\n",
    );
    if let Some(msg) = error {
        body.push_str(&format!("<div class=\"error\" role=\"alert\">{}</div>\n", text(msg)));
    }
    body.push_str(&form(values));
    page("Study Deck Generator", &body)
}

fn form(values: &FormValues) -> String {
    let mut options = String::from("<option value=\"\">Custom (use the goal below)</option>");
    for preset in PRESETS {
        let selected = if preset.key == values.preset { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{selected}>{}</option>",
            attr(preset.key),
            text(preset.title)
        ));
    }

    let checked = |on: bool| if on { " checked" } else { "" };
    let is_json = values.format == DeckFormat::Json;

    format!(
        r#"<form method="post" action="/generate" enctype="multipart/form-data">
<label for="files">Images or PDFs</label>
<input id="files" type="file" name="files" accept="image/*,application/pdf" multiple>
<p class="hint">Several files are read in order and combined into one deck.</p>

<label for="preset">Preset</label>
<select id="preset" name="preset">{options}</select>

<label for="goal">What do you want to learn?</label>
<textarea id="goal" name="goal" placeholder="e.g. Key dates and figures of the French Revolution">{goal}</textarea>
<label class="inline"><input type="checkbox" name="refine_goal" value="on"{refine}> Let the model sharpen this goal from the material</label>

<label for="num_cards">Number of cards</label>
<input id="num_cards" type="number" name="num_cards" min="1" max="50" value="{num_cards}">

<label for="deck_name">Deck name</label>
<input id="deck_name" type="text" name="deck_name" placeholder="AI Study Cards" value="{deck_name}">

<label for="existing_deck">Extend an existing deck (optional)</label>
<input id="existing_deck" type="file" name="existing_deck" accept=".apkg">

<label>Download format</label>
<label class="inline"><input type="radio" name="format" value="apkg"{apkg}> Anki package (.apkg)</label>
<label class="inline"><input type="radio" name="format" value="json"{json}> JSON</label>

<div><button type="submit">Generate deck</button></div>
</form>"#,
        goal = text(&values.goal),
        refine = checked(values.refine_goal),
        num_cards = clamp_num_cards(values.num_cards),
        deck_name = attr(&values.deck_name),
        apkg = checked(!is_json),
        json = checked(is_json),
    )
}

/// What the result page shows, from a fresh generation or a rebuild.
#[derive(Debug, Clone, Copy)]
pub struct ResultView<'a> {
    pub status: &'a str,
    pub artifact: &'a DeckArtifact,
    pub preview: &'a str,
    /// Every card that can be picked for a rebuild.
    pub cards: &'a [FlashCard],
    /// Indices of `cards` in the current file.
    pub selected: &'a [usize],
}

impl<'a> ResultView<'a> {
    pub fn generated(generated: &'a GeneratedDeck, selected: &'a [usize]) -> Self {
        Self {
            status: &generated.status,
            artifact: &generated.artifact,
            preview: &generated.preview,
            cards: &generated.deck.cards,
            selected,
        }
    }

    pub fn rebuilt(rebuilt: &'a RebuiltDeck, cards: &'a [FlashCard]) -> Self {
        Self {
            status: &rebuilt.status,
            artifact: &rebuilt.artifact,
            preview: &rebuilt.preview,
            cards,
            selected: &rebuilt.selected,
        }
    }
}

/// Success page: status, download link, preview and the card picker, with
/// the form below.
pub fn result_page(view: &ResultView<'_>, download_id: &Uuid, values: &FormValues) -> String {
    let mut body = String::from("<h1>Study Deck Generator</h1>\n");
    body.push_str(&format!("<div class=\"status\">{}</div>\n", text(view.status)));
    body.push_str(&format!(
        "<p><a href=\"/download/{download_id}\" download=\"{}\"><strong>Download {}</strong></a> \
         ({} cards)</p>\n<p class=\"hint\">The link works once and expires after an hour.</p>\n",
        attr(&view.artifact.file_name),
        text(&view.artifact.file_name),
        view.artifact.card_count,
    ));
    body.push_str(&format!(
        "<h2>Preview</h2>\n<pre class=\"preview\">{}</pre>\n",
        text(view.preview)
    ));
    body.push_str(&card_picker(view, download_id));
    body.push_str("<h2>Make another deck</h2>\n");
    body.push_str(&form(values));
    page("Deck ready", &body)
}

fn card_picker(view: &ResultView<'_>, download_id: &Uuid) -> String {
    let mut items = String::new();
    for (i, card) in view.cards.iter().enumerate() {
        let checked = if view.selected.contains(&i) { " checked" } else { "" };
        items.push_str(&format!(
            "<li><label class=\"inline\"><input type=\"checkbox\" name=\"card\" value=\"{i}\"{checked}> \
             <strong>{}</strong>: {}</label></li>\n",
            text(&card.front),
            text(&card.back),
        ));
    }
    format!(
        r#"<h2>Cards</h2>
<form method="post" action="/rebuild/{download_id}" enctype="multipart/form-data">
<ol class="cards">
{items}</ol>
<p class="hint">Untick the cards you don't want. With nothing ticked every card is kept.</p>
<div><button type="submit">Rebuild with selected cards</button></div>
</form>
"#
    )
}
