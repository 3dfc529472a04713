//! Route handlers.

use crate::error::StudyDeckError;
use crate::pipeline::input::document_from_bytes;
use crate::service::{rebuild_deck, DeckRequest};
use crate::types::DeckFormat;
use crate::web::error::{page_message, status_for};
use crate::web::views::{self, FormValues, ResultView};
use crate::web::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// `GET /`
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(views::form_page(&default_values(&state), None))
}

/// `POST /generate`: run the whole pipeline for one form submission.
pub async fn generate(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let submitted = match read_form(&mut multipart, default_values(&state)).await {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("Could not read the upload: {}", e.body_text());
            return (e.status(), Html(views::form_page(&default_values(&state), Some(&msg))))
                .into_response();
        }
    };
    let values = submitted.values.clone();

    let request = match submitted.into_request() {
        Ok(r) => r,
        Err(e) => return error_page(&state, &values, &e),
    };
    info!(
        "Deck request: {} file(s), {} cards, format {}",
        request.documents.len(),
        values.num_cards,
        request.format.extension()
    );

    let generated = match state.service.create_deck(request).await {
        Ok(g) => g,
        Err(e) => return error_page(&state, &values, &e),
    };

    let all: Vec<usize> = (0..generated.deck.cards.len()).collect();
    match state
        .artifacts
        .save(&generated.artifact, generated.deck.clone(), all.clone())
        .await
    {
        Ok(id) => Html(views::result_page(&ResultView::generated(&generated, &all), &id, &values))
            .into_response(),
        Err(e) => error_page(&state, &values, &store_failed(e)),
    }
}

/// `POST /rebuild/:id`: repackage a previous result with only the ticked
/// cards. The old download link is retired.
pub async fn rebuild(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return not_found();
    };
    let selected = match read_selection(&mut multipart).await {
        Ok(s) => s,
        Err(e) => return (e.status(), e.body_text()).into_response(),
    };
    let Some(previous) = state.artifacts.get(&id).await else {
        return not_found();
    };
    let values = default_values(&state);

    let candidates = previous.candidates();
    let rebuilt = match rebuild_deck(candidates, &selected, previous.format).await {
        Ok(r) => r,
        Err(e) => return error_page(&state, &values, &e),
    };
    let new_id = match state
        .artifacts
        .save(&rebuilt.artifact, candidates.clone(), rebuilt.selected.clone())
        .await
    {
        Ok(new_id) => new_id,
        Err(e) => return error_page(&state, &values, &store_failed(e)),
    };
    state.artifacts.discard(&id).await;

    let view = ResultView::rebuilt(&rebuilt, &candidates.cards);
    Html(views::result_page(&view, &new_id, &values)).into_response()
}

/// `GET /download/:id`: each id can be downloaded once.
pub async fn download(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return not_found();
    };

    match state.artifacts.take(&id).await {
        Ok(Some((meta, bytes))) => (
            [
                (header::CONTENT_TYPE, meta.format.content_type().to_string()),
                (header::CONTENT_DISPOSITION, content_disposition(&meta.file_name)),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            error!("Failed to read artifact {}: {}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not read the file").into_response()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found or expired").into_response()
}

fn store_failed(e: std::io::Error) -> StudyDeckError {
    StudyDeckError::Internal(format!("could not store the deck: {e}"))
}

fn error_page(state: &AppState, values: &FormValues, err: &StudyDeckError) -> Response {
    let status = status_for(err);
    info!("Request failed with {}: {}", status, err);
    let msg = page_message(err, state.server.environment);
    (status, Html(views::form_page(values, Some(&msg)))).into_response()
}

fn default_values(state: &AppState) -> FormValues {
    FormValues {
        num_cards: state.service.config().num_cards,
        ..FormValues::default()
    }
}

/// `attachment` header with an ASCII fallback name plus the UTF-8 original.
fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

// ── Multipart form ───────────────────────────────────────────────────────

struct SubmittedForm {
    files: Vec<(String, Vec<u8>)>,
    existing_deck: Option<Vec<u8>>,
    format: String,
    values: FormValues,
}

impl SubmittedForm {
    fn into_request(self) -> Result<DeckRequest, StudyDeckError> {
        let format = DeckFormat::parse(&self.format).ok_or_else(|| {
            StudyDeckError::Validation(format!("Unknown download format '{}'.", self.format))
        })?;

        let documents = self
            .files
            .into_iter()
            .map(|(name, bytes)| document_from_bytes(&name, bytes))
            .collect::<Result<Vec<_>, _>>()?;

        let preset = Some(self.values.preset).filter(|p| !p.is_empty());
        Ok(DeckRequest {
            documents,
            goal: self.values.goal,
            preset,
            num_cards: Some(self.values.num_cards),
            deck_name: self.values.deck_name,
            existing_deck: self.existing_deck,
            refine_goal: self.values.refine_goal,
            format,
        })
    }
}

async fn read_form(
    multipart: &mut Multipart,
    mut values: FormValues,
) -> Result<SubmittedForm, MultipartError> {
    let mut files = Vec::new();
    let mut existing_deck = None;
    let mut format = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !(file_name.is_empty() && bytes.is_empty()) {
                    files.push((file_name, bytes.to_vec()));
                }
            }
            "existing_deck" => {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    existing_deck = Some(bytes.to_vec());
                }
            }
            "goal" => values.goal = field.text().await?,
            "preset" => values.preset = field.text().await?.trim().to_string(),
            "num_cards" => {
                if let Ok(n) = field.text().await?.trim().parse() {
                    values.num_cards = n;
                }
            }
            "deck_name" => values.deck_name = field.text().await?.trim().to_string(),
            "refine_goal" => {
                let v = field.text().await?;
                values.refine_goal = matches!(v.trim(), "on" | "true" | "1" | "yes");
            }
            "format" => {
                format = field.text().await?;
                values.format = DeckFormat::parse(&format).unwrap_or_default();
            }
            _ => {}
        }
    }

    Ok(SubmittedForm {
        files,
        existing_deck,
        format,
        values,
    })
}

/// Indices from the `card` checkboxes; anything unparseable is skipped.
async fn read_selection(multipart: &mut Multipart) -> Result<Vec<usize>, MultipartError> {
    let mut selected = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("card") {
            if let Ok(i) = field.text().await?.trim().parse() {
                selected.push(i);
            }
        }
    }
    Ok(selected)
}
