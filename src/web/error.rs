//! Mapping service errors to HTTP status codes and user-facing text.

use crate::config::Environment;
use crate::error::{BuildError, ExtractionError, GenerationError, StudyDeckError};
use axum::http::StatusCode;

/// - 422: the request itself can't be processed (missing input, bad file,
///   nothing to package)
/// - 504: an upstream call timed out
/// - 502: an upstream call failed or answered with unusable cards
/// - 500: everything else
pub fn status_for(err: &StudyDeckError) -> StatusCode {
    match err {
        StudyDeckError::Validation(_)
        | StudyDeckError::DeckRead(_)
        | StudyDeckError::Extraction(ExtractionError::UnsupportedFormat { .. })
        | StudyDeckError::Extraction(ExtractionError::EmptyText { .. })
        | StudyDeckError::Build(BuildError::EmptyDeck { .. })
        | StudyDeckError::Build(BuildError::InvalidCard { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        e if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        StudyDeckError::Generation(GenerationError::InvalidCards { .. })
        | StudyDeckError::ProviderNotConfigured { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Text shown on the page. Outside development, server-side faults are
/// reported generically and only logged in full.
pub fn page_message(err: &StudyDeckError, environment: Environment) -> String {
    if status_for(err) == StatusCode::INTERNAL_SERVER_ERROR && !environment.is_development() {
        tracing::error!("Request failed: {}", err);
        "Something went wrong while creating your deck. Please try again.".to_string()
    } else {
        err.user_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            status_for(&StudyDeckError::Validation("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&GenerationError::Timeout { secs: 1 }.into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&GenerationError::Upstream { detail: "x".into() }.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&BuildError::Package("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn card_problems_are_not_server_faults() {
        assert_eq!(
            status_for(&BuildError::EmptyDeck { deck: "Bio".into() }.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&BuildError::InvalidCard { index: 3 }.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(
                &GenerationError::InvalidCards {
                    errors: vec!["Card 2: missing or empty back".into()]
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn production_shows_card_problems() {
        let err: StudyDeckError = GenerationError::InvalidCards {
            errors: vec!["Card 2: missing or empty back".into()],
        }
        .into();
        assert!(page_message(&err, Environment::Production).contains("Card 2"));

        let err: StudyDeckError = BuildError::EmptyDeck { deck: "Bio".into() }.into();
        assert!(page_message(&err, Environment::Production).contains("Bio"));
    }

    #[test]
    fn production_hides_internal_detail() {
        let err: StudyDeckError = BuildError::Package("sqlite: disk I/O error".into()).into();
        assert!(page_message(&err, Environment::Development).contains("disk I/O"));
        assert!(!page_message(&err, Environment::Production).contains("disk I/O"));
    }

    #[test]
    fn production_keeps_validation_text() {
        let err = StudyDeckError::Validation("Please upload a file.".into());
        assert_eq!(page_message(&err, Environment::Production), "Please upload a file.");
    }
}
