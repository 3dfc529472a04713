//! Pipeline stages from uploaded file to flashcards.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ extract ──▶ generate ──▶ parse
//! (bytes)   (base64)   (vision)    (LLM)        (cards)
//! ```
//!
//! 1. [`input`]: detect the media kind of an upload, or download a URL
//! 2. [`encode`]: base64-wrap the file, downscaling/re-encoding images that
//!    are too large or in formats the API does not take
//! 3. [`extract`]: one vision call per document, cleaned by [`postprocess`]
//! 4. [`generate`]: one language-model call for the whole text; the answer
//!    is split into cards by [`parse`]
//!
//! [`llm`] wraps every outbound call with the timeout and retry policy.

pub mod encode;
pub mod extract;
pub mod generate;
pub mod input;
pub mod llm;
pub mod parse;
pub mod postprocess;
