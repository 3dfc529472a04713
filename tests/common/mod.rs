//! Shared helpers: a scripted model backend and sample uploads.

#![allow(dead_code)]

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use studydeck::prompts::REFINE_GOAL_PROMPT;
use studydeck::{
    BackendError, ModelBackend, ModelReply, ModelRequest, PipelineConfig, StudyDeckService,
    UploadedDocument,
};

/// What the backend does for one kind of call.
#[derive(Clone, Debug)]
pub enum Reply {
    Text(String),
    /// Answer with the request's user turn (lets tests see per-file order).
    EchoUser,
    Fail(String),
    /// Never answer; used with paused time to trigger timeouts.
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

/// Routes by call kind: attachments → extraction, refine prompt → goal
/// refinement, anything else → card generation.
pub struct ScriptedBackend {
    pub extraction: Reply,
    pub generation: Reply,
    pub refine: Reply,
    pub calls: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    pub fn new(extraction: Reply, generation: Reply) -> Arc<Self> {
        Self::with_refine(extraction, generation, Reply::text("Refined goal"))
    }

    pub fn with_refine(extraction: Reply, generation: Reply, refine: Reply) -> Arc<Self> {
        Arc::new(Self {
            extraction,
            generation,
            refine,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// User turns of the generation calls, in order.
    pub fn generation_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.attachments.is_empty() && r.system != REFINE_GOAL_PROMPT)
            .map(|r| r.user.clone())
            .collect()
    }

    pub fn extraction_calls(&self) -> Vec<ModelRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.attachments.is_empty())
            .cloned()
            .collect()
    }
}

impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, BackendError>> {
        self.calls.lock().unwrap().push(request.clone());
        let reply = if !request.attachments.is_empty() {
            self.extraction.clone()
        } else if request.system == REFINE_GOAL_PROMPT {
            self.refine.clone()
        } else {
            self.generation.clone()
        };
        Box::pin(async move {
            match reply {
                Reply::Text(s) => Ok(ModelReply::text(s)),
                Reply::EchoUser => Ok(ModelReply::text(request.user.clone())),
                Reply::Fail(msg) => Err(BackendError::new(msg)),
                Reply::Hang => futures::future::pending().await,
            }
        })
    }
}

pub fn service(backend: Arc<ScriptedBackend>) -> StudyDeckService {
    service_with(backend, |b| b)
}

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see
/// it; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn service_with(
    backend: Arc<ScriptedBackend>,
    tweak: impl FnOnce(studydeck::PipelineConfigBuilder) -> studydeck::PipelineConfigBuilder,
) -> StudyDeckService {
    init_tracing();
    let config = tweak(PipelineConfig::builder().backend(backend))
        .build()
        .unwrap();
    StudyDeckService::from_config(config).unwrap()
}

/// A minimal PDF upload. PDFs are forwarded without decoding, so any
/// `%PDF` header will do.
pub fn pdf(name: &str) -> UploadedDocument {
    studydeck::pipeline::input::document_from_bytes(name, b"%PDF-1.4\n% test\n".to_vec()).unwrap()
}

pub const PARIS_TEXT: &str = "Paris is the capital of France.";

pub const PARIS_CARDS: &str =
    "CARD 1:\nFRONT: What is the capital of France?\nBACK: Paris\n\nCARD 2:\nFRONT: Which country has Paris as its capital?\nBACK: France";
