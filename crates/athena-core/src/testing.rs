//! Test doubles shared across module tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use athena_types::error::{GenerationError, IndexError};
use athena_types::generation::{Device, GenerationRequest};
use tokio::sync::Notify;

use crate::index::{EmbeddingIndex, IndexRepository};
use crate::llm::InferenceBackend;

/// Index repository backed by a shared in-memory slot.
#[derive(Clone, Default)]
pub(crate) struct MemoryIndexRepository {
    slot: Arc<Mutex<Option<EmbeddingIndex>>>,
}

impl MemoryIndexRepository {
    pub(crate) fn saved_generation(&self) -> Option<uuid::Uuid> {
        self.slot.lock().unwrap().as_ref().map(|i| i.generation())
    }
}

impl IndexRepository for MemoryIndexRepository {
    async fn save(&self, index: &EmbeddingIndex) -> Result<(), IndexError> {
        *self.slot.lock().unwrap() = Some(index.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<EmbeddingIndex>, IndexError> {
        let loaded = self.slot.lock().unwrap().clone();
        Ok(loaded)
    }

    async fn exists(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

/// Everything a [`ScriptedBackend`] was asked to do.
#[derive(Clone, Default)]
pub(crate) struct BackendCalls {
    loads: Arc<Mutex<Vec<Device>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    unloads: Arc<AtomicUsize>,
}

impl BackendCalls {
    pub(crate) fn loads(&self) -> Vec<Device> {
        self.loads.lock().unwrap().clone()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn generations(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

/// Pauses every generation until the test releases it.
#[derive(Clone, Default)]
pub(crate) struct Hold {
    pub(crate) started: Arc<Notify>,
    pub(crate) release: Arc<Notify>,
}

type Reply = Box<dyn Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync>;

pub(crate) struct ScriptedBackend {
    calls: BackendCalls,
    load_results: Mutex<VecDeque<Result<(), GenerationError>>>,
    reply: Reply,
    hold: Option<Hold>,
}

impl ScriptedBackend {
    /// Replies `"echo: <prompt>"`.
    pub(crate) fn echo() -> Self {
        Self::replying(|req| Ok(format!("echo: {}", req.prompt)))
    }

    pub(crate) fn replying(
        reply: impl Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: BackendCalls::default(),
            load_results: Mutex::new(VecDeque::new()),
            reply: Box::new(reply),
            hold: None,
        }
    }

    /// Outcomes for successive `load` calls; `Ok(())` once exhausted.
    pub(crate) fn with_load_results(self, results: Vec<Result<(), GenerationError>>) -> Self {
        *self.load_results.lock().unwrap() = results.into();
        self
    }

    pub(crate) fn held(mut self) -> (Self, Hold) {
        let hold = Hold::default();
        self.hold = Some(hold.clone());
        (self, hold)
    }

    pub(crate) fn calls(&self) -> BackendCalls {
        self.calls.clone()
    }
}

impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn load(&self, device: Device) -> Result<(), GenerationError> {
        self.calls.loads.lock().unwrap().push(device);
        let next = self.load_results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.prompts.lock().unwrap().push(request.prompt.clone());
        if let Some(hold) = &self.hold {
            hold.started.notify_one();
            hold.release.notified().await;
        }
        (self.reply)(request)
    }

    async fn unload(&self) -> Result<(), GenerationError> {
        self.calls.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
