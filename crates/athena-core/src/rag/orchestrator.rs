//! RagOrchestrator -- drives one question through
//! RECEIVED -> RETRIEVING -> ASSEMBLING -> GENERATING -> COMPLETED.
//!
//! Failure policy:
//! - Retrieval errors (no index, embedder failure) degrade to generation
//!   without course material.
//! - Session store errors degrade to stateless mode.
//! - Engine errors fail the request with a structured [`RagError`].
//!
//! The session is only touched on COMPLETED, where the user turn and the
//! answer are appended together. A failed or cancelled request leaves the
//! room exactly as it was.
//!
//! Generation runs on its own task. If the caller goes away mid-generation
//! the model call still finishes and its result is discarded.

use std::sync::Arc;

use athena_types::config::AthenaConfig;
use athena_types::corpus::RetrievalResult;
use athena_types::error::{ErrorKind, RagError};
use athena_types::generation::{GenerationRequest, GenerationResult};
use athena_types::rag::{AskRequest, AskResponse, HealthStatus, RequestState, SourceDocument};
use athena_types::session::ConversationTurn;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, info, info_span, warn};

use crate::embedding::{BoxEmbedder, Embedder};
use crate::llm::InferenceEngine;
use crate::prompt::{ContextAssembler, SmallTalk, clean_output};
use crate::retrieval::Retriever;
use crate::session::SessionStore;

use super::lifecycle::RequestLifecycle;

const EMPTY_ANSWER_FALLBACK: &str =
    "I wasn't able to produce an answer for that. Please try rephrasing your question.";

/// Per-request defaults, taken from config.
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub default_k: usize,
    pub min_score: Option<f32>,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub token_budget: usize,
    pub system_instructions: String,
}

impl RagSettings {
    pub fn from_config(config: &AthenaConfig) -> Self {
        Self {
            default_k: config.retrieval.k,
            min_score: config.retrieval.min_score,
            max_new_tokens: config.generation.max_new_tokens,
            temperature: config.generation.temperature,
            token_budget: config.prompt.token_budget,
            system_instructions: config.prompt.system_instructions.clone(),
        }
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self::from_config(&AthenaConfig::default())
    }
}

pub struct RagOrchestrator<E: Embedder + 'static = BoxEmbedder> {
    retriever: RwLock<Option<Arc<Retriever<E>>>>,
    assembler: ContextAssembler,
    engine: Arc<InferenceEngine>,
    sessions: Arc<SessionStore>,
    settings: RagSettings,
}

impl<E: Embedder + 'static> RagOrchestrator<E> {
    pub fn new(
        retriever: Option<Retriever<E>>,
        assembler: ContextAssembler,
        engine: Arc<InferenceEngine>,
        sessions: Arc<SessionStore>,
        settings: RagSettings,
    ) -> Self {
        Self {
            retriever: RwLock::new(retriever.map(Arc::new)),
            assembler,
            engine,
            sessions,
            settings,
        }
    }

    /// Swap in a retriever, e.g. after re-ingestion. In-flight requests keep
    /// the one they started with.
    pub async fn set_retriever(&self, retriever: Retriever<E>) {
        *self.retriever.write().await = Some(Arc::new(retriever));
    }

    pub async fn clear_retriever(&self) {
        *self.retriever.write().await = None;
    }

    pub async fn health(&self) -> HealthStatus {
        HealthStatus {
            index_loaded: self.retriever.read().await.is_some(),
            model_loaded: self.engine.is_ready(),
        }
    }

    /// Retrieval only, without generation.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<RetrievalResult>, RagError> {
        let retriever = self.current_retriever().await.ok_or_else(|| {
            RagError::new(ErrorKind::Retrieval, "no index is loaded; run ingestion first", false)
        })?;
        Ok(retriever.retrieve(query, k, min_score).await?)
    }

    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, RagError> {
        self.ask_with_cancel(request, CancellationToken::new()).await
    }

    /// Answer `request`, honouring `cancel` up to the start of generation.
    pub async fn ask_with_cancel(
        &self,
        request: AskRequest,
        cancel: CancellationToken,
    ) -> Result<AskResponse, RagError> {
        let k = request.k.unwrap_or(self.settings.default_k);
        let span = info_span!(
            "rag.ask",
            room_id = request.room_id.as_deref().unwrap_or("-"),
            k
        );

        let mut lifecycle = RequestLifecycle::new();
        let result = self
            .run(&request, k, &cancel, &mut lifecycle)
            .instrument(span)
            .await;
        if let Err(e) = &result {
            lifecycle.fail();
            warn!(kind = %e.kind, error = %e.message, "Request failed");
        }
        result
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub async fn current_retriever(&self) -> Option<Arc<Retriever<E>>> {
        self.retriever.read().await.clone()
    }

    async fn run(
        &self,
        request: &AskRequest,
        k: usize,
        cancel: &CancellationToken,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<AskResponse, RagError> {
        let query = request.query_text.trim();
        if query.is_empty() {
            return Err(RagError::invalid_request("query_text must not be empty"));
        }

        let mut degraded = false;

        // RECEIVED: resolve the room. A store failure drops to stateless mode.
        let mut room = request.room_id.as_deref();
        let mut history = Vec::new();
        if let Some(room_id) = room {
            match self.sessions.get_or_create(room_id).await {
                Ok(session) => history = session.recent(session.max_history_turns),
                Err(e) => {
                    warn!(room_id, error = %e, "Session store unavailable; answering statelessly");
                    degraded = true;
                    room = None;
                }
            }
        }

        if let Some(kind) = SmallTalk::detect(query) {
            let answer = kind.reply().to_string();
            if self.cancelled(cancel) {
                return Err(RagError::cancelled());
            }
            degraded |= !self.record_exchange(room, query, &answer).await;
            lifecycle.advance(RequestState::Completed)?;
            return Ok(AskResponse {
                answer_text: answer,
                source_documents: Vec::new(),
                degraded,
                truncated: false,
                states: lifecycle.visited().to_vec(),
            });
        }

        lifecycle.advance(RequestState::Retrieving)?;
        let passages = match self.current_retriever().await {
            None => {
                warn!("No index loaded; answering without course material");
                degraded = true;
                Vec::new()
            }
            Some(retriever) => match retriever.retrieve(query, k, self.settings.min_score).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(error = %e, "Retrieval failed; answering without course material");
                    degraded = true;
                    Vec::new()
                }
            },
        };

        lifecycle.advance(RequestState::Assembling)?;
        let context = self.assembler.assemble(
            query,
            &passages,
            &history,
            &self.settings.system_instructions,
            self.settings.token_budget,
        );
        let prompt = self.assembler.render(&context);

        if self.cancelled(cancel) {
            return Err(RagError::cancelled());
        }

        lifecycle.advance(RequestState::Generating)?;
        let generation = GenerationRequest {
            prompt,
            max_new_tokens: request.max_new_tokens.unwrap_or(self.settings.max_new_tokens),
            temperature: request.temperature.unwrap_or(self.settings.temperature),
        };
        let engine = Arc::clone(&self.engine);
        let task = tokio::spawn(
            async move { engine.generate(generation).await }.instrument(Span::current()),
        );
        let raw = match task.await {
            Ok(result) => result?,
            Err(e) => {
                return Err(RagError::new(
                    ErrorKind::Internal,
                    format!("generation task failed: {e}"),
                    false,
                ));
            }
        };

        if self.cancelled(cancel) {
            return Err(RagError::cancelled());
        }

        let mut answer_text = clean_output(&raw);
        if answer_text.is_empty() {
            answer_text = EMPTY_ANSWER_FALLBACK.to_string();
        }
        let result = GenerationResult {
            answer_text,
            source_chunk_ids: context.retrieved_passages.iter().map(|p| p.chunk_id).collect(),
        };

        degraded |= !self.record_exchange(room, query, &result.answer_text).await;
        lifecycle.advance(RequestState::Completed)?;

        info!(
            sources = result.source_chunk_ids.len(),
            degraded,
            truncated = context.truncation.is_truncated(),
            "Request completed"
        );

        Ok(AskResponse {
            answer_text: result.answer_text,
            source_documents: context
                .retrieved_passages
                .iter()
                .map(|p| SourceDocument {
                    source_name: p.source_name.clone(),
                    score: p.score,
                })
                .collect(),
            degraded,
            truncated: context.truncation.is_truncated(),
            states: lifecycle.visited().to_vec(),
        })
    }

    /// Append the exchange to `room`, if any. Returns `false` on a store error.
    async fn record_exchange(&self, room: Option<&str>, query: &str, answer: &str) -> bool {
        let Some(room_id) = room else {
            return true;
        };
        match self
            .sessions
            .append_exchange(
                room_id,
                ConversationTurn::user(query),
                ConversationTurn::assistant(answer),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(room_id, error = %e, "Could not record exchange");
                false
            }
        }
    }

    fn cancelled(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            info!("Request cancelled by caller");
            return true;
        }
        false
    }
}
