//! Ollama HTTP client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use athena_core::llm::InferenceBackend;
use athena_types::config::EngineConfig;
use athena_types::error::GenerationError;
use athena_types::generation::{Device, GenerationRequest};
use reqwest::StatusCode;

use super::types::{ErrorResponse, GenerateRequest, GenerateResponse, KeepAlive, Options};

const TOP_P: f32 = 0.9;
const REPEAT_PENALTY: f32 = 1.2;

/// Substrings of server errors that mean the device ran out of memory.
const OOM_MARKERS: &[&str] = &[
    "out of memory",
    "cuda error",
    "cudamalloc",
    "insufficient memory",
    "requires more system memory",
];

pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    keep_alive: String,
    /// Set when the model was placed on the CPU, so generation requests keep
    /// asking for zero GPU layers.
    cpu_only: AtomicBool,
}

impl OllamaBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        keep_alive: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GenerationError::LoadFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            keep_alive: keep_alive.into(),
            cpu_only: AtomicBool::new(false),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, GenerationError> {
        Self::new(
            &config.base_url,
            &config.model,
            &config.keep_alive,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn num_gpu(&self) -> Option<u32> {
        self.cpu_only.load(Ordering::Acquire).then_some(0)
    }

    fn load_request(&self, device: Device) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: None,
            stream: false,
            keep_alive: KeepAlive::For(self.keep_alive.clone()),
            options: Options {
                num_gpu: (device == Device::Cpu).then_some(0),
                ..Options::default()
            },
        }
    }

    fn generate_request(&self, request: &GenerationRequest) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: Some(request.prompt.clone()),
            stream: false,
            keep_alive: KeepAlive::For(self.keep_alive.clone()),
            options: Options {
                num_predict: Some(request.max_new_tokens),
                temperature: Some(request.temperature),
                top_p: Some(TOP_P),
                repeat_penalty: Some(REPEAT_PENALTY),
                num_gpu: self.num_gpu(),
            },
        }
    }

    fn unload_request(&self) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: None,
            stream: false,
            keep_alive: KeepAlive::Seconds(0),
            options: Options::default(),
        }
    }

    async fn post(&self, body: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let response = self
            .client
            .post(self.url())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&raw)
                .map(|e| e.error)
                .unwrap_or(raw);
            return Err(classify_error(status, message));
        }

        response.json().await.map_err(|e| GenerationError::Backend {
            message: format!("failed to parse Ollama response: {e}"),
            retryable: false,
        })
    }
}

impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn load(&self, device: Device) -> Result<(), GenerationError> {
        self.post(&self.load_request(device)).await?;
        self.cpu_only.store(device == Device::Cpu, Ordering::Release);
        tracing::debug!(model = %self.model, device = %device, "Ollama model resident");
        Ok(())
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = self.post(&self.generate_request(request)).await?;
        if !response.done {
            tracing::warn!(model = %self.model, "Ollama returned an unfinished response");
        }
        tracing::debug!(eval_count = ?response.eval_count, "Ollama generation complete");
        Ok(response.response)
    }

    async fn unload(&self) -> Result<(), GenerationError> {
        self.post(&self.unload_request()).await?;
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    GenerationError::Backend {
        message: format!("Ollama request failed: {e}"),
        retryable: e.is_connect() || e.is_timeout(),
    }
}

fn classify_error(status: StatusCode, message: String) -> GenerationError {
    let lower = message.to_lowercase();
    if OOM_MARKERS.iter().any(|m| lower.contains(m)) {
        return GenerationError::OutOfMemory(message);
    }
    GenerationError::Backend {
        message: format!("HTTP {status}: {message}"),
        retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
    }
}
