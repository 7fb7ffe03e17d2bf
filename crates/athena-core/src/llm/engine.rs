//! InferenceEngine -- owns the one loaded model of the process.
//!
//! Lifecycle: the model is loaded lazily on the first `generate` (or eagerly
//! via `init`), at most once until `reload` or `shutdown`. The device is
//! resolved at load time and stays fixed until the next load. An
//! out-of-memory failure while loading on the accelerator retries once on
//! the CPU.
//!
//! Admission: a single-permit semaphore guards `generate`, so at most one
//! generation is ever in flight. Under [`QueuePolicy::Reject`] a second
//! caller gets [`EngineError::Busy`] immediately; under
//! [`QueuePolicy::Wait`] it queues (FIFO) up to a timeout and a waiter cap.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use athena_types::config::{EngineConfig, QueueMode};
use athena_types::error::{EngineError, GenerationError};
use athena_types::generation::{Device, DevicePreference, GenerationRequest};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit, TryAcquireError};
use tracing::{Instrument, debug, info, info_span, warn};

use super::backend::InferenceBackend;
use super::box_backend::BoxInferenceBackend;
use super::device::{AcceleratorProbe, resolve_device};

/// What a caller experiences when a generation is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    Reject,
    Wait {
        timeout: Duration,
        max_waiters: usize,
    },
}

impl QueuePolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        match config.queue {
            QueueMode::Reject => QueuePolicy::Reject,
            QueueMode::Wait => QueuePolicy::Wait {
                timeout: Duration::from_millis(config.queue_timeout_ms),
                max_waiters: config.max_waiters,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Unloaded,
    Loaded(Device),
    ShutDown,
}

const NO_DEVICE: u8 = 0;

fn encode_device(device: Device) -> u8 {
    match device {
        Device::Accelerator => 1,
        Device::Cpu => 2,
    }
}

fn decode_device(raw: u8) -> Option<Device> {
    match raw {
        1 => Some(Device::Accelerator),
        2 => Some(Device::Cpu),
        _ => None,
    }
}

/// Decrements the waiter count when a queued caller leaves, however it leaves.
struct WaiterGuard<'a>(&'a AtomicUsize);

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct InferenceEngine {
    backend: BoxInferenceBackend,
    probe: Box<dyn AcceleratorProbe>,
    preference: DevicePreference,
    policy: QueuePolicy,
    lifecycle: Mutex<Lifecycle>,
    gate: Semaphore,
    waiters: AtomicUsize,
    ready: AtomicBool,
    device: AtomicU8,
}

impl InferenceEngine {
    pub fn new(
        backend: BoxInferenceBackend,
        probe: Box<dyn AcceleratorProbe>,
        preference: DevicePreference,
        policy: QueuePolicy,
    ) -> Self {
        Self {
            backend,
            probe,
            preference,
            policy,
            lifecycle: Mutex::new(Lifecycle::Unloaded),
            gate: Semaphore::new(1),
            waiters: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            device: AtomicU8::new(NO_DEVICE),
        }
    }

    /// Load the model now instead of on first use.
    pub async fn init(&self) -> Result<Device, EngineError> {
        self.ensure_loaded().await
    }

    /// Generate a completion for `request`.
    ///
    /// Rejects empty prompts before touching the model. Holds the single
    /// generation permit for the whole call, including a lazy load.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, EngineError> {
        if request.prompt.trim().is_empty() {
            return Err(GenerationError::MalformedInput("prompt is empty".into()).into());
        }
        if request.max_new_tokens == 0 {
            return Err(
                GenerationError::MalformedInput("max_new_tokens must be at least 1".into()).into(),
            );
        }

        let _permit = self.admit().await?;
        let device = self.ensure_loaded().await?;

        let span = info_span!(
            "gen_ai.generate",
            gen_ai.system = self.backend.name(),
            gen_ai.request.model = %self.backend.model(),
            gen_ai.request.max_tokens = request.max_new_tokens,
            gen_ai.request.temperature = ?request.temperature,
            device = %device,
        );

        let started = Instant::now();
        let result = self.backend.generate(&request).instrument(span).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(text) => debug!(elapsed_ms, chars = text.len(), "Generation finished"),
            Err(e) => warn!(elapsed_ms, error = %e, retryable = e.is_retryable(), "Generation failed"),
        }
        result.map_err(EngineError::from)
    }

    /// Unload and load again, re-resolving the device.
    ///
    /// Waits for any in-flight generation to finish first.
    pub async fn reload(&self) -> Result<Device, EngineError> {
        let _permit = self.gate.acquire().await.map_err(|_| EngineError::ShutDown)?;
        let mut lifecycle = self.lifecycle.lock().await;

        match *lifecycle {
            Lifecycle::ShutDown => return Err(EngineError::ShutDown),
            Lifecycle::Loaded(_) => {
                self.mark_unloaded();
                if let Err(e) = self.backend.unload().await {
                    warn!(error = %e, "Unload before reload failed");
                }
                *lifecycle = Lifecycle::Unloaded;
            }
            Lifecycle::Unloaded => {}
        }

        let device = self.load_with_fallback().await?;
        *lifecycle = Lifecycle::Loaded(device);
        self.mark_loaded(device);
        Ok(device)
    }

    /// Unload the model and refuse all further work.
    ///
    /// Waits for an in-flight generation; queued callers get
    /// [`EngineError::ShutDown`]. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        let permit = self.gate.acquire().await;
        self.gate.close();

        let mut lifecycle = self.lifecycle.lock().await;
        if let Lifecycle::Loaded(_) = *lifecycle {
            if let Err(e) = self.backend.unload().await {
                warn!(error = %e, "Model unload failed during shutdown");
            }
        }
        if *lifecycle != Lifecycle::ShutDown {
            info!(model = %self.backend.model(), "Inference engine shut down");
        }
        *lifecycle = Lifecycle::ShutDown;
        self.mark_unloaded();
        drop(permit);
    }

    /// Health signal: a model is loaded and the engine accepts work.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Device of the loaded model, if any.
    pub fn device(&self) -> Option<Device> {
        decode_device(self.device.load(Ordering::SeqCst))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    async fn admit(&self) -> Result<SemaphorePermit<'_>, EngineError> {
        match self.gate.try_acquire() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::Closed) => return Err(EngineError::ShutDown),
            Err(TryAcquireError::NoPermits) => {}
        }

        let QueuePolicy::Wait {
            timeout,
            max_waiters,
        } = self.policy
        else {
            debug!("Generation in flight; rejecting");
            return Err(EngineError::Busy);
        };

        let queued = self.waiters.fetch_add(1, Ordering::SeqCst);
        let _guard = WaiterGuard(&self.waiters);
        if queued >= max_waiters {
            debug!(queued, max_waiters, "Generation queue full; rejecting");
            return Err(EngineError::Busy);
        }

        match tokio::time::timeout(timeout, self.gate.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(EngineError::ShutDown),
            Err(_elapsed) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "Timed out waiting for generation slot");
                Err(EngineError::Busy)
            }
        }
    }

    async fn ensure_loaded(&self) -> Result<Device, EngineError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Loaded(device) => Ok(device),
            Lifecycle::ShutDown => Err(EngineError::ShutDown),
            Lifecycle::Unloaded => {
                let device = self.load_with_fallback().await?;
                *lifecycle = Lifecycle::Loaded(device);
                self.mark_loaded(device);
                Ok(device)
            }
        }
    }

    async fn load_with_fallback(&self) -> Result<Device, GenerationError> {
        let device = resolve_device(self.preference, self.probe.accelerator_available());
        let span = info_span!(
            "gen_ai.load",
            gen_ai.system = self.backend.name(),
            gen_ai.request.model = %self.backend.model(),
            device = %device,
        );

        async {
            let started = Instant::now();
            let loaded = match self.backend.load(device).await {
                Ok(()) => device,
                Err(GenerationError::OutOfMemory(message)) if device == Device::Accelerator => {
                    warn!(error = %message, "Accelerator out of memory while loading; falling back to CPU");
                    self.backend.load(Device::Cpu).await.map_err(into_load_failed)?;
                    Device::Cpu
                }
                Err(e) => return Err(into_load_failed(e)),
            };
            info!(
                device = %loaded,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Model loaded"
            );
            Ok(loaded)
        }
        .instrument(span)
        .await
    }

    fn mark_loaded(&self, device: Device) {
        self.device.store(encode_device(device), Ordering::SeqCst);
        self.ready.store(true, Ordering::SeqCst);
    }

    fn mark_unloaded(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.device.store(NO_DEVICE, Ordering::SeqCst);
    }
}

fn into_load_failed(e: GenerationError) -> GenerationError {
    match e {
        GenerationError::LoadFailed(message) => GenerationError::LoadFailed(message),
        other => GenerationError::LoadFailed(other.to_string()),
    }
}
