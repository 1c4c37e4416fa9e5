//! One-time model initialization shared by concurrent requests.
//!
//! The first caller of [`ReadinessGate::ensure_ready`] starts the load; the
//! load future is wrapped in [`Shared`] so every concurrent caller awaits the
//! same completion and observes the same handle or the same error. A failed
//! load returns the gate to `NotLoaded`, and the next caller starts a fresh
//! attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::telemetry;
use crate::traits::{ModelLoader, TextGenerator};
use crate::types::GenerateOptions;
use crate::{MuninError, Result};

/// Lifecycle state reported by `/api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    NotLoaded,
    Loading,
    Ready,
}

/// Pre-warm generation issued once after a successful load.
#[derive(Debug, Clone)]
pub struct WarmupConfig {
    pub prompt: String,
    pub options: GenerateOptions,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            prompt: "Hello".to_string(),
            options: GenerateOptions::new(5),
        }
    }
}

type LoadOutcome = std::result::Result<Arc<dyn TextGenerator>, String>;
type LoadFuture = Shared<BoxFuture<'static, LoadOutcome>>;

enum State {
    NotLoaded,
    Loading { attempt: u64, future: LoadFuture },
    Ready(Arc<dyn TextGenerator>),
}

struct Inner {
    state: State,
    attempts: u64,
    last_error: Option<String>,
}

/// Coordinates the one-time load of the shared [`TextGenerator`].
pub struct ReadinessGate {
    loader: Arc<dyn ModelLoader>,
    warmup: Option<WarmupConfig>,
    inner: Mutex<Inner>,
}

impl ReadinessGate {
    /// Create a gate that loads through `loader` without pre-warming.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            warmup: None,
            inner: Mutex::new(Inner {
                state: State::NotLoaded,
                attempts: 0,
                last_error: None,
            }),
        }
    }

    /// Issue a pre-warm generation after each successful load.
    pub fn with_warmup(mut self, warmup: WarmupConfig) -> Self {
        self.warmup = Some(warmup);
        self
    }

    /// Return the loaded generator, loading it first if needed.
    ///
    /// Concurrent callers during a load all resolve with the same outcome.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn TextGenerator>> {
        let (attempt, future) = {
            let mut inner = self.lock();
            match &inner.state {
                State::Ready(generator) => return Ok(Arc::clone(generator)),
                State::Loading { attempt, future } => (*attempt, future.clone()),
                State::NotLoaded => {
                    inner.attempts += 1;
                    let attempt = inner.attempts;
                    let future = self.load_future();
                    inner.state = State::Loading {
                        attempt,
                        future: future.clone(),
                    };
                    info!(attempt, "loading model");
                    (attempt, future)
                }
            }
        };

        let outcome = future.await;

        let mut inner = self.lock();
        if matches!(inner.state, State::Loading { attempt: current, .. } if current == attempt) {
            let status = match &outcome {
                Ok(generator) => {
                    inner.state = State::Ready(Arc::clone(generator));
                    inner.last_error = None;
                    info!(attempt, generator = generator.name(), "model ready");
                    "ok"
                }
                Err(e) => {
                    inner.state = State::NotLoaded;
                    inner.last_error = Some(e.clone());
                    warn!(attempt, error = %e, "model load failed");
                    "error"
                }
            };
            metrics::counter!(telemetry::MODEL_LOADS_TOTAL, "status" => status).increment(1);
        }
        drop(inner);

        outcome.map_err(MuninError::ModelLoad)
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ModelStatus {
        match self.lock().state {
            State::NotLoaded => ModelStatus::NotLoaded,
            State::Loading { .. } => ModelStatus::Loading,
            State::Ready(_) => ModelStatus::Ready,
        }
    }

    /// Message of the most recent failed load, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Start loading in the background without waiting for it.
    pub fn spawn_preload(self: &Arc<Self>) {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are recorded in the gate state and logged there.
            let _ = gate.ensure_ready().await;
        });
    }

    fn load_future(&self) -> LoadFuture {
        let loader = Arc::clone(&self.loader);
        let warmup = self.warmup.clone();
        async move {
            let started = Instant::now();
            let generator = match loader.load().await {
                Ok(generator) => generator,
                Err(e) => return Err(e.to_string()),
            };
            if let Some(warmup) = warmup {
                match generator.generate(&warmup.prompt, &warmup.options).await {
                    Ok(_) => debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "model pre-warm complete"
                    ),
                    Err(e) => warn!(error = %e, "model pre-warm failed"),
                }
            }
            Ok(generator)
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
