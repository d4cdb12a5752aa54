//! Model ownership with once-only initialization and fallback loading.
//!
//! The provider is an explicit dependency handed to the analyzer rather than
//! a process-wide global. Its loader runs at most once: the outcome, success
//! or failure, is cached for the provider's lifetime, and concurrent callers
//! block on the state lock until the first load completes.

use std::{
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result, anyhow};
use log::warn;

use crate::model::{InferenceBackend, SaliencyModel};

type Loader = dyn Fn() -> Result<Arc<dyn InferenceBackend>> + Send + Sync;

enum LoadState {
    Ready(Arc<dyn InferenceBackend>),
    Failed(String),
}

/// Lazily loads an inference backend and shares it across analyses.
pub struct ModelProvider {
    loader: Box<Loader>,
    state: Mutex<Option<LoadState>>,
}

impl fmt::Debug for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().expect("model provider state poisoned");
        let label = match state.as_ref() {
            None => "pending",
            Some(LoadState::Ready(_)) => "ready",
            Some(LoadState::Failed(_)) => "failed",
        };
        f.debug_struct("ModelProvider").field("state", &label).finish()
    }
}

impl ModelProvider {
    /// Create a provider around an arbitrary loader closure.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn InferenceBackend>> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            state: Mutex::new(None),
        }
    }

    /// Provider that tries the saliency model first and falls back to a
    /// generic classifier model when the primary load fails.
    pub fn with_fallback(primary: PathBuf, fallback: Option<PathBuf>) -> Self {
        Self::new(move || match SaliencyModel::load(&primary) {
            Ok(model) => Ok(Arc::new(model) as Arc<dyn InferenceBackend>),
            Err(primary_err) => {
                let Some(fallback_path) = fallback.as_ref() else {
                    return Err(primary_err);
                };
                warn!(
                    "failed to load saliency model {}: {primary_err:#}; falling back to {}",
                    primary.display(),
                    fallback_path.display()
                );
                let model = SaliencyModel::load(fallback_path).with_context(|| {
                    format!(
                        "fallback model {} failed after primary error: {primary_err}",
                        fallback_path.display()
                    )
                })?;
                Ok(Arc::new(model) as Arc<dyn InferenceBackend>)
            }
        })
    }

    /// Provider that hands out an already-constructed backend.
    pub fn for_backend(backend: Arc<dyn InferenceBackend>) -> Self {
        Self::new(move || Ok(backend.clone()))
    }

    /// Return the shared backend, loading it on first use.
    ///
    /// Idempotent: the loader runs at most once per provider. A failed load
    /// is cached and re-reported on subsequent calls rather than retried.
    /// Callers racing the first load block until it completes.
    pub fn initialize(&self) -> Result<Arc<dyn InferenceBackend>> {
        let mut state = self.state.lock().expect("model provider state poisoned");
        match state.as_ref() {
            Some(LoadState::Ready(backend)) => Ok(backend.clone()),
            Some(LoadState::Failed(message)) => {
                Err(anyhow!("heatmap model unavailable: {message}"))
            }
            None => match (self.loader)() {
                Ok(backend) => {
                    *state = Some(LoadState::Ready(backend.clone()));
                    Ok(backend)
                }
                Err(err) => {
                    *state = Some(LoadState::Failed(format!("{err:#}")));
                    Err(err)
                }
            },
        }
    }

    /// Returns `true` once a backend has been loaded successfully.
    pub fn is_initialized(&self) -> bool {
        matches!(
            self.state
                .lock()
                .expect("model provider state poisoned")
                .as_ref(),
            Some(LoadState::Ready(_))
        )
    }
}
