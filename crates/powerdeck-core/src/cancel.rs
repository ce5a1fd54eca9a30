// ── Workflow cancellation ──
//
// Each source-switch workflow carries a `WorkflowToken`. Issuing a new one
// cancels the previous token and bumps the shared generation, so a stale
// workflow can tell it lost the race both synchronously (`is_cancelled`)
// and asynchronously (`cancelled().await`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

/// Hands out workflow tokens with monotonically increasing generations.
#[derive(Debug)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
    active: Mutex<CancellationToken>,
    parent: CancellationToken,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::with_parent(CancellationToken::new())
    }

    /// Tokens issued by this counter are also cancelled when `parent` is.
    pub fn with_parent(parent: CancellationToken) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(parent.child_token()),
            parent,
        }
    }

    /// Cancel the current token and issue one for the next generation.
    pub fn issue(&self) -> WorkflowToken {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.cancel();

        let generation = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        let token = self.parent.child_token();
        *active = token.clone();

        WorkflowToken {
            generation,
            current: Arc::clone(&self.current),
            token,
        }
    }

    /// The most recently issued generation (`0` if none).
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Cancel the current token without issuing a new generation.
    pub fn cancel_current(&self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Revocable handle shared by all steps of one workflow instance.
#[derive(Debug, Clone)]
pub struct WorkflowToken {
    generation: u64,
    current: Arc<AtomicU64>,
    token: CancellationToken,
}

impl WorkflowToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// `true` once cancelled explicitly, via the parent, or superseded.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.current.load(Ordering::Acquire) != self.generation
    }

    /// Resolves when the token is cancelled or superseded.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
