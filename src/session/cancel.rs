use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Owns the cancellation token of the transport currently in flight.
///
/// At most one token is armed at a time. Cancelling with nothing armed does
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct Canceller {
    armed: Arc<Mutex<Option<CancellationToken>>>,
}

impl Canceller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh token for a new transport and return it.
    ///
    /// A token left armed by a previous transport is cancelled first.
    pub fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self.slot().replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        token
    }

    /// Release the armed token once its transport has ended.
    pub fn disarm(&self) {
        self.slot().take();
    }

    /// Cancel the armed token. Returns whether a transport was in flight.
    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                debug!("cancelling in-flight transport");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot().is_some()
    }

    /// A handle other tasks can use to stop the session.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            canceller: self.clone(),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable stop request, e.g. for a Ctrl+C listener.
///
/// The session loop observes the cancelled token at its next read boundary
/// and freezes the state as stopped.
#[derive(Debug, Clone)]
pub struct StopHandle {
    canceller: Canceller,
}

impl StopHandle {
    pub fn stop(&self) -> bool {
        self.canceller.cancel()
    }
}
