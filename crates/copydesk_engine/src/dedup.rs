use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use copydesk_core::{AnalysisError, AnalysisResult};
use copydesk_logging::desk_debug;

/// Outcome future shared by every caller waiting on the same fingerprint.
pub type SharedOutcome = Shared<BoxFuture<'static, Result<Arc<AnalysisResult>, AnalysisError>>>;

struct PendingRequest {
    // Distinguishes successive entries under one fingerprint so a stale
    // removal cannot evict a successor.
    id: u64,
    outcome: SharedOutcome,
    cancel: CancellationToken,
}

/// Tracks in-flight analyses by fingerprint so concurrent requests for
/// identical content share one outcome instead of hitting the service twice.
pub struct RequestDeduplicator {
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    next_id: AtomicU64,
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the in-flight outcome for `fingerprint`, creating it from
    /// `factory` when none exists. The entry removes itself on completion,
    /// so a later request for the same fingerprint starts fresh instead of
    /// replaying a finished one. Cancellation resolves the outcome to
    /// [`AnalysisError::Cancelled`].
    pub fn get_or_create<F>(&self, fingerprint: u64, factory: F) -> SharedOutcome
    where
        F: FnOnce() -> BoxFuture<'static, Result<Arc<AnalysisResult>, AnalysisError>>,
    {
        let mut pending = lock(&self.pending);
        if let Some(entry) = pending.get(&fingerprint) {
            desk_debug!("joining in-flight analysis for {fingerprint:016x}");
            return entry.outcome.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = factory();
        let registry = Arc::clone(&self.pending);
        let outcome: SharedOutcome = async move {
            let outcome = tokio::select! {
                () = token.cancelled() => Err(AnalysisError::Cancelled),
                outcome = inner => outcome,
            };
            let mut pending = lock(&registry);
            if pending.get(&fingerprint).is_some_and(|entry| entry.id == id) {
                pending.remove(&fingerprint);
            }
            outcome
        }
        .boxed()
        .shared();

        pending.insert(
            fingerprint,
            PendingRequest {
                id,
                outcome: outcome.clone(),
                cancel,
            },
        );
        outcome
    }

    /// Cancels every tracked request and forgets them immediately; callers
    /// still awaiting a shared outcome observe `Cancelled`.
    pub fn cancel_all(&self) {
        let drained: Vec<PendingRequest> = {
            let mut pending = lock(&self.pending);
            pending.drain().map(|(_, entry)| entry).collect()
        };
        if !drained.is_empty() {
            desk_debug!("cancelling {} in-flight analyses", drained.len());
        }
        for entry in drained {
            entry.cancel.cancel();
        }
    }

    /// Number of requests currently in flight.
    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(
    pending: &Mutex<HashMap<u64, PendingRequest>>,
) -> MutexGuard<'_, HashMap<u64, PendingRequest>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
