use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use copydesk_core::{
    extract_content, AnalysisConfig, AnalysisError, AnalysisRequest, AnalysisResult,
    AnalysisState, ConfigPatch, ExtractedContent,
};
use copydesk_logging::{desk_debug, desk_error, desk_info};

use crate::cache::ResultCache;
use crate::client::{AnalysisClient, ClientSettings, HttpAnalysisClient};
use crate::debounce::Debouncer;
use crate::dedup::RequestDeduplicator;
use crate::retry::run_with_retry;
use crate::stats::{CacheStats, EngineStats};

enum EngineCommand {
    Analyze { html: String, plain_text: String },
    CancelDebounce,
    ForgetLastDispatched,
}

/// Clonable handle to the analysis pipeline.
///
/// Edits flow in through [`analyze_content`](Self::analyze_content); every
/// observable transition is published as an [`AnalysisState`] snapshot on a
/// watch channel. Dropping the last handle tears the pipeline down.
#[derive(Clone)]
pub struct AnalysisEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    shared: Arc<EngineShared>,
}

struct EngineShared {
    state_tx: watch::Sender<AnalysisState>,
    config: Mutex<AnalysisConfig>,
    cache: ResultCache,
    dedup: RequestDeduplicator,
    // Generation of the most recently started run; only that run may publish.
    latest_generation: AtomicU64,
    shutdown: CancellationToken,
    client: Arc<dyn AnalysisClient>,
}

impl AnalysisEngine {
    /// Starts an engine backed by the HTTP analysis service at
    /// `settings.endpoint`.
    pub fn new(settings: ClientSettings, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let client = HttpAnalysisClient::new(settings)?;
        Ok(Self::with_client(Arc::new(client), config))
    }

    /// Starts an engine over any [`AnalysisClient`] implementation.
    pub fn with_client(client: Arc<dyn AnalysisClient>, config: AnalysisConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(AnalysisState::default());

        let shared = Arc::new(EngineShared {
            state_tx,
            config: Mutex::new(config),
            cache: ResultCache::new(),
            dedup: RequestDeduplicator::new(),
            latest_generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            client,
        });

        spawn_pipeline_loop(Arc::clone(&shared), cmd_rx);

        Self {
            inner: Arc::new(EngineInner { cmd_tx, shared }),
        }
    }

    /// Feeds one edit into the pipeline. Non-blocking; failures surface only
    /// through the state stream. Silently ignored after [`destroy`](Self::destroy).
    pub fn analyze_content(&self, html: &str, plain_text: &str) {
        let _ = self.inner.cmd_tx.send(EngineCommand::Analyze {
            html: html.to_string(),
            plain_text: plain_text.to_string(),
        });
    }

    /// Current published snapshot.
    pub fn state(&self) -> AnalysisState {
        self.inner.shared.state_tx.subscribe().borrow().clone()
    }

    /// Stream of published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.inner.shared.state_tx.subscribe()
    }

    /// Merges `patch` into the engine config. Runs already in flight keep
    /// the config they started with.
    pub fn update_config(&self, patch: ConfigPatch) {
        let mut config = lock_config(&self.inner.shared);
        *config = config.merged(&patch);
    }

    /// Cancels every in-flight request and halts a pending debounce timer.
    /// The published state is left untouched.
    pub fn cancel_all_requests(&self) {
        self.inner.shared.dedup.cancel_all();
        let _ = self.inner.cmd_tx.send(EngineCommand::CancelDebounce);
    }

    /// Resets the published state to the empty snapshot and empties the
    /// cache. Runs still in flight can repopulate neither, so resubmitting
    /// the same content afterwards analyzes it again.
    pub fn clear_analysis(&self) {
        let shared = &self.inner.shared;
        // Moving past every issued generation orphans in-flight runs.
        shared.latest_generation.fetch_add(1, Ordering::SeqCst);
        shared.state_tx.send_replace(AnalysisState::default());
        shared.cache.clear();
        let _ = self.inner.cmd_tx.send(EngineCommand::ForgetLastDispatched);
    }

    /// Point-in-time diagnostics snapshot.
    pub fn stats(&self) -> EngineStats {
        let shared = &self.inner.shared;
        EngineStats {
            active_requests: shared.dedup.len(),
            cache: CacheStats {
                size: shared.cache.len(),
                max_size: shared.cache.max_entries(),
            },
            config: lock_config(shared).clone(),
            state: self.state(),
        }
    }

    /// Stops the pipeline and cancels every in-flight request. Idempotent;
    /// later [`analyze_content`](Self::analyze_content) calls are dropped.
    pub fn destroy(&self) {
        self.inner.shared.shutdown.cancel();
        self.inner.shared.dedup.cancel_all();
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        // Concurrent last drops can both read a count above one and skip
        // this; the closing command channel then stops the loop, whose exit
        // path cancels instead.
        if Arc::strong_count(&self.inner) == 1 {
            self.inner.shared.shutdown.cancel();
            self.inner.shared.dedup.cancel_all();
        }
    }
}

fn spawn_pipeline_loop(
    shared: Arc<EngineShared>,
    mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
) {
    tokio::spawn(async move {
        let mut debouncer = Debouncer::default();
        let mut last_dispatched: Option<u64> = None;

        loop {
            let deadline = debouncer.deadline();

            // Biased: shutdown preempts queued work, and a queued edit beats
            // a deadline expiring at the same instant.
            tokio::select! {
                biased;
                () = shared.shutdown.cancelled() => break,
                command = cmd_rx.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        EngineCommand::Analyze { html, plain_text } => {
                            let content = extract_content(&html, &plain_text);
                            let config = lock_config(&shared).clone();
                            if content.is_empty
                                || content.character_count < config.min_content_length
                            {
                                desk_debug!(
                                    "dropping edit below analysis threshold ({} of {} chars)",
                                    content.character_count,
                                    config.min_content_length
                                );
                            } else {
                                debouncer.push(content, config.debounce);
                            }
                        }
                        EngineCommand::CancelDebounce => debouncer.cancel(),
                        EngineCommand::ForgetLastDispatched => last_dispatched = None,
                    }
                }
                () = async {
                    if let Some(deadline) = deadline {
                        tokio::time::sleep_until(deadline).await;
                    }
                }, if deadline.is_some() => {
                    if let Some(content) = debouncer.take() {
                        if last_dispatched == Some(content.fingerprint) {
                            desk_debug!(
                                "skipping analysis of unchanged content {:016x}",
                                content.fingerprint
                            );
                        } else {
                            last_dispatched = Some(content.fingerprint);
                            let generation =
                                shared.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
                            let config = lock_config(&shared).clone();
                            let cache_epoch = shared.cache.epoch();
                            tokio::spawn(run_analysis(
                                Arc::clone(&shared),
                                generation,
                                cache_epoch,
                                content,
                                config,
                            ));
                        }
                    }
                }
            }
        }
        // The channel can close without the token cancelled first; either
        // exit route must leave nothing in flight.
        shared.shutdown.cancel();
        shared.dedup.cancel_all();
        desk_debug!("analysis pipeline loop stopped");
    });
}

async fn run_analysis(
    shared: Arc<EngineShared>,
    generation: u64,
    cache_epoch: u64,
    content: ExtractedContent,
    config: AnalysisConfig,
) {
    let fingerprint = content.fingerprint;
    desk_info!(
        "analysis run {generation} started for {fingerprint:016x} ({} words)",
        content.word_count
    );

    let plain_text = content.plain_text.clone();

    // Busy indicator precedes any network activity.
    publish_if_current(&shared, generation, move |state| {
        state.is_analyzing = true;
        state.error = None;
        state.content = Some(content);
    });

    if config.enable_caching {
        if let Some(result) = shared.cache.get(fingerprint, config.cache_expiry) {
            desk_debug!("cache hit for {fingerprint:016x}");
            publish_if_current(&shared, generation, |state| {
                state.is_analyzing = false;
                state.result = Some(result);
                state.error = None;
                state.last_analyzed_at = Some(SystemTime::now());
            });
            return;
        }
    }

    let request = AnalysisRequest {
        content: plain_text,
        context: None,
    };
    let client = Arc::clone(&shared.client);
    let max_retries = config.max_retries;
    let retry_delay = config.retry_delay;

    let outcome = if config.enable_deduplication {
        shared
            .dedup
            .get_or_create(fingerprint, move || {
                attempt_analysis(client, request, max_retries, retry_delay)
            })
            .await
    } else {
        attempt_analysis(client, request, max_retries, retry_delay).await
    };

    match outcome {
        Ok(result) => {
            if config.enable_caching {
                shared.cache.insert(fingerprint, Arc::clone(&result), cache_epoch);
            }
            let published = publish_if_current(&shared, generation, |state| {
                state.is_analyzing = false;
                state.result = Some(result);
                state.error = None;
                state.last_analyzed_at = Some(SystemTime::now());
            });
            if !published {
                desk_debug!("discarding superseded result of run {generation}");
            }
        }
        Err(AnalysisError::Cancelled) => {
            desk_debug!("analysis run {generation} was cancelled");
        }
        Err(err) => {
            desk_error!("analysis run {generation} failed: {err}");
            publish_if_current(&shared, generation, |state| {
                state.is_analyzing = false;
                // The previous result stays visible next to the new error.
                state.error = Some(err);
            });
        }
    }
}

fn attempt_analysis(
    client: Arc<dyn AnalysisClient>,
    request: AnalysisRequest,
    max_retries: u32,
    retry_delay: Duration,
) -> BoxFuture<'static, Result<Arc<AnalysisResult>, AnalysisError>> {
    Box::pin(run_with_retry(max_retries, retry_delay, move || {
        let client = Arc::clone(&client);
        let request = request.clone();
        async move { client.analyze(&request).await.map(Arc::new) }
    }))
}

/// Applies `mutate` to the published state only while `generation` is still
/// the latest started run and the engine is alive. The check runs inside the
/// watch channel's lock, so a newer run cannot race the publication.
fn publish_if_current<F>(shared: &EngineShared, generation: u64, mutate: F) -> bool
where
    F: FnOnce(&mut AnalysisState),
{
    shared.state_tx.send_if_modified(|state| {
        if shared.shutdown.is_cancelled()
            || shared.latest_generation.load(Ordering::SeqCst) != generation
        {
            return false;
        }
        mutate(state);
        true
    })
}

fn lock_config(shared: &EngineShared) -> std::sync::MutexGuard<'_, AnalysisConfig> {
    shared.config.lock().unwrap_or_else(PoisonError::into_inner)
}
