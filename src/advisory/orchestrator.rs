// Advisory orchestrator
//
// One logical operation, get_advisory(kind, params):
//
//   PENDING -> CACHE_HIT -> DONE
//   PENDING -> CALLING -> RETRY* -> DONE | FAILED
//
// The provider call, its retries and the cache/history writes run in a
// spawned task. A caller that drops its future does not cancel the call; the
// per-attempt timeout bounds it regardless. Cache and history sit behind one
// mutex that is never held across a provider call.

use crate::advisory::cache::AdvisoryCache;
use crate::advisory::config::AdvisoryConfig;
use crate::advisory::error::AdvisoryError;
use crate::advisory::history::{CallOutcome, Feedback, HistoryLog, HistoryRecord};
use crate::advisory::key::cache_key;
use crate::advisory::params::AdvisoryParams;
use crate::advisory::provider::{AdvisoryPayload, AdvisoryProvider};
use crate::advisory::template::{render_template, RequestKind, SYSTEM_PROMPT};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Advisory text and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub text: String,
    pub from_cache: bool,
    pub cache_key: String,
    /// Provider calls made for this result (0 on a cache hit)
    pub attempts: u32,
}

struct AdvisoryState {
    cache: AdvisoryCache,
    history: HistoryLog,
}

struct Inner {
    provider: Arc<dyn AdvisoryProvider>,
    config: AdvisoryConfig,
    state: Mutex<AdvisoryState>,
}

/// Cached, retrying front end to an advisory provider
///
/// Cloning is cheap; clones share the cache and history.
#[derive(Clone)]
pub struct AdvisoryOrchestrator {
    inner: Arc<Inner>,
}

impl fmt::Debug for AdvisoryOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisoryOrchestrator")
            .field("provider", &self.inner.provider.name())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl AdvisoryOrchestrator {
    pub fn new(provider: Arc<dyn AdvisoryProvider>, config: AdvisoryConfig) -> Self {
        let state = AdvisoryState {
            cache: AdvisoryCache::new(config.ttl(), config.cache_capacity),
            history: HistoryLog::new(config.history_capacity),
        };
        Self {
            inner: Arc::new(Inner {
                provider,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &AdvisoryConfig {
        &self.inner.config
    }

    /// Advisory text for a request, from cache when fresh
    ///
    /// # Errors
    /// Fatal provider errors surface on the first occurrence; transient ones
    /// surface as `RetriesExhausted` once `max_attempts` calls have failed.
    /// Template errors surface before any call is made.
    pub async fn get_advisory(
        &self,
        kind: RequestKind,
        params: &AdvisoryParams,
    ) -> Result<Advisory, AdvisoryError> {
        let key = cache_key(kind, params)?;

        {
            let mut state = self.inner.state.lock().await;
            if let Some(text) = state.cache.get(&key, Instant::now()) {
                debug!(%key, "advisory cache hit");
                return Ok(Advisory {
                    text,
                    from_cache: true,
                    cache_key: key,
                    attempts: 0,
                });
            }
        }

        let prompt = render_template(self.inner.config.template_for(kind), params)?;
        let payload = AdvisoryPayload {
            request_kind: kind,
            system: SYSTEM_PROMPT.to_string(),
            prompt,
        };

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.call_and_record(key, payload).await });
        task.await
            .map_err(|e| AdvisoryError::Internal(format!("advisory task failed: {}", e)))?
    }

    /// Logged provider calls, oldest first
    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.inner.state.lock().await.history.records().cloned().collect()
    }

    /// Attach user feedback to a history record
    pub async fn record_feedback(&self, id: u64, feedback: Feedback) -> bool {
        self.inner.state.lock().await.history.set_feedback(id, feedback)
    }

    pub async fn cached_entries(&self) -> usize {
        self.inner.state.lock().await.cache.len()
    }

    pub async fn clear_cache(&self) {
        self.inner.state.lock().await.cache.clear();
    }
}

impl Inner {
    async fn call_and_record(
        &self,
        key: String,
        payload: AdvisoryPayload,
    ) -> Result<Advisory, AdvisoryError> {
        let started = Instant::now();
        let (result, attempts) = self.call_with_retry(&payload).await;
        let elapsed = started.elapsed();

        // Cache and history change together under one lock
        let mut state = self.state.lock().await;
        match result {
            Ok(text) => {
                state.cache.insert(key.clone(), text.clone(), Instant::now());
                state.history.push(
                    payload.request_kind,
                    key.clone(),
                    CallOutcome::Success,
                    attempts,
                    elapsed,
                );
                info!(%key, attempts, elapsed_ms = elapsed.as_millis() as u64, "advisory received");
                Ok(Advisory {
                    text,
                    from_cache: false,
                    cache_key: key,
                    attempts,
                })
            }
            Err(err) => {
                state.history.push(
                    payload.request_kind,
                    key,
                    CallOutcome::Failure {
                        kind: err.kind(),
                        message: err.to_string(),
                    },
                    attempts,
                    elapsed,
                );
                warn!(kind = %err.kind(), attempts, "advisory failed: {}", err);
                Err(err)
            }
        }
    }

    /// Call the provider until success, a fatal error or the budget runs out
    async fn call_with_retry(&self, payload: &AdvisoryPayload) -> (Result<String, AdvisoryError>, u32) {
        let max_attempts = self.config.max_attempts.max(1);
        let timeout = self.config.timeout();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(timeout, self.provider.invoke(payload)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AdvisoryError::Timeout(timeout)),
            };

            let err = match outcome {
                Ok(text) => return (Ok(text), attempt),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return (Err(err), attempt);
            }

            if attempt >= max_attempts {
                let exhausted = AdvisoryError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                };
                return (Err(exhausted), attempt);
            }

            let delay = self.config.retry_delay(attempt);
            warn!(
                attempt,
                max = max_attempts,
                delay_ms = delay.as_millis() as u64,
                provider = self.provider.name(),
                "Retrying advisory call: {}",
                err
            );
            tokio::time::sleep(delay).await;
        }
    }
}
