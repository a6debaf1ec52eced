// Advisory orchestration around an external narrative provider (an LLM)
//
// Layers, bottom up:
// - template: closed placeholder set and pure prompt rendering
// - key: canonical-JSON SHA-256 cache keys
// - cache / history: bounded TTL cache (FIFO) and call log (ring buffer)
// - provider: the AdvisoryProvider trait and its HTTP implementation
// - orchestrator: cache check, timeout, retry with exponential backoff
// - fallback: deterministic Markdown report for when the provider fails

mod cache;
mod config;
mod error;
mod fallback;
mod history;
mod key;
mod orchestrator;
mod params;
mod provider;
mod template;

pub use cache::AdvisoryCache;
pub use config::{
    AdvisoryConfig, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_TTL_SECS,
};
pub use error::{AdvisoryError, AdvisoryErrorKind};
pub use fallback::{
    advise_or_fallback, fallback_for_error, render_fallback_report, AdvisorySource, AdvisoryText,
};
pub use history::{CallOutcome, Feedback, HistoryLog, HistoryRecord};
pub use key::{cache_key, canonical_json, canonicalize, KEY_HASH_LEN};
pub use orchestrator::{Advisory, AdvisoryOrchestrator};
pub use params::{AdvisoryParams, FindingDigest, MetricDigest};
pub use provider::{
    AdvisoryPayload, AdvisoryProvider, HttpProvider, ProviderConfig, API_KEY_ENV,
    DEFAULT_CHAT_URL, DEFAULT_GEMINI_URL,
};
pub use template::{
    render_template, validate_template, Placeholder, RequestKind, TemplateError, SYSTEM_PROMPT,
};
