//! Telemetry metric name constants.
//!
//! Centralised metric names for skald operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `skald_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: what was retried ("fetch", "fetch_translated", "fetch_original")
//! - `cache`: "success" or "failure"
//! - `tier`: selection tier name ("manual_exact", "translate", ...)
//! - `backend`: STT backend ("openai", "gemini", "local")

/// Total transcript requests served by the service.
///
/// Labels: `status` ("ok" | "throttled" | "error").
pub const REQUESTS_TOTAL: &str = "skald_requests_total";

/// Request duration in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "skald_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "skald_retries_total";

/// Total cache hits.
///
/// Labels: `cache`.
pub const CACHE_HITS_TOTAL: &str = "skald_cache_hits_total";

/// Total cache misses.
///
/// Labels: `cache`.
pub const CACHE_MISSES_TOTAL: &str = "skald_cache_misses_total";

/// Requests rejected because the circuit breaker was open.
pub const CIRCUIT_OPEN_TOTAL: &str = "skald_circuit_open_total";

/// Which selection tier produced the transcript.
///
/// Labels: `tier`.
pub const TIER_HITS_TOTAL: &str = "skald_tier_hits_total";

/// Speech-to-text fallback attempts.
///
/// Labels: `backend`, `status` ("ok" | "empty").
pub const STT_ATTEMPTS_TOTAL: &str = "skald_stt_attempts_total";
