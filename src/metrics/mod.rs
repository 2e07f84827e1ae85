//! Prometheus metrics
//!
//! One process-wide registry, exported as text on `/metrics`.

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Encoder, Histogram, HistogramVec, Opts, Registry, TextEncoder,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

pub struct Metrics {
    registry: Registry,

    // Conversation metrics
    pub messages_processed: CounterVec,

    // Completion metrics
    pub completion_requests: CounterVec,
    pub completion_duration: HistogramVec,

    // Context window
    pub prompt_tokens: Histogram,
    pub window_headroom: Histogram,
    pub window_rejections: Counter,
    pub messages_filtered: Counter,
    pub messages_trimmed: Counter,

    // Summarization metrics
    pub summarizations: CounterVec,

    // Agent pipeline metrics
    pub pipeline_stage_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let messages_processed = register_counter_vec_with_registry!(
            Opts::new("messages_processed_total", "User messages handled by the orchestrator"),
            &["status"],
            registry
        )?;

        let completion_requests = register_counter_vec_with_registry!(
            Opts::new("completion_requests_total", "Completion calls per model"),
            &["model", "status"],
            registry
        )?;

        let completion_duration = register_histogram_vec_with_registry!(
            "completion_duration_seconds",
            "Completion call duration in seconds, retries included",
            &["model"],
            registry
        )?;

        let prompt_tokens = register_histogram_with_registry!(
            "prompt_tokens_estimated",
            "Estimated input tokens per completion call",
            vec![64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0],
            registry
        )?;

        let window_headroom = register_histogram_with_registry!(
            "context_window_headroom_tokens",
            "Window tokens left after the prompt",
            vec![0.0, 500.0, 2000.0, 8000.0, 32000.0, 128000.0],
            registry
        )?;

        let window_rejections = register_counter_with_registry!(
            Opts::new(
                "context_window_rejections_total",
                "Calls refused because the prompt left no safe headroom"
            ),
            registry
        )?;

        let messages_filtered = register_counter_with_registry!(
            Opts::new("messages_filtered_total", "Oversized messages dropped before a call"),
            registry
        )?;

        let messages_trimmed = register_counter_with_registry!(
            Opts::new("messages_trimmed_total", "Oldest messages evicted to fit the window"),
            registry
        )?;

        let summarizations = register_counter_vec_with_registry!(
            Opts::new("summarizations_total", "Summarization attempts by outcome"),
            &["outcome"],
            registry
        )?;

        let pipeline_stage_duration = register_histogram_vec_with_registry!(
            "pipeline_stage_duration_seconds",
            "Agent pipeline stage duration in seconds",
            &["stage"],
            registry
        )?;

        Ok(Self {
            registry,
            messages_processed,
            completion_requests,
            completion_duration,
            prompt_tokens,
            window_headroom,
            window_rejections,
            messages_filtered,
            messages_trimmed,
            summarizations,
            pipeline_stage_duration,
        })
    }

    /// Record the outcome of one user message
    pub fn record_message(&self, status: &str) {
        self.messages_processed.with_label_values(&[status]).inc();
    }

    /// Record a completion call
    pub fn record_completion(&self, model: &str, success: bool, elapsed: Duration) {
        let status = if success { "success" } else { "error" };
        self.completion_requests
            .with_label_values(&[model, status])
            .inc();
        self.completion_duration
            .with_label_values(&[model])
            .observe(elapsed.as_secs_f64());
    }

    /// Record how much of the window a prompt took; `rejected` marks refused calls
    pub fn record_window_usage(&self, prompt_tokens: usize, headroom: usize, rejected: bool) {
        self.prompt_tokens.observe(prompt_tokens as f64);
        self.window_headroom.observe(headroom as f64);
        if rejected {
            self.window_rejections.inc();
        }
    }

    /// Record messages removed by cleaning
    pub fn record_cleaning(&self, filtered: usize, trimmed: usize) {
        self.messages_filtered.inc_by(filtered as f64);
        self.messages_trimmed.inc_by(trimmed as f64);
    }

    /// Record a summarization outcome
    pub fn record_summarization(&self, outcome: &str) {
        self.summarizations.with_label_values(&[outcome]).inc();
    }

    /// Text exposition of every registered metric
    pub fn export_prometheus(&self) -> String {
        let mut out = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut out) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(out).unwrap_or_default()
    }
}

/// Evaluate `$operation` while timing it into `$histogram{label=$label}`
#[macro_export]
macro_rules! time_operation {
    ($histogram:expr, $label:expr, $operation:expr) => {{
        let _timer = $histogram.with_label_values(&[$label]).start_timer();
        $operation
    }};
}
