//! Prometheus-backed read counters and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counts batches and per-file outcomes; byte totals come from successful reads.

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Terminal outcome of one file read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The read produced a result.
    Loaded,
    /// The read was aborted.
    Aborted,
    /// The read failed.
    Failed,
}

impl ReadOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus-backed metrics registry for batch reads.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    groups_started_total: IntCounter,
    groups_completed_total: IntCounter,
    files_read_total: IntCounterVec,
    files_skipped_total: IntCounter,
    bytes_read_total: IntCounter,
}

/// Snapshot of the counters for reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Batches taken in.
    pub groups_started_total: u64,
    /// Batches whose reads all finished.
    pub groups_completed_total: u64,
    /// Files read successfully.
    pub files_loaded_total: u64,
    /// Files whose read failed or was aborted.
    pub files_failed_total: u64,
    /// Files rejected by the accept pattern.
    pub files_skipped_total: u64,
    /// Bytes delivered by successful reads.
    pub bytes_read_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let groups_started_total = IntCounter::with_opts(Opts::new(
            "groups_started_total",
            "File batches taken in",
        ))?;
        let groups_completed_total = IntCounter::with_opts(Opts::new(
            "groups_completed_total",
            "File batches whose reads all finished",
        ))?;
        let files_read_total = IntCounterVec::new(
            Opts::new("files_read_total", "File reads by terminal outcome"),
            &["outcome"],
        )?;
        let files_skipped_total = IntCounter::with_opts(Opts::new(
            "files_skipped_total",
            "Files rejected by the accept pattern",
        ))?;
        let bytes_read_total = IntCounter::with_opts(Opts::new(
            "bytes_read_total",
            "Bytes delivered by successful reads",
        ))?;

        registry.register(Box::new(groups_started_total.clone()))?;
        registry.register(Box::new(groups_completed_total.clone()))?;
        registry.register(Box::new(files_read_total.clone()))?;
        registry.register(Box::new(files_skipped_total.clone()))?;
        registry.register(Box::new(bytes_read_total.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                groups_started_total,
                groups_completed_total,
                files_read_total,
                files_skipped_total,
                bytes_read_total,
            }),
        })
    }

    /// Record a batch intake.
    pub fn inc_group_started(&self) {
        self.inner.groups_started_total.inc();
    }

    /// Record a batch completion.
    pub fn inc_group_completed(&self) {
        self.inner.groups_completed_total.inc();
    }

    /// Record the terminal outcome of a file read.
    pub fn inc_file_read(&self, outcome: ReadOutcome) {
        self.inner
            .files_read_total
            .with_label_values(&[outcome.label()])
            .inc();
    }

    /// Record a skipped file.
    pub fn inc_file_skipped(&self) {
        self.inner.files_skipped_total.inc();
    }

    /// Add to the delivered byte total.
    pub fn add_bytes_read(&self, bytes: u64) {
        self.inner.bytes_read_total.inc_by(bytes);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let outcome = |value: ReadOutcome| {
            self.inner
                .files_read_total
                .with_label_values(&[value.label()])
                .get()
        };
        MetricsSnapshot {
            groups_started_total: self.inner.groups_started_total.get(),
            groups_completed_total: self.inner.groups_completed_total.get(),
            files_loaded_total: outcome(ReadOutcome::Loaded),
            files_failed_total: outcome(ReadOutcome::Failed) + outcome(ReadOutcome::Aborted),
            files_skipped_total: self.inner.files_skipped_total.get(),
            bytes_read_total: self.inner.bytes_read_total.get(),
        }
    }
}
