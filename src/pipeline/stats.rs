//! Run-wide counters shared by every worker
//!
//! Counters are atomics; the error list has its own lock.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default)]
pub struct Stats {
    files_total: AtomicUsize,
    files_translated: AtomicUsize,
    files_copied: AtomicUsize,
    files_resumed: AtomicUsize,
    files_errored: AtomicUsize,
    input_chars: AtomicUsize,
    output_chars: AtomicUsize,
    words: AtomicUsize,
    backend_calls: AtomicUsize,
    backend_micros: AtomicU64,
    errors: Mutex<Vec<String>>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file_seen(&self) {
        self.files_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translated(&self) {
        self.files_translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copied(&self) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resumed(&self) {
        self.files_resumed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed file and keep its message for the summary
    pub fn record_error(&self, message: impl Into<String>) {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        errors.push(message.into());
        self.files_errored.fetch_add(1, Ordering::Relaxed);
    }

    /// Account one completed backend call
    pub fn record_backend_call(&self, elapsed: Duration, source: &str, translation: &str) {
        self.backend_calls.fetch_add(1, Ordering::Relaxed);
        self.backend_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.input_chars
            .fetch_add(source.chars().count(), Ordering::Relaxed);
        self.output_chars
            .fetch_add(translation.chars().count(), Ordering::Relaxed);
        self.words
            .fetch_add(source.split_whitespace().count(), Ordering::Relaxed);
    }

    pub fn backend_calls(&self) -> usize {
        self.backend_calls.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSummary {
        StatsSummary {
            files_total: self.files_total.load(Ordering::Relaxed),
            files_translated: self.files_translated.load(Ordering::Relaxed),
            files_copied: self.files_copied.load(Ordering::Relaxed),
            files_resumed: self.files_resumed.load(Ordering::Relaxed),
            files_errored: self.files_errored.load(Ordering::Relaxed),
            input_chars: self.input_chars.load(Ordering::Relaxed),
            output_chars: self.output_chars.load(Ordering::Relaxed),
            words: self.words.load(Ordering::Relaxed),
            backend_calls: self.backend_calls.load(Ordering::Relaxed),
            backend_time: Duration::from_micros(self.backend_micros.load(Ordering::Relaxed)),
            errors: self
                .errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub files_total: usize,
    pub files_translated: usize,
    pub files_copied: usize,
    pub files_resumed: usize,
    pub files_errored: usize,
    pub input_chars: usize,
    pub output_chars: usize,
    pub words: usize,
    pub backend_calls: usize,
    pub backend_time: Duration,
    pub errors: Vec<String>,
}

impl StatsSummary {
    /// Files not translated: byte-copied or already present
    pub fn files_skipped(&self) -> usize {
        self.files_copied + self.files_resumed
    }

    /// Source words per second of backend time
    pub fn words_per_second(&self) -> Option<f64> {
        let secs = self.backend_time.as_secs_f64();
        (secs > 0.0).then(|| self.words as f64 / secs)
    }

    pub fn log_summary(&self, wall_time: Duration) {
        info!("-------------- TRANSLATION SUMMARY --------------");
        info!("Total files:          {}", self.files_total);
        info!("Translated files:     {}", self.files_translated);
        info!(
            "Skipped files:        {} ({} copied, {} resumed)",
            self.files_skipped(),
            self.files_copied,
            self.files_resumed
        );
        info!("Files with errors:    {}", self.files_errored);
        info!("Backend calls:        {}", self.backend_calls);
        info!("Total input chars:    {}", self.input_chars);
        info!("Total output chars:   {}", self.output_chars);
        info!("Total words (approx): {}", self.words);
        info!("Backend time (s):     {:.2}", self.backend_time.as_secs_f64());
        info!("Wall time (s):        {:.2}", wall_time.as_secs_f64());
        if let Some(wps) = self.words_per_second() {
            info!("Throughput:           {:.2} words/sec (backend time)", wps);
        }

        if !self.errors.is_empty() {
            info!("Errors encountered:");
            for error in &self.errors {
                info!("  {}", error);
            }
        }
    }
}
