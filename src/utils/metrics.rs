//! Observability and Metrics
//!
//! Counters for frames, bytes, decode failures and handler activity.
//!
//! Uses atomic counters for thread-safe metrics collection; every session
//! shares one [`Metrics`] through an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for wire-layer operations
#[derive(Debug)]
pub struct Metrics {
    /// Total sessions started
    pub sessions_total: AtomicU64,
    /// Currently running sessions
    pub sessions_active: AtomicU64,
    /// Total frames received
    pub frames_received: AtomicU64,
    /// Total frames sent
    pub frames_sent: AtomicU64,
    /// Total payload bytes received
    pub bytes_received: AtomicU64,
    /// Total payload bytes sent
    pub bytes_sent: AtomicU64,
    /// Frames whose body failed to decode
    pub decode_errors: AtomicU64,
    /// STATUS responses carrying a failure code
    pub status_errors: AtomicU64,
    /// Requests handed to a handler
    pub requests_handled: AtomicU64,
    /// Sessions torn down by a fatal error
    pub fatal_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            sessions_total: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            status_errors: AtomicU64::new(0),
            requests_handled: AtomicU64::new(0),
            fatal_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn session_started(&self) {
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_ended(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a frame received, `byte_count` being the payload length
    pub fn frame_received(&self, byte_count: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a frame sent, `byte_count` being the payload length
    pub fn frame_sent(&self, byte_count: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn status_error(&self) {
        self.status_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_handled(&self) {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fatal_error(&self) {
        self.fatal_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            status_errors: self.status_errors.load(Ordering::Relaxed),
            requests_handled: self.requests_handled.load(Ordering::Relaxed),
            fatal_errors: self.fatal_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            sessions_total = snapshot.sessions_total,
            sessions_active = snapshot.sessions_active,
            frames_received = snapshot.frames_received,
            frames_sent = snapshot.frames_sent,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            decode_errors = snapshot.decode_errors,
            status_errors = snapshot.status_errors,
            requests_handled = snapshot.requests_handled,
            fatal_errors = snapshot.fatal_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "SFTP metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_total: u64,
    pub sessions_active: u64,
    pub frames_received: u64,
    pub frames_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub decode_errors: u64,
    pub status_errors: u64,
    pub requests_handled: u64,
    pub fatal_errors: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.session_started();
        metrics.frame_received(10);
        metrics.frame_received(5);
        metrics.frame_sent(7);
        metrics.decode_error();
        metrics.session_ended();

        let snap = metrics.snapshot();
        assert_eq!(snap.sessions_total, 1);
        assert_eq!(snap.sessions_active, 0);
        assert_eq!(snap.frames_received, 2);
        assert_eq!(snap.bytes_received, 15);
        assert_eq!(snap.frames_sent, 1);
        assert_eq!(snap.bytes_sent, 7);
        assert_eq!(snap.decode_errors, 1);
    }
}
