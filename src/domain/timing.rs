// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Timing Collector
//!
//! Diagnostic wall-clock breakdown of a job. A `SpanTimer` is started and
//! stopped explicitly and adds its elapsed time to a caller-owned
//! `TimingCollector` under a label; repeated labels accumulate. At the end of
//! the job the collector produces a `TimingReport` with the total, the
//! per-label breakdown and whatever time no span accounted for.
//!
//! Timing never influences whether a job succeeds.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// A running span. Consumed by [`SpanTimer::stop`].
#[derive(Debug)]
pub struct SpanTimer {
    label: String,
    started: Instant,
}

impl SpanTimer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    /// Stops the span and adds its elapsed time into `collector`.
    pub fn stop(self, collector: &mut TimingCollector) -> Duration {
        let elapsed = self.started.elapsed();
        debug!("{}: {:.3} s", self.label, elapsed.as_secs_f64());
        collector.record(&self.label, elapsed);
        elapsed
    }
}

/// Label-keyed accumulation of span durations for one job run.
///
/// Labels keep the order in which they were first recorded so the
/// breakdown reads in pipeline order.
#[derive(Debug)]
pub struct TimingCollector {
    started: Instant,
    spans: Vec<(String, Duration)>,
}

impl Default for TimingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingCollector {
    /// Starts the job clock.
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            started,
            spans: Vec::new(),
        }
    }

    pub fn record(&mut self, label: &str, elapsed: Duration) {
        match self.spans.iter_mut().find(|(l, _)| l == label) {
            Some((_, total)) => *total += elapsed,
            None => self.spans.push((label.to_string(), elapsed)),
        }
    }

    /// Runs `f` inside a span named `label`.
    ///
    /// The span is stopped whatever `f` returns, so a failing step is still
    /// accounted for.
    pub fn time<T, F>(&mut self, label: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let timer = SpanTimer::start(label);
        let out = f();
        timer.stop(self);
        out
    }

    /// Accumulated duration for `label`, if any span used it.
    pub fn span(&self, label: &str) -> Option<Duration> {
        self.spans
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, d)| *d)
    }

    pub fn accounted(&self) -> Duration {
        self.spans.iter().map(|(_, d)| *d).sum()
    }

    pub fn report(&self) -> TimingReport {
        self.report_at(Instant::now())
    }

    /// Builds the report as if the job ended at `now`.
    pub fn report_at(&self, now: Instant) -> TimingReport {
        let total_secs = now.saturating_duration_since(self.started).as_secs_f64();
        let spans: Vec<SpanSummary> = self
            .spans
            .iter()
            .map(|(label, d)| SpanSummary {
                label: label.clone(),
                seconds: d.as_secs_f64(),
            })
            .collect();
        let accounted: f64 = spans.iter().map(|s| s.seconds).sum();

        TimingReport {
            total_secs,
            spans,
            unaccounted_secs: total_secs - accounted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanSummary {
    pub label: String,
    pub seconds: f64,
}

/// Snapshot of a collector at job end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    pub total_secs: f64,
    pub spans: Vec<SpanSummary>,
    /// Total minus the sum of all spans.
    pub unaccounted_secs: f64,
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let breakdown: Vec<String> = self
            .spans
            .iter()
            .map(|s| format!("{}={:.3}s", s.label, s.seconds))
            .collect();
        write!(
            f,
            "TOTAL: {:.3} s | Breakdown: {} | UNACCOUNTED: {:.3} s",
            self.total_secs,
            breakdown.join(", "),
            self.unaccounted_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_labels_accumulate() {
        let mut timing = TimingCollector::new();
        timing.record("COPY", Duration::from_millis(200));
        timing.record("RENAME", Duration::from_millis(50));
        timing.record("COPY", Duration::from_millis(300));

        assert_eq!(timing.span("COPY"), Some(Duration::from_millis(500)));
        assert_eq!(timing.span("RENAME"), Some(Duration::from_millis(50)));
        assert_eq!(timing.span("MISSING"), None);
        assert_eq!(timing.accounted(), Duration::from_millis(550));
    }

    #[test]
    fn test_report_unaccounted_residual() {
        let start = Instant::now();
        let mut timing = TimingCollector::started_at(start);
        timing.record("CONNECT", Duration::from_secs(1));
        timing.record("STREAM_TO_STAGING", Duration::from_secs(2));

        let report = timing.report_at(start + Duration::from_secs(5));
        assert!((report.total_secs - 5.0).abs() < 1e-9);
        assert!((report.unaccounted_secs - 2.0).abs() < 1e-9);
        assert_eq!(report.spans[0].label, "CONNECT");
        assert_eq!(report.spans[1].label, "STREAM_TO_STAGING");
    }

    #[test]
    fn test_time_records_failing_step() {
        let mut timing = TimingCollector::new();
        let res: Result<(), String> = timing.time("EXECUTE", || Err("boom".to_string()));

        assert!(res.is_err());
        assert!(timing.span("EXECUTE").is_some());
    }

    #[test]
    fn test_explicit_start_stop() {
        let mut timing = TimingCollector::new();
        let timer = SpanTimer::start("CLEANUP");
        let elapsed = timer.stop(&mut timing);
        assert_eq!(timing.span("CLEANUP"), Some(elapsed));
    }

    #[test]
    fn test_report_display() {
        let report = TimingReport {
            total_secs: 3.0,
            spans: vec![SpanSummary {
                label: "COPY_TO_DESTINATION".into(),
                seconds: 1.25,
            }],
            unaccounted_secs: 1.75,
        };
        assert_eq!(
            report.to_string(),
            "TOTAL: 3.000 s | Breakdown: COPY_TO_DESTINATION=1.250s | UNACCOUNTED: 1.750 s"
        );
    }
}
