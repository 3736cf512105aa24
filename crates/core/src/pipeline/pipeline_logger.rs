use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for per-frame pipeline events.
///
/// Each inference worker owns one, so implementations need no locking.
pub trait PipelineLogger: Send {
    /// Record how long a named pipeline stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. hands detected, queue depth).
    fn metric(&mut self, name: &str, value: f64);

    /// Count one frame that ran to completion or failure.
    fn frame_completed(&mut self, failed: bool);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn frame_completed(&mut self, _failed: bool) {}
}

/// Running aggregate of one timing or metric series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: u64,
    pub total: f64,
    pub max: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Aggregates per-stage timings and metrics and reports them through the
/// `log` facade when the worker shuts down.
///
/// Memory stays bounded by the number of distinct stage and metric names,
/// however many frames a worker serves.
pub struct StatsPipelineLogger {
    name: String,
    timings: HashMap<String, SeriesStats>,
    metrics: HashMap<String, SeriesStats>,
    start_time: Instant,
    frames: u64,
    failed: u64,
}

impl StatsPipelineLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            failed: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "{} summary ({} frames, {} failed, {:.1}s uptime):",
            self.name,
            self.frames,
            self.failed,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stats) in stages {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms  ({} calls)",
                stats.mean(),
                stats.max,
                stats.total,
                stats.count
            ));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, stats) in metrics {
            lines.push(format!("  {name}: avg {:.2}", stats.mean()));
        }

        let busy_ms: f64 = self.timings.values().map(|s| s.total).sum();
        if busy_ms > 0.0 {
            let fps = self.frames as f64 / (busy_ms / 1000.0);
            lines.push(format!("  Throughput while busy: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timing_stats(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metric_stats(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }

    /// Number of distinct timing and metric series being tracked.
    pub fn series_count(&self) -> usize {
        self.timings.len() + self.metrics.len()
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        match self.timings.get_mut(stage) {
            Some(stats) => stats.record(duration_ms),
            None => {
                let mut stats = SeriesStats::default();
                stats.record(duration_ms);
                self.timings.insert(stage.to_string(), stats);
            }
        }
    }

    fn metric(&mut self, name: &str, value: f64) {
        match self.metrics.get_mut(name) {
            Some(stats) => stats.record(value),
            None => {
                let mut stats = SeriesStats::default();
                stats.record(value);
                self.metrics.insert(name.to_string(), stats);
            }
        }
    }

    fn frame_completed(&mut self, failed: bool) {
        self.frames += 1;
        if failed {
            self.failed += 1;
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
