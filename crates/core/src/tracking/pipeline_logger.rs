use std::collections::HashMap;
use std::time::Instant;

/// Observer for tracking-run events: progress, per-stage timing, metrics
/// such as the rolling accuracy, and status messages.
pub trait PipelineLogger: Send {
    /// Report frame-level progress. `total` is `None` for live sources.
    fn progress(&mut self, current: usize, total: Option<usize>);

    /// Record how long a named finder stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. accuracy percentage).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: Option<usize>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate of one timing or metric series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    pub count: usize,
    pub sum: f64,
    pub last: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.last = value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// CLI logger: throttled progress through `log::info!` and a summary table
/// of stage timings, metric averages and throughput.
///
/// Only running aggregates are kept, so memory stays flat on endless
/// camera runs.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
    start_time: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Tracking summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stat) in stages {
            let total_ms = stat.sum;
            let avg_ms = stat.mean();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.2}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        let mut names: Vec<_> = self.metrics.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, stat) in names {
            lines.push(format!(
                "  {name}: avg {:.1}  last {:.1}",
                stat.mean(),
                stat.last
            ));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: Option<usize>) {
        self.frames_seen = current;
        match total {
            Some(total) if total > 0 => {
                if current % self.throttle_frames == 0 || current == total {
                    let pct = current as f64 / total as f64 * 100.0;
                    log::info!("Tracking: {current}/{total} frames ({pct:.1}%)");
                }
            }
            _ => {
                if current % self.throttle_frames == 0 {
                    let accuracy = self
                        .metrics
                        .get("accuracy")
                        .map_or(0.0, |stat| stat.last);
                    log::info!("Tracking: {current} frames, ID rate {accuracy:.0}%");
                }
            }
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .add(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().add(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
