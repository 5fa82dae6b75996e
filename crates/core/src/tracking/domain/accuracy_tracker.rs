use serde::Serialize;

use crate::shared::constants::{
    DEFAULT_ACCURACY_WINDOW, DEFAULT_MAX_SUCCESSIVE_FAILURES, DEFAULT_MIN_ACCURACY_PERCENT,
};
use crate::shared::rolling_window::{RollingWindow, RollingWindowError};

/// Why the tracker asks for the lighting parameters to be re-tuned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetuneReason {
    /// Too many misses in a row.
    SuccessiveFailures,
    /// The identification rate over a full window is below the minimum.
    LowAccuracy,
}

impl std::fmt::Display for RetuneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuccessiveFailures => write!(f, "successive failures"),
            Self::LowAccuracy => write!(f, "low accuracy"),
        }
    }
}

/// Rolling identification rate over the most recent frames.
///
/// Every frame's result is shoved into a [`RollingWindow<bool>`], so the
/// rate always covers at most `capacity` frames. Besides the rate, the
/// tracker counts consecutive misses and checks the rate once per
/// `capacity` frames; either condition yields a [`RetuneReason`].
#[derive(Clone, Debug)]
pub struct AccuracyTracker {
    window: RollingWindow<bool>,
    max_successive_failures: usize,
    min_accuracy_percent: f64,
    successive_failures: usize,
    frames_since_check: usize,
}

impl AccuracyTracker {
    pub fn new(
        capacity: usize,
        max_successive_failures: usize,
        min_accuracy_percent: f64,
    ) -> Result<Self, RollingWindowError> {
        Ok(Self {
            window: RollingWindow::new(capacity)?,
            max_successive_failures,
            min_accuracy_percent,
            successive_failures: 0,
            frames_since_check: 0,
        })
    }

    /// Records one frame's outcome. A zero `max_successive_failures`
    /// disables the consecutive-miss trigger.
    pub fn record(&mut self, found: bool) -> Option<RetuneReason> {
        self.window.shove(found);
        self.frames_since_check += 1;

        let mut streak_hit = false;
        if found {
            self.successive_failures = 0;
        } else {
            self.successive_failures += 1;
            if self.max_successive_failures > 0
                && self.successive_failures >= self.max_successive_failures
            {
                self.successive_failures = 0;
                streak_hit = true;
            }
        }

        // The window cadence advances on every frame, whichever trigger fires.
        let mut low_accuracy = false;
        if self.frames_since_check >= self.window.capacity() {
            self.frames_since_check = 0;
            low_accuracy = self.window.is_full() && self.percent() < self.min_accuracy_percent;
        }

        if streak_hit {
            Some(RetuneReason::SuccessiveFailures)
        } else if low_accuracy {
            Some(RetuneReason::LowAccuracy)
        } else {
            None
        }
    }

    /// Fraction of recent frames with a located face; 0.0 before any frame.
    pub fn ratio(&self) -> f64 {
        self.window.true_ratio()
    }

    pub fn percent(&self) -> f64 {
        self.ratio() * 100.0
    }

    pub fn successive_failures(&self) -> usize {
        self.successive_failures
    }

    pub fn window(&self) -> &RollingWindow<bool> {
        &self.window
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.successive_failures = 0;
        self.frames_since_check = 0;
    }
}

impl Default for AccuracyTracker {
    fn default() -> Self {
        Self {
            window: RollingWindow::new(DEFAULT_ACCURACY_WINDOW)
                .unwrap_or_else(|_| unreachable!("default window capacity is non-zero")),
            max_successive_failures: DEFAULT_MAX_SUCCESSIVE_FAILURES,
            min_accuracy_percent: DEFAULT_MIN_ACCURACY_PERCENT,
            successive_failures: 0,
            frames_since_check: 0,
        }
    }
}
