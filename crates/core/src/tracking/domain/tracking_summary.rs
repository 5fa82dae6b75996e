use serde::Serialize;

/// Totals for one tracking run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TrackingSummary {
    pub frames_processed: usize,
    pub frames_located: usize,
    /// Identification rate over the final accuracy window.
    pub accuracy_percent: f64,
    pub retunes: usize,
}

impl TrackingSummary {
    /// Fraction of all processed frames with a located face.
    pub fn located_ratio(&self) -> f64 {
        if self.frames_processed == 0 {
            0.0
        } else {
            self.frames_located as f64 / self.frames_processed as f64
        }
    }
}

impl std::fmt::Display for TrackingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} located ({:.1}%), window accuracy {:.1}%, {} retunes",
            self.frames_processed,
            self.frames_located,
            self.located_ratio() * 100.0,
            self.accuracy_percent,
            self.retunes
        )
    }
}
