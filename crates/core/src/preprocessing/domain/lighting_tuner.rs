use crate::preprocessing::domain::enhancement_params::EnhancementParams;

pub const DEFAULT_MAX_STEPS: usize = 10;

const EPSILON: f64 = 1e-9;

/// Inclusive range and step size for one tunable knob.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KnobRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl KnobRange {
    fn neighbors(&self, value: f64) -> impl Iterator<Item = f64> {
        let up = value + self.step;
        let down = value - self.step;
        let (min, max) = (self.min, self.max);
        [up, down]
            .into_iter()
            .filter(move |v| *v >= min - EPSILON && *v <= max + EPSILON)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuneOutcome {
    pub params: EnhancementParams,
    pub score: u32,
    /// Number of accepted moves.
    pub steps: usize,
}

/// Hill-climbs over [`EnhancementParams`] to find settings under which the
/// detectors do better on the current lighting.
///
/// Each step evaluates every single-knob neighbor of the current point
/// (gamma, alpha and beta up/down by one step, equalization toggled) and
/// moves to the best one only if it strictly improves the score.
#[derive(Clone, Debug)]
pub struct LightingTuner {
    max_steps: usize,
    alpha: KnobRange,
    beta: KnobRange,
    gamma: KnobRange,
}

impl LightingTuner {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            alpha: KnobRange {
                min: 0.25,
                max: 4.0,
                step: 0.25,
            },
            beta: KnobRange {
                min: -20.0,
                max: 20.0,
                step: 5.0,
            },
            gamma: KnobRange {
                min: 0.25,
                max: 3.0,
                step: 0.25,
            },
        }
    }

    pub fn with_ranges(mut self, alpha: KnobRange, beta: KnobRange, gamma: KnobRange) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self.gamma = gamma;
        self
    }

    /// Single-knob neighbors of `p` that stay within range.
    pub fn neighbors(&self, p: &EnhancementParams) -> Vec<EnhancementParams> {
        let mut out = Vec::with_capacity(7);
        for gamma in self.gamma.neighbors(p.gamma) {
            out.push(EnhancementParams { gamma, ..*p });
        }
        for alpha in self.alpha.neighbors(p.alpha) {
            out.push(EnhancementParams { alpha, ..*p });
        }
        for beta in self.beta.neighbors(p.beta) {
            out.push(EnhancementParams { beta, ..*p });
        }
        out.push(EnhancementParams {
            equalize: !p.equalize,
            ..*p
        });
        out
    }

    pub fn search<F, E>(&self, start: EnhancementParams, mut score: F) -> Result<TuneOutcome, E>
    where
        F: FnMut(&EnhancementParams) -> Result<u32, E>,
    {
        let mut best = TuneOutcome {
            params: start,
            score: score(&start)?,
            steps: 0,
        };

        for _ in 0..self.max_steps {
            let mut step_best: Option<(EnhancementParams, u32)> = None;
            for candidate in self.neighbors(&best.params) {
                let s = score(&candidate)?;
                if step_best.map_or(true, |(_, bs)| s > bs) {
                    step_best = Some((candidate, s));
                }
            }

            match step_best {
                Some((params, s)) if s > best.score => {
                    best.params = params;
                    best.score = s;
                    best.steps += 1;
                }
                _ => break,
            }
        }

        log::debug!(
            "Lighting search finished after {} moves: {} (score {})",
            best.steps,
            best.params,
            best.score
        );
        Ok(best)
    }
}

impl Default for LightingTuner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::convert::Infallible;

    #[test]
    fn test_neighbors_of_default() {
        let tuner = LightingTuner::default();
        let n = tuner.neighbors(&EnhancementParams::default());
        // gamma +-, alpha +-, beta +-, equalize toggle
        assert_eq!(n.len(), 7);
        assert!(n.iter().any(|p| p.equalize));
        assert!(n.iter().any(|p| (p.gamma - 1.25).abs() < EPSILON));
        assert!(n.iter().any(|p| (p.beta + 5.0).abs() < EPSILON));
    }

    #[test]
    fn test_neighbors_respect_bounds() {
        let tuner = LightingTuner::default();
        let at_edge = EnhancementParams {
            alpha: 4.0,
            beta: -20.0,
            gamma: 0.25,
            equalize: false,
        };
        let n = tuner.neighbors(&at_edge);
        assert!(n.iter().all(|p| p.alpha <= 4.0 + EPSILON));
        assert!(n.iter().all(|p| p.beta >= -20.0 - EPSILON));
        assert!(n.iter().all(|p| p.gamma >= 0.25 - EPSILON));
        assert_eq!(n.len(), 4);
    }

    #[test]
    fn test_search_climbs_toward_peak() {
        // Score peaks at gamma = 2.0, everything else neutral.
        let tuner = LightingTuner::new(20);
        let outcome = tuner
            .search(EnhancementParams::default(), |p| {
                Ok::<_, Infallible>((100.0 - (p.gamma - 2.0).abs() * 40.0) as u32)
            })
            .unwrap();
        assert_relative_eq!(outcome.params.gamma, 2.0);
        assert_eq!(outcome.steps, 4);
        assert_eq!(outcome.score, 100);
    }

    #[test]
    fn test_search_stays_put_without_improvement() {
        let tuner = LightingTuner::default();
        let start = EnhancementParams::default();
        let outcome = tuner.search(start, |_| Ok::<_, Infallible>(3)).unwrap();
        assert_eq!(outcome.params, start);
        assert_eq!(outcome.steps, 0);
    }

    #[test]
    fn test_search_bounded_by_max_steps() {
        // Monotonically rewards higher beta; only 2 moves allowed.
        let tuner = LightingTuner::new(2);
        let outcome = tuner
            .search(EnhancementParams::default(), |p| {
                Ok::<_, Infallible>((p.beta + 100.0) as u32)
            })
            .unwrap();
        assert_eq!(outcome.steps, 2);
        assert_relative_eq!(outcome.params.beta, 10.0);
    }

    #[test]
    fn test_search_propagates_errors() {
        let tuner = LightingTuner::default();
        let result = tuner.search(EnhancementParams::default(), |_| Err::<u32, _>("boom"));
        assert_eq!(result.unwrap_err(), "boom");
    }
}
