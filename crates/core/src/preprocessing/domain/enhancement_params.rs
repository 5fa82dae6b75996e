use serde::{Deserialize, Serialize};

/// Tone adjustments applied to the luma plane before detection.
///
/// `alpha` scales contrast, `beta` shifts brightness, `gamma` > 1 lifts
/// shadows. `equalize` spreads the histogram before the tone curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub equalize: bool,
}

impl EnhancementParams {
    /// True when the tone curve maps every value to itself.
    pub fn is_identity_tone(&self) -> bool {
        self.alpha == 1.0 && self.beta == 0.0 && self.gamma == 1.0
    }
}

impl Default for EnhancementParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.0,
            gamma: 1.0,
            equalize: false,
        }
    }
}

impl std::fmt::Display for EnhancementParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "alpha={:.2} beta={:.1} gamma={:.2} equalize={}",
            self.alpha, self.beta, self.gamma, self.equalize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let p = EnhancementParams::default();
        assert!(p.is_identity_tone());
        assert!(!p.equalize);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let p: EnhancementParams = serde_json::from_str(r#"{"gamma": 1.5}"#).unwrap();
        assert_eq!(p.gamma, 1.5);
        assert_eq!(p.alpha, 1.0);
        assert!(!p.is_identity_tone());
    }
}
