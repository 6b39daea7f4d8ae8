//! Confidence-based detection disposition
//!
//! Plate OCR confidence is noisy; a single cut-off either floods the operator
//! or lets bad reads through. Readings are split three ways around two
//! configured thresholds instead.

/// What to do with a detection event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Proceed directly to entry handling
    Accept,
    /// Present to an operator for explicit accept/reject
    Review,
    /// Drop and keep scanning
    Discard,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Accept => "accept",
            Disposition::Review => "review",
            Disposition::Discard => "discard",
        }
    }
}

/// The two cut-offs, `min < auto_accept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    pub min: f64,
    pub auto_accept: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self { min: 0.40, auto_accept: 0.75 }
    }
}

/// Classify a confidence score.
///
/// Below `min` -> Discard, at or above `auto_accept` -> Accept, the band in
/// between -> Review.
pub fn decide(confidence: f64, thresholds: &ConfidenceThresholds) -> Disposition {
    if confidence < thresholds.min {
        Disposition::Discard
    } else if confidence >= thresholds.auto_accept {
        Disposition::Accept
    } else {
        Disposition::Review
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_boundary_cases() {
        let t = ConfidenceThresholds { min: 0.40, auto_accept: 0.75 };

        assert_eq!(decide(0.40 - EPS, &t), Disposition::Discard);
        assert_eq!(decide(0.40, &t), Disposition::Review);
        assert_eq!(decide(0.75 - EPS, &t), Disposition::Review);
        assert_eq!(decide(0.75, &t), Disposition::Accept);
    }

    #[test]
    fn test_extremes() {
        let t = ConfidenceThresholds::default();
        assert_eq!(decide(0.0, &t), Disposition::Discard);
        assert_eq!(decide(1.0, &t), Disposition::Accept);
    }

    #[test]
    fn test_disposition_as_str() {
        assert_eq!(Disposition::Accept.as_str(), "accept");
        assert_eq!(Disposition::Review.as_str(), "review");
        assert_eq!(Disposition::Discard.as_str(), "discard");
    }
}
