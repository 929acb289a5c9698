//! Self-vs-reviewer alignment and score banding.
//!
//! All cut-offs are declared once, in points of the reference 1–7 scale, and
//! rescaled to each assessment's range. A 1.0 gap on 1–7 becomes 0.67 on 1–5
//! and 1.5 on 1–10; the band cut-offs move the same way.

use super::definition::RatingScale;
use super::engine::EngineError;
use serde::{Deserialize, Serialize};

const REFERENCE_RANGE: f64 = 6.0;

/// Means of whole ratings that should sit exactly on a rescaled cut-off can
/// miss it by a few ulps, e.g. `4 - 10/3` against `4/6` on a 1–5 scale.
const BOUNDARY_TOLERANCE: f64 = 1e-9;

fn reaches(value: f64, cutoff: f64) -> bool {
    value >= cutoff - BOUNDARY_TOLERANCE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentLabel {
    Aligned,
    BlindSpot,
    HiddenStrength,
    InsufficientData,
}

impl AlignmentLabel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Aligned => "Aligned",
            Self::BlindSpot => "Blind Spot",
            Self::HiddenStrength => "Hidden Strength",
            Self::InsufficientData => "Insufficient Data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl ScoreBand {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsAttention => "Needs Attention",
        }
    }
}

/// Gap and label for one self/reviewer pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub gap: Option<f64>,
    pub label: AlignmentLabel,
}

/// Shared thresholds for alignment classification and score bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    alignment_gap: f64,
    excellent_from: f64,
    good_from: f64,
    fair_from: f64,
}

impl ThresholdPolicy {
    pub fn new(alignment_gap: f64) -> Result<Self, EngineError> {
        if !alignment_gap.is_finite() || alignment_gap < 0.0 {
            return Err(EngineError::InvalidThreshold {
                value: alignment_gap,
            });
        }

        Ok(Self {
            alignment_gap,
            excellent_from: 6.0,
            good_from: 5.0,
            fair_from: 4.0,
        })
    }

    /// Gap threshold in rating points for the given scale.
    pub fn gap_threshold(&self, scale: RatingScale) -> f64 {
        self.alignment_gap * scale.range() / REFERENCE_RANGE
    }

    pub fn classify(
        &self,
        self_rating: Option<f64>,
        avg_reviewer_rating: Option<f64>,
        reviewer_count: usize,
        scale: RatingScale,
    ) -> Alignment {
        let gap = match (self_rating, avg_reviewer_rating) {
            (Some(own), Some(others)) if reviewer_count > 0 => Some(own - others),
            _ => None,
        };
        let label = classify_gap(gap, self.gap_threshold(scale));
        Alignment { gap, label }
    }

    pub fn band(&self, score: f64, scale: RatingScale) -> ScoreBand {
        if reaches(score, self.rescale(self.excellent_from, scale)) {
            ScoreBand::Excellent
        } else if reaches(score, self.rescale(self.good_from, scale)) {
            ScoreBand::Good
        } else if reaches(score, self.rescale(self.fair_from, scale)) {
            ScoreBand::Fair
        } else {
            ScoreBand::NeedsAttention
        }
    }

    fn rescale(&self, reference_point: f64, scale: RatingScale) -> f64 {
        f64::from(scale.min()) + (reference_point - 1.0) * scale.range() / REFERENCE_RANGE
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            alignment_gap: 1.0,
            excellent_from: 6.0,
            good_from: 5.0,
            fair_from: 4.0,
        }
    }
}

/// Boundary values land on the flagged side: `gap == +threshold` is a blind
/// spot and `gap == -threshold` a hidden strength.
pub fn classify_gap(gap: Option<f64>, threshold: f64) -> AlignmentLabel {
    match gap {
        None => AlignmentLabel::InsufficientData,
        Some(gap) if reaches(gap, threshold) => AlignmentLabel::BlindSpot,
        Some(gap) if reaches(-gap, threshold) => AlignmentLabel::HiddenStrength,
        Some(_) => AlignmentLabel::Aligned,
    }
}
