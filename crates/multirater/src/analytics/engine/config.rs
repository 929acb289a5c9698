use super::super::domain::{CompetencyId, QuestionId, SectionId};
use serde::{Deserialize, Serialize};

/// Tunables for one engine instance. Validated by `AnalyticsEngine::new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Distinct non-self respondents required before a bucket is disclosed.
    pub min_reviewers: usize,
    /// Alignment gap expressed in points of the reference 1–7 scale.
    pub alignment_gap: f64,
    /// Length of the strengths / improvement lists.
    pub top_n: usize,
    /// Fan out per question and competency on the rayon pool.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_reviewers: 3,
            alignment_gap: 1.0,
            top_n: 5,
            parallel: true,
        }
    }
}

/// Construction-time errors. Data sparsity is never reported through here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("rating scale maximum {max} is outside 2..=100")]
    InvalidScale { max: u8 },
    #[error("privacy floor must require at least one reviewer")]
    InvalidPrivacyFloor,
    #[error("alignment gap {value} must be a finite, non-negative number")]
    InvalidThreshold { value: f64 },
    #[error("top-N list length must be at least 1")]
    InvalidTopN,
    #[error("question {0} is defined more than once")]
    DuplicateQuestion(QuestionId),
    #[error("section {0} is defined more than once")]
    DuplicateSection(SectionId),
    #[error("competency {0} is defined more than once")]
    DuplicateCompetency(CompetencyId),
    #[error("question {question} references unknown section {section}")]
    UnknownSection {
        question: QuestionId,
        section: SectionId,
    },
    #[error("question {question} references unknown competency {competency}")]
    UnknownCompetency {
        question: QuestionId,
        competency: CompetencyId,
    },
    #[error("question {question} uses a 1-{found} scale but the assessment uses 1-{expected}")]
    MixedScales {
        question: QuestionId,
        expected: u8,
        found: u8,
    },
}
