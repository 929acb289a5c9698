use super::cache::{AnalyticsScope, CachedReport};
use super::definition::AssessmentDefinition;
use super::domain::{AssessmentId, Assignment};
use super::normalizer::RawResponseRow;

/// Upstream response store. Filtering by scope is the store's job; the engine
/// only ever sees what comes back.
pub trait ResponseStore: Send + Sync {
    fn definition(&self, assessment: &AssessmentId) -> Result<AssessmentDefinition, StoreError>;
    fn responses(&self, scope: &AnalyticsScope) -> Result<Vec<RawResponseRow>, StoreError>;
    fn assignments(&self, scope: &AnalyticsScope) -> Result<Vec<Assignment>, StoreError>;
    /// Persists a freshly computed, already disclosed report.
    fn save_report(&self, scope: &AnalyticsScope, report: &CachedReport) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("response store unavailable: {0}")]
    Unavailable(String),
}
