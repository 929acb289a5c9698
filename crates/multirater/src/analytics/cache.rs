use super::domain::{AssessmentId, OrganizationId, QuestionId, SubjectId};
use super::views::{ComparisonReportView, OrganizationAnalyticsView, SubjectReportView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Query scope handed to the response store, and the cache key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyticsScope {
    pub organization_id: OrganizationId,
    pub assessment_id: AssessmentId,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl AnalyticsScope {
    pub fn new(organization_id: OrganizationId, assessment_id: AssessmentId) -> Self {
        Self {
            organization_id,
            assessment_id,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Organization,
    Subject(SubjectId),
    Comparison(Vec<QuestionId>),
}

#[derive(Debug, Clone)]
pub enum CachedReport {
    Organization(Arc<OrganizationAnalyticsView>),
    Subject(Arc<SubjectReportView>),
    Comparison(Arc<ComparisonReportView>),
}

impl CachedReport {
    pub fn kind_label(&self) -> &'static str {
        match self {
            CachedReport::Organization(_) => "organization",
            CachedReport::Subject(_) => "subject",
            CachedReport::Comparison(_) => "comparison",
        }
    }

    pub fn organization(&self) -> Option<Arc<OrganizationAnalyticsView>> {
        match self {
            CachedReport::Organization(view) => Some(Arc::clone(view)),
            _ => None,
        }
    }

    pub fn subject(&self) -> Option<Arc<SubjectReportView>> {
        match self {
            CachedReport::Subject(view) => Some(Arc::clone(view)),
            _ => None,
        }
    }

    pub fn comparison(&self) -> Option<Arc<ComparisonReportView>> {
        match self {
            CachedReport::Comparison(view) => Some(Arc::clone(view)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    report: CachedReport,
    computed_at: DateTime<Utc>,
}

type CacheKey = (AnalyticsScope, ReportKind);

/// Disclosed reports keyed by scope. Never the source of truth: any new
/// rating in a scope drops every entry for that organization and assessment.
#[derive(Debug, Default, Clone)]
pub struct AnalyticsCache {
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
}

impl AnalyticsCache {
    // A poisoned lock still holds a consistent map: every mutation is a single
    // insert or retain.
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, scope: &AnalyticsScope, kind: &ReportKind) -> Option<CachedReport> {
        let guard = self.entries();
        let hit = guard
            .get(&(scope.clone(), kind.clone()))
            .map(|entry| entry.report.clone());
        debug!(
            organization = %scope.organization_id,
            assessment = %scope.assessment_id,
            hit = hit.is_some(),
            "analytics cache lookup"
        );
        hit
    }

    pub fn insert(&self, scope: AnalyticsScope, kind: ReportKind, report: CachedReport) {
        let mut guard = self.entries();
        guard.insert(
            (scope, kind),
            CacheEntry {
                report,
                computed_at: Utc::now(),
            },
        );
    }

    /// Computes outside the lock; concurrent misses may both compute and the
    /// last insert wins, which is harmless since both results are identical.
    pub fn get_or_try_insert_with<E>(
        &self,
        scope: &AnalyticsScope,
        kind: ReportKind,
        compute: impl FnOnce() -> Result<CachedReport, E>,
    ) -> Result<CachedReport, E> {
        if let Some(report) = self.get(scope, &kind) {
            return Ok(report);
        }
        let report = compute()?;
        self.insert(scope.clone(), kind, report.clone());
        Ok(report)
    }

    pub fn computed_at(&self, scope: &AnalyticsScope, kind: &ReportKind) -> Option<DateTime<Utc>> {
        let guard = self.entries();
        guard
            .get(&(scope.clone(), kind.clone()))
            .map(|entry| entry.computed_at)
    }

    /// Drops every entry for the pair, whatever its filters or report kind.
    pub fn invalidate(&self, organization: &OrganizationId, assessment: &AssessmentId) -> usize {
        let mut guard = self.entries();
        let before = guard.len();
        guard.retain(|(scope, _), _| {
            &scope.organization_id != organization || &scope.assessment_id != assessment
        });
        let removed = before - guard.len();
        debug!(%organization, %assessment, removed, "analytics cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison() -> CachedReport {
        CachedReport::Comparison(Arc::new(ComparisonReportView {
            results: Vec::new(),
            unknown_questions: vec![QuestionId::from("q9")],
            diagnostics: Vec::new(),
        }))
    }

    fn scope(org: &str, assessment: &str) -> AnalyticsScope {
        AnalyticsScope::new(OrganizationId::from(org), AssessmentId::from(assessment))
    }

    #[test]
    fn invalidation_drops_every_filter_set_for_the_pair() {
        let cache = AnalyticsCache::default();
        let base = scope("acme", "2025");
        let filtered = scope("acme", "2025").with_filter("department", "sales");
        let other = scope("acme", "2024");

        cache.insert(base.clone(), ReportKind::Organization, comparison());
        cache.insert(filtered.clone(), ReportKind::Organization, comparison());
        cache.insert(other.clone(), ReportKind::Organization, comparison());
        assert_eq!(cache.len(), 3);

        let removed = cache.invalidate(&base.organization_id, &base.assessment_id);
        assert_eq!(removed, 2);
        assert!(cache.get(&filtered, &ReportKind::Organization).is_none());
        assert!(cache.get(&other, &ReportKind::Organization).is_some());
    }

    #[test]
    fn compute_runs_once_per_key() {
        let cache = AnalyticsCache::default();
        let scope = scope("acme", "2025");
        let mut calls = 0;

        for _ in 0..3 {
            let report: Result<CachedReport, ()> =
                cache.get_or_try_insert_with(&scope, ReportKind::Organization, || {
                    calls += 1;
                    Ok(comparison())
                });
            assert!(report.is_ok());
        }
        assert_eq!(calls, 1);
        assert!(cache.computed_at(&scope, &ReportKind::Organization).is_some());

        let failed: Result<CachedReport, &str> =
            cache.get_or_try_insert_with(&scope, ReportKind::Subject(SubjectId::from("s1")), || {
                Err("store down")
            });
        assert_eq!(failed.err(), Some("store down"));
        assert_eq!(cache.len(), 1);
    }
}
