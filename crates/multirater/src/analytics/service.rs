use super::cache::{AnalyticsCache, AnalyticsScope, CachedReport, ReportKind};
use super::domain::{QuestionId, SubjectId};
use super::engine::{AnalyticsEngine, EngineError};
use super::store::{ResponseStore, StoreError};
use super::views::{ComparisonReportView, OrganizationAnalyticsView, SubjectReportView};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("subject {0} has no assignments in scope")]
    UnknownSubject(SubjectId),
    #[error("cached {found} report stored under a {expected} key")]
    CacheMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Store → engine → privacy guard → cache, with the computed view written
/// back to the store on every miss.
pub struct AnalyticsService<S: ResponseStore> {
    store: Arc<S>,
    engine: Arc<AnalyticsEngine>,
    cache: AnalyticsCache,
}

impl<S: ResponseStore> AnalyticsService<S> {
    pub fn new(store: Arc<S>, engine: Arc<AnalyticsEngine>) -> Self {
        Self {
            store,
            engine,
            cache: AnalyticsCache::default(),
        }
    }

    pub fn engine(&self) -> &AnalyticsEngine {
        &self.engine
    }

    pub fn cache(&self) -> &AnalyticsCache {
        &self.cache
    }

    pub fn organization(
        &self,
        scope: &AnalyticsScope,
    ) -> Result<Arc<OrganizationAnalyticsView>, ServiceError> {
        let report = self
            .cache
            .get_or_try_insert_with(scope, ReportKind::Organization, || {
                let definition = self.store.definition(&scope.assessment_id)?;
                let assignments = self.store.assignments(scope)?;
                let rows = self.store.responses(scope)?;

                let computed = self.engine.organization(&definition, &assignments, &rows);
                info!(
                    organization = %scope.organization_id,
                    assessment = %scope.assessment_id,
                    rows = rows.len(),
                    diagnostics = computed.diagnostics.len(),
                    "computed organization analytics"
                );
                let view = self.engine.guard().organization_view(&computed, &definition);
                self.persist(scope, CachedReport::Organization(Arc::new(view)))
            })?;

        report.organization().ok_or(ServiceError::CacheMismatch {
            expected: "organization",
            found: report.kind_label(),
        })
    }

    /// Responses are narrowed to the subject's assignments before the
    /// engine sees them.
    pub fn subject(
        &self,
        scope: &AnalyticsScope,
        subject: &SubjectId,
    ) -> Result<Arc<SubjectReportView>, ServiceError> {
        let report = self
            .cache
            .get_or_try_insert_with(scope, ReportKind::Subject(subject.clone()), || {
                let definition = self.store.definition(&scope.assessment_id)?;
                let assignment_ids: BTreeSet<String> = self
                    .store
                    .assignments(scope)?
                    .into_iter()
                    .filter(|assignment| &assignment.subject_id == subject)
                    .map(|assignment| assignment.id.as_str().to_string())
                    .collect();
                if assignment_ids.is_empty() {
                    return Err(ServiceError::UnknownSubject(subject.clone()));
                }

                let rows: Vec<_> = self
                    .store
                    .responses(scope)?
                    .into_iter()
                    .filter(|row| assignment_ids.contains(row.assignment_id.trim()))
                    .collect();

                let computed = self.engine.subject_report(&definition, &rows);
                info!(
                    organization = %scope.organization_id,
                    assessment = %scope.assessment_id,
                    %subject,
                    records = computed.records_accepted,
                    diagnostics = computed.diagnostics.len(),
                    "computed subject report"
                );
                let view = self.engine.guard().subject_view(&computed, &definition);
                self.persist(scope, CachedReport::Subject(Arc::new(view)))
            })?;

        report.subject().ok_or(ServiceError::CacheMismatch {
            expected: "subject",
            found: report.kind_label(),
        })
    }

    pub fn compare(
        &self,
        scope: &AnalyticsScope,
        question_ids: &[QuestionId],
    ) -> Result<Arc<ComparisonReportView>, ServiceError> {
        let kind = ReportKind::Comparison(question_ids.to_vec());
        let report = self.cache.get_or_try_insert_with(scope, kind, || {
            let definition = self.store.definition(&scope.assessment_id)?;
            let rows = self.store.responses(scope)?;

            let computed = self.engine.compare(&definition, question_ids, &rows);
            info!(
                organization = %scope.organization_id,
                assessment = %scope.assessment_id,
                questions = computed.results.len(),
                unknown = computed.unknown_questions.len(),
                "computed question comparison"
            );
            let view = self.engine.guard().comparison_view(&computed);
            self.persist(scope, CachedReport::Comparison(Arc::new(view)))
        })?;

        report.comparison().ok_or(ServiceError::CacheMismatch {
            expected: "comparison",
            found: report.kind_label(),
        })
    }

    /// Call whenever a rating lands in `scope`. Returns the number of cached
    /// reports dropped.
    pub fn record_responses_changed(&self, scope: &AnalyticsScope) -> usize {
        let dropped = self
            .cache
            .invalidate(&scope.organization_id, &scope.assessment_id);
        info!(
            organization = %scope.organization_id,
            assessment = %scope.assessment_id,
            dropped,
            "responses changed; analytics cache invalidated"
        );
        dropped
    }

    fn persist(&self, scope: &AnalyticsScope, report: CachedReport) -> Result<CachedReport, ServiceError> {
        self.store.save_report(scope, &report)?;
        Ok(report)
    }
}
