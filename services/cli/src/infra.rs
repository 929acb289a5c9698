use multirater::analytics::import::{
    assignments_from_path, definition_from_path, responses_from_path,
};
use multirater::analytics::{
    AnalyticsScope, AssessmentDefinition, AssessmentId, Assignment, CachedReport, OrganizationId,
    RawResponseRow, ResponseStore, StoreError,
};
use multirater::error::AppError;
use std::path::Path;
use tracing::debug;

/// Response store over files loaded once at startup.
pub(crate) struct InMemoryResponseStore {
    definition: AssessmentDefinition,
    responses: Vec<RawResponseRow>,
    assignments: Vec<Assignment>,
}

impl InMemoryResponseStore {
    pub(crate) fn load(
        definition: &Path,
        responses: &Path,
        assignments: Option<&Path>,
    ) -> Result<Self, AppError> {
        let definition = definition_from_path(definition)?;
        let responses = responses_from_path(responses)?;
        let assignments = match assignments {
            Some(path) => assignments_from_path(path)?,
            None => Vec::new(),
        };
        debug!(
            assessment = %definition.id(),
            responses = responses.len(),
            assignments = assignments.len(),
            "loaded response files"
        );

        Ok(Self {
            definition,
            responses,
            assignments,
        })
    }

    pub(crate) fn assessment(&self) -> &AssessmentDefinition {
        &self.definition
    }

    pub(crate) fn rows(&self) -> &[RawResponseRow] {
        &self.responses
    }

    pub(crate) fn scope(&self, organization: &str) -> AnalyticsScope {
        AnalyticsScope::new(
            OrganizationId::new(organization),
            self.definition.id().clone(),
        )
    }
}

impl ResponseStore for InMemoryResponseStore {
    fn definition(&self, assessment: &AssessmentId) -> Result<AssessmentDefinition, StoreError> {
        if assessment == self.definition.id() {
            Ok(self.definition.clone())
        } else {
            Err(StoreError::NotFound(format!("assessment {assessment}")))
        }
    }

    fn responses(&self, _scope: &AnalyticsScope) -> Result<Vec<RawResponseRow>, StoreError> {
        Ok(self.responses.clone())
    }

    fn assignments(&self, _scope: &AnalyticsScope) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.assignments.clone())
    }

    fn save_report(&self, scope: &AnalyticsScope, report: &CachedReport) -> Result<(), StoreError> {
        debug!(
            organization = %scope.organization_id,
            kind = report.kind_label(),
            "report computed; nothing to persist for file input"
        );
        Ok(())
    }
}
