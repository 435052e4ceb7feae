//! Workflow service: the request-level operations behind the API, wiring the
//! normalizer, analyzer, fix-plan builder and report generator to a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info};

use crate::analyzer::{build_analyzer, AnalysisOutcome, Analyzer};
use crate::config::FlawFinderConfig;
use crate::dashboard::{self, DashboardCharts, DashboardStats};
use crate::error::{FlawFinderError, Result};
use crate::fix_plan::{self, FixPlan, PrioritizedPlan, SuggestionsByFlaw};
use crate::model::{FixSuggestion, Flaw, NewWorkflow, Workflow, WorkflowStatus};
use crate::report::{self, Report};
use crate::scoring::{self, Severity};
use crate::store::{StoredReport, WorkflowStore};
use crate::workflow::normalizer::normalize;
use crate::workflow::{DeclaredKind, WorkflowFormat, ACCEPTED_CONTENT_TYPES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub workflow_id: u64,
    pub message: String,
    pub parsed_data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: u64,
    pub name: String,
    pub file_type: WorkflowFormat,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Workflow> for WorkflowSummary {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id,
            name: workflow.name.clone(),
            file_type: workflow.file_type,
            status: workflow.status,
            created_at: workflow.created_at,
            updated_at: workflow.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub workflow_id: u64,
    pub flaws: Vec<Flaw>,
    pub fix_suggestions: Vec<FixSuggestion>,
    pub brutality_score: f64,
    pub total_flaws: usize,
    /// Seconds spent analyzing and persisting; 0 for stored results.
    pub processing_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatus {
    pub workflow_id: u64,
    pub status: WorkflowStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFixPlan {
    pub workflow_id: u64,
    pub workflow_name: String,
    #[serde(flatten)]
    pub plan: FixPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPrioritizedPlan {
    pub workflow_id: u64,
    pub workflow_name: String,
    #[serde(flatten)]
    pub plan: PrioritizedPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlawSuggestions {
    pub flaw_id: u64,
    pub flaw_title: String,
    pub flaw_severity: Severity,
    pub suggestions: Vec<FixSuggestion>,
}

/// Operations a signed-in user can run against their workflows.
///
/// Authentication is out of scope: `user_id` is trusted, and each method only
/// checks that the workflow it touches belongs to that user.
pub struct WorkflowService<S: WorkflowStore> {
    store: S,
    analyzer: Box<dyn Analyzer>,
}

impl<S: WorkflowStore> WorkflowService<S> {
    pub fn new(store: S, analyzer: Box<dyn Analyzer>) -> Self {
        Self { store, analyzer }
    }

    pub fn from_config(store: S, config: &FlawFinderConfig) -> Self {
        Self::new(store, build_analyzer(&config.analyzer))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    /// Normalize an uploaded file and store it as a new workflow.
    pub fn upload(
        &mut self,
        user_id: u64,
        name: &str,
        filename: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<UploadResponse> {
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
            return Err(FlawFinderError::UnsupportedContentType(content_type.to_string()));
        }

        let declared = DeclaredKind::from_upload(filename, content_type);
        let normalized = normalize(content, declared)?;
        let parsed_data = normalized.to_value();

        let workflow = self.store.create_workflow(NewWorkflow {
            user_id,
            name: name.to_string(),
            file_type: normalized.format,
            raw_data: normalized,
        })?;

        info!(
            workflow_id = workflow.id,
            format = %workflow.file_type,
            steps = workflow.raw_data.step_count(),
            "workflow uploaded"
        );

        Ok(UploadResponse {
            workflow_id: workflow.id,
            message: "File uploaded and processed successfully".to_string(),
            parsed_data,
        })
    }

    pub fn list_workflows(&self, user_id: u64) -> Vec<WorkflowSummary> {
        self.store
            .list_workflows_by_user(user_id)
            .iter()
            .map(WorkflowSummary::from)
            .collect()
    }

    pub fn get_workflow(&self, user_id: u64, workflow_id: u64) -> Result<Workflow> {
        self.owned_workflow(user_id, workflow_id, "view this workflow")
    }

    pub fn delete_workflow(&mut self, user_id: u64, workflow_id: u64) -> Result<()> {
        self.owned_workflow(user_id, workflow_id, "delete this workflow")?;
        self.store.delete_workflow(workflow_id)?;
        info!(workflow_id, "workflow deleted");
        Ok(())
    }

    /// Run the analyzer over a stored workflow and persist its findings.
    pub fn analyze(&mut self, user_id: u64, workflow_id: u64) -> Result<AnalysisResponse> {
        let workflow = self.owned_workflow(user_id, workflow_id, "analyze this workflow")?;
        self.store
            .update_workflow(workflow_id, WorkflowStatus::Processing, None)?;

        let started = Instant::now();
        let outcome = self.analyzer.analyze(&workflow.raw_data);

        let (flaws, fix_suggestions) = match self.persist_outcome(workflow_id, &outcome) {
            Ok(saved) => saved,
            Err(error) => {
                self.store
                    .update_workflow(workflow_id, WorkflowStatus::Failed, None)?;
                return Err(error);
            }
        };
        let processing_time = started.elapsed().as_secs_f64();

        let processed_data = json!({
            "analysis_results": {
                "flaws": outcome.flaws,
                "fix_suggestions": outcome.fix_suggestions,
                "brutality_score": outcome.brutality_score,
                "total_flaws": outcome.total_flaws(),
                "processing_time": processing_time,
            },
            "flaws_count": flaws.len(),
            "brutality_score": outcome.brutality_score,
        });
        self.store
            .update_workflow(workflow_id, WorkflowStatus::Analyzed, Some(processed_data))?;

        info!(
            workflow_id,
            analyzer = self.analyzer.name(),
            flaws = flaws.len(),
            brutality_score = outcome.brutality_score,
            "workflow analyzed"
        );

        Ok(AnalysisResponse {
            workflow_id,
            total_flaws: flaws.len(),
            flaws,
            fix_suggestions,
            brutality_score: outcome.brutality_score,
            processing_time,
        })
    }

    fn persist_outcome(
        &mut self,
        workflow_id: u64,
        outcome: &AnalysisOutcome,
    ) -> Result<(Vec<Flaw>, Vec<FixSuggestion>)> {
        let pairs = self.analyzer.pair(outcome);
        // Nothing is stored unless every draft is valid.
        for pair in &pairs {
            pair.flaw.validate()?;
            for draft in &pair.suggestions {
                draft.validate()?;
            }
        }

        let mut flaws = Vec::new();
        let mut suggestions = Vec::new();
        for pair in pairs {
            let flaw = self.store.create_flaw(workflow_id, pair.flaw)?;
            for draft in pair.suggestions {
                suggestions.push(self.store.create_fix_suggestion(flaw.id, draft)?);
            }
            flaws.push(flaw);
        }
        Ok((flaws, suggestions))
    }

    /// Stored analysis results, with the score recomputed from the flaws.
    pub fn analysis_results(&self, user_id: u64, workflow_id: u64) -> Result<AnalysisResponse> {
        self.owned_workflow(user_id, workflow_id, "view this analysis")?;

        let flaws = self.store.list_flaws_by_workflow(workflow_id);
        if flaws.is_empty() {
            return Err(FlawFinderError::not_found("Analysis results"));
        }
        let fix_suggestions = flaws
            .iter()
            .flat_map(|f| self.store.list_fix_suggestions_by_flaw(f.id))
            .collect();

        Ok(AnalysisResponse {
            workflow_id,
            total_flaws: flaws.len(),
            brutality_score: scoring::brutality_score(flaws.iter().map(|f| f.severity)),
            flaws,
            fix_suggestions,
            processing_time: 0.0,
        })
    }

    pub fn analysis_status(&self, user_id: u64, workflow_id: u64) -> Result<AnalysisStatus> {
        let workflow = self.owned_workflow(user_id, workflow_id, "view this workflow")?;
        Ok(AnalysisStatus {
            workflow_id,
            status: workflow.status,
            updated_at: workflow.updated_at,
        })
    }

    pub fn fix_plan(&self, user_id: u64, workflow_id: u64) -> Result<WorkflowFixPlan> {
        let workflow = self.owned_workflow(user_id, workflow_id, "view this fix plan")?;
        let (flaws, by_flaw) = self.flaws_with_suggestions(workflow_id);
        Ok(WorkflowFixPlan {
            workflow_id,
            workflow_name: workflow.name,
            plan: fix_plan::build_plan(&flaws, &by_flaw),
        })
    }

    pub fn prioritized_fix_plan(&self, user_id: u64, workflow_id: u64) -> Result<WorkflowPrioritizedPlan> {
        let workflow = self.owned_workflow(user_id, workflow_id, "view this fix plan")?;
        let (flaws, by_flaw) = self.flaws_with_suggestions(workflow_id);
        Ok(WorkflowPrioritizedPlan {
            workflow_id,
            workflow_name: workflow.name,
            plan: fix_plan::build_prioritized(&flaws, &by_flaw),
        })
    }

    pub fn flaw_suggestions(&self, user_id: u64, flaw_id: u64) -> Result<FlawSuggestions> {
        let flaw = self.store.get_flaw(flaw_id)?;
        self.owned_workflow(user_id, flaw.workflow_id, "view this flaw")?;
        Ok(FlawSuggestions {
            flaw_id,
            flaw_title: flaw.title,
            flaw_severity: flaw.severity,
            suggestions: self.store.list_fix_suggestions_by_flaw(flaw_id),
        })
    }

    /// Generate and store the executive report; a workflow gets at most one.
    pub fn generate_report(&mut self, user_id: u64, workflow_id: u64) -> Result<Report> {
        self.owned_workflow(
            user_id,
            workflow_id,
            "generate a report for this workflow",
        )?;
        if self.store.has_report(workflow_id) {
            return Err(FlawFinderError::AlreadyExists { workflow_id });
        }

        let (flaws, by_flaw) = self.flaws_with_suggestions(workflow_id);
        let suggestions: Vec<FixSuggestion> = by_flaw.into_values().flatten().collect();
        let report = report::generate_report(workflow_id, &flaws, &suggestions);
        self.store.create_report(report.clone())?;

        info!(workflow_id, brutality_score = report.brutality_score, "report generated");
        Ok(report)
    }

    pub fn get_report(&self, user_id: u64, workflow_id: u64) -> Result<StoredReport> {
        self.owned_workflow(user_id, workflow_id, "view this report")?;
        self.store.get_report_by_workflow(workflow_id)
    }

    pub fn dashboard(&self, user_id: u64) -> DashboardStats {
        let (workflows, flaws) = self.user_flaws(user_id);
        dashboard::dashboard_stats(&workflows, &flaws)
    }

    pub fn dashboard_charts(&self, user_id: u64) -> DashboardCharts {
        let (workflows, flaws) = self.user_flaws(user_id);
        dashboard::dashboard_charts(&workflows, &flaws)
    }

    fn owned_workflow(&self, user_id: u64, workflow_id: u64, action: &str) -> Result<Workflow> {
        let workflow = self.store.get_workflow(workflow_id)?;
        if workflow.user_id != user_id {
            debug!(workflow_id, user_id, owner = workflow.user_id, "ownership check failed");
            return Err(FlawFinderError::forbidden(action));
        }
        Ok(workflow)
    }

    fn flaws_with_suggestions(&self, workflow_id: u64) -> (Vec<Flaw>, SuggestionsByFlaw) {
        let flaws = self.store.list_flaws_by_workflow(workflow_id);
        let by_flaw = flaws
            .iter()
            .map(|f| (f.id, self.store.list_fix_suggestions_by_flaw(f.id)))
            .collect();
        (flaws, by_flaw)
    }

    fn user_flaws(&self, user_id: u64) -> (Vec<Workflow>, Vec<Flaw>) {
        let workflows = self.store.list_workflows_by_user(user_id);
        let flaws = workflows
            .iter()
            .flat_map(|w| self.store.list_flaws_by_workflow(w.id))
            .collect();
        (workflows, flaws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MockAnalyzer;
    use crate::store::MemoryStore;

    const CSV: &[u8] = b"name,owner\nIntake,Sam\nApprove,Dana\n";

    fn service() -> WorkflowService<MemoryStore> {
        WorkflowService::new(MemoryStore::new(), Box::new(MockAnalyzer))
    }

    fn uploaded(service: &mut WorkflowService<MemoryStore>) -> u64 {
        service
            .upload(1, "Invoices", "invoices.csv", "text/csv", CSV)
            .unwrap()
            .workflow_id
    }

    #[test]
    fn test_upload_rejects_unsupported_content_type() {
        let mut service = service();
        let result = service.upload(1, "x", "x.pdf", "application/pdf", b"%PDF");
        assert!(matches!(result, Err(FlawFinderError::UnsupportedContentType(_))));
    }

    #[test]
    fn test_upload_parse_error() {
        let mut service = service();
        let result = service.upload(1, "x", "x.json", "application/json", b"{oops");
        assert!(matches!(result, Err(FlawFinderError::Parse(_))));
        assert!(service.list_workflows(1).is_empty());
    }

    #[test]
    fn test_upload_returns_parsed_data() {
        let mut service = service();
        let response = service
            .upload(1, "Invoices", "invoices.csv", "text/csv", CSV)
            .unwrap();
        assert_eq!(response.workflow_id, 1);
        assert_eq!(response.parsed_data["total_rows"], 2);
        assert_eq!(response.parsed_data["steps"][1]["owner"], "Dana");

        let listed = service.list_workflows(1);
        assert_eq!(listed[0].status, WorkflowStatus::Uploaded);
        assert_eq!(listed[0].file_type, WorkflowFormat::Csv);
    }

    #[test]
    fn test_plain_text_upload_is_sniffed() {
        let mut service = service();
        let id = service
            .upload(1, "Notes", "notes.txt", "text/plain", br#"[{"name":"a"}]"#)
            .unwrap()
            .workflow_id;
        assert_eq!(service.get_workflow(1, id).unwrap().file_type, WorkflowFormat::Json);
    }

    #[test]
    fn test_analyze_persists_paired_findings() {
        let mut service = service();
        let id = uploaded(&mut service);

        let response = service.analyze(1, id).unwrap();
        assert_eq!(response.total_flaws, 4);
        assert_eq!(response.fix_suggestions.len(), 4);
        assert_eq!(response.brutality_score, 6.0);
        for (flaw, suggestion) in response.flaws.iter().zip(&response.fix_suggestions) {
            assert_eq!(suggestion.flaw_id, flaw.id);
            assert_eq!(flaw.workflow_id, id);
        }

        let workflow = service.get_workflow(1, id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Analyzed);
        let processed = workflow.processed_data.unwrap();
        assert_eq!(processed["flaws_count"], 4);
        assert_eq!(processed["brutality_score"], 6.0);
    }

    #[test]
    fn test_scores_agree_across_call_sites() {
        let mut service = service();
        let id = uploaded(&mut service);
        let analyzed = service.analyze(1, id).unwrap();
        let stored = service.analysis_results(1, id).unwrap();
        let dashboard = service.dashboard(1);
        let report = service.generate_report(1, id).unwrap();

        let bits = analyzed.brutality_score.to_bits();
        assert_eq!(stored.brutality_score.to_bits(), bits);
        assert_eq!(dashboard.avg_brutality_score.to_bits(), bits);
        assert_eq!(report.brutality_score.to_bits(), bits);
        assert_eq!(stored.processing_time, 0.0);
    }

    #[test]
    fn test_results_before_analysis_not_found() {
        let mut service = service();
        let id = uploaded(&mut service);
        assert!(matches!(
            service.analysis_results(1, id),
            Err(FlawFinderError::NotFound { .. })
        ));
    }

    #[test]
    fn test_other_users_are_forbidden() {
        let mut service = service();
        let id = uploaded(&mut service);
        service.analyze(1, id).unwrap();

        assert!(matches!(service.analyze(2, id), Err(FlawFinderError::Forbidden { .. })));
        assert!(matches!(service.fix_plan(2, id), Err(FlawFinderError::Forbidden { .. })));
        assert!(matches!(
            service.flaw_suggestions(2, 1),
            Err(FlawFinderError::Forbidden { .. })
        ));
        assert!(matches!(
            service.generate_report(2, id),
            Err(FlawFinderError::Forbidden { .. })
        ));
        assert!(service.dashboard(2).recent_workflows.is_empty());
    }

    #[test]
    fn test_report_generated_once() {
        let mut service = service();
        let id = uploaded(&mut service);
        service.analyze(1, id).unwrap();

        assert!(matches!(service.get_report(1, id), Err(FlawFinderError::NotFound { .. })));
        let report = service.generate_report(1, id).unwrap();
        assert_eq!(report.total_flaws, 4);
        assert_eq!(report.recommendations.immediate_actions.len(), 3);
        assert_eq!(report.recommendations.short_term_improvements.len(), 1);

        let stored = service.get_report(1, id).unwrap();
        assert_eq!(stored.report, report);
        assert!(matches!(
            service.generate_report(1, id),
            Err(FlawFinderError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_fix_plans() {
        let mut service = service();
        let id = uploaded(&mut service);

        let empty = service.fix_plan(1, id).unwrap();
        assert_eq!(empty.plan.summary.estimated_total_time, "0 hours");

        service.analyze(1, id).unwrap();
        let plan = service.fix_plan(1, id).unwrap();
        assert_eq!(plan.workflow_name, "Invoices");
        assert_eq!(plan.plan.summary.total_suggestions, 4);
        assert_eq!(plan.plan.summary.high_priority, 3);
        assert_eq!(plan.plan.summary.estimated_total_time, "5 days");

        let prioritized = service.prioritized_fix_plan(1, id).unwrap();
        let titles: Vec<&str> = prioritized
            .plan
            .high_priority
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Implement End-to-End Encryption",
                "Implement Automated Approval System",
                "Centralize Data Entry",
            ]
        );

        let suggestions = service.flaw_suggestions(1, 3).unwrap();
        assert_eq!(suggestions.flaw_severity, Severity::Critical);
        assert_eq!(suggestions.suggestions.len(), 1);
    }

    #[test]
    fn test_delete_workflow() {
        let mut service = service();
        let id = uploaded(&mut service);
        service.analyze(1, id).unwrap();
        assert!(matches!(
            service.delete_workflow(2, id),
            Err(FlawFinderError::Forbidden { .. })
        ));
        service.delete_workflow(1, id).unwrap();
        assert!(matches!(service.get_workflow(1, id), Err(FlawFinderError::NotFound { .. })));
        assert_eq!(service.dashboard(1).total_flaws, 0);
    }

    #[test]
    fn test_analysis_status() {
        let mut service = service();
        let id = uploaded(&mut service);
        assert_eq!(service.analysis_status(1, id).unwrap().status, WorkflowStatus::Uploaded);
        service.analyze(1, id).unwrap();
        assert_eq!(service.analysis_status(1, id).unwrap().status, WorkflowStatus::Analyzed);
    }

    struct FixedAnalyzer(AnalysisOutcome);

    impl Analyzer for FixedAnalyzer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn analyze(&self, _workflow: &crate::workflow::NormalizedWorkflow) -> AnalysisOutcome {
            self.0.clone()
        }
    }

    /// Hands every suggestion to the first flaw.
    struct FirstFlawAnalyzer(AnalysisOutcome);

    impl Analyzer for FirstFlawAnalyzer {
        fn name(&self) -> &str {
            "first-flaw"
        }

        fn analyze(&self, _workflow: &crate::workflow::NormalizedWorkflow) -> AnalysisOutcome {
            self.0.clone()
        }

        fn pair<'a>(&self, outcome: &'a AnalysisOutcome) -> Vec<crate::analyzer::PairedFlaw<'a>> {
            outcome
                .flaws
                .iter()
                .enumerate()
                .map(|(i, flaw)| crate::analyzer::PairedFlaw {
                    flaw,
                    suggestions: if i == 0 {
                        outcome.fix_suggestions.iter().collect()
                    } else {
                        Vec::new()
                    },
                })
                .collect()
        }
    }

    #[test]
    fn test_invalid_draft_stores_nothing() {
        let mut outcome = MockAnalyzer::outcome();
        outcome.flaws[1].severity = Severity::Unknown;
        let mut service = WorkflowService::new(MemoryStore::new(), Box::new(FixedAnalyzer(outcome)));
        let id = uploaded(&mut service);

        let result = service.analyze(1, id);
        assert!(matches!(
            result,
            Err(FlawFinderError::Validation { ref field, .. }) if field == "severity"
        ));
        assert_eq!(service.get_workflow(1, id).unwrap().status, WorkflowStatus::Failed);
        assert!(service.store().list_flaws_by_workflow(id).is_empty());
    }

    #[test]
    fn test_invalid_suggestion_stores_nothing() {
        let mut outcome = MockAnalyzer::outcome();
        outcome.fix_suggestions[3].priority = 7;
        let mut service = WorkflowService::new(MemoryStore::new(), Box::new(FixedAnalyzer(outcome)));
        let id = uploaded(&mut service);

        assert!(service.analyze(1, id).is_err());
        assert!(service.store().list_flaws_by_workflow(id).is_empty());
    }

    #[test]
    fn test_analyzer_decides_pairing() {
        let mut service = WorkflowService::new(
            MemoryStore::new(),
            Box::new(FirstFlawAnalyzer(MockAnalyzer::outcome())),
        );
        let id = uploaded(&mut service);
        let response = service.analyze(1, id).unwrap();

        let first = response.flaws[0].id;
        assert_eq!(response.fix_suggestions.len(), 4);
        assert!(response.fix_suggestions.iter().all(|s| s.flaw_id == first));
        assert_eq!(service.flaw_suggestions(1, first).unwrap().suggestions.len(), 4);
    }
}

