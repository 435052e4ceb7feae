//! Persistence collaborator: CRUD accessors for workflows, flaws, fix
//! suggestions and reports, keyed by store-assigned integer ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::{FlawFinderError, Result};
use crate::model::{
    FixSuggestion, FixSuggestionDraft, Flaw, FlawDraft, NewWorkflow, Workflow, WorkflowStatus,
};
use crate::report::Report;

const MAX_NAME_LEN: usize = 255;

/// A report as stored, with its id and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: u64,
    #[serde(flatten)]
    pub report: Report,
    pub created_at: DateTime<Utc>,
}

/// Storage operations the workflow service depends on.
pub trait WorkflowStore {
    fn create_workflow(&mut self, new: NewWorkflow) -> Result<Workflow>;

    fn get_workflow(&self, workflow_id: u64) -> Result<Workflow>;

    /// Set the status and, when given, the processed analysis data.
    fn update_workflow(
        &mut self,
        workflow_id: u64,
        status: WorkflowStatus,
        processed_data: Option<Value>,
    ) -> Result<Workflow>;

    fn list_workflows_by_user(&self, user_id: u64) -> Vec<Workflow>;

    /// Remove a workflow along with its flaws, suggestions and report.
    fn delete_workflow(&mut self, workflow_id: u64) -> Result<()>;

    fn create_flaw(&mut self, workflow_id: u64, draft: &FlawDraft) -> Result<Flaw>;

    fn get_flaw(&self, flaw_id: u64) -> Result<Flaw>;

    fn list_flaws_by_workflow(&self, workflow_id: u64) -> Vec<Flaw>;

    fn create_fix_suggestion(&mut self, flaw_id: u64, draft: &FixSuggestionDraft) -> Result<FixSuggestion>;

    fn list_fix_suggestions_by_flaw(&self, flaw_id: u64) -> Vec<FixSuggestion>;

    /// Fails with `AlreadyExists` when the workflow already has a report.
    fn create_report(&mut self, report: Report) -> Result<StoredReport>;

    fn get_report_by_workflow(&self, workflow_id: u64) -> Result<StoredReport>;

    fn has_report(&self, workflow_id: u64) -> bool {
        self.get_report_by_workflow(workflow_id).is_ok()
    }
}

/// In-memory store that can be persisted as a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    workflows: Vec<Workflow>,
    #[serde(default)]
    flaws: Vec<Flaw>,
    #[serde(default)]
    fix_suggestions: Vec<FixSuggestion>,
    #[serde(default)]
    reports: Vec<StoredReport>,
    #[serde(default)]
    next_ids: NextIds,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct NextIds {
    workflow: u64,
    flaw: u64,
    fix_suggestion: u64,
    report: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON file, or start empty if the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no store file yet, starting empty");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn workflow_mut(&mut self, workflow_id: u64) -> Result<&mut Workflow> {
        self.workflows
            .iter_mut()
            .find(|w| w.id == workflow_id)
            .ok_or_else(|| FlawFinderError::not_found("Workflow"))
    }
}

impl WorkflowStore for MemoryStore {
    fn create_workflow(&mut self, new: NewWorkflow) -> Result<Workflow> {
        let name_len = new.name.chars().count();
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(FlawFinderError::validation(
                "name",
                format!("must be 1 to {} characters", MAX_NAME_LEN),
            ));
        }

        let now = Utc::now();
        let workflow = Workflow {
            id: next(&mut self.next_ids.workflow),
            user_id: new.user_id,
            name: new.name,
            raw_data: new.raw_data,
            processed_data: None,
            file_type: new.file_type,
            status: WorkflowStatus::Uploaded,
            created_at: now,
            updated_at: now,
        };
        self.workflows.push(workflow.clone());
        Ok(workflow)
    }

    fn get_workflow(&self, workflow_id: u64) -> Result<Workflow> {
        self.workflows
            .iter()
            .find(|w| w.id == workflow_id)
            .cloned()
            .ok_or_else(|| FlawFinderError::not_found("Workflow"))
    }

    fn update_workflow(
        &mut self,
        workflow_id: u64,
        status: WorkflowStatus,
        processed_data: Option<Value>,
    ) -> Result<Workflow> {
        let workflow = self.workflow_mut(workflow_id)?;
        workflow.status = status;
        if processed_data.is_some() {
            workflow.processed_data = processed_data;
        }
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    fn list_workflows_by_user(&self, user_id: u64) -> Vec<Workflow> {
        self.workflows
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect()
    }

    fn delete_workflow(&mut self, workflow_id: u64) -> Result<()> {
        self.get_workflow(workflow_id)?;

        let flaw_ids: Vec<u64> = self
            .flaws
            .iter()
            .filter(|f| f.workflow_id == workflow_id)
            .map(|f| f.id)
            .collect();
        self.fix_suggestions.retain(|s| !flaw_ids.contains(&s.flaw_id));
        self.flaws.retain(|f| f.workflow_id != workflow_id);
        self.reports.retain(|r| r.report.workflow_id != workflow_id);
        self.workflows.retain(|w| w.id != workflow_id);
        Ok(())
    }

    fn create_flaw(&mut self, workflow_id: u64, draft: &FlawDraft) -> Result<Flaw> {
        self.get_workflow(workflow_id)?;
        draft.validate()?;

        let flaw = Flaw {
            id: next(&mut self.next_ids.flaw),
            workflow_id,
            flaw_type: draft.flaw_type,
            severity: draft.severity,
            title: draft.title.clone(),
            description: draft.description.clone(),
            location: draft.location.clone(),
            impact_score: draft.impact_score,
            created_at: Utc::now(),
        };
        self.flaws.push(flaw.clone());
        Ok(flaw)
    }

    fn get_flaw(&self, flaw_id: u64) -> Result<Flaw> {
        self.flaws
            .iter()
            .find(|f| f.id == flaw_id)
            .cloned()
            .ok_or_else(|| FlawFinderError::not_found("Flaw"))
    }

    fn list_flaws_by_workflow(&self, workflow_id: u64) -> Vec<Flaw> {
        self.flaws
            .iter()
            .filter(|f| f.workflow_id == workflow_id)
            .cloned()
            .collect()
    }

    fn create_fix_suggestion(&mut self, flaw_id: u64, draft: &FixSuggestionDraft) -> Result<FixSuggestion> {
        self.get_flaw(flaw_id)?;
        draft.validate()?;

        let suggestion = FixSuggestion {
            id: next(&mut self.next_ids.fix_suggestion),
            flaw_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            implementation_effort: draft.implementation_effort,
            expected_impact: draft.expected_impact,
            priority: draft.priority,
            estimated_time: draft.estimated_time.clone(),
            created_at: Utc::now(),
        };
        self.fix_suggestions.push(suggestion.clone());
        Ok(suggestion)
    }

    fn list_fix_suggestions_by_flaw(&self, flaw_id: u64) -> Vec<FixSuggestion> {
        self.fix_suggestions
            .iter()
            .filter(|s| s.flaw_id == flaw_id)
            .cloned()
            .collect()
    }

    fn create_report(&mut self, report: Report) -> Result<StoredReport> {
        self.get_workflow(report.workflow_id)?;
        if self.has_report(report.workflow_id) {
            return Err(FlawFinderError::AlreadyExists {
                workflow_id: report.workflow_id,
            });
        }

        let stored = StoredReport {
            id: next(&mut self.next_ids.report),
            report,
            created_at: Utc::now(),
        };
        self.reports.push(stored.clone());
        Ok(stored)
    }

    fn get_report_by_workflow(&self, workflow_id: u64) -> Result<StoredReport> {
        self.reports
            .iter()
            .find(|r| r.report.workflow_id == workflow_id)
            .cloned()
            .ok_or_else(|| FlawFinderError::not_found("Report"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MockAnalyzer;
    use crate::report::generate_report;
    use crate::scoring::Severity;
    use crate::workflow::normalizer::normalize_csv;
    use crate::workflow::WorkflowFormat;

    fn new_workflow(user_id: u64, name: &str) -> NewWorkflow {
        NewWorkflow {
            user_id,
            name: name.to_string(),
            raw_data: normalize_csv(b"name\nIntake\n").unwrap(),
            file_type: WorkflowFormat::Csv,
        }
    }

    fn seeded() -> (MemoryStore, Workflow) {
        let mut store = MemoryStore::new();
        let workflow = store.create_workflow(new_workflow(1, "Invoices")).unwrap();
        let outcome = MockAnalyzer::outcome();
        for pair in outcome.paired() {
            let flaw = store.create_flaw(workflow.id, pair.flaw).unwrap();
            for suggestion in pair.suggestions {
                store.create_fix_suggestion(flaw.id, suggestion).unwrap();
            }
        }
        (store, workflow)
    }

    #[test]
    fn test_ids_are_sequential_per_table() {
        let (mut store, workflow) = seeded();
        assert_eq!(workflow.id, 1);
        assert_eq!(workflow.status, WorkflowStatus::Uploaded);

        let second = store.create_workflow(new_workflow(1, "Payroll")).unwrap();
        assert_eq!(second.id, 2);

        let flaw_ids: Vec<u64> = store.list_flaws_by_workflow(1).iter().map(|f| f.id).collect();
        assert_eq!(flaw_ids, vec![1, 2, 3, 4]);
        assert_eq!(store.list_fix_suggestions_by_flaw(3)[0].id, 3);
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_workflow(7), Err(FlawFinderError::NotFound { .. })));
        assert!(matches!(store.get_flaw(7), Err(FlawFinderError::NotFound { .. })));
        assert!(matches!(
            store.get_report_by_workflow(7),
            Err(FlawFinderError::NotFound { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let (mut store, workflow) = seeded();
        assert!(matches!(
            store.create_workflow(new_workflow(1, "")),
            Err(FlawFinderError::Validation { .. })
        ));

        let mut draft = MockAnalyzer::outcome().flaws[0].clone();
        draft.severity = Severity::Unknown;
        assert!(matches!(
            store.create_flaw(workflow.id, &draft),
            Err(FlawFinderError::Validation { .. })
        ));

        let mut suggestion = MockAnalyzer::outcome().fix_suggestions[0].clone();
        suggestion.priority = 6;
        assert!(matches!(
            store.create_fix_suggestion(1, &suggestion),
            Err(FlawFinderError::Validation { .. })
        ));
    }

    #[test]
    fn test_one_report_per_workflow() {
        let (mut store, workflow) = seeded();
        let report = generate_report(workflow.id, &store.list_flaws_by_workflow(workflow.id), &[]);

        let stored = store.create_report(report.clone()).unwrap();
        assert_eq!(stored.id, 1);
        assert!(store.has_report(workflow.id));
        assert!(matches!(
            store.create_report(report),
            Err(FlawFinderError::AlreadyExists { workflow_id: 1 })
        ));
    }

    #[test]
    fn test_update_workflow_keeps_processed_data() {
        let (mut store, workflow) = seeded();
        store
            .update_workflow(workflow.id, WorkflowStatus::Analyzed, Some(serde_json::json!({"flaws_count": 4})))
            .unwrap();
        let updated = store
            .update_workflow(workflow.id, WorkflowStatus::Failed, None)
            .unwrap();
        assert_eq!(updated.status, WorkflowStatus::Failed);
        assert_eq!(updated.processed_data, Some(serde_json::json!({"flaws_count": 4})));
    }

    #[test]
    fn test_delete_cascades() {
        let (mut store, workflow) = seeded();
        let report = generate_report(workflow.id, &[], &[]);
        store.create_report(report).unwrap();

        store.delete_workflow(workflow.id).unwrap();
        assert!(store.list_flaws_by_workflow(workflow.id).is_empty());
        assert!(store.list_fix_suggestions_by_flaw(1).is_empty());
        assert!(!store.has_report(workflow.id));
        assert!(store.delete_workflow(workflow.id).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let (store, _) = seeded();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded, store);

        let mut loaded = loaded;
        let next = loaded.create_workflow(new_workflow(2, "Onboarding")).unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(store, MemoryStore::new());
    }
}
