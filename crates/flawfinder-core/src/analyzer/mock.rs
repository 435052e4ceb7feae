use super::{AnalysisOutcome, Analyzer};
use crate::model::{FixSuggestionDraft, FlawDraft, FlawType, Level};
use crate::scoring::Severity;
use crate::workflow::NormalizedWorkflow;

/// Analyzer returning a fixed catalog of four flaws, each paired with one
/// fix suggestion at the same position. The workflow content is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockAnalyzer;

impl MockAnalyzer {
    pub fn outcome() -> AnalysisOutcome {
        AnalysisOutcome::new(catalog_flaws(), catalog_suggestions())
    }
}

impl Analyzer for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    fn analyze(&self, _workflow: &NormalizedWorkflow) -> AnalysisOutcome {
        Self::outcome()
    }
}

fn flaw(
    flaw_type: FlawType,
    severity: Severity,
    title: &str,
    description: &str,
    location: &str,
    impact_score: f64,
) -> FlawDraft {
    FlawDraft {
        flaw_type,
        severity,
        title: title.to_string(),
        description: description.to_string(),
        location: location.to_string(),
        impact_score,
    }
}

fn suggestion(
    title: &str,
    description: &str,
    implementation_effort: Level,
    expected_impact: Level,
    priority: u8,
    estimated_time: &str,
) -> FixSuggestionDraft {
    FixSuggestionDraft {
        title: title.to_string(),
        description: description.to_string(),
        implementation_effort,
        expected_impact,
        priority,
        estimated_time: estimated_time.to_string(),
    }
}

fn catalog_flaws() -> Vec<FlawDraft> {
    vec![
        flaw(
            FlawType::Bottleneck,
            Severity::High,
            "Manual Approval Bottleneck",
            "Manual approval process causes significant delays in workflow execution",
            "Step 3: Approval Process",
            8.5,
        ),
        flaw(
            FlawType::Redundancy,
            Severity::Medium,
            "Duplicate Data Entry",
            "Customer information is entered multiple times across different steps",
            "Steps 1, 4, 7",
            6.0,
        ),
        flaw(
            FlawType::Security,
            Severity::Critical,
            "Unencrypted Data Transfer",
            "Sensitive customer data is transmitted without encryption",
            "Step 5: Data Transfer",
            9.8,
        ),
        flaw(
            FlawType::Inefficiency,
            Severity::Low,
            "Unnecessary Email Notifications",
            "Too many email notifications slow down the process",
            "Multiple steps",
            3.2,
        ),
    ]
}

fn catalog_suggestions() -> Vec<FixSuggestionDraft> {
    vec![
        suggestion(
            "Implement Automated Approval System",
            "Replace manual approval with rule-based automated system for standard cases",
            Level::High,
            Level::High,
            1,
            "2-3 weeks",
        ),
        suggestion(
            "Centralize Data Entry",
            "Create a single data entry point that populates all required fields",
            Level::Medium,
            Level::Medium,
            2,
            "1-2 weeks",
        ),
        suggestion(
            "Implement End-to-End Encryption",
            "Add SSL/TLS encryption for all data transmission",
            Level::Medium,
            Level::High,
            1,
            "1 week",
        ),
        suggestion(
            "Optimize Notification System",
            "Reduce email notifications to essential ones only",
            Level::Low,
            Level::Low,
            3,
            "2-3 days",
        ),
    ]
}
