use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FlawFinderError, Result};
use crate::scoring::Severity;
use crate::workflow::{NormalizedWorkflow, WorkflowFormat};

/// Category of a detected flaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlawType {
    Bottleneck,
    Redundancy,
    Security,
    Inefficiency,
    MissingStep,
    Cycle,
    #[serde(other)]
    Other,
}

impl FlawType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlawType::Bottleneck => "bottleneck",
            FlawType::Redundancy => "redundancy",
            FlawType::Security => "security",
            FlawType::Inefficiency => "inefficiency",
            FlawType::MissingStep => "missing_step",
            FlawType::Cycle => "cycle",
            FlawType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlawType::Bottleneck => "Bottleneck",
            FlawType::Redundancy => "Redundancy",
            FlawType::Security => "Security Vulnerability",
            FlawType::Inefficiency => "Inefficiency",
            FlawType::MissingStep => "Missing Step",
            FlawType::Cycle => "Cycle",
            FlawType::Other => "Other",
        }
    }
}

impl fmt::Display for FlawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-step scale for implementation effort and expected impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flaw as produced by an analyzer, before the store assigns ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlawDraft {
    pub flaw_type: FlawType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub impact_score: f64,
}

/// A fix suggestion as produced by an analyzer, before it is linked to a flaw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestionDraft {
    pub title: String,
    pub description: String,
    pub implementation_effort: Level,
    pub expected_impact: Level,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub estimated_time: String,
}

impl FlawDraft {
    /// Check the fields a stored flaw must satisfy.
    pub fn validate(&self) -> Result<()> {
        if !self.severity.is_known() {
            return Err(FlawFinderError::validation(
                "severity",
                "must be one of low, medium, high, critical",
            ));
        }
        if !(0.0..=10.0).contains(&self.impact_score) {
            return Err(FlawFinderError::validation(
                "impact_score",
                format!("{} is outside 0-10", self.impact_score),
            ));
        }
        Ok(())
    }
}

impl FixSuggestionDraft {
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.priority) {
            return Err(FlawFinderError::validation(
                "priority",
                format!("{} is outside 1-5", self.priority),
            ));
        }
        Ok(())
    }
}

fn default_priority() -> u8 {
    1
}

/// A persisted flaw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flaw {
    pub id: u64,
    pub workflow_id: u64,
    pub flaw_type: FlawType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: String,
    pub impact_score: f64,
    pub created_at: DateTime<Utc>,
}

/// A persisted fix suggestion, linked to its parent flaw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub id: u64,
    pub flaw_id: u64,
    pub title: String,
    pub description: String,
    pub implementation_effort: Level,
    pub expected_impact: Level,
    pub priority: u8,
    pub estimated_time: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an uploaded workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Uploaded,
    Processing,
    Analyzed,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Uploaded => "uploaded",
            WorkflowStatus::Processing => "processing",
            WorkflowStatus::Analyzed => "analyzed",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a workflow record.
#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub user_id: u64,
    pub name: String,
    pub raw_data: NormalizedWorkflow,
    pub file_type: WorkflowFormat,
}

/// A persisted workflow upload and its analysis state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub raw_data: NormalizedWorkflow,
    pub processed_data: Option<serde_json::Value>,
    pub file_type: WorkflowFormat,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
