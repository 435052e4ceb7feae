pub mod chain;
pub mod normalizer;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Content types accepted for workflow uploads.
pub const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["text/csv", "application/json", "text/plain"];

/// Storage format of a normalized workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowFormat {
    Csv,
    Json,
}

impl WorkflowFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowFormat::Csv => "csv",
            WorkflowFormat::Json => "json",
        }
    }
}

impl fmt::Display for WorkflowFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the uploader claims the content is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredKind {
    Csv,
    Json,
    /// Neither extension nor content type decided it; sniff the bytes.
    Unknown,
}

impl DeclaredKind {
    /// Decide the kind from the uploaded file name and its content type.
    /// The CSV check runs first, so `data.json` sent as `text/csv` is CSV.
    pub fn from_upload(filename: &str, content_type: &str) -> Self {
        let filename = filename.to_lowercase();
        if filename.ends_with(".csv") || content_type == "text/csv" {
            DeclaredKind::Csv
        } else if filename.ends_with(".json") || content_type == "application/json" {
            DeclaredKind::Json
        } else {
            DeclaredKind::Unknown
        }
    }
}

/// One canonical workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: usize,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub step_type: String,
    pub duration: String,
    pub owner: String,
    pub inputs: String,
    pub outputs: String,
    pub dependencies: String,
    /// The source record the step was read from.
    #[serde(rename = "raw_data")]
    pub raw: Map<String, Value>,
}

/// Shape the upload was normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowBody {
    /// CSV rows, one step per data row.
    Table { columns: Vec<String>, steps: Vec<Step> },
    /// A JSON array; non-object elements were skipped but still counted.
    Records { total_steps: usize, steps: Vec<Step> },
    /// A JSON object that already carried `steps`, kept verbatim.
    Canonical { document: Map<String, Value> },
    /// A single JSON object wrapped as a one-step workflow.
    Single { record: Map<String, Value> },
    /// Any other JSON value; there are no steps.
    Raw { value: Value },
}

/// An upload converted into an ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWorkflow {
    pub format: WorkflowFormat,
    pub body: WorkflowBody,
}

impl NormalizedWorkflow {
    /// Canonical steps, when the body was built record by record.
    pub fn steps(&self) -> &[Step] {
        match &self.body {
            WorkflowBody::Table { steps, .. } | WorkflowBody::Records { steps, .. } => steps,
            _ => &[],
        }
    }

    /// Display labels of every step in order, whatever the body shape.
    pub fn step_labels(&self) -> Vec<String> {
        match &self.body {
            WorkflowBody::Table { steps, .. } | WorkflowBody::Records { steps, .. } => {
                steps.iter().map(|s| s.name.clone()).collect()
            }
            WorkflowBody::Canonical { document } => document
                .get("steps")
                .and_then(Value::as_array)
                .map(|steps| {
                    steps
                        .iter()
                        .enumerate()
                        .map(|(i, step)| label_of(step, i + 1))
                        .collect()
                })
                .unwrap_or_default(),
            WorkflowBody::Single { record } => {
                vec![label_of(&Value::Object(record.clone()), 1)]
            }
            WorkflowBody::Raw { .. } => Vec::new(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.step_labels().len()
    }

    /// JSON view of the workflow as it is returned to API callers.
    pub fn to_value(&self) -> Value {
        let format = self.format.as_str();
        match &self.body {
            WorkflowBody::Table { columns, steps } => json!({
                "format": format,
                "total_rows": steps.len(),
                "columns": columns,
                "steps": steps,
            }),
            WorkflowBody::Records { total_steps, steps } => json!({
                "format": format,
                "total_steps": total_steps,
                "steps": steps,
            }),
            WorkflowBody::Canonical { document } => Value::Object(document.clone()),
            WorkflowBody::Single { record } => json!({
                "format": format,
                "total_steps": 1,
                "steps": [record],
            }),
            WorkflowBody::Raw { value } => json!({
                "format": format,
                "raw_data": value,
            }),
        }
    }
}

fn label_of(step: &Value, position: usize) -> String {
    step.get("name")
        .or_else(|| step.get("step_name"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("Step {}", position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_kind_from_upload() {
        assert_eq!(DeclaredKind::from_upload("steps.CSV", "text/plain"), DeclaredKind::Csv);
        assert_eq!(DeclaredKind::from_upload("steps.json", "text/plain"), DeclaredKind::Json);
        assert_eq!(DeclaredKind::from_upload("steps", "application/json"), DeclaredKind::Json);
        assert_eq!(DeclaredKind::from_upload("steps.json", "text/csv"), DeclaredKind::Csv);
        assert_eq!(DeclaredKind::from_upload("steps.txt", "text/plain"), DeclaredKind::Unknown);
    }

    #[test]
    fn test_canonical_labels_fall_back_to_position() {
        let mut document = Map::new();
        document.insert(
            "steps".to_string(),
            json!([{"name": "Intake"}, {"owner": "ops"}, {"step_name": "Close"}]),
        );
        let workflow = NormalizedWorkflow {
            format: WorkflowFormat::Json,
            body: WorkflowBody::Canonical { document },
        };
        assert_eq!(workflow.step_labels(), vec!["Intake", "Step 2", "Close"]);
        assert!(workflow.steps().is_empty());
    }

    #[test]
    fn test_raw_view() {
        let workflow = NormalizedWorkflow {
            format: WorkflowFormat::Json,
            body: WorkflowBody::Raw { value: json!(42) },
        };
        assert_eq!(workflow.to_value(), json!({"format": "json", "raw_data": 42}));
        assert_eq!(workflow.step_count(), 0);
    }
}
