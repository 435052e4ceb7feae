use csv::ReaderBuilder;
use serde_json::{Map, Value};
use tracing::debug;

use super::{DeclaredKind, NormalizedWorkflow, Step, WorkflowBody, WorkflowFormat};
use crate::error::ParseError;

/// Convert uploaded bytes into a normalized workflow.
///
/// When the kind is unknown, JSON is tried first and CSV second: JSON is the
/// stricter grammar, and almost any text parses as a one-column CSV.
pub fn normalize(content: &[u8], declared: DeclaredKind) -> Result<NormalizedWorkflow, ParseError> {
    match declared {
        DeclaredKind::Csv => normalize_csv(content),
        DeclaredKind::Json => normalize_json(content),
        DeclaredKind::Unknown => normalize_json(content).or_else(|error| {
            debug!(%error, "content is not JSON, retrying as CSV");
            normalize_csv(content)
        }),
    }
}

/// Parse a header-row CSV table, one step per data row.
pub fn normalize_csv(content: &[u8]) -> Result<NormalizedWorkflow, ParseError> {
    let text = std::str::from_utf8(content)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::EmptyCsvHeader);
    }

    let mut steps = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // Short rows fill their trailing columns with null; extra fields are dropped.
        let row: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let value = record
                    .get(col)
                    .map_or(Value::Null, |v| Value::String(v.to_string()));
                (header.to_string(), value)
            })
            .collect();
        steps.push(Step::from_record(i + 1, row));
    }

    let columns = if steps.is_empty() {
        Vec::new()
    } else {
        headers.iter().map(String::from).collect()
    };

    debug!(rows = steps.len(), "normalized CSV workflow");
    Ok(NormalizedWorkflow {
        format: WorkflowFormat::Csv,
        body: WorkflowBody::Table { columns, steps },
    })
}

/// Parse a JSON document into one of the workflow body shapes.
pub fn normalize_json(content: &[u8]) -> Result<NormalizedWorkflow, ParseError> {
    let text = std::str::from_utf8(content)?;
    let value: Value = serde_json::from_str(text).map_err(ParseError::InvalidJson)?;

    let body = match value {
        Value::Object(document) if document.contains_key("steps") => {
            WorkflowBody::Canonical { document }
        }
        Value::Array(items) => {
            let total_steps = items.len();
            let steps = items
                .into_iter()
                .enumerate()
                .filter_map(|(i, item)| match item {
                    Value::Object(record) => Some(Step::from_record(i + 1, record)),
                    _ => None,
                })
                .collect::<Vec<_>>();
            WorkflowBody::Records { total_steps, steps }
        }
        Value::Object(record) => WorkflowBody::Single { record },
        value => WorkflowBody::Raw { value },
    };

    Ok(NormalizedWorkflow {
        format: WorkflowFormat::Json,
        body,
    })
}

impl Step {
    /// Build a step from one source record, reading each field from its
    /// canonical column and then its alternate name.
    pub fn from_record(id: usize, record: Map<String, Value>) -> Self {
        let field = |primary: &str, alternate: &str| {
            record
                .get(primary)
                .or_else(|| record.get(alternate))
                .map(text_of)
        };

        Step {
            id,
            name: field("name", "step_name").unwrap_or_else(|| format!("Step {}", id)),
            description: field("description", "step_description").unwrap_or_default(),
            step_type: field("type", "step_type").unwrap_or_else(|| "process".to_string()),
            duration: field("duration", "estimated_time").unwrap_or_default(),
            owner: field("owner", "responsible_person").unwrap_or_default(),
            inputs: field("inputs", "input_data").unwrap_or_default(),
            outputs: field("outputs", "output_data").unwrap_or_default(),
            dependencies: field("dependencies", "depends_on").unwrap_or_default(),
            raw: record,
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
