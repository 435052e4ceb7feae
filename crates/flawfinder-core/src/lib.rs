pub mod analyzer;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fix_plan;
pub mod model;
pub mod report;
pub mod response;
pub mod scoring;
pub mod service;
pub mod store;
pub mod workflow;

pub use analyzer::{AnalysisOutcome, Analyzer, ExternalAnalyzer, MockAnalyzer};
pub use config::FlawFinderConfig;
pub use error::{FlawFinderError, ParseError, Result};
pub use model::{FixSuggestion, Flaw, FlawType, Workflow, WorkflowStatus};
pub use response::ApiResponse;
pub use scoring::{brutality_score, Severity, SeverityCounts};
pub use service::WorkflowService;
pub use store::{MemoryStore, WorkflowStore};
pub use workflow::{DeclaredKind, NormalizedWorkflow, WorkflowFormat};
