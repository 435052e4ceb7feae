mod display;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use flawfinder_core::workflow::chain::StepChain;
use flawfinder_core::{ApiResponse, FlawFinderConfig, MemoryStore, WorkflowService};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "flawfinder",
    version,
    about = "FlawFinder - Business Workflow Flaw Analyzer",
    long_about = "Upload business workflows as CSV or JSON, find their flaws, and get a prioritized fix plan and executive report.\n\nEvery workflow has flaws. FlawFinder tells you how bad they are."
)]
struct Cli {
    /// Path to a config file (defaults to $FLAWFINDER_CONFIG, then .flawfinder/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the store file, overriding the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Id of the user the command acts as
    #[arg(long, global = true, default_value = "1")]
    user: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a workflow file, or every CSV/JSON file under a directory
    Upload {
        /// Path to a workflow file or a directory of workflow files
        path: PathBuf,

        /// Workflow name (defaults to the file name; ignored for directories)
        #[arg(long)]
        name: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List your workflows
    Workflows {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Analyze a workflow for flaws
    Analyze {
        workflow_id: u64,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show stored analysis results
    Results {
        workflow_id: u64,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the analysis status of a workflow
    Status {
        workflow_id: u64,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the fix plan for a workflow
    FixPlan {
        workflow_id: u64,

        /// Sort every suggestion into priority bands instead of grouping by flaw
        #[arg(long)]
        prioritized: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the fix suggestions for a single flaw
    Suggestions {
        flaw_id: u64,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the executive report for a workflow
    Report {
        workflow_id: u64,

        /// Generate the report (a workflow can only have one)
        #[arg(long)]
        generate: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show dashboard statistics across your workflows
    Dashboard {
        /// Show chart series instead of summary statistics
        #[arg(long)]
        charts: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a workflow with its flaws, suggestions and report
    Delete {
        workflow_id: u64,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "flawfinder", &mut std::io::stdout());
        return Ok(());
    }

    let config = FlawFinderConfig::resolve(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.store.path.clone());
    let store = MemoryStore::load(&store_path)
        .with_context(|| format!("Failed to load store {}", store_path.display()))?;
    let mut service = WorkflowService::from_config(store, &config);
    debug!(analyzer = service.analyzer_name(), store = %store_path.display(), "ready");

    let user = cli.user;
    let mutated = match cli.command {
        Commands::Upload { path, name, format } => {
            let outcome = cmd_upload(&mut service, user, &path, name.as_deref(), format);
            // Keep the files that did upload before a failing one.
            save(&service, &store_path)?;
            outcome?;
            false
        }
        Commands::Workflows { format } => {
            let workflows = service.list_workflows(user);
            emit(format, "Workflows retrieved successfully", Ok(workflows), |w| {
                display::print_workflows(w)
            })?;
            false
        }
        Commands::Analyze { workflow_id, format } => {
            let result = service.analyze(user, workflow_id);
            // Status changes are persisted even when the analysis failed.
            save(&service, &store_path)?;
            emit(format, "Analysis completed successfully", result, display::print_analysis)?;
            false
        }
        Commands::Results { workflow_id, format } => {
            let result = service.analysis_results(user, workflow_id);
            emit(format, "Analysis results retrieved successfully", result, display::print_analysis)?;
            false
        }
        Commands::Status { workflow_id, format } => {
            let result = service.analysis_status(user, workflow_id);
            emit(format, "Analysis status retrieved successfully", result, display::print_status)?;
            false
        }
        Commands::FixPlan { workflow_id, prioritized, format } => {
            if prioritized {
                let result = service.prioritized_fix_plan(user, workflow_id);
                emit(
                    format,
                    "Prioritized fixes retrieved successfully",
                    result,
                    display::print_prioritized_plan,
                )?;
            } else {
                let result = service.fix_plan(user, workflow_id);
                emit(format, "Fix plan generated successfully", result, display::print_fix_plan)?;
            }
            false
        }
        Commands::Suggestions { flaw_id, format } => {
            let result = service.flaw_suggestions(user, flaw_id);
            emit(
                format,
                "Fix suggestions retrieved successfully",
                result,
                display::print_flaw_suggestions,
            )?;
            false
        }
        Commands::Report { workflow_id, generate, format } => {
            if generate {
                let result = service.generate_report(user, workflow_id);
                let generated = result.is_ok();
                emit(format, "Report generated successfully", result, display::print_report)?;
                generated
            } else {
                let result = service.get_report(user, workflow_id);
                emit(format, "Report retrieved successfully", result, |stored| {
                    display::print_report(&stored.report)
                })?;
                false
            }
        }
        Commands::Dashboard { charts, format } => {
            if charts {
                let charts = service.dashboard_charts(user);
                emit(format, "Chart data retrieved successfully", Ok(charts), display::print_charts)?;
            } else {
                let stats = service.dashboard(user);
                emit(format, "Dashboard data retrieved successfully", Ok(stats), display::print_dashboard)?;
            }
            false
        }
        Commands::Delete { workflow_id, format } => {
            let result = service.delete_workflow(user, workflow_id);
            let deleted = result.is_ok();
            emit(format, "Workflow deleted successfully", result, |_| {
                display::print_deleted(workflow_id)
            })?;
            deleted
        }
        Commands::Completions { .. } => false,
    };

    if mutated {
        save(&service, &store_path)?;
    }

    Ok(())
}

/// Print a result as text or as a JSON response envelope.
fn emit<T: Serialize>(
    format: OutputFormat,
    message: &str,
    result: flawfinder_core::Result<T>,
    print_text: impl FnOnce(&T),
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let envelope = match &result {
                Ok(data) => serde_json::to_string_pretty(&ApiResponse::success(message, data))?,
                Err(error) => serde_json::to_string_pretty(&ApiResponse::<()>::from_error(error))?,
            };
            println!("{}", envelope);
            result.map(|_| ()).map_err(Into::into)
        }
        OutputFormat::Text => {
            let data = result?;
            print_text(&data);
            Ok(())
        }
    }
}

fn save(service: &WorkflowService<MemoryStore>, path: &Path) -> Result<()> {
    service
        .store()
        .save(path)
        .with_context(|| format!("Failed to save store {}", path.display()))
}

fn discover_workflow_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if path.is_dir() {
        let mut files: Vec<PathBuf> = glob::glob(&format!("{}/**/*.csv", path.display()))
            .context("Failed to read glob pattern")?
            .chain(
                glob::glob(&format!("{}/**/*.json", path.display()))
                    .context("Failed to read glob pattern")?,
            )
            .filter_map(|r| r.ok())
            .collect();
        files.sort();
        return Ok(files);
    }

    anyhow::bail!("Path '{}' does not exist", path.display());
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "text/plain",
    }
}

fn cmd_upload(
    service: &mut WorkflowService<MemoryStore>,
    user: u64,
    path: &Path,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let files = discover_workflow_files(path)?;

    if files.is_empty() {
        anyhow::bail!(
            "No workflow files found at '{}'. \
            Make sure the path points to a CSV or JSON file or a directory containing them.",
            path.display()
        );
    }

    let single = files.len() == 1;
    for file in &files {
        let content = std::fs::read(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let workflow_name = match name {
            Some(name) if single => name.to_string(),
            _ => filename.clone(),
        };

        let result = service.upload(user, &workflow_name, &filename, content_type_for(file), &content);
        emit(format, "File uploaded and processed successfully", result, |uploaded| {
            let chain = service
                .get_workflow(user, uploaded.workflow_id)
                .map(|w| StepChain::from_workflow(&w.raw_data))
                .unwrap_or_default();
            display::print_upload(file, uploaded, &chain)
        })
        .with_context(|| format!("Failed to upload {}", file.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("a/flow.CSV")), "text/csv");
        assert_eq!(content_type_for(Path::new("flow.json")), "application/json");
        assert_eq!(content_type_for(Path::new("notes")), "text/plain");
    }

    #[test]
    fn test_fix_plan_flags_parse() {
        let cli = Cli::parse_from(["flawfinder", "--user", "7", "fix-plan", "3", "--prioritized", "-f", "json"]);
        assert_eq!(cli.user, 7);
        match cli.command {
            Commands::FixPlan { workflow_id, prioritized, format } => {
                assert_eq!(workflow_id, 3);
                assert!(prioritized);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected fix-plan"),
        }
    }
}
