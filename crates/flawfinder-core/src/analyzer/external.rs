use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{AnalysisOutcome, Analyzer, MockAnalyzer};
use crate::error::{FlawFinderError, Result};
use crate::model::{FixSuggestionDraft, FlawDraft};
use crate::workflow::chain::StepChain;
use crate::workflow::NormalizedWorkflow;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const KILL_GRACE: Duration = Duration::from_millis(100);

/// Analyzer that delegates to an external program, typically a wrapper
/// around a language model.
///
/// The program receives `{"workflow": ..., "step_chain": [...]}` on stdin and
/// must print `{"flaws": [...], "fix_suggestions": [...]}` on stdout. Any
/// failure falls back to the mock catalog.
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ExternalInput {
    workflow: Value,
    step_chain: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalOutput {
    flaws: Vec<FlawDraft>,
    #[serde(default)]
    fix_suggestions: Vec<FixSuggestionDraft>,
}

impl ExternalAnalyzer {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout_ms: u64) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Run the external program without the mock fallback.
    pub fn try_analyze(&self, workflow: &NormalizedWorkflow) -> Result<AnalysisOutcome> {
        let chain = StepChain::from_workflow(workflow);
        let input = ExternalInput {
            workflow: workflow.to_value(),
            step_chain: chain.nodes.into_iter().map(|n| n.label).collect(),
        };
        let input_json = serde_json::to_string(&input)?;

        let stdout = self.run(input_json)?;
        parse_output(&stdout)
    }

    fn run(&self, input_json: String) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| external(format!("Failed to spawn '{}': {}", self.command, e)))?;

        let stdin = child.stdin.take();
        // Detached: the program may exit without reading its input.
        thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                if let Err(error) = stdin.write_all(input_json.as_bytes()) {
                    debug!(%error, "external analyzer did not consume stdin");
                }
            }
        });
        let stdout_rx = spawn_reader(child.stdout.take());
        let stderr_rx = spawn_reader(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // Readers finish once every holder of the pipes is gone.
                    let _ = stdout_rx.recv_timeout(KILL_GRACE);
                    let _ = stderr_rx.recv_timeout(KILL_GRACE);
                    return Err(self.timed_out());
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        // A process spawned by the program can keep the pipes open after it exits.
        let stdout = stdout_rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()).max(KILL_GRACE))
            .map_err(|_| self.timed_out())?;
        let stderr = stderr_rx.recv_timeout(KILL_GRACE).unwrap_or_default();

        if !status.success() {
            return Err(external(format!(
                "'{}' exited with {}: {}",
                self.command,
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        String::from_utf8(stdout)
            .map_err(|e| external(format!("'{}' returned non-UTF8 output: {}", self.command, e)))
    }

    fn timed_out(&self) -> FlawFinderError {
        external(format!(
            "'{}' timed out after {}ms",
            self.command,
            self.timeout.as_millis()
        ))
    }
}

impl Analyzer for ExternalAnalyzer {
    fn name(&self) -> &str {
        "external"
    }

    fn analyze(&self, workflow: &NormalizedWorkflow) -> AnalysisOutcome {
        match self.try_analyze(workflow) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, command = %self.command, "external analysis failed, using mock analysis");
                MockAnalyzer::outcome()
            }
        }
    }
}

fn parse_output(stdout: &str) -> Result<AnalysisOutcome> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(external("external analyzer produced no output".to_string()));
    }

    let output: ExternalOutput = serde_json::from_str(trimmed)
        .map_err(|e| external(format!("invalid analysis JSON: {}", e)))?;

    for flaw in &output.flaws {
        flaw.validate()
            .map_err(|e| external(format!("rejected flaw '{}': {}", flaw.title, e)))?;
    }
    for suggestion in &output.fix_suggestions {
        suggestion
            .validate()
            .map_err(|e| external(format!("rejected suggestion '{}': {}", suggestion.title, e)))?;
    }

    // The score is always recomputed from the severities.
    Ok(AnalysisOutcome::new(output.flaws, output.fix_suggestions))
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_to_end(source));
    });
    rx
}

fn read_to_end<R: Read>(source: Option<R>) -> Vec<u8> {
    let mut buffer = Vec::new();
    if let Some(mut source) = source {
        let _ = source.read_to_end(&mut buffer);
    }
    buffer
}

fn external(message: String) -> FlawFinderError {
    FlawFinderError::ExternalAnalysis(message)
}
