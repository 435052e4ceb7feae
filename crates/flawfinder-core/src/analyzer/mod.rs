pub mod external;
pub mod mock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{AnalyzerConfig, AnalyzerMode};
use crate::model::{FixSuggestionDraft, FlawDraft};
use crate::scoring;
use crate::workflow::NormalizedWorkflow;

pub use external::ExternalAnalyzer;
pub use mock::MockAnalyzer;

/// A strategy that inspects a normalized workflow and reports its flaws.
///
/// Implementations are pure: persisting the outcome is the caller's job.
pub trait Analyzer {
    fn name(&self) -> &str;

    fn analyze(&self, workflow: &NormalizedWorkflow) -> AnalysisOutcome;

    /// Link each suggestion of an outcome to the flaw it fixes.
    fn pair<'a>(&self, outcome: &'a AnalysisOutcome) -> Vec<PairedFlaw<'a>> {
        outcome.paired()
    }
}

/// Flaws and fix suggestions produced by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub flaws: Vec<FlawDraft>,
    pub fix_suggestions: Vec<FixSuggestionDraft>,
    pub brutality_score: f64,
}

/// A flaw together with the suggestions linked to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedFlaw<'a> {
    pub flaw: &'a FlawDraft,
    pub suggestions: Vec<&'a FixSuggestionDraft>,
}

impl AnalysisOutcome {
    /// Build an outcome, scoring the flaws with the shared severity table.
    pub fn new(flaws: Vec<FlawDraft>, fix_suggestions: Vec<FixSuggestionDraft>) -> Self {
        let brutality_score = scoring::brutality_score(flaws.iter().map(|f| f.severity));
        Self {
            flaws,
            fix_suggestions,
            brutality_score,
        }
    }

    pub fn total_flaws(&self) -> usize {
        self.flaws.len()
    }

    /// Link suggestions to flaws by position: the i-th suggestion belongs to
    /// the i-th flaw. Suggestions past the last flaw are dropped.
    pub fn paired(&self) -> Vec<PairedFlaw<'_>> {
        if self.fix_suggestions.len() > self.flaws.len() {
            warn!(
                flaws = self.flaws.len(),
                suggestions = self.fix_suggestions.len(),
                "dropping fix suggestions with no matching flaw"
            );
        }

        self.flaws
            .iter()
            .enumerate()
            .map(|(i, flaw)| PairedFlaw {
                flaw,
                suggestions: self.fix_suggestions.get(i).into_iter().collect(),
            })
            .collect()
    }
}

/// Build the analyzer selected by configuration.
pub fn build_analyzer(config: &AnalyzerConfig) -> Box<dyn Analyzer> {
    match (config.mode, config.command.as_deref()) {
        (AnalyzerMode::External, Some(command)) => Box::new(ExternalAnalyzer::new(
            command,
            config.args.clone(),
            config.timeout_ms,
        )),
        (AnalyzerMode::External, None) => {
            warn!("external analyzer has no command configured, using mock analysis");
            Box::new(MockAnalyzer)
        }
        (AnalyzerMode::Mock, _) => Box::new(MockAnalyzer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlawType, Level};
    use crate::scoring::Severity;

    fn flaw(title: &str, severity: Severity) -> FlawDraft {
        FlawDraft {
            flaw_type: FlawType::Inefficiency,
            severity,
            title: title.to_string(),
            description: String::new(),
            location: String::new(),
            impact_score: 1.0,
        }
    }

    fn suggestion(title: &str) -> FixSuggestionDraft {
        FixSuggestionDraft {
            title: title.to_string(),
            description: String::new(),
            implementation_effort: Level::Low,
            expected_impact: Level::Low,
            priority: 3,
            estimated_time: String::new(),
        }
    }

    #[test]
    fn test_pairing_is_positional() {
        let outcome = AnalysisOutcome::new(
            vec![flaw("a", Severity::High), flaw("b", Severity::Low)],
            vec![suggestion("fix a"), suggestion("fix b")],
        );
        let paired = outcome.paired();
        assert_eq!(paired[0].flaw.title, "a");
        assert_eq!(paired[0].suggestions[0].title, "fix a");
        assert_eq!(paired[1].suggestions[0].title, "fix b");
    }

    #[test]
    fn test_surplus_suggestions_are_dropped() {
        let outcome = AnalysisOutcome::new(
            vec![flaw("a", Severity::High)],
            vec![suggestion("fix a"), suggestion("orphan")],
        );
        let paired = outcome.paired();
        assert_eq!(paired.len(), 1);
        assert_eq!(paired[0].suggestions.len(), 1);
    }

    #[test]
    fn test_flaws_without_suggestion_get_none() {
        let outcome = AnalysisOutcome::new(
            vec![flaw("a", Severity::High), flaw("b", Severity::Low)],
            vec![suggestion("fix a")],
        );
        assert!(outcome.paired()[1].suggestions.is_empty());
    }

    #[test]
    fn test_outcome_scores_with_shared_table() {
        let outcome = AnalysisOutcome::new(
            vec![flaw("a", Severity::Critical), flaw("b", Severity::Medium)],
            Vec::new(),
        );
        assert_eq!(outcome.brutality_score, 7.5);
        assert_eq!(outcome.total_flaws(), 2);
    }

    #[test]
    fn test_build_analyzer_selects_strategy() {
        assert_eq!(build_analyzer(&AnalyzerConfig::default()).name(), "mock");

        let config = AnalyzerConfig {
            mode: AnalyzerMode::External,
            command: Some("analyze-workflow".to_string()),
            args: Vec::new(),
            timeout_ms: 100,
        };
        assert_eq!(build_analyzer(&config).name(), "external");
    }
}
