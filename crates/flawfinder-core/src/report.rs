use serde::{Deserialize, Serialize};

use crate::fix_plan::PriorityBand;
use crate::model::{FixSuggestion, Flaw};
use crate::scoring::SeverityCounts;

pub const NO_FLAWS_SUMMARY: &str =
    "Congratulations! Your workflow analysis shows no significant flaws detected.";

pub const ESTIMATED_TOTAL_TIME: &str = "4-8 weeks";
pub const EXPECTED_ROI: &str = "25-40% efficiency improvement";

/// Fix suggestions split by urgency, plus the effort and payoff narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub immediate_actions: Vec<FixSuggestion>,
    pub short_term_improvements: Vec<FixSuggestion>,
    pub long_term_optimizations: Vec<FixSuggestion>,
    pub estimated_total_time: String,
    pub expected_roi: String,
}

/// Executive report for one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub workflow_id: u64,
    pub executive_summary: String,
    pub total_flaws: usize,
    pub critical_flaws: usize,
    pub high_flaws: usize,
    pub medium_flaws: usize,
    pub low_flaws: usize,
    pub brutality_score: f64,
    /// Not floored at zero.
    pub improvement_percentage: f64,
    pub recommendations: Recommendations,
}

/// Build the executive report from a workflow's flaws and suggestions.
///
/// Pure: the caller is responsible for making sure the workflow does not
/// already have a stored report.
pub fn generate_report(workflow_id: u64, flaws: &[Flaw], fix_suggestions: &[FixSuggestion]) -> Report {
    let counts = SeverityCounts::tally(flaws.iter().map(|f| f.severity));
    let brutality_score = counts.brutality_score();

    Report {
        workflow_id,
        executive_summary: executive_summary(&counts, brutality_score),
        total_flaws: counts.total,
        critical_flaws: counts.critical,
        high_flaws: counts.high,
        medium_flaws: counts.medium,
        low_flaws: counts.low,
        brutality_score,
        improvement_percentage: improvement_percentage(brutality_score),
        recommendations: recommendations(fix_suggestions),
    }
}

pub fn improvement_percentage(brutality_score: f64) -> f64 {
    (100.0 - brutality_score * 10.0).min(100.0)
}

/// Compose the narrative summary from the severity tally and score.
pub fn executive_summary(counts: &SeverityCounts, brutality_score: f64) -> String {
    if counts.total == 0 {
        return NO_FLAWS_SUMMARY.to_string();
    }

    let mut summary = format!(
        "Workflow Analysis Summary: {} flaws detected with a brutality score of {:.1}/10. ",
        counts.total, brutality_score
    );

    if counts.critical > 0 {
        summary.push_str(&format!(
            "URGENT: {} critical issues require immediate attention. ",
            counts.critical
        ));
    }

    if counts.high > 0 {
        summary.push_str(&format!(
            "{} high-priority issues need resolution within this sprint. ",
            counts.high
        ));
    }

    summary.push_str(if brutality_score >= 8.0 {
        "This workflow requires significant improvements to meet industry standards."
    } else if brutality_score >= 5.0 {
        "This workflow has room for improvement but is generally functional."
    } else {
        "This workflow is well-designed with minor optimization opportunities."
    });

    summary
}

pub fn recommendations(fix_suggestions: &[FixSuggestion]) -> Recommendations {
    let in_band = |band: PriorityBand| -> Vec<FixSuggestion> {
        fix_suggestions
            .iter()
            .filter(|s| PriorityBand::of(s.priority) == band)
            .cloned()
            .collect()
    };

    Recommendations {
        immediate_actions: in_band(PriorityBand::High),
        short_term_improvements: in_band(PriorityBand::Medium),
        long_term_optimizations: in_band(PriorityBand::Low),
        estimated_total_time: ESTIMATED_TOTAL_TIME.to_string(),
        expected_roi: EXPECTED_ROI.to_string(),
    }
}
