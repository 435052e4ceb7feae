//! Severity tables and the brutality score.
//!
//! Every component that weighs or ranks flaws by severity goes through this
//! module: the analysis response, the dashboard aggregate, the fix-plan sort
//! and the executive report all share the same tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the brutality scale.
pub const MAX_BRUTALITY: f64 = 10.0;

/// Severity level of a detected flaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    /// Anything an external analyzer reports outside the four known levels.
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// The four levels a stored flaw may carry, most severe first.
    pub const KNOWN: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn parse(value: &str) -> Severity {
        match value.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    /// Contribution of one flaw to the brutality score.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::High => 7,
            Severity::Medium => 5,
            Severity::Low => 2,
            Severity::Unknown => 0,
        }
    }

    /// Sort rank used when ordering fix suggestions; lower sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
            Severity::Unknown => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Unknown => "UNKNOWN",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Severity::Unknown)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-level tally of flaws. Unknown severities only show up in `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

impl SeverityCounts {
    pub fn tally<I>(severities: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        let mut counts = SeverityCounts::default();
        for severity in severities {
            counts.total += 1;
            match severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Unknown => {}
            }
        }
        counts
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Unknown => self.total - self.critical - self.high - self.medium - self.low,
        }
    }

    /// Brutality score from the tallied occurrences: `sum(weight * count) / total`.
    pub fn brutality_score(&self) -> f64 {
        let weighted: u64 = Severity::KNOWN
            .iter()
            .map(|s| u64::from(s.weight()) * self.get(*s) as u64)
            .sum();
        mean_weight(weighted, self.total)
    }
}

/// Mean severity weight over a set of flaws, `0.0` when the set is empty.
pub fn brutality_score<I>(severities: I) -> f64
where
    I: IntoIterator<Item = Severity>,
{
    let mut weighted: u64 = 0;
    let mut count = 0usize;
    for severity in severities {
        weighted += u64::from(severity.weight());
        count += 1;
    }
    mean_weight(weighted, count)
}

// Integer sums keep the list form and the tallied form bit-identical.
fn mean_weight(weighted: u64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (weighted as f64 / count as f64).clamp(0.0, MAX_BRUTALITY)
}
