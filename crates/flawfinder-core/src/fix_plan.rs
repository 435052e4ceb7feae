//! Fix-plan builder: groups suggestions by priority, orders them by priority
//! and parent-flaw severity, and totals their estimated time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{FixSuggestion, Flaw, Level};
use crate::scoring::Severity;

/// Working days counted for one week of estimated effort.
pub const WORKING_DAYS_PER_WEEK: i64 = 5;

/// Total time reported when there are flaws but no usable estimates.
pub const TIME_NOT_SPECIFIED: &str = "Time not specified";

/// Total time reported when the workflow has no flaws at all.
pub const NO_FLAWS_TIME: &str = "0 hours";

/// Suggestions keyed by the id of their parent flaw.
pub type SuggestionsByFlaw = BTreeMap<u64, Vec<FixSuggestion>>;

/// Priority band a suggestion falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityBand {
    /// Priority 1 or 2.
    High,
    /// Priority 3.
    Medium,
    /// Priority 4 and above.
    Low,
}

impl PriorityBand {
    pub fn of(priority: u8) -> Self {
        match priority {
            0..=2 => PriorityBand::High,
            3 => PriorityBand::Medium,
            _ => PriorityBand::Low,
        }
    }
}

/// A flaw with every suggestion linked to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlawFixes {
    pub flaw: Flaw,
    pub suggestions: Vec<FixSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixPlanSummary {
    pub total_suggestions: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub estimated_total_time: String,
}

/// Per-flaw fix plan with summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixPlan {
    pub fix_plan: Vec<FlawFixes>,
    pub summary: FixPlanSummary,
}

/// A suggestion flattened with the flaw it addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedSuggestion {
    pub suggestion_id: u64,
    pub flaw_id: u64,
    pub title: String,
    pub description: String,
    pub flaw_title: String,
    pub flaw_severity: Severity,
    pub implementation_effort: Level,
    pub expected_impact: Level,
    pub priority: u8,
    pub estimated_time: String,
}

/// All suggestions of a workflow, sorted and split into priority bands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedPlan {
    pub high_priority: Vec<PrioritizedSuggestion>,
    pub medium_priority: Vec<PrioritizedSuggestion>,
    pub low_priority: Vec<PrioritizedSuggestion>,
    pub total_suggestions: usize,
}

impl PrioritizedPlan {
    pub fn band(&self, band: PriorityBand) -> &[PrioritizedSuggestion] {
        match band {
            PriorityBand::High => &self.high_priority,
            PriorityBand::Medium => &self.medium_priority,
            PriorityBand::Low => &self.low_priority,
        }
    }
}

/// Build the per-flaw plan, keeping flaws in the order given.
pub fn build_plan(flaws: &[Flaw], suggestions_by_flaw: &SuggestionsByFlaw) -> FixPlan {
    if flaws.is_empty() {
        return FixPlan {
            fix_plan: Vec::new(),
            summary: FixPlanSummary {
                total_suggestions: 0,
                high_priority: 0,
                medium_priority: 0,
                low_priority: 0,
                estimated_total_time: NO_FLAWS_TIME.to_string(),
            },
        };
    }

    let fix_plan: Vec<FlawFixes> = flaws
        .iter()
        .map(|flaw| FlawFixes {
            flaw: flaw.clone(),
            suggestions: suggestions_by_flaw.get(&flaw.id).cloned().unwrap_or_default(),
        })
        .collect();

    let all: Vec<&FixSuggestion> = fix_plan.iter().flat_map(|f| f.suggestions.iter()).collect();
    let in_band = |band| all.iter().filter(|s| PriorityBand::of(s.priority) == band).count();

    let summary = FixPlanSummary {
        total_suggestions: all.len(),
        high_priority: in_band(PriorityBand::High),
        medium_priority: in_band(PriorityBand::Medium),
        low_priority: in_band(PriorityBand::Low),
        estimated_total_time: estimate_total_time(all.iter().map(|s| s.estimated_time.as_str())),
    };

    FixPlan { fix_plan, summary }
}

/// Sort every suggestion by priority, then by parent-flaw severity, and
/// split the result into priority bands.
pub fn build_prioritized(flaws: &[Flaw], suggestions_by_flaw: &SuggestionsByFlaw) -> PrioritizedPlan {
    let mut pairs: Vec<(&FixSuggestion, &Flaw)> = flaws
        .iter()
        .flat_map(|flaw| {
            suggestions_by_flaw
                .get(&flaw.id)
                .into_iter()
                .flatten()
                .map(move |suggestion| (suggestion, flaw))
        })
        .collect();

    pairs.sort_by_key(|(suggestion, flaw)| (suggestion.priority, flaw.severity.rank()));

    let mut plan = PrioritizedPlan {
        total_suggestions: pairs.len(),
        ..PrioritizedPlan::default()
    };

    for (suggestion, flaw) in pairs {
        let entry = PrioritizedSuggestion {
            suggestion_id: suggestion.id,
            flaw_id: flaw.id,
            title: suggestion.title.clone(),
            description: suggestion.description.clone(),
            flaw_title: flaw.title.clone(),
            flaw_severity: flaw.severity,
            implementation_effort: suggestion.implementation_effort,
            expected_impact: suggestion.expected_impact,
            priority: suggestion.priority,
            estimated_time: suggestion.estimated_time.clone(),
        };
        match PriorityBand::of(suggestion.priority) {
            PriorityBand::High => plan.high_priority.push(entry),
            PriorityBand::Medium => plan.medium_priority.push(entry),
            PriorityBand::Low => plan.low_priority.push(entry),
        }
    }

    plan
}

/// Unit an estimate was recognized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Days,
    Weeks,
    Hours,
}

/// Sum free-text estimates such as `"2 days"`, `"1 week"` or `"3 hours"`.
///
/// Only a plain leading integer is understood, so ranges like `"2-3 weeks"`
/// contribute nothing. Weeks count as five working days. When any days were
/// found the hours are not reported.
pub fn estimate_total_time<'a, I>(estimates: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total_days: i64 = 0;
    let mut total_hours: i64 = 0;

    for estimate in estimates {
        let Some((unit, amount)) = parse_estimate(estimate) else {
            continue;
        };
        // An amount too large to convert counts as unparsable; totals saturate.
        match unit {
            TimeUnit::Days => total_days = total_days.saturating_add(amount),
            TimeUnit::Weeks => {
                if let Some(days) = amount.checked_mul(WORKING_DAYS_PER_WEEK) {
                    total_days = total_days.saturating_add(days);
                }
            }
            TimeUnit::Hours => total_hours = total_hours.saturating_add(amount),
        }
    }

    if total_days > 0 {
        format!("{} days", total_days)
    } else if total_hours > 0 {
        format!("{} hours", total_hours)
    } else {
        TIME_NOT_SPECIFIED.to_string()
    }
}

fn parse_estimate(estimate: &str) -> Option<(TimeUnit, i64)> {
    if estimate.is_empty() {
        return None;
    }

    let lowered = estimate.to_lowercase();
    // First match wins: "day" is checked before "week" and "hour".
    let unit = if lowered.contains("day") {
        TimeUnit::Days
    } else if lowered.contains("week") {
        TimeUnit::Weeks
    } else if lowered.contains("hour") {
        TimeUnit::Hours
    } else {
        return None;
    };

    let amount = estimate.split_whitespace().next()?.parse::<i64>().ok()?;
    Some((unit, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlawType;
    use chrono::Utc;

    fn flaw(id: u64, severity: Severity) -> Flaw {
        Flaw {
            id,
            workflow_id: 1,
            flaw_type: FlawType::Bottleneck,
            severity,
            title: format!("flaw {}", id),
            description: String::new(),
            location: String::new(),
            impact_score: 5.0,
            created_at: Utc::now(),
        }
    }

    fn suggestion(id: u64, flaw_id: u64, priority: u8, estimated_time: &str) -> FixSuggestion {
        FixSuggestion {
            id,
            flaw_id,
            title: format!("fix {}", id),
            description: String::new(),
            implementation_effort: Level::Medium,
            expected_impact: Level::Medium,
            priority,
            estimated_time: estimated_time.to_string(),
            created_at: Utc::now(),
        }
    }

    fn by_flaw(suggestions: Vec<FixSuggestion>) -> SuggestionsByFlaw {
        let mut map = SuggestionsByFlaw::new();
        for s in suggestions {
            map.entry(s.flaw_id).or_default().push(s);
        }
        map
    }

    #[test]
    fn test_days_take_precedence_over_hours() {
        assert_eq!(estimate_total_time(["2 days", "3 hours"]), "2 days");
    }

    #[test]
    fn test_week_is_five_days() {
        assert_eq!(estimate_total_time(["1 week"]), "5 days");
        assert_eq!(estimate_total_time(["2 Weeks", "1 day"]), "11 days");
    }

    #[test]
    fn test_hours_only() {
        assert_eq!(estimate_total_time(["3 hours", "4 HOURS"]), "7 hours");
    }

    #[test]
    fn test_nothing_usable_is_not_specified() {
        assert_eq!(estimate_total_time(Vec::<&str>::new()), TIME_NOT_SPECIFIED);
        assert_eq!(estimate_total_time(["2-3 weeks", "soon", ""]), TIME_NOT_SPECIFIED);
    }

    #[test]
    fn test_huge_estimates_do_not_overflow() {
        assert_eq!(estimate_total_time(["9223372036854775807 weeks"]), TIME_NOT_SPECIFIED);
        assert_eq!(
            estimate_total_time(["9223372036854775807 weeks", "2 days"]),
            "2 days"
        );
        assert_eq!(
            estimate_total_time(["9223372036854775807 days", "9223372036854775807 days"]),
            format!("{} days", i64::MAX)
        );
        assert_eq!(
            estimate_total_time(["9223372036854775807 hours", "1 hour"]),
            format!("{} hours", i64::MAX)
        );
    }

    #[test]
    fn test_mock_estimates_total() {
        let total = estimate_total_time(["2-3 weeks", "1-2 weeks", "1 week", "2-3 days"]);
        assert_eq!(total, "5 days");
    }

    #[test]
    fn test_priority_bands() {
        assert_eq!(PriorityBand::of(1), PriorityBand::High);
        assert_eq!(PriorityBand::of(2), PriorityBand::High);
        assert_eq!(PriorityBand::of(3), PriorityBand::Medium);
        assert_eq!(PriorityBand::of(4), PriorityBand::Low);
        assert_eq!(PriorityBand::of(5), PriorityBand::Low);
    }

    #[test]
    fn test_empty_flaws_plan() {
        let plan = build_plan(&[], &SuggestionsByFlaw::new());
        assert!(plan.fix_plan.is_empty());
        assert_eq!(plan.summary.total_suggestions, 0);
        assert_eq!(plan.summary.estimated_total_time, "0 hours");
    }

    #[test]
    fn test_flaws_without_suggestions_plan() {
        let plan = build_plan(&[flaw(1, Severity::High)], &SuggestionsByFlaw::new());
        assert_eq!(plan.fix_plan.len(), 1);
        assert!(plan.fix_plan[0].suggestions.is_empty());
        assert_eq!(plan.summary.estimated_total_time, "Time not specified");
    }

    #[test]
    fn test_plan_summary_counts() {
        let flaws = vec![flaw(1, Severity::High), flaw(2, Severity::Low)];
        let suggestions = by_flaw(vec![
            suggestion(1, 1, 1, "1 week"),
            suggestion(2, 1, 3, "2 days"),
            suggestion(3, 2, 5, "4 hours"),
        ]);
        let plan = build_plan(&flaws, &suggestions);
        assert_eq!(plan.fix_plan[0].suggestions.len(), 2);
        assert_eq!(plan.summary.total_suggestions, 3);
        assert_eq!(plan.summary.high_priority, 1);
        assert_eq!(plan.summary.medium_priority, 1);
        assert_eq!(plan.summary.low_priority, 1);
        assert_eq!(plan.summary.estimated_total_time, "7 days");
    }

    #[test]
    fn test_prioritized_sort_uses_severity_as_tiebreak() {
        let flaws = vec![
            flaw(1, Severity::Low),
            flaw(2, Severity::Critical),
            flaw(3, Severity::Unknown),
            flaw(4, Severity::High),
        ];
        let suggestions = by_flaw(vec![
            suggestion(10, 1, 1, ""),
            suggestion(20, 2, 1, ""),
            suggestion(30, 3, 1, ""),
            suggestion(40, 4, 2, ""),
            suggestion(50, 4, 4, ""),
        ]);
        let plan = build_prioritized(&flaws, &suggestions);

        let high: Vec<u64> = plan.high_priority.iter().map(|s| s.suggestion_id).collect();
        assert_eq!(high, vec![20, 10, 30, 40]);
        assert!(plan.medium_priority.is_empty());
        assert_eq!(plan.band(PriorityBand::Low)[0].suggestion_id, 50);
        assert_eq!(plan.total_suggestions, 5);
        assert_eq!(plan.high_priority[0].flaw_title, "flaw 2");
    }
}
