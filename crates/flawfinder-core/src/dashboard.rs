//! Per-user dashboard statistics and chart series.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Flaw, Workflow};
use crate::scoring::{self, Severity, SeverityCounts};

/// Number of workflows listed under "recent".
pub const RECENT_WORKFLOWS: usize = 5;

const PIE_COLORS: [&str; 8] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40", "#FF6384", "#C9CBCF",
];
const STATUS_COLORS: [&str; 6] = ["#36A2EB", "#FFCE56", "#4BC0C0", "#FF6384", "#9966FF", "#FF9F40"];
const SEVERITY_LABELS: [&str; 4] = ["Critical", "High", "Medium", "Low"];
const SEVERITY_COLORS: [&str; 4] = ["#FF4444", "#FF8800", "#FFCC00", "#44FF44"];
const FLAWS_OVER_TIME_COLOR: &str = "#36A2EB";
const BRUTALITY_TREND_COLOR: &str = "#FF6384";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_workflows: usize,
    pub total_flaws: usize,
    pub avg_brutality_score: f64,
    pub recent_workflows: Vec<Workflow>,
    pub flaw_distribution: BTreeMap<String, usize>,
    pub severity_distribution: BTreeMap<String, usize>,
}

/// Labelled counts with one colour per label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChart {
    pub labels: Vec<String>,
    pub data: Vec<usize>,
    pub colors: Vec<String>,
}

/// A single series over dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChart<T> {
    pub labels: Vec<String>,
    pub data: Vec<T>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCharts {
    pub flaw_types_pie: CategoryChart,
    pub severity_distribution: CategoryChart,
    pub workflow_status_pie: CategoryChart,
    pub flaws_over_time: LineChart<usize>,
    pub brutality_score_trend: LineChart<f64>,
}

/// Aggregate statistics over a user's workflows and all of their flaws.
pub fn dashboard_stats(workflows: &[Workflow], flaws: &[Flaw]) -> DashboardStats {
    let mut recent: Vec<Workflow> = workflows.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(RECENT_WORKFLOWS);

    let mut flaw_distribution = BTreeMap::new();
    for flaw in flaws {
        *flaw_distribution.entry(flaw.flaw_type.as_str().to_string()).or_insert(0) += 1;
    }

    let counts = SeverityCounts::tally(flaws.iter().map(|f| f.severity));
    let severity_distribution = Severity::KNOWN
        .iter()
        .map(|s| (s.as_str().to_string(), counts.get(*s)))
        .collect();

    DashboardStats {
        total_workflows: workflows.len(),
        total_flaws: flaws.len(),
        avg_brutality_score: scoring::brutality_score(flaws.iter().map(|f| f.severity)),
        recent_workflows: recent,
        flaw_distribution,
        severity_distribution,
    }
}

pub fn dashboard_charts(workflows: &[Workflow], flaws: &[Flaw]) -> DashboardCharts {
    DashboardCharts {
        flaw_types_pie: category_chart(
            count_in_order(flaws.iter().map(|f| f.flaw_type.as_str())),
            &PIE_COLORS,
        ),
        severity_distribution: severity_chart(flaws),
        workflow_status_pie: category_chart(
            count_in_order(workflows.iter().map(|w| w.status.as_str())),
            &STATUS_COLORS,
        ),
        flaws_over_time: flaws_over_time(flaws),
        brutality_score_trend: brutality_trend(workflows, flaws),
    }
}

// Counts keyed by first appearance.
fn count_in_order<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key.to_string(), 1)),
        }
    }
    counts
}

fn category_chart(counts: Vec<(String, usize)>, palette: &[&str]) -> CategoryChart {
    let colors = palette
        .iter()
        .take(counts.len())
        .map(|c| c.to_string())
        .collect();
    let (labels, data) = counts.into_iter().unzip();
    CategoryChart {
        labels,
        data,
        colors,
    }
}

fn severity_chart(flaws: &[Flaw]) -> CategoryChart {
    let counts = SeverityCounts::tally(flaws.iter().map(|f| f.severity));
    CategoryChart {
        labels: SEVERITY_LABELS.iter().map(|l| l.to_string()).collect(),
        data: Severity::KNOWN.iter().map(|s| counts.get(*s)).collect(),
        colors: SEVERITY_COLORS.iter().map(|c| c.to_string()).collect(),
    }
}

fn flaws_over_time(flaws: &[Flaw]) -> LineChart<usize> {
    let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
    for flaw in flaws {
        *per_day.entry(iso_date(flaw.created_at)).or_insert(0) += 1;
    }
    let (labels, data) = per_day.into_iter().unzip();
    LineChart {
        labels,
        data,
        color: FLAWS_OVER_TIME_COLOR.to_string(),
    }
}

/// One point per creation date; a later workflow on the same date replaces
/// the earlier one.
fn brutality_trend(workflows: &[Workflow], flaws: &[Flaw]) -> LineChart<f64> {
    let mut per_day: BTreeMap<String, f64> = BTreeMap::new();
    for workflow in workflows {
        let severities: Vec<Severity> = flaws
            .iter()
            .filter(|f| f.workflow_id == workflow.id)
            .map(|f| f.severity)
            .collect();
        if severities.is_empty() {
            continue;
        }
        per_day.insert(
            iso_date(workflow.created_at),
            scoring::brutality_score(severities),
        );
    }
    let (labels, data) = per_day.into_iter().unzip();
    LineChart {
        labels,
        data,
        color: BRUTALITY_TREND_COLOR.to_string(),
    }
}

fn iso_date(at: chrono::DateTime<chrono::Utc>) -> String {
    at.date_naive().format("%Y-%m-%d").to_string()
}
