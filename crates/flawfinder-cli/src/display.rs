use colored::*;
use flawfinder_core::dashboard::{CategoryChart, DashboardCharts, DashboardStats};
use flawfinder_core::fix_plan::PrioritizedSuggestion;
use flawfinder_core::model::{FixSuggestion, Flaw, WorkflowStatus};
use flawfinder_core::report::Report;
use flawfinder_core::service::{
    AnalysisResponse, AnalysisStatus, FlawSuggestions, UploadResponse, WorkflowFixPlan,
    WorkflowPrioritizedPlan, WorkflowSummary,
};
use flawfinder_core::workflow::chain::StepChain;
use flawfinder_core::Severity;
use std::path::Path;

fn header(title: String) {
    println!();
    println!("{}", format!(" FlawFinder v{} - {}", env!("CARGO_PKG_VERSION"), title).bold());
    println!();
}

fn separator() {
    println!(" {}", "=".repeat(60).dimmed());
    println!();
}

fn severity_badge(severity: Severity) -> String {
    let tag = format!(" {} ", severity.symbol());
    match severity {
        Severity::Critical => tag.on_red().white().bold().to_string(),
        Severity::High => tag.on_yellow().black().bold().to_string(),
        Severity::Medium => tag.on_blue().white().bold().to_string(),
        Severity::Low | Severity::Unknown => tag.dimmed().to_string(),
    }
}

fn status_label(status: WorkflowStatus) -> ColoredString {
    match status {
        WorkflowStatus::Uploaded => status.as_str().cyan(),
        WorkflowStatus::Processing => status.as_str().yellow(),
        WorkflowStatus::Analyzed => status.as_str().green(),
        WorkflowStatus::Failed => status.as_str().red().bold(),
    }
}

/// Brutality score out of 10, coloured by how bad it is.
fn brutality(score: f64) -> ColoredString {
    let text = format!("{:.1}/10", score);
    if score >= 8.0 {
        text.red().bold()
    } else if score >= 5.0 {
        text.yellow().bold()
    } else {
        text.green().bold()
    }
}

pub fn print_upload(file: &Path, upload: &UploadResponse, chain: &StepChain) {
    header(format!("Uploaded {}", file.display()));

    println!(" {} Workflow id: {}", "|-".dimmed(), upload.workflow_id.to_string().bold());
    println!(" {} Steps: {}", "|-".dimmed(), chain.len());
    if !chain.is_empty() {
        println!(" {} Flow: {}", "|-".dimmed(), chain.render(" -> "));
    }
    println!();
    println!(
        " Run {} to find its flaws",
        format!("flawfinder analyze {}", upload.workflow_id).cyan()
    );
    println!();
}

pub fn print_workflows(workflows: &[WorkflowSummary]) {
    header("Workflows".to_string());

    if workflows.is_empty() {
        println!(
            " No workflows yet. Run {} to add one.",
            "flawfinder upload <path>".cyan()
        );
        println!();
        return;
    }

    println!(
        " {:>4}  {:<32} {:<5} {:<11} {}",
        "ID".bold(),
        "Name".bold(),
        "Type".bold(),
        "Status".bold(),
        "Created".bold()
    );
    for workflow in workflows {
        println!(
            " {:>4}  {:<32} {:<5} {:<11} {}",
            workflow.id,
            workflow.name,
            workflow.file_type.as_str(),
            status_label(workflow.status),
            workflow.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    println!();
}

fn print_flaw(flaw: &Flaw) {
    println!(
        " {} {} {}",
        severity_badge(flaw.severity),
        flaw.title.bold(),
        format!("#{}", flaw.id).dimmed()
    );
    println!("   {} {}", "|".dimmed(), flaw.description);
    println!(
        "   {} Type: {} | Impact: {:.1}/10",
        "|".dimmed(),
        flaw.flaw_type.label(),
        flaw.impact_score
    );
    if !flaw.location.is_empty() {
        println!("   {} Location: {}", "|".dimmed(), flaw.location.dimmed());
    }
}

fn print_suggestion(suggestion: &FixSuggestion) {
    println!(
        "   {} {} {}",
        "->".green(),
        suggestion.title.green(),
        format!("(P{}, {})", suggestion.priority, suggestion.estimated_time).dimmed()
    );
    println!("      {}", suggestion.description.dimmed());
    println!(
        "      Effort: {} | Impact: {}",
        suggestion.implementation_effort, suggestion.expected_impact
    );
}

pub fn print_analysis(analysis: &AnalysisResponse) {
    header(format!("Analysis of workflow #{}", analysis.workflow_id));

    if analysis.flaws.is_empty() {
        println!(
            " {} No significant flaws detected. Your workflow looks good!",
            "OK".green().bold()
        );
        println!();
        return;
    }

    for flaw in &analysis.flaws {
        print_flaw(flaw);
        for suggestion in analysis.fix_suggestions.iter().filter(|s| s.flaw_id == flaw.id) {
            print_suggestion(suggestion);
        }
        println!();
    }

    separator();

    println!(" {}", "Summary".bold().underline());
    println!(" {} Flaws found:      {}", "|-".dimmed(), analysis.total_flaws);
    println!(" {} Brutality score:  {}", "|-".dimmed(), brutality(analysis.brutality_score));
    if analysis.processing_time > 0.0 {
        println!(
            " {} Processing time:  {:.3}s",
            "|-".dimmed(),
            analysis.processing_time
        );
    }
    println!();
    println!(
        " Run {} for a plan of attack",
        format!("flawfinder fix-plan {}", analysis.workflow_id).cyan()
    );
    println!();
}

pub fn print_status(status: &AnalysisStatus) {
    println!(
        " Workflow #{}: {} {}",
        status.workflow_id,
        status_label(status.status),
        format!("(updated {})", status.updated_at.format("%Y-%m-%d %H:%M:%S")).dimmed()
    );
}

pub fn print_fix_plan(plan: &WorkflowFixPlan) {
    header(format!("Fix plan for {}", plan.workflow_name));

    for entry in &plan.plan.fix_plan {
        print_flaw(&entry.flaw);
        if entry.suggestions.is_empty() {
            println!("   {} {}", "->".dimmed(), "No suggestions".dimmed());
        }
        for suggestion in &entry.suggestions {
            print_suggestion(suggestion);
        }
        println!();
    }

    separator();

    let summary = &plan.plan.summary;
    println!(" {}", "Summary".bold().underline());
    println!(" {} Suggestions:        {}", "|-".dimmed(), summary.total_suggestions);
    println!(
        " {} By priority:        {} high, {} medium, {} low",
        "|-".dimmed(),
        if summary.high_priority > 0 {
            summary.high_priority.to_string().red().bold().to_string()
        } else {
            "0".to_string()
        },
        summary.medium_priority,
        summary.low_priority
    );
    println!(
        " {} Estimated effort:   {}",
        "|-".dimmed(),
        summary.estimated_total_time.cyan()
    );
    println!();
}

fn print_band(title: &str, suggestions: &[PrioritizedSuggestion]) {
    println!(" {} ({})", title.bold().underline(), suggestions.len());
    if suggestions.is_empty() {
        println!("   {}", "none".dimmed());
    }
    for s in suggestions {
        println!(
            "   {} {} {}",
            severity_badge(s.flaw_severity),
            s.title.bold(),
            format!("(P{}, {})", s.priority, s.estimated_time).dimmed()
        );
        println!("      {} {}", "fixes".dimmed(), s.flaw_title);
    }
    println!();
}

pub fn print_prioritized_plan(plan: &WorkflowPrioritizedPlan) {
    header(format!("Prioritized fixes for {}", plan.workflow_name));
    print_band("High priority", &plan.plan.high_priority);
    print_band("Medium priority", &plan.plan.medium_priority);
    print_band("Low priority", &plan.plan.low_priority);
    println!(" {} suggestions in total", plan.plan.total_suggestions);
    println!();
}

pub fn print_flaw_suggestions(flaw: &FlawSuggestions) {
    println!();
    println!(" {} {}", severity_badge(flaw.flaw_severity), flaw.flaw_title.bold());
    if flaw.suggestions.is_empty() {
        println!("   {} {}", "->".dimmed(), "No suggestions".dimmed());
    }
    for suggestion in &flaw.suggestions {
        print_suggestion(suggestion);
    }
    println!();
}

pub fn print_report(report: &Report) {
    header(format!("Executive report for workflow #{}", report.workflow_id));

    println!(" {}", report.executive_summary);
    println!();
    separator();

    println!(" {}", "Findings".bold().underline());
    println!(
        " {} {} critical, {} high, {} medium, {} low ({} total)",
        "|-".dimmed(),
        if report.critical_flaws > 0 {
            report.critical_flaws.to_string().red().bold().to_string()
        } else {
            "0".to_string()
        },
        if report.high_flaws > 0 {
            report.high_flaws.to_string().yellow().bold().to_string()
        } else {
            "0".to_string()
        },
        report.medium_flaws,
        report.low_flaws,
        report.total_flaws
    );
    println!(" {} Brutality score:       {}", "|-".dimmed(), brutality(report.brutality_score));
    println!(
        " {} Improvement potential: {:.1}%",
        "|-".dimmed(),
        report.improvement_percentage
    );
    println!();

    let recs = &report.recommendations;
    for (title, suggestions) in [
        ("Immediate actions", &recs.immediate_actions),
        ("Short-term improvements", &recs.short_term_improvements),
        ("Long-term optimizations", &recs.long_term_optimizations),
    ] {
        if suggestions.is_empty() {
            continue;
        }
        println!(" {}", title.bold().underline());
        for suggestion in suggestions {
            println!("   {} {}", "->".green(), suggestion.title);
        }
        println!();
    }

    println!(" {} Estimated total time: {}", "|-".dimmed(), recs.estimated_total_time.cyan());
    println!(" {} Expected ROI:         {}", "|-".dimmed(), recs.expected_roi.green());
    println!();
}

pub fn print_dashboard(stats: &DashboardStats) {
    header("Dashboard".to_string());

    println!(" {} Workflows:              {}", "|-".dimmed(), stats.total_workflows);
    println!(" {} Flaws:                  {}", "|-".dimmed(), stats.total_flaws);
    println!(
        " {} Average brutality score: {}",
        "|-".dimmed(),
        brutality(stats.avg_brutality_score)
    );
    println!();

    if !stats.severity_distribution.is_empty() {
        println!(" {}", "Severity".bold().underline());
        for severity in Severity::KNOWN {
            let count = stats.severity_distribution.get(severity.as_str()).copied().unwrap_or(0);
            println!("   {} {}", severity_badge(severity), count);
        }
        println!();
    }

    if !stats.flaw_distribution.is_empty() {
        println!(" {}", "Flaw types".bold().underline());
        for (flaw_type, count) in &stats.flaw_distribution {
            println!("   {:<16} {}", flaw_type, count);
        }
        println!();
    }

    if !stats.recent_workflows.is_empty() {
        println!(" {}", "Recent workflows".bold().underline());
        for workflow in &stats.recent_workflows {
            println!(
                "   {} #{} {} {}",
                "|-".dimmed(),
                workflow.id,
                workflow.name,
                status_label(workflow.status)
            );
        }
        println!();
    }
}

fn print_category(title: &str, chart: &CategoryChart) {
    println!(" {}", title.bold().underline());
    if chart.labels.is_empty() {
        println!("   {}", "no data".dimmed());
    }
    let max = chart.data.iter().copied().max().unwrap_or(0).max(1);
    for (label, count) in chart.labels.iter().zip(&chart.data) {
        let bar = "#".repeat((count * 30).div_ceil(max));
        println!("   {:<16} {:>4} {}", label, count, bar.cyan());
    }
    println!();
}

pub fn print_charts(charts: &DashboardCharts) {
    header("Charts".to_string());

    print_category("Flaw types", &charts.flaw_types_pie);
    print_category("Severity", &charts.severity_distribution);
    print_category("Workflow status", &charts.workflow_status_pie);

    println!(" {}", "Flaws over time".bold().underline());
    for (date, count) in charts.flaws_over_time.labels.iter().zip(&charts.flaws_over_time.data) {
        println!("   {} {:>4}", date.dimmed(), count);
    }
    println!();

    println!(" {}", "Brutality trend".bold().underline());
    for (date, score) in charts
        .brutality_score_trend
        .labels
        .iter()
        .zip(&charts.brutality_score_trend.data)
    {
        println!("   {} {}", date.dimmed(), brutality(*score));
    }
    println!();
}

pub fn print_deleted(workflow_id: u64) {
    println!(" {} Workflow #{} deleted", "OK".green().bold(), workflow_id);
}
