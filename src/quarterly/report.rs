use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Write;
use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;

use super::format::{
    capitalize, display_text, format_count, format_duration, format_failure_rate,
    format_percentage, link_issue_references, truncate,
};
use super::frequency::{determine_frequency, FrequencyThresholds};
use super::statistics::{ranked, status_total, Counts, StatisticsBundle};
use crate::error::Result;

const TOP_ENTITIES: usize = 15;
const TOP_TRENDS: usize = 5;
const TOP_COMPONENTS: usize = 20;
const TOP_REASONS: usize = 20;
const TREND_WEEKS: usize = 20;
const DOMINANT_REASON_CHARS: usize = 80;
const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Who and when a report is about.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub remoteci_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub generated_at: NaiveDateTime,
}

impl ReportContext {
    /// Context stamped with the current local time.
    pub fn new(remoteci_name: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            remoteci_name: remoteci_name.into(),
            start,
            end,
            generated_at: Local::now().naive_local(),
        }
    }
}

/// Knobs for report rendering.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub days_in_period: u32,
    pub thresholds: FrequencyThresholds,
    /// Characters of a failure reason shown before it is cut.
    pub reason_truncate: usize,
    /// Characters of a component name shown before it is cut.
    pub component_truncate: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            days_in_period: 90,
            thresholds: FrequencyThresholds::default(),
            reason_truncate: 100,
            component_truncate: 80,
        }
    }
}

/// Failure-rate ranking entry for one pipeline or topic.
#[derive(Debug, Clone, PartialEq)]
struct RateRow<'a> {
    name: &'a str,
    total: usize,
    failure_rate: f64,
    failures: usize,
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Highest count, keeping the first entry among equals.
fn top_entry(counts: &Counts) -> Option<(&str, usize)> {
    counts.iter().fold(None, |best, (name, &count)| match best {
        Some((_, best_count)) if best_count >= count => best,
        _ => Some((name.as_str(), count)),
    })
}

fn status_of(status: Option<&Counts>, key: &str) -> usize {
    status.and_then(|s| s.get(key)).copied().unwrap_or(0)
}

/// Leading `max_chars` characters of `text`, never split mid-character.
fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[allow(clippy::cast_precision_loss)]
fn failure_rows<'a>(counts: &'a Counts, status: &IndexMap<String, Counts>) -> Vec<RateRow<'a>> {
    let mut rows: Vec<RateRow<'a>> = counts
        .iter()
        .filter_map(|(name, &count)| {
            let stat = status.get(name);
            let total = status_total(stat, count);
            if total == 0 {
                return None;
            }
            let failures = status_of(stat, "failure") + status_of(stat, "error");
            Some(RateRow {
                name,
                total,
                failure_rate: failures as f64 / total as f64 * 100.0,
                failures,
            })
        })
        .collect();
    rows.sort_by(|a, b| cmp_f64(b.failure_rate, a.failure_rate));
    rows
}

/// Renders the quarterly report as markdown. Same inputs, same output.
pub fn render_report(
    stats: &StatisticsBundle,
    ctx: &ReportContext,
    settings: &ReportSettings,
) -> String {
    let pipeline_rates = failure_rows(&stats.pipeline_counts, &stats.pipeline_status);
    let topic_rates = failure_rows(&stats.topic_counts, &stats.topic_status);

    let mut out = String::new();
    write_header(&mut out, ctx, settings);
    write_executive_summary(&mut out, stats, ctx);
    write_overall_statistics(&mut out, stats, settings);
    write_pipeline_analysis(&mut out, stats, settings, &pipeline_rates);
    write_topic_analysis(&mut out, stats, &topic_rates);
    write_component_usage(&mut out, stats, settings);
    write_failure_analysis(&mut out, stats, settings);
    write_time_trends(&mut out, stats);
    write_development_activity(&mut out, stats);
    write_anomalies(&mut out, stats, &pipeline_rates);
    write_recommendations(&mut out, stats, settings, &pipeline_rates, &topic_rates);
    out
}

/// Renders the report and writes it to `output_path`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns error if the directory or file cannot be written.
pub fn generate_report(
    stats: &StatisticsBundle,
    ctx: &ReportContext,
    settings: &ReportSettings,
    output_path: &Path,
) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, render_report(stats, ctx, settings))?;
    Ok(())
}

fn write_header(out: &mut String, ctx: &ReportContext, settings: &ReportSettings) {
    let _ = writeln!(out, "# Quarterly DCI Analysis Report: {}\n", ctx.remoteci_name);
    let _ = writeln!(
        out,
        "**Period:** {} - {} ({} days)",
        ctx.start.format("%B %d, %Y"),
        ctx.end.format("%B %d, %Y"),
        settings.days_in_period
    );
    let _ = writeln!(out, "**Generated:** {}", ctx.generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**RemoteCI:** {}", ctx.remoteci_name);
}

fn write_executive_summary(out: &mut String, stats: &StatisticsBundle, ctx: &ReportContext) {
    let _ = writeln!(out, "\n## 1. Executive Summary\n");
    let _ = writeln!(
        out,
        "This report analyzes **{}** DCI jobs executed on {} remoteci over the last quarter.",
        format_count(stats.total_jobs),
        ctx.remoteci_name
    );

    let _ = writeln!(out, "\n### Key Metrics:");
    let _ = writeln!(out, "- **Overall Success Rate:** {:.2}%", stats.success_rate);
    let _ = writeln!(out, "- **Overall Failure Rate:** {:.2}%", stats.failure_rate);
    let _ = writeln!(out, "- **Total Jobs:** {}", format_count(stats.total_jobs));
    let _ = writeln!(out, "- **Successful Jobs:** {}", format_count(stats.success_count));
    let _ = writeln!(out, "- **Failed Jobs:** {}", format_count(stats.failure_count));
    let _ = writeln!(out, "- **Error Jobs:** {}", format_count(stats.error_count));

    let _ = writeln!(out, "\n### Key Highlights:");
    if stats.success_rate < 50.0 {
        let _ = writeln!(
            out,
            "- ⚠️ **Low Success Rate:** Success rate below 50%, indicating significant reliability issues"
        );
    } else {
        let _ = writeln!(
            out,
            "- ✅ **Moderate Success Rate:** Success rate above 50%, but room for improvement"
        );
    }
    if let Some((name, count)) = top_entry(&stats.pipeline_counts) {
        let _ = writeln!(out, "- 📊 **Most Active Pipeline:** {name} with {count} jobs");
    }
    if let Some((name, count)) = top_entry(&stats.topic_counts) {
        let _ = writeln!(out, "- 🎯 **Most Active Topic:** {name} with {count} jobs");
    }
    if let Some((reason, count)) = top_entry(&stats.status_reasons) {
        let _ = writeln!(
            out,
            "- ❌ **Top Failure Reason:** {} ({count} occurrences)",
            link_issue_references(reason)
        );
    }
}

#[allow(clippy::cast_precision_loss)]
fn write_overall_statistics(out: &mut String, stats: &StatisticsBundle, settings: &ReportSettings) {
    let _ = writeln!(out, "\n## 2. Overall Statistics\n");
    let _ = writeln!(out, "### Job Status Breakdown\n");
    let _ = writeln!(out, "| Status | Count | Percentage |");
    let _ = writeln!(out, "|--------|-------|------------|");
    for (label, count) in [
        ("Success", stats.success_count),
        ("Failure", stats.failure_count),
        ("Error", stats.error_count),
        ("Killed", stats.status_count("killed")),
        ("Running", stats.status_count("running")),
    ] {
        let _ = writeln!(
            out,
            "| {label} | {} | {} |",
            format_count(count),
            format_percentage(count, stats.total_jobs)
        );
    }
    let _ = writeln!(out, "| **Total** | **{}** | **100%** |", format_count(stats.total_jobs));

    let per_day = if settings.days_in_period == 0 {
        0.0
    } else {
        stats.total_jobs as f64 / f64::from(settings.days_in_period)
    };
    let _ = writeln!(out, "\n### Performance Metrics");
    let _ = writeln!(out, "- **Average Job Duration:** {}", format_duration(stats.avg_duration));
    let _ = writeln!(out, "- **Time Period Covered:** {} days", settings.days_in_period);
    let _ = writeln!(out, "- **Average Jobs per Day:** {per_day:.1}");
}

fn write_failure_rate_table(out: &mut String, heading: &str, column: &str, rows: &[RateRow<'_>]) {
    let _ = writeln!(out, "\n### {heading} Sorted by Failure Rate (Highest First)\n");
    let _ = writeln!(out, "| {column} | Total Jobs | Failure Rate | Failure Count |");
    let _ = writeln!(out, "|{}|------------|--------------|---------------|", "-".repeat(column.len() + 2));
    for row in rows.iter().take(TOP_ENTITIES) {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2}% | {} |",
            row.name,
            format_count(row.total),
            row.failure_rate,
            format_count(row.failures)
        );
    }
}

/// Weekly or monthly job counts of the top entries, one column per entry.
fn write_trend_table(
    out: &mut String,
    label: &str,
    top: &[(&str, usize)],
    table: &IndexMap<String, Counts>,
) {
    let periods: BTreeSet<&str> = top
        .iter()
        .filter_map(|(name, _)| table.get(*name))
        .flat_map(|counts| counts.keys().map(String::as_str))
        .collect();
    if periods.is_empty() {
        return;
    }

    let names: Vec<&str> = top.iter().map(|(name, _)| *name).collect();
    let _ = writeln!(out, "| {label} | {} |", names.join(" | "));
    let _ = writeln!(
        out,
        "|{}|{}|",
        "-".repeat(label.len() + 2),
        vec!["---"; names.len()].join("|")
    );
    for period in periods {
        let cells: Vec<String> = names
            .iter()
            .map(|name| {
                table
                    .get(*name)
                    .and_then(|counts| counts.get(period))
                    .copied()
                    .unwrap_or(0)
                    .to_string()
            })
            .collect();
        let _ = writeln!(out, "| {period} | {} |", cells.join(" | "));
    }
}

fn write_trends(
    out: &mut String,
    kind: &str,
    counts: &Counts,
    weekly: &IndexMap<String, Counts>,
    monthly: &IndexMap<String, Counts>,
) {
    if weekly.is_empty() {
        return;
    }
    let lower = kind.to_lowercase();
    let top: Vec<(&str, usize)> = ranked(counts).into_iter().take(TOP_TRENDS).collect();

    let _ = writeln!(out, "\n### {kind} Frequency Trends (Weekly)\n");
    let _ = writeln!(out, "Frequency of top {lower}s over time:\n");
    write_trend_table(out, "Week", &top, weekly);

    if !monthly.is_empty() {
        let _ = writeln!(out, "\n### {kind} Frequency Trends (Monthly)\n");
        let _ = writeln!(out, "Frequency of top {lower}s by month:\n");
        write_trend_table(out, "Month", &top, monthly);
    }
}

fn write_pipeline_analysis(
    out: &mut String,
    stats: &StatisticsBundle,
    settings: &ReportSettings,
    rates: &[RateRow<'_>],
) {
    let _ = writeln!(out, "\n## 3. Pipeline Analysis\n");
    let _ = writeln!(out, "### Top Pipelines by Job Count\n");
    let _ = writeln!(
        out,
        "| Pipeline Name | Total Jobs | Frequency | Success | Failure | Error | Success Rate | Failure Rate |"
    );
    let _ = writeln!(
        out,
        "|---------------|------------|-----------|---------|---------|-------|--------------|--------------|"
    );
    for (name, count) in ranked(&stats.pipeline_counts).into_iter().take(TOP_ENTITIES) {
        let stat = stats.pipeline_status.get(name);
        let (success, failure, error) = (
            status_of(stat, "success"),
            status_of(stat, "failure"),
            status_of(stat, "error"),
        );
        let total = status_total(stat, count);
        let frequency = determine_frequency(
            stats.pipeline_weekly_counts.get(name),
            stats.pipeline_monthly_counts.get(name),
            count,
            settings.days_in_period,
            &settings.thresholds,
        );
        let _ = writeln!(
            out,
            "| {name} | {} | {frequency} | {} | {} | {} | {} | {} |",
            format_count(count),
            format_count(success),
            format_count(failure),
            format_count(error),
            format_percentage(success, total),
            format_failure_rate(failure, error, total)
        );
    }

    write_failure_rate_table(out, "Pipelines", "Pipeline Name", rates);
    write_trends(
        out,
        "Pipeline",
        &stats.pipeline_counts,
        &stats.pipeline_weekly_counts,
        &stats.pipeline_monthly_counts,
    );
}

fn write_topic_analysis(out: &mut String, stats: &StatisticsBundle, rates: &[RateRow<'_>]) {
    let _ = writeln!(out, "\n## 4. Topic Analysis\n");
    let _ = writeln!(out, "### Top Topics by Job Count\n");
    let _ = writeln!(
        out,
        "| Topic Name | Total Jobs | Success | Failure | Error | Success Rate | Failure Rate |"
    );
    let _ = writeln!(
        out,
        "|------------|------------|---------|---------|-------|--------------|--------------|"
    );
    for (name, count) in ranked(&stats.topic_counts).into_iter().take(TOP_ENTITIES) {
        let stat = stats.topic_status.get(name);
        let (success, failure, error) = (
            status_of(stat, "success"),
            status_of(stat, "failure"),
            status_of(stat, "error"),
        );
        let total = status_total(stat, count);
        let _ = writeln!(
            out,
            "| {name} | {} | {} | {} | {} | {} | {} |",
            format_count(count),
            format_count(success),
            format_count(failure),
            format_count(error),
            format_percentage(success, total),
            format_failure_rate(failure, error, total)
        );
    }

    write_failure_rate_table(out, "Topics", "Topic Name", rates);
    write_trends(
        out,
        "Topic",
        &stats.topic_counts,
        &stats.topic_weekly_counts,
        &stats.topic_monthly_counts,
    );
}

fn write_component_usage(out: &mut String, stats: &StatisticsBundle, settings: &ReportSettings) {
    let _ = writeln!(out, "\n## 5. Component Usage Analysis\n");
    let _ = writeln!(out, "### Most Used Components\n");
    let _ = writeln!(out, "| Component Name | Usage Count |");
    let _ = writeln!(out, "|----------------|-------------|");
    for (name, count) in ranked(&stats.component_counts).into_iter().take(TOP_COMPONENTS) {
        let _ = writeln!(
            out,
            "| {} | {} |",
            truncate(name, settings.component_truncate),
            format_count(count)
        );
    }

    let _ = writeln!(out, "\n### Component Types Distribution\n");
    let _ = writeln!(out, "| Component Type | Count |");
    let _ = writeln!(out, "|----------------|-------|");
    for (kind, count) in ranked(&stats.component_types) {
        let _ = writeln!(out, "| {kind} | {} |", format_count(count));
    }
}

fn write_failure_analysis(out: &mut String, stats: &StatisticsBundle, settings: &ReportSettings) {
    let total_failures = stats.failure_count + stats.error_count;

    let _ = writeln!(out, "\n## 6. Failure Analysis\n");
    let _ = writeln!(out, "### Top Failure Reasons\n");
    let _ = writeln!(out, "| Failure Reason | Count | Percentage |");
    let _ = writeln!(out, "|----------------|-------|------------|");
    for (reason, &count) in stats.status_reasons.iter().take(TOP_REASONS) {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            display_text(reason, settings.reason_truncate),
            format_count(count),
            format_percentage(count, total_failures)
        );
    }

    let _ = writeln!(out, "\n### Failure Rate Trends\n");
    let _ = writeln!(out, "The failure rate over the quarter shows the following patterns:");
    let _ = writeln!(out, "\n#### Weekly Failure Rates\n");
    let _ = writeln!(
        out,
        "| Week | Total Jobs | Success | Failure+Error | Success Rate | Failure Rate |"
    );
    let _ = writeln!(
        out,
        "|------|------------|---------|---------------|--------------|--------------|"
    );
    let mut weeks: Vec<(&String, &usize)> = stats.weekly_counts.iter().collect();
    weeks.sort_by(|a, b| a.0.cmp(b.0));
    for (week, &count) in weeks.into_iter().take(TREND_WEEKS) {
        let outcome = stats.weekly_status.get(week).copied().unwrap_or_default();
        let total = if count > 0 {
            count
        } else {
            outcome.success + outcome.failure
        };
        if total == 0 {
            continue;
        }
        let _ = writeln!(
            out,
            "| {week} | {} | {} | {} | {} | {} |",
            format_count(total),
            format_count(outcome.success),
            format_count(outcome.failure),
            format_percentage(outcome.success, total),
            format_failure_rate(outcome.failure, 0, total)
        );
    }
}

fn write_time_trends(out: &mut String, stats: &StatisticsBundle) {
    let _ = writeln!(out, "\n## 7. Time-based Trends and Patterns\n");
    let _ = writeln!(out, "### Daily Patterns (Day of Week)\n");
    let _ = writeln!(out, "| Day of Week | Total Jobs | Success | Failure | Success Rate |");
    let _ = writeln!(out, "|-------------|------------|---------|---------|--------------|");
    for day in WEEKDAYS {
        let Some(&total) = stats.daily_counts.get(day) else {
            continue;
        };
        let outcome = stats.daily_status.get(day).copied().unwrap_or_default();
        let _ = writeln!(
            out,
            "| {day} | {} | {} | {} | {} |",
            format_count(total),
            format_count(outcome.success),
            format_count(outcome.failure),
            format_percentage(outcome.success, total)
        );
    }
}

fn write_development_activity(out: &mut String, stats: &StatisticsBundle) {
    let _ = writeln!(out, "\n## 8. Development Activity (Pull Requests)\n");
    let Some(dev) = stats.development.as_ref().filter(|d| d.total_debug_jobs > 0) else {
        let _ = writeln!(
            out,
            "No development jobs (debug-tagged jobs or pr-/gr- pipelines) were found in this period. All jobs shown in this report are production/mainline jobs.\n"
        );
        return;
    };

    let _ = writeln!(out, "This section shows development jobs including:");
    let _ = writeln!(out, "- Jobs with the 'debug' tag (Pull Request testing)");
    let _ = writeln!(
        out,
        "- Jobs from development pipelines (pipelines starting with 'pr-' or 'gr-')\n"
    );
    let _ = writeln!(
        out,
        "These jobs are excluded from the main statistics to provide a clearer view of production/mainline job performance.\n"
    );
    let _ = writeln!(
        out,
        "**Total Development/PR Jobs:** {}\n",
        format_count(dev.total_debug_jobs)
    );

    let _ = writeln!(out, "### Debug Job Status Breakdown\n");
    let _ = writeln!(out, "| Status | Count | Percentage |");
    let _ = writeln!(out, "|--------|-------|------------|");
    for (status, count) in ranked(&dev.debug_status_breakdown) {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            capitalize(status),
            format_count(count),
            format_percentage(count, dev.total_debug_jobs)
        );
    }

    if !dev.debug_pipeline_counts.is_empty() {
        let _ = writeln!(out, "\n### Top Pipelines for Debug/PR Jobs\n");
        let _ = writeln!(out, "| Pipeline Name | Job Count |");
        let _ = writeln!(out, "|---------------|-----------|");
        for (name, count) in ranked(&dev.debug_pipeline_counts).into_iter().take(TOP_ENTITIES) {
            let _ = writeln!(out, "| {name} | {} |", format_count(count));
        }
    }

    if !dev.debug_topic_counts.is_empty() {
        let _ = writeln!(out, "\n### Top Topics for Debug/PR Jobs\n");
        let _ = writeln!(out, "| Topic Name | Job Count |");
        let _ = writeln!(out, "|------------|-----------|");
        for (name, count) in ranked(&dev.debug_topic_counts).into_iter().take(TOP_ENTITIES) {
            let _ = writeln!(out, "| {name} | {} |", format_count(count));
        }
    }
}

fn high_failure_pipelines<'r, 'a>(rates: &'r [RateRow<'a>]) -> Vec<&'r RateRow<'a>> {
    rates
        .iter()
        .filter(|row| row.failure_rate > 60.0 && row.total > 10)
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn write_anomalies(out: &mut String, stats: &StatisticsBundle, pipeline_rates: &[RateRow<'_>]) {
    let total_failures = stats.failure_count + stats.error_count;

    let _ = writeln!(out, "\n## 9. Anomalies and Notable Patterns\n");
    let _ = writeln!(out, "### Key Observations:\n");

    if stats.success_rate < 50.0 {
        let _ = writeln!(
            out,
            "- ⚠️ **Critical:** Overall success rate is below 50%, indicating systemic reliability issues"
        );
    }

    let high_failure = high_failure_pipelines(pipeline_rates);
    if !high_failure.is_empty() {
        let _ = writeln!(
            out,
            "\n- ⚠️ **High Failure Rate Pipelines:** {} pipelines have failure rates above 60%:",
            high_failure.len()
        );
        for row in high_failure.iter().take(5) {
            let _ = writeln!(
                out,
                "  - {}: {:.1}% failure rate ({} jobs)",
                row.name, row.failure_rate, row.total
            );
        }
    }

    if let Some((reason, count)) = top_entry(&stats.status_reasons) {
        if count as f64 > total_failures as f64 * 0.1 {
            let _ = writeln!(
                out,
                "\n- 📊 **Dominant Failure Pattern:** '{}...' accounts for {count} failures ({})",
                link_issue_references(clip(reason, DOMINANT_REASON_CHARS)),
                format_percentage(count, total_failures)
            );
        }
    }

    if let Some((topic, count)) = top_entry(&stats.topic_counts) {
        if count as f64 > stats.total_jobs as f64 * 0.5 {
            let _ = writeln!(
                out,
                "\n- 📈 **Topic Concentration:** {topic} accounts for {} of all jobs",
                format_percentage(count, stats.total_jobs)
            );
        }
    }
}

fn write_recommendations(
    out: &mut String,
    stats: &StatisticsBundle,
    settings: &ReportSettings,
    pipeline_rates: &[RateRow<'_>],
    topic_rates: &[RateRow<'_>],
) {
    let _ = writeln!(out, "\n## 10. Recommendations\n");
    let _ = writeln!(out, "### Immediate Actions:\n");

    if stats.success_rate < 50.0 {
        let _ = writeln!(
            out,
            "1. **Urgent:** Investigate root causes of low success rate. Focus on:"
        );
        for (i, (reason, count)) in ranked(&stats.status_reasons).into_iter().take(3).enumerate() {
            let _ = writeln!(
                out,
                "   {}. {}... ({count} occurrences)",
                i + 1,
                link_issue_references(clip(reason, settings.reason_truncate))
            );
        }
    }

    let high_failure = high_failure_pipelines(pipeline_rates);
    if !high_failure.is_empty() {
        let _ = writeln!(
            out,
            "\n2. **Pipeline Optimization:** Focus improvement efforts on high-failure-rate pipelines:"
        );
        for row in high_failure.iter().take(3) {
            let _ = writeln!(out, "   - {} ({:.1}% failure rate)", row.name, row.failure_rate);
        }
    }

    let _ = writeln!(out, "\n### Long-term Improvements:\n");
    let _ = writeln!(
        out,
        "1. **Monitoring:** Implement proactive monitoring for pipelines with failure rates above 50%"
    );
    let _ = writeln!(
        out,
        "2. **Root Cause Analysis:** Conduct detailed RCA for top 5 failure reasons"
    );
    let _ = writeln!(
        out,
        "3. **Testing:** Review and improve test reliability for frequently failing pipelines"
    );
    let _ = writeln!(
        out,
        "4. **Documentation:** Document common failure patterns and mitigation strategies"
    );

    let _ = writeln!(out, "\n### Focus Areas:\n");
    let focus: Vec<&RateRow<'_>> = topic_rates
        .iter()
        .filter(|row| row.failure_rate > 50.0 && row.total > 20)
        .collect();
    if !focus.is_empty() {
        let _ = writeln!(out, "- **Topics requiring attention:**");
        for row in focus.iter().take(5) {
            let _ = writeln!(out, "  - {} ({:.1}% failure rate)", row.name, row.failure_rate);
        }
    }
}
