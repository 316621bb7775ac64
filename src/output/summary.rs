use std::fmt::Write;

use comfy_table::Cell;

use crate::quarterly::format::{display_text, format_count, format_duration, format_percentage};
use crate::quarterly::statistics::{ranked, status_total, Counts, StatisticsBundle};
use crate::quarterly::{determine_frequency, ReportContext, ReportSettings};

use super::styling::{bright, bright_yellow, cyan, dim, success_rate};
use super::tables::{create_table, failure_cell, success_cell};

const TOP_ROWS: usize = 10;
const TOP_REASONS: usize = 5;
const REASON_WIDTH: usize = 60;

/// Prints a terminal summary of a quarterly analysis to stdout.
///
/// Shows an overview, the busiest pipelines and topics with color-coded
/// success and failure rates, and the most frequent failure reasons. The
/// markdown report at `report_path` carries the full detail.
pub fn print_summary(
    stats: &StatisticsBundle,
    ctx: &ReportContext,
    settings: &ReportSettings,
    report_path: &str,
) {
    println!("{}", render_summary(stats, ctx, settings, report_path));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

#[allow(clippy::cast_precision_loss)]
fn rate(count: usize, total: usize) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Success and failure percentages for one pipeline or topic.
fn entity_rates(status: Option<&Counts>, count: usize) -> (f64, f64) {
    let total = status_total(status, count);
    let get = |key: &str| status.and_then(|s| s.get(key)).copied().unwrap_or(0);
    (
        rate(get("success"), total),
        rate(get("failure") + get("error"), total),
    )
}

fn render_summary(
    stats: &StatisticsBundle,
    ctx: &ReportContext,
    settings: &ReportSettings,
    report_path: &str,
) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let _ = write!(
        output,
        "  {} {}\n  {} {} - {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("RemoteCI:"),
        cyan(&ctx.remoteci_name),
        dim("Period:"),
        dim(ctx.start.format("%Y-%m-%d")),
        dim(ctx.end.format("%Y-%m-%d")),
        dim("Jobs analyzed:"),
        bright_yellow(format_count(stats.total_jobs)),
        dim("Overall success rate:"),
        success_rate(stats.success_rate),
        dim("Average duration:"),
        bright_yellow(format_duration(stats.avg_duration)),
        dim("Development jobs:"),
        bright_yellow(format_count(stats.total_debug_jobs()))
    );

    if stats.total_jobs == 0 {
        let _ = writeln!(output, "{}", bright_yellow("No jobs found in this period."));
        return output;
    }

    if !stats.pipeline_counts.is_empty() {
        add_section_header(&mut output, "🚀", "Top Pipelines");
        let mut table = create_table(&["#", "Pipeline", "Jobs", "Frequency", "Success", "Fail"]);
        for (idx, (name, count)) in ranked(&stats.pipeline_counts)
            .into_iter()
            .take(TOP_ROWS)
            .enumerate()
        {
            let (success, failure) = entity_rates(stats.pipeline_status.get(name), count);
            let frequency = determine_frequency(
                stats.pipeline_weekly_counts.get(name),
                stats.pipeline_monthly_counts.get(name),
                count,
                settings.days_in_period,
                &settings.thresholds,
            );
            table.add_row(vec![
                Cell::new(idx + 1),
                Cell::new(name),
                Cell::new(format_count(count)),
                Cell::new(frequency),
                success_cell(success),
                failure_cell(failure),
            ]);
        }
        let _ = writeln!(output, "{table}\n");
    }

    if !stats.topic_counts.is_empty() {
        add_section_header(&mut output, "🎯", "Top Topics");
        let mut table = create_table(&["#", "Topic", "Jobs", "Success", "Fail"]);
        for (idx, (name, count)) in ranked(&stats.topic_counts)
            .into_iter()
            .take(TOP_ROWS)
            .enumerate()
        {
            let (success, failure) = entity_rates(stats.topic_status.get(name), count);
            table.add_row(vec![
                Cell::new(idx + 1),
                Cell::new(name),
                Cell::new(format_count(count)),
                success_cell(success),
                failure_cell(failure),
            ]);
        }
        let _ = writeln!(output, "{table}\n");
    }

    if !stats.status_reasons.is_empty() {
        add_section_header(&mut output, "❌", "Top Failure Reasons");
        let total_failures = stats.failure_count + stats.error_count;
        let mut table = create_table(&["#", "Reason", "Count", "Share"]);
        for (idx, (reason, count)) in stats.status_reasons.iter().take(TOP_REASONS).enumerate() {
            table.add_row(vec![
                Cell::new(idx + 1),
                Cell::new(display_text(reason, REASON_WIDTH)),
                Cell::new(format_count(*count)),
                Cell::new(format_percentage(*count, total_failures)),
            ]);
        }
        let _ = writeln!(output, "{table}\n");
    }

    add_section_header(&mut output, "💡", "Next Steps");
    let _ = writeln!(
        output,
        "  {} Full report written to {}\n  {} Use {} to keep the raw statistics",
        cyan("•"),
        bright_yellow(report_path),
        cyan("•"),
        bright_yellow("--stats-json")
    );

    output
}
