use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::parse_created_at;

/// Counter keyed by name, iterating in first-seen order.
pub type Counts = IndexMap<String, usize>;

/// Statuses every pipeline/topic breakdown starts with, even at zero.
pub const JOB_STATUSES: [&str; 6] = ["success", "failure", "error", "killed", "running", "new"];

const STATUS_REASON_LIMIT: usize = 20;

/// Success and failure (failure or error) tallies for one time bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub failure: usize,
}

/// Pre-merge activity: debug-tagged jobs plus jobs of `pr-`/`gr-` pipelines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DevelopmentStats {
    pub total_debug_jobs: usize,
    pub debug_status_breakdown: Counts,
    pub debug_pipeline_counts: Counts,
    pub debug_topic_counts: Counts,
    pub debug_pipeline_status: IndexMap<String, Counts>,
}

/// Everything computed from one set of jobs. Serializes to a flat JSON object;
/// the development keys only appear when there was development activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsBundle {
    pub total_jobs: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub error_count: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub avg_duration: f64,
    pub pipeline_counts: Counts,
    pub pipeline_status: IndexMap<String, Counts>,
    pub topic_counts: Counts,
    pub topic_status: IndexMap<String, Counts>,
    pub component_counts: Counts,
    pub component_versions: IndexMap<String, Counts>,
    pub component_types: Counts,
    pub status_reasons: Counts,
    pub status_breakdown: Counts,
    pub daily_counts: Counts,
    pub daily_status: IndexMap<String, OutcomeCounts>,
    pub weekly_counts: Counts,
    pub weekly_status: IndexMap<String, OutcomeCounts>,
    pub pipeline_weekly_counts: IndexMap<String, Counts>,
    pub topic_weekly_counts: IndexMap<String, Counts>,
    pub pipeline_monthly_counts: IndexMap<String, Counts>,
    pub topic_monthly_counts: IndexMap<String, Counts>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub development: Option<DevelopmentStats>,
}

impl StatisticsBundle {
    /// Status tally for `status`, 0 when never seen.
    pub fn status_count(&self, status: &str) -> usize {
        self.status_breakdown.get(status).copied().unwrap_or(0)
    }

    /// Jobs counted as development activity, 0 when there were none.
    pub fn total_debug_jobs(&self) -> usize {
        self.development.as_ref().map_or(0, |d| d.total_debug_jobs)
    }
}

/// True for pipelines named `pr-*` or `gr-*`. The `"Unknown"` placeholder never is.
pub fn is_development_pipeline(name: Option<&str>) -> bool {
    match name {
        Some(name) if !name.is_empty() && name != "Unknown" => {
            name.starts_with("pr-") || name.starts_with("gr-")
        }
        _ => false,
    }
}

/// Sum of a status breakdown for one pipeline or topic.
///
/// Falls back to `fallback` (its job count) if every status tally is zero.
pub fn status_total(status: Option<&Counts>, fallback: usize) -> usize {
    let sum: usize = status.map_or(0, |s| {
        ["success", "failure", "error", "killed", "running"]
            .iter()
            .map(|k| s.get(*k).copied().unwrap_or(0))
            .sum()
    });
    if sum == 0 {
        fallback
    } else {
        sum
    }
}

/// Entries sorted by count, highest first; equal counts keep first-seen order.
pub fn ranked(counts: &Counts) -> Vec<(&str, usize)> {
    let mut entries: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}

struct JobView<'a>(&'a Map<String, Value>);

impl<'a> JobView<'a> {
    fn status(&self) -> &'a str {
        self.0.get("status").and_then(Value::as_str).unwrap_or("unknown")
    }

    fn group_name(&self, key: &str) -> Option<&'a str> {
        self.0
            .get(key)?
            .as_object()?
            .get("name")?
            .as_str()
            .filter(|name| !name.is_empty())
    }

    fn pipeline(&self) -> Option<&'a str> {
        self.group_name("pipeline")
    }

    fn topic(&self) -> Option<&'a str> {
        self.group_name("topic")
    }

    fn components(&self) -> impl Iterator<Item = &'a Map<String, Value>> {
        self.0
            .get("components")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    fn status_reason(&self) -> Option<&'a str> {
        self.0
            .get("status_reason")
            .and_then(Value::as_str)
            .filter(|reason| !reason.is_empty())
    }

    fn duration(&self) -> Option<f64> {
        self.0
            .get("duration")
            .and_then(Value::as_f64)
            .filter(|d| *d != 0.0)
    }

    fn is_failed(&self) -> bool {
        matches!(self.status(), "failure" | "error")
    }
}

fn bump(counts: &mut Counts, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

fn bump_status(table: &mut IndexMap<String, Counts>, name: &str, status: &str) {
    let counts = table
        .entry(name.to_string())
        .or_insert_with(|| JOB_STATUSES.iter().map(|s| ((*s).to_string(), 0)).collect());
    bump(counts, status);
}

fn bump_nested(table: &mut IndexMap<String, Counts>, name: &str, key: &str) {
    bump(table.entry(name.to_string()).or_default(), key);
}

fn bump_outcome(table: &mut IndexMap<String, OutcomeCounts>, key: &str, job: &JobView<'_>) {
    let outcome = table.entry(key.to_string()).or_default();
    if job.status() == "success" {
        outcome.success += 1;
    } else if job.is_failed() {
        outcome.failure += 1;
    }
}

/// A component attribute as a counter key. Non-string values such as a
/// numeric version keep their JSON text; missing or null is `"Unknown"`.
fn component_field<'a>(component: &'a Map<String, Value>, key: &str) -> Cow<'a, str> {
    match component.get(key) {
        Some(Value::String(text)) => Cow::Borrowed(text),
        None | Some(Value::Null) => Cow::Borrowed("Unknown"),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

#[allow(clippy::cast_precision_loss)]
fn rate(count: usize, total: usize) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the statistics bundle for a set of regular jobs plus an optional
/// set of debug-tagged jobs.
///
/// Never fails: missing fields are skipped and jobs with an unparsable
/// `created_at` are left out of the time buckets only.
pub fn generate_statistics(
    jobs: &[Map<String, Value>],
    debug_jobs: Option<&[Map<String, Value>]>,
) -> StatisticsBundle {
    let mut stats = StatisticsBundle {
        total_jobs: jobs.len(),
        ..StatisticsBundle::default()
    };
    let mut all_reasons = Counts::new();
    let mut durations = Vec::new();

    for job in jobs.iter().map(JobView) {
        let status = job.status();
        bump(&mut stats.status_breakdown, status);

        let pipeline = job.pipeline().filter(|p| !is_development_pipeline(Some(*p)));
        if let Some(name) = pipeline {
            bump(&mut stats.pipeline_counts, name);
            bump_status(&mut stats.pipeline_status, name, status);
        }

        let topic = job.topic();
        if let Some(name) = topic {
            bump(&mut stats.topic_counts, name);
            bump_status(&mut stats.topic_status, name, status);
        }

        for component in job.components() {
            let name = component_field(component, "name");
            if name.is_empty() || name == "Unknown" {
                continue;
            }
            bump(&mut stats.component_counts, &name);
            bump_nested(
                &mut stats.component_versions,
                &name,
                &component_field(component, "version"),
            );
            bump(&mut stats.component_types, &component_field(component, "type"));
        }

        if job.is_failed() {
            if let Some(reason) = job.status_reason() {
                bump(&mut all_reasons, reason);
            }
        }

        if let Some(duration) = job.duration() {
            durations.push(duration);
        }

        let Some(created) = job
            .0
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_created_at)
        else {
            continue;
        };
        let day = created.format("%A").to_string();
        let week = created.format("%Y-W%W").to_string();
        let month = created.format("%Y-%m").to_string();

        bump(&mut stats.daily_counts, &day);
        bump_outcome(&mut stats.daily_status, &day, &job);
        bump(&mut stats.weekly_counts, &week);
        bump_outcome(&mut stats.weekly_status, &week, &job);

        if let Some(name) = pipeline.filter(|p| *p != "Unknown") {
            bump_nested(&mut stats.pipeline_weekly_counts, name, &week);
            bump_nested(&mut stats.pipeline_monthly_counts, name, &month);
        }
        if let Some(name) = topic.filter(|t| *t != "Unknown") {
            bump_nested(&mut stats.topic_weekly_counts, name, &week);
            bump_nested(&mut stats.topic_monthly_counts, name, &month);
        }
    }

    stats.success_count = stats.status_count("success");
    stats.failure_count = stats.status_count("failure");
    stats.error_count = stats.status_count("error");
    stats.success_rate = rate(stats.success_count, stats.total_jobs);
    stats.failure_rate = rate(stats.failure_count + stats.error_count, stats.total_jobs);
    stats.avg_duration = mean(&durations);
    stats.status_reasons = ranked(&all_reasons)
        .into_iter()
        .take(STATUS_REASON_LIMIT)
        .map(|(reason, count)| (reason.to_string(), count))
        .collect();
    stats.development = development_stats(jobs, debug_jobs.unwrap_or_default());

    stats
}

fn development_stats(
    jobs: &[Map<String, Value>],
    debug_jobs: &[Map<String, Value>],
) -> Option<DevelopmentStats> {
    let mut dev = DevelopmentStats::default();

    for job in debug_jobs.iter().map(JobView) {
        let status = job.status();
        bump(&mut dev.debug_status_breakdown, status);
        if let Some(name) = job.pipeline() {
            bump(&mut dev.debug_pipeline_counts, name);
            bump_status(&mut dev.debug_pipeline_status, name, status);
        }
        if let Some(name) = job.topic() {
            bump(&mut dev.debug_topic_counts, name);
        }
    }

    let mut dev_pipeline_jobs = 0;
    for job in jobs.iter().map(JobView) {
        let Some(name) = job.pipeline().filter(|p| is_development_pipeline(Some(*p))) else {
            continue;
        };
        let status = job.status();
        dev_pipeline_jobs += 1;
        bump(&mut dev.debug_status_breakdown, status);
        bump(&mut dev.debug_pipeline_counts, name);
        bump_status(&mut dev.debug_pipeline_status, name, status);
        if let Some(topic) = job.topic() {
            bump(&mut dev.debug_topic_counts, topic);
        }
    }

    dev.total_debug_jobs = debug_jobs.len() + dev_pipeline_jobs;
    (dev.total_debug_jobs > 0).then_some(dev)
}
