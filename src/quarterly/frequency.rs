use std::fmt;

use serde::{Deserialize, Serialize};

use super::statistics::Counts;

/// How regularly a pipeline ran over the analysis period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Sporadic,
    Unknown,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Sporadic => "Sporadic",
            Self::Unknown => "Unknown",
            Self::NotApplicable => "N/A",
        };
        f.write_str(label)
    }
}

/// Cut-offs used to classify a pipeline's cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FrequencyThresholds {
    /// Jobs per day at or above which a pipeline is `Daily`.
    pub daily_per_day: f64,
    /// Jobs per day at or above which a pipeline is at least weekly.
    pub weekly_per_day: f64,
    /// Average jobs per active week that also qualifies as weekly.
    pub weekly_min_per_week: f64,
    /// Fraction of observed weeks that must contain jobs for `Weekly`.
    pub active_week_ratio: f64,
}

impl Default for FrequencyThresholds {
    fn default() -> Self {
        Self {
            daily_per_day: 0.8,
            weekly_per_day: 0.1,
            weekly_min_per_week: 1.0,
            active_week_ratio: 0.7,
        }
    }
}

/// Classifies a pipeline from its per-week and per-month job counts.
///
/// Averages are taken over `days_in_period` and over the weeks that were
/// observed at all, so a pipeline whose activity is bunched into a few weeks
/// can still be `Daily` when its overall volume is high enough.
#[allow(clippy::cast_precision_loss)]
pub fn determine_frequency(
    weekly: Option<&Counts>,
    monthly: Option<&Counts>,
    total_jobs: usize,
    days_in_period: u32,
    thresholds: &FrequencyThresholds,
) -> Frequency {
    if total_jobs == 0 {
        return Frequency::NotApplicable;
    }

    let weeks_with_jobs = weekly.map_or(0, |w| w.values().filter(|&&n| n > 0).count());
    let has_monthly = monthly.is_some_and(|m| !m.is_empty());
    if weekly.map_or(true, |w| w.is_empty()) && !has_monthly {
        return Frequency::Unknown;
    }

    let total_weeks = weekly.map_or(0, |w| w.len()).max(1) as f64;
    let total = total_jobs as f64;
    let avg_per_week = total / total_weeks;
    let avg_per_day = if days_in_period == 0 {
        0.0
    } else {
        total / f64::from(days_in_period)
    };

    if avg_per_day >= thresholds.daily_per_day {
        Frequency::Daily
    } else if avg_per_day >= thresholds.weekly_per_day
        || (weeks_with_jobs > 0 && avg_per_week >= thresholds.weekly_min_per_week)
    {
        if weeks_with_jobs as f64 >= total_weeks * thresholds.active_week_ratio {
            Frequency::Weekly
        } else {
            Frequency::Sporadic
        }
    } else if has_monthly {
        Frequency::Monthly
    } else {
        Frequency::Sporadic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(&str, usize)]) -> Counts {
        entries.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    fn classify(weekly: &Counts, monthly: &Counts, total: usize) -> Frequency {
        determine_frequency(
            Some(weekly),
            Some(monthly),
            total,
            90,
            &FrequencyThresholds::default(),
        )
    }

    #[test]
    fn test_no_jobs_is_not_applicable() {
        let weekly = counts(&[("2025-W01", 3)]);
        assert_eq!(classify(&weekly, &Counts::new(), 0), Frequency::NotApplicable);
        assert_eq!(Frequency::NotApplicable.to_string(), "N/A");
    }

    #[test]
    fn test_no_period_data_is_unknown() {
        assert_eq!(classify(&Counts::new(), &Counts::new(), 5), Frequency::Unknown);
        assert_eq!(
            determine_frequency(None, None, 5, 90, &FrequencyThresholds::default()),
            Frequency::Unknown
        );
    }

    #[test]
    fn test_one_job_per_day_is_daily() {
        let weekly: Counts = (1..=13).map(|w| (format!("2025-W{w:02}"), 7)).collect();
        let monthly = counts(&[("2025-01", 31), ("2025-02", 28), ("2025-03", 31)]);
        assert_eq!(classify(&weekly, &monthly, 90), Frequency::Daily);
    }

    #[test]
    fn test_daily_threshold_is_inclusive() {
        let weekly = counts(&[("2025-W01", 72)]);
        assert_eq!(classify(&weekly, &Counts::new(), 72), Frequency::Daily);
        assert_eq!(classify(&weekly, &Counts::new(), 71), Frequency::Weekly);
    }

    #[test]
    fn test_steady_weekly_runs_are_weekly() {
        let weekly = counts(&[("2025-W01", 7), ("2025-W02", 7), ("2025-W03", 7)]);
        let monthly = counts(&[("2025-01", 21)]);
        assert_eq!(classify(&weekly, &monthly, 21), Frequency::Weekly);
    }

    #[test]
    fn test_high_volume_bunched_into_few_weeks_is_daily() {
        let weekly = counts(&[("2025-W01", 30), ("2025-W02", 30), ("2025-W03", 30)]);
        let monthly = counts(&[("2025-01", 90)]);
        assert_eq!(classify(&weekly, &monthly, 90), Frequency::Daily);
    }

    #[test]
    fn test_single_job_in_single_week_is_weekly() {
        let weekly = counts(&[("2025-W05", 1)]);
        let monthly = counts(&[("2025-02", 1)]);
        assert_eq!(classify(&weekly, &monthly, 1), Frequency::Weekly);
    }

    #[test]
    fn test_mostly_idle_weeks_are_sporadic() {
        let weekly = counts(&[
            ("2025-W01", 5),
            ("2025-W02", 0),
            ("2025-W03", 0),
            ("2025-W04", 0),
        ]);
        assert_eq!(classify(&weekly, &Counts::new(), 5), Frequency::Sporadic);
    }

    #[test]
    fn test_low_volume_with_monthly_data_is_monthly() {
        let weekly = counts(&[("2025-W01", 1), ("2025-W05", 1), ("2025-W09", 1)]);
        let monthly = counts(&[("2025-01", 1), ("2025-02", 1), ("2025-03", 1)]);
        // 3 jobs over 3 weeks averages 1.0 per week, so this still counts as weekly.
        assert_eq!(classify(&weekly, &monthly, 3), Frequency::Weekly);

        let sparse = counts(&[("2025-W01", 1), ("2025-W05", 0), ("2025-W09", 0), ("2025-W12", 0)]);
        assert_eq!(classify(&sparse, &monthly, 1), Frequency::Monthly);
    }

    #[test]
    fn test_low_volume_without_monthly_data_is_sporadic() {
        let weekly = counts(&[("2025-W01", 1), ("2025-W02", 0), ("2025-W03", 0), ("2025-W04", 0)]);
        assert_eq!(classify(&weekly, &Counts::new(), 1), Frequency::Sporadic);
    }

    #[test]
    fn test_custom_thresholds() {
        let weekly = counts(&[("2025-W01", 7), ("2025-W02", 7)]);
        let strict = FrequencyThresholds {
            daily_per_day: 0.1,
            ..FrequencyThresholds::default()
        };
        assert_eq!(
            determine_frequency(Some(&weekly), None, 14, 90, &strict),
            Frequency::Daily
        );
    }

    #[test]
    fn test_zero_day_period_never_divides_by_zero() {
        let weekly = counts(&[("2025-W01", 4)]);
        assert_eq!(
            determine_frequency(Some(&weekly), None, 4, 0, &FrequencyThresholds::default()),
            Frequency::Weekly
        );
    }
}
