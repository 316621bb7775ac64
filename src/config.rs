use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dci::DEFAULT_BASE_URL;
use crate::pagination::{Paginator, DEFAULT_CONTAINER_KEYS, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use crate::quarterly::{FrequencyThresholds, ReportSettings};

/// Configuration file structure for DCILens.
///
/// Configuration files are loaded from the current directory or a given path.
/// Command line flags always win over values read here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// DCI API access and paging
    #[serde(default)]
    pub dci: DciConfig,

    /// Quarterly analysis window and cache
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report thresholds and formatting
    #[serde(default)]
    pub report: ReportConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DciConfig {
    /// DCI API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// DCI user login
    pub login: Option<String>,

    /// DCI user password
    pub password: Option<String>,

    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Safety cap on pages fetched in one enumeration
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Keys searched, in order, for the item list of a keyed response
    #[serde(default = "default_container_keys")]
    pub container_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Length of the analysis window
    #[serde(default = "default_days_in_period")]
    pub days_in_period: u32,

    /// Batch cache location; defaults to the platform cache directory
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    #[serde(default = "default_daily_per_day")]
    pub daily_per_day: f64,

    #[serde(default = "default_weekly_per_day")]
    pub weekly_per_day: f64,

    #[serde(default = "default_weekly_min_per_week")]
    pub weekly_min_per_week: f64,

    #[serde(default = "default_active_week_ratio")]
    pub active_week_ratio: f64,

    /// Characters of a failure reason kept in tables
    #[serde(default = "default_reason_truncate")]
    pub reason_truncate: usize,

    /// Characters of a component name kept in tables
    #[serde(default = "default_component_truncate")]
    pub component_truncate: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

impl Default for DciConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login: None,
            password: None,
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            container_keys: default_container_keys(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            days_in_period: default_days_in_period(),
            cache_dir: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            daily_per_day: default_daily_per_day(),
            weekly_per_day: default_weekly_per_day(),
            weekly_min_per_week: default_weekly_min_per_week(),
            active_week_ratio: default_active_week_ratio(),
            reason_truncate: default_reason_truncate(),
            component_truncate: default_component_truncate(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_container_keys() -> Vec<String> {
    DEFAULT_CONTAINER_KEYS.iter().map(ToString::to_string).collect()
}

fn default_days_in_period() -> u32 {
    90
}

fn default_daily_per_day() -> f64 {
    FrequencyThresholds::default().daily_per_day
}

fn default_weekly_per_day() -> f64 {
    FrequencyThresholds::default().weekly_per_day
}

fn default_weekly_min_per_week() -> f64 {
    FrequencyThresholds::default().weekly_min_per_week
}

fn default_active_week_ratio() -> f64 {
    FrequencyThresholds::default().active_week_ratio
}

fn default_reason_truncate() -> usize {
    100
}

fn default_component_truncate() -> usize {
    80
}

impl DciConfig {
    /// Paginator configured with this section's page size, cap and keys.
    pub fn paginator(&self) -> Result<Paginator> {
        Ok(Paginator::new(self.page_size)
            .context("Invalid dci.page-size")?
            .with_max_pages(self.max_pages)
            .with_container_keys(self.container_keys.iter().cloned()))
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./dcilens.toml
    /// 3. ./dcilens.json
    /// 4. ./dcilens.yaml
    /// 5. ./dcilens.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["dcilens.toml", "dcilens.json", "dcilens.yaml", "dcilens.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .map_err(anyhow::Error::from)
                    .or_else(|_| serde_json::from_str(&contents).map_err(anyhow::Error::from))
                    .or_else(|_| serde_yaml::from_str(&contents).map_err(anyhow::Error::from))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Report settings assembled from the `[analysis]` and `[report]` sections.
    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            days_in_period: self.analysis.days_in_period,
            thresholds: FrequencyThresholds {
                daily_per_day: self.report.daily_per_day,
                weekly_per_day: self.report.weekly_per_day,
                weekly_min_per_week: self.report.weekly_min_per_week,
                active_week_ratio: self.report.active_week_ratio,
            },
            reason_truncate: self.report.reason_truncate,
            component_truncate: self.report.component_truncate,
        }
    }
}
