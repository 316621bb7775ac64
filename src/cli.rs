use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::auth::Credentials;
use crate::config::Config;
use crate::dci::DciClient;
use crate::error::DciLensError;
use crate::jobs::{extract_sources, project_fields, select_fields};
use crate::output::{print_summary, PhaseProgress};
use crate::pagination::{PageRequest, RawPage};
use crate::quarterly::{
    default_cache_dir, generate_report, generate_statistics, load_and_filter_batches,
    write_batches, ReportContext,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Parser)]
#[command(name = "dcilens")]
#[command(author, version, about = "DCI Job Insights Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Configuration file (defaults to ./dcilens.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct DciArgs {
    #[arg(short, long, env = "DCI_CS_URL")]
    url: Option<String>,

    #[arg(long, env = "DCI_LOGIN")]
    login: Option<String>,

    #[arg(long, env = "DCI_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args)]
struct PeriodArgs {
    /// RemoteCI (lab) name
    #[arg(short, long)]
    remoteci: String,

    /// First day of the window, YYYY-MM-DD (defaults to a days-in-period window ending on `end`)
    #[arg(long)]
    start: Option<String>,

    /// Last day of the window, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    end: Option<String>,

    /// Batch cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search jobs with the DCI query language
    Search {
        #[command(flatten)]
        dci: DciArgs,

        /// e.g. "((components.type='ocp') and (components.version='4.19.0'))"
        query: String,

        #[arg(short, long, default_value = "-created_at")]
        sort: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Comma-separated dot paths, e.g. "id,components.version"
        #[arg(short, long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },
    /// List jobs, one page or all of them
    Jobs {
        #[command(flatten)]
        dci: DciArgs,

        #[arg(short, long = "where")]
        where_clause: Option<String>,

        #[arg(short, long)]
        sort: Option<String>,

        #[arg(short, long)]
        embed: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page through every matching job
        #[arg(short, long, default_value_t = false)]
        all: bool,

        #[arg(short, long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },
    /// Project a saved job document down to the given fields
    Project {
        /// JSON file; reads stdin when omitted
        input: Option<PathBuf>,

        #[arg(short, long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
    },
    /// Download a remoteci's jobs for a period into the batch cache
    Fetch {
        #[command(flatten)]
        dci: DciArgs,

        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Write a configuration file filled with the defaults
    Init {
        /// Target file; the extension picks TOML, JSON or YAML
        #[arg(default_value = "dcilens.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
    /// Analyze cached batches and write the quarterly report
    Quarterly {
        #[command(flatten)]
        period: PeriodArgs,

        /// Markdown report path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Also write the raw statistics as JSON
        #[arg(long)]
        stats_json: Option<PathBuf>,
    },
}

/// Inclusive analysis window resolved from CLI dates.
struct Period {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl Period {
    fn resolve(start: Option<&str>, end: Option<&str>, days_in_period: u32) -> Result<Self> {
        let end_date = match end {
            Some(raw) => parse_date(raw)?,
            None => Local::now().date_naive(),
        };
        let start_date = match start {
            Some(raw) => parse_date(raw)?,
            // Both ends are inclusive, so `days_in_period` days end on `end_date`.
            None => end_date - Duration::days(i64::from(days_in_period.saturating_sub(1))),
        };
        if start_date > end_date {
            return Err(DciLensError::InvalidDate(format!(
                "start {start_date} is after end {end_date}"
            ))
            .into());
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    fn start(&self) -> NaiveDateTime {
        self.start_date.and_time(NaiveTime::MIN)
    }

    fn end(&self) -> NaiveDateTime {
        self.end_date.and_hms_opt(23, 59, 59).unwrap_or(self.end_date.and_time(NaiveTime::MIN))
    }

    /// Calendar days covered, counting both the first and the last day.
    fn days(&self) -> u32 {
        u32::try_from((self.end_date - self.start_date).num_days() + 1).unwrap_or(0)
    }

    fn cache_dir(&self, remoteci: &str, explicit: Option<&Path>, config: &Config) -> Result<PathBuf> {
        if let Some(dir) = explicit.or(config.analysis.cache_dir.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        Ok(default_cache_dir(
            remoteci,
            &self.start_date.format(DATE_FORMAT).to_string(),
            &self.end_date.format(DATE_FORMAT).to_string(),
        )?)
    }

    /// DCI search query for every job of `remoteci` inside the window.
    fn search_query(&self, remoteci: &str) -> String {
        format!(
            "((remoteci.name='{remoteci}') and (created_at>='{}') and (created_at<='{}'))",
            self.start().format("%Y-%m-%dT%H:%M:%S"),
            self.end().format("%Y-%m-%dT%H:%M:%S")
        )
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DciLensError::InvalidDate(format!("{raw}: {e}")).into())
}

/// Saves the default configuration to `path` unless a file is already there.
fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    Config::default().save(path)
}

/// Drops blank entries so `--fields ""` means "no fields".
fn clean_fields(fields: Option<&[String]>) -> Option<Vec<String>> {
    fields.map(|fields| {
        fields
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect()
    })
}

/// Keeps the `hits` part of a search response, projecting its jobs when a
/// field list is given. A response without `hits.hits` becomes `{"hits": []}`.
fn shape_search_result(mut doc: Value, fields: Option<&[String]>) -> Value {
    let has_hits = doc
        .get("hits")
        .and_then(|hits| hits.get("hits"))
        .is_some();
    if !has_hits {
        return serde_json::json!({ "hits": [] });
    }
    if let Some(fields) = fields {
        let projected = select_fields(&doc, Some(fields));
        doc["hits"]["hits"] = projected;
    }
    doc["hits"].take()
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref())
    }

    fn client(dci: &DciArgs, config: &Config) -> Result<DciClient> {
        let url = dci.url.as_deref().unwrap_or(&config.dci.base_url);
        let credentials = Credentials::from_parts(
            dci.login.as_deref().or(config.dci.login.as_deref()),
            dci.password.as_deref().or(config.dci.password.as_deref()),
        );
        if credentials.is_none() {
            warn!("No DCI credentials provided, requests will be anonymous");
        }
        DciClient::new(url, credentials).context("Failed to create DCI client")
    }

    fn write_json<T: Serialize>(&self, value: &T, config: &Config) -> Result<()> {
        let json_output = if self.pretty || config.output.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)
                .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
            info!("Output written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    async fn execute_search(
        &self,
        dci: &DciArgs,
        query: &str,
        sort: &str,
        limit: usize,
        offset: usize,
        fields: Option<&[String]>,
    ) -> Result<()> {
        let config = self.load_config()?;
        info!("Searching DCI jobs: {query}");

        let client = Self::client(dci, &config)?;
        let sort = Some(sort).filter(|s| !s.is_empty());
        let doc = client.search_jobs(query, sort, limit, offset).await?;

        let fields = clean_fields(fields);
        self.write_json(&shape_search_result(doc, fields.as_deref()), &config)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_jobs(
        &self,
        dci: &DciArgs,
        where_clause: Option<&str>,
        sort: Option<&str>,
        embed: Option<&str>,
        limit: usize,
        offset: usize,
        all: bool,
        fields: Option<&[String]>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let client = Self::client(dci, &config)?;
        let fields = clean_fields(fields);

        let filters = [("where", where_clause), ("sort", sort), ("embed", embed)];

        if all {
            info!("Listing all DCI jobs");
            let mut paginator = config.dci.paginator()?;
            for (key, value) in filters {
                if let Some(value) = value {
                    paginator = paginator.with_filter(key, value);
                }
            }

            let mut summary = paginator
                .fetch_all_with_progress(|request| client.list_jobs(request))
                .await?;
            if !summary.reached_end {
                warn!(
                    "Stopped after {} pages, more jobs may exist",
                    summary.pages_fetched
                );
            }
            if let Some(fields) = &fields {
                summary.results = match select_fields(&Value::Array(summary.results), Some(fields.as_slice())) {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                };
            }
            return self.write_json(&summary, &config);
        }

        info!("Listing DCI jobs (limit {limit}, offset {offset})");
        let mut request = PageRequest {
            limit,
            offset,
            ..Default::default()
        };
        for (key, value) in filters {
            if let Some(value) = value {
                request.filters.insert(key.to_string(), value.to_string());
            }
        }
        let items = client
            .list_jobs(request)
            .await?
            .into_items(&config.dci.container_keys)?;
        if items.is_empty() {
            warn!("No jobs matched");
        }
        self.write_json(&select_fields(&Value::Array(items), fields.as_deref()), &config)
    }

    fn execute_project(&self, input: Option<&Path>, fields: &[String]) -> Result<()> {
        let config = self.load_config()?;
        let contents = match input {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input: {}", path.display()))?,
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read stdin")?;
                buffer
            }
        };
        let doc: Value = serde_json::from_str(&contents).context("Input is not valid JSON")?;

        let fields = clean_fields(Some(fields)).unwrap_or_default();
        let projected = project_fields(&extract_sources(&doc), &fields);
        self.write_json(&projected, &config)
    }

    async fn execute_fetch(&self, dci: &DciArgs, period: &PeriodArgs) -> Result<()> {
        let config = self.load_config()?;
        let window = Period::resolve(
            period.start.as_deref(),
            period.end.as_deref(),
            config.analysis.days_in_period,
        )?;
        let cache_dir = window.cache_dir(&period.remoteci, period.cache_dir.as_deref(), &config)?;
        let client = Self::client(dci, &config)?;
        let paginator = config.dci.paginator()?;
        let query = window.search_query(&period.remoteci);

        info!(
            "Fetching jobs for {} from {} to {}",
            period.remoteci, window.start_date, window.end_date
        );
        let progress = PhaseProgress::start(2, "Fetching jobs from DCI...");

        let fetched = paginator
            .fetch_all_with_progress(|request| {
                let client = &client;
                let query = &query;
                async move {
                    let doc = client
                        .search_jobs(query, Some("-created_at"), request.limit, request.offset)
                        .await?;
                    let jobs = extract_sources(&doc).into_iter().map(Value::Object).collect();
                    Ok::<_, DciLensError>(RawPage::Items(jobs))
                }
            })
            .await;
        let summary = match fetched {
            Ok(summary) => summary,
            Err(e) => {
                progress.abandon();
                return Err(e).context("Failed to fetch jobs");
            }
        };
        if !summary.reached_end {
            warn!(
                "Stopped after {} pages, the cache may be incomplete",
                summary.pages_fetched
            );
        }

        let progress = progress.next(
            &format!("Fetched {} jobs", summary.total_count),
            "Writing batch cache...",
        );
        let written = match write_batches(&cache_dir, &summary.results, paginator.page_size()) {
            Ok(written) => written,
            Err(e) => {
                progress.abandon();
                return Err(e).with_context(|| {
                    format!("Failed to write batch cache: {}", cache_dir.display())
                });
            }
        };
        progress.finish(&format!("Wrote {written} batches"));

        info!("Batch cache written to: {}", cache_dir.display());
        Ok(())
    }

    fn execute_quarterly(
        &self,
        period: &PeriodArgs,
        report: Option<&Path>,
        stats_json: Option<&Path>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let window = Period::resolve(
            period.start.as_deref(),
            period.end.as_deref(),
            config.analysis.days_in_period,
        )?;
        let cache_dir = window.cache_dir(&period.remoteci, period.cache_dir.as_deref(), &config)?;
        let mut settings = config.report_settings();
        settings.days_in_period = window.days();

        let report_path = report.map_or_else(
            || {
                PathBuf::from(format!(
                    "quarterly_report_{}_{}.md",
                    period.remoteci.replace('/', "-"),
                    window.end_date.format(DATE_FORMAT)
                ))
            },
            Path::to_path_buf,
        );

        info!("Analyzing cached jobs in {}", cache_dir.display());
        let progress = PhaseProgress::start(3, "Loading cached batches...");

        let (jobs, debug_jobs) = match load_and_filter_batches(&cache_dir, window.start(), window.end()) {
            Ok(loaded) => loaded,
            Err(e) => {
                progress.abandon();
                return Err(e).with_context(|| {
                    format!(
                        "Failed to load batches from {} (run `dcilens fetch` first)",
                        cache_dir.display()
                    )
                });
            }
        };
        if jobs.is_empty() && debug_jobs.is_empty() {
            warn!("No jobs found between {} and {}", window.start_date, window.end_date);
        }

        let progress = progress.next(
            &format!("Loaded {} jobs ({} debug)", jobs.len(), debug_jobs.len()),
            "Computing statistics...",
        );
        let stats = generate_statistics(&jobs, Some(debug_jobs.as_slice()));

        let progress = progress.next("Statistics ready", "Writing report...");
        let ctx = ReportContext::new(period.remoteci.clone(), window.start(), window.end());
        if let Err(e) = generate_report(&stats, &ctx, &settings, &report_path) {
            progress.abandon();
            return Err(e)
                .with_context(|| format!("Failed to write report: {}", report_path.display()));
        }
        progress.finish("Report written");

        if let Some(path) = stats_json {
            let json = if self.pretty || config.output.pretty {
                serde_json::to_string_pretty(&stats)?
            } else {
                serde_json::to_string(&stats)?
            };
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write statistics: {}", path.display()))?;
            info!("Statistics written to: {}", path.display());
        }

        print_summary(&stats, &ctx, &settings, &report_path.display().to_string());
        info!("Report written to: {}", report_path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Search {
                dci,
                query,
                sort,
                limit,
                offset,
                fields,
            } => {
                self.execute_search(dci, query, sort, *limit, *offset, fields.as_deref())
                    .await
            }
            Commands::Jobs {
                dci,
                where_clause,
                sort,
                embed,
                limit,
                offset,
                all,
                fields,
            } => {
                self.execute_jobs(
                    dci,
                    where_clause.as_deref(),
                    sort.as_deref(),
                    embed.as_deref(),
                    *limit,
                    *offset,
                    *all,
                    fields.as_deref(),
                )
                .await
            }
            Commands::Project { input, fields } => self.execute_project(input.as_deref(), fields),
            Commands::Fetch { dci, period } => self.execute_fetch(dci, period).await,
            Commands::Init { path, force } => {
                write_default_config(path, *force)?;
                info!("Default configuration written to: {}", path.display());
                Ok(())
            }
            Commands::Quarterly {
                period,
                report,
                stats_json,
            } => self.execute_quarterly(period, report.as_deref(), stats_json.as_deref()),
        }
    }
}
