use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::parse_created_at;
use crate::error::{DciLensError, Result};

/// One cached page of jobs: `batch_<offset>.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Batch {
    #[serde(default)]
    hits: Vec<Value>,
}

/// True if the job's `tags` list contains `"debug"`.
pub fn has_debug_tag(job: &Map<String, Value>) -> bool {
    job.get("tags")
        .and_then(Value::as_array)
        .is_some_and(|tags| tags.iter().any(|tag| tag.as_str() == Some("debug")))
}

/// Cache directory for one analysis run:
/// `<platform cache dir>/dcilens/<remoteci>/<start>_<end>`.
///
/// # Errors
///
/// Returns error if the platform has no cache directory.
pub fn default_cache_dir(remoteci: &str, start: &str, end: &str) -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .ok_or_else(|| DciLensError::Config("No cache directory found".into()))?;
    Ok(base
        .join("dcilens")
        .join(remoteci.replace('/', "-"))
        .join(format!("{start}_{end}")))
}

fn batch_offset(path: &Path) -> Option<usize> {
    path.file_name()?
        .to_str()?
        .strip_prefix("batch_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Batch files in `cache_dir`, ordered by their numeric offset.
fn batch_files(cache_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<(usize, PathBuf)> = fs::read_dir(cache_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| batch_offset(&path).map(|offset| (offset, path)))
        .collect();
    files.sort_by_key(|(offset, _)| *offset);
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Loads every cached batch and keeps the jobs created within `[start, end]`,
/// split into `(regular_jobs, debug_jobs)`.
///
/// Jobs without a parsable `created_at` are dropped. Batches are read in
/// offset order and jobs keep their order within a batch.
///
/// # Errors
///
/// Returns error if the directory or a batch file cannot be read, or a batch
/// is not valid JSON.
pub fn load_and_filter_batches(
    cache_dir: &Path,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<(Vec<Map<String, Value>>, Vec<Map<String, Value>>)> {
    let mut regular = Vec::new();
    let mut debug_jobs = Vec::new();

    for path in batch_files(cache_dir)? {
        let batch: Batch = serde_json::from_str(&fs::read_to_string(&path)?)?;

        for job in batch.hits {
            let Value::Object(job) = job else { continue };
            let Some(created) = job
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(parse_created_at)
            else {
                continue;
            };
            if created < start || created > end {
                continue;
            }
            if has_debug_tag(&job) {
                debug_jobs.push(job);
            } else {
                regular.push(job);
            }
        }
    }

    Ok((regular, debug_jobs))
}

/// Splits `jobs` into `batch_<offset>.json` files of at most `page_size` jobs.
///
/// Creates `cache_dir` if needed and returns the number of files written.
///
/// # Errors
///
/// Returns error if the directory or a file cannot be written.
pub fn write_batches(cache_dir: &Path, jobs: &[Value], page_size: usize) -> Result<usize> {
    if page_size == 0 {
        return Err(DciLensError::InvalidPageSize);
    }
    fs::create_dir_all(cache_dir)?;

    let mut written = 0;
    for (index, chunk) in jobs.chunks(page_size).enumerate() {
        let offset = index * page_size;
        let path = cache_dir.join(format!("batch_{offset}.json"));
        let batch = Batch {
            hits: chunk.to_vec(),
        };
        fs::write(&path, serde_json::to_string(&batch)?)?;
        debug!("Wrote {} jobs to {}", chunk.len(), path.display());
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn write_raw(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_string(value).unwrap()).unwrap();
    }

    fn ids(jobs: &[Map<String, Value>]) -> Vec<&str> {
        jobs.iter().filter_map(|j| j["id"].as_str()).collect()
    }

    #[test]
    fn test_has_debug_tag() {
        let tagged = json!({"tags": ["build:ga", "debug"]});
        let untagged = json!({"tags": ["build:ga"]});
        let not_list = json!({"tags": "debug"});
        assert!(has_debug_tag(tagged.as_object().unwrap()));
        assert!(!has_debug_tag(untagged.as_object().unwrap()));
        assert!(!has_debug_tag(not_list.as_object().unwrap()));
        assert!(!has_debug_tag(&Map::new()));
    }

    #[test]
    fn test_load_filters_by_date_and_splits_debug() {
        let dir = TempDir::new().unwrap();
        write_raw(
            dir.path(),
            "batch_0.json",
            &json!({"hits": [
                {"id": "in", "created_at": "2025-01-15T10:00:00Z"},
                {"id": "debug", "created_at": "2025-01-16T10:00:00Z", "tags": ["debug"]},
                {"id": "before", "created_at": "2024-12-31T23:59:59Z"},
                {"id": "after", "created_at": "2025-04-01T00:00:01Z"},
                {"id": "no-date"},
                {"id": "bad-date", "created_at": "garbage"}
            ]}),
        );

        let (regular, debug_jobs) = load_and_filter_batches(
            dir.path(),
            at("2025-01-01 00:00:00"),
            at("2025-03-31 23:59:59"),
        )
        .unwrap();

        assert_eq!(ids(&regular), vec!["in"]);
        assert_eq!(ids(&debug_jobs), vec!["debug"]);
    }

    #[test]
    fn test_load_bounds_are_inclusive() {
        let dir = TempDir::new().unwrap();
        write_raw(
            dir.path(),
            "batch_0.json",
            &json!({"hits": [
                {"id": "start", "created_at": "2025-01-01T00:00:00Z"},
                {"id": "end", "created_at": "2025-03-31T23:59:59Z"}
            ]}),
        );
        let (regular, _) = load_and_filter_batches(
            dir.path(),
            at("2025-01-01 00:00:00"),
            at("2025-03-31 23:59:59"),
        )
        .unwrap();
        assert_eq!(ids(&regular), vec!["start", "end"]);
    }

    #[test]
    fn test_load_orders_batches_numerically() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "batch_100.json", &json!({"hits": [{"id": "c", "created_at": "2025-01-03"}]}));
        write_raw(dir.path(), "batch_0.json", &json!({"hits": [{"id": "a", "created_at": "2025-01-01"}]}));
        write_raw(dir.path(), "batch_50.json", &json!({"hits": [{"id": "b", "created_at": "2025-01-02"}]}));
        write_raw(dir.path(), "other.json", &json!({"hits": [{"id": "x", "created_at": "2025-01-02"}]}));

        let (regular, _) = load_and_filter_batches(
            dir.path(),
            at("2025-01-01 00:00:00"),
            at("2025-01-31 23:59:59"),
        )
        .unwrap();
        assert_eq!(ids(&regular), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_tolerates_missing_hits() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "batch_0.json", &json!({"total": 0}));
        let (regular, debug_jobs) = load_and_filter_batches(
            dir.path(),
            at("2025-01-01 00:00:00"),
            at("2025-01-31 23:59:59"),
        )
        .unwrap();
        assert!(regular.is_empty());
        assert!(debug_jobs.is_empty());
    }

    #[test]
    fn test_load_propagates_malformed_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("batch_0.json"), "{not json").unwrap();
        let result = load_and_filter_batches(
            dir.path(),
            at("2025-01-01 00:00:00"),
            at("2025-01-31 23:59:59"),
        );
        assert!(matches!(result, Err(DciLensError::Json(_))));
    }

    #[test]
    fn test_load_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = load_and_filter_batches(
            &dir.path().join("missing"),
            at("2025-01-01 00:00:00"),
            at("2025-01-31 23:59:59"),
        );
        assert!(matches!(result, Err(DciLensError::Io(_))));
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("nested").join("cache");
        let jobs: Vec<Value> = (0..5)
            .map(|i| json!({"id": format!("job-{i}"), "created_at": format!("2025-01-0{}T08:00:00Z", i + 1)}))
            .collect();

        assert_eq!(write_batches(&cache, &jobs, 2).unwrap(), 3);
        assert!(cache.join("batch_0.json").exists());
        assert!(cache.join("batch_2.json").exists());
        assert!(cache.join("batch_4.json").exists());

        let (regular, _) = load_and_filter_batches(
            &cache,
            at("2025-01-01 00:00:00"),
            at("2025-01-31 23:59:59"),
        )
        .unwrap();
        assert_eq!(ids(&regular), vec!["job-0", "job-1", "job-2", "job-3", "job-4"]);
    }

    #[test]
    fn test_write_rejects_zero_page_size() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            write_batches(dir.path(), &[], 0),
            Err(DciLensError::InvalidPageSize)
        ));
    }

    #[test]
    fn test_default_cache_dir_layout() {
        if let Ok(path) = default_cache_dir("team/lab", "2025-01-01", "2025-03-31") {
            assert!(path.ends_with("dcilens/team-lab/2025-01-01_2025-03-31"));
        }
    }
}
