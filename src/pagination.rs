use std::future::Future;
use std::num::NonZeroUsize;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DciLensError, Result};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Keys under which DCI list endpoints nest their items, in lookup order.
pub const DEFAULT_CONTAINER_KEYS: [&str; 8] = [
    "teams",
    "jobs",
    "files",
    "pipelines",
    "products",
    "topics",
    "components",
    "data",
];

/// A response body that can still be decoded into JSON.
pub trait JsonBody: Send {
    fn json(&self) -> serde_json::Result<Value>;
}

impl JsonBody for String {
    fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(self)
    }
}

/// One page as returned by a listing function, before normalization.
pub enum RawPage {
    /// Already a flat list of items.
    Items(Vec<Value>),
    /// A mapping that nests its items under one of the container keys.
    Keyed(Map<String, Value>),
    /// An undecoded response body.
    Encoded(Box<dyn JsonBody>),
}

impl From<Value> for RawPage {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Items(items),
            Value::Object(map) => Self::Keyed(map),
            _ => Self::Items(Vec::new()),
        }
    }
}

impl From<Vec<Value>> for RawPage {
    fn from(items: Vec<Value>) -> Self {
        Self::Items(items)
    }
}

impl RawPage {
    /// Flattens the page into its items.
    ///
    /// Keyed pages take the value of the first container key present; a
    /// missing key or a non-list value counts as an empty page.
    pub fn into_items(self, container_keys: &[String]) -> serde_json::Result<Vec<Value>> {
        match self {
            Self::Items(items) => Ok(items),
            Self::Keyed(mut map) => {
                for key in container_keys {
                    if let Some(value) = map.get_mut(key) {
                        return Ok(match value.take() {
                            Value::Array(items) => items,
                            _ => Vec::new(),
                        });
                    }
                }
                Ok(Vec::new())
            }
            // Decoding never yields another encoded page.
            Self::Encoded(body) => Self::from(body.json()?).into_items(container_keys),
        }
    }
}

/// Arguments handed to the listing function for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
    pub filters: IndexMap<String, String>,
}

/// Result of a full enumeration along with how it ended.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub results: Vec<Value>,
    pub total_count: usize,
    pub pages_fetched: usize,
    pub page_size: usize,
    /// `true` when the last page was short or empty, `false` when the
    /// `max_pages` cap stopped the loop.
    pub reached_end: bool,
}

/// Drives an offset/limit listing function until it runs out of data.
///
/// Only pages that yield at least one item are counted against `max_pages`,
/// so an empty trailing page never inflates `pages_fetched`.
#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: NonZeroUsize,
    max_pages: usize,
    container_keys: Vec<String>,
    filters: IndexMap<String, String>,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroUsize::MIN),
            max_pages: DEFAULT_MAX_PAGES,
            container_keys: DEFAULT_CONTAINER_KEYS.iter().map(ToString::to_string).collect(),
            filters: IndexMap::new(),
        }
    }
}

impl Paginator {
    /// # Errors
    ///
    /// Returns `InvalidPageSize` when `page_size` is zero.
    pub fn new(page_size: usize) -> Result<Self> {
        let page_size = NonZeroUsize::new(page_size).ok_or(DciLensError::InvalidPageSize)?;
        Ok(Self {
            page_size,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn with_container_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.container_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a filter forwarded unchanged to every listing call.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    /// Fetches every page and returns the concatenated items.
    ///
    /// # Errors
    ///
    /// Propagates the listing function's error unchanged, and JSON errors from
    /// decoding encoded pages.
    pub async fn fetch_all<F, Fut, E>(&self, list_fn: F) -> std::result::Result<Vec<Value>, E>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = std::result::Result<RawPage, E>>,
        E: From<serde_json::Error>,
    {
        Ok(self.fetch_all_with_progress(list_fn).await?.results)
    }

    /// Fetches every page and reports how the enumeration went.
    ///
    /// # Errors
    ///
    /// Same as [`Paginator::fetch_all`].
    pub async fn fetch_all_with_progress<F, Fut, E>(
        &self,
        mut list_fn: F,
    ) -> std::result::Result<PageSummary, E>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = std::result::Result<RawPage, E>>,
        E: From<serde_json::Error>,
    {
        let page_size = self.page_size.get();
        let mut results = Vec::new();
        let mut offset = 0;
        let mut pages_fetched = 0;
        let mut reached_end = false;

        while pages_fetched < self.max_pages {
            let request = PageRequest {
                limit: page_size,
                offset,
                filters: self.filters.clone(),
            };
            let items = list_fn(request).await?.into_items(&self.container_keys)?;

            if items.is_empty() {
                reached_end = true;
                break;
            }

            let page_len = items.len();
            results.extend(items);
            pages_fetched += 1;

            if page_len < page_size {
                reached_end = true;
                break;
            }

            offset += page_size;
        }

        Ok(PageSummary {
            total_count: results.len(),
            results,
            pages_fetched,
            page_size,
            reached_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{ready, Ready};
    use serde_json::json;
    use std::cell::RefCell;

    type PageResult = std::result::Result<RawPage, DciLensError>;

    fn records(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"id": i})).collect()
    }

    // Serves `limit`/`offset` windows over a fixed array, recording each request.
    fn array_backed<'a>(
        data: &'a [Value],
        calls: &'a RefCell<Vec<PageRequest>>,
    ) -> impl FnMut(PageRequest) -> Ready<PageResult> + 'a {
        move |req| {
            calls.borrow_mut().push(req.clone());
            let end = (req.offset + req.limit).min(data.len());
            let start = req.offset.min(end);
            ready(Ok(RawPage::from(data[start..end].to_vec())))
        }
    }

    #[test]
    fn test_new_rejects_zero_page_size() {
        assert!(matches!(
            Paginator::new(0),
            Err(DciLensError::InvalidPageSize)
        ));
        assert_eq!(Paginator::new(10).unwrap().page_size(), 10);
    }

    #[test]
    fn test_default_settings() {
        let paginator = Paginator::default();
        assert_eq!(paginator.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(paginator.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(paginator.container_keys.len(), 8);
    }

    #[tokio::test]
    async fn test_fetch_all_returns_every_record_in_order() {
        let data = records(23);
        let calls = RefCell::new(Vec::new());
        let paginator = Paginator::new(5).unwrap();

        let results = paginator
            .fetch_all(array_backed(&data, &calls))
            .await
            .unwrap();

        assert_eq!(results, data);
        let offsets: Vec<usize> = calls.borrow().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 5, 10, 15, 20]);
    }

    #[tokio::test]
    async fn test_exact_multiple_stops_on_empty_page() {
        let data = records(10);
        let calls = RefCell::new(Vec::new());
        let paginator = Paginator::new(5).unwrap();

        let summary = paginator
            .fetch_all_with_progress(array_backed(&data, &calls))
            .await
            .unwrap();

        assert_eq!(summary.total_count, 10);
        assert_eq!(summary.pages_fetched, 2);
        assert!(summary.reached_end);
        // The third, empty call is made but not counted.
        assert_eq!(calls.borrow().len(), 3);
        assert_eq!(calls.borrow()[2].offset, 10);
    }

    #[tokio::test]
    async fn test_max_pages_caps_an_endless_listing() {
        let calls = RefCell::new(0usize);
        let paginator = Paginator::new(3).unwrap().with_max_pages(4);

        let summary = paginator
            .fetch_all_with_progress(|_req: PageRequest| {
                *calls.borrow_mut() += 1;
                ready(PageResult::Ok(RawPage::from(records(3))))
            })
            .await
            .unwrap();

        assert_eq!(*calls.borrow(), 4);
        assert_eq!(summary.pages_fetched, 4);
        assert_eq!(summary.total_count, 12);
        assert!(!summary.reached_end);
    }

    #[tokio::test]
    async fn test_zero_max_pages_never_calls_the_listing() {
        let paginator = Paginator::default().with_max_pages(0);
        let summary = paginator
            .fetch_all_with_progress(|_req: PageRequest| -> Ready<PageResult> {
                panic!("listing function must not be called")
            })
            .await
            .unwrap();

        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.pages_fetched, 0);
        assert!(!summary.reached_end);
    }

    #[tokio::test]
    async fn test_short_then_empty_sequence() {
        let pages = RefCell::new(vec![
            vec![json!("a"), json!("b")],
            vec![json!("c")],
            vec![],
        ]);
        let paginator = Paginator::new(2).unwrap();

        let summary = paginator
            .fetch_all_with_progress(|_req: PageRequest| {
                let page = pages.borrow_mut().remove(0);
                ready(PageResult::Ok(RawPage::from(page)))
            })
            .await
            .unwrap();

        assert_eq!(summary.results, vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.page_size, 2);
        assert!(summary.reached_end);
        // The short page ended the loop before the empty page was requested.
        assert_eq!(pages.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_filters_are_forwarded_with_every_call() {
        let data = records(4);
        let calls = RefCell::new(Vec::new());
        let paginator = Paginator::new(2)
            .unwrap()
            .with_filter("where", "remoteci_id:abc")
            .with_filter("sort", "-created_at");

        paginator
            .fetch_all(array_backed(&data, &calls))
            .await
            .unwrap();

        for call in calls.borrow().iter() {
            assert_eq!(call.limit, 2);
            assert_eq!(call.filters["where"], "remoteci_id:abc");
            assert_eq!(call.filters["sort"], "-created_at");
        }
    }

    #[tokio::test]
    async fn test_listing_errors_propagate() {
        let paginator = Paginator::new(2).unwrap();
        let result = paginator
            .fetch_all(|req: PageRequest| {
                ready(if req.offset == 0 {
                    Ok(RawPage::from(records(2)))
                } else {
                    Err(DciLensError::Api {
                        status: 500,
                        message: "boom".into(),
                    })
                })
            })
            .await;

        assert!(matches!(result, Err(DciLensError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_encoded_pages_are_decoded_by_container_key() {
        let bodies = RefCell::new(vec![
            r#"{"_meta": {"count": 3}, "jobs": [{"id": 1}, {"id": 2}]}"#.to_string(),
            r#"{"_meta": {"count": 3}, "jobs": [{"id": 3}]}"#.to_string(),
        ]);
        let paginator = Paginator::new(2).unwrap();

        let results = paginator
            .fetch_all(|_req: PageRequest| {
                let body = bodies.borrow_mut().remove(0);
                ready(PageResult::Ok(RawPage::Encoded(Box::new(body))))
            })
            .await
            .unwrap();

        assert_eq!(results, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
    }

    #[tokio::test]
    async fn test_invalid_encoded_page_is_an_error() {
        let paginator = Paginator::default();
        let result = paginator
            .fetch_all(|_req: PageRequest| {
                ready(PageResult::Ok(RawPage::Encoded(Box::new(
                    "not json".to_string(),
                ))))
            })
            .await;

        assert!(matches!(result, Err(DciLensError::Json(_))));
    }

    #[test]
    fn test_keyed_page_uses_first_present_key() {
        let keys: Vec<String> = DEFAULT_CONTAINER_KEYS.iter().map(ToString::to_string).collect();
        let page = RawPage::from(json!({"data": [1], "jobs": [2, 3]}));
        assert_eq!(page.into_items(&keys).unwrap(), vec![json!(2), json!(3)]);
    }

    #[test]
    fn test_keyed_page_without_known_key_is_empty() {
        let keys: Vec<String> = DEFAULT_CONTAINER_KEYS.iter().map(ToString::to_string).collect();
        let page = RawPage::from(json!({"items": [1, 2]}));
        assert!(page.into_items(&keys).unwrap().is_empty());
    }

    #[test]
    fn test_injected_container_keys() {
        let keys = vec!["remotecis".to_string()];
        let page = RawPage::from(json!({"remotecis": [{"id": "r1"}], "jobs": [1]}));
        assert_eq!(page.into_items(&keys).unwrap(), vec![json!({"id": "r1"})]);
    }

    #[test]
    fn test_scalar_values_are_empty_pages() {
        let page = RawPage::from(json!("nothing"));
        assert!(page.into_items(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_container_keys_drive_pagination() {
        let paginator = Paginator::new(10).unwrap().with_container_keys(["remotecis"]);
        let results = paginator
            .fetch_all(|_req: PageRequest| {
                ready(PageResult::Ok(RawPage::from(
                    json!({"remotecis": [{"id": "r1"}, {"id": "r2"}]}),
                )))
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }
}
