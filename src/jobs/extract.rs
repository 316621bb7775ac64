use serde_json::{Map, Value};

/// Normalizes a "jobs" value into a flat list of plain job records.
///
/// Three shapes are recognised:
/// - a list of records, returned as-is
/// - a list of `{"_source": {...}}` wrappers, each unwrapped to its `_source`
/// - an Elasticsearch response `{"hits": {"hits": [...]}}`, whose inner list is
///   handled like the two list shapes above
///
/// Anything else yields an empty list. The input is never mutated; matching
/// records are cloned into the result.
pub fn extract_sources(raw: &Value) -> Vec<Map<String, Value>> {
    match raw {
        Value::Array(items) => unwrap_items(items),
        Value::Object(obj) => obj
            .get("hits")
            .and_then(|hits| hits.get("hits"))
            .and_then(Value::as_array)
            .map(|items| unwrap_items(items))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn unwrap_items(items: &[Value]) -> Vec<Map<String, Value>> {
    items
        .iter()
        .filter_map(|item| {
            let record = item.as_object()?;
            match record.get("_source") {
                Some(Value::Object(source)) => Some(source.clone()),
                _ => Some(record.clone()),
            }
        })
        .collect()
}
