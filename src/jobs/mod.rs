mod extract;
mod projection;

pub use extract::extract_sources;
pub use projection::project_fields;

use serde_json::Value;

/// Shapes a search/list result for output: extract the job records and, when a
/// field list is given, project them. `None` keeps whole records.
pub fn select_fields(raw: &Value, fields: Option<&[String]>) -> Value {
    let records = extract_sources(raw);
    let records = match fields {
        Some(fields) => project_fields(&records, fields),
        None => records,
    };
    Value::Array(records.into_iter().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_fields_without_projection_unwraps_sources() {
        let raw = json!({"hits": {"hits": [{"_source": {"id": "x", "name": "n"}}]}});
        assert_eq!(select_fields(&raw, None), json!([{"id": "x", "name": "n"}]));
    }

    #[test]
    fn test_select_fields_with_projection() {
        let raw = json!([{"_source": {"id": "x", "name": "n"}}]);
        let fields = vec!["name".to_string()];
        assert_eq!(select_fields(&raw, Some(fields.as_slice())), json!([{"name": "n"}]));
    }

    #[test]
    fn test_select_fields_with_empty_list_returns_empty() {
        let raw = json!([{"id": "x"}]);
        assert_eq!(select_fields(&raw, Some(&[][..])), json!([]));
    }
}
