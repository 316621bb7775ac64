use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A requested field, parsed once from its dot-path spelling.
///
/// `"id"` is a top-level field; `"components.version"` selects `version` inside
/// `components`. Everything after the first dot is kept as one sub-field name,
/// so `"tests.testsuites.name"` groups under `tests` with sub-field
/// `testsuites.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Field(String),
    Nested { group: String, field: String },
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            Some((group, field)) => Self::Nested {
                group: group.to_string(),
                field: field.to_string(),
            },
            None => Self::Field(path.to_string()),
        }
    }
}

/// The parsed form of a whole field list: plain fields plus sub-fields
/// grouped by their first segment, in first-seen order.
#[derive(Debug, Default)]
pub struct FieldSelection {
    fields: Vec<String>,
    groups: IndexMap<String, Vec<String>>,
}

impl FieldSelection {
    pub fn parse<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut selection = Self::default();
        for path in paths {
            match FieldPath::parse(path.as_ref()) {
                FieldPath::Field(name) => selection.fields.push(name),
                FieldPath::Nested { group, field } => {
                    selection.groups.entry(group).or_default().push(field);
                }
            }
        }
        selection
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }

    /// Projects one record down to the selected fields.
    ///
    /// Absent and null values are omitted, as are groups that end up empty.
    pub fn project(&self, record: &Map<String, Value>) -> Map<String, Value> {
        let mut projected = Map::new();

        for name in &self.fields {
            if let Some(value) = record.get(name).filter(|v| !v.is_null()) {
                projected.insert(name.clone(), value.clone());
            }
        }

        for (group, sub_fields) in &self.groups {
            let projected_group = match record.get(group) {
                Some(Value::Array(entries)) => {
                    let items: Vec<Value> = entries
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|entry| pick_sub_fields(entry, sub_fields))
                        .filter(|item| !item.is_empty())
                        .map(Value::Object)
                        .collect();
                    (!items.is_empty()).then_some(Value::Array(items))
                }
                Some(Value::Object(entry)) => {
                    let item = pick_sub_fields(entry, sub_fields);
                    (!item.is_empty()).then_some(Value::Object(item))
                }
                _ => None,
            };

            if let Some(value) = projected_group {
                projected.insert(group.clone(), value);
            }
        }

        projected
    }
}

fn pick_sub_fields(entry: &Map<String, Value>, sub_fields: &[String]) -> Map<String, Value> {
    sub_fields
        .iter()
        .filter_map(|field| {
            lookup(entry, field)
                .filter(|v| !v.is_null())
                .map(|value| (field.clone(), value.clone()))
        })
        .collect()
}

// A literal key wins; otherwise the remainder is walked as a dot path.
fn lookup<'a>(entry: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    if let Some(value) = entry.get(field) {
        return Some(value);
    }
    let mut segments = field.split('.');
    let mut current = entry.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Projects every record down to the requested dot-path fields.
///
/// An empty field list means "no job data wanted" and always returns an empty
/// list; callers that want every field should skip projection altogether.
/// Output order follows input order.
pub fn project_fields<S: AsRef<str>>(
    records: &[Map<String, Value>],
    paths: &[S],
) -> Vec<Map<String, Value>> {
    let selection = FieldSelection::parse(paths);
    if selection.is_empty() {
        return Vec::new();
    }
    records.iter().map(|record| selection.project(record)).collect()
}
