//! JSON value helpers
//!
//! Field lookup, display and ordering rules shared by the data gateway and
//! the tabular view.

use serde_json::Value;
use std::cmp::Ordering;

/// Look up a field by dot path (`package.title`, `media.0.url`)
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Missing and JSON null are treated the same everywhere
pub fn is_nullish(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Every scalar in a value as text, one entry per field.
/// Object keys are not included.
pub fn scalars(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_scalars(value, &mut out);
    out
}

fn collect_scalars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Array(items) => items.iter().for_each(|v| collect_scalars(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_scalars(v, out)),
        scalar => out.push(display(Some(scalar))),
    }
}

/// True when a single scalar of `value` contains `needle` (already lowercase)
pub fn any_scalar_contains(value: &Value, needle: &str) -> bool {
    scalars(value)
        .iter()
        .any(|s| s.to_lowercase().contains(needle))
}

/// Plain text rendering of a cell
pub fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| display(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Native ordering for values of the same JSON type; mixed types are
/// ordered by type rank so the sort stays total.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compare two optional field values, nulls last regardless of direction
pub fn compare_nulls_last(a: Option<&Value>, b: Option<&Value>, descending: bool) -> Ordering {
    match (is_nullish(a), is_nullish(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let (Some(a), Some(b)) = (a, b) else {
                return Ordering::Equal;
            };
            let ord = compare(a, b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_dot_path() {
        let record = json!({
            "package": { "title": "Nile Cruise", "tags": ["river", "egypt"] },
            "status": "pending"
        });
        assert_eq!(lookup(&record, "status"), Some(&json!("pending")));
        assert_eq!(lookup(&record, "package.title"), Some(&json!("Nile Cruise")));
        assert_eq!(lookup(&record, "package.tags.1"), Some(&json!("egypt")));
        assert_eq!(lookup(&record, "package.missing"), None);
        assert_eq!(lookup(&record, "status.deeper"), None);
    }

    #[test]
    fn test_scalars_skip_keys_and_nulls() {
        let record = json!({
            "name": "Atlas Trek",
            "notes": null,
            "guide": { "name": "Youssef", "langs": ["fr", "ar"] },
            "days": 5
        });
        let flat = scalars(&record);
        assert!(flat.contains(&"Atlas Trek".to_string()));
        assert!(flat.contains(&"Youssef".to_string()));
        assert!(flat.contains(&"ar".to_string()));
        assert!(flat.contains(&"5".to_string()));
        assert!(!flat.iter().any(|s| s == "guide"));
        assert_eq!(flat.len(), 5);
    }

    #[test]
    fn test_any_scalar_contains_stays_within_one_field() {
        let record = json!({ "status": "pending", "total_amount": 1200 });
        assert!(any_scalar_contains(&record, "pend"));
        assert!(any_scalar_contains(&record, "120"));
        assert!(!any_scalar_contains(&record, "pending 1200"));
    }

    #[test]
    fn test_compare_native_orderings() {
        assert_eq!(compare(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare(&json!(false), &json!(true)), Ordering::Less);
        assert_eq!(compare(&json!(1), &json!("1")), Ordering::Less);
    }

    #[test]
    fn test_nulls_last_both_directions() {
        let one = json!(1);
        assert_eq!(compare_nulls_last(None, Some(&one), false), Ordering::Greater);
        assert_eq!(compare_nulls_last(None, Some(&one), true), Ordering::Greater);
        assert_eq!(
            compare_nulls_last(Some(&Value::Null), Some(&one), true),
            Ordering::Greater
        );
        assert_eq!(compare_nulls_last(None, None, true), Ordering::Equal);
    }
}
