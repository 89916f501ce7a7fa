use serde_json::Value;

use crate::constants::NOT_SPECIFIED;

/// Address parts in display order
const ADDRESS_FIELDS: [&str; 5] = ["street", "suburb", "city", "province", "postalCode"];

/// Flattens a location column into a single display line.
///
/// The column holds either a JSON-encoded address object or free text.
pub fn format_location(location: Option<&str>) -> String {
    let raw = match location {
        Some(raw) if !raw.is_empty() => raw,
        _ => return NOT_SPECIFIED.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
            return join_address(&map);
        }
        return trimmed.to_string();
    }

    if trimmed.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Same rules as [`format_location`] for a column returned as JSON rather than text.
pub fn format_location_value(location: Option<&Value>) -> String {
    match location {
        None | Some(Value::Null) => NOT_SPECIFIED.to_string(),
        Some(Value::String(s)) => format_location(Some(s)),
        Some(Value::Object(map)) => join_address(map),
        Some(other) => format_location(Some(&other.to_string())),
    }
}

fn join_address(map: &serde_json::Map<String, Value>) -> String {
    let parts: Vec<String> = ADDRESS_FIELDS
        .iter()
        .filter_map(|field| match map.get(*field) {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        parts.join(", ")
    }
}
