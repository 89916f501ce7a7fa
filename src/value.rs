use serde_json::Value;

const TYPE_KEY: &str = "_type";
const VALUE_KEY: &str = "value";

/// Recursively replaces every `{"_type": .., "value": ..}` wrapper with its inner value.
///
/// Wrappers can appear at any depth inside objects and arrays, and may wrap each
/// other. Primitives and `null` come back unchanged.
pub fn unwrap_value(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if map.contains_key(TYPE_KEY) && map.contains_key(VALUE_KEY) {
                let inner = map.remove(VALUE_KEY).unwrap_or(Value::Null);
                return unwrap_value(inner);
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, unwrap_value(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_value).collect()),
        primitive => primitive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_pass_through() {
        for v in [json!(null), json!(true), json!(42), json!(1.5), json!("text")] {
            assert_eq!(unwrap_value(v.clone()), v);
        }
    }

    #[test]
    fn strips_wrappers_at_any_depth() {
        let wrapped = json!({
            "invoice_ids": {"_type": "array", "value": [
                {"_type": "string", "value": "inv-1"},
                "inv-2"
            ]},
            "meta": {"nested": {"deeper": {"_type": "number", "value": 3}}}
        });
        assert_eq!(
            unwrap_value(wrapped),
            json!({
                "invoice_ids": ["inv-1", "inv-2"],
                "meta": {"nested": {"deeper": 3}}
            })
        );
    }

    #[test]
    fn nested_wrappers_collapse() {
        let wrapped = json!({"_type": "outer", "value": {"_type": "inner", "value": "x"}});
        assert_eq!(unwrap_value(wrapped), json!("x"));
    }

    #[test]
    fn objects_with_only_one_key_are_left_alone() {
        let v = json!({"_type": "note", "label": "kept"});
        assert_eq!(unwrap_value(v.clone()), v);
        let v = json!({"value": 10});
        assert_eq!(unwrap_value(v.clone()), v);
    }

    #[test]
    fn unwrapping_is_idempotent() {
        let inputs = [
            json!({"a": {"_type": "t", "value": [1, {"_type": "t", "value": null}]}}),
            json!([{"_type": "t", "value": {"value": 1}}]),
            json!("plain"),
        ];
        for input in inputs {
            let once = unwrap_value(input);
            assert_eq!(unwrap_value(once.clone()), once);
        }
    }
}
