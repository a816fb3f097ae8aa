//! Deep merge of structured values.

use serde_json::{Map, Value};

/// Overlays `top` onto `base`.
///
/// Mappings present on both sides are merged key by key. Any other value in
/// `top` (scalars, lists, or a mapping replacing a non-mapping) replaces the
/// value in `base`. Keys only present in `base` are left untouched.
pub fn deep_merge(base: &mut Map<String, Value>, top: Map<String, Value>) {
    for (key, incoming) in top {
        let incoming = match (base.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                deep_merge(existing, nested);
                continue;
            }
            (_, incoming) => incoming,
        };
        base.insert(key, incoming);
    }
}

/// Short name of a value's type for error messages.
pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
