//! Display-diff policy for request review screens.
//!
//! This is deliberately a different comparison from the approval merge in
//! [`super::profile::ProfilePatch::apply_to`]: the approval merge treats a
//! one-sided absent field as "no change", while the review display treats
//! it as a change (an added or removed value is highlighted).

use std::collections::BTreeMap;

use serde_json::Value;

use super::profile::ProfilePatch;

/// Whether two field values differ for display purposes. Objects are
/// compared key-by-key; a key present on only one side counts as changed.
pub fn display_changed(old: &Value, new: &Value) -> bool {
    match (old, new) {
        (Value::Null, Value::Null) => false,
        (Value::Null, _) | (_, Value::Null) => true,
        (Value::Object(old_map), Value::Object(new_map)) => {
            old_map
                .iter()
                .any(|(key, old_val)| match new_map.get(key) {
                    Some(new_val) => display_changed(old_val, new_val),
                    None => true,
                })
                || new_map.keys().any(|key| !old_map.contains_key(key))
        }
        (a, b) => scalar_repr(a) != scalar_repr(b),
    }
}

fn scalar_repr(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Per-field change map between the `old` and `new` snapshots of a request,
/// keyed by the snapshot field name. Consumed by review screens for
/// old=red / new=green highlighting.
pub fn change_set(old: &ProfilePatch, new: &ProfilePatch) -> BTreeMap<String, bool> {
    let old = serde_json::to_value(old).unwrap_or(Value::Null);
    let new = serde_json::to_value(new).unwrap_or(Value::Null);

    let (Value::Object(old_map), Value::Object(new_map)) = (&old, &new) else {
        return BTreeMap::new();
    };

    let mut fields = BTreeMap::new();
    for key in old_map.keys().chain(new_map.keys()) {
        let old_val = old_map.get(key).unwrap_or(&Value::Null);
        let new_val = new_map.get(key).unwrap_or(&Value::Null);
        fields.insert(key.clone(), display_changed(old_val, new_val));
    }
    fields
}
