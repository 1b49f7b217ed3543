//! JMAP PatchObject semantics: flat maps of JSON-Pointer path to new
//! value, diffed from and applied to event objects.
//!
//! Nested objects diff recursively; arrays and scalars replace
//! wholesale. A `null` value removes the key at its path.

use serde_json::{Map, Value};

/// Computes the patch that turns `src` into `dst`.
///
/// Returns a flat object whose keys are JSON-Pointer paths (no leading
/// slash) and whose values are the new values, with `null` marking
/// removed keys.
#[must_use]
pub fn create(src: &Value, dst: &Value) -> Value {
    let mut patch = Map::new();
    if let (Value::Object(src), Value::Object(dst)) = (src, dst) {
        diff_objects(&mut patch, "", src, dst);
    }
    Value::Object(patch)
}

fn diff_objects(
    patch: &mut Map<String, Value>,
    prefix: &str,
    src: &Map<String, Value>,
    dst: &Map<String, Value>,
) {
    for key in src.keys() {
        if !dst.contains_key(key) {
            patch.insert(join(prefix, key), Value::Null);
        }
    }

    for (key, dst_val) in dst {
        let path = join(prefix, key);
        match src.get(key) {
            None => {
                patch.insert(path, dst_val.clone());
            }
            Some(src_val) if src_val == dst_val => {}
            Some(Value::Object(src_obj)) => {
                if let Value::Object(dst_obj) = dst_val {
                    diff_objects(patch, &path, src_obj, dst_obj);
                } else {
                    patch.insert(path, dst_val.clone());
                }
            }
            Some(_) => {
                patch.insert(path, dst_val.clone());
            }
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    let encoded = encode_segment(key);
    if prefix.is_empty() {
        encoded
    } else {
        format!("{prefix}/{encoded}")
    }
}

fn encode_segment(segment: &str) -> String {
    if segment.contains(['~', '/']) {
        segment.replace('~', "~0").replace('/', "~1")
    } else {
        segment.to_string()
    }
}

fn decode_segment(segment: &str) -> String {
    if segment.contains('~') {
        segment.replace("~1", "/").replace("~0", "~")
    } else {
        segment.to_string()
    }
}

/// Applies a patch to `src`, returning the patched copy.
///
/// Missing intermediate objects are created; a path that runs into a
/// non-object fails the whole application.
#[must_use]
pub fn apply(src: &Value, patch: &Value) -> Option<Value> {
    let Value::Object(patch) = patch else {
        return None;
    };

    let mut result = src.clone();
    for (path, val) in patch {
        apply_one(&mut result, path, val)?;
    }
    Some(result)
}

fn apply_one(target: &mut Value, path: &str, val: &Value) -> Option<()> {
    let segments: Vec<String> = path.split('/').map(decode_segment).collect();
    let (last, parents) = segments.split_last()?;

    let mut cursor = target;
    for segment in parents {
        let obj = cursor.as_object_mut()?;
        cursor = obj
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let obj = cursor.as_object_mut()?;
    if val.is_null() {
        obj.remove(last);
    } else {
        obj.insert(last.clone(), val.clone());
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_reports_changes_and_removals() {
        let src = json!({"title": "a", "color": "red", "sequence": 1});
        let dst = json!({"title": "b", "sequence": 1, "status": "confirmed"});
        let patch = create(&src, &dst);
        assert_eq!(
            patch,
            json!({"title": "b", "color": null, "status": "confirmed"})
        );
    }

    #[test]
    fn create_recurses_into_objects() {
        let src = json!({"alerts": {"a1": {"offset": "PT5M", "action": "display"}}});
        let dst = json!({"alerts": {"a1": {"offset": "PT10M", "action": "display"}}});
        let patch = create(&src, &dst);
        assert_eq!(patch, json!({"alerts/a1/offset": "PT10M"}));
    }

    #[test]
    fn create_replaces_arrays_wholesale() {
        let src = json!({"recurrenceRule": {"byDay": [{"day": "mo"}]}});
        let dst = json!({"recurrenceRule": {"byDay": [{"day": "tu"}]}});
        let patch = create(&src, &dst);
        assert_eq!(patch, json!({"recurrenceRule/byDay": [{"day": "tu"}]}));
    }

    #[test]
    fn apply_round_trips_create() {
        let src = json!({
            "title": "a",
            "locations": {"l1": {"name": "Here", "rel": "unknown"}},
        });
        let dst = json!({
            "title": "b",
            "locations": {"l1": {"name": "There", "rel": "unknown"}},
            "color": "blue",
        });
        let patch = create(&src, &dst);
        assert_eq!(apply(&src, &patch), Some(dst));
    }

    #[test]
    fn apply_null_removes() {
        let src = json!({"title": "a", "color": "red"});
        let patched = apply(&src, &json!({"color": null})).unwrap();
        assert_eq!(patched, json!({"title": "a"}));
    }

    #[test]
    fn apply_creates_intermediates() {
        let src = json!({});
        let patched = apply(&src, &json!({"alerts/a1/offset": "PT5M"})).unwrap();
        assert_eq!(patched, json!({"alerts": {"a1": {"offset": "PT5M"}}}));
    }

    #[test]
    fn apply_fails_through_scalars() {
        let src = json!({"title": "a"});
        assert_eq!(apply(&src, &json!({"title/x": 1})), None);
    }

    #[test]
    fn pointer_escapes_round_trip() {
        let src = json!({"keywords": {"a/b": true}});
        let dst = json!({"keywords": {"a/b": true, "c~d": true}});
        let patch = create(&src, &dst);
        assert_eq!(patch, json!({"keywords/c~0d": true}));
        assert_eq!(apply(&src, &patch), Some(dst));
    }
}
