//! Path addressing inside a JSON document, with the same semantics the remote
//! store applies: writing `null` removes a node and emptied parents disappear.

use serde_json::{Map, Value};

pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn join(base: &str, child: &str) -> String {
    let mut all = segments(base);
    all.extend(segments(child));
    all.join("/")
}

//true if one path is an ancestor of (or equal to) the other
#[cfg(test)]
pub fn is_related(a: &str, b: &str) -> bool {
    let a = segments(a);
    let b = segments(b);
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

#[cfg(test)]
pub fn value_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).into_iter().try_fold(root, |node, segment| node.get(segment))
}

pub fn set_at(root: &mut Value, path: &str, value: Value) {
    let value = match value {
        Value::Object(map) if map.is_empty() => Value::Null,
        other => other,
    };

    set_segments(root, &segments(path), value);
}

pub fn merge_at(root: &mut Value, path: &str, children: Map<String, Value>) {
    for (key, value) in children {
        set_at(root, &join(path, &key), value);
    }
}

fn set_segments(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        if rest.is_empty() && value.is_null() {
            map.remove(*head);
        } else {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_segments(child, rest, value);
            if child.is_null() {
                map.remove(*head);
            }
        }

        if map.is_empty() {
            *node = Value::Null;
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn set_creates_intermediate_nodes() {
        let mut root = Value::Null;

        set_at(&mut root, "status/pump", json!("ON"));

        assert_eq!(root, json!({"status": {"pump": "ON"}}));
    }

    #[test]
    fn set_at_root_replaces_document() {
        let mut root = json!({"pump": "ON"});

        set_at(&mut root, "/", json!({"pump": "OFF", "buzzer": "OFF"}));

        assert_eq!(root, json!({"pump": "OFF", "buzzer": "OFF"}));
    }

    #[test]
    fn null_removes_node_and_empty_parents() {
        let mut root = json!({"status": {"pump": "ON"}, "control": {"temperature": 25}});

        set_at(&mut root, "status/pump", Value::Null);

        assert_eq!(root, json!({"control": {"temperature": 25}}));
    }

    #[test]
    fn merge_updates_only_given_children() {
        let mut root = json!({"pump": "OFF", "buzzer": "OFF"});
        let patch = json!({"buzzer": "ON"});

        merge_at(&mut root, "/", patch.as_object().unwrap().clone());

        assert_eq!(root, json!({"pump": "OFF", "buzzer": "ON"}));
    }

    #[test]
    fn value_lookup_follows_segments() {
        let root = json!({"status": {"pump": "ON"}});

        assert_eq!(value_at(&root, "/status/pump"), Some(&json!("ON")));
        assert_eq!(value_at(&root, "status/buzzer"), None);
        assert_eq!(value_at(&root, ""), Some(&root));
    }

    #[test]
    fn related_paths_share_a_prefix() {
        assert!(is_related("status", "status/pump"));
        assert!(is_related("status/pump", "status"));
        assert!(is_related("/control/", "control"));
        assert!(!is_related("status", "sensorData"));
        assert!(!is_related("status/pump", "status/buzzer"));
    }
}
