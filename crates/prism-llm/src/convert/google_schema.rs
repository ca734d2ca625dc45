//! JSON Schema sanitization for the Google schema dialect
//!
//! Gemini's function declaration schema is a restricted subset of JSON
//! Schema: no `$ref`/`allOf`, no type unions, uppercased type names, and a
//! `nullable` flag instead of null unions. Tool parameter schemas are
//! rewritten into that dialect before they go on the wire.

use serde_json::{Map, Value, json};

/// Keys the Google schema dialect understands; everything else is dropped
const SUPPORTED_KEYS: [&str; 16] = [
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "items",
    "properties",
    "required",
    "minimum",
    "maximum",
    "minItems",
    "maxItems",
    "minLength",
    "maxLength",
    "pattern",
    "default",
];

/// Rewrite a JSON Schema into Google's schema dialect
pub fn sanitize(schema: &Value) -> Value {
    let mut visited = Vec::new();
    sanitize_node(schema, schema, &mut visited)
}

fn sanitize_node(node: &Value, root: &Value, visited: &mut Vec<String>) -> Value {
    let Some(obj) = node.as_object() else {
        return node.clone();
    };

    // Inline $ref targets; a ref already on the resolution stack is a
    // cycle and degrades to an untyped object
    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        if visited.iter().any(|seen| seen == reference) {
            return json!({"type": "OBJECT"});
        }
        visited.push(reference.to_owned());
        let resolved = resolve_ref(root, reference)
            .map_or_else(|| json!({"type": "OBJECT"}), |target| sanitize_node(target, root, visited));
        visited.pop();
        return resolved;
    }

    // allOf merges into one flat schema
    if let Some(all_of) = obj.get("allOf").and_then(Value::as_array) {
        let mut base = obj.clone();
        base.remove("allOf");
        let mut merged = sanitize_node(&Value::Object(base), root, visited);
        for sub in all_of {
            let sanitized = sanitize_node(sub, root, visited);
            merge_schemas(&mut merged, &sanitized);
        }
        return merged;
    }

    // anyOf/oneOf null unions flatten into a nullable flag; other unions
    // keep their first variant, which is the best the dialect can express
    if let Some(variants) = obj
        .get("anyOf")
        .or_else(|| obj.get("oneOf"))
        .and_then(Value::as_array)
    {
        let has_null = variants.iter().any(is_null_type);
        let first = variants.iter().find(|v| !is_null_type(v));
        let mut flattened =
            first.map_or_else(|| json!({"type": "OBJECT"}), |v| sanitize_node(v, root, visited));
        if has_null
            && let Some(target) = flattened.as_object_mut()
        {
            target.insert("nullable".to_owned(), Value::Bool(true));
        }
        return flattened;
    }

    let mut out = Map::new();
    let mut nullable = obj.get("nullable").and_then(Value::as_bool).unwrap_or(false);

    // Type unions with null become the non-null type plus nullable
    match obj.get("type") {
        Some(Value::String(name)) => {
            out.insert("type".to_owned(), Value::String(name.to_uppercase()));
        }
        Some(Value::Array(names)) => {
            if names.iter().any(|n| n.as_str() == Some("null")) {
                nullable = true;
            }
            if let Some(name) = names.iter().filter_map(Value::as_str).find(|n| *n != "null") {
                out.insert("type".to_owned(), Value::String(name.to_uppercase()));
            }
        }
        _ => {}
    }

    for (key, value) in obj {
        match key.as_str() {
            "type" | "nullable" => {}
            // Exclusive bounds degrade to their inclusive counterparts
            "exclusiveMinimum" => {
                if value.is_number() {
                    out.entry("minimum".to_owned()).or_insert_with(|| value.clone());
                }
            }
            "exclusiveMaximum" => {
                if value.is_number() {
                    out.entry("maximum".to_owned()).or_insert_with(|| value.clone());
                }
            }
            "properties" => {
                if let Some(props) = value.as_object() {
                    let sanitized: Map<String, Value> = props
                        .iter()
                        .map(|(name, sub)| (name.clone(), sanitize_node(sub, root, visited)))
                        .collect();
                    out.insert("properties".to_owned(), Value::Object(sanitized));
                }
            }
            "items" => {
                out.insert("items".to_owned(), sanitize_node(value, root, visited));
            }
            _ if SUPPORTED_KEYS.contains(&key.as_str()) => {
                out.insert(key.clone(), value.clone());
            }
            _ => {}
        }
    }

    if nullable {
        out.insert("nullable".to_owned(), Value::Bool(true));
    }

    Value::Object(out)
}

/// Resolve a local `#/...` reference against the schema root
fn resolve_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    root.pointer(pointer)
}

fn is_null_type(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

/// Merge `source` schema fields into `target` (for `allOf` flattening)
fn merge_schemas(target: &mut Value, source: &Value) {
    let (Some(target), Some(source)) = (target.as_object_mut(), source.as_object()) else {
        return;
    };

    for (key, value) in source {
        match key.as_str() {
            "properties" => {
                let entry = target
                    .entry("properties".to_owned())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let (Some(existing), Some(incoming)) = (entry.as_object_mut(), value.as_object()) {
                    for (name, sub) in incoming {
                        existing.insert(name.clone(), sub.clone());
                    }
                }
            }
            "required" => {
                let entry = target
                    .entry("required".to_owned())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let (Some(existing), Some(incoming)) = (entry.as_array_mut(), value.as_array()) {
                    for name in incoming {
                        if !existing.contains(name) {
                            existing.push(name.clone());
                        }
                    }
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_type_union_becomes_nullable() {
        let schema = json!({"type": ["string", "null"]});
        assert_eq!(sanitize(&schema), json!({"type": "STRING", "nullable": true}));
    }

    #[test]
    fn exclusive_bounds_degrade_to_inclusive() {
        let schema = json!({"type": "integer", "exclusiveMinimum": 5, "exclusiveMaximum": 10});
        assert_eq!(
            sanitize(&schema),
            json!({"type": "INTEGER", "minimum": 5, "maximum": 10})
        );
    }

    #[test]
    fn refs_are_inlined() {
        let schema = json!({
            "type": "object",
            "properties": {
                "location": {"$ref": "#/$defs/Location"}
            },
            "$defs": {
                "Location": {"type": "string", "description": "city name"}
            }
        });
        let sanitized = sanitize(&schema);
        assert_eq!(
            sanitized["properties"]["location"],
            json!({"type": "STRING", "description": "city name"})
        );
        // $defs itself is not a supported key
        assert!(sanitized.get("$defs").is_none());
    }

    #[test]
    fn cyclic_refs_degrade_instead_of_recursing() {
        let schema = json!({
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/$defs/Node"}}
                }
            },
            "$ref": "#/$defs/Node"
        });
        let sanitized = sanitize(&schema);
        assert_eq!(sanitized["properties"]["next"], json!({"type": "OBJECT"}));
    }

    #[test]
    fn all_of_merges_into_flat_schema() {
        let schema = json!({
            "allOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]},
                {"type": "object", "properties": {"b": {"type": "number"}}, "required": ["b"]}
            ]
        });
        let sanitized = sanitize(&schema);
        assert_eq!(sanitized["type"], json!("OBJECT"));
        assert_eq!(sanitized["properties"]["a"]["type"], json!("STRING"));
        assert_eq!(sanitized["properties"]["b"]["type"], json!("NUMBER"));
        assert_eq!(sanitized["required"], json!(["a", "b"]));
    }

    #[test]
    fn any_of_null_union_flattens() {
        let schema = json!({
            "anyOf": [
                {"type": "string", "maxLength": 10},
                {"type": "null"}
            ]
        });
        assert_eq!(
            sanitize(&schema),
            json!({"type": "STRING", "maxLength": 10, "nullable": true})
        );
    }

    #[test]
    fn unsupported_keys_are_dropped() {
        let schema = json!({
            "type": "string",
            "additionalProperties": false,
            "$schema": "http://json-schema.org/draft-07/schema#"
        });
        assert_eq!(sanitize(&schema), json!({"type": "STRING"}));
    }
}
