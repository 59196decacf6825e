//! JSON Schema simplification: downstream schemas are reduced to a compact
//! `{type, properties, required}` subset to avoid validator incompatibility
//! across the downstream ecosystem. Lossy by design — carried over verbatim
//! from the source behavior rather than fixed, per the design notes: arrays,
//! nested objects, and enums all fall through to `{"type": "string"}`.

use serde_json::{json, Map, Value};
use tracing::debug;

pub fn simplify_schema(schema: &Value) -> Value {
    let obj = schema.as_object();

    let top_type = obj
        .and_then(|o| o.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("object")
        .to_string();

    let properties = obj
        .and_then(|o| o.get("properties"))
        .and_then(Value::as_object)
        .map(simplify_properties)
        .unwrap_or_else(|| Value::Object(Map::new()));

    let required = obj
        .and_then(|o| o.get("required"))
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    json!({
        "type": top_type,
        "properties": properties,
        "required": required,
    })
}

fn simplify_properties(properties: &Map<String, Value>) -> Value {
    let mut out = Map::with_capacity(properties.len());
    for (name, prop_schema) in properties {
        out.insert(name.clone(), simplify_property(name, prop_schema));
    }
    Value::Object(out)
}

fn simplify_property(name: &str, schema: &Value) -> Value {
    let description = schema.as_object().and_then(|o| o.get("description")).cloned();
    let ty = property_type(name, schema);

    let mut result = Map::with_capacity(2);
    result.insert("type".to_string(), Value::String(ty));
    if let Some(description) = description {
        result.insert("description".to_string(), description);
    }
    Value::Object(result)
}

fn property_type(name: &str, schema: &Value) -> String {
    let Some(obj) = schema.as_object() else {
        debug!(property = name, "schema is not an object, defaulting to string");
        return "string".to_string();
    };

    if let Some(t) = obj.get("type").and_then(Value::as_str) {
        return t.to_string();
    }

    if let Some(branches) = obj.get("anyOf").and_then(Value::as_array) {
        let non_null: Vec<&Value> = branches
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) != Some("null"))
            .collect();
        if let [single] = non_null.as_slice()
            && let Some(t) = single.get("type").and_then(Value::as_str)
        {
            return t.to_string();
        }
    }

    debug!(property = name, "schema has no recognized type, defaulting to string");
    "string".to_string()
}
