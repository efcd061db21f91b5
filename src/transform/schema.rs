//! Schema-driven record shaping

use super::RecordTransformer;
use crate::catalog::MetadataMap;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use crate::watermark::Watermark;
use serde::{Deserialize, Serialize};

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `object`
    Object,
    /// `array`
    Array,
    /// `null`
    Null,
}

impl JsonType {
    /// Parse a schema type name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// Types a schema node declares, in declaration order.
    /// Empty when the node does not constrain the type.
    pub fn declared(schema: &JsonValue) -> Vec<Self> {
        match schema.get("type") {
            Some(JsonValue::String(name)) => Self::parse(name).into_iter().collect(),
            Some(JsonValue::Array(names)) => names
                .iter()
                .filter_map(JsonValue::as_str)
                .filter_map(Self::parse)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Type of a JSON value (integral numbers are `Integer`)
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(_) => Self::Boolean,
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            JsonValue::Number(_) => Self::Number,
            JsonValue::String(_) => Self::String,
            JsonValue::Array(_) => Self::Array,
            JsonValue::Object(_) => Self::Object,
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Number => write!(f, "number"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Object => write!(f, "object"),
            JsonType::Array => write!(f, "array"),
            JsonType::Null => write!(f, "null"),
        }
    }
}

// ============================================================================
// Transformers
// ============================================================================

/// Keeps selected schema fields and coerces them to their declared types
#[derive(Debug, Clone)]
pub struct SchemaTransformer {
    drop_unknown: bool,
}

impl Default for SchemaTransformer {
    fn default() -> Self {
        Self { drop_unknown: true }
    }
}

impl SchemaTransformer {
    /// Create a transformer that drops fields absent from the schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep top-level fields the schema does not mention
    #[must_use]
    pub fn keep_unknown_fields(mut self) -> Self {
        self.drop_unknown = false;
        self
    }
}

impl RecordTransformer for SchemaTransformer {
    fn transform(
        &self,
        stream: &str,
        record: JsonValue,
        schema: &JsonValue,
        metadata: &MetadataMap,
    ) -> Result<JsonValue> {
        let JsonValue::Object(fields) = record else {
            return Err(Error::transform(
                stream,
                format!("expected an object, got {}", JsonType::of(&record)),
            ));
        };

        let properties = schema.get("properties").and_then(JsonValue::as_object);
        let mut out = JsonObject::new();

        for (name, value) in fields {
            if !metadata.is_property_selected(&name) {
                continue;
            }
            match properties.and_then(|p| p.get(&name)) {
                Some(field_schema) => {
                    let value = coerce(&value, field_schema)
                        .map_err(|msg| Error::transform(stream, format!("field '{name}': {msg}")))?;
                    out.insert(name, value);
                }
                None if properties.is_none() || !self.drop_unknown => {
                    out.insert(name, value);
                }
                None => {}
            }
        }

        Ok(JsonValue::Object(out))
    }
}

/// Returns records unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTransformer;

impl RecordTransformer for PassthroughTransformer {
    fn transform(
        &self,
        _stream: &str,
        record: JsonValue,
        _schema: &JsonValue,
        _metadata: &MetadataMap,
    ) -> Result<JsonValue> {
        Ok(record)
    }
}

// ============================================================================
// Coercion
// ============================================================================

type Coerced = std::result::Result<JsonValue, String>;

fn coerce(value: &JsonValue, schema: &JsonValue) -> Coerced {
    let types = JsonType::declared(schema);
    if types.is_empty() {
        return Ok(value.clone());
    }

    // Prefer the value's own type so `["string", "integer"]` leaves "7" alone
    let own = JsonType::of(value);
    let exact = types
        .iter()
        .copied()
        .find(|ty| *ty == own || (own == JsonType::Integer && *ty == JsonType::Number));

    for ty in exact.into_iter().chain(types.iter().copied()) {
        if let Some(coerced) = coerce_to(value, ty, schema)? {
            return Ok(coerced);
        }
    }

    let expected: Vec<String> = types.iter().map(ToString::to_string).collect();
    Err(format!("cannot convert {own} {value} to {}", expected.join(" or ")))
}

/// `Ok(None)` when `value` cannot be represented as `ty`
fn coerce_to(
    value: &JsonValue,
    ty: JsonType,
    schema: &JsonValue,
) -> std::result::Result<Option<JsonValue>, String> {
    let coerced = match (ty, value) {
        (JsonType::Null, JsonValue::Null) => Some(JsonValue::Null),

        (JsonType::Boolean, JsonValue::Bool(b)) => Some(JsonValue::Bool(*b)),
        (JsonType::Boolean, JsonValue::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(JsonValue::Bool(true)),
            "false" => Some(JsonValue::Bool(false)),
            _ => None,
        },
        (JsonType::Boolean, JsonValue::Number(n)) => match n.as_i64() {
            Some(0) => Some(JsonValue::Bool(false)),
            Some(1) => Some(JsonValue::Bool(true)),
            _ => None,
        },

        (JsonType::Integer, JsonValue::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| JsonValue::from(f as i64))
            }
        }
        (JsonType::Integer, JsonValue::String(s)) => s.trim().parse::<i64>().ok().map(JsonValue::from),

        (JsonType::Number, JsonValue::Number(_)) => Some(value.clone()),
        (JsonType::Number, JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number),

        (JsonType::String, JsonValue::String(s)) => {
            if schema.get("format").and_then(JsonValue::as_str) == Some("date-time") {
                Watermark::parse_str(s).ok().map(|wm| JsonValue::String(wm.to_iso8601()))
            } else {
                Some(value.clone())
            }
        }
        (JsonType::String, JsonValue::Number(_) | JsonValue::Bool(_)) => {
            Some(JsonValue::String(value.to_string()))
        }

        (JsonType::Object, JsonValue::Object(fields)) => Some(coerce_object(fields, schema)?),
        (JsonType::Array, JsonValue::Array(items)) => Some(coerce_array(items, schema)?),

        _ => None,
    };
    Ok(coerced)
}

fn coerce_object(fields: &JsonObject, schema: &JsonValue) -> Coerced {
    let properties = schema.get("properties").and_then(JsonValue::as_object);
    let mut out = JsonObject::new();
    for (name, value) in fields {
        let value = match properties.and_then(|p| p.get(name)) {
            Some(field_schema) => coerce(value, field_schema).map_err(|msg| format!("{name}: {msg}"))?,
            None => value.clone(),
        };
        out.insert(name.clone(), value);
    }
    Ok(JsonValue::Object(out))
}

fn coerce_array(items: &[JsonValue], schema: &JsonValue) -> Coerced {
    let Some(item_schema) = schema.get("items") else {
        return Ok(JsonValue::Array(items.to_vec()));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| coerce(item, item_schema).map_err(|msg| format!("[{i}] {msg}")))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(JsonValue::Array)
}
