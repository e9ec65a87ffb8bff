//! Random models generated from their JSON Schema
//!
//! [`ModelFactory::create`] derives `T`'s schema with `schemars`, generates a
//! conforming `serde_json::Value` and deserializes it into `T`. Handles the
//! subset `schemars` emits: string, integer, number, boolean, array (including
//! `prefixItems` tuples), object, enum, const, `$ref` into `$defs`, anyOf,
//! oneOf, allOf and `type` arrays.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// Maximum recursion depth for schema traversal (stops circular `$ref`).
const MAX_DEPTH: u32 = 20;

/// Upper bound for generated strings regardless of `maxLength`.
const MAX_STRING_LEN: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum DatagenError {
    #[error("generated value does not fit {type_name}: {message}")]
    Deserialize {
        type_name: &'static str,
        message: String,
    },
}

/// Random model builder
#[derive(Debug, Clone)]
pub struct ModelFactory {
    rng: SmallRng,
}

impl Default for ModelFactory {
    fn default() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl ModelFactory {
    /// Reproducible factory.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// A random `T`.
    ///
    /// # Errors
    ///
    /// Returns error if the generated value does not deserialize into `T`
    /// (custom `Deserialize` impls narrower than their schema).
    pub fn create<T: JsonSchema + DeserializeOwned>(&mut self) -> Result<T, DatagenError> {
        let schema = schemars::schema_for!(T);
        let value = self.value(schema.as_value());
        serde_json::from_value(value).map_err(|e| DatagenError::Deserialize {
            type_name: std::any::type_name::<T>(),
            message: e.to_string(),
        })
    }

    /// A random `T`, then adjusted by `configure`.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub fn create_with<T, F>(&mut self, configure: F) -> Result<T, DatagenError>
    where
        T: JsonSchema + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut model = self.create::<T>()?;
        configure(&mut model);
        Ok(model)
    }

    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub fn create_many<T: JsonSchema + DeserializeOwned>(
        &mut self,
        count: usize,
    ) -> Result<Vec<T>, DatagenError> {
        (0..count).map(|_| self.create::<T>()).collect()
    }

    /// A random element of `items`, `None` if empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// A random value conforming to `schema` (a root schema; `$ref`s resolve
    /// against its `$defs` or `definitions`).
    pub fn value(&mut self, schema: &Value) -> Value {
        generate(schema, schema, &mut self.rng, 0)
    }

    /// The underlying generator, for values with no schema.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

fn generate(schema: &Value, root: &Value, rng: &mut impl Rng, depth: u32) -> Value {
    if depth > MAX_DEPTH {
        return Value::Null;
    }

    if let Some(ref_str) = schema.get("$ref").and_then(Value::as_str) {
        return match resolve_ref(ref_str, root) {
            Some(resolved) => generate(resolved, root, rng, depth + 1),
            None => Value::Null,
        };
    }

    if let Some(value) = schema.get("const") {
        return value.clone();
    }

    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        if let Some(value) = values.choose(rng) {
            return value.clone();
        }
    }

    // anyOf / oneOf: one non-null variant
    for key in ["anyOf", "oneOf"] {
        if let Some(variants) = schema.get(key).and_then(Value::as_array) {
            let non_null: Vec<_> = variants.iter().filter(|s| !is_null_schema(s)).collect();
            return match non_null.choose(rng) {
                Some(variant) => generate(variant, root, rng, depth + 1),
                None => Value::Null,
            };
        }
    }

    // allOf: merge objects
    if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
        let mut merged = Map::new();
        for sub in all_of {
            if let Value::Object(obj) = generate(sub, root, rng, depth + 1) {
                merged.extend(obj);
            }
        }
        return Value::Object(merged);
    }

    match schema_type(schema) {
        Some("string") => gen_string(schema, rng),
        Some("integer") => gen_integer(schema, rng),
        Some("number") => gen_number(schema, rng),
        Some("boolean") => Value::Bool(rng.gen_bool(0.5)),
        Some("array") => gen_array(schema, root, rng, depth + 1),
        Some("object") => gen_object(schema, root, rng, depth + 1),
        Some("null") => Value::Null,
        _ => {
            if schema.get("properties").is_some() {
                gen_object(schema, root, rng, depth + 1)
            } else if schema.get("items").is_some() || schema.get("prefixItems").is_some() {
                gen_array(schema, root, rng, depth + 1)
            } else {
                Value::String(random_alnum(rng, 8))
            }
        }
    }
}

/// `type` as a string, or the first non-null entry of a `type` array.
fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(s) => Some(s),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .or(Some("null")),
        _ => None,
    }
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
        || schema.get("const").is_some_and(Value::is_null)
}

fn resolve_ref<'a>(ref_str: &str, root: &'a Value) -> Option<&'a Value> {
    if ref_str == "#" {
        return Some(root);
    }
    ["#/$defs/", "#/definitions/"].iter().find_map(|prefix| {
        let name = ref_str.strip_prefix(prefix)?;
        root.get(&prefix[2..prefix.len() - 1])?.get(name)
    })
}

fn gen_string(schema: &Value, rng: &mut impl Rng) -> Value {
    let format = schema.get("format").and_then(Value::as_str);
    match format {
        Some("email") => Value::String(format!("user{}@example.com", rng.gen_range(1..9999_u32))),
        Some("uri" | "url") => Value::String("https://example.com".into()),
        Some("date") => Value::String("2024-01-15".into()),
        Some("date-time") => Value::String("2024-01-15T12:00:00Z".into()),
        Some("uuid") => Value::String(format!(
            "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
            rng.r#gen::<u32>(),
            rng.r#gen::<u16>(),
            rng.r#gen::<u16>() & 0x0FFF,
            (rng.r#gen::<u16>() & 0x3FFF) | 0x8000,
            rng.r#gen::<u64>() & 0xFFFF_FFFF_FFFF,
        )),
        _ => {
            let min = length_bound(schema, "minLength").unwrap_or(1);
            let max = length_bound(schema, "maxLength").unwrap_or(20);
            let len = rng.gen_range(min..=max.max(min));
            Value::String(random_alnum(rng, len))
        }
    }
}

fn length_bound(schema: &Value, key: &str) -> Option<usize> {
    schema
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| usize::try_from(v).map_or(MAX_STRING_LEN, |n| n.min(MAX_STRING_LEN)))
}

fn gen_integer(schema: &Value, rng: &mut impl Rng) -> Value {
    let min = schema.get("minimum").and_then(Value::as_i64);
    let max = schema.get("maximum").and_then(Value::as_i64);
    let (min, max) = match (min, max) {
        (Some(lo), Some(hi)) => (lo, hi.max(lo)),
        (Some(lo), None) => (lo, lo.saturating_add(1000)),
        (None, Some(hi)) => (hi.saturating_sub(1000), hi),
        (None, None) => (-1000, 1000),
    };
    Value::Number(rng.gen_range(min..=max).into())
}

fn gen_number(schema: &Value, rng: &mut impl Rng) -> Value {
    let min = schema.get("minimum").and_then(Value::as_f64).unwrap_or(0.0);
    let max = schema
        .get("maximum")
        .and_then(Value::as_f64)
        .unwrap_or(min + 1000.0)
        .max(min);
    json!(rng.gen_range(min..=max))
}

fn gen_array(schema: &Value, root: &Value, rng: &mut impl Rng, depth: u32) -> Value {
    if let Some(prefix) = schema.get("prefixItems").and_then(Value::as_array) {
        return Value::Array(
            prefix
                .iter()
                .map(|item| generate(item, root, rng, depth))
                .collect(),
        );
    }

    let min = length_bound(schema, "minItems").unwrap_or(0);
    let max = length_bound(schema, "maxItems").unwrap_or(3);
    let count = rng.gen_range(min..=max.max(min));
    let items_schema = schema
        .get("items")
        .cloned()
        .unwrap_or(json!({"type": "string"}));
    let unique = schema.get("uniqueItems").and_then(Value::as_bool) == Some(true);

    let mut items: Vec<Value> = Vec::with_capacity(count);
    let mut attempts = 0;
    while items.len() < count && attempts < count * 10 {
        attempts += 1;
        let item = generate(&items_schema, root, rng, depth);
        if !unique || !items.contains(&item) {
            items.push(item);
        }
    }
    Value::Array(items)
}

fn gen_object(schema: &Value, root: &Value, rng: &mut impl Rng, depth: u32) -> Value {
    let mut obj = Map::new();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        for (key, prop_schema) in props {
            if required.contains(&key.as_str()) || rng.gen_bool(0.5) {
                obj.insert(key.clone(), generate(prop_schema, root, rng, depth));
            }
        }
    }
    Value::Object(obj)
}

fn random_alnum(rng: &mut impl Rng, len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..len)
        .map(|_| char::from(CHARSET[rng.gen_range(0..CHARSET.len())]))
        .collect()
}
