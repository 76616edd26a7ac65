//! Bridge between [`Value`] and `serde_json::Value`

use std::fmt::Write as _;

use serde_json::{Map, Number};

use super::{ExtensionValue, Integer, Value};

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

impl Value {
    /// Build a value from parsed JSON.
    ///
    /// Integral numbers become [`Value::Integer`] when they fit the wire
    /// range; every other number becomes [`Value::Float`]. Objects keep
    /// their key order.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => number_to_value(&n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (Value::String(k), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON.
    ///
    /// Binary becomes a lowercase-hex string, an extension becomes
    /// `[type_code, "hex"]`, non-finite floats become `null`, and map keys
    /// that are not strings use their own text rendering.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Nil => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => integer_to_json(i),
            Value::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Binary(b) => serde_json::Value::String(to_hex(b)),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => {
                let mut object = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match key {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    object.insert(key, value.to_json());
                }
                serde_json::Value::Object(object)
            }
            Value::Extension(ExtensionValue { type_code, data }) => serde_json::Value::Array(vec![
                serde_json::Value::Number(Number::from(*type_code)),
                serde_json::Value::String(to_hex(data)),
            ]),
        }
    }
}

fn number_to_value(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Integer(Integer::from(i))
    } else if let Some(u) = n.as_u64() {
        Value::Integer(Integer::from(u))
    } else {
        Value::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn integer_to_json(i: &Integer) -> serde_json::Value {
    let number = match i.as_i64() {
        Ok(v) => Number::from(v),
        Err(_) => Number::from(i.to_u64()),
    };
    serde_json::Value::Number(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(json!(null)), Value::Nil);
        assert_eq!(Value::from_json(json!(true)), Value::Boolean(true));
        assert_eq!(Value::from_json(json!(-3)), Value::from(-3i64));
        assert_eq!(Value::from_json(json!(u64::MAX)), Value::from(u64::MAX));
        assert_eq!(Value::from_json(json!(2.5)), Value::Float(2.5));
        assert_eq!(Value::from_json(json!("hi")), Value::from("hi"));
    }

    #[test]
    fn test_json_round_trip_for_json_native_values() {
        let json = json!({
            "id": 1,
            "tags": ["a", "b"],
            "nested": {"ok": false, "ratio": 0.25, "none": null},
            "big": 18446744073709551615u64
        });
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_object_key_order_is_kept() {
        let text = r#"{"zeta":1,"alpha":2,"mid":{"y":true,"b":null}}"#;
        let value = Value::from_json(serde_json::from_str(text).unwrap());
        let keys: Vec<&str> = value
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str().unwrap())
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(serde_json::to_string(&value.to_json()).unwrap(), text);
    }

    #[test]
    fn test_to_json_non_json_variants() {
        assert_eq!(Value::Binary(vec![0xde, 0xad]).to_json(), json!("dead"));
        assert_eq!(
            Value::Extension(ExtensionValue::new(-1, vec![1, 2])).to_json(),
            json!([-1, "0102"])
        );
        assert_eq!(Value::Float(f64::INFINITY).to_json(), json!(null));
        let map = Value::Map(vec![(Value::from(7i64), Value::from("seven"))]);
        assert_eq!(map.to_json(), json!({"7": "seven"}));
    }
}
