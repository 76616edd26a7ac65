//! bulkflow Test Utilities
//!
//! This crate provides shared testing utilities and helpers for the bulkflow project.

use bulkflow_format::{ExtensionValue, Integer, Value};

pub mod strategies;

/// Builder for creating record values (string-keyed maps) with common patterns
pub struct RecordBuilder {
    fields: Vec<(Value, Value)>,
}

impl RecordBuilder {
    /// Create a new record builder
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field with a string value
    pub fn string(self, key: &str, value: &str) -> Self {
        self.field(key, Value::from(value))
    }

    /// Add a field with an integer value
    pub fn int(self, key: &str, value: impl Into<Integer>) -> Self {
        self.field(key, Value::Integer(value.into()))
    }

    /// Add a field with a float value
    pub fn float(self, key: &str, value: f64) -> Self {
        self.field(key, Value::Float(value))
    }

    /// Add a field with a boolean value
    pub fn bool(self, key: &str, value: bool) -> Self {
        self.field(key, Value::Boolean(value))
    }

    /// Add a field with a nil value
    pub fn nil(self, key: &str) -> Self {
        self.field(key, Value::Nil)
    }

    /// Add a field with a binary value
    pub fn binary(self, key: &str, value: &[u8]) -> Self {
        self.field(key, Value::Binary(value.to_vec()))
    }

    /// Add a field with an extension value
    pub fn extension(self, key: &str, type_code: i8, data: &[u8]) -> Self {
        self.field(key, Value::Extension(ExtensionValue::new(type_code, data)))
    }

    /// Add a field with an array value
    pub fn array(self, key: &str, value: Vec<Value>) -> Self {
        self.field(key, Value::Array(value))
    }

    /// Add a field with any value
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.push((Value::from(key), value));
        self
    }

    /// Build the record
    pub fn build(self) -> Value {
        Value::Map(self.fields)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate test data with various patterns
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// One record per variant, including the unsigned upper half of the integer range
    pub fn every_variant_record() -> Value {
        RecordBuilder::new()
            .nil("nil")
            .bool("flag", true)
            .int("small", 7i64)
            .int("negative", -33i64)
            .int("long_min", i64::MIN)
            .int("ulong_max", u64::MAX)
            .float("ratio", 0.125)
            .string("text", "Hello, 世界! 🌍")
            .binary("blob", &[0x00, 0xff, 0x10])
            .extension("ext", 42, &[1, 2, 3, 4])
            .array("list", vec![Value::from(1i64), Value::from("two"), Value::Nil])
            .build()
    }

    /// Generate boundary integer values for every encoding tier
    pub fn boundary_integers() -> Vec<Integer> {
        let signed = [
            i64::MIN,
            i64::from(i32::MIN) - 1,
            i64::from(i32::MIN),
            i64::from(i16::MIN) - 1,
            i64::from(i16::MIN),
            i64::from(i8::MIN) - 1,
            i64::from(i8::MIN),
            -33,
            -32,
            -1,
            0,
            127,
            128,
            255,
            256,
            65_535,
            65_536,
            i64::from(u32::MAX),
            i64::from(u32::MAX) + 1,
            i64::MAX,
        ];
        let mut values: Vec<Integer> = signed.iter().copied().map(Integer::from).collect();
        values.push(Integer::from(1u64 << 63));
        values.push(Integer::from(u64::MAX));
        values
    }

    /// Generate a record nested `depth` levels deep through alternating maps and arrays
    pub fn nested_record(depth: usize) -> Value {
        let mut value = Value::from("leaf");
        for level in 0..depth {
            value = if level % 2 == 0 {
                RecordBuilder::new()
                    .int("level", level as i64)
                    .field("child", value)
                    .build()
            } else {
                Value::Array(vec![Value::from(level as i64), value])
            };
        }
        value
    }

    /// Generate a large number of log-like records for stress testing
    pub fn large_record_set(count: usize) -> Vec<Value> {
        let levels = ["DEBUG", "INFO", "WARN", "ERROR"];
        (0..count)
            .map(|i| {
                RecordBuilder::new()
                    .int("id", i as i64)
                    .int("timestamp", 1_609_459_200 + i as i64)
                    .string("level", levels[i % levels.len()])
                    .string("user", &format!("user_{}", i % 100))
                    .string("message", &format!("Test message number {}", i))
                    .build()
            })
            .collect()
    }

    /// Render records as NDJSON text
    pub fn ndjson(records: &[Value]) -> String {
        let mut out = String::new();
        for record in records {
            out.push_str(&record.to_json().to_string());
            out.push('\n');
        }
        out
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use bulkflow_format::Value;

    /// Assert that two values are equal, printing both renderings on failure
    pub fn assert_value_equal(actual: &Value, expected: &Value, context: &str) {
        if actual != expected {
            panic!(
                "Value assertion failed in {}:\nExpected: {:?}\nActual: {:?}",
                context, expected, actual
            );
        }
    }
}
