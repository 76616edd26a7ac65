//! Proptest strategies for value trees

use bulkflow_format::{ExtensionValue, Integer, Value};
use proptest::prelude::*;

/// Any integer of the wire range, biased towards encoding-tier boundaries.
pub fn arb_integer() -> impl Strategy<Value = Integer> {
    prop_oneof![
        any::<i64>().prop_map(Integer::from),
        any::<u64>().prop_map(Integer::from),
        prop::sample::select(crate::TestDataGenerator::boundary_integers()),
    ]
}

/// Any non-container value.
pub fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Boolean),
        arb_integer().prop_map(Value::Integer),
        any::<f64>().prop_map(Value::Float),
        ".{0,40}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Binary),
        (any::<i8>(), prop::collection::vec(any::<u8>(), 0..20))
            .prop_map(|(code, data)| Value::Extension(ExtensionValue::new(code, data))),
    ]
}

/// Value trees nested up to `depth` container levels.
pub fn arb_value(depth: u32) -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(depth, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::vec((inner.clone(), inner), 0..8).prop_map(Value::Map),
        ]
    })
}
