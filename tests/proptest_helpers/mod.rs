#![allow(dead_code)]

use beardstore::schema::{BoxOrder, BoxReference, FieldSchema, ValueType};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub const CLASSES: [&str; 4] = ["Car", "Van", "Truck", "DontCare"];

/// One schema field with a token generator that produces valid tokens for it.
#[derive(Clone, Debug)]
pub struct FieldCase {
    pub schema: FieldSchema,
    pub tokens: Vec<String>,
}

fn int_token() -> impl Strategy<Value = String> {
    (-10_000i64..10_000).prop_map(|v| v.to_string())
}

/// Floats that survive a text round trip unchanged.
fn float_token() -> impl Strategy<Value = String> {
    (-100_000i64..100_000).prop_map(|v| (v as f64 / 8.0).to_string())
}

fn word_token() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

fn scalar(dtype: ValueType) -> BoxedStrategy<String> {
    match dtype {
        ValueType::Int => int_token().boxed(),
        ValueType::Float => float_token().boxed(),
        ValueType::Str => word_token().boxed(),
    }
}

fn arb_dtype() -> impl Strategy<Value = ValueType> {
    prop_oneof![
        Just(ValueType::Int),
        Just(ValueType::Float),
        Just(ValueType::Str)
    ]
}

/// A field of any kind together with valid tokens. `position` is assigned
/// later.
pub fn arb_field_case(index: usize) -> BoxedStrategy<FieldCase> {
    let name = format!("f{index}");
    let value = {
        let name = name.clone();
        arb_dtype()
            .prop_flat_map(move |dtype| {
                let name = name.clone();
                scalar(dtype).prop_map(move |token| FieldCase {
                    schema: FieldSchema::value(name.clone(), dtype, 0),
                    tokens: vec![token],
                })
            })
            .boxed()
    };
    let array = {
        let name = name.clone();
        (arb_dtype(), 1usize..4)
            .prop_flat_map(move |(dtype, length)| {
                let name = name.clone();
                prop::collection::vec(scalar(dtype), length).prop_map(move |tokens| FieldCase {
                    schema: FieldSchema::array(name.clone(), dtype, tokens.len(), 0),
                    tokens,
                })
            })
            .boxed()
    };
    let box_array = {
        let name = name.clone();
        prop::collection::vec(float_token(), 4)
            .prop_map(move |tokens| FieldCase {
                schema: FieldSchema::box_array(
                    name.clone(),
                    ValueType::Float,
                    BoxOrder::YX,
                    BoxReference::Absolute,
                    0,
                ),
                tokens,
            })
            .boxed()
    };
    let enumeration = (0usize..CLASSES.len(), any::<bool>())
        .prop_map(move |(index, as_int)| {
            let values: Vec<String> = CLASSES.iter().map(|c| c.to_string()).collect();
            let (dtype, token) = if as_int {
                (ValueType::Int, index.to_string())
            } else {
                (ValueType::Str, CLASSES[index].to_string())
            };
            FieldCase {
                schema: FieldSchema::enumeration(name.clone(), dtype, values, 0),
                tokens: vec![token],
            }
        })
        .boxed();

    prop_oneof![value, array, box_array, enumeration].boxed()
}

/// A row: fields with shuffled storage positions.
pub fn arb_row(max_fields: usize) -> impl Strategy<Value = Vec<FieldCase>> {
    (1..=max_fields)
        .prop_flat_map(|n| {
            let cases: Vec<BoxedStrategy<FieldCase>> = (0..n).map(arb_field_case).collect();
            (cases, Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
        })
        .prop_map(|(mut cases, positions)| {
            for (case, position) in cases.iter_mut().zip(positions) {
                case.schema.position = position;
            }
            cases
        })
}
