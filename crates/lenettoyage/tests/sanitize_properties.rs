// Property tests for the response sanitizer
//
// Covers idempotence, absence of leaked embeddings/heavy keys, shape and
// order preservation on arbitrary nested inputs.

use lenettoyage::{is_embedding, is_heavy_key, sanitize, Fields, ResultValue};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = ResultValue> {
    prop_oneof![
        Just(ResultValue::Null),
        any::<bool>().prop_map(ResultValue::Bool),
        any::<i64>().prop_map(ResultValue::Int),
        (-1.0e6f64..1.0e6).prop_map(ResultValue::Float),
        "[a-z ]{0,12}".prop_map(ResultValue::Text),
    ]
}

fn vector() -> impl Strategy<Value = ResultValue> {
    prop::collection::vec(-1.0f64..1.0, 32..96)
        .prop_map(|v| ResultValue::Sequence(v.into_iter().map(ResultValue::Float).collect()))
}

/// Arbitrary values, including embeddings and heavy keys
fn any_value() -> impl Strategy<Value = ResultValue> {
    let leaf = prop_oneof![4 => scalar(), 1 => vector()];
    leaf.prop_recursive(4, 128, 8, |inner| {
        let key = prop_oneof![
            "[a-z_]{1,10}",
            Just("name_embedding".to_string()),
            Just("Fact_Embedding".to_string()),
            Just("attributes".to_string()),
        ];
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..40).prop_map(ResultValue::Sequence),
            prop::collection::vec((key.clone(), inner.clone()), 0..6)
                .prop_map(|pairs| ResultValue::Mapping(pairs.into_iter().collect())),
            ("[A-Z][a-z]{2,8}", prop::collection::vec((key, inner), 0..6)).prop_map(
                |(type_name, pairs)| ResultValue::object(type_name, pairs.into_iter().collect())
            ),
        ]
    })
}

/// Values with no embeddings, no heavy keys, and no attributed objects
fn clean_value() -> impl Strategy<Value = ResultValue> {
    scalar().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..12).prop_map(ResultValue::Sequence),
            prop::collection::vec(("[a-d]{1,6}", inner), 0..6)
                .prop_map(|pairs| ResultValue::Mapping(pairs.into_iter().collect())),
        ]
    })
}

fn leaks(value: &ResultValue) -> bool {
    if is_embedding(value) {
        return true;
    }
    match value {
        ResultValue::Sequence(items) => items.iter().any(leaks),
        ResultValue::Mapping(fields) => fields
            .iter()
            .any(|(key, value)| is_heavy_key(key) || leaks(value)),
        ResultValue::Object(_) => true,
        _ => false,
    }
}

fn same_key_order(a: &ResultValue, b: &ResultValue) -> bool {
    match (a, b) {
        (ResultValue::Mapping(x), ResultValue::Mapping(y)) => {
            x.keys().eq(y.keys())
                && x
                    .iter()
                    .zip(y.iter())
                    .all(|((_, vx), (_, vy))| same_key_order(vx, vy))
        }
        (ResultValue::Sequence(x), ResultValue::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(vx, vy)| same_key_order(vx, vy))
        }
        _ => true,
    }
}

proptest! {
    #[test]
    fn prop_sanitize_is_idempotent(value in any_value()) {
        if let Some(once) = sanitize(&value) {
            prop_assert_eq!(sanitize(&once), Some(once.clone()));
        }
    }

    #[test]
    fn prop_output_never_leaks(value in any_value()) {
        if let Some(clean) = sanitize(&value) {
            prop_assert!(!leaks(&clean));
        }
    }

    #[test]
    fn prop_clean_input_is_unchanged(value in clean_value()) {
        let clean = sanitize(&value);
        prop_assert_eq!(clean.as_ref(), Some(&value));
        prop_assert!(same_key_order(&value, clean.as_ref().unwrap()));
    }

    #[test]
    fn prop_sequence_keeps_relative_order(
        items in prop::collection::vec(
            prop_oneof![
                3 => "[a-z]{1,6}".prop_map(ResultValue::Text),
                1 => vector(),
            ],
            0..20,
        )
    ) {
        let kept: Vec<ResultValue> = items.iter().filter(|v| !is_embedding(v)).cloned().collect();
        let clean = sanitize(&ResultValue::Sequence(items.clone()));
        prop_assert_eq!(clean, Some(ResultValue::Sequence(kept)));
    }

    #[test]
    fn prop_heavy_keys_dropped_at_depth(depth in 1usize..6, key in "[a-z]{0,4}") {
        let mut value = ResultValue::Mapping(
            [
                (format!("{key}_embedding"), ResultValue::from("secret")),
                ("keep".to_string(), ResultValue::Int(1)),
            ]
            .into_iter()
            .collect(),
        );
        for _ in 0..depth {
            let mut outer = Fields::new();
            outer.insert("child", value);
            value = ResultValue::Mapping(outer);
        }

        let clean = sanitize(&value).expect("mappings are always present");
        prop_assert!(!leaks(&clean));
    }
}
