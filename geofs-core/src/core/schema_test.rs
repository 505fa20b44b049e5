//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::feature::{PropMap, PropValue};
use crate::core::schema::infer_schema;

fn props(entries: &[(&str, PropValue)]) -> PropMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_empty_sample() {
    assert!(infer_schema(&[]).is_empty());
}

#[test]
fn test_all_integers() {
    let samples = vec![
        props(&[("cnt", PropValue::Int(1))]),
        props(&[("cnt", PropValue::Int(2))]),
    ];
    assert_eq!(infer_schema(&samples)["cnt"], "Integer");
}

#[test]
fn test_integer_real_mix_is_real() {
    let samples = vec![
        props(&[("height", PropValue::Int(3))]),
        props(&[("height", PropValue::Real(3.5))]),
    ];
    assert_eq!(infer_schema(&samples)["height"], "Real");
}

#[test]
fn test_mixed_types_collapse_to_string() {
    let samples = vec![
        props(&[("v", PropValue::Int(3))]),
        props(&[("v", PropValue::String("x".to_string()))]),
    ];
    assert_eq!(infer_schema(&samples)["v"], "String");
}

#[test]
fn test_booleans_classify_as_string() {
    let samples = vec![props(&[(
        "flag",
        PropValue::from_json(&serde_json::Value::Bool(true)),
    )])];
    assert_eq!(infer_schema(&samples)["flag"], "String");
}

#[test]
fn test_nulls_contribute_no_observation() {
    let samples = vec![
        props(&[("cnt", PropValue::Null)]),
        props(&[("cnt", PropValue::Int(4))]),
    ];
    assert_eq!(infer_schema(&samples)["cnt"], "Integer");

    // a field observed only as null stays a string
    let samples = vec![props(&[("note", PropValue::Null)])];
    assert_eq!(infer_schema(&samples)["note"], "String");
}
