//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Attribute type inference from sampled feature properties.

use crate::core::feature::PropMap;
use std::collections::{BTreeMap, BTreeSet};

/// Infer attribute types from a bounded sample of property maps.
///
/// Returns field name -> "String" | "Integer" | "Real". All integer
/// observations give `Integer`; a mix of integers and reals gives `Real`;
/// anything else collapses to `String`. Nulls contribute no observation.
pub fn infer_schema(samples: &[PropMap]) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, BTreeSet<&'static str>> = BTreeMap::new();
    for props in samples {
        for (name, value) in props {
            let labels = fields.entry(name.clone()).or_insert_with(BTreeSet::new);
            if let Some(label) = value.type_label() {
                labels.insert(label);
            }
        }
    }

    let mut schema = BTreeMap::new();
    for (name, labels) in fields {
        let inferred = if labels.is_empty() {
            "String"
        } else if labels.iter().all(|l| *l == "Integer") {
            "Integer"
        } else if labels.iter().all(|l| *l == "Integer" || *l == "Real") {
            "Real"
        } else {
            "String"
        };
        schema.insert(name, inferred.to_string());
    }
    schema
}
