//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Rule-based symbology evaluation. Mirrors the client-side rule matching
//! of the admin viewer so server-side and client-side rendering agree.

use geofs_core::core::feature::{PropMap, PropValue};
use geofs_core::core::layer::SymbologyRule;

/// First matching rule in `rule_order`, falling back to the default rule.
/// `None` when no rules exist at all.
pub fn evaluate_rules<'a>(
    rules: &'a [SymbologyRule],
    properties: &PropMap,
) -> Option<&'a SymbologyRule> {
    if rules.is_empty() {
        return None;
    }
    let mut sorted: Vec<&SymbologyRule> = rules.iter().collect();
    sorted.sort_by_key(|r| r.rule_order);
    let default_rule = sorted.iter().find(|r| r.is_default).copied();
    sorted
        .into_iter()
        .find(|rule| !rule.is_default && matches(rule, properties))
        .or(default_rule)
}

fn matches(rule: &SymbologyRule, props: &PropMap) -> bool {
    let field = match &rule.filter_field {
        Some(field) => field,
        None => return true,
    };
    let value = props.get(field).cloned().unwrap_or(PropValue::Null);
    let filter_value = rule.filter_value.as_deref();

    if rule.filter_operator == "is_null" {
        return match &value {
            PropValue::Null => true,
            PropValue::String(s) => s.is_empty(),
            _ => false,
        };
    }
    if value == PropValue::Null {
        return false;
    }

    let text = value.as_text();
    match rule.filter_operator.as_str() {
        "eq" => Some(text.as_str()) == filter_value,
        "neq" => Some(text.as_str()) != filter_value,
        "contains" => filter_value.map(|rv| text.contains(rv)).unwrap_or(false),
        "in" => {
            let allowed: Vec<serde_json::Value> = filter_value
                .and_then(|rv| serde_json::from_str(rv).ok())
                .unwrap_or_default();
            allowed.iter().any(|a| match a {
                serde_json::Value::String(s) => s == &text,
                other => other.to_string() == text,
            })
        }
        op => {
            let num_val = match numeric(&value) {
                Some(n) => n,
                None => return false,
            };
            let num_rv = match filter_value.and_then(|rv| rv.parse::<f64>().ok()) {
                Some(n) => n,
                None => return false,
            };
            match op {
                "gt" => num_val > num_rv,
                "gte" => num_val >= num_rv,
                "lt" => num_val < num_rv,
                "lte" => num_val <= num_rv,
                _ => false,
            }
        }
    }
}

fn numeric(value: &PropValue) -> Option<f64> {
    match value {
        PropValue::Int(i) => Some(*i as f64),
        PropValue::Real(r) => Some(*r),
        PropValue::String(s) => s.parse().ok(),
        PropValue::Null => None,
    }
}
