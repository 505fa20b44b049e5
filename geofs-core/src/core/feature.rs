//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::geom::Extent;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Dynamic attribute value of a stored feature.
#[derive(Clone, PartialEq, Debug)]
pub enum PropValue {
    Null,
    Int(i64),
    Real(f64),
    String(String),
}

pub type PropMap = BTreeMap<String, PropValue>;

impl PropValue {
    /// Schema type label of this value. `Null` carries no observation.
    pub fn type_label(&self) -> Option<&'static str> {
        match self {
            PropValue::Null => None,
            PropValue::Int(_) => Some("Integer"),
            PropValue::Real(_) => Some("Real"),
            PropValue::String(_) => Some("String"),
        }
    }

    pub fn from_json(value: &Value) -> PropValue {
        match value {
            Value::Null => PropValue::Null,
            // Booleans have no column type of their own
            Value::Bool(b) => PropValue::String(b.to_string()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PropValue::Int(i)
                } else {
                    PropValue::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => PropValue::String(s.clone()),
            other => PropValue::String(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropValue::Null => Value::Null,
            PropValue::Int(i) => Value::Number(Number::from(*i)),
            PropValue::Real(r) => Number::from_f64(*r)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropValue::String(s) => Value::String(s.clone()),
        }
    }

    /// String rendering for XML property elements. `Null` renders empty.
    pub fn as_text(&self) -> String {
        match self {
            PropValue::Null => String::new(),
            PropValue::Int(i) => i.to_string(),
            PropValue::Real(r) => r.to_string(),
            PropValue::String(s) => s.clone(),
        }
    }
}

pub fn props_from_json(value: &Value) -> PropMap {
    let mut props = PropMap::new();
    if let Value::Object(map) = value {
        for (k, v) in map {
            props.insert(k.clone(), PropValue::from_json(v));
        }
    }
    props
}

pub fn props_to_json(props: &PropMap) -> Value {
    let mut map = Map::new();
    for (k, v) in props {
        map.insert(k.clone(), v.to_json());
    }
    Value::Object(map)
}

/// Feature row as persisted in the `features` table.
#[derive(Clone, Debug)]
pub struct StoredFeature {
    pub id: i64,
    pub layer_id: i64,
    /// Client-visible id, unique within the layer
    pub fid: String,
    pub geometry: Option<Vec<u8>>,
    pub properties: PropMap,
    pub bbox: Option<Extent>,
}

/// Feature record assembled by the ingest pipeline, ready for insertion.
#[derive(Clone, Debug)]
pub struct FeatureRecord {
    pub layer_id: i64,
    pub fid: String,
    pub geometry: Option<Vec<u8>>,
    pub properties: PropMap,
    pub bbox: Option<Extent>,
}
