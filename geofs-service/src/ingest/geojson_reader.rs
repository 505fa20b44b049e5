//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::ingest::IngestCtx;
use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::props_from_json;
use geofs_core::geom::geojson::from_geojson;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub(crate) fn read(path: &Path, ctx: &mut IngestCtx) -> Result<(), ServiceError> {
    let file = File::open(path)?;
    let data: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ServiceError::Format(format!("Invalid JSON: {}", e)))?;

    let features: Vec<&Value> = match data.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => data
            .get("features")
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default(),
        Some("Feature") => vec![&data],
        _ => {
            return Err(ServiceError::Format(
                "GeoJSON must be a FeatureCollection or Feature".to_string(),
            ));
        }
    };

    for (i, feat) in features.iter().enumerate() {
        let label = format!("Feature {}", i);
        let geom_value = match feat.get("geometry") {
            Some(v) if !v.is_null() => v,
            _ => {
                ctx.push_error(&label, "Null geometry");
                continue;
            }
        };
        let geom = match from_geojson(geom_value) {
            Ok(geom) => geom,
            Err(e) => {
                ctx.push_error(&label, e);
                continue;
            }
        };
        let props = feat
            .get("properties")
            .map(props_from_json)
            .unwrap_or_default();
        let fid = feat.get("id").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        ctx.push_feature(geom, props, fid);
    }
    Ok(())
}
