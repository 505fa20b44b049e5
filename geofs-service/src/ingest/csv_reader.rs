//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::ingest::IngestCtx;
use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::{PropMap, PropValue};
use geofs_core::geom::{Geometry, Point};
use std::fs;
use std::path::Path;

const LAT_NAMES: [&str; 5] = ["lat", "latitude", "y", "northing", "ylat"];
const LON_NAMES: [&str; 7] = ["lon", "lng", "longitude", "x", "easting", "xlon", "xlong"];

/// CSV of point records. Lat/lon columns are auto-detected by header name
/// unless explicit field names are given.
pub(crate) fn read(
    path: &Path,
    ctx: &mut IngestCtx,
    lat_field: Option<&str>,
    lon_field: Option<&str>,
) -> Result<(), ServiceError> {
    let raw = fs::read_to_string(path)?;
    // Tolerate a UTF-8 BOM in front of the header row
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let mut reader = csv::Reader::from_reader(raw.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ServiceError::Format(format!("Invalid CSV: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .map_err(|e| ServiceError::Format(format!("Invalid CSV: {}", e)))?;

    if rows.is_empty() {
        ctx.errors.push("CSV has no data rows".to_string());
        return Ok(());
    }

    let lat_col = locate_column(&headers, lat_field, &LAT_NAMES);
    let lon_col = locate_column(&headers, lon_field, &LON_NAMES);
    let (lat_col, lon_col) = match (lat_col, lon_col) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(ServiceError::Format(format!(
                "Cannot detect lat/lon columns. Found: {}. \
                 Specify lat_field and lon_field explicitly.",
                headers.join(", ")
            )));
        }
    };

    for (i, row) in rows.iter().enumerate() {
        let label = format!("Row {}", i + 1);
        let lat = match row.get(lat_col).map(str::trim).and_then(|v| v.parse::<f64>().ok()) {
            Some(v) => v,
            None => {
                ctx.push_error(&label, "invalid latitude value");
                continue;
            }
        };
        let lon = match row.get(lon_col).map(str::trim).and_then(|v| v.parse::<f64>().ok()) {
            Some(v) => v,
            None => {
                ctx.push_error(&label, "invalid longitude value");
                continue;
            }
        };

        let mut props = PropMap::new();
        for (col, header) in headers.iter().enumerate() {
            if col == lat_col || col == lon_col {
                continue;
            }
            let value = row.get(col).unwrap_or("");
            props.insert(header.clone(), coerce(value));
        }
        ctx.push_feature(Geometry::Point(Point::new(lon, lat)), props, None);
    }
    Ok(())
}

fn locate_column(headers: &[String], explicit: Option<&str>, names: &[&str]) -> Option<usize> {
    if let Some(wanted) = explicit {
        return headers.iter().position(|h| h == wanted);
    }
    headers
        .iter()
        .position(|h| names.contains(&h.to_lowercase().as_str()))
}

/// Numeric coercion: integer, then real, then string; empty becomes null.
fn coerce(value: &str) -> PropValue {
    if value.is_empty() {
        return PropValue::Null;
    }
    if let Ok(i) = value.parse::<i64>() {
        return PropValue::Int(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return PropValue::Real(f);
    }
    PropValue::String(value.to_string())
}
