//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! GeoPackage reader: first feature table listed in `gpkg_contents`,
//! geometries decoded from the GPKG binary header plus standard WKB.

use crate::ingest::IngestCtx;
use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::{PropMap, PropValue};
use geofs_core::geom::proj::transformer;
use geofs_core::geom::wkb;
use geofs_core::geom::Geometry;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::Path;

pub(crate) fn read(
    path: &Path,
    ctx: &mut IngestCtx,
    source_srid: i32,
) -> Result<(), ServiceError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| ServiceError::Format(format!("Cannot open GeoPackage: {}", e)))?;

    let table: Option<(String, String, i32)> = conn
        .query_row(
            "SELECT c.table_name, g.column_name, g.srs_id \
             FROM gpkg_contents c \
             JOIN gpkg_geometry_columns g ON c.table_name = g.table_name \
             WHERE c.data_type = 'features' \
             ORDER BY c.table_name LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|e| ServiceError::Format(format!("Not a GeoPackage: {}", e)))?;
    let (table_name, geom_column, srs_id) = table.ok_or_else(|| {
        ServiceError::Format("GeoPackage contains no feature table".to_string())
    })?;

    let detected_srid = if srs_id > 0 { srs_id } else { source_srid };
    ctx.set_transform(transformer(detected_srid, 4326)?);

    let mut stmt = conn
        .prepare(&format!("SELECT * FROM \"{}\"", table_name))
        .map_err(|e| ServiceError::Format(format!("Cannot read GeoPackage table: {}", e)))?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();

    let mut rows = stmt
        .query([])
        .map_err(|e| ServiceError::Format(format!("Cannot read GeoPackage table: {}", e)))?;
    let mut index = 0usize;
    while let Some(row) = rows
        .next()
        .map_err(|e| ServiceError::Format(format!("GeoPackage row error: {}", e)))?
    {
        let label = format!("Feature {}", index);
        let mut fid: Option<String> = None;
        let mut geometry: Option<Result<Geometry, ServiceError>> = None;
        let mut props = PropMap::new();

        for (col, name) in column_names.iter().enumerate() {
            let value = row
                .get_ref(col)
                .map_err(|e| ServiceError::Format(format!("GeoPackage row error: {}", e)))?;
            if name == &geom_column {
                geometry = match value {
                    ValueRef::Blob(blob) => Some(decode_gpkg_geometry(blob)),
                    _ => None,
                };
            } else if name.eq_ignore_ascii_case("fid") {
                fid = Some(match value {
                    ValueRef::Integer(i) => i.to_string(),
                    ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
                    _ => index.to_string(),
                });
            } else {
                props.insert(name.clone(), prop_value(value));
            }
        }

        match geometry {
            Some(Ok(geom)) => ctx.push_feature(geom, props, fid),
            Some(Err(e)) => ctx.push_error(&label, e),
            None => ctx.push_error(&label, "Null geometry"),
        }
        index += 1;
    }
    Ok(())
}

fn prop_value(value: ValueRef) -> PropValue {
    match value {
        ValueRef::Null => PropValue::Null,
        ValueRef::Integer(i) => PropValue::Int(i),
        ValueRef::Real(r) => PropValue::Real(r),
        ValueRef::Text(t) => PropValue::String(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(_) => PropValue::Null,
    }
}

/// Strip the GeoPackage binary header (magic, version, flags, srs_id and
/// optional envelope) and decode the WKB payload that follows.
fn decode_gpkg_geometry(blob: &[u8]) -> Result<Geometry, ServiceError> {
    if blob.len() < 8 {
        return Err(ServiceError::Format("GPKG geometry too short".to_string()));
    }
    if &blob[0..2] != b"GP" {
        // Some writers store bare WKB
        return wkb::decode(blob).map_err(ServiceError::from);
    }
    let flags = blob[3];
    if (flags >> 4) & 1 == 1 {
        return Err(ServiceError::Format("Empty GPKG geometry".to_string()));
    }
    let envelope_size = match (flags >> 1) & 0x07 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => {
            return Err(ServiceError::Format(format!(
                "Invalid GPKG envelope indicator {}",
                other
            )));
        }
    };
    let wkb_start = 8 + envelope_size;
    if blob.len() <= wkb_start {
        return Err(ServiceError::Format("GPKG geometry too short".to_string()));
    }
    wkb::decode(&blob[wkb_start..]).map_err(ServiceError::from)
}
