//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Minimal ESRI shapefile reader: .shp geometry records plus .dbf
//! attributes. Z and M payloads are skipped; only the XY data is kept.

use crate::ingest::IngestCtx;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::{PropMap, PropValue};
use geofs_core::geom::{Geometry, LineString, MultiLineString, MultiPoint, Point, Polygon};
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};

const SHP_FILE_CODE: i32 = 9994;
const SHP_HEADER_SIZE: u64 = 100;

pub(crate) fn read_zip(zip_path: &Path, ctx: &mut IngestCtx) -> Result<(), ServiceError> {
    let tmpdir = tempfile::tempdir()?;
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ServiceError::Format(format!("Invalid ZIP archive: {}", e)))?;
    archive
        .extract(tmpdir.path())
        .map_err(|e| ServiceError::Format(format!("Cannot extract ZIP archive: {}", e)))?;

    let shp_path = find_shp(tmpdir.path())?.ok_or_else(|| {
        ServiceError::Format("No .shp file found in ZIP archive".to_string())
    })?;
    read_shp(&shp_path, ctx)
}

/// First `.shp` file below `dir`, depth-first.
fn find_shp(dir: &Path) -> Result<Option<PathBuf>, ServiceError> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.path());
    for entry in &entries {
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase() == "shp")
                .unwrap_or(false)
        {
            return Ok(Some(path));
        }
    }
    for entry in &entries {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_shp(&path)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

pub(crate) fn read_shp(shp_path: &Path, ctx: &mut IngestCtx) -> Result<(), ServiceError> {
    let buf = fs::read(shp_path)?;
    let mut cur = Cursor::new(buf.as_slice());

    let file_code = cur
        .read_i32::<BigEndian>()
        .map_err(|e| ServiceError::Format(format!("Invalid shapefile: {}", e)))?;
    if file_code != SHP_FILE_CODE {
        return Err(ServiceError::Format(format!(
            "Invalid shapefile file code {}",
            file_code
        )));
    }
    cur.set_position(24);
    let file_length_words = cur
        .read_i32::<BigEndian>()
        .map_err(|e| ServiceError::Format(format!("Invalid shapefile: {}", e)))?;
    let file_length = (file_length_words as u64) * 2;
    cur.set_position(SHP_HEADER_SIZE);

    let attributes = read_dbf(&shp_path.with_extension("dbf"))?;

    let mut index = 0usize;
    while cur.position() + 8 <= file_length.min(buf.len() as u64) {
        let record_start = cur.position();
        // record header: number and content length, both big-endian
        let _record_number = read_i32_be(&mut cur)?;
        let content_words = read_i32_be(&mut cur)?;
        let record_end = record_start + 8 + (content_words as u64) * 2;

        let label = format!("Feature {}", index);
        match read_record(&mut cur) {
            Ok(Some(geom)) => {
                let props = attributes.get(index).cloned().unwrap_or_default();
                ctx.push_feature(geom, props, Some(index.to_string()));
            }
            Ok(None) => ctx.push_error(&label, "Null geometry"),
            Err(e) => ctx.push_error(&label, e),
        }
        // Skip any Z/M payload trailing the XY data
        cur.set_position(record_end);
        index += 1;
    }
    Ok(())
}

fn read_record(cur: &mut Cursor<&[u8]>) -> Result<Option<Geometry>, ServiceError> {
    let shape_type = read_i32_le(cur)?;
    // Z (x3) and M (x2) variants share the XY layout of their base type
    match shape_type {
        0 => Ok(None),
        1 | 11 | 21 => {
            let x = read_f64_le(cur)?;
            let y = read_f64_le(cur)?;
            Ok(Some(Geometry::Point(Point::new(x, y))))
        }
        8 | 18 | 28 => {
            skip_bbox(cur)?;
            let num_points = read_i32_le(cur)?;
            let points = read_points(cur, num_points)?;
            Ok(Some(Geometry::MultiPoint(MultiPoint { points })))
        }
        3 | 13 | 23 => {
            let parts = read_parts(cur)?;
            if parts.len() == 1 {
                Ok(Some(Geometry::LineString(
                    parts.into_iter().next().unwrap(),
                )))
            } else {
                Ok(Some(Geometry::MultiLineString(MultiLineString {
                    lines: parts,
                })))
            }
        }
        5 | 15 | 25 => {
            let rings = read_parts(cur)?;
            Ok(Some(Geometry::Polygon(Polygon { rings })))
        }
        other => Err(ServiceError::Format(format!(
            "Unsupported shape type {}",
            other
        ))),
    }
}

fn read_parts(cur: &mut Cursor<&[u8]>) -> Result<Vec<LineString>, ServiceError> {
    skip_bbox(cur)?;
    let num_parts = read_i32_le(cur)?;
    let num_points = read_i32_le(cur)?;
    let mut part_starts = Vec::with_capacity(num_parts as usize);
    for _ in 0..num_parts {
        part_starts.push(read_i32_le(cur)? as usize);
    }
    let points = read_points(cur, num_points)?;

    let mut parts = Vec::with_capacity(part_starts.len());
    for (i, &start) in part_starts.iter().enumerate() {
        let end = part_starts
            .get(i + 1)
            .copied()
            .unwrap_or_else(|| points.len());
        if start > end || end > points.len() {
            return Err(ServiceError::Format("Invalid shape part index".to_string()));
        }
        parts.push(LineString {
            points: points[start..end].to_vec(),
        });
    }
    Ok(parts)
}

fn read_points(cur: &mut Cursor<&[u8]>, count: i32) -> Result<Vec<Point>, ServiceError> {
    let mut points = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let x = read_f64_le(cur)?;
        let y = read_f64_le(cur)?;
        points.push(Point::new(x, y));
    }
    Ok(points)
}

fn skip_bbox(cur: &mut Cursor<&[u8]>) -> Result<(), ServiceError> {
    for _ in 0..4 {
        read_f64_le(cur)?;
    }
    Ok(())
}

fn read_i32_be(cur: &mut Cursor<&[u8]>) -> Result<i32, ServiceError> {
    cur.read_i32::<BigEndian>()
        .map_err(|e| ServiceError::Format(format!("Truncated shapefile record: {}", e)))
}

fn read_i32_le(cur: &mut Cursor<&[u8]>) -> Result<i32, ServiceError> {
    cur.read_i32::<LittleEndian>()
        .map_err(|e| ServiceError::Format(format!("Truncated shapefile record: {}", e)))
}

fn read_f64_le(cur: &mut Cursor<&[u8]>) -> Result<f64, ServiceError> {
    cur.read_f64::<LittleEndian>()
        .map_err(|e| ServiceError::Format(format!("Truncated shapefile record: {}", e)))
}

/// Attribute rows from the sibling .dbf, in record order. Missing or
/// unreadable tables degrade to empty attribute maps.
fn read_dbf(dbf_path: &Path) -> Result<Vec<PropMap>, ServiceError> {
    if !dbf_path.exists() {
        return Ok(Vec::new());
    }
    let source = std::io::BufReader::new(File::open(dbf_path)?);
    let mut reader = match dbase::Reader::new(source) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("cannot open {}: {}", dbf_path.display(), e);
            return Ok(Vec::new());
        }
    };
    let records = reader
        .read()
        .map_err(|e| ServiceError::Format(format!("DBF error: {}", e)))?;

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let mut props = PropMap::new();
        for (name, value) in record {
            props.insert(name, field_value(value));
        }
        rows.push(props);
    }
    Ok(rows)
}

fn field_value(value: dbase::FieldValue) -> PropValue {
    use dbase::FieldValue;
    match value {
        FieldValue::Character(Some(s)) => PropValue::String(s.trim().to_string()),
        FieldValue::Character(None) => PropValue::Null,
        FieldValue::Numeric(Some(n)) => PropValue::Real(n),
        FieldValue::Numeric(None) => PropValue::Null,
        FieldValue::Float(Some(f)) => PropValue::Real(f as f64),
        FieldValue::Float(None) => PropValue::Null,
        FieldValue::Integer(i) => PropValue::Int(i as i64),
        FieldValue::Double(d) => PropValue::Real(d),
        FieldValue::Logical(Some(b)) => PropValue::String(b.to_string()),
        FieldValue::Logical(None) => PropValue::Null,
        ref other => PropValue::String(format!("{}", other)),
    }
}
