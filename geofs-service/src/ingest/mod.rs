//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! File import pipeline for GeoJSON, zipped Shapefile, GeoPackage and CSV.
//!
//! All formats are normalised to EPSG:4326 WKB and stored in the features
//! table with per-feature bbox columns. Individual feature failures never
//! abort an import; they accumulate as indexed error messages. Insertion
//! happens in chunks of 500, each its own transaction, so large uploads
//! make progress under partial failure.

mod csv_reader;
mod geojson_reader;
mod gpkg_reader;
mod shapefile_reader;


use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::{FeatureRecord, PropMap};
use geofs_core::core::schema::infer_schema;
use geofs_core::geom::proj::{reproject, Transform};
use geofs_core::geom::{wkb, Extent, Geometry};
use geofs_core::repo;
use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

const CHUNK_SIZE: usize = 500;
const SCHEMA_SAMPLE_SIZE: usize = 100;

#[derive(Clone, Debug, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub bbox: Option<Extent>,
}

/// Per-format readers fill this with parsed records and indexed errors.
pub(crate) struct IngestCtx {
    layer_id: i64,
    transform: Option<Transform>,
    records: Vec<FeatureRecord>,
    errors: Vec<String>,
    samples: Vec<PropMap>,
}

impl IngestCtx {
    fn new(layer_id: i64, transform: Option<Transform>) -> IngestCtx {
        IngestCtx {
            layer_id,
            transform,
            records: Vec::new(),
            errors: Vec::new(),
            samples: Vec::new(),
        }
    }

    fn set_transform(&mut self, transform: Option<Transform>) {
        self.transform = transform;
    }

    /// Reproject, compute bounds and queue one feature record.
    fn push_feature(&mut self, geom: Geometry, props: PropMap, fid: Option<String>) {
        let geom = match &self.transform {
            Some(t) => reproject(&geom, t),
            None => geom,
        };
        let bbox = geom.bounds();
        let record = FeatureRecord {
            layer_id: self.layer_id,
            fid: fid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            geometry: wkb::encode(&geom).ok(),
            properties: props.clone(),
            bbox,
        };
        self.records.push(record);
        if self.samples.len() < SCHEMA_SAMPLE_SIZE {
            self.samples.push(props);
        }
    }

    fn push_error(&mut self, label: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{}: {}", label, message));
    }
}

/// Import a file into a layer. The suffix selects the format reader;
/// fatal format problems surface as `ServiceError::Format`.
pub fn import_file(
    conn: &mut Connection,
    file_path: &Path,
    layer_id: i64,
    source_srid: i32,
    lat_field: Option<&str>,
    lon_field: Option<&str>,
    replace_existing: bool,
) -> Result<ImportResult, ServiceError> {
    repo::layer_by_id(conn, layer_id)?;

    if replace_existing {
        let tx = conn.transaction()?;
        let removed = repo::delete_features(&tx, layer_id)?;
        tx.commit()?;
        debug!("layer {}: replaced {} existing features", layer_id, removed);
    }

    let suffix = file_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut ctx = IngestCtx::new(layer_id, None);
    match suffix.as_str() {
        "geojson" | "json" => {
            ctx.set_transform(geofs_core::geom::proj::transformer(source_srid, 4326)?);
            geojson_reader::read(file_path, &mut ctx)?;
        }
        "zip" => {
            ctx.set_transform(geofs_core::geom::proj::transformer(source_srid, 4326)?);
            shapefile_reader::read_zip(file_path, &mut ctx)?;
        }
        "gpkg" => {
            gpkg_reader::read(file_path, &mut ctx, source_srid)?;
        }
        "csv" => {
            ctx.set_transform(geofs_core::geom::proj::transformer(source_srid, 4326)?);
            csv_reader::read(file_path, &mut ctx, lat_field, lon_field)?;
        }
        other => {
            return Err(ServiceError::Format(format!(
                "Unsupported file format: .{}",
                other
            )));
        }
    }

    let result = insert_records(conn, ctx)?;
    repo::refresh_layer_stats(conn, layer_id)?;
    info!(
        "layer {}: imported {} features, {} failed, {} errors",
        layer_id,
        result.imported,
        result.failed,
        result.errors.len()
    );
    Ok(result)
}

/// Chunked insert-or-ignore. Chunks succeed or fail independently; a
/// failed chunk counts all of its rows as failed.
fn insert_records(conn: &mut Connection, ctx: IngestCtx) -> Result<ImportResult, ServiceError> {
    let IngestCtx {
        layer_id,
        records,
        mut errors,
        samples,
        ..
    } = ctx;

    let mut imported = 0;
    let mut failed = 0;
    let mut bbox: Option<Extent> = None;

    for (chunk_no, chunk) in records.chunks(CHUNK_SIZE).enumerate() {
        let outcome = conn.transaction().map_err(ServiceError::from).and_then(|tx| {
            repo::insert_features_ignore(&tx, chunk)?;
            tx.commit()?;
            Ok(())
        });
        match outcome {
            Ok(()) => {
                imported += chunk.len();
                for ext in chunk.iter().filter_map(|r| r.bbox) {
                    match bbox.as_mut() {
                        Some(b) => b.expand(&ext),
                        None => bbox = Some(ext),
                    }
                }
            }
            Err(e) => {
                failed += chunk.len();
                errors.push(format!("Batch insert error (chunk {}): {}", chunk_no, e));
            }
        }
    }

    let schema = infer_schema(&samples);
    repo::update_attribute_schema(conn, layer_id, &schema)?;

    Ok(ImportResult {
        imported,
        failed,
        errors,
        bbox,
    })
}
