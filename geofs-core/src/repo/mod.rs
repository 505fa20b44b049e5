//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Typed repository over the embedded SQLite store.
//!
//! All functions take a `&Connection` so they compose with
//! `rusqlite::Transaction` (which derefs to `Connection`) for
//! all-or-nothing units of work.

use crate::core::error::ServiceError;
use crate::core::feature::{props_from_json, props_to_json, FeatureRecord, StoredFeature};
use crate::core::layer::{Layer, SymbologyRule};
use crate::geom::Extent;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;


pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS layers (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT    NOT NULL UNIQUE,
    title            TEXT    NOT NULL DEFAULT '',
    description      TEXT    NOT NULL DEFAULT '',
    geometry_type    TEXT    NOT NULL DEFAULT '',
    srid             INTEGER NOT NULL DEFAULT 4326,
    bbox_minx        REAL,
    bbox_miny        REAL,
    bbox_maxx        REAL,
    bbox_maxy        REAL,
    feature_count    INTEGER NOT NULL DEFAULT 0,
    attribute_schema TEXT    NOT NULL DEFAULT '{}',
    created_at       TEXT    NOT NULL DEFAULT (datetime('now')),
    updated_at       TEXT    NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS features (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    layer_id   INTEGER NOT NULL REFERENCES layers(id) ON DELETE CASCADE,
    fid        TEXT    NOT NULL,
    geometry   BLOB,
    properties TEXT    NOT NULL DEFAULT '{}',
    bbox_minx  REAL,
    bbox_miny  REAL,
    bbox_maxx  REAL,
    bbox_maxy  REAL,
    UNIQUE(layer_id, fid)
);

CREATE INDEX IF NOT EXISTS idx_features_layer
    ON features(layer_id);
CREATE INDEX IF NOT EXISTS idx_features_bbox
    ON features(layer_id, bbox_minx, bbox_miny, bbox_maxx, bbox_maxy);

CREATE TABLE IF NOT EXISTS symbology_rules (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    layer_id        INTEGER NOT NULL REFERENCES layers(id) ON DELETE CASCADE,
    rule_order      INTEGER NOT NULL DEFAULT 0,
    label           TEXT    NOT NULL DEFAULT '',
    filter_field    TEXT,
    filter_operator TEXT    NOT NULL DEFAULT 'eq',
    filter_value    TEXT,
    fill_color      TEXT    NOT NULL DEFAULT '#3388ff',
    fill_opacity    REAL    NOT NULL DEFAULT 0.6,
    stroke_color    TEXT    NOT NULL DEFAULT '#ffffff',
    stroke_width    REAL    NOT NULL DEFAULT 1.5,
    point_radius    REAL    NOT NULL DEFAULT 6.0,
    is_default      INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_rules_layer
    ON symbology_rules(layer_id, rule_order);
"#;

/// Open the connection pool. Every checkout enables WAL journaling and
/// referential integrity, so layer deletion truly cascades.
pub fn init_pool(db_path: &str) -> Result<DbPool, ServiceError> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
    });
    let pool = r2d2::Pool::new(manager)?;
    init_db(&*pool.get()?)?;
    Ok(pool)
}

/// In-memory pool for tests. A single connection keeps the database alive.
pub fn init_test_pool() -> Result<DbPool, ServiceError> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys=ON;"));
    let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
    init_db(&*pool.get()?)?;
    Ok(pool)
}

pub fn init_db(conn: &Connection) -> Result<(), ServiceError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ── Layers ───────────────────────────────────────────────────────────

const LAYER_COLUMNS: &str = "id, name, title, description, geometry_type, srid, \
     bbox_minx, bbox_miny, bbox_maxx, bbox_maxy, feature_count, attribute_schema, \
     created_at, updated_at";

fn layer_from_row(row: &Row) -> rusqlite::Result<Layer> {
    let bbox = match (
        row.get::<_, Option<f64>>(6)?,
        row.get::<_, Option<f64>>(7)?,
        row.get::<_, Option<f64>>(8)?,
        row.get::<_, Option<f64>>(9)?,
    ) {
        (Some(minx), Some(miny), Some(maxx), Some(maxy)) => {
            Some(Extent::new(minx, miny, maxx, maxy))
        }
        _ => None,
    };
    let schema_json: String = row.get(11)?;
    let attribute_schema: BTreeMap<String, String> =
        serde_json::from_str(&schema_json).unwrap_or_default();
    Ok(Layer {
        id: row.get(0)?,
        name: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        geometry_type: row.get(4)?,
        srid: row.get(5)?,
        bbox,
        feature_count: row.get(10)?,
        attribute_schema,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

pub fn create_layer(
    conn: &Connection,
    name: &str,
    title: &str,
    description: &str,
) -> Result<Layer, ServiceError> {
    let title = if title.is_empty() { name } else { title };
    let result = conn.execute(
        "INSERT INTO layers (name, title, description) VALUES (?1, ?2, ?3)",
        params![name, title, description],
    );
    match result {
        Ok(_) => layer_by_id(conn, conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            Err(ServiceError::Conflict(name.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn layer_by_id(conn: &Connection, id: i64) -> Result<Layer, ServiceError> {
    conn.query_row(
        &format!("SELECT {} FROM layers WHERE id = ?1", LAYER_COLUMNS),
        params![id],
        layer_from_row,
    )
    .optional()?
    .ok_or_else(|| ServiceError::NotFound(format!("layer {}", id)))
}

pub fn layer_by_name(conn: &Connection, name: &str) -> Result<Layer, ServiceError> {
    conn.query_row(
        &format!("SELECT {} FROM layers WHERE name = ?1", LAYER_COLUMNS),
        params![name],
        layer_from_row,
    )
    .optional()?
    .ok_or_else(|| ServiceError::NotFound(format!("layer `{}`", name)))
}

/// All layers ordered by name (GetCapabilities order).
pub fn list_layers(conn: &Connection) -> Result<Vec<Layer>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM layers ORDER BY name",
        LAYER_COLUMNS
    ))?;
    let layers = stmt
        .query_map([], layer_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(layers)
}

/// All layers, newest first (admin listing order).
pub fn list_layers_recent(conn: &Connection) -> Result<Vec<Layer>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM layers ORDER BY created_at DESC",
        LAYER_COLUMNS
    ))?;
    let layers = stmt
        .query_map([], layer_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(layers)
}

pub fn layers_by_names(conn: &Connection, names: &[String]) -> Result<Vec<Layer>, ServiceError> {
    if names.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = names.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM layers WHERE name IN ({}) ORDER BY name",
        LAYER_COLUMNS, placeholders
    ))?;
    let layers = stmt
        .query_map(params_from_iter(names.iter()), layer_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(layers)
}

pub fn update_layer_meta(
    conn: &Connection,
    id: i64,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<Layer, ServiceError> {
    layer_by_id(conn, id)?;
    if let Some(title) = title {
        conn.execute(
            "UPDATE layers SET title = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![title, id],
        )?;
    }
    if let Some(description) = description {
        conn.execute(
            "UPDATE layers SET description = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![description, id],
        )?;
    }
    layer_by_id(conn, id)
}

/// Delete a layer; features and symbology rules cascade.
pub fn delete_layer(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let changed = conn.execute("DELETE FROM layers WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(ServiceError::NotFound(format!("layer {}", id)));
    }
    Ok(())
}

/// Recompute `feature_count` and the aggregate bbox; discover
/// `geometry_type` from stored WKB while it is still unset.
pub fn refresh_layer_stats(conn: &Connection, layer_id: i64) -> Result<(), ServiceError> {
    let (count, minx, miny, maxx, maxy) = conn.query_row(
        "SELECT COUNT(*), MIN(bbox_minx), MIN(bbox_miny), MAX(bbox_maxx), MAX(bbox_maxy) \
         FROM features WHERE layer_id = ?1",
        params![layer_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<f64>>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
            ))
        },
    )?;

    let mut geometry_type = String::new();
    let sample_wkb: Option<Vec<u8>> = conn
        .query_row(
            "SELECT geometry FROM features WHERE layer_id = ?1 AND geometry IS NOT NULL LIMIT 1",
            params![layer_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(buf) = sample_wkb {
        match crate::geom::wkb::decode(&buf) {
            Ok(geom) => geometry_type = geom.class_name().to_string(),
            Err(e) => warn!("layer {}: undecodable stored geometry: {}", layer_id, e),
        }
    }

    conn.execute(
        "UPDATE layers SET \
            feature_count = ?1, \
            bbox_minx = ?2, bbox_miny = ?3, bbox_maxx = ?4, bbox_maxy = ?5, \
            geometry_type = CASE WHEN geometry_type = '' THEN ?6 ELSE geometry_type END, \
            updated_at = datetime('now') \
         WHERE id = ?7",
        params![count, minx, miny, maxx, maxy, geometry_type, layer_id],
    )?;
    Ok(())
}

pub fn update_attribute_schema(
    conn: &Connection,
    layer_id: i64,
    schema: &BTreeMap<String, String>,
) -> Result<(), ServiceError> {
    if schema.is_empty() {
        return Ok(());
    }
    conn.execute(
        "UPDATE layers SET attribute_schema = ?1 WHERE id = ?2",
        params![serde_json::to_string(schema)?, layer_id],
    )?;
    Ok(())
}

// ── Features ─────────────────────────────────────────────────────────

fn feature_from_row(row: &Row) -> rusqlite::Result<StoredFeature> {
    let bbox = match (
        row.get::<_, Option<f64>>(5)?,
        row.get::<_, Option<f64>>(6)?,
        row.get::<_, Option<f64>>(7)?,
        row.get::<_, Option<f64>>(8)?,
    ) {
        (Some(minx), Some(miny), Some(maxx), Some(maxy)) => {
            Some(Extent::new(minx, miny, maxx, maxy))
        }
        _ => None,
    };
    let props_json: String = row.get(4)?;
    let properties = serde_json::from_str(&props_json)
        .map(|v| props_from_json(&v))
        .unwrap_or_default();
    Ok(StoredFeature {
        id: row.get(0)?,
        layer_id: row.get(1)?,
        fid: row.get(2)?,
        geometry: row.get(3)?,
        properties,
        bbox,
    })
}

const FEATURE_COLUMNS: &str =
    "id, layer_id, fid, geometry, properties, bbox_minx, bbox_miny, bbox_maxx, bbox_maxy";

fn bbox_params(record: &FeatureRecord) -> (Option<f64>, Option<f64>, Option<f64>, Option<f64>) {
    match record.bbox {
        Some(ext) => (Some(ext.minx), Some(ext.miny), Some(ext.maxx), Some(ext.maxy)),
        None => (None, None, None, None),
    }
}

/// Bulk insert with insert-or-ignore semantics: a pre-existing
/// `(layer_id, fid)` is skipped silently.
pub fn insert_features_ignore(
    conn: &Connection,
    records: &[FeatureRecord],
) -> Result<(), ServiceError> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO features \
            (layer_id, fid, geometry, properties, bbox_minx, bbox_miny, bbox_maxx, bbox_maxy) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for record in records {
        let (minx, miny, maxx, maxy) = bbox_params(record);
        stmt.execute(params![
            record.layer_id,
            record.fid,
            record.geometry,
            serde_json::to_string(&props_to_json(&record.properties))?,
            minx,
            miny,
            maxx,
            maxy,
        ])?;
    }
    Ok(())
}

/// Strict insert used by WFS-T; duplicate fids surface as errors.
pub fn insert_feature(conn: &Connection, record: &FeatureRecord) -> Result<(), ServiceError> {
    let (minx, miny, maxx, maxy) = bbox_params(record);
    conn.execute(
        "INSERT INTO features \
            (layer_id, fid, geometry, properties, bbox_minx, bbox_miny, bbox_maxx, bbox_maxy) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.layer_id,
            record.fid,
            record.geometry,
            serde_json::to_string(&props_to_json(&record.properties))?,
            minx,
            miny,
            maxx,
            maxy,
        ],
    )?;
    Ok(())
}

/// Page of features plus the total match count, optionally bbox-filtered.
///
/// A feature is excluded iff its bbox lies strictly outside the query box.
/// Note the parameter binding order (minx, maxx, miny, maxy) prescribed by
/// the predicate below — it differs from the tuple order of `bbox`.
pub fn query_features(
    conn: &Connection,
    layer_id: i64,
    bbox: Option<&Extent>,
    count: Option<u32>,
    startindex: u32,
    max_features: u32,
) -> Result<(Vec<StoredFeature>, u64), ServiceError> {
    let mut where_sql = "FROM features WHERE layer_id = ?1".to_string();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(layer_id)];

    if let Some(ext) = bbox {
        where_sql.push_str(
            " AND NOT (bbox_maxx < ? OR bbox_minx > ? OR bbox_maxy < ? OR bbox_miny > ?)",
        );
        params_vec.push(Box::new(ext.minx));
        params_vec.push(Box::new(ext.maxx));
        params_vec.push(Box::new(ext.miny));
        params_vec.push(Box::new(ext.maxy));
    }

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) {}", where_sql),
        params_from_iter(params_vec.iter().map(|p| p.as_ref())),
        |row| row.get(0),
    )?;

    let limit = count.unwrap_or(max_features).min(max_features);
    params_vec.push(Box::new(limit));
    params_vec.push(Box::new(startindex));
    let mut stmt = conn.prepare(&format!(
        "SELECT {} {} ORDER BY id LIMIT ? OFFSET ?",
        FEATURE_COLUMNS, where_sql
    ))?;
    let features = stmt
        .query_map(
            params_from_iter(params_vec.iter().map(|p| p.as_ref())),
            feature_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((features, total))
}

pub fn feature_by_fid(
    conn: &Connection,
    layer_id: i64,
    fid: &str,
) -> Result<Option<StoredFeature>, ServiceError> {
    let feature = conn
        .query_row(
            &format!(
                "SELECT {} FROM features WHERE layer_id = ?1 AND fid = ?2",
                FEATURE_COLUMNS
            ),
            params![layer_id, fid],
            feature_from_row,
        )
        .optional()?;
    Ok(feature)
}

/// First `max` features of a layer, for the admin preview.
pub fn features_preview(
    conn: &Connection,
    layer_id: i64,
    max: u32,
) -> Result<Vec<StoredFeature>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM features WHERE layer_id = ?1 ORDER BY id LIMIT ?2",
        FEATURE_COLUMNS
    ))?;
    let features = stmt
        .query_map(params![layer_id, max], feature_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(features)
}

pub fn update_feature(
    conn: &Connection,
    feature_id: i64,
    properties_json: Option<&str>,
    geometry: Option<(&[u8], &Extent)>,
) -> Result<(), ServiceError> {
    let mut sets: Vec<&str> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(json) = properties_json {
        sets.push("properties = ?");
        params_vec.push(Box::new(json.to_string()));
    }
    if let Some((wkb, ext)) = geometry {
        sets.push("geometry = ?");
        params_vec.push(Box::new(wkb.to_vec()));
        sets.push("bbox_minx = ?");
        params_vec.push(Box::new(ext.minx));
        sets.push("bbox_miny = ?");
        params_vec.push(Box::new(ext.miny));
        sets.push("bbox_maxx = ?");
        params_vec.push(Box::new(ext.maxx));
        sets.push("bbox_maxy = ?");
        params_vec.push(Box::new(ext.maxy));
    }
    if sets.is_empty() {
        return Ok(());
    }
    params_vec.push(Box::new(feature_id));
    conn.execute(
        &format!("UPDATE features SET {} WHERE id = ?", sets.join(", ")),
        params_from_iter(params_vec.iter().map(|p| p.as_ref())),
    )?;
    Ok(())
}

pub fn delete_features_by_fids(
    conn: &Connection,
    layer_id: i64,
    fids: &[String],
) -> Result<usize, ServiceError> {
    if fids.is_empty() {
        return Ok(0);
    }
    let placeholders = fids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(layer_id)];
    for fid in fids {
        params_vec.push(Box::new(fid.clone()));
    }
    let deleted = conn.execute(
        &format!(
            "DELETE FROM features WHERE layer_id = ? AND fid IN ({})",
            placeholders
        ),
        params_from_iter(params_vec.iter().map(|p| p.as_ref())),
    )?;
    Ok(deleted)
}

pub fn delete_features(conn: &Connection, layer_id: i64) -> Result<usize, ServiceError> {
    let deleted = conn.execute(
        "DELETE FROM features WHERE layer_id = ?1",
        params![layer_id],
    )?;
    Ok(deleted)
}

// ── Symbology rules ──────────────────────────────────────────────────

fn rule_from_row(row: &Row) -> rusqlite::Result<SymbologyRule> {
    Ok(SymbologyRule {
        id: row.get(0)?,
        layer_id: row.get(1)?,
        rule_order: row.get(2)?,
        label: row.get(3)?,
        filter_field: row.get(4)?,
        filter_operator: row.get(5)?,
        filter_value: row.get(6)?,
        fill_color: row.get(7)?,
        fill_opacity: row.get(8)?,
        stroke_color: row.get(9)?,
        stroke_width: row.get(10)?,
        point_radius: row.get(11)?,
        is_default: row.get::<_, i64>(12)? != 0,
    })
}

const RULE_COLUMNS: &str = "id, layer_id, rule_order, label, filter_field, filter_operator, \
     filter_value, fill_color, fill_opacity, stroke_color, stroke_width, point_radius, is_default";

pub fn list_rules(conn: &Connection, layer_id: i64) -> Result<Vec<SymbologyRule>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM symbology_rules WHERE layer_id = ?1 ORDER BY rule_order, id",
        RULE_COLUMNS
    ))?;
    let rules = stmt
        .query_map(params![layer_id], rule_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rules)
}

pub fn create_rule(conn: &Connection, rule: &SymbologyRule) -> Result<SymbologyRule, ServiceError> {
    conn.execute(
        "INSERT INTO symbology_rules \
            (layer_id, rule_order, label, filter_field, filter_operator, filter_value, \
             fill_color, fill_opacity, stroke_color, stroke_width, point_radius, is_default) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            rule.layer_id,
            rule.rule_order,
            rule.label,
            rule.filter_field,
            rule.filter_operator,
            rule.filter_value,
            rule.fill_color,
            rule.fill_opacity,
            rule.stroke_color,
            rule.stroke_width,
            rule.point_radius,
            rule.is_default as i64,
        ],
    )?;
    rule_by_id(conn, conn.last_insert_rowid())
}

pub fn rule_by_id(conn: &Connection, id: i64) -> Result<SymbologyRule, ServiceError> {
    conn.query_row(
        &format!("SELECT {} FROM symbology_rules WHERE id = ?1", RULE_COLUMNS),
        params![id],
        rule_from_row,
    )
    .optional()?
    .ok_or_else(|| ServiceError::NotFound(format!("symbology rule {}", id)))
}

pub fn update_rule(conn: &Connection, rule: &SymbologyRule) -> Result<SymbologyRule, ServiceError> {
    let changed = conn.execute(
        "UPDATE symbology_rules SET \
            rule_order = ?1, label = ?2, filter_field = ?3, filter_operator = ?4, \
            filter_value = ?5, fill_color = ?6, fill_opacity = ?7, stroke_color = ?8, \
            stroke_width = ?9, point_radius = ?10, is_default = ?11 \
         WHERE id = ?12",
        params![
            rule.rule_order,
            rule.label,
            rule.filter_field,
            rule.filter_operator,
            rule.filter_value,
            rule.fill_color,
            rule.fill_opacity,
            rule.stroke_color,
            rule.stroke_width,
            rule.point_radius,
            rule.is_default as i64,
            rule.id,
        ],
    )?;
    if changed == 0 {
        return Err(ServiceError::NotFound(format!("symbology rule {}", rule.id)));
    }
    rule_by_id(conn, rule.id)
}

pub fn delete_rule(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let changed = conn.execute("DELETE FROM symbology_rules WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(ServiceError::NotFound(format!("symbology rule {}", id)));
    }
    Ok(())
}

/// Renumber rules of a layer following the given id order.
pub fn reorder_rules(conn: &Connection, layer_id: i64, ids: &[i64]) -> Result<(), ServiceError> {
    for (order, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE symbology_rules SET rule_order = ?1 WHERE id = ?2 AND layer_id = ?3",
            params![order as i64, id, layer_id],
        )?;
    }
    Ok(())
}
