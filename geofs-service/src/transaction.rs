//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! WFS-T transaction engine: Insert, Update and Delete operations parsed
//! from a `wfs:Transaction` envelope and executed as one unit of work.

use elementtree::Element;
use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::{props_to_json, FeatureRecord, PropMap, PropValue};
use geofs_core::geom::proj::{reproject, transformer};
use geofs_core::geom::{gml, wkb, Extent};
use geofs_core::repo;
use rusqlite::Connection;
use std::collections::BTreeSet;
use uuid::Uuid;

pub const INVALID_PARAMETER_VALUE: &str = "InvalidParameterValue";
pub const OPERATION_NOT_SUPPORTED: &str = "OperationNotSupported";
pub const NO_APPLICABLE_CODE: &str = "NoApplicableCode";

struct WfsError {
    code: &'static str,
    message: String,
}

impl WfsError {
    fn new(code: &'static str, message: impl Into<String>) -> WfsError {
        WfsError {
            code,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for WfsError {
    fn from(e: ServiceError) -> WfsError {
        WfsError::new(NO_APPLICABLE_CODE, format!("Transaction failed: {}", e))
    }
}

/// Parse and execute a WFS Transaction request. The transaction commits
/// atomically or not at all; failures produce an `ows:ExceptionReport`.
pub fn execute_transaction(conn: &mut Connection, xml_body: &[u8]) -> String {
    let root = match Element::from_reader(xml_body) {
        Ok(root) => root,
        Err(e) => {
            return exception_report(INVALID_PARAMETER_VALUE, &format!("Malformed XML: {}", e));
        }
    };
    if root.tag().name() != "Transaction" {
        return exception_report(
            OPERATION_NOT_SUPPORTED,
            &format!("Expected wfs:Transaction, got {}", root.tag().name()),
        );
    }

    match run_transaction(conn, &root) {
        Ok((inserted, updated, deleted)) => build_response(&inserted, updated, deleted),
        Err(e) => exception_report(e.code, &e.message),
    }
}

fn run_transaction(
    conn: &mut Connection,
    root: &Element,
) -> Result<(Vec<(String, String)>, usize, usize), WfsError> {
    let tx = conn
        .transaction()
        .map_err(|e| WfsError::from(ServiceError::from(e)))?;

    let mut inserted: Vec<(String, String)> = Vec::new();
    let mut total_updated = 0;
    let mut total_deleted = 0;
    let mut affected_layers: BTreeSet<i64> = BTreeSet::new();

    for child in root.children() {
        match child.tag().name() {
            "Insert" => handle_insert(&tx, child, &mut inserted, &mut affected_layers)?,
            "Update" => {
                let (count, layer_id) = handle_update(&tx, child)?;
                total_updated += count;
                affected_layers.insert(layer_id);
            }
            "Delete" => {
                let (count, layer_id) = handle_delete(&tx, child)?;
                total_deleted += count;
                affected_layers.insert(layer_id);
            }
            other => debug!("ignoring transaction element <{}>", other),
        }
    }

    for layer_id in &affected_layers {
        repo::refresh_layer_stats(&tx, *layer_id)?;
    }

    tx.commit()
        .map_err(|e| WfsError::from(ServiceError::from(e)))?;
    Ok((inserted, total_updated, total_deleted))
}

// ── Insert ───────────────────────────────────────────────────────────

/// Each child of `wfs:Insert` is a feature whose tag local name is the
/// layer name.
fn handle_insert(
    conn: &Connection,
    elem: &Element,
    inserted: &mut Vec<(String, String)>,
    affected_layers: &mut BTreeSet<i64>,
) -> Result<(), WfsError> {
    for feature_elem in elem.children() {
        let layer_name = feature_elem.tag().name().to_string();
        let layer = lookup_layer(conn, &layer_name)?;
        affected_layers.insert(layer.id);

        let fid = attr_by_local(feature_elem, "id")
            .map(|raw| strip_fid_prefix(raw, &layer_name))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut geometry: Option<(Vec<u8>, Extent)> = None;
        let mut properties = PropMap::new();

        for child in feature_elem.children() {
            let child_tag = child.tag().name();
            if child_tag == "geometry" || child_tag == "the_geom" {
                if let Some(gml_elem) = find_gml_geometry(child) {
                    geometry = Some(parse_gml_geometry(gml_elem)?);
                }
            } else if gml::is_geometry_tag(child_tag) {
                // Direct GML geometry element, not wrapped in <geometry>
                geometry = Some(parse_gml_geometry(child)?);
            } else {
                properties.insert(
                    child_tag.to_string(),
                    PropValue::String(child.text().to_string()),
                );
            }
        }

        let (geometry, bbox) = match geometry {
            Some((wkb, ext)) => (Some(wkb), Some(ext)),
            None => (None, None),
        };
        repo::insert_feature(
            conn,
            &FeatureRecord {
                layer_id: layer.id,
                fid: fid.clone(),
                geometry,
                properties,
                bbox,
            },
        )?;
        inserted.push((layer_name, fid));
    }
    Ok(())
}

// ── Update ───────────────────────────────────────────────────────────

fn handle_update(conn: &Connection, elem: &Element) -> Result<(usize, i64), WfsError> {
    let type_name = attr_by_local(elem, "typeName")
        .or_else(|| attr_by_local(elem, "typeNames"))
        .unwrap_or("");
    let layer = lookup_layer(conn, type_name)?;

    let mut prop_updates: Vec<(String, Option<String>)> = Vec::new();
    let mut geom_update: Option<(Vec<u8>, Extent)> = None;

    for prop_elem in children_by_local(elem, "Property") {
        let field_name = match child_by_local(prop_elem, "ValueReference") {
            Some(ref_elem) => ref_elem.text().trim().to_string(),
            None => continue,
        };
        let value_elem = child_by_local(prop_elem, "Value");

        if field_name == "geometry" || field_name == "the_geom" {
            if let Some(gml_elem) = value_elem.and_then(find_gml_geometry) {
                geom_update = Some(parse_gml_geometry(gml_elem)?);
            }
        } else {
            prop_updates.push((field_name, value_elem.map(|v| v.text().to_string())));
        }
    }

    let fids = parse_resource_ids(elem, &layer.name);
    if fids.is_empty() {
        return Ok((0, layer.id));
    }

    let mut updated = 0;
    for fid in &fids {
        let stored = match repo::feature_by_fid(conn, layer.id, fid).map_err(WfsError::from)? {
            Some(stored) => stored,
            None => continue,
        };

        let properties_json = if prop_updates.is_empty() {
            None
        } else {
            // Merge into the existing property map, preserving
            // unreferenced fields
            let mut merged = stored.properties.clone();
            for (field, value) in &prop_updates {
                let prop = match value {
                    Some(text) => PropValue::String(text.clone()),
                    None => PropValue::Null,
                };
                merged.insert(field.clone(), prop);
            }
            Some(
                serde_json::to_string(&props_to_json(&merged))
                    .map_err(|e| WfsError::from(ServiceError::from(e)))?,
            )
        };

        if properties_json.is_none() && geom_update.is_none() {
            continue;
        }
        repo::update_feature(
            conn,
            stored.id,
            properties_json.as_deref(),
            geom_update.as_ref().map(|(wkb, ext)| (wkb.as_slice(), ext)),
        )?;
        updated += 1;
    }
    Ok((updated, layer.id))
}

// ── Delete ───────────────────────────────────────────────────────────

fn handle_delete(conn: &Connection, elem: &Element) -> Result<(usize, i64), WfsError> {
    let type_name = attr_by_local(elem, "typeName")
        .or_else(|| attr_by_local(elem, "typeNames"))
        .unwrap_or("");
    let layer = lookup_layer(conn, type_name)?;

    let fids = parse_resource_ids(elem, &layer.name);
    let deleted = repo::delete_features_by_fids(conn, layer.id, &fids)?;
    Ok((deleted, layer.id))
}

// ── Helpers ──────────────────────────────────────────────────────────

fn lookup_layer(conn: &Connection, name: &str) -> Result<geofs_core::core::layer::Layer, WfsError> {
    match repo::layer_by_name(conn, name) {
        Ok(layer) => Ok(layer),
        Err(ServiceError::NotFound(_)) => Err(WfsError::new(
            INVALID_PARAMETER_VALUE,
            format!("Unknown feature type: '{}'", name),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Parse a GML geometry, reproject to the storage CRS and compute its
/// bounds.
fn parse_gml_geometry(elem: &Element) -> Result<(Vec<u8>, Extent), WfsError> {
    let (geom, srid) = gml::parse(elem)
        .map_err(|e| WfsError::new(NO_APPLICABLE_CODE, format!("Transaction failed: {}", e)))?;
    let geom = match transformer(srid, 4326)
        .map_err(|e| WfsError::new(NO_APPLICABLE_CODE, format!("Transaction failed: {}", e)))?
    {
        Some(transform) => reproject(&geom, &transform),
        None => geom,
    };
    let bbox = geom.bounds().ok_or_else(|| {
        WfsError::new(NO_APPLICABLE_CODE, "Transaction failed: empty geometry")
    })?;
    let buf = wkb::encode(&geom)
        .map_err(|e| WfsError::new(NO_APPLICABLE_CODE, format!("Transaction failed: {}", e)))?;
    Ok((buf, bbox))
}

fn find_gml_geometry(parent: &Element) -> Option<&Element> {
    parent
        .children()
        .find(|c| gml::is_geometry_tag(c.tag().name()))
}

fn strip_fid_prefix(raw: &str, layer_name: &str) -> String {
    let prefix = format!("{}.", layer_name);
    match raw.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None => raw.to_string(),
    }
}

/// Feature ids from `fes:ResourceId` elements inside any `fes:Filter`
/// descendant; the `<layer>.` prefix of each `rid` is stripped.
fn parse_resource_ids(elem: &Element, layer_name: &str) -> Vec<String> {
    let mut fids = Vec::new();
    for filter in descendants_by_local(elem, "Filter") {
        for rid in descendants_by_local(filter, "ResourceId") {
            if let Some(raw) = attr_by_local(rid, "rid") {
                fids.push(strip_fid_prefix(raw, layer_name));
            }
        }
    }
    fids
}

fn child_by_local<'a>(elem: &'a Element, local_name: &str) -> Option<&'a Element> {
    elem.children().find(|c| c.tag().name() == local_name)
}

fn children_by_local<'a>(
    elem: &'a Element,
    local_name: &'a str,
) -> impl Iterator<Item = &'a Element> {
    elem.children().filter(move |c| c.tag().name() == local_name)
}

fn descendants_by_local<'a>(elem: &'a Element, local_name: &str) -> Vec<&'a Element> {
    let mut found = Vec::new();
    for child in elem.children() {
        if child.tag().name() == local_name {
            found.push(child);
        }
        found.extend(descendants_by_local(child, local_name));
    }
    found
}

fn attr_by_local<'a>(elem: &'a Element, local_name: &str) -> Option<&'a str> {
    elem.attrs()
        .find(|(name, _)| name.name() == local_name)
        .map(|(_, value)| value)
}

// ── Response synthesis ───────────────────────────────────────────────

fn build_response(inserted: &[(String, String)], updated: usize, deleted: usize) -> String {
    let insert_results = if inserted.is_empty() {
        String::new()
    } else {
        let features: String = inserted
            .iter()
            .map(|(layer, fid)| {
                format!(
                    "<wfs:Feature><fes:ResourceId rid=\"{}.{}\"/></wfs:Feature>",
                    layer, fid
                )
            })
            .collect();
        format!("<wfs:InsertResults>{}</wfs:InsertResults>", features)
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><wfs:TransactionResponse xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:fes="http://www.opengis.net/fes/2.0" version="2.0.0"><wfs:TransactionSummary><wfs:totalInserted>{}</wfs:totalInserted><wfs:totalUpdated>{}</wfs:totalUpdated><wfs:totalDeleted>{}</wfs:totalDeleted></wfs:TransactionSummary>{}</wfs:TransactionResponse>"#,
        inserted.len(),
        updated,
        deleted,
        insert_results
    )
}

pub fn exception_report(code: &str, text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="2.0.0"><ows:Exception exceptionCode="{}"><ows:ExceptionText>{}</ows:ExceptionText></ows:Exception></ows:ExceptionReport>"#,
        code,
        crate::wfs::xml_escape(text)
    )
}
