//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! OGC WFS 2.0.0 response builders: GetCapabilities, DescribeFeatureType
//! and GetFeature in GML 3.2 or GeoJSON.

use chrono::Utc;
use geofs_core::core::config::ServiceCfg;
use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::{props_to_json, StoredFeature};
use geofs_core::core::layer::Layer;
use geofs_core::geom::{geojson, gml, wkb, Extent};
use geofs_core::repo;
use rusqlite::Connection;
use serde_json::{json, Value};

/// GML property type advertised for a layer's geometry element.
fn gml_geom_type(layer: &Layer) -> &'static str {
    match layer.geometry_type.as_str() {
        "Point" => "gml:PointPropertyType",
        "MultiPoint" => "gml:MultiPointPropertyType",
        "LineString" => "gml:CurvePropertyType",
        "MultiLineString" => "gml:MultiCurvePropertyType",
        "Polygon" => "gml:SurfacePropertyType",
        "MultiPolygon" => "gml:MultiSurfacePropertyType",
        _ => "gml:GeometryPropertyType",
    }
}

fn xsd_type(field_type: &str) -> &'static str {
    match field_type {
        "Integer" => "xsd:long",
        "Real" => "xsd:double",
        "Date" => "xsd:date",
        _ => "xsd:string",
    }
}

// ── GetCapabilities ──────────────────────────────────────────────────

pub fn build_capabilities(conn: &Connection, cfg: &ServiceCfg) -> Result<String, ServiceError> {
    let layers = repo::list_layers(conn)?;

    let mut feature_types = String::new();
    for layer in &layers {
        let mut block = format!(
            "<wfs:FeatureType>\
             <wfs:Name>{name}</wfs:Name>\
             <wfs:Title>{title}</wfs:Title>\
             <wfs:Abstract>{abstract_}</wfs:Abstract>\
             <wfs:DefaultCRS>urn:ogc:def:crs:EPSG::{srid}</wfs:DefaultCRS>",
            name = xml_escape(&layer.name),
            title = xml_escape(&layer.title),
            abstract_ = xml_escape(&layer.description),
            srid = layer.srid,
        );
        if let Some(ext) = &layer.bbox {
            // WGS84BoundingBox is always lon/lat
            block.push_str(&format!(
                "<ows:WGS84BoundingBox>\
                 <ows:LowerCorner>{} {}</ows:LowerCorner>\
                 <ows:UpperCorner>{} {}</ows:UpperCorner>\
                 </ows:WGS84BoundingBox>",
                ext.minx, ext.miny, ext.maxx, ext.maxy
            ));
        }
        block.push_str("</wfs:FeatureType>");
        feature_types.push_str(&block);
    }

    let operations = ["GetCapabilities", "DescribeFeatureType", "GetFeature", "Transaction"]
        .iter()
        .map(|op| {
            format!(
                "<ows:Operation name=\"{op}\">\
                 <ows:DCP><ows:HTTP>\
                 <ows:Get xlink:href=\"{url}\"/>\
                 <ows:Post xlink:href=\"{url}\"/>\
                 </ows:HTTP></ows:DCP>\
                 </ows:Operation>",
                op = op,
                url = xml_escape(&cfg.url)
            )
        })
        .collect::<String>();

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><wfs:WFS_Capabilities version="2.0.0" xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:ows="http://www.opengis.net/ows/1.1" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:xlink="http://www.w3.org/1999/xlink"><ows:ServiceIdentification><ows:Title>{title}</ows:Title><ows:Abstract>{abstract_}</ows:Abstract><ows:ServiceType>WFS</ows:ServiceType><ows:ServiceTypeVersion>2.0.0</ows:ServiceTypeVersion></ows:ServiceIdentification><ows:OperationsMetadata>{operations}<ows:Parameter name="outputFormat"><ows:AllowedValues><ows:Value>application/gml+xml; version=3.2</ows:Value><ows:Value>application/json</ows:Value></ows:AllowedValues></ows:Parameter></ows:OperationsMetadata><wfs:FeatureTypeList>{feature_types}</wfs:FeatureTypeList></wfs:WFS_Capabilities>"#,
        title = xml_escape(&cfg.title),
        abstract_ = xml_escape(&cfg.abstract_),
        operations = operations,
        feature_types = feature_types,
    ))
}

// ── DescribeFeatureType ──────────────────────────────────────────────

pub fn build_describe(
    conn: &Connection,
    typenames: Option<&str>,
) -> Result<String, ServiceError> {
    let layers = match typenames {
        Some(names) if !names.trim().is_empty() => {
            let wanted: Vec<String> = names
                .replace(',', " ")
                .split_whitespace()
                .map(|n| n.to_string())
                .collect();
            let layers = repo::layers_by_names(conn, &wanted)?;
            if layers.is_empty() {
                return Err(ServiceError::NotFound(format!("feature type `{}`", names)));
            }
            layers
        }
        _ => repo::list_layers(conn)?,
    };

    let mut elements = String::new();
    for layer in &layers {
        let mut fields = format!(
            r#"<xsd:element name="geometry" type="{}" minOccurs="0"/>"#,
            gml_geom_type(layer)
        );
        for (field, field_type) in &layer.attribute_schema {
            fields.push_str(&format!(
                r#"<xsd:element name="{}" type="{}" minOccurs="0"/>"#,
                safe_tag(field),
                xsd_type(field_type)
            ));
        }
        elements.push_str(&format!(
            r#"<xsd:element name="{name}" substitutionGroup="gml:AbstractFeature" type="{name}Type"/><xsd:complexType name="{name}Type"><xsd:complexContent><xsd:extension base="gml:AbstractFeatureType"><xsd:sequence>{fields}</xsd:sequence></xsd:extension></xsd:complexContent></xsd:complexType>"#,
            name = xml_escape(&layer.name),
            fields = fields,
        ));
    }

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:gml="http://www.opengis.net/gml/3.2" elementFormDefault="qualified"><xsd:import namespace="http://www.opengis.net/gml/3.2"/>{}</xsd:schema>"#,
        elements
    ))
}

// ── GetFeature ───────────────────────────────────────────────────────

pub struct FeatureQuery {
    pub bbox: Option<Extent>,
    pub count: Option<u32>,
    pub startindex: u32,
    pub max_features: u32,
}

/// GeoJSON FeatureCollection for the first layer named in `typenames`.
pub fn build_get_feature_geojson(
    conn: &Connection,
    typenames: &str,
    query: &FeatureQuery,
) -> Result<Value, ServiceError> {
    let layer = match lookup_layer(conn, typenames)? {
        Some(layer) => layer,
        None => {
            return Ok(json!({
                "type": "FeatureCollection",
                "features": [],
                "numberMatched": 0,
                "numberReturned": 0,
            }));
        }
    };

    let (features, total) = page_features(conn, &layer, query)?;
    let collection: Vec<Value> = features
        .iter()
        .map(|feat| {
            json!({
                "type": "Feature",
                "id": format!("{}.{}", layer.name, feat.fid),
                "geometry": decode_geojson(feat),
                "properties": props_to_json(&feat.properties),
            })
        })
        .collect();

    Ok(json!({
        "type": "FeatureCollection",
        "numberMatched": total,
        "numberReturned": collection.len(),
        "timeStamp": now_iso(),
        "features": collection,
    }))
}

/// GML 3.2 `wfs:FeatureCollection` for the first layer named in
/// `typenames`.
pub fn build_get_feature_gml(
    conn: &Connection,
    typenames: &str,
    query: &FeatureQuery,
) -> Result<String, ServiceError> {
    let layer = match lookup_layer(conn, typenames)? {
        Some(layer) => layer,
        None => return Ok(empty_gml_collection()),
    };

    let (features, total) = page_features(conn, &layer, query)?;
    let srs = format!("urn:ogc:def:crs:EPSG::{}", layer.srid);

    let mut members = String::new();
    for feat in &features {
        let mut props_xml = String::new();
        for (key, value) in &feat.properties {
            let tag = safe_tag(key);
            props_xml.push_str(&format!(
                "<{0}>{1}</{0}>",
                tag,
                xml_escape(&value.as_text())
            ));
        }
        let geom_xml = match feat.geometry.as_deref().map(wkb::decode) {
            Some(Ok(geom)) => format!("<geometry>{}</geometry>", gml::emit(&geom, layer.srid)),
            Some(Err(e)) => {
                warn!("feature {}.{}: undecodable geometry: {}", layer.name, feat.fid, e);
                String::new()
            }
            None => String::new(),
        };
        members.push_str(&format!(
            "<wfs:member><{name} gml:id=\"{name}.{fid}\">{geom}{props}</{name}></wfs:member>",
            name = layer.name,
            fid = feat.fid,
            geom = geom_xml,
            props = props_xml,
        ));
    }

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" numberMatched="{total}" numberReturned="{returned}" timeStamp="{timestamp}">{bounded_by}{members}</wfs:FeatureCollection>"#,
        total = total,
        returned = features.len(),
        timestamp = now_iso(),
        bounded_by = bbox_gml(&layer, &srs),
        members = members,
    ))
}

fn empty_gml_collection() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" numberMatched="0" numberReturned="0" timeStamp="{}"/>"#,
        now_iso()
    )
}

/// The first whitespace-delimited token names the layer; unknown layers
/// yield an empty collection rather than an error.
fn lookup_layer(conn: &Connection, typenames: &str) -> Result<Option<Layer>, ServiceError> {
    let name = match typenames.split_whitespace().next() {
        Some(name) => name,
        None => return Ok(None),
    };
    match repo::layer_by_name(conn, name) {
        Ok(layer) => Ok(Some(layer)),
        Err(ServiceError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn page_features(
    conn: &Connection,
    layer: &Layer,
    query: &FeatureQuery,
) -> Result<(Vec<StoredFeature>, u64), ServiceError> {
    repo::query_features(
        conn,
        layer.id,
        query.bbox.as_ref(),
        query.count,
        query.startindex,
        query.max_features,
    )
}

fn decode_geojson(feat: &StoredFeature) -> Value {
    match feat.geometry.as_deref().map(wkb::decode) {
        Some(Ok(geom)) => geojson::to_geojson(&geom),
        Some(Err(e)) => {
            warn!("feature {}: undecodable geometry: {}", feat.fid, e);
            Value::Null
        }
        None => Value::Null,
    }
}

fn bbox_gml(layer: &Layer, srs: &str) -> String {
    let ext = match &layer.bbox {
        Some(ext) => ext,
        None => return String::new(),
    };
    // EPSG:4326 envelopes are lat/lon per the OGC axis order
    let swap = srs.contains("EPSG::4326");
    let (lower, upper) = if swap {
        (
            format!("{} {}", ext.miny, ext.minx),
            format!("{} {}", ext.maxy, ext.maxx),
        )
    } else {
        (
            format!("{} {}", ext.minx, ext.miny),
            format!("{} {}", ext.maxx, ext.maxy),
        )
    };
    format!(
        "<gml:boundedBy><gml:Envelope srsName=\"{}\"><gml:lowerCorner>{}</gml:lowerCorner><gml:upperCorner>{}</gml:upperCorner></gml:Envelope></gml:boundedBy>",
        srs, lower, upper
    )
}

// ── Helpers ──────────────────────────────────────────────────────────

/// ISO-8601 UTC timestamp at millisecond precision.
pub fn now_iso() -> String {
    format!("{}Z", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f"))
}

/// Sanitise a property name into a valid XML tag.
pub fn safe_tag(name: &str) -> String {
    let mut tag: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if tag.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        tag.insert(0, '_');
    }
    if tag.is_empty() {
        tag = "field".to_string();
    }
    tag
}

pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
