//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! GML 3.2 geometry serialization and parsing.
//!
//! Per the OGC WFS 2.0 spec EPSG:4326 declares a (latitude, longitude)
//! axis order, which is (y, x) relative to our internal representation.
//! Coordinates tagged with an EPSG:4326 URN are therefore swapped on both
//! emission and ingestion. `CRS84` URNs are (lon, lat) and never swapped.

use crate::core::error::GeoError;
use crate::geom::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use elementtree::Element;
use regex::Regex;

/// Local names of GML geometry elements accepted by the parser.
pub const GEOMETRY_TAGS: [&str; 7] = [
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiCurve",
    "MultiSurface",
    "MultiGeometry",
];

pub fn is_geometry_tag(local_name: &str) -> bool {
    GEOMETRY_TAGS.contains(&local_name)
}

/// SRID encoded in an `srsName` attribute value; 4326 when absent or
/// unparseable.
pub fn srid_from_srs_name(srs_name: &str) -> i32 {
    let re = Regex::new(r"EPSG::?(\d+)").unwrap();
    re.captures(srs_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(4326)
}

// ── Emission ─────────────────────────────────────────────────────────

/// Serialize a geometry as a GML 3.2 fragment tagged with the EPSG URN of
/// `srid`.
pub fn emit(geom: &Geometry, srid: i32) -> String {
    let srs = format!("urn:ogc:def:crs:EPSG::{}", srid);
    let swap = srid == 4326;
    emit_geom(geom, &srs, swap)
}

fn emit_geom(geom: &Geometry, srs: &str, swap: bool) -> String {
    match geom {
        Geometry::Point(p) => emit_point(p, srs, swap),
        Geometry::LineString(line) => emit_linestring(line, srs, swap),
        Geometry::Polygon(poly) => emit_polygon(poly, srs, swap),
        Geometry::MultiPoint(mp) => emit_multi(
            "MultiPoint",
            "pointMember",
            mp.points.iter().map(|p| emit_point(p, srs, swap)),
            srs,
        ),
        Geometry::MultiLineString(ml) => emit_multi(
            "MultiCurve",
            "curveMember",
            ml.lines.iter().map(|l| emit_linestring(l, srs, swap)),
            srs,
        ),
        Geometry::MultiPolygon(mp) => emit_multi(
            "MultiSurface",
            "surfaceMember",
            mp.polygons.iter().map(|p| emit_polygon(p, srs, swap)),
            srs,
        ),
        Geometry::GeometryCollection(gc) => emit_multi(
            "MultiGeometry",
            "geometryMember",
            gc.geometries.iter().map(|g| emit_geom(g, srs, swap)),
            srs,
        ),
    }
}

fn coords_str(points: &[Point], swap: bool) -> String {
    points
        .iter()
        .map(|p| {
            if swap {
                format!("{} {}", p.y, p.x)
            } else {
                format!("{} {}", p.x, p.y)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit_point(p: &Point, srs: &str, swap: bool) -> String {
    let pos = if swap {
        format!("{} {}", p.y, p.x)
    } else {
        format!("{} {}", p.x, p.y)
    };
    format!(
        r#"<gml:Point srsName="{}"><gml:pos>{}</gml:pos></gml:Point>"#,
        srs, pos
    )
}

fn emit_linestring(line: &LineString, srs: &str, swap: bool) -> String {
    format!(
        r#"<gml:LineString srsName="{}"><gml:posList>{}</gml:posList></gml:LineString>"#,
        srs,
        coords_str(&line.points, swap)
    )
}

fn emit_ring(ring: &LineString, swap: bool) -> String {
    format!(
        "<gml:LinearRing><gml:posList>{}</gml:posList></gml:LinearRing>",
        coords_str(&ring.points, swap)
    )
}

fn emit_polygon(poly: &Polygon, srs: &str, swap: bool) -> String {
    let mut body = String::new();
    if let Some(exterior) = poly.rings.first() {
        body.push_str(&format!(
            "<gml:exterior>{}</gml:exterior>",
            emit_ring(exterior, swap)
        ));
    }
    for interior in poly.rings.iter().skip(1) {
        body.push_str(&format!(
            "<gml:interior>{}</gml:interior>",
            emit_ring(interior, swap)
        ));
    }
    format!(r#"<gml:Polygon srsName="{}">{}</gml:Polygon>"#, srs, body)
}

fn emit_multi(
    tag: &str,
    member_tag: &str,
    members: impl Iterator<Item = String>,
    srs: &str,
) -> String {
    let body: String = members
        .map(|m| format!("<gml:{0}>{1}</gml:{0}>", member_tag, m))
        .collect();
    format!(r#"<gml:{0} srsName="{1}">{2}</gml:{0}>"#, tag, srs, body)
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Parse a GML geometry element. Returns the geometry and the SRID the
/// coordinates were tagged with (already converted to internal (x, y)
/// order).
pub fn parse(elem: &Element) -> Result<(Geometry, i32), GeoError> {
    let srs_name = attr_by_local(elem, "srsName").unwrap_or("");
    let srid = if srs_name.is_empty() {
        4326
    } else {
        srid_from_srs_name(srs_name)
    };
    let swap = srid == 4326 && !srs_name.contains("CRS84");
    let geom = parse_geom(elem, swap)?;
    Ok((geom, srid))
}

/// Parse a standalone GML document.
pub fn parse_str(xml: &str) -> Result<(Geometry, i32), GeoError> {
    let root = Element::from_reader(xml.as_bytes())
        .map_err(|e| GeoError::MalformedGml(e.to_string()))?;
    parse(&root)
}

fn parse_geom(elem: &Element, swap: bool) -> Result<Geometry, GeoError> {
    match elem.tag().name() {
        "Point" => {
            let pos = required_text(elem, &["pos"], "Point")?;
            let points = parse_pos_list(&pos, swap)?;
            match points.as_slice() {
                [p] => Ok(Geometry::Point(*p)),
                _ => Err(GeoError::MalformedGml(
                    "gml:pos must contain exactly one coordinate pair".to_string(),
                )),
            }
        }
        "LineString" => {
            let pos_list = required_text(elem, &["posList"], "LineString")?;
            Ok(Geometry::LineString(LineString {
                points: parse_pos_list(&pos_list, swap)?,
            }))
        }
        "Polygon" => {
            let exterior = child_by_local(elem, "exterior").ok_or_else(|| {
                GeoError::MalformedGml("Polygon without gml:exterior".to_string())
            })?;
            let mut rings = vec![parse_ring(exterior, swap)?];
            for interior in children_by_local(elem, "interior") {
                rings.push(parse_ring(interior, swap)?);
            }
            Ok(Geometry::Polygon(Polygon { rings }))
        }
        "MultiPoint" => {
            let mut points = Vec::new();
            for member in children_by_local(elem, "pointMember") {
                match parse_member(member, swap)? {
                    Geometry::Point(p) => points.push(p),
                    other => return Err(member_mismatch("Point", &other)),
                }
            }
            Ok(Geometry::MultiPoint(MultiPoint { points }))
        }
        "MultiCurve" => {
            let mut lines = Vec::new();
            for member in children_by_local(elem, "curveMember") {
                match parse_member(member, swap)? {
                    Geometry::LineString(line) => lines.push(line),
                    other => return Err(member_mismatch("LineString", &other)),
                }
            }
            Ok(Geometry::MultiLineString(MultiLineString { lines }))
        }
        "MultiSurface" => {
            let mut polygons = Vec::new();
            for member in children_by_local(elem, "surfaceMember") {
                match parse_member(member, swap)? {
                    Geometry::Polygon(poly) => polygons.push(poly),
                    other => return Err(member_mismatch("Polygon", &other)),
                }
            }
            Ok(Geometry::MultiPolygon(MultiPolygon { polygons }))
        }
        "MultiGeometry" => {
            let mut geometries = Vec::new();
            for member in children_by_local(elem, "geometryMember") {
                geometries.push(parse_member(member, swap)?);
            }
            Ok(Geometry::GeometryCollection(GeometryCollection {
                geometries,
            }))
        }
        other => Err(GeoError::UnsupportedGeometryType(other.to_string())),
    }
}

fn parse_member(member: &Element, swap: bool) -> Result<Geometry, GeoError> {
    let geom_elem = member
        .children()
        .find(|c| is_geometry_tag(c.tag().name()))
        .ok_or_else(|| {
            GeoError::MalformedGml(format!(
                "member element <{}> without geometry child",
                member.tag().name()
            ))
        })?;
    parse_geom(geom_elem, swap)
}

fn parse_ring(wrapper: &Element, swap: bool) -> Result<LineString, GeoError> {
    let pos_list = child_by_local(wrapper, "LinearRing")
        .and_then(|ring| child_by_local(ring, "posList"))
        .map(|e| e.text().to_string())
        .ok_or_else(|| {
            GeoError::MalformedGml(format!(
                "<{}> without gml:LinearRing/gml:posList",
                wrapper.tag().name()
            ))
        })?;
    Ok(LineString {
        points: parse_pos_list(&pos_list, swap)?,
    })
}

fn parse_pos_list(text: &str, swap: bool) -> Result<Vec<Point>, GeoError> {
    let values = text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| GeoError::MalformedGml(format!("invalid coordinate `{}`", tok)))
        })
        .collect::<Result<Vec<f64>, _>>()?;
    if values.len() % 2 != 0 {
        return Err(GeoError::MalformedGml(
            "odd number of coordinate values".to_string(),
        ));
    }
    Ok(values
        .chunks(2)
        .map(|pair| {
            if swap {
                Point::new(pair[1], pair[0])
            } else {
                Point::new(pair[0], pair[1])
            }
        })
        .collect())
}

fn required_text(elem: &Element, path: &[&str], class: &str) -> Result<String, GeoError> {
    let mut current = elem;
    for &name in path {
        current = child_by_local(current, name).ok_or_else(|| {
            GeoError::MalformedGml(format!("{} without gml:{}", class, name))
        })?;
    }
    Ok(current.text().to_string())
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

fn attr_by_local<'a>(elem: &'a Element, local_name: &str) -> Option<&'a str> {
    elem.attrs()
        .find(|(name, _)| name.name() == local_name)
        .map(|(_, value)| value)
}

fn member_mismatch(expected: &str, got: &Geometry) -> GeoError {
    GeoError::MalformedGml(format!(
        "expected {} member, found {}",
        expected,
        got.class_name()
    ))
}
