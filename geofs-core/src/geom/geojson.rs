//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! GeoJSON geometry mapping (RFC 7946). Always (lon, lat); no axis logic.

use crate::core::error::GeoError;
use crate::geom::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use serde_json::{json, Value};

pub fn to_geojson(geom: &Geometry) -> Value {
    match geom {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": position(p)}),
        Geometry::LineString(line) => {
            json!({"type": "LineString", "coordinates": line_coords(line)})
        }
        Geometry::Polygon(poly) => json!({"type": "Polygon", "coordinates": poly_coords(poly)}),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.points.iter().map(position).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(ml) => json!({
            "type": "MultiLineString",
            "coordinates": ml.lines.iter().map(line_coords).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.polygons.iter().map(poly_coords).collect::<Vec<_>>(),
        }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.geometries.iter().map(to_geojson).collect::<Vec<_>>(),
        }),
    }
}

pub fn from_geojson(value: &Value) -> Result<Geometry, GeoError> {
    let type_name = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| GeoError::InvalidGeoJson("missing `type` member".to_string()))?;
    match type_name {
        "Point" => Ok(Geometry::Point(parse_position(coordinates(value)?)?)),
        "LineString" => Ok(Geometry::LineString(parse_line(coordinates(value)?)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coordinates(value)?)?)),
        "MultiPoint" => {
            let points = parse_array(coordinates(value)?, parse_position)?;
            Ok(Geometry::MultiPoint(MultiPoint { points }))
        }
        "MultiLineString" => {
            let lines = parse_array(coordinates(value)?, parse_line)?;
            Ok(Geometry::MultiLineString(MultiLineString { lines }))
        }
        "MultiPolygon" => {
            let polygons = parse_array(coordinates(value)?, parse_polygon)?;
            Ok(Geometry::MultiPolygon(MultiPolygon { polygons }))
        }
        "GeometryCollection" => {
            let members = value
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    GeoError::InvalidGeoJson("missing `geometries` member".to_string())
                })?;
            let geometries = members
                .iter()
                .map(from_geojson)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::GeometryCollection(GeometryCollection {
                geometries,
            }))
        }
        other => Err(GeoError::UnsupportedGeometryType(other.to_string())),
    }
}

fn position(p: &Point) -> Vec<f64> {
    vec![p.x, p.y]
}

fn line_coords(line: &LineString) -> Vec<Vec<f64>> {
    line.points.iter().map(position).collect()
}

fn poly_coords(poly: &Polygon) -> Vec<Vec<Vec<f64>>> {
    poly.rings.iter().map(line_coords).collect()
}

fn coordinates(value: &Value) -> Result<&Value, GeoError> {
    value
        .get("coordinates")
        .ok_or_else(|| GeoError::InvalidGeoJson("missing `coordinates` member".to_string()))
}

fn parse_array<T>(
    value: &Value,
    parse: impl Fn(&Value) -> Result<T, GeoError>,
) -> Result<Vec<T>, GeoError> {
    value
        .as_array()
        .ok_or_else(|| GeoError::InvalidGeoJson("expected a coordinate array".to_string()))?
        .iter()
        .map(|v| parse(v))
        .collect()
}

fn parse_position(value: &Value) -> Result<Point, GeoError> {
    let coords = value
        .as_array()
        .ok_or_else(|| GeoError::InvalidGeoJson("expected a position array".to_string()))?;
    if coords.len() < 2 {
        return Err(GeoError::InvalidGeoJson(
            "position needs at least two values".to_string(),
        ));
    }
    let x = coords[0]
        .as_f64()
        .ok_or_else(|| GeoError::InvalidGeoJson("non-numeric coordinate".to_string()))?;
    let y = coords[1]
        .as_f64()
        .ok_or_else(|| GeoError::InvalidGeoJson("non-numeric coordinate".to_string()))?;
    Ok(Point::new(x, y))
}

fn parse_line(value: &Value) -> Result<LineString, GeoError> {
    Ok(LineString {
        points: parse_array(value, parse_position)?,
    })
}

fn parse_polygon(value: &Value) -> Result<Polygon, GeoError> {
    Ok(Polygon {
        rings: parse_array(value, parse_line)?,
    })
}
