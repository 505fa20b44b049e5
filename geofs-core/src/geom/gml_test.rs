//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::geom::geom_test::line;
use crate::geom::gml;
use crate::geom::*;

#[test]
fn test_point_emit_swaps_wgs84_axes() {
    let g = Geometry::Point(Point::new(10.5, 20.25));
    assert_eq!(
        gml::emit(&g, 4326),
        r#"<gml:Point srsName="urn:ogc:def:crs:EPSG::4326"><gml:pos>20.25 10.5</gml:pos></gml:Point>"#
    );
}

#[test]
fn test_point_emit_keeps_xy_for_other_crs() {
    let g = Geometry::Point(Point::new(960000.0, 6002729.0));
    assert_eq!(
        gml::emit(&g, 3857),
        r#"<gml:Point srsName="urn:ogc:def:crs:EPSG::3857"><gml:pos>960000 6002729</gml:pos></gml:Point>"#
    );
}

#[test]
fn test_linestring_emit() {
    let g = Geometry::LineString(line(&[(0.0, 0.0), (2.0, 0.0)]));
    assert_eq!(
        gml::emit(&g, 3857),
        r#"<gml:LineString srsName="urn:ogc:def:crs:EPSG::3857"><gml:posList>0 0 2 0</gml:posList></gml:LineString>"#
    );
}

#[test]
fn test_polygon_emit_has_exterior_and_interior() {
    let g = Geometry::Polygon(Polygon {
        rings: vec![
            line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]),
            line(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)]),
        ],
    });
    let xml = gml::emit(&g, 3857);
    assert!(xml.starts_with(r#"<gml:Polygon srsName="urn:ogc:def:crs:EPSG::3857">"#));
    assert!(xml.contains("<gml:exterior><gml:LinearRing><gml:posList>0 0 4 0 4 4 0 0</gml:posList></gml:LinearRing></gml:exterior>"));
    assert!(xml.contains("<gml:interior><gml:LinearRing><gml:posList>1 1 2 1 2 2 1 1</gml:posList></gml:LinearRing></gml:interior>"));
}

fn roundtrip(geom: Geometry, srid: i32) {
    let xml = gml::emit(&geom, srid);
    let with_ns = format!(
        r#"<wrapper xmlns:gml="http://www.opengis.net/gml/3.2">{}</wrapper>"#,
        xml
    );
    let root = elementtree::Element::from_reader(with_ns.as_bytes()).unwrap();
    let geom_elem = root.children().next().unwrap();
    let (parsed, parsed_srid) = gml::parse(geom_elem).unwrap();
    assert_eq!(parsed_srid, srid);
    assert_eq!(parsed, geom);
}

#[test]
fn test_roundtrip_all_classes_wgs84() {
    roundtrip(Geometry::Point(Point::new(10.5, 20.25)), 4326);
    roundtrip(Geometry::LineString(line(&[(0.0, 0.0), (1.0, 2.0)])), 4326);
    roundtrip(
        Geometry::Polygon(Polygon {
            rings: vec![line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)])],
        }),
        4326,
    );
    roundtrip(
        Geometry::MultiPoint(MultiPoint {
            points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
        }),
        4326,
    );
    roundtrip(
        Geometry::MultiLineString(MultiLineString {
            lines: vec![line(&[(0.0, 0.0), (1.0, 1.0)])],
        }),
        4326,
    );
    roundtrip(
        Geometry::MultiPolygon(MultiPolygon {
            polygons: vec![Polygon {
                rings: vec![line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)])],
            }],
        }),
        4326,
    );
    roundtrip(
        Geometry::GeometryCollection(GeometryCollection {
            geometries: vec![
                Geometry::Point(Point::new(5.0, 6.0)),
                Geometry::LineString(line(&[(0.0, 0.0), (2.0, 2.0)])),
            ],
        }),
        4326,
    );
}

#[test]
fn test_roundtrip_mercator_no_swap() {
    roundtrip(Geometry::Point(Point::new(960000.0, 6002729.0)), 3857);
}

#[test]
fn test_parse_without_srsname_defaults_to_wgs84_latlon() {
    let (geom, srid) = gml::parse_str("<Point><pos>20.25 10.5</pos></Point>").unwrap();
    assert_eq!(srid, 4326);
    assert_eq!(geom, Geometry::Point(Point::new(10.5, 20.25)));
}

#[test]
fn test_parse_crs84_is_lonlat() {
    let (geom, srid) = gml::parse_str(
        r#"<Point srsName="urn:ogc:def:crs:OGC:1.3:CRS84"><pos>10.5 20.25</pos></Point>"#,
    )
    .unwrap();
    assert_eq!(srid, 4326);
    assert_eq!(geom, Geometry::Point(Point::new(10.5, 20.25)));
}

#[test]
fn test_parse_polygon_without_exterior_fails() {
    let result = gml::parse_str(r#"<Polygon srsName="urn:ogc:def:crs:EPSG::3857"></Polygon>"#);
    assert!(result.is_err());
}

#[test]
fn test_parse_unsupported_tag_fails() {
    let result = gml::parse_str("<Curve><posList>0 0 1 1</posList></Curve>");
    assert!(result.is_err());
}

#[test]
fn test_parse_bad_coordinates_fail() {
    assert!(gml::parse_str("<Point><pos>abc def</pos></Point>").is_err());
    assert!(gml::parse_str("<LineString><posList>1 2 3</posList></LineString>").is_err());
}

#[test]
fn test_srid_extraction() {
    assert_eq!(gml::srid_from_srs_name("urn:ogc:def:crs:EPSG::3857"), 3857);
    assert_eq!(gml::srid_from_srs_name("EPSG:4326"), 4326);
    assert_eq!(gml::srid_from_srs_name("unintelligible"), 4326);
}
