//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::wfs::*;
use geofs_core::core::config::ServiceCfg;
use geofs_core::core::error::ServiceError;
use geofs_core::core::feature::{FeatureRecord, PropMap, PropValue};
use geofs_core::geom::{wkb, Extent, Geometry, Point};
use geofs_core::repo;
use rusqlite::Connection;

fn default_query() -> FeatureQuery {
    FeatureQuery {
        bbox: None,
        count: None,
        startindex: 0,
        max_features: 10000,
    }
}

fn insert_point(conn: &Connection, layer_id: i64, fid: &str, x: f64, y: f64) {
    let geom = Geometry::Point(Point::new(x, y));
    let mut properties = PropMap::new();
    properties.insert("name".to_string(), PropValue::String("Alpha".to_string()));
    properties.insert("cnt".to_string(), PropValue::Int(3));
    repo::insert_feature(
        conn,
        &FeatureRecord {
            layer_id,
            fid: fid.to_string(),
            geometry: Some(wkb::encode(&geom).unwrap()),
            properties,
            bbox: geom.bounds(),
        },
    )
    .unwrap();
}

#[test]
fn test_capabilities_with_empty_store() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let xml = build_capabilities(&conn, &ServiceCfg::default()).unwrap();
    assert!(xml.contains("<ows:ServiceIdentification>"));
    assert!(xml.contains("<ows:Title>GeoFeatureService</ows:Title>"));
    assert!(!xml.contains("<wfs:FeatureType>"));
    assert!(xml.contains("<wfs:FeatureTypeList></wfs:FeatureTypeList>"));
}

#[test]
fn test_capabilities_lists_layers_by_name() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    repo::create_layer(&conn, "zebra", "Zebra layer", "").unwrap();
    let parks = repo::create_layer(&conn, "parks", "Parks", "Green spots").unwrap();
    insert_point(&conn, parks.id, "p1", 10.5, 20.25);
    repo::refresh_layer_stats(&conn, parks.id).unwrap();

    let xml = build_capabilities(&conn, &ServiceCfg::default()).unwrap();
    let parks_pos = xml.find("<wfs:Name>parks</wfs:Name>").unwrap();
    let zebra_pos = xml.find("<wfs:Name>zebra</wfs:Name>").unwrap();
    assert!(parks_pos < zebra_pos);
    assert!(xml.contains("<wfs:DefaultCRS>urn:ogc:def:crs:EPSG::4326</wfs:DefaultCRS>"));
    // WGS84BoundingBox is lon/lat
    assert!(xml.contains("<ows:LowerCorner>10.5 20.25</ows:LowerCorner>"));
    // layer without bbox has no bounding box block
    let zebra_block = &xml[zebra_pos..];
    assert!(!zebra_block[..zebra_block.find("</wfs:FeatureType>").unwrap()]
        .contains("WGS84BoundingBox"));
    for op in ["GetCapabilities", "DescribeFeatureType", "GetFeature", "Transaction"] {
        assert!(xml.contains(&format!("<ows:Operation name=\"{}\">", op)));
    }
    assert!(xml.contains("application/gml+xml; version=3.2"));
    assert!(xml.contains("application/json"));
}

#[test]
fn test_describe_maps_types() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "parks", "", "").unwrap();
    insert_point(&conn, layer.id, "p1", 1.0, 2.0);
    repo::refresh_layer_stats(&conn, layer.id).unwrap();
    let mut schema = std::collections::BTreeMap::new();
    schema.insert("name".to_string(), "String".to_string());
    schema.insert("cnt".to_string(), "Integer".to_string());
    schema.insert("height".to_string(), "Real".to_string());
    schema.insert("built".to_string(), "Date".to_string());
    repo::update_attribute_schema(&conn, layer.id, &schema).unwrap();

    let xml = build_describe(&conn, Some("parks")).unwrap();
    assert!(xml.contains(r#"<xsd:element name="parks" substitutionGroup="gml:AbstractFeature""#));
    assert!(xml.contains(r#"<xsd:element name="geometry" type="gml:PointPropertyType""#));
    assert!(xml.contains(r#"<xsd:element name="name" type="xsd:string""#));
    assert!(xml.contains(r#"<xsd:element name="cnt" type="xsd:long""#));
    assert!(xml.contains(r#"<xsd:element name="height" type="xsd:double""#));
    assert!(xml.contains(r#"<xsd:element name="built" type="xsd:date""#));
}

#[test]
fn test_describe_all_layers_and_separators() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    repo::create_layer(&conn, "a", "", "").unwrap();
    repo::create_layer(&conn, "b", "", "").unwrap();

    let xml = build_describe(&conn, None).unwrap();
    assert!(xml.contains(r#"name="a""#));
    assert!(xml.contains(r#"name="b""#));

    // comma and space separated lists
    let xml = build_describe(&conn, Some("a,b")).unwrap();
    assert!(xml.contains(r#"name="a""#) && xml.contains(r#"name="b""#));
    let xml = build_describe(&conn, Some("a b")).unwrap();
    assert!(xml.contains(r#"name="a""#) && xml.contains(r#"name="b""#));
}

#[test]
fn test_describe_unknown_layer_is_not_found() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    assert!(matches!(
        build_describe(&conn, Some("ghost")),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn test_get_feature_geojson() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "parks", "", "").unwrap();
    insert_point(&conn, layer.id, "p1", 10.5, 20.25);

    let doc = build_get_feature_geojson(&conn, "parks", &default_query()).unwrap();
    assert_eq!(doc["type"], "FeatureCollection");
    assert_eq!(doc["numberMatched"], 1);
    assert_eq!(doc["numberReturned"], 1);
    let ts = doc["timeStamp"].as_str().unwrap();
    assert!(ts.ends_with('Z') && ts.contains('T') && ts.contains('.'));
    let feat = &doc["features"][0];
    assert_eq!(feat["id"], "parks.p1");
    assert_eq!(feat["geometry"]["coordinates"][0], 10.5);
    assert_eq!(feat["geometry"]["coordinates"][1], 20.25);
    assert_eq!(feat["properties"]["name"], "Alpha");
    assert_eq!(feat["properties"]["cnt"], 3);
}

#[test]
fn test_get_feature_unknown_layer_is_empty_collection() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let doc = build_get_feature_geojson(&conn, "ghost", &default_query()).unwrap();
    assert_eq!(doc["numberMatched"], 0);
    assert_eq!(doc["numberReturned"], 0);
    assert_eq!(doc["features"].as_array().unwrap().len(), 0);

    let xml = build_get_feature_gml(&conn, "ghost", &default_query()).unwrap();
    assert!(xml.contains(r#"numberMatched="0" numberReturned="0""#));
}

#[test]
fn test_get_feature_bbox_filter() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "sites", "", "").unwrap();
    insert_point(&conn, layer.id, "origin", 0.0, 0.0);
    insert_point(&conn, layer.id, "far", 10.0, 10.0);

    let query = FeatureQuery {
        bbox: Some(Extent::new(5.0, 5.0, 20.0, 20.0)),
        ..default_query()
    };
    let doc = build_get_feature_geojson(&conn, "sites", &query).unwrap();
    assert_eq!(doc["numberMatched"], 1);
    assert_eq!(doc["features"][0]["id"], "sites.far");
}

#[test]
fn test_get_feature_paging_and_clamping() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "sites", "", "").unwrap();
    for i in 0..5 {
        insert_point(&conn, layer.id, &format!("f{}", i), i as f64, 0.0);
    }

    let query = FeatureQuery {
        count: Some(2),
        startindex: 1,
        ..default_query()
    };
    let doc = build_get_feature_geojson(&conn, "sites", &query).unwrap();
    assert_eq!(doc["numberMatched"], 5);
    assert_eq!(doc["numberReturned"], 2);
    assert_eq!(doc["features"][0]["id"], "sites.f1");

    // client count above the server limit is clamped
    let query = FeatureQuery {
        count: Some(100),
        max_features: 3,
        ..default_query()
    };
    let doc = build_get_feature_geojson(&conn, "sites", &query).unwrap();
    assert_eq!(doc["numberReturned"], 3);
}

#[test]
fn test_get_feature_gml_output() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "parks", "", "").unwrap();
    insert_point(&conn, layer.id, "p1", 10.5, 20.25);
    repo::refresh_layer_stats(&conn, layer.id).unwrap();

    let xml = build_get_feature_gml(&conn, "parks", &default_query()).unwrap();
    assert!(xml.contains(r#"numberMatched="1" numberReturned="1""#));
    assert!(xml.contains(r#"<parks gml:id="parks.p1">"#));
    // EPSG:4326 geometry is emitted lat/lon
    assert!(xml.contains("<gml:pos>20.25 10.5</gml:pos>"));
    assert!(xml.contains("<geometry><gml:Point"));
    assert!(xml.contains("<name>Alpha</name>"));
    assert!(xml.contains("<cnt>3</cnt>"));
    // boundedBy envelope swapped as well
    assert!(xml.contains("<gml:lowerCorner>20.25 10.5</gml:lowerCorner>"));
}

#[test]
fn test_gml_property_escaping_and_nulls() {
    let pool = repo::init_test_pool().unwrap();
    let conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "odd", "", "").unwrap();
    let mut properties = PropMap::new();
    properties.insert(
        "note".to_string(),
        PropValue::String("a < b & c > d".to_string()),
    );
    properties.insert("missing".to_string(), PropValue::Null);
    properties.insert("2nd field".to_string(), PropValue::Int(7));
    repo::insert_feature(
        &conn,
        &FeatureRecord {
            layer_id: layer.id,
            fid: "x".to_string(),
            geometry: None,
            properties,
            bbox: None,
        },
    )
    .unwrap();

    let xml = build_get_feature_gml(&conn, "odd", &default_query()).unwrap();
    assert!(xml.contains("<note>a &lt; b &amp; c &gt; d</note>"));
    assert!(xml.contains("<missing></missing>"));
    assert!(xml.contains("<_2nd_field>7</_2nd_field>"));
    // null geometry leaves the member without a geometry wrapper
    assert!(!xml.contains("<geometry>"));
}

#[test]
fn test_safe_tag() {
    assert_eq!(safe_tag("name"), "name");
    assert_eq!(safe_tag("my field"), "my_field");
    assert_eq!(safe_tag("1abc"), "_1abc");
    assert_eq!(safe_tag("a.b-c_d"), "a.b-c_d");
    assert_eq!(safe_tag(""), "field");
    assert_eq!(safe_tag("käse"), "k_se");
}

#[test]
fn test_xml_escape() {
    assert_eq!(xml_escape("a&b<c>d"), "a&amp;b&lt;c&gt;d");
}
