//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::transaction::execute_transaction;
use geofs_core::core::feature::{FeatureRecord, PropMap, PropValue};
use geofs_core::geom::{wkb, Extent, Geometry, LineString, Point};
use geofs_core::repo;
use rusqlite::Connection;

const ENVELOPE: &str = r#"xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:fes="http://www.opengis.net/fes/2.0""#;

fn line(coords: &[(f64, f64)]) -> LineString {
    LineString {
        points: coords.iter().map(|&(x, y)| Point::new(x, y)).collect(),
    }
}

fn insert_line(conn: &Connection, layer_id: i64, fid: &str, coords: &[(f64, f64)]) {
    let geom = Geometry::LineString(line(coords));
    let mut properties = PropMap::new();
    properties.insert("lanes".to_string(), PropValue::Int(2));
    properties.insert(
        "surface".to_string(),
        PropValue::String("asphalt".to_string()),
    );
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
fn test_malformed_xml() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let response = execute_transaction(&mut conn, b"<wfs:Transaction");
    assert!(response.contains("ows:ExceptionReport"));
    assert!(response.contains(r#"exceptionCode="InvalidParameterValue""#));
    assert!(response.contains("Malformed XML"));
}

#[test]
fn test_wrong_root_element() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let xml = format!("<wfs:GetFeature {}/>", ENVELOPE);
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains(r#"exceptionCode="OperationNotSupported""#));
}

#[test]
fn test_insert_feature() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "roads", "", "").unwrap();

    let xml = format!(
        r#"<wfs:Transaction {} version="2.0.0">
             <wfs:Insert>
               <roads gml:id="roads.r1">
                 <geometry>
                   <gml:LineString srsName="urn:ogc:def:crs:EPSG::4326">
                     <gml:posList>0 0 0 1</gml:posList>
                   </gml:LineString>
                 </geometry>
                 <lanes>2</lanes>
                 <surface>asphalt</surface>
               </roads>
             </wfs:Insert>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains("<wfs:totalInserted>1</wfs:totalInserted>"));
    assert!(response.contains(r#"<fes:ResourceId rid="roads.r1"/>"#));

    let stored = repo::feature_by_fid(&conn, layer.id, "r1").unwrap().unwrap();
    // posList was lat/lon: (0,0) then (1,0) internally
    assert_eq!(stored.bbox.unwrap(), Extent::new(0.0, 0.0, 1.0, 0.0));
    assert_eq!(
        stored.properties["surface"],
        PropValue::String("asphalt".to_string())
    );

    let layer = repo::layer_by_id(&conn, layer.id).unwrap();
    assert_eq!(layer.feature_count, 1);
    assert_eq!(layer.geometry_type, "LineString");
    assert_eq!(layer.bbox.unwrap(), Extent::new(0.0, 0.0, 1.0, 0.0));
}

#[test]
fn test_insert_unwrapped_geometry_and_generated_fid() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "poi", "", "").unwrap();

    let xml = format!(
        r#"<wfs:Transaction {}>
             <wfs:Insert>
               <poi>
                 <gml:Point srsName="urn:ogc:def:crs:EPSG::3857">
                   <gml:pos>960000 6002729</gml:pos>
                 </gml:Point>
                 <name>station</name>
               </poi>
             </wfs:Insert>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains("<wfs:totalInserted>1</wfs:totalInserted>"));

    let (features, total) = repo::query_features(&conn, layer.id, None, None, 0, 10).unwrap();
    assert_eq!(total, 1);
    // fid was generated
    assert!(!features[0].fid.is_empty());
    // mercator input was reprojected to the storage CRS
    let ext = features[0].bbox.unwrap();
    assert!(ext.minx > 8.0 && ext.minx < 9.0);
    assert!(ext.miny > 47.0 && ext.miny < 48.0);
}

#[test]
fn test_insert_atomicity_on_unknown_layer() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "roads", "", "").unwrap();

    let xml = format!(
        r#"<wfs:Transaction {}>
             <wfs:Insert>
               <roads gml:id="roads.a"><lanes>1</lanes></roads>
             </wfs:Insert>
             <wfs:Insert>
               <unknown gml:id="unknown.b"><lanes>1</lanes></unknown>
             </wfs:Insert>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains("ows:ExceptionReport"));
    assert!(response.contains(r#"exceptionCode="InvalidParameterValue""#));
    assert!(response.contains("Unknown feature type"));

    // the whole transaction rolled back
    let (_, total) = repo::query_features(&conn, layer.id, None, None, 0, 10).unwrap();
    assert_eq!(total, 0);
}

#[test]
fn test_update_merges_properties_and_bbox() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "roads", "", "").unwrap();
    insert_line(&conn, layer.id, "r1", &[(0.0, 0.0), (1.0, 0.0)]);
    repo::refresh_layer_stats(&conn, layer.id).unwrap();

    let xml = format!(
        r#"<wfs:Transaction {}>
             <wfs:Update typeName="roads">
               <wfs:Property>
                 <wfs:ValueReference>lanes</wfs:ValueReference>
                 <wfs:Value>4</wfs:Value>
               </wfs:Property>
               <wfs:Property>
                 <wfs:ValueReference>geometry</wfs:ValueReference>
                 <wfs:Value>
                   <gml:LineString srsName="urn:ogc:def:crs:EPSG::4326">
                     <gml:posList>0 0 0 2</gml:posList>
                   </gml:LineString>
                 </wfs:Value>
               </wfs:Property>
               <fes:Filter>
                 <fes:ResourceId rid="roads.r1"/>
               </fes:Filter>
             </wfs:Update>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains("<wfs:totalUpdated>1</wfs:totalUpdated>"));

    let stored = repo::feature_by_fid(&conn, layer.id, "r1").unwrap().unwrap();
    // untouched property preserved, referenced one replaced
    assert_eq!(
        stored.properties["surface"],
        PropValue::String("asphalt".to_string())
    );
    assert_eq!(stored.properties["lanes"], PropValue::String("4".to_string()));
    assert_eq!(stored.bbox.unwrap(), Extent::new(0.0, 0.0, 2.0, 0.0));

    let layer = repo::layer_by_id(&conn, layer.id).unwrap();
    assert_eq!(layer.bbox.unwrap(), Extent::new(0.0, 0.0, 2.0, 0.0));
}

#[test]
fn test_update_missing_row_counts_zero() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    repo::create_layer(&conn, "roads", "", "").unwrap();

    let xml = format!(
        r#"<wfs:Transaction {}>
             <wfs:Update typeName="roads">
               <wfs:Property>
                 <wfs:ValueReference>lanes</wfs:ValueReference>
                 <wfs:Value>4</wfs:Value>
               </wfs:Property>
               <fes:Filter><fes:ResourceId rid="roads.ghost"/></fes:Filter>
             </wfs:Update>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains("<wfs:totalUpdated>0</wfs:totalUpdated>"));
}

#[test]
fn test_delete_features() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "roads", "", "").unwrap();
    insert_line(&conn, layer.id, "r1", &[(0.0, 0.0), (1.0, 0.0)]);
    insert_line(&conn, layer.id, "r2", &[(5.0, 5.0), (6.0, 5.0)]);

    let xml = format!(
        r#"<wfs:Transaction {}>
             <wfs:Delete typeNames="roads">
               <fes:Filter>
                 <fes:ResourceId rid="roads.r1"/>
                 <fes:ResourceId rid="r2"/>
               </fes:Filter>
             </wfs:Delete>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains("<wfs:totalDeleted>2</wfs:totalDeleted>"));

    let (_, total) = repo::query_features(&conn, layer.id, None, None, 0, 10).unwrap();
    assert_eq!(total, 0);
    let layer = repo::layer_by_id(&conn, layer.id).unwrap();
    assert_eq!(layer.feature_count, 0);
}

#[test]
fn test_mixed_transaction_summary() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let layer = repo::create_layer(&conn, "roads", "", "").unwrap();
    insert_line(&conn, layer.id, "old", &[(0.0, 0.0), (1.0, 0.0)]);

    let xml = format!(
        r#"<wfs:Transaction {}>
             <wfs:Insert>
               <roads gml:id="roads.new"><lanes>1</lanes></roads>
             </wfs:Insert>
             <wfs:Delete typeName="roads">
               <fes:Filter><fes:ResourceId rid="roads.old"/></fes:Filter>
             </wfs:Delete>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains("<wfs:totalInserted>1</wfs:totalInserted>"));
    assert!(response.contains("<wfs:totalDeleted>1</wfs:totalDeleted>"));
    assert!(response.contains(r#"<fes:ResourceId rid="roads.new"/>"#));
}

#[test]
fn test_exception_text_is_escaped() {
    let pool = repo::init_test_pool().unwrap();
    let mut conn = pool.get().unwrap();
    let xml = format!(
        r#"<wfs:Transaction {}>
             <wfs:Insert><x_y gml:id="a"/></wfs:Insert>
           </wfs:Transaction>"#,
        ENVELOPE
    );
    let response = execute_transaction(&mut conn, xml.as_bytes());
    assert!(response.contains(r#"exceptionCode="InvalidParameterValue""#));
    assert!(response.contains("Unknown feature type: 'x_y'"));
}
