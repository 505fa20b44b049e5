//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::kvp::{dispatch, parse_bbox, WfsParams, WfsRequest};
use geofs_core::geom::Extent;

fn params(pairs: &[(&str, &str)]) -> WfsParams {
    WfsParams::from_pairs(pairs.iter().copied())
}

#[test]
fn test_case_insensitive_keys() {
    let p = params(&[
        ("SERVICE", "WFS"),
        ("VERSION", "2.0.0"),
        ("ReQuEsT", "GetFeature"),
        ("TypeNames", "parks"),
        ("outputFormat", "application/json"),
        ("COUNT", "5"),
        ("startindex", "2"),
    ]);
    assert_eq!(p.service.as_deref(), Some("WFS"));
    assert_eq!(p.request, "GetFeature");
    assert_eq!(p.typenames.as_deref(), Some("parks"));
    assert_eq!(p.output_format, "application/json");
    assert_eq!(p.count, Some(5));
    assert_eq!(p.startindex, 2);
}

#[test]
fn test_typename_singular_accepted() {
    let p = params(&[("TYPENAME", "roads")]);
    assert_eq!(p.typenames.as_deref(), Some("roads"));
    // plural wins when both appear first
    let p = params(&[("TYPENAMES", "a"), ("TYPENAME", "b")]);
    assert_eq!(p.typenames.as_deref(), Some("a"));
}

#[test]
fn test_bad_numeric_params() {
    let p = params(&[("COUNT", "many"), ("STARTINDEX", "-3")]);
    assert_eq!(p.count, None);
    assert_eq!(p.startindex, 0);
}

#[test]
fn test_dispatch_table() {
    assert_eq!(
        dispatch(&params(&[("REQUEST", "GetCapabilities")])),
        WfsRequest::GetCapabilities
    );
    assert_eq!(dispatch(&params(&[])), WfsRequest::GetCapabilities);
    assert_eq!(
        dispatch(&params(&[("request", "describefeaturetype")])),
        WfsRequest::DescribeFeatureType
    );
    assert_eq!(
        dispatch(&params(&[("REQUEST", "GETFEATURE")])),
        WfsRequest::GetFeature { json: false }
    );
    assert_eq!(
        dispatch(&params(&[
            ("REQUEST", "GetFeature"),
            ("OUTPUTFORMAT", "application/json")
        ])),
        WfsRequest::GetFeature { json: true }
    );
    assert_eq!(
        dispatch(&params(&[
            ("REQUEST", "GetFeature"),
            ("outputformat", "GeoJSON")
        ])),
        WfsRequest::GetFeature { json: true }
    );
    assert_eq!(
        dispatch(&params(&[("REQUEST", "Transaction")])),
        WfsRequest::Transaction
    );
    assert_eq!(
        dispatch(&params(&[("REQUEST", "GetPropertyValue")])),
        WfsRequest::Unknown("GetPropertyValue".to_string())
    );
}

#[test]
fn test_bbox_plain() {
    assert_eq!(
        parse_bbox("5,5,20,20").unwrap(),
        Extent::new(5.0, 5.0, 20.0, 20.0)
    );
}

#[test]
fn test_bbox_epsg4326_swaps_axes() {
    // lat,lon order per WFS 2.0 for the EPSG:4326 URN
    assert_eq!(
        parse_bbox("1,2,3,4,urn:ogc:def:crs:EPSG::4326").unwrap(),
        Extent::new(2.0, 1.0, 4.0, 3.0)
    );
    // symmetric box is unchanged by the swap
    assert_eq!(
        parse_bbox("5,5,20,20,urn:ogc:def:crs:EPSG::4326").unwrap(),
        Extent::new(5.0, 5.0, 20.0, 20.0)
    );
}

#[test]
fn test_bbox_crs84_is_lonlat() {
    assert_eq!(
        parse_bbox("1,2,3,4,urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
        Extent::new(1.0, 2.0, 3.0, 4.0)
    );
}

#[test]
fn test_bbox_other_crs_unchanged() {
    assert_eq!(
        parse_bbox("1,2,3,4,urn:ogc:def:crs:EPSG::3857").unwrap(),
        Extent::new(1.0, 2.0, 3.0, 4.0)
    );
}

#[test]
fn test_bbox_errors() {
    assert!(parse_bbox("1,2,3").is_err());
    assert!(parse_bbox("a,b,c,d").is_err());
    assert!(parse_bbox("").is_err());
}
