//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::geom::proj::{lonlat_to_merc, merc_to_lonlat, reproject, transformer, Transform};
use crate::geom::*;

pub fn line(coords: &[(f64, f64)]) -> LineString {
    LineString {
        points: coords.iter().map(|&(x, y)| Point::new(x, y)).collect(),
    }
}

#[test]
fn test_point_bounds() {
    let g = Geometry::Point(Point::new(10.5, 20.25));
    let ext = g.bounds().unwrap();
    assert_eq!(ext, Extent::new(10.5, 20.25, 10.5, 20.25));
}

#[test]
fn test_polygon_bounds() {
    let g = Geometry::Polygon(Polygon {
        rings: vec![line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 0.0)])],
    });
    assert_eq!(g.bounds().unwrap(), Extent::new(0.0, 0.0, 4.0, 3.0));
}

#[test]
fn test_collection_bounds() {
    let g = Geometry::GeometryCollection(GeometryCollection {
        geometries: vec![
            Geometry::Point(Point::new(-1.0, 5.0)),
            Geometry::LineString(line(&[(2.0, -3.0), (7.0, 8.0)])),
        ],
    });
    assert_eq!(g.bounds().unwrap(), Extent::new(-1.0, -3.0, 7.0, 8.0));
}

#[test]
fn test_empty_geometry_has_no_bounds() {
    let g = Geometry::MultiPoint(MultiPoint { points: vec![] });
    assert!(g.bounds().is_none());
}

#[test]
fn test_extent_expand() {
    let mut ext = Extent::new(0.0, 0.0, 1.0, 1.0);
    ext.expand(&Extent::new(-2.0, 0.5, 0.5, 3.0));
    assert_eq!(ext, Extent::new(-2.0, 0.0, 1.0, 3.0));
}

#[test]
fn test_map_coords() {
    let g = Geometry::LineString(line(&[(1.0, 2.0), (3.0, 4.0)]));
    let shifted = g.map_coords(&|x, y| (x + 10.0, y - 1.0));
    assert_eq!(
        shifted,
        Geometry::LineString(line(&[(11.0, 1.0), (13.0, 3.0)]))
    );
}

#[test]
fn test_identity_transform() {
    assert!(transformer(4326, 4326).unwrap().is_none());
    assert!(transformer(3857, 3857).unwrap().is_none());
}

#[test]
fn test_unknown_crs() {
    assert!(transformer(2056, 4326).is_err());
    assert!(transformer(4326, 2056).is_err());
}

#[test]
fn test_mercator_roundtrip() {
    let (x, y) = lonlat_to_merc(8.5, 47.1);
    let (lon, lat) = merc_to_lonlat(x, y);
    assert!((lon - 8.5).abs() < 1e-9);
    assert!((lat - 47.1).abs() < 1e-9);
}

#[test]
fn test_reproject_geometry() {
    let transform = transformer(4326, 3857).unwrap().unwrap();
    assert_eq!(transform, Transform::Wgs84ToMercator);
    let g = Geometry::Point(Point::new(0.0, 0.0));
    let projected = reproject(&g, &transform);
    match projected {
        Geometry::Point(p) => {
            assert!(p.x.abs() < 1e-9);
            assert!(p.y.abs() < 1e-9);
        }
        _ => panic!("expected point"),
    }
}
