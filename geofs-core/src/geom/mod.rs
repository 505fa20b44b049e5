//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Geometry model shared by the WKB, GML and GeoJSON codecs.
//!
//! Coordinates are always stored in `(x, y)` order. Axis swapping for
//! lat/lon CRSs happens at the GML boundary only.

pub mod geojson;
pub mod gml;
pub mod proj;
pub mod wkb;

#[cfg(test)]
mod geom_test;
#[cfg(test)]
mod gml_test;

/// Axis-aligned bounding box in `(minx, miny, maxx, maxy)` order.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Extent {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Extent {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Extent {
        Extent {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Grow this extent to cover `other`.
    pub fn expand(&mut self, other: &Extent) {
        self.minx = self.minx.min(other.minx);
        self.miny = self.miny.min(other.miny);
        self.maxx = self.maxx.max(other.maxx);
        self.maxy = self.maxy.max(other.maxy);
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct LineString {
    pub points: Vec<Point>,
}

/// First ring is the exterior, any further rings are holes.
#[derive(Clone, PartialEq, Debug)]
pub struct Polygon {
    pub rings: Vec<LineString>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct MultiPoint {
    pub points: Vec<Point>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct MultiLineString {
    pub lines: Vec<LineString>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct GeometryCollection {
    pub geometries: Vec<Geometry>,
}

/// Generic geometry data type covering the seven GML 3.2 classes.
#[derive(Clone, PartialEq, Debug)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
    MultiPoint(MultiPoint),
    MultiLineString(MultiLineString),
    MultiPolygon(MultiPolygon),
    GeometryCollection(GeometryCollection),
}

impl Geometry {
    /// Geometry class name as stored in the layer table.
    pub fn class_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
        }
    }

    /// Inclusive bounds; `None` for an empty geometry.
    pub fn bounds(&self) -> Option<Extent> {
        let mut extent: Option<Extent> = None;
        self.visit_coords(&mut |p: &Point| {
            let point_ext = Extent::new(p.x, p.y, p.x, p.y);
            match extent.as_mut() {
                Some(e) => e.expand(&point_ext),
                None => extent = Some(point_ext),
            }
        });
        extent
    }

    fn visit_coords(&self, f: &mut dyn FnMut(&Point)) {
        match self {
            Geometry::Point(p) => f(p),
            Geometry::LineString(line) => line.points.iter().for_each(|p| f(p)),
            Geometry::Polygon(poly) => poly
                .rings
                .iter()
                .flat_map(|r| r.points.iter())
                .for_each(|p| f(p)),
            Geometry::MultiPoint(mp) => mp.points.iter().for_each(|p| f(p)),
            Geometry::MultiLineString(ml) => ml
                .lines
                .iter()
                .flat_map(|l| l.points.iter())
                .for_each(|p| f(p)),
            Geometry::MultiPolygon(mp) => mp
                .polygons
                .iter()
                .flat_map(|poly| poly.rings.iter())
                .flat_map(|r| r.points.iter())
                .for_each(|p| f(p)),
            Geometry::GeometryCollection(gc) => {
                for geom in &gc.geometries {
                    geom.visit_coords(f);
                }
            }
        }
    }

    /// Apply a coordinate transform to every vertex.
    pub fn map_coords(&self, f: &dyn Fn(f64, f64) -> (f64, f64)) -> Geometry {
        let map_point = |p: &Point| {
            let (x, y) = f(p.x, p.y);
            Point::new(x, y)
        };
        let map_line = |line: &LineString| LineString {
            points: line.points.iter().map(map_point).collect(),
        };
        let map_poly = |poly: &Polygon| Polygon {
            rings: poly.rings.iter().map(map_line).collect(),
        };
        match self {
            Geometry::Point(p) => Geometry::Point(map_point(p)),
            Geometry::LineString(line) => Geometry::LineString(map_line(line)),
            Geometry::Polygon(poly) => Geometry::Polygon(map_poly(poly)),
            Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint {
                points: mp.points.iter().map(map_point).collect(),
            }),
            Geometry::MultiLineString(ml) => Geometry::MultiLineString(MultiLineString {
                lines: ml.lines.iter().map(map_line).collect(),
            }),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon {
                polygons: mp.polygons.iter().map(map_poly).collect(),
            }),
            Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection {
                geometries: gc.geometries.iter().map(|g| g.map_coords(f)).collect(),
            }),
        }
    }
}
