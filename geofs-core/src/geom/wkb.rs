//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Well-Known Binary codec. SRID is never embedded; it is carried by the
//! owning layer.

use crate::core::error::GeoError;
use crate::geom::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_GEOMETRYCOLLECTION: u32 = 7;

pub fn encode(geom: &Geometry) -> Result<Vec<u8>, GeoError> {
    let mut out = Vec::new();
    write_geom(&mut out, geom)?;
    Ok(out)
}

pub fn decode(buf: &[u8]) -> Result<Geometry, GeoError> {
    let mut rdr = WkbReader {
        cur: Cursor::new(buf),
        little_endian: true,
    };
    rdr.read_geom()
}

fn write_geom(out: &mut Vec<u8>, geom: &Geometry) -> Result<(), GeoError> {
    // NDR byte order
    out.write_u8(1)?;
    match geom {
        Geometry::Point(p) => {
            out.write_u32::<LittleEndian>(WKB_POINT)?;
            write_point(out, p)?;
        }
        Geometry::LineString(line) => {
            out.write_u32::<LittleEndian>(WKB_LINESTRING)?;
            write_line(out, line)?;
        }
        Geometry::Polygon(poly) => {
            out.write_u32::<LittleEndian>(WKB_POLYGON)?;
            write_polygon(out, poly)?;
        }
        Geometry::MultiPoint(mp) => {
            out.write_u32::<LittleEndian>(WKB_MULTIPOINT)?;
            out.write_u32::<LittleEndian>(mp.points.len() as u32)?;
            for p in &mp.points {
                write_geom(out, &Geometry::Point(*p))?;
            }
        }
        Geometry::MultiLineString(ml) => {
            out.write_u32::<LittleEndian>(WKB_MULTILINESTRING)?;
            out.write_u32::<LittleEndian>(ml.lines.len() as u32)?;
            for line in &ml.lines {
                write_geom(out, &Geometry::LineString(line.clone()))?;
            }
        }
        Geometry::MultiPolygon(mp) => {
            out.write_u32::<LittleEndian>(WKB_MULTIPOLYGON)?;
            out.write_u32::<LittleEndian>(mp.polygons.len() as u32)?;
            for poly in &mp.polygons {
                write_geom(out, &Geometry::Polygon(poly.clone()))?;
            }
        }
        Geometry::GeometryCollection(gc) => {
            out.write_u32::<LittleEndian>(WKB_GEOMETRYCOLLECTION)?;
            out.write_u32::<LittleEndian>(gc.geometries.len() as u32)?;
            for member in &gc.geometries {
                write_geom(out, member)?;
            }
        }
    }
    Ok(())
}

fn write_point(out: &mut Vec<u8>, p: &Point) -> Result<(), GeoError> {
    out.write_f64::<LittleEndian>(p.x)?;
    out.write_f64::<LittleEndian>(p.y)?;
    Ok(())
}

fn write_line(out: &mut Vec<u8>, line: &LineString) -> Result<(), GeoError> {
    out.write_u32::<LittleEndian>(line.points.len() as u32)?;
    for p in &line.points {
        write_point(out, p)?;
    }
    Ok(())
}

fn write_polygon(out: &mut Vec<u8>, poly: &Polygon) -> Result<(), GeoError> {
    out.write_u32::<LittleEndian>(poly.rings.len() as u32)?;
    for ring in &poly.rings {
        write_line(out, ring)?;
    }
    Ok(())
}

struct WkbReader<'a> {
    cur: Cursor<&'a [u8]>,
    little_endian: bool,
}

impl<'a> WkbReader<'a> {
    fn read_u32(&mut self) -> Result<u32, GeoError> {
        let v = if self.little_endian {
            self.cur.read_u32::<LittleEndian>()
        } else {
            self.cur.read_u32::<BigEndian>()
        };
        v.map_err(|e| GeoError::InvalidWkb(e.to_string()))
    }

    fn read_f64(&mut self) -> Result<f64, GeoError> {
        let v = if self.little_endian {
            self.cur.read_f64::<LittleEndian>()
        } else {
            self.cur.read_f64::<BigEndian>()
        };
        v.map_err(|e| GeoError::InvalidWkb(e.to_string()))
    }

    fn read_geom(&mut self) -> Result<Geometry, GeoError> {
        let order = self
            .cur
            .read_u8()
            .map_err(|e| GeoError::InvalidWkb(e.to_string()))?;
        self.little_endian = match order {
            0 => false,
            1 => true,
            other => {
                return Err(GeoError::InvalidWkb(format!(
                    "invalid byte order marker {}",
                    other
                )))
            }
        };
        let type_code = self.read_u32()?;
        if type_code > 1000 {
            // Z/M/ZM variants (ISO offsets or EWKB flag bits)
            return Err(GeoError::InvalidWkb(format!(
                "only 2D geometries are supported (type code {})",
                type_code
            )));
        }
        match type_code {
            WKB_POINT => Ok(Geometry::Point(self.read_point()?)),
            WKB_LINESTRING => Ok(Geometry::LineString(self.read_line()?)),
            WKB_POLYGON => Ok(Geometry::Polygon(self.read_polygon()?)),
            WKB_MULTIPOINT => {
                let points = self.read_members(|g| match g {
                    Geometry::Point(p) => Ok(p),
                    other => Err(member_mismatch("Point", &other)),
                })?;
                Ok(Geometry::MultiPoint(MultiPoint { points }))
            }
            WKB_MULTILINESTRING => {
                let lines = self.read_members(|g| match g {
                    Geometry::LineString(line) => Ok(line),
                    other => Err(member_mismatch("LineString", &other)),
                })?;
                Ok(Geometry::MultiLineString(MultiLineString { lines }))
            }
            WKB_MULTIPOLYGON => {
                let polygons = self.read_members(|g| match g {
                    Geometry::Polygon(poly) => Ok(poly),
                    other => Err(member_mismatch("Polygon", &other)),
                })?;
                Ok(Geometry::MultiPolygon(MultiPolygon { polygons }))
            }
            WKB_GEOMETRYCOLLECTION => {
                let geometries = self.read_members(Ok)?;
                Ok(Geometry::GeometryCollection(GeometryCollection {
                    geometries,
                }))
            }
            other => Err(GeoError::InvalidWkb(format!(
                "unsupported geometry type code {}",
                other
            ))),
        }
    }

    fn read_members<T>(
        &mut self,
        extract: impl Fn(Geometry) -> Result<T, GeoError>,
    ) -> Result<Vec<T>, GeoError> {
        let count = self.read_u32()?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            // Each member repeats byte order and type header
            members.push(extract(self.read_geom()?)?);
        }
        Ok(members)
    }

    fn read_point(&mut self) -> Result<Point, GeoError> {
        let x = self.read_f64()?;
        let y = self.read_f64()?;
        Ok(Point::new(x, y))
    }

    fn read_line(&mut self) -> Result<LineString, GeoError> {
        let count = self.read_u32()?;
        let mut points = Vec::with_capacity(count as usize);
        for _ in 0..count {
            points.push(self.read_point()?);
        }
        Ok(LineString { points })
    }

    fn read_polygon(&mut self) -> Result<Polygon, GeoError> {
        let count = self.read_u32()?;
        let mut rings = Vec::with_capacity(count as usize);
        for _ in 0..count {
            rings.push(self.read_line()?);
        }
        Ok(Polygon { rings })
    }
}

fn member_mismatch(expected: &str, got: &Geometry) -> GeoError {
    GeoError::InvalidWkb(format!(
        "expected {} member, found {}",
        expected,
        got.class_name()
    ))
}
