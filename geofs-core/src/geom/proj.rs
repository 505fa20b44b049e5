//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Coordinate reprojection between the storage CRS (EPSG:4326) and
//! spherical mercator (EPSG:3857). The codec treats the transform as an
//! opaque per-coordinate function; pairs outside the supported set raise
//! `UnknownCrs`.

use crate::core::error::GeoError;
use crate::geom::Geometry;
use std::f64::consts;

const EARTH_RADIUS: f64 = 6378137.0;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Transform {
    Wgs84ToMercator,
    MercatorToWgs84,
}

impl Transform {
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Transform::Wgs84ToMercator => lonlat_to_merc(x, y),
            Transform::MercatorToWgs84 => merc_to_lonlat(x, y),
        }
    }
}

/// Transform from `from_srid` to `to_srid`; `None` when both are equal.
pub fn transformer(from_srid: i32, to_srid: i32) -> Result<Option<Transform>, GeoError> {
    match (from_srid, to_srid) {
        (f, t) if f == t => Ok(None),
        (4326, 3857) => Ok(Some(Transform::Wgs84ToMercator)),
        (3857, 4326) => Ok(Some(Transform::MercatorToWgs84)),
        (f, _) if f != 4326 && f != 3857 => Err(GeoError::UnknownCrs(f)),
        (_, t) => Err(GeoError::UnknownCrs(t)),
    }
}

pub fn reproject(geom: &Geometry, transform: &Transform) -> Geometry {
    geom.map_coords(&|x, y| transform.apply(x, y))
}

pub fn lonlat_to_merc(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * ((consts::PI * 0.25) + (0.5 * lat.to_radians())).tan().ln();
    (x, y)
}

pub fn merc_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - consts::PI * 0.5).to_degrees();
    (lon, lat)
}
