//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Error types shared by the codec, repository and protocol services.

use thiserror::Error;

/// Geometry codec errors.
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("unsupported geometry type `{0}`")]
    UnsupportedGeometryType(String),
    #[error("malformed GML: {0}")]
    MalformedGml(String),
    #[error("unknown CRS EPSG:{0}")]
    UnknownCrs(i32),
    #[error("invalid WKB: {0}")]
    InvalidWkb(String),
    #[error("invalid GeoJSON geometry: {0}")]
    InvalidGeoJson(String),
    #[error("I/O error `{0}`")]
    Io(#[from] std::io::Error),
}

/// Repository and request-level errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("layer `{0}` already exists")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Format(String),
    #[error(transparent)]
    Geometry(#[from] GeoError),
    #[error("database error `{0}`")]
    Db(#[from] rusqlite::Error),
    #[error("connection pool error `{0}`")]
    Pool(#[from] r2d2::Error),
    #[error("JSON error `{0}`")]
    Json(#[from] serde_json::Error),
    #[error("I/O error `{0}`")]
    Io(#[from] std::io::Error),
}
