//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Case-insensitive WFS KVP parameter normalisation and request dispatch.

use geofs_core::core::error::ServiceError;
use geofs_core::geom::Extent;

#[derive(Clone, Debug, Default)]
pub struct WfsParams {
    pub service: Option<String>,
    pub version: Option<String>,
    pub request: String,
    pub typenames: Option<String>,
    pub bbox: Option<String>,
    pub count: Option<u32>,
    pub startindex: u32,
    pub output_format: String,
}

impl WfsParams {
    /// Collect parameters from query pairs, accepting any case for the
    /// recognised keys (`TYPENAMES`, `TypeName`, `outputFormat`, ...).
    /// `TYPENAME` is the WFS 1.x spelling and is accepted transparently.
    pub fn from_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> WfsParams {
        let mut params = WfsParams::default();
        for (key, value) in pairs {
            match key.to_lowercase().as_str() {
                "service" => params.service = Some(value.to_string()),
                "version" => params.version = Some(value.to_string()),
                "request" => params.request = value.trim().to_string(),
                "typenames" | "typename" => {
                    if params.typenames.is_none() {
                        params.typenames = Some(value.to_string());
                    }
                }
                "bbox" => params.bbox = Some(value.to_string()),
                "count" => params.count = value.parse().ok(),
                "startindex" => params.startindex = value.parse().unwrap_or(0),
                "outputformat" => params.output_format = value.to_string(),
                _ => {}
            }
        }
        params
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum WfsRequest {
    GetCapabilities,
    DescribeFeatureType,
    GetFeature { json: bool },
    Transaction,
    Unknown(String),
}

/// The request verb is matched case-insensitively; an empty verb means
/// GetCapabilities.
pub fn dispatch(params: &WfsParams) -> WfsRequest {
    match params.request.to_uppercase().as_str() {
        "" | "GETCAPABILITIES" => WfsRequest::GetCapabilities,
        "DESCRIBEFEATURETYPE" => WfsRequest::DescribeFeatureType,
        "GETFEATURE" => {
            let fmt = params.output_format.to_lowercase();
            WfsRequest::GetFeature {
                json: fmt.contains("json"),
            }
        }
        "TRANSACTION" => WfsRequest::Transaction,
        _ => WfsRequest::Unknown(params.request.clone()),
    }
}

/// Parse `minx,miny,maxx,maxy[,CRS]`.
///
/// WFS 2.0.0: when the CRS suffix names EPSG:4326 (lat/lon axis order) the
/// values arrive as minLat,minLon,maxLat,maxLon and are swapped to the
/// internal x/y order.
pub fn parse_bbox(bbox_str: &str) -> Result<Extent, ServiceError> {
    let parts: Vec<&str> = bbox_str.split(',').collect();
    if parts.len() < 4 {
        return Err(ServiceError::Format(format!("Invalid BBOX: '{}'", bbox_str)));
    }
    let values = parts[..4]
        .iter()
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| {
            ServiceError::Format(format!("BBOX values must be numeric: '{}'", bbox_str))
        })?;
    let (v0, v1, v2, v3) = (values[0], values[1], values[2], values[3]);

    if parts.len() >= 5 {
        let crs = parts[4].trim();
        if crs.contains("4326") && (crs.contains("EPSG") || !crs.contains("CRS84")) {
            // Values came in lat,lon order
            return Ok(Extent::new(v1, v0, v3, v2));
        }
    }
    Ok(Extent::new(v0, v1, v2, v3))
}
