//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::geom::Extent;
use std::collections::BTreeMap;

/// A published feature type (WFS TypeName).
#[derive(Clone, Debug)]
pub struct Layer {
    pub id: i64,
    /// Machine-safe WFS TypeName (`[A-Za-z0-9_-]+`)
    pub name: String,
    pub title: String,
    pub description: String,
    /// Geometry class discovered on first ingest ("" until then)
    pub geometry_type: String,
    /// Storage SRID (EPSG code)
    pub srid: i32,
    pub bbox: Option<Extent>,
    pub feature_count: i64,
    /// Field name -> type label (String/Integer/Real/Date)
    pub attribute_schema: BTreeMap<String, String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Layer {
    pub fn has_bbox(&self) -> bool {
        self.bbox.is_some()
    }
}

/// Rendering rule owned by a layer. Consumed by the admin UI; the core
/// only guarantees cascade-on-delete.
#[derive(Clone, Debug)]
pub struct SymbologyRule {
    pub id: i64,
    pub layer_id: i64,
    pub rule_order: i64,
    pub label: String,
    pub filter_field: Option<String>,
    pub filter_operator: String,
    pub filter_value: Option<String>,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_width: f64,
    pub point_radius: f64,
    pub is_default: bool,
}
