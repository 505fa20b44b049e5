//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

pub mod config;
pub mod error;
pub mod feature;
pub mod layer;
pub mod schema;

pub use self::config::{parse_config, read_config, ApplicationCfg};
pub use self::error::{GeoError, ServiceError};
pub use self::feature::{PropMap, PropValue, StoredFeature};
pub use self::layer::{Layer, SymbologyRule};

#[cfg(test)]
mod schema_test;
