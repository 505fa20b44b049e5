//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

#[macro_use]
extern crate log;

pub mod ingest;
pub mod kvp;
pub mod symbology;
pub mod transaction;
pub mod wfs;

#[cfg(test)]
mod kvp_test;
#[cfg(test)]
mod transaction_test;
#[cfg(test)]
mod wfs_test;
