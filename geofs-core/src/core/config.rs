//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use serde::Deserialize;
use std::fs::File;
use std::io::prelude::*;
use toml::Value;

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationCfg {
    #[serde(default)]
    pub service: ServiceCfg,
    #[serde(default)]
    pub datasource: DatasourceCfg,
    #[serde(default)]
    pub webserver: WebserverCfg,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServiceCfg {
    #[serde(default = "default_service_title")]
    pub title: String,
    #[serde(rename = "abstract", default = "default_service_abstract")]
    pub abstract_: String,
    /// Base URL advertised in GetCapabilities operation endpoints
    #[serde(default = "default_service_url")]
    pub url: String,
    /// Hard upper bound for GetFeature page sizes
    #[serde(default = "default_max_features")]
    pub max_features_per_request: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatasourceCfg {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct WebserverCfg {
    pub bind: Option<String>,
    pub port: Option<u16>,
    #[serde(default = "default_admin_user")]
    pub admin_user: String,
    #[serde(default = "default_admin_pass")]
    pub admin_pass: String,
}

fn default_service_title() -> String {
    "GeoFeatureService".to_string()
}
fn default_service_abstract() -> String {
    "Lightweight WFS 2.0.0 feature server".to_string()
}
fn default_service_url() -> String {
    "http://localhost:6767/wfs".to_string()
}
fn default_max_features() -> u32 {
    10000
}
fn default_db_path() -> String {
    "data/geofeatures.db".to_string()
}
fn default_uploads_dir() -> String {
    "uploads".to_string()
}
fn default_admin_user() -> String {
    "admin".to_string()
}
fn default_admin_pass() -> String {
    "changeme".to_string()
}

impl Default for ServiceCfg {
    fn default() -> ServiceCfg {
        ServiceCfg {
            title: default_service_title(),
            abstract_: default_service_abstract(),
            url: default_service_url(),
            max_features_per_request: default_max_features(),
        }
    }
}

impl Default for DatasourceCfg {
    fn default() -> DatasourceCfg {
        DatasourceCfg {
            db_path: default_db_path(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

impl Default for WebserverCfg {
    fn default() -> WebserverCfg {
        WebserverCfg {
            bind: None,
            port: None,
            admin_user: default_admin_user(),
            admin_pass: default_admin_pass(),
        }
    }
}

pub const DEFAULT_CONFIG: &str = r#"
[service]
title = "GeoFeatureService"
abstract = "Lightweight WFS 2.0.0 feature server"
url = "http://localhost:6767/wfs"
max_features_per_request = 10000

[datasource]
db_path = "data/geofeatures.db"
uploads_dir = "uploads"

[webserver]
bind = "127.0.0.1"
port = 6767
"#;

/// Load and parse the config file into a config struct.
pub fn read_config<'a, T: Deserialize<'a>>(path: &str) -> Result<T, String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => {
            return Err("Could not find config file!".to_string());
        }
    };
    let mut config_toml = String::new();
    if let Err(err) = file.read_to_string(&mut config_toml) {
        return Err(format!("Error while reading config: [{}]", err));
    };

    parse_config(config_toml, path)
}

/// Parse the configuration into a config struct.
pub fn parse_config<'a, T: Deserialize<'a>>(config_toml: String, path: &str) -> Result<T, String> {
    config_toml
        .parse::<Value>()
        .and_then(|cfg| cfg.try_into::<T>())
        .map_err(|err| format!("{} - {}", path, err))
}
