//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use clap::{App, Arg};
use geofs_core::core::config::{parse_config, read_config, ApplicationCfg, DEFAULT_CONFIG};
use log::info;
use std::process;
use std::str::FromStr;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = App::new("geofs")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lightweight OGC WFS 2.0.0 feature server")
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .help("Load configuration from file"),
        )
        .arg(
            Arg::with_name("bind")
                .long("bind")
                .takes_value(true)
                .help("Bind web server to this address (default: 127.0.0.1)"),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .takes_value(true)
                .help("Bind web server to this port (default: 6767)"),
        )
        .get_matches();

    let mut config: ApplicationCfg = if let Some(cfgpath) = args.value_of("config") {
        info!("Reading configuration from '{}'", cfgpath);
        read_config(cfgpath).unwrap_or_else(|err| {
            println!("Error reading configuration - {}", err);
            process::exit(1)
        })
    } else {
        parse_config(DEFAULT_CONFIG.to_string(), "").unwrap()
    };
    if let Some(bind) = args.value_of("bind") {
        config.webserver.bind = Some(bind.to_string());
    }
    if let Some(port) = args.value_of("port") {
        config.webserver.port = Some(u16::from_str(port).expect("Invalid port number"));
    }

    if let Err(err) = geofs_webserver::server::webserver(config) {
        println!("Server error - {}", err);
        process::exit(1)
    }
}
