//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use clap::{App, Arg};
use ripd::clock::SystemClock;
use ripd::config::Config;
use ripd::engine::{self, Instance};
use ripd::error::fatal;
use ripd::transport::Transport;
use tracing::info;
use tracing_subscriber::prelude::*;

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "ripd=debug" } else { "ripd=info" };
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_directive.parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let matches = App::new("RIP routing engine")
        .version(clap::crate_version!())
        .arg(
            Arg::with_name("config")
                .help("Path to the TOML topology file")
                .value_name("FILE")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Raise the log level to debug"),
        )
        .get_matches();

    init_tracing(matches.is_present("verbose"));

    let config_path = matches.value_of("config").unwrap();
    let config = Config::load(config_path).unwrap_or_else(|error| fatal(error, 1));
    let topology = config.validate().unwrap_or_else(|error| fatal(error, 1));

    info!(
        router_id = topology.self_id.get(),
        period = topology.period,
        "starting up"
    );

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(run(topology));
}

async fn run(topology: ripd::config::Topology) {
    let transport = Transport::bind(&topology.input_ports)
        .await
        .unwrap_or_else(|error| fatal(error, 2));

    let clock = SystemClock::new();
    let instance = Instance::new(&clock, &topology);

    tokio::select! {
        () = engine::run(instance, &transport) => {},
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt signal, shutting down");
        }
    }
}
