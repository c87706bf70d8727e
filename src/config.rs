//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Configuration loader: parses the TOML topology file and validates every
//! constraint from the external-interfaces section before any socket is
//! bound.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::table::{Metric, OriginalTable, Port, RouteRecord, RouterId, UpdateFlag};

/// Default periodic interval, in seconds, when `timer_value` is absent.
const DEFAULT_TIMER_VALUE: u16 = 30;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub router_id: u16,
    pub input_ports: Vec<u16>,
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub timer_value: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Output {
    pub port: u16,
    pub metric: u8,
    pub router_id: u16,
}

/// The validated, ready-to-run form of a loaded configuration.
pub struct Topology {
    pub self_id: RouterId,
    pub input_ports: Vec<Port>,
    pub neighbor_ports: Vec<Port>,
    pub original: OriginalTable,
    pub period: f64,
}

impl Config {
    /// Reads and parses `path`. Distinct from [`Config::validate`] so that
    /// I/O failures and parse failures are reported with separate
    /// `ConfigError` variants.
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&raw).map_err(ConfigError::Parse)
    }

    /// Validates every constraint and builds the runtime [`Topology`]. Takes
    /// `self` by value: a config that fails validation is never reused.
    pub fn validate(self) -> Result<Topology, ConfigError> {
        let self_id = RouterId::new(self.router_id).map_err(ConfigError::Range)?;

        if self.input_ports.is_empty() {
            return Err(ConfigError::NoInputPorts);
        }
        if self.outputs.is_empty() {
            return Err(ConfigError::NoOutputs);
        }

        let mut input_ports = Vec::with_capacity(self.input_ports.len());
        let mut seen_input_ports = HashSet::new();
        for raw_port in &self.input_ports {
            let port = Port::new(*raw_port).map_err(ConfigError::Range)?;
            if !seen_input_ports.insert(port) {
                return Err(ConfigError::DuplicateInputPort(*raw_port));
            }
            input_ports.push(port);
        }

        let mut neighbor_ports = Vec::with_capacity(self.outputs.len());
        let mut seen_neighbor_ports = HashSet::new();
        let mut seen_neighbor_ids = HashSet::new();
        let mut links = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            let port = Port::new(output.port).map_err(ConfigError::Range)?;
            let metric = Metric::new(output.metric).map_err(ConfigError::Range)?;
            if metric.is_infinite() {
                return Err(ConfigError::Range(crate::error::RangeError::new(
                    "metric",
                    Metric::MIN as u32,
                    15,
                    output.metric as u32,
                )));
            }
            let neighbor_id =
                RouterId::new(output.router_id).map_err(ConfigError::Range)?;

            if neighbor_id == self_id {
                return Err(ConfigError::SelfNeighbor(output.router_id));
            }
            if !seen_neighbor_ports.insert(port) {
                return Err(ConfigError::DuplicateNeighborId(output.router_id));
            }
            if seen_input_ports.contains(&port) {
                return Err(ConfigError::InputPortReused(output.port));
            }
            if !seen_neighbor_ids.insert(neighbor_id) {
                return Err(ConfigError::DuplicateNeighborId(output.router_id));
            }

            neighbor_ports.push(port);
            links.push((
                neighbor_id,
                RouteRecord::new(port, metric, port, UpdateFlag::Active, 0.0),
            ));
        }

        let period = self.timer_value.unwrap_or(DEFAULT_TIMER_VALUE) as f64;

        Ok(Topology {
            self_id,
            input_ports,
            neighbor_ports,
            original: OriginalTable::from_direct_links(links),
            period,
        })
    }
}
