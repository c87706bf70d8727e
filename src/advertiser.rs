//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Advertiser: builds and sends one advertisement per neighbor, applying
//! split-horizon-with-poisoned-reverse per destination.

use crate::packet::{Entry, Message};
use crate::table::{Port, RouterId, RoutingTable, UpdateFlag};

/// Builds the per-neighbor advertisement for `nbr_port`: every route in `T`,
/// with any entry whose current next hop is `nbr_port` re-advertised at
/// infinity rather than omitted (poisoned reverse).
pub fn build_advertisement(
    self_id: RouterId,
    table: &RoutingTable,
    nbr_port: Port,
) -> Message {
    let entries = table
        .iter()
        .map(|(dest_id, route)| {
            let (weight, update_flag) = if route.next_hop == nbr_port {
                (crate::table::Metric::infinite(), UpdateFlag::Poisoned)
            } else {
                (route.weight, route.update_flag)
            };
            (
                dest_id,
                Entry {
                    port: route.port,
                    weight,
                    next_hop: route.next_hop,
                    update_flag,
                },
            )
        })
        .collect();
    Message::new(self_id, entries)
}

/// Builds the advertisement for every configured neighbor port.
pub fn build_all(
    self_id: RouterId,
    table: &RoutingTable,
    neighbor_ports: &[Port],
) -> Vec<(Port, Message)> {
    neighbor_ports
        .iter()
        .map(|&port| (port, build_advertisement(self_id, table, port)))
        .collect()
}
