//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Structured, `tracing`-backed debug events for instance lifecycle, packet
//! I/O, and route transitions: one variant per loggable event, a `log()`
//! method dispatching to the right `tracing` call, and a separate `Display`
//! impl for the human-readable message.

use tracing::{debug, debug_span};

use crate::table::{Port, RouterId};

#[derive(Debug)]
pub enum Debug<'a> {
    InstanceStart(RouterId, &'a [Port]),
    PeriodicUpdate,
    TriggeredUpdate,
    DatagramRx(Port, RouterId),
    DatagramTx(Port, RouterId),
    RouteCreate(RouterId, u8, Port),
    RouteReplace(RouterId, u8, Port),
    RouteRefresh(RouterId),
    RouteReactivate(RouterId),
    RoutePoisoned(RouterId),
    RouteGarbageCollected(RouterId),
}

impl<'a> Debug<'a> {
    /// Logs this event using the tracing API.
    pub fn log(&self) {
        match self {
            Debug::InstanceStart(self_id, input_ports) => {
                debug!(
                    router_id = %self_id.get(),
                    input_ports = ?input_ports.iter().map(Port::get).collect::<Vec<_>>(),
                    "{}",
                    self
                );
            }
            Debug::PeriodicUpdate | Debug::TriggeredUpdate => {
                debug!("{}", self);
            }
            Debug::DatagramRx(port, sender) | Debug::DatagramTx(port, sender) => {
                debug_span!("network", port = %port.get()).in_scope(|| {
                    debug!(sender = %sender.get(), "{}", self);
                });
            }
            Debug::RouteCreate(dest, weight, next_hop)
            | Debug::RouteReplace(dest, weight, next_hop) => {
                debug!(
                    destination = %dest.get(),
                    weight,
                    next_hop = %next_hop.get(),
                    "{}",
                    self
                );
            }
            Debug::RouteRefresh(dest)
            | Debug::RouteReactivate(dest)
            | Debug::RoutePoisoned(dest)
            | Debug::RouteGarbageCollected(dest) => {
                debug!(destination = %dest.get(), "{}", self);
            }
        }
    }
}

impl<'a> std::fmt::Display for Debug<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::InstanceStart(..) => write!(f, "instance started"),
            Debug::PeriodicUpdate => write!(f, "periodic update"),
            Debug::TriggeredUpdate => write!(f, "triggered update"),
            Debug::DatagramRx(..) => write!(f, "datagram received"),
            Debug::DatagramTx(..) => write!(f, "datagram sent"),
            Debug::RouteCreate(..) => write!(f, "route created"),
            Debug::RouteReplace(..) => write!(f, "route replaced"),
            Debug::RouteRefresh(..) => write!(f, "route refreshed"),
            Debug::RouteReactivate(..) => write!(f, "route reactivated"),
            Debug::RoutePoisoned(..) => write!(f, "route poisoned"),
            Debug::RouteGarbageCollected(..) => write!(f, "route garbage-collected"),
        }
    }
}
