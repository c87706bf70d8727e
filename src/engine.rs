//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The event loop: owns the live table and orchestrates the update
//! processor, timer engine and advertiser on each iteration. Split into a
//! pure-ish [`Instance`] (clock-driven, socket-free — exercised directly by
//! tests) and a thin `run` loop that wires it to a real [`Transport`].

use std::time::Duration;

use tracing::info;

use crate::advertiser;
use crate::clock::Clock;
use crate::config::Topology;
use crate::debug::Debug;
use crate::packet::Message;
use crate::table::{OriginalTable, Port, RouterId, RoutingTable};
use crate::timer;
use crate::transport::Transport;
use crate::update;

/// One iteration's poll timeout.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// All engine state owned by the event loop: the live and original tables,
/// the neighbor/input port lists, and the periodic-update bookkeeping.
/// Generic over [`Clock`] and borrowed rather than owned so that tests keep
/// their own handle to a [`crate::clock::VirtualClock`] and can advance it
/// between ticks without any socket or real sleep.
pub struct Instance<'c, C> {
    clock: &'c C,
    self_id: RouterId,
    period: f64,
    neighbor_ports: Vec<Port>,
    table: RoutingTable,
    original: OriginalTable,
    /// `None` until the first advertisement round completes, mirroring
    /// a "never updated" sentinel without the ambiguity of a real clock that
    /// could itself read `0.0` on its very first tick.
    last_update: Option<f64>,
}

impl<'c, C: Clock> Instance<'c, C> {
    pub fn new(clock: &'c C, topology: &Topology) -> Self {
        let table = topology.original.to_initial_table();
        Debug::InstanceStart(topology.self_id, &topology.input_ports).log();
        Instance {
            clock,
            self_id: topology.self_id,
            period: topology.period,
            neighbor_ports: topology.neighbor_ports.clone(),
            table,
            original: topology.original.clone(),
            last_update: None,
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn original(&self) -> &OriginalTable {
        &self.original
    }

    /// Applies one inbound, already-decoded-and-verified message.
    pub fn handle_message(&mut self, msg: &Message) {
        let now = self.clock.now();
        update::process_message(&mut self.table, &self.original, self.self_id.get(), now, msg);
    }

    /// Runs the timeout scan. Returns whether a triggered
    /// advertisement is now due.
    pub fn timeout_scan(&mut self) -> bool {
        let now = self.clock.now();
        timer::timeout_scan(&mut self.table, self.period, now)
    }

    /// Runs the garbage scan.
    pub fn garbage_scan(&mut self) {
        let now = self.clock.now();
        timer::garbage_scan(&mut self.table, &self.original, self.period, now);
    }

    /// Whether the periodic schedule (or the very first tick) requires an
    /// advertisement right now, independent of any timeout-triggered update.
    pub fn periodic_update_due(&self) -> bool {
        let now = self.clock.now();
        match self.last_update {
            None => true,
            Some(last_update) => last_update + self.period < now,
        }
    }

    /// Builds one advertisement per configured neighbor.
    pub fn build_advertisements(&self) -> Vec<(Port, Message)> {
        advertiser::build_all(self.self_id, &self.table, &self.neighbor_ports)
    }

    /// Records that an advertisement round has just completed.
    pub fn mark_updated(&mut self) {
        self.last_update = Some(self.clock.now());
    }

    /// One full tick, given the messages that arrived on
    /// this iteration's `poll`. Returns the advertisements to send, if any
    /// round was due, along with whether it should be logged to the
    /// operator log.
    pub fn tick(&mut self, inbound: &[Message]) -> Option<Vec<(Port, Message)>> {
        for msg in inbound {
            self.handle_message(msg);
        }

        let triggered = self.timeout_scan();
        if triggered {
            Debug::TriggeredUpdate.log();
        }

        if triggered || self.periodic_update_due() {
            if !triggered {
                Debug::PeriodicUpdate.log();
            }
            self.garbage_scan();
            let advertisements = self.build_advertisements();
            self.mark_updated();
            Some(advertisements)
        } else {
            None
        }
    }
}

/// Runs the event loop forever against a real [`Transport`]. Never returns;
/// callers race this future against a signal handler (e.g. `tokio::select!`
/// with `tokio::signal::ctrl_c()`) to shut down.
pub async fn run<C: Clock>(mut instance: Instance<'_, C>, transport: &Transport) {
    loop {
        let readable = transport.poll(POLL_TIMEOUT).await;
        let inbound: Vec<Message> = readable.into_iter().map(|r| r.message).collect();

        if let Some(advertisements) = instance.tick(&inbound) {
            for (port, msg) in &advertisements {
                for chunk in msg.encode_chunks() {
                    transport.send(&chunk, *port).await;
                }
                Debug::DatagramTx(*port, msg.sender_id).log();
            }
            info!(table = ?instance.table(), "advertisement sent");
        }
    }
}
