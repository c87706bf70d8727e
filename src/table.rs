//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The routing table: the keyed container of [`RouteRecord`]s that the
//! update processor (`update.rs`) and timer engine (`timer.rs`) mutate, plus
//! the small validated newtypes (`RouterId`, `Port`, `Metric`) shared by the
//! whole engine.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RangeError;

/// A router's identity within the topology; not an IP address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RouterId(u16);

impl RouterId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 64000;

    pub fn new(id: u16) -> Result<Self, RangeError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(RouterId(id))
        } else {
            Err(RangeError::new("router-id", Self::MIN, Self::MAX, id as u32))
        }
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UDP port on the loopback host.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Port(u16);

impl Port {
    pub const MIN: u16 = 1024;
    pub const MAX: u16 = 64000;

    pub fn new(port: u16) -> Result<Self, RangeError> {
        if (Self::MIN..=Self::MAX).contains(&port) {
            Ok(Port(port))
        } else {
            Err(RangeError::new("port", Self::MIN, Self::MAX, port as u32))
        }
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An additive route cost. `INFINITE` (16) denotes unreachability.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Metric(u8);

impl Metric {
    pub const MIN: u8 = 1;
    pub const INFINITE: u8 = 16;

    pub fn new(metric: u8) -> Result<Self, RangeError> {
        if (Self::MIN..=Self::INFINITE).contains(&metric) {
            Ok(Metric(metric))
        } else {
            Err(RangeError::new(
                "metric",
                Self::MIN as u32,
                Self::INFINITE as u32,
                metric as u32,
            ))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn is_infinite(&self) -> bool {
        self.0 == Self::INFINITE
    }

    /// Adds the two metrics, saturating at infinity rather than overflowing.
    pub fn add(self, other: Metric) -> Metric {
        Metric(std::cmp::min(
            self.0.saturating_add(other.0),
            Self::INFINITE,
        ))
    }

    pub fn infinite() -> Metric {
        Metric(Self::INFINITE)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a route is live or in its garbage-collection window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateFlag {
    Active,
    Poisoned,
}

impl UpdateFlag {
    pub fn bit(self) -> u8 {
        match self {
            UpdateFlag::Active => 0,
            UpdateFlag::Poisoned => 1,
        }
    }

    pub fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(UpdateFlag::Active),
            1 => Some(UpdateFlag::Poisoned),
            _ => None,
        }
    }
}

/// A single destination in the routing table.
#[derive(Clone, Copy, Debug)]
pub struct RouteRecord {
    /// Port on the neighbor used to reach the destination: for
    /// directly-connected routes, the neighbor's own input port; for
    /// learned routes, the port at which the next-hop neighbor is reached.
    pub port: Port,
    /// Current metric to the destination.
    pub weight: Metric,
    /// Port of the neighbor through which this destination is currently
    /// reached.
    pub next_hop: Port,
    pub update_flag: UpdateFlag,
    /// Clock timestamp this route's freshness was last confirmed.
    pub last_refreshed: f64,
}

impl RouteRecord {
    pub fn new(
        port: Port,
        weight: Metric,
        next_hop: Port,
        update_flag: UpdateFlag,
        last_refreshed: f64,
    ) -> Self {
        RouteRecord {
            port,
            weight,
            next_hop,
            update_flag,
            last_refreshed,
        }
    }
}

/// The live, mutable routing table. Mutated only by the update processor and
/// timer engine; never contains the owning daemon's own router-id as a key.
#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    routes: BTreeMap<RouterId, RouteRecord>,
}

impl RoutingTable {
    pub fn new() -> Self {
        RoutingTable::default()
    }

    pub fn get(&self, id: RouterId) -> Option<&RouteRecord> {
        self.routes.get(&id)
    }

    pub fn get_mut(&mut self, id: RouterId) -> Option<&mut RouteRecord> {
        self.routes.get_mut(&id)
    }

    pub fn contains(&self, id: RouterId) -> bool {
        self.routes.contains_key(&id)
    }

    pub fn insert(&mut self, id: RouterId, route: RouteRecord) {
        self.routes.insert(id, route);
    }

    pub fn remove(&mut self, id: RouterId) -> Option<RouteRecord> {
        self.routes.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouterId, &RouteRecord)> {
        self.routes.iter().map(|(id, route)| (*id, route))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// An immutable snapshot of the directly-connected routes derived from
/// configuration, taken once at startup and never mutated again. The
/// authoritative source of each neighbor's port and the configured link
/// metric to it.
#[derive(Clone, Debug, Default)]
pub struct OriginalTable {
    routes: BTreeMap<RouterId, RouteRecord>,
}

impl OriginalTable {
    pub fn new() -> Self {
        OriginalTable::default()
    }

    pub fn from_direct_links(
        links: impl IntoIterator<Item = (RouterId, RouteRecord)>,
    ) -> Self {
        OriginalTable {
            routes: links.into_iter().collect(),
        }
    }

    pub fn get(&self, id: RouterId) -> Option<&RouteRecord> {
        self.routes.get(&id)
    }

    pub fn contains(&self, id: RouterId) -> bool {
        self.routes.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouterId, &RouteRecord)> {
        self.routes.iter().map(|(id, route)| (*id, route))
    }

    /// Builds the live table's starting state: every direct link, active,
    /// stamped at timestamp zero so the very first tick's timeout scan
    /// leaves them alone until real time has passed.
    pub fn to_initial_table(&self) -> RoutingTable {
        let mut table = RoutingTable::new();
        for (id, route) in &self.routes {
            table.insert(*id, *route);
        }
        table
    }
}
