//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Timer engine: the timeout scan and the garbage scan, run once per event
//! loop tick and driven entirely off [`crate::clock::Clock`] rather than
//! per-route spawned tasks, so that the whole engine is exercisable with a
//! deterministic virtual clock.

use crate::debug::Debug;
use crate::table::{OriginalTable, Port, RoutingTable, UpdateFlag};

/// Timeout interval multiplier: a route with no refresh for
/// `6 * period` seconds is poisoned.
pub const TIMEOUT_MULTIPLIER: f64 = 6.0;
/// Garbage interval multiplier: a poisoned route with no refresh for
/// a further `4 * period` seconds is deleted.
pub const GARBAGE_MULTIPLIER: f64 = 4.0;

/// Scans every active route for staleness, poisoning any that have not been
/// refreshed within `6 * period`. Returns `true` if at least one route was
/// poisoned by this call, signaling that a triggered advertisement is due.
pub fn timeout_scan(table: &mut RoutingTable, period: f64, now: f64) -> bool {
    let mut triggered = false;
    let stale: Vec<_> = table
        .iter()
        .filter(|(_, route)| {
            route.update_flag == UpdateFlag::Active
                && now > route.last_refreshed + TIMEOUT_MULTIPLIER * period
        })
        .map(|(id, _)| id)
        .collect();

    for id in stale {
        let route = table.get_mut(id).expect("id came from this table's iter");
        route.weight = crate::table::Metric::infinite();
        route.update_flag = UpdateFlag::Poisoned;
        route.last_refreshed = now;
        Debug::RoutePoisoned(id).log();
        triggered = true;
    }
    triggered
}

/// Deletes any route that has sat poisoned for longer than `4 * period`,
/// plus any route whose next hop is the port of a direct neighbor that was
/// itself just garbage-collected (the underlying link is gone, so routes
/// learned through it cannot be valid either).
///
/// Only expired entries that are themselves direct neighbors (present in
/// `original`) can withdraw a link; a learned route expiring must never be
/// mistaken for the loss of a direct link just because its carried-through
/// `port` field happens to coincide with some other route's next hop.
pub fn garbage_scan(table: &mut RoutingTable, original: &OriginalTable, period: f64, now: f64) {
    let expired: Vec<_> = table
        .iter()
        .filter(|(_, route)| {
            route.update_flag == UpdateFlag::Poisoned
                && now > route.last_refreshed + GARBAGE_MULTIPLIER * period
        })
        .map(|(id, _)| id)
        .collect();

    let withdrawn_ports: Vec<Port> = expired
        .iter()
        .filter(|id| original.contains(**id))
        .filter_map(|id| original.get(*id).map(|route| route.port))
        .collect();

    for id in &expired {
        table.remove(*id);
        Debug::RouteGarbageCollected(*id).log();
    }

    let orphaned: Vec<_> = table
        .iter()
        .filter(|(_, route)| withdrawn_ports.contains(&route.next_hop))
        .map(|(id, _)| id)
        .collect();
    for id in orphaned {
        table.remove(id);
        Debug::RouteGarbageCollected(id).log();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Metric, RouterId, RouteRecord};

    fn id(n: u16) -> RouterId {
        RouterId::new(n).unwrap()
    }

    fn port(n: u16) -> Port {
        Port::new(n).unwrap()
    }

    #[test]
    fn timeout_poisons_stale_active_route() {
        let mut table = RoutingTable::new();
        table.insert(
            id(2),
            RouteRecord::new(port(2000), Metric::new(3).unwrap(), port(2000), UpdateFlag::Active, 0.0),
        );
        let triggered = timeout_scan(&mut table, 10.0, 61.0);
        assert!(triggered);
        let route = table.get(id(2)).unwrap();
        assert_eq!(route.update_flag, UpdateFlag::Poisoned);
        assert!(route.weight.is_infinite());
        assert_eq!(route.last_refreshed, 61.0);
    }

    #[test]
    fn timeout_leaves_fresh_route_alone() {
        let mut table = RoutingTable::new();
        table.insert(
            id(2),
            RouteRecord::new(port(2000), Metric::new(3).unwrap(), port(2000), UpdateFlag::Active, 50.0),
        );
        let triggered = timeout_scan(&mut table, 10.0, 55.0);
        assert!(!triggered);
        assert_eq!(table.get(id(2)).unwrap().update_flag, UpdateFlag::Active);
    }

    #[test]
    fn garbage_deletes_long_poisoned_route() {
        let mut table = RoutingTable::new();
        table.insert(
            id(2),
            RouteRecord::new(port(2000), Metric::infinite(), port(2000), UpdateFlag::Poisoned, 0.0),
        );
        let original = OriginalTable::from_direct_links([(
            id(2),
            RouteRecord::new(port(2000), Metric::new(3).unwrap(), port(2000), UpdateFlag::Active, 0.0),
        )]);
        garbage_scan(&mut table, &original, 10.0, 41.0);
        assert!(table.get(id(2)).is_none());
    }

    #[test]
    fn garbage_cascades_to_routes_through_withdrawn_neighbor() {
        let mut table = RoutingTable::new();
        // id(2) is the direct neighbor being garbage-collected, reached via port 2000.
        table.insert(
            id(2),
            RouteRecord::new(port(2000), Metric::infinite(), port(2000), UpdateFlag::Poisoned, 0.0),
        );
        // id(3) was learned through neighbor id(2) (next_hop = port 2000) and is still active.
        table.insert(
            id(3),
            RouteRecord::new(port(2001), Metric::new(5).unwrap(), port(2000), UpdateFlag::Active, 100.0),
        );
        let original = OriginalTable::from_direct_links([(
            id(2),
            RouteRecord::new(port(2000), Metric::new(3).unwrap(), port(2000), UpdateFlag::Active, 0.0),
        )]);
        garbage_scan(&mut table, &original, 10.0, 41.0);
        assert!(table.get(id(2)).is_none());
        assert!(table.get(id(3)).is_none());
    }

    #[test]
    fn garbage_spares_unrelated_routes() {
        let mut table = RoutingTable::new();
        table.insert(
            id(2),
            RouteRecord::new(port(2000), Metric::infinite(), port(2000), UpdateFlag::Poisoned, 0.0),
        );
        table.insert(
            id(4),
            RouteRecord::new(port(2002), Metric::new(2).unwrap(), port(2002), UpdateFlag::Active, 100.0),
        );
        let original = OriginalTable::from_direct_links([(
            id(2),
            RouteRecord::new(port(2000), Metric::new(3).unwrap(), port(2000), UpdateFlag::Active, 0.0),
        )]);
        garbage_scan(&mut table, &original, 10.0, 41.0);
        assert!(table.get(id(4)).is_some());
    }

    #[test]
    fn expiring_learned_route_does_not_falsely_cascade() {
        let mut table = RoutingTable::new();
        // id(3) is a learned (non-direct) route expiring; its `port` field
        // (the next-hop neighbor's own input port) happens to coincide with
        // id(4)'s next hop, but id(3) is not a direct neighbor, so its
        // expiry must not be treated as a withdrawn link.
        table.insert(
            id(3),
            RouteRecord::new(port(2000), Metric::infinite(), port(2001), UpdateFlag::Poisoned, 0.0),
        );
        table.insert(
            id(4),
            RouteRecord::new(port(2002), Metric::new(5).unwrap(), port(2000), UpdateFlag::Active, 100.0),
        );
        // Only id(2) is an actual direct neighbor; id(3) is absent from
        // `original`, so it cannot withdraw a link.
        let original = OriginalTable::from_direct_links([(
            id(2),
            RouteRecord::new(port(2000), Metric::new(3).unwrap(), port(2000), UpdateFlag::Active, 0.0),
        )]);
        garbage_scan(&mut table, &original, 10.0, 41.0);
        assert!(table.get(id(3)).is_none());
        assert!(table.get(id(4)).is_some());
    }
}
