//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Update processor: folds an inbound, already-verified advertisement into
//! the routing table (Bellman-Ford relaxation against the sender's direct
//! link cost).

use crate::debug::Debug;
use crate::packet::Message;
use crate::table::{OriginalTable, Port, RouteRecord, RoutingTable, UpdateFlag};

/// Applies one inbound message to the live table.
///
/// `self_id` is never installed as a destination even if advertised; a
/// message from a router not present in `original` (i.e. not a configured
/// neighbor) is ignored in its entirety, since only known, configured
/// neighbors are trusted to advertise routes at all.
pub fn process_message(
    table: &mut RoutingTable,
    original: &OriginalTable,
    self_id: u16,
    now: f64,
    msg: &Message,
) {
    let Some(link) = original.get(msg.sender_id) else {
        return;
    };
    let dist = link.weight;
    let sender_port = link.port;

    for (dest_id, entry) in &msg.entries {
        if dest_id.get() == self_id {
            continue;
        }

        match entry.update_flag {
            UpdateFlag::Active => {
                install_or_refresh(table, original, *dest_id, entry, dist, sender_port, now);
                // Re-activate a route previously marked poisoned: the peer
                // now advertises it live again.
                if let Some(existing) = table.get_mut(*dest_id) {
                    if existing.update_flag == UpdateFlag::Poisoned {
                        Debug::RouteReactivate(*dest_id).log();
                    }
                    existing.update_flag = UpdateFlag::Active;
                }
            }
            UpdateFlag::Poisoned => {
                if let Some(existing) = table.get_mut(*dest_id) {
                    existing.update_flag = UpdateFlag::Poisoned;
                }
            }
        }
    }

    reassert_direct_link(table, original, msg, dist, now);
}

/// Re-asserts the direct link to `msg.sender_id` so that merging an
/// advertisement can never, as a side effect, lose adjacency to a still-live
/// neighbor: if the sender didn't list itself (or listed itself at a finite
/// combined weight), its original direct route is copied back into the live
/// table and refreshed.
fn reassert_direct_link(
    table: &mut RoutingTable,
    original: &OriginalTable,
    msg: &Message,
    dist: crate::table::Metric,
    now: f64,
) {
    let Some(direct) = original.get(msg.sender_id) else {
        return;
    };
    let listed = msg
        .entries
        .iter()
        .find(|(dest_id, _)| *dest_id == msg.sender_id);
    let still_finite = match listed {
        Some((_, entry)) => !entry.weight.add(dist).is_infinite(),
        None => true,
    };
    if !still_finite {
        return;
    }

    table.insert(msg.sender_id, *direct);
    table.get_mut(msg.sender_id).unwrap().last_refreshed = now;
}

fn install_or_refresh(
    table: &mut RoutingTable,
    original: &OriginalTable,
    dest_id: crate::table::RouterId,
    entry: &crate::packet::Entry,
    dist: crate::table::Metric,
    sender_port: Port,
    now: f64,
) {
    let candidate = entry.weight.add(dist);

    match table.get(dest_id) {
        None => {
            if !candidate.is_infinite() {
                table.insert(
                    dest_id,
                    RouteRecord::new(
                        entry.port,
                        candidate,
                        sender_port,
                        UpdateFlag::Active,
                        now,
                    ),
                );
                Debug::RouteCreate(dest_id, candidate.get(), sender_port).log();
            }
        }
        Some(current) => {
            if candidate < current.weight {
                table.insert(
                    dest_id,
                    RouteRecord::new(
                        entry.port,
                        candidate,
                        sender_port,
                        UpdateFlag::Active,
                        now,
                    ),
                );
                Debug::RouteReplace(dest_id, candidate.get(), sender_port).log();
            } else if !original.contains(dest_id) || entry.next_hop == original.get(dest_id).unwrap().port
            {
                // Same-cost keepalive from the route's incumbent next hop.
                if current.next_hop == sender_port {
                    table.get_mut(dest_id).unwrap().last_refreshed = now;
                    Debug::RouteRefresh(dest_id).log();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Entry;
    use crate::table::{Metric, RouterId};

    fn id(n: u16) -> RouterId {
        RouterId::new(n).unwrap()
    }

    fn port(n: u16) -> Port {
        Port::new(n).unwrap()
    }

    fn metric(n: u8) -> Metric {
        Metric::new(n).unwrap()
    }

    fn direct_original() -> OriginalTable {
        OriginalTable::from_direct_links([(
            id(2),
            RouteRecord::new(port(2000), metric(1), port(2000), UpdateFlag::Active, 0.0),
        )])
    }

    #[test]
    fn installs_new_route_within_finite_range() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        let msg = Message::new(
            id(2),
            vec![(
                id(3),
                Entry {
                    port: port(2001),
                    weight: metric(5),
                    next_hop: port(2001),
                    update_flag: UpdateFlag::Active,
                },
            )],
        );
        process_message(&mut table, &original, 1, 10.0, &msg);
        let route = table.get(id(3)).unwrap();
        assert_eq!(route.weight.get(), 6);
        assert_eq!(route.next_hop, port(2000));
        assert_eq!(route.last_refreshed, 10.0);
    }

    #[test]
    fn ignores_route_that_would_exceed_infinity() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        let msg = Message::new(
            id(2),
            vec![(
                id(3),
                Entry {
                    port: port(2001),
                    weight: metric(16),
                    next_hop: port(2001),
                    update_flag: UpdateFlag::Active,
                },
            )],
        );
        process_message(&mut table, &original, 1, 10.0, &msg);
        assert!(table.get(id(3)).is_none());
    }

    #[test]
    fn ignores_message_from_non_neighbor() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        let msg = Message::new(
            id(9),
            vec![(
                id(3),
                Entry {
                    port: port(2001),
                    weight: metric(1),
                    next_hop: port(2001),
                    update_flag: UpdateFlag::Active,
                },
            )],
        );
        process_message(&mut table, &original, 1, 10.0, &msg);
        assert!(table.get(id(3)).is_none());
    }

    #[test]
    fn self_destination_is_skipped() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        let msg = Message::new(
            id(2),
            vec![(
                id(1),
                Entry {
                    port: port(2001),
                    weight: metric(1),
                    next_hop: port(2001),
                    update_flag: UpdateFlag::Active,
                },
            )],
        );
        process_message(&mut table, &original, 1, 10.0, &msg);
        assert!(table.get(id(1)).is_none());
    }

    #[test]
    fn poison_from_peer_marks_existing_route() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        table.insert(
            id(3),
            RouteRecord::new(port(2001), metric(6), port(2000), UpdateFlag::Active, 5.0),
        );
        let msg = Message::new(
            id(2),
            vec![(
                id(3),
                Entry {
                    port: port(2001),
                    weight: metric(16),
                    next_hop: port(2001),
                    update_flag: UpdateFlag::Poisoned,
                },
            )],
        );
        process_message(&mut table, &original, 1, 10.0, &msg);
        let route = table.get(id(3)).unwrap();
        assert_eq!(route.update_flag, UpdateFlag::Poisoned);
        // Weight and timestamp untouched; expiry is driven by the timer scan.
        assert_eq!(route.weight.get(), 6);
        assert_eq!(route.last_refreshed, 5.0);
    }

    #[test]
    fn active_advertisement_reactivates_a_poisoned_route() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        table.insert(
            id(3),
            RouteRecord::new(port(2001), metric(16), port(2000), UpdateFlag::Poisoned, 5.0),
        );
        let msg = Message::new(
            id(2),
            vec![(
                id(3),
                Entry {
                    port: port(2001),
                    weight: metric(5),
                    next_hop: port(2001),
                    update_flag: UpdateFlag::Active,
                },
            )],
        );
        process_message(&mut table, &original, 1, 10.0, &msg);
        let route = table.get(id(3)).unwrap();
        assert_eq!(route.update_flag, UpdateFlag::Active);
        assert_eq!(route.weight.get(), 6);
    }

    #[test]
    fn direct_link_is_reasserted_when_sender_omits_itself() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        // Simulate the direct link having gone stale.
        table.get_mut(id(2)).unwrap().last_refreshed = 0.0;
        let msg = Message::new(id(2), vec![]);
        process_message(&mut table, &original, 1, 42.0, &msg);
        let route = table.get(id(2)).unwrap();
        assert_eq!(route.weight.get(), 1);
        assert_eq!(route.last_refreshed, 42.0);
    }

    #[test]
    fn direct_link_not_reasserted_when_sender_poisons_itself() {
        let original = direct_original();
        let mut table = original.to_initial_table();
        let msg = Message::new(
            id(2),
            vec![(
                id(2),
                Entry {
                    port: port(2000),
                    weight: metric(16),
                    next_hop: port(2000),
                    update_flag: UpdateFlag::Poisoned,
                },
            )],
        );
        process_message(&mut table, &original, 1, 42.0, &msg);
        // The sender poisoned its own entry (weight 16 + dist >= 16); the
        // direct link is not force-refreshed in this case, leaving the
        // ordinary poison-from-peer / timeout machinery in control.
        assert_eq!(table.get(id(2)).unwrap().last_refreshed, 0.0);
    }
}
