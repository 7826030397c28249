//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use sdn_protocol::NeighborEntry;

/// All mutable switch state, guarded by the single mutex spec §5
/// requires.
pub struct SwitchState {
    pub my_id: u32,
    /// A neighbor configured with this id is never probed and never
    /// accepted from -- it simulates a one-sided link failure.
    failed_neighbor: Option<u32>,
    /// Absent entry means "not currently alive", mirroring spec §3.
    nb_addr: BTreeMap<u32, SocketAddr>,
    nb_alive: BTreeMap<u32, bool>,
    nb_last_ka: BTreeMap<u32, Instant>,
}

impl SwitchState {
    pub fn new(my_id: u32, failed_neighbor: Option<u32>) -> Self {
        SwitchState {
            my_id,
            failed_neighbor,
            nb_addr: BTreeMap::new(),
            nb_alive: BTreeMap::new(),
            nb_last_ka: BTreeMap::new(),
        }
    }

    /// Applies a Register_Response: the neighbor tables are replaced
    /// wholesale (spec §4.4 / SPEC_FULL §4), and every neighbor gets a
    /// fresh keep-alive grace period.
    pub fn apply_register_response(
        &mut self,
        neighbors: &[NeighborEntry],
        now: Instant,
    ) {
        self.nb_addr.clear();
        self.nb_alive.clear();
        self.nb_last_ka.clear();
        for n in neighbors {
            self.nb_alive.insert(n.id, n.alive());
            if let Some(addr) = n.addr {
                self.nb_addr.insert(n.id, addr);
            }
            self.nb_last_ka.insert(n.id, now);
        }
    }

    /// Handles an inbound `<sid> KEEP_ALIVE`. Returns `true` if this
    /// neighbor transitioned from dead to alive (caller logs and sends an
    /// immediate Topology_Update on that transition).
    pub fn on_keep_alive(&mut self, sid: u32, from: SocketAddr, now: Instant) -> bool {
        if Some(sid) == self.failed_neighbor {
            return false;
        }
        if !self.nb_alive.contains_key(&sid) {
            return false;
        }
        self.nb_last_ka.insert(sid, now);
        self.nb_addr.insert(sid, from);
        let was_alive = self.nb_alive.insert(sid, true).unwrap_or(false);
        !was_alive
    }

    /// Marks any alive neighbor silent past `timeout` as dead; returns
    /// the ids that transitioned.
    pub fn expire_dead(&mut self, now: Instant, timeout: Duration) -> Vec<u32> {
        let dead: Vec<u32> = self
            .nb_alive
            .iter()
            .filter(|&(_, &alive)| alive)
            .filter(|(id, _)| {
                self.nb_last_ka
                    .get(id)
                    .map_or(true, |&t| now.duration_since(t) > timeout)
            })
            .map(|(&id, _)| id)
            .collect();
        for &id in &dead {
            self.nb_alive.insert(id, false);
            self.nb_addr.remove(&id);
        }
        dead
    }

    /// Neighbors to send a Keep_Alive to this tick: alive, not the
    /// one-sided failed neighbor, with a known address.
    pub fn keepalive_targets(&self) -> Vec<(u32, SocketAddr)> {
        self.nb_alive
            .iter()
            .filter(|&(_, &alive)| alive)
            .filter(|(id, _)| Some(**id) != self.failed_neighbor)
            .filter_map(|(&id, _)| self.nb_addr.get(&id).map(|&addr| (id, addr)))
            .collect()
    }

    /// Every configured neighbor with its current liveness, ascending id
    /// order, for a Topology_Update.
    pub fn topology_report(&self) -> Vec<(u32, bool)> {
        self.nb_alive.iter().map(|(&id, &alive)| (id, alive)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(failed: Option<u32>) -> SwitchState {
        let mut st = SwitchState::new(0, failed);
        let neighbors = vec![
            NeighborEntry {
                id: 1,
                addr: Some("127.0.0.1:9001".parse().unwrap()),
            },
            NeighborEntry {
                id: 2,
                addr: Some("127.0.0.1:9002".parse().unwrap()),
            },
        ];
        st.apply_register_response(&neighbors, Instant::now());
        st
    }

    #[test]
    fn keep_alive_from_failed_neighbor_is_ignored() {
        let mut st = registered(Some(1));
        let from = "127.0.0.1:9001".parse().unwrap();
        assert!(!st.on_keep_alive(1, from, Instant::now()));
        assert_eq!(st.keepalive_targets().len(), 1);
    }

    #[test]
    fn neighbor_death_and_revival_each_log_once() {
        let mut st = registered(None);
        let dead = st.expire_dead(Instant::now() + Duration::from_secs(100), Duration::from_secs(6));
        assert_eq!(dead.len(), 2);
        let dead_again = st.expire_dead(Instant::now() + Duration::from_secs(200), Duration::from_secs(6));
        assert!(dead_again.is_empty());

        let from = "127.0.0.1:9001".parse().unwrap();
        assert!(st.on_keep_alive(1, from, Instant::now()));
        assert!(!st.on_keep_alive(1, from, Instant::now()));
    }

    #[test]
    fn topology_report_lists_all_configured_neighbors() {
        let st = registered(None);
        assert_eq!(st.topology_report(), vec![(1, true), (2, true)]);
    }
}
