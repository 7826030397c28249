//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use sdn_protocol::{link_key, LinkKey, StaticTopology};

/// All mutable controller state, guarded by the single mutex spec §5
/// requires. Every mutation goes through a method here so the locking
/// discipline lives in one place.
pub struct ControllerState {
    pub t0: StaticTopology,
    addr: BTreeMap<u32, SocketAddr>,
    alive: BTreeSet<u32>,
    last_heard: BTreeMap<u32, Instant>,
    /// `report[s][n]`: switch s's latest opinion on whether its link to n
    /// is up. Domain of the inner map equals s's neighbor set in T0
    /// (invariant 4), populated lazily as switches join.
    report: BTreeMap<u32, BTreeMap<u32, bool>>,
    dead_links: BTreeSet<LinkKey>,
}

/// What a just-processed Register_Request caused, so the caller knows
/// which log lines and side effects to emit.
pub struct RegisterOutcome {
    pub became_alive: bool,
}

/// What one periodic pass found, in the order spec §4.3 mandates logging
/// and recomputing.
pub struct PeriodicOutcome {
    pub newly_dead_links: Vec<LinkKey>,
    pub changed: bool,
}

impl ControllerState {
    pub fn new(t0: StaticTopology) -> Self {
        ControllerState {
            t0,
            addr: BTreeMap::new(),
            alive: BTreeSet::new(),
            last_heard: BTreeMap::new(),
            report: BTreeMap::new(),
            dead_links: BTreeSet::new(),
        }
    }

    pub fn is_alive(&self, s: u32) -> bool {
        self.alive.contains(&s)
    }

    pub fn alive_switches(&self) -> &BTreeSet<u32> {
        &self.alive
    }

    pub fn addr_of(&self, s: u32) -> Option<SocketAddr> {
        self.addr.get(&s).copied()
    }

    pub fn registered_count(&self) -> usize {
        self.alive.len()
    }

    /// Records an inbound datagram from `s`, independent of its kind
    /// (spec §4.3: "each inbound datagram updates last_heard and addr").
    pub fn touch(&mut self, s: u32, from: SocketAddr, now: Instant) {
        self.last_heard.insert(s, now);
        self.addr.insert(s, from);
    }

    /// Applies a Register_Request from `s`. Always updates liveness
    /// bookkeeping; only performs the "newly alive" side effects
    /// (optimistic revival, report reset, dead-link cleanup) the first
    /// time s transitions from not-alive to alive.
    pub fn register(&mut self, s: u32) -> RegisterOutcome {
        if self.alive.contains(&s) {
            return RegisterOutcome {
                became_alive: false,
            };
        }
        self.alive.insert(s);

        // Reset s's own opinion of every neighbor to up.
        let neighbors: BTreeMap<u32, bool> =
            self.t0.neighbors(s).map(|n| (n, true)).collect();
        self.report.insert(s, neighbors);

        // Optimistic revival: every other switch's opinion of its link to
        // s is reset to up too. The next periodic tick will correct this
        // from real reports if the link is actually still down.
        for &other in &self.alive {
            if other == s {
                continue;
            }
            if let Some(report) = self.report.get_mut(&other) {
                if report.contains_key(&s) {
                    report.insert(s, true);
                }
            }
        }

        self.dead_links.retain(|&(a, b)| a != s && b != s);

        RegisterOutcome { became_alive: true }
    }

    /// Applies a Topology_Update: overwrite s's report wholesale.
    pub fn apply_topology_update(&mut self, s: u32, reports: &[(u32, bool)]) {
        let entry = self.report.entry(s).or_default();
        for &(n, up) in reports {
            entry.insert(n, up);
        }
    }

    /// Step 1 of the periodic pass: demote anyone silent past `timeout`.
    pub fn expire_dead(&mut self, now: Instant, timeout: Duration) -> Vec<u32> {
        let dead: Vec<u32> = self
            .alive
            .iter()
            .copied()
            .filter(|s| {
                self.last_heard
                    .get(s)
                    .map_or(true, |&t| now.duration_since(t) > timeout)
            })
            .collect();
        for &s in &dead {
            self.alive.remove(&s);
            self.dead_links.retain(|&(a, b)| a != s && b != s);
        }
        dead
    }

    /// Steps 2-4 of the periodic pass: recompute the dead-link set from
    /// the current reports (OR-of-reports, spec §4.3 step 2) and report
    /// what changed.
    pub fn recompute_dead_links(&mut self, dead_switches_found: bool) -> PeriodicOutcome {
        let mut next = BTreeSet::new();
        for (&s, nbrs) in self.t0.adjacency() {
            if !self.alive.contains(&s) {
                continue;
            }
            for &n in nbrs.keys() {
                if n <= s || !self.alive.contains(&n) {
                    continue;
                }
                let s_says_up = self.report.get(&s).and_then(|r| r.get(&n)).copied().unwrap_or(true);
                let n_says_up = self.report.get(&n).and_then(|r| r.get(&s)).copied().unwrap_or(true);
                if !s_says_up || !n_says_up {
                    next.insert(link_key(s, n));
                }
            }
        }

        let newly_dead_links: Vec<LinkKey> =
            next.difference(&self.dead_links).copied().collect();
        let changed = dead_switches_found || next != self.dead_links;
        self.dead_links = next;

        PeriodicOutcome {
            newly_dead_links,
            changed,
        }
    }

    pub fn effective_adjacency(&self) -> BTreeMap<u32, BTreeMap<u32, u32>> {
        sdn_protocol::topology::effective_adjacency(&self.t0, &self.alive, &self.dead_links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdn_protocol::config::parse;

    fn triangle() -> ControllerState {
        ControllerState::new(parse("3\n0 1 1\n1 2 1\n0 2 5\n").unwrap())
    }

    #[test]
    fn first_register_marks_alive_and_initializes_report() {
        let mut st = triangle();
        let outcome = st.register(0);
        assert!(outcome.became_alive);
        assert!(st.is_alive(0));
        assert!(!st.register(0).became_alive);
    }

    #[test]
    fn oneside_down_link_is_dead_via_or_of_reports() {
        let mut st = triangle();
        st.register(0);
        st.register(1);
        st.apply_topology_update(0, &[(1, false), (2, true)]);
        st.apply_topology_update(1, &[(0, true), (2, true)]);
        let outcome = st.recompute_dead_links(false);
        assert!(outcome.changed);
        assert!(outcome.newly_dead_links.contains(&link_key(0, 1)));
    }

    #[test]
    fn dead_switch_drops_its_dead_links() {
        let mut st = triangle();
        st.register(0);
        st.register(1);
        st.apply_topology_update(0, &[(1, false), (2, true)]);
        st.apply_topology_update(1, &[(0, false), (2, true)]);
        st.recompute_dead_links(false);
        assert!(!st.dead_links.is_empty());

        let dead = st.expire_dead(Instant::now() + Duration::from_secs(100), Duration::from_secs(6));
        assert_eq!(dead, vec![0]);
        assert!(st.dead_links.is_empty());
    }

    #[test]
    fn revival_resets_peer_reports_optimistically() {
        let mut st = triangle();
        st.register(0);
        st.register(1);
        st.apply_topology_update(0, &[(1, false), (2, true)]);
        st.apply_topology_update(1, &[(0, false), (2, true)]);
        st.recompute_dead_links(false);
        assert!(!st.dead_links.is_empty());

        // Switch 0 re-registers after having been marked dead.
        st.expire_dead(Instant::now() + Duration::from_secs(100), Duration::from_secs(6));
        let outcome = st.register(0);
        assert!(outcome.became_alive);
        let next = st.recompute_dead_links(false);
        assert!(next.newly_dead_links.is_empty());
    }
}
