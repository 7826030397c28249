//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};

use crate::config::StaticTopology;
use crate::timing::{UNREACHABLE_DISTANCE, UNREACHABLE_NEXT_HOP};

/// An unordered link, always stored with the smaller id first so it can be
/// used directly as a set/map key regardless of discovery order.
pub type LinkKey = (u32, u32);

pub fn link_key(a: u32, b: u32) -> LinkKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// T0 restricted to alive switches, with edges in `dead_links` removed.
/// This is the graph Dijkstra runs over every time routes are recomputed.
pub fn effective_adjacency(
    t0: &StaticTopology,
    alive: &BTreeSet<u32>,
    dead_links: &BTreeSet<LinkKey>,
) -> BTreeMap<u32, BTreeMap<u32, u32>> {
    let mut adj = BTreeMap::new();
    for &s in alive {
        let mut nbrs = BTreeMap::new();
        for n in t0.neighbors(s) {
            if !alive.contains(&n) {
                continue;
            }
            if dead_links.contains(&link_key(s, n)) {
                continue;
            }
            nbrs.insert(n, t0.weight(s, n).expect("edge present in T0"));
        }
        adj.insert(s, nbrs);
    }
    adj
}

/// One row of a computed routing table: `next_hop == -1` and
/// `distance == UNREACHABLE_DISTANCE` mark an unreachable or dead
/// destination (spec §4.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RouteRow {
    pub dest: u32,
    pub next_hop: i32,
    pub distance: u32,
}

/// Single-source shortest paths over `adj`, then next-hop selection for
/// every destination in `[0, n)`. Destinations outside `adj` (not alive)
/// or unreachable within it get the sentinel row.
///
/// Dijkstra uses a `BTreeMap<(distance, id), ()>` as the candidate set,
/// popping the lexicographically smallest `(distance, id)` key each
/// iteration -- the same tentative-list shape the teacher's SPF code uses
/// instead of a binary heap, which conveniently also gives a
/// deterministic tie-break (lowest id wins among equal-cost paths).
pub fn shortest_paths(
    adj: &BTreeMap<u32, BTreeMap<u32, u32>>,
    source: u32,
    n: u32,
) -> Vec<RouteRow> {
    let mut dist: BTreeMap<u32, u32> = BTreeMap::new();
    let mut parent: BTreeMap<u32, u32> = BTreeMap::new();
    let mut settled: BTreeSet<u32> = BTreeSet::new();
    let mut candidates: BTreeMap<(u32, u32), ()> = BTreeMap::new();

    if adj.contains_key(&source) {
        dist.insert(source, 0);
        candidates.insert((0, source), ());
    }

    while let Some(((d, u), ())) = candidates.pop_first() {
        if !settled.insert(u) {
            continue;
        }
        let Some(nbrs) = adj.get(&u) else { continue };
        for (&v, &w) in nbrs {
            if settled.contains(&v) {
                continue;
            }
            let nd = d.saturating_add(w);
            let better = match dist.get(&v) {
                Some(&existing) => nd < existing,
                None => true,
            };
            if better {
                if let Some(&old) = dist.get(&v) {
                    candidates.remove(&(old, v));
                }
                dist.insert(v, nd);
                parent.insert(v, u);
                candidates.insert((nd, v), ());
            }
        }
    }

    (0..n)
        .map(|dest| {
            if dest == source {
                RouteRow {
                    dest,
                    next_hop: source as i32,
                    distance: 0,
                }
            } else if let Some(&distance) = dist.get(&dest) {
                RouteRow {
                    dest,
                    next_hop: next_hop(&parent, source, dest) as i32,
                    distance,
                }
            } else {
                RouteRow {
                    dest,
                    next_hop: UNREACHABLE_NEXT_HOP,
                    distance: UNREACHABLE_DISTANCE,
                }
            }
        })
        .collect()
}

/// Walks parent pointers from `dest` back toward `source`, returning the
/// node whose parent is `source` -- i.e. the first hop out of `source`.
fn next_hop(parent: &BTreeMap<u32, u32>, source: u32, dest: u32) -> u32 {
    let mut cur = dest;
    loop {
        let p = parent[&cur];
        if p == source {
            return cur;
        }
        cur = p;
    }
}
