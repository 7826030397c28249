//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

//! Scenario (B) from spec §8: a switch started with `-f <neighbor>`
//! neither sends keep-alives to, nor accepts them from, that neighbor --
//! it must time the link out on its own, exactly as if the neighbor had
//! gone silent.

use std::time::{Duration, Instant};

use sdn_protocol::NeighborEntry;
use sdn_switch::state::SwitchState;

fn registered_triangle_switch(id: u32, failed: Option<u32>) -> SwitchState {
    let mut st = SwitchState::new(id, failed);
    let neighbors: Vec<NeighborEntry> = (0..3)
        .filter(|&n| n != id)
        .map(|n| NeighborEntry {
            id: n,
            addr: Some(format!("127.0.0.1:{}", 9000 + n).parse().unwrap()),
        })
        .collect();
    st.apply_register_response(&neighbors, Instant::now());
    st
}

#[test]
fn failed_neighbor_is_never_a_keepalive_target() {
    let st = registered_triangle_switch(1, Some(0));
    let targets: Vec<u32> = st.keepalive_targets().into_iter().map(|(id, _)| id).collect();
    assert_eq!(targets, vec![2]);
}

#[test]
fn failed_neighbor_keepalives_are_ignored_even_if_received() {
    let mut st = registered_triangle_switch(1, Some(0));
    let from = "127.0.0.1:9000".parse().unwrap();
    assert!(!st.on_keep_alive(0, from, Instant::now()));
    assert_eq!(st.topology_report(), vec![(0, true), (2, true)]);
}

#[test]
fn link_to_failed_neighbor_times_out_like_any_silent_peer() {
    let mut st = registered_triangle_switch(1, Some(0));
    let later = Instant::now() + Duration::from_secs(7);
    let dead = st.expire_dead(later, Duration::from_secs(6));
    assert_eq!(dead, vec![0]);
    assert_eq!(st.topology_report(), vec![(0, false), (2, true)]);
}
