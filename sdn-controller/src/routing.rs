//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::SocketAddr;

use sdn_protocol::error::IoError;
use sdn_protocol::log::{routing_update_block, Logger};
use sdn_protocol::topology::shortest_paths;
use sdn_protocol::{Message, NeighborEntry, RouteRow};
use tokio::net::UdpSocket;

use crate::state::ControllerState;

/// Builds a Register_Response for `s`: its neighbors in T0, ascending id
/// order, each tagged with its current liveness and address.
pub fn build_register_response(state: &ControllerState, s: u32) -> Message {
    let neighbors = state
        .t0
        .neighbors(s)
        .map(|n| {
            let addr = if state.is_alive(n) {
                state.addr_of(n)
            } else {
                None
            };
            NeighborEntry { id: n, addr }
        })
        .collect();
    Message::RegisterResponse { neighbors }
}

/// Dijkstra from every alive switch over the current effective topology.
pub fn compute_all(state: &ControllerState) -> BTreeMap<u32, Vec<RouteRow>> {
    let adj = state.effective_adjacency();
    state
        .alive_switches()
        .iter()
        .map(|&s| (s, shortest_paths(&adj, s, state.t0.n)))
        .collect()
}

/// Writes the `Routing Update ... Routing Complete` block. Row order
/// follows ascending source then the destination order `shortest_paths`
/// already produces ([0, N)).
pub fn log_routing_update(logger: &Logger, tables: &BTreeMap<u32, Vec<RouteRow>>) {
    let rows = tables.iter().flat_map(|(&src, rows)| {
        rows.iter()
            .map(move |r| format!("{},{}:{},{}", src, r.dest, r.next_hop, r.distance))
    });
    logger.write_entry(&routing_update_block(rows));
}

pub async fn send(socket: &UdpSocket, msg: &Message, addr: SocketAddr) {
    if let Err(e) = socket.send_to(msg.encode().as_bytes(), addr).await {
        IoError::Send(e).log();
    }
}

/// Unicasts a Route_Update to every switch with a known address in
/// `addrs`. Switches with no row in `tables` (i.e. not alive) never
/// receive anything, per spec invariant 3.
pub async fn push_routes(
    socket: &UdpSocket,
    addrs: &BTreeMap<u32, SocketAddr>,
    tables: &BTreeMap<u32, Vec<RouteRow>>,
) {
    for (&s, rows) in tables {
        let Some(&addr) = addrs.get(&s) else {
            continue;
        };
        let msg = Message::RouteUpdate {
            target: s,
            rows: rows.clone(),
        };
        send(socket, &msg, addr).await;
    }
}
