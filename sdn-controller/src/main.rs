//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;
use sdn_controller::routing;
use sdn_controller::state::ControllerState;
use sdn_protocol::error::IoError;
use sdn_protocol::log::Logger;
use sdn_protocol::{Message, Timing};
use tokio::net::UdpSocket;
use tracing::{info, warn};

/// `controller <port> <config-file>`
#[derive(Parser, Debug)]
#[command(name = "controller", about = "Fabric routing controller")]
struct Cli {
    port: u16,
    config_file: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let t0 = match sdn_protocol::config::load(&cli.config_file) {
        Ok(t0) => t0,
        Err(e) => {
            eprintln!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(run(cli.port, t0));
}

async fn run(port: u16, t0: sdn_protocol::StaticTopology) {
    let n = t0.n;

    let socket = match UdpSocket::bind(("0.0.0.0", port)).await {
        Ok(s) => s,
        Err(e) => {
            IoError::Bind(e).log();
            std::process::exit(1);
        }
    };
    info!(port, n, "controller listening");

    let socket = Arc::new(socket);
    let logger = Arc::new(Logger::new("Controller.log"));
    let state = Arc::new(Mutex::new(ControllerState::new(t0)));
    let timing = Timing::default();

    bootstrap(&socket, &logger, &state, n).await;
    info!("all switches registered, entering steady state");

    let recv_task = tokio::spawn(receive_loop(
        socket.clone(),
        logger.clone(),
        state.clone(),
        n,
    ));
    let periodic_task = tokio::spawn(periodic_loop(
        socket.clone(),
        logger.clone(),
        state.clone(),
        timing,
    ));

    let _ = tokio::signal::ctrl_c().await;
    recv_task.abort();
    periodic_task.abort();
}

/// Accepts Register_Request datagrams until every id in `[0, n)` has
/// registered, then emits every Register_Response, computes the initial
/// routing tables, and pushes them. Spec §4.3 bootstrap.
async fn bootstrap(
    socket: &UdpSocket,
    logger: &Logger,
    state: &Mutex<ControllerState>,
    n: u32,
) {
    let mut buf = vec![0u8; 65536];
    loop {
        {
            let st = state.lock().unwrap();
            if st.registered_count() as u32 >= n {
                break;
            }
        }
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                IoError::Recv(e).log();
                continue;
            }
        };
        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            continue;
        };
        let Some(Message::RegisterRequest { sid }) = Message::parse(text) else {
            continue;
        };
        if sid >= n {
            warn!(sid, "register request from out-of-range switch id");
            continue;
        }

        let became_alive = {
            let mut st = state.lock().unwrap();
            st.touch(sid, from, Instant::now());
            st.register(sid).became_alive
        };
        if became_alive {
            logger.write_entry(&[format!("Register Request {sid}")]);
            logger.write_entry(&[format!("Switch Alive {sid}")]);
        }
    }

    for s in 0..n {
        let (msg, addr) = {
            let st = state.lock().unwrap();
            (routing::build_register_response(&st, s), st.addr_of(s))
        };
        if let Some(addr) = addr {
            routing::send(socket, &msg, addr).await;
        }
        logger.write_entry(&[format!("Register Response {s}")]);
    }

    recompute_and_push(socket, logger, state).await;
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    logger: Arc<Logger>,
    state: Arc<Mutex<ControllerState>>,
    n: u32,
) {
    let mut buf = vec![0u8; 65536];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                IoError::Recv(e).log();
                continue;
            }
        };
        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            continue;
        };
        let Some(msg) = Message::parse(text) else {
            continue;
        };

        match msg {
            Message::RegisterRequest { sid } if sid < n => {
                let now = Instant::now();
                let became_alive = {
                    let mut st = state.lock().unwrap();
                    st.touch(sid, from, now);
                    st.register(sid).became_alive
                };
                logger.write_entry(&[format!("Register Request {sid}")]);
                if became_alive {
                    logger.write_entry(&[format!("Switch Alive {sid}")]);
                }

                let (resp, addr) = {
                    let st = state.lock().unwrap();
                    (routing::build_register_response(&st, sid), st.addr_of(sid))
                };
                if let Some(addr) = addr {
                    routing::send(&socket, &resp, addr).await;
                }
                logger.write_entry(&[format!("Register Response {sid}")]);

                recompute_and_push(&socket, &logger, &state).await;
            }
            Message::TopologyUpdate { sender, reports } if sender < n => {
                let mut st = state.lock().unwrap();
                st.touch(sender, from, Instant::now());
                st.apply_topology_update(sender, &reports);
            }
            // Register_Request/TopologyUpdate with an out-of-range id, and
            // any Keep_Alive or Route_Update (never sent to the
            // controller) are dropped silently per spec §7.
            _ => {}
        }
    }
}

/// The periodic path of spec §4.3: expire timed-out switches, recompute
/// the dead-link set from accumulated reports, and push fresh routes if
/// anything changed.
async fn periodic_loop(
    socket: Arc<UdpSocket>,
    logger: Arc<Logger>,
    state: Arc<Mutex<ControllerState>>,
    timing: Timing,
) {
    let mut interval = tokio::time::interval(timing.tick);
    loop {
        interval.tick().await;
        let now = Instant::now();

        let (dead_switches, newly_dead_links, changed) = {
            let mut st = state.lock().unwrap();
            let dead = st.expire_dead(now, timing.timeout());
            let outcome = st.recompute_dead_links(!dead.is_empty());
            (dead, outcome.newly_dead_links, outcome.changed)
        };

        for s in &dead_switches {
            logger.write_entry(&[format!("Switch Dead {s}")]);
        }
        for (a, b) in &newly_dead_links {
            logger.write_entry(&[format!("Link Dead {a},{b}")]);
        }

        if changed {
            recompute_and_push(&socket, &logger, &state).await;
        }
    }
}

async fn recompute_and_push(
    socket: &UdpSocket,
    logger: &Logger,
    state: &Mutex<ControllerState>,
) {
    let (tables, addrs) = {
        let st = state.lock().unwrap();
        let tables = routing::compute_all(&st);
        let addrs: BTreeMap<u32, SocketAddr> = tables
            .keys()
            .filter_map(|&s| st.addr_of(s).map(|a| (s, a)))
            .collect();
        (tables, addrs)
    };
    routing::log_routing_update(logger, &tables);
    routing::push_routes(socket, &addrs, &tables).await;
}
