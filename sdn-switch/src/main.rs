//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;
use sdn_protocol::error::IoError;
use sdn_protocol::log::{routing_update_block, Logger};
use sdn_protocol::{Message, Timing};
use sdn_switch::state::SwitchState;
use tokio::net::UdpSocket;
use tracing::{info, warn};

/// `switch <id> <controller-host> <controller-port> [-f <failed-neighbor-id>]`
#[derive(Parser, Debug)]
#[command(name = "switch", about = "Fabric switch agent")]
struct Cli {
    id: u32,
    controller_host: String,
    controller_port: u16,
    #[arg(short = 'f', long = "failed-neighbor", value_name = "ID")]
    failed_neighbor: Option<u32>,
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

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(run(cli));
}

async fn run(cli: Cli) {
    let controller_addr = match resolve(&cli.controller_host, cli.controller_port).await {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("failed to resolve controller address: {e}");
            std::process::exit(1);
        }
    };

    let socket = match UdpSocket::bind(("0.0.0.0", 0)).await {
        Ok(s) => s,
        Err(e) => {
            IoError::Bind(e).log();
            std::process::exit(1);
        }
    };
    info!(id = cli.id, ?controller_addr, "switch starting");

    let socket = Arc::new(socket);
    let logger = Arc::new(Logger::new(format!("switch{}.log", cli.id)));
    let state = Arc::new(Mutex::new(SwitchState::new(cli.id, cli.failed_neighbor)));
    let timing = Timing::default();

    bootstrap(&socket, &logger, &state, cli.id, controller_addr).await;
    info!("registered, entering steady state");

    let recv_task = tokio::spawn(receive_loop(
        socket.clone(),
        logger.clone(),
        state.clone(),
        controller_addr,
    ));
    let periodic_task = tokio::spawn(periodic_loop(
        socket.clone(),
        logger.clone(),
        state.clone(),
        controller_addr,
        timing,
    ));

    let _ = tokio::signal::ctrl_c().await;
    recv_task.abort();
    periodic_task.abort();
}

async fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved")
        })
}

/// Sends Register_Request and blocks until a Register_Response arrives,
/// per spec §4.4 bootstrap.
async fn bootstrap(
    socket: &UdpSocket,
    logger: &Logger,
    state: &Mutex<SwitchState>,
    my_id: u32,
    controller_addr: SocketAddr,
) {
    let req = Message::RegisterRequest { sid: my_id };
    send(socket, &req, controller_addr).await;
    logger.write_entry(&["Register Request Sent".to_string()]);

    let mut buf = vec![0u8; 65536];
    loop {
        let (len, _from) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                IoError::Recv(e).log();
                continue;
            }
        };
        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            continue;
        };
        if let Some(Message::RegisterResponse { neighbors }) = Message::parse(text) {
            state
                .lock()
                .unwrap()
                .apply_register_response(&neighbors, Instant::now());
            logger.write_entry(&["Register Response received".to_string()]);
            return;
        }
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    logger: Arc<Logger>,
    state: Arc<Mutex<SwitchState>>,
    controller_addr: SocketAddr,
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
            Message::RouteUpdate { target, rows } => {
                let my_id = { state.lock().unwrap().my_id };
                if target != my_id {
                    continue;
                }
                let lines = rows
                    .iter()
                    .map(|r| format!("{},{}:{}", my_id, r.dest, r.next_hop));
                logger.write_entry(&routing_update_block(lines));
            }
            Message::RegisterResponse { neighbors } => {
                state
                    .lock()
                    .unwrap()
                    .apply_register_response(&neighbors, Instant::now());
                logger.write_entry(&["Register Response received".to_string()]);
            }
            Message::KeepAlive { sid } => {
                let became_alive = {
                    let mut st = state.lock().unwrap();
                    st.on_keep_alive(sid, from, Instant::now())
                };
                if became_alive {
                    logger.write_entry(&[format!("Neighbor Alive {sid}")]);
                    // Send an immediate Topology_Update so the controller
                    // doesn't wait a full tick to learn about the revival.
                    let (my_id, report) = {
                        let st = state.lock().unwrap();
                        (st.my_id, st.topology_report())
                    };
                    let update = Message::TopologyUpdate {
                        sender: my_id,
                        reports: report,
                    };
                    send(&socket, &update, controller_addr).await;
                }
            }
            // Register_Request and Topology_Update are switch->controller
            // only; a switch never receives either.
            _ => {}
        }
    }
}

async fn periodic_loop(
    socket: Arc<UdpSocket>,
    logger: Arc<Logger>,
    state: Arc<Mutex<SwitchState>>,
    controller_addr: SocketAddr,
    timing: Timing,
) {
    let mut interval = tokio::time::interval(timing.tick);
    loop {
        interval.tick().await;
        let now = Instant::now();

        let dead = {
            let mut st = state.lock().unwrap();
            st.expire_dead(now, timing.timeout())
        };
        for n in &dead {
            logger.write_entry(&[format!("Neighbor Dead {n}")]);
        }

        let (my_id, targets, report) = {
            let st = state.lock().unwrap();
            (st.my_id, st.keepalive_targets(), st.topology_report())
        };

        for (_, addr) in &targets {
            let ka = Message::KeepAlive { sid: my_id };
            send(&socket, &ka, *addr).await;
        }

        let update = Message::TopologyUpdate {
            sender: my_id,
            reports: report,
        };
        send(&socket, &update, controller_addr).await;
    }
}

async fn send(socket: &UdpSocket, msg: &Message, addr: SocketAddr) {
    if let Err(e) = socket.send_to(msg.encode().as_bytes(), addr).await {
        warn!(%addr, error = %e, "dropping datagram");
    }
}
