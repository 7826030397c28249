//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

//! The wire protocol: a tagged sum of the five datagram shapes in spec §4.1,
//! one parse function, one dispatch point. Every message is UTF-8 text,
//! newline-separated, tolerant of trailing whitespace and trailing empty
//! lines. Anything that doesn't match a known shape is not an error --
//! callers treat `None` as "drop silently" per spec §7.

use std::net::SocketAddr;

use crate::topology::RouteRow;

/// A neighbor row as carried in a [`Message::RegisterResponse`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NeighborEntry {
    pub id: u32,
    pub addr: Option<SocketAddr>,
}

impl NeighborEntry {
    pub fn alive(&self) -> bool {
        self.addr.is_some()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    RegisterRequest {
        sid: u32,
    },
    RegisterResponse {
        neighbors: Vec<NeighborEntry>,
    },
    RouteUpdate {
        target: u32,
        rows: Vec<RouteRow>,
    },
    TopologyUpdate {
        sender: u32,
        reports: Vec<(u32, bool)>,
    },
    KeepAlive {
        sid: u32,
    },
}

/// Lines of a datagram, trimmed and with trailing blanks dropped, but
/// interior blank lines preserved (a malformed interior blank is just a
/// parse failure further down, not something to silently skip).
fn lines(raw: &str) -> Vec<&str> {
    let mut v: Vec<&str> = raw.lines().map(|l| l.trim_end()).collect();
    while v.last().is_some_and(|l| l.is_empty()) {
        v.pop();
    }
    v
}

fn parse_u32(s: &str) -> Option<u32> {
    s.parse().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

impl Message {
    pub fn parse(raw: &str) -> Option<Message> {
        let lines = lines(raw);
        let first = *lines.first()?;

        if let Some(rest) = first.strip_suffix(" Register_Request") {
            let sid = parse_u32(rest)?;
            if lines.len() != 1 {
                return None;
            }
            return Some(Message::RegisterRequest { sid });
        }

        if let Some(rest) = first.strip_suffix(" KEEP_ALIVE") {
            let sid = parse_u32(rest)?;
            if lines.len() != 1 {
                return None;
            }
            return Some(Message::KeepAlive { sid });
        }

        match first {
            "REGISTER_RESPONSE" => Self::parse_register_response(&lines),
            "ROUTE_UPDATE" => Self::parse_route_update(&lines),
            "TOPOLOGY_UPDATE" => Self::parse_topology_update(&lines),
            _ => None,
        }
    }

    fn parse_register_response(lines: &[&str]) -> Option<Message> {
        let count: usize = lines.get(1)?.parse().ok()?;
        if lines.len() != 2 + count {
            return None;
        }
        let mut neighbors = Vec::with_capacity(count);
        for line in &lines[2..] {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let entry = match fields[..] {
                [id, "True", ip, port] => NeighborEntry {
                    id: parse_u32(id)?,
                    addr: format!("{ip}:{port}").parse().ok(),
                },
                [id, "False"] => NeighborEntry {
                    id: parse_u32(id)?,
                    addr: None,
                },
                _ => return None,
            };
            neighbors.push(entry);
        }
        Some(Message::RegisterResponse { neighbors })
    }

    fn parse_route_update(lines: &[&str]) -> Option<Message> {
        let target = parse_u32(lines.get(1)?)?;
        let mut rows = Vec::with_capacity(lines.len().saturating_sub(2));
        for line in &lines[2..] {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [dest, next_hop, distance] = fields[..] else {
                return None;
            };
            rows.push(RouteRow {
                dest: parse_u32(dest)?,
                next_hop: next_hop.parse().ok()?,
                distance: distance.parse().ok()?,
            });
        }
        Some(Message::RouteUpdate { target, rows })
    }

    fn parse_topology_update(lines: &[&str]) -> Option<Message> {
        let sender = parse_u32(lines.get(1)?)?;
        let mut reports = Vec::with_capacity(lines.len().saturating_sub(2));
        for line in &lines[2..] {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [nid, alive] = fields[..] else {
                return None;
            };
            reports.push((parse_u32(nid)?, parse_bool(alive)?));
        }
        Some(Message::TopologyUpdate { sender, reports })
    }

    /// Encodes this message to its wire form. The result never ends in a
    /// trailing blank line; callers are responsible for framing it as a
    /// single datagram.
    pub fn encode(&self) -> String {
        match self {
            Message::RegisterRequest { sid } => format!("{sid} Register_Request"),
            Message::KeepAlive { sid } => format!("{sid} KEEP_ALIVE"),
            Message::RegisterResponse { neighbors } => {
                let mut out = String::from("REGISTER_RESPONSE\n");
                out.push_str(&neighbors.len().to_string());
                for n in neighbors {
                    out.push('\n');
                    match n.addr {
                        Some(addr) => {
                            out.push_str(&format!(
                                "{} True {} {}",
                                n.id,
                                addr.ip(),
                                addr.port()
                            ));
                        }
                        None => out.push_str(&format!("{} False", n.id)),
                    }
                }
                out
            }
            Message::RouteUpdate { target, rows } => {
                let mut out = String::from("ROUTE_UPDATE\n");
                out.push_str(&target.to_string());
                for r in rows {
                    out.push('\n');
                    out.push_str(&format!(
                        "{} {} {}",
                        r.dest, r.next_hop, r.distance
                    ));
                }
                out
            }
            Message::TopologyUpdate { sender, reports } => {
                let mut out = String::from("TOPOLOGY_UPDATE\n");
                out.push_str(&sender.to_string());
                for (nid, alive) in reports {
                    out.push('\n');
                    out.push_str(&format!(
                        "{} {}",
                        nid,
                        if *alive { "True" } else { "False" }
                    ));
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_round_trips() {
        let msg = Message::RegisterRequest { sid: 7 };
        assert_eq!(Message::parse(&msg.encode()), Some(msg));
    }

    #[test]
    fn keep_alive_round_trips() {
        let msg = Message::KeepAlive { sid: 3 };
        assert_eq!(Message::parse(&msg.encode()), Some(msg));
    }

    #[test]
    fn register_response_round_trips_with_mixed_liveness() {
        let msg = Message::RegisterResponse {
            neighbors: vec![
                NeighborEntry {
                    id: 0,
                    addr: Some("127.0.0.1:9000".parse().unwrap()),
                },
                NeighborEntry { id: 2, addr: None },
            ],
        };
        assert_eq!(Message::parse(&msg.encode()), Some(msg));
    }

    #[test]
    fn route_update_round_trips() {
        let msg = Message::RouteUpdate {
            target: 1,
            rows: vec![
                RouteRow {
                    dest: 0,
                    next_hop: 0,
                    distance: 0,
                },
                RouteRow {
                    dest: 1,
                    next_hop: -1,
                    distance: 9999,
                },
            ],
        };
        assert_eq!(Message::parse(&msg.encode()), Some(msg));
    }

    #[test]
    fn topology_update_round_trips() {
        let msg = Message::TopologyUpdate {
            sender: 2,
            reports: vec![(0, true), (1, false)],
        };
        assert_eq!(Message::parse(&msg.encode()), Some(msg));
    }

    #[test]
    fn tolerates_trailing_whitespace_and_blank_lines() {
        let raw = "5 Register_Request \n\n\n";
        assert_eq!(
            Message::parse(raw),
            Some(Message::RegisterRequest { sid: 5 })
        );
    }

    #[test]
    fn unknown_message_drops_silently() {
        assert_eq!(Message::parse("GARBAGE\nmore garbage"), None);
        assert_eq!(Message::parse(""), None);
    }

    #[test]
    fn malformed_register_response_count_mismatch_drops() {
        let raw = "REGISTER_RESPONSE\n2\n0 False\n";
        assert_eq!(Message::parse(raw), None);
    }
}
