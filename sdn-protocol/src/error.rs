//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt;

use tracing::{error, warn};

/// Fatal errors that abort startup before any socket or log file is opened.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Empty,
    InvalidSwitchCount(String),
    InvalidEdgeLine(String),
    SelfLoop(u32),
    WeightOutOfRange(u32, u32, u32),
    ConflictingWeight(u32, u32, u32, u32),
    SwitchOutOfRange(u32, u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Empty => {
                write!(f, "config file is empty, expected switch count on line 1")
            }
            ConfigError::InvalidSwitchCount(line) => {
                write!(f, "invalid switch count line: {line:?}")
            }
            ConfigError::InvalidEdgeLine(line) => {
                write!(f, "invalid edge line: {line:?}")
            }
            ConfigError::SelfLoop(u) => write!(f, "self-loop edge on switch {u}"),
            ConfigError::WeightOutOfRange(u, v, w) => {
                write!(f, "edge ({u},{v}) weight {w} out of range [1, 9999)")
            }
            ConfigError::ConflictingWeight(u, v, w1, w2) => write!(
                f,
                "edge ({u},{v}) declared twice with conflicting weights {w1} and {w2}"
            ),
            ConfigError::SwitchOutOfRange(id, n) => {
                write!(f, "edge references switch {id}, but N = {n}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Non-fatal runtime faults. These are logged and otherwise swallowed: the
/// wire protocol offers no channel back to the peer, so the only
/// peer-visible symptom of any of these is silence.
#[derive(Debug)]
pub enum IoError {
    Bind(std::io::Error),
    Send(std::io::Error),
    Recv(std::io::Error),
    LogWrite(std::io::Error),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Bind(e) => write!(f, "failed to bind UDP socket: {e}"),
            IoError::Send(e) => write!(f, "UDP send failed: {e}"),
            IoError::Recv(e) => write!(f, "UDP recv failed: {e}"),
            IoError::LogWrite(e) => write!(f, "failed to append to log file: {e}"),
        }
    }
}

impl IoError {
    pub fn log(&self) {
        match self {
            IoError::Bind(_) => error!(error = %self, "socket bind failed"),
            IoError::Send(_) => warn!(error = %self, "dropping datagram"),
            IoError::Recv(_) => warn!(error = %self, "recv error, continuing"),
            IoError::LogWrite(_) => error!(error = %self, "log write failed"),
        }
    }
}
