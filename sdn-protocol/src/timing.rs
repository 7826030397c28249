//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

/// Default tick interval, in seconds. Both roles must agree on K; it is not
/// renegotiated on the wire.
pub const DEFAULT_TICK_SECS: u64 = 2;

/// A peer is declared dead after this many missed ticks.
pub const TIMEOUT_TICKS: u32 = 3;

/// Distance used for a destination that is unreachable in the effective
/// topology, or not currently alive.
pub const UNREACHABLE_DISTANCE: u32 = 9999;

/// Next-hop value paired with [`UNREACHABLE_DISTANCE`].
pub const UNREACHABLE_NEXT_HOP: i32 = -1;

/// Tick interval and derived failure timeout, carried around together so
/// every component that needs one has the other.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub tick: Duration,
}

impl Timing {
    pub fn new(tick_secs: u64) -> Self {
        Timing {
            tick: Duration::from_secs(tick_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.tick * TIMEOUT_TICKS
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing::new(DEFAULT_TICK_SECS)
    }
}
