//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

//! Switch state machine, split out from `main` so the scenarios in
//! `tests/` can drive it without a real socket.

pub mod state;
