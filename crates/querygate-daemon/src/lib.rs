// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! querygate-daemon
//!
//! The async half of querygate: the ledger gateway, the audit archiver, the
//! pipeline orchestrator that sequences them, and the HTTP surface. The
//! deterministic stages live in `querygate-core`; this crate owns everything
//! that suspends on the network.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod archive;
pub mod config;
pub mod ledger;
pub mod pipeline;
pub mod respond;
pub mod server;
pub mod telemetry;
