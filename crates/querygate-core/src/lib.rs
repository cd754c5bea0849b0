// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! querygate-core
//!
//! Deterministic core of the *querygate* gated query pipeline.
//!
//! This crate implements the stages that need no I/O:
//! - the layered sensitivity filter (name, pattern, lexicon, classifier)
//! - deterministic response selection over an ordered knowledge base
//! - the shared per-request data model and content digests
//!
//! Everything here is configuration-in, verdict-out: rule tables, the
//! classifier corpus, and the knowledge base are constructor inputs loaded
//! once at process start, so engines can be shared across concurrent
//! pipeline instances without locks.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod filter;
pub mod record;
pub mod respond;

pub use crate::error::{QueryGateError, QueryGateResult};
pub use crate::filter::FilterEngine;
pub use crate::record::{
    AuditEntry, AuthorizationResult, CallerIdentity, FilterVerdict, Query, ResponseArtifact,
    RuleTag,
};
pub use crate::respond::KnowledgeBase;
