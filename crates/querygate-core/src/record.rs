// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-request data model shared by the filter, gateway, responder, and
//! archiver. All values are immutable once built; the orchestrator owns
//! their lifecycle and nothing outlives the request except archived copies.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`. Used for response integrity checks,
/// not secrecy: equal input must always yield the equal digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// One inbound free-text query. Built per request, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub received_at_ms: u64,
}

impl Query {
    pub fn new(text: impl Into<String>, received_at_ms: u64) -> Self {
        Self {
            text: text.into(),
            received_at_ms,
        }
    }
}

/// Which filter stage produced a block. Order here mirrors evaluation
/// priority: named-entity > pattern > dictionary > classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleTag {
    NamedEntity,
    Pattern,
    Dictionary,
    Classifier,
}

impl RuleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTag::NamedEntity => "named_entity",
            RuleTag::Pattern => "pattern",
            RuleTag::Dictionary => "dictionary",
            RuleTag::Classifier => "classifier",
        }
    }
}

/// Allow/block decision for one query. Produced once by the filter engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterVerdict {
    pub allowed: bool,
    pub reason: String,
    pub matched_rule: Option<RuleTag>,
}

impl FilterVerdict {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: "no sensitive content detected".to_string(),
            matched_rule: None,
        }
    }

    pub fn blocked(reason: impl Into<String>, rule: RuleTag) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            matched_rule: Some(rule),
        }
    }
}

/// Account/address string under which ledger calls are signed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single ledger transaction as seen by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxOutcome {
    pub transaction_ref: String,
    /// Event names emitted by the call, surfaced for diagnostics only.
    #[serde(default)]
    pub events: Vec<String>,
}

/// Result of a ledger operation. `transaction_ref` is present only when the
/// on-chain call itself succeeded; `error` carries the revert reason or
/// transport failure verbatim otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub authorized: bool,
    pub caller: CallerIdentity,
    pub transaction_ref: Option<String>,
    pub error: Option<String>,
}

impl AuthorizationResult {
    pub fn granted(caller: CallerIdentity, outcome: TxOutcome) -> Self {
        Self {
            authorized: true,
            caller,
            transaction_ref: Some(outcome.transaction_ref),
            error: None,
        }
    }

    pub fn denied(caller: CallerIdentity, error: impl Into<String>) -> Self {
        Self {
            authorized: false,
            caller,
            transaction_ref: None,
            error: Some(error.into()),
        }
    }
}

/// A generated response plus its integrity metadata. Only ever produced for
/// a query that passed both the filter and ledger validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseArtifact {
    pub text: String,
    pub token_count: u32,
    pub source_tag: String,
    pub content_hash: String,
}

impl ResponseArtifact {
    /// Builds an artifact, computing the digest and the approximate token
    /// count: whitespace words plus a fixed per-source overhead standing in
    /// for prompt/formatting tokens.
    pub fn new(text: impl Into<String>, source_tag: impl Into<String>, token_overhead: u32) -> Self {
        let text = text.into();
        let words = text.split_whitespace().count() as u32;
        let content_hash = sha256_hex(text.as_bytes());
        Self {
            text,
            token_count: words + token_overhead,
            source_tag: source_tag.into(),
            content_hash,
        }
    }
}

/// Audit record of one approved interaction. Built incrementally: archival
/// may succeed while ledger logging fails or vice versa, so both refs are
/// independently optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub query: String,
    pub response: String,
    pub archive_ref: Option<String>,
    pub ledger_ref: Option<String>,
}

impl AuditEntry {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            archive_ref: None,
            ledger_ref: None,
        }
    }
}
