// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-request orchestration. One inbound query runs one pipeline instance
//! through `RECEIVED → FILTERED → AUTHORIZED → RESPONDED → ARCHIVED → DONE`,
//! exiting early at `BLOCKED` or `ERROR`. Transitions never re-enter an
//! earlier stage and nothing is retried here; retries belong to the
//! collaborators. Ledger validation completes successfully strictly before
//! response generation, and the best-effort tail (archive, ledger logging)
//! only runs once a response exists.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use querygate_core::filter::FilterEngine;
use querygate_core::record::{AuditEntry, CallerIdentity, Query};

use crate::archive::AuditArchiver;
use crate::ledger::LedgerGateway;
use crate::respond::ResponseBackend;
use crate::telemetry::Telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Filtered,
    Authorized,
    Responded,
    Archived,
    Done,
    Blocked,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "RECEIVED",
            Stage::Filtered => "FILTERED",
            Stage::Authorized => "AUTHORIZED",
            Stage::Responded => "RESPONDED",
            Stage::Archived => "ARCHIVED",
            Stage::Done => "DONE",
            Stage::Blocked => "BLOCKED",
            Stage::Error => "ERROR",
        }
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Blocked {
        message: String,
    },
    Error {
        message: String,
    },
    Approved {
        message: String,
        response_hash: String,
        archive_ref: Option<String>,
    },
}

pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub struct QueryPipeline {
    filter: Arc<FilterEngine>,
    gateway: Arc<LedgerGateway>,
    backend: Arc<dyn ResponseBackend>,
    archiver: Arc<AuditArchiver>,
    telemetry: Telemetry,
    caller: CallerIdentity,
}

impl QueryPipeline {
    pub fn new(
        filter: Arc<FilterEngine>,
        gateway: Arc<LedgerGateway>,
        backend: Arc<dyn ResponseBackend>,
        archiver: Arc<AuditArchiver>,
        telemetry: Telemetry,
        caller: CallerIdentity,
    ) -> Self {
        Self {
            filter,
            gateway,
            backend,
            archiver,
            telemetry,
            caller,
        }
    }

    fn transition(&self, from: Stage, to: Stage) {
        tracing::info!(
            target: "querygate.pipeline",
            from = from.as_str(),
            to = to.as_str(),
            "pipeline transition"
        );
    }

    /// Runs the full gated pipeline for `text`. The caller has already
    /// rejected empty input as a validation error.
    pub async fn process(&self, text: &str) -> QueryOutcome {
        let query = Query::new(text, unix_ms());
        self.telemetry.record_query();

        // RECEIVED -> FILTERED -> BLOCKED | AUTHORIZED
        let verdict = self.filter.classify(&query.text);
        self.transition(Stage::Received, Stage::Filtered);
        if !verdict.allowed {
            self.transition(Stage::Filtered, Stage::Blocked);
            if let Some(rule) = verdict.matched_rule {
                self.telemetry.record_blocked(rule.as_str());
            }
            return QueryOutcome::Blocked {
                message: format!("Query blocked: {}", verdict.reason),
            };
        }

        // FILTERED -> AUTHORIZED | ERROR. Validation must succeed before
        // any response is generated.
        let authorization = self.gateway.validate(&query, &self.caller).await;
        if !authorization.authorized {
            self.transition(Stage::Filtered, Stage::Error);
            self.telemetry.record_ledger_failure("validateQuery");
            self.telemetry.record_error();
            let detail = authorization
                .error
                .unwrap_or_else(|| "unknown ledger failure".to_string());
            return QueryOutcome::Error {
                message: format!("Error during ledger validation: {detail}"),
            };
        }
        self.transition(Stage::Filtered, Stage::Authorized);

        // AUTHORIZED -> RESPONDED | ERROR
        let artifact = match self.backend.generate(&query.text).await {
            Ok(artifact) => artifact,
            Err(fault) => {
                self.transition(Stage::Authorized, Stage::Error);
                self.telemetry.record_error();
                return QueryOutcome::Error {
                    message: format!("Error generating response: {fault}"),
                };
            }
        };
        self.transition(Stage::Authorized, Stage::Responded);

        // RESPONDED -> ARCHIVED. Archival and ledger logging are captured
        // as values; neither can demote the approval.
        let mut entry = AuditEntry::new(query.text.clone(), artifact.text.clone());
        match self
            .archiver
            .archive(
                &query.text,
                &artifact.text,
                &artifact.content_hash,
                query.received_at_ms,
            )
            .await
        {
            Ok(address) => {
                entry.archive_ref = Some(address.clone());
                let stored = self.gateway.store_archive_ref(&address, &self.caller).await;
                if !stored.authorized {
                    self.telemetry.record_ledger_failure("storeArchiveRef");
                }
            }
            Err(fault) => {
                self.telemetry.record_archive_failure();
                tracing::warn!(
                    target: "querygate.pipeline",
                    error = %fault,
                    "audit archival failed, continuing without archive ref"
                );
            }
        }
        self.transition(Stage::Responded, Stage::Archived);

        let logged = self
            .gateway
            .log_record(&query, &artifact.text, &self.caller)
            .await;
        if logged.authorized {
            entry.ledger_ref = logged.transaction_ref;
        } else {
            self.telemetry.record_ledger_failure("logQueryProcessing");
            tracing::warn!(
                target: "querygate.pipeline",
                error = logged.error.as_deref().unwrap_or("unknown"),
                "ledger logging failed, continuing with degraded audit entry"
            );
        }

        self.transition(Stage::Archived, Stage::Done);
        self.telemetry.record_approved();
        tracing::info!(
            target: "querygate.pipeline",
            response_hash = %artifact.content_hash,
            token_count = artifact.token_count,
            source = %artifact.source_tag,
            archive_ref = entry.archive_ref.as_deref().unwrap_or(""),
            ledger_ref = entry.ledger_ref.as_deref().unwrap_or(""),
            "query approved"
        );
        QueryOutcome::Approved {
            message: artifact.text,
            response_hash: artifact.content_hash,
            archive_ref: entry.archive_ref,
        }
    }
}
