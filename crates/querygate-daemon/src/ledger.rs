// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ledger gateway: wraps the external authorization ledger behind a
//! capability trait, serializes calls per caller identity, and folds every
//! transaction outcome into an `AuthorizationResult`. The concrete ledger is
//! an opaque oracle; revert reasons pass through verbatim.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use querygate_core::record::{AuthorizationResult, CallerIdentity, Query, TxOutcome};

#[derive(Debug, Error)]
pub enum LedgerFault {
    /// The ledger's access-control logic rejected the call. Carries the
    /// revert reason exactly as the ledger reported it.
    #[error("reverted: {0}")]
    Reverted(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("transport: {0}")]
    Transport(String),
}

/// The single capability the pipeline needs from a ledger: submit an
/// identity-signed, gas-bounded call and learn whether it succeeded. A
/// non-blockchain backend implements this directly in tests.
#[async_trait]
pub trait LedgerAuthority: Send + Sync {
    async fn owner(&self) -> Result<CallerIdentity, LedgerFault>;

    async fn validate_query(
        &self,
        text: &str,
        caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault>;

    async fn log_query_processing(
        &self,
        query: &str,
        response: &str,
        caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault>;

    async fn store_archive_ref(
        &self,
        archive_ref: &str,
        caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault>;
}

#[derive(Debug, Deserialize)]
struct LedgerCallReply {
    status: String,
    #[serde(rename = "transactionHash")]
    transaction_hash: Option<String>,
    #[serde(default)]
    events: Vec<String>,
    reason: Option<String>,
}

/// HTTP client for the deployed authorization contract. Calls are posted as
/// JSON to the configured endpoint; a deployment-level timeout converts a
/// hung call into a failure.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    endpoint: String,
    contract_address: String,
    gas_limit: u64,
    timeout_ms: u64,
}

impl HttpLedger {
    pub fn new(
        endpoint: impl Into<String>,
        contract_address: impl Into<String>,
        gas_limit: u64,
        timeout_ms: u64,
    ) -> Result<Self, LedgerFault> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| LedgerFault::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            contract_address: contract_address.into(),
            gas_limit,
            timeout_ms,
        })
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
        caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault> {
        let body = json!({
            "contract": self.contract_address,
            "from": caller.as_str(),
            "gas": self.gas_limit,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerFault::Timeout(self.timeout_ms)
                } else {
                    LedgerFault::Transport(e.to_string())
                }
            })?;
        let reply: LedgerCallReply = response
            .json()
            .await
            .map_err(|e| LedgerFault::Transport(format!("malformed ledger reply: {e}")))?;
        match reply.status.as_str() {
            "ok" => Ok(TxOutcome {
                transaction_ref: reply.transaction_hash.unwrap_or_default(),
                events: reply.events,
            }),
            _ => Err(LedgerFault::Reverted(
                reply.reason.unwrap_or_else(|| "unspecified revert".to_string()),
            )),
        }
    }
}

#[async_trait]
impl LedgerAuthority for HttpLedger {
    async fn owner(&self) -> Result<CallerIdentity, LedgerFault> {
        let caller = CallerIdentity(self.contract_address.clone());
        let outcome = self.call("owner", json!([]), &caller).await?;
        Ok(CallerIdentity(outcome.transaction_ref))
    }

    async fn validate_query(
        &self,
        text: &str,
        caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault> {
        self.call("validateQuery", json!([text]), caller).await
    }

    async fn log_query_processing(
        &self,
        query: &str,
        response: &str,
        caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault> {
        self.call("logQueryProcessing", json!([query, response]), caller)
            .await
    }

    async fn store_archive_ref(
        &self,
        archive_ref: &str,
        caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault> {
        self.call("storeArchiveRef", json!([archive_ref]), caller)
            .await
    }
}

/// Per-identity ordering slots. Each caller's calls run under that caller's
/// own sequence numbering; the gateway holds the identity's slot across the
/// ledger call so it never issues a second call for the same identity before
/// the first's slot is assigned. Different identities proceed in parallel.
#[derive(Default)]
struct OrderingSlots {
    by_identity: parking_lot::Mutex<HashMap<CallerIdentity, Arc<tokio::sync::Mutex<u64>>>>,
}

impl OrderingSlots {
    fn slot_for(&self, caller: &CallerIdentity) -> Arc<tokio::sync::Mutex<u64>> {
        let mut map = self.by_identity.lock();
        map.entry(caller.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(0)))
            .clone()
    }
}

/// Public face of the ledger for the orchestrator. `validate` failures are
/// terminal for the request; `log_record` and `store_archive_ref` are
/// best-effort and only degrade the audit entry.
pub struct LedgerGateway {
    authority: Arc<dyn LedgerAuthority>,
    slots: OrderingSlots,
}

impl LedgerGateway {
    pub fn new(authority: Arc<dyn LedgerAuthority>) -> Self {
        Self {
            authority,
            slots: OrderingSlots::default(),
        }
    }

    async fn ordered<F, Fut>(&self, caller: &CallerIdentity, op: &str, f: F) -> AuthorizationResult
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<TxOutcome, LedgerFault>>,
    {
        let slot = self.slots.slot_for(caller);
        let mut seq = slot.lock().await;
        *seq += 1;
        let sequence = *seq;
        let result = f().await;
        drop(seq);
        match result {
            Ok(outcome) => {
                tracing::debug!(
                    target: "querygate.ledger",
                    caller = %caller,
                    op,
                    sequence,
                    tx = %outcome.transaction_ref,
                    "ledger call succeeded"
                );
                AuthorizationResult::granted(caller.clone(), outcome)
            }
            Err(fault) => {
                tracing::warn!(
                    target: "querygate.ledger",
                    caller = %caller,
                    op,
                    sequence,
                    error = %fault,
                    "ledger call failed"
                );
                AuthorizationResult::denied(caller.clone(), fault.to_string())
            }
        }
    }

    pub async fn validate(&self, query: &Query, caller: &CallerIdentity) -> AuthorizationResult {
        self.ordered(caller, "validateQuery", || {
            self.authority.validate_query(&query.text, caller)
        })
        .await
    }

    pub async fn log_record(
        &self,
        query: &Query,
        response: &str,
        caller: &CallerIdentity,
    ) -> AuthorizationResult {
        self.ordered(caller, "logQueryProcessing", || {
            self.authority.log_query_processing(&query.text, response, caller)
        })
        .await
    }

    pub async fn store_archive_ref(
        &self,
        archive_ref: &str,
        caller: &CallerIdentity,
    ) -> AuthorizationResult {
        self.ordered(caller, "storeArchiveRef", || {
            self.authority.store_archive_ref(archive_ref, caller)
        })
        .await
    }
}
