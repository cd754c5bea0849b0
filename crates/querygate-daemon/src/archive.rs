// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Audit archival against a content-addressed store. One approved
//! interaction becomes one serialized log record, staged through a scoped
//! temporary file and submitted off the hot path; the returned content
//! address goes into the audit entry. Failures here never fail the request.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use querygate_core::record::sha256_hex;

#[derive(Debug, Error)]
pub enum StoreFault {
    #[error("store rejected record: {0}")]
    Rejected(String),

    #[error("store unreachable: {0}")]
    Transport(String),

    #[error("staging failed: {0}")]
    Staging(String),
}

/// Content-addressed storage: the retrieval key is a stable function of the
/// stored bytes.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, StoreFault>;
    async fn get(&self, address: &str) -> Result<Vec<u8>, StoreFault>;
}

/// HTTP client for a pinning service. Credentials ride as headers; the
/// reply carries the content hash under which the record was pinned.
#[derive(Debug, Clone)]
pub struct PinStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
}

impl PinStore {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, StoreFault> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| StoreFault::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }
}

#[async_trait]
impl ContentStore for PinStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, StoreFault> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name("audit-record.json");
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(&self.endpoint)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.api_secret)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreFault::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreFault::Rejected(format!("{status}: {detail}")));
        }
        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreFault::Transport(format!("malformed store reply: {e}")))?;
        reply
            .get("IpfsHash")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| StoreFault::Rejected("reply missing IpfsHash".to_string()))
    }

    async fn get(&self, address: &str) -> Result<Vec<u8>, StoreFault> {
        let url = format!("{}/{address}", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreFault::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreFault::Rejected(response.status().to_string()));
        }
        Ok(response
            .bytes()
            .await
            .map_err(|e| StoreFault::Transport(e.to_string()))?
            .to_vec())
    }
}

/// In-process store for tests: content address is the sha256 of the bytes,
/// which satisfies the stable-address contract. Can be switched unreachable
/// to exercise non-fatal archival failure.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
    unreachable: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable
            .store(unreachable, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, StoreFault> {
        if self.unreachable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreFault::Transport("connection refused".to_string()));
        }
        let address = sha256_hex(&bytes);
        self.records.lock().insert(address.clone(), bytes);
        Ok(address)
    }

    async fn get(&self, address: &str) -> Result<Vec<u8>, StoreFault> {
        if self.unreachable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreFault::Transport("connection refused".to_string()));
        }
        self.records
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| StoreFault::Rejected(format!("unknown address {address}")))
    }
}

#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    query: &'a str,
    response: &'a str,
    response_hash: &'a str,
    recorded_at_ms: u64,
}

/// Serializes query + response into one log record and submits it. The
/// staging buffer is a named temporary file whose guard removes it on every
/// exit path, including submission failure.
pub struct AuditArchiver {
    store: Arc<dyn ContentStore>,
}

impl AuditArchiver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn archive(
        &self,
        query: &str,
        response: &str,
        response_hash: &str,
        recorded_at_ms: u64,
    ) -> Result<String, StoreFault> {
        let record = AuditRecord {
            query,
            response,
            response_hash,
            recorded_at_ms,
        };
        let payload =
            serde_json::to_vec(&record).map_err(|e| StoreFault::Staging(e.to_string()))?;

        let mut staging = tempfile::NamedTempFile::new()
            .map_err(|e| StoreFault::Staging(e.to_string()))?;
        staging
            .write_all(&payload)
            .map_err(|e| StoreFault::Staging(e.to_string()))?;
        staging
            .flush()
            .map_err(|e| StoreFault::Staging(e.to_string()))?;
        let staged = std::fs::read(staging.path())
            .map_err(|e| StoreFault::Staging(e.to_string()))?;

        let address = self.store.put(staged).await?;
        tracing::debug!(
            target: "querygate.archive",
            address = %address,
            bytes = payload.len(),
            "audit record archived"
        );
        Ok(address)
    }
}
