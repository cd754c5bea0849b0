// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Response-backend seam. The pipeline only sees `ResponseBackend`; whether
//! the text comes from the deterministic knowledge base or an external
//! inference service is a deployment decision, and swapping one for the
//! other touches nothing downstream.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use querygate_core::record::ResponseArtifact;
use querygate_core::respond::{KnowledgeBase, KB_TOKEN_OVERHEAD};

/// Standing instructions sent ahead of every inference call.
const SYSTEM_PROMPT: &str = "You are an AI assistant integrated with a \
privacy-focused system designed for healthcare. You may provide general \
medical information, educational content about conditions, and standard \
treatment approaches. You must never store or repeat personal health \
information shared by users, never connect previous conversations with \
current ones, and never present yourself as a licensed healthcare \
professional. Always note that you provide general information, not \
personalized medical advice.";

const DISCLAIMER: &str = "\n\nRemember: This is general information only and \
not a substitute for professional medical advice. Please consult a \
healthcare provider for personalized recommendations.";

#[derive(Debug, Error)]
pub enum BackendFault {
    #[error("inference endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("inference endpoint returned {0}: {1}")]
    Rejected(u16, String),

    #[error("malformed inference reply: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ResponseBackend: Send + Sync {
    async fn generate(&self, query: &str) -> Result<ResponseArtifact, BackendFault>;
}

/// Deterministic lookup over the knowledge base. Infallible.
pub struct KnowledgeBackend {
    kb: KnowledgeBase,
}

impl KnowledgeBackend {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb }
    }
}

#[async_trait]
impl ResponseBackend for KnowledgeBackend {
    async fn generate(&self, query: &str) -> Result<ResponseArtifact, BackendFault> {
        Ok(self.kb.respond(query))
    }
}

/// External inference service over HTTP. A failure is terminal unless a
/// knowledge-base fallback was explicitly configured; there is no silent
/// fallback path.
pub struct InferenceBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    fallback: Option<KnowledgeBase>,
}

impl InferenceBackend {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u64,
        fallback: Option<KnowledgeBase>,
    ) -> Result<Self, BackendFault> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| BackendFault::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            fallback,
        })
    }

    async fn call(&self, query: &str) -> Result<ResponseArtifact, BackendFault> {
        let body = json!({ "inputs": format!("{SYSTEM_PROMPT}\n\nUser Query: {query}") });
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BackendFault::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendFault::Rejected(status, detail));
        }
        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendFault::Malformed(e.to_string()))?;
        // Replies arrive either as [{"generated_text": ...}] or flat.
        let text = reply
            .get(0)
            .and_then(|v| v.get("generated_text"))
            .or_else(|| reply.get("generated_text"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| BackendFault::Malformed("reply missing generated_text".to_string()))?;
        let mut text = text.to_string();
        text.push_str(DISCLAIMER);
        Ok(ResponseArtifact::new(
            text,
            "inference-api",
            KB_TOKEN_OVERHEAD,
        ))
    }
}

#[async_trait]
impl ResponseBackend for InferenceBackend {
    async fn generate(&self, query: &str) -> Result<ResponseArtifact, BackendFault> {
        match self.call(query).await {
            Ok(artifact) => Ok(artifact),
            Err(fault) => match &self.fallback {
                Some(kb) => {
                    tracing::warn!(
                        target: "querygate.respond",
                        error = %fault,
                        "inference failed, using configured knowledge-base fallback"
                    );
                    Ok(kb.respond(query))
                }
                None => Err(fault),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn knowledge_backend_is_deterministic() {
        let backend = KnowledgeBackend::new(KnowledgeBase::default());
        let a = backend.generate("advice on sleep").await.unwrap();
        let b = backend.generate("advice on sleep").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unreachable_inference_without_fallback_is_terminal() {
        let backend =
            InferenceBackend::new("http://127.0.0.1:1/inference", None, 200, None).unwrap();
        assert!(matches!(
            backend.generate("hello").await,
            Err(BackendFault::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_inference_with_fallback_uses_knowledge_base() {
        let backend = InferenceBackend::new(
            "http://127.0.0.1:1/inference",
            None,
            200,
            Some(KnowledgeBase::default()),
        )
        .unwrap();
        let artifact = backend.generate("tips for insomnia").await.unwrap();
        assert_eq!(artifact.source_tag, "llama-2-7b-healthcare-kb");
    }

    #[tokio::test]
    async fn inference_call_sends_bearer_credentials() {
        use axum::extract::State;
        use axum::http::HeaderMap;
        use axum::routing::post;
        use axum::{Json, Router};
        use parking_lot::Mutex;
        use std::sync::Arc;

        let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let app = Router::new()
            .route(
                "/inference",
                post(
                    |State(seen): State<Arc<Mutex<Option<String>>>>,
                     headers: HeaderMap| async move {
                        *seen.lock() = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        Json(serde_json::json!([{ "generated_text": "General guidance." }]))
                    },
                ),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let backend = InferenceBackend::new(
            format!("http://{addr}/inference"),
            Some("hf_test_token".to_string()),
            2_000,
            None,
        )
        .unwrap();
        let artifact = backend.generate("hello").await.unwrap();
        assert!(artifact.text.starts_with("General guidance."));
        assert_eq!(artifact.source_tag, "inference-api");
        assert_eq!(seen.lock().as_deref(), Some("Bearer hf_test_token"));
        server.abort();
    }
}
