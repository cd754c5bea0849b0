// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::fs;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use querygate_core::error::{QueryGateError, QueryGateResult};
use querygate_core::filter::classifier::{self, TrainingExample};
use querygate_core::filter::lexicon::TermLexicon;
use querygate_core::filter::names::NameDetector;
use querygate_core::filter::patterns::{self, PatternRule, PatternSpec};
use querygate_core::filter::FilterEngine;
use querygate_core::record::CallerIdentity;
use querygate_core::respond::KnowledgeBase;

use querygate_daemon::archive::{AuditArchiver, PinStore};
use querygate_daemon::config::DaemonConfig;
use querygate_daemon::ledger::{HttpLedger, LedgerGateway};
use querygate_daemon::pipeline::QueryPipeline;
use querygate_daemon::respond::{InferenceBackend, KnowledgeBackend, ResponseBackend};
use querygate_daemon::server::{self, AppState};
use querygate_daemon::telemetry::Telemetry;

#[derive(Debug, Parser)]
#[command(name = "querygate-daemon")]
#[command(about = "Ledger-authorized, audit-archived query pipeline daemon")]
struct Args {
    /// Path to a JSON config file; built-in defaults when absent.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the configured listen address.
    #[arg(long)]
    listen: Option<String>,

    #[arg(long, default_value = "info")]
    log: String,
}

fn build_filter(cfg: &DaemonConfig) -> QueryGateResult<FilterEngine> {
    let names = match &cfg.filter.names_path {
        Some(path) => {
            let list: Vec<String> = serde_json::from_str(&read(path)?)
                .map_err(|e| QueryGateError::Validation(format!("bad names file: {e}")))?;
            NameDetector::new(list)?
        }
        None => NameDetector::with_default_names()?,
    };
    let lexicon = match &cfg.filter.lexicon_path {
        Some(path) => TermLexicon::from_json(&read(path)?)
            .map_err(|e| QueryGateError::Validation(format!("bad lexicon file: {e}")))?,
        None => TermLexicon::default(),
    };
    let pattern_rules = match &cfg.filter.patterns_path {
        Some(path) => {
            let specs: Vec<PatternSpec> = serde_json::from_str(&read(path)?)
                .map_err(|e| QueryGateError::Validation(format!("bad patterns file: {e}")))?;
            PatternRule::from_specs(&specs)?
        }
        None => patterns::default_rules()?,
    };
    let corpus: Vec<TrainingExample> = match &cfg.filter.corpus_path {
        Some(path) => serde_json::from_str(&read(path)?)
            .map_err(|e| QueryGateError::Validation(format!("bad corpus file: {e}")))?,
        None => classifier::default_corpus(),
    };
    FilterEngine::standard_with(
        names,
        lexicon,
        pattern_rules,
        &corpus,
        cfg.filter.classifier_advisory,
    )
}

fn build_knowledge_base(cfg: &DaemonConfig) -> QueryGateResult<KnowledgeBase> {
    match &cfg.responder.knowledge_base_path {
        Some(path) => KnowledgeBase::from_json(&read(path)?)
            .map_err(|e| QueryGateError::Validation(format!("bad knowledge base file: {e}"))),
        None => Ok(KnowledgeBase::default()),
    }
}

fn build_backend(cfg: &DaemonConfig) -> QueryGateResult<Arc<dyn ResponseBackend>> {
    let kb = build_knowledge_base(cfg)?;
    match cfg.responder.backend.as_str() {
        "knowledge-base" => Ok(Arc::new(KnowledgeBackend::new(kb))),
        "inference" => {
            let endpoint = cfg.responder.inference_endpoint.clone().ok_or_else(|| {
                QueryGateError::Validation(
                    "responder.inference_endpoint is required for the inference backend"
                        .to_string(),
                )
            })?;
            let fallback = cfg.responder.fallback_to_knowledge_base.then_some(kb);
            let backend = InferenceBackend::new(
                endpoint,
                cfg.responder.inference_api_key.clone(),
                cfg.responder.inference_timeout_ms,
                fallback,
            )
            .map_err(|e| QueryGateError::Generation(e.to_string()))?;
            Ok(Arc::new(backend))
        }
        other => Err(QueryGateError::Validation(format!(
            "unknown responder backend: {other}"
        ))),
    }
}

fn read(path: &str) -> QueryGateResult<String> {
    fs::read_to_string(path)
        .map_err(|e| QueryGateError::Validation(format!("cannot read {path}: {e}")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log)?)
        .init();

    let mut cfg = match &args.config {
        Some(path) => DaemonConfig::load(path)?,
        None => DaemonConfig::default(),
    };
    cfg.apply_env_overrides();
    if let Some(listen) = args.listen {
        cfg.listen = listen;
    }

    let filter = Arc::new(build_filter(&cfg)?);
    let ledger = HttpLedger::new(
        cfg.ledger.endpoint.clone(),
        cfg.ledger.contract_address.clone(),
        cfg.ledger.gas_limit,
        cfg.ledger.timeout_ms,
    )?;
    let gateway = Arc::new(LedgerGateway::new(Arc::new(ledger)));
    let backend = build_backend(&cfg)?;
    let store = PinStore::new(
        cfg.storage.endpoint.clone(),
        cfg.storage.api_key.clone(),
        cfg.storage.api_secret.clone(),
        cfg.storage.timeout_ms,
    )?;
    let archiver = Arc::new(AuditArchiver::new(Arc::new(store)));
    let telemetry = Telemetry::new();
    let caller = CallerIdentity(cfg.ledger.caller_account.clone());

    let pipeline = QueryPipeline::new(
        filter,
        gateway,
        backend,
        archiver,
        telemetry.clone(),
        caller,
    );
    let state = Arc::new(AppState {
        pipeline,
        telemetry,
    });

    let listener = tokio::net::TcpListener::bind(&cfg.listen).await?;
    tracing::info!(listen = %cfg.listen, "querygate-daemon listening");
    let router = server::router(state, cfg.max_body_bytes);
    server::serve(listener, router, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await?;
    Ok(())
}
