use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use querygate_core::filter::FilterEngine;
use querygate_core::record::{CallerIdentity, ResponseArtifact, TxOutcome};
use querygate_core::respond::KnowledgeBase;

use querygate_daemon::archive::{AuditArchiver, ContentStore, MemoryStore};
use querygate_daemon::ledger::{LedgerAuthority, LedgerFault, LedgerGateway};
use querygate_daemon::pipeline::{QueryOutcome, QueryPipeline};
use querygate_daemon::respond::{BackendFault, ResponseBackend};
use querygate_daemon::telemetry::Telemetry;

/// Shared call-order journal across the instrumented collaborators.
type Journal = Arc<Mutex<Vec<&'static str>>>;

struct RecordingLedger {
    journal: Journal,
    fail_validate: bool,
    fail_log: bool,
}

#[async_trait]
impl LedgerAuthority for RecordingLedger {
    async fn owner(&self) -> Result<CallerIdentity, LedgerFault> {
        Ok(CallerIdentity("0xowner".into()))
    }

    async fn validate_query(
        &self,
        _text: &str,
        _caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault> {
        self.journal.lock().push("validate");
        if self.fail_validate {
            return Err(LedgerFault::Reverted("access denied for caller".into()));
        }
        Ok(TxOutcome {
            transaction_ref: "0xvalidate".into(),
            events: vec!["QueryValidated".into()],
        })
    }

    async fn log_query_processing(
        &self,
        _query: &str,
        _response: &str,
        _caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault> {
        self.journal.lock().push("log");
        if self.fail_log {
            return Err(LedgerFault::Transport("connection reset".into()));
        }
        Ok(TxOutcome {
            transaction_ref: "0xlog".into(),
            events: vec![],
        })
    }

    async fn store_archive_ref(
        &self,
        _archive_ref: &str,
        _caller: &CallerIdentity,
    ) -> Result<TxOutcome, LedgerFault> {
        self.journal.lock().push("store_ref");
        Ok(TxOutcome {
            transaction_ref: "0xref".into(),
            events: vec![],
        })
    }
}

struct RecordingBackend {
    journal: Journal,
    kb: KnowledgeBase,
    fail: bool,
}

#[async_trait]
impl ResponseBackend for RecordingBackend {
    async fn generate(&self, query: &str) -> Result<ResponseArtifact, BackendFault> {
        self.journal.lock().push("generate");
        if self.fail {
            return Err(BackendFault::Unreachable("inference down".into()));
        }
        Ok(self.kb.respond(query))
    }
}

struct Harness {
    pipeline: QueryPipeline,
    journal: Journal,
    store: Arc<MemoryStore>,
    telemetry: Telemetry,
}

fn harness(fail_validate: bool, fail_log: bool, fail_generate: bool) -> Harness {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MemoryStore::new());
    let telemetry = Telemetry::new();
    let pipeline = QueryPipeline::new(
        Arc::new(FilterEngine::with_defaults().unwrap()),
        Arc::new(LedgerGateway::new(Arc::new(RecordingLedger {
            journal: journal.clone(),
            fail_validate,
            fail_log,
        }))),
        Arc::new(RecordingBackend {
            journal: journal.clone(),
            kb: KnowledgeBase::default(),
            fail: fail_generate,
        }),
        Arc::new(AuditArchiver::new(store.clone())),
        telemetry.clone(),
        CallerIdentity("0xcaller".into()),
    );
    Harness {
        pipeline,
        journal,
        store,
        telemetry,
    }
}

#[tokio::test]
async fn medication_query_is_blocked_with_medical_reason() {
    let h = harness(false, false, false);
    let outcome = h
        .pipeline
        .process("What medication should I take for headache?")
        .await;
    match outcome {
        QueryOutcome::Blocked { message } => {
            assert!(message.contains("medication") || message.contains("headache"));
        }
        other => panic!("expected blocked, got {other:?}"),
    }
    // A blocked query never reaches the ledger.
    assert!(h.journal.lock().is_empty());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn weather_query_is_approved_with_response_hash() {
    let h = harness(false, false, false);
    let outcome = h.pipeline.process("What is the weather today?").await;
    match outcome {
        QueryOutcome::Approved {
            message,
            response_hash,
            archive_ref,
        } => {
            // No knowledge-base keyword matches, so this is the fallback.
            assert!(message.contains("overall wellness"));
            assert_eq!(response_hash.len(), 64);
            assert!(response_hash.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(archive_ref.is_some());
        }
        other => panic!("expected approved, got {other:?}"),
    }
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn validate_completes_before_generation_and_logging_after() {
    let h = harness(false, false, false);
    let _ = h.pipeline.process("What is the weather today?").await;
    let journal = h.journal.lock().clone();
    assert_eq!(journal, vec!["validate", "generate", "store_ref", "log"]);
}

#[tokio::test]
async fn ledger_revert_is_terminal_with_no_artifact_or_archive() {
    let h = harness(true, false, false);
    let outcome = h.pipeline.process("What is the weather today?").await;
    match outcome {
        QueryOutcome::Error { message } => {
            assert!(message.contains("ledger validation"));
            assert!(message.contains("access denied for caller"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    let journal = h.journal.lock().clone();
    assert_eq!(journal, vec!["validate"]);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn unreachable_store_still_approves_without_archive_ref() {
    let h = harness(false, false, false);
    h.store.set_unreachable(true);
    let outcome = h.pipeline.process("What is the weather today?").await;
    match outcome {
        QueryOutcome::Approved { archive_ref, .. } => assert!(archive_ref.is_none()),
        other => panic!("expected approved, got {other:?}"),
    }
    // Ledger logging is still attempted; storeArchiveRef is not, since
    // there is no ref to store.
    let journal = h.journal.lock().clone();
    assert_eq!(journal, vec!["validate", "generate", "log"]);
    assert!(h
        .telemetry
        .render()
        .contains("querygate_archive_failures_total 1"));
}

#[tokio::test]
async fn ledger_log_failure_never_demotes_approval() {
    let h = harness(false, true, false);
    let outcome = h.pipeline.process("What is the weather today?").await;
    match outcome {
        QueryOutcome::Approved { archive_ref, .. } => assert!(archive_ref.is_some()),
        other => panic!("expected approved, got {other:?}"),
    }
    assert!(h
        .telemetry
        .render()
        .contains("querygate_ledger_failures_total{op=\"logQueryProcessing\"} 1"));
}

#[tokio::test]
async fn generation_failure_is_terminal_and_skips_audit_tail() {
    let h = harness(false, false, true);
    let outcome = h.pipeline.process("What is the weather today?").await;
    match outcome {
        QueryOutcome::Error { message } => assert!(message.contains("generating response")),
        other => panic!("expected error, got {other:?}"),
    }
    let journal = h.journal.lock().clone();
    assert_eq!(journal, vec!["validate", "generate"]);
    assert!(h.store.is_empty());
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn blocked_query_exits_the_machine_from_filtered() {
    use tracing::instrument::WithSubscriber;

    let h = harness(false, false, false);
    let buffer = LogBuffer::default();
    let sink = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();

    let outcome = h
        .pipeline
        .process("What medication should I take for headache?")
        .with_subscriber(subscriber)
        .await;
    assert!(matches!(outcome, QueryOutcome::Blocked { .. }));

    let log = String::from_utf8(buffer.0.lock().clone()).unwrap();
    let filtered = log
        .find(r#"from="RECEIVED" to="FILTERED""#)
        .expect("RECEIVED -> FILTERED traced");
    let blocked = log
        .find(r#"from="FILTERED" to="BLOCKED""#)
        .expect("FILTERED -> BLOCKED traced");
    assert!(filtered < blocked);
}

#[tokio::test]
async fn blood_type_query_is_blocked_with_blood_type_category() {
    let h = harness(false, false, false);
    let outcome = h.pipeline.process("my blood type is AB+").await;
    match outcome {
        QueryOutcome::Blocked { message } => assert!(message.contains("blood type")),
        other => panic!("expected blocked, got {other:?}"),
    }
}

#[tokio::test]
async fn matched_knowledge_entry_is_served_verbatim_and_archived() {
    let h = harness(false, false, false);
    let outcome = h.pipeline.process("tips for better sleep").await;
    let (message, archive_ref) = match outcome {
        QueryOutcome::Approved {
            message,
            archive_ref,
            ..
        } => (message, archive_ref.unwrap()),
        other => panic!("expected approved, got {other:?}"),
    };
    let bytes = h.store.get(&archive_ref).await.unwrap();
    let record: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(record["response"], serde_json::Value::String(message));
    assert_eq!(record["query"], "tips for better sleep");
}
