use serde::Deserialize;
use std::fs;
use std::path::Path;

use querygate_core::error::{QueryGateError, QueryGateResult};

/// Full daemon configuration. Loaded once at startup and never mutated;
/// every section has workable defaults so a bare `querygate-daemon` starts
/// against local collaborators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub listen: String,
    pub max_body_bytes: usize,
    pub ledger: LedgerConfig,
    pub storage: StorageConfig,
    pub filter: FilterConfig,
    pub responder: ResponderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub endpoint: String,
    pub contract_address: String,
    pub caller_account: String,
    pub gas_limit: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: String,
    /// Overridden by QUERYGATE_PIN_API_KEY when set.
    pub api_key: String,
    /// Overridden by QUERYGATE_PIN_API_SECRET when set.
    pub api_secret: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// JSON file with an array of given names; built-in list when absent.
    pub names_path: Option<String>,
    /// JSON file with a category-grouped term dictionary; built-in table
    /// when absent.
    pub lexicon_path: Option<String>,
    /// JSON file with pattern specs; built-in table when absent.
    pub patterns_path: Option<String>,
    /// JSON file with labeled classifier exemplars; built-in corpus when
    /// absent.
    pub corpus_path: Option<String>,
    /// Classifier stage reports without blocking when true.
    pub classifier_advisory: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// "knowledge-base" or "inference".
    pub backend: String,
    /// JSON file with a replacement response table; built-in when absent.
    pub knowledge_base_path: Option<String>,
    pub inference_endpoint: Option<String>,
    /// Bearer token for the inference service. Overridden by
    /// QUERYGATE_INFERENCE_API_KEY when set.
    pub inference_api_key: Option<String>,
    pub inference_timeout_ms: u64,
    /// Explicit policy: reroute an inference failure to the deterministic
    /// table instead of surfacing a generation error.
    pub fallback_to_knowledge_base: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            max_body_bytes: 16_384,
            ledger: LedgerConfig::default(),
            storage: StorageConfig::default(),
            filter: FilterConfig::default(),
            responder: ResponderConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            contract_address: "0xe78A0F7E598Cc8b0Bb87894B0F60dD2a88d6a8Ab".to_string(),
            caller_account: "0x0000000000000000000000000000000000000000".to_string(),
            gas_limit: 200_000,
            timeout_ms: 5_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            backend: "knowledge-base".to_string(),
            knowledge_base_path: None,
            inference_endpoint: None,
            inference_api_key: None,
            inference_timeout_ms: 15_000,
            fallback_to_knowledge_base: false,
        }
    }
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> QueryGateResult<Self> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|e| {
            QueryGateError::Validation(format!(
                "cannot read config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let mut cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| QueryGateError::Validation(format!("malformed config: {e}")))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("QUERYGATE_PIN_API_KEY") {
            self.storage.api_key = key;
        }
        if let Ok(secret) = std::env::var("QUERYGATE_PIN_API_SECRET") {
            self.storage.api_secret = secret;
        }
        if let Ok(key) = std::env::var("QUERYGATE_INFERENCE_API_KEY") {
            self.responder.inference_api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_self_consistent() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.responder.backend, "knowledge-base");
        assert!(!cfg.filter.classifier_advisory);
        assert!(cfg.ledger.gas_limit > 0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"listen":"127.0.0.1:4000","ledger":{{"timeout_ms":250}}}}"#
        )
        .unwrap();
        let cfg = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:4000");
        assert_eq!(cfg.ledger.timeout_ms, 250);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.max_body_bytes, 16_384);
        assert_eq!(cfg.ledger.gas_limit, 200_000);
    }

    #[test]
    fn all_filter_tables_have_config_paths() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"filter":{{"names_path":"names.json","lexicon_path":"lex.json",
                "patterns_path":"pat.json","corpus_path":"corpus.json"}}}}"#
        )
        .unwrap();
        let cfg = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(cfg.filter.names_path.as_deref(), Some("names.json"));
        assert_eq!(cfg.filter.lexicon_path.as_deref(), Some("lex.json"));
        assert_eq!(cfg.filter.patterns_path.as_deref(), Some("pat.json"));
        assert_eq!(cfg.filter.corpus_path.as_deref(), Some("corpus.json"));
    }

    #[test]
    fn inference_api_key_env_override_wins() {
        std::env::set_var("QUERYGATE_INFERENCE_API_KEY", "hf_test");
        let mut cfg = DaemonConfig::default();
        cfg.responder.inference_api_key = Some("from-file".to_string());
        cfg.apply_env_overrides();
        std::env::remove_var("QUERYGATE_INFERENCE_API_KEY");
        assert_eq!(cfg.responder.inference_api_key.as_deref(), Some("hf_test"));
    }

    #[test]
    fn malformed_file_is_a_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            DaemonConfig::load(file.path()),
            Err(QueryGateError::Validation(_))
        ));
    }
}
