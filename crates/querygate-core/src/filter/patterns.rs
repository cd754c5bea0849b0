// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Structured-pattern checks: regular expressions for category-specific
//! sensitive shapes that token matching cannot see, such as a blood-type
//! expression or a lab marker next to a numeric value.

use crate::error::{QueryGateError, QueryGateResult};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// One compiled pattern with its disclosure category.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub category: String,
    pub reason: String,
    regex: Regex,
}

/// Serialized form used by pattern-table config files.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternSpec {
    pub category: String,
    pub reason: String,
    pub pattern: String,
}

impl PatternRule {
    pub fn new(
        category: impl Into<String>,
        reason: impl Into<String>,
        pattern: &str,
    ) -> QueryGateResult<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| QueryGateError::Internal(format!("bad filter pattern: {e}")))?;
        Ok(Self {
            category: category.into(),
            reason: reason.into(),
            regex,
        })
    }

    pub fn from_specs(specs: &[PatternSpec]) -> QueryGateResult<Vec<Self>> {
        specs
            .iter()
            .map(|s| Self::new(s.category.clone(), s.reason.clone(), &s.pattern))
            .collect()
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Built-in pattern table. Order matters: the first matching rule names the
/// disclosed category.
pub fn default_rules() -> QueryGateResult<Vec<PatternRule>> {
    Ok(vec![
        PatternRule::new(
            "blood type",
            "contains a blood type expression",
            r"\bblood\s+(?:type|group)\b.{0,16}\b(?:A|B|AB|O)[+-]?\b|\b(?:A|B|AB|O)\s*(?:positive|negative)\s+blood\b",
        )?,
        PatternRule::new(
            "lab result",
            "contains a lab result expression",
            r"\b(?:glucose|a1c|hba1c|cholesterol|ldl|hdl|triglycerides|hemoglobin|creatinine)\b[^.\n]{0,24}\b\d+(?:\.\d+)?\b",
        )?,
        PatternRule::new(
            "personal health reference",
            "contains health-related discussion patterns",
            r"\b(?:my|your|their|his|her)\s+(?:health|condition|doctor)\b",
        )?,
        PatternRule::new(
            "personal health reference",
            "contains health-related discussion patterns",
            r"\b(?:i|you|they|he|she)\s+(?:feel|am\s+feeling|feeling|felt)\s+(?:sick|ill|pain)\b",
        )?,
        PatternRule::new(
            "personal health reference",
            "contains health-related discussion patterns",
            r"\b(?:take|taking|took)\s+(?:medication|medicine|pill|pills|drugs)\b",
        )?,
    ])
}
