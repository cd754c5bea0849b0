// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Person-name detection, the highest-priority filter stage. Two signals:
//! an honorific followed by a capitalized word ("Dr. Chen"), and a curated
//! given-name list checked token-by-token. The list is configuration data
//! like every other rule table.

use crate::error::{QueryGateError, QueryGateResult};
use crate::filter::lexicon::tokenize;
use regex::Regex;
use std::collections::HashSet;

const DEFAULT_GIVEN_NAMES: &[&str] = &[
    "james", "mary", "john", "patricia", "robert", "jennifer", "michael", "linda", "david",
    "elizabeth", "william", "susan", "richard", "jessica", "joseph", "sarah", "thomas", "karen",
    "daniel", "emily", "maria", "carlos", "ahmed", "fatima", "wei", "yuki", "priya", "ivan",
    "olga", "amara",
];

#[derive(Debug, Clone)]
pub struct NameDetector {
    given_names: HashSet<String>,
    honorific: Regex,
}

impl NameDetector {
    pub fn new(given_names: impl IntoIterator<Item = String>) -> QueryGateResult<Self> {
        let honorific = Regex::new(r"\b(?:Dr|Mr|Mrs|Ms|Prof)\.?\s+[A-Z][a-z]+")
            .map_err(|e| QueryGateError::Internal(format!("bad honorific pattern: {e}")))?;
        Ok(Self {
            given_names: given_names.into_iter().map(|n| n.to_lowercase()).collect(),
            honorific,
        })
    }

    pub fn with_default_names() -> QueryGateResult<Self> {
        Self::new(DEFAULT_GIVEN_NAMES.iter().map(|n| n.to_string()))
    }

    /// The detected name, if any. Honorific matches win so the reason can
    /// name the full "Dr. X" form.
    pub fn detect(&self, text: &str) -> Option<String> {
        if let Some(m) = self.honorific.find(text) {
            return Some(m.as_str().to_string());
        }
        tokenize(text)
            .into_iter()
            .find(|token| self.given_names.contains(token))
    }
}
