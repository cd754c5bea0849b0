// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Curated sensitive-term dictionary, grouped by category. The table is
//! configuration data: it can be loaded from JSON and swapped per engine
//! instance, which is how tests run with synthetic lexicons.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Conditions,
    Medications,
    Procedures,
    Roles,
    BodyParts,
    Symptoms,
    General,
}

impl TermCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermCategory::Conditions => "conditions",
            TermCategory::Medications => "medications",
            TermCategory::Procedures => "procedures",
            TermCategory::Roles => "roles",
            TermCategory::BodyParts => "body_parts",
            TermCategory::Symptoms => "symptoms",
            TermCategory::General => "general",
        }
    }
}

/// Case-insensitive tokenization on non-alphanumeric boundaries. An input
/// with no alphanumeric content tokenizes to nothing, which every stage
/// treats as "nothing to flag".
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Exact-token lookup table over the grouped dictionary.
#[derive(Debug, Clone)]
pub struct TermLexicon {
    by_category: BTreeMap<TermCategory, Vec<String>>,
    index: HashMap<String, TermCategory>,
}

impl TermLexicon {
    pub fn new(by_category: BTreeMap<TermCategory, Vec<String>>) -> Self {
        let mut index = HashMap::new();
        for (category, terms) in &by_category {
            for term in terms {
                index.insert(term.to_lowercase(), *category);
            }
        }
        Self { by_category, index }
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let by_category: BTreeMap<TermCategory, Vec<String>> = serde_json::from_str(raw)?;
        Ok(Self::new(by_category))
    }

    /// First token of `text` that exactly equals a dictionary entry.
    pub fn find_term(&self, text: &str) -> Option<(String, TermCategory)> {
        tokenize(text)
            .into_iter()
            .find_map(|token| self.index.get(&token).map(|cat| (token.clone(), *cat)))
    }

    pub fn terms(&self, category: TermCategory) -> &[String] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl Default for TermLexicon {
    fn default() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        let mut by_category = BTreeMap::new();
        by_category.insert(
            TermCategory::Conditions,
            owned(&[
                "diabetes",
                "cancer",
                "hypertension",
                "asthma",
                "arthritis",
                "depression",
                "anxiety",
            ]),
        );
        by_category.insert(
            TermCategory::Medications,
            owned(&[
                "antibiotic",
                "vaccine",
                "insulin",
                "opioid",
                "painkiller",
                "prescription",
                "medication",
                "medicine",
            ]),
        );
        by_category.insert(
            TermCategory::Procedures,
            owned(&[
                "surgery",
                "operation",
                "treatment",
                "therapy",
                "examination",
                "scan",
                "test",
            ]),
        );
        by_category.insert(
            TermCategory::Roles,
            owned(&[
                "doctor",
                "nurse",
                "patient",
                "physician",
                "practitioner",
                "specialist",
            ]),
        );
        by_category.insert(
            TermCategory::BodyParts,
            owned(&["heart", "lung", "liver", "kidney", "brain", "blood"]),
        );
        by_category.insert(
            TermCategory::Symptoms,
            owned(&[
                "pain",
                "fever",
                "cough",
                "headache",
                "nausea",
                "fatigue",
                "ache",
                "dizziness",
            ]),
        );
        by_category.insert(
            TermCategory::General,
            owned(&[
                "medical",
                "health",
                "illness",
                "disease",
                "diagnosis",
                "prognosis",
                "hospital",
                "clinic",
            ]),
        );
        Self::new(by_category)
    }
}
