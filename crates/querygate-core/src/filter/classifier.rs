// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bag-of-words naive Bayes over a small labeled corpus, the last and
//! weakest filter stage. Trained once at startup from configuration data;
//! classification is pure lookup afterwards.

use crate::filter::lexicon::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Sensitive,
    Safe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: Label,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Multinomial naive Bayes in log-space with Laplace smoothing.
#[derive(Debug, Clone)]
pub struct BayesClassifier {
    sensitive_counts: HashMap<String, u32>,
    safe_counts: HashMap<String, u32>,
    sensitive_total: u32,
    safe_total: u32,
    sensitive_docs: u32,
    safe_docs: u32,
    vocabulary: usize,
}

impl BayesClassifier {
    pub fn train(corpus: &[TrainingExample]) -> Self {
        let mut sensitive_counts: HashMap<String, u32> = HashMap::new();
        let mut safe_counts: HashMap<String, u32> = HashMap::new();
        let mut sensitive_docs = 0;
        let mut safe_docs = 0;
        for example in corpus {
            let (counts, docs) = match example.label {
                Label::Sensitive => (&mut sensitive_counts, &mut sensitive_docs),
                Label::Safe => (&mut safe_counts, &mut safe_docs),
            };
            *docs += 1;
            for token in tokenize(&example.text) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        let sensitive_total = sensitive_counts.values().sum();
        let safe_total = safe_counts.values().sum();
        let vocabulary = sensitive_counts
            .keys()
            .chain(safe_counts.keys())
            .collect::<HashSet<_>>()
            .len();
        Self {
            sensitive_counts,
            safe_counts,
            sensitive_total,
            safe_total,
            sensitive_docs,
            safe_docs,
            vocabulary,
        }
    }

    pub fn classify(&self, text: &str) -> Label {
        let tokens = tokenize(text);
        // Nothing to flag: an empty bag must not inherit the class prior.
        if tokens.is_empty() || self.sensitive_docs == 0 || self.safe_docs == 0 {
            return Label::Safe;
        }
        let total_docs = f64::from(self.sensitive_docs + self.safe_docs);
        let mut sensitive_score = (f64::from(self.sensitive_docs) / total_docs).ln();
        let mut safe_score = (f64::from(self.safe_docs) / total_docs).ln();
        let vocab = self.vocabulary.max(1) as f64;
        for token in &tokens {
            let s = f64::from(*self.sensitive_counts.get(token).unwrap_or(&0)) + 1.0;
            sensitive_score += (s / (f64::from(self.sensitive_total) + vocab)).ln();
            let k = f64::from(*self.safe_counts.get(token).unwrap_or(&0)) + 1.0;
            safe_score += (k / (f64::from(self.safe_total) + vocab)).ln();
        }
        if sensitive_score > safe_score {
            Label::Sensitive
        } else {
            Label::Safe
        }
    }
}

/// The standing exemplar corpus: health-adjacent phrasings versus everyday
/// questions.
pub fn default_corpus() -> Vec<TrainingExample> {
    let sensitive = [
        "What medication should I take for headache?",
        "I need a diagnosis for these symptoms",
        "Show me my patient records",
        "What treatment is recommended for diabetes?",
        "Are there side effects for this medicine?",
        "My doctor prescribed antibiotics",
        "I have a medical condition",
        "What does my blood test result mean?",
    ];
    let safe = [
        "What is the weather today?",
        "How do I cook pasta?",
        "Tell me about the history of France",
        "What time is it in Tokyo?",
        "Recommend a good movie",
        "How do I fix my wifi?",
        "What are good vacation spots?",
        // General wellness phrasing stays on the safe side; without these
        // the shared function words skew the feature counts sensitive.
        "Any tips for a better morning routine?",
        "What are some tips for planning a long trip?",
        "How do I get better sleep on a long flight?",
    ];
    sensitive
        .iter()
        .map(|t| TrainingExample::new(*t, Label::Sensitive))
        .chain(safe.iter().map(|t| TrainingExample::new(*t, Label::Safe)))
        .collect()
}
