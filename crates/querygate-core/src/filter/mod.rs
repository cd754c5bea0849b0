// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered sensitivity filter: an ordered chain of independently testable
//! rules, evaluated first-match-wins. Priority is fixed by chain order:
//! named-entity, then structured patterns, then the term dictionary, then
//! the statistical classifier.

pub mod classifier;
pub mod lexicon;
pub mod names;
pub mod patterns;

use crate::error::QueryGateResult;
use crate::record::{FilterVerdict, RuleTag};
use classifier::{BayesClassifier, Label, TrainingExample};
use lexicon::TermLexicon;
use names::NameDetector;
use patterns::PatternRule;

/// One stage of the chain. Each variant returns a verdict or passes.
#[derive(Debug, Clone)]
pub enum FilterRule {
    NamedEntity(NameDetector),
    Pattern(PatternRule),
    Dictionary(TermLexicon),
    Classifier {
        model: BayesClassifier,
        /// Log-only mode: the stage reports but never blocks.
        advisory: bool,
    },
}

impl FilterRule {
    fn evaluate(&self, text: &str) -> Option<FilterVerdict> {
        match self {
            FilterRule::NamedEntity(detector) => detector.detect(text).map(|name| {
                FilterVerdict::blocked(
                    format!("contains personal name: \"{name}\""),
                    RuleTag::NamedEntity,
                )
            }),
            FilterRule::Pattern(rule) => rule.matches(text).then(|| {
                FilterVerdict::blocked(
                    format!("{} ({})", rule.reason, rule.category),
                    RuleTag::Pattern,
                )
            }),
            FilterRule::Dictionary(lexicon) => lexicon.find_term(text).map(|(term, category)| {
                FilterVerdict::blocked(
                    format!(
                        "contains sensitive {} term: \"{term}\"",
                        category.as_str().replace('_', " ")
                    ),
                    RuleTag::Dictionary,
                )
            }),
            FilterRule::Classifier { model, advisory } => {
                if model.classify(text) != Label::Sensitive {
                    return None;
                }
                if *advisory {
                    tracing::info!(
                        target: "querygate.filter",
                        "classifier flagged query in advisory mode, not blocking"
                    );
                    return None;
                }
                Some(FilterVerdict::blocked(
                    "classified as potentially containing sensitive information",
                    RuleTag::Classifier,
                ))
            }
        }
    }

    fn tag(&self) -> RuleTag {
        match self {
            FilterRule::NamedEntity(_) => RuleTag::NamedEntity,
            FilterRule::Pattern(_) => RuleTag::Pattern,
            FilterRule::Dictionary(_) => RuleTag::Dictionary,
            FilterRule::Classifier { .. } => RuleTag::Classifier,
        }
    }
}

/// The composed chain. Immutable after construction and safe to share
/// across concurrent pipeline instances.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    rules: Vec<FilterRule>,
}

impl FilterEngine {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// Standard chain: default name list, built-in pattern table, built-in
    /// lexicon, classifier trained on the provided corpus.
    pub fn standard(
        lexicon: TermLexicon,
        corpus: &[TrainingExample],
        classifier_advisory: bool,
    ) -> QueryGateResult<Self> {
        Self::standard_with(
            NameDetector::with_default_names()?,
            lexicon,
            patterns::default_rules()?,
            corpus,
            classifier_advisory,
        )
    }

    /// Standard priority order over caller-supplied tables, for deployments
    /// that load rule data from config files. Every table is a parameter;
    /// none of the stages falls back to built-in data here.
    pub fn standard_with(
        names: NameDetector,
        lexicon: TermLexicon,
        pattern_rules: Vec<PatternRule>,
        corpus: &[TrainingExample],
        classifier_advisory: bool,
    ) -> QueryGateResult<Self> {
        let mut rules = vec![FilterRule::NamedEntity(names)];
        rules.extend(pattern_rules.into_iter().map(FilterRule::Pattern));
        rules.push(FilterRule::Dictionary(lexicon));
        rules.push(FilterRule::Classifier {
            model: BayesClassifier::train(corpus),
            advisory: classifier_advisory,
        });
        Ok(Self::new(rules))
    }

    pub fn with_defaults() -> QueryGateResult<Self> {
        Self::standard(TermLexicon::default(), &classifier::default_corpus(), false)
    }

    /// Runs the chain, short-circuiting on the first block.
    pub fn classify(&self, text: &str) -> FilterVerdict {
        for rule in &self.rules {
            if let Some(verdict) = rule.evaluate(text) {
                tracing::debug!(
                    target: "querygate.filter",
                    rule = rule.tag().as_str(),
                    reason = %verdict.reason,
                    "query blocked"
                );
                return verdict;
            }
        }
        FilterVerdict::allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::classifier::default_corpus;
    use std::collections::BTreeMap;

    fn engine() -> FilterEngine {
        FilterEngine::with_defaults().unwrap()
    }

    #[test]
    fn medication_query_blocks_on_medical_term() {
        let verdict = engine().classify("What medication should I take for headache?");
        assert!(!verdict.allowed);
        assert!(verdict.reason.contains("medication") || verdict.reason.contains("headache"));
    }

    #[test]
    fn weather_query_is_allowed() {
        let verdict = engine().classify("What is the weather today?");
        assert!(verdict.allowed);
        assert!(verdict.matched_rule.is_none());
    }

    #[test]
    fn blood_type_blocks_with_pattern_tag() {
        let verdict = engine().classify("my blood type is AB+");
        assert!(!verdict.allowed);
        assert_eq!(verdict.matched_rule, Some(RuleTag::Pattern));
        assert!(verdict.reason.contains("blood type"));
    }

    #[test]
    fn name_outranks_dictionary() {
        // "maria" and "surgery" both match; the name stage runs first.
        let verdict = engine().classify("tell maria about the surgery");
        assert_eq!(verdict.matched_rule, Some(RuleTag::NamedEntity));
    }

    #[test]
    fn pattern_outranks_dictionary() {
        // "blood" is a dictionary term, but the blood-type pattern wins.
        let verdict = engine().classify("my blood type is O-");
        assert_eq!(verdict.matched_rule, Some(RuleTag::Pattern));
    }

    #[test]
    fn dictionary_outranks_classifier() {
        let verdict = engine().classify("is diabetes hereditary");
        assert_eq!(verdict.matched_rule, Some(RuleTag::Dictionary));
        assert!(verdict.reason.contains("diabetes"));
    }

    #[test]
    fn classifier_catches_phrasing_without_exact_terms() {
        // No dictionary token, no pattern; only the classifier can flag it.
        let verdict = engine().classify("show me records for what was prescribed");
        assert!(!verdict.allowed);
        assert_eq!(verdict.matched_rule, Some(RuleTag::Classifier));
    }

    #[test]
    fn advisory_classifier_reports_but_allows() {
        let blocking =
            FilterEngine::standard(TermLexicon::new(BTreeMap::new()), &default_corpus(), false)
                .unwrap();
        let advisory =
            FilterEngine::standard(TermLexicon::new(BTreeMap::new()), &default_corpus(), true)
                .unwrap();
        let text = "show me records for what was prescribed";
        assert!(!blocking.classify(text).allowed);
        assert!(advisory.classify(text).allowed);
    }

    #[test]
    fn punctuation_only_query_is_allowed() {
        let verdict = engine().classify("?!");
        assert!(verdict.allowed);
    }

    #[test]
    fn name_list_is_replaced_like_any_other_table() {
        let detector = NameDetector::new(["zorin".to_string()]).unwrap();
        let engine = FilterEngine::standard_with(
            detector,
            TermLexicon::new(BTreeMap::new()),
            Vec::new(),
            &default_corpus(),
            false,
        )
        .unwrap();
        let verdict = engine.classify("send this to zorin please");
        assert_eq!(verdict.matched_rule, Some(RuleTag::NamedEntity));
        // The built-in list no longer applies once a table is supplied.
        assert!(engine.classify("tell maria the plan").allowed);
    }

    #[test]
    fn synthetic_rule_tables_are_swappable() {
        let mut by_category = BTreeMap::new();
        by_category.insert(
            lexicon::TermCategory::General,
            vec!["flurble".to_string()],
        );
        let engine = FilterEngine::new(vec![FilterRule::Dictionary(TermLexicon::new(
            by_category,
        ))]);
        assert!(!engine.classify("what is a flurble").allowed);
        assert!(engine.classify("what is diabetes").allowed);
    }
}
