// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic response selection. An ordered keyword table maps a query
//! to canned response text; the first entry with any case-insensitive
//! substring match wins, and a fixed general-purpose fallback covers the
//! rest. The table is configuration data so a deployment can replace it (or
//! the whole path, via the daemon's backend seam) without touching the
//! pipeline.

use crate::record::ResponseArtifact;
use serde::{Deserialize, Serialize};

/// Token-count overhead for a matched knowledge-base response, standing in
/// for prompt and formatting tokens.
pub const KB_TOKEN_OVERHEAD: u32 = 40;
/// Token-count overhead for the fallback response.
pub const FALLBACK_TOKEN_OVERHEAD: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbEntry {
    pub keywords: Vec<String>,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    entries: Vec<KbEntry>,
    fallback: String,
    source_tag: String,
}

impl KnowledgeBase {
    pub fn new(
        entries: Vec<KbEntry>,
        fallback: impl Into<String>,
        source_tag: impl Into<String>,
    ) -> Self {
        Self {
            entries,
            fallback: fallback.into(),
            source_tag: source_tag.into(),
        }
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    /// First matching entry wins; ties are broken by table order, which is
    /// why the table is a Vec and not a map.
    pub fn respond(&self, query: &str) -> ResponseArtifact {
        let query_lower = query.to_lowercase();
        for entry in &self.entries {
            if entry
                .keywords
                .iter()
                .any(|k| query_lower.contains(&k.to_lowercase()))
            {
                return ResponseArtifact::new(
                    entry.response.clone(),
                    self.source_tag.clone(),
                    KB_TOKEN_OVERHEAD,
                );
            }
        }
        ResponseArtifact::new(
            self.fallback.clone(),
            self.source_tag.clone(),
            FALLBACK_TOKEN_OVERHEAD,
        )
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        let entry = |keywords: &[&str], response: &str| KbEntry {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            response: response.to_string(),
        };
        let entries = vec![
            entry(
                &["cold", "common cold", "sneeze", "runny nose"],
                "Common symptoms of the common cold include a runny or stuffy nose, sore \
                 throat, coughing, sneezing, mild headache, and sometimes a low-grade fever. \
                 Symptoms typically develop 1-3 days after exposure and last 7-10 days. \
                 Treatment focuses on rest, hydration, and over-the-counter symptom relief; \
                 antibiotics are not effective against viral infections like the common cold.",
            ),
            entry(
                &["headache", "migraine", "head pain", "head ache"],
                "Headaches can have many causes, including tension or stress, migraines, \
                 dehydration, lack of sleep, eye strain, and sinus congestion. Common \
                 treatments include rest, hydration, over-the-counter pain relievers, and \
                 stress management. For recurrent or severe headaches, consult a healthcare \
                 provider to determine the underlying cause.",
            ),
            entry(
                &["exercise", "workout", "physical activity", "fitness"],
                "Regular exercise improves cardiovascular health, strengthens muscles and \
                 bones, supports weight management, and benefits mental health and sleep. \
                 Adults should aim for at least 150 minutes of moderate-intensity aerobic \
                 activity per week plus muscle-strengthening activity on 2 or more days. \
                 Start slowly and increase intensity gradually if you have been inactive.",
            ),
            entry(
                &["diabetes", "blood sugar", "insulin"],
                "Diabetes is a chronic condition that affects how your body turns food into \
                 energy; the main types are Type 1, Type 2, and gestational. Common symptoms \
                 include increased thirst and urination, extreme hunger, unexplained weight \
                 loss, fatigue, and blurred vision. Management involves monitoring blood \
                 sugar, medications or insulin as prescribed, a healthy diet, and regular \
                 activity, with routine check-ups from healthcare providers.",
            ),
            entry(
                &["blood pressure", "hypertension"],
                "Blood pressure is the force of blood against artery walls; untreated high \
                 blood pressure can cause serious problems. Normal is typically below 120/80 \
                 mm Hg, with hypertension generally defined at or above 130/80 mm Hg. \
                 Regular activity, a healthy weight, limited sodium and alcohol, not \
                 smoking, and stress management all help; medication may be prescribed when \
                 lifestyle changes are not sufficient.",
            ),
            entry(
                &["covid", "coronavirus", "covid-19"],
                "COVID-19 is caused by the SARS-CoV-2 virus. Common symptoms include fever \
                 or chills, cough, shortness of breath, fatigue, body aches, headache, new \
                 loss of taste or smell, sore throat, and congestion, appearing 2-14 days \
                 after exposure. Follow current public health guidance for testing and \
                 isolation; vaccines help prevent severe illness.",
            ),
            entry(
                &["vitamin", "mineral", "supplement"],
                "Vitamins and minerals are essential nutrients needed in small amounts; \
                 most people can get them through a balanced diet. Key ones include vitamin \
                 A for vision, B vitamins for energy, vitamin C and zinc for immune \
                 function, vitamin D and calcium for bones, and iron for oxygen transport. \
                 Supplements should not replace a healthy diet; consult a healthcare \
                 provider before starting any regimen.",
            ),
            entry(
                &["sleep", "insomnia", "sleepless", "trouble sleeping"],
                "Quality sleep is essential for good health; adults generally need 7-9 \
                 hours per night. Helpful habits include a consistent schedule, a dark and \
                 quiet environment, limiting screens before bed, avoiding caffeine and \
                 large meals late, and regular physical activity. Chronic trouble sleeping \
                 is worth discussing with a healthcare provider.",
            ),
            entry(
                &["stomach", "stomach ache", "stomachache", "abdominal pain"],
                "Stomach aches range from indigestion, gas, constipation, stress, or \
                 stomach viruses to more serious conditions. For mild discomfort: rest, \
                 clear fluids, over-the-counter antacids, a heating pad, and bland foods \
                 when returning to solids. Seek medical attention for severe pain, \
                 persistent vomiting, fever, blood in stool, or pain concentrated in the \
                 lower right abdomen.",
            ),
            entry(
                &["diet", "weight loss", "nutrition", "healthy eating"],
                "A healthy diet emphasizes fruits, vegetables, whole grains, and lean \
                 proteins while limiting processed foods, added sugars, and unhealthy \
                 fats. For sustainable weight management, prefer gradual changes, a \
                 moderate calorie deficit, and regular physical activity; individual \
                 needs vary with age, sex, activity level, and health status.",
            ),
        ];
        let fallback = "Health is influenced by many factors including genetics, lifestyle \
                        choices, environment, and access to healthcare. Key components of \
                        overall wellness include a balanced diet, regular physical activity, \
                        adequate sleep, stress management, preventive care, avoiding tobacco, \
                        limiting alcohol, and staying hydrated. If you have specific health \
                        concerns, consult a qualified healthcare professional for \
                        personalized guidance."
            .to_string();
        Self::new(entries, fallback, "llama-2-7b-healthcare-kb")
    }
}
