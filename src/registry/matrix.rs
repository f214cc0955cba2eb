//! Question-type to adapter confidence matrix.
//!
//! Seeded from configuration and extended when adapters register. Seeded
//! confidences are authoritative: a registration merge never overwrites an
//! existing cell.

use std::collections::BTreeMap;

use crate::analysis::QuestionType;
use crate::config::MatrixConfig;

#[derive(Debug, Default)]
pub struct ConfidenceMatrix {
    rows: BTreeMap<QuestionType, BTreeMap<String, f64>>,
}

impl ConfidenceMatrix {
    pub fn from_config(config: &MatrixConfig) -> Self {
        let mut matrix = Self::default();
        for seed in &config.seeds {
            match QuestionType::from_str(&seed.question_type) {
                Some(question_type) => {
                    matrix
                        .rows
                        .entry(question_type)
                        .or_default()
                        .insert(seed.adapter_id.clone(), seed.confidence);
                }
                None => {
                    log::warn!(
                        "[matrix] skipping seed with unknown question type '{}'",
                        seed.question_type
                    );
                }
            }
        }
        matrix
    }

    /// Adds the adapter under each of its intent tags. Existing cells win.
    pub fn merge(&mut self, adapter_id: &str, intent_tags: &[QuestionType], confidence: f64) {
        for question_type in intent_tags {
            self.rows
                .entry(*question_type)
                .or_default()
                .entry(adapter_id.to_string())
                .or_insert(confidence);
        }
    }

    /// Row entries sorted by confidence descending, adapter id ascending.
    pub fn row(&self, question_type: QuestionType) -> Vec<(String, f64)> {
        let mut entries: Vec<(String, f64)> = self
            .rows
            .get(&question_type)
            .map(|row| row.iter().map(|(id, c)| (id.clone(), *c)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        entries
    }

    pub fn confidence(&self, question_type: QuestionType, adapter_id: &str) -> Option<f64> {
        self.rows
            .get(&question_type)
            .and_then(|row| row.get(adapter_id))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatrixSeed;

    fn seeded() -> ConfidenceMatrix {
        ConfidenceMatrix::from_config(&MatrixConfig {
            default_confidence: 0.55,
            seeds: vec![
                MatrixSeed {
                    question_type: "calculation".to_string(),
                    adapter_id: "calc".to_string(),
                    confidence: 0.9,
                },
                MatrixSeed {
                    question_type: "calculation".to_string(),
                    adapter_id: "sheet".to_string(),
                    confidence: 0.7,
                },
                MatrixSeed {
                    question_type: "bogus_type".to_string(),
                    adapter_id: "ghost".to_string(),
                    confidence: 0.9,
                },
            ],
        })
    }

    #[test]
    fn rows_sort_by_confidence_then_id() {
        let matrix = seeded();
        let row = matrix.row(QuestionType::Calculation);
        assert_eq!(row[0].0, "calc");
        assert_eq!(row[1].0, "sheet");
    }

    #[test]
    fn unknown_seed_types_are_skipped() {
        let matrix = seeded();
        for question_type in QuestionType::all() {
            assert!(matrix.confidence(question_type, "ghost").is_none());
        }
    }

    #[test]
    fn merge_does_not_overwrite_seeds() {
        let mut matrix = seeded();
        matrix.merge("calc", &[QuestionType::Calculation], 0.2);
        assert_eq!(matrix.confidence(QuestionType::Calculation, "calc"), Some(0.9));

        matrix.merge("new_helper", &[QuestionType::Calculation, QuestionType::SimpleQa], 0.55);
        assert_eq!(
            matrix.confidence(QuestionType::Calculation, "new_helper"),
            Some(0.55)
        );
        assert_eq!(matrix.confidence(QuestionType::SimpleQa, "new_helper"), Some(0.55));
    }

    #[test]
    fn missing_row_is_empty() {
        let matrix = seeded();
        assert!(matrix.row(QuestionType::Automation).is_empty());
    }
}
