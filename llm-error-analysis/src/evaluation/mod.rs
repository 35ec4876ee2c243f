//! Automated scoring of stored provider answers
//!
//! Each non-NULL response is reduced to surface features, scored on six
//! weighted criteria, and averaged per provider to produce a ranking.
//! Per-row best and worst providers can be written back to the
//! evaluation columns.

pub mod features;
pub mod scoring;

pub use features::{extract_features, ResponseFeatures};
pub use scoring::{score_response, CriterionScores, ResponseScore, ScoreWeights};

use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

use crate::providers::is_sentinel;
use crate::store::{AnalysisRecord, AnalysisStore, Evaluation, ProviderField, StoreResult};

/// Averages for one provider across every row it answered
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderEvaluation {
    pub average_score: f64,
    pub scored_responses: usize,
    /// Responses that were error placeholders
    pub errors: usize,
    /// Mean points per criterion
    pub criteria: CriterionScores,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRank {
    pub provider: String,
    pub score: f64,
}

/// Dataset-wide evaluation result
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub evaluation_date: String,
    pub rows_evaluated: usize,
    pub weights: ScoreWeights,
    pub providers: IndexMap<String, ProviderEvaluation>,
    /// Highest average first
    pub ranking: Vec<ProviderRank>,
    pub best_llm: Option<ProviderRank>,
    pub worst_llm: Option<ProviderRank>,
}

impl EvaluationReport {
    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Best and worst provider for a single row
#[derive(Debug, Clone, PartialEq)]
pub struct RowVerdict {
    pub best: String,
    pub worst: String,
}

/// Outcome of writing verdicts back to the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBackSummary {
    pub updated: usize,
    /// Rows that already carried a best or worst label
    pub kept_manual: usize,
    /// Fewer than two answers, or every answer tied
    pub undecided: usize,
}

/// Scores responses with a fixed set of weights
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    weights: ScoreWeights,
}

impl Evaluator {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score one stored field. `None` when the provider was never asked.
    pub fn score_field(&self, field: &ProviderField) -> Option<ResponseScore> {
        let text = field.response.as_deref()?;
        let features = extract_features(Some(text));
        Some(score_response(
            &features,
            field.response_time_ms,
            is_sentinel(text),
            &self.weights,
        ))
    }

    /// Scores for every provider that has a response on this row
    pub fn score_record(&self, record: &AnalysisRecord) -> IndexMap<String, ResponseScore> {
        record
            .providers
            .iter()
            .filter_map(|(name, field)| self.score_field(field).map(|score| (name.clone(), score)))
            .collect()
    }

    /// Highest and lowest scoring providers on a row. Ties resolve to the
    /// earlier column.
    pub fn verdict(&self, record: &AnalysisRecord) -> Option<RowVerdict> {
        let scores = self.score_record(record);
        if scores.len() < 2 {
            return None;
        }

        let mut best: Option<(&String, f64)> = None;
        let mut worst: Option<(&String, f64)> = None;
        for (name, score) in &scores {
            if best.map_or(true, |(_, top)| score.total > top) {
                best = Some((name, score.total));
            }
            if worst.map_or(true, |(_, bottom)| score.total < bottom) {
                worst = Some((name, score.total));
            }
        }

        match (best, worst) {
            (Some((best, top)), Some((worst, bottom))) if top > bottom => Some(RowVerdict {
                best: best.clone(),
                worst: worst.clone(),
            }),
            _ => None,
        }
    }

    pub fn evaluate_records(&self, records: &[AnalysisRecord]) -> EvaluationReport {
        let mut totals: IndexMap<String, (f64, CriterionScores, usize, usize)> = IndexMap::new();

        for record in records {
            for (name, field) in &record.providers {
                let Some(score) = self.score_field(field) else {
                    continue;
                };
                let entry = totals
                    .entry(name.clone())
                    .or_insert_with(|| (0.0, CriterionScores::default(), 0, 0));
                entry.0 += score.total;
                entry.1.add(&score.criteria);
                entry.2 += 1;
                if score.criteria.reliability == 0.0 {
                    entry.3 += 1;
                }
            }
        }

        let providers: IndexMap<String, ProviderEvaluation> = totals
            .into_iter()
            .map(|(name, (sum, criteria, count, errors))| {
                let evaluation = ProviderEvaluation {
                    average_score: sum / count as f64,
                    scored_responses: count,
                    errors,
                    criteria: criteria.divided_by(count),
                };
                (name, evaluation)
            })
            .collect();

        let mut ranking: Vec<ProviderRank> = providers
            .iter()
            .map(|(name, evaluation)| ProviderRank {
                provider: name.clone(),
                score: evaluation.average_score,
            })
            .collect();
        ranking.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::info!(
            "Evaluated {} rows across {} providers",
            records.len(),
            providers.len()
        );

        EvaluationReport {
            evaluation_date: chrono::Utc::now().to_rfc3339(),
            rows_evaluated: records.len(),
            weights: self.weights.clone(),
            best_llm: ranking.first().cloned(),
            worst_llm: ranking.last().cloned(),
            providers,
            ranking,
        }
    }

    pub fn evaluate_store(&self, store: &dyn AnalysisStore) -> StoreResult<EvaluationReport> {
        let records = store.list_all()?;
        Ok(self.evaluate_records(&records))
    }

    /// Write per-row verdicts to `best_llm` and `worst_llm`. Rows with an
    /// existing label are left alone unless `overwrite` is set.
    pub fn apply_verdicts(&self, store: &dyn AnalysisStore, overwrite: bool) -> StoreResult<WriteBackSummary> {
        let mut summary = WriteBackSummary::default();

        for record in store.list_all()? {
            let labelled = record.evaluation.best_llm.is_some() || record.evaluation.worst_llm.is_some();
            if labelled && !overwrite {
                summary.kept_manual += 1;
                continue;
            }

            let Some(verdict) = self.verdict(&record) else {
                summary.undecided += 1;
                continue;
            };

            tracing::debug!(
                "Row {}: best {}, worst {}",
                record.id,
                verdict.best,
                verdict.worst
            );
            let evaluation = Evaluation {
                best_llm: Some(verdict.best),
                worst_llm: Some(verdict.worst),
                ..Default::default()
            };
            if store.update_evaluation(record.id, &evaluation)?.is_some() {
                summary.updated += 1;
            }
        }

        tracing::info!(
            "Verdicts written to {} rows ({} kept, {} undecided)",
            summary.updated,
            summary.kept_manual,
            summary.undecided
        );
        Ok(summary)
    }
}
