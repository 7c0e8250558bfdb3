//! Ranking of candidate models on a holdout window

use crate::diagnostics::ResidualDiagnostics;
use crate::error::Result;
use crate::metrics::{ErrorMetrics, RankingMetric};
use crate::models::{ForecastResult, ModelFamily, ModelSpec};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

/// Holdout results of a model that trained and forecast successfully
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub metrics: ErrorMetrics,
    /// Holdout forecast, with months attached
    pub forecast: ForecastResult,
    /// In-sample one-step predictions over the training window
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub diagnostics: Option<ResidualDiagnostics>,
    pub parameter_count: usize,
}

/// Outcome of evaluating one candidate
#[derive(Debug, Clone)]
pub enum EvaluationStatus {
    Evaluated(Box<ModelFit>),
    Failed(String),
}

/// One candidate's entry in the comparison
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub label: String,
    pub spec: ModelSpec,
    pub exogenous: bool,
    pub status: EvaluationStatus,
}

impl ModelEvaluation {
    pub fn family(&self) -> ModelFamily {
        self.spec.family()
    }

    pub fn metrics(&self) -> Option<&ErrorMetrics> {
        self.fit().map(|fit| &fit.metrics)
    }

    pub fn fit(&self) -> Option<&ModelFit> {
        match &self.status {
            EvaluationStatus::Evaluated(fit) => Some(fit.as_ref()),
            EvaluationStatus::Failed(_) => None,
        }
    }

    /// Failure reason, when the candidate could not be evaluated
    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            EvaluationStatus::Evaluated(_) => None,
            EvaluationStatus::Failed(reason) => Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.fit().is_some()
    }
}

/// Candidates ordered best-first by a ranking metric
#[derive(Debug, Clone)]
pub struct ModelComparison {
    metric: RankingMetric,
    ranked: Vec<ModelEvaluation>,
    failed: Vec<ModelEvaluation>,
}

/// NaN sorts after every number
fn compare_values(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Ranking metric first, then the remaining metrics, then the label
fn compare_evaluations(metric: RankingMetric, a: &ModelEvaluation, b: &ModelEvaluation) -> Ordering {
    match (a.metrics(), b.metrics()) {
        (Some(ma), Some(mb)) => {
            let tie_breaks = RankingMetric::ALL.into_iter().filter(|m| *m != metric);
            std::iter::once(metric)
                .chain(tie_breaks)
                .map(|m| compare_values(ma.get(m), mb.get(m)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        }
        _ => a.label.cmp(&b.label),
    }
}

impl ModelComparison {
    /// Rank `evaluations`; failed candidates are kept aside in input order
    pub fn new(evaluations: Vec<ModelEvaluation>, metric: RankingMetric) -> Self {
        let (mut ranked, failed): (Vec<_>, Vec<_>) =
            evaluations.into_iter().partition(|e| e.is_success());
        ranked.sort_by(|a, b| compare_evaluations(metric, a, b));
        Self {
            metric,
            ranked,
            failed,
        }
    }

    pub fn metric(&self) -> RankingMetric {
        self.metric
    }

    /// Successful candidates, best first
    pub fn ranked(&self) -> &[ModelEvaluation] {
        &self.ranked
    }

    pub fn failures(&self) -> &[ModelEvaluation] {
        &self.failed
    }

    pub fn best(&self) -> Option<&ModelEvaluation> {
        self.ranked.first()
    }

    /// 1-based rank of a label, if it was evaluated
    pub fn rank_of(&self, label: &str) -> Option<usize> {
        self.ranked.iter().position(|e| e.label == label).map(|i| i + 1)
    }

    /// Write one row per candidate, failures last with empty metrics
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for (i, evaluation) in self.ranked.iter().enumerate() {
            writer.serialize(ComparisonRow::new(Some(i + 1), evaluation))?;
        }
        for evaluation in &self.failed {
            writer.serialize(ComparisonRow::new(None, evaluation))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ComparisonRow<'a> {
    rank: Option<usize>,
    model: &'a str,
    family: String,
    exogenous: bool,
    rmse: Option<f64>,
    mae: Option<f64>,
    mape: Option<f64>,
    smape: Option<f64>,
    ljung_box_p: Option<f64>,
    error: Option<&'a str>,
}

impl<'a> ComparisonRow<'a> {
    fn new(rank: Option<usize>, evaluation: &'a ModelEvaluation) -> Self {
        let metrics = evaluation.metrics();
        Self {
            rank,
            model: &evaluation.label,
            family: evaluation.family().to_string(),
            exogenous: evaluation.exogenous,
            rmse: metrics.map(|m| m.rmse),
            mae: metrics.map(|m| m.mae),
            mape: metrics.map(|m| m.mape),
            smape: metrics.map(|m| m.smape),
            ljung_box_p: evaluation
                .fit()
                .and_then(|fit| fit.diagnostics.as_ref())
                .and_then(|d| d.ljung_box)
                .map(|test| test.p_value),
            error: evaluation.failure(),
        }
    }
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model comparison (ranked by {}):", self.metric)?;
        writeln!(
            f,
            "{:<4} {:<28} {:>10} {:>10} {:>9} {:>9}",
            "Rank", "Model", "RMSE", "MAE", "MAPE%", "LB p"
        )?;
        for (i, evaluation) in self.ranked.iter().enumerate() {
            if let Some(fit) = evaluation.fit() {
                let p_value = fit
                    .diagnostics
                    .as_ref()
                    .and_then(|d| d.ljung_box)
                    .map(|test| format!("{:.3}", test.p_value))
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    f,
                    "{:<4} {:<28} {:>10.4} {:>10.4} {:>9.3} {:>9}",
                    i + 1,
                    evaluation.label,
                    fit.metrics.rmse,
                    fit.metrics.mae,
                    fit.metrics.mape,
                    p_value
                )?;
            }
        }
        for evaluation in &self.failed {
            writeln!(
                f,
                "  failed: {} ({})",
                evaluation.label,
                evaluation.failure().unwrap_or("unknown error")
            )?;
        }
        Ok(())
    }
}
