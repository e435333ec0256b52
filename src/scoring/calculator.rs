//! Response Variable Calculator
//!
//! Runs after execution. Local variables are computed first for every
//! successful result; external variables follow one at a time, each in its
//! own `response-variable-scoring` progress stage. Nothing here runs
//! concurrently, and a failed value is replaced by the variable's sentinel
//! instead of aborting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{local, ExternalScorer, MetricValue, NoExternalScorer, ResponseVariable};
use crate::execution::{
    AnalysisData, ModelProgress, ProgressSink, ProgressSnapshot, ProgressStage, ScoringProgress,
};

/// Per-variable counters of a scoring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringSummary {
    /// Counters in scoring order (local variables first)
    pub variables: Vec<ScoringProgress>,
}

impl ScoringSummary {
    /// Values replaced by a sentinel across all variables.
    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.variables.iter().map(|v| v.failed).sum()
    }

    /// Counters for one variable.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&ScoringProgress> {
        self.variables.iter().find(|v| v.variable == name)
    }
}

/// Applies every configured response variable to every successful result.
#[derive(Debug)]
pub struct ResponseVariableCalculator<S> {
    scorer: Option<Arc<S>>,
}

impl ResponseVariableCalculator<NoExternalScorer> {
    /// Calculator without an external scorer; external variables get sentinels.
    #[must_use]
    pub const fn local_only() -> Self {
        Self { scorer: None }
    }
}

impl<S: ExternalScorer> ResponseVariableCalculator<S> {
    /// Calculator delegating external variables to `scorer`.
    #[must_use]
    pub fn new(scorer: S) -> Self {
        Self {
            scorer: Some(Arc::new(scorer)),
        }
    }

    /// Calculator over a scorer shared with other components.
    #[must_use]
    pub const fn with_shared(scorer: Arc<S>) -> Self {
        Self {
            scorer: Some(scorer),
        }
    }

    /// Score every successful result of `data` in place.
    pub async fn score(&self, data: &mut AnalysisData, sink: &dyn ProgressSink) -> ScoringSummary {
        let variables = data.config.response_variables.clone();
        let (external, local): (Vec<&ResponseVariable>, Vec<&ResponseVariable>) =
            variables.iter().partition(|v| v.function().is_external());
        let mut summary = ScoringSummary::default();
        let total = data.successful().count();

        for variable in local {
            let mut counters = ScoringProgress {
                variable: variable.name().to_string(),
                total,
                completed: 0,
                failed: 0,
            };
            for result in data.results.iter_mut().filter(|r| r.is_success()) {
                let value = match local::compute(
                    variable.name(),
                    variable.function(),
                    result.response_text(),
                ) {
                    Ok(value) => {
                        counters.completed += 1;
                        value
                    }
                    Err(e) => {
                        warn!(variable = variable.name(), error = %e, "local scoring failed");
                        counters.failed += 1;
                        variable.sentinel()
                    }
                };
                result.set_value(variable.name(), value);
            }
            summary.variables.push(counters);
        }

        let mut snapshot = scoring_snapshot(&data.progress);
        for variable in external {
            info!(variable = variable.name(), results = total, "scoring external variable");
            let mut counters = ScoringProgress {
                variable: variable.name().to_string(),
                total,
                completed: 0,
                failed: 0,
            };
            snapshot.scoring = Some(counters.clone());
            sink.on_progress(&snapshot);

            for result in data.results.iter_mut().filter(|r| r.is_success()) {
                let value = match self.score_external(variable, result.response_text()).await {
                    Some(value) => {
                        counters.completed += 1;
                        value
                    }
                    None => {
                        counters.failed += 1;
                        variable.sentinel()
                    }
                };
                result.set_value(variable.name(), value);

                snapshot.scoring = Some(counters.clone());
                sink.on_progress(&snapshot);
            }
            summary.variables.push(counters);
        }

        summary
    }

    async fn score_external(&self, variable: &ResponseVariable, text: &str) -> Option<MetricValue> {
        let Some(scorer) = &self.scorer else {
            warn!(variable = variable.name(), "no external scorer configured");
            return None;
        };
        match scorer
            .score(variable.function(), text, variable.config())
            .await
        {
            Ok(MetricValue::Number(n)) if !n.is_finite() => {
                warn!(variable = variable.name(), value = n, "external scorer returned a non-finite number");
                None
            }
            Ok(value) => Some(value),
            Err(e) => {
                warn!(variable = variable.name(), error = %e, "external scoring failed");
                None
            }
        }
    }
}

fn scoring_snapshot(progress: &[ModelProgress]) -> ProgressSnapshot {
    ProgressSnapshot {
        stage: ProgressStage::ResponseVariableScoring,
        total: progress.iter().map(ModelProgress::total).sum(),
        completed: progress.iter().map(ModelProgress::completed).sum(),
        failed: progress.iter().map(ModelProgress::failed).sum(),
        models: progress
            .iter()
            .map(|p| (p.model().to_string(), p.clone()))
            .collect(),
        scoring: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExperimentConfig, Model};
    use crate::design::Combination;
    use crate::execution::{ExecutionResult, NoopProgressSink};
    use crate::scoring::{ScoringFunction, CATEGORY_SENTINEL};
    use crate::{Error, Result};
    use chrono::Utc;
    use std::sync::Mutex;

    struct LengthParity;

    impl ExternalScorer for LengthParity {
        async fn score(
            &self,
            _function: &ScoringFunction,
            response_text: &str,
            _config: Option<&serde_json::Value>,
        ) -> Result<MetricValue> {
            if response_text.contains("fail") {
                return Err(Error::Other("scorer unavailable".to_string()));
            }
            let label = if response_text.len() % 2 == 0 { "even" } else { "odd" };
            Ok(MetricValue::Category(label.to_string()))
        }
    }

    fn data(variables: Vec<ResponseVariable>, texts: &[&str]) -> AnalysisData {
        let mut builder = ExperimentConfig::builder().model(Model::new("m", "echo"));
        for variable in variables {
            builder = builder.response_variable(variable);
        }
        let mut results: Vec<ExecutionResult> = texts
            .iter()
            .map(|t| ExecutionResult::success("m", Combination::empty(), 0, "p", *t))
            .collect();
        results.push(ExecutionResult::failure("m", Combination::empty(), 0, "p", "boom"));

        let mut progress = ModelProgress::new("m", texts.len() + 1);
        for _ in texts {
            progress.record_success();
        }
        progress.record_failure();

        AnalysisData {
            config: builder.build(),
            results,
            progress: vec![progress],
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
        }
    }

    #[tokio::test]
    async fn test_local_variables_skip_failed_results() {
        let mut data = data(
            vec![ResponseVariable::new("words", ScoringFunction::WordCount)],
            &["one two", "three"],
        );

        let summary = ResponseVariableCalculator::local_only()
            .score(&mut data, &NoopProgressSink)
            .await;

        assert_eq!(data.results[0].value("words"), Some(&MetricValue::Number(2.0)));
        assert_eq!(data.results[1].value("words"), Some(&MetricValue::Number(1.0)));
        assert!(data.results[2].value("words").is_none());
        assert_eq!(summary.total_failed(), 0);
    }

    #[tokio::test]
    async fn test_invalid_local_parameters_use_sentinel() {
        let mut data = data(
            vec![ResponseVariable::new(
                "hits",
                ScoringFunction::KeywordCount {
                    keyword: String::new(),
                },
            )],
            &["anything"],
        );

        let summary = ResponseVariableCalculator::local_only()
            .score(&mut data, &NoopProgressSink)
            .await;

        assert_eq!(data.results[0].value("hits"), Some(&MetricValue::Number(0.0)));
        assert_eq!(summary.variable("hits").unwrap().failed, 1);
    }

    #[tokio::test]
    async fn test_external_failures_are_sentineled_and_reported() {
        let mut data = data(
            vec![
                ResponseVariable::new("parity", ScoringFunction::Sentiment),
                ResponseVariable::new("words", ScoringFunction::WordCount),
            ],
            &["ab", "fail", "abc"],
        );
        let seen = Mutex::new(Vec::new());
        let sink = |s: &ProgressSnapshot| seen.lock().unwrap().push(s.clone());

        let summary = ResponseVariableCalculator::new(LengthParity)
            .score(&mut data, &sink)
            .await;

        assert_eq!(data.results[0].value("parity").unwrap().label(), "even");
        assert_eq!(data.results[1].value("parity").unwrap().label(), CATEGORY_SENTINEL);
        assert_eq!(data.results[2].value("parity").unwrap().label(), "odd");

        // local variables are scored before external ones
        assert_eq!(summary.variables[0].variable, "words");
        let parity = summary.variable("parity").unwrap();
        assert_eq!((parity.completed, parity.failed), (2, 1));

        let snapshots = seen.lock().unwrap();
        assert_eq!(snapshots.len(), 4);
        assert!(snapshots
            .iter()
            .all(|s| s.stage == ProgressStage::ResponseVariableScoring));
        assert_eq!(snapshots[3].scoring.as_ref().unwrap().failed, 1);
        assert_eq!(snapshots[3].completed, 3);
    }

    #[tokio::test]
    async fn test_missing_scorer_sentinels_external_variables() {
        let mut data = data(
            vec![ResponseVariable::new(
                "quality",
                ScoringFunction::Rating {
                    criteria: "clarity".to_string(),
                },
            )],
            &["text"],
        );

        let summary = ResponseVariableCalculator::local_only()
            .score(&mut data, &NoopProgressSink)
            .await;

        assert_eq!(data.results[0].value("quality"), Some(&MetricValue::Number(0.0)));
        assert_eq!(summary.total_failed(), 1);
    }
}
