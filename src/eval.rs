//! Evaluation harness.
//!
//! Scores a RAG pipeline on a JSON test set of questions (optionally
//! with ground-truth answers and reference contexts). The harness runs a
//! caller-supplied answer-producing function per case, then delegates
//! every judgment to the configured [`Generator`] — the judge model
//! replies with an integer 0–100 which is normalized to `[0, 1]`.
//!
//! Metrics:
//!
//! | Metric | Judged question |
//! |--------|-----------------|
//! | `faithfulness` | Is the answer supported by the retrieved contexts? |
//! | `answer-relevancy` | Does the answer address the question? |
//! | `context-relevancy` | Do the retrieved contexts pertain to the question? |
//! | `correctness` | Does the answer agree with the ground truth? |
//!
//! A metric is skipped for a case that lacks its inputs (no contexts, no
//! ground truth); means are taken over the cases that were scored.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use tracing::debug;

use rag_harness_core::llm::{GenerationRequest, Generator};

/// One test case: a question, optionally with the expected answer and
/// reference contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub question: String,
    #[serde(default)]
    pub ground_truth: Option<String>,
    #[serde(default)]
    pub contexts: Option<Vec<String>>,
}

/// What the answer-producing function returns for one case.
#[derive(Debug, Clone)]
pub struct CaseAnswer {
    pub answer: String,
    /// Contexts actually retrieved while answering.
    pub contexts: Vec<String>,
}

/// Per-case scores, keyed by metric name.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub question: String,
    pub answer: String,
    pub scores: BTreeMap<String, f32>,
}

/// Full evaluation output: per-case results and per-metric means.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub cases: Vec<CaseResult>,
    pub means: BTreeMap<String, f32>,
}

/// The judged quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Faithfulness,
    AnswerRelevancy,
    ContextRelevancy,
    Correctness,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Faithfulness,
        Metric::AnswerRelevancy,
        Metric::ContextRelevancy,
        Metric::Correctness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Faithfulness => "faithfulness",
            Metric::AnswerRelevancy => "answer-relevancy",
            Metric::ContextRelevancy => "context-relevancy",
            Metric::Correctness => "correctness",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Load a JSON test set (an array of [`TestCase`]) from disk.
pub fn load_test_set(path: &Path) -> Result<Vec<TestCase>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test set: {}", path.display()))?;
    let cases: Vec<TestCase> =
        serde_json::from_str(&content).with_context(|| "Failed to parse test set JSON")?;
    Ok(cases)
}

/// LLM-judged pipeline evaluator.
pub struct Evaluator<'a> {
    judge: &'a dyn Generator,
    metrics: Vec<Metric>,
}

impl<'a> Evaluator<'a> {
    /// Evaluator scoring all metrics.
    pub fn new(judge: &'a dyn Generator) -> Self {
        Self {
            judge,
            metrics: Metric::ALL.to_vec(),
        }
    }

    /// Restrict scoring to the given metrics.
    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run `answer_fn` over every case and judge the results.
    pub async fn evaluate<F, Fut>(
        &self,
        cases: &[TestCase],
        mut answer_fn: F,
    ) -> Result<EvalReport>
    where
        F: FnMut(&TestCase) -> Fut,
        Fut: Future<Output = Result<CaseAnswer>>,
    {
        let mut results = Vec::with_capacity(cases.len());

        for case in cases {
            let produced = answer_fn(case).await?;
            // Prefer the contexts the pipeline actually used; fall back
            // to the reference contexts shipped with the case.
            let contexts: &[String] = if !produced.contexts.is_empty() {
                &produced.contexts
            } else {
                case.contexts.as_deref().unwrap_or(&[])
            };

            let mut scores = BTreeMap::new();
            for metric in &self.metrics {
                let prompt = match judge_prompt(*metric, case, &produced.answer, contexts) {
                    Some(p) => p,
                    None => continue,
                };
                let reply = self.judge.generate(&prompt).await?;
                let score = parse_score(&reply)?;
                debug!(metric = metric.name(), score, "judged case");
                scores.insert(metric.name().to_string(), score);
            }

            results.push(CaseResult {
                question: case.question.clone(),
                answer: produced.answer,
                scores,
            });
        }

        let means = metric_means(&results);
        Ok(EvalReport {
            cases: results,
            means,
        })
    }
}

/// Per-metric mean over the cases that carry the metric.
fn metric_means(cases: &[CaseResult]) -> BTreeMap<String, f32> {
    let mut sums: BTreeMap<String, (f32, usize)> = BTreeMap::new();
    for case in cases {
        for (metric, score) in &case.scores {
            let entry = sums.entry(metric.clone()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(metric, (sum, count))| (metric, sum / count as f32))
        .collect()
}

/// Build the judge request for one metric, or `None` when the case
/// lacks the metric's inputs.
fn judge_prompt(
    metric: Metric,
    case: &TestCase,
    answer: &str,
    contexts: &[String],
) -> Option<GenerationRequest> {
    let numbered = |texts: &[String]| {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| format!("[{}] {}", i + 1, t.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let prompt = match metric {
        Metric::Faithfulness => {
            if contexts.is_empty() {
                return None;
            }
            format!(
                "Rate from 0 to 100 how well the answer is supported by the context. \
                 100 means every claim in the answer appears in the context; \
                 0 means the answer is unsupported.\n\n\
                 Context:\n{}\n\nAnswer: {}",
                numbered(contexts),
                answer
            )
        }
        Metric::AnswerRelevancy => format!(
            "Rate from 0 to 100 how directly the answer addresses the question. \
             100 means fully on point; 0 means unrelated or evasive.\n\n\
             Question: {}\n\nAnswer: {}",
            case.question, answer
        ),
        Metric::ContextRelevancy => {
            if contexts.is_empty() {
                return None;
            }
            format!(
                "Rate from 0 to 100 how relevant the retrieved context is to the question. \
                 100 means every passage helps answer it; 0 means none do.\n\n\
                 Question: {}\n\nContext:\n{}",
                case.question,
                numbered(contexts)
            )
        }
        Metric::Correctness => {
            let ground_truth = case.ground_truth.as_deref()?;
            format!(
                "Rate from 0 to 100 how well the answer agrees with the reference answer. \
                 100 means factually equivalent; 0 means contradictory or wrong.\n\n\
                 Question: {}\n\nReference answer: {}\n\nAnswer: {}",
                case.question, ground_truth, answer
            )
        }
    };

    Some(GenerationRequest {
        prompt,
        system: Some(
            "You are an impartial evaluation judge. \
             Reply with a single integer between 0 and 100 and nothing else."
                .to_string(),
        ),
        temperature: Some(0.0),
        max_tokens: Some(8),
    })
}

/// Parse the judge's reply into a score in `[0, 1]`.
///
/// Accepts the first run of ASCII digits in the reply; anything without
/// one, or above 100, is an error rather than a guess.
fn parse_score(reply: &str) -> Result<f32> {
    let digits: String = reply
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        bail!("Judge reply contained no score: {:?}", reply);
    }
    let value: u32 = digits.parse()?;
    if value > 100 {
        bail!("Judge score out of range: {}", value);
    }
    Ok(value as f32 / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedJudge(&'static str);

    #[async_trait]
    impl Generator for FixedJudge {
        fn model_name(&self) -> &str {
            "fixed"
        }
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn case(question: &str, ground_truth: Option<&str>) -> TestCase {
        TestCase {
            question: question.to_string(),
            ground_truth: ground_truth.map(|s| s.to_string()),
            contexts: None,
        }
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("85").unwrap(), 0.85);
        assert_eq!(parse_score("Score: 100").unwrap(), 1.0);
        assert_eq!(parse_score(" 0 ").unwrap(), 0.0);
        assert!(parse_score("no number here").is_err());
        assert!(parse_score("250").is_err());
    }

    #[test]
    fn test_correctness_requires_ground_truth() {
        let without = case("q", None);
        assert!(judge_prompt(Metric::Correctness, &without, "a", &[]).is_none());
        let with = case("q", Some("truth"));
        assert!(judge_prompt(Metric::Correctness, &with, "a", &[]).is_some());
    }

    #[test]
    fn test_context_metrics_require_contexts() {
        let c = case("q", None);
        assert!(judge_prompt(Metric::Faithfulness, &c, "a", &[]).is_none());
        assert!(judge_prompt(Metric::ContextRelevancy, &c, "a", &[]).is_none());
        let contexts = vec!["some context".to_string()];
        assert!(judge_prompt(Metric::Faithfulness, &c, "a", &contexts).is_some());
    }

    #[tokio::test]
    async fn test_evaluate_aggregates_means() {
        let judge = FixedJudge("80");
        let evaluator = Evaluator::new(&judge);
        let cases = vec![
            case("q1", Some("gt1")),
            case("q2", Some("gt2")),
        ];

        let report = evaluator
            .evaluate(&cases, |c| {
                let question = c.question.clone();
                async move {
                    Ok(CaseAnswer {
                        answer: format!("answer to {}", question),
                        contexts: vec!["ctx".to_string()],
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(report.cases.len(), 2);
        for metric in Metric::ALL {
            let mean = report.means.get(metric.name()).copied().unwrap();
            assert!((mean - 0.8).abs() < 1e-6, "metric {} mean {}", metric, mean);
        }
    }

    #[tokio::test]
    async fn test_unparseable_judge_reply_is_an_error() {
        let judge = FixedJudge("I cannot rate this");
        let evaluator = Evaluator::new(&judge).with_metrics(vec![Metric::AnswerRelevancy]);
        let cases = vec![case("q", None)];
        let result = evaluator
            .evaluate(&cases, |_| async {
                Ok(CaseAnswer {
                    answer: "a".to_string(),
                    contexts: Vec::new(),
                })
            })
            .await;
        assert!(result.is_err());
    }
}
