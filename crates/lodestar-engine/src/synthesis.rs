//! Idea synthesis: one constrained generative request per pass, bounded
//! retries with backoff, and typed conversion of the raw batch into draft
//! ideas.
//!
//! Candidates that cannot even be typed (unknown metric, missing numbers)
//! are discarded with a reason code at the conversion boundary; everything
//! else is the refinement validator's job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lodestar_core::benchmark::{BenchmarkRegistry, Metric};
use lodestar_core::botec::{Assumption, AssumptionSource, Botec};
use lodestar_core::evidence::EvidenceContext;
use lodestar_core::idea::{
    CostEstimate, Doers, ExpectedImpact, Idea, IdeaStatus, RejectionRecord, ScoredDoer,
};
use lodestar_core::{PipelineError, RejectionReason};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::render_context;
use crate::llm::backend::{CompletionRequest, GenerativeBackend};
use crate::llm::models::{merge_usage, Usage, SYNTHESIS_MAX_TOKENS};
use crate::llm::parse::{parse_idea_batch, BotecJson, DoersJson, IdeaJson};
use crate::llm::prompts::{synthesis_system, synthesis_user};

/// Retries per generative request (transport failures and malformed
/// structure alike), with exponential backoff between attempts.
const GENERATION_RETRIES: u32 = 2;
const RETRY_BACKOFF_MS: u64 = 1_500;

/// Generation temperature per rigor mode.
const STANDARD_TEMPERATURE: f64 = 0.6;
const DEEP_TEMPERATURE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigorMode {
    /// Single generation pass.
    Standard,
    /// Adds a second, stricter pass at lower temperature over a larger
    /// evidence budget, trading latency/cost for precision.
    Deep,
}

impl RigorMode {
    pub fn temperature(&self) -> f64 {
        match self {
            RigorMode::Standard => STANDARD_TEMPERATURE,
            RigorMode::Deep => DEEP_TEMPERATURE,
        }
    }
}

/// Draft ideas plus candidates discarded at the typing boundary.
#[derive(Debug)]
pub struct DraftBatch {
    pub ideas: Vec<Idea>,
    pub discards: Vec<RejectionRecord>,
    pub usage: Option<Usage>,
}

pub struct IdeaSynthesizer {
    backend: Arc<dyn GenerativeBackend>,
}

impl IdeaSynthesizer {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Generate draft ideas for a goal against an evidence context.
    ///
    /// Fails with `SynthesisUnavailable` when the backend stays unavailable
    /// or keeps returning malformed structure after bounded retries; partial
    /// results are discarded rather than silently truncated.
    pub async fn generate(
        &self,
        goal: &str,
        context: &EvidenceContext,
        metric_hint: Option<Metric>,
        num_ideas: usize,
        rigor: RigorMode,
    ) -> Result<DraftBatch, PipelineError> {
        let rendered = render_context(context);

        let first = self
            .generate_pass(goal, &rendered, metric_hint, num_ideas, RigorMode::Standard)
            .await?;

        let mut batch = if rigor == RigorMode::Deep {
            // Second, stricter pass. Its output replaces the first pass; the
            // first pass only seeds candidate directions.
            let seeds: Vec<String> = first
                .ideas
                .iter()
                .map(|idea| idea.funding_target.clone())
                .take(num_ideas)
                .collect();
            let goal_with_seeds = if seeds.is_empty() {
                goal.to_string()
            } else {
                format!(
                    "{goal}\n\nCandidate directions from a first pass (rework or discard freely):\n{}",
                    seeds
                        .iter()
                        .map(|s| format!("- {s}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            };
            let mut second = self
                .generate_pass(
                    &goal_with_seeds,
                    &rendered,
                    metric_hint,
                    num_ideas,
                    RigorMode::Deep,
                )
                .await?;
            second.usage = merge_usage(first.usage, second.usage);
            second
        } else {
            first
        };

        batch.ideas.truncate(num_ideas);
        Ok(batch)
    }

    /// One generative pass: request, parse, type. Retries the whole
    /// request on retryable transport errors and on malformed structure.
    async fn generate_pass(
        &self,
        goal: &str,
        rendered_context: &str,
        metric_hint: Option<Metric>,
        num_ideas: usize,
        rigor: RigorMode,
    ) -> Result<DraftBatch, PipelineError> {
        let request = CompletionRequest {
            system: synthesis_system(rigor),
            user: synthesis_user(goal, num_ideas, metric_hint, rendered_context),
            temperature: rigor.temperature(),
            max_tokens: SYNTHESIS_MAX_TOKENS,
        };

        let mut attempt = 0u32;
        let mut last_err = String::new();
        while attempt <= GENERATION_RETRIES {
            if attempt > 0 {
                let backoff = RETRY_BACKOFF_MS * (1u64 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            attempt += 1;

            let response = match self.backend.complete(request.clone()).await {
                Ok(response) => response,
                Err(err) if err.is_retryable() => {
                    warn!(attempt, error = %err, "generative request failed, will retry");
                    last_err = err.to_string();
                    continue;
                }
                Err(err) => {
                    return Err(PipelineError::SynthesisUnavailable(err.to_string()));
                }
            };

            match parse_idea_batch(&response.content) {
                Ok(raw) => {
                    debug!(candidates = raw.len(), "parsed idea batch");
                    let (ideas, discards) = type_candidates_with_discards(raw);
                    return Ok(DraftBatch {
                        ideas,
                        discards,
                        usage: response.usage,
                    });
                }
                Err(err) => {
                    warn!(attempt, error = %err, "malformed idea batch, will retry");
                    last_err = err.to_string();
                }
            }
        }

        Err(PipelineError::SynthesisUnavailable(format!(
            "no well-formed idea batch after {} attempts: {}",
            GENERATION_RETRIES + 1,
            last_err
        )))
    }
}

/// Convert raw candidates into typed draft ideas. Candidates that cannot be
/// represented at all are returned as rejection records instead of ideas.
pub(crate) fn type_candidates_with_discards(
    raw: Vec<IdeaJson>,
) -> (Vec<Idea>, Vec<RejectionRecord>) {
    let registry = BenchmarkRegistry::global();
    let mut ideas = Vec::new();
    let mut discards = Vec::new();

    for candidate in raw {
        let id = Uuid::new_v4();
        let metric = match Metric::parse(&candidate.metric) {
            Ok(metric) => metric,
            Err(err) => {
                discards.push(RejectionRecord {
                    idea_id: id,
                    funding_target: candidate.funding_target.clone(),
                    reason: RejectionReason::UnknownMetric,
                    note: err.to_string(),
                });
                continue;
            }
        };
        let quantity = candidate.expected_impact_quantity.unwrap_or(0.0);
        let cost = match (candidate.cost_usd_low, candidate.cost_usd_high) {
            (Some(low), Some(high)) => CostEstimate {
                low_usd: low.min(high),
                high_usd: low.max(high),
            },
            (Some(point), None) | (None, Some(point)) => CostEstimate::point(point),
            (None, None) => {
                discards.push(RejectionRecord {
                    idea_id: id,
                    funding_target: candidate.funding_target.clone(),
                    reason: RejectionReason::SchemaViolation,
                    note: "no cost estimate".to_string(),
                });
                continue;
            }
        };

        // The generator's declared benchmark is represented as-is when it
        // names any known family (even the wrong one); the validator
        // normalizes it. An unrecognized name maps to the metric's family.
        let benchmark = candidate
            .benchmark_name
            .as_deref()
            .and_then(|name| registry.entry_by_name(name))
            .unwrap_or_else(|| registry.lookup(metric))
            .clone();

        ideas.push(Idea {
            id,
            funding_target: candidate.funding_target,
            mechanism: candidate.mechanism,
            expected_impact: ExpectedImpact { metric, quantity },
            cost,
            benchmark,
            cost_effectiveness_ratio: candidate.cost_effectiveness_ratio,
            botec: candidate.botec.map(type_botec),
            verification_plan: candidate.verification_plan,
            doers: candidate.doers.map(type_doers),
            novelty_rationale: candidate.novelty_rationale,
            citations: candidate.citations,
            status: IdeaStatus::Draft,
            created_at: Utc::now(),
        });
    }

    (ideas, discards)
}

fn type_botec(raw: BotecJson) -> Botec {
    Botec {
        assumptions: raw
            .assumptions
            .into_iter()
            .map(|a| Assumption {
                name: a.name,
                value: a.value.unwrap_or(0.0),
                source: match a.source_url {
                    Some(url) => AssumptionSource::Evidence(url),
                    None => AssumptionSource::Registry,
                },
            })
            .collect(),
        formula: raw.formula,
        point_estimate: raw.point_estimate.unwrap_or(0.0),
        sensitivity_range: raw.sensitivity_range.unwrap_or((0.0, 0.0)),
    }
}

fn type_doers(raw: DoersJson) -> Doers {
    match raw {
        DoersJson::Named(candidates) => Doers::Named {
            candidates: candidates
                .into_iter()
                .map(|d| ScoredDoer {
                    name: d.name,
                    score: d.score.unwrap_or(0.0).clamp(0.0, 1.0),
                })
                .collect(),
        },
        DoersJson::Archetype(description) => Doers::Archetype { description },
    }
}
