//! The Idea entity, its validation lifecycle, and the run catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::benchmark::{BenchmarkEntry, Metric};
use crate::botec::Botec;
use crate::error::RejectionReason;

/// Expected impact in the idea's own metric. Never converted across metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedImpact {
    pub metric: Metric,
    /// Quantity in the metric's native unit (DALYs averted, WALYs, tCO2e...).
    pub quantity: f64,
}

/// Estimated cost in USD. Generators may state a range; a point estimate is
/// stored as low == high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub low_usd: f64,
    pub high_usd: f64,
}

impl CostEstimate {
    pub fn point(usd: f64) -> Self {
        Self {
            low_usd: usd,
            high_usd: usd,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.low_usd + self.high_usd) / 2.0
    }
}

/// Who could execute the idea: named candidates with a fit score, or an
/// archetype description with no score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Doers {
    Named { candidates: Vec<ScoredDoer> },
    Archetype { description: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoer {
    pub name: String,
    /// Fit score in 0.0-1.0.
    pub score: f64,
}

/// Validation lifecycle. Created `Draft`; only the refinement validator
/// moves an idea to a terminal state, and terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum IdeaStatus {
    #[default]
    Draft,
    Validated,
    Rejected { reason: RejectionReason },
}

impl IdeaStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IdeaStatus::Draft)
    }
}

/// A benchmark-anchored funding idea: fund X via mechanism Y, expect impact
/// Z at cost C, yielding cost-effectiveness vs. benchmark B.
///
/// Owned exclusively by the pipeline until validated, then read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: Uuid,
    pub funding_target: String,
    pub mechanism: String,
    pub expected_impact: ExpectedImpact,
    pub cost: CostEstimate,
    /// Normalized by the validator to the registry's entry for the metric;
    /// the generator's choice is never trusted.
    pub benchmark: BenchmarkEntry,
    /// USD per native metric unit, framed against the benchmark range.
    #[serde(default)]
    pub cost_effectiveness_ratio: Option<f64>,
    #[serde(default)]
    pub botec: Option<Botec>,
    /// Must state an independently checkable pass/fail criterion.
    pub verification_plan: String,
    #[serde(default)]
    pub doers: Option<Doers>,
    #[serde(default)]
    pub novelty_rationale: Option<String>,
    /// Citation keys (URLs) of supporting evidence; at least two, all drawn
    /// from the context the idea was generated against.
    pub citations: Vec<String>,
    pub status: IdeaStatus,
    pub created_at: DateTime<Utc>,
}

impl Idea {
    /// Mark validated. Only the validator calls this, and only from `Draft`.
    pub fn validated(mut self) -> Self {
        debug_assert!(!self.status.is_terminal());
        self.status = IdeaStatus::Validated;
        self
    }

    /// Mark rejected with a reason. Only the validator calls this.
    pub fn rejected(mut self, reason: RejectionReason) -> Self {
        debug_assert!(!self.status.is_terminal());
        self.status = IdeaStatus::Rejected { reason };
        self
    }
}

/// A rejection retained for observability, excluded from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub idea_id: Uuid,
    pub funding_target: String,
    pub reason: RejectionReason,
    /// Human-readable detail ("cites https://... outside context").
    pub note: String,
}

/// Validated ideas for one run, in validation order, plus the rejections
/// observed along the way. Not persisted across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdeaCatalog {
    pub ideas: Vec<Idea>,
    pub rejections: Vec<RejectionRecord>,
}

impl IdeaCatalog {
    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::BenchmarkRegistry;

    pub(crate) fn draft_idea(metric: Metric) -> Idea {
        Idea {
            id: Uuid::new_v4(),
            funding_target: "Regional TB preventive therapy rollout".to_string(),
            mechanism: "pooled procurement".to_string(),
            expected_impact: ExpectedImpact {
                metric,
                quantity: 10_000.0,
            },
            cost: CostEstimate::point(2_000_000.0),
            benchmark: BenchmarkRegistry::global().lookup(metric).clone(),
            cost_effectiveness_ratio: None,
            botec: None,
            verification_plan: "90% of enrolled clinics report within 12 months".to_string(),
            doers: None,
            novelty_rationale: None,
            citations: vec![
                "https://example.org/a".to_string(),
                "https://example.org/b".to_string(),
            ],
            status: IdeaStatus::Draft,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_transitions_reach_terminal_states() {
        let idea = draft_idea(Metric::Daly);
        assert!(!idea.status.is_terminal());
        let validated = idea.clone().validated();
        assert_eq!(validated.status, IdeaStatus::Validated);
        let rejected = idea.rejected(RejectionReason::BenchmarkClone);
        assert_eq!(
            rejected.status,
            IdeaStatus::Rejected {
                reason: RejectionReason::BenchmarkClone
            }
        );
    }

    #[test]
    fn idea_serializes_losslessly() {
        let idea = draft_idea(Metric::Waly).validated();
        let json = serde_json::to_string(&idea).unwrap();
        let round: Idea = serde_json::from_str(&json).unwrap();
        assert_eq!(round.funding_target, idea.funding_target);
        assert_eq!(round.status, IdeaStatus::Validated);
        assert_eq!(round.citations.len(), 2);
        assert_eq!(round.benchmark, idea.benchmark);
    }

    #[test]
    fn optional_fields_deserialize_when_absent() {
        let idea = draft_idea(Metric::Daly);
        let mut value = serde_json::to_value(&idea).unwrap();
        if let serde_json::Value::Object(map) = &mut value {
            map.remove("botec");
            map.remove("doers");
            map.remove("novelty_rationale");
            map.remove("cost_effectiveness_ratio");
        }
        let round: Idea = serde_json::from_value(value).unwrap();
        assert!(round.botec.is_none());
        assert!(round.doers.is_none());
    }
}
