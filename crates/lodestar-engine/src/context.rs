//! Evidence context builder: ranks and truncates the ingested pool into a
//! char-budgeted, priority-ordered context.
//!
//! Selection is deterministic for identical inputs: no randomness, and
//! recency decay is computed against the newest item in the pool rather than
//! wall-clock time, so reruns over the same pool are byte-identical.

use chrono::{DateTime, Utc};
use lodestar_core::benchmark::Metric;
use lodestar_core::evidence::{EvidenceContext, EvidenceItem};
use lodestar_core::PipelineError;

use crate::text::{containment, tokenize};

/// Minimum number of relevant items required before synthesis may run.
const MIN_RELEVANT_ITEMS: usize = 2;

/// Per-item summary truncation when rendering the context for prompts.
const SUMMARY_RENDER_MAX_CHARS: usize = 1000;

/// Relevance weight relative to tier weight in scoring.
const RELEVANCE_WEIGHT: f64 = 2.0;

/// Recency decay half-life in days.
const RECENCY_HALF_LIFE_DAYS: f64 = 90.0;

/// Keywords that mark an item as relevant to a metric. Used only when the
/// caller supplies a metric hint.
fn metric_keywords(metric: Metric) -> &'static [&'static str] {
    match metric {
        Metric::Daly => &[
            "daly", "dalys", "disease", "health", "mortality", "malaria", "vaccine", "vaccination",
            "tuberculosis", "burden",
        ],
        Metric::Waly => &[
            "waly", "walys", "animal", "animals", "welfare", "broiler", "cage", "livestock",
            "chicken", "fish", "shrimp",
        ],
        Metric::Welby => &[
            "welby", "wellbeing", "well", "depression", "mental", "psychotherapy", "happiness",
            "anxiety",
        ],
        Metric::LogIncome => &[
            "income", "cash", "poverty", "transfer", "consumption", "earnings", "wages",
        ],
        Metric::Co2 => &[
            "co2", "carbon", "climate", "emissions", "tco2e", "removal", "methane", "warming",
        ],
    }
}

fn metric_relevant(item: &EvidenceItem, metric: Metric) -> bool {
    let haystack = format!("{} {}", item.title, item.summary).to_lowercase();
    metric_keywords(metric)
        .iter()
        .any(|kw| haystack.contains(kw))
}

#[derive(Debug, Clone)]
pub struct ContextBuilderConfig {
    /// Char budget for the rendered context.
    pub char_budget: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self { char_budget: 12_000 }
    }
}

#[derive(Debug, Clone)]
struct ScoredItem {
    /// Relevance + recency, compared within a tier only.
    score: f64,
    relevant: bool,
    item: EvidenceItem,
}

pub struct ContextBuilder {
    config: ContextBuilderConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    /// Rank the pool and select greedily under the char budget, tier-first.
    ///
    /// Returns `InsufficientEvidence` when fewer than two items are relevant
    /// to the goal (or to the hinted metric); callers must not proceed to
    /// synthesis on that condition.
    pub fn build(
        &self,
        goal: &str,
        pool: &[EvidenceItem],
        metric_hint: Option<Metric>,
    ) -> Result<EvidenceContext, PipelineError> {
        let goal_tokens = tokenize(goal);
        let newest = pool.iter().filter_map(|i| i.published_at).max();

        let mut scored: Vec<ScoredItem> = pool
            .iter()
            .map(|item| {
                let item_tokens = tokenize(&format!("{} {}", item.title, item.summary));
                let relevance = containment(&goal_tokens, &item_tokens);
                let matches_metric = metric_hint.map(|m| metric_relevant(item, m));
                // With a metric hint, relevance means "speaks to this metric";
                // otherwise any lexical overlap with the goal counts.
                let relevant = match matches_metric {
                    Some(matches) => matches,
                    None => relevance > 0.0,
                };
                let score = relevance * RELEVANCE_WEIGHT + recency_decay(item.published_at, newest);
                ScoredItem {
                    score,
                    relevant,
                    item: item.clone(),
                }
            })
            .collect();

        let relevant_count = scored.iter().filter(|s| s.relevant).count();
        if relevant_count < MIN_RELEVANT_ITEMS {
            return Err(PipelineError::insufficient_for_metric(
                metric_hint,
                relevant_count,
                MIN_RELEVANT_ITEMS,
            ));
        }

        // Irrelevant items never make the context; the budget is spent on
        // evidence that can actually ground a citation.
        scored.retain(|s| s.relevant);

        // Tier-major ordering, then score, then deterministic tie-breakers:
        // recency, source id, title.
        scored.sort_by(|a, b| {
            b.item
                .priority_tier
                .cmp(&a.item.priority_tier)
                .then_with(|| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.item.published_at.cmp(&a.item.published_at))
                .then_with(|| a.item.source_id.cmp(&b.item.source_id))
                .then_with(|| a.item.title.cmp(&b.item.title))
        });

        let mut selected: Vec<EvidenceItem> = Vec::new();
        let mut used = 0usize;
        for entry in scored {
            let rendered = render_item(&entry.item);
            if used + rendered.len() > self.config.char_budget {
                continue;
            }
            used += rendered.len();
            selected.push(entry.item);
        }

        Ok(EvidenceContext::new(selected, self.config.char_budget))
    }
}

fn recency_decay(published: Option<DateTime<Utc>>, newest: Option<DateTime<Utc>>) -> f64 {
    match (published, newest) {
        (Some(published), Some(newest)) => {
            let age_days = (newest - published).num_hours() as f64 / 24.0;
            0.5f64.powf(age_days.max(0.0) / RECENCY_HALF_LIFE_DAYS)
        }
        // Undated items neither gain nor lose from recency.
        _ => 0.0,
    }
}

fn render_item(item: &EvidenceItem) -> String {
    let summary: String = item.summary.chars().take(SUMMARY_RENDER_MAX_CHARS).collect();
    format!(
        "- [{}] {}\n  {}\n  Source: {}\n",
        item.source_id, item.title, summary, item.url
    )
}

/// Render a context for inclusion in a prompt, one bullet per item in
/// context order.
pub fn render_context(context: &EvidenceContext) -> String {
    context
        .items()
        .iter()
        .map(render_item)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lodestar_core::sources::{tier_for, SourceTier};

    fn item(source: &str, title: &str, summary: &str, url: &str, days_ago: i64) -> EvidenceItem {
        EvidenceItem {
            source_id: source.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            url: url.to_string(),
            published_at: Some(
                Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap() - chrono::Duration::days(days_ago),
            ),
            priority_tier: tier_for(source),
        }
    }

    fn health_pool() -> Vec<EvidenceItem> {
        vec![
            item(
                "Slow Boring",
                "Commentary on malaria funding",
                "Opinions about global health spending and malaria nets.",
                "https://example.org/commentary",
                1,
            ),
            item(
                "Open Philanthropy",
                "Malaria chemoprevention grant writeup",
                "Seasonal malaria chemoprevention reduces disease burden in children.",
                "https://example.org/op-grant",
                30,
            ),
            item(
                "WHO GHO",
                "Tuberculosis incidence indicator",
                "Global tuberculosis incidence per 100k population.",
                "https://example.org/who-tb",
                10,
            ),
        ]
    }

    #[test]
    fn context_is_deterministic_for_identical_inputs() {
        let builder = ContextBuilder::new(ContextBuilderConfig::default());
        let pool = health_pool();
        let a = builder
            .build("reduce malaria and tuberculosis burden", &pool, None)
            .unwrap();
        let b = builder
            .build("reduce malaria and tuberculosis burden", &pool, None)
            .unwrap();
        assert_eq!(render_context(&a), render_context(&b));
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn higher_tier_items_come_first() {
        let builder = ContextBuilder::new(ContextBuilderConfig::default());
        let pool = health_pool();
        let ctx = builder
            .build("malaria tuberculosis burden", &pool, None)
            .unwrap();
        let tiers: Vec<SourceTier> = ctx.items().iter().map(|i| i.priority_tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(tiers, sorted, "context must be tier-major ordered");
        assert_eq!(ctx.items()[0].source_id, "Open Philanthropy");
    }

    #[test]
    fn budget_truncation_keeps_priority_order() {
        let builder = ContextBuilder::new(ContextBuilderConfig { char_budget: 400 });
        let pool = health_pool();
        let ctx = builder
            .build("malaria tuberculosis burden", &pool, None)
            .unwrap();
        assert!(ctx.len() < pool.len(), "small budget must truncate");
        // The primary-tier item survives truncation.
        assert_eq!(ctx.items()[0].priority_tier, SourceTier::Primary);
    }

    #[test]
    fn waly_hint_over_health_pool_is_insufficient() {
        let builder = ContextBuilder::new(ContextBuilderConfig::default());
        let err = builder
            .build(
                "Reduce animal suffering (WALYs)",
                &health_pool(),
                Some(Metric::Waly),
            )
            .unwrap_err();
        match err {
            PipelineError::InsufficientEvidence { found, needed, .. } => {
                assert_eq!(found, 0);
                assert_eq!(needed, 2);
            }
            other => panic!("expected InsufficientEvidence, got {other:?}"),
        }
    }

    #[test]
    fn metric_hint_admits_matching_items() {
        let builder = ContextBuilder::new(ContextBuilderConfig::default());
        let mut pool = health_pool();
        pool.push(item(
            "Lewis Bollard",
            "Broiler welfare momentum",
            "Corporate broiler welfare commitments cover more animals this year.",
            "https://example.org/broiler",
            5,
        ));
        pool.push(item(
            "Rethink Priorities",
            "Shrimp welfare report",
            "Welfare ranges for farmed shrimp and other animals.",
            "https://example.org/shrimp",
            15,
        ));
        let ctx = builder
            .build("Reduce animal suffering", &pool, Some(Metric::Waly))
            .unwrap();
        assert_eq!(ctx.len(), 2);
        assert!(ctx.contains_citation("https://example.org/broiler"));
        assert!(ctx.contains_citation("https://example.org/shrimp"));
    }

    #[test]
    fn irrelevant_items_are_excluded_from_the_context() {
        let builder = ContextBuilder::new(ContextBuilderConfig::default());
        let mut pool = health_pool();
        pool.push(item(
            "Gwern",
            "Essay on spaced repetition",
            "Notes on flashcards and memory.",
            "https://example.org/srs",
            2,
        ));
        let ctx = builder
            .build("malaria tuberculosis burden", &pool, None)
            .unwrap();
        assert!(!ctx.contains_citation("https://example.org/srs"));
    }
}
