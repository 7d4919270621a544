//! The evidence-to-idea pipeline: context build → synthesis → validation.
//!
//! One logical run per goal. The benchmark registry and the evidence pool
//! are immutable and shared without locking; the generative call is the only
//! blocking operation. The cancellation token is checked between stages, so
//! an aborted run never leaves partially validated ideas in the catalog.

use std::sync::Arc;
use std::time::Instant;

use lodestar_core::benchmark::Metric;
use lodestar_core::evidence::EvidenceItem;
use lodestar_core::idea::IdeaCatalog;
use lodestar_core::PipelineError;
use tracing::info;

use crate::cancel::CancellationToken;
use crate::context::{ContextBuilder, ContextBuilderConfig};
use crate::llm::backend::GenerativeBackend;
use crate::llm::models::Usage;
use crate::synthesis::{IdeaSynthesizer, RigorMode};
use crate::validate::RefinementValidator;

/// Evidence char budget multiplier for deep mode.
const DEEP_BUDGET_MULTIPLIER: usize = 2;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub goal: String,
    pub metric_hint: Option<Metric>,
    /// Upper bound on catalog size; the run returns at most this many ideas.
    pub num_ideas: usize,
    pub rigor: RigorMode,
    pub context: ContextBuilderConfig,
}

impl PipelineOptions {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            metric_hint: None,
            num_ideas: 10,
            rigor: RigorMode::Standard,
            context: ContextBuilderConfig::default(),
        }
    }
}

/// Per-run observability counters.
#[derive(Debug, Clone, Default)]
pub struct RunDiagnostics {
    pub pool_size: usize,
    pub context_size: usize,
    pub drafts: usize,
    pub validated: usize,
    pub rejected: usize,
    pub benchmark_normalizations: usize,
    pub context_build_ms: u64,
    pub synthesis_ms: u64,
    pub validation_ms: u64,
    pub usage: Option<Usage>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub catalog: IdeaCatalog,
    pub diagnostics: RunDiagnostics,
}

fn check_cancel(cancel: &CancellationToken, stage: &'static str) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled { stage });
    }
    Ok(())
}

/// Run the full pipeline for one goal.
///
/// Returns a non-empty catalog with at most `num_ideas` validated ideas, or
/// fails with one explicit reason. Idea-level rejections never abort the
/// run; they are returned in the catalog's rejection log.
pub async fn run_pipeline(
    backend: Arc<dyn GenerativeBackend>,
    pool: &[EvidenceItem],
    options: PipelineOptions,
    cancel: CancellationToken,
) -> Result<RunOutcome, PipelineError> {
    let mut diagnostics = RunDiagnostics {
        pool_size: pool.len(),
        ..Default::default()
    };

    check_cancel(&cancel, "context build")?;
    let build_start = Instant::now();
    let mut context_config = options.context.clone();
    if options.rigor == RigorMode::Deep {
        context_config.char_budget *= DEEP_BUDGET_MULTIPLIER;
    }
    let builder = ContextBuilder::new(context_config);
    let context = builder.build(&options.goal, pool, options.metric_hint)?;
    diagnostics.context_build_ms = build_start.elapsed().as_millis() as u64;
    diagnostics.context_size = context.len();
    info!(
        items = context.len(),
        pool = pool.len(),
        "evidence context built"
    );

    check_cancel(&cancel, "synthesis")?;
    let synthesis_start = Instant::now();
    let synthesizer = IdeaSynthesizer::new(backend);
    let batch = synthesizer
        .generate(
            &options.goal,
            &context,
            options.metric_hint,
            options.num_ideas,
            options.rigor,
        )
        .await?;
    diagnostics.synthesis_ms = synthesis_start.elapsed().as_millis() as u64;
    diagnostics.drafts = batch.ideas.len() + batch.discards.len();
    diagnostics.usage = batch.usage.clone();
    info!(
        drafts = batch.ideas.len(),
        discarded = batch.discards.len(),
        "synthesis complete"
    );

    check_cancel(&cancel, "validation")?;
    let validation_start = Instant::now();
    let report = RefinementValidator::new().validate(batch.ideas, &context);
    diagnostics.validation_ms = validation_start.elapsed().as_millis() as u64;
    diagnostics.validated = report.validated.len();
    diagnostics.benchmark_normalizations = report.benchmark_normalizations;

    let mut rejections = batch.discards;
    rejections.extend(report.rejections);
    diagnostics.rejected = rejections.len();
    for rejection in &rejections {
        info!(
            reason = rejection.reason.code(),
            target = %rejection.funding_target,
            "candidate rejected"
        );
    }

    if report.validated.is_empty() {
        return Err(PipelineError::NoValidIdeas {
            drafts: diagnostics.drafts,
            rejected: diagnostics.rejected,
        });
    }

    Ok(RunOutcome {
        catalog: IdeaCatalog {
            ideas: report.validated,
            rejections,
        },
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::backend::MockBackend;
    use chrono::{TimeZone, Utc};
    use lodestar_core::sources::tier_for;

    fn pool_item(source: &str, title: &str, summary: &str, url: &str) -> EvidenceItem {
        EvidenceItem {
            source_id: source.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            url: url.to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()),
            priority_tier: tier_for(source),
        }
    }

    fn health_pool() -> Vec<EvidenceItem> {
        vec![
            pool_item(
                "Open Philanthropy",
                "TB preventive therapy rollout gaps",
                "Only 40% of eligible contacts start tuberculosis therapy.",
                "https://example.org/tb",
            ),
            pool_item(
                "WHO GHO",
                "Tuberculosis incidence indicator",
                "Incidence of tuberculosis per 100 000 population.",
                "https://example.org/who-tb",
            ),
        ]
    }

    fn good_idea_response() -> String {
        r#"{"ideas": [{
            "funding_target": "Pooled procurement of TB preventive therapy",
            "mechanism": "pooled procurement",
            "metric": "DALY",
            "expected_impact_quantity": 10000,
            "cost_usd_low": 1000000,
            "cost_usd_high": 3000000,
            "verification_plan": "80% of target clinics stocked within 12 months",
            "citations": ["https://example.org/tb", "https://example.org/who-tb"]
        }]}"#
            .to_string()
    }

    #[tokio::test]
    async fn happy_path_yields_a_non_empty_catalog() {
        let backend = Arc::new(MockBackend::new().with_response(good_idea_response()));
        let outcome = run_pipeline(
            backend,
            &health_pool(),
            PipelineOptions::new("reduce tuberculosis burden"),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.catalog.len(), 1);
        assert!(outcome.catalog.len() <= 10);
        assert_eq!(outcome.diagnostics.validated, 1);
        assert_eq!(outcome.diagnostics.context_size, 2);
    }

    #[tokio::test]
    async fn waly_goal_over_health_pool_fails_before_synthesis() {
        let backend = Arc::new(MockBackend::new().with_response(good_idea_response()));
        let mut options = PipelineOptions::new("Reduce animal suffering (WALYs)");
        options.metric_hint = Some(Metric::Waly);
        let err = run_pipeline(
            backend.clone(),
            &health_pool(),
            options,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientEvidence { .. }));
        assert_eq!(backend.call_count(), 0, "synthesis must not be attempted");
    }

    #[tokio::test]
    async fn cancelled_run_surfaces_cancelled_error() {
        let backend = Arc::new(MockBackend::new().with_response(good_idea_response()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_pipeline(
            backend,
            &health_pool(),
            PipelineOptions::new("reduce tuberculosis burden"),
            cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn all_rejected_batch_is_an_explicit_failure_not_an_empty_success() {
        let clone_response = r#"{"ideas": [{
            "funding_target": "GiveWell Top Charities Fund",
            "mechanism": "direct grant",
            "metric": "DALY",
            "expected_impact_quantity": 10000,
            "cost_usd_low": 1000000,
            "cost_usd_high": 3000000,
            "verification_plan": "80% coverage within 12 months",
            "citations": ["https://example.org/tb", "https://example.org/who-tb"]
        }]}"#;
        let backend = Arc::new(MockBackend::new().with_response(clone_response));
        let err = run_pipeline(
            backend,
            &health_pool(),
            PipelineOptions::new("reduce tuberculosis burden"),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        match err {
            PipelineError::NoValidIdeas { drafts, rejected } => {
                assert_eq!(drafts, 1);
                assert_eq!(rejected, 1);
            }
            other => panic!("expected NoValidIdeas, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn catalog_citations_all_come_from_the_run_context() {
        let backend = Arc::new(MockBackend::new().with_response(good_idea_response()));
        let pool = health_pool();
        let outcome = run_pipeline(
            backend,
            &pool,
            PipelineOptions::new("reduce tuberculosis burden"),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        let pool_urls: Vec<&str> = pool.iter().map(|i| i.url.as_str()).collect();
        for idea in &outcome.catalog.ideas {
            assert!(idea.citations.len() >= 2);
            for citation in &idea.citations {
                assert!(pool_urls.contains(&citation.as_str()));
            }
        }
    }
}
