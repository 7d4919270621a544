//! Pipeline error taxonomy.
//!
//! Stage-level failures abort the whole run; idea-level failures only remove
//! that one candidate and are recorded with a reason code.

use crate::benchmark::Metric;

/// Stage-level pipeline errors. Any of these aborts the run with one
/// explicit reason — a run never returns a silent empty success.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Not enough relevant evidence to build a context for the requested
    /// goal/metric. Recoverable: the caller may broaden the goal or sources.
    #[error("insufficient evidence: {found} relevant item(s) for {scope}, need at least {needed}")]
    InsufficientEvidence {
        scope: String,
        found: usize,
        needed: usize,
    },

    /// The generative backend was unavailable or kept returning malformed
    /// structure after bounded retries. Partial results are discarded.
    #[error("synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    /// The run was cancelled between pipeline stages.
    #[error("run cancelled during {stage}")]
    Cancelled { stage: &'static str },

    /// Every candidate was rejected. Surfaced explicitly so a run never
    /// ends in a silent empty success.
    #[error("no candidate survived validation ({drafts} draft(s), {rejected} rejection(s))")]
    NoValidIdeas { drafts: usize, rejected: usize },
}

/// Per-idea rejection reasons. These never abort a run; the candidate is
/// dropped and the reason retained for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// A required field was missing or ill-typed, or a citation pointed
    /// outside the supplied evidence context.
    SchemaViolation,
    /// The idea restates the benchmark intervention for its metric.
    BenchmarkClone,
    /// A backfillable field had no supporting material in the evidence
    /// context, or the verification plan stated no pass/fail criterion.
    InsufficientSupport,
    /// The declared metric is outside the closed metric set.
    UnknownMetric,
}

impl RejectionReason {
    /// Stable reason code for logs and exports.
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::SchemaViolation => "schema_violation",
            RejectionReason::BenchmarkClone => "benchmark_clone",
            RejectionReason::InsufficientSupport => "insufficient_support",
            RejectionReason::UnknownMetric => "unknown_metric",
        }
    }
}

/// Lookup failure for a metric outside the closed enum. Fatal to the idea
/// that carried it, never to the process.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown metric: {raw:?}")]
pub struct UnknownMetricError {
    pub raw: String,
}

impl PipelineError {
    pub fn insufficient_for_metric(metric: Option<Metric>, found: usize, needed: usize) -> Self {
        let scope = match metric {
            Some(m) => format!("metric {}", m.tag()),
            None => "the goal".to_string(),
        };
        PipelineError::InsufficientEvidence {
            scope,
            found,
            needed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reason_codes_are_distinct() {
        let codes = [
            RejectionReason::SchemaViolation.code(),
            RejectionReason::BenchmarkClone.code(),
            RejectionReason::InsufficientSupport.code(),
            RejectionReason::UnknownMetric.code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn insufficient_evidence_message_names_the_metric() {
        let err = PipelineError::insufficient_for_metric(Some(Metric::Waly), 1, 2);
        let msg = err.to_string();
        assert!(msg.contains("WALY"));
        assert!(msg.contains("1 relevant item"));
    }
}
