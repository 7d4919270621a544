//! Evidence items and the budgeted context handed to synthesis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::sources::SourceTier;

/// One normalized source item. Immutable once ingested: created by the
/// ingestion adapter, consumed read-only by the context builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Whitelist source id (e.g. "Open Philanthropy", "arXiv").
    pub source_id: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub priority_tier: SourceTier,
}

impl EvidenceItem {
    /// Stable key for citation membership checks. Items are deduplicated by
    /// URL at ingestion, so the URL identifies an item within a run.
    pub fn citation_key(&self) -> &str {
        &self.url
    }
}

/// An ordered, budget-bound selection of evidence items.
///
/// Ordering invariant: once the budget forces truncation, a higher-tier item
/// never appears after a lower-tier one (priority-first greedy selection,
/// ties broken by recency). Shared read-only by synthesis and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceContext {
    items: Vec<EvidenceItem>,
    /// Char budget the selection was made under.
    pub char_budget: usize,
}

impl EvidenceContext {
    /// Build from an already-selected ordering. Callers are expected to have
    /// applied the tier-first invariant; this is the context builder's job.
    pub fn new(items: Vec<EvidenceItem>, char_budget: usize) -> Self {
        Self { items, char_budget }
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a citation (by URL) refers to a member of this context.
    pub fn contains_citation(&self, url: &str) -> bool {
        self.items.iter().any(|i| i.citation_key() == url)
    }

    /// All citation keys, for leakage checks.
    pub fn citation_keys(&self) -> HashSet<&str> {
        self.items.iter().map(|i| i.citation_key()).collect()
    }

    /// Highest tier present, if any. Used in diagnostics.
    pub fn top_tier(&self) -> Option<SourceTier> {
        self.items.iter().map(|i| i.priority_tier).max()
    }
}
