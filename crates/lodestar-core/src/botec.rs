//! Back-of-the-envelope calculations attached to ideas.

use serde::{Deserialize, Serialize};

/// Discount schedule applied to long-horizon effects: none up to 50 years,
/// 2% per year thereafter.
pub const DISCOUNT_UP_TO_50Y: f64 = 0.0;
pub const DISCOUNT_BEYOND_50Y: f64 = 0.02;

/// Where an assumption's value comes from.
///
/// Values that are not directly computable must cite an evidence item from
/// the context the idea was generated against — assumptions never originate
/// outside that context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ref")]
pub enum AssumptionSource {
    /// Cites an evidence item by its citation key (URL).
    Evidence(String),
    /// A benchmark reference-range bound; directly computable from the
    /// registry, so no citation is required.
    Registry,
}

/// One named parameter of a BOTEC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    pub name: String,
    pub value: f64,
    pub source: AssumptionSource,
}

/// A light cost-effectiveness sketch: explicit assumptions, a symbolic
/// formula over them, a point estimate, and a sensitivity range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Botec {
    pub assumptions: Vec<Assumption>,
    /// Symbolic expression over assumption names, e.g. "cost / impact".
    pub formula: String,
    pub point_estimate: f64,
    pub sensitivity_range: (f64, f64),
}

impl Botec {
    /// Citation keys of every evidence-sourced assumption.
    pub fn cited_evidence(&self) -> impl Iterator<Item = &str> {
        self.assumptions.iter().filter_map(|a| match &a.source {
            AssumptionSource::Evidence(key) => Some(key.as_str()),
            AssumptionSource::Registry => None,
        })
    }

    /// Whether every evidence-sourced assumption cites a member of `keys`.
    pub fn grounded_in(&self, keys: &std::collections::HashSet<&str>) -> bool {
        self.cited_evidence().all(|key| keys.contains(key))
    }
}
