//! Fixed source whitelist and its tier ranking.
//!
//! An evidence item's priority tier derives from this table and nothing
//! else; ingestion adapters may add sources only by editing the whitelist.

/// Priority tier of a whitelisted source. Ordering matters: contexts are
/// filled tier-first, so `Primary` evidence is never displaced by
/// `Commentary` under budget pressure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Not on the whitelist at all. Kept ingestable but ranked last.
    Unlisted,
    /// Blogs and commentary.
    Commentary,
    /// Data repositories and preprint servers.
    Data,
    /// Primary research organizations.
    Primary,
}

impl SourceTier {
    /// Scoring weight used by the context builder.
    pub fn weight(&self) -> f64 {
        match self {
            SourceTier::Primary => 3.0,
            SourceTier::Data => 2.0,
            SourceTier::Commentary => 1.0,
            SourceTier::Unlisted => 0.25,
        }
    }
}

/// The whitelist: source id → tier. Source ids are the names the ingestion
/// adapters stamp on items.
const SOURCE_WHITELIST: &[(&str, SourceTier)] = &[
    // Primary research orgs
    ("Open Philanthropy", SourceTier::Primary),
    ("Rethink Priorities", SourceTier::Primary),
    ("GiveWell", SourceTier::Primary),
    ("Animal Charity Evaluators", SourceTier::Primary),
    ("Wild Animal Initiative", SourceTier::Primary),
    ("CGD", SourceTier::Primary),
    ("IHME", SourceTier::Primary),
    // Data repositories / preprint servers
    ("WHO GHO", SourceTier::Data),
    ("GHDx GBD", SourceTier::Data),
    ("Our World in Data", SourceTier::Data),
    ("arXiv", SourceTier::Data),
    ("biorxiv", SourceTier::Data),
    ("medrxiv", SourceTier::Data),
    ("Crossref", SourceTier::Data),
    // Commentary
    ("EA Forum", SourceTier::Commentary),
    ("Astral Codex Ten", SourceTier::Commentary),
    ("Slow Boring", SourceTier::Commentary),
    ("Marginal Revolution", SourceTier::Commentary),
    ("Asterisk Magazine", SourceTier::Commentary),
    ("Statecraft", SourceTier::Commentary),
    ("Asimov Press", SourceTier::Commentary),
    ("Brian Potter", SourceTier::Commentary),
    ("Dwarkesh Patel", SourceTier::Commentary),
    ("Lewis Bollard", SourceTier::Commentary),
    ("Gwern", SourceTier::Commentary),
    ("Matt Clancy (New Things Under the Sun)", SourceTier::Commentary),
    ("Sarah Constantin", SourceTier::Commentary),
    ("Jacob Trefethen", SourceTier::Commentary),
    ("Lant Pritchett", SourceTier::Commentary),
];

/// Tier for a source id. Unknown sources rank below every whitelisted tier.
pub fn tier_for(source_id: &str) -> SourceTier {
    SOURCE_WHITELIST
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(source_id))
        .map(|(_, tier)| *tier)
        .unwrap_or(SourceTier::Unlisted)
}

/// All whitelisted source ids, in table order.
pub fn whitelisted_sources() -> impl Iterator<Item = &'static str> {
    SOURCE_WHITELIST.iter().map(|(name, _)| *name)
}
