//! File-based evidence ingestion.
//!
//! Network connectors live outside the core; this adapter reads the records
//! they produce (a JSON array or JSON Lines file of metadata-only items),
//! normalizes them into `EvidenceItem`s, derives each item's tier from the
//! fixed whitelist, and deduplicates by URL. Items with unparseable URLs are
//! dropped rather than ingested half-formed.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use lodestar_core::evidence::EvidenceItem;
use lodestar_core::sources::tier_for;
use serde::Deserialize;
use tracing::warn;

/// Raw record shape produced by the source connectors. `source` and
/// `published` are the connectors' historical field names; `source_id` and
/// `published_at` are accepted as aliases.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "source_id")]
    source: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    summary: String,
    #[serde(default, alias = "published_at")]
    published: Option<String>,
}

/// Parse connector timestamps: RFC 3339 first, then bare dates.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    // Bare years show up in Crossref-style records.
    if let Ok(year) = raw.trim().parse::<i32>() {
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
    }
    None
}

fn normalize(record: RawRecord) -> Option<EvidenceItem> {
    let url = record.url.trim();
    if url::Url::parse(url).is_err() {
        warn!(url, source = %record.source, "dropping item with unparseable URL");
        return None;
    }
    Some(EvidenceItem {
        priority_tier: tier_for(&record.source),
        source_id: record.source,
        title: record.title.trim().to_string(),
        summary: record.summary.trim().to_string(),
        url: url.to_string(),
        published_at: record.published.as_deref().and_then(parse_published),
    })
}

/// Parse evidence records from file contents: a JSON array, or JSON Lines.
fn parse_records(content: &str) -> anyhow::Result<Vec<RawRecord>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }
    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(line)
            .map_err(|e| anyhow::anyhow!("line {}: {}", line_no + 1, e))?;
        records.push(record);
    }
    Ok(records)
}

/// Load an evidence pool from a file, normalized and deduplicated by URL.
/// The first occurrence of a URL wins; order is otherwise preserved.
pub fn load_evidence_pool(path: &Path) -> anyhow::Result<Vec<EvidenceItem>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    let records = parse_records(&content)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut pool = Vec::new();
    for record in records {
        if let Some(item) = normalize(record) {
            if seen.insert(item.url.clone()) {
                pool.push(item);
            }
        }
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::sources::SourceTier;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_json_array_and_derives_tiers() {
        let file = write_temp(
            r#"[
                {"source": "Open Philanthropy", "title": "Grant", "url": "https://example.org/a", "summary": "s", "published": "2026-01-15"},
                {"source": "Some Blog", "title": "Post", "url": "https://example.org/b", "summary": "s"}
            ]"#,
        );
        let pool = load_evidence_pool(file.path()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].priority_tier, SourceTier::Primary);
        assert_eq!(pool[1].priority_tier, SourceTier::Unlisted);
        assert!(pool[0].published_at.is_some());
    }

    #[test]
    fn loads_json_lines() {
        let file = write_temp(concat!(
            r#"{"source": "arXiv", "title": "Paper", "url": "https://example.org/p", "published": "2026-02-01T10:00:00Z"}"#,
            "\n",
            r#"{"source": "WHO GHO", "title": "Indicator", "url": "https://example.org/q"}"#,
            "\n"
        ));
        let pool = load_evidence_pool(file.path()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].priority_tier, SourceTier::Data);
    }

    #[test]
    fn deduplicates_by_url_keeping_first() {
        let file = write_temp(
            r#"[
                {"source": "GiveWell", "title": "First", "url": "https://example.org/a"},
                {"source": "GiveWell", "title": "Second", "url": "https://example.org/a"}
            ]"#,
        );
        let pool = load_evidence_pool(file.path()).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].title, "First");
    }

    #[test]
    fn drops_items_with_invalid_urls() {
        let file = write_temp(
            r#"[
                {"source": "GiveWell", "title": "Bad", "url": "not a url"},
                {"source": "GiveWell", "title": "Good", "url": "https://example.org/a"}
            ]"#,
        );
        let pool = load_evidence_pool(file.path()).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].title, "Good");
    }

    #[test]
    fn accepts_source_id_and_published_at_aliases() {
        let file = write_temp(
            r#"[{"source_id": "Crossref", "title": "Work", "url": "https://example.org/w", "published_at": "2021"}]"#,
        );
        let pool = load_evidence_pool(file.path()).unwrap();
        assert_eq!(pool[0].source_id, "Crossref");
        assert_eq!(pool[0].published_at.unwrap().format("%Y").to_string(), "2021");
    }

    #[test]
    fn malformed_json_is_an_error_with_line_number() {
        let file = write_temp("{\"source\": \"GiveWell\"}\nnot json\n");
        let err = load_evidence_pool(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
