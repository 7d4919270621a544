//! Parsing of generative output into idea-batch DTOs.
//!
//! Models wrap JSON in markdown fences, add prose around it, or emit mildly
//! malformed wrappers; parsing builds a few deterministic salvage candidates
//! before giving up. Field-level validation is the validator's job — this
//! module only recovers structure.

use serde::Deserialize;

/// Strip markdown code fences from a response.
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if trimmed.starts_with("```json") {
        trimmed.strip_prefix("```json").unwrap_or(trimmed)
    } else if trimmed.starts_with("```") {
        trimmed.strip_prefix("```").unwrap_or(trimmed)
    } else {
        trimmed
    };
    let clean = if clean.ends_with("```") {
        clean.strip_suffix("```").unwrap_or(clean)
    } else {
        clean
    };
    clean.trim()
}

/// Extract a balanced JSON fragment between matching delimiters, ignoring
/// delimiters inside strings.
fn extract_json_fragment(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut start_idx = None;

    for (i, c) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if c == open {
            if depth == 0 {
                start_idx = Some(i);
            }
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                if let Some(start) = start_idx {
                    return Some(&text[start..=i]);
                }
            }
        }
    }
    None
}

/// Fix common JSON issues from LLM responses: trailing commas, smart quotes,
/// stray control characters.
fn fix_json_issues(json: &str) -> String {
    let mut fixed = json.to_string();
    fixed = fixed.replace(",]", "]");
    fixed = fixed.replace(",}", "}");
    fixed = fixed.replace('\u{201C}', "\"");
    fixed = fixed.replace('\u{201D}', "\"");
    fixed = fixed.replace('\u{2018}', "'");
    fixed = fixed.replace('\u{2019}', "'");
    fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdeaBatchJson {
    pub ideas: Vec<IdeaJson>,
}

/// One candidate as emitted by the generator. Every field is defaulted so a
/// partially filled candidate still parses; completeness is checked later.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct IdeaJson {
    #[serde(default)]
    pub funding_target: String,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub expected_impact_quantity: Option<f64>,
    #[serde(default)]
    pub cost_usd_low: Option<f64>,
    #[serde(default)]
    pub cost_usd_high: Option<f64>,
    #[serde(default)]
    pub benchmark_name: Option<String>,
    #[serde(default)]
    pub cost_effectiveness_ratio: Option<f64>,
    #[serde(default)]
    pub verification_plan: String,
    #[serde(default)]
    pub doers: Option<DoersJson>,
    #[serde(default)]
    pub novelty_rationale: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub botec: Option<BotecJson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum DoersJson {
    Named(Vec<ScoredDoerJson>),
    Archetype(String),
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScoredDoerJson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BotecJson {
    #[serde(default)]
    pub assumptions: Vec<AssumptionJson>,
    #[serde(default)]
    pub formula: String,
    #[serde(default)]
    pub point_estimate: Option<f64>,
    #[serde(default)]
    pub sensitivity_range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AssumptionJson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
    /// Citation URL for the assumption; absent means unsupported.
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Parse a generated idea batch. Accepts the `{"ideas": [...]}` wrapper, a
/// bare JSON array, fenced variants of either, and prose-wrapped JSON.
pub(crate) fn parse_idea_batch(response: &str) -> anyhow::Result<Vec<IdeaJson>> {
    let clean = strip_markdown_fences(response);

    let mut candidates: Vec<String> = Vec::new();
    candidates.push(clean.to_string());
    if let Some(obj) = extract_json_fragment(clean, '{', '}') {
        candidates.push(obj.to_string());
    }
    if let Some(arr) = extract_json_fragment(clean, '[', ']') {
        candidates.push(arr.to_string());
    }

    let mut last_err: Option<String> = None;
    for candidate in candidates {
        let fixed = fix_json_issues(&candidate);
        match serde_json::from_str::<IdeaBatchJson>(&fixed) {
            Ok(batch) => return Ok(batch.ideas),
            Err(err) => last_err = Some(err.to_string()),
        }
        match serde_json::from_str::<Vec<IdeaJson>>(&fixed) {
            Ok(ideas) => return Ok(ideas),
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    Err(anyhow::anyhow!(
        "idea batch response was not parseable JSON: {}",
        last_err.unwrap_or_else(|| "no JSON structure found".to_string())
    ))
}
