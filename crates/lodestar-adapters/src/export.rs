//! Catalog export: JSON, CSV, and Markdown renderings.
//!
//! The core's obligation is that every idea field is present and typed
//! consistently; these renderers only reshape, never recompute.

use lodestar_core::idea::{Doers, Idea, IdeaCatalog};

/// Lossless JSON export of the catalog (ideas and rejection log).
pub fn to_json(catalog: &IdeaCatalog) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(catalog)?)
}

/// CSV field escaping per RFC 4180: quote when needed, double inner quotes.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn doers_summary(doers: &Option<Doers>) -> String {
    match doers {
        Some(Doers::Named { candidates }) => candidates
            .iter()
            .map(|d| format!("{} ({:.1})", d.name, d.score))
            .collect::<Vec<_>>()
            .join("; "),
        Some(Doers::Archetype { description }) => description.clone(),
        None => String::new(),
    }
}

/// One row per validated idea. Rejections are not exported to CSV.
pub fn to_csv(catalog: &IdeaCatalog) -> String {
    let mut out = String::from(
        "id,funding_target,mechanism,metric,expected_impact_quantity,cost_usd_low,cost_usd_high,\
         benchmark,cost_effectiveness_ratio,verification_plan,doers,novelty_rationale,citations\n",
    );
    for idea in &catalog.ideas {
        let fields = [
            idea.id.to_string(),
            idea.funding_target.clone(),
            idea.mechanism.clone(),
            idea.expected_impact.metric.tag().to_string(),
            format!("{}", idea.expected_impact.quantity),
            format!("{}", idea.cost.low_usd),
            format!("{}", idea.cost.high_usd),
            idea.benchmark.benchmark_name.clone(),
            idea.cost_effectiveness_ratio
                .map(|r| format!("{r:.2}"))
                .unwrap_or_default(),
            idea.verification_plan.clone(),
            doers_summary(&idea.doers),
            idea.novelty_rationale.clone().unwrap_or_default(),
            idea.citations.join(" "),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn markdown_idea(index: usize, idea: &Idea) -> String {
    let mut section = format!("## {}. {}\n\n", index, idea.funding_target);
    section.push_str(&format!(
        "- **Mechanism**: {}\n- **Metric**: {}\n- **Expected impact**: {} {}\n\
         - **Cost**: ${:.0}-${:.0}\n- **Benchmark**: {} ({:.2}-{:.2} {})\n",
        idea.mechanism,
        idea.expected_impact.metric.tag(),
        idea.expected_impact.quantity,
        idea.expected_impact.metric.tag(),
        idea.cost.low_usd,
        idea.cost.high_usd,
        idea.benchmark.benchmark_name,
        idea.benchmark.reference_range.0,
        idea.benchmark.reference_range.1,
        idea.benchmark.unit,
    ));
    if let Some(ratio) = idea.cost_effectiveness_ratio {
        section.push_str(&format!("- **Cost-effectiveness**: {ratio:.2} USD per unit\n"));
    }
    section.push_str(&format!("- **Verification**: {}\n", idea.verification_plan));
    let doers = doers_summary(&idea.doers);
    if !doers.is_empty() {
        section.push_str(&format!("- **Doers**: {doers}\n"));
    }
    if let Some(rationale) = &idea.novelty_rationale {
        section.push_str(&format!("- **Novelty**: {rationale}\n"));
    }
    section.push_str("- **Evidence**:\n");
    for citation in &idea.citations {
        section.push_str(&format!("  - {citation}\n"));
    }
    section
}

/// Human-readable Markdown report: validated ideas, then the rejection log.
pub fn to_markdown(catalog: &IdeaCatalog) -> String {
    let mut out = String::from("# Funding ideas\n\n");
    for (i, idea) in catalog.ideas.iter().enumerate() {
        out.push_str(&markdown_idea(i + 1, idea));
        out.push('\n');
    }
    if !catalog.rejections.is_empty() {
        out.push_str("## Rejected candidates\n\n");
        for rejection in &catalog.rejections {
            out.push_str(&format!(
                "- {} — `{}`: {}\n",
                rejection.funding_target,
                rejection.reason.code(),
                rejection.note
            ));
        }
    }
    out
}
