//! Prompts for idea synthesis.

use lodestar_core::benchmark::{BenchmarkRegistry, Metric};

use crate::synthesis::RigorMode;

/// System prompt for the synthesis pass. Carries the reasoning pipeline and
/// the hard schema rules; the benchmark table is appended at build time so
/// the generator never invents benchmark families.
const SYNTHESIS_SYSTEM_BASE: &str = r#"You are an idea generator optimizing for the wellbeing of all sentient beings.

Follow this reasoning pipeline per idea:
(1) Problem sizing: quantify the biggest problems (orders of magnitude, e.g., animals affected, DALYs, tCO2e).
(2) Leading solutions: scan the supplied evidence for authoritative findings.
(3) Cruxes: identify the binding constraints on development/adoption (technical, regulatory, buyer fragmentation, CapEx, ops).
(4) Mechanism design: propose specific levers (AMCs, prizes, milestones, purchase guarantees, pooled procurement, verification).
(5) Ideal-solution backcasting: consider what would make the problem go away and what is newly possible.
(6) Verification: define binary, independently checkable measures of success.
(7) Light BOTEC: native-metric cost-effectiveness vs the fixed benchmark; no cross-metric conversions; 0% discount up to 50y, 2% thereafter.

OUTPUT (JSON object only):
{
  "ideas": [{
    "funding_target": "what to fund",
    "mechanism": "AMC | prize | milestone contract | purchase guarantee | pooled procurement | direct grant",
    "metric": "DALY | WALY | WELBY | LOG_INCOME | CO2",
    "expected_impact_quantity": 12345.0,
    "cost_usd_low": 1000000.0,
    "cost_usd_high": 3000000.0,
    "benchmark_name": "the fixed benchmark for the metric",
    "cost_effectiveness_ratio": 250.0,
    "verification_plan": "pass/fail criterion with a number and a deadline",
    "doers": [{"name": "org or person", "score": 0.8}] or "archetype description",
    "novelty_rationale": "why this is not the benchmark intervention",
    "citations": ["url", "url"],
    "botec": {
      "assumptions": [{"name": "param", "value": 1.0, "source_url": "url"}],
      "formula": "cost / impact",
      "point_estimate": 250.0,
      "sensitivity_range": [100.0, 600.0]
    }
  }]
}

RULES:
- Cause-neutral selection: never pre-filter toward one cause area; ideas compete purely on expected value.
- Use only the supplied evidence snippets; no external knowledge, no tool calls, no extra text.
- Every idea MUST carry at least 2 citations, and every citation MUST be a Source URL copied exactly from the evidence snippets.
- `metric` is one of the five tags above; map it to its fixed benchmark family with no substitution.
- No cross-metric conversion anywhere, including inside the BOTEC.
- Do not propose funding the benchmark intervention itself; address an adoption barrier or crux with a concrete mechanism instead.
- Every BOTEC assumption that is not a pure computation must carry a source_url from the evidence snippets.
- Skip any idea you cannot ground in the provided snippets."#;

/// Extra constraints for the deep pass.
const DEEP_PASS_ADDENDUM: &str = r#"
DEEP PASS:
- Be stricter: prefer fewer, better-grounded ideas over volume.
- Quantify every BOTEC assumption and state its sensitivity range.
- Reject your own idea rather than leave `verification_plan` vague."#;

/// Build the synthesis system prompt for a rigor mode.
pub(crate) fn synthesis_system(rigor: RigorMode) -> String {
    let mut prompt = String::from(SYNTHESIS_SYSTEM_BASE);
    prompt.push_str("\n\nBENCHMARKS (fixed, per metric):\n");
    for entry in BenchmarkRegistry::global().entries() {
        prompt.push_str(&format!(
            "- {}: {} ({:.2}-{:.2} {})\n",
            entry.metric.tag(),
            entry.benchmark_name,
            entry.reference_range.0,
            entry.reference_range.1,
            entry.unit
        ));
    }
    if rigor == RigorMode::Deep {
        prompt.push_str(DEEP_PASS_ADDENDUM);
    }
    prompt
}

/// Build the synthesis user prompt.
pub(crate) fn synthesis_user(
    goal: &str,
    num_ideas: usize,
    metric_hint: Option<Metric>,
    rendered_context: &str,
) -> String {
    let metric_line = match metric_hint {
        Some(metric) => format!("Preferred metric: {}.\n", metric.tag()),
        None => String::new(),
    };
    format!(
        "Generate up to {num_ideas} funding ideas for this goal:\n{goal}\n\n{metric_line}\
         Evidence snippets (non-exhaustive):\n{rendered_context}\n\n\
         Return the JSON object only."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_enforces_core_rules() {
        let prompt = synthesis_system(RigorMode::Standard);
        assert!(
            prompt.contains("JSON object only"),
            "synthesis prompt must require JSON-object output"
        );
        assert!(
            prompt.contains("at least 2 citations"),
            "synthesis prompt must require two citations"
        );
        assert!(
            prompt.contains("Cause-neutral selection"),
            "synthesis prompt must forbid cause-area pre-filtering"
        );
        assert!(
            prompt.contains("No cross-metric conversion"),
            "synthesis prompt must forbid metric conversion"
        );
        assert!(
            prompt.contains("no substitution"),
            "synthesis prompt must pin benchmark families"
        );
    }

    #[test]
    fn system_prompt_lists_all_benchmark_families() {
        let prompt = synthesis_system(RigorMode::Standard);
        assert!(prompt.contains("GiveWell top charities"));
        assert!(prompt.contains("Humane League / ACE"));
        assert!(prompt.contains("GiveDirectly"));
        assert!(prompt.contains("Frontier climate"));
        assert!(prompt.contains("StrongMinds-like"));
    }

    #[test]
    fn deep_pass_appends_stricter_rules() {
        let standard = synthesis_system(RigorMode::Standard);
        let deep = synthesis_system(RigorMode::Deep);
        assert!(!standard.contains("DEEP PASS"));
        assert!(deep.contains("DEEP PASS"));
    }

    #[test]
    fn user_prompt_embeds_goal_and_context() {
        let prompt = synthesis_user(
            "Reduce lead exposure",
            10,
            Some(lodestar_core::benchmark::Metric::Daly),
            "- [CGD] Lead papers\n",
        );
        assert!(prompt.contains("Reduce lead exposure"));
        assert!(prompt.contains("Preferred metric: DALY"));
        assert!(prompt.contains("Lead papers"));
    }
}
