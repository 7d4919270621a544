//! Benchmark registry: the fixed metric → benchmark mapping.
//!
//! Each metric is bound to exactly one benchmark family. The registry never
//! performs or exposes metric-to-metric conversion; ideas are compared to
//! their own metric's benchmark only.

use std::sync::OnceLock;

use crate::error::UnknownMetricError;

/// Closed set of impact metrics. Never converted to one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    Daly,
    Waly,
    Welby,
    LogIncome,
    Co2,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Daly,
        Metric::Waly,
        Metric::Welby,
        Metric::LogIncome,
        Metric::Co2,
    ];

    /// Canonical short tag, as it appears in prompts and exports.
    pub fn tag(&self) -> &'static str {
        match self {
            Metric::Daly => "DALY",
            Metric::Waly => "WALY",
            Metric::Welby => "WELBY",
            Metric::LogIncome => "LOG_INCOME",
            Metric::Co2 => "CO2",
        }
    }

    /// Parse a metric tag as emitted by the generator. Tolerates the common
    /// spelling variants ("log income", "tCO2e") without widening the set.
    pub fn parse(raw: &str) -> Result<Metric, UnknownMetricError> {
        let norm: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match norm.as_str() {
            "DALY" | "DALYS" => Ok(Metric::Daly),
            "WALY" | "WALYS" => Ok(Metric::Waly),
            "WELBY" | "WELBYS" => Ok(Metric::Welby),
            "LOGINCOME" => Ok(Metric::LogIncome),
            "CO2" | "TCO2" | "TCO2E" => Ok(Metric::Co2),
            _ => Err(UnknownMetricError {
                raw: raw.to_string(),
            }),
        }
    }
}

/// One row of the fixed benchmark table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkEntry {
    pub metric: Metric,
    pub benchmark_name: String,
    /// Indicative (low, high) range in `unit`; comparison only.
    pub reference_range: (f64, f64),
    pub unit: String,
    /// Prose description of the benchmark intervention itself. The
    /// benchmark-clone check compares candidate ideas against this text.
    pub reference_description: String,
}

/// Static metric → benchmark mapping, loaded once per process.
pub struct BenchmarkRegistry {
    entries: Vec<BenchmarkEntry>,
}

static REGISTRY: OnceLock<BenchmarkRegistry> = OnceLock::new();

impl BenchmarkRegistry {
    /// The process-wide registry. Initialized on first use, immutable after.
    pub fn global() -> &'static BenchmarkRegistry {
        REGISTRY.get_or_init(Self::builtin)
    }

    fn builtin() -> Self {
        let entry = |metric: Metric,
                     name: &str,
                     range: (f64, f64),
                     unit: &str,
                     description: &str| BenchmarkEntry {
            metric,
            benchmark_name: name.to_string(),
            reference_range: range,
            unit: unit.to_string(),
            reference_description: description.to_string(),
        };
        BenchmarkRegistry {
            entries: vec![
                entry(
                    Metric::Daly,
                    "GiveWell top charities",
                    (100.0, 500.0),
                    "USD per DALY",
                    "Direct delivery of proven global health interventions through the \
                     GiveWell Top Charities Fund: malaria nets and chemoprevention, \
                     vitamin A supplementation, and incentives for routine childhood \
                     vaccination.",
                ),
                entry(
                    Metric::Waly,
                    "Humane League / ACE",
                    (0.01, 1.0),
                    "USD per animal-year",
                    "Corporate welfare campaigns of the kind run by The Humane League \
                     and ACE-recommended charities: cage-free egg pledges and broiler \
                     welfare commitments secured from food companies.",
                ),
                entry(
                    Metric::Welby,
                    "StrongMinds-like",
                    (50.0, 1000.0),
                    "USD per WELBY",
                    "Lay-counselor group psychotherapy for depression in low-income \
                     countries, in the style of StrongMinds interpersonal therapy \
                     groups.",
                ),
                entry(
                    Metric::LogIncome,
                    "GiveDirectly",
                    (1.0, 1.0),
                    "relative effect",
                    "Unconditional cash transfers to extremely poor households, as \
                     delivered by GiveDirectly.",
                ),
                entry(
                    Metric::Co2,
                    "Frontier climate",
                    (5.0, 100.0),
                    "USD per tCO2e",
                    "Advance market commitments for permanent carbon removal in the \
                     style of Frontier's offtake purchases.",
                ),
            ],
        }
    }

    /// The benchmark family for a metric. Total over the closed enum.
    pub fn lookup(&self, metric: Metric) -> &BenchmarkEntry {
        // The builtin table covers every variant; the expect is unreachable
        // unless the table itself is edited out of sync with the enum.
        self.entries
            .iter()
            .find(|e| e.metric == metric)
            .unwrap_or_else(|| unreachable!("benchmark table missing {}", metric.tag()))
    }

    /// Whether `benchmark_name` is the canonical benchmark for `metric`.
    pub fn is_valid_mapping(&self, metric: Metric, benchmark_name: &str) -> bool {
        self.lookup(metric).benchmark_name == benchmark_name
    }

    /// Find an entry by benchmark name, ignoring case. Used to represent a
    /// generator's declared (possibly wrong-family) benchmark before the
    /// validator normalizes it.
    pub fn entry_by_name(&self, benchmark_name: &str) -> Option<&BenchmarkEntry> {
        self.entries
            .iter()
            .find(|e| e.benchmark_name.eq_ignore_ascii_case(benchmark_name))
    }

    pub fn entries(&self) -> &[BenchmarkEntry] {
        &self.entries
    }
}
