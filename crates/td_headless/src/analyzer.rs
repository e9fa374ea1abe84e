//! Tuning diagnostics.
//!
//! Scans collected metrics for waves whose difficulty falls outside an
//! acceptable band and renders the findings as a markdown report. Nothing
//! here feeds back into a run.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::batch::BatchResults;
use crate::metrics::{BatchSummary, ExportError, SimulationMetrics};

/// Severity of a tuning issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Minor issue, low priority.
    Low,
    /// Noticeable imbalance.
    Medium,
    /// Significant problem requiring attention.
    High,
    /// The wave or run is unplayable as tuned.
    Critical,
}

impl Severity {
    /// Numeric priority (higher = more urgent).
    #[must_use]
    pub const fn priority(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

/// Acceptable range of wave difficulty ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyBand {
    /// Ratings below this are too easy.
    pub min: f64,
    /// Ratings above this are too hard.
    pub max: f64,
}

impl Default for DifficultyBand {
    fn default() -> Self {
        Self { min: 0.05, max: 1.2 }
    }
}

impl DifficultyBand {
    /// Whether `rating` is inside the band.
    #[must_use]
    pub fn contains(&self, rating: f64) -> bool {
        (self.min..=self.max).contains(&rating)
    }
}

/// A detected tuning problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningIssue {
    /// Area of the issue (`difficulty`, `outcome`, `balance`).
    pub category: String,
    /// Wave the issue belongs to, if any.
    pub wave: Option<u32>,
    /// Observed value.
    pub value: f64,
    /// Acceptable range.
    pub expected_range: (f64, f64),
    /// Issue severity.
    pub severity: Severity,
    /// Human-readable context.
    pub context: String,
}

impl TuningIssue {
    fn new(category: &str, value: f64, range: (f64, f64), severity: Severity) -> Self {
        Self {
            category: category.to_string(),
            wave: None,
            value,
            expected_range: range,
            severity,
            context: String::new(),
        }
    }

    fn for_wave(mut self, wave: u32) -> Self {
        self.wave = Some(wave);
        self
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Findings over one or more runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningAnalysis {
    /// Band the waves were judged against.
    pub band: Option<DifficultyBand>,
    /// Runs analyzed.
    pub runs_analyzed: u32,
    /// Batch aggregate, when analyzing a batch.
    pub summary: Option<BatchSummary>,
    /// Issues found.
    pub issues: Vec<TuningIssue>,
}

impl TuningAnalysis {
    /// Whether any issue is critical.
    #[must_use]
    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    /// Issues sorted most severe first, then by wave.
    #[must_use]
    pub fn issues_by_severity(&self) -> Vec<&TuningIssue> {
        let mut sorted: Vec<_> = self.issues.iter().collect();
        sorted.sort_by(|a, b| {
            b.severity
                .priority()
                .cmp(&a.severity.priority())
                .then(a.wave.cmp(&b.wave))
        });
        sorted
    }

    /// Save as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Markdown report.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Tuning Report\n\n");

        if let Some(summary) = &self.summary {
            md.push_str("## Summary\n\n");
            md.push_str("| Metric | Value |\n|--------|-------|\n");
            let _ = writeln!(md, "| Runs | {} |", summary.total_runs);
            let _ = writeln!(md, "| Victory rate | {:.1}% |", summary.victory_rate * 100.0);
            let _ = writeln!(md, "| Avg waves completed | {:.2} |", summary.avg_waves_completed);
            let _ = writeln!(md, "| Avg final lives | {:.2} |", summary.avg_final_lives);
            let _ = writeln!(md, "| Avg balance score | {:.3} |", summary.avg_balance_score);

            if !summary.avg_difficulty_by_wave.is_empty() {
                md.push_str("\n## Difficulty by Wave\n\n");
                md.push_str("| Wave | Avg difficulty |\n|------|----------------|\n");
                for (wave, rating) in &summary.avg_difficulty_by_wave {
                    let _ = writeln!(md, "| {wave} | {rating:.3} |");
                }
            }
        }

        if self.issues.is_empty() {
            md.push_str("\nNo tuning issues detected.\n");
        } else {
            md.push_str("\n## Issues Detected\n\n");
            for issue in self.issues_by_severity() {
                let location = issue
                    .wave
                    .map_or_else(String::new, |wave| format!(" (wave {wave})"));
                let _ = writeln!(
                    md,
                    "- **[{:?}]** {}{}: {:.3} (expected {:.2}-{:.2})",
                    issue.severity,
                    issue.category,
                    location,
                    issue.value,
                    issue.expected_range.0,
                    issue.expected_range.1
                );
                if !issue.context.is_empty() {
                    let _ = writeln!(md, "  - {}", issue.context);
                }
            }
        }

        let _ = write!(md, "\n---\n*Analyzed {} run(s)*\n", self.runs_analyzed);
        md
    }
}

fn difficulty_issue(wave: u32, rating: f64, band: DifficultyBand) -> Option<TuningIssue> {
    let range = (band.min, band.max);
    if rating < band.min {
        return Some(
            TuningIssue::new("difficulty", rating, range, Severity::Low)
                .for_wave(wave)
                .with_context("Wave is trivially easy"),
        );
    }
    let excess = rating - band.max;
    if excess <= 0.0 {
        return None;
    }
    let severity = if excess >= 2.0 {
        Severity::Critical
    } else if excess >= 1.0 {
        Severity::High
    } else {
        Severity::Medium
    };
    Some(
        TuningIssue::new("difficulty", rating, range, severity)
            .for_wave(wave)
            .with_context("Wave is harder than the acceptable band"),
    )
}

/// Analyze a single run.
#[must_use]
pub fn analyze_run(metrics: &SimulationMetrics, band: DifficultyBand) -> TuningAnalysis {
    let mut analysis = TuningAnalysis {
        band: Some(band),
        runs_analyzed: 1,
        ..TuningAnalysis::default()
    };

    analysis.issues.extend(
        metrics
            .waves
            .iter()
            .filter_map(|w| difficulty_issue(w.wave_number, w.difficulty_rating, band)),
    );

    if !metrics.success {
        let reason = metrics
            .failure_reason
            .clone()
            .unwrap_or_else(|| "Run failed".to_string());
        analysis.issues.push(
            TuningIssue::new(
                "outcome",
                f64::from(metrics.waves_completed),
                (f64::from(metrics.max_waves), f64::from(metrics.max_waves)),
                Severity::High,
            )
            .with_context(reason),
        );
    }

    if metrics.balance_score < 1.0 {
        analysis.issues.push(
            TuningIssue::new("balance", metrics.balance_score, (1.0, 2.0), Severity::Medium)
                .with_context("Completion rates swing between waves or lives drain quickly"),
        );
    }

    analysis
}

/// Analyze a batch using its averaged per-wave difficulty.
#[must_use]
pub fn analyze_batch(results: &BatchResults, band: DifficultyBand) -> TuningAnalysis {
    let summary = results.summary.clone();
    let mut analysis = TuningAnalysis {
        band: Some(band),
        runs_analyzed: summary.total_runs,
        ..TuningAnalysis::default()
    };

    analysis.issues.extend(
        summary
            .avg_difficulty_by_wave
            .iter()
            .filter_map(|(&wave, &rating)| difficulty_issue(wave, rating, band)),
    );

    if summary.total_runs > 0 && summary.victory_rate < 0.25 {
        analysis.issues.push(
            TuningIssue::new("outcome", summary.victory_rate, (0.25, 1.0), Severity::High)
                .with_context(format!(
                    "Only {} of {} runs won",
                    summary.victories, summary.total_runs
                )),
        );
    }

    analysis.summary = Some(summary);
    analysis
}
