//! Vertical card display for load reports and resolutions.
//!
//! Everything renders into a `String` first so the layout can be tested;
//! the `print_*` wrappers write it to stdout.

use std::fmt::Write;

use intentmux_ai::loader::{CorpusStatus, LabelStatus, LexicalStatus};
use intentmux_ai::{Explanation, LoadReport, Outcome};
use intentmux_core::Resolution;

// ── Public API ──

pub fn print_report(report: &LoadReport) {
    print!("{}", render_report(report));
}

pub fn print_resolution(text: &str, resolution: &Resolution) {
    print!("{}", render_resolution(text, resolution));
}

pub fn print_explanation(text: &str, explanation: &Explanation) {
    print!("{}", render_explanation(text, explanation));
}

// ── Load report ──

pub fn render_report(report: &LoadReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Artifacts ===");
    let _ = writeln!(out);

    let _ = writeln!(out, "Classifier");
    row(
        &mut out,
        "output classes",
        report
            .model_classes
            .map(|n| n.to_string())
            .unwrap_or_else(|| "dynamic".into()),
    );
    row(
        &mut out,
        "tokenizer",
        report.tokenizer.as_deref().unwrap_or("-"),
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Corpus");
    match &report.corpus {
        CorpusStatus::Loaded { records, dropped } => {
            row(&mut out, "status", "loaded");
            row(&mut out, "records", records);
            row(&mut out, "dropped", dropped);
        }
        CorpusStatus::Missing => row(&mut out, "status", "missing"),
        CorpusStatus::Failed { reason } => {
            row(&mut out, "status", "failed");
            row(&mut out, "reason", reason);
        }
    }
    if let Some(valid) = report.valid_intents {
        row(&mut out, "valid intents", valid);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Lexical fallback");
    match &report.lexical {
        LexicalStatus::Ready { rows, vocabulary } => {
            row(&mut out, "status", "ready");
            row(&mut out, "rows", rows);
            row(&mut out, "vocabulary", vocabulary);
        }
        LexicalStatus::Disabled { reason } => {
            row(&mut out, "status", "disabled");
            row(&mut out, "reason", reason);
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Label encoder");
    match &report.labels {
        LabelStatus::Artifact { classes } => {
            row(&mut out, "source", "artifact");
            row(&mut out, "classes", classes);
        }
        LabelStatus::Rebuilt { classes, reason } => {
            row(&mut out, "source", "rebuilt from corpus");
            row(&mut out, "classes", classes);
            row(&mut out, "reason", reason);
        }
        LabelStatus::Unavailable { reason } => {
            row(&mut out, "source", "none");
            row(&mut out, "reason", reason);
        }
    }
    let _ = writeln!(out);

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "Warnings");
        for warning in &report.warnings {
            let _ = writeln!(out, "  ! {warning}");
        }
        let _ = writeln!(out);
    }
    out
}

// ── Resolutions ──

pub fn render_resolution(text: &str, resolution: &Resolution) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {text} ===");
    row(&mut out, "intent", &resolution.intent);
    row(&mut out, "confidence", format!("{:.4}", resolution.confidence));
    out
}

pub fn render_explanation(text: &str, explanation: &Explanation) -> String {
    let mut out = render_resolution(text, &explanation.resolution);
    row(&mut out, "normalised", &explanation.normalized);
    row(&mut out, "source", explanation.resolution.source.as_str());
    row(&mut out, "rule", explanation.resolution.rule.as_str());
    let _ = writeln!(out);
    outcome(&mut out, "Lexical path", &explanation.lexical);
    outcome(&mut out, "Classifier path", &explanation.model);
    out
}

fn outcome(out: &mut String, header: &str, outcome: &Outcome) {
    let _ = writeln!(out, "{header}");
    match outcome {
        Outcome::Match { candidate } => {
            row(out, "candidate", &candidate.intent);
            row(out, "confidence", format!("{:.4}", candidate.confidence));
        }
        Outcome::NoMatch { best } => {
            row(out, "candidate", "none");
            row(out, "best score", format!("{best:.4}"));
        }
        Outcome::Disabled => row(out, "candidate", "disabled"),
        Outcome::Failed { error } => {
            row(out, "candidate", "failed");
            row(out, "error", error);
        }
    }
    let _ = writeln!(out);
}

// ── Helpers ──

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<26} {}", label, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentmux_core::{Candidate, Rule, Source};

    fn report() -> LoadReport {
        LoadReport {
            corpus: CorpusStatus::Loaded {
                records: 120,
                dropped: 3,
            },
            lexical: LexicalStatus::Ready {
                rows: 120,
                vocabulary: 410,
            },
            labels: LabelStatus::Rebuilt {
                classes: 14,
                reason: "artifact not found".into(),
            },
            valid_intents: Some(14),
            model_classes: Some(14),
            tokenizer: Some("keras word index (500 words)".into()),
            warnings: vec!["label encoder rebuilt from corpus".into()],
        }
    }

    #[test]
    fn report_card_sections() {
        let out = render_report(&report());
        assert!(out.starts_with("=== Artifacts ==="));
        for header in ["Classifier", "Corpus", "Lexical fallback", "Label encoder", "Warnings"] {
            assert!(out.contains(header), "missing {header}");
        }
        assert!(out.contains("rebuilt from corpus"));
        assert!(out.contains("  ! label encoder rebuilt from corpus"));
    }

    #[test]
    fn report_without_warnings_omits_section() {
        let mut r = report();
        r.warnings.clear();
        assert!(!render_report(&r).contains("Warnings"));
    }

    #[test]
    fn explanation_lists_both_paths() {
        let explanation = Explanation {
            normalized: "reset my password".into(),
            lexical: Outcome::Match {
                candidate: Candidate::new("AccountReset", 1.0),
            },
            model: Outcome::Failed {
                error: "boom".into(),
            },
            resolution: Resolution {
                intent: "AccountReset".into(),
                confidence: 1.0,
                source: Source::Lexical,
                rule: Rule::StrongMatch,
            },
        };
        let out = render_explanation("Reset my password", &explanation);
        assert!(out.contains("strong_match"));
        assert!(out.contains("Lexical path"));
        assert!(out.contains("boom"));
        assert!(out.contains("1.0000"));
    }
}
