use std::io::Write;

use citematch_core::verify::{Verdict, VerificationStatus, VerifyProgress};
use citematch_core::{AnalysisResults, Suggestion, SuggestionList, SuggestionStage};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the extraction summary after the initial analysis.
pub fn print_extraction_summary(
    w: &mut dyn Write,
    doc_name: &str,
    results: &AnalysisResults,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Analyzing {}...", doc_name)?;
    writeln!(
        w,
        "Found {} citations and {} references",
        results.summary.total_citations, results.summary.total_references
    )?;

    let s = &results.summary;
    let line = format!(
        "{} perfect, {} partial, {} spelling, {} missing, {} unused",
        s.full_matches,
        s.partial_matches,
        s.probable_spelling_errors,
        s.missing_references,
        s.unused_references
    );
    if color.enabled() {
        writeln!(w, "{}", line.dimmed())?;
    } else {
        writeln!(w, "{}", line)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print the headline of a suggestion stage run.
pub fn print_stage_header(
    w: &mut dyn Write,
    list: &SuggestionList,
    color: ColorMode,
) -> std::io::Result<()> {
    let title = format!("Stage {}: {}", list.stage.number(), list.stage.label());
    if color.enabled() {
        writeln!(w, "{} ({} with candidates)", title.bold().cyan(), list.len())?;
    } else {
        writeln!(w, "{} ({} with candidates)", title, list.len())?;
    }
    Ok(())
}

/// Print one suggestion with its numbered candidates.
pub fn print_suggestion(
    w: &mut dyn Write,
    stage: SuggestionStage,
    suggestion: &Suggestion,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let what = match stage {
        SuggestionStage::MissingReferences => "Citation",
        _ => "Reference",
    };
    if color.enabled() {
        writeln!(w, "{}: {}", what.bold(), suggestion.target.original())?;
    } else {
        writeln!(w, "{}: {}", what, suggestion.target.original())?;
    }

    for (i, c) in suggestion.candidates.iter().enumerate() {
        let text = truncate(&one_line(&c.text), 120);
        let pct = format!("{:>3.0}%", c.confidence * 100.0);
        if color.enabled() {
            writeln!(
                w,
                "  {}) {} {} {}",
                i + 1,
                pct.yellow(),
                format!("[{}]", c.kind.as_str()).dimmed(),
                text
            )?;
        } else {
            writeln!(w, "  {}) {} [{}] {}", i + 1, pct, c.kind.as_str(), text)?;
        }
        if !c.matched_terms.is_empty() {
            let terms = c.matched_terms.join(", ");
            if color.enabled() {
                writeln!(w, "     {}", format!("matched: {}", terms).dimmed())?;
            } else {
                writeln!(w, "     matched: {}", terms)?;
            }
        }
    }
    Ok(())
}

/// Print one batch verification progress event.
pub fn print_verify_event(
    w: &mut dyn Write,
    event: &VerifyProgress<'_>,
    color: ColorMode,
) -> std::io::Result<()> {
    match *event {
        VerifyProgress::Checking {
            index,
            total,
            reference,
        } => {
            let text = truncate(&one_line(&reference.original), 60);
            writeln!(w, "[{}/{}] Checking: \"{}\"", index + 1, total, text)
        }
        VerifyProgress::Result { result, .. } => {
            for verdict in &result.verdicts {
                print_verdict(w, verdict, color)?;
            }
            w.flush()
        }
    }
}

/// Print one source verdict.
pub fn print_verdict(w: &mut dyn Write, verdict: &Verdict, color: ColorMode) -> std::io::Result<()> {
    let status = verdict.status.to_string().to_uppercase();
    if color.enabled() {
        let status = match verdict.status {
            VerificationStatus::Verified => status.green().to_string(),
            VerificationStatus::PartiallyVerified => status.yellow().to_string(),
            VerificationStatus::NotFound => status.red().to_string(),
            VerificationStatus::Error => status.magenta().to_string(),
        };
        writeln!(w, "    -> {} {}: {}", status, verdict.source.bold(), verdict.details)
    } else {
        writeln!(w, "    -> {} {}: {}", status, verdict.source, verdict.details)
    }
}

/// Print a final tally of verification outcomes.
pub fn print_verify_summary(
    w: &mut dyn Write,
    verdicts: &[&Verdict],
    color: ColorMode,
) -> std::io::Result<()> {
    let count = |status| verdicts.iter().filter(|v| v.status == status).count();
    let verified = count(VerificationStatus::Verified);
    let partial = count(VerificationStatus::PartiallyVerified);
    let not_found = count(VerificationStatus::NotFound);
    let errors = count(VerificationStatus::Error);

    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "VERIFICATION SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "  Verified:           {}", verified.to_string().green())?;
        writeln!(w, "  Partially verified: {}", partial.to_string().yellow())?;
        writeln!(w, "  Not found:          {}", not_found.to_string().red())?;
        writeln!(w, "  Errors:             {}", errors.to_string().magenta())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "VERIFICATION SUMMARY")?;
        writeln!(w, "{}", sep)?;
        writeln!(w, "  Verified:           {}", verified)?;
        writeln!(w, "  Partially verified: {}", partial)?;
        writeln!(w, "  Not found:          {}", not_found)?;
        writeln!(w, "  Errors:             {}", errors)?;
    }
    Ok(())
}

/// Print a one-line warning.
pub fn print_warning(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "WARNING:".yellow(), message)
    } else {
        writeln!(w, "WARNING: {}", message)
    }
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
