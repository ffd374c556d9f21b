use std::io::Write;
use std::path::Path;

use citematch_core::verify::ReferenceVerification;
use citematch_core::{AnalysisResults, MatchResult, SuggestionList};
use serde::Serialize;

use crate::types::{ExportFormat, ReportOptions};

const RULE_WIDTH: usize = 47;

/// Render `results` in `format` and write them to `path`.
pub fn export_report(
    results: &AnalysisResults,
    options: &ReportOptions<'_>,
    format: ExportFormat,
    path: &Path,
) -> std::io::Result<()> {
    let content = match format {
        ExportFormat::Text => render_report(results, options),
        ExportFormat::Markdown => render_markdown(results, options),
        ExportFormat::Json => render_json(results, options).map_err(std::io::Error::other)?,
    };

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Plain-text report with fixed sections: summary, perfect matches, spelling
/// errors, partial matches, citations without references, unused references.
/// Empty sections are omitted.
pub fn render_report(results: &AnalysisResults, options: &ReportOptions<'_>) -> String {
    let s = &results.summary;
    let mut out = String::from("ACADEMIC REFERENCE CHECKER REPORT\n");
    if let Some(when) = options.generated_on {
        out.push_str(&format!("Generated on: {when}\n"));
    }
    out.push_str(&format!("{}\n\n", rule()));

    out.push_str("SUMMARY STATISTICS:\n");
    out.push_str(&format!("- Total Citations Found: {}\n", s.total_citations));
    out.push_str(&format!("- Total References Found: {}\n", s.total_references));
    out.push_str(&format!("- Perfect Matches: {}\n", s.full_matches));
    out.push_str(&format!("- Partial Matches: {}\n", s.partial_matches));
    out.push_str(&format!("- Probable Spelling Errors: {}\n", s.probable_spelling_errors));
    out.push_str(&format!("- Missing References: {}\n", s.missing_references));
    out.push_str(&format!("- Unused References: {}\n", s.unused_references));
    out.push_str(&format!("\n{}\n\n", rule()));
    out.push_str("DETAILED RESULTS:\n\n");

    write_text_matches(&mut out, "PERFECT MATCHES", &results.full_matches, false);

    if !results.probable_spelling_errors.is_empty() {
        out.push_str(&format!(
            "PROBABLE SPELLING ERRORS ({}):\n",
            results.probable_spelling_errors.len()
        ));
        for (i, m) in results.probable_spelling_errors.iter().enumerate() {
            out.push_str(&format!("{}. Citation: {}\n", i + 1, m.citation.original));
            out.push_str(&format!("   Likely matches: {}\n", m.reference.original));
            out.push_str(&format!(
                "   Suggestion: Check if \"{}\" should be \"{}\"\n\n",
                m.citation.authors, m.reference.first_author
            ));
        }
    }

    write_text_matches(&mut out, "PARTIAL MATCHES", &results.partial_matches, true);

    if !results.missing.is_empty() {
        out.push_str(&format!("CITATIONS WITHOUT REFERENCES ({}):\n", results.missing.len()));
        for (i, m) in results.missing.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, m.citation.original));
        }
        out.push('\n');
    }

    if !results.unused.is_empty() {
        out.push_str(&format!("UNUSED REFERENCES ({}):\n", results.unused.len()));
        for (i, u) in results.unused.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, u.reference.original));
        }
        out.push('\n');
    }

    for list in options.suggestions.iter().filter(|l| !l.is_empty()) {
        write_text_suggestions(&mut out, list);
    }

    if !options.verifications.is_empty() {
        write_text_verifications(&mut out, options.verifications);
    }

    out
}

fn write_text_matches(out: &mut String, heading: &str, matches: &[MatchResult], with_confidence: bool) {
    if matches.is_empty() {
        return;
    }
    out.push_str(&format!("{heading} ({}):\n", matches.len()));
    for (i, m) in matches.iter().enumerate() {
        out.push_str(&format!("{}. Citation: {}\n", i + 1, m.citation.original));
        out.push_str(&format!("   Reference: {}\n", m.reference.original));
        if with_confidence {
            out.push_str(&format!("   Confidence: {}\n", m.confidence));
        }
        out.push('\n');
    }
}

fn write_text_suggestions(out: &mut String, list: &SuggestionList) {
    out.push_str(&format!(
        "SUGGESTIONS, STAGE {} ({}) ({}):\n",
        list.stage.number(),
        list.stage.label().to_uppercase(),
        list.len()
    ));
    for (i, suggestion) in list.suggestions.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, suggestion.target.original()));
        for (j, c) in suggestion.candidates.iter().enumerate() {
            out.push_str(&format!(
                "   {}) [{:.0}%] {}\n",
                j + 1,
                c.confidence * 100.0,
                one_line(&c.text)
            ));
        }
    }
    out.push('\n');
}

fn write_text_verifications(out: &mut String, verifications: &[ReferenceVerification]) {
    out.push_str(&format!("VERIFICATION RESULTS ({}):\n", verifications.len()));
    for (i, rv) in verifications.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, rv.reference.original));
        for v in &rv.verdicts {
            out.push_str(&format!("   - {}: {} - {}\n", v.source, v.status, v.details));
        }
    }
    out.push('\n');
}

/// Collapse whitespace runs so multi-line context prints on one line.
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|").replace('*', "\\*").replace('_', "\\_")
}

pub fn render_markdown(results: &AnalysisResults, options: &ReportOptions<'_>) -> String {
    let s = &results.summary;
    let mut out = String::from("# Reference Check Report\n\n");
    if let Some(when) = options.generated_on {
        out.push_str(&format!("_Generated on {when}_\n\n"));
    }

    out.push_str("| Metric | Count |\n|---|---|\n");
    for (label, n) in [
        ("Citations", s.total_citations),
        ("References", s.total_references),
        ("Perfect matches", s.full_matches),
        ("Partial matches", s.partial_matches),
        ("Probable spelling errors", s.probable_spelling_errors),
        ("Missing references", s.missing_references),
        ("Unused references", s.unused_references),
    ] {
        out.push_str(&format!("| {label} | {n} |\n"));
    }
    out.push('\n');

    let sections: [(&str, &[MatchResult]); 3] = [
        ("Perfect Matches", &results.full_matches),
        ("Probable Spelling Errors", &results.probable_spelling_errors),
        ("Partial Matches", &results.partial_matches),
    ];
    for (heading, matches) in sections {
        if matches.is_empty() {
            continue;
        }
        out.push_str(&format!("## {heading} ({})\n\n", matches.len()));
        for (i, m) in matches.iter().enumerate() {
            out.push_str(&format!("{}. **{}**\n", i + 1, md_escape(&m.citation.original)));
            out.push_str(&format!("   - Reference: {}\n", md_escape(&m.reference.original)));
            out.push_str(&format!(
                "   - Confidence: {} (`{}`)\n",
                m.confidence,
                m.match_type.as_str()
            ));
            if heading == "Probable Spelling Errors" {
                out.push_str(&format!(
                    "   - Check if \"{}\" should be \"{}\"\n",
                    md_escape(&m.citation.authors),
                    md_escape(&m.reference.first_author)
                ));
            }
        }
        out.push('\n');
    }

    if !results.missing.is_empty() {
        out.push_str(&format!(
            "## Citations Without References ({})\n\n",
            results.missing.len()
        ));
        for (i, m) in results.missing.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, md_escape(&m.citation.original)));
        }
        out.push('\n');
    }

    if !results.unused.is_empty() {
        out.push_str(&format!("## Unused References ({})\n\n", results.unused.len()));
        for (i, u) in results.unused.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, md_escape(&u.reference.original)));
        }
        out.push('\n');
    }

    for list in options.suggestions.iter().filter(|l| !l.is_empty()) {
        out.push_str(&format!(
            "## Suggestions: stage {} ({})\n\n",
            list.stage.number(),
            list.stage.label()
        ));
        for suggestion in &list.suggestions {
            out.push_str(&format!("- {}\n", md_escape(suggestion.target.original())));
            for c in &suggestion.candidates {
                out.push_str(&format!(
                    "  - {:.0}% `{}`: {}\n",
                    c.confidence * 100.0,
                    c.kind.as_str(),
                    md_escape(&one_line(&c.text))
                ));
            }
        }
        out.push('\n');
    }

    if !options.verifications.is_empty() {
        out.push_str("## Verification\n\n| Reference | Source | Status | Details |\n|---|---|---|---|\n");
        for rv in options.verifications {
            for v in &rv.verdicts {
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    md_escape(&rv.reference.original),
                    v.source,
                    v.status,
                    md_escape(&v.details)
                ));
            }
        }
        out.push('\n');
    }

    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_on: Option<&'a str>,
    #[serde(flatten)]
    results: &'a AnalysisResults,
    #[serde(skip_serializing_if = "is_empty")]
    suggestions: &'a [SuggestionList],
    #[serde(skip_serializing_if = "is_empty")]
    verification: &'a [ReferenceVerification],
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

pub fn render_json(
    results: &AnalysisResults,
    options: &ReportOptions<'_>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        generated_on: options.generated_on,
        results,
        suggestions: options.suggestions,
        verification: options.verifications,
    })
}
