//! Bibliography parsing: segment the reference section into entries and pull
//! authors and year out of each.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Reference;
use crate::config::AnalysisConfig;
use crate::section;

static NUMBERED_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.\s+").unwrap());

/// `Surname, X...` at the start of a line.
static SURNAME_INITIAL_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z\-']+,\s+[A-Z]").unwrap());

static YEAR_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([0-9]{4}").unwrap());

static ENTRY_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([0-9]{4}[a-z]?)\)").unwrap());

/// Entries at or below this length absorb the next line instead of being flushed.
const MIN_ENTRY_CHARS: usize = 30;
/// A line this long after a full stop starts a new entry.
const MIN_CONTINUATION_START_CHARS: usize = 20;

/// Parse the references section (and any footnotes section) of `text`.
pub fn extract_references(text: &str) -> Vec<Reference> {
    extract_references_with_config(text, &AnalysisConfig::default())
}

/// Config-aware version of [`extract_references`].
///
/// Entries are deduplicated on their normalized key; the first one wins.
pub fn extract_references_with_config(text: &str, config: &AnalysisConfig) -> Vec<Reference> {
    let mut parsed = Vec::new();

    if let Some(refs) = section::find_reference_section_with_config(text, config) {
        parsed.extend(parse_reference_block(refs));
    }
    if let Some(notes) = section::find_footnote_section_with_config(text, config) {
        parsed.extend(parse_reference_block(notes));
    }

    let mut seen = HashSet::new();
    parsed.retain(|r: &Reference| seen.insert(r.normalized.clone()));

    tracing::debug!(count = parsed.len(), "parsed references");
    parsed
}

/// Segment and parse one block of bibliography text.
pub fn parse_reference_block(block: &str) -> Vec<Reference> {
    segment_entries(block)
        .iter()
        .filter_map(|entry| parse_entry(entry))
        .collect()
}

fn starts_with_capital(line: &str) -> bool {
    line.starts_with(|c: char| c.is_ascii_uppercase())
}

fn starts_new_entry(line: &str, current: &str) -> bool {
    NUMBERED_START_RE.is_match(line)
        || SURNAME_INITIAL_START_RE.is_match(line)
        || (starts_with_capital(line) && YEAR_OPEN_RE.is_match(line))
        || (current.ends_with('.')
            && starts_with_capital(line)
            && line.chars().count() > MIN_CONTINUATION_START_CHARS)
}

fn flush(entries: &mut Vec<String>, current: &str) {
    if current.chars().count() > MIN_ENTRY_CHARS && YEAR_OPEN_RE.is_match(current) {
        entries.push(current.trim().to_string());
    } else if !current.is_empty() {
        tracing::trace!(entry = current, "discarding bibliography fragment without a year");
    }
}

/// Split bibliography text into entry strings.
///
/// Lines are joined with single spaces until a line looks like the start of a
/// new entry. Only entries longer than 30 chars containing `(YYYY` survive.
pub fn segment_entries(block: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();

    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if starts_new_entry(line, &current) && current.chars().count() > MIN_ENTRY_CHARS {
            flush(&mut entries, &current);
            current = line.to_string();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(line);
        }
    }
    flush(&mut entries, &current);

    entries
}

/// Parse a single bibliography entry. Returns `None` if it has no `(YYYY)`
/// year or no usable first author.
pub fn parse_entry(entry: &str) -> Option<Reference> {
    let cleaned = NUMBERED_START_RE.replace(entry, "");
    let caps = ENTRY_YEAR_RE.captures(&cleaned)?;
    let whole = caps.get(0)?;
    let year = caps.get(1)?.as_str();

    let before = cleaned[..whole.start()].trim();
    let all_authors = before.strip_suffix('.').unwrap_or(before).trim();

    let first_author = match all_authors.find(',') {
        Some(idx) => all_authors[..idx].trim(),
        None => all_authors.split_whitespace().next().unwrap_or_default(),
    };
    if first_author.chars().count() < 2 {
        return None;
    }

    Some(Reference::new(cleaned.as_ref(), first_author, all_authors, year))
}
