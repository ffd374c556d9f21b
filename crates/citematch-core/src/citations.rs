//! In-text citation recognition.
//!
//! Four recognizers run in a fixed order over the whole document. Each one
//! yields raw matches; the first citation seen for a given normalized key wins,
//! so earlier recognizers take precedence over later ones.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Citation, CitationKind};

/// Any parenthesized group containing a capitalized word followed somewhere by a year.
static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*[A-Z][a-zA-Z\-']+[^)]*[0-9]{4}[a-z]?[^)]*)\)").unwrap());

static PAGE_REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:p\.|pp\.|page|see p)").unwrap());

static GROUP_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{4}[a-z]?)(?:\s*[,;)]|$)").unwrap());

static TRAILING_SEPARATORS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+$").unwrap());

/// `Smith (2020)`, `Smith, Jones & Brown (2020)`, `Smith et al. (2020)`.
static NARRATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-Z][a-zA-Z\-']+(?:\s*,\s*[A-Z][a-zA-Z\-']+)*(?:\s*,?\s*&\s*[A-Z][a-zA-Z\-']+)?(?:\s+et\s+al\.?)?)\s+\(([0-9]{4}[a-z]?)\)",
    )
    .unwrap()
});

/// Narrative citations with more than one ampersand-joined author.
static NARRATIVE_COMPLEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-Z][a-zA-Z\-']+(?:\s*,\s*[A-Z][a-zA-Z\-']+)*(?:\s*,?\s*&\s*[A-Z][a-zA-Z\-']+)+)\s+\(([0-9]{4}[a-z]?)\)",
    )
    .unwrap()
});

/// `(Smith, Jones, & Brown, 2020)`.
static PARENTHETICAL_MULTI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\(([A-Z][a-zA-Z\-']+(?:\s*,\s*[A-Z][a-zA-Z\-']+)*\s*,?\s*&\s*[A-Z][a-zA-Z\-']+)\s*,\s*([0-9]{4}[a-z]?)\)",
    )
    .unwrap()
});

const MIN_GROUP_CHARS: usize = 8;
const MIN_PART_CHARS: usize = 5;

type Recognizer = fn(&str) -> Vec<Citation>;

/// Recognizers in precedence order.
const RECOGNIZERS: &[Recognizer] = &[
    recognize_parenthetical,
    recognize_narrative,
    recognize_narrative_complex,
    recognize_parenthetical_multi,
];

/// Extract deduplicated in-text citations from `text`, in recognizer-then-position order.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut citations = Vec::new();

    for recognize in RECOGNIZERS {
        for citation in recognize(text) {
            if seen.insert(citation.normalized.clone()) {
                citations.push(citation);
            }
        }
    }

    tracing::debug!(count = citations.len(), "extracted in-text citations");
    citations
}

/// Split a parenthetical group on `;` where the next non-space char is an uppercase letter.
fn split_groups(content: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in content.char_indices() {
        if c != ';' {
            continue;
        }
        let rest = content[i + 1..].trim_start();
        if rest.starts_with(|n: char| n.is_ascii_uppercase()) {
            parts.push(&content[start..i]);
            start = i + 1;
        }
    }
    parts.push(&content[start..]);
    parts
}

fn recognize_parenthetical(text: &str) -> Vec<Citation> {
    let mut found = Vec::new();

    for caps in PARENTHETICAL_RE.captures_iter(text) {
        let content = &caps[1];
        if PAGE_REFERENCE_RE.is_match(content)
            || content.chars().all(|c| c.is_ascii_digit())
            || content.chars().count() < MIN_GROUP_CHARS
        {
            continue;
        }

        for part in split_groups(content) {
            let part = part.trim();
            if part.chars().count() < MIN_PART_CHARS {
                continue;
            }
            let Some(year) = GROUP_YEAR_RE.captures(part).and_then(|c| c.get(1)) else {
                continue;
            };
            // Authors end at the first occurrence of the year text, which may
            // precede the occurrence the year pattern matched.
            let cut = part.find(year.as_str()).unwrap_or(year.start());
            let before = TRAILING_SEPARATORS_RE
                .replace(part[..cut].trim(), "")
                .to_string();
            if before.chars().count() <= 2 || !before.chars().any(char::is_alphabetic) {
                continue;
            }
            found.push(Citation::new(
                format!("({})", part),
                before,
                year.as_str(),
                CitationKind::Parenthetical,
            ));
        }
    }

    found
}

fn recognize_narrative_with(re: &Regex, text: &str, kind: CitationKind) -> Vec<Citation> {
    re.captures_iter(text)
        .map(|caps| {
            let authors = caps[1].trim();
            let year = &caps[2];
            Citation::new(format!("{} ({})", authors, year), authors, year, kind)
        })
        .collect()
}

fn recognize_narrative(text: &str) -> Vec<Citation> {
    recognize_narrative_with(&NARRATIVE_RE, text, CitationKind::Narrative)
}

fn recognize_narrative_complex(text: &str) -> Vec<Citation> {
    recognize_narrative_with(&NARRATIVE_COMPLEX_RE, text, CitationKind::NarrativeComplex)
}

fn recognize_parenthetical_multi(text: &str) -> Vec<Citation> {
    PARENTHETICAL_MULTI_RE
        .captures_iter(text)
        .map(|caps| {
            let authors = caps[1].trim();
            let year = &caps[2];
            Citation::new(
                format!("({}, {})", authors, year),
                authors,
                year,
                CitationKind::ParentheticalMulti,
            )
        })
        .collect()
}
