use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalysisConfig;

/// A heading line reading `References`, `Bibliography` or `Works Cited`.
static REFERENCES_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:references|bibliography|works[ \t]+cited)[ \t]*:?[ \t]*\r?$")
        .unwrap()
});

static FOOTNOTES_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:footnotes|endnotes)[ \t]*:?[ \t]*\r?$").unwrap()
});

fn references_heading(config: &AnalysisConfig) -> &Regex {
    config
        .references_heading_re
        .as_ref()
        .unwrap_or(&REFERENCES_HEADING_RE)
}

fn footnotes_heading(config: &AnalysisConfig) -> &Regex {
    config
        .footnotes_heading_re
        .as_ref()
        .unwrap_or(&FOOTNOTES_HEADING_RE)
}

/// Text after the references heading, cut at a following footnotes heading.
///
/// Returns `None` when the document has no references heading.
pub fn find_reference_section(text: &str) -> Option<&str> {
    find_reference_section_with_config(text, &AnalysisConfig::default())
}

/// Config-aware version of [`find_reference_section`].
pub fn find_reference_section_with_config<'a>(
    text: &'a str,
    config: &AnalysisConfig,
) -> Option<&'a str> {
    let heading = references_heading(config).find(text)?;
    let rest = &text[heading.end()..];
    let end = footnotes_heading(config)
        .find(rest)
        .map_or(rest.len(), |m| m.start());
    Some(&rest[..end])
}

/// Everything after the first footnotes/endnotes heading.
pub fn find_footnote_section(text: &str) -> Option<&str> {
    find_footnote_section_with_config(text, &AnalysisConfig::default())
}

/// Config-aware version of [`find_footnote_section`].
pub fn find_footnote_section_with_config<'a>(
    text: &'a str,
    config: &AnalysisConfig,
) -> Option<&'a str> {
    let heading = footnotes_heading(config).find(text)?;
    Some(&text[heading.end()..])
}

/// The searchable body of the document: text before the references heading,
/// plus any footnotes that follow the references.
///
/// The whole text is returned when there is no references heading.
pub fn main_body(text: &str) -> Cow<'_, str> {
    main_body_with_config(text, &AnalysisConfig::default())
}

/// Config-aware version of [`main_body`].
pub fn main_body_with_config<'a>(text: &'a str, config: &AnalysisConfig) -> Cow<'a, str> {
    let Some(heading) = references_heading(config).find(text) else {
        return Cow::Borrowed(text);
    };
    let before = &text[..heading.start()];
    let after = &text[heading.end()..];

    match footnotes_heading(config).find(after) {
        Some(notes) => {
            let mut body = String::with_capacity(before.len() + after.len() - notes.start());
            body.push_str(before);
            body.push_str(&after[notes.start()..]);
            Cow::Owned(body)
        }
        None => Cow::Borrowed(before),
    }
}

/// Largest char boundary at or below `idx`.
pub(crate) fn floor_char_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char boundary at or above `idx`.
pub(crate) fn ceil_char_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
