use std::fmt;
use std::str::FromStr;

use citematch_core::SuggestionList;
use citematch_core::verify::ReferenceVerification;

/// Output format for [`export_report`](crate::export_report).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Text => "Text",
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Json => "JSON",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!(
                "unknown format '{other}' (expected text, markdown or json)"
            )),
        }
    }
}

/// Extras rendered alongside the fixed report sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions<'a> {
    /// Shown as the "Generated on:" line when set.
    pub generated_on: Option<&'a str>,
    /// Pending suggestions, appended per stage.
    pub suggestions: &'a [SuggestionList],
    /// Verification verdicts, appended per reference.
    pub verifications: &'a [ReferenceVerification],
}
