pub mod export;
pub mod types;

pub use export::{export_report, render_json, render_markdown, render_report};
pub use types::{ExportFormat, ReportOptions};
