use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use citematch_core::config_file::{self, ConfigFile};
use citematch_core::verify::{self, ReferenceVerification, VerifyConfig};
use citematch_core::{AnalysisSession, SuggestionList, SuggestionStage};
use citematch_reporting::{ExportFormat, ReportOptions};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod output;
mod review;

use output::ColorMode;

/// Academic reference checker - match in-text citations against the reference list
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Read configuration from this TOML file on top of the default cascade
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Input {
    /// Path to a plain-text document, or - for stdin
    file_path: PathBuf,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match citations to references and print the report
    Analyze {
        #[command(flatten)]
        input: Input,

        /// Report format: text, markdown or json
        #[arg(long, default_value = "text")]
        format: ExportFormat,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated suggestion stages to append (2, 3, 4)
        #[arg(long, value_delimiter = ',')]
        stages: Vec<u8>,
    },

    /// Analyze, then confirm or dismiss suggestions interactively
    Review {
        #[command(flatten)]
        input: Input,

        /// Write the final report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look up every reference in bibliographic databases
    Verify {
        #[command(flatten)]
        input: Input,

        /// Report format: text, markdown or json
        #[arg(long, default_value = "text")]
        format: ExportFormat,

        /// Write the report, with verdicts appended, to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated list of sources to skip
        #[arg(long, value_delimiter = ',')]
        disable_sources: Vec<String>,

        /// Contact address for the CrossRef and OpenAlex polite pools
        #[arg(long)]
        mailto: Option<String>,

        /// Semantic Scholar API key
        #[arg(long)]
        s2_api_key: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Print the effective merged configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = load_file_config(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze {
            input,
            format,
            output,
            stages,
        } => analyze(input, format, output, stages, &file_config).await,
        Command::Review { input, output } => review_cmd(input, output, &file_config).await,
        Command::Verify {
            input,
            format,
            output,
            disable_sources,
            mailto,
            s2_api_key,
            timeout,
        } => {
            let config = resolve_verify_config(
                &file_config,
                disable_sources,
                mailto,
                s2_api_key,
                timeout,
            );
            verify_cmd(input, format, output, config, &file_config).await
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&file_config)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The cascaded config, with `--config` (if any) layered on top.
fn load_file_config(explicit: Option<&Path>) -> anyhow::Result<ConfigFile> {
    let cascaded = config_file::load_config();
    match explicit {
        Some(path) => {
            let overlay = config_file::read_config(path)
                .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path.display(), e))?;
            Ok(config_file::merge(cascaded, overlay))
        }
        None => Ok(cascaded),
    }
}

// Resolve configuration: CLI flags > env vars > config file > defaults
fn resolve_verify_config(
    file_config: &ConfigFile,
    disable_sources: Vec<String>,
    mailto: Option<String>,
    s2_api_key: Option<String>,
    timeout: Option<u64>,
) -> VerifyConfig {
    let mut config = file_config.verify_config();

    if let Some(m) = mailto.or_else(|| std::env::var("CROSSREF_MAILTO").ok()) {
        config.mailto = Some(m);
    }
    if let Some(k) = s2_api_key.or_else(|| std::env::var("S2_API_KEY").ok()) {
        config.s2_api_key = Some(k);
    }
    let timeout = timeout.or_else(|| {
        std::env::var("VERIFY_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
    });
    if let Some(secs) = timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if !disable_sources.is_empty() {
        config.disabled_sources = disable_sources;
    }
    config
}

fn read_document(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))
}

fn display_name(path: &Path) -> String {
    if path == Path::new("-") {
        return "<stdin>".to_string();
    }
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_stages(numbers: &[u8]) -> anyhow::Result<Vec<SuggestionStage>> {
    let mut stages = Vec::with_capacity(numbers.len());
    for &n in numbers {
        let stage = SuggestionStage::try_from(n)
            .map_err(|n| anyhow::anyhow!("Unknown suggestion stage {} (expected 2, 3 or 4)", n))?;
        if !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    stages.sort();
    Ok(stages)
}

fn generated_on() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Run the initial analysis, printing the extraction summary to stderr.
async fn start_session(
    input: &Input,
    file_config: &ConfigFile,
    color: ColorMode,
) -> anyhow::Result<AnalysisSession> {
    let text = read_document(&input.file_path)?;
    let session = AnalysisSession::new(file_config.analysis_config()?);
    let results = session.analyze(&text).await?;
    output::print_extraction_summary(
        &mut std::io::stderr(),
        &display_name(&input.file_path),
        &results,
        color,
    )?;
    Ok(session)
}

/// `path`, with the format's extension added when it has none.
fn report_path(path: &Path, format: ExportFormat) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(format.extension())
    }
}

fn write_report(
    session: &AnalysisSession,
    suggestions: &[SuggestionList],
    verifications: &[ReferenceVerification],
    format: ExportFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let results = session
        .results()
        .ok_or_else(|| anyhow::anyhow!("No analysis results"))?;
    let stamp = generated_on();
    let options = ReportOptions {
        generated_on: Some(&stamp),
        suggestions,
        verifications,
    };

    match output {
        Some(path) => {
            let path = report_path(path, format);
            citematch_reporting::export_report(&results, &options, format, &path)?;
            eprintln!("Report written to {}", path.display());
        }
        None => {
            let rendered = match format {
                ExportFormat::Text => citematch_reporting::render_report(&results, &options),
                ExportFormat::Markdown => citematch_reporting::render_markdown(&results, &options),
                ExportFormat::Json => citematch_reporting::render_json(&results, &options)?,
            };
            let mut stdout = std::io::stdout();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn analyze(
    input: Input,
    format: ExportFormat,
    output: Option<PathBuf>,
    stages: Vec<u8>,
    file_config: &ConfigFile,
) -> anyhow::Result<()> {
    let stages = parse_stages(&stages)?;
    let color = ColorMode(!input.no_color && output.is_none());
    let session = start_session(&input, file_config, color).await?;

    let mut lists = Vec::with_capacity(stages.len());
    for stage in stages {
        let list = session.run_stage(stage).await?;
        tracing::info!(stage = stage.number(), suggestions = list.len(), "stage complete");
        lists.push(list);
    }

    write_report(&session, &lists, &[], format, output.as_deref())
}

async fn review_cmd(
    input: Input,
    output: Option<PathBuf>,
    file_config: &ConfigFile,
) -> anyhow::Result<()> {
    if input.file_path == Path::new("-") {
        anyhow::bail!("review reads answers from stdin; pass the document as a file path");
    }
    let color = ColorMode(!input.no_color);
    let session = start_session(&input, file_config, color).await?;

    let stdin = std::io::stdin();
    let mut answers = stdin.lock();
    let mut prompt = std::io::stderr();
    let tally = review::review(&session, &mut answers, &mut prompt, color).await?;
    eprintln!(
        "\nReview finished: {} confirmed, {} dismissed, {} skipped\n",
        tally.confirmed, tally.dismissed, tally.skipped
    );

    write_report(&session, &[], &[], ExportFormat::Text, output.as_deref())
}

async fn verify_cmd(
    input: Input,
    format: ExportFormat,
    output: Option<PathBuf>,
    config: VerifyConfig,
    file_config: &ConfigFile,
) -> anyhow::Result<()> {
    let color = ColorMode(!input.no_color);
    let session = start_session(&input, file_config, color).await?;
    let results = session
        .results()
        .ok_or_else(|| anyhow::anyhow!("No analysis results"))?;

    // Progress goes to stderr so a report on stdout stays clean.
    let mut w = std::io::stderr();

    if verify::build_sources(&config).is_empty() {
        output::print_warning(&mut w, "all verification sources are disabled", color)?;
        return Ok(());
    }

    let mut printed: std::io::Result<()> = Ok(());
    let verifications = verify::verify_references(&results.references, &config, |event| {
        if printed.is_ok() {
            printed = output::print_verify_event(&mut w, &event, color);
        }
    })
    .await?;
    printed?;

    let verdicts: Vec<_> = verifications.iter().flat_map(|v| &v.verdicts).collect();
    output::print_verify_summary(&mut w, &verdicts, color)?;
    writeln!(w)?;

    write_report(&session, &[], &verifications, format, output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_path_adds_missing_extension() {
        assert_eq!(
            report_path(Path::new("out/report"), ExportFormat::Markdown),
            PathBuf::from("out/report.md")
        );
        assert_eq!(
            report_path(Path::new("report.txt"), ExportFormat::Json),
            PathBuf::from("report.txt")
        );
    }

    #[test]
    fn verify_flags_parse() {
        let cli = Cli::try_parse_from([
            "citematch", "verify", "paper.txt", "--format", "json", "-o", "out.json",
            "--disable-sources", "PubMed,OpenAlex",
        ])
        .unwrap();
        match cli.command {
            Command::Verify {
                format,
                output,
                disable_sources,
                ..
            } => {
                assert_eq!(format, ExportFormat::Json);
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert_eq!(disable_sources, vec!["PubMed", "OpenAlex"]);
            }
            other => panic!("expected verify, got {other:?}"),
        }
    }
}
