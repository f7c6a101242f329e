//! tailpath - discover layout-encoded log artifacts and read them as rows.
//!
//! Usage:
//!   tailpath discover [PATHS]...   List artifacts matching the layout
//!   tailpath download [PATHS]...   Check discovered artifacts are readable
//!   tailpath rows -c FILE          Print each artifact line as a JSON row
//!   tailpath csv-opts -c FILE      Print the delimited reader options
//!   tailpath --help                Show help

mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tailpath_format::{ArtifactRows, FormatRegistry, LineFormat, LogTable};
use tailpath_scan::{
    DiscoveryEvent, DiscoveryStats, DownloadedArtifactInfo, EventLog, FileSource, SourceRegistry,
    start_discovery,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{CollectionConfig, SourceOverrides, parse_pattern};

#[derive(Parser)]
#[command(
    name = "tailpath",
    version,
    about = "Discover log artifacts by path layout and parse them into rows",
    long_about = "tailpath walks root directories, pruning every subtree that cannot \
                  match the configured file layout, and reports the artifacts it finds \
                  together with the fields captured from their paths.\n\n\
                  Set RUST_LOG to control log output (default: info)."
)]
struct Cli {
    /// Collection config file (TOML with [source] and [table] blocks)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover artifacts and print them as they are found
    Discover {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Discover artifacts and check each one can be opened
    Download {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Parse every discovered artifact through the table format
    Rows {
        #[command(flatten)]
        source: SourceArgs,

        /// Table name (overrides the config's [table] name)
        #[arg(short, long)]
        table: Option<String>,

        /// Format preset to use instead of the config's table format
        #[arg(long)]
        preset: Option<String>,

        /// Stop after this many rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Print the reader options of a delimited table format
    CsvOpts,

    /// List the built-in format presets
    Formats,
}

#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Root directories to walk
    paths: Vec<PathBuf>,

    /// Source type (file or file_system)
    #[arg(long = "type")]
    source_type: Option<String>,

    /// File layout, e.g. "AWSLogs/(%{WORD:org}/)?%{WORD:account_id}/%{DATA}"
    #[arg(short, long)]
    layout: Option<String>,

    /// Allowed file extension, e.g. ".log" (repeatable)
    #[arg(short, long = "ext")]
    extensions: Vec<String>,

    /// Custom grok pattern as NAME=PATTERN (repeatable)
    #[arg(short, long = "pattern", value_parser = parse_pattern)]
    patterns: Vec<(String, String)>,
}

impl SourceArgs {
    fn overrides(&self) -> SourceOverrides {
        SourceOverrides {
            source_type: self.source_type.clone(),
            paths: self.paths.clone(),
            layout: self.layout.clone(),
            extensions: self.extensions.clone(),
            patterns: self.patterns.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Discover { source, format } => {
            let config = load_config(cli.config.as_ref(), &source)?;
            run_discover(config.build_source(&SourceRegistry::with_defaults())?, format).await?;
        }
        Command::Download { source, format } => {
            let config = load_config(cli.config.as_ref(), &source)?;
            run_download(config.build_source(&SourceRegistry::with_defaults())?, format).await?;
        }
        Command::Rows {
            source,
            table,
            preset,
            limit,
        } => {
            let config = load_config(cli.config.as_ref(), &source)?;
            let source = config.build_source(&SourceRegistry::with_defaults())?;
            let table = resolve_table(&config, table, preset)?;
            run_rows(source, table, limit).await?;
        }
        Command::CsvOpts => {
            let Some(path) = cli.config.as_ref() else {
                bail!("csv-opts needs --config");
            };
            let config = CollectionConfig::load(path)?;
            run_csv_opts(&config.build_table(&FormatRegistry::with_defaults())?)?;
        }
        Command::Formats => run_formats(),
    }

    Ok(())
}

/// Log to stderr so stdout only carries command output.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn load_config(path: Option<&PathBuf>, args: &SourceArgs) -> Result<CollectionConfig> {
    let overrides = args.overrides();
    match path {
        Some(path) => {
            let mut config = CollectionConfig::load(path)?;
            config.apply(&overrides);
            Ok(config)
        }
        None => Ok(CollectionConfig::from_overrides(&overrides)),
    }
}

fn resolve_table(
    config: &CollectionConfig,
    name: Option<String>,
    preset: Option<String>,
) -> Result<LogTable> {
    let registry = FormatRegistry::with_defaults();
    let mut table = match (&config.table, &preset) {
        (Some(_), None) => config.build_table(&registry)?,
        (_, Some(preset)) => {
            let format = registry
                .get(preset)
                .cloned()
                .ok_or_else(|| color_eyre::eyre::eyre!("unknown format preset '{preset}'"))?;
            let name = config
                .table
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_default();
            LogTable::new(name, format)
        }
        (None, None) => bail!("rows needs a [table] block in --config or --preset"),
    };
    if let Some(name) = name {
        table.name = name;
    }
    if table.name.is_empty() {
        table.name = "logs".to_string();
    }
    table.validate().wrap_err("Invalid table configuration")?;
    Ok(table)
}

/// Stream discovery events as they arrive.
async fn run_discover(source: FileSource, format: OutputFormat) -> Result<()> {
    let (mut events, handle) = start_discovery(source, CancellationToken::new());

    while let Some(event) = events.recv().await {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
            OutputFormat::Text => match &event {
                DiscoveryEvent::ArtifactDiscovered(info) => {
                    let fields = info
                        .source_enrichment
                        .fields
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!("{}  {}", info.name.display(), fields);
                }
                DiscoveryEvent::Error(err) => eprintln!("error: {err}"),
                DiscoveryEvent::ArtifactDownloaded(_) => {}
            },
        }
    }

    let stats = handle.await.wrap_err("Discovery task failed")??;
    print_summary(&stats, format)
}

/// Discover, then run the readiness check on every artifact.
async fn run_download(source: FileSource, format: OutputFormat) -> Result<()> {
    let (downloads, stats) = tokio::task::spawn_blocking(move || discover_and_download(source))
        .await
        .wrap_err("Download task failed")??;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&downloads)?),
        OutputFormat::Text => {
            for downloaded in &downloads {
                println!(
                    "{:>10}  {}",
                    format_size(downloaded.size_bytes),
                    downloaded.local_path.display()
                );
            }
            let total: u64 = downloads.iter().map(|d| d.size_bytes).sum();
            eprintln!(
                "{} artifacts ready, {} total",
                downloads.len(),
                format_size(total)
            );
        }
    }
    print_summary(&stats, format)
}

/// Parse every artifact and print one JSON object per row.
async fn run_rows(source: FileSource, table: LogTable, limit: Option<usize>) -> Result<()> {
    let (downloads, stats) = tokio::task::spawn_blocking(move || discover_and_download(source))
        .await
        .wrap_err("Download task failed")??;

    let (rows, skipped) = tokio::task::spawn_blocking(move || print_rows(&table, &downloads, limit))
        .await
        .wrap_err("Row task failed")??;

    tracing::info!(
        rows,
        skipped_lines = skipped,
        artifacts = stats.files_matched,
        "rows complete"
    );
    Ok(())
}

fn discover_and_download(
    mut source: FileSource,
) -> Result<(Vec<DownloadedArtifactInfo>, DiscoveryStats)> {
    let log = std::sync::Arc::new(EventLog::new());
    source.add_observer(log.clone());
    let stats = source
        .discover_artifacts(&CancellationToken::new())
        .wrap_err("Discovery failed")?;

    let mut downloads = Vec::new();
    for info in log.artifacts() {
        match source.download_artifact(&info) {
            Ok(downloaded) => downloads.push(downloaded),
            Err(err) => tracing::warn!(error = %err, "skipping artifact"),
        }
    }
    for err in log.errors() {
        tracing::warn!(path = %err.path.display(), error = %err.message, "root skipped");
    }
    Ok((downloads, stats))
}

fn print_rows(
    table: &LogTable,
    downloads: &[DownloadedArtifactInfo],
    limit: Option<usize>,
) -> Result<(usize, usize)> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut printed = 0;
    let mut skipped = 0;

    for downloaded in downloads {
        let rows = match ArtifactRows::open(table, downloaded) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "skipping artifact");
                continue;
            }
        };
        for row in rows {
            if printed >= limit {
                return Ok((printed, skipped));
            }
            match row {
                Ok(row) => {
                    println!("{}", serde_json::to_string(&row)?);
                    printed += 1;
                }
                Err(err) if err.is_line_error() => {
                    tracing::debug!(error = %err, "skipping line");
                    skipped += 1;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "stopped reading artifact");
                    break;
                }
            }
        }
    }
    Ok((printed, skipped))
}

fn run_csv_opts(table: &LogTable) -> Result<()> {
    let LineFormat::Delimited(format) = &table.format else {
        bail!(
            "table '{}' uses the {} format, not delimited",
            table.name,
            table.format.identifier()
        );
    };
    println!("{}", format.csv_options().join(", "));
    Ok(())
}

fn run_formats() {
    let registry = FormatRegistry::with_defaults();
    for name in registry.names() {
        if let Some(format) = registry.get(name) {
            println!("{:<16} {}", name, format.identifier());
        }
    }
}

fn print_summary(stats: &DiscoveryStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => eprintln!("{}", serde_json::to_string(stats)?),
        OutputFormat::Text => eprintln!(
            "{} matched, {} skipped, {} directories pruned, {} roots failed in {:.2}s",
            stats.files_matched,
            stats.files_skipped,
            stats.dirs_pruned,
            stats.roots_failed,
            stats.duration.as_secs_f64()
        ),
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
