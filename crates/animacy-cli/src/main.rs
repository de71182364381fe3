//! CLI binary for processing Animacy replication study exports.

use std::path::{Path, PathBuf};

use animacy_io::{CsvTableStore, TableFormat, TableSink, TableSource, XlsxTableStore};
use animacy_pipeline::{BatchOptions, BatchReport, PipelineConfig, PipelineRunner, Severity};
use animacy_spell::{DictionaryFormat, DynDictionary, FrequencyDictionary};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "animacy", version, about = "Survey export pre-processing for the English Animacy Experiment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every matching export in a directory
    Run {
        /// Directory containing the raw exports
        dir: PathBuf,

        /// File-name pattern selecting exports
        #[arg(short, long, default_value = animacy_io::DEFAULT_PATTERN)]
        pattern: String,

        /// Export file format (default: taken from the pattern's extension)
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Pipeline config file (JSON); defaults to the replication study settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dictionary for spell correction (.json frequencies, .txt corpus, or word list)
        #[arg(short, long)]
        dictionary: PathBuf,

        /// Dictionary file format: json, words, or corpus (default: from the extension)
        #[arg(long)]
        dictionary_format: Option<DictionaryFormat>,

        /// Where processed tables are written (default: next to the inputs)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write a JSON run report (events, failures, keyword tallies)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Abort on the first table error instead of skipping the table
        #[arg(long)]
        fail_fast: bool,
    },

    /// Lint a pipeline config
    Validate {
        /// Pipeline config file (JSON); defaults to the replication study settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the stages, item groups, and derived columns of a config
    Info {
        /// Pipeline config file (JSON); defaults to the replication study settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the effective config as JSON
        #[arg(long)]
        dump_config: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Xlsx,
}

impl From<Format> for TableFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => TableFormat::Csv,
            Format::Xlsx => TableFormat::Xlsx,
        }
    }
}

/// Where and how `run` reads exports and writes processed tables.
struct RunTarget<'a> {
    dir: &'a Path,
    pattern: &'a str,
    format: Option<Format>,
    output_dir: Option<&'a Path>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    match cli.command {
        Commands::Run {
            dir,
            pattern,
            format,
            config,
            dictionary,
            dictionary_format,
            output_dir,
            report,
            fail_fast,
        } => {
            let target = RunTarget {
                dir: &dir,
                pattern: &pattern,
                format,
                output_dir: output_dir.as_deref(),
            };
            cmd_run(
                &target,
                config.as_deref(),
                &dictionary,
                dictionary_format,
                report.as_deref(),
                fail_fast,
            )?;
        }
        Commands::Validate { config } => {
            cmd_validate(config.as_deref())?;
        }
        Commands::Info { config, dump_config } => {
            cmd_info(config.as_deref(), dump_config)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn cmd_run(
    target: &RunTarget<'_>,
    config: Option<&Path>,
    dictionary: &Path,
    dictionary_format: Option<DictionaryFormat>,
    report_path: Option<&Path>,
    fail_fast: bool,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let dictionary = match dictionary_format {
        Some(format) => FrequencyDictionary::load_as(dictionary, format)?,
        None => FrequencyDictionary::load(dictionary)?,
    };
    tracing::info!(words = dictionary.len(), "Dictionary loaded");

    let format = match target.format {
        Some(format) => format.into(),
        None => TableFormat::from_name(target.pattern).ok_or_else(|| {
            anyhow::anyhow!(
                "cannot tell the export format from pattern '{}'; pass --format",
                target.pattern
            )
        })?,
    };
    let output_dir = target.output_dir.unwrap_or(target.dir);
    let suffix = config.output.suffix.clone();

    println!("Processing exports in {}", target.dir.display());
    println!("Output: {}", output_dir.display());

    let runner = PipelineRunner::new(config, DynDictionary::new(dictionary));
    let options = BatchOptions { fail_fast };
    let report = match format {
        TableFormat::Csv => {
            let store = CsvTableStore::new(target.dir)
                .with_pattern(target.pattern)
                .with_output_dir(output_dir)
                .with_output_suffix(suffix);
            run_store(&runner, &store, options)?
        }
        TableFormat::Xlsx => {
            let store = XlsxTableStore::new(target.dir)
                .with_pattern(target.pattern)
                .with_output_dir(output_dir)
                .with_output_suffix(suffix);
            run_store(&runner, &store, options)?
        }
    };

    println!("\nRun {}", report.run_id);
    for table in &report.tables {
        println!(
            "  {} -> {} ({} rows, {} corrections)",
            table.input, table.output, table.rows, table.corrections
        );
    }
    for failure in &report.failures {
        let stage = failure.stage.as_deref().unwrap_or("read");
        println!("  {} skipped at {}: {}", failure.table, stage, failure.error);
    }
    println!(
        "Processed: {}, skipped: {}",
        report.tables.len(),
        report.failures.len()
    );

    if let Some(path) = report_path {
        report.save(path)?;
        println!("Report: {}", path.display());
    }

    Ok(())
}

/// Run a batch over a store that is both the source and the sink.
fn run_store<S: TableSource + TableSink>(
    runner: &PipelineRunner,
    store: &S,
    options: BatchOptions,
) -> anyhow::Result<BatchReport> {
    Ok(runner.run_batch(store, store, options)?)
}

fn cmd_validate(path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let diagnostics = animacy_pipeline::validate(&config);

    if diagnostics.is_empty() {
        println!("Config is valid");
        return Ok(());
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
        if let Some(fix) = &diag.fix {
            println!("        fix: {}", fix);
        }
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_info(path: Option<&Path>, dump_config: bool) -> anyhow::Result<()> {
    let config = load_config(path)?;

    if dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let runner = PipelineRunner::new(config.clone(), DynDictionary::new(FrequencyDictionary::new()));
    println!("Stages: {}", runner.stage_names().join(" -> "));

    let gates: Vec<String> = config
        .exclusion
        .gatekeepers
        .iter()
        .map(|g| format!("{} > {}", g.column, g.greater_than))
        .collect();
    println!("Gatekeepers: {}", gates.join(", "));
    println!("Subject id column: {}", config.exclusion.subject_id_column);

    println!("\nItem groups:");
    for group in &config.scoring.groups {
        println!(
            "  {} ({} items): {}",
            group.name,
            group.columns.len(),
            group.columns.join(", ")
        );
    }

    println!("\nDerived columns:");
    for score in &config.scoring.scores {
        println!("  {} = {:?}", score.column, score.aggregation);
    }

    println!("\nFree-text column: {}", config.text.column);
    println!("Keywords: {}", config.text.keywords.join(", "));
    println!("Output suffix: {}", config.output.suffix);

    Ok(())
}
