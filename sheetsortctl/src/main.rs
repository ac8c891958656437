use std::{
    fs,
    io::{self, BufWriter},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sheetsort_config::{SorterSettings, SorterSettingsSource};
use sheetsort_core::{
    ColumnRef, ColumnType, MemorySheet, OrderingManager, OrderingMode, Record, SortCommand,
    SortHandle, SortOutcome,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod tsv;

use tsv::Table;

#[derive(Parser)]
#[command(name = "sheetsortctl", about = "Sort delimited text files by one or more columns")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sort the rows of a delimited file and print them
    Sort(SortArgs),
    /// List the named sort commands
    Commands,
}

#[derive(clap::Args)]
struct SortArgs {
    /// Input file (tab separated unless the settings say otherwise)
    file: PathBuf,
    /// Sort key as NAME or NAME:desc; repeat for tie-breakers
    #[arg(long = "key", value_name = "NAME[:desc]", conflicts_with = "command")]
    keys: Vec<KeyArg>,
    /// Named sort command, e.g. sort-desc or sort-keys-asc-add
    #[arg(long, value_parser = parse_command, requires = "cursor")]
    command: Option<SortCommand>,
    /// Cursor column for --command
    #[arg(long, value_name = "COL")]
    cursor: Option<String>,
    /// Key column for the sort-keys-* commands; repeatable
    #[arg(long = "key-column", value_name = "COL")]
    key_columns: Vec<String>,
    /// Declare a column type (int, float, date, text); repeatable
    #[arg(long = "type", value_name = "NAME=TYPE", value_parser = parse_type_arg)]
    types: Vec<(String, ColumnType)>,
    /// Settings file (TOML or JSON); overrides SHEETSORT_CONFIG_PATH
    #[arg(long)]
    config: Option<PathBuf>,
    /// Treat the first line as data; columns are named 1, 2, ...
    #[arg(long)]
    no_header: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct KeyArg {
    name: String,
    descending: bool,
}

impl FromStr for KeyArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, descending) = match s.rsplit_once(':') {
            Some((name, "desc")) => (name, true),
            Some((name, "asc")) => (name, false),
            _ => (s, false),
        };
        if name.is_empty() {
            return Err(format!("missing column name in `{s}`"));
        }
        Ok(Self {
            name: name.to_string(),
            descending,
        })
    }
}

fn parse_command(raw: &str) -> std::result::Result<SortCommand, String> {
    raw.parse::<SortCommand>().map_err(|err| err.to_string())
}

fn parse_type_arg(raw: &str) -> std::result::Result<(String, ColumnType), String> {
    let (name, ty) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TYPE, got `{raw}`"))?;
    Ok((name.to_string(), ty.parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the sorted rows.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sort(args) => run_sort(args).await,
        Command::Commands => {
            for command in SortCommand::ALL {
                println!("{:<20} {}", command.name(), command.description());
            }
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<(SorterSettings, SorterSettingsSource)> {
    match path {
        Some(path) => Ok((
            SorterSettings::load_from_file(path)?,
            SorterSettingsSource::File(path.to_path_buf()),
        )),
        None => SorterSettings::load_from_env(),
    }
}

async fn run_sort(args: SortArgs) -> Result<()> {
    let (settings, source) = load_settings(args.config.as_deref())?;
    debug!(?source, ?settings, "settings loaded");

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let table = Table::parse(&text, settings.tsv_delimiter, !args.no_header)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    let names = table.column_names();
    for (name, _) in &args.types {
        if !names.contains(name) {
            bail!("--type names unknown column `{name}`");
        }
    }
    let columns: Vec<(&str, ColumnType)> = names
        .iter()
        .map(|name| {
            let ty = args
                .types
                .iter()
                .rev()
                .find(|(typed, _)| typed == name)
                .map(|(_, ty)| *ty)
                .unwrap_or_else(|| settings.column_type(name));
            (name.as_str(), ty)
        })
        .collect();

    let sheet_name = args
        .file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".to_string());
    let sheet = Arc::new(MemorySheet::from_records(
        sheet_name,
        &columns,
        table.rows.clone(),
    ));
    let mut manager = OrderingManager::new(Arc::clone(&sheet), settings.sort.clone());

    let outcome = match args.command {
        Some(command) => {
            let cursor = args.cursor.clone().unwrap_or_default();
            let key_columns: Vec<ColumnRef<Record>> =
                args.key_columns.iter().map(|name| name.as_str().into()).collect();
            let handle = manager
                .apply_command(command, cursor.into(), &key_columns)
                .await
                .with_context(|| format!("{command} failed"))?;
            finish(handle).await?
        }
        None => apply_keys(&mut manager, &args.keys).await?,
    };

    if let Some(outcome) = &outcome {
        info!(rows = table.rows.len(), ?outcome, "sort finished");
        if let Some(warning) = outcome.warning() {
            eprintln!("warning: {warning}");
        }
    }

    let rows = sheet.snapshot().await.unwrap_or_default();
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());
    tsv::write_rows(out, table.header.as_deref(), &rows, settings.tsv_delimiter)
        .context("failed to write rows")?;
    Ok(())
}

/// Apply `keys` in order. Runs of keys with the same direction go in one
/// ordering change; each change waits for its sort before the next starts.
async fn apply_keys(
    manager: &mut OrderingManager<MemorySheet>,
    keys: &[KeyArg],
) -> Result<Option<SortOutcome>> {
    let mut outcome = None;
    let mut mode = OrderingMode::Replace;

    for run in keys.chunk_by(|a, b| a.descending == b.descending) {
        let names: Vec<&str> = run.iter().map(|key| key.name.as_str()).collect();
        let handle = manager
            .set_ordering(names, run[0].descending, mode)
            .await
            .context("invalid sort key")?;
        outcome = finish(handle).await?.or(outcome);
        mode = OrderingMode::Append;
    }

    Ok(outcome)
}

async fn finish(handle: Option<SortHandle>) -> Result<Option<SortOutcome>> {
    match handle {
        Some(handle) => Ok(Some(handle.wait().await?)),
        None => Ok(None),
    }
}
