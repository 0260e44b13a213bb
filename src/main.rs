use clap::{Parser, builder::styling};
use compound_etl::etl::{Extractor, Loader, Outcome, OutputMode, Pipeline, Transformer};
use eyre::Result;
use owo_colors::OwoColorize;
use url::Url;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Dataset file id on the cloud file host.
const SOURCE_FILE_ID: &str = "1nlMjNIXTlpgZxeLT62wG5IO3hWqsBfH1";

/// Local path the fetched payload is written to.
const RAW_DATASET_PATH: &str = "data/raw/dataset.csv";

/// Destination database name.
const DATABASE_NAME: &str = "homeworks";

/// Compound ETL: fetch the chemical-compound dataset, normalize it, and load it to PostgreSQL and/or Parquet
#[derive(Parser)]
#[command(name = "cetl", version, styles = STYLES)]
struct Cli {
    /// Maximum number of rows to load (must be positive)
    #[arg(long, default_value_t = 100, value_parser = parse_max_rows)]
    max_rows: usize,

    /// Destination(s) to write the transformed table to
    #[arg(long, value_enum, default_value_t = OutputMode::Both)]
    output: OutputMode,

    /// Name of the destination database table
    #[arg(long, default_value = "grebennikov")]
    table_name: String,

    /// Source URL to fetch the dataset from
    #[arg(long, conflicts_with = "input")]
    source_url: Option<String>,

    /// Parse an existing local file instead of fetching the remote source
    #[arg(long)]
    input: Option<String>,

    /// The dotenv file to source credentials from
    #[arg(short, long, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long)]
    debug: bool,
}

fn parse_max_rows(value: &str) -> Result<usize, String> {
    let rows: i64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if rows <= 0 {
        return Err("must be a positive number".to_string());
    }
    Ok(rows as usize)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    // Credentials are optional until the database destination is requested
    if let Err(e) = dotenvy::from_filename(&cli.env) {
        log::debug!("No dotenv file loaded from {}: {}", cli.env, e);
    }

    let extractor = match &cli.input {
        Some(path) => {
            log::info!("Using local dataset: {}", path.bright_black());
            Extractor::from_local(path)
        }
        None => {
            let url_str = cli
                .source_url
                .clone()
                .unwrap_or_else(|| format!("https://drive.google.com/uc?id={}", SOURCE_FILE_ID));
            let url = Url::parse(&url_str)?;
            Extractor::new(url, RAW_DATASET_PATH)
        }
    };

    log::info!(
        "Running pipeline: up to {} rows to {}",
        cli.max_rows.cyan(),
        cli.output.cyan()
    );
    let mut pipeline = Pipeline::new(
        extractor,
        Transformer::new(cli.max_rows),
        Loader::new(DATABASE_NAME, &cli.table_name, cli.output),
        cli.max_rows,
    );
    let result = pipeline.run().await;

    for warning in &result.validation_warnings {
        log::warn!("{}", warning.yellow());
    }

    match result.outcome {
        Outcome::Success => {
            log::info!(
                "✓ Pipeline succeeded: {} row(s) processed, {} row(s) loaded, {} warning(s)",
                result.rows_processed,
                result.rows_loaded,
                result.validation_warnings.len()
            );
            Ok(())
        }
        Outcome::Failure(reason) => {
            log::error!("✗ Pipeline failed: {}", reason);
            std::process::exit(1);
        }
    }
}
