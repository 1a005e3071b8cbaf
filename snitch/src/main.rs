//! Dead Man's Snitch CLI: check in, list, filter, tag, pause, and delete snitches from the terminal.

mod output;

use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use snitch_lib::{
    token_from_arg, Client, ClientConfig, SNITCH_ALERT_TYPES, SNITCH_INTERVALS, SNITCH_STATUSES,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snitch")]
#[command(about = "Dead Man's Snitch CLI: check in and manage snitches", long_about = None)]
struct Cli {
    /// Output format: plain (human-readable), json (structured).
    #[arg(short, long, default_value = "plain", value_enum, global = true)]
    output: OutputFormatArg,

    /// API key. Falls back to the options file, then the DMS_API_KEY environment variable.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// JSON file with client options (apiKey, timeout, apiBaseUrl, checkInBaseUrl, fullResponse, maxContentLength, apiVersion).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in milliseconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Override the REST API base URL.
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// Override the check-in base URL.
    #[arg(long, global = true)]
    check_in_base_url: Option<String>,

    /// REST API version used in request paths.
    #[arg(long, global = true)]
    api_version: Option<u32>,

    /// Print the full response envelope (statusCode, statusMessage, headers, data).
    #[arg(long, global = true)]
    full_response: bool,

    /// Show timestamps in UTC only. By default timestamps are shown in local timezone.
    #[arg(long, global = true)]
    utc: bool,

    /// Log requests to stderr (same as RUST_LOG=snitch_lib=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check in a snitch (token or check-in URL)
    CheckIn {
        token: String,
        /// Message attached to the check-in. Valid JSON objects/arrays are sent encoded.
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List snitches
    List {
        /// Only snitches carrying all of these tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// List snitches with the given status
    FilterStatus {
        #[arg(value_parser = PossibleValuesParser::new(SNITCH_STATUSES))]
        status: String,
    },
    /// List snitches with the given interval
    FilterInterval {
        #[arg(value_parser = PossibleValuesParser::new(SNITCH_INTERVALS))]
        interval: String,
    },
    /// List snitches with the given alert type
    FilterAlertType {
        #[arg(value_parser = PossibleValuesParser::new(SNITCH_ALERT_TYPES))]
        alert_type: String,
    },
    /// Show one snitch
    Get { token: String },
    /// Create a snitch from a JSON object, e.g. '{"name":"Backups","interval":"daily"}'
    Create { info: String },
    /// Update a snitch with a JSON object of changed fields
    Update { token: String, info: String },
    /// Add tags to a snitch
    AddTags {
        token: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Remove one tag from a snitch
    RemoveTag { token: String, tag: String },
    /// Replace all tags of a snitch
    ChangeTags {
        token: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Remove every tag from a snitch
    RemoveAllTags { token: String },
    /// Pause a snitch
    Pause { token: String },
    /// Delete a snitch
    Delete { token: String },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if matches!(cli.command, Commands::Version) {
        println!("snitch {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let client = match build_client(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let format = match cli.output {
        OutputFormatArg::Plain => output::OutputFormat::Plain,
        OutputFormatArg::Json => output::OutputFormat::Json,
    };
    let plain = output::PlainOptions { use_utc: cli.utc };

    match run(&client, cli.command, format, plain).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Failures are printed once by `main`, so quiet runs only log errors.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "snitch_lib=debug"
    } else {
        "error"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Options file first, then command-line overrides. The API key resolves
/// flag > options file > DMS_API_KEY.
fn build_client(cli: &Cli) -> Result<Client, String> {
    let mut config = match cli.config {
        Some(ref path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
            let options: Value = serde_json::from_str(&raw)
                .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))?;
            ClientConfig::from_options(options).map_err(|e| e.to_string())?
        }
        None => ClientConfig::from_env(),
    };
    if let Some(ref key) = cli.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(t) = cli.timeout {
        config.timeout = t;
    }
    if let Some(ref u) = cli.api_base_url {
        config.api_base_url = u.clone();
    }
    if let Some(ref u) = cli.check_in_base_url {
        config.check_in_base_url = u.clone();
    }
    if let Some(v) = cli.api_version {
        config.api_version = v;
    }
    if cli.full_response {
        config.full_response = true;
    }
    Client::new(config).map_err(|e| e.to_string())
}

fn parse_json_arg(arg: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(arg).map_err(|e| format!("Invalid JSON: {}", e))?;
    if !value.is_object() {
        return Err("Snitch info must be a JSON object".to_string());
    }
    Ok(value)
}

/// Check-in messages that parse as a JSON object or array are sent encoded; anything else is sent as text.
fn check_in_message(message: Option<String>) -> Option<Value> {
    message.map(|m| match serde_json::from_str::<Value>(&m) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => v,
        _ => Value::String(m),
    })
}

async fn run(
    client: &Client,
    cmd: Commands,
    format: output::OutputFormat,
    plain: output::PlainOptions,
) -> Result<(), String> {
    let reply = match cmd {
        Commands::CheckIn { token, message } => {
            let token = token_from_arg(&token)?;
            let message = check_in_message(message);
            client.check_in(&token, message.as_ref()).await
        }
        Commands::List { tags } => client.get_snitches(&tags).await,
        Commands::FilterStatus { status } => client.filter_by_status(&status).await,
        Commands::FilterInterval { interval } => client.filter_by_interval(&interval).await,
        Commands::FilterAlertType { alert_type } => {
            client.filter_by_alert_type(&alert_type).await
        }
        Commands::Get { token } => client.get_snitch(&token_from_arg(&token)?).await,
        Commands::Create { info } => {
            let info = parse_json_arg(&info)?;
            client.create_snitch(Some(&info)).await
        }
        Commands::Update { token, info } => {
            let info = parse_json_arg(&info)?;
            client.update_snitch(&token_from_arg(&token)?, Some(&info)).await
        }
        Commands::AddTags { token, tags } => client.add_tags(&token_from_arg(&token)?, &tags).await,
        Commands::RemoveTag { token, tag } => {
            client.remove_tag(&token_from_arg(&token)?, &tag).await
        }
        Commands::ChangeTags { token, tags } => {
            client.change_tags(&token_from_arg(&token)?, &tags).await
        }
        Commands::RemoveAllTags { token } => {
            client.remove_all_tags(&token_from_arg(&token)?).await
        }
        Commands::Pause { token } => client.pause_snitch(&token_from_arg(&token)?).await,
        Commands::Delete { token } => client.delete_snitch(&token_from_arg(&token)?).await,
        Commands::Version => return Ok(()),
    }
    .map_err(|e| e.to_string())?;

    let value = serde_json::to_value(&reply).map_err(|e| e.to_string())?;
    match format {
        output::OutputFormat::Plain => print!("{}", output::format_plain(&value, plain)),
        output::OutputFormat::Json => {
            println!("{}", output::format_json(&value).map_err(|e| e.to_string())?)
        }
    }
    Ok(())
}
