//! idl-coder - decode program data against an IDL
//!
//! Command line entry point

use std::io::{self, BufRead};
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use idl_coder::{Coder, CoderError, Encoding, IdlCoder, SchemaError};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Decode instruction data, account data and event logs against an IDL.
#[derive(Parser)]
#[command(
    name = "idl-coder",
    version,
    about = "Decode program data against an IDL",
    long_about = r#"
Decode program data against an IDL.

Examples:
    idl-coder counter.json event "Program data: FYTvQJLv..."
    solana confirm -v <sig> | idl-coder counter.json logs
    idl-coder counter.json ix afaf6d1f0d989bedd204000000000000
    idl-coder counter.json account Counter <base64>
    idl-coder counter.json const MAX_COUNT
    idl-coder counter.json error 6000
"#
)]
struct Cli {
    /// Path to the IDL JSON file
    idl: PathBuf,

    /// Output compact JSON (default: pretty-printed)
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode `Program data:` log lines
    Event {
        /// Log lines, one per argument
        #[arg(required = true)]
        lines: Vec<String>,
    },

    /// Extract this program's events from transaction logs on stdin
    Logs,

    /// Decode instruction data
    Ix {
        /// Encoded instruction data
        data: String,

        /// Text encoding of the data
        #[arg(long, value_enum, default_value = "hex")]
        encoding: TextEncoding,
    },

    /// Decode base64 account data as the named account type
    Account {
        /// Account type name
        name: String,

        /// Base64 account data
        data: String,
    },

    /// Print a named IDL constant
    Const {
        /// Constant name, e.g. MAX_COUNT
        name: String,
    },

    /// Look up a program error by its numeric code
    Error {
        /// Error code, e.g. 6000
        code: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum TextEncoding {
    #[default]
    Hex,
    Base58,
}

impl From<TextEncoding> for Encoding {
    fn from(encoding: TextEncoding) -> Self {
        match encoding {
            TextEncoding::Hex => Encoding::Hex,
            TextEncoding::Base58 => Encoding::Base58,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Coder(#[from] CoderError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no constant named {0} in this IDL")]
    UnknownConstant(String),

    #[error("no error with code {0} in this IDL")]
    UnknownErrorCode(u32),
}

// =============================================================================
// COMMANDS
// =============================================================================

struct Output {
    compact: bool,
}

impl Output {
    fn print(&self, value: &serde_json::Value) -> Result<(), CliError> {
        let text = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{}", text);
        Ok(())
    }
}

fn decode_events(coder: &IdlCoder, lines: &[String], out: &Output) -> Result<(), CliError> {
    let events: Vec<_> = lines
        .iter()
        .filter_map(|line| coder.events().decode(line))
        .map(|event| event.to_json())
        .collect();
    tracing::debug!(lines = lines.len(), events = events.len(), "decoded event lines");
    out.print(&serde_json::Value::Array(events))
}

fn parse_logs(coder: &IdlCoder, out: &Output) -> Result<(), CliError> {
    let lines = io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?;
    let events = match coder.event_parser() {
        Ok(parser) => parser.parse_logs(&lines),
        Err(CoderError::Schema(SchemaError::MissingSection(_))) => {
            tracing::warn!("IDL has no program address, decoding every data line");
            lines
                .iter()
                .filter_map(|line| coder.events().decode(line))
                .collect()
        }
        Err(e) => return Err(e.into()),
    };
    let events = events.iter().map(|event| event.to_json()).collect();
    out.print(&serde_json::Value::Array(events))
}

fn decode_instruction(
    coder: &IdlCoder,
    data: &str,
    encoding: TextEncoding,
    out: &Output,
) -> Result<(), CliError> {
    let ix = coder.instruction().decode_str(data, encoding.into())?;
    out.print(&serde_json::json!({
        "name": ix.name,
        "data": ix.data.to_json(),
    }))
}

fn decode_account(coder: &IdlCoder, name: &str, data: &str, out: &Output) -> Result<(), CliError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| CoderError::InvalidEncoding(e.to_string()))?;
    let value = coder.decode_account(name, &bytes)?;
    let size = coder.accounts().size_info(name)?;
    out.print(&serde_json::json!({
        "name": name,
        "len": bytes.len(),
        "minSize": size.min(),
        "fixedSize": size.is_fixed(),
        "data": value.to_json(),
    }))
}

fn lookup_constant(coder: &IdlCoder, name: &str, out: &Output) -> Result<(), CliError> {
    let constant = coder
        .idl()
        .get_constant(name)
        .ok_or_else(|| CliError::UnknownConstant(name.to_string()))?;
    out.print(&serde_json::to_value(constant)?)
}

fn lookup_error(coder: &IdlCoder, code: u32, out: &Output) -> Result<(), CliError> {
    let err = coder
        .idl()
        .error_by_code(code)
        .ok_or(CliError::UnknownErrorCode(code))?;
    out.print(&serde_json::to_value(err)?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let json = std::fs::read_to_string(&cli.idl).map_err(|source| CliError::Read {
        path: cli.idl.display().to_string(),
        source,
    })?;
    let coder = IdlCoder::from_json(&json)?;
    tracing::info!(program = %coder.idl().name, "loaded IDL");

    let out = Output {
        compact: cli.compact,
    };
    match cli.command {
        Commands::Event { lines } => decode_events(&coder, &lines, &out),
        Commands::Logs => parse_logs(&coder, &out),
        Commands::Ix { data, encoding } => decode_instruction(&coder, &data, encoding, &out),
        Commands::Account { name, data } => decode_account(&coder, &name, &data, &out),
        Commands::Const { name } => lookup_constant(&coder, &name, &out),
        Commands::Error { code } => lookup_error(&coder, code, &out),
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["idl-coder", "counter.json", "ix", "afaf", "--encoding", "base58"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ix {
                encoding: TextEncoding::Base58,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["idl-coder", "counter.json", "account", "Counter", "AAAA"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Account { ref name, .. } if name == "Counter"));

        let cli = Cli::try_parse_from(["idl-coder", "counter.json", "--compact", "error", "6000"])
            .unwrap();
        assert!(cli.compact);
        assert!(matches!(cli.command, Commands::Error { code: 6000 }));

        assert!(Cli::try_parse_from(["idl-coder", "counter.json", "event"]).is_err());
        assert!(Cli::try_parse_from(["idl-coder", "counter.json", "error", "x"]).is_err());
    }
}
