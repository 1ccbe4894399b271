//! Argument parsing and command dispatch for the `batchread` binary.

use std::path::PathBuf;

use batchread_core::{ReadMode, ReadModeRuleSpec};
use batchread_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::inspect::handle_inspect;
use crate::commands::read::handle_read;
use crate::commands::settings::parse_rule;
use crate::error::CliResult;
use crate::fs_backend::DEFAULT_CHUNK_SIZE;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("BATCHREAD_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err:#}");
    }
    tracing::debug!(build_sha = build_sha(), "batchread starting");

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Read(args) => handle_read(args, cli.output).await,
        Command::Inspect(args) => handle_inspect(args, cli.output).await,
    }
}

#[derive(Parser)]
#[command(
    name = "batchread",
    about = "Read local files in batches and report every lifecycle event"
)]
struct Cli {
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for events and listings"
    )]
    output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "BATCHREAD_LOG",
        default_value = DEFAULT_LOG_LEVEL
    )]
    log_level: String,
    #[arg(long, global = true, env = "BATCHREAD_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read files as one batch, printing each event as it happens.
    Read(ReadArgs),
    /// Show the descriptor each file would receive without reading it.
    Inspect(InspectArgs),
}

#[derive(Args)]
pub(crate) struct ReadArgs {
    #[arg(required = true)]
    pub(crate) paths: Vec<PathBuf>,
    #[command(flatten)]
    pub(crate) reader: ReaderArgs,
    #[arg(long, help = "Print Prometheus counters after the batch finishes")]
    pub(crate) metrics: bool,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct ReaderArgs {
    #[arg(long, help = "JSON settings file; flags take precedence")]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, help = "Regex matched against each file's content type")]
    pub(crate) accept: Option<String>,
    #[arg(
        long = "rule",
        value_parser = parse_rule,
        help = "Read-mode rule as PATTERN=MODE; repeatable, first match wins"
    )]
    pub(crate) rules: Vec<ReadModeRuleSpec>,
    #[arg(long, help = "Read mode used when no rule matches")]
    pub(crate) default_mode: Option<ReadMode>,
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub(crate) chunk_size: usize,
}

#[derive(Args)]
pub(crate) struct InspectArgs {
    #[arg(required = true)]
    pub(crate) paths: Vec<PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse().map_err(|err: anyhow::Error| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_command_collects_reader_flags() {
        let cli = Cli::try_parse_from([
            "batchread",
            "--output",
            "json",
            "read",
            "a.txt",
            "b.png",
            "--accept",
            "image/.*",
            "--rule",
            "text/.*=text",
            "--rule",
            "image/.*=dataurl",
            "--default-mode",
            "arraybuffer",
            "--metrics",
        ])
        .expect("parse");

        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Read(args) = cli.command else {
            panic!("expected read command");
        };
        assert_eq!(args.paths.len(), 2);
        assert!(args.metrics);
        assert_eq!(args.reader.accept.as_deref(), Some("image/.*"));
        assert_eq!(args.reader.rules.len(), 2);
        assert_eq!(args.reader.rules[1].mode, ReadMode::DataUrl);
        assert_eq!(args.reader.default_mode, Some(ReadMode::ArrayBuffer));
        assert_eq!(args.reader.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn malformed_rule_is_rejected() {
        let result = Cli::try_parse_from(["batchread", "read", "a.txt", "--rule", "text/.*"]);
        assert!(result.is_err());
    }

    #[test]
    fn read_requires_paths() {
        assert!(Cli::try_parse_from(["batchread", "read"]).is_err());
        assert!(Cli::try_parse_from(["batchread", "inspect"]).is_err());
    }

    #[test]
    fn log_format_flag_is_parsed() {
        let cli = Cli::try_parse_from(["batchread", "--log-format", "json", "inspect", "a.txt"])
            .expect("parse");
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(Cli::try_parse_from(["batchread", "--log-format", "xml", "inspect", "a"]).is_err());
    }
}
