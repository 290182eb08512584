//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toolgate_application::DEFAULT_OPERATION;

/// Output format for pipeline results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Answer, tool results and usage summary
    Full,
    /// Only the model's final answer
    Answer,
    /// JSON output
    Json,
}

/// CLI arguments for toolgate
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about = "Tool execution gateway for model-driven conversations")]
#[command(long_about = r#"
toolgate sits between a language model and the tools it asks to call.

Every requested call passes four gates before its handler runs:
1. Schema validation of the arguments
2. Sanitization of strings and reserved keys
3. Role-based permission check
4. Rate limits (user, tool, global) and the caller's cost quota

Admitted calls run under a timeout and a per-tool circuit breaker. Denials
and failures go back to the model as tool messages, never as crashes.

Configuration files are loaded from (in priority order):
1. TOOLGATE_* environment variables
2. --config <path>     Explicit config file
3. ./toolgate.toml     Project-level config
4. ~/.config/toolgate/config.toml   Global config

Example:
  toolgate run --script turns.json --user alice "What time is it?"
  toolgate check --user bob --tool echo
  toolgate config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a conversation against a scripted model transcript
    Run(RunArgs),
    /// Explain whether a user may call a tool
    Check(CheckArgs),
    /// Show a user's rate limits and cost quota
    Usage(UsageArgs),
    /// Show configuration file locations and the effective configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The user's prompt
    pub prompt: String,

    /// JSON transcript of model turns to replay
    #[arg(short, long, value_name = "PATH")]
    pub script: PathBuf,

    /// Identity of the caller
    #[arg(short, long, value_name = "USER")]
    pub user: String,

    /// Tools offered to the model (can be specified multiple times, defaults to all)
    #[arg(short, long = "tool", value_name = "NAME")]
    pub tools: Vec<String>,

    /// Maximum model turns (overrides config)
    #[arg(long, value_name = "N")]
    pub max_turns: Option<u32>,

    /// Dispatch the calls of a turn one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Request streamed model responses
    #[arg(long)]
    pub stream: bool,

    /// Write the conversation transcript as JSONL (overrides config)
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "answer")]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Identity of the caller
    #[arg(short, long, value_name = "USER")]
    pub user: String,

    /// Tool to check
    #[arg(short, long, value_name = "NAME")]
    pub tool: String,

    /// Operation to check
    #[arg(long, default_value = DEFAULT_OPERATION)]
    pub operation: String,

    /// Call arguments as a JSON object, for conditional permissions
    #[arg(long, value_name = "JSON")]
    pub args: Option<String>,
}

#[derive(Args, Debug)]
pub struct UsageArgs {
    /// Identity of the caller
    #[arg(short, long, value_name = "USER")]
    pub user: String,

    /// Also show the limit of these tools
    #[arg(short, long = "tool", value_name = "NAME")]
    pub tools: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only validate; exit non-zero on problems
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "toolgate", "-vv", "run", "--script", "t.json", "--user", "alice", "-t", "echo",
            "--tool", "sleep", "--sequential", "-o", "json", "hello",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.prompt, "hello");
        assert_eq!(args.user, "alice");
        assert_eq!(args.tools, vec!["echo", "sleep"]);
        assert!(args.sequential);
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["toolgate", "check", "-u", "bob", "-t", "echo", "--no-config"]);
        assert!(cli.no_config);
        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.operation, DEFAULT_OPERATION);
    }
}
