//! CLI entrypoint for toolgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;
mod gateway;
mod logging;
mod output;
mod progress;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{CheckArgs, Cli, Command, ConfigArgs, RunArgs, UsageArgs};
use colored::Colorize;
use gateway::Gateway;
use output::ConsoleFormatter;
use progress::{ProgressReporter, SimpleProgress};
use serde_json::{Map, Value};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolgate_application::{
    Concurrency, PipelineProgressNotifier, RunPipelineInput, RunPipelineUseCase, ToolRegistry,
};
use toolgate_domain::{PermissionDecision, RateScope};
use toolgate_infrastructure::{ConfigLoader, FileConfig, JsonlConversationLogger, ModelBackend};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.verbose, cli.log_dir.as_deref());

    info!("Starting toolgate");

    if let Command::Config(args) = &cli.command {
        return show_config(&cli, args);
    }

    let config = load_config(&cli)?;

    match cli.command {
        Command::Run(args) => run(args, &config, cli.quiet).await,
        Command::Check(args) => check(args, &config),
        Command::Usage(args) => usage(args, &config).await,
        Command::Config(_) => Ok(ExitCode::SUCCESS),
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_ref())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))
}

async fn run(args: RunArgs, config: &FileConfig, quiet: bool) -> Result<ExitCode> {
    // === Dependency Injection ===
    let gateway = Gateway::from_config(config)?;
    let backend = ModelBackend::scripted_from_file(&args.script)?;

    let mut params = config.pipeline.to_execution_params();
    if let Some(max_turns) = args.max_turns {
        params = params.with_max_turns(max_turns);
    }
    if args.sequential {
        params = params.with_concurrency(Concurrency::Sequential);
    }
    if args.stream {
        params = params.with_streaming(true);
    }

    let tools = if args.tools.is_empty() {
        gateway.registry.tool_names()
    } else {
        args.tools
    };

    let mut input = RunPipelineInput::new(args.prompt, args.user)
        .with_tools(tools)
        .with_params(params);
    if let Some(system_prompt) = &config.pipeline.system_prompt {
        input = input.with_system_prompt(system_prompt.clone());
    }

    let cancellation = CancellationToken::new();
    let mut use_case = RunPipelineUseCase::new(
        Arc::new(backend),
        gateway.registry.clone(),
        gateway.admission.clone(),
        gateway.engine.clone(),
    )
    .with_cancellation(cancellation.clone());

    let log_path = args
        .conversation_log
        .as_ref()
        .or(config.pipeline.conversation_log.as_ref());
    if let Some(path) = log_path {
        let logger = JsonlConversationLogger::create(path).with_context(|| {
            format!("Failed to open conversation log {}", path.display())
        })?;
        info!("Writing conversation log to {}", path.display());
        use_case = use_case.with_conversation_logger(Arc::new(logger));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            cancellation.cancel();
        }
    });

    let result = if quiet {
        use_case.execute(input).await?
    } else {
        let progress: Box<dyn PipelineProgressNotifier> = if std::io::stderr().is_terminal() {
            Box::new(ProgressReporter::new())
        } else {
            Box::new(SimpleProgress)
        };
        use_case.execute_with_progress(input, progress.as_ref()).await?
    };

    println!("{}", ConsoleFormatter::format(&result, args.output));
    Ok(ExitCode::SUCCESS)
}

fn check(args: CheckArgs, config: &FileConfig) -> Result<ExitCode> {
    let gateway = Gateway::from_config(config)?;

    let call_args: Map<String, Value> = match &args.args {
        Some(json) => serde_json::from_str(json).context("--args must be a JSON object")?,
        None => Map::new(),
    };

    let registered = gateway.registry.has_tool(&args.tool);
    let decision = gateway.admission.permissions().explain(
        &args.user,
        &args.tool,
        &args.operation,
        &call_args,
    );

    let verdict = match &decision {
        PermissionDecision::Granted { source, pattern } => format!(
            "{} by {} ({})",
            "granted".green().bold(),
            source,
            pattern
        ),
        PermissionDecision::DenyListed { pattern } => {
            format!("{} by deny-list entry {}", "denied".red().bold(), pattern)
        }
        PermissionDecision::UnknownUser => {
            format!("{}: unknown user", "denied".red().bold())
        }
        PermissionDecision::NoMatchingPermission => {
            format!("{}: no matching permission", "denied".red().bold())
        }
    };
    println!(
        "{} {} {}: {}",
        args.user.bold(),
        args.operation,
        args.tool.bold(),
        verdict
    );
    if !registered {
        println!("{} {} is not a registered tool", "note:".yellow(), args.tool);
    }

    Ok(if decision.is_granted() && registered {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn usage(args: UsageArgs, config: &FileConfig) -> Result<ExitCode> {
    let gateway = Gateway::from_config(config)?;
    let admission = &gateway.admission;

    let roles = admission
        .permissions()
        .snapshot()
        .user(&args.user)
        .map(|user| user.roles.join(", "))
        .unwrap_or_else(|| "(unknown user)".to_string());
    println!("{} {}", "Roles:".cyan().bold(), roles);

    println!("{}", ConsoleFormatter::section_header("Rate Limits"));
    let tools = if args.tools.is_empty() {
        gateway.registry.tool_names()
    } else {
        args.tools
    };
    let scopes = std::iter::once(RateScope::User(args.user.clone()))
        .chain(tools.into_iter().map(RateScope::Tool))
        .chain(std::iter::once(RateScope::Global));
    for scope in scopes {
        let limit = match admission.rate_limiter().limit_for(&scope) {
            Some(limit) => format!(
                "{} requests / {}s",
                limit.max_requests,
                limit.window().as_secs_f64()
            ),
            None => "unlimited".to_string(),
        };
        println!("  {:<24} {}", scope.to_string(), limit);
    }

    let stats = admission.quota().get_usage(&args.user).await;
    print!("{}", ConsoleFormatter::format_usage(&stats));
    Ok(ExitCode::SUCCESS)
}

fn show_config(cli: &Cli, args: &ConfigArgs) -> Result<ExitCode> {
    let config = load_config(cli)?;
    let problems = config.validate();

    if !args.validate {
        println!("Configuration sources:");
        if cli.no_config {
            println!("  (config files disabled, built-in defaults only)");
        } else {
            for line in ConfigLoader::describe_sources(cli.config.as_ref()) {
                println!("  {}", line);
            }
        }
        println!();
        println!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to render configuration")?
        );
    }

    if problems.is_empty() {
        println!("{}", "Configuration is valid".green());
        Ok(ExitCode::SUCCESS)
    } else {
        for problem in &problems {
            println!("{} {}", "x".red(), problem);
        }
        Ok(ExitCode::FAILURE)
    }
}
