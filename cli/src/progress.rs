//! Progress reporting for pipeline runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use toolgate_application::PipelineProgressNotifier;
use toolgate_domain::{ToolCall, ToolResult};

/// Reports turns and tool calls on stderr with a spinner
pub struct ProgressReporter {
    spinner: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgressNotifier for ProgressReporter {
    fn on_turn_start(&self, turn: u32, max_turns: u32) {
        self.spinner.set_prefix(format!("Turn {}/{}", turn, max_turns));
        self.spinner.set_message("waiting for model...");
    }

    fn on_model_delta(&self, chunk: &str) {
        self.spinner.suspend(|| {
            eprint!("{}", chunk.dimmed());
            let _ = std::io::stderr().flush();
        });
    }

    fn on_tool_call(&self, call: &ToolCall) {
        self.spinner
            .set_message(format!("{} {}", call.tool_name.bold(), call.id.dimmed()));
    }

    fn on_tool_result(&self, result: &ToolResult) {
        self.spinner.println(result_line(result));
    }

    fn on_complete(&self, turns: u32, success: bool) {
        let status = if success {
            format!("{} after {} turn(s)", "done".green(), turns)
        } else {
            format!("{} after {} turn(s)", "failed".red(), turns)
        };
        self.spinner.finish_with_message(status);
    }
}

/// Plain line-per-event progress (no spinner)
pub struct SimpleProgress;

impl PipelineProgressNotifier for SimpleProgress {
    fn on_turn_start(&self, turn: u32, max_turns: u32) {
        eprintln!("{} {}", "->".cyan(), format!("Turn {}/{}", turn, max_turns).bold());
    }

    fn on_tool_result(&self, result: &ToolResult) {
        eprintln!("{}", result_line(result));
    }
}

fn result_line(result: &ToolResult) -> String {
    match &result.error {
        None => format!(
            "  {} {} ({}) {}ms",
            "v".green(),
            result.tool_name,
            result.call_id,
            result.latency_ms
        ),
        Some(error) => format!(
            "  {} {} ({}) {}: {}",
            "x".red(),
            result.tool_name,
            result.call_id,
            error.code.to_string().yellow(),
            error.message
        ),
    }
}
