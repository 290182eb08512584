//! Console output formatting

use crate::cli::OutputFormat;
use colored::Colorize;
use serde::Serialize;
use toolgate_application::RunPipelineOutput;
use toolgate_domain::{Message, TokenUsage, ToolResult, UsageStats};

/// JSON shape of a finished run
#[derive(Serialize)]
struct RunReport<'a> {
    final_content: &'a str,
    turns: u32,
    total_cost: f64,
    total_duration_ms: u64,
    usage: TokenUsage,
    tool_results: &'a [ToolResult],
    messages: &'a [Message],
}

/// Formats pipeline results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn format(output: &RunPipelineOutput, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format_full(output),
            OutputFormat::Answer => output.final_content.clone(),
            OutputFormat::Json => Self::format_json(output),
        }
    }

    fn format_full(output: &RunPipelineOutput) -> String {
        let mut text = String::new();

        text.push_str(&Self::section_header("Answer"));
        text.push_str(&format!("\n{}\n", output.final_content));

        if !output.tool_results.is_empty() {
            text.push_str(&Self::section_header("Tool Calls"));
            text.push('\n');
            for result in &output.tool_results {
                text.push_str(&Self::tool_line(result));
                text.push('\n');
            }
        }

        text.push_str(&Self::section_header("Summary"));
        text.push_str(&format!(
            "\n{} {}\n{} {:.4}\n{} {}ms\n{} {} in / {} out\n",
            "Turns:".cyan().bold(),
            output.turns,
            "Cost:".cyan().bold(),
            output.total_cost,
            "Duration:".cyan().bold(),
            output.total_duration_ms,
            "Tokens:".cyan().bold(),
            output.usage.input_tokens,
            output.usage.output_tokens,
        ));
        text
    }

    fn format_json(output: &RunPipelineOutput) -> String {
        let report = RunReport {
            final_content: &output.final_content,
            turns: output.turns,
            total_cost: output.total_cost,
            total_duration_ms: output.total_duration_ms,
            usage: output.usage,
            tool_results: &output.tool_results,
            messages: &output.messages,
        };
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    fn tool_line(result: &ToolResult) -> String {
        match &result.error {
            None => format!(
                "  {} {} [{}] {}ms cost {:.4}",
                "v".green(),
                result.tool_name.bold(),
                result.call_id,
                result.latency_ms,
                result.cost
            ),
            Some(error) => format!(
                "  {} {} [{}] {} {}",
                "x".red(),
                result.tool_name.bold(),
                result.call_id,
                error.code.as_str().yellow(),
                error.message
            ),
        }
    }

    /// Quota standing of one user
    pub fn format_usage(stats: &UsageStats) -> String {
        let mut text = String::new();
        text.push_str(&Self::section_header(&format!("Quota: {}", stats.user_id)));
        text.push('\n');
        text.push_str(&Self::quota_line(
            "Daily",
            stats.daily_spent,
            stats.daily_limit,
            stats.daily_remaining,
        ));
        text.push_str(&format!("    resets {}\n", stats.daily_reset_at.to_rfc3339()));
        text.push_str(&Self::quota_line(
            "Monthly",
            stats.monthly_spent,
            stats.monthly_limit,
            stats.monthly_remaining,
        ));
        text.push_str(&format!("    resets {}\n", stats.monthly_reset_at.to_rfc3339()));
        text
    }

    fn quota_line(label: &str, spent: f64, limit: Option<f64>, remaining: Option<f64>) -> String {
        match (limit, remaining) {
            (Some(limit), Some(remaining)) => format!(
                "  {} {:.4} of {:.4} spent, {:.4} left\n",
                format!("{}:", label).cyan().bold(),
                spent,
                limit,
                remaining
            ),
            _ => format!(
                "  {} {:.4} spent, unlimited\n",
                format!("{}:", label).cyan().bold(),
                spent
            ),
        }
    }

    pub fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.bold(), "-".repeat(title.len().max(8)))
    }
}
