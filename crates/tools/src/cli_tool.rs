//! CLI tool: executes shell commands the model asks for, with an allowlist.

use async_trait::async_trait;
use contextloop_core::context::{ContextItem, ContextItemSource};
use contextloop_core::error::ToolError;
use contextloop_core::text::RawTextProcessor;
use contextloop_core::tool::{ContextTool, ToolStatusCallback};
use std::sync::Mutex;
use tokio::process::Command;
use tracing::{debug, warn};

pub const CLI_TAG: &str = "cli";

/// Runs shell commands emitted under `<cli>`, one per line, and turns their
/// output into context items.
pub struct CliTool {
    /// If non-empty, only these base commands are allowed.
    allowed_commands: Vec<String>,
    buffer: Mutex<RawTextProcessor>,
}

impl CliTool {
    pub fn new(allowed_commands: Vec<String>) -> Self {
        Self {
            allowed_commands,
            buffer: Mutex::new(RawTextProcessor::new()),
        }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true; // No allowlist = all commands allowed
        }

        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();
        self.allowed_commands.iter().any(|a| a == base_cmd)
    }

    async fn execute(&self, command: &str) -> Result<String, ToolError> {
        debug!(command, "Executing cli tool command");

        let output = if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", command]).output().await
        } else {
            Command::new("sh").args(["-c", command]).output().await
        };

        let output = output.map_err(|e| ToolError::ExecutionFailed {
            tag: CLI_TAG.into(),
            reason: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            if stderr.is_empty() {
                Ok(stdout)
            } else {
                Ok(format!("{stdout}\n[stderr]: {stderr}"))
            }
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command, exit_code = code, "Command failed");
            Ok(format!("[exit code: {code}]\n{stdout}\n{stderr}"))
        }
    }
}

#[async_trait]
impl ContextTool for CliTool {
    fn tag(&self) -> &str {
        CLI_TAG
    }

    fn instruction(&self) -> String {
        format!(
            "To run a read-only shell command and inspect its output, enclose the command in <{CLI_TAG}></{CLI_TAG}> tags, one command per line."
        )
    }

    async fn stream(&self, content: &str) {
        self.buffer.lock().unwrap().append(content);
    }

    async fn run(&self, status: &dyn ToolStatusCallback) -> Result<Vec<ContextItem>, ToolError> {
        let content = self.buffer.lock().unwrap().consume_and_clear();
        let commands: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if commands.is_empty() {
            return Ok(vec![]);
        }

        let mut items = Vec::with_capacity(commands.len());
        for command in &commands {
            if !self.is_command_allowed(command) {
                return Err(ToolError::PermissionDenied {
                    tag: CLI_TAG.into(),
                    reason: format!(
                        "Command '{}' not in allowlist",
                        command.split_whitespace().next().unwrap_or("")
                    ),
                });
            }

            status.on_stream(CLI_TAG, command);
            let output = self.execute(command).await?;
            items.push(
                ContextItem::new(format!("cli://{command}"), command, ContextItemSource::Tool)
                    .with_content(output),
            );
        }
        Ok(items)
    }
}
