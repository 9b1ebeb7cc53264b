//! Tool bridge
//!
//! The turn executor only knows the call/await contract in [`ToolBridge`]:
//! hand over a tool name and its structured input, get back an outcome.
//! A bridge never raises; failures (including timeouts) come back as
//! [`ToolOutcome::Failure`] and are fed to the model as error results.

mod catalog;
mod command;
mod demo;
mod files;
mod timeout;

pub use catalog::{catalog, ToolCategory, ToolSpec};
pub use command::CommandBridge;
pub use demo::DemoBridge;
pub use files::extract_created_files;
pub use timeout::TimeoutBridge;

use async_trait::async_trait;
use serde_json::Value;

/// Result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success {
        output: String,
        files_created: Vec<String>,
    },
    Failure {
        error: String,
    },
}

impl ToolOutcome {
    /// Successful result; files mentioned in the output are picked up
    pub fn success(output: impl Into<String>) -> Self {
        let output = output.into();
        let files_created = extract_created_files(&output);
        ToolOutcome::Success {
            output,
            files_created,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            error: error.into(),
        }
    }

    /// Merge files the tool reported explicitly, keeping first-seen order
    #[must_use]
    pub fn with_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        if let ToolOutcome::Success { files_created, .. } = &mut self {
            for file in files {
                if !files_created.contains(&file) {
                    files_created.push(file);
                }
            }
        }
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Failure { .. })
    }

    /// Text handed back to the model as the tool_result content
    pub fn content(&self) -> &str {
        match self {
            ToolOutcome::Success { output, .. } => output,
            ToolOutcome::Failure { error } => error,
        }
    }

    pub fn files_created(&self) -> &[String] {
        match self {
            ToolOutcome::Success { files_created, .. } => files_created,
            ToolOutcome::Failure { .. } => &[],
        }
    }
}

/// External tool executor
#[async_trait]
pub trait ToolBridge: Send + Sync {
    /// Tools this bridge can run; only these are offered to the model
    fn available_tools(&self) -> Vec<ToolSpec>;

    /// Run a tool. Must not panic; bounded time is the bridge's concern
    async fn execute(&self, tool: &str, input: Value) -> ToolOutcome;
}
