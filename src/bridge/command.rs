//! Bridge to an external tool program.
//!
//! Each call spawns the configured program, writes one JSON request
//! `{"tool": .., "input": ..}` to its stdin, and reads one JSON reply
//! `{"ok": bool, "output"?: .., "error"?: .., "files_created"?: [..]}` from
//! its stdout. The child is killed if the call is dropped.

use super::catalog::catalog;
use super::{ToolBridge, ToolOutcome, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Max characters of stderr quoted back in a failure
const STDERR_LIMIT: usize = 2000;

pub struct CommandBridge {
    program: String,
    args: Vec<String>,
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    tool: &'a str,
    input: &'a Value,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    ok: bool,
    #[serde(default)]
    output: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    files_created: Vec<String>,
}

impl BridgeReply {
    fn into_outcome(self) -> ToolOutcome {
        if self.ok {
            ToolOutcome::success(self.output).with_files(self.files_created)
        } else {
            ToolOutcome::failure(
                self.error
                    .unwrap_or_else(|| "Tool failed without an error message".to_string()),
            )
        }
    }
}

impl CommandBridge {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line, `None` if it is blank
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    async fn run(&self, tool: &str, input: &Value) -> Result<ToolOutcome, String> {
        let request = serde_json::to_vec(&BridgeRequest { tool, input })
            .map_err(|e| format!("Failed to encode tool request: {e}"))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to spawn tool command {}: {e}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&request)
                .await
                .map_err(|e| format!("Failed to send tool request: {e}"))?;
            // Dropping stdin closes the pipe so the program sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("Tool command failed: {e}"))?;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(STDERR_LIMIT).collect();
            return Err(format!("[tool command failed: exit code {exit_code}]\n{stderr}"));
        }

        let reply: BridgeReply = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("Tool command returned an invalid reply: {e}"))?;
        Ok(reply.into_outcome())
    }
}

#[async_trait]
impl ToolBridge for CommandBridge {
    fn available_tools(&self) -> Vec<ToolSpec> {
        catalog().to_vec()
    }

    async fn execute(&self, tool: &str, input: Value) -> ToolOutcome {
        match self.run(tool, &input).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(tool = %tool, program = %self.program, error = %error, "Tool command failed");
                ToolOutcome::failure(error)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> CommandBridge {
        let path = dir.path().join("bridge.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        drop(file);
        CommandBridge::new("sh", vec![path.display().to_string()])
    }

    #[test]
    fn test_from_command_line() {
        assert!(CommandBridge::from_command_line("   ").is_none());
        let bridge = CommandBridge::from_command_line("python3 -m vibe_tools").unwrap();
        assert_eq!(bridge.program, "python3");
        assert_eq!(bridge.args, vec!["-m", "vibe_tools"]);
    }

    #[tokio::test]
    async fn test_success_reply_with_explicit_files() {
        let dir = TempDir::new().unwrap();
        let bridge = script(
            &dir,
            r#"cat > /dev/null
echo '{"ok": true, "output": "Created world: worlds/aster", "files_created": ["worlds/aster/README.md"]}'"#,
        );

        let outcome = bridge.execute("instantiate_world", json!({"world_name": "Aster"})).await;
        assert_eq!(outcome.content(), "Created world: worlds/aster");
        assert_eq!(
            outcome.files_created(),
            &["worlds/aster".to_string(), "worlds/aster/README.md".to_string()]
        );
    }

    #[tokio::test]
    async fn test_request_is_written_to_stdin() {
        let dir = TempDir::new().unwrap();
        let captured = dir.path().join("request.json");
        let bridge = script(
            &dir,
            &format!(
                "cat > {}\necho '{{\"ok\": true, \"output\": \"built\"}}'",
                captured.display()
            ),
        );

        let outcome = bridge.execute("build_static_site", json!({"world_directory": "w"})).await;
        assert_eq!(outcome.content(), "built");

        let request: Value = serde_json::from_slice(&std::fs::read(&captured).unwrap()).unwrap();
        assert_eq!(request, json!({"tool": "build_static_site", "input": {"world_directory": "w"}}));
    }

    #[tokio::test]
    async fn test_error_reply_and_exit_status() {
        let dir = TempDir::new().unwrap();
        let bridge = script(&dir, r#"cat > /dev/null; echo '{"ok": false, "error": "disk full"}'"#);
        assert_eq!(
            bridge.execute("create_taxonomy", json!({})).await,
            ToolOutcome::failure("disk full")
        );

        let dir = TempDir::new().unwrap();
        let bridge = script(&dir, "cat > /dev/null; echo boom >&2; exit 3");
        let outcome = bridge.execute("create_taxonomy", json!({})).await;
        assert_eq!(outcome.content(), "[tool command failed: exit code 3]\nboom");
    }

    #[tokio::test]
    async fn test_missing_program_is_failure() {
        let bridge = CommandBridge::new("/nonexistent/worldsmith-tools", vec![]);
        let outcome = bridge.execute("create_taxonomy", json!({})).await;
        assert!(outcome.is_error());
        assert!(outcome.content().starts_with("Failed to spawn tool command"));
    }
}
