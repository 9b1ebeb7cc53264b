//! Terminal chat client
//!
//! Keeps the session's conversation log, sends the reconciled history with
//! every message, and renders each turn as it streams.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worldsmith::client::{ChatClient, ConversationLog, Phase};
use worldsmith::protocol::{StreamEvent, ToolCallStatus};

const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldsmith=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let server_url = std::env::var("WORLDSMITH_SERVER_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let client = ChatClient::new(server_url.clone())?;
    let mut log = ConversationLog::new();

    println!("Connected to {server_url}. Type a message, /history, or /quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/history" => {
                println!("{}", serde_json::to_string_pretty(&log.history())?);
                continue;
            }
            _ => {}
        }

        let mut renderer = Renderer::default();
        let message = client
            .send(&mut log, line, |event, phase| renderer.render(event, phase))
            .await?;
        println!();

        if let Some(failure) = message.failure() {
            let hint = if failure.is_retryable() {
                " (send the message again to retry)"
            } else {
                ""
            };
            println!("[turn failed: {} ({}){hint}]", failure.message, failure.code);
        }
    }

    Ok(())
}

/// Prints one turn's events as they arrive
#[derive(Default)]
struct Renderer {
    last_phase: Option<Phase>,
}

impl Renderer {
    fn render(&mut self, event: &StreamEvent, phase: Phase) {
        if self.last_phase != Some(phase) && matches!(phase, Phase::Thinking | Phase::Speaking) {
            println!();
            println!("[{}]", phase.as_str());
        }
        self.last_phase = Some(phase);

        match event {
            StreamEvent::ThinkingDelta { content } | StreamEvent::ContentDelta { content } => {
                print!("{content}");
            }
            StreamEvent::Tools {
                tool_calls,
                files_created,
                ..
            } => {
                println!();
                for call in tool_calls {
                    let marker = match call.status {
                        ToolCallStatus::Running => "...",
                        ToolCallStatus::Completed => "ok",
                        ToolCallStatus::Failed => "failed",
                    };
                    println!("[tool] {} {marker}", call.tool);
                }
                for file in files_created {
                    println!("[file] {file}");
                }
            }
            StreamEvent::Error { .. } | StreamEvent::End => {}
        }
        let _ = std::io::stdout().flush();
    }
}
