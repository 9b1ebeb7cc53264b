//! Turn executor
//!
//! Drives one assistant turn: streams the model's thinking and text to the
//! client, runs requested tools through the bridge, feeds their results back,
//! and repeats until the model answers without tools or the round limit is
//! hit. Every turn the client observes ends with exactly one `end` or `error`.

use super::context::build_llm_messages;
use crate::bridge::{ToolBridge, ToolOutcome, ToolSpec};
use crate::llm::{
    LlmError, LlmMessage, LlmRequest, LlmResponse, LlmService, LlmStreamEvent, SystemContent,
    ToolDefinition,
};
use crate::protocol::{
    ContentBlock, ErrorCode, HistoryEntry, StreamEvent, ToolCallStatus, ToolCallSummary,
};
use crate::system_prompt::build_system_prompt;
use futures::future::join_all;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

/// Executor limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnConfig {
    /// Model rounds allowed per turn, at least 1
    pub max_tool_rounds: u32,
    /// Per-request output cap; `None` uses the provider default
    pub max_tokens: Option<u32>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            max_tokens: None,
        }
    }
}

impl TurnConfig {
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }
}

/// Sending half of a turn's event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Send an event, returning false once the receiver is gone
    pub async fn emit(&self, event: StreamEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the receiver is dropped
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed { content_blocks: Vec<ContentBlock> },
    Failed { code: ErrorCode, message: String },
    /// The client went away; nothing further was emitted
    Cancelled,
}

enum RoundError {
    Llm(LlmError),
    Cancelled,
}

struct ToolRequest {
    id: String,
    name: String,
    input: Value,
}

/// Everything the turn has produced so far
#[derive(Default)]
struct TurnRecord {
    blocks: Vec<ContentBlock>,
    tool_calls: Vec<ToolCallSummary>,
    files_created: Vec<String>,
}

impl TurnRecord {
    fn snapshot(&self) -> StreamEvent {
        StreamEvent::Tools {
            tool_calls: self.tool_calls.clone(),
            files_created: self.files_created.clone(),
            content_blocks: self.blocks.clone(),
        }
    }

    fn settle(&mut self, request: &ToolRequest, outcome: &ToolOutcome) {
        if let Some(call) = self.tool_calls.iter_mut().rev().find(|c| c.id == request.id) {
            call.status = if outcome.is_error() {
                ToolCallStatus::Failed
            } else {
                ToolCallStatus::Completed
            };
        }
        for file in outcome.files_created() {
            if !self.files_created.contains(file) {
                self.files_created.push(file.clone());
            }
        }
        self.blocks.push(ContentBlock::tool_result(
            &request.id,
            outcome.content(),
            outcome.is_error(),
        ));
    }
}

pub struct TurnExecutor {
    llm: Option<Arc<dyn LlmService>>,
    bridge: Arc<dyn ToolBridge>,
    config: TurnConfig,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
}

impl TurnExecutor {
    pub fn new(
        llm: Option<Arc<dyn LlmService>>,
        bridge: Arc<dyn ToolBridge>,
        config: TurnConfig,
    ) -> Self {
        let specs = bridge.available_tools();
        Self {
            system_prompt: build_system_prompt(&specs),
            tools: specs.iter().map(ToolSpec::definition).collect(),
            llm,
            bridge,
            config,
        }
    }

    pub fn bridge(&self) -> &Arc<dyn ToolBridge> {
        &self.bridge
    }

    pub fn model_id(&self) -> Option<&str> {
        self.llm.as_deref().map(LlmService::model_id)
    }

    /// Run one turn, emitting its events into `sink`.
    ///
    /// Emits `end` or `error` last unless the client disconnected first.
    pub async fn run(&self, content: &str, history: &[HistoryEntry], sink: &EventSink) -> TurnOutcome {
        let turn_id = Uuid::new_v4();
        let span = tracing::info_span!("turn", turn_id = %turn_id);

        async {
            tracing::info!(history_len = history.len(), "Turn started");
            let start = Instant::now();
            let outcome = self.drive(content, history, sink).await;

            match &outcome {
                TurnOutcome::Completed { content_blocks } => {
                    sink.emit(StreamEvent::End).await;
                    tracing::info!(
                        duration_ms = %start.elapsed().as_millis(),
                        blocks = content_blocks.len(),
                        "Turn completed"
                    );
                }
                TurnOutcome::Failed { code, message } => {
                    sink.emit(StreamEvent::error(*code, message.clone())).await;
                    tracing::warn!(code = %code, error = %message, "Turn failed");
                }
                TurnOutcome::Cancelled => {
                    tracing::info!("Turn cancelled: client disconnected");
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, content: &str, history: &[HistoryEntry], sink: &EventSink) -> TurnOutcome {
        let Some(llm) = self.llm.as_ref() else {
            return TurnOutcome::Failed {
                code: ErrorCode::LlmFailure,
                message: "LLM service unavailable".to_string(),
            };
        };

        let mut messages = build_llm_messages(history, content);
        let mut record = TurnRecord::default();

        for round in 1..=self.config.max_tool_rounds {
            if sink.is_closed() {
                return TurnOutcome::Cancelled;
            }

            let request = LlmRequest {
                system: vec![SystemContent::cached(self.system_prompt.clone())],
                messages: messages.clone(),
                tools: self.tools.clone(),
                max_tokens: self.config.max_tokens,
            };

            let response = match self.stream_round(llm.as_ref(), &request, sink).await {
                Ok(response) => response,
                Err(RoundError::Cancelled) => return TurnOutcome::Cancelled,
                Err(RoundError::Llm(e)) => {
                    return TurnOutcome::Failed {
                        code: ErrorCode::LlmFailure,
                        message: e.message,
                    }
                }
            };

            let requests: Vec<ToolRequest> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| ToolRequest {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: input.clone(),
                })
                .collect();
            if requests.is_empty() {
                record.blocks.extend(response.blocks().cloned());
                if !record.tool_calls.is_empty() && !sink.emit(record.snapshot()).await {
                    return TurnOutcome::Cancelled;
                }
                return TurnOutcome::Completed {
                    content_blocks: record.blocks,
                };
            }

            // Results from the last round could never reach the model
            if round == self.config.max_tool_rounds {
                tracing::warn!(round, tools = requests.len(), "Tool round limit reached");
                break;
            }

            record.blocks.extend(response.blocks().cloned());
            tracing::info!(round, tools = requests.len(), "Model requested tools");
            messages.push(LlmMessage::from(response));
            record.tool_calls.extend(
                requests
                    .iter()
                    .map(|r| ToolCallSummary::running(&r.id, &r.name, r.input.clone())),
            );
            if !sink.emit(record.snapshot()).await {
                return TurnOutcome::Cancelled;
            }

            let outcomes = self.run_tools(&requests).await;
            if sink.is_closed() {
                // In-flight results are discarded
                return TurnOutcome::Cancelled;
            }

            let mut results = Vec::with_capacity(requests.len());
            for (request, outcome) in requests.iter().zip(&outcomes) {
                record.settle(request, outcome);
                results.push(ContentBlock::tool_result(
                    &request.id,
                    outcome.content(),
                    outcome.is_error(),
                ));
            }
            messages.push(LlmMessage::user(results));
        }

        if !record.tool_calls.is_empty() && !sink.emit(record.snapshot()).await {
            return TurnOutcome::Cancelled;
        }
        TurnOutcome::Failed {
            code: ErrorCode::ToolLoopExceeded,
            message: format!(
                "Tool loop exceeded: no final answer after {} rounds",
                self.config.max_tool_rounds
            ),
        }
    }

    /// Stream one model round, forwarding deltas as they arrive
    async fn stream_round(
        &self,
        llm: &dyn LlmService,
        request: &LlmRequest,
        sink: &EventSink,
    ) -> Result<LlmResponse, RoundError> {
        let mut stream = tokio::select! {
            biased;
            () = sink.closed() => return Err(RoundError::Cancelled),
            result = llm.stream(request) => result.map_err(RoundError::Llm)?,
        };

        loop {
            let next = tokio::select! {
                biased;
                () = sink.closed() => return Err(RoundError::Cancelled),
                next = stream.next() => next,
            };

            let event = match next {
                Some(LlmStreamEvent::ThinkingDelta(content)) => {
                    StreamEvent::ThinkingDelta { content }
                }
                Some(LlmStreamEvent::TextDelta(content)) => StreamEvent::ContentDelta { content },
                Some(LlmStreamEvent::Completed(response)) => return Ok(response),
                Some(LlmStreamEvent::Failed(e)) => return Err(RoundError::Llm(e)),
                None => {
                    return Err(RoundError::Llm(LlmError::stream(
                        "LLM stream ended without a response",
                    )))
                }
            };

            if !sink.emit(event).await {
                return Err(RoundError::Cancelled);
            }
        }
    }

    /// Run one round's tools concurrently and wait for all of them
    async fn run_tools(&self, requests: &[ToolRequest]) -> Vec<ToolOutcome> {
        let handles: Vec<_> = requests
            .iter()
            .map(|request| {
                let bridge = Arc::clone(&self.bridge);
                let id = request.id.clone();
                let name = request.name.clone();
                let input = request.input.clone();
                tokio::spawn(
                    async move {
                        let start = Instant::now();
                        let outcome = bridge.execute(&name, input).await;
                        tracing::info!(
                            tool = %name,
                            tool_use_id = %id,
                            duration_ms = %start.elapsed().as_millis(),
                            is_error = outcome.is_error(),
                            "Tool call finished"
                        );
                        outcome
                    }
                    .in_current_span(),
                )
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(requests)
            .map(|(joined, request)| {
                joined.unwrap_or_else(|e| {
                    tracing::error!(tool = %request.name, error = %e, "Tool task panicked");
                    ToolOutcome::failure(format!("Tool {} crashed: {e}", request.name))
                })
            })
            .collect()
    }
}
