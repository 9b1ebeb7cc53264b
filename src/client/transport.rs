//! HTTP transport for the turn stream

use super::assembler::AssemblyError;
use super::conversation::ConversationLog;
use super::decoder::EventDecoder;
use super::message::{Message, Phase, TurnFailure};
use crate::protocol::{ErrorCode, ProtocolError, StreamEvent};
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to a worldsmith server
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Run one turn: send `content` with the log's history and assemble the
    /// reply into the log.
    ///
    /// `on_event` sees every accepted event with the phase it produced. The
    /// returned message is always done or failed; transport problems fail
    /// the message rather than returning an error.
    pub async fn send(
        &self,
        log: &mut ConversationLog,
        content: &str,
        mut on_event: impl FnMut(&StreamEvent, Phase),
    ) -> Result<Message, ClientError> {
        let (id, request) = log.begin_turn(content)?;
        tracing::debug!(turn = %id, history_len = request.conversation_history.len(), "Sending turn");

        let response = match self
            .http
            .post(format!("{}/api/chat/send", self.base_url))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log.fail(
                    id,
                    TurnFailure::new(ErrorCode::ConnectionInterrupted, format!("Request failed: {e}")),
                )?;
                return finished(log, id);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map_or_else(|_| format!("Server returned {status}"), |body| body.error);
            let code = if status.is_client_error() {
                ErrorCode::ProtocolViolation
            } else {
                ErrorCode::Internal
            };
            log.fail(id, TurnFailure::new(code, message))?;
            return finished(log, id);
        }

        if !is_event_stream(&response) {
            log.fail(
                id,
                TurnFailure::new(
                    ErrorCode::ProtocolViolation,
                    format!("Server replied with {} instead of an event stream", content_type(&response)),
                ),
            )?;
            return finished(log, id);
        }

        let mut decoder = EventDecoder::new();
        let mut body = response.bytes_stream();

        while in_flight(log, id) {
            let (decoded, eof) = match body.next().await {
                Some(Ok(chunk)) => (decoder.push(&chunk), false),
                Some(Err(e)) => {
                    tracing::warn!(turn = %id, error = %e, "Turn stream broke");
                    break;
                }
                None => (decoder.finish().into_iter().collect(), true),
            };

            for result in decoded {
                if !in_flight(log, id) {
                    break;
                }
                apply(log, id, result, &mut on_event)?;
            }
            if eof {
                break;
            }
        }

        if in_flight(log, id) {
            log.interrupt(id)?;
        }
        finished(log, id)
    }
}

/// Apply one decoded result; malformed events fail the turn
fn apply(
    log: &mut ConversationLog,
    id: Uuid,
    result: Result<StreamEvent, ProtocolError>,
    on_event: &mut impl FnMut(&StreamEvent, Phase),
) -> Result<(), ClientError> {
    match result {
        Ok(event) => match log.apply(id, event.clone()) {
            Ok(phase) => on_event(&event, phase),
            Err(AssemblyError::Protocol(e)) => {
                tracing::warn!(turn = %id, error = %e, "Rejected turn event");
            }
            Err(e) => return Err(e.into()),
        },
        Err(e) => {
            tracing::warn!(turn = %id, error = %e, "Malformed turn event");
            log.fail(id, TurnFailure::protocol(&e))?;
        }
    }
    Ok(())
}

fn content_type(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("no content type")
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    content_type(response).starts_with("text/event-stream")
}

fn in_flight(log: &ConversationLog, id: Uuid) -> bool {
    log.in_flight().is_some_and(|assembler| assembler.id() == id)
}

fn finished(log: &ConversationLog, id: Uuid) -> Result<Message, ClientError> {
    log.messages()
        .iter()
        .rev()
        .find(|message| message.id == id)
        .cloned()
        .ok_or_else(|| AssemblyError::UnknownTurn(id).into())
}
