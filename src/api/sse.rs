//! Server-Sent Events support

use crate::protocol::StreamEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Stream a turn's events until the executor drops its sink
pub fn turn_stream(
    rx: mpsc::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = ReceiverStream::new(rx).map(|event| Ok(stream_event_to_axum(&event)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn stream_event_to_axum(event: &StreamEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, event = event.name(), "Failed to serialize stream event");
        r#"{"type":"error","error":"Failed to serialize event","code":"internal"}"#.to_string()
    });
    Event::default().event(event.name()).data(data)
}
