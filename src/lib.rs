//! Worldsmith - streaming turn protocol for a worldbuilding assistant
//!
//! The server runs each user turn against the model, executing worldbuilding
//! tools between rounds, and streams the turn as typed events. The client
//! side rebuilds messages from those events and replays history.

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unused_async
)]

pub mod api;
pub mod bridge;
pub mod client;
pub mod config;
pub mod llm;
pub mod protocol;
pub mod system_prompt;
pub mod turn;

mod sse;
