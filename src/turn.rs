//! Turn execution
//!
//! One turn = one user message answered by the model, with any number of
//! tool rounds in between (bounded by [`TurnConfig::max_tool_rounds`]).

mod context;
mod executor;

#[cfg(test)]
pub(crate) mod testing;

pub use context::build_llm_messages;
pub use executor::{EventSink, TurnConfig, TurnExecutor, TurnOutcome};
