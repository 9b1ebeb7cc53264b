use super::{ToolBridge, ToolOutcome, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Bounds every call of the wrapped bridge
pub struct TimeoutBridge {
    inner: Arc<dyn ToolBridge>,
    limit: Duration,
}

impl TimeoutBridge {
    pub fn new(inner: Arc<dyn ToolBridge>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl ToolBridge for TimeoutBridge {
    fn available_tools(&self) -> Vec<ToolSpec> {
        self.inner.available_tools()
    }

    async fn execute(&self, tool: &str, input: Value) -> ToolOutcome {
        if let Ok(outcome) = tokio::time::timeout(self.limit, self.inner.execute(tool, input)).await {
            outcome
        } else {
            tracing::warn!(tool = %tool, limit_secs = self.limit.as_secs(), "Tool call timed out");
            ToolOutcome::failure(format!("[tool {tool} timed out after {:?}]", self.limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy;

    #[async_trait]
    impl ToolBridge for Sleepy {
        fn available_tools(&self) -> Vec<ToolSpec> {
            Vec::new()
        }

        async fn execute(&self, _tool: &str, _input: Value) -> ToolOutcome {
            tokio::time::sleep(Duration::from_secs(60)).await;
            ToolOutcome::success("done")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tool_becomes_failure() {
        let bridge = TimeoutBridge::new(Arc::new(Sleepy), Duration::from_secs(5));
        let outcome = bridge.execute("build_static_site", Value::Null).await;
        assert_eq!(
            outcome,
            ToolOutcome::failure("[tool build_static_site timed out after 5s]")
        );
    }
}
