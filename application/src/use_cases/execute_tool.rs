//! Execution engine
//!
//! Runs an admitted call's handler under the tool's circuit breaker and a
//! hard per-call timeout. Whatever happens (success, handler error, panic,
//! timeout, open circuit) comes back as a [`ToolResult`]; nothing escapes.

use super::admit_call::AdmittedCall;
use crate::config::EngineConfig;
use crate::ports::clock::Clock;
use crate::ports::state_store::GatewayStateStore;
use crate::ports::tool_registry::RegisteredTool;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use toolgate_domain::{CircuitPermit, CircuitState, ToolError, ToolResult};
use tracing::{debug, info, warn};

pub struct ExecutionEngine {
    store: Arc<dyn GatewayStateStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(store: Arc<dyn GatewayStateStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn circuit_state(&self, tool_name: &str) -> CircuitState {
        self.store.circuit_state(tool_name).await
    }

    pub async fn execute(&self, tool: &RegisteredTool, admitted: AdmittedCall) -> ToolResult {
        let AdmittedCall { call, charged_cost } = admitted;
        let tool_name = tool.name();
        let started = Instant::now();

        let permit = match self
            .store
            .acquire_circuit(tool_name, &self.config.circuit, self.clock.now())
            .await
        {
            Ok(permit) => permit,
            Err(retry_after) => {
                debug!("Circuit open for {}, rejecting call {}", tool_name, call.id);
                return ToolResult::failure(
                    &call.id,
                    tool_name,
                    ToolError::circuit_open(tool_name, retry_after),
                )
                .with_cost(charged_cost);
            }
        };
        if permit == CircuitPermit::Trial {
            info!("Circuit for {} half-open, sending trial call {}", tool_name, call.id);
        }

        let timeout = tool.spec.timeout().unwrap_or(self.config.default_timeout);
        let invocation = AssertUnwindSafe(tool.handler.invoke(call.arguments_value())).catch_unwind();

        let outcome = match tokio::time::timeout(timeout, invocation).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(e))) => Err(ToolError::handler_failed(e.to_string())),
            Ok(Err(panic)) => Err(ToolError::handler_failed(format!(
                "Tool '{}' panicked: {}",
                tool_name,
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(ToolError::timeout(tool_name, timeout)),
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(output) => {
                let state = self.store.record_circuit_success(tool_name, permit).await;
                if permit == CircuitPermit::Trial && state == CircuitState::Closed {
                    info!("Circuit for {} closed after successful trial", tool_name);
                }
                ToolResult::success(&call.id, tool_name, output)
                    .with_latency(latency_ms)
                    .with_cost(charged_cost)
            }
            Err(error) => {
                warn!("Tool {} call {} failed: {}", tool_name, call.id, error);
                let state = self
                    .store
                    .record_circuit_failure(tool_name, permit, &self.config.circuit, self.clock.now())
                    .await;
                if state == CircuitState::Open {
                    warn!("Circuit for {} is open", tool_name);
                }
                ToolResult::failure(&call.id, tool_name, error)
                    .with_latency(latency_ms)
                    .with_cost(charged_cost)
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
