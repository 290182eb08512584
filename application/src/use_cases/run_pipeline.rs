//! Run pipeline use case
//!
//! The conversation orchestrator. One run is a sequence of turns; a turn is
//! one model round trip plus the dispatch of whatever calls it requested:
//!
//! ```text
//! ┌──────────────┐  tool calls   ┌────────────────────────────────────────┐
//! │ ModelAdapter │──────────────▶│ per call: parse → admit → execute      │
//! │  complete()  │◀──────────────│ (bounded fan-out, request order kept)  │
//! └──────────────┘  tool results └────────────────────────────────────────┘
//!        │ no tool calls
//!        ▼
//!      Done
//! ```
//!
//! A failing call never ends the run: its error becomes that call's tool
//! message so the model can react. The run itself fails only when the
//! adapter fails, a turn overruns its deadline, the caller cancels, or the
//! model is still asking for tools after `max_turns` turns.

use super::admit_call::AdmissionController;
use super::execute_tool::ExecutionEngine;
use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::model_adapter::{AdapterError, ModelAdapter};
use crate::ports::progress::{NoPipelineProgress, PipelineProgressNotifier};
use crate::ports::tool_registry::ToolRegistry;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use toolgate_domain::{
    ConversationError, ConversationState, Message, ModelResponse, RequestedToolCall, TokenUsage,
    ToolCall, ToolError, ToolResult, ToolSpec, normalize_call_ids,
};
use tracing::{debug, info, warn};

/// Terminal errors: the run is over and no answer was produced.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Model adapter failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Model still requested tools after {max_turns} turns")]
    MaxTurnsExceeded { max_turns: u32 },

    #[error("Turn {turn} exceeded its {timeout_ms}ms deadline")]
    TurnTimeout { turn: u32, timeout_ms: u64 },

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),
}

/// Input for one run
#[derive(Debug, Clone)]
pub struct RunPipelineInput {
    pub prompt: String,
    /// Tools the model may call in this run
    pub available_tools: Vec<String>,
    pub system_prompt: Option<String>,
    /// Identity checked by permissions, rate limits and quotas
    pub user_id: String,
    pub params: ExecutionParams,
}

impl RunPipelineInput {
    pub fn new(prompt: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            available_tools: Vec::new(),
            system_prompt: None,
            user_id: user_id.into(),
            params: ExecutionParams::default(),
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        self.params = params;
        self
    }
}

/// Output of a completed run
#[derive(Debug, Clone)]
pub struct RunPipelineOutput {
    pub final_content: String,
    /// Every call's result, in the order the calls were requested
    pub tool_results: Vec<ToolResult>,
    pub turns: u32,
    pub total_cost: f64,
    pub total_duration_ms: u64,
    pub usage: TokenUsage,
    pub messages: Vec<Message>,
}

enum TurnOutcome {
    Final(String),
    Continue(Vec<ToolResult>),
}

pub struct RunPipelineUseCase {
    adapter: Arc<dyn ModelAdapter>,
    registry: Arc<dyn ToolRegistry>,
    admission: Arc<AdmissionController>,
    engine: Arc<ExecutionEngine>,
    logger: Arc<dyn ConversationLogger>,
    cancellation: Option<CancellationToken>,
}

impl RunPipelineUseCase {
    pub fn new(
        adapter: Arc<dyn ModelAdapter>,
        registry: Arc<dyn ToolRegistry>,
        admission: Arc<AdmissionController>,
        engine: Arc<ExecutionEngine>,
    ) -> Self {
        Self {
            adapter,
            registry,
            admission,
            engine,
            logger: Arc::new(NoConversationLogger),
            cancellation: None,
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub async fn execute(&self, input: RunPipelineInput) -> Result<RunPipelineOutput, PipelineError> {
        self.execute_with_progress(input, &NoPipelineProgress).await
    }

    pub async fn execute_with_progress(
        &self,
        input: RunPipelineInput,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<RunPipelineOutput, PipelineError> {
        let started = Instant::now();
        let result = self.run(&input, progress, started).await;

        match &result {
            Ok(output) => {
                info!(
                    "Pipeline finished after {} turns ({} tool calls, cost {:.4})",
                    output.turns,
                    output.tool_results.len(),
                    output.total_cost
                );
                progress.on_complete(output.turns, true);
            }
            Err(e) => {
                warn!("Pipeline aborted: {}", e);
                self.logger.log(ConversationEvent::new(
                    "pipeline_error",
                    json!({ "user_id": input.user_id, "error": e.to_string() }),
                ));
                progress.on_complete(0, false);
            }
        }
        result
    }

    async fn run(
        &self,
        input: &RunPipelineInput,
        progress: &dyn PipelineProgressNotifier,
        started: Instant,
    ) -> Result<RunPipelineOutput, PipelineError> {
        let params = &input.params;
        if params.max_turns == 0 {
            return Err(PipelineError::InvalidInput(
                "max_turns must be at least 1".to_string(),
            ));
        }
        if input.user_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput("user_id is required".to_string()));
        }

        let tool_specs = self.resolve_tool_specs(&input.available_tools);
        info!(
            "Starting pipeline for {} with {} tools (max {} turns)",
            input.user_id,
            tool_specs.len(),
            params.max_turns
        );
        self.logger.log(ConversationEvent::new(
            "pipeline_start",
            json!({
                "user_id": input.user_id,
                "prompt": input.prompt,
                "tools": tool_specs.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "max_turns": params.max_turns,
            }),
        ));

        let mut state = ConversationState::new(input.prompt.clone());
        let mut tool_results = Vec::new();
        let mut usage = TokenUsage::default();

        while state.turns() < params.max_turns {
            let turn = state.begin_turn()?;
            progress.on_turn_start(turn, params.max_turns);

            let outcome = self
                .run_turn_guarded(turn, &mut state, &tool_specs, input, progress, &mut usage)
                .await;
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    state.abort();
                    return Err(e);
                }
            };

            match outcome {
                TurnOutcome::Final(final_content) => {
                    let total_cost = tool_results.iter().map(|r: &ToolResult| r.cost).sum();
                    return Ok(RunPipelineOutput {
                        final_content,
                        tool_results,
                        turns: state.turns(),
                        total_cost,
                        total_duration_ms: u64::try_from(started.elapsed().as_millis())
                            .unwrap_or(u64::MAX),
                        usage,
                        messages: state.into_messages(),
                    });
                }
                TurnOutcome::Continue(results) => tool_results.extend(results),
            }
        }

        state.abort();
        Err(PipelineError::MaxTurnsExceeded {
            max_turns: params.max_turns,
        })
    }

    /// Run one turn under the per-turn deadline and the cancellation token.
    /// Dropping the turn future on either cancels its in-flight handlers.
    async fn run_turn_guarded(
        &self,
        turn: u32,
        state: &mut ConversationState,
        tool_specs: &[ToolSpec],
        input: &RunPipelineInput,
        progress: &dyn PipelineProgressNotifier,
        usage: &mut TokenUsage,
    ) -> Result<TurnOutcome, PipelineError> {
        let timeout = input.params.per_turn_timeout;
        let turn_future = self.run_turn(turn, state, tool_specs, input, progress, usage);

        let deadline_bound = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, turn_future)
                    .await
                    .unwrap_or_else(|_| {
                        Err(PipelineError::TurnTimeout {
                            turn,
                            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        })
                    }),
                None => turn_future.await,
            }
        };

        match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(PipelineError::Cancelled),
                outcome = deadline_bound => outcome,
            },
            None => deadline_bound.await,
        }
    }

    async fn run_turn(
        &self,
        turn: u32,
        state: &mut ConversationState,
        tool_specs: &[ToolSpec],
        input: &RunPipelineInput,
        progress: &dyn PipelineProgressNotifier,
        usage: &mut TokenUsage,
    ) -> Result<TurnOutcome, PipelineError> {
        let response = self
            .ask_model(state.messages(), tool_specs, input, progress)
            .await?;
        usage.add(response.usage);

        self.logger.log(ConversationEvent::new(
            "model_response",
            json!({
                "turn": turn,
                "content": response.content,
                "tool_calls": response.tool_calls.len(),
                "input_tokens": response.usage.input_tokens,
                "output_tokens": response.usage.output_tokens,
            }),
        ));

        if !response.has_tool_calls() {
            debug!("Turn {}: final answer", turn);
            state.finish(response.content.clone())?;
            return Ok(TurnOutcome::Final(response.content));
        }

        let ModelResponse {
            content,
            mut tool_calls,
            ..
        } = response;
        normalize_call_ids(turn, &mut tool_calls);
        debug!("Turn {}: model requested {} tool calls", turn, tool_calls.len());

        state.record_tool_requests(content, tool_calls.clone())?;
        let results = self.dispatch(&tool_calls, input, progress).await;
        state.record_tool_results(&results)?;

        Ok(TurnOutcome::Continue(results))
    }

    async fn ask_model(
        &self,
        messages: &[Message],
        tool_specs: &[ToolSpec],
        input: &RunPipelineInput,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<ModelResponse, PipelineError> {
        let system_prompt = input.system_prompt.as_deref();
        let response = if input.params.streaming {
            self.adapter
                .stream_complete(messages, tool_specs, system_prompt)
                .await?
                .collect_response(|chunk| progress.on_model_delta(chunk))
                .await?
        } else {
            self.adapter
                .complete(messages, tool_specs, system_prompt)
                .await?
        };
        Ok(response)
    }

    /// Dispatch one turn's calls with bounded fan-out. Results come back in
    /// request order whatever order the calls finish in.
    async fn dispatch(
        &self,
        calls: &[RequestedToolCall],
        input: &RunPipelineInput,
        progress: &dyn PipelineProgressNotifier,
    ) -> Vec<ToolResult> {
        let available: HashSet<&str> = input.available_tools.iter().map(String::as_str).collect();
        let limit = input.params.concurrency.limit();

        stream::iter(
            calls
                .iter()
                .map(|call| self.dispatch_call(call, &available, &input.user_id, progress)),
        )
        .buffered(limit)
        .collect()
        .await
    }

    async fn dispatch_call(
        &self,
        requested: &RequestedToolCall,
        available: &HashSet<&str>,
        user_id: &str,
        progress: &dyn PipelineProgressNotifier,
    ) -> ToolResult {
        let result = self
            .admit_and_execute(requested, available, user_id, progress)
            .await;

        self.logger.log(ConversationEvent::new(
            "tool_result",
            json!({
                "call_id": result.call_id,
                "tool": result.tool_name,
                "success": result.success,
                "error_code": result.error.as_ref().map(|e| e.code.as_str()),
                "latency_ms": result.latency_ms,
                "cost": result.cost,
            }),
        ));
        progress.on_tool_result(&result);
        result
    }

    async fn admit_and_execute(
        &self,
        requested: &RequestedToolCall,
        available: &HashSet<&str>,
        user_id: &str,
        progress: &dyn PipelineProgressNotifier,
    ) -> ToolResult {
        let denied = |error: ToolError| ToolResult::failure(&requested.id, &requested.name, error);

        let tool = match self.registry.get_tool_by_name(&requested.name) {
            Some(tool) if available.contains(requested.name.as_str()) => tool,
            _ => {
                warn!("Model requested unavailable tool: {}", requested.name);
                return denied(ToolError::not_found(&requested.name));
            }
        };

        let call: ToolCall = match ToolCall::from_requested(requested) {
            Ok(call) => call,
            Err(error) => return denied(error),
        };

        progress.on_tool_call(&call);
        self.logger.log(ConversationEvent::new(
            "tool_call",
            json!({
                "call_id": call.id,
                "tool": call.tool_name,
                "arguments": call.arguments,
            }),
        ));

        match self.admission.admit(user_id, &tool.spec, call).await {
            Ok(admitted) => self.engine.execute(&tool, admitted).await,
            Err(error) => {
                debug!("Call {} denied: {}", requested.id, error);
                denied(error)
            }
        }
    }

    fn resolve_tool_specs(&self, names: &[String]) -> Vec<ToolSpec> {
        names
            .iter()
            .filter_map(|name| match self.registry.get_tool_by_name(name) {
                Some(tool) => Some(tool.spec),
                None => {
                    warn!("Tool '{}' is not registered; not offering it to the model", name);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Concurrency, EngineConfig};
    use crate::ports::clock::{Clock, ManualClock};
    use crate::ports::conversation_logger::MemoryConversationLogger;
    use crate::ports::model_adapter::StreamHandle;
    use crate::ports::state_store::{GatewayStateStore, InMemoryStateStore};
    use crate::ports::tool_registry::{HandlerError, RegisteredTool, ToolHandler};
    use crate::services::{PermissionChecker, QuotaTracker, RateLimitDefaults, RateLimiter};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;
    use toolgate_domain::{
        CostQuota, ErrorCode, ParameterSchema, PermissionPolicy, Role, StreamEvent,
        UserPermissions, permission::ADMIN_ROLE,
    };

    // ==================== Mocks ====================

    /// Plays back a fixed list of responses, then keeps repeating the last.
    struct ScriptAdapter {
        responses: Vec<ModelResponse>,
        calls: AtomicU32,
        seen_tools: Mutex<Vec<String>>,
    }

    impl ScriptAdapter {
        fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses,
                calls: AtomicU32::new(0),
                seen_tools: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelAdapter for ScriptAdapter {
        fn name(&self) -> &str {
            "script"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            tools: &[ToolSpec],
            _system_prompt: Option<&str>,
        ) -> Result<ModelResponse, AdapterError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            *self.seen_tools.lock().unwrap() = tools.iter().map(|t| t.name.clone()).collect();
            let index = n.min(self.responses.len() - 1);
            Ok(self.responses[index].clone())
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl ModelAdapter for FailingAdapter {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
            _system_prompt: Option<&str>,
        ) -> Result<ModelResponse, AdapterError> {
            Err(AdapterError::Connection("refused".to_string()))
        }
    }

    /// Sleeps for `delay_ms` from the arguments, then echoes them.
    struct SleepyEcho {
        invocations: AtomicUsize,
        completions: AtomicUsize,
    }

    #[async_trait]
    impl ToolHandler for SleepyEcho {
        async fn invoke(&self, arguments: Value) -> Result<Value, HandlerError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            let delay = arguments.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.completions.fetch_add(1, Ordering::SeqCst);
            Ok(arguments.get("text").cloned().unwrap_or(Value::Null))
        }
    }

    struct MapRegistry {
        tools: HashMap<String, RegisteredTool>,
    }

    impl ToolRegistry for MapRegistry {
        fn get_tool_by_name(&self, name: &str) -> Option<RegisteredTool> {
            self.tools.get(name).cloned()
        }

        fn tool_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.tools.keys().cloned().collect();
            names.sort();
            names
        }
    }

    struct Harness {
        registry: Arc<MapRegistry>,
        admission: Arc<AdmissionController>,
        engine: Arc<ExecutionEngine>,
        echo: Arc<SleepyEcho>,
    }

    fn harness() -> Harness {
        let echo = Arc::new(SleepyEcho {
            invocations: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
        });
        let echo_spec = ToolSpec::new("echo", "Echo text").with_parameters(
            ParameterSchema::object()
                .with_property("text", ParameterSchema::string(), true)
                .with_property("delay_ms", ParameterSchema::integer(), false),
        );
        let costly_spec = ToolSpec::new("costly", "Costs money").with_estimated_cost(2.5);

        let mut tools = HashMap::new();
        tools.insert("echo".to_string(), RegisteredTool::new(echo_spec, echo.clone()));
        tools.insert("costly".to_string(), RegisteredTool::new(costly_spec, echo.clone()));
        let registry = Arc::new(MapRegistry { tools });

        let store: Arc<dyn GatewayStateStore> = Arc::new(InMemoryStateStore::new());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
        let permissions = Arc::new(PermissionChecker::new(PermissionPolicy::with_default_roles()));
        permissions.set_user_permissions(UserPermissions::new("alice").with_role(ADMIN_ROLE));

        let rate_limiter = Arc::new(RateLimiter::new(
            store.clone(),
            clock.clone(),
            RateLimitDefaults::default(),
        ));
        let quota = Arc::new(QuotaTracker::new(store.clone(), clock.clone(), CostQuota::default()));
        let admission = Arc::new(AdmissionController::new(permissions, rate_limiter, quota));
        let engine = Arc::new(ExecutionEngine::new(store, clock, EngineConfig::default()));

        Harness {
            registry,
            admission,
            engine,
            echo,
        }
    }

    impl Harness {
        fn use_case(&self, adapter: Arc<dyn ModelAdapter>) -> RunPipelineUseCase {
            RunPipelineUseCase::new(
                adapter,
                self.registry.clone(),
                self.admission.clone(),
                self.engine.clone(),
            )
        }
    }

    fn call(id: &str, name: &str, payload: &str) -> RequestedToolCall {
        RequestedToolCall::new(id, name, payload)
    }

    fn input() -> RunPipelineInput {
        RunPipelineInput::new("hello", "alice").with_tools(["echo", "costly"])
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_answers_without_tools_in_one_turn() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![ModelResponse::from_text("hi there")]);
        let output = h.use_case(adapter.clone()).execute(input()).await.unwrap();

        assert_eq!(output.final_content, "hi there");
        assert_eq!(output.turns, 1);
        assert!(output.tool_results.is_empty());
        assert_eq!(output.messages.len(), 2);
        assert_eq!(adapter.calls(), 1);
        assert_eq!(
            *adapter.seen_tools.lock().unwrap(),
            vec!["echo".to_string(), "costly".to_string()]
        );
    }

    #[tokio::test]
    async fn test_tool_round_trip_then_answer() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![
            ModelResponse::with_tool_calls(
                "",
                vec![call("c1", "echo", r#"{"text":"ping"}"#), call("c2", "costly", "")],
            ),
            ModelResponse::from_text("done"),
        ]);
        let logger = Arc::new(MemoryConversationLogger::new());
        let output = h
            .use_case(adapter)
            .with_conversation_logger(logger.clone())
            .execute(input())
            .await
            .unwrap();

        assert_eq!(output.turns, 2);
        assert_eq!(output.tool_results.len(), 2);
        assert_eq!(output.tool_results[0].output(), Some(&json!("ping")));
        assert_eq!(output.total_cost, 2.5);

        let tool_messages: Vec<&Message> = output
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_messages.len(), 2);
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(tool_messages[0].content, "ping");

        let events = logger.event_types();
        assert_eq!(events.first(), Some(&"pipeline_start"));
        assert_eq!(events.iter().filter(|e| **e == "tool_result").count(), 2);
    }

    #[tokio::test]
    async fn test_max_turns_bounds_model_calls_exactly() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![ModelResponse::with_tool_calls(
            "again",
            vec![call("c", "echo", r#"{"text":"x"}"#)],
        )]);
        let params = ExecutionParams::default().with_max_turns(3);
        let err = h
            .use_case(adapter.clone())
            .execute(input().with_params(params))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MaxTurnsExceeded { max_turns: 3 }));
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_validation_failure_never_invokes_handler() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![
            ModelResponse::with_tool_calls(
                "",
                vec![
                    call("c1", "echo", r#"{"text": 42}"#),
                    call("c2", "echo", "{broken"),
                ],
            ),
            ModelResponse::from_text("giving up"),
        ]);
        let output = h.use_case(adapter).execute(input()).await.unwrap();

        assert_eq!(h.echo.invocations.load(Ordering::SeqCst), 0);
        for result in &output.tool_results {
            assert!(!result.is_success());
            assert_eq!(result.error().unwrap().code, ErrorCode::ValidationFailed);
        }
        assert_eq!(output.tool_results[0].error().unwrap().fields[0].path, "$.text");
    }

    #[tokio::test]
    async fn test_unavailable_tools_are_not_found() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![
            ModelResponse::with_tool_calls(
                "",
                vec![call("c1", "costly", "{}"), call("c2", "rm_rf", "{}")],
            ),
            ModelResponse::from_text("ok"),
        ]);
        let output = h
            .use_case(adapter)
            .execute(input().with_tools(["echo"]))
            .await
            .unwrap();

        for result in &output.tool_results {
            assert_eq!(result.error().unwrap().code, ErrorCode::ToolNotFound);
        }
    }

    #[tokio::test]
    async fn test_denied_user_gets_recoverable_errors() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![
            ModelResponse::with_tool_calls("", vec![call("c1", "echo", r#"{"text":"x"}"#)]),
            ModelResponse::from_text("could not"),
        ]);
        let output = h
            .use_case(adapter)
            .execute(RunPipelineInput::new("hi", "mallory").with_tools(["echo"]))
            .await
            .unwrap();

        assert_eq!(output.final_content, "could not");
        let error = output.tool_results[0].error().unwrap();
        assert_eq!(error.code, ErrorCode::PermissionDenied);

        let tool_message = output.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_message.content.contains("PERMISSION_DENIED"));
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_ids_are_normalized() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![
            ModelResponse::with_tool_calls(
                "",
                vec![
                    call("same", "echo", r#"{"text":"a"}"#),
                    call("same", "echo", r#"{"text":"b"}"#),
                    call("", "echo", r#"{"text":"c"}"#),
                ],
            ),
            ModelResponse::from_text("ok"),
        ]);
        let output = h.use_case(adapter).execute(input()).await.unwrap();

        let ids: Vec<&str> = output.tool_results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["same", "call_1_1", "call_1_2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_dispatch_preserves_request_order() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![
            ModelResponse::with_tool_calls(
                "",
                vec![
                    call("slow", "echo", r#"{"text":"first","delay_ms":300}"#),
                    call("fast", "echo", r#"{"text":"second","delay_ms":10}"#),
                    call("mid", "echo", r#"{"text":"third","delay_ms":100}"#),
                ],
            ),
            ModelResponse::from_text("ok"),
        ]);
        let params = ExecutionParams::default().with_concurrency(Concurrency::Parallel(3));
        let started = Instant::now();
        let output = h
            .use_case(adapter)
            .execute(input().with_params(params))
            .await
            .unwrap();

        let outputs: Vec<Value> = output
            .tool_results
            .iter()
            .map(|r| r.output().cloned().unwrap())
            .collect();
        assert_eq!(outputs, vec![json!("first"), json!("second"), json!("third")]);
        // Calls overlapped: total is the slowest, not the sum
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_dispatch_runs_one_at_a_time() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![
            ModelResponse::with_tool_calls(
                "",
                vec![
                    call("a", "echo", r#"{"text":"a","delay_ms":100}"#),
                    call("b", "echo", r#"{"text":"b","delay_ms":100}"#),
                ],
            ),
            ModelResponse::from_text("ok"),
        ]);
        let params = ExecutionParams::default().with_concurrency(Concurrency::Sequential);
        let started = Instant::now();
        h.use_case(adapter)
            .execute(input().with_params(params))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_timeout_aborts_run() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![ModelResponse::with_tool_calls(
            "",
            vec![call("c1", "echo", r#"{"text":"x","delay_ms":10000}"#)],
        )]);
        let params = ExecutionParams::default().with_per_turn_timeout(Some(Duration::from_secs(1)));
        let err = h
            .use_case(adapter)
            .execute(input().with_params(params))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::TurnTimeout {
                turn: 1,
                timeout_ms: 1000
            }
        ));

        // The in-flight call is dropped, not left running.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(h.echo.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(h.echo.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_adapter_failure_is_terminal() {
        let h = harness();
        let err = h
            .use_case(Arc::new(FailingAdapter))
            .execute(input())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Adapter(AdapterError::Connection(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let h = harness();
        let token = CancellationToken::new();
        token.cancel();
        let adapter = ScriptAdapter::new(vec![ModelResponse::from_text("never")]);
        let err = h
            .use_case(adapter)
            .with_cancellation(token)
            .execute(input())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[tokio::test]
    async fn test_zero_max_turns_is_invalid() {
        let h = harness();
        let adapter = ScriptAdapter::new(vec![ModelResponse::from_text("x")]);
        let err = h
            .use_case(adapter.clone())
            .execute(input().with_params(ExecutionParams::default().with_max_turns(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_streaming_forwards_deltas() {
        struct ChunkedAdapter;

        #[async_trait]
        impl ModelAdapter for ChunkedAdapter {
            fn name(&self) -> &str {
                "chunked"
            }

            async fn complete(
                &self,
                _messages: &[Message],
                _tools: &[ToolSpec],
                _system_prompt: Option<&str>,
            ) -> Result<ModelResponse, AdapterError> {
                Ok(ModelResponse::from_text("unused"))
            }

            async fn stream_complete(
                &self,
                _messages: &[Message],
                _tools: &[ToolSpec],
                _system_prompt: Option<&str>,
            ) -> Result<StreamHandle, AdapterError> {
                let (tx, rx) = tokio::sync::mpsc::channel(4);
                for chunk in ["str", "eam", "ed"] {
                    tx.send(StreamEvent::Delta(chunk.to_string())).await.unwrap();
                }
                Ok(StreamHandle::new(rx))
            }
        }

        struct Collect(Mutex<String>);
        impl PipelineProgressNotifier for Collect {
            fn on_model_delta(&self, chunk: &str) {
                self.0.lock().unwrap().push_str(chunk);
            }
        }

        let h = harness();
        let progress = Collect(Mutex::new(String::new()));
        let output = h
            .use_case(Arc::new(ChunkedAdapter))
            .execute_with_progress(
                input().with_params(ExecutionParams::default().with_streaming(true)),
                &progress,
            )
            .await
            .unwrap();

        assert_eq!(output.final_content, "streamed");
        assert_eq!(*progress.0.lock().unwrap(), "streamed");
    }
}
