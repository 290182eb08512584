//! Closure-backed tool handlers

use async_trait::async_trait;
use serde_json::Value;
use toolgate_application::{HandlerError, ToolHandler};

/// Adapts a synchronous closure to [`ToolHandler`].
///
/// For tools that compute their answer directly from the arguments; anything
/// that waits on I/O should implement [`ToolHandler`] itself.
pub struct FnToolHandler<F> {
    f: F,
}

impl<F> FnToolHandler<F>
where
    F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync,
{
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerError> {
        (self.f)(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_closure_is_invoked() {
        let double = FnToolHandler::new(|args: Value| {
            args.get("n")
                .and_then(Value::as_i64)
                .map(|n| json!(n * 2))
                .ok_or_else(|| HandlerError::InvalidArguments("n must be an integer".to_string()))
        });

        assert_eq!(double.invoke(json!({"n": 21})).await.unwrap(), json!(42));
        assert!(matches!(
            double.invoke(json!({})).await,
            Err(HandlerError::InvalidArguments(_))
        ));
    }
}
