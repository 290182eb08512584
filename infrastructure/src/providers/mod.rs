//! Model backends
//!
//! [`ModelBackend`] is the closed set of adapters the CLI can select from
//! configuration, plus an escape hatch for adapters supplied by embedders.

pub mod scripted;

pub use scripted::{ScriptError, ScriptedModelAdapter};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use toolgate_application::{AdapterError, ModelAdapter, StreamHandle};
use toolgate_domain::{Message, ModelResponse, ToolSpec};

#[derive(Clone)]
pub enum ModelBackend {
    /// Transcript replay
    Scripted(Arc<ScriptedModelAdapter>),
    /// Any other adapter implementation
    Custom(Arc<dyn ModelAdapter>),
}

impl ModelBackend {
    pub fn scripted_from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        Ok(Self::Scripted(Arc::new(ScriptedModelAdapter::from_file(
            path,
        )?)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelBackend::Scripted(_) => "scripted",
            ModelBackend::Custom(_) => "custom",
        }
    }

    fn adapter(&self) -> &dyn ModelAdapter {
        match self {
            ModelBackend::Scripted(adapter) => adapter.as_ref(),
            ModelBackend::Custom(adapter) => adapter.as_ref(),
        }
    }
}

impl std::fmt::Debug for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ModelBackend")
            .field(&self.kind())
            .field(&self.adapter().name())
            .finish()
    }
}

#[async_trait]
impl ModelAdapter for ModelBackend {
    fn name(&self) -> &str {
        self.adapter().name()
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        system_prompt: Option<&str>,
    ) -> Result<ModelResponse, AdapterError> {
        self.adapter().complete(messages, tools, system_prompt).await
    }

    async fn stream_complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        system_prompt: Option<&str>,
    ) -> Result<StreamHandle, AdapterError> {
        self.adapter()
            .stream_complete(messages, tools, system_prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refusing;

    #[async_trait]
    impl ModelAdapter for Refusing {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
            _system_prompt: Option<&str>,
        ) -> Result<ModelResponse, AdapterError> {
            Err(AdapterError::Connection("no route".to_string()))
        }
    }

    #[tokio::test]
    async fn test_backend_delegates() {
        let scripted = ModelBackend::Scripted(Arc::new(ScriptedModelAdapter::new(vec![
            ModelResponse::from_text("hello"),
        ])));
        assert_eq!(scripted.kind(), "scripted");
        assert_eq!(scripted.name(), "scripted");
        assert_eq!(
            scripted.complete(&[], &[], None).await.unwrap().content,
            "hello"
        );

        let custom = ModelBackend::Custom(Arc::new(Refusing));
        assert_eq!(custom.kind(), "custom");
        assert_eq!(custom.name(), "refusing");
        assert!(matches!(
            custom.complete(&[], &[], None).await,
            Err(AdapterError::Connection(_))
        ));
    }
}
