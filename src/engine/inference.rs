use crate::error::InferenceError;
use async_trait::async_trait;

/// One request to the external inference collaborator. The prompt is already
/// fully templated from the execution context.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub prompt: String,
    pub system: Option<String>,
}

/// The seam to the AI collaborator behind `ai_analysis` steps: prompt in,
/// text out. Implementations wrap whatever provider the host application
/// talks to; the engine only awaits the reply under its own timeout.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<String, InferenceError>;
}

/// Default provider for engines without an inference collaborator; every
/// `ai_analysis` step fails cleanly instead of hanging.
pub struct NoInference;

#[async_trait]
impl InferenceProvider for NoInference {
    async fn infer(&self, _request: InferenceRequest) -> Result<String, InferenceError> {
        Err(InferenceError(
            "no inference provider configured".to_string(),
        ))
    }
}
