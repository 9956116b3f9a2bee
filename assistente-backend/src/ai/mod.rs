pub mod gemini;
pub mod reply;
pub mod types;

pub use gemini::GeminiClient;
pub use reply::{ReplyError, ReplyGenerator};
pub use types::{AiError, ModelRole, ModelTurn};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// The language-model collaborator. The reply generator only depends on
/// this seam, so tests can swap in a stub that captures its input.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, turns: &[ModelTurn]) -> Result<String, AiError>;
}

/// Mock model client for tests — returns pre-configured responses from a
/// queue and records every request it receives for auditing.
#[derive(Clone, Default)]
pub struct MockModelClient {
    responses: Arc<Mutex<VecDeque<Result<String, AiError>>>>,
    requests: Arc<Mutex<Vec<Vec<ModelTurn>>>>,
}

impl MockModelClient {
    pub fn new(responses: Vec<Result<String, AiError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every prompt sequence submitted so far, in call order.
    pub fn captured_requests(&self) -> Vec<Vec<ModelTurn>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(&self, turns: &[ModelTurn]) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(turns.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("(mock exhausted)".to_string()))
    }
}
