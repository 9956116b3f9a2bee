use crate::models::MessageRole;

/// Error from the language-model collaborator. Carried unchanged to the
/// adapter boundary, where it is converted into a user-visible fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiError {
    pub message: String,
}

impl AiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AiError {}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::new(format!("Request failed: {}", err))
    }
}

/// Role on the model wire. The provider only distinguishes the end user
/// from the model itself; stored assistant and system turns both map to
/// the model side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    User,
    Model,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::User => "user",
            ModelRole::Model => "model",
        }
    }

    pub fn from_message_role(role: MessageRole) -> Self {
        match role {
            MessageRole::User => ModelRole::User,
            MessageRole::Assistant | MessageRole::System => ModelRole::Model,
        }
    }
}

/// One turn of the prompt sequence handed to the model collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTurn {
    pub role: ModelRole,
    pub text: String,
}

impl ModelTurn {
    pub fn new(role: ModelRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}
