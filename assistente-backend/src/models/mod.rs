pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{ChannelKind, Conversation, DomainMode};
pub use message::{Message, MessageRole};
pub use user::User;
