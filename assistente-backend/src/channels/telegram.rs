//! Telegram channel adapter: long-poll listener, command handling, and the
//! persist → generate → persist chat turn.

use std::sync::Arc;

use rusqlite::Result as SqliteResult;
use teloxide::prelude::*;
use teloxide::requests::Requester;
use tokio::sync::oneshot;

use crate::ai::reply::{ReplyError, ReplyGenerator};
use crate::channels::util;
use crate::db::Database;
use crate::models::{Conversation, DomainMode, MessageRole};

/// Chunk size for outbound messages, below Telegram's 4096 hard limit.
const TELEGRAM_CHUNK_LIMIT: usize = 3800;

/// Shared placeholder identity all telegram conversations hang on.
const TELEGRAM_USERNAME: &str = "telegram_default";
const TELEGRAM_USER_NAME: &str = "Telegram User";
const TELEGRAM_USER_EMAIL: &str = "telegram_default@example.com";

/// Generic apology for any handler failure; the listener itself never dies
/// on a handler error.
const ERROR_REPLY: &str = "Ops! Tive um problema ao processar sua mensagem 😔";

#[derive(Debug, Clone, PartialEq, Eq)]
enum BotCommand {
    Start,
    End,
    Status,
    Help,
    SetMode(Option<String>),
}

/// Parse a leading-slash command. Commands accept an optional `@BotName`
/// suffix on the first token. Unknown commands map to `None` and are
/// ignored by the caller.
fn parse_command(text: &str) -> Option<BotCommand> {
    let rest = text.trim().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    let arg = parts.next().map(|s| s.to_lowercase());

    match name.as_str() {
        "start" => Some(BotCommand::Start),
        "end" => Some(BotCommand::End),
        "status" => Some(BotCommand::Status),
        "help" => Some(BotCommand::Help),
        "mode" => Some(BotCommand::SetMode(arg)),
        // Shortcut commands: /mikrotik, /generic
        "mikrotik" | "generic" => Some(BotCommand::SetMode(Some(name))),
        _ => None,
    }
}

/// Check if the bot is @mentioned in the message text (case-insensitive)
fn is_bot_mentioned(text: &str, bot_username: &str) -> bool {
    text.to_lowercase()
        .contains(&format!("@{}", bot_username.to_lowercase()))
}

/// Whether a plain text message becomes a chat turn: group messages need an
/// explicit mention, and the conversation must have been activated.
fn should_process(conversation: &Conversation, is_group: bool, text: &str, bot_username: &str) -> bool {
    if is_group && !is_bot_mentioned(text, bot_username) {
        return false;
    }
    conversation.is_active
}

/// Get-or-create the conversation for a chat, under the shared placeholder
/// identity. Idempotent per chat id.
fn ensure_conversation(db: &Database, chat_id: i64) -> SqliteResult<Conversation> {
    let user = db.upsert_user_by_username(TELEGRAM_USERNAME, TELEGRAM_USER_NAME, TELEGRAM_USER_EMAIL)?;
    db.upsert_telegram_conversation(&user.id, &chat_id.to_string())
}

/// Execute a command and return the confirmation text to send back.
fn handle_command(db: &Database, chat_id: i64, command: BotCommand) -> SqliteResult<String> {
    match command {
        BotCommand::Start => {
            let conversation = ensure_conversation(db, chat_id)?;
            db.set_conversation_active(&conversation.id, true)?;
            Ok("✅ Assistente ativado! Vou responder suas mensagens aqui.\nEnvie /end para pausar quando quiser.".to_string())
        }
        BotCommand::End => {
            let conversation = ensure_conversation(db, chat_id)?;
            db.set_conversation_active(&conversation.id, false)?;
            Ok("⏸️ Assistente pausado. Envie /start para reativar.".to_string())
        }
        BotCommand::Status => {
            let conversation = ensure_conversation(db, chat_id)?;
            Ok(if conversation.is_active {
                "🟢 Assistente está ativo.".to_string()
            } else {
                "🔴 Assistente está pausado.".to_string()
            })
        }
        BotCommand::Help => Ok("Comandos:\n\
            • /start – ativar o assistente\n\
            • /end – pausar o assistente\n\
            • /status – ver estado\n\
            • /mode generic | mikrotik – trocar modo\n\
            • /mikrotik – atalho para modo MikroTik\n\
            • /generic – atalho para modo genérico"
            .to_string()),
        BotCommand::SetMode(arg) => match arg.as_deref().and_then(DomainMode::from_str) {
            Some(mode) => {
                let conversation = ensure_conversation(db, chat_id)?;
                db.set_conversation_mode(&conversation.id, mode)?;
                Ok(format!("Modo atualizado para: {}", mode))
            }
            // Missing or unknown mode: usage hint, no mutation
            None => Ok("Use: /mode generic | /mode mikrotik".to_string()),
        },
    }
}

/// One chat turn: persist the inbound message, generate, persist the
/// outbound message, and return the reply chunked for the transport. The
/// inbound message is durable before generation, so a generation failure
/// never loses the user's input.
async fn process_chat_message(
    db: &Database,
    generator: &ReplyGenerator,
    conversation: &Conversation,
    text: &str,
) -> Result<Vec<String>, ReplyError> {
    db.create_message(&conversation.id, MessageRole::User, text)?;
    let reply = generator.generate_reply(&conversation.id, text).await?;
    db.create_message(&conversation.id, MessageRole::Assistant, &reply)?;
    Ok(util::split_message(&reply, TELEGRAM_CHUNK_LIMIT))
}

/// Start the Telegram long-poll listener. Returns when the shutdown signal
/// fires or the dispatcher stops.
pub async fn start_telegram_listener(
    bot_token: String,
    db: Arc<Database>,
    generator: Arc<ReplyGenerator>,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), String> {
    log::info!("Starting Telegram listener");

    let bot = Bot::new(&bot_token);

    // Validate token and get bot info for mention detection
    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => {
            let error = format!("Invalid Telegram bot token: {}", e);
            log::error!("Telegram: {}", error);
            return Err(error);
        }
    };
    let bot_username = me.username().to_string();
    log::info!("Telegram: bot validated - username: @{}", bot_username);

    let bot_username_for_handler = bot_username.clone();

    let handler = Update::filter_message().endpoint(
        move |bot: Bot, msg: teloxide::types::Message, db: Arc<Database>, generator: Arc<ReplyGenerator>| {
            let bot_username = bot_username_for_handler.clone();
            async move {
                // Only handle text messages
                if let Some(text) = msg.text() {
                    let chat_id = msg.chat.id;

                    if text.trim_start().starts_with('/') {
                        if let Some(command) = parse_command(text) {
                            match handle_command(&db, chat_id.0, command) {
                                Ok(response) => {
                                    if let Err(e) = bot.send_message(chat_id, &response).await {
                                        log::error!("Telegram: failed to send command response: {}", e);
                                    }
                                }
                                Err(e) => {
                                    log::error!("Telegram: command failed for chat {}: {}", chat_id, e);
                                    let _ = bot.send_message(chat_id, ERROR_REPLY).await;
                                }
                            }
                        }
                        // Unknown commands are ignored
                        return Ok(());
                    }

                    let conversation = match ensure_conversation(&db, chat_id.0) {
                        Ok(conversation) => conversation,
                        Err(e) => {
                            log::error!("Telegram: failed to resolve conversation for chat {}: {}", chat_id, e);
                            let _ = bot.send_message(chat_id, ERROR_REPLY).await;
                            return Ok(());
                        }
                    };

                    let is_group = msg.chat.is_group() || msg.chat.is_supergroup();
                    if !should_process(&conversation, is_group, text, &bot_username) {
                        return Ok(());
                    }

                    match process_chat_message(&db, &generator, &conversation, text).await {
                        Ok(chunks) => {
                            for chunk in chunks {
                                if let Err(e) = bot.send_message(chat_id, &chunk).await {
                                    log::error!("Telegram: failed to send message: {}", e);
                                }
                            }
                        }
                        Err(e) => {
                            log::error!("Telegram: failed to process message for chat {}: {}", chat_id, e);
                            let _ = bot.send_message(chat_id, ERROR_REPLY).await;
                        }
                    }
                }

                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            }
        },
    );

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db, generator])
        .enable_ctrlc_handler()
        .build();

    tokio::select! {
        _ = shutdown_rx => {
            log::info!("Telegram listener received shutdown signal");
        }
        _ = dispatcher.dispatch() => {
            log::info!("Telegram listener stopped");
        }
    }

    Ok(())
}
