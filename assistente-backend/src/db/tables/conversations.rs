//! Conversation database operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};
use uuid::Uuid;

use crate::models::{ChannelKind, Conversation, DomainMode};

use super::super::Database;

fn row_to_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    let channel_str: String = row.get(2)?;
    let channel = ChannelKind::from_str(&channel_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("invalid channel: {}", channel_str).into(),
        )
    })?;

    let mode_str: String = row.get(6)?;
    let domain_mode = DomainMode::from_str(&mode_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("invalid domain mode: {}", mode_str).into(),
        )
    })?;

    let created_at_str: String = row.get(7)?;

    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        channel,
        external_chat_id: row.get(3)?,
        title: row.get(4)?,
        is_active: row.get::<_, i32>(5)? != 0,
        domain_mode,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .unwrap()
            .with_timezone(&Utc),
    })
}

const CONVERSATION_COLUMNS: &str =
    "id, user_id, channel, external_chat_id, title, is_active, domain_mode, created_at";

impl Database {
    /// Create a web conversation. Always a fresh row; web conversations are
    /// never upserted. Created active since the active flag only gates
    /// inbound bot messages.
    pub fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
        domain_mode: DomainMode,
    ) -> SqliteResult<Conversation> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO conversations (id, user_id, channel, external_chat_id, title, is_active, domain_mode, created_at)
             VALUES (?1, ?2, 'web', NULL, ?3, 1, ?4, ?5)",
            rusqlite::params![&id, user_id, title, domain_mode.as_str(), &created_at.to_rfc3339()],
        )?;

        Ok(Conversation {
            id,
            user_id: user_id.to_string(),
            channel: ChannelKind::Web,
            external_chat_id: None,
            title: title.to_string(),
            is_active: true,
            domain_mode,
            created_at,
        })
    }

    /// Get-or-create the telegram conversation for a chat id. Idempotent:
    /// both calls return the same row, never a duplicate. New conversations
    /// start inactive until the user sends the activation command.
    pub fn upsert_telegram_conversation(
        &self,
        user_id: &str,
        external_chat_id: &str,
    ) -> SqliteResult<Conversation> {
        if let Some(conv) = self.get_telegram_conversation(external_chat_id)? {
            return Ok(conv);
        }

        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let title = format!("Chat {}", external_chat_id);

        conn.execute(
            "INSERT INTO conversations (id, user_id, channel, external_chat_id, title, is_active, domain_mode, created_at)
             VALUES (?1, ?2, 'telegram', ?3, ?4, 0, 'generic', ?5)",
            rusqlite::params![&id, user_id, external_chat_id, &title, &created_at.to_rfc3339()],
        )?;

        Ok(Conversation {
            id,
            user_id: user_id.to_string(),
            channel: ChannelKind::Telegram,
            external_chat_id: Some(external_chat_id.to_string()),
            title,
            is_active: false,
            domain_mode: DomainMode::Generic,
            created_at,
        })
    }

    pub fn get_conversation(&self, id: &str) -> SqliteResult<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM conversations WHERE id = ?1",
            CONVERSATION_COLUMNS
        ))?;

        // optional() keeps invalid stored values as errors instead of None
        stmt.query_row([id], row_to_conversation).optional()
    }

    pub fn get_telegram_conversation(
        &self,
        external_chat_id: &str,
    ) -> SqliteResult<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM conversations WHERE channel = 'telegram' AND external_chat_id = ?1",
            CONVERSATION_COLUMNS
        ))?;

        stmt.query_row([external_chat_id], row_to_conversation)
            .optional()
    }

    pub fn set_conversation_active(&self, id: &str, active: bool) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE conversations SET is_active = ?1 WHERE id = ?2",
            rusqlite::params![if active { 1 } else { 0 }, id],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn set_conversation_mode(&self, id: &str, domain_mode: DomainMode) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE conversations SET domain_mode = ?1 WHERE id = ?2",
            rusqlite::params![domain_mode.as_str(), id],
        )?;
        Ok(rows_affected > 0)
    }
}
