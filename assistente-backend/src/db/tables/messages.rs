//! Message database operations

use chrono::{DateTime, Utc};
use rusqlite::{Result as SqliteResult, Row};

use crate::models::{Message, MessageRole};

use super::super::Database;

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let role_str: String = row.get(2)?;
    let role = MessageRole::from_str(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("invalid message role: {}", role_str).into(),
        )
    })?;

    let created_at_str: String = row.get(4)?;

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role,
        content: row.get(3)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .unwrap()
            .with_timezone(&Utc),
    })
}

impl Database {
    /// Append a message to a conversation. Messages are never updated or
    /// deleted after this point.
    pub fn create_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> SqliteResult<Message> {
        let conn = self.conn.lock().unwrap();
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![conversation_id, role.as_str(), content, &created_at.to_rfc3339()],
        )?;

        let id = conn.last_insert_rowid();

        Ok(Message {
            id,
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at,
        })
    }

    /// The `limit` most recent messages, most recent first. Ordered by id so
    /// same-timestamp turns keep their insertion order; callers building a
    /// prompt reverse this into chronological order.
    pub fn recent_messages(&self, conversation_id: &str, limit: usize) -> SqliteResult<Vec<Message>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, created_at FROM messages
             WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;

        let messages = stmt
            .query_map(rusqlite::params![conversation_id, limit as i64], row_to_message)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::Database;
    use crate::models::{DomainMode, MessageRole};

    fn conversation(db: &Database) -> String {
        let user = db
            .upsert_user_by_username("web_default", "Web User", "web_default@example.com")
            .expect("user");
        db.create_conversation(&user.id, "Web chat", DomainMode::Generic)
            .expect("conversation")
            .id
    }

    #[test]
    fn recent_messages_are_most_recent_first() {
        let db = Database::new(":memory:").expect("in-memory db");
        let conv = conversation(&db);

        for i in 0..4 {
            db.create_message(&conv, MessageRole::User, &format!("m{}", i))
                .expect("create message");
        }

        let recent = db.recent_messages(&conv, 3).expect("recent");
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m2", "m1"]);
    }

    #[test]
    fn reversal_restores_chronological_order() {
        let db = Database::new(":memory:").expect("in-memory db");
        let conv = conversation(&db);

        db.create_message(&conv, MessageRole::User, "oi").expect("u");
        db.create_message(&conv, MessageRole::Assistant, "olá").expect("a");

        let mut history = db.recent_messages(&conv, 6).expect("recent");
        history.reverse();

        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[test]
    fn messages_are_scoped_to_their_conversation() {
        let db = Database::new(":memory:").expect("in-memory db");
        let a = conversation(&db);
        let b = conversation(&db);

        db.create_message(&a, MessageRole::User, "for a").expect("a");
        db.create_message(&b, MessageRole::User, "for b").expect("b");

        let recent = db.recent_messages(&a, 10).expect("recent");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "for a");
    }
}
