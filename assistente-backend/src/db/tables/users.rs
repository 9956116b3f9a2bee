//! User database operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult};
use uuid::Uuid;

use crate::models::User;

use super::super::Database;

impl Database {
    /// Create a user. Uniqueness of username/email is enforced by the
    /// schema; a violation propagates to the caller, it is not swallowed.
    pub fn create_user(&self, name: &str, username: &str, email: &str) -> SqliteResult<User> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO users (id, name, username, email, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![&id, name, username, email, &created_at.to_rfc3339()],
        )?;

        Ok(User {
            id,
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            created_at,
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, name, username, email, created_at FROM users WHERE username = ?1",
        )?;

        stmt.query_row([username], |row| {
            let created_at_str: String = row.get(4)?;

            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                username: row.get(2)?,
                email: row.get(3)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .unwrap()
                    .with_timezone(&Utc),
            })
        })
        .optional()
    }

    /// Create-if-absent by username. Used for the shared placeholder
    /// identities the web and telegram channels hang conversations on.
    pub fn upsert_user_by_username(
        &self,
        username: &str,
        name: &str,
        email: &str,
    ) -> SqliteResult<User> {
        if let Some(user) = self.get_user_by_username(username)? {
            return Ok(user);
        }
        self.create_user(name, username, email)
    }

    pub fn list_users(&self) -> SqliteResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, name, username, email, created_at FROM users ORDER BY created_at DESC",
        )?;

        let users = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(4)?;

                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                    email: row.get(3)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at_str)
                        .unwrap()
                        .with_timezone(&Utc),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(users)
    }
}
