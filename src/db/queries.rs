use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};

use super::Database;
use crate::domain::{ReadingTask, SpeakingTask, User};

impl Database {
    // -- Users --

    /// Insert a new user. Returns `None` when the username is already taken.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
            let id = conn.last_insert_rowid();
            query_user(conn, "id = ?1", id)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    // -- Reading topics --

    pub fn list_reading_tasks(&self) -> Result<Vec<ReadingTask>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, title FROM reading_tasks ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok(ReadingTask { id: row.get(0)?, title: row.get(1)? }))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_reading_task(&self, id: i64) -> Result<Option<ReadingTask>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row("SELECT id, title FROM reading_tasks WHERE id = ?1", [id], |row| {
                    Ok(ReadingTask { id: row.get(0)?, title: row.get(1)? })
                })
                .optional()?;
            Ok(task)
        })
    }

    pub fn insert_reading_task(&self, title: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO reading_tasks (title) VALUES (?1)", [title])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn count_reading_tasks(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM reading_tasks", [], |row| row.get(0))?))
    }

    // -- Speaking topics --

    pub fn list_speaking_tasks(&self) -> Result<Vec<SpeakingTask>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, topic_theme FROM speaking_tasks ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok(SpeakingTask { id: row.get(0)?, topic_theme: row.get(1)? }))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_speaking_task(&self, id: i64) -> Result<Option<SpeakingTask>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row(
                    "SELECT id, topic_theme FROM speaking_tasks WHERE id = ?1",
                    [id],
                    |row| Ok(SpeakingTask { id: row.get(0)?, topic_theme: row.get(1)? }),
                )
                .optional()?;
            Ok(task)
        })
    }

    pub fn insert_speaking_task(&self, topic_theme: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO speaking_tasks (topic_theme) VALUES (?1)", [topic_theme])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn count_speaking_tasks(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM speaking_tasks", [], |row| row.get(0))?))
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, predicate: &str, param: P) -> Result<Option<User>> {
    let sql = format!("SELECT id, username, email, password FROM users WHERE {predicate}");
    let user = conn.query_row(&sql, [param], user_from_row).optional()?;
    Ok(user)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
    })
}
