use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS reading_tasks (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS speaking_tasks (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            topic_theme TEXT NOT NULL
        );
        ",
    )?;

    info!(target: "lingoleap_backend", "Database migrations complete");
    Ok(())
}
