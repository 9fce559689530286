//! SQLite-backed credential and topic store.
//!
//! One connection behind a mutex; every query is short and the tables are
//! tiny, so handlers call straight into it.

pub mod migrations;
pub mod queries;

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::config::ContentConfig;
use crate::seeds::{seed_reading_titles, seed_speaking_themes};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!(target: "lingoleap_backend", "Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Fill empty topic tables from the content file's bank, falling back to
    /// the built-in seeds. Tables that already hold rows are left untouched.
    pub fn seed_topics(&self, content: Option<&ContentConfig>) -> Result<()> {
        if self.count_reading_tasks()? == 0 {
            let titles: Vec<String> = match content {
                Some(c) if !c.reading_tasks.is_empty() => {
                    c.reading_tasks.iter().map(|t| t.title.clone()).collect()
                }
                _ => seed_reading_titles().into_iter().map(String::from).collect(),
            };
            for title in &titles {
                self.insert_reading_task(title)?;
            }
            info!(target: "lingoleap_backend", count = titles.len(), "Seeded reading topics");
        }

        if self.count_speaking_tasks()? == 0 {
            let themes: Vec<String> = match content {
                Some(c) if !c.speaking_tasks.is_empty() => {
                    c.speaking_tasks.iter().map(|t| t.topic_theme.clone()).collect()
                }
                _ => seed_speaking_themes().into_iter().map(String::from).collect(),
            };
            for theme in &themes {
                self.insert_speaking_task(theme)?;
            }
            info!(target: "lingoleap_backend", count = themes.len(), "Seeded speaking topics");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReadingTaskCfg, SpeakingTaskCfg};

    #[test]
    fn seeds_from_builtin_bank_when_no_content_file() {
        let db = Database::open_in_memory().unwrap();
        db.seed_topics(None).unwrap();

        let reading = db.list_reading_tasks().unwrap();
        let speaking = db.list_speaking_tasks().unwrap();
        assert_eq!(reading.len(), seed_reading_titles().len());
        assert_eq!(speaking.len(), seed_speaking_themes().len());
        assert_eq!(reading[0].title, seed_reading_titles()[0]);
    }

    #[test]
    fn seeds_from_content_bank_and_only_once() {
        let content = ContentConfig {
            reading_tasks: vec![ReadingTaskCfg { title: "Volcanoes".into() }],
            speaking_tasks: vec![SpeakingTaskCfg { topic_theme: "Hobbies".into() }],
            ..Default::default()
        };
        let db = Database::open_in_memory().unwrap();
        db.seed_topics(Some(&content)).unwrap();
        db.seed_topics(Some(&content)).unwrap();

        let reading = db.list_reading_tasks().unwrap();
        assert_eq!(reading.len(), 1);
        assert_eq!(reading[0].title, "Volcanoes");
        let speaking = db.list_speaking_tasks().unwrap();
        assert_eq!(speaking.len(), 1);
        assert_eq!(speaking[0].topic_theme, "Hobbies");
    }
}
