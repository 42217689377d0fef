//! Exchange history storage and retrieval using SQLite.
//!
//! Every completed question/answer cycle is persisted with its timestamps
//! and the paths of the recorded question and spoken answer. Text is kept
//! forever; audio files are retained only for the most recent exchanges so
//! the data directory stays small.

use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::OptionalExtension;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of exchanges whose audio files are kept on disk.
const AUDIO_RETAIN: usize = 10;

/// A single question/answer exchange in the history.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Unique identifier for this exchange
    pub id: i64,
    /// What the server heard in the question
    pub transcript: String,
    /// The assistant's answer text
    pub answer: String,
    /// Path to the recorded question WAV, if still retained
    pub question_audio: Option<PathBuf>,
    /// Path to the spoken answer WAV, if still retained
    pub answer_audio: Option<PathBuf>,
    /// When this exchange was created
    pub created_at: DateTime<Local>,
}

/// Manages the exchange history database.
pub struct ExchangeStore {
    /// Path to the SQLite database file
    database_path: PathBuf,
    /// Connection to the database (lazy-loaded)
    connection: Option<Connection>,
}

impl ExchangeStore {
    /// Creates a new exchange store for the given data directory.
    ///
    /// # Errors
    /// - If the data directory cannot be created
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let database_path = data_dir.join("exchange_history.db");

        Ok(Self {
            database_path,
            connection: None,
        })
    }

    /// Initializes database connection and creates tables if necessary.
    ///
    /// # Errors
    /// - If the database file cannot be opened
    /// - If table creation fails
    fn get_connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection = Connection::open(&self.database_path)?;

            connection.execute(
                "CREATE TABLE IF NOT EXISTS exchanges (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    transcript TEXT NOT NULL,
                    answer TEXT NOT NULL,
                    question_audio TEXT,
                    answer_audio TEXT,
                    created_at TEXT NOT NULL
                )",
                [],
            )?;

            self.connection = Some(connection);
        }

        Ok(self.connection.as_ref().unwrap())
    }

    /// Saves a completed exchange and prunes audio beyond the retention window.
    ///
    /// Returns the id of the new row.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If insertion fails
    pub fn save_exchange(
        &mut self,
        transcript: &str,
        answer: &str,
        question_audio: Option<&Path>,
        answer_audio: Option<&Path>,
    ) -> Result<i64> {
        let id = {
            let connection = self.get_connection()?;
            let timestamp = Local::now().to_rfc3339();

            connection.execute(
                "INSERT INTO exchanges (transcript, answer, question_audio, answer_audio, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    transcript,
                    answer,
                    question_audio.map(|p| p.to_string_lossy().to_string()),
                    answer_audio.map(|p| p.to_string_lossy().to_string()),
                    timestamp
                ],
            )?;
            connection.last_insert_rowid()
        };

        self.prune_old_audio()?;

        tracing::debug!("Exchange saved to history with id {id}");
        Ok(id)
    }

    /// Retrieves all exchanges ordered by most recent first.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If query execution fails
    pub fn get_all_exchanges(&mut self) -> Result<Vec<Exchange>> {
        let connection = self.get_connection()?;

        let mut statement = connection.prepare(
            "SELECT id, transcript, answer, question_audio, answer_audio, created_at
             FROM exchanges ORDER BY created_at DESC, id DESC",
        )?;

        let entries = statement
            .query_map([], row_to_exchange)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Retrieves one exchange by recency: 1 is the most recent, 2 the one
    /// before it, and so on.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If query execution fails
    pub fn get_exchange_by_recency(&mut self, index: usize) -> Result<Option<Exchange>> {
        if index == 0 {
            return Ok(None);
        }

        let connection = self.get_connection()?;

        let mut statement = connection.prepare(
            "SELECT id, transcript, answer, question_audio, answer_audio, created_at
             FROM exchanges ORDER BY created_at DESC, id DESC LIMIT 1 OFFSET ?1",
        )?;

        let entry = statement
            .query_row(params![(index - 1) as i64], row_to_exchange)
            .optional()?;

        Ok(entry)
    }

    /// Number of stored exchanges.
    ///
    /// # Errors
    /// - If database connection fails
    pub fn count(&mut self) -> Result<usize> {
        let connection = self.get_connection()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM exchanges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Deletes audio files of exchanges beyond the retention window and
    /// clears their path columns. Text stays untouched.
    fn prune_old_audio(&mut self) -> Result<()> {
        let connection = self.get_connection()?;

        let mut statement = connection.prepare(
            "SELECT id, question_audio, answer_audio FROM exchanges
             WHERE question_audio IS NOT NULL OR answer_audio IS NOT NULL
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows: Vec<(i64, Option<String>, Option<String>)> = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(statement);

        for (id, question, answer) in rows.into_iter().skip(AUDIO_RETAIN) {
            for path in [question, answer].into_iter().flatten() {
                let path = PathBuf::from(path);
                if path.exists() {
                    if let Err(e) = fs::remove_file(&path) {
                        tracing::warn!("Failed to delete old audio {}: {}", path.display(), e);
                    } else {
                        tracing::info!("Deleted old audio: {}", path.display());
                    }
                }
            }

            connection.execute(
                "UPDATE exchanges SET question_audio = NULL, answer_audio = NULL WHERE id = ?1",
                params![id],
            )?;
        }

        Ok(())
    }
}

/// Maps a database row to an Exchange.
fn row_to_exchange(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exchange> {
    let timestamp_str = row.get::<_, String>(5)?;
    let created_at = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|_| {
            rusqlite::Error::InvalidParameterName("Invalid timestamp format".to_string())
        })?;

    Ok(Exchange {
        id: row.get(0)?,
        transcript: row.get(1)?,
        answer: row.get(2)?,
        question_audio: row.get::<_, Option<String>>(3)?.map(PathBuf::from),
        answer_audio: row.get::<_, Option<String>>(4)?.map(PathBuf::from),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ExchangeStore::new(dir.path()).unwrap();

        let question = dir.path().join("q1.wav");
        fs::write(&question, b"fake wav").unwrap();

        store
            .save_exchange("what time is it", "it is noon", Some(&question), None)
            .unwrap();

        let all = store.get_all_exchanges().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].transcript, "what time is it");
        assert_eq!(all[0].answer, "it is noon");
        assert_eq!(all[0].question_audio.as_deref(), Some(question.as_path()));
        assert_eq!(all[0].answer_audio, None);
    }

    #[test]
    fn test_recency_index_is_one_based_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ExchangeStore::new(dir.path()).unwrap();

        store.save_exchange("first", "a", None, None).unwrap();
        store.save_exchange("second", "b", None, None).unwrap();
        store.save_exchange("third", "c", None, None).unwrap();

        let newest = store.get_exchange_by_recency(1).unwrap().unwrap();
        assert_eq!(newest.transcript, "third");

        let oldest = store.get_exchange_by_recency(3).unwrap().unwrap();
        assert_eq!(oldest.transcript, "first");

        assert!(store.get_exchange_by_recency(4).unwrap().is_none());
        assert!(store.get_exchange_by_recency(0).unwrap().is_none());
    }

    #[test]
    fn test_audio_pruned_beyond_retention_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ExchangeStore::new(dir.path()).unwrap();

        let mut audio_paths = Vec::new();
        for i in 0..AUDIO_RETAIN + 2 {
            let path = dir.path().join(format!("q{i}.wav"));
            fs::write(&path, b"fake wav").unwrap();
            store
                .save_exchange(&format!("question {i}"), "answer", Some(&path), None)
                .unwrap();
            audio_paths.push(path);
        }

        // The two oldest audio files are gone, their rows survive text-only
        assert!(!audio_paths[0].exists());
        assert!(!audio_paths[1].exists());
        assert!(audio_paths[2].exists());

        let all = store.get_all_exchanges().unwrap();
        assert_eq!(all.len(), AUDIO_RETAIN + 2);
        let oldest = all.last().unwrap();
        assert_eq!(oldest.transcript, "question 0");
        assert_eq!(oldest.question_audio, None);
    }

    #[test]
    fn test_database_file_lands_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ExchangeStore::new(dir.path()).unwrap();
        store.save_exchange("q", "a", None, None).unwrap();

        assert!(dir.path().join("exchange_history.db").exists());
    }

    #[test]
    fn test_count_tracks_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ExchangeStore::new(dir.path()).unwrap();

        assert_eq!(store.count().unwrap(), 0);
        store.save_exchange("q", "a", None, None).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
