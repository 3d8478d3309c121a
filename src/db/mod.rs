use crate::error::StoreError;
use crate::models::{
    AnswerId, NewQuestion, NewTheme, Question, QuestionId, Theme, ThemeId, ThemeProgress,
};
use crate::supplier::{AnswerRecorder, QuestionSupplier};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub mod answer;
pub mod question;
pub mod theme;

mod embedded {
    refinery::embed_migrations!("migrations");
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub(crate) fn run_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let report = embedded::migrations::runner().run(conn)?;
    for migration in report.applied_migrations() {
        log::info!("Applied migration {}", migration);
    }
    Ok(())
}

fn configure(mut conn: Connection) -> Result<Connection, StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

/// The application's single long-lived handle on the quiz database.
///
/// One connection is opened at startup and shared behind a mutex; sessions and
/// the answer worker receive the store instead of opening their own handles.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = configure(Connection::open(path)?)?;
        log::info!("Opened quiz database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = configure(Connection::open_in_memory()?)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }

    pub fn create_theme(&self, draft: &NewTheme) -> Result<ThemeId, StoreError> {
        self.with_conn(|conn| theme::create_theme(conn, draft))
    }

    pub fn get_theme(&self, id: ThemeId) -> Result<Option<Theme>, StoreError> {
        self.with_conn(|conn| theme::get_theme(conn, id))
    }

    pub fn find_theme_by_name(&self, name: &str) -> Result<Option<Theme>, StoreError> {
        self.with_conn(|conn| theme::find_theme_by_name(conn, name))
    }

    pub fn list_themes(&self) -> Result<Vec<Theme>, StoreError> {
        self.with_conn(|conn| theme::list_themes(conn))
    }

    pub fn update_theme(&self, id: ThemeId, draft: &NewTheme) -> Result<(), StoreError> {
        self.with_conn(|conn| theme::update_theme(conn, id, draft))
    }

    pub fn delete_theme(&self, id: ThemeId) -> Result<(), StoreError> {
        self.with_conn(|conn| theme::delete_theme(conn, id))
    }

    pub fn create_question(
        &self,
        theme_id: ThemeId,
        draft: &NewQuestion,
    ) -> Result<QuestionId, StoreError> {
        self.with_conn(|conn| question::create_question(conn, theme_id, draft))
    }

    pub fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StoreError> {
        self.with_conn(|conn| question::get_question(conn, id))
    }

    pub fn list_questions(&self, theme_id: ThemeId) -> Result<Vec<Question>, StoreError> {
        self.with_conn(|conn| question::list_questions(conn, theme_id))
    }

    pub fn count_questions(&self, theme_id: ThemeId) -> Result<usize, StoreError> {
        self.with_conn(|conn| question::count_questions(conn, theme_id))
    }

    pub fn update_question(&self, id: QuestionId, draft: &NewQuestion) -> Result<(), StoreError> {
        self.with_conn(|conn| question::update_question(conn, id, draft))
    }

    pub fn delete_question(&self, id: QuestionId) -> Result<(), StoreError> {
        self.with_conn(|conn| question::delete_question(conn, id))
    }

    pub fn theme_progress(&self, theme_id: ThemeId) -> Result<ThemeProgress, StoreError> {
        self.with_conn(|conn| answer::theme_progress(conn, theme_id))
    }

    pub fn answer_count(&self, question_id: QuestionId) -> Result<usize, StoreError> {
        self.with_conn(|conn| answer::answer_count(conn, question_id))
    }
}

impl QuestionSupplier for Store {
    fn fetch_questions(&self, theme_id: ThemeId, limit: usize) -> Result<Vec<Question>, StoreError> {
        self.with_conn(|conn| question::fetch_questions(conn, theme_id, limit))
    }
}

impl AnswerRecorder for Store {
    fn record_answer(&self, question_id: QuestionId, was_correct: bool) -> Result<AnswerId, StoreError> {
        self.with_conn(|conn| answer::record_answer(conn, question_id, was_correct))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_conn() -> Connection {
        configure(Connection::open_in_memory().unwrap()).unwrap()
    }

    pub(crate) fn theme_draft(name: &str) -> NewTheme {
        NewTheme::new(name, format!("Questions about {}", name.trim()))
    }

    pub(crate) fn draft(prompt: &str, alternatives: &[&str], correct_index: usize) -> NewQuestion {
        NewQuestion {
            prompt: prompt.to_string(),
            alternatives: alternatives.iter().map(|a| a.to_string()).collect(),
            correct_index,
        }
    }

    #[test]
    fn test_migrations_create_tables() {
        let conn = test_conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in ["themes", "questions", "alternatives", "answers"] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("quiz.db");

        let store = Store::open(&db_path).unwrap();
        store.create_theme(&theme_draft("Geography")).unwrap();
        drop(store);

        assert!(db_path.exists());

        // Reopening runs migrations again without touching existing rows.
        let store = Store::open(&db_path).unwrap();
        assert_eq!(store.list_themes().unwrap().len(), 1);
    }

    #[test]
    fn test_store_supplies_and_records() {
        let store = Store::open_in_memory().unwrap();
        let theme_id = store.create_theme(&theme_draft("Math")).unwrap();
        let q1 = store
            .create_question(theme_id, &draft("1+1?", &["1", "2", "3"], 2))
            .unwrap();
        store
            .create_question(theme_id, &draft("2+2?", &["4", "5"], 1))
            .unwrap();

        let supplied = store.fetch_questions(theme_id, 5).unwrap();
        assert_eq!(supplied.len(), 2);
        assert!(supplied.iter().any(|q| q.id() == q1));
        assert_eq!(store.count_questions(theme_id).unwrap(), 2);

        let limited = store.fetch_questions(theme_id, 1).unwrap();
        assert_eq!(limited.len(), 1);

        let answer_id = store.record_answer(q1, true).unwrap();
        assert_eq!(answer_id, 1);
        assert_eq!(store.answer_count(q1).unwrap(), 1);
    }
}
