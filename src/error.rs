use crate::models::{QuestionId, ThemeId};
use crate::session::{Action, Phase};
use thiserror::Error;

/// Failures raised by the SQLite store and the authoring helpers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error("invalid theme: {0}")]
    InvalidTheme(String),

    #[error("theme name cannot be empty")]
    EmptyThemeName,

    #[error("theme \"{0}\" already exists")]
    DuplicateTheme(String),

    #[error("theme {0} does not exist")]
    ThemeNotFound(ThemeId),

    #[error("question {0} does not exist")]
    QuestionNotFound(QuestionId),

    #[error("store connection lock poisoned")]
    Poisoned,
}

/// Failures raised by quiz session transitions.
///
/// Every variant except `NoQuestionsAvailable` and `Store` leaves the session
/// exactly as it was before the rejected call.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("no questions available for theme {theme_id}")]
    NoQuestionsAvailable { theme_id: ThemeId },

    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition { action: Action, phase: Phase },

    #[error("alternative {index} is out of range for a question with {len} alternatives")]
    OutOfRangeAnswer { index: usize, len: usize },

    #[error("failed to load questions: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty {0:?}, expected easy, medium or hard")]
pub struct ParseDifficultyError(pub String);
