pub mod answer_worker;
pub mod config;
pub mod csv;
pub mod db;
pub mod error;
pub mod export;
pub mod logger;
pub mod models;
pub mod session;
pub mod supplier;
pub mod timer;


// Re-exports for convenience
pub use answer_worker::{
    spawn_answer_worker, AnswerEvent, AnswerSink, DiscardAnswers, RecordReport, RecorderHandle,
};
pub use config::Config;
pub use db::Store;
pub use error::{ConfigError, QuizError, StoreError};
pub use models::{
    Alternative, AnswerOutcome, Choice, Difficulty, NewQuestion, NewTheme, Question, ScoreBand,
    SessionConfig, Summary, Theme, ThemeProgress,
};
pub use session::{Phase, QuizSession, Snapshot, Step};
pub use supplier::{AnswerRecorder, QuestionSupplier};
pub use timer::{QuestionTimer, SharedQuizSession, TimerEvent};
