use crate::error::StoreError;
use crate::models::{AnswerId, Question, QuestionId, ThemeId};

/// Source of questions for a quiz session.
///
/// Implementations return at most `limit` questions in whatever order is
/// convenient for them; sessions shuffle on their own.
pub trait QuestionSupplier {
    fn fetch_questions(&self, theme_id: ThemeId, limit: usize) -> Result<Vec<Question>, StoreError>;
}

/// Durable log of answered and timed-out questions.
pub trait AnswerRecorder {
    fn record_answer(&self, question_id: QuestionId, was_correct: bool) -> Result<AnswerId, StoreError>;
}

impl<T: QuestionSupplier + ?Sized> QuestionSupplier for std::sync::Arc<T> {
    fn fetch_questions(&self, theme_id: ThemeId, limit: usize) -> Result<Vec<Question>, StoreError> {
        (**self).fetch_questions(theme_id, limit)
    }
}

impl<T: AnswerRecorder + ?Sized> AnswerRecorder for std::sync::Arc<T> {
    fn record_answer(&self, question_id: QuestionId, was_correct: bool) -> Result<AnswerId, StoreError> {
        (**self).record_answer(question_id, was_correct)
    }
}
