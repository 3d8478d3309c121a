use crate::db::now;
use crate::db::question::count_questions;
use crate::db::theme::theme_exists;
use crate::error::StoreError;
use crate::models::{AnswerId, QuestionId, ThemeId, ThemeProgress};
use rusqlite::{Connection, OptionalExtension};

pub fn record_answer(
    conn: &Connection,
    question_id: QuestionId,
    was_correct: bool,
) -> Result<AnswerId, StoreError> {
    let exists = conn
        .query_row("SELECT 1 FROM questions WHERE id = ?", [question_id], |_| {
            Ok(())
        })
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::QuestionNotFound(question_id));
    }

    conn.execute(
        "INSERT INTO answers (question_id, was_correct, answered_at) VALUES (?, ?, ?)",
        rusqlite::params![question_id, was_correct, now()],
    )?;
    Ok(conn.last_insert_rowid() as u64)
}

pub fn answer_count(conn: &Connection, question_id: QuestionId) -> Result<usize, StoreError> {
    let count: usize = conn.query_row(
        "SELECT COUNT(*) FROM answers WHERE question_id = ?",
        [question_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// How much of a theme has been covered by recorded answers.
pub fn theme_progress(conn: &Connection, theme_id: ThemeId) -> Result<ThemeProgress, StoreError> {
    if !theme_exists(conn, theme_id)? {
        return Err(StoreError::ThemeNotFound(theme_id));
    }

    let total_questions = count_questions(conn, theme_id)?;
    let (answered_questions, correctly_answered): (usize, usize) = conn.query_row(
        "SELECT COUNT(DISTINCT a.question_id),
                COUNT(DISTINCT CASE WHEN a.was_correct THEN a.question_id END)
         FROM answers a
         JOIN questions q ON q.id = a.question_id
         WHERE q.theme_id = ?",
        [theme_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(ThemeProgress {
        total_questions,
        answered_questions,
        correctly_answered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::question::create_question;
    use crate::db::tests::{draft, test_conn, theme_draft};
    use crate::db::theme::create_theme;

    #[test]
    fn test_record_answer_requires_question() {
        let conn = test_conn();
        assert!(matches!(
            record_answer(&conn, 5, true),
            Err(StoreError::QuestionNotFound(5))
        ));
    }

    #[test]
    fn test_answer_count() {
        let mut conn = test_conn();
        let theme_id = create_theme(&conn, &theme_draft("Math")).unwrap();
        let id = create_question(&mut conn, theme_id, &draft("1+1?", &["2", "3"], 1)).unwrap();

        assert_eq!(answer_count(&conn, id).unwrap(), 0);

        assert_eq!(record_answer(&conn, id, true).unwrap(), 1);
        assert_eq!(record_answer(&conn, id, false).unwrap(), 2);
        assert_eq!(answer_count(&conn, id).unwrap(), 2);
    }

    #[test]
    fn test_theme_progress_counts_distinct_questions() {
        let mut conn = test_conn();
        let theme_id = create_theme(&conn, &theme_draft("Math")).unwrap();
        let other = create_theme(&conn, &theme_draft("Other")).unwrap();

        let q1 = create_question(&mut conn, theme_id, &draft("A?", &["1", "2"], 1)).unwrap();
        let q2 = create_question(&mut conn, theme_id, &draft("B?", &["1", "2"], 1)).unwrap();
        create_question(&mut conn, theme_id, &draft("C?", &["1", "2"], 1)).unwrap();
        create_question(&mut conn, theme_id, &draft("D?", &["1", "2"], 1)).unwrap();
        let elsewhere = create_question(&mut conn, other, &draft("E?", &["1", "2"], 1)).unwrap();

        record_answer(&conn, q1, false).unwrap();
        record_answer(&conn, q1, true).unwrap();
        record_answer(&conn, q1, true).unwrap();
        record_answer(&conn, q2, false).unwrap();
        record_answer(&conn, elsewhere, true).unwrap();

        let progress = theme_progress(&conn, theme_id).unwrap();
        assert_eq!(progress.total_questions, 4);
        assert_eq!(progress.answered_questions, 2);
        assert_eq!(progress.correctly_answered, 1);
        assert_eq!(progress.completion_percentage(), 50.0);
    }

    #[test]
    fn test_theme_progress_for_missing_theme() {
        let conn = test_conn();
        assert!(matches!(
            theme_progress(&conn, 3),
            Err(StoreError::ThemeNotFound(3))
        ));
    }
}
