use crate::db::now;
use crate::db::theme::theme_exists;
use crate::error::StoreError;
use crate::models::{Alternative, NewQuestion, Question, QuestionId, ThemeId};
use rusqlite::{Connection, OptionalExtension};

fn insert_alternatives(
    conn: &Connection,
    question_id: QuestionId,
    alternatives: &[String],
) -> Result<(), StoreError> {
    let mut stmt =
        conn.prepare("INSERT INTO alternatives (question_id, text, position) VALUES (?, ?, ?)")?;
    for (position, text) in alternatives.iter().enumerate() {
        stmt.execute(rusqlite::params![question_id, text.trim(), position])?;
    }
    Ok(())
}

fn load_alternatives(conn: &Connection, question_id: QuestionId) -> Result<Vec<Alternative>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, text FROM alternatives WHERE question_id = ? ORDER BY position",
    )?;
    let alternatives = stmt
        .query_map([question_id], |row| {
            Ok(Alternative {
                id: row.get(0)?,
                text: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(alternatives)
}

fn assemble(
    conn: &Connection,
    (id, prompt, correct_index): (QuestionId, String, usize),
) -> Result<Question, StoreError> {
    let alternatives = load_alternatives(conn, id)?;
    Question::new(id, prompt, alternatives, correct_index)
}

pub fn create_question(
    conn: &mut Connection,
    theme_id: ThemeId,
    draft: &NewQuestion,
) -> Result<QuestionId, StoreError> {
    draft.validate()?;
    if !theme_exists(conn, theme_id)? {
        return Err(StoreError::ThemeNotFound(theme_id));
    }

    let created_at = now();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO questions (theme_id, prompt, correct_index, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        rusqlite::params![
            theme_id,
            draft.prompt.trim(),
            draft.correct_index,
            created_at,
            created_at
        ],
    )?;
    let id = tx.last_insert_rowid() as u64;
    insert_alternatives(&tx, id, &draft.alternatives)?;
    tx.commit()?;

    log::debug!("Created question {} in theme {}", id, theme_id);
    Ok(id)
}

pub fn get_question(conn: &Connection, id: QuestionId) -> Result<Option<Question>, StoreError> {
    let row: Option<(QuestionId, String, usize)> = conn
        .query_row(
            "SELECT id, prompt, correct_index FROM questions WHERE id = ?",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    row.map(|row| assemble(conn, row)).transpose()
}

fn query_questions(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Question>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<Vec<(QuestionId, String, usize)>>>()?;

    rows.into_iter().map(|row| assemble(conn, row)).collect()
}

/// A random selection of up to `limit` questions from a theme, so repeated
/// quizzes eventually cover the whole theme.
pub fn fetch_questions(
    conn: &Connection,
    theme_id: ThemeId,
    limit: usize,
) -> Result<Vec<Question>, StoreError> {
    if !theme_exists(conn, theme_id)? {
        return Err(StoreError::ThemeNotFound(theme_id));
    }

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    query_questions(
        conn,
        "SELECT id, prompt, correct_index FROM questions
         WHERE theme_id = ? ORDER BY RANDOM() LIMIT ?",
        rusqlite::params![theme_id, limit],
    )
}

/// Every question of a theme in creation order.
pub fn list_questions(conn: &Connection, theme_id: ThemeId) -> Result<Vec<Question>, StoreError> {
    if !theme_exists(conn, theme_id)? {
        return Err(StoreError::ThemeNotFound(theme_id));
    }

    query_questions(
        conn,
        "SELECT id, prompt, correct_index FROM questions WHERE theme_id = ? ORDER BY id",
        [theme_id],
    )
}

pub fn count_questions(conn: &Connection, theme_id: ThemeId) -> Result<usize, StoreError> {
    let count: usize = conn.query_row(
        "SELECT COUNT(*) FROM questions WHERE theme_id = ?",
        [theme_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Replaces the prompt, alternatives and correct index of a stored question.
/// Recorded answers are kept.
pub fn update_question(
    conn: &mut Connection,
    id: QuestionId,
    draft: &NewQuestion,
) -> Result<(), StoreError> {
    draft.validate()?;

    let tx = conn.transaction()?;
    let updated = tx.execute(
        "UPDATE questions SET prompt = ?, correct_index = ?, updated_at = ? WHERE id = ?",
        rusqlite::params![draft.prompt.trim(), draft.correct_index, now(), id],
    )?;
    if updated == 0 {
        return Err(StoreError::QuestionNotFound(id));
    }
    tx.execute("DELETE FROM alternatives WHERE question_id = ?", [id])?;
    insert_alternatives(&tx, id, &draft.alternatives)?;
    tx.commit()?;
    Ok(())
}

pub fn delete_question(conn: &Connection, id: QuestionId) -> Result<(), StoreError> {
    let deleted = conn.execute("DELETE FROM questions WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(StoreError::QuestionNotFound(id));
    }
    Ok(())
}
