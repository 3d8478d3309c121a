use crate::db::now;
use crate::error::StoreError;
use crate::models::{Difficulty, NewTheme, Theme, ThemeId};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use std::num::NonZeroU32;

const THEME_COLUMNS: &str =
    "id, name, description, color, difficulty, time_per_question, created_at";

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn theme_from_row(row: &Row<'_>) -> rusqlite::Result<Theme> {
    let time_per_question: Option<u32> = row.get(5)?;
    Ok(Theme {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        difficulty: row.get(4)?,
        time_per_question: time_per_question.and_then(NonZeroU32::new),
        created_at: row.get(6)?,
    })
}

pub fn create_theme(conn: &Connection, draft: &NewTheme) -> Result<ThemeId, StoreError> {
    draft.validate()?;
    let name = draft.name.trim();
    if find_theme_by_name(conn, name)?.is_some() {
        return Err(StoreError::DuplicateTheme(name.to_string()));
    }

    conn.execute(
        "INSERT INTO themes (name, description, color, difficulty, time_per_question, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            name,
            draft.description.trim(),
            draft.color.as_deref().map(str::trim),
            draft.difficulty,
            draft.time_per_question.map(NonZeroU32::get),
            now()
        ],
    )?;

    let id = conn.last_insert_rowid() as u64;
    log::debug!("Created theme {} ({})", id, name);
    Ok(id)
}

pub fn get_theme(conn: &Connection, id: ThemeId) -> Result<Option<Theme>, StoreError> {
    let theme = conn
        .query_row(
            &format!("SELECT {} FROM themes WHERE id = ?", THEME_COLUMNS),
            [id],
            theme_from_row,
        )
        .optional()?;
    Ok(theme)
}

pub fn find_theme_by_name(conn: &Connection, name: &str) -> Result<Option<Theme>, StoreError> {
    let theme = conn
        .query_row(
            &format!("SELECT {} FROM themes WHERE name = ?", THEME_COLUMNS),
            [name.trim()],
            theme_from_row,
        )
        .optional()?;
    Ok(theme)
}

pub fn list_themes(conn: &Connection) -> Result<Vec<Theme>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM themes ORDER BY name",
        THEME_COLUMNS
    ))?;
    let themes = stmt
        .query_map([], theme_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(themes)
}

pub fn theme_exists(conn: &Connection, id: ThemeId) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM themes WHERE id = ?", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Replaces every editable detail of a theme, its name included.
pub fn update_theme(conn: &Connection, id: ThemeId, draft: &NewTheme) -> Result<(), StoreError> {
    draft.validate()?;
    let name = draft.name.trim();
    if let Some(existing) = find_theme_by_name(conn, name)?
        && existing.id != id
    {
        return Err(StoreError::DuplicateTheme(name.to_string()));
    }

    let updated = conn.execute(
        "UPDATE themes
         SET name = ?, description = ?, color = ?, difficulty = ?, time_per_question = ?
         WHERE id = ?",
        rusqlite::params![
            name,
            draft.description.trim(),
            draft.color.as_deref().map(str::trim),
            draft.difficulty,
            draft.time_per_question.map(NonZeroU32::get),
            id
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::ThemeNotFound(id));
    }
    Ok(())
}

/// Deletes the theme together with its questions, alternatives and answers.
pub fn delete_theme(conn: &Connection, id: ThemeId) -> Result<(), StoreError> {
    let deleted = conn.execute("DELETE FROM themes WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(StoreError::ThemeNotFound(id));
    }
    log::debug!("Deleted theme {}", id);
    Ok(())
}
