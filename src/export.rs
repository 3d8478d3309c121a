use crate::db::Store;
use crate::error::StoreError;
use crate::models::{Question, Theme, ThemeId};
use serde::Serialize;

/// A theme with all of its questions, as written by `themed-quiz export`.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeExport {
    pub theme: Theme,
    pub questions: Vec<Question>,
}

impl ThemeExport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn export_theme(store: &Store, theme_id: ThemeId) -> Result<ThemeExport, StoreError> {
    let theme = store
        .get_theme(theme_id)?
        .ok_or(StoreError::ThemeNotFound(theme_id))?;
    let questions = store.list_questions(theme_id)?;
    Ok(ThemeExport { theme, questions })
}
