use crate::db::Store;
use crate::error::StoreError;
use crate::models::{NewQuestion, ThemeId};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvQuestions {
    pub questions: Vec<NewQuestion>,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Reads `prompt,correct,alternative,alternative,...` lines, where `correct`
/// is the 1-based position of the right alternative.
pub fn load_csv(path: &Path) -> std::io::Result<CsvQuestions> {
    let content = fs::read_to_string(path)?;
    Ok(parse_csv(&content))
}

pub fn parse_csv(content: &str) -> CsvQuestions {
    let mut parsed = CsvQuestions::default();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_question_line(line) {
            Ok(question) => parsed.questions.push(question),
            Err(reason) => parsed.skipped.push(SkippedLine {
                line: index + 1,
                reason,
            }),
        }
    }

    parsed
}

pub fn parse_question_line(line: &str) -> Result<NewQuestion, String> {
    let mut fields = parse_csv_line(line).into_iter();

    let prompt = fields.next().unwrap_or_default();
    let correct = fields.next().unwrap_or_default();
    let correct_index = correct
        .parse::<usize>()
        .map_err(|_| format!("\"{}\" is not a valid answer number", correct))?;

    let question = NewQuestion {
        prompt,
        alternatives: fields.collect(),
        correct_index,
    };
    question.validate().map_err(|e| e.to_string())?;
    Ok(question)
}

pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => {
                in_quotes = true;
            }
            '"' => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current = String::new();
            }
            _ => {
                current.push(c);
            }
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Loads a CSV file and stores every valid line as a question of `theme_id`.
pub fn import_csv(store: &Store, theme_id: ThemeId, path: &Path) -> Result<ImportReport, StoreError> {
    let parsed = load_csv(path)?;
    for skipped in &parsed.skipped {
        log::warn!(
            "Skipping line {} of {}: {}",
            skipped.line,
            path.display(),
            skipped.reason
        );
    }

    let mut imported = 0;
    for question in &parsed.questions {
        store.create_question(theme_id, question)?;
        imported += 1;
    }

    log::info!(
        "Imported {} questions into theme {} from {}",
        imported,
        theme_id,
        path.display()
    );
    Ok(ImportReport {
        imported,
        skipped: parsed.skipped,
    })
}
