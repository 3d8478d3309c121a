use crate::error::{ParseDifficultyError, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

pub type ThemeId = u64;
pub type QuestionId = u64;
pub type AlternativeId = u64;
pub type AnswerId = u64;

pub const DEFAULT_TIME_PER_QUESTION: u32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseDifficultyError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,
    pub description: String,
    /// Display color, e.g. `#4361EE`
    pub color: Option<String>,
    pub difficulty: Difficulty,
    /// Seconds allowed per question; `None` plays the theme untimed.
    pub time_per_question: Option<NonZeroU32>,
    pub created_at: i64,
}

/// Authoring input for creating a theme or replacing its details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTheme {
    pub name: String,
    pub description: String,
    pub color: Option<String>,
    pub difficulty: Difficulty,
    pub time_per_question: Option<NonZeroU32>,
}

impl NewTheme {
    /// A medium theme with the default time per question and no color.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            color: None,
            difficulty: Difficulty::default(),
            time_per_question: NonZeroU32::new(DEFAULT_TIME_PER_QUESTION),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::EmptyThemeName);
        }
        if self.description.trim().is_empty() {
            return Err(StoreError::InvalidTheme(
                "description cannot be empty".to_string(),
            ));
        }
        if let Some(color) = &self.color
            && color.trim().is_empty()
        {
            return Err(StoreError::InvalidTheme("color cannot be blank".to_string()));
        }
        Ok(())
    }
}

impl From<&Theme> for NewTheme {
    fn from(theme: &Theme) -> Self {
        Self {
            name: theme.name.clone(),
            description: theme.description.clone(),
            color: theme.color.clone(),
            difficulty: theme.difficulty,
            time_per_question: theme.time_per_question,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub id: AlternativeId,
    pub text: String,
}

/// A multiple-choice question with its alternatives in display order.
///
/// `correct_index` is 1-based and always names one of `alternatives`;
/// [`Question::new`] refuses anything else, so the invariant holds for every
/// value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    alternatives: Vec<Alternative>,
    correct_index: usize,
}

impl Question {
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        alternatives: Vec<Alternative>,
        correct_index: usize,
    ) -> Result<Self, StoreError> {
        if correct_index == 0 || correct_index > alternatives.len() {
            return Err(StoreError::InvalidQuestion(format!(
                "correct index {} is outside 1..={}",
                correct_index,
                alternatives.len()
            )));
        }

        Ok(Self {
            id,
            prompt: prompt.into(),
            alternatives,
            correct_index,
        })
    }

    pub fn id(&self) -> QuestionId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// 1-based position of the correct alternative.
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_alternative(&self) -> &Alternative {
        &self.alternatives[self.correct_index - 1]
    }

    /// Whether the 0-based `alternative_index` is the correct one.
    pub fn is_correct(&self, alternative_index: usize) -> bool {
        alternative_index + 1 == self.correct_index
    }
}

/// Authoring input for a question that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub prompt: String,
    pub alternatives: Vec<String>,
    /// 1-based
    pub correct_index: usize,
}

impl NewQuestion {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.prompt.trim().is_empty() {
            return Err(StoreError::InvalidQuestion(
                "prompt cannot be empty".to_string(),
            ));
        }
        if self.alternatives.len() < 2 {
            return Err(StoreError::InvalidQuestion(
                "at least two alternatives are required".to_string(),
            ));
        }
        if self.alternatives.iter().any(|a| a.trim().is_empty()) {
            return Err(StoreError::InvalidQuestion(
                "alternatives cannot be empty".to_string(),
            ));
        }
        if self.correct_index == 0 || self.correct_index > self.alternatives.len() {
            return Err(StoreError::InvalidQuestion(format!(
                "correct index {} is outside 1..={}",
                self.correct_index,
                self.alternatives.len()
            )));
        }
        Ok(())
    }
}

impl From<&Question> for NewQuestion {
    fn from(question: &Question) -> Self {
        Self {
            prompt: question.prompt.clone(),
            alternatives: question
                .alternatives
                .iter()
                .map(|a| a.text.clone())
                .collect(),
            correct_index: question.correct_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub theme_id: ThemeId,
    pub question_count: usize,
    /// Ticks allowed per question; `None` runs the quiz untimed.
    pub time_limit: Option<NonZeroU32>,
}

impl SessionConfig {
    pub fn untimed(theme_id: ThemeId, question_count: usize) -> Self {
        Self {
            theme_id,
            question_count,
            time_limit: None,
        }
    }

    pub fn timed(theme_id: ThemeId, question_count: usize, time_limit: NonZeroU32) -> Self {
        Self {
            theme_id,
            question_count,
            time_limit: Some(time_limit),
        }
    }

    /// Uses the theme's time per question unless `time_limit` overrides it.
    pub fn for_theme(
        theme: &Theme,
        question_count: usize,
        time_limit: Option<NonZeroU32>,
    ) -> Self {
        Self {
            theme_id: theme.id,
            question_count,
            time_limit: time_limit.or(theme.time_per_question),
        }
    }
}

/// What the player did with a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// 0-based alternative index
    Alternative(usize),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub chosen: Choice,
    pub correct: bool,
    /// 1-based
    pub correct_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub score: usize,
    pub total: usize,
    pub percentage: f64,
    pub answers: Vec<AnswerOutcome>,
}

impl Summary {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_percentage(self.percentage)
    }

    /// Pairs each logged outcome, in presentation order, with its question.
    /// Outcomes whose question is not in `questions` are skipped.
    pub fn review<'a>(
        &'a self,
        questions: &'a [Question],
    ) -> impl Iterator<Item = (&'a Question, &'a AnswerOutcome)> + 'a {
        self.answers.iter().filter_map(move |outcome| {
            questions
                .iter()
                .find(|q| q.id() == outcome.question_id)
                .map(|question| (question, outcome))
        })
    }
}

impl AnswerOutcome {
    /// Text of the chosen alternative; `None` when the question timed out.
    pub fn chosen_text<'a>(&self, question: &'a Question) -> Option<&'a str> {
        match self.chosen {
            Choice::Alternative(i) => question.alternatives().get(i).map(|a| a.text.as_str()),
            Choice::TimedOut => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    KeepPracticing,
}

impl ScoreBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            ScoreBand::Excellent
        } else if percentage >= 60.0 {
            ScoreBand::Good
        } else if percentage >= 40.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::KeepPracticing
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent! You really know this theme.",
            ScoreBand::Good => "Good job! Just a few to review.",
            ScoreBand::Fair => "Not bad, but there is room to improve.",
            ScoreBand::KeepPracticing => "Keep practicing, you will get there.",
        }
    }
}

/// Completion figures for one theme, computed from recorded answers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThemeProgress {
    pub total_questions: usize,
    pub answered_questions: usize,
    pub correctly_answered: usize,
}

impl ThemeProgress {
    pub fn completion_percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.answered_questions as f64 * 100.0 / self.total_questions as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternatives(n: usize) -> Vec<Alternative> {
        (0..n)
            .map(|i| Alternative {
                id: i as u64 + 1,
                text: format!("Option {}", i + 1),
            })
            .collect()
    }

    #[test]
    fn test_question_rejects_out_of_range_correct_index() {
        assert!(Question::new(1, "Q", alternatives(3), 0).is_err());
        assert!(Question::new(1, "Q", alternatives(3), 4).is_err());
        assert!(Question::new(1, "Q", alternatives(3), 3).is_ok());
    }

    #[test]
    fn test_is_correct_compares_one_based_index() {
        let question = Question::new(1, "Q", alternatives(4), 2).unwrap();
        assert!(question.is_correct(1));
        assert!(!question.is_correct(0));
        assert!(!question.is_correct(2));
        assert_eq!(question.correct_alternative().text, "Option 2");
    }

    #[test]
    fn test_new_question_validation() {
        let mut draft = NewQuestion {
            prompt: "Capital of France?".to_string(),
            alternatives: vec!["Paris".to_string(), "Rome".to_string()],
            correct_index: 1,
        };
        assert!(draft.validate().is_ok());

        draft.correct_index = 3;
        assert!(draft.validate().is_err());

        draft.correct_index = 1;
        draft.alternatives = vec!["Paris".to_string()];
        assert!(draft.validate().is_err());

        draft.alternatives = vec!["Paris".to_string(), "  ".to_string()];
        assert!(draft.validate().is_err());

        draft.alternatives = vec!["Paris".to_string(), "Rome".to_string()];
        draft.prompt = " ".to_string();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_question_converts_back_to_draft() {
        let question = Question::new(7, "Largest planet?", alternatives(3), 3).unwrap();
        let draft = NewQuestion::from(&question);
        assert_eq!(draft.prompt, "Largest planet?");
        assert_eq!(draft.alternatives, vec!["Option 1", "Option 2", "Option 3"]);
        assert_eq!(draft.correct_index, 3);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_new_theme_defaults_and_validation() {
        let mut draft = NewTheme::new("Astronomy", "Stars and planets");
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.time_per_question, NonZeroU32::new(30));
        assert!(draft.validate().is_ok());

        draft.description = "  ".to_string();
        assert!(matches!(draft.validate(), Err(StoreError::InvalidTheme(_))));

        draft.description = "Stars and planets".to_string();
        draft.color = Some(String::new());
        assert!(matches!(draft.validate(), Err(StoreError::InvalidTheme(_))));

        draft.color = None;
        draft.name = " ".to_string();
        assert!(matches!(draft.validate(), Err(StoreError::EmptyThemeName)));
    }

    #[test]
    fn test_session_config_follows_theme_timer() {
        let mut theme = Theme {
            id: 3,
            name: "Astronomy".to_string(),
            description: "Stars and planets".to_string(),
            color: None,
            difficulty: Difficulty::Easy,
            time_per_question: NonZeroU32::new(20),
            created_at: 0,
        };

        let config = SessionConfig::for_theme(&theme, 5, None);
        assert_eq!(config.theme_id, 3);
        assert_eq!(config.time_limit, NonZeroU32::new(20));

        let config = SessionConfig::for_theme(&theme, 5, NonZeroU32::new(8));
        assert_eq!(config.time_limit, NonZeroU32::new(8));

        theme.time_per_question = None;
        assert_eq!(SessionConfig::for_theme(&theme, 5, None).time_limit, None);
    }

    #[test]
    fn test_difficulty_parsing() {
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!(" Hard ".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(Difficulty::Medium.to_string(), "medium");
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_summary_review_pairs_outcomes_with_questions() {
        let questions = vec![
            Question::new(1, "First", alternatives(3), 1).unwrap(),
            Question::new(2, "Second", alternatives(2), 2).unwrap(),
        ];
        let summary = Summary {
            score: 1,
            total: 2,
            percentage: 50.0,
            answers: vec![
                AnswerOutcome {
                    question_id: 2,
                    chosen: Choice::TimedOut,
                    correct: false,
                    correct_index: 2,
                },
                AnswerOutcome {
                    question_id: 1,
                    chosen: Choice::Alternative(0),
                    correct: true,
                    correct_index: 1,
                },
            ],
        };

        let review: Vec<_> = summary.review(&questions).collect();
        assert_eq!(review.len(), 2);

        let (question, outcome) = review[0];
        assert_eq!(question.prompt(), "Second");
        assert_eq!(outcome.chosen_text(question), None);
        assert_eq!(question.correct_alternative().text, "Option 2");

        let (question, outcome) = review[1];
        assert_eq!(question.prompt(), "First");
        assert_eq!(outcome.chosen_text(question), Some("Option 1"));

        // Unknown questions are left out rather than failing the review.
        assert_eq!(summary.review(&questions[..1]).count(), 1);
    }

    #[test]
    fn test_score_band_thresholds() {
        assert_eq!(ScoreBand::from_percentage(100.0), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_percentage(80.0), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_percentage(79.9), ScoreBand::Good);
        assert_eq!(ScoreBand::from_percentage(60.0), ScoreBand::Good);
        assert_eq!(ScoreBand::from_percentage(59.9), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_percentage(40.0), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_percentage(39.9), ScoreBand::KeepPracticing);
        assert_eq!(ScoreBand::from_percentage(0.0), ScoreBand::KeepPracticing);
    }

    #[test]
    fn test_completion_percentage() {
        let empty = ThemeProgress {
            total_questions: 0,
            answered_questions: 0,
            correctly_answered: 0,
        };
        assert_eq!(empty.completion_percentage(), 0.0);

        let half = ThemeProgress {
            total_questions: 4,
            answered_questions: 2,
            correctly_answered: 1,
        };
        assert_eq!(half.completion_percentage(), 50.0);
    }
}
