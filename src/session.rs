use crate::answer_worker::{AnswerEvent, AnswerSink};
use crate::error::QuizError;
use crate::models::{AnswerOutcome, Choice, Question, QuestionId, SessionConfig, Summary};
use crate::supplier::QuestionSupplier;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Unanswered,
    /// The answer is shown for review until `advance`.
    Answered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InProgress(Step),
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::InProgress(Step::Unanswered) => write!(f, "waiting for an answer"),
            Phase::InProgress(Step::Answered) => write!(f, "reviewing an answer"),
            Phase::Completed => write!(f, "completed"),
        }
    }
}

/// Session operations that can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Tick,
    SubmitAnswer,
    Timeout,
    Advance,
    Summary,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Tick => "tick",
            Action::SubmitAnswer => "submit an answer",
            Action::Timeout => "time out",
            Action::Advance => "advance",
            Action::Summary => "summarize",
        };
        f.write_str(name)
    }
}

/// Identifies one unanswered question within one attempt.
///
/// Timers hold on to the token they were started with; once the question is
/// answered, advanced past or the session restarts, the session no longer
/// hands out that token and the timer knows it is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestionToken {
    attempt: u64,
    index: usize,
}

/// Observable state returned by every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub current_index: usize,
    pub total: usize,
    pub score: usize,
    pub remaining_time: Option<u32>,
    pub question_id: Option<QuestionId>,
}

/// In-memory state of one quiz attempt.
///
/// The session is not synchronized; concurrent drivers must serialize events
/// (see [`crate::timer::SharedQuizSession`]).
pub struct QuizSession<R = StdRng> {
    config: SessionConfig,
    questions: Vec<Question>,
    current_index: usize,
    phase: Phase,
    score: usize,
    answer_log: Vec<AnswerOutcome>,
    remaining_time: Option<u32>,
    attempt: u64,
    rng: R,
    sink: Box<dyn AnswerSink>,
}

impl<R> fmt::Debug for QuizSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("config", &self.config)
            .field("questions", &self.questions.len())
            .field("current_index", &self.current_index)
            .field("phase", &self.phase)
            .field("score", &self.score)
            .field("remaining_time", &self.remaining_time)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

impl QuizSession<StdRng> {
    /// Loads questions for `config.theme_id` and shuffles them with an
    /// entropy-seeded generator.
    pub fn start<S>(
        config: SessionConfig,
        supplier: &S,
        sink: impl AnswerSink + 'static,
    ) -> Result<Self, QuizError>
    where
        S: QuestionSupplier + ?Sized,
    {
        Self::start_with_rng(config, supplier, sink, StdRng::from_entropy())
    }
}

impl<R: Rng> QuizSession<R> {
    pub fn start_with_rng<S>(
        config: SessionConfig,
        supplier: &S,
        sink: impl AnswerSink + 'static,
        mut rng: R,
    ) -> Result<Self, QuizError>
    where
        S: QuestionSupplier + ?Sized,
    {
        let mut questions = supplier.fetch_questions(config.theme_id, config.question_count)?;
        questions.truncate(config.question_count);

        if questions.is_empty() {
            log::info!("No questions available for theme {}", config.theme_id);
            return Err(QuizError::NoQuestionsAvailable {
                theme_id: config.theme_id,
            });
        }

        questions.shuffle(&mut rng);
        log::info!(
            "Started quiz for theme {} with {} questions (requested {})",
            config.theme_id,
            questions.len(),
            config.question_count
        );

        Ok(Self {
            config,
            questions,
            current_index: 0,
            phase: Phase::InProgress(Step::Unanswered),
            score: 0,
            answer_log: Vec::new(),
            remaining_time: config.time_limit.map(|limit| limit.get()),
            attempt: 0,
            rng,
            sink: Box::new(sink),
        })
    }

    /// Counts the timer down by one unit, timing the question out when it
    /// reaches zero.
    pub fn tick(&mut self) -> Result<Snapshot, QuizError> {
        let remaining = match (self.phase, self.remaining_time) {
            (Phase::InProgress(Step::Unanswered), Some(remaining)) if remaining > 0 => remaining,
            _ => return Err(self.rejected(Action::Tick)),
        };

        let remaining = remaining - 1;
        self.remaining_time = Some(remaining);
        if remaining == 0 {
            log::debug!("Question {} ran out of time", self.current_index);
            self.conclude_question(Choice::TimedOut);
        }

        Ok(self.snapshot())
    }

    /// Answers the current question with the 0-based `alternative_index`.
    pub fn submit_answer(&mut self, alternative_index: usize) -> Result<Snapshot, QuizError> {
        if self.phase != Phase::InProgress(Step::Unanswered) {
            return Err(self.rejected(Action::SubmitAnswer));
        }

        let len = self.questions[self.current_index].alternatives().len();
        if alternative_index >= len {
            return Err(QuizError::OutOfRangeAnswer {
                index: alternative_index,
                len,
            });
        }

        self.conclude_question(Choice::Alternative(alternative_index));
        Ok(self.snapshot())
    }

    pub fn timeout(&mut self) -> Result<Snapshot, QuizError> {
        if self.phase != Phase::InProgress(Step::Unanswered) || self.config.time_limit.is_none() {
            return Err(self.rejected(Action::Timeout));
        }

        self.remaining_time = Some(0);
        self.conclude_question(Choice::TimedOut);
        Ok(self.snapshot())
    }

    pub fn advance(&mut self) -> Result<Snapshot, QuizError> {
        if self.phase != Phase::InProgress(Step::Answered) {
            return Err(self.rejected(Action::Advance));
        }

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.phase = Phase::InProgress(Step::Unanswered);
            self.remaining_time = self.config.time_limit.map(|limit| limit.get());
        } else {
            self.current_index = self.questions.len();
            self.phase = Phase::Completed;
            log::info!(
                "Quiz for theme {} completed: {}/{}",
                self.config.theme_id,
                self.score,
                self.questions.len()
            );
        }

        Ok(self.snapshot())
    }

    /// Reshuffles the same questions and starts over. Allowed at any point.
    pub fn restart(&mut self) -> Snapshot {
        self.questions.shuffle(&mut self.rng);
        self.current_index = 0;
        self.score = 0;
        self.answer_log.clear();
        self.phase = Phase::InProgress(Step::Unanswered);
        self.remaining_time = self.config.time_limit.map(|limit| limit.get());
        self.attempt += 1;
        log::info!(
            "Restarted quiz for theme {} (attempt {})",
            self.config.theme_id,
            self.attempt
        );
        self.snapshot()
    }

    pub fn summary(&self) -> Result<Summary, QuizError> {
        if self.phase != Phase::Completed {
            return Err(self.rejected(Action::Summary));
        }

        let total = self.questions.len();
        Ok(Summary {
            score: self.score,
            total,
            percentage: self.score as f64 * 100.0 / total as f64,
            answers: self.answer_log.clone(),
        })
    }

    fn conclude_question(&mut self, choice: Choice) {
        let question = &self.questions[self.current_index];
        let correct = match choice {
            Choice::Alternative(index) => question.is_correct(index),
            Choice::TimedOut => false,
        };

        if correct {
            self.score += 1;
        }

        self.answer_log.push(AnswerOutcome {
            question_id: question.id(),
            chosen: choice,
            correct,
            correct_index: question.correct_index(),
        });
        self.sink.submit(AnswerEvent {
            question_id: question.id(),
            was_correct: correct,
        });
        self.phase = Phase::InProgress(Step::Answered);
    }
}

impl<R> QuizSession<R> {
    fn rejected(&self, action: Action) -> QuizError {
        log::debug!("Rejected {} while {}", action, self.phase);
        QuizError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            current_index: self.current_index,
            total: self.questions.len(),
            score: self.score,
            remaining_time: self.remaining_time,
            question_id: self.current_question().map(Question::id),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn remaining_time(&self) -> Option<u32> {
        self.remaining_time
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answer_log(&self) -> &[AnswerOutcome] {
        &self.answer_log
    }

    /// The question being asked or reviewed; `None` once completed.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    /// The outcome of the current question while it is being reviewed.
    pub fn last_outcome(&self) -> Option<&AnswerOutcome> {
        match self.phase {
            Phase::InProgress(Step::Answered) => self.answer_log.last(),
            _ => None,
        }
    }

    /// Present only while the current question is waiting for an answer.
    pub fn question_token(&self) -> Option<QuestionToken> {
        match self.phase {
            Phase::InProgress(Step::Unanswered) => Some(QuestionToken {
                attempt: self.attempt,
                index: self.current_index,
            }),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }
}
