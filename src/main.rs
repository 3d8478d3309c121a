use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::error::Error;
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use themed_quiz::csv::import_csv;
use themed_quiz::export::export_theme;
use themed_quiz::models::{Choice, QuestionId, Summary};
use themed_quiz::{
    logger, spawn_answer_worker, Config, Difficulty, NewQuestion, NewTheme, Phase, Question,
    QuestionTimer, QuizError, QuizSession, RecordReport, SessionConfig, SharedQuizSession,
    Store, StoreError, Theme, TimerEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "themed-quiz", version, about = "Author and take themed multiple-choice quizzes")]
struct Cli {
    /// Database file to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all themes with their progress
    Themes,
    /// Create a new theme
    AddTheme {
        name: String,
        /// What the theme is about
        #[arg(short, long)]
        description: String,
        /// Display color, e.g. "#4361EE"
        #[arg(long)]
        color: Option<String>,
        /// easy, medium or hard
        #[arg(long, default_value_t = Difficulty::Medium)]
        difficulty: Difficulty,
        /// Seconds allowed per question
        #[arg(short, long, default_value = "30")]
        time_per_question: NonZeroU32,
        /// Play this theme without a timer
        #[arg(long, conflicts_with = "time_per_question")]
        untimed: bool,
    },
    /// Change the details of a theme
    EditTheme {
        theme: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(short, long)]
        time_per_question: Option<NonZeroU32>,
        /// Remove the theme's timer
        #[arg(long, conflicts_with = "time_per_question")]
        untimed: bool,
    },
    /// Delete a theme with all of its questions and recorded answers
    DeleteTheme { theme: String },
    /// List the questions of a theme
    Questions { theme: String },
    /// Add a question to a theme
    AddQuestion {
        theme: String,
        prompt: String,
        /// Position of the correct alternative, starting at 1
        #[arg(short, long)]
        correct: usize,
        #[arg(required = true, num_args = 2..)]
        alternatives: Vec<String>,
    },
    /// Change a stored question
    EditQuestion {
        id: QuestionId,
        #[arg(short, long)]
        prompt: Option<String>,
        /// Position of the correct alternative, starting at 1
        #[arg(short, long)]
        correct: Option<usize>,
        /// Replaces all alternatives; repeat once per alternative
        #[arg(short, long = "alternative")]
        alternatives: Vec<String>,
    },
    /// Delete a question and its recorded answers
    DeleteQuestion { id: QuestionId },
    /// Import questions from a CSV file (prompt,correct,alt1,alt2,...)
    Import { theme: String, file: PathBuf },
    /// Print a theme and its questions as JSON
    Export { theme: String },
    /// Show how much of a theme has been answered
    Progress { theme: String },
    /// Take a quiz
    Play {
        theme: String,
        /// Number of questions to ask
        #[arg(short, long)]
        count: Option<usize>,
        /// Seconds allowed per question, overriding the theme's
        #[arg(short, long)]
        time_limit: Option<NonZeroU32>,
        /// Play without a timer
        #[arg(long, conflicts_with = "time_limit")]
        untimed: bool,
        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logger::init(&config.log_path, level)?;

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let store = Arc::new(Store::open(&db_path)?);

    match cli.command {
        Command::Themes => {
            let themes = store.list_themes()?;
            if themes.is_empty() {
                println!("No themes yet. Create one with `themed-quiz add-theme <name> -d <description>`.");
            }
            for theme in themes {
                let progress = store.theme_progress(theme.id)?;
                println!(
                    "{:>4}  {} [{}, {}]  {}/{} answered ({:.0}%)",
                    theme.id,
                    theme.name,
                    theme.difficulty,
                    describe_timer(&theme),
                    progress.answered_questions,
                    progress.total_questions,
                    progress.completion_percentage()
                );
                println!("      {}", theme.description);
            }
        }
        Command::AddTheme {
            name,
            description,
            color,
            difficulty,
            time_per_question,
            untimed,
        } => {
            let draft = NewTheme {
                name,
                description,
                color,
                difficulty,
                time_per_question: (!untimed).then_some(time_per_question),
            };
            let id = store.create_theme(&draft)?;
            println!("Created theme {} ({})", draft.name.trim(), id);
        }
        Command::EditTheme {
            theme,
            name,
            description,
            color,
            difficulty,
            time_per_question,
            untimed,
        } => {
            let theme = resolve_theme(&store, &theme)?;
            let mut draft = NewTheme::from(&theme);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if color.is_some() {
                draft.color = color;
            }
            if let Some(difficulty) = difficulty {
                draft.difficulty = difficulty;
            }
            if untimed {
                draft.time_per_question = None;
            } else if time_per_question.is_some() {
                draft.time_per_question = time_per_question;
            }
            store.update_theme(theme.id, &draft)?;
            println!("Updated theme {}", draft.name.trim());
        }
        Command::DeleteTheme { theme } => {
            let theme = resolve_theme(&store, &theme)?;
            store.delete_theme(theme.id)?;
            println!("Deleted theme {}", theme.name);
        }
        Command::Questions { theme } => {
            let theme = resolve_theme(&store, &theme)?;
            for question in store.list_questions(theme.id)? {
                println!(
                    "{:>4}  {}  (answered {} times)",
                    question.id(),
                    question.prompt(),
                    store.answer_count(question.id())?
                );
                for (i, alternative) in question.alternatives().iter().enumerate() {
                    let marker = if i + 1 == question.correct_index() { "*" } else { " " };
                    println!("      {}{}. {}", marker, i + 1, alternative.text);
                }
            }
        }
        Command::AddQuestion {
            theme,
            prompt,
            correct,
            alternatives,
        } => {
            let theme = resolve_theme(&store, &theme)?;
            let draft = NewQuestion {
                prompt,
                alternatives,
                correct_index: correct,
            };
            let id = store.create_question(theme.id, &draft)?;
            println!("Added question {} to {}", id, theme.name);
        }
        Command::EditQuestion {
            id,
            prompt,
            correct,
            alternatives,
        } => {
            let question = store
                .get_question(id)?
                .ok_or(StoreError::QuestionNotFound(id))?;
            let mut draft = NewQuestion::from(&question);
            if let Some(prompt) = prompt {
                draft.prompt = prompt;
            }
            if !alternatives.is_empty() {
                draft.alternatives = alternatives;
            }
            if let Some(correct) = correct {
                draft.correct_index = correct;
            }
            store.update_question(id, &draft)?;
            println!("Updated question {}", id);
        }
        Command::DeleteQuestion { id } => {
            store.delete_question(id)?;
            println!("Deleted question {}", id);
        }
        Command::Import { theme, file } => {
            let theme = resolve_theme(&store, &theme)?;
            let report = import_csv(&store, theme.id, &file)?;
            println!("Imported {} questions into {}", report.imported, theme.name);
            for skipped in report.skipped {
                println!("  skipped line {}: {}", skipped.line, skipped.reason);
            }
        }
        Command::Export { theme } => {
            let theme = resolve_theme(&store, &theme)?;
            println!("{}", export_theme(&store, theme.id)?.to_json()?);
        }
        Command::Progress { theme } => {
            let theme = resolve_theme(&store, &theme)?;
            let progress = store.theme_progress(theme.id)?;
            println!(
                "{}: {}/{} questions answered ({:.0}%), {} answered correctly",
                theme.name,
                progress.answered_questions,
                progress.total_questions,
                progress.completion_percentage(),
                progress.correctly_answered
            );
        }
        Command::Play {
            theme,
            count,
            time_limit,
            untimed,
            json,
        } => {
            let theme = resolve_theme(&store, &theme)?;
            let count = count.unwrap_or(config.question_count);
            let session_config = if untimed {
                SessionConfig::untimed(theme.id, count)
            } else {
                SessionConfig::for_theme(&theme, count, time_limit.or(config.time_limit))
            };
            play(store, &theme, session_config, json).await?;
        }
    }

    Ok(())
}

fn resolve_theme(store: &Store, name: &str) -> CliResult<Theme> {
    store
        .find_theme_by_name(name)?
        .ok_or_else(|| format!("no theme named \"{}\"", name.trim()).into())
}

fn describe_timer(theme: &Theme) -> String {
    match theme.time_per_question {
        Some(seconds) => format!("{}s per question", seconds),
        None => "untimed".to_string(),
    }
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{}", text);
    io::stdout().flush()
}

fn print_question(session: &QuizSession) {
    let Some(question) = session.current_question() else {
        return;
    };

    println!();
    println!(
        "Question {}/{}  (score {})",
        session.current_index() + 1,
        session.total(),
        session.score()
    );
    println!("{}", question.prompt());
    for (i, alternative) in question.alternatives().iter().enumerate() {
        println!("  {}. {}", i + 1, alternative.text);
    }
    if let Some(remaining) = session.remaining_time() {
        println!("You have {} seconds.", remaining);
    }
}

fn print_outcome(session: &QuizSession) {
    let (Some(question), Some(outcome)) = (session.current_question(), session.last_outcome()) else {
        return;
    };

    let correct = &question.correct_alternative().text;
    match (outcome.chosen, outcome.correct) {
        (_, true) => println!("Correct!"),
        (Choice::TimedOut, false) => println!("Time's up! The answer was: {}", correct),
        (Choice::Alternative(_), false) => println!("Wrong. The answer was: {}", correct),
    }
}

fn print_summary(summary: &Summary, questions: &[Question]) {
    println!();
    println!(
        "You scored {}/{} ({:.0}%)",
        summary.score, summary.total, summary.percentage
    );
    println!("{}", summary.band().message());

    println!();
    for (n, (question, outcome)) in summary.review(questions).enumerate() {
        let mark = if outcome.correct { "+" } else { "-" };
        println!("{} {}. {}", mark, n + 1, question.prompt());
        println!(
            "    your answer: {}",
            outcome.chosen_text(question).unwrap_or("time ran out")
        );
        if !outcome.correct {
            println!("    correct answer: {}", question.correct_alternative().text);
        }
    }
}

/// Waits for a valid answer or for the timer to expire the question.
///
/// Returns `false` when the player quits or stdin closes.
async fn await_answer(
    shared: &SharedQuizSession,
    lines: &mut Lines<BufReader<Stdin>>,
    timer_rx: &mut mpsc::UnboundedReceiver<TimerEvent>,
) -> CliResult<bool> {
    prompt("> ")?;
    loop {
        tokio::select! {
            Some(event) = timer_rx.recv() => match event {
                TimerEvent::Tick { remaining } => {
                    if remaining <= 5 || remaining % 10 == 0 {
                        println!();
                        prompt(&format!("({}s left) > ", remaining))?;
                    }
                }
                TimerEvent::Expired => {
                    println!();
                    return Ok(true);
                }
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(false);
                };
                let input = line.trim();
                if input.eq_ignore_ascii_case("q") {
                    return Ok(false);
                }

                let Ok(number) = input.parse::<usize>() else {
                    prompt("Type the number of your answer (q to quit) > ")?;
                    continue;
                };

                match shared.lock().await.submit_answer(number.wrapping_sub(1)) {
                    Ok(_) => return Ok(true),
                    Err(QuizError::OutOfRangeAnswer { len, .. }) => {
                        prompt(&format!("Pick a number between 1 and {} > ", len))?;
                    }
                    // The timer expired the question first.
                    Err(QuizError::InvalidTransition { .. }) => return Ok(true),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

async fn play(
    store: Arc<Store>,
    theme: &Theme,
    session_config: SessionConfig,
    json: bool,
) -> CliResult<()> {
    let (recorder, reports, worker) = spawn_answer_worker(store.clone())?;
    let session = match QuizSession::start(session_config, store.as_ref(), recorder) {
        Ok(session) => session,
        Err(QuizError::NoQuestionsAvailable { .. }) => {
            println!("Theme \"{}\" has no questions yet.", theme.name);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let shared = SharedQuizSession::new(session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let available = store.count_questions(theme.id)?;
    println!(
        "Quiz: {} ({} of {} questions)",
        theme.name,
        shared.lock().await.total(),
        available
    );
    loop {
        print_question(&*shared.lock().await);

        let (timer_tx, mut timer_rx) = mpsc::unbounded_channel();
        let timer = QuestionTimer::start(shared.clone(), Duration::from_secs(1), timer_tx).await;
        let keep_going = await_answer(&shared, &mut lines, &mut timer_rx).await?;
        drop(timer);

        if !keep_going {
            println!("Quiz aborted.");
            break;
        }

        print_outcome(&*shared.lock().await);
        for report in reports.try_iter() {
            if let RecordReport::Failed { error, .. } = report {
                eprintln!("warning: answer was not saved: {}", error);
            }
        }

        prompt("Press Enter to continue ")?;
        if lines.next_line().await?.is_none() {
            break;
        }

        let snapshot = shared.lock().await.advance()?;
        if snapshot.phase != Phase::Completed {
            continue;
        }

        {
            let guard = shared.lock().await;
            let summary = guard.summary()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary, guard.questions());
            }
        }

        prompt("Play again? [y/N] ")?;
        match lines.next_line().await? {
            Some(answer) if answer.trim().eq_ignore_ascii_case("y") => {
                shared.lock().await.restart();
            }
            _ => break,
        }
    }

    // The worker stops once the session, and with it the recorder handle, is gone.
    drop(shared);
    let joined = tokio::task::spawn_blocking(move || worker.join()).await?;
    if joined.is_err() {
        log::warn!("Answer worker panicked");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("themed-quiz").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn test_add_question_collects_alternatives() {
        let command = parse(&[
            "add-question", "Capitals", "Capital of Peru?", "--correct", "2", "Quito", "Lima",
            "Bogota",
        ])
        .unwrap();

        let Command::AddQuestion {
            theme,
            prompt,
            correct,
            alternatives,
        } = command
        else {
            panic!("unexpected command {:?}", command);
        };
        assert_eq!(theme, "Capitals");
        assert_eq!(prompt, "Capital of Peru?");
        assert_eq!(correct, 2);
        assert_eq!(alternatives, vec!["Quito", "Lima", "Bogota"]);

        assert!(parse(&["add-question", "Capitals", "Q?", "-c", "1", "Only"]).is_err());
    }

    #[test]
    fn test_edit_question_repeats_alternative_flag() {
        let command = parse(&["edit-question", "7", "-a", "Yes", "-a", "No"]).unwrap();
        let Command::EditQuestion {
            id,
            prompt,
            correct,
            alternatives,
        } = command
        else {
            panic!("unexpected command {:?}", command);
        };
        assert_eq!(id, 7);
        assert_eq!(prompt, None);
        assert_eq!(correct, None);
        assert_eq!(alternatives, vec!["Yes", "No"]);

        assert!(matches!(
            parse(&["delete-question", "7"]).unwrap(),
            Command::DeleteQuestion { id: 7 }
        ));
    }

    #[test]
    fn test_add_theme_defaults() {
        let command = parse(&["add-theme", "Astronomy", "-d", "Stars"]).unwrap();
        let Command::AddTheme {
            difficulty,
            time_per_question,
            untimed,
            color,
            ..
        } = command
        else {
            panic!("unexpected command {:?}", command);
        };
        assert_eq!(difficulty, Difficulty::Medium);
        assert_eq!(time_per_question.get(), 30);
        assert!(!untimed);
        assert_eq!(color, None);

        assert!(parse(&["add-theme", "Astronomy"]).is_err());
        assert!(parse(&["add-theme", "Astronomy", "-d", "Stars", "--difficulty", "extreme"]).is_err());
        assert!(
            parse(&["add-theme", "Astronomy", "-d", "Stars", "-t", "10", "--untimed"]).is_err()
        );
    }

    #[test]
    fn test_play_untimed_conflicts_with_time_limit() {
        assert!(parse(&["play", "Astronomy", "--untimed"]).is_ok());
        assert!(parse(&["play", "Astronomy", "--untimed", "--time-limit", "5"]).is_err());
    }
}
