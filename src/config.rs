use crate::error::ConfigError;
use std::num::NonZeroU32;
use std::path::PathBuf;

pub const DEFAULT_QUESTION_COUNT: usize = 10;

pub const ENV_DATA_DIR: &str = "THEMED_QUIZ_DATA_DIR";
pub const ENV_DB_PATH: &str = "THEMED_QUIZ_DB";
pub const ENV_LOG_PATH: &str = "THEMED_QUIZ_LOG";
pub const ENV_QUESTION_COUNT: &str = "THEMED_QUIZ_COUNT";
pub const ENV_TIME_LIMIT: &str = "THEMED_QUIZ_TIME_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub question_count: usize,
    /// Seconds per question for every quiz; unset leaves it to each theme.
    pub time_limit: Option<NonZeroU32>,
}

fn default_data_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if cfg!(target_os = "windows") {
        let home = lookup("USERPROFILE").unwrap_or_else(|| "C:\\Users\\User".to_string());
        PathBuf::from(home).join(".local\\share\\themed-quiz")
    } else {
        let home = lookup("HOME").unwrap_or_else(|| "/home/user".to_string());
        PathBuf::from(home).join(".local/share/themed-quiz")
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from any key/value source. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(&lookup));
        let db_path = get(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("quiz.db"));
        let log_path = get(ENV_LOG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("themed-quiz.log"));

        let question_count = match get(ENV_QUESTION_COUNT) {
            Some(value) => parse_var(ENV_QUESTION_COUNT, value)?,
            None => DEFAULT_QUESTION_COUNT,
        };
        let time_limit = match get(ENV_TIME_LIMIT) {
            Some(value) => Some(parse_var::<NonZeroU32>(ENV_TIME_LIMIT, value)?),
            None => None,
        };

        Ok(Self {
            data_dir,
            db_path,
            log_path,
            question_count,
            time_limit,
        })
    }
}
