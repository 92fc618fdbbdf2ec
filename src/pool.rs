//! Question pool loading and per-round consumption.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use indexmap::IndexMap;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

/// Default directory where game-definition documents live.
const DEFAULT_QUIZ_DIR: &str = "var/quiz";
/// Environment variable that overrides [`DEFAULT_QUIZ_DIR`].
const QUIZ_DIR_ENV: &str = "SCOUTIX_QUIZ_DIR";

const DEFAULT_JOIN_WAIT_SECS: u64 = 10;
const DEFAULT_ANSWER_WAIT_SECS: u64 = 15;

/// Error raised when a game-definition source cannot be loaded.
///
/// Fatal at startup and at reload time; no partial pool is ever installed.
#[derive(Debug, Error)]
pub enum DataError {
    /// The source file could not be read.
    #[error("unable to read quiz source `{path}`")]
    Io {
        /// Path of the offending source.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The source file does not match the expected document shape.
    #[error("quiz source `{path}` is malformed: {reason}")]
    Malformed {
        /// Path of the offending source.
        path: PathBuf,
        /// What the parser or validator rejected.
        reason: String,
    },
}

/// Remaining questions of the current round: question text mapped to its
/// accepted answer aliases. Shrinks by one entry per posted question.
pub type RemainingQuestions = IndexMap<String, Vec<String>>;

/// Immutable-per-load game definition: the full question set plus the two
/// wait durations. A reload replaces the whole structure.
#[derive(Debug, Clone)]
pub struct PoolSource {
    questions: IndexMap<String, Vec<String>>,
    /// How long players get to join after `start`.
    pub join_wait: Duration,
    /// How long players get to answer each question.
    pub answer_wait: Duration,
}

impl PoolSource {
    /// Load a game definition from `path`.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let contents = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    /// Parse and validate a game-definition document.
    pub(crate) fn parse(path: &Path, contents: &str) -> Result<Self, DataError> {
        let raw: RawPool = serde_json::from_str(contents).map_err(|err| DataError::Malformed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        for (question, entry) in &raw.questions {
            if entry.answers.is_empty() {
                return Err(DataError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("question `{question}` has no answers"),
                });
            }
        }

        Ok(raw.into())
    }

    /// Fresh full copy of the question set, independent of any previously
    /// consumed round state.
    pub fn reset(&self) -> RemainingQuestions {
        self.questions.clone()
    }

    /// Number of questions in the loaded definition.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the loaded definition contains no questions at all.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Remove and return one uniformly random entry from `remaining`, or `None`
/// when the pool is exhausted.
pub fn pick_random(remaining: &mut RemainingQuestions) -> Option<(String, Vec<String>)> {
    if remaining.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..remaining.len());
    remaining.swap_remove_index(index)
}

/// Resolve the full path of the game definition named `source`, taking the
/// environment override into account.
pub fn quiz_path(source: &str) -> PathBuf {
    let dir = env::var_os(QUIZ_DIR_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_QUIZ_DIR));
    dir.join(format!("{source}.json"))
}

/// JSON representation of a game-definition document.
#[derive(Debug, Deserialize)]
struct RawPool {
    questions: IndexMap<String, RawQuestion>,
    #[serde(default = "default_join_wait")]
    join_wait: u64,
    #[serde(default = "default_answer_wait")]
    answer_wait: u64,
}

/// JSON representation of a single question entry.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    answers: Vec<String>,
}

impl From<RawPool> for PoolSource {
    fn from(value: RawPool) -> Self {
        Self {
            questions: value
                .questions
                .into_iter()
                .map(|(question, entry)| (question, entry.answers))
                .collect(),
            join_wait: Duration::from_secs(value.join_wait),
            answer_wait: Duration::from_secs(value.answer_wait),
        }
    }
}

fn default_join_wait() -> u64 {
    DEFAULT_JOIN_WAIT_SECS
}

fn default_answer_wait() -> u64 {
    DEFAULT_ANSWER_WAIT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    fn parse(contents: &str) -> Result<PoolSource, DataError> {
        PoolSource::parse(Path::new("test.json"), contents)
    }

    #[test]
    fn parses_document_and_applies_wait_defaults() {
        let source = parse(r#"{"questions": {"2+2?": {"answers": ["4", "four"]}}}"#).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.join_wait, Duration::from_secs(10));
        assert_eq!(source.answer_wait, Duration::from_secs(15));
    }

    #[test]
    fn parses_explicit_waits() {
        let source = parse(
            r#"{"questions": {"q": {"answers": ["a"]}}, "join_wait": 1, "answer_wait": 2}"#,
        )
        .unwrap();
        assert_eq!(source.join_wait, Duration::from_secs(1));
        assert_eq!(source.answer_wait, Duration::from_secs(2));
    }

    #[test]
    fn rejects_missing_questions_key() {
        let err = parse(r#"{"join_wait": 1}"#).unwrap_err();
        assert!(matches!(err, DataError::Malformed { .. }));
    }

    #[test]
    fn rejects_non_list_answers() {
        let err = parse(r#"{"questions": {"q": {"answers": "4"}}}"#).unwrap_err();
        assert!(matches!(err, DataError::Malformed { .. }));
    }

    #[test]
    fn rejects_question_without_answers() {
        let err = parse(r#"{"questions": {"q": {"answers": []}}}"#).unwrap_err();
        match err {
            DataError::Malformed { reason, .. } => assert!(reason.contains("no answers")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PoolSource::load(Path::new("var/quiz/definitely-missing.json")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn pick_random_consumes_each_entry_exactly_once() {
        let source = parse(
            r#"{"questions": {
                "a?": {"answers": ["1"]},
                "b?": {"answers": ["2"]},
                "c?": {"answers": ["3"]}
            }}"#,
        )
        .unwrap();

        let mut remaining = source.reset();
        let mut seen = HashSet::new();
        for expected_left in (0..3).rev() {
            let (question, answers) = pick_random(&mut remaining).unwrap();
            assert!(!answers.is_empty());
            assert!(seen.insert(question));
            assert_eq!(remaining.len(), expected_left);
        }
        assert!(pick_random(&mut remaining).is_none());
    }

    #[test]
    fn reset_restores_the_full_set() {
        let source = parse(
            r#"{"questions": {"a?": {"answers": ["1"]}, "b?": {"answers": ["2"]}}}"#,
        )
        .unwrap();

        let mut remaining = source.reset();
        pick_random(&mut remaining).unwrap();
        assert_eq!(remaining.len(), 1);

        let fresh = source.reset();
        assert_eq!(fresh.len(), 2);
    }
}
