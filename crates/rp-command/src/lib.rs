#![forbid(unsafe_code)]

//! Command surface of the rockpool engine: parsing, validation, dispatch.
//!
//! Commands arrive as an argv of tokens (any CLI/RPC/library binding can
//! produce one), are validated before any structure is touched, and are
//! applied through a shared [`KeySpace`]. Everything except a blocking pop
//! completes without suspending.

use std::sync::Arc;
use std::time::Duration;

use rp_store::{KeySpace, StoreError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("ERR value is not a valid float")]
    InvalidScore,
    #[error("ERR timeout is not a float or out of range")]
    InvalidTimeout,
    #[error("ERR negative timeout")]
    NegativeTimeout,
    #[error("ERR value is not an integer or out of range")]
    InvalidInteger,
    #[error("ERR {0} must not be empty")]
    EmptyIdentifier(&'static str),
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A validated command, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddScore { key: String, score: f64, member: String },
    Rank { key: String, member: String },
    ScoreOf { key: String, member: String },
    Card { key: String },
    Remove { key: String, member: String },
    ScoreRange { key: String, start: i64, stop: i64 },
    Push { key: String, value: String },
    BlockingPop { key: String, timeout: Option<Duration> },
    TryPop { key: String },
    QueueLen { key: String },
    QueueRange { key: String, start: i64, stop: i64 },
    Ping,
    Echo { message: String },
}

/// Result of executing a command. `NoMember`, `NoValue` and `TimedOut` are
/// ordinary outcomes of well-formed queries, not faults.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Rank(usize),
    Score(f64),
    Count(usize),
    Removed(bool),
    Members(Vec<String>),
    Value(String),
    NoMember,
    NoValue,
    TimedOut,
    Pong,
    Echo(String),
}

/// Parse an argv into a [`Command`], validating argument shapes. Rejection
/// happens here, before any structure is resolved or mutated.
pub fn parse(argv: &[String]) -> Result<Command, CommandError> {
    let Some(verb) = argv.first() else {
        return Err(CommandError::UnknownCommand(String::new()));
    };
    match verb.to_ascii_uppercase().as_str() {
        "ZADD" => {
            // ZADD key score member
            if argv.len() != 4 {
                return Err(CommandError::WrongArity("ZADD"));
            }
            Ok(Command::AddScore {
                key: parse_identifier(&argv[1], "key")?,
                score: parse_score(&argv[2])?,
                member: parse_identifier(&argv[3], "member")?,
            })
        }
        "ZRANK" => {
            if argv.len() != 3 {
                return Err(CommandError::WrongArity("ZRANK"));
            }
            Ok(Command::Rank {
                key: parse_identifier(&argv[1], "key")?,
                member: parse_identifier(&argv[2], "member")?,
            })
        }
        "ZSCORE" => {
            if argv.len() != 3 {
                return Err(CommandError::WrongArity("ZSCORE"));
            }
            Ok(Command::ScoreOf {
                key: parse_identifier(&argv[1], "key")?,
                member: parse_identifier(&argv[2], "member")?,
            })
        }
        "ZCARD" => {
            if argv.len() != 2 {
                return Err(CommandError::WrongArity("ZCARD"));
            }
            Ok(Command::Card {
                key: parse_identifier(&argv[1], "key")?,
            })
        }
        "ZREM" => {
            if argv.len() != 3 {
                return Err(CommandError::WrongArity("ZREM"));
            }
            Ok(Command::Remove {
                key: parse_identifier(&argv[1], "key")?,
                member: parse_identifier(&argv[2], "member")?,
            })
        }
        "ZRANGE" => {
            if argv.len() != 4 {
                return Err(CommandError::WrongArity("ZRANGE"));
            }
            Ok(Command::ScoreRange {
                key: parse_identifier(&argv[1], "key")?,
                start: parse_index(&argv[2])?,
                stop: parse_index(&argv[3])?,
            })
        }
        "RPUSH" => {
            if argv.len() != 3 {
                return Err(CommandError::WrongArity("RPUSH"));
            }
            Ok(Command::Push {
                key: parse_identifier(&argv[1], "key")?,
                value: parse_identifier(&argv[2], "value")?,
            })
        }
        "BLPOP" => {
            // BLPOP key timeout (seconds; 0 blocks indefinitely)
            if argv.len() != 3 {
                return Err(CommandError::WrongArity("BLPOP"));
            }
            Ok(Command::BlockingPop {
                key: parse_identifier(&argv[1], "key")?,
                timeout: parse_timeout(&argv[2])?,
            })
        }
        "LPOP" => {
            if argv.len() != 2 {
                return Err(CommandError::WrongArity("LPOP"));
            }
            Ok(Command::TryPop {
                key: parse_identifier(&argv[1], "key")?,
            })
        }
        "LLEN" => {
            if argv.len() != 2 {
                return Err(CommandError::WrongArity("LLEN"));
            }
            Ok(Command::QueueLen {
                key: parse_identifier(&argv[1], "key")?,
            })
        }
        "LRANGE" => {
            if argv.len() != 4 {
                return Err(CommandError::WrongArity("LRANGE"));
            }
            Ok(Command::QueueRange {
                key: parse_identifier(&argv[1], "key")?,
                start: parse_index(&argv[2])?,
                stop: parse_index(&argv[3])?,
            })
        }
        "PING" => {
            if argv.len() != 1 {
                return Err(CommandError::WrongArity("PING"));
            }
            Ok(Command::Ping)
        }
        "ECHO" => {
            if argv.len() != 2 {
                return Err(CommandError::WrongArity("ECHO"));
            }
            Ok(Command::Echo {
                message: argv[1].clone(),
            })
        }
        _ => Err(CommandError::UnknownCommand(verb.clone())),
    }
}

fn parse_identifier(arg: &str, what: &'static str) -> Result<String, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::EmptyIdentifier(what));
    }
    Ok(arg.to_owned())
}

fn parse_score(arg: &str) -> Result<f64, CommandError> {
    let score = arg.parse::<f64>().map_err(|_| CommandError::InvalidScore)?;
    if !score.is_finite() {
        return Err(CommandError::InvalidScore);
    }
    Ok(score)
}

fn parse_timeout(arg: &str) -> Result<Option<Duration>, CommandError> {
    let seconds = arg
        .parse::<f64>()
        .map_err(|_| CommandError::InvalidTimeout)?;
    if !seconds.is_finite() {
        return Err(CommandError::InvalidTimeout);
    }
    if seconds < 0.0 {
        return Err(CommandError::NegativeTimeout);
    }
    if seconds == 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|_| CommandError::InvalidTimeout)
}

fn parse_index(arg: &str) -> Result<i64, CommandError> {
    arg.parse::<i64>().map_err(|_| CommandError::InvalidInteger)
}

/// Applies commands to a shared keyspace. Cheap to clone; clones share the
/// same keyspace.
#[derive(Debug, Clone)]
pub struct Executor {
    keys: Arc<KeySpace>,
}

impl Executor {
    #[must_use]
    pub fn new(keys: Arc<KeySpace>) -> Self {
        Self { keys }
    }

    #[must_use]
    pub fn keyspace(&self) -> &Arc<KeySpace> {
        &self.keys
    }

    /// Execute one command. Suspends only for `BlockingPop` on an empty
    /// queue; structure locks are never held across the suspension.
    pub async fn execute(&self, command: Command) -> Result<Reply, CommandError> {
        match command {
            Command::AddScore { key, score, member } => {
                let index = self.keys.scores(&key)?;
                let rank = index.lock().add_or_update(&member, score);
                Ok(Reply::Rank(rank))
            }
            Command::Rank { key, member } => {
                let index = self.keys.scores(&key)?;
                let rank = index.lock().rank(&member);
                Ok(rank.map_or(Reply::NoMember, Reply::Rank))
            }
            Command::ScoreOf { key, member } => {
                let index = self.keys.scores(&key)?;
                let score = index.lock().score(&member);
                Ok(score.map_or(Reply::NoMember, Reply::Score))
            }
            Command::Card { key } => {
                let index = self.keys.scores(&key)?;
                let len = index.lock().len();
                Ok(Reply::Count(len))
            }
            Command::Remove { key, member } => {
                let index = self.keys.scores(&key)?;
                let removed = index.lock().remove(&member);
                Ok(Reply::Removed(removed))
            }
            Command::ScoreRange { key, start, stop } => {
                let index = self.keys.scores(&key)?;
                let members = index
                    .lock()
                    .range(start, stop)
                    .into_iter()
                    .map(|(member, _)| member)
                    .collect();
                Ok(Reply::Members(members))
            }
            Command::Push { key, value } => {
                let queue = self.keys.queue(&key)?;
                let len = queue.push(value);
                Ok(Reply::Count(len))
            }
            Command::BlockingPop { key, timeout } => {
                let queue = self.keys.queue(&key)?;
                match queue.pop(timeout).await {
                    Some(value) => Ok(Reply::Value(value)),
                    None => {
                        debug!(key, "blocking pop timed out");
                        Ok(Reply::TimedOut)
                    }
                }
            }
            Command::TryPop { key } => {
                let queue = self.keys.queue(&key)?;
                Ok(queue.try_pop().map_or(Reply::NoValue, Reply::Value))
            }
            Command::QueueLen { key } => {
                let queue = self.keys.queue(&key)?;
                Ok(Reply::Count(queue.len()))
            }
            Command::QueueRange { key, start, stop } => {
                let queue = self.keys.queue(&key)?;
                Ok(Reply::Members(queue.range(start, stop)))
            }
            Command::Ping => Ok(Reply::Pong),
            Command::Echo { message } => Ok(Reply::Echo(message)),
        }
    }
}
