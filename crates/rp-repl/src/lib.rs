#![forbid(unsafe_code)]

//! Line-oriented shell for the rockpool engine.
//!
//! One command per line, tokens split on whitespace with double-quote
//! grouping, replies rendered in the familiar `(integer)` / `"value"` /
//! `(nil)` shapes. Runs over any buffered reader/writer pair, so tests
//! drive it with in-memory pipes and the server wires it to stdio.

use rp_command::{CommandError, Executor, Reply, parse};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("ERR unterminated quote")]
    UnterminatedQuote,
    #[error("ERR trailing escape")]
    TrailingEscape,
}

/// Split a command line into tokens. Double quotes group words; inside
/// quotes, `\"`, `\\`, `\n` and `\t` escapes apply.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => token.push('\n'),
                        Some('t') => token.push('\t'),
                        Some(escaped) => token.push(escaped),
                        None => return Err(TokenizeError::TrailingEscape),
                    },
                    Some(ch) => token.push(ch),
                    None => return Err(TokenizeError::UnterminatedQuote),
                }
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

/// Render an execution result for the shell.
#[must_use]
pub fn render(result: &Result<Reply, CommandError>) -> String {
    match result {
        Ok(Reply::Rank(n)) => format!("(integer) {n}"),
        Ok(Reply::Count(n)) => format!("(integer) {n}"),
        Ok(Reply::Removed(removed)) => format!("(integer) {}", usize::from(*removed)),
        Ok(Reply::Score(score)) => format!("\"{score}\""),
        Ok(Reply::Value(value)) | Ok(Reply::Echo(value)) => format!("\"{value}\""),
        Ok(Reply::Members(members)) => {
            if members.is_empty() {
                "(empty array)".to_owned()
            } else {
                members
                    .iter()
                    .enumerate()
                    .map(|(i, m)| format!("{}) \"{m}\"", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Ok(Reply::NoMember) | Ok(Reply::NoValue) | Ok(Reply::TimedOut) => "(nil)".to_owned(),
        Ok(Reply::Pong) => "PONG".to_owned(),
        Err(error) => format!("(error) {error}"),
    }
}

/// Drive the shell until end of input or a `QUIT` line.
pub async fn run<R, W>(
    executor: &Executor,
    reader: R,
    mut writer: W,
    prompt: bool,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    loop {
        if prompt {
            writer.write_all(b"rockpool> ").await?;
            writer.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let tokens = match tokenize(&line) {
            Ok(tokens) => tokens,
            Err(error) => {
                writer.write_all(format!("(error) {error}\n").as_bytes()).await?;
                writer.flush().await?;
                continue;
            }
        };
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() == 1 && tokens[0].eq_ignore_ascii_case("quit") {
            break;
        }
        debug!(line = %line.trim(), "executing");
        let result = match parse(&tokens) {
            Ok(command) => executor.execute(command).await,
            Err(error) => Err(error),
        };
        writer.write_all(render(&result).as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
