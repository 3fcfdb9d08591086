//! SMS vitals command grammar.
//!
//! ```text
//! BP <systolic> <diastolic>
//! SUGAR <level>
//! ```
//!
//! Keywords are case-insensitive and tokens are separated by any run of
//! whitespace. Values are signed 64-bit integers; no range checks apply.

use thiserror::Error;

use crate::models::Measurement;

/// Why a message did not parse. Every variant gets the same reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty message")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{command} expects {expected} values, found {found}")]
    WrongArity {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("Not an integer: {0}")]
    NotAnInteger(String),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Parse a raw SMS body into a measurement.
pub fn parse_command(text: &str) -> CommandResult<Measurement> {
    let normalized = text.trim().to_uppercase();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    let (command, values) = tokens.split_first().ok_or(CommandError::Empty)?;

    match *command {
        "BP" => {
            let [systolic, diastolic] = expect_values::<2>(command, values)?;
            Ok(Measurement::BloodPressure {
                systolic: parse_value(systolic)?,
                diastolic: parse_value(diastolic)?,
            })
        }
        "SUGAR" => {
            let [level] = expect_values::<1>(command, values)?;
            Ok(Measurement::BloodSugar {
                level: parse_value(level)?,
            })
        }
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn expect_values<'a, const N: usize>(
    command: &str,
    values: &[&'a str],
) -> CommandResult<[&'a str; N]> {
    <[&str; N]>::try_from(values).map_err(|_| CommandError::WrongArity {
        command: command.to_string(),
        expected: N,
        found: values.len(),
    })
}

fn parse_value(token: &str) -> CommandResult<i64> {
    token
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger(token.to_string()))
}
