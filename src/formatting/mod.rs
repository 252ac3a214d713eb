//! Type formatter: renders `RowValues` as SQL literals and substitutes them
//! into query text by position.
//!
//! Placeholders are `$1`..`$N`, optionally followed by a modifier
//! (`:raw`/`^`, `:name`/`~`, `:json`, `:csv`, `:value`/`#`). Placeholders
//! inside string literals, quoted identifiers, comments and dollar-quoted
//! blocks are left alone.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

mod literals;
mod parsers;
mod scanner;

pub use literals::{as_csv, as_json, as_literal, as_raw, as_text, as_value};
pub use scanner::Modifier;

use crate::error::SqlContractDbError;
use crate::types::RowValues;
use parsers::{
    is_block_comment_end, is_block_comment_start, is_escape_string_start, is_line_comment_start,
    matches_tag, try_start_dollar_quote,
};
use scanner::{State, scan_digits, scan_modifier};

static NAME_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"]|"")+"|[^."]+"#).expect("identifier pattern is valid")
});

/// Quote an identifier, treating dots as schema separators.
///
/// Parts that are already double-quoted are kept as they are.
/// ```rust
/// use sql_contract::formatting::as_name;
///
/// assert_eq!(as_name("public.users").unwrap(), r#""public"."users""#);
/// assert_eq!(as_name(r#""Odd.Name""#).unwrap(), r#""Odd.Name""#);
/// ```
///
/// # Errors
/// Returns `SqlContractDbError::ParameterError` for empty or malformed names.
pub fn as_name(name: &str) -> Result<String, SqlContractDbError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SqlContractDbError::ParameterError(
            "identifier must not be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = NAME_PART.find_iter(trimmed).map(|m| m.as_str()).collect();
    if parts.join(".") != trimmed {
        return Err(SqlContractDbError::ParameterError(format!(
            "invalid identifier: {name}"
        )));
    }

    let quoted: Vec<String> = parts
        .into_iter()
        .map(|part| {
            if part.starts_with('"') {
                part.to_string()
            } else {
                format!("\"{}\"", part.replace('"', "\"\""))
            }
        })
        .collect();
    Ok(quoted.join("."))
}

/// Render one parameter under a modifier.
///
/// # Errors
/// Returns `SqlContractDbError::ParameterError` when the value does not suit the modifier.
pub fn format_value(value: &RowValues, modifier: Modifier) -> Result<String, SqlContractDbError> {
    Ok(match modifier {
        Modifier::Default => as_literal(value),
        Modifier::Raw => as_raw(value),
        Modifier::Name => literals::as_names(value)?,
        Modifier::Json => as_json(value),
        Modifier::Csv => as_csv(value),
        Modifier::Value => as_value(value),
    })
}

/// Substitute `params` into `sql`.
///
/// Returns a borrowed `Cow` when the text has no placeholders.
/// ```rust
/// use sql_contract::prelude::*;
///
/// let sql = format_query(
///     "SELECT * FROM $1:name WHERE id = $2 AND note <> '$2'",
///     &[RowValues::Text("users".into()), RowValues::Int(7)],
/// )?;
/// assert_eq!(sql, r#"SELECT * FROM "users" WHERE id = 7 AND note <> '$2'"#);
/// # Ok::<(), SqlContractDbError>(())
/// ```
///
/// # Errors
/// Returns `SqlContractDbError::ParameterError` when a placeholder refers past
/// the end of `params` (or is `$0`), or a value does not suit its modifier.
pub fn format_query<'a>(
    sql: &'a str,
    params: &[RowValues],
) -> Result<Cow<'a, str>, SqlContractDbError> {
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' if is_escape_string_start(bytes, idx) => state = State::EscapeQuoted,
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    } else if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        let value = lookup(params, digits)?;
                        let (modifier, end) = scan_modifier(bytes, digits_end);
                        let rendered = format_value(value, modifier)?;

                        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                        buf.push_str(&sql[copied..idx]);
                        buf.push_str(&rendered);
                        copied = end;
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::EscapeQuoted => match b {
                b'\\' => idx += 1,
                b'\'' if bytes.get(idx + 1) == Some(&b'\'') => idx += 1,
                b'\'' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Ok(Cow::Owned(buf))
        }
        None => Ok(Cow::Borrowed(sql)),
    }
}

/// Whether `sql` holds more than one statement: a `;` outside quotes,
/// comments and dollar quotes that is followed by anything but whitespace,
/// comments or more semicolons.
#[cfg_attr(not(feature = "postgres"), allow(dead_code))]
pub(crate) fn is_multi_statement(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut separated = false;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b';' => separated = true,
                _ if b.is_ascii_whitespace() => {}
                _ if separated => return true,
                b'\'' if is_escape_string_start(bytes, idx) => state = State::EscapeQuoted,
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                _ => {}
            },
            State::SingleQuoted | State::EscapeQuoted => {
                if b == b'\\' && matches!(state, State::EscapeQuoted) {
                    idx += 1;
                } else if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }
    false
}

fn lookup<'p>(params: &'p [RowValues], digits: &str) -> Result<&'p RowValues, SqlContractDbError> {
    let position: usize = digits.parse().map_err(|_| {
        SqlContractDbError::ParameterError(format!("placeholder ${digits} is out of range"))
    })?;
    position
        .checked_sub(1)
        .and_then(|i| params.get(i))
        .ok_or_else(|| {
            SqlContractDbError::ParameterError(format!(
                "placeholder ${position} has no value ({} parameter(s) supplied)",
                params.len()
            ))
        })
}
