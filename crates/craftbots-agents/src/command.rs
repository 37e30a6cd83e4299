//! Arguments carried by operator commands.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AgentError;

/// A parsed `key=value` argument: an integer when it parses as one, text
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Integer argument.
    Int(i64),
    /// Anything else.
    Text(String),
}

impl ArgValue {
    /// Classify a raw token value.
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map_or_else(|_not_int| Self::Text(raw.to_owned()), Self::Int)
    }
}

impl core::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Command arguments by key.
pub type CommandArgs = BTreeMap<String, ArgValue>;

/// Text argument `key`, if present. Integers are rendered as text.
pub fn text_arg(args: &CommandArgs, key: &str) -> Option<String> {
    args.get(key).map(ToString::to_string)
}

/// Non-negative integer argument `key`, if present.
pub fn index_arg(args: &CommandArgs, key: &str) -> Result<Option<usize>, AgentError> {
    match args.get(key) {
        None => Ok(None),
        Some(ArgValue::Int(v)) => usize::try_from(*v)
            .map(Some)
            .map_err(|_negative| AgentError::InvalidArgument {
                name: key.to_owned(),
                reason: format!("{v} is not a valid index"),
            }),
        Some(ArgValue::Text(v)) => Err(AgentError::InvalidArgument {
            name: key.to_owned(),
            reason: format!("expected an integer, got {v:?}"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_ints_and_text() {
        assert_eq!(ArgValue::parse("42"), ArgValue::Int(42));
        assert_eq!(ArgValue::parse("-3"), ArgValue::Int(-3));
        assert_eq!(ArgValue::parse("grid"), ArgValue::Text("grid".to_owned()));
    }

    #[test]
    fn index_arg_validates() {
        let mut args = CommandArgs::new();
        args.insert("index".to_owned(), ArgValue::Int(1));
        args.insert("bad".to_owned(), ArgValue::Int(-1));
        args.insert("word".to_owned(), ArgValue::parse("one"));
        assert_eq!(index_arg(&args, "index").unwrap(), Some(1));
        assert_eq!(index_arg(&args, "missing").unwrap(), None);
        assert!(index_arg(&args, "bad").is_err());
        assert!(index_arg(&args, "word").is_err());
    }

    #[test]
    fn text_arg_renders_ints() {
        let mut args = CommandArgs::new();
        args.insert("name".to_owned(), ArgValue::Int(7));
        assert_eq!(text_arg(&args, "name").as_deref(), Some("7"));
    }
}
