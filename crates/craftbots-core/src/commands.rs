//! Chat command parsing and dispatch.
//!
//! A chat line is a command when it starts with `-`. Leading tokens without
//! `=` form the command name; `key=value` tokens after it become arguments
//! (integers where they parse), and stray tokens after the arguments become
//! `arg0`, `arg1`, and so on.
//!
//! Dispatch tries an exact name match first, then the longest registered
//! name that is a whole-word prefix of the command. Words left over after a
//! prefix match are passed to the handler as positional arguments.

use std::collections::BTreeMap;

use craftbots_agents::{ArgValue, CommandArgs};
use tracing::{debug, warn};

use crate::error::CommandError;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommand {
    /// Space-joined command words.
    pub name: String,
    /// Arguments by key.
    pub args: CommandArgs,
}

impl ChatCommand {
    /// Parse a chat line. `None` unless it starts with `-` and has at least
    /// one token.
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.strip_prefix('-')?.trim();
        let mut tokens = body.split_whitespace().peekable();
        let mut words = Vec::new();
        while let Some(token) = tokens.next_if(|t| !t.contains('=')) {
            words.push(token);
        }

        let mut args = CommandArgs::new();
        for token in tokens {
            match token.split_once('=') {
                Some((key, value)) => {
                    args.insert(key.to_owned(), ArgValue::parse(value));
                }
                None => push_positional(&mut args, token),
            }
        }
        if words.is_empty() && args.is_empty() {
            return None;
        }
        Some(Self {
            name: words.join(" "),
            args,
        })
    }
}

fn push_positional(args: &mut CommandArgs, token: &str) {
    let mut index = args.len();
    while args.contains_key(&format!("arg{index}")) {
        index = index.saturating_add(1);
    }
    args.insert(format!("arg{index}"), ArgValue::parse(token));
}

/// A command handler over context `C`. Returns the lines to post back.
pub type Handler<C, E> = fn(&C, &CommandArgs) -> Result<Vec<String>, E>;

/// Outcome of dispatching one chat line.
#[derive(Debug)]
pub enum Dispatch<E> {
    /// The line is not a command.
    NotACommand,
    /// No handler matched.
    NotHandled(String),
    /// A handler ran.
    Handled {
        /// Registered name that matched.
        command: String,
        /// Lines to post back.
        replies: Vec<String>,
    },
    /// A handler returned an error.
    Failed {
        /// Registered name that matched.
        command: String,
        /// What went wrong.
        error: E,
    },
}

/// Command name → handler map.
pub struct CommandDispatcher<C, E> {
    handlers: BTreeMap<String, Handler<C, E>>,
}

impl<C, E> core::fmt::Debug for CommandDispatcher<C, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("commands", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C, E> Default for CommandDispatcher<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> CommandDispatcher<C, E> {
    /// An empty dispatcher.
    pub const fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register `handler` under `name`.
    pub fn register(&mut self, name: &str, handler: Handler<C, E>) -> Result<(), CommandError> {
        let valid = !name.is_empty()
            && name.split(' ').all(|word| {
                !word.is_empty()
                    && word
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            });
        if !valid {
            return Err(CommandError::InvalidName(name.to_owned()));
        }
        if self.handlers.contains_key(name) {
            return Err(CommandError::Duplicate(name.to_owned()));
        }
        self.handlers.insert(name.to_owned(), handler);
        debug!(command = name, "command registered");
        Ok(())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// The registered name `command` resolves to, and the words left over.
    pub fn resolve<'a>(&self, command: &'a str) -> Option<(&str, Vec<&'a str>)> {
        if let Some((name, _)) = self.handlers.get_key_value(command) {
            return Some((name.as_str(), Vec::new()));
        }
        self.handlers
            .keys()
            .filter(|name| {
                command
                    .strip_prefix(name.as_str())
                    .is_some_and(|rest| rest.starts_with(' '))
            })
            .max_by_key(|name| name.len())
            .map(|name| {
                let rest = command.get(name.len()..).unwrap_or_default();
                (name.as_str(), rest.split_whitespace().collect())
            })
    }

    /// Parse `line` and run the matching handler against `context`.
    pub fn dispatch(&self, context: &C, line: &str) -> Dispatch<E>
    where
        E: core::fmt::Display,
    {
        let Some(parsed) = ChatCommand::parse(line) else {
            return Dispatch::NotACommand;
        };
        let Some((name, extra)) = self.resolve(&parsed.name) else {
            debug!(command = %parsed.name, "command not handled");
            return Dispatch::NotHandled(parsed.name);
        };
        let Some(handler) = self.handlers.get(name) else {
            return Dispatch::NotHandled(parsed.name);
        };

        let mut args = CommandArgs::new();
        for word in extra {
            push_positional(&mut args, word);
        }
        for (key, value) in parsed.args {
            if key.starts_with("arg") && args.contains_key(&key) {
                push_positional(&mut args, &value.to_string());
            } else {
                args.insert(key, value);
            }
        }

        match handler(context, &args) {
            Ok(replies) => {
                debug!(command = name, "command executed");
                Dispatch::Handled {
                    command: name.to_owned(),
                    replies,
                }
            }
            Err(error) => {
                warn!(command = name, error = %error, "command failed");
                Dispatch::Failed {
                    command: name.to_owned(),
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    type Echo = CommandDispatcher<(), String>;

    #[allow(clippy::unnecessary_wraps)]
    fn echo(_: &(), args: &CommandArgs) -> Result<Vec<String>, String> {
        Ok(args.iter().map(|(k, v)| format!("{k}={v}")).collect())
    }

    fn fail(_: &(), _: &CommandArgs) -> Result<Vec<String>, String> {
        Err("nope".to_owned())
    }

    #[test]
    fn parses_words_arguments_and_strays() {
        let cmd = ChatCommand::parse("-miner strategy index=1 name=grid extra").unwrap();
        assert_eq!(cmd.name, "miner strategy");
        assert_eq!(cmd.args.get("index"), Some(&ArgValue::Int(1)));
        assert_eq!(cmd.args.get("name"), Some(&ArgValue::Text("grid".to_owned())));
        assert_eq!(cmd.args.get("arg2"), Some(&ArgValue::Text("extra".to_owned())));
        assert!(ChatCommand::parse("hello").is_none());
        assert!(ChatCommand::parse("-   ").is_none());
        assert_eq!(ChatCommand::parse("-  agent   status ").unwrap().name, "agent status");
    }

    #[test]
    fn exact_match_beats_prefix() {
        let mut dispatcher = Echo::new();
        dispatcher.register("agent", fail).unwrap();
        dispatcher.register("agent status", echo).unwrap();
        assert!(matches!(
            dispatcher.dispatch(&(), "-agent status"),
            Dispatch::Handled { ref command, .. } if command == "agent status"
        ));
    }

    #[test]
    fn longest_prefix_wins_and_passes_leftovers() {
        let mut dispatcher = Echo::new();
        dispatcher.register("miner", fail).unwrap();
        dispatcher.register("miner strategy", echo).unwrap();
        assert!(matches!(
            dispatcher.dispatch(&(), "-miner strategy vertical"),
            Dispatch::Handled { ref command, ref replies }
                if command == "miner strategy" && replies == &["arg0=vertical"]
        ));
        assert!(matches!(
            dispatcher.dispatch(&(), "-minerx"),
            Dispatch::NotHandled(name) if name == "minerx"
        ));
    }

    #[test]
    fn unknown_and_failed_commands() {
        let mut dispatcher = Echo::new();
        dispatcher.register("boom", fail).unwrap();
        assert!(matches!(dispatcher.dispatch(&(), "just chatting"), Dispatch::NotACommand));
        assert!(matches!(dispatcher.dispatch(&(), "-dance"), Dispatch::NotHandled(_)));
        assert!(matches!(
            dispatcher.dispatch(&(), "-boom"),
            Dispatch::Failed { error, .. } if error == "nope"
        ));
    }

    #[test]
    fn registration_is_validated() {
        let mut dispatcher = Echo::new();
        assert!(matches!(dispatcher.register("", echo), Err(CommandError::InvalidName(_))));
        assert!(matches!(dispatcher.register("Agent", echo), Err(CommandError::InvalidName(_))));
        assert!(matches!(dispatcher.register("a  b", echo), Err(CommandError::InvalidName(_))));
        dispatcher.register("help", echo).unwrap();
        assert!(matches!(dispatcher.register("help", echo), Err(CommandError::Duplicate(_))));
        assert_eq!(dispatcher.names().collect::<Vec<_>>(), vec!["help"]);
    }
}
