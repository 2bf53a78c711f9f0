//! Commands embedded in radio text
//!
//! Parsing is pure: [`parse`] turns text into either a [`CommandInvocation`]
//! or ordinary relay text. [`CommandRouter`] then dispatches on the closed
//! [`Command`] set.

pub mod calc;
pub mod replies;
mod router;

pub use router::{CommandRouter, Providers};
pub(crate) use router::preview;

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Recognized commands, in the order their prefixes are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum Command {
    #[strum(serialize = "/test")]
    Test,
    #[strum(serialize = "/happy")]
    Happy,
    #[strum(serialize = "/time")]
    Time,
    #[strum(serialize = "/calc")]
    Calc,
    #[strum(serialize = "/translate")]
    Translate,
    #[strum(serialize = "/weather")]
    Weather,
    #[strum(serialize = "/ai")]
    Ai,
    #[strum(serialize = "/help")]
    Help,
}

impl Command {
    pub fn prefix(self) -> &'static str {
        self.into()
    }

    /// Commands whose reply depends on a network call
    pub fn uses_provider(self) -> bool {
        matches!(self, Command::Translate | Command::Weather | Command::Ai)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: Command,
    /// Text after the prefix, trimmed
    pub args: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Command(CommandInvocation),
    /// Not a command: relayed to the chats as is
    Ordinary(String),
}

/// First matching prefix wins; anything else is ordinary text
pub fn parse(text: &str) -> Parsed {
    for command in Command::iter() {
        if let Some(rest) = text.strip_prefix(command.prefix()) {
            return Parsed::Command(CommandInvocation {
                command,
                args: rest.trim().to_string(),
            });
        }
    }
    Parsed::Ordinary(text.to_string())
}

/// Command names for log lines
pub fn command_list() -> String {
    Command::iter()
        .map(Command::prefix)
        .collect::<Vec<_>>()
        .join(", ")
}
