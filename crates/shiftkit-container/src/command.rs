//! Declarative command lines as loaded from plugin configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered program-plus-arguments token list.
///
/// Commands are immutable once loaded; [`Command::with_arg`] returns a new
/// command with one trailing argument, which is how detect and transform
/// invocations receive their path parameter.
///
/// # Example
///
/// ```
/// use shiftkit_container::Command;
///
/// let detect = Command::new(["python3", "detect.py"]);
/// let invocation = detect.with_arg("/src/app");
/// assert_eq!(invocation.program(), Some("python3"));
/// assert_eq!(invocation.args(), ["detect.py", "/src/app"]);
/// assert_eq!(detect.args(), ["detect.py"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(Vec<String>);

impl Command {
    /// Creates a command from its tokens.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Returns a copy of this command with `arg` appended.
    #[must_use]
    pub fn with_arg(&self, arg: impl Into<String>) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(arg.into());
        Self(tokens)
    }

    /// Returns the program token, if any.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Returns the tokens after the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Returns every token, program included.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` when the command has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}
