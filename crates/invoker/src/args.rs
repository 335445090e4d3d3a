//! Argument normalization for subprocess invocations.
//!
//! Callers historically passed either a single scalar argument or a
//! sequence that may contain absent entries. Both forms normalize to a
//! plain ordered `Vec<String>` before the process is spawned.

/// Arguments for one invocation, in either the legacy singular form or
/// the sequence form.
#[derive(Debug, Clone)]
pub enum ScriptArgs {
    /// Legacy form: a single scalar argument.
    One(String),
    /// Sequence form. Absent entries are dropped during normalization.
    Many(Vec<Option<String>>),
}

impl ScriptArgs {
    /// Produce the final ordered argument list passed to the process.
    ///
    /// The singular form becomes a one-element sequence; absent entries
    /// in the sequence form are removed. Relative order of the
    /// remaining entries is preserved.
    pub fn normalize(self) -> Vec<String> {
        match self {
            Self::One(arg) => vec![arg],
            Self::Many(args) => args.into_iter().flatten().collect(),
        }
    }
}

impl Default for ScriptArgs {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl From<String> for ScriptArgs {
    fn from(arg: String) -> Self {
        Self::One(arg)
    }
}

impl From<&str> for ScriptArgs {
    fn from(arg: &str) -> Self {
        Self::One(arg.to_string())
    }
}

impl From<Vec<String>> for ScriptArgs {
    fn from(args: Vec<String>) -> Self {
        Self::Many(args.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<String>>> for ScriptArgs {
    fn from(args: Vec<Option<String>>) -> Self {
        Self::Many(args)
    }
}
