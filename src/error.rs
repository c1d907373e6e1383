use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single rule broken by a definition, reported by generation and `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub name: String,
    pub rule: ViolationRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationRule {
    Empty,
    InvalidIdentifier,
    Keyword,
    Duplicate,
    ActiveAndRemoved,
    /// Member present in the generated file was renamed or dropped
    Protected,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { "<empty>" } else { &self.name };
        match self.rule {
            ViolationRule::Empty => write!(f, "{}: name is empty", name),
            ViolationRule::InvalidIdentifier => write!(f, "{}: not a valid identifier", name),
            ViolationRule::Keyword => write!(f, "{}: reserved C# keyword", name),
            ViolationRule::Duplicate => write!(f, "{}: duplicate value", name),
            ViolationRule::ActiveAndRemoved => {
                write!(f, "{}: listed as both active and removed", name)
            }
            ViolationRule::Protected => write!(
                f,
                "{}: exists in the generated file and cannot be renamed or dropped",
                name
            ),
        }
    }
}

/// Text that contains no recognizable enum declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("enum '{enum_name}' failed validation: {}", join_violations(violations))]
    Validation {
        enum_name: String,
        violations: Vec<Violation>,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid definition record {}: {message}", path.display())]
    Store { path: PathBuf, message: String },

    #[error("no enum definition named '{0}'")]
    UnknownDefinition(String),

    #[error("enum '{enum_name}' has no value named '{value}'")]
    UnknownValue { enum_name: String, value: String },

    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("enum '{0}' has no numbers left for new values")]
    NumbersExhausted(String),

    #[error("{} declares no enum named '{enum_name}'", path.display())]
    EnumNotFound { path: PathBuf, enum_name: String },
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SyncError>;
