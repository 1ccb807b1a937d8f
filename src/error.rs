//! Error taxonomy for the shell.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Every failure the shell can report, grouped by where it is detected.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    // -- input --
    #[error("command size exceeded ({max} characters max.)")]
    LineTooLong { max: usize },

    #[error("empty input")]
    EmptyInput,

    // -- parsing --
    #[error("memory allocation failed")]
    AllocationFailure,

    // -- arguments --
    #[error("{command}: missing operand")]
    MissingOperand { command: String },

    #[error("{command}: too many arguments")]
    TooManyArguments { command: String },

    #[error("index {index} out of range for {count} argument(s)")]
    IndexOutOfRange { index: usize, count: usize },

    // -- options --
    #[error("{command}: '{option}': invalid option")]
    InvalidOption { command: String, option: String },

    // -- filesystem --
    #[error("cannot open directory '{}': {source}", path.display())]
    CannotOpenDirectory { path: PathBuf, source: io::Error },

    #[error("failed to {op} '{}': {source}", path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    // -- processes --
    #[error("cannot run '{program}': {source}")]
    Spawn { program: String, source: io::Error },

    #[error("fork failed for '{program}': {source}")]
    ForkFailed { program: String, source: io::Error },

    #[error("{source_file}: compilation failed ({status})")]
    CompilerFailed { source_file: String, status: ExitStatus },

    #[error("{name} is not a C source file")]
    NotCSource { name: String },

    // -- dispatch --
    #[error("{name}: command not found")]
    UnknownCommand { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Shorthand for a filesystem failure on `path`.
    pub fn fs(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ShellError::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// Errors that end the whole process instead of returning to the prompt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::ForkFailed { .. })
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;
