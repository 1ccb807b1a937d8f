use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Mutable per-shell state handed to every command.
///
/// The environment contains:
/// - `current_dir`: the directory relative paths are resolved against and
///   child processes start in. Only `cd` changes it; the process working
///   directory itself is never touched.
/// - `should_exit`: set when the loop has seen the exit sentinel.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, the read-eval loop stops after the current line.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the process working directory into a new `Environment`.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::at(current_dir)
    }

    /// An environment rooted at `dir`.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: dir.into(),
            should_exit: false,
        }
    }

    /// Resolve `path` against the current directory; absolute paths pass through.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
