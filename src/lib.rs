//! A tiny interactive command shell.
//!
//! A line of input is read with a length limit, split into arguments by a
//! quote-aware lexer, and dispatched by name to one of a fixed set of
//! builtins: `echo`, `pwd`, `ls`, `cd`, `touch`, `rm`, `mkdir`, `rmdir`,
//! `mv`, `cat` and `make`. Names starting with `.` launch a program. The
//! loop ends on `exit`, matched case-insensitively.
//!
//! The main entry point is [`Interpreter`]. The public modules expose the
//! argument model ([`args`]), the command traits ([`command`]), the lexer,
//! and the recursive deletion walk used by `rm -r` ([`remove`]).

pub mod args;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod lexer;
pub mod reader;
pub mod remove;

pub use args::ArgumentVector;
pub use config::{FrontEnd, ShellConfig};
pub use error::ShellError;
pub use interpreter::{EXIT_SENTINEL, Flow, Interpreter, is_exit_sentinel};
