use crate::args::ArgumentVector;
use crate::builtin;
use crate::command::{Builtin, ExitCode, Streams};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{Make, RunProgram};
use crate::lexer;
use crate::reader::{self, LineReader};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// Keyword that ends the loop. Matched case-insensitively, unlike every
/// registered command name.
pub const EXIT_SENTINEL: &str = "exit";

/// Whether a trimmed input line is the exit keyword in any letter case.
///
/// The whole line is compared, so `exit now` or a quoted `"exit"` is an
/// ordinary (unknown) command.
pub fn is_exit_sentinel(line: &str) -> bool {
    line.eq_ignore_ascii_case(EXIT_SENTINEL)
}

/// What the loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// A minimal read-eval loop over a fixed registry of builtins.
///
/// The interpreter owns the [`Environment`] and a registry mapping each
/// command name to its handler. Lookup is exact and case-sensitive; names
/// starting with `.` that are not registered launch an external program.
///
/// Example
/// ```
/// use minishell::{Interpreter, ShellConfig};
/// let mut sh = Interpreter::new(ShellConfig::default()).unwrap();
/// let mut input: &[u8] = b"echo \"hello world\"\nexit\n";
/// let (mut out, mut err) = (Vec::new(), Vec::new());
/// sh.run(&mut input, &mut out, &mut err).unwrap();
/// assert!(String::from_utf8(out).unwrap().contains("hello world\n"));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: HashMap<&'static str, Box<dyn Builtin>>,
    runner: RunProgram,
    reader: LineReader,
    config: ShellConfig,
}

impl Interpreter {
    /// Create an interpreter with the default builtins, rooted at the
    /// process working directory.
    ///
    /// Fails with [`ShellError::AllocationFailure`] when the input buffer
    /// cannot be allocated.
    pub fn new(config: ShellConfig) -> Result<Self, ShellError> {
        Self::with_env(config, Environment::new())
    }

    /// Same as [`Interpreter::new`] with an explicit starting environment.
    pub fn with_env(config: ShellConfig, env: Environment) -> Result<Self, ShellError> {
        let reader = LineReader::new(config.max_line_len)?;
        let mut sh = Self {
            env,
            commands: HashMap::new(),
            runner: RunProgram,
            reader,
            config,
        };
        for cmd in builtin::all() {
            sh.register(cmd);
        }
        sh.register(Box::new(Make::new(sh.config.compiler.clone())));
        Ok(sh)
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Builtin>) {
        self.commands.insert(cmd.descriptor().name, cmd);
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run the handler for `args`.
    ///
    /// Unknown non-empty names fail with [`ShellError::UnknownCommand`]; an
    /// empty name (a line consisting of `""`) does nothing.
    pub fn dispatch(
        &mut self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
    ) -> anyhow::Result<ExitCode> {
        let name = args.command();
        if let Some(cmd) = self.commands.get(name) {
            log::debug!("dispatch {name} ({} argument(s))", args.count() - 1);
            return cmd.execute(args, io, &mut self.env);
        }
        if name.is_empty() {
            return Ok(0);
        }
        if RunProgram::accepts(name) {
            return self.runner.execute(args, io, &mut self.env);
        }
        Err(ShellError::UnknownCommand {
            name: name.to_string(),
        }
        .into())
    }

    /// Tokenize and execute one already-trimmed line.
    ///
    /// Errors are printed to `io.err` and swallowed; only fatal errors are
    /// returned.
    pub fn eval_line(&mut self, line: &str, io: &mut Streams<'_>) -> anyhow::Result<Flow> {
        if is_exit_sentinel(line) {
            self.env.should_exit = true;
            return Ok(Flow::Exit);
        }

        let args = match lexer::split_into_tokens(line) {
            Ok(args) => args,
            Err(ShellError::EmptyInput) => return Ok(Flow::Continue),
            Err(e) => {
                report(io.err, &e.into())?;
                return Ok(Flow::Continue);
            }
        };

        match self.dispatch(&args, io) {
            Ok(code) => {
                if code != 0 {
                    log::debug!("{} exited with {code}", args.command());
                }
            }
            Err(e) => {
                if e.downcast_ref::<ShellError>().is_some_and(ShellError::is_fatal) {
                    return Err(e);
                }
                log::debug!("{} failed: {e}", args.command());
                report(io.err, &e)?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Read-eval loop over any buffered input, using the bounded reader.
    ///
    /// The same `input` answers interactive questions such as `rm -i`.
    /// Returns at the exit sentinel or end of input.
    pub fn run<R, W, E>(&mut self, input: &mut R, out: &mut W, err: &mut E) -> anyhow::Result<()>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        loop {
            write!(out, "{}", self.config.prompt)?;
            out.flush()?;

            let line = match self.reader.read_line(input) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::info!("end of input");
                    break;
                }
                Err(ShellError::EmptyInput) => continue,
                Err(e @ ShellError::LineTooLong { .. }) => {
                    report(err, &e.into())?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let mut io = Streams {
                input: &mut *input,
                out: &mut *out,
                err: &mut *err,
            };
            if self.eval_line(&line, &mut io)? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// Interactive loop on the terminal with line editing.
    ///
    /// Lines pass the same length and trim checks as [`Interpreter::run`];
    /// nothing is added to the editor's history.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            let readline = rl.readline(&self.config.prompt);
            match readline {
                Ok(raw) => {
                    let stdin = std::io::stdin();
                    let stdout = std::io::stdout();
                    let stderr = std::io::stderr();
                    let (mut input, mut out, mut err) =
                        (stdin.lock(), stdout.lock(), stderr.lock());

                    let line = match reader::validate(&raw, self.config.max_line_len) {
                        Ok(line) => line,
                        Err(ShellError::EmptyInput) => continue,
                        Err(e) => {
                            report(&mut err, &e.into())?;
                            continue;
                        }
                    };
                    let mut io = Streams {
                        input: &mut input,
                        out: &mut out,
                        err: &mut err,
                    };
                    if self.eval_line(&line, &mut io)? == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }
}

fn report(err: &mut dyn Write, e: &anyhow::Error) -> std::io::Result<()> {
    writeln!(err, "Error: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Counts how often it runs.
    struct Counter {
        calls: Rc<Cell<usize>>,
    }

    const COUNTER: crate::command::CommandDescriptor = crate::command::CommandDescriptor {
        name: "counter",
        min_operands: 0,
        max_operands: None,
        flags: &[],
        policy: crate::command::FlagPolicy::Lenient,
    };

    impl Builtin for Counter {
        fn descriptor(&self) -> &crate::command::CommandDescriptor {
            &COUNTER
        }

        fn execute(
            &self,
            _args: &ArgumentVector,
            _io: &mut Streams<'_>,
            _env: &mut Environment,
        ) -> anyhow::Result<ExitCode> {
            self.calls.set(self.calls.get() + 1);
            Ok(0)
        }
    }

    /// Fails with a process error; `fatal` picks fork failure over a
    /// plain spawn error.
    struct Failing {
        fatal: bool,
    }

    const FORKS: crate::command::CommandDescriptor = crate::command::CommandDescriptor {
        name: "forks",
        ..COUNTER
    };

    const SPAWNS: crate::command::CommandDescriptor = crate::command::CommandDescriptor {
        name: "spawns",
        ..COUNTER
    };

    impl Builtin for Failing {
        fn descriptor(&self) -> &crate::command::CommandDescriptor {
            if self.fatal { &FORKS } else { &SPAWNS }
        }

        fn execute(
            &self,
            _args: &ArgumentVector,
            _io: &mut Streams<'_>,
            _env: &mut Environment,
        ) -> anyhow::Result<ExitCode> {
            let program = self.descriptor().name.to_string();
            let source = std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no memory");
            let e = if self.fatal {
                ShellError::ForkFailed { program, source }
            } else {
                ShellError::Spawn { program, source }
            };
            Err(e.into())
        }
    }

    fn shell() -> (tempfile::TempDir, Interpreter) {
        let tmp = tempfile::tempdir().unwrap();
        let env = Environment::at(tmp.path());
        let sh = Interpreter::with_env(ShellConfig::default(), env).unwrap();
        (tmp, sh)
    }

    fn dispatch_line(sh: &mut Interpreter, line: &str) -> anyhow::Result<ExitCode> {
        let args = lexer::split_into_tokens(line).unwrap();
        let mut input = Cursor::new(Vec::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        sh.dispatch(
            &args,
            &mut Streams {
                input: &mut input,
                out: &mut out,
                err: &mut err,
            },
        )
    }

    #[test]
    fn registry_has_every_builtin() {
        let (_tmp, sh) = shell();
        assert_eq!(
            sh.command_names(),
            ["cat", "cd", "echo", "ls", "make", "mkdir", "mv", "pwd", "rm", "rmdir", "touch"]
        );
    }

    #[test]
    fn unknown_command_names_it_and_runs_nothing() {
        let (_tmp, mut sh) = shell();
        let calls = Rc::new(Cell::new(0));
        sh.register(Box::new(Counter {
            calls: calls.clone(),
        }));

        let err = dispatch_line(&mut sh, "foo bar").unwrap_err();
        match err.downcast_ref::<ShellError>() {
            Some(ShellError::UnknownCommand { name }) => assert_eq!(name, "foo"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
        assert_eq!(calls.get(), 0);

        dispatch_line(&mut sh, "counter").unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn registry_lookup_is_case_sensitive() {
        let (_tmp, mut sh) = shell();
        let err = dispatch_line(&mut sh, "Echo hi").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShellError>(),
            Some(ShellError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn exit_sentinel_ignores_case() {
        for name in ["exit", "EXIT", "Exit", "eXiT"] {
            assert!(is_exit_sentinel(name));
        }
        assert!(!is_exit_sentinel("exits"));
        assert!(!is_exit_sentinel("quit"));
        assert!(!is_exit_sentinel("exit now"));
        assert!(!is_exit_sentinel("\"exit\""));
    }

    #[test]
    fn eval_line_stops_on_sentinel_only() {
        let (_tmp, mut sh) = shell();
        let mut input = Cursor::new(Vec::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut io = Streams {
            input: &mut input,
            out: &mut out,
            err: &mut err,
        };
        assert_eq!(sh.eval_line("echo x", &mut io).unwrap(), Flow::Continue);
        assert_eq!(sh.eval_line("EXIT", &mut io).unwrap(), Flow::Exit);
        assert!(sh.env().should_exit);
    }

    #[test]
    fn empty_quoted_name_is_ignored() {
        let (_tmp, mut sh) = shell();
        assert_eq!(dispatch_line(&mut sh, r#""""#).unwrap(), 0);
    }

    #[test]
    fn only_fork_failure_escapes_the_loop() {
        let (_tmp, mut sh) = shell();
        sh.register(Box::new(Failing { fatal: false }));
        sh.register(Box::new(Failing { fatal: true }));

        let mut input = Cursor::new(b"spawns\nforks\necho unreachable\n".to_vec());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let e = sh.run(&mut input, &mut out, &mut err).unwrap_err();

        assert!(matches!(
            e.downcast_ref::<ShellError>(),
            Some(ShellError::ForkFailed { .. })
        ));
        let err = String::from_utf8(err).unwrap();
        assert_eq!(err, "Error: cannot run 'spawns': no memory\n");
        assert!(!String::from_utf8(out).unwrap().contains("unreachable"));
    }

    #[test]
    fn exit_with_arguments_is_not_the_sentinel() {
        let (_tmp, mut sh) = shell();
        let mut input = Cursor::new(Vec::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut io = Streams {
            input: &mut input,
            out: &mut out,
            err: &mut err,
        };
        assert_eq!(sh.eval_line("exit now", &mut io).unwrap(), Flow::Continue);
        assert_eq!(sh.eval_line("\"exit\"", &mut io).unwrap(), Flow::Continue);
        assert!(!sh.env().should_exit);
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Error: exit: command not found\nError: exit: command not found\n"
        );
    }
}
