use crate::args::ArgumentVector;
use crate::command::{Builtin, CommandDescriptor, ExitCode, FlagPolicy, Streams};
use crate::env::Environment;
use crate::error::ShellError;
use anyhow::Result;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Launches a program given by a path starting with `.`, e.g. `./hello`.
///
/// The child inherits the terminal's standard streams and starts in the
/// shell's current directory; the shell waits for it to finish.
pub struct RunProgram;

const RUN: CommandDescriptor = CommandDescriptor {
    name: "run",
    min_operands: 0,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl RunProgram {
    /// Whether `name` is dispatched here rather than to the registry.
    pub fn accepts(name: &str) -> bool {
        name.starts_with('.')
    }
}

impl Builtin for RunProgram {
    fn descriptor(&self) -> &CommandDescriptor {
        &RUN
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let program = args.command();
        let path = env.resolve(program);
        let argv: Vec<OsString> = args.operands().iter().map(OsString::from).collect();
        log::debug!("spawning {} with {} argument(s)", path.display(), argv.len());

        io.out.flush()?;
        let mut child = Command::new(&path)
            .args(&argv)
            .current_dir(&env.current_dir)
            .spawn()
            .map_err(|source| spawn_error(program, source))?;
        let exit_status = child.wait()?;
        log::debug!("{program} finished: {exit_status}");
        Ok(match exit_status.code() {
            Some(x) => x,
            None => terminated_by_signal(exit_status),
        })
    }
}

/// Resource exhaustion while creating the child is unrecoverable; anything
/// else (missing file, not executable, ...) is reported and the shell goes on.
fn spawn_error(program: &str, source: io::Error) -> ShellError {
    match source.kind() {
        io::ErrorKind::OutOfMemory | io::ErrorKind::WouldBlock => ShellError::ForkFailed {
            program: program.to_string(),
            source,
        },
        _ => ShellError::Spawn {
            program: program.to_string(),
            source,
        },
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Compiles C sources into executables named after their stem.
pub struct Make {
    compiler: OsString,
}

const MAKE: CommandDescriptor = CommandDescriptor {
    name: "make",
    min_operands: 1,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Make {
    pub fn new(compiler: impl Into<OsString>) -> Self {
        Self {
            compiler: compiler.into(),
        }
    }

    /// Output path for `source`, or `None` unless it names a `.c` file.
    ///
    /// Everything after the first `.` of the file name is the extension,
    /// so `foo.bar.c` is rejected.
    fn output_for(source: &str) -> Option<PathBuf> {
        let path = Path::new(source);
        let file_name = path.file_name()?.to_str()?;
        match file_name.split_once('.') {
            Some((stem, "c")) if !stem.is_empty() => Some(path.with_file_name(stem)),
            _ => None,
        }
    }

    fn compile(&self, source: &str, output: &Path, env: &Environment) -> Result<(), ShellError> {
        log::info!("compiling {source}");
        let status = Command::new(&self.compiler)
            .arg("-o")
            .arg(output)
            .arg(source)
            .current_dir(&env.current_dir)
            .status()
            .map_err(|e| spawn_error(&self.compiler.to_string_lossy(), e))?;
        if !status.success() {
            return Err(ShellError::CompilerFailed {
                source_file: source.to_string(),
                status,
            });
        }
        Ok(())
    }
}

impl Builtin for Make {
    fn descriptor(&self) -> &CommandDescriptor {
        &MAKE
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = MAKE.parse(args)?;
        let mut code = 0;
        for source in inv.operands {
            let Some(output) = Self::output_for(source) else {
                writeln!(
                    io.err,
                    "Error: {}",
                    ShellError::NotCSource {
                        name: source.to_string()
                    }
                )?;
                code = 1;
                continue;
            };
            match self.compile(source, &output, env) {
                Ok(()) => {}
                Err(e @ ShellError::CompilerFailed { .. }) => {
                    log::debug!("{e}");
                    writeln!(io.err, "Error: {e}")?;
                    code = 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(code)
    }
}
