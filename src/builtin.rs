use crate::args::ArgumentVector;
use crate::command::{Builtin, CommandDescriptor, ExitCode, FlagPolicy, Invocation, Streams};
use crate::env::Environment;
use crate::error::ShellError;
use crate::remove;
use anyhow::Result;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Permission bits for files and directories the shell creates: rwxr--r--.
#[cfg(unix)]
const CREATE_MODE: u32 = 0o744;

/// Builtins registered by default.
pub(crate) fn all() -> Vec<Box<dyn Builtin>> {
    vec![
        Box::new(Echo),
        Box::new(Pwd),
        Box::new(Ls),
        Box::new(Cd),
        Box::new(Touch),
        Box::new(Rm),
        Box::new(Mkdir),
        Box::new(Rmdir),
        Box::new(Mv),
        Box::new(Cat),
    ]
}

fn parse<'a>(desc: &CommandDescriptor, args: &'a ArgumentVector) -> Result<Invocation<'a>> {
    Ok(desc.parse(args)?)
}

/// Resolve a path operand against the shell's directory.
///
/// An empty operand (`""`) names no file; it fails as missing instead of
/// resolving to the current directory itself.
fn operand_path(env: &Environment, op: &'static str, name: &str) -> Result<PathBuf, ShellError> {
    if name.is_empty() {
        return Err(ShellError::fs(
            op,
            name,
            io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }
    Ok(env.resolve(name))
}

/// Write the arguments to standard output, separated by spaces.
pub struct Echo;

const ECHO: CommandDescriptor = CommandDescriptor {
    name: "echo",
    min_operands: 0,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Echo {
    fn descriptor(&self) -> &CommandDescriptor {
        &ECHO
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&ECHO, args)?;
        writeln!(io.out, "{}", inv.operands.join(" "))?;
        Ok(0)
    }
}

/// Print the current working directory to standard output.
pub struct Pwd;

const PWD: CommandDescriptor = CommandDescriptor {
    name: "pwd",
    min_operands: 0,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Pwd {
    fn descriptor(&self) -> &CommandDescriptor {
        &PWD
    }

    fn execute(
        &self,
        _args: &ArgumentVector,
        io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(io.out, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

/// List the content of the current directory.
pub struct Ls;

const LS: CommandDescriptor = CommandDescriptor {
    name: "ls",
    min_operands: 0,
    max_operands: None,
    flags: &['a', 'l'],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Ls {
    fn descriptor(&self) -> &CommandDescriptor {
        &LS
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&LS, args)?;
        let show_hidden = inv.flags.has('a');
        let details = inv.flags.has('l');
        let dir = &env.current_dir;

        let read = fs::read_dir(dir).map_err(|source| ShellError::CannotOpenDirectory {
            path: dir.clone(),
            source,
        })?;
        let mut names = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| ShellError::fs("read directory", dir, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.retain(|n| show_hidden || !n.starts_with('.'));
        if show_hidden {
            names.push(".".to_string());
            names.push("..".to_string());
        }
        names.sort();

        if details {
            writeln!(io.out, "mode\t\tsize\tname")?;
        }
        for name in names {
            if details {
                match fs::symlink_metadata(dir.join(&name)) {
                    Ok(meta) => {
                        writeln!(io.out, "{}\t{}\t{}", mode_string(&meta), meta.len(), name)?
                    }
                    Err(e) => {
                        log::debug!("stat {name}: {e}");
                        writeln!(io.out, "??????????\t?\t{name}")?;
                    }
                }
            } else {
                writeln!(io.out, "{name}")?;
            }
        }
        Ok(0)
    }
}

/// Ten-character `ls -l` style mode column, e.g. `drwxr-xr--`.
#[cfg(unix)]
fn mode_string(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    let mut s = String::with_capacity(10);
    let kind = meta.file_type();
    s.push(if kind.is_dir() {
        'd'
    } else if kind.is_symlink() {
        'l'
    } else {
        '-'
    });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(not(unix))]
fn mode_string(meta: &fs::Metadata) -> String {
    let kind = if meta.is_dir() {
        'd'
    } else if meta.file_type().is_symlink() {
        'l'
    } else {
        '-'
    };
    let write = if meta.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}-r{write}-r{write}-")
}

/// Change the current working directory.
pub struct Cd;

const CD: CommandDescriptor = CommandDescriptor {
    name: "cd",
    min_operands: 1,
    max_operands: Some(1),
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Cd {
    fn descriptor(&self) -> &CommandDescriptor {
        &CD
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        _io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&CD, args)?;
        let target = operand_path(env, "enter", inv.operands[0])?;

        let canonical =
            fs::canonicalize(&target).map_err(|e| ShellError::fs("enter", &target, e))?;
        if !canonical.is_dir() {
            return Err(ShellError::fs(
                "enter",
                target,
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            )
            .into());
        }
        log::debug!("cd {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

/// Create empty files.
pub struct Touch;

const TOUCH: CommandDescriptor = CommandDescriptor {
    name: "touch",
    min_operands: 1,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Touch {
    fn descriptor(&self) -> &CommandDescriptor {
        &TOUCH
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        _io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&TOUCH, args)?;
        for name in inv.operands {
            let path = operand_path(env, "create", name)?;
            let mut options = fs::OpenOptions::new();
            options.create(true).append(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(CREATE_MODE);
            }
            options
                .open(&path)
                .map_err(|e| ShellError::fs("create", name, e))?;
        }
        Ok(0)
    }
}

/// Remove files or directories.
pub struct Rm;

const RM: CommandDescriptor = CommandDescriptor {
    name: "rm",
    min_operands: 1,
    max_operands: None,
    flags: &['i', 'd', 'r'],
    policy: FlagPolicy::Strict,
};

impl Builtin for Rm {
    fn descriptor(&self) -> &CommandDescriptor {
        &RM
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&RM, args)?;
        let recursive = inv.flags.has('r');
        let empty_dirs = inv.flags.has('d');

        let mut targets = Vec::with_capacity(inv.operands.len());
        for name in &inv.operands {
            let path = operand_path(env, "remove", name)?;
            if is_dot_or_dot_dot(name) {
                return Err(ShellError::fs(
                    "remove",
                    *name,
                    io::Error::new(io::ErrorKind::InvalidInput, "refusing to remove '.' or '..'"),
                )
                .into());
            }
            targets.push((*name, path));
        }

        if inv.flags.has('i') && !confirm(io, &inv.operands)? {
            log::debug!("rm cancelled");
            return Ok(0);
        }

        for (name, path) in targets {
            let is_dir = fs::symlink_metadata(&path)
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir && recursive {
                remove::delete_tree(&path)?;
            } else if is_dir && empty_dirs {
                fs::remove_dir(&path).map_err(|e| ShellError::fs("remove", name, e))?;
            } else {
                fs::remove_file(&path).map_err(|e| ShellError::fs("remove", name, e))?;
            }
        }
        Ok(0)
    }
}

/// Whether the last component of `name` is `.` or `..`.
fn is_dot_or_dot_dot(name: &str) -> bool {
    // `components` drops a `.` that follows a name, as in `a/.`.
    name.trim_end_matches('/').ends_with("/.")
        || matches!(
            Path::new(name).components().next_back(),
            Some(Component::CurDir | Component::ParentDir)
        )
}

/// Ask once for all `targets`; only an answer starting with `y` proceeds.
fn confirm(io: &mut Streams<'_>, targets: &[&str]) -> Result<bool> {
    for target in targets {
        writeln!(io.out, "Warning: Remove '{target}'?")?;
    }
    write!(io.out, "->[y/N] ")?;
    io.out.flush()?;

    let mut answer = String::new();
    io.input.read_line(&mut answer)?;
    Ok(matches!(answer.trim_start().chars().next(), Some('y' | 'Y')))
}

/// Create directories.
pub struct Mkdir;

const MKDIR: CommandDescriptor = CommandDescriptor {
    name: "mkdir",
    min_operands: 1,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Mkdir {
    fn descriptor(&self) -> &CommandDescriptor {
        &MKDIR
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        _io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&MKDIR, args)?;
        for name in inv.operands {
            let mut builder = fs::DirBuilder::new();
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(CREATE_MODE);
            }
            builder
                .create(operand_path(env, "create", name)?)
                .map_err(|e| ShellError::fs("create", name, e))?;
        }
        Ok(0)
    }
}

/// Remove empty directories.
pub struct Rmdir;

const RMDIR: CommandDescriptor = CommandDescriptor {
    name: "rmdir",
    min_operands: 1,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Rmdir {
    fn descriptor(&self) -> &CommandDescriptor {
        &RMDIR
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        _io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&RMDIR, args)?;
        for name in inv.operands {
            let path = operand_path(env, "remove", name)?;
            fs::remove_dir(path).map_err(|e| ShellError::fs("remove", name, e))?;
        }
        Ok(0)
    }
}

/// Rename or move a file.
pub struct Mv;

const MV: CommandDescriptor = CommandDescriptor {
    name: "mv",
    min_operands: 2,
    max_operands: Some(2),
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Mv {
    fn descriptor(&self) -> &CommandDescriptor {
        &MV
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        _io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&MV, args)?;
        let (from, to) = (inv.operands[0], inv.operands[1]);
        let (source, dest) = (
            operand_path(env, "rename", from)?,
            operand_path(env, "rename", to)?,
        );
        fs::rename(source, dest)
            .map_err(|e| ShellError::fs("rename", from, e))?;
        Ok(0)
    }
}

/// Print files to standard output.
pub struct Cat;

const CAT: CommandDescriptor = CommandDescriptor {
    name: "cat",
    min_operands: 1,
    max_operands: None,
    flags: &[],
    policy: FlagPolicy::Lenient,
};

impl Builtin for Cat {
    fn descriptor(&self) -> &CommandDescriptor {
        &CAT
    }

    fn execute(
        &self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let inv = parse(&CAT, args)?;
        for name in inv.operands {
            let path = operand_path(env, "open", name)?;
            let content = read_file(&path).map_err(|e| ShellError::fs("open", name, e))?;
            io.out.write_all(&content)?;
            if content.last() != Some(&b'\n') {
                writeln!(io.out)?;
            }
        }
        Ok(0)
    }
}

fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    fs::File::open(path)?.read_to_end(&mut buf)?;
    Ok(buf)
}
