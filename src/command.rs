use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use crate::args::{ArgumentVector, is_option};
use crate::env::Environment;
use crate::error::ShellError;
use anyhow::Result;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// How a command reacts to flag characters it does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagPolicy {
    /// Abort the invocation with [`ShellError::InvalidOption`] before doing anything.
    Strict,
    /// Drop unknown flags silently.
    Lenient,
}

/// Static description of a builtin: name, operand arity and flags.
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub min_operands: usize,
    /// `None` means unbounded.
    pub max_operands: Option<usize>,
    /// Flag characters the command understands. Empty for commands that
    /// take no options; such commands treat hyphenated arguments as plain
    /// operands.
    pub flags: &'static [char],
    pub policy: FlagPolicy,
}

impl CommandDescriptor {
    /// Split `args` into flags and operands and check the operand count.
    pub fn parse<'a>(&self, args: &'a ArgumentVector) -> Result<Invocation<'a>, ShellError> {
        let mut flags = OptionFlags::default();
        let mut operands = Vec::with_capacity(args.count().saturating_sub(1));

        for arg in args.operands() {
            if self.flags.is_empty() || !is_option(arg) {
                operands.push(arg.as_str());
                continue;
            }
            for c in arg.chars().skip(1) {
                if self.flags.contains(&c) {
                    flags.set.insert(c);
                } else if self.policy == FlagPolicy::Strict {
                    return Err(ShellError::InvalidOption {
                        command: self.name.to_string(),
                        option: arg.clone(),
                    });
                }
            }
        }

        if operands.len() < self.min_operands {
            return Err(ShellError::MissingOperand {
                command: self.name.to_string(),
            });
        }
        if self.max_operands.is_some_and(|max| operands.len() > max) {
            return Err(ShellError::TooManyArguments {
                command: self.name.to_string(),
            });
        }
        Ok(Invocation { flags, operands })
    }
}

/// Boolean switches collected from hyphen-prefixed arguments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptionFlags {
    set: BTreeSet<char>,
}

impl OptionFlags {
    pub fn has(&self, flag: char) -> bool {
        self.set.contains(&flag)
    }
}

/// Result of [`CommandDescriptor::parse`].
#[derive(Debug)]
pub struct Invocation<'a> {
    pub flags: OptionFlags,
    pub operands: Vec<&'a str>,
}

/// The streams a command reads from and writes to.
pub struct Streams<'a> {
    /// Source of interactive answers, such as the `rm -i` confirmation.
    pub input: &'a mut dyn BufRead,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

/// A command registered with the interpreter.
pub trait Builtin {
    fn descriptor(&self) -> &CommandDescriptor;

    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success,
    /// non-zero for error. Errors are reported by the caller.
    fn execute(
        &self,
        args: &ArgumentVector,
        io: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::split_into_tokens;

    const STRICT: CommandDescriptor = CommandDescriptor {
        name: "rm",
        min_operands: 1,
        max_operands: None,
        flags: &['i', 'r'],
        policy: FlagPolicy::Strict,
    };

    const LENIENT: CommandDescriptor = CommandDescriptor {
        name: "ls",
        min_operands: 0,
        max_operands: None,
        flags: &['a'],
        policy: FlagPolicy::Lenient,
    };

    const PAIR: CommandDescriptor = CommandDescriptor {
        name: "mv",
        min_operands: 2,
        max_operands: Some(2),
        flags: &[],
        policy: FlagPolicy::Lenient,
    };

    #[test]
    fn combined_flags_are_independent() {
        let args = split_into_tokens("rm -ri x y").unwrap();
        let inv = STRICT.parse(&args).unwrap();
        assert!(inv.flags.has('r'));
        assert!(inv.flags.has('i'));
        assert_eq!(inv.operands, ["x", "y"]);
    }

    #[test]
    fn strict_policy_rejects_unknown_flag() {
        let args = split_into_tokens("rm -rx file").unwrap();
        match STRICT.parse(&args) {
            Err(ShellError::InvalidOption { command, option }) => {
                assert_eq!(command, "rm");
                assert_eq!(option, "-rx");
            }
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn lenient_policy_ignores_unknown_flag() {
        let args = split_into_tokens("ls -az").unwrap();
        let inv = LENIENT.parse(&args).unwrap();
        assert!(inv.flags.has('a'));
        assert!(!inv.flags.has('z'));
        assert!(inv.operands.is_empty());
    }

    #[test]
    fn lone_hyphen_is_an_operand() {
        let args = split_into_tokens("rm -").unwrap();
        assert_eq!(STRICT.parse(&args).unwrap().operands, ["-"]);
    }

    #[test]
    fn flags_alone_are_missing_an_operand() {
        let args = split_into_tokens("rm -r").unwrap();
        assert!(matches!(
            STRICT.parse(&args),
            Err(ShellError::MissingOperand { .. })
        ));
    }

    #[test]
    fn arity_bounds() {
        let one = split_into_tokens("mv a").unwrap();
        assert!(matches!(PAIR.parse(&one), Err(ShellError::MissingOperand { .. })));
        let three = split_into_tokens("mv a b c").unwrap();
        assert!(matches!(
            PAIR.parse(&three),
            Err(ShellError::TooManyArguments { .. })
        ));
        let hyphen = split_into_tokens("mv -a b").unwrap();
        assert_eq!(PAIR.parse(&hyphen).unwrap().operands, ["-a", "b"]);
    }
}
