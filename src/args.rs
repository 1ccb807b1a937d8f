//! The parsed form of one command line.

use crate::error::{Result, ShellError};

/// Ordered arguments of one command line; element 0 is the command name.
///
/// Only the lexer builds these, so a vector always holds at least one
/// element and is never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentVector {
    args: Vec<String>,
}

impl ArgumentVector {
    pub(crate) fn from_tokens(args: Vec<String>) -> Result<Self> {
        if args.is_empty() {
            return Err(ShellError::EmptyInput);
        }
        Ok(Self { args })
    }

    /// Number of arguments, the command name included.
    pub fn count(&self) -> usize {
        self.args.len()
    }

    /// The argument at `index`.
    pub fn at(&self, index: usize) -> Result<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or(ShellError::IndexOutOfRange {
                index,
                count: self.args.len(),
            })
    }

    /// The command name (element 0).
    pub fn command(&self) -> &str {
        &self.args[0]
    }

    /// Everything after the command name.
    pub fn operands(&self) -> &[String] {
        &self.args[1..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for ArgumentVector {
    type Error = ShellError;

    fn try_from(args: Vec<String>) -> Result<Self> {
        Self::from_tokens(args)
    }
}

/// A hyphen followed by at least one character.
pub fn is_option(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> ArgumentVector {
        ArgumentVector::try_from(items.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn count_and_at() {
        let v = argv(&["mv", "a", "b"]);
        assert_eq!(v.count(), 3);
        assert_eq!(v.at(0).unwrap(), "mv");
        assert_eq!(v.at(2).unwrap(), "b");
        assert_eq!(v.command(), "mv");
        assert_eq!(v.operands(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn every_out_of_bound_index_fails() {
        for items in [&["ls"][..], &["echo", "x"][..], &["a", "b", "c", "d"][..]] {
            let v = argv(items);
            for index in v.count()..v.count() + 5 {
                match v.at(index) {
                    Err(ShellError::IndexOutOfRange { index: i, count }) => {
                        assert_eq!(i, index);
                        assert_eq!(count, v.count());
                    }
                    other => panic!("expected IndexOutOfRange, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn empty_vector_is_rejected() {
        assert!(matches!(
            ArgumentVector::try_from(Vec::new()),
            Err(ShellError::EmptyInput)
        ));
    }

    #[test]
    fn option_detection() {
        assert!(is_option("-r"));
        assert!(is_option("-ri"));
        assert!(!is_option("-"));
        assert!(!is_option("r"));
        assert!(!is_option(""));
    }
}
