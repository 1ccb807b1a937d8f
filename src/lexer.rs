//! Lexical analysis of a command line into an [`ArgumentVector`].

use crate::args::ArgumentVector;
use crate::error::{Result, ShellError};

const QUOTE: char = '"';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Normal,
    Quoted,
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    /// Set once the current token has content or an opening quote.
    building: bool,
    buffer: String,
    tokens: Vec<String>,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Result<Self> {
        let mut buffer = String::new();
        buffer
            .try_reserve(line.len())
            .map_err(|_| ShellError::AllocationFailure)?;
        Ok(LexingFSM {
            input: line.chars(),
            state: LexingState::Normal,
            building: false,
            buffer,
            tokens: Vec::new(),
        })
    }

    /// Runs the machine over the whole line.
    ///
    /// An unterminated quote is not an error: whatever was collected after
    /// the opening quote becomes the last argument.
    fn make_tokens(mut self) -> Result<Vec<String>> {
        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Normal => self.handle_normal(ch)?,
                LexingState::Quoted => self.handle_quoted(ch),
            }
        }
        if self.building {
            self.flush()?;
        }
        Ok(self.tokens)
    }

    fn handle_normal(&mut self, ch: char) -> Result<()> {
        match ch {
            QUOTE => {
                self.building = true;
                self.state = LexingState::Quoted;
            }
            c if c.is_whitespace() => {
                if self.building {
                    self.flush()?;
                }
            }
            c => {
                self.building = true;
                self.buffer.push(c);
            }
        }
        Ok(())
    }

    fn handle_quoted(&mut self, ch: char) {
        match ch {
            QUOTE => self.state = LexingState::Normal,
            c => self.buffer.push(c),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.tokens
            .try_reserve(1)
            .map_err(|_| ShellError::AllocationFailure)?;
        self.tokens.push(self.buffer.clone());
        self.buffer.clear();
        self.building = false;
        Ok(())
    }
}

/// Splits a trimmed line into arguments, honoring double-quoted spans.
///
/// Fails with [`ShellError::EmptyInput`] when the line holds no argument at
/// all and with [`ShellError::AllocationFailure`] when the token storage
/// cannot grow.
pub fn split_into_tokens(line: &str) -> Result<ArgumentVector> {
    let tokens = LexingFSM::new(line)?.make_tokens()?;
    ArgumentVector::from_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(line: &str) -> Vec<String> {
        split_into_tokens(line).unwrap().iter().map(String::from).collect()
    }

    #[test]
    fn quoted_span_is_one_argument() {
        assert_eq!(lex(r#"echo "hello world" foo"#), ["echo", "hello world", "foo"]);
    }

    #[test]
    fn quotes_are_stripped_so_join_is_not_the_input() {
        let line = r#"echo "a b""#;
        let tokens = lex(line);
        assert_eq!(tokens, ["echo", "a b"]);
        assert_ne!(tokens.join(" "), line);
    }

    #[test]
    fn unterminated_quote_keeps_the_rest_of_the_line() {
        assert_eq!(lex(r#"echo "abc"#), ["echo", "abc"]);
        assert_eq!(lex(r#"echo "abc def  "#), ["echo", "abc def  "]);
    }

    #[test]
    fn last_argument_without_trailing_space_is_kept() {
        assert_eq!(lex("ls -l"), ["ls", "-l"]);
        assert_eq!(lex("x"), ["x"]);
    }

    #[test]
    fn repeated_whitespace_makes_no_empty_tokens() {
        assert_eq!(lex("mv   a \t  b"), ["mv", "a", "b"]);
    }

    #[test]
    fn quote_inside_word_joins_spans() {
        assert_eq!(lex(r#"cat my" "file.txt"#), ["cat", "my file.txt"]);
    }

    #[test]
    fn empty_quotes_make_an_empty_argument() {
        assert_eq!(lex(r#"echo "" x"#), ["echo", "", "x"]);
        assert_eq!(lex(r#""""#), [""]);
    }

    #[test]
    fn backslash_is_literal() {
        assert_eq!(lex(r"echo a\ b"), ["echo", r"a\", "b"]);
    }

    #[test]
    fn blank_lines_fail() {
        for line in ["", "   ", "\t \t"] {
            assert!(matches!(split_into_tokens(line), Err(ShellError::EmptyInput)));
        }
    }
}
