//! Bounded line input.

use std::io::BufRead;

use crate::error::{Result, ShellError};

/// Longest UTF-8 encoding of a single character.
const MAX_CHAR_BYTES: usize = 4;

/// Reads one line at a time, refusing lines longer than `max_len` characters.
#[derive(Debug)]
pub struct LineReader {
    max_len: usize,
    buf: Vec<u8>,
}

impl LineReader {
    /// Allocates the input buffer up front; fails when it cannot be reserved.
    pub fn new(max_len: usize) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve(max_len.saturating_mul(MAX_CHAR_BYTES))
            .map_err(|_| ShellError::AllocationFailure)?;
        Ok(Self { max_len, buf })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Reads the next line from `input`.
    ///
    /// Returns `Ok(None)` at end of input. An over-long line is consumed up
    /// to its newline before [`ShellError::LineTooLong`] is returned, so the
    /// next call starts on a fresh line.
    pub fn read_line<R: BufRead + ?Sized>(&mut self, input: &mut R) -> Result<Option<String>> {
        self.buf.clear();
        let byte_cap = self.max_len.saturating_mul(MAX_CHAR_BYTES);
        let mut overflow = false;
        let mut saw_any = false;

        loop {
            let chunk = input.fill_buf()?;
            if chunk.is_empty() {
                break;
            }
            saw_any = true;
            let (line_part, done) = match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => (&chunk[..i], Some(i + 1)),
                None => (chunk, None),
            };
            if !overflow {
                let room = byte_cap.saturating_sub(self.buf.len());
                if line_part.len() > room {
                    overflow = true;
                } else {
                    self.buf.extend_from_slice(line_part);
                }
            }
            let consumed = done.unwrap_or(chunk.len());
            input.consume(consumed);
            if done.is_some() {
                break;
            }
        }

        if !saw_any {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&self.buf);
        if overflow || text.chars().count() > self.max_len {
            log::debug!("discarded an over-long input line");
            return Err(ShellError::LineTooLong { max: self.max_len });
        }
        validate(&text, self.max_len).map(Some)
    }
}

/// Applies the length limit and trimming to a line obtained elsewhere.
pub fn validate(line: &str, max_len: usize) -> Result<String> {
    if line.chars().count() > max_len {
        return Err(ShellError::LineTooLong { max: max_len });
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ShellError::EmptyInput);
    }
    Ok(trimmed.to_string())
}
