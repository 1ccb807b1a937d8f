//! Runtime settings of a shell instance.

/// Default maximum number of characters in one command line.
pub const DEFAULT_MAX_LINE: usize = 1024;

/// How input lines are acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontEnd {
    /// Line editor on a terminal, plain reader otherwise.
    #[default]
    Auto,
    /// Always use the bounded plain reader.
    Plain,
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Longest accepted line, in characters.
    pub max_line_len: usize,
    /// Printed before every read.
    pub prompt: String,
    /// Program `make` invokes.
    pub compiler: String,
    pub front_end: FrontEnd,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE,
            prompt: "£ ".to_string(),
            compiler: "gcc".to_string(),
            front_end: FrontEnd::Auto,
        }
    }
}
