use std::io::IsTerminal;
use std::process::ExitCode;

use argh::FromArgs;
use minishell::config::DEFAULT_MAX_LINE;
use minishell::{FrontEnd, Interpreter, ShellConfig};

#[derive(FromArgs)]
/// A minimal interactive command shell.
struct Args {
    #[argh(option, default = "DEFAULT_MAX_LINE")]
    /// maximum number of characters in one command line
    max_line: usize,

    #[argh(option)]
    /// text printed before each command line
    prompt: Option<String>,

    #[argh(option)]
    /// compiler that `make` runs
    compiler: Option<String>,

    #[argh(switch)]
    /// read plain lines even when attached to a terminal
    plain: bool,
}

impl Args {
    fn into_config(self) -> ShellConfig {
        let defaults = ShellConfig::default();
        ShellConfig {
            max_line_len: self.max_line,
            prompt: self.prompt.unwrap_or(defaults.prompt),
            compiler: self.compiler.unwrap_or(defaults.compiler),
            front_end: if self.plain {
                FrontEnd::Plain
            } else {
                FrontEnd::Auto
            },
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = argh::from_env::<Args>().into_config();
    let use_editor = config.front_end == FrontEnd::Auto && std::io::stdin().is_terminal();

    let mut shell = match Interpreter::new(config) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("starting shell (line editor: {use_editor})");

    let result = if use_editor {
        shell.repl()
    } else {
        let stdin = std::io::stdin();
        shell.run(&mut stdin.lock(), &mut std::io::stdout(), &mut std::io::stderr())
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::from_args(
            &["minishell"],
            &["--max-line", "64", "--compiler", "cc", "--plain"],
        )
        .ok()
        .expect("flags should parse");
        let config = args.into_config();
        assert_eq!(config.max_line_len, 64);
        assert_eq!(config.compiler, "cc");
        assert_eq!(config.prompt, ShellConfig::default().prompt);
        assert_eq!(config.front_end, FrontEnd::Plain);
    }

    #[test]
    fn no_flags_keep_defaults() {
        let config = Args::from_args(&["minishell"], &[])
            .ok()
            .expect("no flags should parse")
            .into_config();
        assert_eq!(config.max_line_len, DEFAULT_MAX_LINE);
        assert_eq!(config.compiler, "gcc");
        assert_eq!(config.front_end, FrontEnd::Auto);
    }
}
