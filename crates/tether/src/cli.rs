//! CLI argument parsing with clap
//!
//! tether owns no flags of its own: everything after the program name is
//! handed to the supervised CLI untouched. Behaviour is configured through
//! `TETHER_*` environment variables instead.

use clap::Parser;
use std::ffi::OsString;
use std::iter;

/// tether - keeps a released CLI running on its latest version
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Arguments forwarded verbatim to every CLI invocation
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub args: Vec<OsString>,
}

impl Cli {
    /// Parse `argv`, keeping every argument after the program name
    ///
    /// clap drops the first bare `--` it sees, so one is inserted ahead of
    /// the user's arguments and a `--` the user passed is kept as written.
    pub fn try_parse_forwarding<I, T>(argv: I) -> clap::error::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().unwrap_or_else(|| OsString::from("tether"));

        Self::try_parse_from(
            iter::once(program)
                .chain(iter::once(OsString::from("--")))
                .chain(argv),
        )
    }

    /// Parse the host's own arguments, exiting on a parse error
    pub fn parse_forwarding() -> Self {
        Self::try_parse_forwarding(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Vec<OsString> {
        Cli::try_parse_forwarding(argv).unwrap().args
    }

    #[test]
    fn test_no_args() {
        assert!(parse(&["tether"]).is_empty());
    }

    #[test]
    fn test_flags_are_forwarded() {
        assert_eq!(
            parse(&["tether", "run", "--frequency", "60", "-v"]),
            ["run", "--frequency", "60", "-v"]
        );
    }

    #[test]
    fn test_help_and_version_are_forwarded() {
        assert_eq!(parse(&["tether", "--help"]), ["--help"]);
        assert_eq!(parse(&["tether", "--version", "-h"]), ["--version", "-h"]);
    }

    #[test]
    fn test_separator_is_forwarded_after_first_arg() {
        assert_eq!(parse(&["tether", "exec", "--", "ls"]), ["exec", "--", "ls"]);
    }

    #[test]
    fn test_leading_separator_is_forwarded() {
        assert_eq!(parse(&["tether", "--", "ls"]), ["--", "ls"]);
        assert_eq!(parse(&["tether", "--", "ls", "-l"]), ["--", "ls", "-l"]);
        assert_eq!(parse(&["tether", "--", "--"]), ["--", "--"]);
    }
}
