use std::path::PathBuf;
use thiserror::Error;

pub const VERSION: &str = concat!("minilisp v", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_HISTORY_FILE: &str = "minilisp_history.txt";

pub const USAGE: &str = "\
usage: repl [options]

options:
  -p, --profile         print how long each evaluation took
  -v, --version         print the version and exit
      --vi              use vi key bindings
      --history <FILE>  read and save line history in FILE
  -h, --help            print this message and exit";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("option '{0}' expects a value")]
    MissingValue(String),
}

/// Settings for one REPL session.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub profile: bool,
    pub show_version: bool,
    pub show_help: bool,
    pub vi_mode: bool,
    pub history_file: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            profile: false,
            show_version: false,
            show_help: false,
            vi_mode: false,
            history_file: PathBuf::from(DEFAULT_HISTORY_FILE),
        }
    }
}

impl Options {
    /// Parses the arguments following the program name. Single and double
    /// dash spellings of long options are both accepted.
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = Options::default();
        let mut args = args.into_iter().map(Into::<String>::into);

        while let Some(arg) = args.next() {
            let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
                return Err(CliError::UnknownOption(arg.clone()));
            };
            let (flag, inline_value) = match flag.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (flag, None),
            };
            match flag {
                "p" | "profile" => options.profile = true,
                "v" | "version" => options.show_version = true,
                "h" | "help" => options.show_help = true,
                "vi" => options.vi_mode = true,
                "history" => {
                    let value = inline_value
                        .or_else(|| args.next())
                        .ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                    options.history_file = PathBuf::from(value);
                }
                _ => return Err(CliError::UnknownOption(arg.clone())),
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::parse(Vec::<String>::new()).expect("no args should parse");
        assert_eq!(options, Options::default());
        assert_eq!(options.history_file, PathBuf::from(DEFAULT_HISTORY_FILE));
    }

    #[test]
    fn test_flags() {
        let options = Options::parse(["-profile", "--vi"]).expect("should parse");
        assert!(options.profile);
        assert!(options.vi_mode);
        assert!(!options.show_version);

        assert!(Options::parse(["-version"]).expect("should parse").show_version);
        assert!(Options::parse(["--version"]).expect("should parse").show_version);
        assert!(Options::parse(["-h"]).expect("should parse").show_help);
    }

    #[test]
    fn test_history_value() {
        let options = Options::parse(["--history", "/tmp/h.txt"]).expect("should parse");
        assert_eq!(options.history_file, PathBuf::from("/tmp/h.txt"));

        let options = Options::parse(["--history=other.txt"]).expect("should parse");
        assert_eq!(options.history_file, PathBuf::from("other.txt"));

        assert_eq!(
            Options::parse(["--history"]),
            Err(CliError::MissingValue("--history".to_string()))
        );
    }

    #[test]
    fn test_unknown_option() {
        assert_eq!(
            Options::parse(["--fast"]),
            Err(CliError::UnknownOption("--fast".to_string()))
        );
    }

    #[test]
    fn test_options_need_a_dash() {
        assert_eq!(
            Options::parse(["profile"]),
            Err(CliError::UnknownOption("profile".to_string()))
        );
        assert_eq!(
            Options::parse(["history", "x"]),
            Err(CliError::UnknownOption("history".to_string()))
        );
        assert_eq!(
            Options::parse(["---vi"]),
            Err(CliError::UnknownOption("---vi".to_string()))
        );
    }

    #[test]
    fn test_version_string() {
        assert!(VERSION.starts_with("minilisp v"));
    }
}
