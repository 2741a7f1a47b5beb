use crate::cli::about;
use crate::error::UsageError;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};

const PROGRAM_NAME: &str = "pizza";

const RUN_TESTS_LONG: &str = "run-tests";
const RUN_TESTS_SHORT: char = 'T';
const SDIST_DIR_FLAG: &str = "--sdist-dir";

/// Value-less short flags that may share a cluster with `-T`, as in `-vT`
const CLUSTERED_SHORT_FLAGS: [char; 3] = ['v', 'V', 'h'];

#[derive(Parser, Debug)]
#[command(name = PROGRAM_NAME)]
#[command(about = about::DESCRIPTION)]
#[command(after_help = about::EPILOG)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Zero or more input values
    #[arg(value_name = "VALUE", conflicts_with_all = ["run_tests", "license", "version"])]
    values: Vec<String>,

    /// Run project tests. If NAME arguments are provided, only tests whose
    /// names match one of them are run. Every argument after this flag is
    /// taken as a NAME.
    #[arg(short = 'T', long = "run-tests", value_name = "NAME", num_args = 0.., group = "mode")]
    run_tests: Option<Vec<String>>,

    /// Root of a source checkout to discover tests in (development use)
    #[arg(long = "sdist-dir", value_name = "DIRECTORY", allow_hyphen_values = true)]
    sdist_dir: Option<PathBuf>,

    /// Print license info to stdout
    #[arg(long, group = "mode")]
    license: bool,

    /// Print version info to stdout
    #[arg(short = 'V', long, group = "mode")]
    version: bool,

    /// Log verbosely
    #[arg(short, long)]
    verbose: bool,

    /// Show this help message and exit
    #[arg(short, long, group = "mode")]
    help: bool,
}

/// The single top-level action chosen for an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    RunTests(Vec<String>),
    License,
    Version,
    Help,
    Execute(Vec<String>),
}

/// Result of parsing the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArguments {
    pub mode: Mode,
    pub verbose: bool,
    pub sdist_dir: Option<PathBuf>,
}

impl ParsedArguments {
    #[allow(dead_code)]
    pub fn positional_values(&self) -> &[String] {
        match &self.mode {
            Mode::Execute(values) => values,
            _ => &[],
        }
    }

    /// Test name filters, present (possibly empty) only in run-tests mode
    pub fn run_tests(&self) -> Option<&[String]> {
        match &self.mode {
            Mode::RunTests(filters) => Some(filters),
            _ => None,
        }
    }

    pub fn sdist_dir(&self) -> Option<&Path> {
        self.sdist_dir.as_deref()
    }
}

impl Cli {
    fn into_parsed(self, remainder: Vec<String>) -> ParsedArguments {
        let mode = if let Some(mut filters) = self.run_tests {
            filters.extend(remainder);
            Mode::RunTests(filters)
        } else if self.license {
            Mode::License
        } else if self.version {
            Mode::Version
        } else if self.help {
            Mode::Help
        } else {
            Mode::Execute(self.values)
        };

        ParsedArguments {
            mode,
            verbose: self.verbose,
            sdist_dir: self.sdist_dir,
        }
    }
}

/// Recognize any spelling of the run-tests flag.
///
/// Returns the flag as clap should see it, without a value, plus any value
/// attached to the same token (`--run-tests=foo`, `-Tfoo`, `-vTfoo`).
fn run_tests_flag(token: &str) -> Option<(&str, Option<&str>)> {
    if let Some(long) = token.strip_prefix("--") {
        let flag_end = 2 + RUN_TESTS_LONG.len();
        return match long.split_once('=') {
            Some((RUN_TESTS_LONG, value)) => Some((&token[..flag_end], Some(value))),
            None if long == RUN_TESTS_LONG => Some((token, None)),
            _ => None,
        };
    }

    let cluster = token.strip_prefix('-')?;
    for (offset, flag) in cluster.char_indices() {
        if flag == RUN_TESTS_SHORT {
            let end = 1 + offset + flag.len_utf8();
            let rest = &token[end..];
            let attached = match rest.strip_prefix('=') {
                Some(value) => Some(value),
                None if rest.is_empty() => None,
                None => Some(rest),
            };
            return Some((&token[..end], attached));
        }
        if !CLUSTERED_SHORT_FLAGS.contains(&flag) {
            return None;
        }
    }
    None
}

/// Split off everything after the first run-tests flag.
///
/// The head keeps the flag itself so option conflicts are still detected. A
/// value attached to the flag becomes the first captured token.
fn split_remainder(args: &[String]) -> (Vec<String>, Vec<String>) {
    let mut expecting_value = false;

    for (index, token) in args.iter().enumerate() {
        if expecting_value {
            expecting_value = false;
            continue;
        }
        if token == "--" {
            break;
        }
        if token == SDIST_DIR_FLAG {
            expecting_value = true;
            continue;
        }
        if let Some((flag, attached)) = run_tests_flag(token) {
            let mut head = args[..index].to_vec();
            head.push(flag.to_string());
            let remainder = attached
                .map(str::to_string)
                .into_iter()
                .chain(args[index + 1..].iter().cloned())
                .collect();
            return (head, remainder);
        }
    }

    (args.to_vec(), Vec::new())
}

/// Parse arguments (without the program name).
///
/// `--help` is an ordinary mode here; rendering it is left to the caller.
pub fn parse_args(args: &[String]) -> Result<ParsedArguments, UsageError> {
    let (head, remainder) = split_remainder(args);

    let argv = std::iter::once(PROGRAM_NAME).chain(head.iter().map(String::as_str));
    let cli = Cli::try_parse_from(argv).map_err(|err| {
        let rendered = err.render().to_string();
        let message = rendered
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error: ")
            .to_string();
        UsageError::new(message, args)
    })?;

    Ok(cli.into_parsed(remainder))
}

/// Parse without failing, so logging can be configured before the real parse.
///
/// Any usage error is dropped here; it surfaces again from [`parse_args`].
pub fn preparse_args(args: &[String]) -> Option<ParsedArguments> {
    parse_args(args).ok()
}

pub fn render_help() -> String {
    Cli::command().render_help().to_string()
}
