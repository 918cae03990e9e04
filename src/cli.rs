use clap::{CommandFactory, Parser};

/// Follow the most recently modified file matching a path or pattern
#[derive(Parser, Debug)]
#[command(
    name = "ptail",
    about = "Follow the most recently modified file matching a path or pattern",
    after_help = "Help is also available as /? and -?. Option names are case-insensitive."
)]
pub struct Cli {
    /// Folder, file name or file pattern (`*` and `?` wildcards) to tail.
    /// The most recently modified match is followed. Only the first PATH
    /// is used.
    #[arg(value_name = "PATH")]
    pub targets: Vec<String>,

    /// Print status messages without colors or a terminal title.
    #[arg(long, default_value_t = false)]
    pub nocolors: bool,

    /// Only show lines containing this text.
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub filter: Option<String>,

    /// Only show lines matching this regular expression (wins over --filter).
    #[arg(long = "filter-regex", value_name = "PATTERN", allow_hyphen_values = true)]
    pub filter_regex: Option<String>,

    /// Case-insensitive matching.
    #[arg(long = "i", default_value_t = false)]
    pub ignore_case: bool,

    /// Show the lines that do NOT match.
    #[arg(long = "v", default_value_t = false)]
    pub invert: bool,

    /// Write diagnostics to stderr.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Milliseconds between two polls of the file.
    #[arg(
        long,
        value_name = "MS",
        default_value_t = 100,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,
}

/// What the process should do after looking at its arguments.
#[derive(Debug)]
pub enum Invocation {
    /// Print usage and exit successfully. `missing_target` is true when the
    /// usage is shown because no path was given.
    Usage { missing_target: bool },
    /// Tail with the parsed arguments.
    Tail(Cli),
}

/// Returns `true` for any spelling of the help switch.
pub fn is_help_flag(arg: &str) -> bool {
    matches!(
        arg.to_ascii_lowercase().as_str(),
        "-h" | "--help" | "/?" | "-?" | "/h"
    )
}

/// Long options that consume the following argument as their value.
const VALUE_OPTIONS: [&str; 3] = ["--filter", "--filter-regex", "--interval"];

/// Returns `true` if a help switch appears in option position.
///
/// Scanning stops at `--`, and the value that follows `--filter` and the
/// like is skipped, so `--filter -h` filters on the text "-h".
fn help_requested(args: &[String]) -> bool {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            return false;
        }
        if is_help_flag(arg) {
            return true;
        }
        let lower = arg.to_ascii_lowercase();
        if VALUE_OPTIONS.contains(&lower.as_str()) {
            iter.next();
        }
    }
    false
}

/// Lowercase the name part of `--long[=value]` options so that
/// `--NoColors` or `--FILTER=Error` are accepted. Values and positional
/// arguments are left untouched.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut options_ended = false;
    let mut value_next = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || options_ended || std::mem::take(&mut value_next) {
                return arg;
            }
            if !arg.starts_with("--") {
                return arg;
            }
            if arg == "--" {
                options_ended = true;
                return arg;
            }
            match arg.split_once('=') {
                Some((name, value)) => format!("{}={}", name.to_ascii_lowercase(), value),
                None => {
                    let lower = arg.to_ascii_lowercase();
                    value_next = VALUE_OPTIONS.contains(&lower.as_str());
                    lower
                }
            }
        })
        .collect()
}

/// Parse the full argument list (program name first).
///
/// A help switch in option position wins over everything else, including
/// spellings clap does not know (`/?`, `-?`).
///
/// # Errors
///
/// Returns the clap error for unknown options or invalid values.
pub fn parse_args<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    if help_requested(&args) {
        return Ok(Invocation::Usage {
            missing_target: false,
        });
    }

    let cli = Cli::try_parse_from(normalize_args(args))?;
    if cli.targets.is_empty() {
        return Ok(Invocation::Usage {
            missing_target: true,
        });
    }
    Ok(Invocation::Tail(cli))
}

/// Rendered help text.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
