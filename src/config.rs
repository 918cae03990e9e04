use std::time::Duration;

use crate::cli::Cli;
use crate::filter::FilterSpec;
use crate::watcher::{DEFAULT_CHUNK_SIZE, DEFAULT_POLL_INTERVAL};

// ---------------------------------------------------------------------------
// Effective config
// ---------------------------------------------------------------------------

/// Immutable session configuration, built once at startup and passed down.
///
/// There is no config file and no environment lookup: everything comes from
/// the command line or the defaults below.
#[derive(Debug, Clone, PartialEq)]
pub struct TailConfig {
    /// Folder, file name or pattern inputs, in command-line order.
    pub targets: Vec<String>,
    /// Use the color notifier (title + highlighted status lines).
    pub colors: bool,
    pub filter: FilterSpec,
    pub poll_interval: Duration,
    pub chunk_size: usize,
    pub verbose: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            colors: true,
            filter: FilterSpec::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            chunk_size: DEFAULT_CHUNK_SIZE,
            verbose: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config building
// ---------------------------------------------------------------------------

/// Build the effective `TailConfig` from defaults and CLI args.
///
/// - Colors are on unless `--nocolors` is given or stdout is not a terminal.
/// - `--filter-regex` takes precedence over `--filter`.
pub fn build_config(cli: &Cli, stdout_is_tty: bool) -> TailConfig {
    let mut config = TailConfig {
        targets: cli.targets.clone(),
        ..TailConfig::default()
    };

    if cli.nocolors || !stdout_is_tty {
        config.colors = false;
    }

    if let Some(ref pattern) = cli.filter_regex {
        config.filter.pattern = pattern.clone();
        config.filter.is_regex = true;
    } else if let Some(ref text) = cli.filter {
        config.filter.pattern = text.clone();
    }
    config.filter.case_insensitive = cli.ignore_case;
    config.filter.invert = cli.invert;

    config.poll_interval = Duration::from_millis(cli.interval);
    config.verbose = cli.verbose;

    config
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
