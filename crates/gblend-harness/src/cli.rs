#![forbid(unsafe_code)]

//! Command-line argument parsing for the cache harness.
//!
//! Parses args manually to keep the binary lean. Cache sizing comes from
//! the `GBLEND_*` variables understood by [`BlenderConfig::from_env`];
//! workload defaults can be overridden via the `GBLEND_HARNESS_*` prefix.

use std::fmt;
use std::process;

use gblend::{BlenderConfig, ConfigError};

use crate::workload::Workload;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
gblend-harness: drive the blend cache with a deterministic workload

USAGE:
    gblend-harness [OPTIONS]

OPTIONS:
    --gamma=G        Gamma exponent; 0 or negative selects sRGB (default: 0)
    --pairs=N        Distinct color pairs in the workload (default: 64)
    --rounds=N       Passes over the pair list (default: 8)
    --width=N        Pixels per blended span (default: 64)
    --seed=N         Seed of the pseudo-random generator (default: 42)
    --channels       Blend LCD subpixel spans (single-channel cache)
    --json           Print the report as a JSON object
    --help, -h       Show this help message
    --version, -V    Show version

ENVIRONMENT VARIABLES:
    GBLEND_HARNESS_GAMMA      Override --gamma
    GBLEND_HARNESS_PAIRS      Override --pairs
    GBLEND_HARNESS_ROUNDS     Override --rounds
    GBLEND_HARNESS_WIDTH      Override --width
    GBLEND_HARNESS_SEED       Override --seed
    GBLEND_HARNESS_CHANNELS   Enable --channels (1/true)
    GBLEND_HARNESS_JSON       Enable --json (1/true)
    GBLEND_KEY_COUNT          Cache slots (power of two)
    GBLEND_SHADE_COUNT        Shades per gradient
    GBLEND_GAMMA_SHIFT        Linear-light precision bits
    GBLEND_CELL_LAYOUT        packed | bytes";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// Raw gamma value handed to the blender.
    pub gamma: f64,
    /// Number of distinct (background, foreground) pairs.
    pub pairs: usize,
    /// Passes over the pair list.
    pub rounds: usize,
    /// Pixels per span.
    pub width: usize,
    pub seed: u64,
    /// Blend LCD spans instead of grayscale ones.
    pub channels: bool,
    /// Emit JSON instead of text.
    pub json: bool,
    /// Cache configuration (statistics always on).
    pub config: BlenderConfig,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            gamma: 0.0,
            pairs: 64,
            rounds: 8,
            width: 64,
            seed: 42,
            channels: false,
            json: false,
            config: BlenderConfig::default().with_stats(true),
        }
    }
}

/// What the harness was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

/// Argument or environment error.
#[derive(Debug, Clone, PartialEq)]
pub enum CliError {
    /// A flag value that does not parse.
    InvalidValue { flag: &'static str, value: String },
    /// An argument the harness does not know.
    UnknownArgument(String),
    /// Cache configuration rejected by the blender.
    Config(ConfigError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { flag, value } => write!(f, "Invalid {flag} value: {value}"),
            Self::UnknownArgument(arg) => write!(f, "Unknown argument: {arg}"),
            Self::Config(err) => write!(f, "Invalid cache configuration: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version` or any error.
    pub fn parse() -> Self {
        let args = std::env::args().skip(1);
        match Self::parse_from(args, |key| std::env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("gblend-harness {VERSION}");
                process::exit(0);
            }
            Err(err) => {
                eprintln!("{err}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with environment lookups through `get_env`.
    ///
    /// Environment variables take precedence over defaults but are
    /// overridden by explicit command-line flags.
    pub fn parse_from<I, S, F>(args: I, get_env: F) -> Result<Command, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self {
            config: BlenderConfig::from_env_with(&get_env).with_stats(true),
            ..Self::default()
        };

        // Apply environment variable defaults first
        if let Some(val) = get_env("GBLEND_HARNESS_GAMMA")
            && let Ok(g) = val.trim().parse()
        {
            opts.gamma = g;
        }
        if let Some(val) = get_env("GBLEND_HARNESS_PAIRS")
            && let Ok(n) = val.trim().parse()
        {
            opts.pairs = n;
        }
        if let Some(val) = get_env("GBLEND_HARNESS_ROUNDS")
            && let Ok(n) = val.trim().parse()
        {
            opts.rounds = n;
        }
        if let Some(val) = get_env("GBLEND_HARNESS_WIDTH")
            && let Ok(n) = val.trim().parse()
        {
            opts.width = n;
        }
        if let Some(val) = get_env("GBLEND_HARNESS_SEED")
            && let Ok(n) = val.trim().parse()
        {
            opts.seed = n;
        }
        if let Some(val) = get_env("GBLEND_HARNESS_CHANNELS") {
            opts.channels = is_truthy(&val);
        }
        if let Some(val) = get_env("GBLEND_HARNESS_JSON") {
            opts.json = is_truthy(&val);
        }

        // Parse command-line args (override env vars)
        for arg in args {
            match arg.as_ref() {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" | "-V" => return Ok(Command::Version),
                "--channels" => opts.channels = true,
                "--json" => opts.json = true,
                other => {
                    if let Some(val) = other.strip_prefix("--gamma=") {
                        opts.gamma = parse_value("--gamma", val)?;
                    } else if let Some(val) = other.strip_prefix("--pairs=") {
                        opts.pairs = parse_value("--pairs", val)?;
                    } else if let Some(val) = other.strip_prefix("--rounds=") {
                        opts.rounds = parse_value("--rounds", val)?;
                    } else if let Some(val) = other.strip_prefix("--width=") {
                        opts.width = parse_value("--width", val)?;
                    } else if let Some(val) = other.strip_prefix("--seed=") {
                        opts.seed = parse_value("--seed", val)?;
                    } else {
                        return Err(CliError::UnknownArgument(other.to_string()));
                    }
                }
            }
        }

        opts.config.validate()?;
        Ok(Command::Run(opts))
    }

    /// Workload described by these options.
    #[must_use]
    pub fn workload(&self) -> Workload {
        Workload {
            pairs: self.pairs,
            rounds: self.rounds,
            width: self.width,
            seed: self.seed,
            channels: self.channels,
        }
    }
}

fn parse_value<T: std::str::FromStr>(flag: &'static str, val: &str) -> Result<T, CliError> {
    val.parse().map_err(|_| CliError::InvalidValue {
        flag,
        value: val.to_string(),
    })
}

fn is_truthy(val: &str) -> bool {
    matches!(val.trim(), "1" | "true" | "TRUE" | "yes" | "on")
}
