//! Command line configuration for the `shader-lower` binary

use clap::{Parser, ValueEnum};
use shader_lower::common::tast::TProgram;
use shader_lower::pipeline::LowerConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lower a resolved shader program (JSON) to block IR and print it
#[derive(Parser, Debug)]
#[command(name = "shader-lower", version)]
pub struct Config {
    /// Typed program produced by semantic analysis, as JSON
    pub input: PathBuf,

    /// Shader source the program was resolved from, used to render diagnostics
    #[arg(long, env = "SHADER_LOWER_SOURCE")]
    pub source: Option<PathBuf>,

    /// Skip structural validation of the lowered module
    #[arg(long, env = "SHADER_LOWER_NO_VALIDATE")]
    pub no_validate: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, value_enum, env = "SHADER_LOWER_LOG")]
    pub log_level: Option<LogLevel>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Config {
    pub fn lower_config(&self) -> LowerConfig {
        LowerConfig {
            validate: !self.no_validate,
            disassemble: true,
        }
    }

    /// Filter directive picked from the logging flags
    pub fn log_directive(&self) -> &'static str {
        if let Some(level) = self.log_level {
            level.directive()
        } else if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr so the
/// disassembly on stdout stays clean.
pub fn setup_logging(config: &Config) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(formatter)
        .with(EnvFilter::new(config.log_directive()))
        .init();
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("error reading '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{}' is not a valid typed program: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read a file as text
pub fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the JSON typed program at `path`
pub fn read_program(path: &Path) -> Result<TProgram, CliError> {
    let text = read_text(path)?;
    TProgram::from_json(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_defaults() {
        let config = Config::try_parse_from(["shader-lower", "prog.json"]).unwrap();
        assert_eq!(config.input, PathBuf::from("prog.json"));
        assert_eq!(config.source, None);
        assert_eq!(config.lower_config(), LowerConfig::all());
        assert_eq!(config.log_directive(), "warn");
    }

    #[test]
    fn test_log_level_overrides_verbosity() {
        let config = Config::try_parse_from([
            "shader-lower",
            "prog.json",
            "-vv",
            "--quiet",
            "--log-level",
            "trace",
        ])
        .unwrap();
        assert_eq!(config.log_directive(), "trace");

        let quiet = Config::try_parse_from(["shader-lower", "prog.json", "-vv", "-q"]).unwrap();
        assert_eq!(quiet.log_directive(), "error");

        let debug = Config::try_parse_from(["shader-lower", "prog.json", "-vv"]).unwrap();
        assert_eq!(debug.log_directive(), "debug");
    }

    #[test]
    fn test_no_validate_flag() {
        let config =
            Config::try_parse_from(["shader-lower", "prog.json", "--no-validate"]).unwrap();
        assert!(!config.lower_config().validate);
        assert!(config.lower_config().disassemble);
    }

    #[test]
    fn test_missing_program_file() {
        let err = read_program(Path::new("/nonexistent/prog.json")).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/prog.json"), "{err}");
    }
}
