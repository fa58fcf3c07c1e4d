// Copyright (c) 2020-2021, Richard M Neswold, Jr.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived
//    from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Ambient bootstrap for INDI driver processes: command-line parsing
//! and the hardware-parameter TOML a driver loads on top of the
//! per-device config files `indi_api::config` manages.
//!
//! A driver's own tunables (serial port, I2C address, poll interval,
//! whatever its hardware needs) live in the file named by `--config`.
//! That file has nothing to do with the per-property `.indi` config
//! directory `indi_api::config` reads and writes at runtime -- the two
//! are deliberately separate concerns.

use clap::Parser;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Flags every INDI driver binary accepts.
#[derive(Parser, Debug)]
#[command(name = "indi-driver", about = "An INDI device driver", version)]
pub struct Cli {
    /// Sets verbosity of the log; can be given more than once.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the driver's hardware-parameter TOML file.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Maps the repeated `-v` count onto a `tracing` level: bare is
    /// `WARN`, one `-v` is `INFO`, two is `DEBUG`, three or more is
    /// `TRACE`.
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Loads the driver's own TOML config, or an empty table if
    /// `--config` wasn't given.
    pub fn load_config(&self) -> Result<DriverConfig, ConfigError> {
        match &self.config {
            Some(path) => DriverConfig::from_file(path),
            None => Ok(DriverConfig::default()),
        }
    }
}

/// Installs a process-wide `tracing` subscriber at `level`. Call this
/// once, near the top of `main`, before any `tracing` macro fires.
pub fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Missing(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(detail) => write!(f, "unable to read config file: {}", detail),
            ConfigError::Parse(detail) => write!(f, "unable to parse config file: {}", detail),
            ConfigError::Missing(key) => write!(f, "missing config key: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A driver's hardware-parameter config, loaded from a TOML file.
///
/// Thin wrapper around a `toml::value::Table` so a driver can pull
/// out individual scalars with `get_str`, or deserialize a whole
/// sub-table into its own `#[derive(Deserialize)]` struct with
/// `parse_into`.
#[derive(Debug, Default, Clone)]
pub struct DriverConfig(toml::value::Table);

impl DriverConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&contents)
    }

    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents)
            .map(DriverConfig)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_float())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_integer())
    }

    /// Deserializes the sub-table at `key` into `T`.
    pub fn parse_into<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))?;
        value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(format!("{}: {}", key, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn missing_config_file_is_an_error() {
        let err = DriverConfig::from_file(Path::new("/nonexistent/path.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn get_str_reads_a_scalar() {
        let cfg = DriverConfig::from_str(r#"port = "/dev/ttyUSB0""#).unwrap();
        assert_eq!(cfg.get_str("port"), Some("/dev/ttyUSB0"));
        assert_eq!(cfg.get_str("missing"), None);
    }

    #[test]
    fn parse_into_deserializes_a_sub_table() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Heater {
            pin: u32,
            active_low: bool,
        }

        let cfg = DriverConfig::from_str(
            r#"
[heater]
pin = 17
active_low = true
"#,
        )
        .unwrap();
        let heater: Heater = cfg.parse_into("heater").unwrap();
        assert_eq!(
            heater,
            Heater {
                pin: 17,
                active_low: true
            }
        );
    }

    #[test]
    fn parse_into_missing_key_is_an_error() {
        let cfg = DriverConfig::from_str("").unwrap();
        let err = cfg.parse_into::<toml::value::Table>("absent").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn cli_verbosity_steps_through_levels() {
        let cli = Cli {
            verbose: 0,
            config: None,
        };
        assert_eq!(cli.log_level(), Level::WARN);
        let cli = Cli {
            verbose: 1,
            config: None,
        };
        assert_eq!(cli.log_level(), Level::INFO);
        let cli = Cli {
            verbose: 3,
            config: None,
        };
        assert_eq!(cli.log_level(), Level::TRACE);
    }
}
