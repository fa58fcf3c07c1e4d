//! Hardware parameters for the simulated heater, loaded from the file
//! named by `--config` (see `indi_config::Cli`).

use indi_config::{ConfigError, DriverConfig};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Ambient temperature the simulated enclosure decays toward when
    /// the heater is off, in Celsius.
    #[serde(default = "default_ambient")]
    pub ambient_c: f64,

    /// Setpoint the heater targets until a client changes it.
    #[serde(default = "default_target")]
    pub target_c: f64,

    /// Degrees per second the enclosure gains while the heater is on.
    #[serde(default = "default_heater_rate")]
    pub heater_rate: f64,

    /// How often the simulated sensor is sampled, in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

fn default_ambient() -> f64 {
    15.0
}

fn default_target() -> f64 {
    21.0
}

fn default_heater_rate() -> f64 {
    0.5
}

fn default_poll_ms() -> u64 {
    1000
}

impl Default for Params {
    fn default() -> Self {
        Params {
            ambient_c: default_ambient(),
            target_c: default_target(),
            heater_rate: default_heater_rate(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl Params {
    pub fn from_config(cfg: &DriverConfig) -> Result<Self, ConfigError> {
        match cfg.parse_into::<Params>("heater") {
            Ok(params) => Ok(params),
            Err(ConfigError::Missing(_)) => Ok(Params::default()),
            Err(e) => Err(e),
        }
    }
}
