//! Validated device and property name types.
//!
//! Device and property identifiers must be non-empty, printable, and
//! bounded to 64 characters. A C driver built on fixed `MAXINDINAME`/
//! `MAXINDIDEVICE` buffers would `strcpy` into them and silently
//! truncate or overflow; a validated newtype closes that off instead.

use super::{Error, Result};
use std::fmt;

const MAX_LEN: usize = 64;

fn validate(kind: &'static str, s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(Error::InvalidName(format!("{} must not be empty", kind)));
    }
    if s.chars().count() > MAX_LEN {
        return Err(Error::InvalidName(format!(
            "{} exceeds {} characters",
            kind, MAX_LEN
        )));
    }
    if !s.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        return Err(Error::InvalidName(format!(
            "{} contains a non-printable character",
            kind
        )));
    }
    Ok(())
}

/// The name of a device, e.g. `"CCD Simulator"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Device(String);

impl Device {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        validate("device name", &s)?;
        Ok(Device(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl AsRef<str> for Device {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The name of a property (vector), e.g. `"CONNECTION"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Property(String);

impl Property {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        validate("property name", &s)?;
        Ok(Property(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl AsRef<str> for Property {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The `(device, property)` pair that uniquely identifies a registry
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub device: Device,
    pub property: Property,
}

impl Key {
    pub fn new(device: Device, property: Property) -> Self {
        Key { device, property }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", &self.device, &self.property)
    }
}
