//! The five INDI property families and the scalars shared between
//! them.
//!
//! A property ("vector", in protocol parlance) is a named, typed
//! collection of members, in one of five families: `Text`, `Number`,
//! `Switch`, `Light`, and `BLOB`. Each lives in its own module here
//! because the member shape and update rules differ enough that a
//! single generic type would need more variants than code.

mod blob;
mod light;
mod number;
mod switch;
mod text;

pub use blob::{BlobMember, BlobVector};
pub use light::{LightMember, LightVector};
pub use number::{NumberMember, NumberVector};
pub use switch::{SwitchMember, SwitchVector};
pub use text::{TextMember, TextVector};

use crate::types::name::{Device, Property};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Read/write access a client is allowed to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Permission {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Permission::ReadOnly)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::ReadOnly => "ro",
            Permission::WriteOnly => "wo",
            Permission::ReadWrite => "rw",
        };
        write!(f, "{}", s)
    }
}

/// The overall state of a property, transmitted with every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Ok,
    Busy,
    Alert,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Idle => "Idle",
            State::Ok => "Ok",
            State::Busy => "Busy",
            State::Alert => "Alert",
        };
        write!(f, "{}", s)
    }
}

/// The exclusivity rule governing a switch property's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRule {
    AnyOfMany,
    AtMostOne,
    OneOfMany,
}

impl fmt::Display for SwitchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchRule::AnyOfMany => "AnyOfMany",
            SwitchRule::AtMostOne => "AtMostOne",
            SwitchRule::OneOfMany => "OneOfMany",
        };
        write!(f, "{}", s)
    }
}

/// The state of an individual switch member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchState::On => "On",
            SwitchState::Off => "Off",
        };
        write!(f, "{}", s)
    }
}

/// Fields common to every property family. Each concrete vector type
/// embeds one of these and `Deref`s to it so callers can read
/// `nvp.device()`, `nvp.name()`, etc. without repeating boilerplate in
/// every family.
#[derive(Debug, Clone)]
pub struct Header {
    pub device: Device,
    pub name: Property,
    pub label: String,
    pub group: String,
    pub state: State,
    pub timeout: f64,
}

impl Header {
    pub fn new(device: Device, name: Property, label: impl Into<String>) -> Self {
        Header {
            device,
            name,
            label: label.into(),
            group: String::new(),
            state: State::Idle,
            timeout: 0.0,
        }
    }
}

/// A registry payload: a non-owning-in-spirit, but actually
/// reference-counted and owned, handle to one of the four vector
/// families a client can address with `newXxxVector`. `Light`
/// properties are never a target of `newXxxVector`, so they have no
/// variant here.
#[derive(Clone)]
pub enum Handle {
    Text(Arc<Mutex<TextVector>>),
    Number(Arc<Mutex<NumberVector>>),
    Switch(Arc<Mutex<SwitchVector>>),
    Blob(Arc<Mutex<BlobVector>>),
}

impl Handle {
    pub fn type_name(&self) -> &'static str {
        match self {
            Handle::Text(_) => "Text",
            Handle::Number(_) => "Number",
            Handle::Switch(_) => "Switch",
            Handle::Blob(_) => "BLOB",
        }
    }
}
