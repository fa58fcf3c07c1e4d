use super::{Header, State};
use crate::types::name::{Device, Property};
use std::ops::{Deref, DerefMut};

/// A single scalar element of a `LightVector`.
#[derive(Debug, Clone)]
pub struct LightMember {
    pub name: String,
    pub label: String,
    pub state: State,
}

impl LightMember {
    pub fn new(name: impl Into<String>, label: impl Into<String>, state: State) -> Self {
        LightMember {
            name: name.into(),
            label: label.into(),
            state,
        }
    }
}

/// A `Light` property: a read-only status indicator. Lights are never
/// placed in the `PropertyRegistry` since they are display-only and
/// can never be the target of a `newXxxVector`.
#[derive(Debug, Clone)]
pub struct LightVector {
    pub header: Header,
    pub members: Vec<LightMember>,
}

impl LightVector {
    pub fn new(device: Device, name: Property, label: impl Into<String>, members: Vec<LightMember>) -> Self {
        LightVector {
            header: Header::new(device, name, label),
            members,
        }
    }

    pub fn find(&self, name: &str) -> Option<&LightMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

impl Deref for LightVector {
    type Target = Header;

    fn deref(&self) -> &Header {
        &self.header
    }
}

impl DerefMut for LightVector {
    fn deref_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}
