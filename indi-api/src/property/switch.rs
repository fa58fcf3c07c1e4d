use super::{Header, Permission, SwitchRule, SwitchState};
use crate::types::name::{Device, Property};
use std::ops::{Deref, DerefMut};

/// A single scalar element of a `SwitchVector`.
#[derive(Debug, Clone)]
pub struct SwitchMember {
    pub name: String,
    pub label: String,
    pub state: SwitchState,
}

impl SwitchMember {
    pub fn new(name: impl Into<String>, label: impl Into<String>, state: SwitchState) -> Self {
        SwitchMember {
            name: name.into(),
            label: label.into(),
            state,
        }
    }
}

/// A `Switch` property.
#[derive(Debug, Clone)]
pub struct SwitchVector {
    pub header: Header,
    pub permission: Permission,
    pub rule: SwitchRule,
    pub members: Vec<SwitchMember>,
}

impl SwitchVector {
    pub fn new(
        device: Device,
        name: Property,
        label: impl Into<String>,
        permission: Permission,
        rule: SwitchRule,
        members: Vec<SwitchMember>,
    ) -> Self {
        SwitchVector {
            header: Header::new(device, name, label),
            permission,
            rule,
            members,
        }
    }

    pub fn find(&self, name: &str) -> Option<&SwitchMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SwitchMember> {
        self.members.iter_mut().find(|m| m.name == name)
    }

    /// Returns the name of the first member whose state is `On`.
    pub fn on_name(&self) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.state == SwitchState::On)
            .map(|m| m.name.as_str())
    }

    /// Returns the index of the first member whose state is `On`.
    pub fn on_index(&self) -> Option<usize> {
        self.members.iter().position(|m| m.state == SwitchState::On)
    }
}

impl Deref for SwitchVector {
    type Target = Header;

    fn deref(&self) -> &Header {
        &self.header
    }
}

impl DerefMut for SwitchVector {
    fn deref_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}
