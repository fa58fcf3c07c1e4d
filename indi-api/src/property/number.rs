use super::{Header, Permission};
use crate::types::name::{Device, Property};
use std::ops::{Deref, DerefMut};

/// A single scalar element of a `NumberVector`.
///
/// `min <= value <= max` is an invariant after any successful update,
/// enforced by `PropertyUpdaters::update_number`, not by this type's
/// constructor, since the two-phase validate/apply protocol needs to
/// reject whole requests without mutating anything.
#[derive(Debug, Clone)]
pub struct NumberMember {
    pub name: String,
    pub label: String,
    pub format: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
}

impl NumberMember {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        format: impl Into<String>,
        min: f64,
        max: f64,
        step: f64,
        value: f64,
    ) -> Self {
        NumberMember {
            name: name.into(),
            label: label.into(),
            format: format.into(),
            min,
            max,
            step,
            value,
        }
    }

    pub fn in_range(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A `Number` property.
#[derive(Debug, Clone)]
pub struct NumberVector {
    pub header: Header,
    pub permission: Permission,
    pub members: Vec<NumberMember>,
}

impl NumberVector {
    pub fn new(
        device: Device,
        name: Property,
        label: impl Into<String>,
        permission: Permission,
        members: Vec<NumberMember>,
    ) -> Self {
        NumberVector {
            header: Header::new(device, name, label),
            permission,
            members,
        }
    }

    pub fn find(&self, name: &str) -> Option<&NumberMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut NumberMember> {
        self.members.iter_mut().find(|m| m.name == name)
    }
}

impl Deref for NumberVector {
    type Target = Header;

    fn deref(&self) -> &Header {
        &self.header
    }
}

impl DerefMut for NumberVector {
    fn deref_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}
