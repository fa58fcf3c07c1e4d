use super::{Header, Permission};
use crate::types::name::{Device, Property};
use std::ops::{Deref, DerefMut};

/// A single scalar element of a `TextVector`.
#[derive(Debug, Clone)]
pub struct TextMember {
    pub name: String,
    pub label: String,
    pub value: String,
}

impl TextMember {
    pub fn new(name: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        TextMember {
            name: name.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A `Text` property.
#[derive(Debug, Clone)]
pub struct TextVector {
    pub header: Header,
    pub permission: Permission,
    pub members: Vec<TextMember>,
}

impl TextVector {
    pub fn new(
        device: Device,
        name: Property,
        label: impl Into<String>,
        permission: Permission,
        members: Vec<TextMember>,
    ) -> Self {
        TextVector {
            header: Header::new(device, name, label),
            permission,
            members,
        }
    }

    pub fn find(&self, name: &str) -> Option<&TextMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut TextMember> {
        self.members.iter_mut().find(|m| m.name == name)
    }
}

impl Deref for TextVector {
    type Target = Header;

    fn deref(&self) -> &Header {
        &self.header
    }
}

impl DerefMut for TextVector {
    fn deref_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}
