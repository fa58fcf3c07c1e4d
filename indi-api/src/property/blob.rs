use super::{Header, Permission};
use crate::types::name::{Device, Property};
use std::ops::{Deref, DerefMut};

/// A single scalar element of a `BlobVector`.
///
/// `size` is the logical size the driver advertises (e.g. the
/// uncompressed FITS size); `blobsize` is the byte length of the
/// decoded `bytes` payload actually carried. `format` is a MIME-like
/// suffix such as `.fits.z`.
#[derive(Debug, Clone, Default)]
pub struct BlobMember {
    pub name: String,
    pub label: String,
    pub format: String,
    pub size: usize,
    pub blobsize: usize,
    pub bytes: Vec<u8>,
}

impl BlobMember {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        BlobMember {
            name: name.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    /// Adopts a decoded payload into this member, the way `IUSaveBLOB`
    /// does.
    pub fn save(&mut self, size: usize, blobsize: usize, bytes: Vec<u8>, format: impl Into<String>) {
        self.size = size;
        self.blobsize = blobsize;
        self.bytes = bytes;
        self.format = format.into();
    }
}

/// A `BLOB` property.
#[derive(Debug, Clone)]
pub struct BlobVector {
    pub header: Header,
    pub permission: Permission,
    pub members: Vec<BlobMember>,
}

impl BlobVector {
    pub fn new(
        device: Device,
        name: Property,
        label: impl Into<String>,
        permission: Permission,
        members: Vec<BlobMember>,
    ) -> Self {
        BlobVector {
            header: Header::new(device, name, label),
            permission,
            members,
        }
    }

    pub fn find(&self, name: &str) -> Option<&BlobMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut BlobMember> {
        self.members.iter_mut().find(|m| m.name == name)
    }
}

impl Deref for BlobVector {
    type Target = Header;

    fn deref(&self) -> &Header {
        &self.header
    }
}

impl DerefMut for BlobVector {
    fn deref_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}
