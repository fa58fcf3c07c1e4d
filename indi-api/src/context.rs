//! The driver-side runtime context: the registry, the outbound sink,
//! and BLOB flow control bundled together and threaded explicitly
//! through the dispatcher and emitters.
//!
//! A C driver typically reaches all three through process-wide
//! globals (`propCache`, `stdout`, `lastBlobPingUid`). Threading a
//! context value instead lets a process in principle host more than
//! one driver instance without cross-talk.

use crate::blob_flow::BlobFlowControl;
use crate::registry::PropertyRegistry;
use crate::sink::ByteSink;
use std::sync::Arc;

/// The protocol version this build speaks. A `getProperties` asking
/// for anything higher is a fatal mismatch.
pub const PROTOCOL_VERSION: &str = "1.7";

pub struct DriverContext {
    pub registry: PropertyRegistry,
    pub sink: Arc<dyn ByteSink>,
    pub blobs: BlobFlowControl,
}

impl DriverContext {
    pub fn new(sink: Arc<dyn ByteSink>) -> Self {
        DriverContext {
            registry: PropertyRegistry::new(),
            sink,
            blobs: BlobFlowControl::new(),
        }
    }
}
