//! BLOB emission back-pressure.
//!
//! Grounded on `IDSetBLOBVA`/`lastBlobPingUid` in `indidriver.c`: a
//! monotonic counter mints a unique token per BLOB emission, and the
//! *next* emission blocks until the driver host reports the previous
//! token's `pingReply`. `indidriver.c` blocks via a host-supplied
//! `waitPingReply(token)` callback; here that becomes a `Condvar` the
//! host signals by calling `ack`.

use crate::emit::render_set_blob;
use crate::property::BlobVector;
use crate::sink::ByteSink;
use std::io;
use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct State {
    counter: u64,
    outstanding: Option<u64>,
}

/// Serializes `setBLOBVector` emission to at most one in-flight BLOB.
pub struct BlobFlowControl {
    state: Mutex<State>,
    condvar: Condvar,
}

impl BlobFlowControl {
    pub fn new() -> Self {
        BlobFlowControl {
            state: Mutex::new(State::default()),
            condvar: Condvar::new(),
        }
    }

    /// Emits `vector` as a `setBLOBVector`, blocking first if a prior
    /// token is still outstanding, then minting and appending the
    /// next `pingRequest` token before handing the whole fragment to
    /// the sink as one atomic write.
    pub fn emit(&self, sink: &dyn ByteSink, vector: &BlobVector, message: Option<&str>) -> io::Result<()> {
        let mut guard = self.state.lock().expect("blob flow mutex poisoned");
        while guard.outstanding.is_some() {
            guard = self.condvar.wait(guard).expect("blob flow mutex poisoned");
        }

        guard.counter += 1;
        let token = guard.counter;
        guard.outstanding = Some(token);
        drop(guard);

        let mut fragment = render_set_blob(vector, message);
        fragment.push_str(&format!("<pingRequest identifier=\"SetBLOB/{}\"/>\n", token));
        sink.emit(fragment.as_bytes())
    }

    /// Called by the driver host when a `pingReply` arrives for
    /// `token` (formatted as `"SetBLOB/<N>"`). Wakes any thread
    /// blocked in `emit` waiting for this, or an older, token.
    pub fn ack(&self, token: &str) {
        let Some(n) = token.strip_prefix("SetBLOB/").and_then(|s| s.parse::<u64>().ok()) else {
            return;
        };
        let mut guard = self.state.lock().expect("blob flow mutex poisoned");
        if guard.outstanding == Some(n) {
            guard.outstanding = None;
            self.condvar.notify_all();
        }
    }
}
