//! The outbound half of the wire: writing a complete XML fragment
//! atomically so that two driver threads emitting at the same time
//! never interleave their tags on the wire.
//!
//! Grounded on `driverio`/`userio_xmlv1`, which wrap every
//! `IDDefXxx`/`IDSetXxx`/`IDMessage` call in
//! `flockfile(stdout)`/`funlockfile(stdout)`. A `Mutex` around the
//! underlying writer gives the same exclusion without reaching for
//! libc file locking.

use std::io::{self, Write};
use std::sync::Mutex;

/// Anything a driver can emit complete XML fragments to. Implemented
/// for any `Write + Send`; drivers normally hand in `io::stdout()`,
/// tests hand in a `Vec<u8>`.
pub trait ByteSink: Send + Sync {
    /// Writes `fragment` and flushes, as one atomic unit with respect
    /// to any other thread calling `emit` concurrently.
    fn emit(&self, fragment: &[u8]) -> io::Result<()>;
}

/// A `ByteSink` over any `Write + Send`, serializing writers with a
/// `Mutex` the way a C driver serializes writes to `stdout` with
/// `flockfile`.
pub struct StreamSink<W: Write + Send> {
    inner: Mutex<W>,
}

impl<W: Write + Send> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        StreamSink {
            inner: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> ByteSink for StreamSink<W> {
    fn emit(&self, fragment: &[u8]) -> io::Result<()> {
        let mut writer = self.inner.lock().expect("sink mutex poisoned");
        writer.write_all(fragment)?;
        writer.flush()
    }
}
