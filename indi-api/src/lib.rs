// Copyright (c) 2020-2021, Richard M Neswold, Jr.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived
//    from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Driver-side runtime for the INDI (Instrument-Neutral Distributed
//! Interface) protocol: the XML dispatcher, the property registry, the
//! per-family value decoders, config-file persistence, and BLOB flow
//! control that every INDI device driver needs.
//!
//! This crate provides the plumbing a driver links against; it does
//! not implement any particular instrument. See the `indi-config`
//! crate for the ambient bootstrap (CLI parsing, logging
//! initialization) drivers typically wrap this with.

pub mod base64;
pub mod blob_flow;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod emit;
pub mod property;
pub mod registry;
pub mod sexagesimal;
pub mod sink;
pub mod types;
pub mod update;
pub mod xml;

pub use context::{DriverContext, PROTOCOL_VERSION};
pub use dispatch::{dispatch, Handlers, Outcome};
pub use registry::PropertyRegistry;
pub use sink::{ByteSink, StreamSink};
pub use types::{Error, Result};
