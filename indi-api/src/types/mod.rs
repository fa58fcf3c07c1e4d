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

//! Fundamental types used throughout the `indi-api` crate.

use std::fmt;

pub mod name;

/// Enumerates all the errors that can be reported while running the
/// driver-side of the INDI protocol. Parse warnings and per-member
/// rejections never produce one of these -- they're reported in-band
/// to the client via `IDMessage` and the offending member is simply
/// dropped. These variants are for conditions a caller has to act on.

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// A requested item (property, config entry, switch member) could
    /// not be found.
    NotFound,

    /// An incoming command named a property that has never been
    /// Defined.
    UnknownProperty(String, String),

    /// An incoming command tried to mutate a property that was
    /// Defined with `Permission::ReadOnly`.
    ReadOnly(String),

    /// A named member does not belong to the targeted property.
    BadMember(String),

    /// A numeric value fell outside the member's declared `[min,
    /// max]` range.
    OutOfRange(String),

    /// A root tag the dispatcher doesn't recognize.
    UnknownCommand(String),

    /// Reading, writing, or parsing a config file failed.
    ConfigIo(String),

    /// A device or property name violated the naming grammar.
    InvalidName(String),

    /// The XML wire data was malformed: unbalanced tags, invalid
    /// UTF-8, or a value that didn't parse as the expected type.
    BadFormat(String),

    /// A fatal protocol condition: version mismatch, a `getProperties`
    /// missing its `version` attribute, or an allocation failure.
    /// Callers are expected to abort the process after logging this.
    Fatal(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "item not found"),
            Error::UnknownProperty(name, dev) => {
                write!(f, "Property {} is not defined in {}.", name, dev)
            }
            Error::ReadOnly(name) => {
                write!(f, "Cannot set read-only property {}", name)
            }
            Error::BadMember(name) => {
                write!(f, "{} is not a member of the property", name)
            }
            Error::OutOfRange(detail) => write!(f, "{}", detail),
            Error::UnknownCommand(tag) => write!(f, "Unknown command: {}", tag),
            Error::ConfigIo(detail) => write!(f, "{}", detail),
            Error::InvalidName(detail) => write!(f, "{}", detail),
            Error::BadFormat(detail) => write!(f, "{}", detail),
            Error::Fatal(detail) => write!(f, "{}", detail),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
