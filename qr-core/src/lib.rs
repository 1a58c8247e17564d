// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Shared types used across the QR fountain decoder crates: the error type,
//! checksum primitives (MD5, SHA-256, FNV-1a-32), and the file identity
//! scheme used to correlate packets to files.

pub mod checksum;
mod error;
mod fileid;

pub use error::{QrError, Result};
pub use fileid::FileId;
