// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The per-file LT fountain decoder and its integrity verifier.
//!
//! [`FountainDecoder`] holds one file's recovered chunks and pending coded
//! packets and runs the belief-propagation peeling algorithm. It knows
//! nothing about packet ids, file names, or routing — that is the router's
//! job. [`verify`] classifies an assembled file against its sender-declared
//! checksum.

mod decoder;
mod verify;

pub use decoder::{FinalizeError, FountainDecoder};
pub use verify::{verify, Verification};
