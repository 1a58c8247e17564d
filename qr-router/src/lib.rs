// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The multi-file router: discovers files from metadata packets and
//! correlates each data packet to the correct in-flight [`FileState`] (or
//! states, for colliding `num_chunks`).
//!
//! Owned by a single thread (the pipeline coordinator); the router and the
//! decoders it drives never need locking.

mod file_state;
mod router;

pub use file_state::{DataOutcome, FileState, FileTelemetry};
pub use router::{RouteOutcome, Router, RouterSnapshot, RoutedData};
