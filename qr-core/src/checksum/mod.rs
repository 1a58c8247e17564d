// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hashing algorithms used for file identity and integrity verification.

mod fnv;
mod md5;
mod sha256;

pub use fnv::{fnv1a32_base36, looks_like_fnv_base36};
pub use md5::Md5;
pub use sha256::sha256_hex;
