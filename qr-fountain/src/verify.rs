// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::{debug, warn};
use qr_core::checksum::{fnv1a32_base36, looks_like_fnv_base36, sha256_hex};

/// The integrity verifier's only output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Corrupt { expected: String, actual: String },
    /// No checksum was declared; the file is saved with a warning.
    Unverified,
}

fn looks_like_sha256(checksum: &str) -> bool {
    checksum.len() == 64 && checksum.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Classifies `bytes` against the sender-declared `file_checksum`.
///
/// Selects SHA-256 or FNV-1a-32/base36 by the checksum's length and
/// character set; an empty checksum is `Unverified`, and a checksum that
/// matches neither known shape is treated the same way, since there is
/// nothing meaningful to compare against.
pub fn verify(bytes: &[u8], file_checksum: &str) -> Verification {
    if file_checksum.is_empty() {
        debug!("no checksum declared; file will be saved unverified");
        return Verification::Unverified;
    }

    let actual = if looks_like_sha256(file_checksum) {
        sha256_hex(bytes)
    } else if looks_like_fnv_base36(file_checksum) {
        fnv1a32_base36(bytes)
    } else {
        debug!("checksum {file_checksum:?} matches no known shape; saving unverified");
        return Verification::Unverified;
    };

    let expected = file_checksum.to_ascii_lowercase();
    if actual == expected {
        Verification::Verified
    } else {
        warn!("checksum mismatch: expected {expected}, computed {actual}");
        Verification::Corrupt { expected, actual }
    }
}
