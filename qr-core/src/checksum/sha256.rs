// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use sha2::{Digest, Sha256};

/// Computes the lowercase hex-encoded SHA-256 digest of `data`.
///
/// Used by the integrity verifier when `file_checksum` has the shape of a
/// SHA-256 hex digest (64 hex characters).
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}
