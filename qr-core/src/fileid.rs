// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use crate::checksum::Md5;

/// An eight lowercase hex character label for a file.
///
/// Derived as the first 8 characters of `file_checksum` if the sender
/// supplied one, else the first 8 characters of `MD5(file_name)`. Stable
/// across sessions for the same logical file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(String);

impl FileId {
    /// Derives a `FileId` from a sender-supplied checksum, if present.
    pub fn from_checksum(checksum: &str) -> Option<Self> {
        if checksum.len() >= 8 {
            Some(FileId(checksum[..8].to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Derives a `FileId` from a file name, by hashing it with MD5.
    pub fn from_file_name(file_name: &str) -> Self {
        let hex = Md5::hex(file_name.as_bytes());
        FileId(hex[..8].to_string())
    }

    /// Derives the `FileId` for a file, preferring `file_checksum` over
    /// `file_name`.
    pub fn derive(file_name: &str, file_checksum: &str) -> Self {
        Self::from_checksum(file_checksum).unwrap_or_else(|| Self::from_file_name(file_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
