// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

/// `QrError` enumerates the ways a packet or file can fail to be accepted by
/// the decoder. Most variants are non-fatal: they cause a single packet to be
/// dropped, not the session to abort.
#[derive(Debug)]
pub enum QrError {
    /// The QR payload did not match any known wire-format grammar.
    Unrecognized(&'static str),
    /// A numeric or structural field failed to parse.
    MalformedField(&'static str),
    /// Base64 payload could not be decoded.
    InvalidBase64,
    /// A `source_index` or `chunk_index` fell outside `[0, num_chunks)`.
    IndexOutOfRange { index: usize, num_chunks: usize },
    /// The file's assembled byte count did not match the reported `file_size`.
    SizeMismatch { expected: u64, actual: u64 },
    /// An I/O error occurred while reading a frame source or writing to the sink.
    Io(std::io::Error),
}

impl fmt::Display for QrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QrError::Unrecognized(reason) => write!(f, "unrecognized packet: {reason}"),
            QrError::MalformedField(field) => write!(f, "malformed field: {field}"),
            QrError::InvalidBase64 => write!(f, "invalid base64 payload"),
            QrError::IndexOutOfRange { index, num_chunks } => {
                write!(f, "index {index} out of range for num_chunks={num_chunks}")
            }
            QrError::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {expected}, got {actual}")
            }
            QrError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for QrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QrError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for QrError {
    fn from(err: std::io::Error) -> Self {
        QrError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, QrError>;
