// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::percent::decode_or_raw;
use crate::Packet;

/// Sender-supplied, per-file parameters carried on a metadata packet.
///
/// `M : version : urlenc(file_name) : urlenc(file_type) : file_size :
/// num_chunks : packet_count : max_degree : density : fps : chunk_size :
/// redundancy : ecl : meta_checksum : file_checksum : encoder_version :
/// lt_params…`
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub version: String,
    pub file_name: String,
    pub file_type: String,
    /// `-1` is the sentinel for an unparseable `file_size` field.
    pub file_size: i64,
    pub num_chunks: usize,
    pub packet_count: u64,
    pub max_degree: u32,
    pub density: f64,
    pub fps: String,
    pub chunk_size: usize,
    pub redundancy: u32,
    pub ecl: String,
    pub meta_checksum: String,
    pub file_checksum: String,
    pub encoder_version: String,
    pub lt_params: String,
}

fn field<'a>(fields: &[&'a str], idx: usize) -> Option<&'a str> {
    fields.get(idx).copied().filter(|s| !s.is_empty())
}

pub(crate) fn parse(fields: &[&str]) -> Packet {
    // Minimum shape: M, version, file_name, file_type, file_size, num_chunks.
    // Everything from packet_count onward is optional and defaulted.
    if fields.len() < 6 {
        return Packet::Unknown("metadata packet too short");
    }

    let version = field(fields, 1).unwrap_or_default().to_string();
    let file_name = decode_or_raw(field(fields, 2).unwrap_or_default());
    let file_type = decode_or_raw(field(fields, 3).unwrap_or_default());

    let file_size = match field(fields, 4) {
        Some(s) => s.parse::<i64>().unwrap_or(-1),
        None => -1,
    };

    let num_chunks = match field(fields, 5) {
        Some(s) => match s.parse::<usize>() {
            Ok(0) | Err(_) => return Packet::Unknown("invalid num_chunks"),
            Ok(n) => n,
        },
        None => return Packet::Unknown("invalid num_chunks"),
    };

    let packet_count = field(fields, 6).and_then(|s| s.parse().ok()).unwrap_or(0);
    let max_degree = field(fields, 7).and_then(|s| s.parse().ok()).unwrap_or(1);
    let density = field(fields, 8).and_then(|s| s.parse().ok()).unwrap_or(1.0);
    let fps = field(fields, 9).unwrap_or("30").to_string();
    let chunk_size = field(fields, 10).and_then(|s| s.parse().ok()).unwrap_or(1024);
    let redundancy = field(fields, 11).and_then(|s| s.parse().ok()).unwrap_or(0);
    let ecl = field(fields, 12).unwrap_or("L").to_string();
    let meta_checksum = field(fields, 13).unwrap_or_default().to_string();
    let file_checksum = field(fields, 14).unwrap_or_default().to_string();
    let encoder_version = field(fields, 15).unwrap_or("3.0").to_string();
    let lt_params = if fields.len() > 16 { fields[16..].join(":") } else { String::new() };

    Packet::Metadata(FileMetadata {
        version,
        file_name,
        file_type,
        file_size,
        num_chunks,
        packet_count,
        max_degree,
        density,
        fps,
        chunk_size,
        redundancy,
        ecl,
        meta_checksum,
        file_checksum,
        encoder_version,
        lt_params,
    })
}
