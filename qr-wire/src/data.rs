// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use crate::Packet;

/// The decoded shape of a data packet's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    /// One chunk, verbatim.
    Systematic { chunk_index: usize, bytes: Vec<u8> },
    /// Several chunks, verbatim, packed into one QR payload.
    SystematicMulti { records: Vec<(usize, Vec<u8>)> },
    /// The XOR of two or more chunks.
    Coded { source_indices: Vec<usize>, xor_payload: Vec<u8> },
}

/// A parsed data packet. `file_id` is present only for the file-scoped wire
/// shape; `seed`/`seed_base` are carried but unused by the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPacket {
    pub file_id: Option<String>,
    pub packet_id: u64,
    pub seed: String,
    pub seed_base: String,
    pub num_chunks: usize,
    /// The wire's `chunk_count` field. For coded packets this is *not* the
    /// true degree; the degree is the length of the comma-list in the body.
    pub chunk_count: u64,
    pub payload: DataPayload,
}

fn is_file_id(field: &str) -> bool {
    field.len() == 8 && field.bytes().all(|b| b.is_ascii_hexdigit())
}

pub(crate) fn parse(fields: &[&str]) -> Packet {
    let file_scoped = fields.len() >= 8 && fields.get(1).is_some_and(|f| is_file_id(f));
    let legacy = !file_scoped && fields.len() >= 7;

    if !file_scoped && !legacy {
        return Packet::Unknown("data packet too short");
    }

    let (file_id, rest) = if file_scoped {
        (Some(fields[1].to_ascii_lowercase()), &fields[2..])
    } else {
        (None, &fields[1..])
    };

    // `rest` is now: packet_id, seed, seed_base, num_chunks, chunk_count, body...
    let packet_id = match rest[0].parse::<u64>() {
        Ok(v) => v,
        Err(_) => return Packet::Unknown("malformed packet_id"),
    };
    let seed = rest[1].to_string();
    let seed_base = rest[2].to_string();

    let num_chunks = match rest[3].parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return Packet::Unknown("invalid num_chunks"),
    };

    let chunk_count = match rest[4].parse::<u64>() {
        Ok(n) => n,
        Err(_) => return Packet::Unknown("malformed chunk_count"),
    };

    let body = rest[5..].join(":");

    let payload = match parse_body(&body, packet_id, num_chunks, chunk_count) {
        Ok(p) => p,
        Err(reason) => return Packet::Unknown(reason),
    };

    Packet::Data(DataPacket { file_id, packet_id, seed, seed_base, num_chunks, chunk_count, payload })
}

fn parse_body(
    body: &str,
    packet_id: u64,
    num_chunks: usize,
    chunk_count: u64,
) -> Result<DataPayload, &'static str> {
    if body.contains('|') {
        return parse_systematic_multi(body, num_chunks, chunk_count);
    }

    if let Some((head, tail)) = body.rsplit_once(':') {
        if head.contains(',') {
            return parse_coded(head, tail, num_chunks);
        }
        // Either a bare single-integer "degree-1" position (resolved as
        // systematic, per the sender's systematic-phase-first design) or
        // unexpected noise before the payload; either way the decoded
        // chunk comes from `packet_id mod num_chunks` and `tail`.
        return parse_systematic_single(tail, packet_id, num_chunks, chunk_count);
    }

    parse_systematic_single(body, packet_id, num_chunks, chunk_count)
}

fn parse_systematic_single(
    payload_b64: &str,
    packet_id: u64,
    num_chunks: usize,
    chunk_count: u64,
) -> Result<DataPayload, &'static str> {
    if chunk_count != 1 {
        return Err("chunk_count mismatch");
    }
    let bytes = BASE64_STANDARD.decode(payload_b64).map_err(|_| "invalid base64 payload")?;
    let chunk_index = (packet_id % num_chunks as u64) as usize;
    Ok(DataPayload::Systematic { chunk_index, bytes })
}

fn parse_systematic_multi(
    body: &str,
    num_chunks: usize,
    chunk_count: u64,
) -> Result<DataPayload, &'static str> {
    let mut records = Vec::new();
    for record in body.split('|') {
        let (index_str, b64) = record.split_once(':').ok_or("malformed systematic record")?;
        let chunk_index: usize = index_str.parse().map_err(|_| "malformed chunk_index")?;
        if chunk_index >= num_chunks {
            return Err("chunk_index out of range");
        }
        let bytes = BASE64_STANDARD.decode(b64).map_err(|_| "invalid base64 payload")?;
        records.push((chunk_index, bytes));
    }

    if records.len() as u64 != chunk_count {
        return Err("chunk_count mismatch");
    }

    Ok(DataPayload::SystematicMulti { records })
}

fn parse_coded(indices_csv: &str, payload_b64: &str, num_chunks: usize) -> Result<DataPayload, &'static str> {
    let mut source_indices = Vec::new();
    for token in indices_csv.split(',') {
        let idx: usize = token.parse().map_err(|_| "malformed source_index")?;
        if idx >= num_chunks {
            return Err("source_index out of range");
        }
        source_indices.push(idx);
    }

    let xor_payload = BASE64_STANDARD.decode(payload_b64).map_err(|_| "invalid base64 payload")?;
    Ok(DataPayload::Coded { source_indices, xor_payload })
}
