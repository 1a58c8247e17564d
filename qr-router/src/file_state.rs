// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::time::Instant;

use qr_core::FileId;
use qr_fountain::{FinalizeError, FountainDecoder};
use qr_wire::{DataPacket, DataPayload, FileMetadata};

/// The outcome of routing one data packet to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOutcome {
    /// `packet_id` had already been seen for this file.
    Duplicate,
    /// The packet's chunk index (or one of a coded packet's source indices)
    /// fell outside this file's `num_chunks`; dropped before reaching the
    /// decoder. Only reachable via file-id routing, where a packet's
    /// self-declared `num_chunks` can disagree with the file it was matched
    /// to.
    Invalid,
    /// Chunk indices newly recovered as a result of this packet (possibly
    /// empty, e.g. a coded packet that only narrowed an unresolved set).
    Recovered(Vec<usize>),
}

/// A snapshot of one file's packet-level telemetry, read-only over the
/// counters [`FileState::ingest`] accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileTelemetry {
    pub duplicate_count: u64,
    pub invalid_count: u64,
}

/// Per-file mutable record: metadata, identity, the LT decoder, and
/// telemetry. Owned exclusively by the [`crate::Router`].
pub struct FileState {
    pub metadata: FileMetadata,
    pub file_id: FileId,
    pub file_name: String,
    pub first_seen: Instant,
    pub last_seen: Instant,
    duplicate_count: u64,
    invalid_count: u64,
    decoder: FountainDecoder,
    seen_packet_ids: HashSet<u64>,
}

impl FileState {
    pub fn from_metadata(metadata: FileMetadata) -> Self {
        let file_id = FileId::derive(&metadata.file_name, &metadata.file_checksum);
        let file_name = metadata.file_name.clone();
        let file_size = (metadata.file_size >= 0).then_some(metadata.file_size as u64);
        let decoder = FountainDecoder::new(metadata.num_chunks, file_size);
        let now = Instant::now();

        FileState {
            metadata,
            file_id,
            file_name,
            first_seen: now,
            last_seen: now,
            duplicate_count: 0,
            invalid_count: 0,
            decoder,
            seen_packet_ids: HashSet::new(),
        }
    }

    /// Synthesizes an orphan bucket for data packets with no matching file:
    /// `metadata.num_chunks = num_chunks`, zero `file_size`.
    pub fn new_orphan(num_chunks: usize) -> Self {
        let file_name = format!("unknown_{num_chunks}chunks");
        let metadata = FileMetadata {
            version: String::new(),
            file_name: file_name.clone(),
            file_type: String::new(),
            file_size: 0,
            num_chunks,
            packet_count: 0,
            max_degree: 1,
            density: 1.0,
            fps: "30".to_string(),
            chunk_size: 1024,
            redundancy: 0,
            ecl: "L".to_string(),
            meta_checksum: String::new(),
            file_checksum: String::new(),
            encoder_version: "3.0".to_string(),
            lt_params: String::new(),
        };
        FileState::from_metadata(metadata)
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Routes one data packet through duplicate suppression and
    /// bounds-validation into the decoder.
    pub fn ingest(&mut self, packet: &DataPacket) -> DataOutcome {
        self.touch();

        if !self.seen_packet_ids.insert(packet.packet_id) {
            self.duplicate_count += 1;
            return DataOutcome::Duplicate;
        }

        if !self.fits_within_num_chunks(&packet.payload) {
            self.invalid_count += 1;
            return DataOutcome::Invalid;
        }

        let mut recovered = Vec::new();
        match &packet.payload {
            DataPayload::Systematic { chunk_index, bytes } => {
                if self.decoder.add_direct_chunk(*chunk_index, bytes.clone()) {
                    recovered.push(*chunk_index);
                }
            }
            DataPayload::SystematicMulti { records } => {
                for (chunk_index, bytes) in records {
                    if self.decoder.add_direct_chunk(*chunk_index, bytes.clone()) {
                        recovered.push(*chunk_index);
                    }
                }
            }
            DataPayload::Coded { source_indices, xor_payload } => {
                recovered.extend(self.decoder.add_coded_packet(source_indices.clone(), xor_payload.clone()));
            }
        }

        DataOutcome::Recovered(recovered)
    }

    /// `true` if every chunk index the payload references is within this
    /// file's `num_chunks`. The wire codec already validates indices against
    /// the packet's own declared `num_chunks`, but file-id routing (rule 1)
    /// can match a packet to a file whose actual `num_chunks` disagrees with
    /// it, so this is re-checked here against the file's own metadata.
    fn fits_within_num_chunks(&self, payload: &DataPayload) -> bool {
        let total = self.metadata.num_chunks;
        match payload {
            DataPayload::Systematic { chunk_index, .. } => *chunk_index < total,
            DataPayload::SystematicMulti { records } => records.iter().all(|(i, _)| *i < total),
            DataPayload::Coded { source_indices, .. } => source_indices.iter().all(|i| *i < total),
        }
    }

    /// A read-only snapshot of this file's packet-level telemetry.
    pub fn telemetry(&self) -> FileTelemetry {
        FileTelemetry { duplicate_count: self.duplicate_count, invalid_count: self.invalid_count }
    }

    pub fn progress(&self) -> (usize, usize) {
        self.decoder.progress()
    }

    pub fn missing_indices(&self) -> Vec<usize> {
        self.decoder.missing_indices()
    }

    pub fn pending_coded_count(&self) -> usize {
        self.decoder.pending_coded_count()
    }

    pub fn completed(&self) -> bool {
        let (recovered, total) = self.decoder.progress();
        recovered == total
    }

    pub fn finalize(&self) -> Result<Vec<u8>, FinalizeError> {
        self.decoder.finalize()
    }

    pub fn is_orphan(&self) -> bool {
        self.metadata.file_checksum.is_empty() && self.file_name.starts_with("unknown_")
    }
}
