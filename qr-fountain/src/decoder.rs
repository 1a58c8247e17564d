// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

/// A not-yet-resolvable fountain packet parked until enough of its sources
/// become known. Never stored with fewer than two unknown sources.
struct PendingCoded {
    source_indices: Vec<usize>,
    payload: Vec<u8>,
}

/// Why [`FountainDecoder::finalize`] could not produce a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    /// End of stream reached with fewer than `total` chunks recovered.
    Incomplete { recovered: usize, total: usize },
}

impl fmt::Display for FinalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalizeError::Incomplete { recovered, total } => {
                write!(f, "incomplete: recovered {recovered} of {total} chunks")
            }
        }
    }
}

impl std::error::Error for FinalizeError {}

/// Holds one file's recovered chunks and pending coded packets, and runs the
/// peeling decoder. `num_chunks` is fixed for the lifetime of the decoder;
/// `initialize` replaces it wholesale rather than mutating it in place.
pub struct FountainDecoder {
    num_chunks: usize,
    file_size: Option<u64>,
    chunks: Vec<Option<Vec<u8>>>,
    recovered: usize,
    pending_coded: Vec<PendingCoded>,
}

impl FountainDecoder {
    pub fn new(num_chunks: usize, file_size: Option<u64>) -> Self {
        FountainDecoder {
            num_chunks,
            file_size,
            chunks: vec![None; num_chunks],
            recovered: 0,
            pending_coded: Vec::new(),
        }
    }

    /// Idempotent: resets all recovered chunks and pending packets.
    pub fn initialize(&mut self, num_chunks: usize, file_size: Option<u64>) {
        *self = Self::new(num_chunks, file_size);
    }

    /// Stores `bytes` as `chunk_index` if not already known, cascading any
    /// pending coded packets this unlocks. Returns `true` if newly
    /// recovered; `false` on duplicate or out-of-range index.
    pub fn add_direct_chunk(&mut self, chunk_index: usize, bytes: Vec<u8>) -> bool {
        !self.recover_chunk(chunk_index, bytes).is_empty()
    }

    /// Reduces a coded packet against currently known chunks, resolving it
    /// immediately if it collapses to degree 0 or 1, else parking it.
    /// Returns every chunk index newly recovered as a result (possibly via
    /// cascading peels), in recovery order.
    pub fn add_coded_packet(&mut self, source_indices: Vec<usize>, payload: Vec<u8>) -> Vec<usize> {
        let mut remaining = Vec::with_capacity(source_indices.len());
        let mut payload = payload;
        for j in source_indices {
            match self.chunks.get(j) {
                Some(Some(known)) => xor_into(&mut payload, known),
                _ => remaining.push(j),
            }
        }

        match remaining.len() {
            0 => Vec::new(),
            1 => self.recover_chunk(remaining[0], payload),
            _ => {
                self.pending_coded.push(PendingCoded { source_indices: remaining, payload });
                Vec::new()
            }
        }
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.recovered, self.num_chunks)
    }

    /// Chunk indices not yet recovered, in ascending order.
    pub fn missing_indices(&self) -> Vec<usize> {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.is_none().then_some(i))
            .collect()
    }

    /// Number of coded packets still parked waiting for further chunks.
    pub fn pending_coded_count(&self) -> usize {
        self.pending_coded.len()
    }

    /// Concatenates recovered chunks in `chunk_index` order and truncates to
    /// `file_size` if known and smaller. Does not verify the file checksum;
    /// see [`crate::verify`].
    pub fn finalize(&self) -> Result<Vec<u8>, FinalizeError> {
        if self.recovered != self.num_chunks {
            return Err(FinalizeError::Incomplete { recovered: self.recovered, total: self.num_chunks });
        }

        let mut out = Vec::new();
        for chunk in &self.chunks {
            out.extend_from_slice(chunk.as_ref().expect("recovered == num_chunks"));
        }

        if let Some(size) = self.file_size {
            if (size as usize) < out.len() {
                out.truncate(size as usize);
            }
        }

        Ok(out)
    }

    /// Stores `bytes` at `index` if new, then drains the peeling worklist:
    /// every pending packet containing a just-recovered index is reduced,
    /// and any that collapse to degree 1 are recovered in turn.
    fn recover_chunk(&mut self, index: usize, bytes: Vec<u8>) -> Vec<usize> {
        if index >= self.num_chunks || self.chunks[index].is_some() {
            return Vec::new();
        }

        self.chunks[index] = Some(bytes);
        self.recovered += 1;

        let mut newly_recovered = vec![index];
        let mut worklist = vec![index];

        while let Some(i) = worklist.pop() {
            let known = self.chunks[i].clone().expect("just recovered");

            let mut j = 0;
            while j < self.pending_coded.len() {
                let Some(pos) = self.pending_coded[j].source_indices.iter().position(|&x| x == i) else {
                    j += 1;
                    continue;
                };

                xor_into(&mut self.pending_coded[j].payload, &known);
                self.pending_coded[j].source_indices.remove(pos);

                match self.pending_coded[j].source_indices.len() {
                    0 => {
                        self.pending_coded.remove(j);
                    }
                    1 => {
                        let pkt = self.pending_coded.remove(j);
                        let new_index = pkt.source_indices[0];
                        if new_index < self.num_chunks && self.chunks[new_index].is_none() {
                            self.chunks[new_index] = Some(pkt.payload);
                            self.recovered += 1;
                            newly_recovered.push(new_index);
                            worklist.push(new_index);
                        }
                    }
                    _ => j += 1,
                }
            }
        }

        newly_recovered
    }
}

/// Byte-wise XOR of `a` with `b`, defined over `min(|a|,|b|)` bytes; trailing
/// bytes beyond the shorter operand are taken from the longer one.
fn xor_into(a: &mut Vec<u8>, b: &[u8]) {
    let common = a.len().min(b.len());
    for i in 0..common {
        a[i] ^= b[i];
    }
    if b.len() > a.len() {
        a.extend_from_slice(&b[a.len()..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_file_recovers_from_one_packet() {
        let mut dec = FountainDecoder::new(1, Some(6));
        assert!(dec.add_direct_chunk(0, b"HELLO\n".to_vec()));
        assert_eq!(dec.progress(), (1, 1));
        assert_eq!(dec.finalize().unwrap(), b"HELLO\n");
    }

    #[test]
    fn three_chunk_systematic_recovery_any_order() {
        let c0 = vec![0x10u8; 8];
        let c1 = vec![0x20u8; 8];
        let c2 = vec![0x30u8; 8];

        let mut dec = FountainDecoder::new(3, None);
        assert!(dec.add_direct_chunk(2, c2.clone()));
        assert!(dec.add_direct_chunk(1, c1.clone()));
        assert!(dec.add_direct_chunk(0, c0.clone()));

        let expected: Vec<u8> = [c0, c1, c2].concat();
        assert_eq!(dec.finalize().unwrap(), expected);
    }

    #[test]
    fn peels_chunks_from_coded_packets() {
        let c0 = vec![0x10u8; 8];
        let c1 = vec![0x20u8; 8];
        let c2 = vec![0x30u8; 8];

        let mut xor01 = c0.clone();
        xor_into(&mut xor01, &c1);
        let mut xor12 = c1.clone();
        xor_into(&mut xor12, &c2);

        let mut dec = FountainDecoder::new(3, None);
        assert!(dec.add_direct_chunk(0, c0.clone()));

        let recovered = dec.add_coded_packet(vec![0, 1], xor01);
        assert_eq!(recovered, vec![1]);

        let recovered = dec.add_coded_packet(vec![1, 2], xor12);
        assert_eq!(recovered, vec![2]);

        let expected: Vec<u8> = [c0, c1, c2].concat();
        assert_eq!(dec.finalize().unwrap(), expected);
    }

    #[test]
    fn duplicate_direct_chunk_is_not_newly_recovered() {
        let mut dec = FountainDecoder::new(3, None);
        assert!(dec.add_direct_chunk(1, vec![0xaa; 4]));
        assert!(!dec.add_direct_chunk(1, vec![0xaa; 4]));
        assert!(!dec.add_direct_chunk(1, vec![0xaa; 4]));
        assert_eq!(dec.progress(), (1, 3));
    }

    #[test]
    fn out_of_range_direct_chunk_is_ignored() {
        let mut dec = FountainDecoder::new(3, None);
        assert!(!dec.add_direct_chunk(7, vec![0u8; 4]));
        assert_eq!(dec.progress(), (0, 3));
    }

    #[test]
    fn degree_two_coded_packet_of_known_sources_peels_to_nothing() {
        let c0 = vec![0x10u8; 8];
        let c1 = vec![0x10u8; 8];
        let mut xor = c0.clone();
        xor_into(&mut xor, &c1);

        let mut dec = FountainDecoder::new(2, None);
        assert!(dec.add_direct_chunk(0, c0));
        assert!(dec.add_direct_chunk(1, c1));

        // Both sources already known: the packet reduces to the zero
        // payload and is dropped, not treated as a spurious new chunk.
        let recovered = dec.add_coded_packet(vec![0, 1], xor);
        assert!(recovered.is_empty());
    }

    #[test]
    fn finalize_reports_incomplete_at_eos() {
        let mut dec = FountainDecoder::new(3, None);
        dec.add_direct_chunk(0, vec![1, 2, 3]);
        assert_eq!(dec.finalize(), Err(FinalizeError::Incomplete { recovered: 1, total: 3 }));
    }

    #[test]
    fn finalize_truncates_to_file_size() {
        let mut dec = FountainDecoder::new(1, Some(3));
        dec.add_direct_chunk(0, vec![1, 2, 3, 4, 5, 0]);
        assert_eq!(dec.finalize().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn xor_preserves_trailing_bytes_of_longer_operand() {
        let mut a = vec![0x01, 0x02, 0x03];
        xor_into(&mut a, &[0xff, 0xff, 0xff, 0xaa, 0xbb]);
        assert_eq!(a, vec![0xfe, 0xfd, 0xfc, 0xaa, 0xbb]);
    }
}
