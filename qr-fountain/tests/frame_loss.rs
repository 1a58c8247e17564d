// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame loss tolerance: the decoder must reconstruct the file when a
//! substantial fraction of the sender's packets never arrive, as long as
//! enough redundancy survives to cover every chunk.
//!
//! Ten chunks, paired as (0,1) (2,3) (4,5) (6,7) (8,9); each pair's XOR is
//! sent twice (20 packets total: 10 systematic + 10 coded, 100%
//! redundancy). 8 of the 20 packets (40%) never arrive: every odd-indexed
//! chunk's systematic packet is dropped, along with one of the two coded
//! copies for three of the five pairs. Every pair still has at least one
//! even chunk known directly and at least one surviving coded copy, so
//! peeling recovers every odd chunk.

use qr_fountain::FountainDecoder;

const NUM_CHUNKS: usize = 10;
const CHUNK_LEN: usize = 4;

fn chunk(i: usize) -> Vec<u8> {
    vec![(i + 1) as u8; CHUNK_LEN]
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

#[test]
fn reconstructs_after_forty_percent_packet_loss() {
    let mut decoder = FountainDecoder::new(NUM_CHUNKS, Some((NUM_CHUNKS * CHUNK_LEN) as u64));

    // Surviving systematic packets: only the even-indexed chunks.
    for i in (0..NUM_CHUNKS).step_by(2) {
        assert!(decoder.add_direct_chunk(i, chunk(i)));
    }

    // Surviving coded packets: one copy per pair for pairs 0-2, both
    // copies for pairs 3-4 (the duplicate copies for pairs 0-2 are the
    // ones dropped, along with every odd systematic packet above).
    for pair in 0..5 {
        let (a, b) = (pair * 2, pair * 2 + 1);
        let payload = xor(&chunk(a), &chunk(b));
        let copies = if pair < 3 { 1 } else { 2 };
        for _ in 0..copies {
            let recovered = decoder.add_coded_packet(vec![a, b], payload.clone());
            if !recovered.is_empty() {
                assert_eq!(recovered, vec![b]);
            }
        }
    }

    assert_eq!(decoder.progress(), (NUM_CHUNKS, NUM_CHUNKS));
    let expected: Vec<u8> = (0..NUM_CHUNKS).flat_map(chunk).collect();
    assert_eq!(decoder.finalize().unwrap(), expected);
}

#[test]
fn insufficient_redundancy_leaves_file_incomplete() {
    // Same loss pattern, but pair 4's only surviving coded copy is also
    // dropped: chunk 9 now has no path to recovery.
    let mut decoder = FountainDecoder::new(NUM_CHUNKS, None);
    for i in (0..NUM_CHUNKS).step_by(2) {
        decoder.add_direct_chunk(i, chunk(i));
    }
    for pair in 0..4 {
        let (a, b) = (pair * 2, pair * 2 + 1);
        decoder.add_coded_packet(vec![a, b], xor(&chunk(a), &chunk(b)));
    }

    assert_eq!(decoder.progress(), (9, 10));
    assert!(decoder.finalize().is_err());
}
