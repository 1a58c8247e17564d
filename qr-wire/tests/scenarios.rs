// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-level coverage of the concrete end-to-end scenarios, restricted to
//! what the codec alone is responsible for: turning QR payload strings into
//! typed packets. Duplicate suppression and multi-file routing are the
//! router's job and are covered in `qr-router`'s own integration tests.

use qr_wire::{DataPayload, Packet};

#[test]
fn s1_single_chunk_file_parses_metadata_and_systematic_packet() {
    let metadata = match qr_wire::parse_packet("M:1:hello.txt:text/plain:6:1") {
        Packet::Metadata(m) => m,
        other => panic!("expected Metadata, got {other:?}"),
    };
    assert_eq!(metadata.file_name, "hello.txt");
    assert_eq!(metadata.num_chunks, 1);

    let data = match qr_wire::parse_packet("D:0:s:sb:1:1:SEVMTE8K") {
        Packet::Data(d) => d,
        other => panic!("expected Data, got {other:?}"),
    };
    assert_eq!(data.payload, DataPayload::Systematic { chunk_index: 0, bytes: b"HELLO\n".to_vec() });
}

#[test]
fn s2_three_single_chunk_packets_parse_in_reverse_arrival_order() {
    // Sender emits c2, c1, c0 in that order; the wire codec has no notion of
    // order, it just derives chunk_index from packet_id mod num_chunks.
    let c2 = match qr_wire::parse_packet("D:2:s:sb:3:1:MDAwMDAwMDA=") {
        Packet::Data(d) => d,
        other => panic!("expected Data, got {other:?}"),
    };
    let c1 = match qr_wire::parse_packet("D:1:s:sb:3:1:MDAwMDAwMDA=") {
        Packet::Data(d) => d,
        other => panic!("expected Data, got {other:?}"),
    };
    let c0 = match qr_wire::parse_packet("D:0:s:sb:3:1:MDAwMDAwMDA=") {
        Packet::Data(d) => d,
        other => panic!("expected Data, got {other:?}"),
    };

    let chunk_index_of = |p: &DataPayload| match p {
        DataPayload::Systematic { chunk_index, .. } => *chunk_index,
        other => panic!("expected Systematic, got {other:?}"),
    };
    assert_eq!(chunk_index_of(&c2.payload), 2);
    assert_eq!(chunk_index_of(&c1.payload), 1);
    assert_eq!(chunk_index_of(&c0.payload), 0);
}

#[test]
fn s3_coded_packet_bodies_parse_their_source_index_sets() {
    use base64::prelude::BASE64_STANDARD;
    use base64::Engine;

    let xor01 = BASE64_STANDARD.encode([0x30u8; 8]);
    let packet = match qr_wire::parse_packet(&format!("D:0:s:sb:3:2:0,1:{xor01}")) {
        Packet::Data(d) => d,
        other => panic!("expected Data, got {other:?}"),
    };
    assert_eq!(
        packet.payload,
        DataPayload::Coded { source_indices: vec![0, 1], xor_payload: vec![0x30; 8] }
    );

    let xor12 = BASE64_STANDARD.encode([0x10u8; 8]);
    let packet = match qr_wire::parse_packet(&format!("D:1:s:sb:3:2:1,2:{xor12}")) {
        Packet::Data(d) => d,
        other => panic!("expected Data, got {other:?}"),
    };
    assert_eq!(
        packet.payload,
        DataPayload::Coded { source_indices: vec![1, 2], xor_payload: vec![0x10; 8] }
    );
}

#[test]
fn s4_source_index_out_of_range_is_rejected() {
    // num_chunks=3, so a source index of 7 is out of range.
    let outcome = qr_wire::parse_packet("D:0:s:sb:3:2:0,7:MDAwMDAwMDA=");
    assert_eq!(outcome, Packet::Unknown("source_index out of range"));
}
