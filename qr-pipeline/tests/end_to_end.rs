// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full `run()` coverage for the scenarios `coordinator.rs`'s own unit test
//! doesn't reach: a coded packet recovering a missing chunk, and duplicate or
//! unrecognized packets being tallied without corrupting the final output.

use std::time::Duration;

use qr_pipeline::{CancellationToken, Frame, FrameSource, PipelineConfig, QrDecoder, Rect, Sink};

struct ScriptedSource {
    frames: Vec<Frame>,
    pos: usize,
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Option<Result<Frame, qr_core::QrError>> {
        if self.pos >= self.frames.len() {
            return None;
        }
        let frame = self.frames[self.pos].clone();
        self.pos += 1;
        Some(Ok(frame))
    }
}

fn frame(index: u64) -> Frame {
    Frame { index, timestamp_s: index as f64 / 30.0, width: 1, height: 1, pixels: vec![0, 0, 0] }
}

struct RoundRobinDecoder {
    payloads: std::vec::IntoIter<String>,
}

impl QrDecoder for RoundRobinDecoder {
    fn decode(&mut self, _frame: &Frame) -> Vec<(String, Rect)> {
        match self.payloads.next() {
            Some(payload) => vec![(payload, Rect { x: 0, y: 0, width: 1, height: 1 })],
            None => Vec::new(),
        }
    }
}

fn run_scripted(payloads: Vec<String>) -> (qr_pipeline::SessionSummary, tempfile::TempDir) {
    let frames: Vec<Frame> = (0..payloads.len() as u64).map(frame).collect();
    let source = ScriptedSource { frames, pos: 0 };

    let dir = tempfile::tempdir().unwrap();
    let mut sink = Sink::new(dir.path());
    let token = CancellationToken::new();

    let summary = qr_pipeline::run(
        source,
        move || RoundRobinDecoder { payloads: payloads.clone().into_iter() },
        &mut sink,
        PipelineConfig { workers: 1, timeout: Some(Duration::from_secs(5)) },
        token,
    )
    .unwrap();

    (summary, dir)
}

#[test]
fn s3_coded_packet_recovers_the_missing_chunk_end_to_end() {
    // sha256 of "AAAAAAAABBBBBBBBCCCCCCCC".
    let checksum = "9a7124bba7f29f5a4002d1165e97891b38b6685491ee52c9c8483ab280fd0d87";
    let payloads = vec![
        format!("M:1:parts.bin:application/octet-stream:24:3:0:1:1.0:30:8:0:L::{checksum}"),
        "D:0:s:sb:3:1:QUFBQUFBQUE=".to_string(), // chunk 0, "AAAAAAAA"
        "D:1:s:sb:3:1:QkJCQkJCQkI=".to_string(), // chunk 1, "BBBBBBBB"
        // coded over all three sources; chunks 0 and 1 are already known, so
        // this collapses to a direct recovery of chunk 2.
        "D:2:s:sb:3:3:0,1,2:QEBAQEBAQEA=".to_string(),
    ];

    let (summary, dir) = run_scripted(payloads);

    assert_eq!(
        std::fs::read(dir.path().join("parts.bin")).unwrap(),
        b"AAAAAAAABBBBBBBBCCCCCCCC"
    );
    assert_eq!(summary.report.verified, vec!["parts.bin".to_string()]);
    assert_eq!(summary.router.open_files, 0, "parts.bin should be fully recovered, not left open");
}

#[test]
fn s4_duplicate_and_unrecognized_packets_are_tallied_without_corrupting_output() {
    let checksum = "3b09aeb6f5f5336beb205d7f720371bc927cd46c21922e334d47ba264acb5ba4";
    let payloads = vec![
        format!("M:1:hello.txt:text/plain:6:1:0:1:1.0:30:1024:0:L::{checksum}"),
        "D:0:s:sb:1:1:SEVMTE8K".to_string(),
        "D:0:s:sb:1:1:SEVMTE8K".to_string(), // duplicate packet_id
        "not a recognized payload at all".to_string(),
    ];

    let (summary, dir) = run_scripted(payloads);

    assert_eq!(std::fs::read(dir.path().join("hello.txt")).unwrap(), b"HELLO\n");
    assert_eq!(summary.report.verified, vec!["hello.txt".to_string()]);
    assert_eq!(summary.packets_rejected, 1);
}
