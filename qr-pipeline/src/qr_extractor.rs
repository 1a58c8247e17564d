// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{HashMap, VecDeque};

use crate::frame_source::Frame;

/// A detected symbol's bounding box within the frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One decoded QR payload, with its bounds and the dedup window's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub payload: String,
    pub bounds: Rect,
    /// `true` if this payload's prefix was already in the sliding window.
    /// Cosmetic only — the router still suppresses duplicates by
    /// `packet_id`, so correctness never depends on this flag.
    pub duplicate: bool,
}

/// The external collaborator: detects QR symbols in a frame's pixels and
/// returns their decoded payload strings and bounds. Zero detections is a
/// valid result. Implementations may attempt multiple rotations internally
/// before giving up.
pub trait QrDecoder: Send {
    fn decode(&mut self, frame: &Frame) -> Vec<(String, Rect)>;
}

/// A reference [`QrDecoder`] that looks up already-decoded payload strings
/// by `frame.index` instead of recognizing symbols in pixels. The real QR
/// symbol detector is an external collaborator (a vision library) that
/// satisfies the same trait; this implementation exists so the pipeline
/// runs end to end against fixtures without one.
#[derive(Debug, Clone, Default)]
pub struct ManifestQrDecoder {
    payloads_by_frame: HashMap<u64, Vec<String>>,
}

impl ManifestQrDecoder {
    pub fn new(payloads_by_frame: HashMap<u64, Vec<String>>) -> Self {
        ManifestQrDecoder { payloads_by_frame }
    }

    /// Parses a manifest of `frame_index<TAB>payload` lines, one detection
    /// per line; blank lines and lines starting with `#` are skipped.
    pub fn from_manifest(text: &str) -> Self {
        let mut payloads_by_frame: HashMap<u64, Vec<String>> = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((index, payload)) = line.split_once('\t') else { continue };
            let Ok(index) = index.trim().parse::<u64>() else { continue };
            payloads_by_frame.entry(index).or_default().push(payload.to_string());
        }
        ManifestQrDecoder { payloads_by_frame }
    }
}

impl QrDecoder for ManifestQrDecoder {
    fn decode(&mut self, frame: &Frame) -> Vec<(String, Rect)> {
        let bounds = Rect { x: 0, y: 0, width: frame.width, height: frame.height };
        self.payloads_by_frame
            .get(&frame.index)
            .map(|payloads| payloads.iter().map(|p| (p.clone(), bounds)).collect())
            .unwrap_or_default()
    }
}

const DEDUP_PREFIX_LEN: usize = 24;

/// Wraps a [`QrDecoder`] with the sliding-window duplicate-prefix detector
/// named in the extractor's contract.
pub struct QrExtractor<D> {
    decoder: D,
    window: VecDeque<String>,
    capacity: usize,
}

impl<D: QrDecoder> QrExtractor<D> {
    pub fn new(decoder: D) -> Self {
        Self::with_window(decoder, 32)
    }

    pub fn with_window(decoder: D, capacity: usize) -> Self {
        QrExtractor { decoder, window: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn extract(&mut self, frame: &Frame) -> Vec<Detection> {
        self.decoder
            .decode(frame)
            .into_iter()
            .map(|(payload, bounds)| {
                let prefix: String = payload.chars().take(DEDUP_PREFIX_LEN).collect();
                let duplicate = self.window.contains(&prefix);
                if !duplicate {
                    if self.window.len() == self.capacity {
                        self.window.pop_front();
                    }
                    self.window.push_back(prefix);
                }
                Detection { payload, bounds, duplicate }
            })
            .collect()
    }
}
