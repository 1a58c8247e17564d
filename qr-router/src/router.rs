// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use log::debug;
use qr_wire::{DataPacket, Packet};

use crate::file_state::{DataOutcome, FileState};

/// One file's outcome from routing a single data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedData {
    pub file_name: String,
    pub outcome: DataOutcome,
}

/// The result of handing one parsed [`Packet`] to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A metadata packet was accepted (new file discovered, or an existing
    /// file's `last_seen` was refreshed).
    Metadata,
    /// A data packet was routed to one or more files.
    Data(Vec<RoutedData>),
    /// The wire codec rejected the packet before it reached the router.
    Rejected(&'static str),
}

/// A point-in-time summary of the router's telemetry, for session
/// summaries and `integrity_report.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterSnapshot {
    pub open_files: usize,
    pub orphan_buckets: usize,
    pub orphan_packets_routed: u64,
}

/// Maintains the router table (`file_name -> FileState`), a secondary
/// `file_id -> file_name` index, and the orphan bucket (`num_chunks ->
/// FileState`). Owned by a single thread; see the coordinator's contract.
#[derive(Default)]
pub struct Router {
    files: HashMap<String, FileState>,
    file_id_index: HashMap<String, String>,
    orphans: HashMap<usize, FileState>,
    orphan_packets_routed: u64,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_packet(&mut self, packet: Packet) -> RouteOutcome {
        match packet {
            Packet::Metadata(m) => {
                self.handle_metadata(m);
                RouteOutcome::Metadata
            }
            Packet::Data(d) => self.handle_data(d),
            Packet::Unknown(reason) => RouteOutcome::Rejected(reason),
        }
    }

    fn handle_metadata(&mut self, metadata: qr_wire::FileMetadata) {
        if let Some(existing) = self.files.get_mut(&metadata.file_name) {
            existing.touch();
            return;
        }

        let state = FileState::from_metadata(metadata);
        self.file_id_index.insert(state.file_id.to_string(), state.file_name.clone());
        self.files.insert(state.file_name.clone(), state);
    }

    fn handle_data(&mut self, d: DataPacket) -> RouteOutcome {
        if let Some(fid) = &d.file_id {
            if let Some(name) = self.file_id_index.get(fid).cloned() {
                let outcome = self
                    .files
                    .get_mut(&name)
                    .expect("file_id_index entries always point at a live file")
                    .ingest(&d);
                return RouteOutcome::Data(vec![RoutedData { file_name: name, outcome }]);
            }
        }

        // Rule 2 (chunk-count match against real files) takes exclusive
        // precedence over rule 3 (orphan bucket): once any real file
        // matches, the orphan for this num_chunks (if one exists from
        // before this file's metadata arrived) stops receiving new
        // packets. It keeps whatever it already absorbed; it is never
        // retroactively reparented to the file.
        let file_matches: Vec<String> = self
            .files
            .iter()
            .filter(|(_, state)| !state.completed() && state.metadata.num_chunks == d.num_chunks)
            .map(|(name, _)| name.clone())
            .collect();

        if !file_matches.is_empty() {
            let results: Vec<RoutedData> = file_matches
                .into_iter()
                .map(|name| {
                    let outcome = self.files.get_mut(&name).expect("just matched").ingest(&d);
                    RoutedData { file_name: name, outcome }
                })
                .collect();

            return RouteOutcome::Data(results);
        }

        if self.orphans.contains_key(&d.num_chunks) {
            let orphan = self.orphans.get_mut(&d.num_chunks).expect("just checked");
            let outcome = orphan.ingest(&d);
            self.orphan_packets_routed += 1;
            return RouteOutcome::Data(vec![RoutedData { file_name: orphan.file_name.clone(), outcome }]);
        }

        debug!("opened orphan bucket for num_chunks={}", d.num_chunks);
        let orphan = FileState::new_orphan(d.num_chunks);
        let name = orphan.file_name.clone();
        self.orphans.insert(d.num_chunks, orphan);
        let outcome = self
            .orphans
            .get_mut(&d.num_chunks)
            .expect("just inserted")
            .ingest(&d);
        self.orphan_packets_routed += 1;
        RouteOutcome::Data(vec![RoutedData { file_name: name, outcome }])
    }

    /// Looks up a file (named or orphan) by its router-table key.
    pub fn file(&self, name: &str) -> Option<&FileState> {
        self.files.get(name).or_else(|| self.orphans.values().find(|o| o.file_name == name))
    }

    /// All named (non-orphan) files, for iteration by the sink/summary.
    pub fn files(&self) -> impl Iterator<Item = &FileState> {
        self.files.values()
    }

    /// All orphan buckets, for iteration by the sink/summary.
    pub fn orphans(&self) -> impl Iterator<Item = &FileState> {
        self.orphans.values()
    }

    pub fn files_mut(&mut self) -> impl Iterator<Item = &mut FileState> {
        self.files.values_mut()
    }

    pub fn orphans_mut(&mut self) -> impl Iterator<Item = &mut FileState> {
        self.orphans.values_mut()
    }

    pub fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            open_files: self.files.values().filter(|f| !f.completed()).count(),
            orphan_buckets: self.orphans.len(),
            orphan_packets_routed: self.orphan_packets_routed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qr_wire::parse_packet;

    #[test]
    fn metadata_creates_file_and_refresh_is_idempotent() {
        let mut router = Router::new();
        router.handle_packet(parse_packet("M:1:a.bin:application/octet-stream:6:1"));
        router.handle_packet(parse_packet("M:1:a.bin:application/octet-stream:6:1"));
        assert_eq!(router.files().count(), 1);
    }

    #[test]
    fn colliding_num_chunks_fan_out_to_both_files() {
        let mut router = Router::new();
        router.handle_packet(parse_packet("M:1:a.bin:application/octet-stream:24:3"));
        router.handle_packet(parse_packet("M:1:b.bin:application/octet-stream:24:3"));

        let outcome = router.handle_packet(parse_packet("D:0:s:sb:3:1:EBAQEBAQEBA="));
        match outcome {
            RouteOutcome::Data(results) => assert_eq!(results.len(), 2),
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_data_packet_opens_an_orphan_bucket() {
        let mut router = Router::new();
        let outcome = router.handle_packet(parse_packet("D:0:s:sb:3:1:EBAQEBAQEBA="));
        match outcome {
            RouteOutcome::Data(results) => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].file_name, "unknown_3chunks");
            }
            other => panic!("expected Data, got {other:?}"),
        }
        assert_eq!(router.snapshot().orphan_buckets, 1);
    }

    #[test]
    fn metadata_arriving_after_orphan_does_not_adopt_its_packets() {
        let mut router = Router::new();
        router.handle_packet(parse_packet("D:0:s:sb:3:1:EBAQEBAQEBA="));
        router.handle_packet(parse_packet("M:1:late.bin:application/octet-stream:24:3"));

        // late.bin now matches num_chunks=3 by rule 2, which takes exclusive
        // precedence over the orphan: the orphan keeps its first packet but
        // never receives another.
        let outcome = router.handle_packet(parse_packet("D:1:s:sb:3:1:ICAgICAgICA="));
        match outcome {
            RouteOutcome::Data(results) => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].file_name, "late.bin");
            }
            other => panic!("expected Data, got {other:?}"),
        }
        assert_eq!(router.snapshot().orphan_packets_routed, 1);
        assert_eq!(router.file("unknown_3chunks").unwrap().progress(), (1, 3));
    }

    #[test]
    fn rejected_packet_never_touches_the_router_table() {
        let mut router = Router::new();
        let outcome = router.handle_packet(parse_packet("garbage"));
        assert_eq!(outcome, RouteOutcome::Rejected("unrecognized prefix"));
        assert_eq!(router.files().count(), 0);
    }
}
