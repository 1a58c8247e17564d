// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The concurrent decode pipeline: a frame source and QR extractor
//! (collaborator traits, with a reference implementation of each), the
//! worker-pool coordinator that reorders and feeds the router, and the
//! persistence sink.

mod coordinator;
mod frame_source;
mod qr_extractor;
mod sink;

pub use coordinator::{run, CancellationToken, PipelineConfig, SessionSummary};
pub use frame_source::{Frame, FrameSource, FrameSourceConfig, ImageSequenceFrameSource, Rotation};
pub use qr_extractor::{Detection, ManifestQrDecoder, QrDecoder, QrExtractor, Rect};
pub use sink::{IntegrityReport, PartialDescriptor, ReportBuilder, SaveOutcome, Sink};
