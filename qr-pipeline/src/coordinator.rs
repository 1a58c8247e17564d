// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use qr_core::QrError;
use qr_router::{Router, RouterSnapshot};
use qr_wire::parse_packet;

use crate::frame_source::{Frame, FrameSource};
use crate::qr_extractor::{Detection, QrDecoder, QrExtractor};
use crate::sink::{IntegrityReport, ReportBuilder, Sink};

/// Queue depth for every bounded channel in the pipeline, per the
/// frame-source/worker/coordinator/sink hops named in the concurrency model.
const QUEUE_DEPTH: usize = 64;

/// Tunables for [`run`]; mirrors the CLI surface's `--threads`/`--timeout`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker pool size running QR extraction in parallel. Bounded 1-16.
    pub workers: usize,
    /// Wall-clock budget for the whole run; `None` means no timeout.
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig { workers: default_worker_count(), timeout: None }
    }
}

fn default_worker_count() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4).clamp(1, 16)
}

/// Session-wide tallies surfaced at EOS, feeding the CLI's summary and
/// `integrity_report.json`.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub packets_rejected: u64,
    pub router: RouterSnapshot,
    pub report: IntegrityReport,
}

/// A cooperative stop signal shared between the frame source, workers, and
/// coordinator. Checked at every suspension point; never aborts a task
/// mid-write.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One frame's extracted detections, tagged with its position for the
/// reorder buffer.
struct WorkerOutput {
    frame_index: u64,
    detections: Vec<Detection>,
}

/// Runs the full decode pipeline to completion: a frame-source producer, a
/// worker pool extracting QR payloads in parallel, this thread acting as the
/// single reordering coordinator feeding the router, and an inline sink pass
/// over whatever [`Router`] state remains at end of stream. Returns once the
/// source is exhausted, the token is cancelled, or the timeout elapses.
pub fn run<S, D>(
    mut source: S,
    make_decoder: impl Fn() -> D + Send + Sync + 'static,
    sink: &mut Sink,
    config: PipelineConfig,
    token: CancellationToken,
) -> Result<SessionSummary, QrError>
where
    S: FrameSource + 'static,
    D: QrDecoder + 'static,
{
    let workers = config.workers.clamp(1, 16);
    let deadline = config.timeout.map(|d| Instant::now() + d);

    let (frame_tx, frame_rx) = sync_channel::<Frame>(QUEUE_DEPTH);
    let (out_tx, out_rx) = sync_channel::<WorkerOutput>(QUEUE_DEPTH);
    let frame_rx = Arc::new(Mutex::new(frame_rx));

    let producer_token = token.clone();
    let producer = thread::spawn(move || {
        loop {
            if producer_token.is_cancelled() {
                break;
            }
            match source.next_frame() {
                Some(Ok(frame)) => {
                    if frame_tx.send(frame).is_err() {
                        break;
                    }
                }
                Some(Err(err)) => {
                    warn!("frame source terminated with a fatal error: {err}");
                    break;
                }
                None => break,
            }
        }
    });

    let worker_handles: Vec<_> = (0..workers)
        .map(|_| {
            let frame_rx = Arc::clone(&frame_rx);
            let out_tx = out_tx.clone();
            let mut extractor = QrExtractor::new(make_decoder());
            thread::spawn(move || loop {
                let frame = {
                    let rx = frame_rx.lock().expect("frame_rx mutex poisoned");
                    rx.recv()
                };
                match frame {
                    Ok(frame) => {
                        let detections = extractor.extract(&frame);
                        if out_tx.send(WorkerOutput { frame_index: frame.index, detections }).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            })
        })
        .collect();
    drop(out_tx);

    let mut router = Router::new();
    let mut summary = SessionSummary::default();
    let mut reorder: BTreeMap<u64, WorkerOutput> = BTreeMap::new();
    let mut next_index = 0u64;

    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                debug!("pipeline timeout reached, cancelling");
                token.cancel();
            }
        }
        if token.is_cancelled() {
            break;
        }

        match out_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(output) => {
                summary.frames_processed += 1;
                reorder.insert(output.frame_index, output);
                while let Some(output) = reorder.remove(&next_index) {
                    drain_detections(&mut router, output.detections, &mut summary);
                    next_index += 1;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    token.cancel();
    let _ = producer.join();
    for handle in worker_handles {
        let _ = handle.join();
    }

    // Collect anything workers had already produced before they noticed
    // the cancellation, then flush the reorder buffer regardless of
    // whether the gap at `next_index` was ever filled.
    while let Ok(output) = out_rx.try_recv() {
        summary.frames_processed += 1;
        reorder.insert(output.frame_index, output);
    }
    for (_, output) in reorder {
        drain_detections(&mut router, output.detections, &mut summary);
    }

    finalize_all(&mut router, sink, &mut summary);
    summary.router = router.snapshot();
    Ok(summary)
}

fn drain_detections(router: &mut Router, detections: Vec<Detection>, summary: &mut SessionSummary) {
    for detection in detections {
        match parse_packet(&detection.payload) {
            qr_wire::Packet::Unknown(reason) => {
                summary.packets_rejected += 1;
                debug!("dropped unrecognized packet: {reason}");
            }
            packet => {
                router.handle_packet(packet);
            }
        }
    }
}

fn finalize_all(router: &mut Router, sink: &mut Sink, summary: &mut SessionSummary) {
    let mut builder = ReportBuilder::default();

    let mut names: Vec<String> = router.files().map(|f| f.file_name.clone()).collect();
    names.extend(router.orphans().map(|f| f.file_name.clone()));

    for name in names {
        let Some(state) = router.file(&name) else { continue };
        if state.completed() {
            match sink.save(state) {
                Ok(outcome) => builder.record(&name, &outcome),
                Err(err) => warn!("failed to save {name}: {err}"),
            }
        } else {
            if let Err(err) = sink.save_partial(state) {
                warn!("failed to write partial descriptor for {name}: {err}");
            }
            builder.record_incomplete(&name);
        }
    }

    // Writing `integrity_report.json` is optional; that decision belongs to
    // the caller (e.g. a `--report` flag), not this function.
    summary.report = builder.finish();
}
