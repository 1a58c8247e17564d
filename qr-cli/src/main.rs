// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Reconstructs files from a captured animated-QR fountain-code stream.
//!
//! Frame decoding and QR symbol recognition are external collaborators (see
//! `qr-pipeline::FrameSource`/`QrDecoder`); this binary wires the reference
//! implementations — a directory of pre-extracted frame images alongside a
//! manifest of already-decoded payload strings — to the pipeline
//! coordinator, matching the contract a real demuxer/vision pipeline would
//! satisfy.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use qr_pipeline::{
    run, CancellationToken, FrameSourceConfig, ImageSequenceFrameSource, ManifestQrDecoder,
    PipelineConfig, Rotation, SessionSummary, Sink,
};

/// Reconstruct files from an animated-QR fountain-code capture.
#[derive(Parser, Debug)]
#[command(name = "qr-decode", version, about)]
struct Cli {
    /// Directory of pre-extracted frame images, named so lexicographic order
    /// is frame order (e.g. `frame_00000.png`).
    frames_dir: PathBuf,

    /// Manifest of `frame_index<TAB>payload` lines, one decoded QR payload
    /// per line, standing in for a real QR symbol detector's output.
    #[arg(long = "payloads")]
    payloads: PathBuf,

    /// Output directory for reconstructed files.
    #[arg(long, default_value = "out")]
    output: PathBuf,

    /// Source frame rate, used to convert `--start-time` to a frame offset.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Skip this many seconds of frames before decoding begins.
    #[arg(long = "start-time", default_value_t = 0.0)]
    start_time: f64,

    /// Stop after this many frames have been processed.
    #[arg(long = "max-frames")]
    max_frames: Option<u64>,

    /// Number of parallel QR-extraction workers (1-16).
    #[arg(long, default_value_t = default_threads())]
    threads: usize,

    /// Process every Nth frame.
    #[arg(long, default_value_t = 1)]
    skip: u64,

    /// Abort after this many seconds of wall time, saving partial progress.
    #[arg(long)]
    timeout: Option<u64>,

    /// Fixed rotation applied to every frame before QR extraction.
    #[arg(long, value_enum, default_value = "none")]
    rotate: RotationArg,

    /// Downscale frames so their longer side is at most this many pixels.
    #[arg(long)]
    downscale: Option<u32>,

    /// Write `integrity_report.json` summarizing the session.
    #[arg(long)]
    report: bool,

    /// Increase log verbosity; repeatable.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum RotationArg {
    None,
    R90,
    R180,
    R270,
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).clamp(1, 16)
}

fn init_logging(verbosity: u8) {
    let debug_env = std::env::var("DEBUG").as_deref() == Ok("1");
    let level = match verbosity {
        0 if debug_env => "debug",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Session Summary");
    println!("=================================================");
    println!("  Frames processed:      {:>8}", summary.frames_processed);
    println!("  Packets rejected:      {:>8}", summary.packets_rejected);
    println!("  Open files:            {:>8}", summary.router.open_files);
    println!("  Orphan buckets:        {:>8}", summary.router.orphan_buckets);
    println!("  Orphan packets routed: {:>8}", summary.router.orphan_packets_routed);
    println!();
    println!("  Verified:   {}", summary.report.verified.len());
    println!("  Corrupt:    {}", summary.report.corrupt.len());
    println!("  Incomplete: {}", summary.report.incomplete.len());
    println!("  Unverified: {}", summary.report.unverified.len());
}

fn exit_code(summary: &SessionSummary) -> ExitCode {
    if !summary.report.corrupt.is_empty() {
        ExitCode::from(3)
    } else if !summary.report.incomplete.is_empty() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let rotation = match cli.rotate {
        RotationArg::None => Rotation::None,
        RotationArg::R90 => Rotation::Rotate90,
        RotationArg::R180 => Rotation::Rotate180,
        RotationArg::R270 => Rotation::Rotate270,
    };

    let frame_config = FrameSourceConfig {
        start_offset_s: cli.start_time,
        max_frames: cli.max_frames,
        sample_rate_fps: None,
        rotation,
        downscale: cli.downscale,
        skip: cli.skip.max(1),
    };

    let source = match ImageSequenceFrameSource::new(&cli.frames_dir, cli.fps, frame_config) {
        Ok(source) => source,
        Err(err) => {
            error!("failed to open frame directory {:?}: {err}", cli.frames_dir);
            return ExitCode::from(1);
        }
    };

    let manifest_text = match std::fs::read_to_string(&cli.payloads) {
        Ok(text) => text,
        Err(err) => {
            error!("failed to read payload manifest {:?}: {err}", cli.payloads);
            return ExitCode::from(1);
        }
    };
    let payloads = ManifestQrDecoder::from_manifest(&manifest_text);

    let mut sink = Sink::new(&cli.output);
    let token = CancellationToken::new();
    let pipeline_config = PipelineConfig {
        workers: cli.threads.clamp(1, 16),
        timeout: cli.timeout.map(Duration::from_secs),
    };

    info!("decoding frames from {:?}", cli.frames_dir);
    let summary = match run(source, move || payloads.clone(), &mut sink, pipeline_config, token) {
        Ok(summary) => summary,
        Err(err) => {
            error!("fatal pipeline error: {err}");
            return ExitCode::from(1);
        }
    };

    if cli.report {
        if let Err(err) = sink.write_integrity_report(&summary.report) {
            error!("failed to write integrity report: {err}");
        }
    }

    print_summary(&summary);
    exit_code(&summary)
}
