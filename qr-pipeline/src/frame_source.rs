// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use qr_core::QrError;

/// One decoded video frame: packed 8-bit RGB pixels, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub timestamp_s: f64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A fixed rotation applied to every frame before it reaches the QR
/// extractor, matching the wire-independent orientation hints a capture
/// pipeline may need (e.g. a camera mounted sideways).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

/// Configuration shared by every [`FrameSource`] implementation.
#[derive(Debug, Clone)]
pub struct FrameSourceConfig {
    pub start_offset_s: f64,
    pub max_frames: Option<u64>,
    pub sample_rate_fps: Option<f64>,
    pub rotation: Rotation,
    /// Downscale each frame so its longer side is at most `N` pixels.
    pub downscale: Option<u32>,
    /// Process every Nth frame; `1` processes every frame.
    pub skip: u64,
}

impl Default for FrameSourceConfig {
    fn default() -> Self {
        FrameSourceConfig {
            start_offset_s: 0.0,
            max_frames: None,
            sample_rate_fps: None,
            rotation: Rotation::None,
            downscale: None,
            skip: 1,
        }
    }
}

/// Produces a bounded, lazy sequence of frames. `next_frame` returns `None`
/// at end of stream, `Some(Err(_))` on a permanent error that terminates the
/// sequence; transient decode errors are retried/skipped internally and
/// never surface here.
///
/// Implementations must not produce faster than the downstream bounded
/// queue can absorb — in practice this falls out of using a bounded channel
/// to hand frames to the pipeline's worker pool.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Option<Result<Frame, QrError>>;
}

fn apply_transforms(mut image: DynamicImage, config: &FrameSourceConfig) -> DynamicImage {
    image = match config.rotation {
        Rotation::None => image,
        Rotation::Rotate90 => image.rotate90(),
        Rotation::Rotate180 => image.rotate180(),
        Rotation::Rotate270 => image.rotate270(),
    };

    if let Some(max_side) = config.downscale {
        let (w, h) = image.dimensions();
        if w.max(h) > max_side {
            image = image.resize(max_side, max_side, FilterType::Triangle);
        }
    }

    image
}

/// A reference [`FrameSource`] over a directory of already-extracted frame
/// images, named so that lexicographic order is frame order (e.g.
/// `frame_00000.png`). The real video-container demuxer and live-camera
/// capture are external collaborators that satisfy the same trait; this
/// implementation exists to make the pipeline runnable and testable without
/// one.
pub struct ImageSequenceFrameSource {
    paths: Vec<PathBuf>,
    config: FrameSourceConfig,
    fps: f64,
    next_pos: usize,
    emitted: u64,
}

impl ImageSequenceFrameSource {
    pub fn new(dir: impl AsRef<Path>, fps: f64, config: FrameSourceConfig) -> std::io::Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let skip_frames = (config.start_offset_s * fps).round() as usize;
        let next_pos = skip_frames.min(paths.len());

        Ok(ImageSequenceFrameSource { paths, config, fps, next_pos, emitted: 0 })
    }
}

impl FrameSource for ImageSequenceFrameSource {
    fn next_frame(&mut self) -> Option<Result<Frame, QrError>> {
        if let Some(max_frames) = self.config.max_frames {
            if self.emitted >= max_frames {
                return None;
            }
        }

        let skip = self.config.skip.max(1);

        loop {
            if self.next_pos >= self.paths.len() {
                return None;
            }

            let index = self.next_pos as u64;
            let path = self.paths[self.next_pos].clone();
            self.next_pos += 1;

            if index % skip != 0 {
                continue;
            }

            return match image::open(&path) {
                Ok(img) => {
                    let img = apply_transforms(img, &self.config);
                    let (width, height) = img.dimensions();
                    let pixels = img.to_rgb8().into_raw();
                    self.emitted += 1;
                    Some(Ok(Frame {
                        index,
                        timestamp_s: index as f64 / self.fps,
                        width,
                        height,
                        pixels,
                    }))
                }
                Err(err) => {
                    log::debug!("skipping unreadable frame {path:?}: {err}");
                    continue;
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn write_solid_png(path: &Path, width: u32, height: u32, value: u8) {
        let buf: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb([value; 3]));
        buf.save(path).unwrap();
    }

    #[test]
    fn reads_frames_in_lexicographic_order() {
        let dir = tempfile::tempdir().unwrap();
        write_solid_png(&dir.path().join("frame_0000.png"), 4, 4, 10);
        write_solid_png(&dir.path().join("frame_0001.png"), 4, 4, 20);

        let mut source = ImageSequenceFrameSource::new(dir.path(), 30.0, FrameSourceConfig::default()).unwrap();
        let f0 = source.next_frame().unwrap().unwrap();
        let f1 = source.next_frame().unwrap().unwrap();
        assert_eq!(f0.pixels[0], 10);
        assert_eq!(f1.pixels[0], 20);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn honors_max_frames() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write_solid_png(&dir.path().join(format!("frame_{i:04}.png")), 2, 2, i as u8);
        }

        let config = FrameSourceConfig { max_frames: Some(2), ..Default::default() };
        let mut source = ImageSequenceFrameSource::new(dir.path(), 30.0, config).unwrap();
        assert!(source.next_frame().unwrap().is_ok());
        assert!(source.next_frame().unwrap().is_ok());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn honors_skip() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            write_solid_png(&dir.path().join(format!("frame_{i:04}.png")), 2, 2, i as u8);
        }

        let config = FrameSourceConfig { skip: 2, ..Default::default() };
        let mut source = ImageSequenceFrameSource::new(dir.path(), 30.0, config).unwrap();
        let f0 = source.next_frame().unwrap().unwrap();
        let f1 = source.next_frame().unwrap().unwrap();
        assert_eq!(f0.index, 0);
        assert_eq!(f1.index, 2);
        assert!(source.next_frame().is_none());
    }
}
