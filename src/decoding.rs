use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::error::RenderError;

/// Intrinsic properties of the source's video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Native frame rate; 0.0 when the container does not declare one.
    pub fps: f64,
}

fn unreadable(path: &Path, reason: impl Into<String>) -> RenderError {
    RenderError::SourceUnreadable {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Probes the first video stream with ffprobe. The decoder pipe cannot
/// seek, so geometry and the native rate are established here instead of
/// by reading and rewinding a frame.
pub fn probe(path: &Path) -> Result<StreamInfo, RenderError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map_err(|error| unreadable(path, format!("failed to run ffprobe: {error}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unreadable(path, stderr.trim().to_owned()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .next()
        .ok_or_else(|| unreadable(path, "no video stream found"))?;
    parse_probe_line(line).ok_or_else(|| unreadable(path, format!("unexpected probe output '{line}'")))
}

fn parse_probe_line(line: &str) -> Option<StreamInfo> {
    let mut fields = line.trim().split(',');
    let width = fields.next()?.parse::<u32>().ok()?;
    let height = fields.next()?.parse::<u32>().ok()?;
    let fps = parse_rate(fields.next()?)?;
    Some(StreamInfo { width, height, fps })
}

/// Parses ffprobe's rational rate ("30000/1001", "25/1", occasionally a
/// bare number).
fn parse_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Some((numerator, denominator)) = raw.split_once('/') {
        let numerator = numerator.parse::<f64>().ok()?;
        let denominator = denominator.parse::<f64>().ok()?;
        if denominator == 0.0 {
            return Some(0.0);
        }
        Some(numerator / denominator)
    } else {
        raw.parse::<f64>().ok()
    }
}

/// Ordered frame source: an ffmpeg rawvideo pipe with a dedicated reader
/// thread feeding a bounded channel. Frames arrive in stream order,
/// scaled to the requested geometry, as packed rgb24.
pub struct VideoSource {
    receiver: mpsc::Receiver<Vec<u8>>,
    worker: Option<JoinHandle<Result<(), String>>>,
    child: Child,
    path: PathBuf,
}

impl VideoSource {
    pub fn open(path: &Path, width: u32, height: u32) -> Result<Self, RenderError> {
        let size = format!("{width}x{height}");
        let (sender, receiver) = mpsc::sync_channel::<Vec<u8>>(4);

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", &size])
            .args(["-sws_flags", "area", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| unreadable(path, format!("failed to spawn ffmpeg decoder: {error}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| unreadable(path, "failed to capture ffmpeg stdout"))?;
        let frame_size = width as usize * height as usize * 3;

        let worker = thread::Builder::new()
            .name("glyphcast-decoder".to_owned())
            .spawn(move || loop {
                let mut buffer = vec![0u8; frame_size];
                match stdout.read_exact(&mut buffer) {
                    Ok(()) => {
                        if sender.send(buffer).is_err() {
                            return Ok(());
                        }
                    }
                    Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
                        return Ok(())
                    }
                    Err(error) => return Err(format!("failed to read from ffmpeg: {error}")),
                }
            })
            .map_err(|error| unreadable(path, format!("failed to spawn reader thread: {error}")))?;

        Ok(Self {
            receiver,
            worker: Some(worker),
            child,
            path: path.to_path_buf(),
        })
    }

    /// Next frame in stream order, or `None` once the source is drained.
    pub fn read_frame(&self) -> Option<Vec<u8>> {
        self.receiver.recv().ok()
    }

    pub fn finish(mut self) -> Result<(), RenderError> {
        let _ = self.child.kill();
        let _ = self.child.wait();

        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(reason)) => Err(unreadable(&self.path, reason)),
                Err(_) => Err(unreadable(&self.path, "decoder thread panicked")),
            }
        } else {
            Ok(())
        }
    }
}
