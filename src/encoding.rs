use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::error::RenderError;

/// Transient intermediate container, exclusively owned by one job and
/// removed on success and failure alike.
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Sibling path for the intermediate container.
pub fn intermediate_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mosaic".to_owned());
    name.push_str("_temp.avi");
    output.with_file_name(name)
}

/// Maps the caller's fourcc onto the ffmpeg encoder used for the
/// intermediate container. Unknown codes ride on mpeg4 with the fourcc
/// stamped as the vtag.
fn intermediate_codec_args(fourcc: &str) -> Vec<String> {
    let lower = fourcc.to_ascii_lowercase();
    match lower.as_str() {
        "mp4v" => vec!["-c:v".into(), "mpeg4".into(), "-vtag".into(), "mp4v".into()],
        "xvid" => vec!["-c:v".into(), "mpeg4".into(), "-vtag".into(), "XVID".into()],
        "mjpg" => vec!["-c:v".into(), "mjpeg".into()],
        "avc1" | "h264" => vec!["-c:v".into(), "libx264".into()],
        _ => vec![
            "-c:v".into(),
            "mpeg4".into(),
            "-vtag".into(),
            fourcc.to_owned(),
        ],
    }
}

/// Ordered append-only frame sink: rgb24 frames piped into an ffmpeg
/// process writing the intermediate container. A dedicated writer thread
/// owns the process; frames travel over a bounded channel.
pub struct FramePipe {
    sender: Option<mpsc::SyncSender<Vec<u8>>>,
    worker: Option<JoinHandle<Result<(), String>>>,
}

impl FramePipe {
    pub fn spawn(
        output: &Path,
        width: u32,
        height: u32,
        fps: f64,
        fourcc: &str,
    ) -> Result<Self, RenderError> {
        if fps <= 0.0 {
            return Err(RenderError::WriterInitFailure(format!(
                "frame rate resolved to {fps}"
            )));
        }

        let size = format!("{width}x{height}");
        let fps_arg = format!("{fps}");
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s:v".into(),
            size,
            "-r".into(),
            fps_arg,
            "-i".into(),
            "-".into(),
            "-an".into(),
        ];
        args.extend(intermediate_codec_args(fourcc));
        args.push(output.to_string_lossy().into_owned());

        let mut child = Command::new("ffmpeg")
            .args(args.iter().map(String::as_str))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                RenderError::WriterInitFailure(format!("failed to spawn ffmpeg encoder: {error}"))
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            RenderError::WriterInitFailure("failed to capture ffmpeg stdin".to_owned())
        })?;
        let mut stderr = child.stderr.take();

        let (sender, receiver) = mpsc::sync_channel::<Vec<u8>>(4);
        let worker = thread::Builder::new()
            .name("glyphcast-encoder".to_owned())
            .spawn(move || {
                while let Ok(frame) = receiver.recv() {
                    if let Err(error) = stdin.write_all(&frame) {
                        // Keep draining so the producer is not wedged on a
                        // full channel; the exit status tells the story.
                        while receiver.recv().is_ok() {}
                        let tail = stderr_tail(&mut stderr);
                        return Err(format!("frame write failed: {error} ({tail})"));
                    }
                }
                if let Err(error) = stdin.flush() {
                    return Err(format!("failed to flush ffmpeg stdin: {error}"));
                }
                drop(stdin);

                let status = child
                    .wait()
                    .map_err(|error| format!("failed waiting for ffmpeg: {error}"))?;
                if !status.success() {
                    let tail = stderr_tail(&mut stderr);
                    return Err(format!("ffmpeg exited with {status}: {tail}"));
                }
                Ok(())
            })
            .map_err(|error| {
                RenderError::WriterInitFailure(format!("failed to spawn writer thread: {error}"))
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn write_frame(&self, rgb_frame: Vec<u8>) -> Result<(), RenderError> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            RenderError::WriterInitFailure("frame writer already finalized".to_owned())
        })?;
        sender.send(rgb_frame).map_err(|_| {
            RenderError::WriterInitFailure("frame writer terminated early".to_owned())
        })
    }

    pub fn finish(mut self) -> Result<(), RenderError> {
        drop(self.sender.take());
        let handle = self
            .worker
            .take()
            .ok_or_else(|| RenderError::WriterInitFailure("writer thread missing".to_owned()))?;
        match handle.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(RenderError::WriterInitFailure(reason)),
            Err(_) => Err(RenderError::WriterInitFailure(
                "writer thread panicked".to_owned(),
            )),
        }
    }
}

/// Second pass: transcodes the intermediate artifact to the H.264 MP4
/// delivery format. Fatal on failure; no partial output survives.
/// yuv420p needs even dimensions, and a glyph canvas is often odd, so
/// both axes are truncated to the nearest even pixel.
pub fn transcode(intermediate: &Path, output: &Path) -> Result<(), RenderError> {
    let result = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(intermediate)
        .args(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-an"])
        .arg(output)
        .output()
        .map_err(|error| RenderError::TranscodeFailure(format!("failed to run ffmpeg: {error}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(RenderError::TranscodeFailure(format!(
            "ffmpeg exited with {}: {}",
            result.status,
            last_chars(stderr.trim(), 500)
        )));
    }
    Ok(())
}

fn stderr_tail(stderr: &mut Option<std::process::ChildStderr>) -> String {
    let Some(mut pipe) = stderr.take() else {
        return String::new();
    };
    let mut buffer = Vec::new();
    if pipe.read_to_end(&mut buffer).is_err() {
        return String::new();
    }
    last_chars(String::from_utf8_lossy(&buffer).trim(), 500)
}

fn last_chars(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_owned();
    }
    text.chars().skip(count - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_path_is_a_sibling_avi() {
        let path = intermediate_path(Path::new("/tmp/out/render.mp4"));
        assert_eq!(path, Path::new("/tmp/out/render_temp.avi"));
    }

    #[test]
    fn known_fourccs_map_to_encoders() {
        assert!(intermediate_codec_args("mp4v").contains(&"mpeg4".to_owned()));
        assert!(intermediate_codec_args("MJPG").contains(&"mjpeg".to_owned()));
        assert!(intermediate_codec_args("avc1").contains(&"libx264".to_owned()));
    }

    #[test]
    fn unknown_fourcc_rides_on_mpeg4_with_vtag() {
        let args = intermediate_codec_args("ZZZZ");
        assert!(args.contains(&"mpeg4".to_owned()));
        assert!(args.contains(&"ZZZZ".to_owned()));
    }

    #[test]
    fn zero_fps_cannot_initialize_the_writer() {
        let result = FramePipe::spawn(Path::new("/tmp/never.avi"), 8, 8, 0.0, "mp4v");
        assert!(matches!(result, Err(RenderError::WriterInitFailure(_))));
    }

    #[test]
    fn temp_artifact_removes_file_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("scratch.avi");
        fs::write(&path, b"frames").expect("fixture should write");

        {
            let _artifact = TempArtifact::new(path.clone());
        }
        assert!(!path.exists());
    }

    #[test]
    fn temp_artifact_tolerates_missing_file() {
        let artifact = TempArtifact::new(PathBuf::from("/tmp/never-existed.avi"));
        drop(artifact);
    }

    #[test]
    fn last_chars_truncates_from_the_front() {
        assert_eq!(last_chars("abcdef", 3), "def");
        assert_eq!(last_chars("ab", 3), "ab");
    }
}
