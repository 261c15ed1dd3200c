use std::path::Path;
use std::process::{Command, Stdio};

use glyphcast::decoding::{probe, VideoSource};
use glyphcast::encoding::{transcode, FramePipe, TempArtifact};

fn command_available(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn media_tools_available() -> bool {
    command_available("ffmpeg") && command_available("ffprobe")
}

/// 10 frames of test pattern at 30 fps.
fn generate_fixture(path: &Path) {
    let status = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x48:rate=30",
            "-frames:v",
            "10",
        ])
        .arg(path)
        .status()
        .expect("ffmpeg should run");
    assert!(status.success(), "fixture generation failed");
}

#[test]
fn probe_reports_native_geometry_and_rate() {
    if !media_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir should create");
    let input = dir.path().join("fixture.mp4");
    generate_fixture(&input);

    let info = probe(&input).expect("probe should succeed");
    assert_eq!(info.width, 64);
    assert_eq!(info.height, 48);
    assert_eq!(info.fps, 30.0);
}

#[test]
fn decoder_yields_every_frame_in_order_without_drops() {
    if !media_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir should create");
    let input = dir.path().join("fixture.mp4");
    generate_fixture(&input);

    let source = VideoSource::open(&input, 64, 48).expect("source should open");
    let mut frames = 0;
    while let Some(frame) = source.read_frame() {
        assert_eq!(frame.len(), 64 * 48 * 3);
        frames += 1;
    }
    source.finish().expect("decoder should finish cleanly");
    assert_eq!(frames, 10);
}

#[test]
fn writer_and_transcode_produce_a_playable_output_at_declared_rate() {
    if !media_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir should create");
    let output = dir.path().join("out.mp4");
    let intermediate = TempArtifact::new(dir.path().join("out_temp.avi"));

    let writer =
        FramePipe::spawn(intermediate.path(), 32, 24, 15.0, "mp4v").expect("writer should spawn");
    // A declared rate of 15 never drops frames; all 8 must survive.
    for index in 0..8u8 {
        let frame = vec![index * 30; 32 * 24 * 3];
        writer.write_frame(frame).expect("frame should enqueue");
    }
    writer.finish().expect("writer should finalize");
    assert!(intermediate.path().exists());

    transcode(intermediate.path(), &output).expect("transcode should succeed");
    assert!(output.exists());

    let info = probe(&output).expect("output should probe");
    assert_eq!(info.width, 32);
    assert_eq!(info.height, 24);
    assert_eq!(info.fps, 15.0);
}

#[test]
fn transcode_accepts_odd_canvas_dimensions() {
    if !media_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir should create");
    let odd = dir.path().join("odd.avi");
    let output = dir.path().join("out.mp4");

    // Rawvideo tolerates odd dimensions; the H.264 delivery format does
    // not, so the transcode must even them out rather than fail.
    let status = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=63x47:rate=10",
            "-frames:v",
            "5",
            "-c:v",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
        ])
        .arg(&odd)
        .status()
        .expect("ffmpeg should run");
    assert!(status.success(), "fixture generation failed");

    transcode(&odd, &output).expect("transcode should succeed on odd dimensions");

    let info = probe(&output).expect("output should probe");
    assert_eq!(info.width, 62);
    assert_eq!(info.height, 46);
}

#[test]
fn probing_garbage_is_source_unreadable() {
    if !media_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir should create");
    let bogus = dir.path().join("bogus.mp4");
    std::fs::write(&bogus, b"not a container").expect("fixture should write");

    assert!(matches!(
        probe(&bogus),
        Err(glyphcast::error::RenderError::SourceUnreadable { .. })
    ));
}
