use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    core::{FpsPair, FrameIndex, Resolution, TimeWindow},
    error::{BumpgenError, BumpgenResult},
    stream::Frame,
};

/// Background footage to composite the overlay scene onto.
#[derive(Clone, Debug)]
pub struct BackgroundVideo {
    pub source_path: PathBuf,
    /// Portion of the source file to read. Whole file when absent.
    pub trim: Option<TimeWindow>,
    /// Output-timeline interval during which the overlay is visible.
    pub overlay_window: TimeWindow,
}

impl BackgroundVideo {
    pub fn validate(&self) -> BumpgenResult<()> {
        if let Some(trim) = self.trim {
            let diff = (trim.len_seconds() - self.overlay_window.len_seconds()).abs();
            if diff > 1e-6 {
                return Err(BumpgenError::validation(
                    "background trim length must equal the overlay window length",
                ));
            }
        }
        Ok(())
    }
}

/// Complete description of one encode job.
#[derive(Clone, Debug)]
pub struct EncodeRequest {
    pub resolution: Resolution,
    pub fps: FpsPair,
    pub output_path: PathBuf,
    pub background: Option<BackgroundVideo>,
}

impl EncodeRequest {
    pub fn validate(&self) -> BumpgenResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(BumpgenError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !self.resolution.width.is_multiple_of(2) || !self.resolution.height.is_multiple_of(2) {
            // We target yuv420p output for maximum compatibility.
            return Err(BumpgenError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.fps.input == 0 || self.fps.output == 0 {
            return Err(BumpgenError::validation("encode fps must be non-zero"));
        }
        if let Some(bg) = &self.background {
            bg.validate()?;
        }
        Ok(())
    }
}

/// Result of a completed encode: the written output file.
#[derive(Clone, Debug)]
pub struct EncodedOutput {
    pub path: PathBuf,
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Recursively create the output file's parent directory.
pub fn ensure_output_dir(path: &Path) -> BumpgenResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            BumpgenError::directory_creation(format!("'{}': {e}", parent.display()))
        })?;
    }
    Ok(())
}

fn format_seconds(v: f64) -> String {
    // Trim trailing zeros so filter expressions stay readable.
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Aspect-preserving "scale up then center-crop" chain filling the target
/// resolution exactly.
pub fn scale_crop_filter(resolution: Resolution) -> String {
    let Resolution { width, height } = resolution;
    format!(
        "scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height},setsar=1"
    )
}

/// Two-input composition graph: background (input 0) scaled and cropped
/// to the target resolution, overlay frames (input 1) time-shifted to
/// start at the overlay window and visible only inside it.
pub fn build_filter_graph(resolution: Resolution, overlay_window: TimeWindow) -> String {
    let in_s = format_seconds(overlay_window.start_seconds);
    let out_s = format_seconds(overlay_window.end_seconds);
    format!(
        "[1:v]setpts=PTS+{in_s}/TB[fg];[0:v]{scale}[bg];[bg][fg]overlay=x=0:y=0:enable='between(t,{in_s},{out_s})'[vout]",
        scale = scale_crop_filter(resolution),
    )
}

/// Build the full ffmpeg argument list for `request`.
///
/// Input 0 is the background video (when present, seek/limited by the
/// trim window); the raw RGBA frame pipe is the last input. Output is a
/// fragmented MP4 so the destination may be a pipe or a not-yet-seekable
/// stream.
pub fn build_ffmpeg_args(request: &EncodeRequest) -> BumpgenResult<Vec<String>> {
    request.validate()?;

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
    ];

    if let Some(bg) = &request.background {
        if let Some(trim) = bg.trim {
            args.push("-ss".into());
            args.push(format_seconds(trim.start_seconds));
            args.push("-t".into());
            args.push(format_seconds(trim.len_seconds()));
        }
        args.push("-i".into());
        args.push(bg.source_path.to_string_lossy().into_owned());
    }

    args.extend(
        [
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", request.resolution.width, request.resolution.height),
            "-r",
            &request.fps.input.to_string(),
            "-i",
            "pipe:0",
            "-an",
        ]
        .map(String::from),
    );

    match &request.background {
        Some(bg) => {
            args.push("-filter_complex".into());
            args.push(build_filter_graph(request.resolution, bg.overlay_window));
            args.push("-map".into());
            args.push("[vout]".into());
        }
        None => {
            args.push("-vf".into());
            args.push(scale_crop_filter(request.resolution));
        }
    }

    args.extend(
        [
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-crf",
            "24",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "frag_keyframe+empty_moov",
            "-r",
            &request.fps.output.to_string(),
            "-f",
            "mp4",
        ]
        .map(String::from),
    );
    args.push(request.output_path.to_string_lossy().into_owned());

    Ok(args)
}

/// Streaming encoder around a spawned ffmpeg process.
///
/// Frames are written to the process's stdin one at a time; the blocking
/// pipe write is what throttles frame production when encoding falls
/// behind, keeping memory bounded for long renders.
pub struct FfmpegEncoder {
    request: EncodeRequest,
    child: Child,
    stdin: Option<ChildStdin>,
    frames_written: u64,
}

impl FfmpegEncoder {
    pub fn start(request: EncodeRequest) -> BumpgenResult<Self> {
        request.validate()?;
        ensure_output_dir(&request.output_path)?;

        if !is_ffmpeg_on_path() {
            return Err(BumpgenError::encode_process(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }

        let args = build_ffmpeg_args(&request)?;
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BumpgenError::encode_process(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            BumpgenError::encode_process("failed to open ffmpeg stdin (unexpected)")
        })?;

        Ok(Self {
            request,
            child,
            stdin: Some(stdin),
            frames_written: 0,
        })
    }

    /// Write one frame. Frames must arrive in strictly increasing index
    /// order starting at zero; the encoder never reorders or drops.
    pub fn write_frame(&mut self, frame: &Frame) -> BumpgenResult<()> {
        if frame.index != FrameIndex(self.frames_written) {
            return Err(BumpgenError::encode_process(format!(
                "out-of-order frame: got index {}, expected {}",
                frame.index.0, self.frames_written
            )));
        }
        if frame.width != self.request.resolution.width
            || frame.height != self.request.resolution.height
        {
            return Err(BumpgenError::encode_process(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width,
                frame.height,
                self.request.resolution.width,
                self.request.resolution.height
            )));
        }
        if frame.data.len() != self.request.resolution.frame_bytes() {
            return Err(BumpgenError::encode_process(
                "frame data size mismatch with width*height*4",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(BumpgenError::encode_process(
                "ffmpeg encoder is already finalized",
            ));
        };
        stdin.write_all(&frame.data).map_err(|e| {
            BumpgenError::encode_process(format!(
                "failed to write frame {} to ffmpeg stdin: {e}",
                frame.index.0
            ))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    /// Close the pipe and wait for ffmpeg to finish. Success is reported
    /// only after a clean exit.
    pub fn finish(mut self) -> BumpgenResult<EncodedOutput> {
        drop(self.stdin.take());

        let output = self.child.wait_with_output().map_err(|e| {
            BumpgenError::encode_process(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BumpgenError::encode_process(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(EncodedOutput {
            path: self.request.output_path,
        })
    }
}

/// Drive a whole frame stream through ffmpeg.
///
/// A render error arriving on the stream aborts the encode; the partial
/// output file, if any, is left for the caller to deal with.
pub fn encode<I>(frames: I, request: EncodeRequest) -> BumpgenResult<EncodedOutput>
where
    I: IntoIterator<Item = BumpgenResult<Frame>>,
{
    let mut encoder = FfmpegEncoder::start(request)?;
    let mut written = 0u64;
    for item in frames {
        let frame = item?;
        encoder.write_frame(&frame)?;
        written += 1;
    }
    let out = encoder.finish()?;
    tracing::info!(frames = written, path = %out.path.display(), "encode complete");
    Ok(out)
}
