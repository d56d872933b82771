use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    background::Selection,
    core::{FpsPair, Resolution, TimeWindow},
    encode::{self, BackgroundVideo, EncodeRequest, EncodedOutput},
    error::{BumpgenError, BumpgenResult},
    fonts::FontRegistry,
    renderer::SceneRenderer,
    stream::FrameStream,
    templates::{ProgrammeInfo, TemplateContext, TemplateRegistry},
};

/// The channel a bump is generated for.
#[derive(Clone, Debug)]
pub struct ChannelInfo {
    pub id: String,
    pub name: Option<String>,
}

/// One bump generation job.
#[derive(Clone, Debug)]
pub struct VideoOptions {
    pub channel: ChannelInfo,
    pub programmes: Vec<ProgrammeInfo>,
    pub background: Option<Selection>,
    pub output_dir: PathBuf,
    pub output_file_name: String,
    pub resolution: Resolution,
    pub length_seconds: f64,
    pub template: String,
    pub fps: FpsPair,
}

/// Whether a video was actually produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Generated,
    NotGenerated,
}

/// Identity of the programme a bump announces; two bumps for the same
/// programme are interchangeable, so regeneration is skipped.
fn programme_identity(programme: &ProgrammeInfo) -> String {
    format!(
        "{}-{}",
        programme.title,
        programme.episode.as_deref().unwrap_or("")
    )
}

fn marker_path(output_dir: &Path, channel_id: &str) -> PathBuf {
    output_dir.join(format!(".channel-{channel_id}-last-generated"))
}

/// Check the per-channel marker: regenerate only when the upcoming
/// programme differs from the last successful run.
fn should_generate(options: &VideoOptions, programme: &ProgrammeInfo) -> BumpgenResult<bool> {
    let marker = marker_path(&options.output_dir, &options.channel.id);
    if !marker.exists() {
        return Ok(true);
    }
    let last = std::fs::read_to_string(&marker)
        .with_context(|| format!("cannot read marker file '{}'", marker.display()))?;
    Ok(last.trim() != programme_identity(programme))
}

fn write_marker(options: &VideoOptions, programme: &ProgrammeInfo) -> BumpgenResult<()> {
    let marker = marker_path(&options.output_dir, &options.channel.id);
    std::fs::write(&marker, programme_identity(programme))
        .with_context(|| format!("cannot write marker file '{}'", marker.display()))?;
    Ok(())
}

/// Generate one bump video, with the encode step injectable for testing.
///
/// The marker file is written only after a successful encode; a failed
/// run leaves it untouched so the next attempt regenerates.
pub fn make_video_with<'f, E>(
    options: &VideoOptions,
    templates: &TemplateRegistry,
    fonts: &'f FontRegistry,
    encode_with: E,
) -> BumpgenResult<Outcome>
where
    E: FnOnce(FrameStream<'f>, EncodeRequest) -> BumpgenResult<EncodedOutput>,
{
    let programme = options
        .programmes
        .first()
        .ok_or_else(|| BumpgenError::validation("at least one programme is required"))?;
    if options.length_seconds <= 0.0 {
        return Err(BumpgenError::validation("bump length must be > 0 seconds"));
    }

    if !should_generate(options, programme)? {
        tracing::info!(
            channel = %options.channel.id,
            programme = %programme.title,
            "bump for this programme already generated, skipping"
        );
        return Ok(Outcome::NotGenerated);
    }

    let template = templates.get(&options.template)?;
    let ctx = TemplateContext {
        programmes: &options.programmes,
        resolution: options.resolution,
        fonts,
    };

    let renderer = SceneRenderer::new(fonts);
    let stream = renderer.render(options.resolution, options.fps.input, |scene, timeline, composer| {
        template(&ctx, scene, timeline)?;
        timeline.set_duration(options.length_seconds)?;
        composer.compose();
        Ok(())
    })?;

    let request = EncodeRequest {
        resolution: options.resolution,
        fps: options.fps,
        output_path: options.output_dir.join(&options.output_file_name),
        background: match &options.background {
            Some(selection) => Some(BackgroundVideo {
                source_path: selection.file_path.clone(),
                trim: Some(selection.window),
                overlay_window: TimeWindow::new(0.0, selection.window.len_seconds())?,
            }),
            None => None,
        },
    };

    let output = encode_with(stream, request)?;
    write_marker(options, programme)?;

    tracing::info!(
        channel = %options.channel.id,
        path = %output.path.display(),
        "generated bump video"
    );
    Ok(Outcome::Generated)
}

/// Generate one bump video through the real ffmpeg encoder.
pub fn make_video(
    options: &VideoOptions,
    templates: &TemplateRegistry,
    fonts: &FontRegistry,
) -> BumpgenResult<Outcome> {
    make_video_with(options, templates, fonts, encode::encode)
}
