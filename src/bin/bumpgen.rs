use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bumpgen", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single overlay frame as a PNG.
    Frame(FrameArgs),
    /// Generate a bump video for a channel (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Template name.
    #[arg(long, default_value = "centre-title-and-time")]
    template: String,

    /// Programme title.
    #[arg(long)]
    title: String,

    /// Programme episode label.
    #[arg(long)]
    episode: Option<String>,

    /// Programme start time, free text (e.g. "20:00").
    #[arg(long)]
    start_time: Option<String>,

    /// Programme end time, free text.
    #[arg(long)]
    end_time: Option<String>,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Bump length in seconds.
    #[arg(long, default_value_t = 60.0)]
    length: f64,

    /// Frame index (0-based) to render.
    #[arg(long, default_value_t = 0)]
    frame: u64,

    /// TTF/OTF font file registered for the templates.
    #[arg(long)]
    font: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Channel id to generate for.
    #[arg(long)]
    channel: String,

    /// Programme title.
    #[arg(long)]
    title: String,

    /// Programme episode label.
    #[arg(long)]
    episode: Option<String>,

    /// Programme start time, free text (e.g. "20:00").
    #[arg(long)]
    start_time: Option<String>,

    /// Programme end time, free text.
    #[arg(long)]
    end_time: Option<String>,

    /// TTF/OTF font file registered for the templates.
    #[arg(long)]
    font: PathBuf,

    /// Output file name inside the configured output folder.
    #[arg(long, default_value = "bump.mp4")]
    out: String,

    /// Regenerate even if the marker says this programme is current.
    #[arg(long)]
    force: bool,
}

const DEFAULT_LENGTH_SECONDS: f64 = 60.0;
const DEFAULT_FPS: bumpgen::FpsPair = bumpgen::FpsPair {
    input: 1,
    output: 30,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn load_fonts(font_path: &Path) -> anyhow::Result<bumpgen::FontRegistry> {
    let mut fonts = bumpgen::FontRegistry::new();
    fonts
        .register_file(bumpgen::templates::TEMPLATE_FONT, font_path)
        .with_context(|| format!("load font '{}'", font_path.display()))?;
    Ok(fonts)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let fonts = load_fonts(&args.font)?;
    let templates = bumpgen::TemplateRegistry::with_builtins();
    let template = templates.get(&args.template)?;

    let programmes = vec![bumpgen::ProgrammeInfo {
        title: args.title,
        episode: args.episode,
        start_time: args.start_time,
        end_time: args.end_time,
        subtitle: None,
    }];

    let resolution = bumpgen::Resolution::new(args.width, args.height)?;
    let ctx = bumpgen::templates::TemplateContext {
        programmes: &programmes,
        resolution,
        fonts: &fonts,
    };

    let renderer = bumpgen::SceneRenderer::new(&fonts);
    let stream = renderer.render(resolution, DEFAULT_FPS.input, |scene, timeline, composer| {
        template(&ctx, scene, timeline)?;
        timeline.set_duration(args.length)?;
        composer.compose();
        Ok(())
    })?;

    if args.frame >= stream.total_frames() {
        anyhow::bail!(
            "frame {} out of range (stream has {} frames)",
            args.frame,
            stream.total_frames()
        );
    }

    let frame = stream
        .into_iter()
        .nth(args.frame as usize)
        .context("frame stream ended early")??;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let config = bumpgen::config::AppConfig::load(&args.config)?;
    let channel_config = config.channel_config_for(&args.channel)?;

    let length_seconds = channel_config
        .length
        .as_value()
        .copied()
        .unwrap_or(DEFAULT_LENGTH_SECONDS);

    let fonts = load_fonts(&args.font)?;
    let templates = bumpgen::TemplateRegistry::with_builtins();

    let library = bumpgen::ContentLibrary::new(&config.background_content_folder);
    let allowed_windows = config.allowed_windows()?;
    let background = match bumpgen::select_background(
        &library,
        &allowed_windows,
        length_seconds,
        channel_config.allow_list(),
        &bumpgen::probe::FfprobeDurationProbe,
        &mut rand::thread_rng(),
    ) {
        Ok(selection) => Some(selection),
        Err(e) if e.is_selection_miss() => {
            tracing::warn!(error = %e, "no background available, rendering overlay only");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let output_dir = PathBuf::from(&config.output_folder);
    let options = bumpgen::VideoOptions {
        channel: bumpgen::ChannelInfo {
            id: args.channel.clone(),
            name: None,
        },
        programmes: vec![bumpgen::ProgrammeInfo {
            title: args.title,
            episode: args.episode,
            start_time: args.start_time,
            end_time: args.end_time,
            subtitle: None,
        }],
        background,
        output_dir: output_dir.clone(),
        output_file_name: args.out,
        resolution: channel_config.resolution,
        length_seconds,
        template: channel_config.template.clone(),
        fps: DEFAULT_FPS,
    };

    if args.force {
        let marker = output_dir.join(format!(".channel-{}-last-generated", args.channel));
        if marker.exists() {
            std::fs::remove_file(&marker)
                .with_context(|| format!("remove marker '{}'", marker.display()))?;
        }
    }

    match bumpgen::make_video(&options, &templates, &fonts)? {
        bumpgen::Outcome::Generated => eprintln!("generated bump for {}", args.channel),
        bumpgen::Outcome::NotGenerated => {
            eprintln!("bump for {} already up to date", args.channel)
        }
    }
    Ok(())
}
