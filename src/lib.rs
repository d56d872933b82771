//! bumpgen: programmatic "coming up next" bump videos for TV channels.
//!
//! A bump is a short clip announcing upcoming programmes. The pipeline
//! builds an animated overlay scene from a named template, rasterizes it
//! frame by frame, and pipes the raw frames into ffmpeg, optionally
//! composited over a randomly selected window of background footage.

#![forbid(unsafe_code)]

pub mod background;
pub mod config;
pub mod core;
pub mod ease;
pub mod encode;
pub mod error;
pub mod fonts;
pub mod generator;
pub mod probe;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod stream;
pub mod templates;
pub mod timeline;

pub use background::{ContentLibrary, Selection, select_background};
pub use core::{FpsPair, FrameIndex, Resolution, Rgba8, TimeWindow};
pub use encode::{BackgroundVideo, EncodeRequest, EncodedOutput, FfmpegEncoder};
pub use error::{BumpgenError, BumpgenResult};
pub use fonts::FontRegistry;
pub use generator::{ChannelInfo, Outcome, VideoOptions, make_video};
pub use renderer::SceneRenderer;
pub use stream::{Frame, FrameStream};
pub use templates::{ProgrammeInfo, TemplateRegistry};
pub use timeline::Timeline;
