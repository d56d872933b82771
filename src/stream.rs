use crate::{
    core::FrameIndex,
    error::{BumpgenError, BumpgenResult},
    fonts::FontRegistry,
    raster::Surface,
    scene::Scene,
    timeline::Timeline,
};

/// One rasterized frame: raw straight-alpha RGBA8 pixels.
///
/// Produced exactly once and owned by the consumer after delivery.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: FrameIndex,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// The finite, ordered sequence of frames produced by one render.
///
/// Pull-based and single-consumer: a frame is rasterized only when the
/// consumer asks for it, so production can never run ahead of encoding
/// (the backpressure discipline for long renders). `None` is the
/// end-of-stream marker and the stream never restarts.
///
/// Frame `i` (0-based) is rasterized at `progress = i / total_frames`;
/// the final rendered frame uses `(N-1)/N`, never `1.0`. Pinned by tests
/// below.
pub struct FrameStream<'a> {
    scene: Scene,
    timeline: Timeline,
    surface: Surface,
    fonts: &'a FontRegistry,
    current_frame: u64,
    total_frames: u64,
    failed: bool,
}

impl std::fmt::Debug for FrameStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("scene", &self.scene)
            .field("timeline", &self.timeline)
            .field("surface", &self.surface)
            .field("current_frame", &self.current_frame)
            .field("total_frames", &self.total_frames)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl<'a> FrameStream<'a> {
    pub(crate) fn new(
        scene: Scene,
        timeline: Timeline,
        surface: Surface,
        fonts: &'a FontRegistry,
        total_frames: u64,
    ) -> Self {
        Self {
            scene,
            timeline,
            surface,
            fonts,
            current_frame: 0,
            total_frames,
            failed: false,
        }
    }

    /// Total number of frames this stream will deliver on success.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Iterator for FrameStream<'_> {
    type Item = BumpgenResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.current_frame >= self.total_frames {
            return None;
        }

        let progress = self.current_frame as f64 / self.total_frames as f64;
        self.timeline.set_progress(progress);

        if let Err(e) = self.timeline.apply_to(&mut self.scene) {
            self.failed = true;
            return Some(Err(BumpgenError::render(format!(
                "failed to animate frame {}: {e}",
                self.current_frame
            ))));
        }

        if let Err(e) = self.scene.rasterize(&mut self.surface, self.fonts) {
            self.failed = true;
            return Some(Err(BumpgenError::render(format!(
                "failed to rasterize frame {}: {e}",
                self.current_frame
            ))));
        }

        let frame = Frame {
            index: FrameIndex(self.current_frame),
            width: self.surface.width(),
            height: self.surface.height(),
            data: self.surface.data().to_vec(),
        };
        self.current_frame += 1;
        Some(Ok(frame))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = (self.total_frames - self.current_frame) as usize;
        (remaining, Some(remaining))
    }
}
