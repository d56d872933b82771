use crate::{
    core::Resolution,
    error::{BumpgenError, BumpgenResult},
    fonts::FontRegistry,
    raster::Surface,
    scene::Scene,
    stream::FrameStream,
    timeline::Timeline,
};

/// Handed to the scene builder; calling [`compose`](Composer::compose)
/// seals the scene and starts frame production.
///
/// The renderer cannot know the duration up front, since it depends on
/// what the builder puts on the timeline, so the builder signals
/// readiness explicitly.
pub struct Composer {
    composed: bool,
}

impl Composer {
    pub fn compose(&mut self) {
        self.composed = true;
    }
}

/// Drives a [`Timeline`] frame by frame and rasterizes a caller-supplied
/// scene into a [`FrameStream`].
pub struct SceneRenderer<'a> {
    fonts: &'a FontRegistry,
}

impl<'a> SceneRenderer<'a> {
    pub fn new(fonts: &'a FontRegistry) -> Self {
        Self { fonts }
    }

    /// Build the scene via `build` and return the finite stream of frames.
    ///
    /// `capture_fps` is the scene capture rate (the stream's input rate at
    /// the encoder, not the container rate). The stream length is
    /// `max(1, ceil(duration_seconds * capture_fps))`.
    ///
    /// Any builder failure aborts the whole render; no partial stream is
    /// ever returned.
    pub fn render<F>(
        &self,
        resolution: Resolution,
        capture_fps: u32,
        build: F,
    ) -> BumpgenResult<FrameStream<'a>>
    where
        F: FnOnce(&mut Scene, &mut Timeline, &mut Composer) -> BumpgenResult<()>,
    {
        if capture_fps == 0 {
            return Err(BumpgenError::validation("capture fps must be > 0"));
        }

        let mut scene = Scene::new(resolution);
        let mut timeline = Timeline::new();
        let mut composer = Composer { composed: false };

        build(&mut scene, &mut timeline, &mut composer)
            .map_err(|e| BumpgenError::render(format!("scene builder failed: {e}")))?;

        if !composer.composed {
            return Err(BumpgenError::render(
                "scene builder finished without calling compose()",
            ));
        }

        let duration = timeline.duration_seconds();
        let total_frames = ((duration * f64::from(capture_fps)).ceil() as u64).max(1);
        let surface = Surface::new(resolution)?;

        tracing::debug!(
            total_frames,
            duration_seconds = duration,
            capture_fps,
            "scene composed"
        );

        Ok(FrameStream::new(
            scene,
            timeline,
            surface,
            self.fonts,
            total_frames,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rgba8;

    fn fonts() -> FontRegistry {
        FontRegistry::new()
    }

    #[test]
    fn frame_count_is_ceil_of_duration_times_fps() {
        let fonts = fonts();
        let renderer = SceneRenderer::new(&fonts);
        let stream = renderer
            .render(Resolution::new(8, 8).unwrap(), 30, |scene, timeline, c| {
                scene.add_rect(0.0, 0.0, 8.0, 8.0, Rgba8::WHITE);
                timeline.set_duration(2.5)?;
                c.compose();
                Ok(())
            })
            .unwrap();
        assert_eq!(stream.total_frames(), 75);
    }

    #[test]
    fn fractional_duration_rounds_up() {
        let fonts = fonts();
        let renderer = SceneRenderer::new(&fonts);
        let stream = renderer
            .render(Resolution::new(8, 8).unwrap(), 30, |_, timeline, c| {
                timeline.set_duration(0.05)?;
                c.compose();
                Ok(())
            })
            .unwrap();
        // ceil(0.05 * 30) = 2
        assert_eq!(stream.total_frames(), 2);
    }

    #[test]
    fn static_scene_still_produces_one_frame() {
        let fonts = fonts();
        let renderer = SceneRenderer::new(&fonts);
        let stream = renderer
            .render(Resolution::new(8, 8).unwrap(), 30, |scene, _, c| {
                scene.add_rect(0.0, 0.0, 4.0, 4.0, Rgba8::WHITE);
                c.compose();
                Ok(())
            })
            .unwrap();
        assert_eq!(stream.total_frames(), 1);
    }

    #[test]
    fn missing_compose_is_a_render_error() {
        let fonts = fonts();
        let renderer = SceneRenderer::new(&fonts);
        let err = renderer
            .render(Resolution::new(8, 8).unwrap(), 30, |_, timeline, _| {
                timeline.set_duration(1.0)
            })
            .unwrap_err();
        assert!(matches!(err, BumpgenError::Render(_)));
        assert!(err.to_string().contains("compose"));
    }

    #[test]
    fn builder_failure_aborts_the_render() {
        let fonts = fonts();
        let renderer = SceneRenderer::new(&fonts);
        let err = renderer
            .render(Resolution::new(8, 8).unwrap(), 30, |_, _, _| {
                Err(BumpgenError::validation("template exploded"))
            })
            .unwrap_err();
        assert!(matches!(err, BumpgenError::Render(_)));
        assert!(err.to_string().contains("template exploded"));
    }

    #[test]
    fn zero_capture_fps_is_rejected() {
        let fonts = fonts();
        let renderer = SceneRenderer::new(&fonts);
        assert!(
            renderer
                .render(Resolution::new(8, 8).unwrap(), 0, |_, _, c| {
                    c.compose();
                    Ok(())
                })
                .is_err()
        );
    }
}
