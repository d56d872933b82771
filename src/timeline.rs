use crate::{
    ease::Ease,
    error::{BumpgenError, BumpgenResult},
    scene::{AnimProp, NodeId, Scene},
};

/// One property animation: `from` → `to` over a window of the timeline's
/// natural span, shaped by an easing curve.
#[derive(Clone, Debug)]
pub struct Tween {
    pub node: NodeId,
    pub prop: AnimProp,
    pub from: f64,
    pub to: f64,
    /// Start offset on the natural timeline, seconds.
    pub start_seconds: f64,
    /// Tween length on the natural timeline, seconds.
    pub duration_seconds: f64,
    pub ease: Ease,
}

/// Normalized-progress animation timeline for one render.
///
/// Scene builders append tweens and then fix the total duration; the
/// renderer drives `progress` monotonically from 0 toward 1 and applies
/// the sampled values onto the scene each frame.
///
/// When an explicit duration differs from the natural tween span, the
/// whole span is rescaled to fill it, so a builder can lay out tweens in
/// natural seconds and let the caller stretch the result to the bump
/// length.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    tweens: Vec<Tween>,
    explicit_duration: Option<f64>,
    progress: f64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tween(&mut self, tween: Tween) -> BumpgenResult<()> {
        if !tween.start_seconds.is_finite() || tween.start_seconds < 0.0 {
            return Err(BumpgenError::validation("tween start must be >= 0"));
        }
        if !tween.duration_seconds.is_finite() || tween.duration_seconds <= 0.0 {
            return Err(BumpgenError::validation("tween duration must be > 0"));
        }
        if !tween.from.is_finite() || !tween.to.is_finite() {
            return Err(BumpgenError::validation("tween endpoints must be finite"));
        }
        self.tweens.push(tween);
        Ok(())
    }

    /// Largest tween end time, seconds. Zero for a static scene.
    pub fn natural_duration_seconds(&self) -> f64 {
        self.tweens
            .iter()
            .map(|t| t.start_seconds + t.duration_seconds)
            .fold(0.0, f64::max)
    }

    /// Fix the total duration, rescaling the natural span to fill it.
    pub fn set_duration(&mut self, seconds: f64) -> BumpgenResult<()> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(BumpgenError::validation(
                "timeline duration must be a positive number of seconds",
            ));
        }
        self.explicit_duration = Some(seconds);
        Ok(())
    }

    pub fn duration_seconds(&self) -> f64 {
        self.explicit_duration
            .unwrap_or_else(|| self.natural_duration_seconds())
    }

    /// Set normalized progress, clamped to `[0,1]`.
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 1.0);
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Sample every tween at the current progress and write the values
    /// onto the scene.
    pub fn apply_to(&self, scene: &mut Scene) -> BumpgenResult<()> {
        if self.tweens.is_empty() {
            return Ok(());
        }

        let natural = self.natural_duration_seconds();
        let total = self.duration_seconds();
        // Rescale factor from natural tween time to the explicit duration.
        let scale = if natural > 0.0 { total / natural } else { 1.0 };
        let t = self.progress * total;

        for tween in &self.tweens {
            let start = tween.start_seconds * scale;
            let len = tween.duration_seconds * scale;
            let local = if len > 0.0 { (t - start) / len } else { 1.0 };
            let eased = tween.ease.apply(local);
            let value = tween.from + (tween.to - tween.from) * eased;
            scene.set_prop(tween.node, tween.prop, value)?;
        }
        Ok(())
    }
}
