use std::collections::HashMap;

use crate::{
    core::{Resolution, Rgba8},
    ease::Ease,
    error::{BumpgenError, BumpgenResult},
    fonts::FontRegistry,
    scene::{AnimProp, Scene},
    timeline::{Timeline, Tween},
};

/// Font family every built-in template draws with. The binary registers
/// whatever font file it is given under this name.
pub const TEMPLATE_FONT: &str = "Poppins";

/// What a bump announces: the upcoming programme(s) on a channel.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeInfo {
    pub title: String,
    #[serde(default)]
    pub episode: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
}

/// Everything a template gets to build its scene from.
pub struct TemplateContext<'a> {
    pub programmes: &'a [ProgrammeInfo],
    pub resolution: Resolution,
    pub fonts: &'a FontRegistry,
}

impl TemplateContext<'_> {
    /// Fraction of the canvas width to pixels.
    pub fn convert_x(&self, fraction: f64) -> f64 {
        fraction * f64::from(self.resolution.width)
    }

    /// Fraction of the canvas height to pixels.
    pub fn convert_y(&self, fraction: f64) -> f64 {
        fraction * f64::from(self.resolution.height)
    }
}

pub type TemplateFn =
    Box<dyn Fn(&TemplateContext, &mut Scene, &mut Timeline) -> BumpgenResult<()> + Send + Sync>;

/// Named scene builders, looked up by channel configuration.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateFn>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("centre-title-and-time", Box::new(centre_title_and_time));
        registry.register("left-panel-next-five", Box::new(left_panel_next_five));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, template: TemplateFn) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> BumpgenResult<&TemplateFn> {
        self.templates
            .get(name)
            .ok_or_else(|| BumpgenError::validation(format!("unknown template '{name}'")))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn first_programme<'a>(ctx: &'a TemplateContext) -> BumpgenResult<&'a ProgrammeInfo> {
    ctx.programmes
        .first()
        .ok_or_else(|| BumpgenError::validation("template requires at least one programme"))
}

fn display_title(programme: &ProgrammeInfo) -> String {
    match &programme.episode {
        Some(episode) if !episode.is_empty() => format!("{} | {}", programme.title, episode),
        _ => programme.title.clone(),
    }
}

fn time_range(programme: &ProgrammeInfo) -> Option<String> {
    match (&programme.start_time, &programme.end_time) {
        (Some(start), Some(end)) => Some(format!("{start} - {end}")),
        (Some(start), None) => Some(start.clone()),
        _ => None,
    }
}

/// Single upcoming programme, centred: time above title, underline rule
/// between them, dimmed backdrop behind the text that fades in.
fn centre_title_and_time(
    ctx: &TemplateContext,
    scene: &mut Scene,
    timeline: &mut Timeline,
) -> BumpgenResult<()> {
    let programme = first_programme(ctx)?;

    let title = display_title(programme);
    let title_size = 92.0f32;
    let time_size = 80.0f32;
    let padding = 20.0;

    let title_metrics = Scene::measure_text(ctx.fonts, &title, TEMPLATE_FONT, title_size)?;
    let time_text = time_range(programme);
    let time_metrics = match &time_text {
        Some(text) => Some(Scene::measure_text(ctx.fonts, text, TEMPLATE_FONT, time_size)?),
        None => None,
    };

    let time_height = time_metrics.map(|m| m.height + padding).unwrap_or(0.0);
    let group_width = title_metrics
        .width
        .max(time_metrics.map(|m| m.width).unwrap_or(0.0));
    let group_height = time_height + title_metrics.height;

    let centre_x = ctx.convert_x(0.5);
    let centre_y = ctx.convert_y(0.5);
    let group_left = centre_x - group_width / 2.0;
    let group_top = centre_y - group_height / 2.0;

    let backdrop = scene.add_rect(
        group_left - padding,
        group_top - padding,
        group_width + padding * 2.0,
        group_height + padding * 2.0,
        Rgba8::BLACK.with_opacity(0.8),
    );

    if let Some(text) = &time_text {
        let metrics = time_metrics.unwrap_or(title_metrics);
        scene.add_text(
            text.clone(),
            TEMPLATE_FONT,
            time_size,
            centre_x - metrics.width / 2.0,
            group_top,
            Rgba8::WHITE,
        );
    }

    let title_top = group_top + time_height;
    scene.add_rect(
        centre_x - group_width / 2.0,
        title_top - 10.0,
        group_width,
        2.0,
        Rgba8::WHITE,
    );
    scene.add_text(
        title,
        TEMPLATE_FONT,
        title_size,
        centre_x - title_metrics.width / 2.0,
        title_top,
        Rgba8::WHITE,
    );

    // Quick backdrop fade at the head of the bump; the rest holds.
    timeline.tween(Tween {
        node: backdrop,
        prop: AnimProp::Opacity,
        from: 0.0,
        to: 1.0,
        start_seconds: 0.0,
        duration_seconds: 1.0,
        ease: Ease::OutQuad,
    })?;

    Ok(())
}

const PANEL_TEAL: Rgba8 = Rgba8::opaque(0x00, 0x8a, 0x91);

/// Up to five upcoming programmes stacked inside a full-height coloured
/// panel on the left, the rest of the canvas left transparent for the
/// background video to show through.
fn left_panel_next_five(
    ctx: &TemplateContext,
    scene: &mut Scene,
    timeline: &mut Timeline,
) -> BumpgenResult<()> {
    if ctx.programmes.is_empty() {
        return Err(BumpgenError::validation(
            "template requires at least one programme",
        ));
    }

    let panel_width = ctx.convert_x(0.4);
    let panel = scene.add_rect(
        0.0,
        0.0,
        panel_width,
        f64::from(ctx.resolution.height),
        PANEL_TEAL,
    );

    let text_left = panel_width * 0.075;
    let heading_size = 50.0f32;
    let time_size = 30.0f32;
    let title_size = 40.0f32;
    let detail_size = 30.0f32;
    let entry_gap = ctx.convert_y(0.03);

    let mut y = ctx.convert_y(0.05);
    let heading = Scene::measure_text(ctx.fonts, "Next up", TEMPLATE_FONT, heading_size)?;
    scene.add_text("Next up", TEMPLATE_FONT, heading_size, text_left, y, Rgba8::WHITE);
    y += heading.height + entry_gap;

    for programme in ctx.programmes.iter().take(5) {
        if let Some(time) = time_range(programme) {
            let m = Scene::measure_text(ctx.fonts, &time, TEMPLATE_FONT, time_size)?;
            scene.add_text(time, TEMPLATE_FONT, time_size, text_left, y, Rgba8::WHITE);
            y += m.height + 6.0;
        }

        let title = display_title(programme);
        let m = Scene::measure_text(ctx.fonts, &title, TEMPLATE_FONT, title_size)?;
        scene.add_text(title, TEMPLATE_FONT, title_size, text_left, y, Rgba8::WHITE);
        y += m.height + 4.0;

        if let Some(subtitle) = &programme.subtitle {
            let m = Scene::measure_text(ctx.fonts, subtitle, TEMPLATE_FONT, detail_size)?;
            scene.add_text(
                subtitle.clone(),
                TEMPLATE_FONT,
                detail_size,
                text_left,
                y,
                Rgba8::WHITE,
            );
            y += m.height + 4.0;
        }

        y += entry_gap;
    }

    // Panel slides in from off-canvas at the head of the bump.
    timeline.tween(Tween {
        node: panel,
        prop: AnimProp::Left,
        from: -panel_width,
        to: 0.0,
        start_seconds: 0.0,
        duration_seconds: 1.0,
        ease: Ease::OutCubic,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = TemplateRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["centre-title-and-time", "left-panel-next-five"]
        );
        assert!(registry.get("centre-title-and-time").is_ok());
    }

    #[test]
    fn unknown_template_is_a_validation_error() {
        let registry = TemplateRegistry::with_builtins();
        let err = registry.get("does-not-exist").err().unwrap();
        assert!(matches!(err, BumpgenError::Validation(_)));
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[test]
    fn display_title_joins_episode_with_pipe() {
        let p = ProgrammeInfo {
            title: "The News".into(),
            episode: Some("S01E02".into()),
            ..Default::default()
        };
        assert_eq!(display_title(&p), "The News | S01E02");

        let bare = ProgrammeInfo {
            title: "The News".into(),
            ..Default::default()
        };
        assert_eq!(display_title(&bare), "The News");
    }

    #[test]
    fn time_range_needs_a_start() {
        let p = ProgrammeInfo {
            title: "x".into(),
            start_time: Some("20:00".into()),
            end_time: Some("21:00".into()),
            ..Default::default()
        };
        assert_eq!(time_range(&p).as_deref(), Some("20:00 - 21:00"));

        let open_ended = ProgrammeInfo {
            title: "x".into(),
            start_time: Some("20:00".into()),
            ..Default::default()
        };
        assert_eq!(time_range(&open_ended).as_deref(), Some("20:00"));

        let none = ProgrammeInfo {
            title: "x".into(),
            end_time: Some("21:00".into()),
            ..Default::default()
        };
        assert_eq!(time_range(&none), None);
    }

    #[test]
    fn templates_fail_without_programmes() {
        let fonts = FontRegistry::new();
        let ctx = TemplateContext {
            programmes: &[],
            resolution: Resolution::new(1920, 1080).unwrap(),
            fonts: &fonts,
        };
        let registry = TemplateRegistry::with_builtins();
        for name in registry.names() {
            let template = registry.get(name).unwrap();
            let mut scene = Scene::new(ctx.resolution);
            let mut timeline = Timeline::new();
            assert!(template(&ctx, &mut scene, &mut timeline).is_err());
        }
    }

    #[test]
    fn coordinate_conversion_scales_by_canvas() {
        let fonts = FontRegistry::new();
        let ctx = TemplateContext {
            programmes: &[],
            resolution: Resolution::new(1920, 1080).unwrap(),
            fonts: &fonts,
        };
        assert_eq!(ctx.convert_x(0.5), 960.0);
        assert_eq!(ctx.convert_y(0.1), 108.0);
    }
}
