use fontdue::Font;

use crate::{
    core::{Resolution, Rgba8},
    error::{BumpgenError, BumpgenResult},
    fonts::FontRegistry,
    raster::Surface,
};

/// Handle to a node inside one [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Animatable scalar properties of a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimProp {
    Left,
    Top,
    Opacity,
}

/// Mutable per-node state sampled by the timeline every frame.
#[derive(Clone, Debug)]
pub struct NodeProps {
    pub left: f64,
    pub top: f64,
    /// 0..1, multiplied into the fill alpha at rasterization time.
    pub opacity: f64,
    pub fill: Rgba8,
}

impl NodeProps {
    pub fn set(&mut self, prop: AnimProp, value: f64) {
        match prop {
            AnimProp::Left => self.left = value,
            AnimProp::Top => self.top = value,
            AnimProp::Opacity => self.opacity = value.clamp(0.0, 1.0),
        }
    }
}

#[derive(Clone, Debug)]
enum NodeKind {
    Rect {
        width: f64,
        height: f64,
    },
    Text {
        content: String,
        font_family: String,
        font_size: f32,
    },
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    props: NodeProps,
}

/// Measured extent of a text block, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

/// A bump scene: an ordered list of rect/text nodes drawn back-to-front.
///
/// Node order is paint order; templates add a backdrop first and text on
/// top of it.
#[derive(Clone, Debug)]
pub struct Scene {
    resolution: Resolution,
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            nodes: Vec::new(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn add_rect(&mut self, left: f64, top: f64, width: f64, height: f64, fill: Rgba8) -> NodeId {
        self.push(Node {
            kind: NodeKind::Rect { width, height },
            props: NodeProps {
                left,
                top,
                opacity: 1.0,
                fill,
            },
        })
    }

    pub fn add_text(
        &mut self,
        content: impl Into<String>,
        font_family: impl Into<String>,
        font_size: f32,
        left: f64,
        top: f64,
        fill: Rgba8,
    ) -> NodeId {
        self.push(Node {
            kind: NodeKind::Text {
                content: content.into(),
                font_family: font_family.into(),
                font_size,
            },
            props: NodeProps {
                left,
                top,
                opacity: 1.0,
                fill,
            },
        })
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn props_mut(&mut self, id: NodeId) -> BumpgenResult<&mut NodeProps> {
        self.nodes
            .get_mut(id.0)
            .map(|n| &mut n.props)
            .ok_or_else(|| BumpgenError::validation(format!("unknown scene node {}", id.0)))
    }

    pub fn set_prop(&mut self, id: NodeId, prop: AnimProp, value: f64) -> BumpgenResult<()> {
        self.props_mut(id)?.set(prop, value);
        Ok(())
    }

    /// Measure a text block (multi-line, split on `\n`) without drawing it.
    pub fn measure_text(
        fonts: &FontRegistry,
        content: &str,
        font_family: &str,
        font_size: f32,
    ) -> BumpgenResult<TextMetrics> {
        let font = fonts.get(font_family)?;
        let lines: Vec<&str> = content.split('\n').collect();

        let mut max_width = 0.0f64;
        let mut measures = Vec::with_capacity(lines.len());
        for line in &lines {
            let m = measure_line(font, line, font_size);
            max_width = max_width.max(m.width);
            measures.push(m);
        }

        let spacing = line_spacing(font_size);
        let height = match measures.last() {
            Some(last) if measures.len() == 1 => last.ascent + last.descent,
            Some(last) => spacing * (measures.len() as f64 - 1.0) + last.ascent + last.descent,
            None => 0.0,
        };

        Ok(TextMetrics {
            width: max_width,
            height,
        })
    }

    /// Rasterize the whole scene into `surface` from current node state.
    ///
    /// Clears to transparent first: the overlay layer keeps its alpha so
    /// the encoder can composite it over background video.
    pub fn rasterize(&self, surface: &mut Surface, fonts: &FontRegistry) -> BumpgenResult<()> {
        surface.clear(Rgba8::TRANSPARENT);

        for node in &self.nodes {
            let color = node.props.fill.with_opacity(node.props.opacity);
            match &node.kind {
                NodeKind::Rect { width, height } => {
                    surface.fill_rect(node.props.left, node.props.top, *width, *height, color);
                }
                NodeKind::Text {
                    content,
                    font_family,
                    font_size,
                } => {
                    let font = fonts.get(font_family)?;
                    draw_text(
                        surface,
                        font,
                        content,
                        *font_size,
                        node.props.left,
                        node.props.top,
                        color,
                    );
                }
            }
        }
        Ok(())
    }
}

struct LineMeasure {
    width: f64,
    ascent: f64,
    descent: f64,
}

fn line_spacing(font_size: f32) -> f64 {
    f64::from(font_size) * 1.3
}

fn measure_line(font: &Font, line: &str, font_size: f32) -> LineMeasure {
    let mut width = 0.0f64;
    let mut ascent = 0.0f64;
    let mut descent = 0.0f64;

    for ch in line.chars() {
        let (metrics, _) = font.rasterize(ch, font_size);
        ascent = ascent.max(f64::from(metrics.height as i32 + metrics.ymin));
        descent = descent.max(f64::from(-metrics.ymin));
        width += f64::from(metrics.advance_width);
    }

    if line.is_empty() {
        let (metrics, _) = font.rasterize(' ', font_size);
        ascent = f64::from(metrics.height as i32 + metrics.ymin);
        descent = f64::from(-metrics.ymin);
    }

    LineMeasure {
        width,
        ascent,
        descent,
    }
}

fn draw_text(
    surface: &mut Surface,
    font: &Font,
    content: &str,
    font_size: f32,
    left: f64,
    top: f64,
    color: Rgba8,
) {
    let spacing = line_spacing(font_size);

    for (line_idx, line) in content.split('\n').enumerate() {
        let measure = measure_line(font, line, font_size);
        let line_top = top + spacing * line_idx as f64;
        let mut cursor = left;

        for ch in line.chars() {
            let (metrics, bitmap) = font.rasterize(ch, font_size);
            let glyph_x = (cursor + f64::from(metrics.xmin)).round() as i64;
            let glyph_y = (line_top + measure.ascent
                - f64::from(metrics.height as i32 + metrics.ymin))
            .round() as i64;
            surface.blit_coverage(
                glyph_x,
                glyph_y,
                &bitmap,
                metrics.width,
                metrics.height,
                color,
            );
            cursor += f64::from(metrics.advance_width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene::new(Resolution::new(16, 16).unwrap())
    }

    #[test]
    fn rect_scene_rasterizes_without_fonts() {
        let mut s = scene();
        s.add_rect(2.0, 2.0, 4.0, 4.0, Rgba8::WHITE);

        let fonts = FontRegistry::new();
        let mut surface = Surface::new(s.resolution()).unwrap();
        s.rasterize(&mut surface, &fonts).unwrap();

        let idx = ((3 * 16 + 3) * 4) as usize;
        assert_eq!(surface.data()[idx + 3], 255);
        // Outside the rect the surface stays transparent.
        assert_eq!(surface.data()[3], 0);
    }

    #[test]
    fn opacity_scales_rect_alpha() {
        let mut s = scene();
        let id = s.add_rect(0.0, 0.0, 16.0, 16.0, Rgba8::WHITE);
        s.set_prop(id, AnimProp::Opacity, 0.5).unwrap();

        let fonts = FontRegistry::new();
        let mut surface = Surface::new(s.resolution()).unwrap();
        s.rasterize(&mut surface, &fonts).unwrap();
        assert_eq!(surface.data()[3], 128);
    }

    #[test]
    fn text_with_unregistered_font_fails_rasterization() {
        let mut s = scene();
        s.add_text("hi", "Poppins", 12.0, 0.0, 0.0, Rgba8::WHITE);

        let fonts = FontRegistry::new();
        let mut surface = Surface::new(s.resolution()).unwrap();
        assert!(s.rasterize(&mut surface, &fonts).is_err());
    }

    #[test]
    fn set_prop_rejects_unknown_node() {
        let mut s = scene();
        assert!(s.set_prop(NodeId(7), AnimProp::Left, 1.0).is_err());
    }

    #[test]
    fn props_update_is_visible_in_raster() {
        let mut s = scene();
        let id = s.add_rect(0.0, 0.0, 2.0, 2.0, Rgba8::WHITE);
        s.set_prop(id, AnimProp::Left, 8.0).unwrap();

        let fonts = FontRegistry::new();
        let mut surface = Surface::new(s.resolution()).unwrap();
        s.rasterize(&mut surface, &fonts).unwrap();

        let moved = ((0 * 16 + 8) * 4) as usize;
        assert_eq!(surface.data()[moved + 3], 255);
        assert_eq!(surface.data()[3], 0);
    }
}
