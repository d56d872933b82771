use crate::{
    core::{Resolution, Rgba8},
    error::{BumpgenError, BumpgenResult},
};

/// CPU rasterization target: a straight-alpha RGBA8 pixel buffer.
///
/// All drawing is source-over compositing with clipping at the surface
/// edges. The surface is exclusively owned by one render for its whole
/// lifetime and reused across frames.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(resolution: Resolution) -> BumpgenResult<Self> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(BumpgenError::validation(
                "surface width/height must be non-zero",
            ));
        }
        Ok(Self {
            width: resolution.width,
            height: resolution.height,
            data: vec![0u8; resolution.frame_bytes()],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 pixels, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Fill the whole surface with `color` without blending.
    pub fn clear(&mut self, color: Rgba8) {
        for px in self.data.chunks_exact_mut(4) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = color.a;
        }
    }

    /// Source-over blend one pixel. Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba8) {
        if color.a == 0 {
            return;
        }
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let dst = &mut self.data[idx..idx + 4];

        let sa = f64::from(color.a) / 255.0;
        let da = f64::from(dst[3]) / 255.0;
        let oa = sa + da * (1.0 - sa);
        if oa <= 0.0 {
            dst.copy_from_slice(&[0, 0, 0, 0]);
            return;
        }

        let blend = |s: u8, d: u8| -> u8 {
            let s = f64::from(s) / 255.0;
            let d = f64::from(d) / 255.0;
            let c = (s * sa + d * da * (1.0 - sa)) / oa;
            (c * 255.0).round().clamp(0.0, 255.0) as u8
        };

        let out = [
            blend(color.r, dst[0]),
            blend(color.g, dst[1]),
            blend(color.b, dst[2]),
            (oa * 255.0).round().clamp(0.0, 255.0) as u8,
        ];
        dst.copy_from_slice(&out);
    }

    /// Source-over fill of an axis-aligned rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, left: f64, top: f64, width: f64, height: f64, color: Rgba8) {
        if color.a == 0 || width <= 0.0 || height <= 0.0 {
            return;
        }
        let x0 = left.round() as i64;
        let y0 = top.round() as i64;
        let x1 = (left + width).round() as i64;
        let y1 = (top + height).round() as i64;

        for y in y0.max(0)..y1.min(i64::from(self.height)) {
            for x in x0.max(0)..x1.min(i64::from(self.width)) {
                self.blend_pixel(x, y, color);
            }
        }
    }

    /// Blit a coverage bitmap (one byte per pixel) as `color` at `(left, top)`.
    ///
    /// Coverage scales the color's alpha, so antialiased glyph edges blend
    /// correctly over whatever is already on the surface.
    pub fn blit_coverage(
        &mut self,
        left: i64,
        top: i64,
        coverage: &[u8],
        cov_width: usize,
        cov_height: usize,
        color: Rgba8,
    ) {
        for cy in 0..cov_height {
            for cx in 0..cov_width {
                let c = coverage[cy * cov_width + cx];
                if c == 0 {
                    continue;
                }
                let a = ((u16::from(c) * u16::from(color.a)) / 255) as u8;
                self.blend_pixel(left + cx as i64, top + cy as i64, Rgba8 { a, ..color });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * surface.width() + x) * 4) as usize;
        let d = surface.data();
        [d[idx], d[idx + 1], d[idx + 2], d[idx + 3]]
    }

    fn small() -> Surface {
        Surface::new(Resolution::new(8, 8).unwrap()).unwrap()
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut s = small();
        s.clear(Rgba8::opaque(1, 2, 3));
        assert_eq!(px(&s, 0, 0), [1, 2, 3, 255]);
        assert_eq!(px(&s, 7, 7), [1, 2, 3, 255]);
    }

    #[test]
    fn fill_rect_is_clipped() {
        let mut s = small();
        s.fill_rect(-4.0, -4.0, 8.0, 8.0, Rgba8::WHITE);
        assert_eq!(px(&s, 3, 3), [255, 255, 255, 255]);
        assert_eq!(px(&s, 4, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn opaque_blend_replaces_destination() {
        let mut s = small();
        s.clear(Rgba8::opaque(10, 10, 10));
        s.blend_pixel(2, 2, Rgba8::opaque(200, 0, 0));
        assert_eq!(px(&s, 2, 2), [200, 0, 0, 255]);
    }

    #[test]
    fn half_alpha_blend_over_opaque_averages() {
        let mut s = small();
        s.clear(Rgba8::BLACK);
        s.blend_pixel(
            1,
            1,
            Rgba8 {
                r: 255,
                g: 0,
                b: 0,
                a: 128,
            },
        );
        let [r, _, _, a] = px(&s, 1, 1);
        assert_eq!(a, 255);
        assert!((127..=129).contains(&r), "got r={r}");
    }

    #[test]
    fn coverage_scales_alpha() {
        let mut s = small();
        s.clear(Rgba8::BLACK);
        // 2x1 bitmap: full and zero coverage.
        s.blit_coverage(0, 0, &[255, 0], 2, 1, Rgba8::WHITE);
        assert_eq!(px(&s, 0, 0), [255, 255, 255, 255]);
        assert_eq!(px(&s, 1, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn out_of_bounds_blit_is_ignored() {
        let mut s = small();
        s.blit_coverage(-1, -1, &[255, 255, 255, 255], 2, 2, Rgba8::WHITE);
        assert_eq!(px(&s, 0, 0), [255, 255, 255, 255]);
    }
}
