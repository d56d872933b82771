use crate::error::{BumpgenError, BumpgenResult};

/// Absolute 0-based frame index in output timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Closed time interval `[start_seconds, end_seconds]` in seconds.
///
/// Used both for allowed windows of background content (source timeline)
/// and for the overlay window (output timeline).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeWindow {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl TimeWindow {
    /// Create a validated window with `0 <= start <= end`.
    pub fn new(start_seconds: f64, end_seconds: f64) -> BumpgenResult<Self> {
        if !start_seconds.is_finite() || !end_seconds.is_finite() {
            return Err(BumpgenError::validation("TimeWindow bounds must be finite"));
        }
        if start_seconds < 0.0 {
            return Err(BumpgenError::validation("TimeWindow start must be >= 0"));
        }
        if end_seconds < start_seconds {
            return Err(BumpgenError::validation("TimeWindow start must be <= end"));
        }
        Ok(Self {
            start_seconds,
            end_seconds,
        })
    }

    /// Window length in seconds.
    pub fn len_seconds(self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Return `true` when `t` lies inside `[start, end]`.
    pub fn contains(self, t: f64) -> bool {
        self.start_seconds <= t && t <= self.end_seconds
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> BumpgenResult<Self> {
        if width == 0 || height == 0 {
            return Err(BumpgenError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Number of bytes in one RGBA8 frame at this resolution.
    pub fn frame_bytes(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Scene capture rate and container output rate, frames per second.
///
/// The scene is captured at `input` fps and held/duplicated by the encoder
/// to fill `output` fps in the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FpsPair {
    pub input: u32,
    pub output: u32,
}

impl FpsPair {
    pub fn new(input: u32, output: u32) -> BumpgenResult<Self> {
        if input == 0 || output == 0 {
            return Err(BumpgenError::validation("fps input/output must be > 0"));
        }
        Ok(Self { input, output })
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::opaque(255, 255, 255);
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Scale the alpha channel by `opacity` in `[0,1]`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        Self {
            a: (f64::from(self.a) * opacity).round() as u8,
            ..self
        }
    }
}
