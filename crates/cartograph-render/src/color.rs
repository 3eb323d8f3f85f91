use std::fmt;

/// 8-bit sRGB color.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const DARK_GRAY: Rgb = Rgb::new(64, 64, 64);
    /// Marker for columns with nothing in them.
    pub const VOID: Rgb = Rgb::new(17, 12, 25);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    #[inline]
    pub const fn to_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub fn to_floats(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }

    #[inline]
    pub fn from_floats(c: [f32; 3]) -> Self {
        Self::new(channel(c[0]), channel(c[1]), channel(c[2]))
    }

    /// Scales every channel by `factor`, clamping at white.
    pub fn brighten(self, factor: f32) -> Self {
        if factor == 1.0 {
            return self;
        }
        let [r, g, b] = self.to_floats();
        Self::from_floats([r * factor, g * factor, b * factor])
    }

    /// Slope shading: values below 1 darken with a slight blue cast,
    /// values above 1 brighten.
    pub fn bevel(self, slope: f32) -> Self {
        let bluer = if slope < 1.0 { 0.85 } else { 1.0 };
        let [r, g, b] = self.to_floats();
        Self::from_floats([r * bluer * slope, g * bluer * slope, b * slope])
    }

    /// Darkens toward `ambient`, which is added to the factor per channel.
    pub fn darken_ambient(self, factor: f32, ambient: [f32; 3]) -> Self {
        let [r, g, b] = self.to_floats();
        Self::from_floats([
            r * (factor + ambient[0]),
            g * (factor + ambient[1]),
            b * (factor + ambient[2]),
        ])
    }

    /// Composites `over` on top of `self` with weight `alpha`.
    pub fn blend(self, over: Rgb, alpha: f32) -> Self {
        if alpha >= 1.0 {
            return over;
        }
        if alpha <= 0.0 || alpha.is_nan() {
            return self;
        }
        let base = self.to_floats();
        let top = over.to_floats();
        Self::from_floats([
            top[0] * alpha + base[0] * (1.0 - alpha),
            top[1] * alpha + base[1] * (1.0 - alpha),
            top[2] * alpha + base[2] * (1.0 - alpha),
        ])
    }

    /// Channel-wise product, as used for biome and water tints.
    pub fn multiply(self, other: Rgb) -> Self {
        let a = self.to_floats();
        let b = other.to_floats();
        Self::from_floats([a[0] * b[0], a[1] * b[1], a[2] * b[2]])
    }

    #[inline]
    pub fn luminance(self) -> f32 {
        let [r, g, b] = self.to_floats();
        0.299 * r + 0.587 * g + 0.114 * b
    }
}

#[inline]
fn channel(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

impl From<u32> for Rgb {
    fn from(hex: u32) -> Self {
        Rgb::from_hex(hex)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Rgb::new(c[0], c[1], c[2])
    }
}

impl fmt::Debug for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_hex())
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_hex())
    }
}
