//! Colour space conversion
//!
//! Per-pixel conversion between 8-bit sRGB and CIE L*a*b* through CIE XYZ,
//! using the D65 reference white. All functions are pure and deterministic.
//!
//! - RGB -> XYZ: inverse sRGB companding, then the sRGB (D65) matrix
//! - XYZ -> L*a*b*: CIE cube-root / linear piecewise function
//! - L*a*b* -> XYZ -> RGB: exact inverses, quantized by clamping and flooring

/// Actual CIE standard for the cube-root switch (216/24389)
pub const EPSILON: f64 = 216.0 / 24389.0;

/// Actual CIE standard for the linear segment slope (24389/27)
pub const KAPPA: f64 = 24389.0 / 27.0;

/// `KAPPA * EPSILON`, the L* switch used for the Y channel on the way back
pub const KAPPA_EPSILON: f64 = 216.0 / 27.0;

/// D65 reference white in XYZ
pub const REFERENCE_WHITE: Xyz = Xyz {
    x: 0.95047,
    y: 1.0,
    z: 1.08883,
};

/// Largest 8-bit channel value
pub const MAX_RGB: f64 = 255.0;

/// Scale applied to linear [0,1] RGB before quantization
pub const RGB_RANGE: f64 = 256.0;

/// Lightness bounds
pub const MIN_LIGHTNESS: f64 = 0.0;
pub const MAX_LIGHTNESS: f64 = 100.0;

const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

const XYZ_TO_SRGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// CIE L*a*b* colour
///
/// - `l`: Lightness in range [0.0, 100.0]
/// - `a`: Green-Red component, practically [-128, 127]
/// - `b`: Blue-Yellow component, practically [-128, 127]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    /// Create a new L*a*b* colour
    pub fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Squared Euclidean distance to another colour
    #[inline]
    pub fn distance_squared(&self, other: &Lab) -> f64 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        dl * dl + da * da + db * db
    }
}

/// CIE XYZ colour (D65 illuminant)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    /// Create a new XYZ colour
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[inline]
fn inverse_companding(v: f64) -> f64 {
    if v > 0.04045 {
        ((v + 0.055) / 1.055).powf(2.4)
    } else {
        v / 12.92
    }
}

#[inline]
fn companding(v: f64) -> f64 {
    if v > 0.0031308 {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * v
    }
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

#[inline]
fn lab_f_inverse(f: f64) -> f64 {
    let f3 = f * f * f;
    if f3 > EPSILON {
        f3
    } else {
        (116.0 * f - 16.0) / KAPPA
    }
}

/// Convert 8-bit sRGB to XYZ
pub fn rgb_to_xyz(r: u8, g: u8, b: u8) -> Xyz {
    let lin = [
        inverse_companding(r as f64 / MAX_RGB),
        inverse_companding(g as f64 / MAX_RGB),
        inverse_companding(b as f64 / MAX_RGB),
    ];
    let m = &SRGB_TO_XYZ;
    Xyz {
        x: m[0][0] * lin[0] + m[0][1] * lin[1] + m[0][2] * lin[2],
        y: m[1][0] * lin[0] + m[1][1] * lin[1] + m[1][2] * lin[2],
        z: m[2][0] * lin[0] + m[2][1] * lin[1] + m[2][2] * lin[2],
    }
}

/// Convert XYZ to L*a*b*
pub fn xyz_to_lab(xyz: Xyz) -> Lab {
    let fx = lab_f(xyz.x / REFERENCE_WHITE.x);
    let fy = lab_f(xyz.y / REFERENCE_WHITE.y);
    let fz = lab_f(xyz.z / REFERENCE_WHITE.z);
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert L*a*b* to XYZ
///
/// The Y channel switches on L* itself (`L* > KAPPA_EPSILON`) rather than on
/// the cubed ratio.
pub fn lab_to_xyz(lab: Lab) -> Xyz {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = lab.a / 500.0 + fy;
    let fz = fy - lab.b / 200.0;

    let yr = if lab.l > KAPPA_EPSILON {
        fy * fy * fy
    } else {
        lab.l / KAPPA
    };

    Xyz {
        x: lab_f_inverse(fx) * REFERENCE_WHITE.x,
        y: yr * REFERENCE_WHITE.y,
        z: lab_f_inverse(fz) * REFERENCE_WHITE.z,
    }
}

/// Convert XYZ to unquantized RGB in `[0, RGB_RANGE)` (may leave the gamut)
pub fn xyz_to_rgb_real(xyz: Xyz) -> [f64; 3] {
    let m = &XYZ_TO_SRGB;
    let lin = [
        m[0][0] * xyz.x + m[0][1] * xyz.y + m[0][2] * xyz.z,
        m[1][0] * xyz.x + m[1][1] * xyz.y + m[1][2] * xyz.z,
        m[2][0] * xyz.x + m[2][1] * xyz.y + m[2][2] * xyz.z,
    ];
    [
        companding(lin[0]) * RGB_RANGE,
        companding(lin[1]) * RGB_RANGE,
        companding(lin[2]) * RGB_RANGE,
    ]
}

/// Quantize a real channel value: clamp to [0, 255] and floor.
#[inline]
pub fn quantize_channel(v: f64) -> u8 {
    if v > MAX_RGB {
        255
    } else if v < 0.0 || v.is_nan() {
        0
    } else {
        v.floor() as u8
    }
}

/// Convert XYZ to 8-bit sRGB
pub fn xyz_to_rgb(xyz: Xyz) -> (u8, u8, u8) {
    let [r, g, b] = xyz_to_rgb_real(xyz);
    (quantize_channel(r), quantize_channel(g), quantize_channel(b))
}

/// Convert 8-bit sRGB to L*a*b*
///
/// # Examples
///
/// ```
/// use stippler_core::colorspace::rgb_to_lab;
///
/// let white = rgb_to_lab(255, 255, 255);
/// assert!((white.l - 100.0).abs() < 1e-3);
/// ```
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> Lab {
    xyz_to_lab(rgb_to_xyz(r, g, b))
}

/// Convert L*a*b* to 8-bit sRGB
pub fn lab_to_rgb(lab: Lab) -> (u8, u8, u8) {
    xyz_to_rgb(lab_to_xyz(lab))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_and_white() {
        let black = rgb_to_lab(0, 0, 0);
        assert!(black.l.abs() < 1e-9);
        assert!(black.a.abs() < 1e-9);
        assert!(black.b.abs() < 1e-9);

        let white = rgb_to_lab(255, 255, 255);
        assert!((white.l - 100.0).abs() < 1e-3);
        assert!(white.a.abs() < 0.01);
        assert!(white.b.abs() < 0.01);
    }

    #[test]
    fn test_primary_red() {
        let red = rgb_to_lab(255, 0, 0);
        assert!((red.l - 53.24).abs() < 0.05);
        assert!((red.a - 80.09).abs() < 0.05);
        assert!((red.b - 67.20).abs() < 0.05);
    }

    #[test]
    fn test_lab_to_xyz_inverts_xyz_to_lab() {
        let xyz = rgb_to_xyz(12, 200, 99);
        let back = lab_to_xyz(xyz_to_lab(xyz));
        assert!((xyz.x - back.x).abs() < 1e-9);
        assert!((xyz.y - back.y).abs() < 1e-9);
        assert!((xyz.z - back.z).abs() < 1e-9);
    }

    #[test]
    fn test_dark_linear_segment() {
        // L* below KAPPA_EPSILON takes the linear branch for Y
        let lab = Lab::new(5.0, 0.0, 0.0);
        let xyz = lab_to_xyz(lab);
        assert!((xyz.y - 5.0 / KAPPA).abs() < 1e-12);
    }

    #[test]
    fn test_quantize_clamps_and_floors() {
        assert_eq!(quantize_channel(-3.0), 0);
        assert_eq!(quantize_channel(255.9), 255);
        assert_eq!(quantize_channel(300.0), 255);
        assert_eq!(quantize_channel(17.99), 17);
    }

    #[test]
    fn test_out_of_gamut_is_clipped() {
        let (r, g, b) = lab_to_rgb(Lab::new(50.0, 200.0, -200.0));
        assert_eq!(g, 0);
        assert!(r > 0);
        assert_eq!(b, 255);
    }
}
