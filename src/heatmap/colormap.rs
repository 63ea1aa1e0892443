//! Intensity-to-color mapping. Pure and deterministic: the same
//! (intensity, config) pair always produces the same RGBA, and the shader
//! evaluates the identical control-point tables uploaded as uniforms.

/// Floor for the normalization denominator when min_heat >= max_heat.
const MIN_HEAT_RANGE: f32 = 1e-6;

/// Number of control points per ramp. Evenly spaced over t in [0, 1].
pub const RAMP_POINTS: usize = 5;

/// Named color ramp. Closed set; control points are part of the external
/// interface and stay fixed across releases for reproducibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientStyle {
    Thermal,
    Monochrome,
    Viridis,
}

/// Black-body style ramp: black through reds and yellows to white.
const THERMAL: [[f32; 3]; RAMP_POINTS] = [
    [0.0, 0.0, 0.0],
    [0.55, 0.0, 0.0],
    [1.0, 0.35, 0.0],
    [1.0, 0.85, 0.0],
    [1.0, 1.0, 1.0],
];

const MONOCHROME: [[f32; 3]; RAMP_POINTS] = [
    [0.0, 0.0, 0.0],
    [0.25, 0.25, 0.25],
    [0.5, 0.5, 0.5],
    [0.75, 0.75, 0.75],
    [1.0, 1.0, 1.0],
];

/// Five-point approximation of the matplotlib viridis colormap.
const VIRIDIS: [[f32; 3]; RAMP_POINTS] = [
    [0.267, 0.005, 0.329],
    [0.229, 0.322, 0.546],
    [0.128, 0.567, 0.551],
    [0.369, 0.789, 0.383],
    [0.993, 0.906, 0.144],
];

impl GradientStyle {
    pub const ALL: [GradientStyle; 3] = [
        GradientStyle::Thermal,
        GradientStyle::Monochrome,
        GradientStyle::Viridis,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GradientStyle::Thermal => "Thermal",
            GradientStyle::Monochrome => "Monochrome",
            GradientStyle::Viridis => "Viridis",
        }
    }

    /// Control points, evenly spaced over t = 0.0, 0.25, 0.5, 0.75, 1.0.
    pub fn ramp(self) -> &'static [[f32; 3]; RAMP_POINTS] {
        match self {
            GradientStyle::Thermal => &THERMAL,
            GradientStyle::Monochrome => &MONOCHROME,
            GradientStyle::Viridis => &VIRIDIS,
        }
    }
}

/// Display configuration supplied by the UI layer, sampled once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayConfig {
    pub min_heat: f32,
    pub max_heat: f32,
    pub gradient_style: GradientStyle,
    pub use_transparency: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            min_heat: 0.0,
            max_heat: 1.0,
            gradient_style: GradientStyle::Thermal,
            use_transparency: false,
        }
    }
}

/// Normalize an intensity into [0, 1] against the configured heat range.
/// A degenerate range (min >= max) clamps the denominator instead of
/// dividing by zero or negative.
pub fn normalize(intensity: f32, cfg: &DisplayConfig) -> f32 {
    let range = (cfg.max_heat - cfg.min_heat).max(MIN_HEAT_RANGE);
    ((intensity - cfg.min_heat) / range).clamp(0.0, 1.0)
}

/// Evaluate a ramp at t in [0, 1] by piecewise-linear interpolation.
pub fn eval_ramp(ramp: &[[f32; 3]; RAMP_POINTS], t: f32) -> [f32; 3] {
    let x = t.clamp(0.0, 1.0) * (RAMP_POINTS - 1) as f32;
    let i = (x as usize).min(RAMP_POINTS - 2);
    let f = x - i as f32;
    let a = ramp[i];
    let b = ramp[i + 1];
    [
        a[0] * (1.0 - f) + b[0] * f,
        a[1] * (1.0 - f) + b[1] * f,
        a[2] * (1.0 - f) + b[2] * f,
    ]
}

/// Map an accumulated intensity to display RGBA. Alpha tracks t when
/// transparency is on (invisible at t=0, opaque at t=1), else constant 1.
pub fn map(intensity: f32, cfg: &DisplayConfig) -> [f32; 4] {
    let t = normalize(intensity, cfg);
    let rgb = eval_ramp(cfg.gradient_style.ramp(), t);
    let alpha = if cfg.use_transparency { t } else { 1.0 };
    [rgb[0], rgb[1], rgb[2], alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luminance(rgb: &[f32]) -> f32 {
        0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
    }

    #[test]
    fn map_is_deterministic() {
        let cfg = DisplayConfig {
            min_heat: 0.2,
            max_heat: 5.0,
            gradient_style: GradientStyle::Viridis,
            use_transparency: true,
        };
        let a = map(1.37, &cfg);
        let b = map(1.37, &cfg);
        assert_eq!(a, b, "identical inputs must yield bit-identical output");
    }

    #[test]
    fn out_of_range_intensity_clamps() {
        let cfg = DisplayConfig::default();
        assert_eq!(map(-10.0, &cfg), map(0.0, &cfg));
        assert_eq!(map(99.0, &cfg), map(1.0, &cfg));
    }

    #[test]
    fn inverted_range_does_not_produce_nan() {
        let cfg = DisplayConfig {
            min_heat: 5.0,
            max_heat: 1.0,
            ..DisplayConfig::default()
        };
        let out = map(3.0, &cfg);
        assert!(out.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn ramps_are_luminance_monotonic() {
        for style in GradientStyle::ALL {
            let ramp = style.ramp();
            let mut prev = -1.0f32;
            for step in 0..=100 {
                let t = step as f32 / 100.0;
                let lum = luminance(&eval_ramp(ramp, t));
                assert!(
                    lum >= prev - 1e-6,
                    "{}: luminance reversal at t={t}",
                    style.label()
                );
                prev = lum;
            }
        }
    }

    #[test]
    fn transparency_scales_alpha_with_t() {
        let cfg = DisplayConfig {
            use_transparency: true,
            ..DisplayConfig::default()
        };
        assert_eq!(map(0.0, &cfg)[3], 0.0);
        assert_eq!(map(0.5, &cfg)[3], 0.5);
        assert_eq!(map(1.0, &cfg)[3], 1.0);

        let opaque = DisplayConfig::default();
        assert_eq!(map(0.0, &opaque)[3], 1.0);
        assert_eq!(map(1.0, &opaque)[3], 1.0);
    }

    #[test]
    fn ramp_endpoints_are_control_points() {
        for style in GradientStyle::ALL {
            let ramp = style.ramp();
            assert_eq!(eval_ramp(ramp, 0.0), ramp[0]);
            assert_eq!(eval_ramp(ramp, 1.0), ramp[RAMP_POINTS - 1]);
        }
    }
}
