#![forbid(unsafe_code)]

//! Gamma transfer tables built with finite differences.
//!
//! Two lookup tables convert between 8-bit "voltage" samples and a
//! fixed-point linear-light scale:
//!
//! - `linearize[0..=255] -> [0..=gmax]`
//! - `delinearize[0..=gmax] -> [0..=255]`
//!
//! where `gmax = (256 << shift) - 1`. Both are filled by stepping the
//! power-law ODE `dp/di = g * p / i` downward from the known top endpoint,
//! so building a table costs one multiply/divide per entry and no `powf`.
//! The approximation stays within a few LSB of the exact curve.
//!
//! The sRGB curve has a linear toe; near zero the stepping switches to a
//! constant slope so the derivative never blows up.

/// Largest supported fixed-point shift (`linearize` entries are `u16`).
pub const MAX_GAMMA_SHIFT: u32 = 8;

// sRGB offset term (0.055) scaled to the 0..=255 sample range.
const SRGB_OFFSET: f64 = 255.0 * 0.055;
const SRGB_EXPONENT: f64 = 2.4;
// Below these points the sRGB curve is treated as linear.
const SRGB_LINEARIZE_KNEE: usize = 10;
const SRGB_DELINEARIZE_KNEE: f64 = 10.02;

/// Transfer curve selected by a gamma value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GammaCurve {
    /// Piecewise sRGB curve.
    Srgb,
    /// Pure power law `linear = voltage^g`, with `g > 0`.
    Power(f64),
}

impl GammaCurve {
    /// Normalize a raw gamma value.
    ///
    /// Anything that is not a finite number above zero selects
    /// [`GammaCurve::Srgb`]; `0.0` and negative values are the documented
    /// sentinel, NaN and infinities fall back to the same curve.
    #[must_use]
    pub fn from_gamma(gamma: f64) -> Self {
        if gamma.is_finite() && gamma > 0.0 {
            Self::Power(gamma)
        } else {
            Self::Srgb
        }
    }

    /// Raw gamma value (`0.0` for sRGB).
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Srgb => 0.0,
            Self::Power(g) => g,
        }
    }
}

/// Voltage <-> linear-light lookup tables for one gamma curve.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaTables {
    curve: GammaCurve,
    shift: u32,
    linearize: Vec<u16>,
    delinearize: Vec<u8>,
}

impl GammaTables {
    /// Build both tables for `curve` at `shift` bits of extra precision.
    ///
    /// `shift` is clamped to [`MAX_GAMMA_SHIFT`].
    #[must_use]
    pub fn build(curve: GammaCurve, shift: u32) -> Self {
        let shift = shift.min(MAX_GAMMA_SHIFT);
        let gmax = (256usize << shift) - 1;
        let mut linearize = vec![0u16; 256];
        let mut delinearize = vec![0u8; gmax + 1];

        match curve {
            GammaCurve::Srgb => {
                fill_srgb_linearize(&mut linearize, gmax);
                fill_srgb_delinearize(&mut delinearize, gmax);
            }
            GammaCurve::Power(g) => {
                fill_power_linearize(&mut linearize, gmax, g);
                fill_power_delinearize(&mut delinearize, gmax, g);
            }
        }

        // The recurrences leave rounding noise at the bottom end.
        linearize[0] = 0;
        delinearize[0] = 0;

        Self {
            curve,
            shift,
            linearize,
            delinearize,
        }
    }

    #[must_use]
    pub const fn curve(&self) -> GammaCurve {
        self.curve
    }

    #[must_use]
    pub const fn shift(&self) -> u32 {
        self.shift
    }

    /// Top of the linear-light scale.
    #[must_use]
    pub fn gmax(&self) -> usize {
        self.delinearize.len() - 1
    }

    /// Voltage sample to linear light.
    #[inline]
    #[must_use]
    pub fn linearize(&self, sample: u8) -> u32 {
        u32::from(self.linearize[usize::from(sample)])
    }

    /// Linear light back to a voltage sample. Values above `gmax` saturate.
    #[inline]
    #[must_use]
    pub fn delinearize(&self, linear: u32) -> u8 {
        let idx = (linear as usize).min(self.gmax());
        self.delinearize[idx]
    }

    /// Blend two linearized samples with weight `a` (0 = background,
    /// 255 = foreground) and convert the result back to a sample.
    #[inline]
    #[must_use]
    pub fn mix(&self, lin_back: u32, lin_fore: u32, a: u32) -> u8 {
        debug_assert!(a <= 255);
        self.delinearize((lin_fore * a + lin_back * (255 - a) + 127) / 255)
    }

    #[must_use]
    pub fn linearize_table(&self) -> &[u16] {
        &self.linearize
    }

    #[must_use]
    pub fn delinearize_table(&self) -> &[u8] {
        &self.delinearize
    }
}

#[inline]
fn to_u16(p: f64) -> u16 {
    // Float-to-int casts saturate, so small negative overshoot lands on 0.
    (p + 0.5) as u16
}

#[inline]
fn to_u8(p: f64) -> u8 {
    (p + 0.5) as u8
}

fn fill_srgb_linearize(table: &mut [u16], gmax: usize) {
    let mut p = gmax as f64;
    let mut ii = 255usize;
    while ii > SRGB_LINEARIZE_KNEE {
        table[ii] = to_u16(p);
        let d = SRGB_EXPONENT * p / (ii as f64 + SRGB_OFFSET);
        ii -= 1;
        p -= d;
    }

    let d = p / ii as f64;
    loop {
        table[ii] = to_u16(p);
        if ii == 0 {
            break;
        }
        ii -= 1;
        p -= d;
    }
}

fn fill_srgb_delinearize(table: &mut [u8], gmax: usize) {
    let mut p = 255.0f64;
    let mut ii = gmax;
    while p > SRGB_DELINEARIZE_KNEE && ii > 0 {
        table[ii] = to_u8(p);
        let d = (p + SRGB_OFFSET) / (SRGB_EXPONENT * ii as f64);
        ii -= 1;
        p -= d;
    }
    if ii == 0 {
        return;
    }

    let d = p / ii as f64;
    loop {
        table[ii] = to_u8(p);
        if ii == 0 {
            break;
        }
        ii -= 1;
        p -= d;
    }
}

fn fill_power_linearize(table: &mut [u16], gmax: usize, gamma: f64) {
    let mut p = gmax as f64;
    for ii in (1..=255usize).rev() {
        table[ii] = to_u16(p);
        p = (p - gamma * p / ii as f64).max(0.0);
    }
}

fn fill_power_delinearize(table: &mut [u8], gmax: usize, gamma: f64) {
    let mut p = 255.0f64;
    for ii in (1..=gmax).rev() {
        table[ii] = to_u8(p);
        p = (p - p / (gamma * ii as f64)).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn srgb_decode(x: f64) -> f64 {
        if x <= 0.039_285_714 {
            x / 12.923_21
        } else {
            ((x + 0.055) / 1.055).powf(2.4)
        }
    }

    fn srgb_encode(x: f64) -> f64 {
        if x <= 0.003_039_934_6 {
            x * 12.923_21
        } else {
            1.055 * x.powf(1.0 / 2.4) - 0.055
        }
    }

    fn exact_linearize(curve: GammaCurve, gmax: usize, v: usize) -> f64 {
        let x = v as f64 / 255.0;
        let y = match curve {
            GammaCurve::Srgb => srgb_decode(x),
            GammaCurve::Power(g) => x.powf(g),
        };
        gmax as f64 * y
    }

    fn exact_delinearize(curve: GammaCurve, gmax: usize, i: usize) -> f64 {
        let x = i as f64 / gmax as f64;
        let y = match curve {
            GammaCurve::Srgb => srgb_encode(x),
            GammaCurve::Power(g) => x.powf(1.0 / g),
        };
        255.0 * y
    }

    #[test]
    fn non_positive_and_non_finite_select_srgb() {
        assert_eq!(GammaCurve::from_gamma(0.0), GammaCurve::Srgb);
        assert_eq!(GammaCurve::from_gamma(-1.8), GammaCurve::Srgb);
        assert_eq!(GammaCurve::from_gamma(f64::NAN), GammaCurve::Srgb);
        assert_eq!(GammaCurve::from_gamma(f64::INFINITY), GammaCurve::Srgb);
        assert_eq!(GammaCurve::from_gamma(2.2), GammaCurve::Power(2.2));
        assert_eq!(GammaCurve::Srgb.value(), 0.0);
    }

    #[test]
    fn table_sizes_follow_shift() {
        let t = GammaTables::build(GammaCurve::Srgb, 2);
        assert_eq!(t.linearize_table().len(), 256);
        assert_eq!(t.delinearize_table().len(), 1024);
        assert_eq!(t.gmax(), 1023);

        let t = GammaTables::build(GammaCurve::Power(2.2), 0);
        assert_eq!(t.gmax(), 255);
    }

    #[test]
    fn shift_is_clamped() {
        let t = GammaTables::build(GammaCurve::Power(1.8), 30);
        assert_eq!(t.shift(), MAX_GAMMA_SHIFT);
        assert_eq!(t.gmax(), 65535);
        assert_eq!(t.linearize(255), 65535);
    }

    #[test]
    fn endpoints_are_exact() {
        for curve in [
            GammaCurve::Srgb,
            GammaCurve::Power(1.0),
            GammaCurve::Power(2.2),
        ] {
            for shift in [0, 2, 4] {
                let t = GammaTables::build(curve, shift);
                assert_eq!(t.linearize(0), 0);
                assert_eq!(t.linearize(255) as usize, t.gmax());
                assert_eq!(t.delinearize(0), 0);
                assert_eq!(t.delinearize(t.gmax() as u32), 255);
            }
        }
    }

    #[test]
    fn identity_gamma_is_exact_at_shift_zero() {
        let t = GammaTables::build(GammaCurve::Power(1.0), 0);
        for v in 0..=255u8 {
            assert_eq!(t.linearize(v), u32::from(v));
            assert_eq!(t.delinearize(u32::from(v)), v);
        }
    }

    #[test]
    fn tables_are_monotonic() {
        for g in [0.0, 0.45, 1.0, 1.8, 2.2, 3.0, 5.5] {
            for shift in [0, 2, 4] {
                let t = GammaTables::build(GammaCurve::from_gamma(g), shift);
                assert!(
                    t.linearize_table().windows(2).all(|w| w[0] <= w[1]),
                    "linearize not monotonic for g={g} shift={shift}"
                );
                assert!(
                    t.delinearize_table().windows(2).all(|w| w[0] <= w[1]),
                    "delinearize not monotonic for g={g} shift={shift}"
                );
            }
        }
    }

    #[test]
    fn finite_differences_track_the_exact_curve() {
        for curve in [
            GammaCurve::Srgb,
            GammaCurve::Power(1.8),
            GammaCurve::Power(2.2),
        ] {
            for shift in [2, 4] {
                let t = GammaTables::build(curve, shift);
                let gmax = t.gmax();
                let lin_tol = f64::from(1u32 << shift) + 0.5;
                for v in 0..=255usize {
                    let exact = exact_linearize(curve, gmax, v);
                    let got = f64::from(t.linearize(v as u8));
                    assert!(
                        (got - exact).abs() <= lin_tol,
                        "{curve:?} shift={shift} linearize[{v}] = {got}, exact {exact:.2}"
                    );
                }
                for i in 0..=gmax {
                    let exact = exact_delinearize(curve, gmax, i);
                    let got = f64::from(t.delinearize(i as u32));
                    assert!(
                        (got - exact).abs() <= 2.5,
                        "{curve:?} shift={shift} delinearize[{i}] = {got}, exact {exact:.2}"
                    );
                }
            }
        }
    }

    #[test]
    fn delinearize_saturates_above_gmax() {
        let t = GammaTables::build(GammaCurve::Srgb, 2);
        assert_eq!(t.delinearize(u32::MAX), 255);
    }

    #[test]
    fn mix_reproduces_endpoints() {
        let t = GammaTables::build(GammaCurve::Power(1.0), 0);
        let back = t.linearize(40);
        let fore = t.linearize(200);
        assert_eq!(t.mix(back, fore, 0), 40);
        assert_eq!(t.mix(back, fore, 255), 200);
        // Identity curve: plain rounded average.
        assert_eq!(t.mix(back, fore, 128), 120);
    }

    #[test]
    fn srgb_mid_grey_is_lighter_than_naive_average() {
        let t = GammaTables::build(GammaCurve::Srgb, 4);
        let half = t.mix(t.linearize(0), t.linearize(255), 128);
        // 50% linear light encodes to ~188 in sRGB.
        assert!((187..=189).contains(&half), "got {half}");
    }
}
