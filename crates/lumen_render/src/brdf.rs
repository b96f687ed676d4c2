//! Reflectance evaluation and importance sampling.
//!
//! Both formulas take the view direction `v` and light direction `l`
//! pointing away from the surface, and the shading normal `norm`. The
//! cosine factor max(0, norm . l) is applied by the caller.

use lumen_core::{BrdfModel, Color};
use lumen_math::{Frame, Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

use crate::sampling::{
    sample_hemisphere_cosine, sample_hemisphere_cosine_pdf, sample_hemisphere_cospower,
    sample_hemisphere_cospower_pdf,
};

/// Floor for cosine denominators in the microfacet terms and the
/// half-vector Jacobian.
pub const BRDF_EPSILON: f32 = 1e-4;

/// A sampled incident direction with its solid-angle density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrdfSample {
    pub direction: Vec3,
    pub pdf: f32,
}

/// Evaluate the BRDF for the given material parameters.
///
/// - `Standard`: `kd / pi + ks (n + 8) / (8 pi) max(0, norm . h)^n`
/// - `Microfacet`: `D G F / (4 (norm . l)(norm . v))` with a normalized
///   cosine-power distribution, Schlick Fresnel and the Cook-Torrance
///   shadowing term. Returns zero when either direction is at or below
///   the horizon.
pub fn eval_brdf(
    kd: Color,
    ks: Color,
    n: f32,
    v: Vec3,
    l: Vec3,
    norm: Vec3,
    model: BrdfModel,
) -> Color {
    let h = (v + l).normalize_or_zero();
    match model {
        BrdfModel::Standard => {
            kd * FRAC_1_PI + ks * ((n + 8.0) / (8.0 * PI)) * norm.dot(h).max(0.0).powf(n)
        }
        BrdfModel::Microfacet => {
            let n_dot_l = norm.dot(l);
            let n_dot_v = norm.dot(v);
            if n_dot_l <= BRDF_EPSILON || n_dot_v <= BRDF_EPSILON {
                return Color::ZERO;
            }
            let n_dot_h = norm.dot(h).max(0.0);

            let d = (n + 2.0) / (2.0 * PI) * n_dot_h.powf(n);
            let f = ks + (Color::ONE - ks) * (1.0 - n_dot_l).powi(5);
            let g = 1.0_f32
                .min(2.0 * n_dot_h * n_dot_v / v.dot(h).max(BRDF_EPSILON))
                .min(2.0 * n_dot_h * n_dot_l / l.dot(h).max(BRDF_EPSILON));

            f * (d * g / (4.0 * n_dot_l * n_dot_v))
        }
    }
}

/// Cosine-weighted direction around `norm`.
pub fn sample_cosine(norm: Vec3, ruv: Vec2) -> BrdfSample {
    let frame = Frame::from_z(norm);
    let l_local = sample_hemisphere_cosine(ruv);
    BrdfSample {
        direction: frame.transform_direction(l_local),
        pdf: sample_hemisphere_cosine_pdf(l_local),
    }
}

/// Importance-sample an incident direction for the diffuse + specular mix.
///
/// With probability `dw = mean(kd) / (mean(kd) + mean(ks))` the direction
/// comes from the cosine lobe; otherwise a half-vector is drawn from the
/// cos^n lobe and `v` is reflected about it. The returned pdf is the full
/// mixture density of the chosen direction under both strategies, not
/// just the density of the branch taken.
///
/// A zero `ks` falls back to plain cosine sampling.
pub fn sample_brdf(
    kd: Color,
    ks: Color,
    n: f32,
    v: Vec3,
    norm: Vec3,
    ruv: Vec2,
    rl: f32,
) -> BrdfSample {
    if ks == Color::ZERO {
        return sample_cosine(norm, ruv);
    }

    let frame = Frame::from_z(norm);
    let dw = mean(kd) / (mean(kd) + mean(ks));
    let v_local = frame.inverse_transform_direction(v);

    let (l_local, h_local) = if rl < dw {
        let l = sample_hemisphere_cosine(ruv);
        (l, (l + v_local).normalize_or_zero())
    } else {
        let h = sample_hemisphere_cospower(ruv, n);
        (-v_local + h * (2.0 * v_local.dot(h)), h)
    };

    let diffuse_pdf = sample_hemisphere_cosine_pdf(l_local);
    // Half-vector density to incident-direction density
    let jacobian = 4.0 * v_local.dot(h_local).max(BRDF_EPSILON);
    let specular_pdf = sample_hemisphere_cospower_pdf(h_local, n) / jacobian;

    BrdfSample {
        direction: frame.transform_direction(l_local),
        pdf: dw * diffuse_pdf + (1.0 - dw) * specular_pdf,
    }
}

#[inline]
fn mean(c: Color) -> f32 {
    c.element_sum() / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_uv(rng: &mut StdRng) -> Vec2 {
        Vec2::new(rng.gen(), rng.gen())
    }

    fn dir(theta_deg: f32, phi_deg: f32) -> Vec3 {
        let (t, p) = (theta_deg.to_radians(), phi_deg.to_radians());
        Vec3::new(t.sin() * p.cos(), t.sin() * p.sin(), t.cos())
    }

    #[test]
    fn test_standard_without_specular_is_lambertian() {
        let kd = Vec3::new(0.2, 0.5, 0.9);
        let angles = [
            (0.0, 0.0, 0.0, 0.0),
            (30.0, 10.0, 60.0, 200.0),
            (85.0, 90.0, 5.0, 270.0),
        ];
        for (tv, pv, tl, pl) in angles {
            let (v, l) = (dir(tv, pv), dir(tl, pl));
            let f = eval_brdf(kd, Vec3::ZERO, 20.0, v, l, Vec3::Z, BrdfModel::Standard);
            assert!((f - kd / PI).length() < 1e-6, "{f:?}");
        }
    }

    #[test]
    fn test_standard_specular_peak() {
        // Mirror configuration puts the half-vector on the normal
        let ks = Vec3::splat(0.5);
        let n = 10.0;
        let m = BrdfModel::Standard;
        let v = dir(30.0, 0.0);
        let f = eval_brdf(Vec3::ZERO, ks, n, v, dir(30.0, 180.0), Vec3::Z, m);
        let expected = 0.5 * (n + 8.0) / (8.0 * PI);
        assert!((f.x - expected).abs() < 1e-4);

        // Off-peak is dimmer
        let off = eval_brdf(Vec3::ZERO, ks, n, v, dir(30.0, 90.0), Vec3::Z, m);
        assert!(off.x < f.x);
    }

    #[test]
    fn test_microfacet_below_horizon_is_zero() {
        let ks = Vec3::splat(0.04);
        let below = Vec3::new(0.5, 0.0, -0.5).normalize();
        let up = dir(20.0, 0.0);
        let m = BrdfModel::Microfacet;
        assert_eq!(eval_brdf(Vec3::ONE, ks, 20.0, up, below, Vec3::Z, m), Vec3::ZERO);
        assert_eq!(eval_brdf(Vec3::ONE, ks, 20.0, below, up, Vec3::Z, m), Vec3::ZERO);
        // Grazing light sits on the singular denominator
        assert_eq!(eval_brdf(Vec3::ONE, ks, 20.0, up, Vec3::X, Vec3::Z, m), Vec3::ZERO);
    }

    #[test]
    fn test_microfacet_normal_incidence() {
        // v = l = norm: D = (n+2)/2pi, G = 1, F = ks
        let ks = Vec3::splat(0.04);
        let n = 20.0;
        let f = eval_brdf(Vec3::ZERO, ks, n, Vec3::Z, Vec3::Z, Vec3::Z, BrdfModel::Microfacet);
        let expected = 0.04 * (n + 2.0) / (2.0 * PI) / 4.0;
        assert!((f.x - expected).abs() < 1e-5);
    }

    #[test]
    fn test_microfacet_is_finite_and_non_negative() {
        let mut rng = StdRng::seed_from_u64(5);
        let ks = Vec3::new(0.9, 0.5, 0.1);
        for _ in 0..2000 {
            let v = sample_hemisphere_cosine(random_uv(&mut rng));
            let l = sample_hemisphere_cosine(random_uv(&mut rng));
            let f = eval_brdf(Vec3::ZERO, ks, 50.0, v, l, Vec3::Z, BrdfModel::Microfacet);
            assert!(f.is_finite());
            assert!(f.min_element() >= 0.0);
        }
    }

    #[test]
    fn test_sample_pdf_positive() {
        let mut rng = StdRng::seed_from_u64(42);
        let norm = Vec3::new(0.2, 1.0, -0.3).normalize();
        let frame = Frame::from_z(norm);
        let materials = [
            (Vec3::splat(0.5), Vec3::ZERO),
            (Vec3::splat(0.5), Vec3::splat(0.2)),
            (Vec3::ZERO, Vec3::splat(0.8)),
            (Vec3::new(0.9, 0.1, 0.1), Vec3::new(0.0, 0.0, 0.3)),
        ];
        for (kd, ks) in materials {
            for _ in 0..500 {
                // Views inside the upper hemisphere, away from grazing
                let mut v_local = sample_hemisphere_cosine(random_uv(&mut rng));
                v_local.z = v_local.z.max(0.1);
                let v = frame.transform_direction(v_local.normalize());
                let s = sample_brdf(kd, ks, 20.0, v, norm, random_uv(&mut rng), rng.gen());
                assert!(s.pdf > 0.0, "kd={kd:?} ks={ks:?} pdf={}", s.pdf);
                assert!(s.pdf.is_finite());
            }
        }
    }

    #[test]
    fn test_sample_without_specular_is_cosine() {
        let mut rng = StdRng::seed_from_u64(9);
        let norm = Vec3::new(1.0, 1.0, 0.0).normalize();
        let v = norm;
        for _ in 0..200 {
            let ruv = random_uv(&mut rng);
            let rl: f32 = rng.gen();
            let a = sample_brdf(Vec3::splat(0.7), Vec3::ZERO, 30.0, v, norm, ruv, rl);
            let b = sample_cosine(norm, ruv);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_sample_pdf_is_mixture_of_both_lobes() {
        let kd = Vec3::splat(0.3);
        let ks = Vec3::splat(0.1);
        let n = 8.0;
        let v = dir(40.0, 0.0);
        let ruv = Vec2::new(0.3, 0.6);
        let dw = 0.75;

        // Same ruv, diffuse branch (rl < dw) then specular branch
        for rl in [0.1, 0.9] {
            let s = sample_brdf(kd, ks, n, v, Vec3::Z, ruv, rl);
            // Sampling frame for +Z is the identity up to a rotation about Z,
            // and both densities only depend on z components.
            let l = s.direction;
            let h = (l + v).normalize();
            let jacobian = 4.0 * v.dot(h).max(BRDF_EPSILON);
            let expected = dw * sample_hemisphere_cosine_pdf(l)
                + (1.0 - dw) * sample_hemisphere_cospower_pdf(h, n) / jacobian;
            assert!((s.pdf - expected).abs() < 1e-3 * expected.max(1.0), "rl={rl}");
        }
    }

    /// Directional albedo of a Standard BRDF estimated with `sample_brdf`.
    fn albedo_importance(kd: Color, ks: Color, n: f32, v: Vec3, count: usize, seed: u64) -> f32 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sum = 0.0;
        for _ in 0..count {
            let s = sample_brdf(kd, ks, n, v, Vec3::Z, random_uv(&mut rng), rng.gen());
            if s.pdf > 0.0 {
                let l = s.direction;
                let f = eval_brdf(kd, ks, n, v, l, Vec3::Z, BrdfModel::Standard);
                sum += f.x * l.z.max(0.0) / s.pdf;
            }
        }
        sum / count as f32
    }

    /// Same albedo estimated with plain cosine sampling.
    fn albedo_cosine(kd: Color, ks: Color, n: f32, v: Vec3, count: usize, seed: u64) -> f32 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sum = 0.0;
        for _ in 0..count {
            let s = sample_cosine(Vec3::Z, random_uv(&mut rng));
            let l = s.direction;
            let f = eval_brdf(kd, ks, n, v, l, Vec3::Z, BrdfModel::Standard);
            sum += f.x * l.z / s.pdf;
        }
        sum / count as f32
    }

    #[test]
    fn test_sample_pdf_matches_sampled_density() {
        // An unbiased estimate needs the returned pdf to be the true
        // density of the sampled directions.
        let n = 20.0;
        let v = dir(30.0, 0.0);
        let count = 400_000;
        let materials = [
            (Vec3::splat(0.3), Vec3::splat(0.3)),
            (Vec3::ZERO, Vec3::splat(0.5)),
        ];
        for (kd, ks) in materials {
            let importance = albedo_importance(kd, ks, n, v, count, 11);
            let reference = albedo_cosine(kd, ks, n, v, count, 12);
            let rel = (importance - reference).abs() / reference;
            assert!(rel < 0.03, "kd={kd:?} importance={importance} cosine={reference}");
        }
    }

    #[test]
    fn test_sampled_directions_are_unit() {
        let mut rng = StdRng::seed_from_u64(1);
        let norm = Vec3::Y;
        for _ in 0..500 {
            let c = Vec3::splat(0.5);
            let s = sample_brdf(c, c, 100.0, norm, norm, random_uv(&mut rng), rng.gen());
            assert!((s.direction.length() - 1.0).abs() < 1e-3);
        }
    }
}
