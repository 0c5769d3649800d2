use noise::{NoiseFn, OpenSimplex};

/// Linear remap of `v` from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// A degenerate input range yields `out_min`.
pub fn map_range(v: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32, clamp: bool) -> f32 {
    let span = in_max - in_min;
    if span.abs() < f32::EPSILON {
        return out_min;
    }
    let out = (v - in_min) / span * (out_max - out_min) + out_min;
    if !clamp {
        return out;
    }
    let (lo, hi) = if out_min <= out_max {
        (out_min, out_max)
    } else {
        (out_max, out_min)
    };
    out.clamp(lo, hi)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn ease_quad_out(t: f32) -> f32 {
    -t * (t - 2.0)
}

/// Seeded 3D simplex noise in roughly `[-amp, amp]`.
pub struct Noise3 {
    inner: OpenSimplex,
}

impl Noise3 {
    pub fn new(seed: u32) -> Self {
        Self {
            inner: OpenSimplex::new(seed),
        }
    }

    pub fn sample(&self, x: f32, y: f32, z: f32, freq: f32, amp: f32) -> f32 {
        let v = self.inner.get([
            (x * freq) as f64,
            (y * freq) as f64,
            (z * freq) as f64,
        ]);
        amp * (v as f32).clamp(-1.0, 1.0)
    }
}

/// Seeded uniform float source.
pub struct Random {
    rng: fastrand::Rng,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.rng.f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_range_clamps_and_handles_degenerate_input() {
        assert!((map_range(0.0, -1.0, 1.0, 2.0, 40.0, false) - 21.0).abs() < 1e-5);
        assert!((map_range(3.0, -1.0, 1.0, 2.0, 40.0, false) - 78.0).abs() < 1e-4);
        assert!((map_range(3.0, 0.0, 200.0, 1.0, 4.0, true) - 1.045).abs() < 1e-5);
        assert_eq!(map_range(500.0, 0.0, 200.0, 1.0, 4.0, true), 4.0);
        assert_eq!(map_range(5.0, 1.0, 1.0, 7.0, 9.0, false), 7.0);
    }

    #[test]
    fn ease_quad_out_endpoints() {
        assert_eq!(ease_quad_out(0.0), 0.0);
        assert_eq!(ease_quad_out(1.0), 1.0);
        assert!((ease_quad_out(0.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn noise_is_deterministic_and_bounded() {
        let a = Noise3::new(7);
        let b = Noise3::new(7);
        for i in 0..50 {
            let x = i as f32 * 37.0;
            let v = a.sample(x, x * 0.5, 1.3, 0.002, 1.0);
            assert_eq!(v, b.sample(x, x * 0.5, 1.3, 0.002, 1.0));
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn random_range_stays_in_bounds() {
        let mut r = Random::new(42);
        for _ in 0..1000 {
            let v = r.range(0.9, 0.95);
            assert!((0.9..0.95).contains(&v));
        }
    }
}
