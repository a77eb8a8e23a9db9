// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! FM quadrature discriminator.

use std::f32::consts::TAU;

use num_complex::Complex;

/// Four-quadrant arctangent approximation, accurate to about 0.005 rad.
/// Plenty for a discriminator whose output is low-passed anyway.
#[inline]
pub(crate) fn fast_atan2(y: f32, x: f32) -> f32 {
    if x == 0.0 {
        if y > 0.0 {
            return std::f32::consts::FRAC_PI_2;
        }
        if y < 0.0 {
            return -std::f32::consts::FRAC_PI_2;
        }
        return 0.0;
    }

    #[inline]
    fn fast_atan(z: f32) -> f32 {
        let abs_z = z.abs();
        if abs_z <= 1.0 {
            z * (std::f32::consts::FRAC_PI_4 + 0.273 * (1.0 - abs_z))
        } else {
            let inv = 1.0 / z;
            let base = inv * (std::f32::consts::FRAC_PI_4 + 0.273 * (1.0 - inv.abs()));
            if z > 0.0 {
                std::f32::consts::FRAC_PI_2 - base
            } else {
                -std::f32::consts::FRAC_PI_2 - base
            }
        }
    }

    if x > 0.0 {
        fast_atan(y / x)
    } else if y >= 0.0 {
        fast_atan(y / x) + std::f32::consts::PI
    } else {
        fast_atan(y / x) - std::f32::consts::PI
    }
}

/// Instantaneous-frequency detector over the product of each sample with the
/// conjugate of its predecessor, which sidesteps explicit phase unwrapping.
/// Output is normalised so full deviation maps to ±1.
#[derive(Debug, Clone)]
pub(crate) struct FmDiscriminator {
    prev: Complex<f32>,
    scale: f32,
}

impl FmDiscriminator {
    pub(crate) fn new(max_deviation_hz: f64, sample_rate: f64) -> Self {
        let deviation_norm = max_deviation_hz / sample_rate;
        Self {
            prev: Complex::new(0.0, 0.0),
            scale: (1.0 / (f64::from(TAU) * deviation_norm)) as f32,
        }
    }

    pub(crate) fn process(&mut self, i: &[f32], q: &[f32], out: &mut [f32]) {
        debug_assert_eq!(i.len(), q.len());
        debug_assert_eq!(i.len(), out.len());
        let mut prev = self.prev;
        for n in 0..i.len() {
            let current = Complex::new(i[n], q[n]);
            let product = prev * current.conj();
            out[n] = fast_atan2(product.im, product.re) * self.scale;
            prev = current;
        }
        self.prev = prev;
    }
}
