/// Error filter with per-pixel coefficient noise.
///
/// The wrapped matrix filter is never modified. At init the non-zero
/// coefficients are sorted by magnitude and split into pairs; an odd one out
/// joins the last pair as a triple. Every diffusion step draws one noise value
/// per group, bounded by the group's smallest coefficient, and moves weight
/// between the members so each group's sum stays exactly the same:
/// - pair: `+r`, `-r`
/// - triple: `+r`, `-r/2`, `-r/2`

use rand::rngs::StdRng;
use rand::Rng;

use super::diffuse_weighted;
use super::matrix::MatrixErrorFilter;
use crate::error::Result;
use crate::matrix::{ErrorMatrix, Tap};
use crate::module::{Module, RunInfo};

const RNG_SALT: u64 = 0x7065_7274;

/// Coefficients perturbed together.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientGroup {
    /// Indices into the filter's taps, smallest weight first
    pub members: Vec<usize>,
    /// Maximum absolute noise per step
    pub amplitude: f32,
}

#[derive(Debug, Clone)]
pub struct PerturbedErrorFilter {
    inner: MatrixErrorFilter,
    /// Fraction of the smallest member used as noise amplitude (0-1)
    strength: f32,
    taps: Vec<Tap>,
    groups: Vec<CoefficientGroup>,
    perturbed: Vec<f32>,
    rng: Option<StdRng>,
}

/// Pair up coefficients by ascending weight; a leftover joins the last group.
pub(crate) fn group_coefficients(taps: &[Tap], strength: f32) -> Vec<CoefficientGroup> {
    let mut order: Vec<usize> = (0..taps.len()).collect();
    order.sort_by(|&a, &b| taps[a].weight.abs().total_cmp(&taps[b].weight.abs()));

    let mut groups: Vec<Vec<usize>> = order.chunks(2).map(|c| c.to_vec()).collect();
    if groups.len() > 1 && groups.last().map_or(false, |g| g.len() == 1) {
        if let Some(single) = groups.pop() {
            if let Some(last) = groups.last_mut() {
                last.extend(single);
            }
        }
    }

    groups
        .into_iter()
        .map(|members| {
            let smallest = members
                .iter()
                .map(|&i| taps[i].weight.abs())
                .fold(f32::INFINITY, f32::min);
            // A lone coefficient has no partner to trade weight with
            let amplitude = if members.len() < 2 { 0.0 } else { smallest * strength };
            CoefficientGroup { members, amplitude }
        })
        .collect()
}

impl PerturbedErrorFilter {
    pub fn new(matrix: ErrorMatrix) -> Self {
        Self::with_strength(matrix, 1.0)
    }

    /// Noise strength is clamped to `0..=1`; a non-finite strength disables noise.
    pub fn with_strength(matrix: ErrorMatrix, strength: f32) -> Self {
        let strength = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            inner: MatrixErrorFilter::new(matrix),
            strength,
            taps: Vec::new(),
            groups: Vec::new(),
            perturbed: Vec::new(),
            rng: None,
        }
    }

    pub fn matrix(&self) -> &ErrorMatrix {
        self.inner.matrix()
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Populated taps of the wrapped matrix, in matrix order.
    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    pub fn groups(&self) -> &[CoefficientGroup] {
        &self.groups
    }

    /// Weights used by the most recent diffusion step, parallel to `taps`.
    pub fn perturbed_weights(&self) -> &[f32] {
        &self.perturbed
    }

    /// Draw fresh noise for every group.
    pub fn perturb(&mut self) {
        let Some(rng) = self.rng.as_mut() else {
            return;
        };
        for (slot, tap) in self.perturbed.iter_mut().zip(&self.taps) {
            *slot = tap.weight;
        }
        for group in &self.groups {
            if group.amplitude <= 0.0 {
                continue;
            }
            let r = rng.gen_range(-group.amplitude..=group.amplitude);
            match group.members.as_slice() {
                [a, b] => {
                    self.perturbed[*a] += r;
                    self.perturbed[*b] -= r;
                }
                [a, b, c] => {
                    self.perturbed[*a] += r;
                    self.perturbed[*b] -= r * 0.5;
                    self.perturbed[*c] -= r * 0.5;
                }
                _ => {}
            }
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        self.inner.get_error()
    }

    pub fn set_error(&mut self, error: f32, _source: f32) {
        if !self.inner.is_initialized() {
            return;
        }
        self.perturb();
        if let Some(buffer) = self.inner.buffer.as_mut() {
            diffuse_weighted(buffer, &self.taps, &self.perturbed, error);
        }
    }

    #[inline]
    pub fn move_next(&mut self) {
        self.inner.move_next();
    }
}

impl Module for PerturbedErrorFilter {
    fn name(&self) -> &'static str {
        "Perturbed error filter"
    }

    fn description(&self) -> &'static str {
        "Adds sum-preserving noise to error matrix coefficients every pixel"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        self.inner.init(run)?;
        self.taps = self
            .inner
            .matrix()
            .taps()
            .into_iter()
            .filter(|t| t.weight != 0.0)
            .collect();
        self.groups = group_coefficients(&self.taps, self.strength);
        self.perturbed = self.taps.iter().map(|t| t.weight).collect();
        self.rng = Some(run.rng(RNG_SALT));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanKind;

    fn initialised(matrix: ErrorMatrix) -> PerturbedErrorFilter {
        let mut f = PerturbedErrorFilter::new(matrix);
        f.init(&RunInfo::new(16, 16, ScanKind::Scanline).with_seed(Some(3)))
            .unwrap();
        f
    }

    #[test]
    fn test_groups_pair_and_fold_odd() {
        // Floyd-Steinberg has 4 coefficients: two pairs
        let fs = initialised(ErrorMatrix::floyd_steinberg());
        let sizes: Vec<usize> = fs.groups().iter().map(|g| g.members.len()).collect();
        assert_eq!(sizes, vec![2, 2]);

        // Sierra lite has 3: one triple
        let lite = initialised(ErrorMatrix::sierra_lite());
        let sizes: Vec<usize> = lite.groups().iter().map(|g| g.members.len()).collect();
        assert_eq!(sizes, vec![3]);

        // Sierra has 10: five pairs; Atkinson 6: three pairs; Burkes 7: 2+2+3
        let burkes = initialised(ErrorMatrix::burkes());
        let sizes: Vec<usize> = burkes.groups().iter().map(|g| g.members.len()).collect();
        assert_eq!(sizes, vec![2, 2, 3]);
    }

    #[test]
    fn test_amplitude_is_smallest_member() {
        let fs = initialised(ErrorMatrix::floyd_steinberg());
        // Sorted: 1/16, 3/16 | 5/16, 7/16
        assert!((fs.groups()[0].amplitude - 1.0 / 16.0).abs() < 1e-7);
        assert!((fs.groups()[1].amplitude - 5.0 / 16.0).abs() < 1e-7);
    }

    #[test]
    fn test_group_sums_conserved_every_step() {
        for matrix in [
            ErrorMatrix::floyd_steinberg(),
            ErrorMatrix::sierra_lite(),
            ErrorMatrix::burkes(),
            ErrorMatrix::stevenson_arce(),
        ] {
            let mut f = initialised(matrix);
            for _ in 0..200 {
                f.set_error(10.0, 128.0);
                f.move_next();
                for group in f.groups() {
                    let original: f32 = group.members.iter().map(|&i| f.taps()[i].weight).sum();
                    let perturbed: f32 =
                        group.members.iter().map(|&i| f.perturbed_weights()[i]).sum();
                    assert!((original - perturbed).abs() < 1e-5);
                }
                for &w in f.perturbed_weights() {
                    assert!(w >= -1e-6, "weight went negative: {}", w);
                }
            }
        }
    }

    #[test]
    fn test_noise_actually_changes_weights() {
        let mut f = initialised(ErrorMatrix::jarvis_judice_ninke());
        f.set_error(1.0, 0.0);
        let original: Vec<f32> = f.taps().iter().map(|t| t.weight).collect();
        assert_ne!(f.perturbed_weights(), original.as_slice());
        assert_eq!(f.matrix(), &ErrorMatrix::jarvis_judice_ninke());
    }

    #[test]
    fn test_single_coefficient_is_untouched() {
        let mut f = initialised(ErrorMatrix::vector_forward());
        assert_eq!(f.groups().len(), 1);
        assert_eq!(f.groups()[0].amplitude, 0.0);
        f.perturb();
        assert_eq!(f.perturbed_weights(), &[1.0f32][..]);
    }

    #[test]
    fn test_zero_strength_disables_noise() {
        let mut f = PerturbedErrorFilter::with_strength(ErrorMatrix::floyd_steinberg(), 0.0);
        f.init(&RunInfo::new(4, 4, ScanKind::Scanline)).unwrap();
        f.perturb();
        let original: Vec<f32> = f.taps().iter().map(|t| t.weight).collect();
        assert_eq!(f.perturbed_weights(), original.as_slice());
    }

    #[test]
    fn test_non_finite_strength_disables_noise() {
        for strength in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut f = PerturbedErrorFilter::with_strength(ErrorMatrix::burkes(), strength);
            assert_eq!(f.strength(), 0.0);
            f.init(&RunInfo::new(8, 4, ScanKind::Scanline).with_seed(Some(3))).unwrap();
            assert!(f.groups().iter().all(|g| g.amplitude == 0.0));
            f.set_error(64.0, 100.0);
            f.move_next();
            let original: Vec<f32> = f.taps().iter().map(|t| t.weight).collect();
            assert_eq!(f.perturbed_weights(), original.as_slice());
        }
    }
}
