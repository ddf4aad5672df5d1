/// Post-processing filters for generated threshold maps.
///
/// Filters run in order over a full-size single-channel map of 0-255 values.
/// Results are always clamped back into range.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One step of a threshold map filter chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImageFilter {
    /// 255 - v
    Invert,
    /// Stretch the map's min..max onto 0..255
    Normalize,
    /// Separable box blur, `radius` pixels each side, edges clamped
    BoxBlur { radius: usize },
    /// 255 * (v / 255)^gamma
    Gamma { gamma: f32 },
    /// Uniform noise in `±amount * 127.5`
    Noise { amount: f32 },
}

impl ImageFilter {
    pub fn name(&self) -> &'static str {
        match self {
            ImageFilter::Invert => "invert",
            ImageFilter::Normalize => "normalize",
            ImageFilter::BoxBlur { .. } => "box-blur",
            ImageFilter::Gamma { .. } => "gamma",
            ImageFilter::Noise { .. } => "noise",
        }
    }

    /// Apply in place to a `width x height` map.
    pub fn apply(&self, map: &mut [f32], width: usize, height: usize, rng: &mut StdRng) {
        match *self {
            ImageFilter::Invert => map.iter_mut().for_each(|v| *v = 255.0 - *v),
            ImageFilter::Normalize => normalize(map),
            ImageFilter::BoxBlur { radius } => box_blur(map, width, height, radius),
            ImageFilter::Gamma { gamma } => {
                if gamma > 0.0 {
                    for v in map.iter_mut() {
                        *v = 255.0 * (*v / 255.0).clamp(0.0, 1.0).powf(gamma);
                    }
                }
            }
            ImageFilter::Noise { amount } => {
                let half = amount.clamp(0.0, 1.0) * 127.5;
                if half > 0.0 {
                    for v in map.iter_mut() {
                        *v += rng.gen_range(-half..=half);
                    }
                }
            }
        }
        map.iter_mut().for_each(|v| *v = v.clamp(0.0, 255.0));
    }
}

/// Run a filter chain in order.
pub fn apply_chain(
    filters: &[ImageFilter],
    map: &mut [f32],
    width: usize,
    height: usize,
    rng: &mut StdRng,
) {
    for filter in filters {
        log::trace!("threshold map filter: {}", filter.name());
        filter.apply(map, width, height, rng);
    }
}

fn normalize(map: &mut [f32]) {
    let (min, max) = map
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if !(range > 0.0) {
        return;
    }
    let scale = 255.0 / range;
    map.iter_mut().for_each(|v| *v = (*v - min) * scale);
}

fn box_blur(map: &mut [f32], width: usize, height: usize, radius: usize) {
    if radius == 0 || width == 0 || height == 0 {
        return;
    }
    let mut temp = vec![0.0f32; map.len()];
    let r = radius as isize;
    let window = (2 * radius + 1) as f32;

    // Horizontal pass into temp
    for y in 0..height {
        let row = &map[y * width..(y + 1) * width];
        for x in 0..width {
            let mut sum = 0.0;
            for k in -r..=r {
                let sx = (x as isize + k).clamp(0, width as isize - 1) as usize;
                sum += row[sx];
            }
            temp[y * width + x] = sum / window;
        }
    }

    // Vertical pass back into map
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for k in -r..=r {
                let sy = (y as isize + k).clamp(0, height as isize - 1) as usize;
                sum += temp[sy * width + x];
            }
            map[y * width + x] = sum / window;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn test_invert() {
        let mut map = vec![0.0, 55.0, 255.0];
        ImageFilter::Invert.apply(&mut map, 3, 1, &mut rng());
        assert_eq!(map, vec![255.0, 200.0, 0.0]);
    }

    #[test]
    fn test_normalize_stretches_range() {
        let mut map = vec![100.0, 150.0, 200.0];
        ImageFilter::Normalize.apply(&mut map, 3, 1, &mut rng());
        assert_eq!(map, vec![0.0, 127.5, 255.0]);

        let mut flat = vec![42.0; 4];
        ImageFilter::Normalize.apply(&mut flat, 2, 2, &mut rng());
        assert_eq!(flat, vec![42.0; 4]);
    }

    #[test]
    fn test_box_blur_preserves_constant_and_smooths_spike() {
        let mut flat = vec![80.0; 16];
        ImageFilter::BoxBlur { radius: 1 }.apply(&mut flat, 4, 4, &mut rng());
        assert!(flat.iter().all(|&v| (v - 80.0).abs() < 1e-4));

        let mut spike = vec![0.0; 25];
        spike[12] = 225.0;
        ImageFilter::BoxBlur { radius: 1 }.apply(&mut spike, 5, 5, &mut rng());
        assert!((spike[12] - 25.0).abs() < 1e-4);
        assert!((spike[6] - 25.0).abs() < 1e-4);
        assert_eq!(spike[0], 0.0);
    }

    #[test]
    fn test_gamma_keeps_endpoints() {
        let mut map = vec![0.0, 63.75, 255.0];
        ImageFilter::Gamma { gamma: 2.0 }.apply(&mut map, 3, 1, &mut rng());
        assert_eq!(map[0], 0.0);
        assert!((map[1] - 255.0 / 16.0).abs() < 1e-3);
        assert!((map[2] - 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_noise_stays_in_range() {
        let mut map = vec![128.0; 256];
        ImageFilter::Noise { amount: 1.0 }.apply(&mut map, 16, 16, &mut rng());
        assert!(map.iter().all(|&v| (0.0..=255.0).contains(&v)));
        assert!(map.iter().any(|&v| v != 128.0));
    }

    #[test]
    fn test_chain_order_matters() {
        let chain = [ImageFilter::Gamma { gamma: 2.0 }, ImageFilter::Invert];
        let mut a = vec![127.5];
        apply_chain(&chain, &mut a, 1, 1, &mut rng());
        assert!((a[0] - (255.0 - 63.75)).abs() < 1e-3);
    }

    #[test]
    fn test_serde_tagged() {
        let f: ImageFilter = serde_json::from_str(r#"{"type":"box-blur","radius":2}"#).unwrap();
        assert_eq!(f, ImageFilter::BoxBlur { radius: 2 });
    }
}
