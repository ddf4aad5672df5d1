/// Periodic halftone screen functions.
///
/// A spot function maps a pixel position to a threshold. The position is
/// rotated by the screen angle, divided by the cell period (`distance`) and
/// folded into a cell-local square `[-1, 1) x [-1, 1)`. The shape function
/// returns a spot value in `[-1, 1]`, mapped onto the 0-255 intensity range.
///
/// Each shape acts as a prototype: `(angle, distance)` produce a sampler
/// closure, which is rebuilt whenever either parameter changes and on clone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HalftoneError, Result};

/// Dot shape of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpotShape {
    /// Round dots joining into a checkerboard at 50%
    Euclidean,
    /// Circular dots (default)
    #[default]
    Round,
    Square,
    Diamond,
    /// Parallel lines
    Line,
    Triangle,
}

impl SpotShape {
    pub const ALL: [SpotShape; 6] = [
        SpotShape::Euclidean,
        SpotShape::Round,
        SpotShape::Square,
        SpotShape::Diamond,
        SpotShape::Line,
        SpotShape::Triangle,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SpotShape::Euclidean => "euclidean",
            SpotShape::Round => "round",
            SpotShape::Square => "square",
            SpotShape::Diamond => "diamond",
            SpotShape::Line => "line",
            SpotShape::Triangle => "triangle",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == name)
    }

    /// Spot value for cell-local coordinates in `[-1, 1]`.
    pub fn spot(self, x: f64, y: f64) -> f64 {
        let (ax, ay) = (x.abs(), y.abs());
        match self {
            SpotShape::Euclidean => {
                if ax + ay > 1.0 {
                    (ax - 1.0).powi(2) + (ay - 1.0).powi(2) - 1.0
                } else {
                    1.0 - (ax * ax + ay * ay)
                }
            }
            SpotShape::Round => 1.0 - (x * x + y * y),
            SpotShape::Square => 1.0 - 2.0 * ax.max(ay),
            SpotShape::Diamond => 1.0 - (ax + ay),
            SpotShape::Line => 1.0 - 2.0 * ay,
            // Level sets are upward-pointing triangles; the level ranges 0..=3
            SpotShape::Triangle => 1.0 - 2.0 * (-y).max(y + 2.0 * ax) / 3.0,
        }
    }
}

type Sampler = Box<dyn Fn(f64, f64) -> f32 + Send + Sync>;

/// Build the sampler for a shape at the given angle (degrees) and period.
fn prototype(shape: SpotShape, angle: f64, distance: f64) -> Sampler {
    let (sin, cos) = angle.to_radians().sin_cos();
    Box::new(move |x, y| {
        let u = fold(x * cos + y * sin, distance);
        let v = fold(y * cos - x * sin, distance);
        let s = shape.spot(u, v).clamp(-1.0, 1.0);
        ((s + 1.0) * 0.5 * 255.0) as f32
    })
}

const FOLD_GRID: f64 = 1e9;

/// Position within the current period, as `[-1, 1]`.
///
/// The period is removed in pixel units, then the result is snapped to a
/// fixed grid so that positions one period apart land on the same value even
/// where a shape is discontinuous.
#[inline]
fn fold(t: f64, distance: f64) -> f64 {
    let local = 2.0 * t.rem_euclid(distance) / distance - 1.0;
    (local * FOLD_GRID).round() / FOLD_GRID
}

fn check_distance(distance: f64) -> Result<()> {
    if distance.is_finite() && distance > 0.0 {
        Ok(())
    } else {
        Err(HalftoneError::InvalidSpotDistance(distance))
    }
}

pub struct SpotFunction {
    shape: SpotShape,
    angle: f64,
    distance: f64,
    sampler: Sampler,
}

impl SpotFunction {
    pub fn new(shape: SpotShape, angle: f64, distance: f64) -> Result<Self> {
        check_distance(distance)?;
        Ok(Self {
            shape,
            angle,
            distance,
            sampler: prototype(shape, angle, distance),
        })
    }

    pub fn shape(&self) -> SpotShape {
        self.shape
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn set_shape(&mut self, shape: SpotShape) {
        self.shape = shape;
        self.rederive();
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
        self.rederive();
    }

    pub fn set_distance(&mut self, distance: f64) -> Result<()> {
        check_distance(distance)?;
        self.distance = distance;
        self.rederive();
        Ok(())
    }

    fn rederive(&mut self) {
        self.sampler = prototype(self.shape, self.angle, self.distance);
    }

    /// Threshold for the pixel at (x, y), sampled at the pixel centre.
    #[inline]
    pub fn threshold(&self, x: usize, y: usize) -> f32 {
        (self.sampler)(x as f64 + 0.5, y as f64 + 0.5)
    }

}

impl Default for SpotFunction {
    fn default() -> Self {
        let (angle, distance) = (45.0, 8.0);
        Self {
            shape: SpotShape::Round,
            angle,
            distance,
            sampler: prototype(SpotShape::Round, angle, distance),
        }
    }
}

impl Clone for SpotFunction {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape,
            angle: self.angle,
            distance: self.distance,
            sampler: prototype(self.shape, self.angle, self.distance),
        }
    }
}

impl fmt::Debug for SpotFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotFunction")
            .field("shape", &self.shape)
            .field("angle", &self.angle)
            .field("distance", &self.distance)
            .finish()
    }
}

impl PartialEq for SpotFunction {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.angle == other.angle && self.distance == other.distance
    }
}
