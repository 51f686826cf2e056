//! Frame geometry transforms.
//!
//! Computes the output frame size produced by scaling and rotating an input
//! frame, using the axis-aligned bounding box of the transformed rectangle.
//! Rotations that land exactly on multiples of 90 degrees are resolved
//! without going through the floating-point path, so passthrough-size
//! decisions never drift by a pixel.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Swap width and height.
    pub fn transposed(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

/// A scale-then-rotate geometric transform.
///
/// Scaling is applied first, then a counter-clockwise rotation about the
/// frame center. Scale factors must be finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryTransform {
    /// Horizontal scale factor.
    pub scale_x: f32,
    /// Vertical scale factor.
    pub scale_y: f32,
    /// Counter-clockwise rotation in degrees.
    pub rotation_degrees: f32,
}

impl GeometryTransform {
    /// Create a new transform.
    ///
    /// Fails with a configuration error when a scale factor is negative or
    /// not finite, or the rotation is not finite.
    pub fn new(scale_x: f32, scale_y: f32, rotation_degrees: f32) -> Result<Self> {
        if !scale_x.is_finite() || !scale_y.is_finite() || scale_x < 0.0 || scale_y < 0.0 {
            return Err(Error::config(format!(
                "scale factors must be finite and non-negative, got ({}, {})",
                scale_x, scale_y
            )));
        }
        if !rotation_degrees.is_finite() {
            return Err(Error::config("rotation must be finite"));
        }
        Ok(Self {
            scale_x,
            scale_y,
            rotation_degrees,
        })
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            rotation_degrees: 0.0,
        }
    }

    /// A pure rotation.
    pub fn rotation(degrees: f32) -> Result<Self> {
        Self::new(1.0, 1.0, degrees)
    }

    /// A pure scale.
    pub fn scale(scale_x: f32, scale_y: f32) -> Result<Self> {
        Self::new(scale_x, scale_y, 0.0)
    }

    /// Rotation normalized to `[0, 360)`.
    fn normalized_rotation(&self) -> f32 {
        self.rotation_degrees.rem_euclid(360.0)
    }

    /// Check whether this transform leaves frame dimensions unchanged.
    pub fn is_identity(&self) -> bool {
        self.scale_x == 1.0 && self.scale_y == 1.0 && self.normalized_rotation() == 0.0
    }

    /// Compute the output frame size for the given input size.
    ///
    /// The input rectangle is scaled, rotated about its center, and the
    /// axis-aligned bounding box of the result is rounded half-up per
    /// dimension. Exact multiples of 90 degrees swap or preserve the scaled
    /// dimensions without floating-point rounding error.
    pub fn output_size(&self, width: u32, height: u32) -> Size {
        if self.is_identity() {
            return Size::new(width, height);
        }

        let scaled_w = round_half_up(width as f64 * self.scale_x as f64);
        let scaled_h = round_half_up(height as f64 * self.scale_y as f64);
        let scaled = Size::new(scaled_w, scaled_h);

        match self.normalized_rotation() {
            r if r == 0.0 || r == 180.0 => scaled,
            r if r == 90.0 || r == 270.0 => scaled.transposed(),
            r => {
                let theta = (r as f64).to_radians();
                let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
                let w = width as f64 * self.scale_x as f64;
                let h = height as f64 * self.scale_y as f64;
                Size::new(
                    round_half_up(w * cos + h * sin),
                    round_half_up(w * sin + h * cos),
                )
            }
        }
    }

    /// Check whether a chain of transforms provably composes to the identity.
    ///
    /// Uniform scales commute with rotations, so a chain of uniform-scale
    /// transforms is the identity exactly when the scale product is one and
    /// the rotation sum is a multiple of 360 degrees. A chain containing a
    /// non-uniform scale is only known to be the identity when every link is
    /// individually the identity; anything else is reported as non-identity.
    pub fn chain_is_identity<'a, I>(transforms: I) -> bool
    where
        I: IntoIterator<Item = &'a GeometryTransform>,
    {
        let mut net_scale_x = 1.0f64;
        let mut net_scale_y = 1.0f64;
        let mut net_rotation = 0.0f64;
        let mut all_uniform = true;
        let mut all_identity = true;

        for t in transforms {
            all_identity &= t.is_identity();
            all_uniform &= t.scale_x == t.scale_y;
            net_scale_x *= t.scale_x as f64;
            net_scale_y *= t.scale_y as f64;
            net_rotation += t.rotation_degrees as f64;
        }

        if all_identity {
            return true;
        }
        if !all_uniform {
            return false;
        }
        net_scale_x == 1.0 && net_scale_y == 1.0 && net_rotation.rem_euclid(360.0) == 0.0
    }
}

impl Default for GeometryTransform {
    fn default() -> Self {
        Self::identity()
    }
}

fn round_half_up(value: f64) -> u32 {
    (value + 0.5).floor() as u32
}
