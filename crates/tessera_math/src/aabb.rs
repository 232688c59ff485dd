use crate::{Interval, Point3, Ray};

/// Axis-Aligned Bounding Box used by the BVH.
///
/// Stored as two corners with `min <= max` on every axis. Boxes are kept
/// tight: a box built from geometry or from child boxes is never padded.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    /// Create an AABB from its two corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from any two opposite corner points.
    pub fn from_points(a: Point3, b: Point3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    ///
    /// `min` is the component-wise minimum of both mins, `max` the
    /// component-wise maximum of both maxes.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Slab test: does the ray enter the box anywhere inside `ray_t`?
    ///
    /// A zero direction component turns the inverse into a signed infinity.
    /// The resulting slab bounds are then +/-inf (or NaN exactly on a slab
    /// plane, which `f64::max`/`f64::min` discard), so no branch is needed.
    pub fn hit(&self, r: &Ray, mut ray_t: Interval) -> bool {
        for axis in 0..3 {
            let inv_d = 1.0 / r.direction[axis];
            let mut t0 = (self.min[axis] - r.origin[axis]) * inv_d;
            let mut t1 = (self.max[axis] - r.origin[axis]) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max <= ray_t.min {
                return false;
            }
        }
        true
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Point3 {
        (self.min + self.max) * 0.5
    }
}
