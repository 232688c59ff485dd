use crate::{Point3, Vec3};

/// A parametric ray `P(t) = origin + t * direction`.
///
/// The direction is not required to be normalized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, -1.0, 2.0));

        assert_eq!(ray.at(0.0), ray.origin);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 7.0));
        assert_eq!(ray.at(-1.0), Vec3::new(0.5, 3.0, 1.0));
    }

    #[test]
    fn test_ray_at_matches_identity() {
        let origin = Vec3::new(-0.25, 4.0, 1.5);
        let direction = Vec3::new(0.3, 0.1, -0.7);
        let ray = Ray::new(origin, direction);

        for &t in &[0.0, 0.125, 1.0, 3.75, 1e3] {
            assert_eq!(ray.at(t), origin + t * direction);
        }
    }

    #[test]
    fn test_ray_is_copy() {
        let a = Ray::new(Vec3::ZERO, Vec3::Y);
        let b = a;
        assert_eq!(a.at(1.0), b.at(1.0));
        assert_eq!(b.origin(), Vec3::ZERO);
        assert_eq!(b.direction(), Vec3::Y);
    }
}
