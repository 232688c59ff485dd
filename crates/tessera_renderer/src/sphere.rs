//! Sphere primitive for ray tracing.

use crate::{
    hittable::{HitRecord, Hittable},
    Material,
};
use tessera_math::{Aabb, Interval, Point3, Ray, Vec3};

/// A sphere primitive owning its material.
pub struct Sphere<M: Material> {
    center: Point3,
    radius: f64,
    material: M,
    bbox: Aabb,
}

impl<M: Material> Sphere<M> {
    /// Create a new sphere. Callers must pass a positive radius.
    pub fn new(center: Point3, radius: f64, material: M) -> Self {
        debug_assert!(radius > 0.0, "sphere radius must be positive, got {radius}");
        let rvec = Vec3::splat(radius);

        Self {
            center,
            radius,
            material,
            bbox: Aabb::new(center - rvec, center + rvec),
        }
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl<M: Material + 'static> Hittable for Sphere<M> {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Prefer the near root, fall back to the far one
        let mut root = (h - sqrtd) / a;
        if !ray_t.contains(root) {
            root = (h + sqrtd) / a;
            if !ray_t.contains(root) {
                return None;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        Some(HitRecord::new(ray, root, outward_normal, &self.material))
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(self.bbox)
    }
}
