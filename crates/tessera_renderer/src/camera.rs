//! Thin-lens camera for ray generation.

use crate::random::random_in_unit_disk;
use rand::RngCore;
use tessera_math::{degrees_to_radians, Point3, Ray, Vec3};

/// Immutable thin-lens camera.
///
/// Maps normalized image coordinates `(s, t)` in [0, 1]^2 (origin at the
/// lower-left corner) to rays through the focus plane. A non-zero aperture
/// jitters the ray origin across the lens disk, blurring everything off
/// the focus plane.
#[derive(Debug, Clone)]
pub struct Camera {
    origin: Point3,
    lower_left_corner: Point3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f64,
}

impl Camera {
    /// Start configuring a camera.
    pub fn builder() -> CameraBuilder {
        CameraBuilder::default()
    }

    /// Camera used for the reference scene.
    pub fn reference(aspect_ratio: f64) -> Self {
        Self::builder()
            .with_position(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)
            .with_lens(20.0, 0.1, 10.0)
            .with_aspect_ratio(aspect_ratio)
            .build()
    }

    /// Generate a ray through normalized image coordinates `(s, t)`.
    pub fn get_ray(&self, s: f64, t: f64, rng: &mut dyn RngCore) -> Ray {
        let offset = if self.lens_radius > 0.0 {
            let rd = self.lens_radius * random_in_unit_disk(rng);
            self.u * rd.x + self.v * rd.y
        } else {
            Vec3::ZERO
        };

        let focus_point = self.lower_left_corner + s * self.horizontal + t * self.vertical;
        Ray::new(self.origin + offset, focus_point - self.origin - offset)
    }

    /// Orthonormal basis `(u, v, w)`: right, up, and backwards.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }
}

/// Camera settings, turned into a [`Camera`] by [`CameraBuilder::build`].
#[derive(Debug, Clone)]
pub struct CameraBuilder {
    look_from: Point3,
    look_at: Point3,
    vup: Vec3,
    vfov: f64,         // Vertical field of view in degrees
    aspect_ratio: f64, // Width over height
    aperture: f64,     // Lens diameter
    focus_dist: f64,   // Distance from camera to plane of perfect focus
}

impl Default for CameraBuilder {
    fn default() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            aspect_ratio: 16.0 / 9.0,
            aperture: 0.0,
            focus_dist: 1.0,
        }
    }
}

impl CameraBuilder {
    /// Set camera position.
    pub fn with_position(mut self, look_from: Point3, look_at: Point3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f64, aperture: f64, focus_dist: f64) -> Self {
        self.vfov = vfov;
        self.aperture = aperture;
        self.focus_dist = focus_dist;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Derive the basis and focus-plane viewport.
    pub fn build(self) -> Camera {
        let h = (degrees_to_radians(self.vfov) / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = self.aspect_ratio * viewport_height;

        let w = (self.look_from - self.look_at).normalize();
        let u = self.vup.cross(w).normalize();
        let v = w.cross(u);

        let origin = self.look_from;
        let horizontal = self.focus_dist * viewport_width * u;
        let vertical = self.focus_dist * viewport_height * v;
        let lower_left_corner = origin - horizontal / 2.0 - vertical / 2.0 - self.focus_dist * w;

        Camera {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            w,
            lens_radius: self.aperture / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPSILON: f64 = 1e-9;

    fn pinhole(aperture: f64) -> Camera {
        Camera::builder()
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0, aperture, 1.0)
            .with_aspect_ratio(2.0)
            .build()
    }

    #[test]
    fn test_center_ray_points_at_look_at() {
        let camera = pinhole(0.0);
        let mut rng = StdRng::seed_from_u64(42);

        let ray = camera.get_ray(0.5, 0.5, &mut rng);
        assert!(ray.origin.length() < EPSILON);
        assert!((ray.direction - Vec3::new(0.0, 0.0, -1.0)).length() < EPSILON);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let camera = Camera::reference(16.0 / 9.0);
        let (u, v, w) = camera.basis();

        assert!((u.length() - 1.0).abs() < EPSILON);
        assert!((v.length() - 1.0).abs() < EPSILON);
        assert!((w.length() - 1.0).abs() < EPSILON);
        assert!(u.dot(v).abs() < EPSILON);
        assert!(u.dot(w).abs() < EPSILON);
        assert!(v.dot(w).abs() < EPSILON);
        // w points from look-at back to look-from
        assert!(w.dot(Vec3::new(13.0, 2.0, 3.0)) > 0.0);
    }

    #[test]
    fn test_corners_span_field_of_view() {
        let camera = pinhole(0.0);
        let mut rng = StdRng::seed_from_u64(1);

        // vfov 90 at focus 1: viewport is 2 tall, 4 wide
        let lower_left = camera.get_ray(0.0, 0.0, &mut rng);
        assert!((lower_left.direction - Vec3::new(-2.0, -1.0, -1.0)).length() < EPSILON);

        let upper_right = camera.get_ray(1.0, 1.0, &mut rng);
        assert!((upper_right.direction - Vec3::new(2.0, 1.0, -1.0)).length() < EPSILON);
    }

    #[test]
    fn test_lens_offset_stays_within_aperture() {
        let aperture = 2.0;
        let camera = pinhole(aperture);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..128 {
            let ray = camera.get_ray(0.5, 0.5, &mut rng);
            let offset = ray.origin - Vec3::ZERO;
            assert!(offset.length() <= aperture * 0.5 + EPSILON);
            assert!(offset.z.abs() < EPSILON);

            // Every lens sample still converges on the focus plane point
            let focus = ray.origin + ray.direction;
            assert!((focus - Vec3::new(0.0, 0.0, -1.0)).length() < EPSILON);
        }
    }
}
