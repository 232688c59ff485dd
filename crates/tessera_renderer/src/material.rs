//! Material trait for surface scattering.

use crate::hittable::HitRecord;
use crate::random::{random_f64, random_in_unit_sphere, random_unit_vector};
use rand::RngCore;
use tessera_math::{reflect, refract, Ray, Vec3};

/// Color type alias (linear RGB, unbounded before tone mapping)
pub type Color = Vec3;

/// Outcome of a successful scatter.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    /// Per-channel throughput multiplier
    pub attenuation: Color,
    /// Continuation ray leaving the surface
    pub scattered: Ray,
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Scatter an incoming ray, or return `None` if it is absorbed.
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore)
        -> Option<ScatterResult>;
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    /// Create a new Lambertian material with the given albedo color.
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }

    pub fn albedo(&self) -> Color {
        self.albedo
    }
}

impl Material for Lambertian {
    fn scatter(
        &self,
        _ray_in: &Ray,
        rec: &HitRecord,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let mut scatter_direction = rec.normal + random_unit_vector(rng);

        // Catch degenerate scatter direction
        if scatter_direction.length_squared() < 1e-8 {
            scatter_direction = rec.normal;
        }

        Some(ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, scatter_direction),
        })
    }
}

/// Metal (specular) material.
#[derive(Debug, Clone)]
pub struct Metal {
    albedo: Color,
    fuzz: f64,
}

impl Metal {
    /// Create a new Metal material.
    ///
    /// - `albedo`: The color of the metal
    /// - `fuzz`: Roughness, clamped to [0, 1]; 0.0 is a perfect mirror
    pub fn new(albedo: Color, fuzz: f64) -> Self {
        Self {
            albedo,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }

    pub fn fuzz(&self) -> f64 {
        self.fuzz
    }
}

impl Material for Metal {
    fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let reflected = reflect(ray_in.direction.normalize(), rec.normal);
        let scattered_dir = if self.fuzz > 0.0 {
            reflected + self.fuzz * random_in_unit_sphere(rng)
        } else {
            reflected
        };

        // Perturbation may push the ray below the surface; absorb it then
        if scattered_dir.dot(rec.normal) > 0.0 {
            Some(ScatterResult {
                attenuation: self.albedo,
                scattered: Ray::new(rec.p, scattered_dir),
            })
        } else {
            None
        }
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone)]
pub struct Dielectric {
    /// Index of refraction
    ior: f64,
}

impl Dielectric {
    /// Create a new Dielectric material.
    ///
    /// - `ior`: Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub fn new(ior: f64) -> Self {
        Self { ior }
    }

    pub fn ior(&self) -> f64 {
        self.ior
    }

    /// Schlick's approximation for reflectance.
    pub fn reflectance(cosine: f64, ior: f64) -> f64 {
        let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
        r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
    }
}

impl Material for Dielectric {
    fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let refraction_ratio = if rec.front_face {
            1.0 / self.ior
        } else {
            self.ior
        };

        let unit_direction = ray_in.direction.normalize();
        let cos_theta = (-unit_direction).dot(rec.normal).min(1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

        let cannot_refract = refraction_ratio * sin_theta > 1.0;
        let direction = if cannot_refract
            || Self::reflectance(cos_theta, refraction_ratio) > random_f64(rng)
        {
            reflect(unit_direction, rec.normal)
        } else {
            refract(unit_direction, rec.normal, refraction_ratio)
        };

        Some(ScatterResult {
            attenuation: Color::ONE,
            scattered: Ray::new(rec.p, direction),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record<'a>(material: &'a dyn Material, p: Vec3, normal: Vec3, front_face: bool) -> HitRecord<'a> {
        HitRecord {
            p,
            normal,
            material,
            t: 1.0,
            front_face,
        }
    }

    /// Replays fixed 64-bit words, cycling forever.
    struct ScriptedRng {
        words: Vec<u64>,
        next: usize,
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            let word = self.words[self.next % self.words.len()];
            self.next += 1;
            word
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn test_lambertian_degenerate_direction_falls_back_to_normal() {
        let material = Lambertian::new(Color::splat(0.5));
        let rec = record(&material, Vec3::new(0.0, 1.0, 0.0), Vec3::Y, true);
        let incoming = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y);

        // f64 draws of 0.5, 0.25, 0.5 give the sphere sample (0, -0.5, 0),
        // whose unit vector cancels the normal exactly
        let mut rng = ScriptedRng {
            words: vec![1 << 63, 1 << 62, 1 << 63],
            next: 0,
        };
        assert_eq!(random_unit_vector(&mut rng), Vec3::NEG_Y);

        let result = material
            .scatter(&incoming, &rec, &mut rng)
            .expect("diffuse surfaces always scatter");
        assert_eq!(result.scattered.direction, rec.normal);
        assert_eq!(result.scattered.origin, rec.p);
    }

    #[test]
    fn test_lambertian_keeps_albedo_and_origin() {
        let material = Lambertian::new(Color::new(0.2, 0.4, 0.6));
        let rec = record(&material, Vec3::new(1.0, 2.0, 3.0), Vec3::Y, true);
        let incoming = Ray::new(Vec3::new(1.0, 3.0, 3.0), Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..64 {
            let result = material
                .scatter(&incoming, &rec, &mut rng)
                .expect("diffuse surfaces always scatter");
            assert_eq!(result.attenuation, Color::new(0.2, 0.4, 0.6));
            assert_eq!(result.scattered.origin, rec.p);
            assert!(result.scattered.direction.length_squared() > 0.0);
            // Never below the tangent plane
            assert!(result.scattered.direction.dot(rec.normal) >= 0.0);
        }
    }

    #[test]
    fn test_metal_zero_fuzz_is_exact_mirror() {
        let material = Metal::new(Color::splat(0.9), 0.0);
        let normal = Vec3::Y;
        let rec = record(&material, Vec3::ZERO, normal, true);
        let mut rng = StdRng::seed_from_u64(2);

        let v = Vec3::new(1.0, -1.0, 0.5);
        let incoming = Ray::new(Vec3::new(-1.0, 1.0, -0.5), v);
        let result = material
            .scatter(&incoming, &rec, &mut rng)
            .expect("mirror reflection leaves the surface");

        let unit = v.normalize();
        assert_eq!(result.scattered.direction, unit - 2.0 * unit.dot(normal) * normal);
        assert_eq!(result.attenuation, Color::splat(0.9));
    }

    #[test]
    fn test_metal_straight_down_reflects_straight_up() {
        let material = Metal::new(Color::splat(0.9), 0.0);
        let rec = record(&material, Vec3::ZERO, Vec3::Y, true);
        let incoming = Ray::new(Vec3::Y, Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(3);

        let result = material.scatter(&incoming, &rec, &mut rng).expect("reflects");
        assert!((result.scattered.direction - Vec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_metal_fuzz_is_clamped() {
        assert_eq!(Metal::new(Color::ONE, 3.0).fuzz(), 1.0);
        assert_eq!(Metal::new(Color::ONE, -0.5).fuzz(), 0.0);
    }

    #[test]
    fn test_metal_grazing_fuzzy_ray_can_be_absorbed() {
        let material = Metal::new(Color::ONE, 1.0);
        let rec = record(&material, Vec3::ZERO, Vec3::Y, true);
        // Nearly tangent incoming ray: heavy fuzz sends many samples below the surface
        let incoming = Ray::new(Vec3::new(-1.0, 0.001, 0.0), Vec3::new(1.0, -0.001, 0.0));
        let mut rng = StdRng::seed_from_u64(4);

        let absorbed = (0..256)
            .filter(|_| material.scatter(&incoming, &rec, &mut rng).is_none())
            .count();
        assert!(absorbed > 0);
    }

    #[test]
    fn test_dielectric_white_attenuation() {
        let material = Dielectric::new(1.5);
        let incoming = Ray::new(Vec3::Y, Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(5);

        for front_face in [true, false] {
            let rec = record(&material, Vec3::ZERO, Vec3::Y, front_face);
            for _ in 0..64 {
                let result = material
                    .scatter(&incoming, &rec, &mut rng)
                    .expect("glass never absorbs");
                assert_eq!(result.attenuation, Color::ONE);
                assert!(result.scattered.direction.length_squared() > 0.0);
            }
        }
    }

    #[test]
    fn test_dielectric_total_internal_reflection() {
        let material = Dielectric::new(1.5);
        // Leaving glass at a grazing angle: ratio 1.5 * sin(theta) > 1
        let rec = record(&material, Vec3::ZERO, Vec3::Y, false);
        let incoming = Ray::new(Vec3::new(-1.0, 0.1, 0.0), Vec3::new(1.0, -0.1, 0.0));
        let mut rng = StdRng::seed_from_u64(6);

        let unit = incoming.direction.normalize();
        let mirrored = reflect(unit, Vec3::Y);
        for _ in 0..32 {
            let result = material.scatter(&incoming, &rec, &mut rng).expect("reflects");
            assert!((result.scattered.direction - mirrored).length() < 1e-12);
        }
    }

    #[test]
    fn test_schlick_reflectance() {
        // Head-on reflectance of glass is r0 = 0.04
        assert!((Dielectric::reflectance(1.0, 1.5) - 0.04).abs() < 1e-12);
        // Grazing incidence reflects everything
        assert!((Dielectric::reflectance(0.0, 1.5) - 1.0).abs() < 1e-12);
    }
}
