//! Reference scene: a ground plane, a jittered field of small spheres, and
//! three large feature spheres.

use crate::random::{random_f64, random_f64_range, random_vec3, random_vec3_range};
use crate::{Color, Dielectric, HittableList, Lambertian, Metal, Sphere};
use rand::RngCore;
use tessera_math::Point3;

/// Half-width of the small-sphere grid; cells run over `-GRID_HALF..GRID_HALF`.
pub const GRID_HALF: i32 = 11;

const SMALL_RADIUS: f64 = 0.2;

/// Small spheres are skipped when they land this close to the metal feature sphere.
const KEEP_OUT_RADIUS: f64 = 0.9;

/// Build the reference scene as an unordered list.
///
/// Structure is fixed; positions of the small spheres and their materials
/// are drawn from `rng`. Wrap the result in a [`crate::Bvh`] before rendering.
pub fn random_scene(rng: &mut dyn RngCore) -> HittableList {
    let mut world = HittableList::new();

    world.add(Box::new(Sphere::new(
        Point3::new(0.0, -1000.0, 0.0),
        1000.0,
        Lambertian::new(Color::new(0.5, 0.5, 0.5)),
    )));

    let keep_out_center = Point3::new(4.0, SMALL_RADIUS, 0.0);
    for a in -GRID_HALF..GRID_HALF {
        for b in -GRID_HALF..GRID_HALF {
            let choose_mat = random_f64(rng);
            let center = Point3::new(
                a as f64 + 0.9 * random_f64(rng),
                SMALL_RADIUS,
                b as f64 + 0.9 * random_f64(rng),
            );

            if (center - keep_out_center).length() <= KEEP_OUT_RADIUS {
                continue;
            }

            if choose_mat < 0.8 {
                // Diffuse
                let albedo = random_vec3(rng) * random_vec3(rng);
                world.add(Box::new(Sphere::new(center, SMALL_RADIUS, Lambertian::new(albedo))));
            } else if choose_mat < 0.95 {
                // Metal
                let albedo = random_vec3_range(rng, 0.5, 1.0);
                let fuzz = random_f64_range(rng, 0.0, 0.5);
                world.add(Box::new(Sphere::new(center, SMALL_RADIUS, Metal::new(albedo, fuzz))));
            } else {
                // Glass
                world.add(Box::new(Sphere::new(center, SMALL_RADIUS, Dielectric::new(1.5))));
            }
        }
    }

    world.add(Box::new(Sphere::new(
        Point3::new(0.0, 1.0, 0.0),
        1.0,
        Dielectric::new(1.5),
    )));
    world.add(Box::new(Sphere::new(
        Point3::new(-4.0, 1.0, 0.0),
        1.0,
        Lambertian::new(Color::new(0.4, 0.2, 0.1)),
    )));
    world.add(Box::new(Sphere::new(
        Point3::new(4.0, 1.0, 0.0),
        1.0,
        Metal::new(Color::new(0.7, 0.6, 0.5), 0.0),
    )));

    world
}
