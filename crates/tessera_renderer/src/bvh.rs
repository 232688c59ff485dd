//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat arena and refer to their children by index, either
//! another node or one of the objects the BVH owns. A range holding a
//! single object produces a node whose two children are the same object.

use crate::{HitRecord, Hittable, HittableList};
use rand::{Rng, RngCore};
use tessera_math::{Aabb, Interval, Ray};
use thiserror::Error;

/// Errors raised while building a BVH. Both indicate a broken scene.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BvhError {
    #[error("BVH construction requires at least one object")]
    EmptyRange,

    #[error("object {index} has no bounding box")]
    MissingBoundingBox { index: usize },
}

/// Reference from a node to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhChild {
    /// Index into the node arena.
    Node(usize),
    /// Index into the object list.
    Object(usize),
}

/// Interior node: two children and the union of their boxes.
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    pub left: BvhChild,
    pub right: BvhChild,
    pub bbox: Aabb,
}

/// Binary BVH over an owned set of objects.
pub struct Bvh {
    objects: Vec<Box<dyn Hittable>>,
    object_boxes: Vec<Aabb>,
    nodes: Vec<BvhNode>,
    root: usize,
}

impl Bvh {
    /// Build a BVH over `objects`.
    ///
    /// Each level splits along an axis chosen uniformly at random, ordering
    /// objects by the minimum corner of their boxes on that axis.
    pub fn new(objects: Vec<Box<dyn Hittable>>, rng: &mut dyn RngCore) -> Result<Self, BvhError> {
        if objects.is_empty() {
            return Err(BvhError::EmptyRange);
        }

        let object_boxes = objects
            .iter()
            .enumerate()
            .map(|(index, object)| {
                object
                    .bounding_box()
                    .ok_or(BvhError::MissingBoundingBox { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut order: Vec<usize> = (0..objects.len()).collect();
        let mut nodes = Vec::with_capacity(objects.len());
        let root = build(&mut order, &object_boxes, &mut nodes, rng)?;

        Ok(Self {
            objects,
            object_boxes,
            nodes,
            root,
        })
    }

    /// Build a BVH from the contents of a list.
    pub fn from_list(list: HittableList, rng: &mut dyn RngCore) -> Result<Self, BvhError> {
        Self::new(list.into_objects(), rng)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> &BvhNode {
        &self.nodes[self.root]
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Number of node levels from the root to the deepest leaf.
    pub fn depth(&self) -> usize {
        self.child_depth(BvhChild::Node(self.root))
    }

    fn child_depth(&self, child: BvhChild) -> usize {
        match child {
            BvhChild::Object(_) => 0,
            BvhChild::Node(index) => {
                let node = &self.nodes[index];
                1 + self.child_depth(node.left).max(self.child_depth(node.right))
            }
        }
    }

    fn hit_child(&self, child: BvhChild, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        match child {
            BvhChild::Object(index) => self.objects[index].hit(ray, ray_t),
            BvhChild::Node(index) => self.hit_node(index, ray, ray_t),
        }
    }

    fn hit_node(&self, index: usize, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        let node = &self.nodes[index];
        if !node.bbox.hit(ray, ray_t) {
            return None;
        }

        let hit_left = self.hit_child(node.left, ray, ray_t);

        // Only check right up to closest hit
        let right_t = hit_left.map_or(ray_t, |rec| ray_t.with_max(rec.t));
        let hit_right = self.hit_child(node.right, ray, right_t);

        hit_right.or(hit_left)
    }
}

/// Recursively build nodes for `order`, returning the index of its root node.
fn build(
    order: &mut [usize],
    object_boxes: &[Aabb],
    nodes: &mut Vec<BvhNode>,
    rng: &mut dyn RngCore,
) -> Result<usize, BvhError> {
    let axis: usize = rng.gen_range(0..3);
    let key = |object: usize| object_boxes[object].min[axis];

    let (left, right) = match order.len() {
        0 => return Err(BvhError::EmptyRange),
        1 => (BvhChild::Object(order[0]), BvhChild::Object(order[0])),
        2 => {
            let (a, b) = (order[0], order[1]);
            if key(a) < key(b) {
                (BvhChild::Object(a), BvhChild::Object(b))
            } else {
                (BvhChild::Object(b), BvhChild::Object(a))
            }
        }
        len => {
            order.sort_by(|&a, &b| key(a).total_cmp(&key(b)));
            let (lower, upper) = order.split_at_mut(len / 2);
            let left = build(lower, object_boxes, nodes, rng)?;
            let right = build(upper, object_boxes, nodes, rng)?;
            (BvhChild::Node(left), BvhChild::Node(right))
        }
    };

    let bbox = Aabb::surrounding(
        &child_box(left, nodes, object_boxes),
        &child_box(right, nodes, object_boxes),
    );

    nodes.push(BvhNode { left, right, bbox });
    Ok(nodes.len() - 1)
}

fn child_box(child: BvhChild, nodes: &[BvhNode], object_boxes: &[Aabb]) -> Aabb {
    match child {
        BvhChild::Node(index) => nodes[index].bbox,
        BvhChild::Object(index) => object_boxes[index],
    }
}

impl Hittable for Bvh {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        self.hit_node(self.root, ray, ray_t)
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(self.nodes[self.root].bbox)
    }
}

impl std::fmt::Debug for Bvh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bvh")
            .field("objects", &self.objects.len())
            .field("nodes", &self.nodes.len())
            .field("bbox", &self.nodes[self.root].bbox)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{random_f64_range, random_vec3_range};
    use crate::{Color, Lambertian, Sphere};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use tessera_math::Vec3;

    fn sphere(center: Vec3, radius: f64) -> Box<dyn Hittable> {
        Box::new(Sphere::new(center, radius, Lambertian::new(Color::splat(0.7))))
    }

    fn three_spheres() -> Vec<Box<dyn Hittable>> {
        vec![
            sphere(Vec3::new(-2.0, 0.0, -1.0), 0.5),
            sphere(Vec3::new(2.0, 1.0, -3.0), 1.0),
            sphere(Vec3::new(0.0, -1.0, -2.0), 0.25),
        ]
    }

    fn random_spheres(rng: &mut dyn RngCore, count: usize) -> Vec<Box<dyn Hittable>> {
        (0..count)
            .map(|_| {
                let center = random_vec3_range(rng, -10.0, 10.0);
                sphere(center, random_f64_range(rng, 0.1, 1.0))
            })
            .collect()
    }

    fn collect_objects(bvh: &Bvh, child: BvhChild, seen: &mut HashSet<usize>) {
        match child {
            BvhChild::Object(index) => {
                seen.insert(index);
            }
            BvhChild::Node(index) => {
                let node = bvh.nodes()[index];
                collect_objects(bvh, node.left, seen);
                collect_objects(bvh, node.right, seen);
            }
        }
    }

    #[test]
    fn test_bvh_empty_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = Bvh::new(Vec::new(), &mut rng);
        assert_eq!(result.err(), Some(BvhError::EmptyRange));
    }

    #[test]
    fn test_bvh_rejects_unbounded_child() {
        struct Unbounded;
        impl Hittable for Unbounded {
            fn hit(&self, _ray: &Ray, _ray_t: Interval) -> Option<HitRecord<'_>> {
                None
            }
            fn bounding_box(&self) -> Option<Aabb> {
                None
            }
        }

        let mut rng = StdRng::seed_from_u64(2);
        let objects: Vec<Box<dyn Hittable>> =
            vec![sphere(Vec3::ZERO, 1.0), Box::new(Unbounded)];
        let result = Bvh::new(objects, &mut rng);
        assert_eq!(result.err(), Some(BvhError::MissingBoundingBox { index: 1 }));
    }

    #[test]
    fn test_bvh_single_object_aliases_both_children() {
        let mut rng = StdRng::seed_from_u64(3);
        let bvh = Bvh::new(vec![sphere(Vec3::new(0.0, 0.0, -1.0), 0.5)], &mut rng)
            .expect("one object is enough");

        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.root().left, BvhChild::Object(0));
        assert_eq!(bvh.root().right, BvhChild::Object(0));

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let rec = bvh
            .hit(&ray, Interval::new(0.001, f64::INFINITY))
            .expect("ray aims at the sphere");
        assert!((rec.t - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bvh_bounding_box_contains_all_children() {
        let mut rng = StdRng::seed_from_u64(4);
        let bvh = Bvh::new(three_spheres(), &mut rng).expect("valid scene");

        let bbox = bvh.bounding_box().expect("BVHs are bounded");
        assert_eq!(bbox.min, Vec3::new(-2.5, -1.25, -4.0));
        assert_eq!(bbox.max, Vec3::new(3.0, 2.0, -0.5));
    }

    #[test]
    fn test_bvh_box_is_independent_of_random_axes() {
        let mut scene_rng = StdRng::seed_from_u64(5);
        let scene_seed = scene_rng.gen::<u64>();

        let expected = {
            let mut rng = StdRng::seed_from_u64(scene_seed);
            HittableList::from(random_spheres(&mut rng, 40))
                .bounding_box()
                .expect("spheres are bounded")
        };

        let mut depths = HashSet::new();
        for build_seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(scene_seed);
            let objects = random_spheres(&mut rng, 40);
            let mut build_rng = StdRng::seed_from_u64(build_seed);
            let bvh = Bvh::new(objects, &mut build_rng).expect("valid scene");

            assert_eq!(bvh.bounding_box(), Some(expected));
            depths.insert(bvh.depth());
        }
        // Balanced median splits keep the tree shallow whatever the axes
        assert!(depths.iter().all(|&d| d <= 7));
    }

    #[test]
    fn test_bvh_nodes_cover_children() {
        let mut rng = StdRng::seed_from_u64(6);
        let objects = random_spheres(&mut rng, 25);
        let bvh = Bvh::new(objects, &mut rng).expect("valid scene");

        for node in bvh.nodes() {
            let left = child_box(node.left, bvh.nodes(), &bvh.object_boxes);
            let right = child_box(node.right, bvh.nodes(), &bvh.object_boxes);
            // Tight union, not merely a cover
            assert_eq!(Aabb::surrounding(&left, &right), node.bbox);
        }

        let mut seen = HashSet::new();
        collect_objects(&bvh, BvhChild::Node(bvh.root), &mut seen);
        assert_eq!(seen.len(), bvh.object_count());
    }

    #[test]
    fn test_bvh_hit_finds_nearest_object() {
        let mut rng = StdRng::seed_from_u64(7);
        let objects = vec![
            sphere(Vec3::new(0.0, 0.0, -1.0), 0.5),
            sphere(Vec3::new(0.0, 0.0, -3.0), 0.5),
        ];
        let bvh = Bvh::new(objects, &mut rng).expect("valid scene");

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let rec = bvh
            .hit(&ray, Interval::new(0.001, f64::INFINITY))
            .expect("ray aims at both spheres");
        assert!((rec.t - 0.5).abs() < 1e-12);

        let miss = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(bvh.hit(&miss, Interval::new(0.001, f64::INFINITY)).is_none());
    }

    #[test]
    fn test_bvh_agrees_with_list() {
        let mut rng = StdRng::seed_from_u64(8);
        let list = HittableList::from(random_spheres(&mut rng, 60));
        let mut rng = StdRng::seed_from_u64(8);
        let bvh = Bvh::new(random_spheres(&mut rng, 60), &mut rng).expect("valid scene");

        let window = Interval::new(0.001, f64::INFINITY);
        let mut hits = 0;
        for _ in 0..500 {
            let origin = random_vec3_range(&mut rng, -15.0, 15.0);
            let target = random_vec3_range(&mut rng, -5.0, 5.0);
            let ray = Ray::new(origin, target - origin);

            let expected = list.hit(&ray, window).map(|rec| rec.t);
            let actual = bvh.hit(&ray, window).map(|rec| rec.t);
            match (expected, actual) {
                (Some(e), Some(a)) => {
                    hits += 1;
                    assert!((e - a).abs() < 1e-9, "list t={e} bvh t={a}");
                }
                (None, None) => {}
                other => panic!("list and BVH disagree: {other:?}"),
            }
        }
        assert!(hits > 0);
    }
}
