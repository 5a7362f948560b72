//! Collision queries against rendered terrain triangles.
//!
//! Queries run against the triangles of each patch's current LOD, so
//! fidelity drops as patches coarsen. Three query shapes are supported:
//!
//! - [`Ray`]: Möller-Trumbore, two-sided, optional length limit.
//! - [`Aabb`]: separating-axis box/triangle overlap.
//! - [`SweptSphere`]: first time of contact of a moving sphere
//!   (plane, then vertices, then edges).

use glam::Vec3;

use crate::types::PatchId;

const EPSILON: f32 = 1e-6;

// =============================================================================
// Bounding Box
// =============================================================================

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  /// Inverted box that any expansion overwrites.
  #[inline]
  pub fn empty() -> Self {
    Self {
      min: Vec3::splat(f32::INFINITY),
      max: Vec3::splat(f32::NEG_INFINITY),
    }
  }

  #[inline]
  pub fn new(min: Vec3, max: Vec3) -> Self {
    debug_assert!(min.cmple(max).all(), "AABB min must be <= max on all axes");
    Self { min, max }
  }

  pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
    Self {
      min: center - half_extents,
      max: center + half_extents,
    }
  }

  pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
    let mut aabb = Self::empty();
    for p in points {
      aabb.expand_point(p);
    }
    aabb
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.min.cmpgt(self.max).any()
  }

  #[inline]
  pub fn expand_point(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  #[inline]
  pub fn expand_aabb(&mut self, other: &Aabb) {
    self.min = self.min.min(other.min);
    self.max = self.max.max(other.max);
  }

  /// Grown by `margin` on every side.
  #[inline]
  pub fn inflated(&self, margin: f32) -> Self {
    Self {
      min: self.min - Vec3::splat(margin),
      max: self.max + Vec3::splat(margin),
    }
  }

  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  #[inline]
  pub fn half_extents(&self) -> Vec3 {
    (self.max - self.min) * 0.5
  }

  /// Overlap test; touching boxes overlap.
  #[inline]
  pub fn intersects(&self, other: &Aabb) -> bool {
    self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
  }

  #[inline]
  pub fn contains_point(&self, point: Vec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  /// Parametric interval where `ray` is inside the box, clipped to the
  /// ray's limit.
  pub fn ray_interval(&self, ray: &Ray) -> Option<(f32, f32)> {
    let mut t_min = 0.0f32;
    let mut t_max = ray.limit;
    for axis in 0..3 {
      let o = ray.origin[axis];
      let d = ray.direction[axis];
      if d.abs() < EPSILON {
        if o < self.min[axis] || o > self.max[axis] {
          return None;
        }
        continue;
      }
      let inv = 1.0 / d;
      let mut t0 = (self.min[axis] - o) * inv;
      let mut t1 = (self.max[axis] - o) * inv;
      if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
      }
      t_min = t_min.max(t0);
      t_max = t_max.min(t1);
      if t_min > t_max {
        return None;
      }
    }
    Some((t_min, t_max))
  }
}

// =============================================================================
// Query Shapes
// =============================================================================

/// Half-line with a unit direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
  pub origin: Vec3,
  pub direction: Vec3,
  /// Hits farther than this are ignored.
  pub limit: f32,
}

impl Ray {
  /// Unlimited ray; `direction` is normalized (zero falls back to -Y).
  pub fn new(origin: Vec3, direction: Vec3) -> Self {
    Self {
      origin,
      direction: direction.try_normalize().unwrap_or(Vec3::NEG_Y),
      limit: f32::INFINITY,
    }
  }

  pub fn with_limit(mut self, limit: f32) -> Self {
    self.limit = limit;
    self
  }

  #[inline]
  pub fn at(&self, t: f32) -> Vec3 {
    self.origin + self.direction * t
  }
}

/// Sphere moving in a straight line from `start` to `end`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweptSphere {
  pub start: Vec3,
  pub end: Vec3,
  pub radius: f32,
}

impl SweptSphere {
  pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
    Self { start, end, radius }
  }

  /// Box around the whole sweep.
  pub fn bounds(&self) -> Aabb {
    Aabb::from_points([self.start, self.end]).inflated(self.radius)
  }

  #[inline]
  pub fn velocity(&self) -> Vec3 {
    self.end - self.start
  }
}

/// Anything terrain can be tested against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collidable {
  Ray(Ray),
  Aabb(Aabb),
  SweptSphere(SweptSphere),
}

impl Collidable {
  /// Whether the query can touch anything inside `bounds`.
  pub fn may_hit(&self, bounds: &Aabb) -> bool {
    if bounds.is_empty() {
      return false;
    }
    match self {
      Collidable::Ray(ray) => bounds.ray_interval(ray).is_some(),
      Collidable::Aabb(aabb) => bounds.intersects(aabb),
      Collidable::SweptSphere(sphere) => bounds.intersects(&sphere.bounds()),
    }
  }

  /// Test one world-space triangle.
  pub fn test_triangle(&self, tri: [Vec3; 3]) -> Option<TriangleHit> {
    match self {
      Collidable::Ray(ray) => ray_triangle(ray, tri),
      Collidable::Aabb(aabb) => aabb_triangle(aabb, tri),
      Collidable::SweptSphere(sphere) => swept_sphere_triangle(sphere, tri),
    }
  }
}

// =============================================================================
// Results
// =============================================================================

/// Contact against one triangle, before it is tied to a patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
  pub point: Vec3,
  /// Ray: distance along the ray. Sphere: distance traveled before
  /// contact. Box: distance from the box center to the contact.
  pub distance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionResult {
  pub patch: PatchId,
  /// Index of the triangle in the patch's current index buffer.
  pub triangle: usize,
  pub contact_point: Vec3,
  /// Face normal of the hit triangle.
  pub contact_normal: Vec3,
  pub distance: f32,
}

/// Collected hits, sorted by distance on demand.
#[derive(Clone, Debug, Default)]
pub struct CollisionResults {
  results: Vec<CollisionResult>,
  sorted: bool,
}

impl CollisionResults {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, result: CollisionResult) {
    self.results.push(result);
    self.sorted = false;
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.results.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.results.is_empty()
  }

  pub fn clear(&mut self) {
    self.results.clear();
    self.sorted = true;
  }

  fn ensure_sorted(&mut self) {
    if !self.sorted {
      self.results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
      self.sorted = true;
    }
  }

  /// Nearest hit.
  pub fn closest(&mut self) -> Option<&CollisionResult> {
    self.ensure_sorted();
    self.results.first()
  }

  /// Farthest hit.
  pub fn farthest(&mut self) -> Option<&CollisionResult> {
    self.ensure_sorted();
    self.results.last()
  }

  /// Hits in ascending distance.
  pub fn sorted(&mut self) -> &[CollisionResult] {
    self.ensure_sorted();
    &self.results
  }

  pub fn iter(&self) -> impl Iterator<Item = &CollisionResult> {
    self.results.iter()
  }
}

// =============================================================================
// Triangle Tests
// =============================================================================

/// Unit face normal, +Y for the terrain winding.
#[inline]
pub fn triangle_normal([a, b, c]: [Vec3; 3]) -> Vec3 {
  (b - a).cross(c - a).normalize_or_zero()
}

/// Möller-Trumbore, hitting both faces.
pub fn ray_triangle(ray: &Ray, [a, b, c]: [Vec3; 3]) -> Option<TriangleHit> {
  let e1 = b - a;
  let e2 = c - a;
  let p = ray.direction.cross(e2);
  let det = e1.dot(p);
  if det.abs() < EPSILON {
    return None;
  }
  let inv = 1.0 / det;
  let s = ray.origin - a;
  let u = s.dot(p) * inv;
  if !(0.0..=1.0).contains(&u) {
    return None;
  }
  let q = s.cross(e1);
  let v = ray.direction.dot(q) * inv;
  if v < 0.0 || u + v > 1.0 {
    return None;
  }
  let t = e2.dot(q) * inv;
  if t < 0.0 || t > ray.limit {
    return None;
  }
  Some(TriangleHit {
    point: ray.at(t),
    distance: t,
  })
}

/// Separating-axis box/triangle overlap (13 axes).
pub fn aabb_triangle(aabb: &Aabb, tri: [Vec3; 3]) -> Option<TriangleHit> {
  let center = aabb.center();
  let h = aabb.half_extents();
  let v = tri.map(|p| p - center);
  let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

  let separated = |axis: Vec3| {
    if axis.length_squared() < EPSILON * EPSILON {
      return false;
    }
    let p = v.map(|p| p.dot(axis));
    let r = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
    let lo = p[0].min(p[1]).min(p[2]);
    let hi = p[0].max(p[1]).max(p[2]);
    lo > r || hi < -r
  };

  for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
    if separated(axis) {
      return None;
    }
  }
  if separated(edges[0].cross(edges[1])) {
    return None;
  }
  for edge in edges {
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
      if separated(axis.cross(edge)) {
        return None;
      }
    }
  }

  let point = closest_point_on_triangle(center, tri);
  Some(TriangleHit {
    point,
    distance: point.distance(center),
  })
}

/// Earliest contact of a moving sphere with a triangle.
pub fn swept_sphere_triangle(sphere: &SweptSphere, tri: [Vec3; 3]) -> Option<TriangleHit> {
  let r = sphere.radius;
  let base = sphere.start;
  let vel = sphere.velocity();
  let vel_sq = vel.length_squared();

  if vel_sq < EPSILON * EPSILON {
    let point = closest_point_on_triangle(base, tri);
    return (point.distance_squared(base) <= r * r).then_some(TriangleHit { point, distance: 0.0 });
  }

  let normal = triangle_normal(tri);
  if normal == Vec3::ZERO {
    return None;
  }
  let [a, b, c] = tri;
  let dist = normal.dot(base - a);
  let normal_dot_vel = normal.dot(vel);

  // Plane sweep: first time the sphere touches the triangle's plane
  let t0 = if normal_dot_vel.abs() < EPSILON {
    if dist.abs() >= r {
      return None;
    }
    None
  } else {
    let mut t0 = (r - dist) / normal_dot_vel;
    let mut t1 = (-r - dist) / normal_dot_vel;
    if t0 > t1 {
      std::mem::swap(&mut t0, &mut t1);
    }
    if t0 > 1.0 || t1 < 0.0 {
      return None;
    }
    Some(t0.clamp(0.0, 1.0))
  };

  // Face contact
  let face = match t0 {
    Some(t0) => {
      let side = if dist >= 0.0 { 1.0 } else { -1.0 };
      (t0, base + vel * t0 - normal * (r * side))
    }
    // Moving parallel inside the slab: touching from the start
    None => (0.0, base - normal * dist),
  };
  if point_in_triangle(face.1, tri) {
    return Some(TriangleHit {
      point: face.1,
      distance: face.0 * vel_sq.sqrt(),
    });
  }

  let mut best: Option<(f32, Vec3)> = None;
  let mut consider = |t: f32, point: Vec3| {
    if best.map_or(true, |(bt, _)| t < bt) {
      best = Some((t, point));
    }
  };

  // Vertices
  for p in tri {
    let qb = 2.0 * vel.dot(base - p);
    let qc = (p - base).length_squared() - r * r;
    if let Some(t) = lowest_root(vel_sq, qb, qc, 1.0) {
      consider(t, p);
    }
  }

  // Edges
  for (p1, p2) in [(a, b), (b, c), (c, a)] {
    let edge = p2 - p1;
    let base_to_vertex = p1 - base;
    let edge_sq = edge.length_squared();
    let edge_dot_vel = edge.dot(vel);
    let edge_dot_btv = edge.dot(base_to_vertex);

    let qa = edge_sq * -vel_sq + edge_dot_vel * edge_dot_vel;
    let qb = edge_sq * (2.0 * vel.dot(base_to_vertex)) - 2.0 * edge_dot_vel * edge_dot_btv;
    let qc = edge_sq * (r * r - base_to_vertex.length_squared()) + edge_dot_btv * edge_dot_btv;
    if let Some(t) = lowest_root(qa, qb, qc, 1.0) {
      let f = (edge_dot_vel * t - edge_dot_btv) / edge_sq;
      if (0.0..=1.0).contains(&f) {
        consider(t, p1 + edge * f);
      }
    }
  }

  best.map(|(t, point)| TriangleHit {
    point,
    distance: t * vel_sq.sqrt(),
  })
}

/// Smallest root of `a t^2 + b t + c` in `[0, max]`.
fn lowest_root(a: f32, b: f32, c: f32, max: f32) -> Option<f32> {
  if a.abs() < EPSILON {
    return None;
  }
  let det = b * b - 4.0 * a * c;
  if det < 0.0 {
    return None;
  }
  let sqrt = det.sqrt();
  let mut r1 = (-b - sqrt) / (2.0 * a);
  let mut r2 = (-b + sqrt) / (2.0 * a);
  if r1 > r2 {
    std::mem::swap(&mut r1, &mut r2);
  }
  [r1, r2].into_iter().find(|r| (0.0..=max).contains(r))
}

fn point_in_triangle(p: Vec3, [a, b, c]: [Vec3; 3]) -> bool {
  let n = (b - a).cross(c - a);
  let c0 = (b - a).cross(p - a).dot(n);
  let c1 = (c - b).cross(p - b).dot(n);
  let c2 = (a - c).cross(p - c).dot(n);
  c0 >= 0.0 && c1 >= 0.0 && c2 >= 0.0
}

/// Closest point on a triangle (Voronoi-region walk).
pub fn closest_point_on_triangle(p: Vec3, [a, b, c]: [Vec3; 3]) -> Vec3 {
  let ab = b - a;
  let ac = c - a;
  let ap = p - a;
  let d1 = ab.dot(ap);
  let d2 = ac.dot(ap);
  if d1 <= 0.0 && d2 <= 0.0 {
    return a;
  }

  let bp = p - b;
  let d3 = ab.dot(bp);
  let d4 = ac.dot(bp);
  if d3 >= 0.0 && d4 <= d3 {
    return b;
  }

  let vc = d1 * d4 - d3 * d2;
  if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
    return a + ab * (d1 / (d1 - d3));
  }

  let cp = p - c;
  let d5 = ab.dot(cp);
  let d6 = ac.dot(cp);
  if d6 >= 0.0 && d5 <= d6 {
    return c;
  }

  let vb = d5 * d2 - d1 * d6;
  if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
    return a + ac * (d2 / (d2 - d6));
  }

  let va = d3 * d6 - d5 * d4;
  if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
    return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
  }

  let denom = 1.0 / (va + vb + vc);
  let v = vb * denom;
  let w = vc * denom;
  a + ab * v + ac * w
}

#[cfg(test)]
#[path = "collision_test.rs"]
mod collision_test;
