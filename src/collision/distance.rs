use crate::math::{Transform, Vec2};

/// Maximum number of GJK iterations before giving up on convergence
const MAX_ITERATIONS: u32 = 20;

/// A convex point cloud with a rounding radius, used by the distance
/// and time-of-impact algorithms
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceProxy {
    vertices: Vec<Vec2>,
    radius: f32,
}

impl DistanceProxy {
    /// Creates a new proxy from vertices and a vertex radius
    pub fn new(vertices: Vec<Vec2>, radius: f32) -> Self {
        debug_assert!(!vertices.is_empty());
        Self { vertices, radius }
    }

    /// Returns the number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the vertex at the given index
    #[inline]
    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index]
    }

    /// Returns all vertices
    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Returns the vertex radius
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Returns the index of the support vertex in the given direction
    pub fn support(&self, direction: Vec2) -> usize {
        let mut best = 0;
        let mut best_value = self.vertices[0].dot(&direction);
        for (i, vertex) in self.vertices.iter().enumerate().skip(1) {
            let value = vertex.dot(&direction);
            if value > best_value {
                best = i;
                best_value = value;
            }
        }
        best
    }
}

/// Cached simplex state that lets the next distance query on the same
/// pair start from the previous solution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexCache {
    /// Length or area measure of the cached simplex
    metric: f32,

    /// Number of cached support-point index pairs
    count: u8,

    /// Support vertex indices on proxy A and proxy B
    pairs: [(u8, u8); 3],
}

impl SimplexCache {
    /// Creates an empty cache that seeds the search cold
    pub fn new() -> Self {
        Self {
            metric: 0.0,
            count: 0,
            pairs: [(0, 0); 3],
        }
    }

    /// Returns the cached index pairs
    pub fn index_pairs(&self) -> &[(u8, u8)] {
        &self.pairs[..self.count as usize]
    }

    /// Returns the cached simplex metric
    pub fn metric(&self) -> f32 {
        self.metric
    }
}

impl Default for SimplexCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a closest-point query between two convex proxies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceOutput {
    /// Witness point on proxy A in world space
    pub point_a: Vec2,

    /// Witness point on proxy B in world space
    pub point_b: Vec2,

    /// Distance between the witness points
    pub distance: f32,

    /// Number of GJK iterations used
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimplexVertex {
    /// Support point on proxy A in world coordinates
    wa: Vec2,

    /// Support point on proxy B in world coordinates
    wb: Vec2,

    /// Minkowski difference point (wb - wa)
    w: Vec2,

    /// Barycentric coordinate for the closest point
    a: f32,

    index_a: usize,
    index_b: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Simplex {
    vertices: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn read_cache(
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
    ) -> Self {
        let mut simplex = Self::default();

        // Rebuild the simplex from the cached support indices.
        for &(ia, ib) in cache.index_pairs() {
            let index_a = ia as usize;
            let index_b = ib as usize;
            let wa = xf_a.transform_point(proxy_a.vertex(index_a));
            let wb = xf_b.transform_point(proxy_b.vertex(index_b));
            simplex.vertices[simplex.count] = SimplexVertex {
                wa,
                wb,
                w: wb - wa,
                a: 0.0,
                index_a,
                index_b,
            };
            simplex.count += 1;
        }

        // Discard a cached simplex whose metric drifted too far; the
        // warm start would mislead more than help.
        if simplex.count > 1 {
            let metric1 = cache.metric();
            let metric2 = simplex.metric();
            if metric2 < 0.5 * metric1
                || 2.0 * metric1 < metric2
                || metric2 < crate::math::EPSILON
            {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            let wa = xf_a.transform_point(proxy_a.vertex(0));
            let wb = xf_b.transform_point(proxy_b.vertex(0));
            simplex.vertices[0] = SimplexVertex {
                wa,
                wb,
                w: wb - wa,
                a: 1.0,
                index_a: 0,
                index_b: 0,
            };
            simplex.count = 1;
        }

        simplex
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count as u8;
        for i in 0..self.count {
            cache.pairs[i] = (self.vertices[i].index_a as u8, self.vertices[i].index_b as u8);
        }
    }

    fn metric(&self) -> f32 {
        match self.count {
            1 => 0.0,
            2 => (self.vertices[1].w - self.vertices[0].w).length(),
            3 => {
                let e12 = self.vertices[1].w - self.vertices[0].w;
                let e13 = self.vertices[2].w - self.vertices[0].w;
                e12.cross(&e13)
            }
            _ => 0.0,
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.vertices[0].w,
            2 => {
                let e12 = self.vertices[1].w - self.vertices[0].w;
                let sgn = e12.cross(&-self.vertices[0].w);
                if sgn > 0.0 {
                    // Origin is left of the edge.
                    Vec2::new(-e12.y, e12.x)
                } else {
                    Vec2::new(e12.y, -e12.x)
                }
            }
            _ => Vec2::zero(),
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        match self.count {
            1 => (self.vertices[0].wa, self.vertices[0].wb),
            2 => {
                let v0 = &self.vertices[0];
                let v1 = &self.vertices[1];
                (
                    v0.wa * v0.a + v1.wa * v1.a,
                    v0.wb * v0.a + v1.wb * v1.a,
                )
            }
            3 => {
                let v0 = &self.vertices[0];
                let v1 = &self.vertices[1];
                let v2 = &self.vertices[2];
                let point = v0.wa * v0.a + v1.wa * v1.a + v2.wa * v2.a;
                (point, point)
            }
            _ => (Vec2::zero(), Vec2::zero()),
        }
    }

    /// Finds the closest point to the origin on a 1-simplex
    fn solve2(&mut self) {
        let w1 = self.vertices[0].w;
        let w2 = self.vertices[1].w;
        let e12 = w2 - w1;

        let d12_2 = -w1.dot(&e12);
        if d12_2 <= 0.0 {
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        let d12_1 = w2.dot(&e12);
        if d12_1 <= 0.0 {
            self.vertices[0] = self.vertices[1];
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.vertices[0].a = d12_1 * inv_d12;
        self.vertices[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    /// Finds the closest point to the origin on a 2-simplex
    fn solve3(&mut self) {
        let w1 = self.vertices[0].w;
        let w2 = self.vertices[1].w;
        let w3 = self.vertices[2].w;

        let e12 = w2 - w1;
        let w1e12 = w1.dot(&e12);
        let w2e12 = w2.dot(&e12);
        let d12_1 = w2e12;
        let d12_2 = -w1e12;

        let e13 = w3 - w1;
        let w1e13 = w1.dot(&e13);
        let w3e13 = w3.dot(&e13);
        let d13_1 = w3e13;
        let d13_2 = -w1e13;

        let e23 = w3 - w2;
        let w2e23 = w2.dot(&e23);
        let w3e23 = w3.dot(&e23);
        let d23_1 = w3e23;
        let d23_2 = -w2e23;

        let n123 = e12.cross(&e13);
        let d123_1 = n123 * w2.cross(&w3);
        let d123_2 = n123 * w3.cross(&w1);
        let d123_3 = n123 * w1.cross(&w2);

        // Vertex 1 region.
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Edge 1-2 region.
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv_d12 = 1.0 / (d12_1 + d12_2);
            self.vertices[0].a = d12_1 * inv_d12;
            self.vertices[1].a = d12_2 * inv_d12;
            self.count = 2;
            return;
        }

        // Edge 1-3 region.
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv_d13 = 1.0 / (d13_1 + d13_2);
            self.vertices[0].a = d13_1 * inv_d13;
            self.vertices[2].a = d13_2 * inv_d13;
            self.vertices[1] = self.vertices[2];
            self.count = 2;
            return;
        }

        // Vertex 2 region.
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.vertices[1].a = 1.0;
            self.vertices[0] = self.vertices[1];
            self.count = 1;
            return;
        }

        // Vertex 3 region.
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.vertices[2].a = 1.0;
            self.vertices[0] = self.vertices[2];
            self.count = 1;
            return;
        }

        // Edge 2-3 region.
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv_d23 = 1.0 / (d23_1 + d23_2);
            self.vertices[1].a = d23_1 * inv_d23;
            self.vertices[2].a = d23_2 * inv_d23;
            self.vertices[0] = self.vertices[2];
            self.count = 2;
            return;
        }

        // Interior region: the origin is enclosed.
        let inv_d123 = 1.0 / (d123_1 + d123_2 + d123_3);
        self.vertices[0].a = d123_1 * inv_d123;
        self.vertices[1].a = d123_2 * inv_d123;
        self.vertices[2].a = d123_3 * inv_d123;
        self.count = 3;
    }
}

/// Computes the closest points between two convex proxies
///
/// The cache carries the final simplex from call to call so repeated
/// queries on the same pair converge in very few iterations. Vertex
/// radii are applied to the reported witness points and distance when
/// `use_radii` is set.
pub fn distance(
    cache: &mut SimplexCache,
    proxy_a: &DistanceProxy,
    xf_a: &Transform,
    proxy_b: &DistanceProxy,
    xf_b: &Transform,
    use_radii: bool,
) -> DistanceOutput {
    let mut simplex = Simplex::read_cache(cache, proxy_a, xf_a, proxy_b, xf_b);

    let mut iterations = 0;
    let mut saved: [(usize, usize); 3] = [(0, 0); 3];

    while iterations < MAX_ITERATIONS {
        let saved_count = simplex.count;
        for i in 0..saved_count {
            saved[i] = (simplex.vertices[i].index_a, simplex.vertices[i].index_b);
        }

        match simplex.count {
            1 => {}
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            _ => unreachable!(),
        }

        // A full simplex means the proxies overlap.
        if simplex.count == 3 {
            break;
        }

        let direction = simplex.search_direction();
        if direction.length_squared() < crate::math::EPSILON * crate::math::EPSILON {
            // The origin sits on an edge or vertex of the simplex.
            // Leave the witness points where they are; returning a
            // zero direction support would not make progress.
            break;
        }

        let index_a = proxy_a.support(xf_a.rotation.inverse_rotate(-direction));
        let index_b = proxy_b.support(xf_b.rotation.inverse_rotate(direction));
        let wa = xf_a.transform_point(proxy_a.vertex(index_a));
        let wb = xf_b.transform_point(proxy_b.vertex(index_b));

        iterations += 1;

        // A repeated support pair means no further progress is possible.
        let duplicate = saved[..saved_count]
            .iter()
            .any(|&(ia, ib)| ia == index_a && ib == index_b);
        if duplicate {
            break;
        }

        simplex.vertices[simplex.count] = SimplexVertex {
            wa,
            wb,
            w: wb - wa,
            a: 0.0,
            index_a,
            index_b,
        };
        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut separation = (point_b - point_a).length();

    simplex.write_cache(cache);

    if use_radii {
        let ra = proxy_a.radius();
        let rb = proxy_b.radius();

        if separation > ra + rb && separation > crate::math::EPSILON {
            // Shrink the witness points onto the rounded surfaces.
            separation -= ra + rb;
            let normal = (point_b - point_a).normalize();
            point_a += normal * ra;
            point_b -= normal * rb;
        } else {
            // Overlapping rounded shapes share a midpoint witness.
            let point = (point_a + point_b) * 0.5;
            point_a = point;
            point_b = point;
            separation = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance: separation,
        iterations,
    }
}

/// Reports whether two proxies overlap within a small tolerance
pub fn test_overlap(
    proxy_a: &DistanceProxy,
    xf_a: &Transform,
    proxy_b: &DistanceProxy,
    xf_b: &Transform,
) -> bool {
    let mut cache = SimplexCache::new();
    let output = distance(&mut cache, proxy_a, xf_a, proxy_b, xf_b, true);
    output.distance < 10.0 * crate::math::EPSILON
}
