use crate::collision::{distance, DistanceProxy, SimplexCache};
use crate::core::LINEAR_SLOP;
use crate::math::{Sweep, Vec2};

/// Input for a time-of-impact query between two swept proxies
#[derive(Debug, Clone)]
pub struct ToiInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub sweep_a: Sweep,
    pub sweep_b: Sweep,

    /// Upper bound on the reported time, usually 1
    pub t_max: f32,

    /// Iteration cap for the outer conservative-advancement loop
    pub max_iterations: u32,

    /// Iteration cap for the separation root finder
    pub max_root_iterations: u32,
}

/// Classification of a time-of-impact result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToiState {
    /// The root finder ran out of iterations; `t` is the best bound
    Failed,

    /// The proxies already overlap deeper than the target at `t = 0`
    Overlapped,

    /// The proxies reach the target separation at `t`
    Touching,

    /// The proxies stay separated through the whole interval
    Separated,
}

/// Result of a time-of-impact query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToiOutput {
    pub state: ToiState,
    pub t: f32,
}

enum FinderKind {
    Points,
    FaceA,
    FaceB,
}

/// Evaluates the separation of two swept proxies along a fixed axis
///
/// Built from the GJK simplex cache, the finder knows whether the
/// closest feature was a point pair or a face, and measures separation
/// along that feature's axis as the bodies sweep.
pub struct SeparationFinder<'a> {
    proxy_a: &'a DistanceProxy,
    proxy_b: &'a DistanceProxy,
    sweep_a: Sweep,
    sweep_b: Sweep,
    kind: FinderKind,
    axis: Vec2,
    local_point: Vec2,
}

impl<'a> SeparationFinder<'a> {
    /// Constructs a finder from the cached simplex of a distance query
    pub fn new(
        cache: &SimplexCache,
        proxy_a: &'a DistanceProxy,
        sweep_a: Sweep,
        proxy_b: &'a DistanceProxy,
        sweep_b: Sweep,
        t1: f32,
    ) -> Self {
        let count = cache.index_pairs().len();
        debug_assert!(0 < count && count < 3);

        let xf_a = sweep_a.transform_at(t1);
        let xf_b = sweep_b.transform_at(t1);

        if count == 1 {
            let (ia, ib) = cache.index_pairs()[0];
            let point_a = xf_a.transform_point(proxy_a.vertex(ia as usize));
            let point_b = xf_b.transform_point(proxy_b.vertex(ib as usize));
            return Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: FinderKind::Points,
                axis: (point_b - point_a).normalize(),
                local_point: Vec2::zero(),
            };
        }

        let (ia1, ib1) = cache.index_pairs()[0];
        let (ia2, ib2) = cache.index_pairs()[1];

        if ia1 == ia2 {
            // Two points on B, one on A: the face lives on B.
            let local_b1 = proxy_b.vertex(ib1 as usize);
            let local_b2 = proxy_b.vertex(ib2 as usize);

            let mut axis = (local_b2 - local_b1).right_perpendicular().normalize();
            let local_point = (local_b1 + local_b2) * 0.5;
            let normal = xf_b.transform_direction(axis);

            let point_a = xf_a.transform_point(proxy_a.vertex(ia1 as usize));
            let point_b = xf_b.transform_point(local_point);

            if (point_a - point_b).dot(&normal) < 0.0 {
                axis = -axis;
            }

            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: FinderKind::FaceB,
                axis,
                local_point,
            }
        } else {
            // Two points on A, one or two on B: the face lives on A.
            let local_a1 = proxy_a.vertex(ia1 as usize);
            let local_a2 = proxy_a.vertex(ia2 as usize);

            let mut axis = (local_a2 - local_a1).right_perpendicular().normalize();
            let local_point = (local_a1 + local_a2) * 0.5;
            let normal = xf_a.transform_direction(axis);

            let point_b = xf_b.transform_point(proxy_b.vertex(ib1 as usize));
            let point_a = xf_a.transform_point(local_point);

            if (point_b - point_a).dot(&normal) < 0.0 {
                axis = -axis;
            }

            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: FinderKind::FaceA,
                axis,
                local_point,
            }
        }
    }

    /// Returns the separation axis in the reference frame it was built in
    pub fn axis(&self) -> Vec2 {
        self.axis
    }

    /// Returns whether the finder measures along a face on proxy A
    pub fn is_face_a(&self) -> bool {
        matches!(self.kind, FinderKind::FaceA)
    }

    /// Finds the minimum separation over all supports at time `t`,
    /// returning the separation and the realizing vertex indices
    pub fn find_min_separation(&self, t: f32) -> (f32, usize, usize) {
        let xf_a = self.sweep_a.transform_at(t);
        let xf_b = self.sweep_b.transform_at(t);

        match self.kind {
            FinderKind::Points => {
                let axis_a = xf_a.rotation.inverse_rotate(self.axis);
                let axis_b = xf_b.rotation.inverse_rotate(-self.axis);

                let index_a = self.proxy_a.support(axis_a);
                let index_b = self.proxy_b.support(axis_b);

                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(&self.axis), index_a, index_b)
            }
            FinderKind::FaceA => {
                let normal = xf_a.transform_direction(self.axis);
                let point_a = xf_a.transform_point(self.local_point);

                let axis_b = xf_b.rotation.inverse_rotate(-normal);
                let index_b = self.proxy_b.support(axis_b);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(&normal), usize::MAX, index_b)
            }
            FinderKind::FaceB => {
                let normal = xf_b.transform_direction(self.axis);
                let point_b = xf_b.transform_point(self.local_point);

                let axis_a = xf_a.rotation.inverse_rotate(-normal);
                let index_a = self.proxy_a.support(axis_a);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));

                ((point_a - point_b).dot(&normal), index_a, usize::MAX)
            }
        }
    }

    /// Evaluates the separation of fixed vertex indices at time `t`
    pub fn evaluate(&self, index_a: usize, index_b: usize, t: f32) -> f32 {
        let xf_a = self.sweep_a.transform_at(t);
        let xf_b = self.sweep_b.transform_at(t);

        match self.kind {
            FinderKind::Points => {
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(&self.axis)
            }
            FinderKind::FaceA => {
                let normal = xf_a.transform_direction(self.axis);
                let point_a = xf_a.transform_point(self.local_point);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(&normal)
            }
            FinderKind::FaceB => {
                let normal = xf_b.transform_direction(self.axis);
                let point_b = xf_b.transform_point(self.local_point);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                (point_a - point_b).dot(&normal)
            }
        }
    }
}

/// Computes the time of impact between two swept proxies
///
/// Uses conservative advancement: repeatedly measure the closest
/// distance, then advance time just far enough that the proxies could
/// first reach the target separation, refining each advancement with a
/// bracketed root finder. The target keeps a small overlap so the
/// narrow phase registers a touching contact at the reported time.
pub fn time_of_impact(input: &ToiInput) -> ToiOutput {
    let mut sweep_a = input.sweep_a;
    let mut sweep_b = input.sweep_b;

    // Large rotations make the root finder multimodal; keeping the
    // angles normalized bounds the sweep curvature.
    sweep_a.normalize_angles();
    sweep_b.normalize_angles();

    let t_max = input.t_max;

    let total_radius = input.proxy_a.radius() + input.proxy_b.radius();
    let target = LINEAR_SLOP.max(total_radius - 3.0 * LINEAR_SLOP);
    let tolerance = 0.25 * LINEAR_SLOP;
    debug_assert!(target > tolerance);

    let mut t1 = 0.0;
    let mut iteration = 0;

    let mut cache = SimplexCache::new();

    loop {
        let xf_a = sweep_a.transform_at(t1);
        let xf_b = sweep_b.transform_at(t1);

        let dist_output = distance(
            &mut cache,
            &input.proxy_a,
            &xf_a,
            &input.proxy_b,
            &xf_b,
            false,
        );

        if dist_output.distance <= 0.0 {
            return ToiOutput {
                state: ToiState::Overlapped,
                t: 0.0,
            };
        }

        if dist_output.distance < target + tolerance {
            return ToiOutput {
                state: ToiState::Touching,
                t: t1,
            };
        }

        let finder = SeparationFinder::new(
            &cache,
            &input.proxy_a,
            sweep_a,
            &input.proxy_b,
            sweep_b,
            t1,
        );

        // Resolve deepest supports one at a time until the interval end
        // is conservatively safe.
        let mut t2 = t_max;
        let mut push_back_iteration = 0;

        loop {
            let (mut s2, index_a, index_b) = finder.find_min_separation(t2);

            // Final configuration is separated enough: no impact.
            if s2 > target + tolerance {
                return ToiOutput {
                    state: ToiState::Separated,
                    t: t_max,
                };
            }

            // Just touching at the end of the interval: advance there.
            if s2 > target - tolerance {
                t1 = t2;
                break;
            }

            let mut s1 = finder.evaluate(index_a, index_b, t1);

            // The interval start is already past the target; numerical
            // drift ate the margin.
            if s1 < target - tolerance {
                return ToiOutput {
                    state: ToiState::Failed,
                    t: t1,
                };
            }

            if s1 <= target + tolerance {
                return ToiOutput {
                    state: ToiState::Touching,
                    t: t1,
                };
            }

            // Root find for s(t) == target on [t1, t2], mixing secant
            // and bisection steps.
            let mut root_iteration = 0;
            let mut a1 = t1;
            let mut a2 = t2;
            loop {
                let t = if root_iteration & 1 == 1 {
                    a1 + (target - s1) * (a2 - a1) / (s2 - s1)
                } else {
                    0.5 * (a1 + a2)
                };

                root_iteration += 1;

                let s = finder.evaluate(index_a, index_b, t);

                if (s - target).abs() < tolerance {
                    t2 = t;
                    break;
                }

                if s > target {
                    a1 = t;
                    s1 = s;
                } else {
                    a2 = t;
                    s2 = s;
                }

                if root_iteration >= input.max_root_iterations {
                    // Keep the best known bound.
                    t2 = a1;
                    break;
                }
            }

            push_back_iteration += 1;
            if push_back_iteration >= crate::core::MAX_POLYGON_VERTICES as u32 {
                break;
            }
        }

        iteration += 1;
        if iteration >= input.max_iterations {
            // Give up and report the last safe time.
            return ToiOutput {
                state: ToiState::Failed,
                t: t1,
            };
        }
    }
}
