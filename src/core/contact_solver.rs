use crate::collision::{Manifold, ManifoldKind, WorldManifold, MAX_MANIFOLD_POINTS};
use crate::core::island::{Position, Velocity};
use crate::core::{ContactHandle, LINEAR_SLOP};
use crate::math::{Mat22, Transform, Vec2};

/// Condition-number guard for the two-point block solver
const MAX_CONDITION_NUMBER: f32 = 1000.0;

/// Per-contact data gathered from the storages before solving
///
/// Island-local body indices address the position and velocity scratch
/// buffers rather than the world's storages.
pub(crate) struct ContactConstraintSource {
    pub handle: ContactHandle,
    pub manifold: Manifold,
    pub index_a: usize,
    pub index_b: usize,
    pub inv_mass_a: f32,
    pub inv_mass_b: f32,
    pub inv_i_a: f32,
    pub inv_i_b: f32,
    pub local_center_a: Vec2,
    pub local_center_b: Vec2,
    pub radius_a: f32,
    pub radius_b: f32,
    pub friction: f32,
    pub restitution: f32,
    pub tangent_speed: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct VelocityConstraintPoint {
    r_a: Vec2,
    r_b: Vec2,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
}

struct VelocityConstraint {
    points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],
    point_count: usize,
    normal: Vec2,
    normal_mass: Mat22,
    k: Mat22,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    friction: f32,
    restitution: f32,
    tangent_speed: f32,
    contact: ContactHandle,
}

struct PositionConstraint {
    local_points: [Vec2; MAX_MANIFOLD_POINTS],
    point_count: usize,
    local_normal: Vec2,
    local_point: Vec2,
    kind: ManifoldKind,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    local_center_a: Vec2,
    local_center_b: Vec2,
    radius_a: f32,
    radius_b: f32,
}

/// Reported solver impulses for one contact
pub(crate) struct SolvedImpulses {
    pub contact: ContactHandle,
    pub normal: [f32; MAX_MANIFOLD_POINTS],
    pub tangent: [f32; MAX_MANIFOLD_POINTS],
    pub count: usize,
}

/// Sequential-impulse solver for the contacts of one island
pub(crate) struct ContactSolver {
    velocity_constraints: Vec<VelocityConstraint>,
    position_constraints: Vec<PositionConstraint>,
    block_solve: bool,
}

fn transform_for(position: &Position, local_center: Vec2) -> Transform {
    let mut xf = Transform::from_position_angle(Vec2::zero(), position.a);
    xf.position = position.c - xf.rotation.rotate(local_center);
    xf
}

impl ContactSolver {
    /// Builds constraints for the given contacts
    ///
    /// Accumulated manifold impulses are scaled by `dt_ratio` when
    /// warm starting is on, and dropped entirely otherwise.
    pub(crate) fn new(sources: &[ContactConstraintSource], dt_ratio: f32, warm_start: bool) -> Self {
        let mut velocity_constraints = Vec::with_capacity(sources.len());
        let mut position_constraints = Vec::with_capacity(sources.len());

        for source in sources {
            debug_assert!(source.manifold.point_count() > 0);

            let mut vc = VelocityConstraint {
                points: [VelocityConstraintPoint::default(); MAX_MANIFOLD_POINTS],
                point_count: source.manifold.point_count(),
                normal: Vec2::zero(),
                normal_mass: Mat22::zero(),
                k: Mat22::zero(),
                index_a: source.index_a,
                index_b: source.index_b,
                inv_mass_a: source.inv_mass_a,
                inv_mass_b: source.inv_mass_b,
                inv_i_a: source.inv_i_a,
                inv_i_b: source.inv_i_b,
                friction: source.friction,
                restitution: source.restitution,
                tangent_speed: source.tangent_speed,
                contact: source.handle,
            };

            let mut pc = PositionConstraint {
                local_points: [Vec2::zero(); MAX_MANIFOLD_POINTS],
                point_count: source.manifold.point_count(),
                local_normal: source.manifold.local_normal,
                local_point: source.manifold.local_point,
                kind: source.manifold.kind,
                index_a: source.index_a,
                index_b: source.index_b,
                inv_mass_a: source.inv_mass_a,
                inv_mass_b: source.inv_mass_b,
                inv_i_a: source.inv_i_a,
                inv_i_b: source.inv_i_b,
                local_center_a: source.local_center_a,
                local_center_b: source.local_center_b,
                radius_a: source.radius_a,
                radius_b: source.radius_b,
            };

            for (j, point) in source.manifold.points().iter().enumerate() {
                if warm_start {
                    vc.points[j].normal_impulse = dt_ratio * point.normal_impulse;
                    vc.points[j].tangent_impulse = dt_ratio * point.tangent_impulse;
                }
                pc.local_points[j] = point.local_point;
            }

            velocity_constraints.push(vc);
            position_constraints.push(pc);
        }

        Self {
            velocity_constraints,
            position_constraints,
            block_solve: true,
        }
    }

    /// Computes effective masses and restitution bias at the current
    /// positions and velocities
    ///
    /// A zero `velocity_threshold` enables restitution for any closing
    /// speed; infinity disables it, which the TOI phase uses.
    pub(crate) fn initialize_velocity_constraints(
        &mut self,
        positions: &[Position],
        velocities: &[Velocity],
        velocity_threshold: f32,
    ) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(self.position_constraints.iter())
        {
            let index_a = vc.index_a;
            let index_b = vc.index_b;

            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;

            let c_a = positions[index_a].c;
            let c_b = positions[index_b].c;
            let v_a = velocities[index_a].v;
            let w_a = velocities[index_a].w;
            let v_b = velocities[index_b].v;
            let w_b = velocities[index_b].w;

            let xf_a = transform_for(&positions[index_a], pc.local_center_a);
            let xf_b = transform_for(&positions[index_b], pc.local_center_b);

            let manifold = reconstruct_manifold(pc);
            let world_manifold =
                WorldManifold::new(&manifold, &xf_a, pc.radius_a, &xf_b, pc.radius_b);

            vc.normal = world_manifold.normal;

            for j in 0..vc.point_count {
                let vcp = &mut vc.points[j];

                vcp.r_a = world_manifold.points[j] - c_a;
                vcp.r_b = world_manifold.points[j] - c_b;

                let rn_a = vcp.r_a.cross(&vc.normal);
                let rn_b = vcp.r_b.cross(&vc.normal);
                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let tangent = vc.normal.right_perpendicular();
                let rt_a = vcp.r_a.cross(&tangent);
                let rt_b = vcp.r_b.cross(&tangent);
                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                // Restitution bias from the closing speed at contact
                // creation.
                vcp.velocity_bias = 0.0;
                let v_rel = vc.normal.dot(
                    &(v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                        - v_a
                        - Vec2::scalar_cross(w_a, vcp.r_a)),
                );
                if v_rel < -velocity_threshold {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            // Prepare the block solver for two-point manifolds.
            if vc.point_count == 2 && self.block_solve {
                let vcp1 = vc.points[0];
                let vcp2 = vc.points[1];

                let rn1_a = vcp1.r_a.cross(&vc.normal);
                let rn1_b = vcp1.r_b.cross(&vc.normal);
                let rn2_a = vcp2.r_a.cross(&vc.normal);
                let rn2_b = vcp2.r_b.cross(&vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                    vc.k = Mat22::from_entries(k11, k12, k12, k22);
                    vc.normal_mass = vc.k.inverse();
                } else {
                    // Degenerate coupling; fall back to one point.
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Applies the accumulated impulses from the previous step
    pub(crate) fn warm_start(&mut self, velocities: &mut [Velocity]) {
        for vc in &self.velocity_constraints {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;

            let mut v_a = velocities[vc.index_a].v;
            let mut w_a = velocities[vc.index_a].w;
            let mut v_b = velocities[vc.index_b].v;
            let mut w_b = velocities[vc.index_b].w;

            let tangent = vc.normal.right_perpendicular();

            for vcp in &vc.points[..vc.point_count] {
                let impulse = vc.normal * vcp.normal_impulse + tangent * vcp.tangent_impulse;
                w_a -= i_a * vcp.r_a.cross(&impulse);
                v_a -= impulse * m_a;
                w_b += i_b * vcp.r_b.cross(&impulse);
                v_b += impulse * m_b;
            }

            velocities[vc.index_a].v = v_a;
            velocities[vc.index_a].w = w_a;
            velocities[vc.index_b].v = v_b;
            velocities[vc.index_b].w = w_b;
        }
    }

    /// Runs one velocity iteration over all contacts
    pub(crate) fn solve_velocity_constraints(&mut self, velocities: &mut [Velocity]) {
        for vc in &mut self.velocity_constraints {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;

            let mut v_a = velocities[vc.index_a].v;
            let mut w_a = velocities[vc.index_a].w;
            let mut v_b = velocities[vc.index_b].v;
            let mut w_b = velocities[vc.index_b].w;

            let normal = vc.normal;
            let tangent = normal.right_perpendicular();
            let friction = vc.friction;

            debug_assert!(vc.point_count == 1 || vc.point_count == 2);

            // Friction first, using the normal impulse from the prior
            // iteration as the limit.
            for vcp in vc.points[..vc.point_count].iter_mut() {
                let dv = v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vcp.r_a);

                let vt = dv.dot(&tangent) - vc.tangent_speed;
                let lambda = vcp.tangent_mass * -vt;

                let max_friction = friction * vcp.normal_impulse;
                let new_impulse =
                    crate::math::clamp(vcp.tangent_impulse + lambda, -max_friction, max_friction);
                let lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = tangent * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.r_a.cross(&p);
                v_b += p * m_b;
                w_b += i_b * vcp.r_b.cross(&p);
            }

            if vc.point_count == 1 {
                let vcp = &mut vc.points[0];

                let dv = v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vcp.r_a);

                let vn = dv.dot(&normal);
                let lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                let lambda = new_impulse - vcp.normal_impulse;
                vcp.normal_impulse = new_impulse;

                let p = normal * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.r_a.cross(&p);
                v_b += p * m_b;
                w_b += i_b * vcp.r_b.cross(&p);
            } else {
                // Two-point 2x2 block solve keeps the points from
                // fighting each other.
                //
                // Solve for x subject to the complementarity
                // conditions: vn = A*x + b, x >= 0, vn >= 0,
                // x_i * vn_i = 0 with A = K and b the current relative
                // normal speeds minus the bias.
                let a = Vec2::new(vc.points[0].normal_impulse, vc.points[1].normal_impulse);
                debug_assert!(a.x >= 0.0 && a.y >= 0.0);

                let dv1 = v_b + Vec2::scalar_cross(w_b, vc.points[0].r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vc.points[0].r_a);
                let dv2 = v_b + Vec2::scalar_cross(w_b, vc.points[1].r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vc.points[1].r_a);

                let vn1 = dv1.dot(&normal);
                let vn2 = dv2.dot(&normal);

                let mut b = Vec2::new(
                    vn1 - vc.points[0].velocity_bias,
                    vn2 - vc.points[1].velocity_bias,
                );
                b -= vc.k.mul_vec(a);

                let x;
                loop {
                    // Case 1: both points pushing.
                    let candidate = -vc.normal_mass.mul_vec(b);
                    if candidate.x >= 0.0 && candidate.y >= 0.0 {
                        x = candidate;
                        break;
                    }

                    // Case 2: point 1 pushes, point 2 separates.
                    let x1 = -vc.points[0].normal_mass * b.x;
                    let vn2 = vc.k.ex.y * x1 + b.y;
                    if x1 >= 0.0 && vn2 >= 0.0 {
                        x = Vec2::new(x1, 0.0);
                        break;
                    }

                    // Case 3: point 2 pushes, point 1 separates.
                    let x2 = -vc.points[1].normal_mass * b.y;
                    let vn1 = vc.k.ey.x * x2 + b.x;
                    if x2 >= 0.0 && vn1 >= 0.0 {
                        x = Vec2::new(0.0, x2);
                        break;
                    }

                    // Case 4: both separate.
                    if b.x >= 0.0 && b.y >= 0.0 {
                        x = Vec2::zero();
                        break;
                    }

                    // No solution; keep the accumulated impulses.
                    x = a;
                    break;
                }

                let d = x - a;
                let p1 = normal * d.x;
                let p2 = normal * d.y;

                v_a -= (p1 + p2) * m_a;
                w_a -= i_a * (vc.points[0].r_a.cross(&p1) + vc.points[1].r_a.cross(&p2));
                v_b += (p1 + p2) * m_b;
                w_b += i_b * (vc.points[0].r_b.cross(&p1) + vc.points[1].r_b.cross(&p2));

                vc.points[0].normal_impulse = x.x;
                vc.points[1].normal_impulse = x.y;
            }

            velocities[vc.index_a].v = v_a;
            velocities[vc.index_a].w = w_a;
            velocities[vc.index_b].v = v_b;
            velocities[vc.index_b].w = w_b;
        }
    }

    /// Returns the accumulated impulses for every contact
    pub(crate) fn impulses(&self) -> Vec<SolvedImpulses> {
        self.velocity_constraints
            .iter()
            .map(|vc| {
                let mut normal = [0.0; MAX_MANIFOLD_POINTS];
                let mut tangent = [0.0; MAX_MANIFOLD_POINTS];
                for (j, vcp) in vc.points[..vc.point_count].iter().enumerate() {
                    normal[j] = vcp.normal_impulse;
                    tangent[j] = vcp.tangent_impulse;
                }
                SolvedImpulses {
                    contact: vc.contact,
                    normal,
                    tangent,
                    count: vc.point_count,
                }
            })
            .collect()
    }

    /// Runs one position iteration over all contacts
    ///
    /// Returns the minimum separation observed; the caller stops
    /// iterating once every constraint is within `-3 * linear_slop`.
    /// With `toi_indices` set, only those two island bodies receive
    /// corrections; the rest act as infinite mass.
    pub(crate) fn solve_position_constraints(
        &mut self,
        positions: &mut [Position],
        resolution_rate: f32,
        max_linear_correction: f32,
        toi_indices: Option<(usize, usize)>,
    ) -> f32 {
        let mut min_separation = 0.0_f32;

        for pc in &self.position_constraints {
            let index_a = pc.index_a;
            let index_b = pc.index_b;

            let (m_a, i_a, m_b, i_b) = match toi_indices {
                None => (pc.inv_mass_a, pc.inv_i_a, pc.inv_mass_b, pc.inv_i_b),
                Some((toi_a, toi_b)) => {
                    let movable_a = index_a == toi_a || index_a == toi_b;
                    let movable_b = index_b == toi_a || index_b == toi_b;
                    (
                        if movable_a { pc.inv_mass_a } else { 0.0 },
                        if movable_a { pc.inv_i_a } else { 0.0 },
                        if movable_b { pc.inv_mass_b } else { 0.0 },
                        if movable_b { pc.inv_i_b } else { 0.0 },
                    )
                }
            };

            let mut c_a = positions[index_a].c;
            let mut a_a = positions[index_a].a;
            let mut c_b = positions[index_b].c;
            let mut a_b = positions[index_b].a;

            for j in 0..pc.point_count {
                let xf_a = transform_for(&Position { c: c_a, a: a_a }, pc.local_center_a);
                let xf_b = transform_for(&Position { c: c_b, a: a_b }, pc.local_center_b);

                let (normal, point, separation) = position_solver_manifold(pc, &xf_a, &xf_b, j);

                let r_a = point - c_a;
                let r_b = point - c_b;

                min_separation = min_separation.min(separation);

                let c = crate::math::clamp(
                    resolution_rate * (separation + LINEAR_SLOP),
                    -max_linear_correction,
                    0.0,
                );

                let rn_a = r_a.cross(&normal);
                let rn_b = r_b.cross(&normal);
                let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;

                let impulse = if k > 0.0 { -c / k } else { 0.0 };
                let p = normal * impulse;

                c_a -= p * m_a;
                a_a -= i_a * r_a.cross(&p);
                c_b += p * m_b;
                a_b += i_b * r_b.cross(&p);
            }

            positions[index_a].c = c_a;
            positions[index_a].a = a_a;
            positions[index_b].c = c_b;
            positions[index_b].a = a_b;
        }

        min_separation
    }
}

/// Rebuilds the manifold stored in a position constraint
fn reconstruct_manifold(pc: &PositionConstraint) -> Manifold {
    let mut manifold = Manifold::new(pc.kind);
    manifold.local_normal = pc.local_normal;
    manifold.local_point = pc.local_point;
    for j in 0..pc.point_count {
        manifold.add_point(pc.local_points[j], Default::default());
    }
    manifold
}

/// Evaluates one position-constraint point in world space
///
/// Returns the normal, contact point, and separation adjusted for
/// both vertex radii.
fn position_solver_manifold(
    pc: &PositionConstraint,
    xf_a: &Transform,
    xf_b: &Transform,
    index: usize,
) -> (Vec2, Vec2, f32) {
    debug_assert!(pc.point_count > 0);

    match pc.kind {
        ManifoldKind::Circles => {
            let point_a = xf_a.transform_point(pc.local_point);
            let point_b = xf_b.transform_point(pc.local_points[0]);
            let normal = (point_b - point_a).normalize();
            let point = (point_a + point_b) * 0.5;
            let separation = (point_b - point_a).dot(&normal) - pc.radius_a - pc.radius_b;
            (normal, point, separation)
        }
        ManifoldKind::FaceA => {
            let normal = xf_a.transform_direction(pc.local_normal);
            let plane_point = xf_a.transform_point(pc.local_point);
            let clip_point = xf_b.transform_point(pc.local_points[index]);
            let separation =
                (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b;
            (normal, clip_point, separation)
        }
        ManifoldKind::FaceB => {
            let normal = xf_b.transform_direction(pc.local_normal);
            let plane_point = xf_b.transform_point(pc.local_point);
            let clip_point = xf_a.transform_point(pc.local_points[index]);
            let separation =
                (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b;
            // Report the normal from A to B.
            (-normal, clip_point, separation)
        }
    }
}
