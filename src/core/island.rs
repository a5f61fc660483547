use crate::bodies::{Body, BodyType};
use crate::constraints::{Joint, SolverData};
use crate::core::contact_solver::{ContactConstraintSource, ContactSolver};
use crate::core::events::ContactImpulses;
use crate::core::storage::{BodyStorage, ContactStorage, JointStorage, Storage};
use crate::core::{BodyHandle, Contact, ContactHandle, ContactListener, JointHandle, StepConf};
use crate::math::Vec2;

/// Center-of-mass position and angle of one island body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// World position of the center of mass
    pub c: Vec2,

    /// World angle in radians
    pub a: f32,
}

/// Linear and angular velocity of one island body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    /// Linear velocity of the center of mass
    pub v: Vec2,

    /// Angular velocity in radians per second
    pub w: f32,
}

/// Results of solving one island
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct IslandSolveResults {
    /// Whether the position constraints converged within budget
    pub solved: bool,

    /// Number of bodies put to sleep
    pub bodies_slept: u32,
}

/// A connected set of awake bodies coupled by contacts and joints
///
/// Islands are solved independently. The position and velocity
/// buffers are retained between islands so per-step allocation stays
/// bounded.
#[derive(Debug, Default)]
pub struct Island {
    pub(crate) bodies: Vec<BodyHandle>,
    pub(crate) contacts: Vec<ContactHandle>,
    pub(crate) joints: Vec<JointHandle>,
    pub(crate) positions: Vec<Position>,
    pub(crate) velocities: Vec<Velocity>,
}

impl Island {
    /// Creates a new empty island
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all bodies, contacts, and joints
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
        self.positions.clear();
        self.velocities.clear();
    }

    /// Adds a body and returns its island-local index
    pub fn add_body(&mut self, handle: BodyHandle) -> usize {
        self.bodies.push(handle);
        self.bodies.len() - 1
    }

    /// Adds a contact
    pub fn add_contact(&mut self, handle: ContactHandle) {
        self.contacts.push(handle);
    }

    /// Adds a joint
    pub fn add_joint(&mut self, handle: JointHandle) {
        self.joints.push(handle);
    }

    /// Returns the number of bodies in the island
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Returns the number of contacts in the island
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Returns the number of joints in the island
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Gathers contact constraint inputs from the storages
    fn gather_contact_sources(
        &self,
        bodies: &BodyStorage<Body>,
        contacts: &ContactStorage<Contact>,
    ) -> Vec<ContactConstraintSource> {
        let mut sources = Vec::with_capacity(self.contacts.len());

        for &handle in &self.contacts {
            let contact = match contacts.get(handle) {
                Some(contact) => contact,
                None => continue,
            };

            let body_a = match bodies.get(contact.body_a()) {
                Some(body) => body,
                None => continue,
            };
            let body_b = match bodies.get(contact.body_b()) {
                Some(body) => body,
                None => continue,
            };

            let radius_a = body_a
                .fixture(contact.fixture_a())
                .map(|f| f.shape().vertex_radius())
                .unwrap_or(0.0);
            let radius_b = body_b
                .fixture(contact.fixture_b())
                .map(|f| f.shape().vertex_radius())
                .unwrap_or(0.0);

            sources.push(ContactConstraintSource {
                handle,
                manifold: *contact.manifold(),
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.inv_mass(),
                inv_mass_b: body_b.inv_mass(),
                inv_i_a: body_a.inv_inertia(),
                inv_i_b: body_b.inv_inertia(),
                local_center_a: body_a.local_center(),
                local_center_b: body_b.local_center(),
                radius_a,
                radius_b,
                friction: contact.friction(),
                restitution: contact.restitution(),
                tangent_speed: contact.tangent_speed(),
            });
        }

        sources
    }

    /// Writes the solver's accumulated impulses back into the contacts
    fn store_impulses(solver: &ContactSolver, contacts: &mut ContactStorage<Contact>) {
        for solved in solver.impulses() {
            if let Some(contact) = contacts.get_mut(solved.contact) {
                let manifold = contact.manifold_mut();
                for (j, point) in manifold.points_mut().iter_mut().enumerate() {
                    if j < solved.count {
                        point.normal_impulse = solved.normal[j];
                        point.tangent_impulse = solved.tangent[j];
                    }
                }
            }
        }
    }

    /// Integrates forces, solves constraints, and integrates positions
    /// for the regular phase of a step
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn solve(
        &mut self,
        conf: &StepConf,
        gravity: Vec2,
        allow_sleep: bool,
        bodies: &mut BodyStorage<Body>,
        contacts: &mut ContactStorage<Contact>,
        joints: &mut JointStorage<Box<dyn Joint>>,
        mut listener: Option<&mut (dyn ContactListener + '_)>,
    ) -> IslandSolveResults {
        let h = conf.dt;

        self.positions.clear();
        self.velocities.clear();

        // Copy body state and integrate velocities.
        for &handle in &self.bodies {
            let body = match bodies.get_mut(handle) {
                Some(body) => body,
                None => continue,
            };

            let c = body.sweep().c;
            let a = body.sweep().a;
            let mut v = body.linear_velocity();
            let mut w = body.angular_velocity();

            // Remember the pre-solve state for TOI interpolation.
            body.sweep_mut().c0 = c;
            body.sweep_mut().a0 = a;

            if body.body_type() == BodyType::Dynamic {
                v += (gravity + body.force() * body.inv_mass()) * h;
                w += h * body.inv_inertia() * body.torque();

                // Solution of dv/dt + c*v = 0, applied implicitly.
                v *= 1.0 / (1.0 + h * body.linear_damping());
                w *= 1.0 / (1.0 + h * body.angular_damping());
            }

            self.positions.push(Position { c, a });
            self.velocities.push(Velocity { v, w });
        }

        let sources = self.gather_contact_sources(bodies, contacts);
        let mut solver = ContactSolver::new(&sources, conf.dt_ratio, conf.do_warm_start);
        solver.initialize_velocity_constraints(
            &self.positions,
            &self.velocities,
            conf.velocity_threshold,
        );

        if conf.do_warm_start {
            solver.warm_start(&mut self.velocities);
        }

        for &handle in &self.joints {
            if let Some(joint) = joints.get_mut(handle) {
                let mut data = SolverData {
                    step: conf,
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                };
                joint.init_velocity_constraints(&mut data, bodies);
            }
        }

        for _ in 0..conf.reg_velocity_iterations {
            for &handle in &self.joints {
                if let Some(joint) = joints.get_mut(handle) {
                    let mut data = SolverData {
                        step: conf,
                        positions: &mut self.positions,
                        velocities: &mut self.velocities,
                    };
                    joint.solve_velocity_constraints(&mut data);
                }
            }
            solver.solve_velocity_constraints(&mut self.velocities);
        }

        Self::store_impulses(&solver, contacts);

        self.integrate_positions(h, conf);

        // Position correction.
        let mut position_solved = false;
        for _ in 0..conf.reg_position_iterations {
            let min_separation = solver.solve_position_constraints(
                &mut self.positions,
                conf.reg_resolution_rate,
                conf.max_linear_correction,
                None,
            );
            let contacts_okay = min_separation >= -3.0 * crate::core::LINEAR_SLOP;

            let mut joints_okay = true;
            for &handle in &self.joints {
                if let Some(joint) = joints.get_mut(handle) {
                    let mut data = SolverData {
                        step: conf,
                        positions: &mut self.positions,
                        velocities: &mut self.velocities,
                    };
                    let joint_okay = joint.solve_position_constraints(&mut data);
                    joints_okay = joints_okay && joint_okay;
                }
            }

            if contacts_okay && joints_okay {
                position_solved = true;
                break;
            }
        }

        // Copy the solved state back to the bodies.
        for (i, &handle) in self.bodies.iter().enumerate() {
            if let Some(body) = bodies.get_mut(handle) {
                body.sweep_mut().c = self.positions[i].c;
                body.sweep_mut().a = self.positions[i].a;
                body.set_velocity_internal(self.velocities[i].v, self.velocities[i].w);
                body.synchronize_transform();
            }
        }

        if let Some(listener) = listener.as_deref_mut() {
            Self::report(&solver, contacts, listener, conf.reg_velocity_iterations);
        }

        let mut bodies_slept = 0;
        if allow_sleep {
            bodies_slept = self.update_sleep(conf, position_solved, bodies);
        }

        IslandSolveResults {
            solved: position_solved,
            bodies_slept,
        }
    }

    /// Integrates island positions from island velocities with the
    /// step's translation and rotation clamps
    fn integrate_positions(&mut self, h: f32, conf: &StepConf) {
        for (position, velocity) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            let mut v = velocity.v;
            let mut w = velocity.w;

            let translation = v * h;
            if translation.length_squared() > conf.max_translation * conf.max_translation {
                v *= conf.max_translation / translation.length();
            }

            let rotation = h * w;
            if rotation * rotation > conf.max_rotation * conf.max_rotation {
                w *= conf.max_rotation / rotation.abs();
            }

            position.c += v * h;
            position.a += h * w;
            velocity.v = v;
            velocity.w = w;
        }
    }

    /// Applies the sleep policy, returning the number of bodies slept
    fn update_sleep(
        &self,
        conf: &StepConf,
        position_solved: bool,
        bodies: &mut BodyStorage<Body>,
    ) -> u32 {
        let lin_tol_sq = conf.linear_sleep_tolerance * conf.linear_sleep_tolerance;
        let ang_tol_sq = conf.angular_sleep_tolerance * conf.angular_sleep_tolerance;

        let mut min_sleep_time = f32::MAX;
        for &handle in &self.bodies {
            let body = match bodies.get_mut(handle) {
                Some(body) => body,
                None => continue,
            };
            if body.body_type() == BodyType::Static {
                continue;
            }

            let still = body.is_sleeping_allowed()
                && body.angular_velocity() * body.angular_velocity() <= ang_tol_sq
                && body.linear_velocity().length_squared() <= lin_tol_sq;

            if still {
                let time = body.sleep_time() + conf.dt;
                body.set_sleep_time(time);
                min_sleep_time = min_sleep_time.min(time);
            } else {
                body.set_sleep_time(0.0);
                min_sleep_time = 0.0;
            }
        }

        let mut slept = 0;
        if min_sleep_time >= conf.min_still_time_to_sleep && position_solved {
            for &handle in &self.bodies {
                if let Some(body) = bodies.get_mut(handle) {
                    if body.body_type() != BodyType::Static && body.is_awake() {
                        body.set_awake(false);
                        slept += 1;
                    }
                }
            }
        }
        slept
    }

    /// Solves a TOI sub-step for an island anchored on two bodies
    ///
    /// Only the anchor bodies receive position corrections; their
    /// neighbors participate with infinite mass so the local fix does
    /// not ripple. Velocity constraints carry no restitution bias.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn solve_toi(
        &mut self,
        sub_conf: &StepConf,
        toi_index_a: usize,
        toi_index_b: usize,
        bodies: &mut BodyStorage<Body>,
        contacts: &mut ContactStorage<Contact>,
        mut listener: Option<&mut (dyn ContactListener + '_)>,
    ) {
        debug_assert!(toi_index_a < self.bodies.len());
        debug_assert!(toi_index_b < self.bodies.len());

        self.positions.clear();
        self.velocities.clear();

        for &handle in &self.bodies {
            let body = match bodies.get(handle) {
                Some(body) => body,
                None => continue,
            };
            self.positions.push(Position {
                c: body.sweep().c,
                a: body.sweep().a,
            });
            self.velocities.push(Velocity {
                v: body.linear_velocity(),
                w: body.angular_velocity(),
            });
        }

        let sources = self.gather_contact_sources(bodies, contacts);
        let mut solver = ContactSolver::new(&sources, sub_conf.dt_ratio, false);

        // Resolve the overlap at the TOI before moving on.
        for _ in 0..sub_conf.toi_position_iterations {
            let min_separation = solver.solve_position_constraints(
                &mut self.positions,
                sub_conf.toi_resolution_rate,
                sub_conf.max_linear_correction,
                Some((toi_index_a, toi_index_b)),
            );
            if min_separation >= -1.5 * crate::core::LINEAR_SLOP {
                break;
            }
        }

        // The checkpoint the next TOI query interpolates from.
        for (i, &handle) in self.bodies.iter().enumerate() {
            if i == toi_index_a || i == toi_index_b {
                if let Some(body) = bodies.get_mut(handle) {
                    body.sweep_mut().c0 = self.positions[i].c;
                    body.sweep_mut().a0 = self.positions[i].a;
                }
            }
        }

        solver.initialize_velocity_constraints(&self.positions, &self.velocities, f32::INFINITY);

        for _ in 0..sub_conf.toi_velocity_iterations {
            solver.solve_velocity_constraints(&mut self.velocities);
        }

        Self::store_impulses(&solver, contacts);

        self.integrate_positions(sub_conf.dt, sub_conf);

        for (i, &handle) in self.bodies.iter().enumerate() {
            if let Some(body) = bodies.get_mut(handle) {
                body.sweep_mut().c = self.positions[i].c;
                body.sweep_mut().a = self.positions[i].a;
                body.set_velocity_internal(self.velocities[i].v, self.velocities[i].w);
                body.synchronize_transform();
            }
        }

        if let Some(listener) = listener.as_deref_mut() {
            Self::report(&solver, contacts, listener, sub_conf.toi_velocity_iterations);
        }
    }

    /// Reports solved impulses through the contact listener
    fn report(
        solver: &ContactSolver,
        contacts: &ContactStorage<Contact>,
        listener: &mut dyn ContactListener,
        iterations: u32,
    ) {
        for solved in solver.impulses() {
            if let Some(contact) = contacts.get(solved.contact) {
                let impulses = ContactImpulses {
                    normal: solved.normal,
                    tangent: solved.tangent,
                    count: solved.count,
                };
                listener.post_solve(contact, &impulses, iterations);
            }
        }
    }
}
