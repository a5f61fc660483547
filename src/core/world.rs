use crate::bodies::{Body, BodyDef, BodyType, Fixture, FixtureDef};
use crate::collision::{time_of_impact, ToiInput, ToiState};
use crate::constraints::Joint;
use crate::core::contact_manager::ContactManager;
use crate::core::island::Island;
use crate::core::storage::{BodyStorage, JointStorage, Storage};
use crate::core::{
    BodyHandle, Contact, ContactFilter, ContactHandle, ContactListener, DestructionListener,
    FixtureId, JointEdge, JointHandle, StepConf, StepStats, MAX_VERTEX_RADIUS, MIN_VERTEX_RADIUS,
};
use crate::error::PhysicsError;
use crate::math::{Aabb, RayCastBehavior, RayCastInput, Vec2};
use crate::Result;
use bitflags::bitflags;
use std::collections::HashSet;

bitflags! {
    /// World state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct WorldFlags: u32 {
        /// A step is in progress; structural mutation is forbidden
        const LOCKED = 0x01;

        /// Fixtures were added since the last pair update
        const NEW_FIXTURE = 0x02;

        /// The previous step ran to completion
        const STEP_COMPLETE = 0x04;

        /// Stop after the first TOI sub-step of each step
        const SUB_STEPPING = 0x08;
    }
}

/// Parameters for creating a world
#[derive(Debug, Clone)]
pub struct WorldDef {
    /// Acceleration applied to all dynamic bodies
    pub gravity: Vec2,

    /// Length tolerance used by the solvers
    pub linear_slop: f32,

    /// Angle tolerance used by the joint limits
    pub angular_slop: f32,

    /// Largest vertex radius accepted on fixture creation
    pub max_vertex_radius: f32,
}

impl Default for WorldDef {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.8),
            linear_slop: crate::core::LINEAR_SLOP,
            angular_slop: crate::core::ANGULAR_SLOP,
            max_vertex_radius: MAX_VERTEX_RADIUS,
        }
    }
}

/// The physics world: bodies, joints, contacts, and the stepper
///
/// All simulation state lives here; there is no process-wide state.
/// Structural changes are rejected while a step is running, so
/// listener callbacks must defer them.
pub struct World {
    bodies: BodyStorage<Body>,
    joints: JointStorage<Box<dyn Joint>>,
    contact_manager: ContactManager,

    gravity: Vec2,
    linear_slop: f32,
    angular_slop: f32,
    max_vertex_radius: f32,

    flags: WorldFlags,
    allow_sleep: bool,

    /// Inverse delta time of the previous step, for dt-ratio scaling
    inv_dt0: f32,

    next_fixture_id: u32,

    /// Reusable island solve buffers
    island: Island,

    contact_listener: Option<Box<dyn ContactListener>>,
    contact_filter: Option<Box<dyn ContactFilter>>,
    destruction_listener: Option<Box<dyn DestructionListener>>,
}

impl World {
    /// Creates a new world from a definition
    pub fn new(def: WorldDef) -> Self {
        debug_assert!(def.gravity.is_valid());

        Self {
            bodies: BodyStorage::new(),
            joints: JointStorage::new(),
            contact_manager: ContactManager::new(),
            gravity: def.gravity,
            linear_slop: def.linear_slop,
            angular_slop: def.angular_slop,
            max_vertex_radius: def.max_vertex_radius,
            flags: WorldFlags::STEP_COMPLETE,
            allow_sleep: true,
            inv_dt0: 0.0,
            next_fixture_id: 1,
            island: Island::new(),
            contact_listener: None,
            contact_filter: None,
            destruction_listener: None,
        }
    }

    /// Returns the gravity vector
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Sets the gravity vector
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    /// Returns the world's length tolerance
    pub fn linear_slop(&self) -> f32 {
        self.linear_slop
    }

    /// Returns the world's angle tolerance
    pub fn angular_slop(&self) -> f32 {
        self.angular_slop
    }

    /// Returns whether a step is currently in progress
    pub fn is_locked(&self) -> bool {
        self.flags.contains(WorldFlags::LOCKED)
    }

    /// Enables or disables automatic sleeping world-wide
    pub fn set_allow_sleeping(&mut self, allow: bool) {
        if allow == self.allow_sleep {
            return;
        }
        self.allow_sleep = allow;
        if !allow {
            for (_, body) in self.bodies.iter_mut() {
                body.set_awake(true);
            }
        }
    }

    /// Returns whether the previous step ran to completion
    ///
    /// Only false while single sub-step mode is walking a step through
    /// its TOI events.
    pub fn is_step_complete(&self) -> bool {
        self.flags.contains(WorldFlags::STEP_COMPLETE)
    }

    /// Enables or disables single sub-step mode for the TOI phase
    pub fn set_sub_stepping(&mut self, sub_stepping: bool) {
        if sub_stepping {
            self.flags.insert(WorldFlags::SUB_STEPPING);
        } else {
            self.flags.remove(WorldFlags::SUB_STEPPING);
        }
    }

    /// Installs the contact lifecycle listener
    pub fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        self.contact_listener = Some(listener);
    }

    /// Removes the contact lifecycle listener
    pub fn clear_contact_listener(&mut self) {
        self.contact_listener = None;
    }

    /// Installs a custom contact filter, replacing the category-mask
    /// default
    pub fn set_contact_filter(&mut self, filter: Box<dyn ContactFilter>) {
        self.contact_filter = Some(filter);
    }

    /// Installs the destruction listener
    pub fn set_destruction_listener(&mut self, listener: Box<dyn DestructionListener>) {
        self.destruction_listener = Some(listener);
    }

    /// Returns the number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Returns the number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Returns the number of contacts
    pub fn contact_count(&self) -> usize {
        self.contact_manager.contact_count()
    }

    /// Returns all body handles in creation order
    pub fn body_handles(&self) -> Vec<BodyHandle> {
        self.bodies.handles()
    }

    /// Returns all joint handles in creation order
    pub fn joint_handles(&self) -> Vec<JointHandle> {
        self.joints.handles()
    }

    /// Returns all contact handles in creation order
    pub fn contact_handles(&self) -> Vec<ContactHandle> {
        self.contact_manager.contacts.handles()
    }

    /// Gets a reference to a body
    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.bodies.get_body(handle)
    }

    /// Gets a mutable reference to a body
    ///
    /// Pose changes must go through `set_body_transform` so the
    /// broad-phase stays in sync.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies.get_body_mut(handle)
    }

    /// Gets a reference to a joint
    pub fn joint(&self, handle: JointHandle) -> Result<&Box<dyn Joint>> {
        self.joints.get_joint(handle)
    }

    /// Gets a mutable reference to a joint
    pub fn joint_mut(&mut self, handle: JointHandle) -> Result<&mut Box<dyn Joint>> {
        self.joints.get_joint_mut(handle)
    }

    /// Gets a reference to a contact
    pub fn contact(&self, handle: ContactHandle) -> Result<&Contact> {
        self.contact_manager.contacts.get_contact(handle)
    }

    /// Returns the bodies storage for joint constructors
    pub fn bodies(&self) -> &BodyStorage<Body> {
        &self.bodies
    }

    /// Returns the height of the broad-phase tree
    pub fn tree_height(&self) -> i32 {
        self.contact_manager.broad_phase.tree_height()
    }

    /// Returns the balance of the broad-phase tree
    pub fn tree_balance(&self) -> i32 {
        self.contact_manager.broad_phase.tree_balance()
    }

    /// Returns the quality metric of the broad-phase tree
    pub fn tree_quality(&self) -> f32 {
        self.contact_manager.broad_phase.tree_quality()
    }

    /// Returns the inverse delta time of the previous step
    pub fn previous_inv_dt(&self) -> f32 {
        self.inv_dt0
    }

    // === Lifecycle ===

    /// Creates a body from a definition
    pub fn create_body(&mut self, def: &BodyDef) -> Result<BodyHandle> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }
        Ok(self.bodies.add(Body::new(def)))
    }

    /// Destroys a body along with its fixtures, contacts, and joints
    ///
    /// The destruction listener hears about each implicitly destroyed
    /// fixture and joint.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }
        self.bodies.get_body(handle)?;

        // Cascade to joints first so their edges disappear from peers.
        let joint_handles: Vec<JointHandle> = self
            .bodies
            .get_body(handle)?
            .joint_edges()
            .iter()
            .map(|edge| edge.joint)
            .collect();
        for joint_handle in joint_handles {
            if let Some(listener) = self.destruction_listener.as_deref_mut() {
                listener.say_goodbye_joint(joint_handle);
            }
            self.remove_joint_internal(joint_handle);
        }

        // Then contacts.
        let contact_handles: Vec<ContactHandle> = self
            .bodies
            .get_body(handle)?
            .contact_edges()
            .iter()
            .map(|edge| edge.contact)
            .collect();
        for contact_handle in contact_handles {
            self.contact_manager.destroy_contact(
                contact_handle,
                &mut self.bodies,
                self.contact_listener.as_deref_mut(),
            );
        }

        // Finally fixtures and their proxies.
        if let Some(body) = self.bodies.get_mut(handle) {
            for fixture in &mut body.fixtures {
                if let Some(listener) = self.destruction_listener.as_deref_mut() {
                    listener.say_goodbye_fixture(handle, fixture.id());
                }
                fixture.destroy_proxies(&mut self.contact_manager.broad_phase);
            }
            body.fixtures.clear();
        }

        self.bodies.remove(handle);
        Ok(())
    }

    /// Creates a fixture on a body from a definition
    pub fn create_fixture(&mut self, handle: BodyHandle, def: &FixtureDef) -> Result<FixtureId> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }

        let vertex_radius = def.shape.vertex_radius();
        if !(MIN_VERTEX_RADIUS..=self.max_vertex_radius).contains(&vertex_radius) {
            return Err(PhysicsError::InvalidParameter(format!(
                "vertex radius {} outside [{}, {}]",
                vertex_radius, MIN_VERTEX_RADIUS, self.max_vertex_radius
            )));
        }
        if def.density < 0.0 || !def.density.is_finite() {
            return Err(PhysicsError::InvalidParameter(
                "fixture density must be finite and non-negative".into(),
            ));
        }

        let id = FixtureId(self.next_fixture_id);
        self.next_fixture_id += 1;

        let body = self.bodies.get_body_mut(handle)?;
        let mut fixture = Fixture::new(id, def);

        if body.is_active() {
            let xf = body.transform();
            fixture.create_proxies(&mut self.contact_manager.broad_phase, handle, &xf);
        }

        body.fixtures.push(fixture);
        if def.density > 0.0 {
            body.reset_mass_data();
        }

        // New proxies may need new contacts before the next step.
        self.flags.insert(WorldFlags::NEW_FIXTURE);

        Ok(id)
    }

    /// Destroys a fixture, removing any contacts attached to it
    pub fn destroy_fixture(&mut self, handle: BodyHandle, id: FixtureId) -> Result<()> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }

        // Drop contacts that reference this fixture.
        let doomed: Vec<ContactHandle> = self
            .bodies
            .get_body(handle)?
            .contact_edges()
            .iter()
            .filter(|edge| {
                self.contact_manager
                    .contacts
                    .get(edge.contact)
                    .map(|c| c.fixture_a() == id || c.fixture_b() == id)
                    .unwrap_or(false)
            })
            .map(|edge| edge.contact)
            .collect();
        for contact_handle in doomed {
            self.contact_manager.destroy_contact(
                contact_handle,
                &mut self.bodies,
                self.contact_listener.as_deref_mut(),
            );
        }

        let body = self.bodies.get_body_mut(handle)?;
        let position = body
            .fixtures
            .iter()
            .position(|f| f.id() == id)
            .ok_or_else(|| {
                PhysicsError::ResourceNotFound(format!("Fixture {:?} not found", id))
            })?;

        let mut fixture = body.fixtures.remove(position);
        fixture.destroy_proxies(&mut self.contact_manager.broad_phase);
        body.reset_mass_data();

        Ok(())
    }

    /// Creates a joint, linking it into both bodies
    ///
    /// When the joint forbids collision, any existing contact between
    /// the bodies is re-filtered away on the next step.
    pub fn create_joint(&mut self, joint: Box<dyn Joint>) -> Result<JointHandle> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }

        let body_a = joint.body_a();
        let body_b = joint.body_b();
        let collide_connected = joint.collide_connected();

        self.bodies.get_body(body_a)?;
        self.bodies.get_body(body_b)?;

        let handle = self.joints.add(joint);

        if let Some(body) = self.bodies.get_mut(body_a) {
            body.joint_edges.push(JointEdge {
                joint: handle,
                other: body_b,
            });
            body.set_awake(true);
        }
        if let Some(body) = self.bodies.get_mut(body_b) {
            body.joint_edges.push(JointEdge {
                joint: handle,
                other: body_a,
            });
            body.set_awake(true);
        }

        if !collide_connected {
            self.flag_contacts_for_filtering(body_a, body_b);
        }

        Ok(handle)
    }

    /// Destroys a joint
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }
        self.joints.get_joint(handle)?;
        self.remove_joint_internal(handle);
        Ok(())
    }

    fn remove_joint_internal(&mut self, handle: JointHandle) {
        let (body_a, body_b, collide_connected) = match self.joints.get(handle) {
            Some(joint) => (joint.body_a(), joint.body_b(), joint.collide_connected()),
            None => return,
        };

        if let Some(body) = self.bodies.get_mut(body_a) {
            body.joint_edges.retain(|edge| edge.joint != handle);
            body.set_awake(true);
        }
        if let Some(body) = self.bodies.get_mut(body_b) {
            body.joint_edges.retain(|edge| edge.joint != handle);
            body.set_awake(true);
        }

        self.joints.remove(handle);

        // The bodies may touch again now that nothing forbids it.
        if !collide_connected {
            self.flag_contacts_for_filtering(body_a, body_b);
        }
    }

    fn flag_contacts_for_filtering(&mut self, body_a: BodyHandle, body_b: BodyHandle) {
        let edges: Vec<ContactHandle> = match self.bodies.get(body_a) {
            Some(body) => body
                .contact_edges()
                .iter()
                .filter(|edge| edge.other == body_b)
                .map(|edge| edge.contact)
                .collect(),
            None => return,
        };
        for handle in edges {
            if let Some(contact) = self.contact_manager.contacts.get_mut(handle) {
                contact.flag_for_filtering();
            }
        }
    }

    /// Schedules every contact of a fixture for re-filtering
    ///
    /// Call after changing a fixture's filter so existing contacts get
    /// re-evaluated on the next step.
    pub fn refilter_fixture(&mut self, handle: BodyHandle, id: FixtureId) -> Result<()> {
        let body = self.bodies.get_body(handle)?;

        let affected: Vec<ContactHandle> = body
            .contact_edges()
            .iter()
            .filter(|edge| {
                self.contact_manager
                    .contacts
                    .get(edge.contact)
                    .map(|c| c.fixture_a() == id || c.fixture_b() == id)
                    .unwrap_or(false)
            })
            .map(|edge| edge.contact)
            .collect();
        for contact_handle in affected {
            if let Some(contact) = self.contact_manager.contacts.get_mut(contact_handle) {
                contact.flag_for_filtering();
            }
        }

        // Touch the proxies so separated-but-allowed pairs regenerate.
        let proxy_ids: Vec<i32> = self
            .bodies
            .get_body(handle)?
            .fixture(id)
            .map(|f| f.proxy_ids().to_vec())
            .unwrap_or_default();
        for proxy_id in proxy_ids {
            self.contact_manager.broad_phase.touch_proxy(proxy_id);
        }
        self.flags.insert(WorldFlags::NEW_FIXTURE);

        Ok(())
    }

    /// Moves a body to a new pose, updating its broad-phase proxies
    pub fn set_body_transform(
        &mut self,
        handle: BodyHandle,
        position: Vec2,
        angle: f32,
    ) -> Result<()> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }

        let body = self.bodies.get_body_mut(handle)?;
        body.set_transform_internal(position, angle);

        let xf = body.transform();
        for fixture in &mut body.fixtures {
            fixture.synchronize(&mut self.contact_manager.broad_phase, &xf, &xf);
        }

        // The moved proxies must produce their pairs before stepping.
        self.flags.insert(WorldFlags::NEW_FIXTURE);
        Ok(())
    }

    /// Changes a body's type, rebuilding its mass and contacts
    pub fn set_body_type(&mut self, handle: BodyHandle, body_type: BodyType) -> Result<()> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }

        let body = self.bodies.get_body_mut(handle)?;
        if body.body_type() == body_type {
            return Ok(());
        }
        body.set_body_type(body_type);

        // Existing contacts were made under the old type's rules.
        let contacts: Vec<ContactHandle> = body
            .contact_edges()
            .iter()
            .map(|edge| edge.contact)
            .collect();
        for contact_handle in contacts {
            self.contact_manager.destroy_contact(
                contact_handle,
                &mut self.bodies,
                self.contact_listener.as_deref_mut(),
            );
        }

        // Touch every proxy so the pairs regenerate.
        if let Some(body) = self.bodies.get(handle) {
            let proxy_ids: Vec<i32> = body
                .fixtures()
                .iter()
                .flat_map(|f| f.proxy_ids().iter().copied())
                .collect();
            for proxy_id in proxy_ids {
                self.contact_manager.broad_phase.touch_proxy(proxy_id);
            }
        }
        self.flags.insert(WorldFlags::NEW_FIXTURE);

        Ok(())
    }

    /// Activates or deactivates a body
    ///
    /// Deactivation removes the body's proxies and contacts; the body
    /// keeps its fixtures and pose.
    pub fn set_body_active(&mut self, handle: BodyHandle, active: bool) -> Result<()> {
        if self.is_locked() {
            return Err(PhysicsError::WorldLocked);
        }

        let body = self.bodies.get_body(handle)?;
        if body.is_active() == active {
            return Ok(());
        }

        if active {
            let body = self.bodies.get_body_mut(handle)?;
            body.set_active_flag(true);
            let xf = body.transform();
            for fixture in &mut body.fixtures {
                fixture.create_proxies(&mut self.contact_manager.broad_phase, handle, &xf);
            }
            self.flags.insert(WorldFlags::NEW_FIXTURE);
        } else {
            let contacts: Vec<ContactHandle> = body
                .contact_edges()
                .iter()
                .map(|edge| edge.contact)
                .collect();
            for contact_handle in contacts {
                self.contact_manager.destroy_contact(
                    contact_handle,
                    &mut self.bodies,
                    self.contact_listener.as_deref_mut(),
                );
            }

            let body = self.bodies.get_body_mut(handle)?;
            body.set_active_flag(false);
            for fixture in &mut body.fixtures {
                fixture.destroy_proxies(&mut self.contact_manager.broad_phase);
            }
        }

        Ok(())
    }

    // === Stepping ===

    /// Advances the simulation by the configured time step
    pub fn step(&mut self, conf: &StepConf) -> StepStats {
        let mut stats = StepStats::default();

        // New fixtures need their initial pairs before collision.
        if self.flags.contains(WorldFlags::NEW_FIXTURE) {
            stats.pre.added += self.contact_manager.find_new_contacts(
                &mut self.bodies,
                &self.joints,
                self.contact_filter.as_deref(),
            );
            self.flags.remove(WorldFlags::NEW_FIXTURE);
        }

        self.flags.insert(WorldFlags::LOCKED);

        self.contact_manager.collide(
            &mut self.bodies,
            &self.joints,
            self.contact_listener.as_deref_mut(),
            self.contact_filter.as_deref(),
            &mut stats.pre,
        );

        // An interrupted sub-stepping pass resumes in the TOI phase
        // before any new regular solving happens.
        if conf.dt > 0.0 && self.flags.contains(WorldFlags::STEP_COMPLETE) {
            self.solve(conf, &mut stats);
        }

        if conf.dt > 0.0 && conf.do_toi {
            self.solve_toi(conf, &mut stats);
        }

        if conf.dt > 0.0 {
            self.inv_dt0 = conf.inv_dt();
        }

        for (_, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }

        self.flags.remove(WorldFlags::LOCKED);
        stats
    }

    /// Runs the regular island-by-island solve
    fn solve(&mut self, conf: &StepConf, stats: &mut StepStats) {
        // Clear island membership from the previous step.
        for (_, body) in self.bodies.iter_mut() {
            body.set_in_island(false);
        }
        for (_, contact) in self.contact_manager.contacts.iter_mut() {
            contact.set_in_island(false);
        }
        let mut joints_in_island: HashSet<JointHandle> = HashSet::new();

        let seeds = self.bodies.handles();
        let mut stack: Vec<BodyHandle> = Vec::new();

        for seed in seeds {
            {
                let body = match self.bodies.get(seed) {
                    Some(body) => body,
                    None => continue,
                };
                if body.is_in_island()
                    || !body.is_awake()
                    || !body.is_active()
                    || !body.body_type().is_speedable()
                {
                    continue;
                }
            }

            // Depth-first flood over touching contacts and joints.
            self.island.clear();
            stack.clear();
            stack.push(seed);
            if let Some(body) = self.bodies.get_mut(seed) {
                body.set_in_island(true);
            }

            while let Some(handle) = stack.pop() {
                let (contact_edges, joint_edges, is_static) = {
                    let body = match self.bodies.get_mut(handle) {
                        Some(body) => body,
                        None => continue,
                    };
                    body.island_index = self.island.add_body(handle);

                    // A body in a moving island must not fall asleep
                    // mid-solve.
                    body.set_awake(true);

                    // Static bodies anchor islands without growing them.
                    if body.body_type() == BodyType::Static {
                        (Vec::new(), Vec::new(), true)
                    } else {
                        (
                            body.contact_edges.clone(),
                            body.joint_edges.clone(),
                            false,
                        )
                    }
                };

                if is_static {
                    continue;
                }

                for edge in contact_edges {
                    let skip = match self.contact_manager.contacts.get(edge.contact) {
                        Some(contact) => {
                            let sensor = self.contact_is_sensor(contact);
                            contact.is_in_island()
                                || !contact.is_enabled()
                                || !contact.is_touching()
                                || sensor
                        }
                        None => true,
                    };
                    if skip {
                        continue;
                    }

                    if let Some(contact) = self.contact_manager.contacts.get_mut(edge.contact) {
                        contact.set_in_island(true);
                    }
                    self.island.add_contact(edge.contact);

                    if let Some(other) = self.bodies.get_mut(edge.other) {
                        if !other.is_in_island() {
                            other.set_in_island(true);
                            stack.push(edge.other);
                        }
                    }
                }

                for edge in joint_edges {
                    if joints_in_island.contains(&edge.joint) {
                        continue;
                    }
                    if self.joints.get(edge.joint).is_none() {
                        continue;
                    }

                    let other_active = self
                        .bodies
                        .get(edge.other)
                        .map(|b| b.is_active())
                        .unwrap_or(false);
                    if !other_active {
                        continue;
                    }

                    joints_in_island.insert(edge.joint);
                    self.island.add_joint(edge.joint);

                    if let Some(other) = self.bodies.get_mut(edge.other) {
                        if !other.is_in_island() {
                            other.set_in_island(true);
                            stack.push(edge.other);
                        }
                    }
                }
            }

            stats.reg.islands_found += 1;

            let results = self.island.solve(
                conf,
                self.gravity,
                self.allow_sleep,
                &mut self.bodies,
                &mut self.contact_manager.contacts,
                &mut self.joints,
                self.contact_listener.as_deref_mut(),
            );
            if results.solved {
                stats.reg.islands_solved += 1;
            }
            stats.reg.bodies_slept += results.bodies_slept;

            // Static bodies may anchor any number of islands.
            for &body_handle in &self.island.bodies {
                if let Some(body) = self.bodies.get_mut(body_handle) {
                    if body.body_type() == BodyType::Static {
                        body.set_in_island(false);
                    }
                }
            }
        }

        // Push the solved poses into the broad-phase.
        for (_, body) in self.bodies.iter_mut() {
            if !body.is_in_island() || body.body_type() == BodyType::Static {
                continue;
            }
            body.synchronize_fixtures_internal(&mut self.contact_manager.broad_phase);
        }

        stats.reg.contacts_added = self.contact_manager.find_new_contacts(
            &mut self.bodies,
            &self.joints,
            self.contact_filter.as_deref(),
        );
    }

    fn contact_is_sensor(&self, contact: &Contact) -> bool {
        let sensor_a = self
            .bodies
            .get(contact.body_a())
            .and_then(|b| b.fixture(contact.fixture_a()))
            .map(|f| f.is_sensor())
            .unwrap_or(false);
        let sensor_b = self
            .bodies
            .get(contact.body_b())
            .and_then(|b| b.fixture(contact.fixture_b()))
            .map(|f| f.is_sensor())
            .unwrap_or(false);
        sensor_a || sensor_b
    }

    /// Computes the time of impact for one contact, if it qualifies
    fn compute_contact_toi(&self, handle: ContactHandle, conf: &StepConf) -> Option<f32> {
        let contact = self.contact_manager.contacts.get(handle)?;

        if !contact.is_enabled() || contact.toi_count > conf.max_sub_steps {
            return None;
        }
        if contact.has_valid_toi() {
            return Some(contact.toi);
        }
        if self.contact_is_sensor(contact) {
            return None;
        }

        let body_a = self.bodies.get(contact.body_a())?;
        let body_b = self.bodies.get(contact.body_b())?;

        let type_a = body_a.body_type();
        let type_b = body_b.body_type();
        debug_assert!(type_a == BodyType::Dynamic || type_b == BodyType::Dynamic);

        let active_a = body_a.is_awake() && type_a != BodyType::Static;
        let active_b = body_b.is_awake() && type_b != BodyType::Static;
        if !active_a && !active_b {
            return None;
        }

        // Two ordinary dynamic bodies rely on the discrete solver;
        // only bullets and non-dynamic pairs get continuous treatment.
        let collide_a = body_a.is_bullet() || type_a != BodyType::Dynamic;
        let collide_b = body_b.is_bullet() || type_b != BodyType::Dynamic;
        if !collide_a && !collide_b {
            return None;
        }

        // Bring both sweeps to the same starting time.
        let mut sweep_a = *body_a.sweep();
        let mut sweep_b = *body_b.sweep();
        let alpha0 = sweep_a.alpha0.max(sweep_b.alpha0);
        debug_assert!(alpha0 < 1.0);
        if sweep_a.alpha0 < alpha0 {
            sweep_a.advance(alpha0);
        }
        if sweep_b.alpha0 < alpha0 {
            sweep_b.advance(alpha0);
        }

        let proxy_a = body_a
            .fixture(contact.fixture_a())?
            .shape()
            .distance_proxy(contact.child_a());
        let proxy_b = body_b
            .fixture(contact.fixture_b())?
            .shape()
            .distance_proxy(contact.child_b());

        let output = time_of_impact(&ToiInput {
            proxy_a,
            proxy_b,
            sweep_a,
            sweep_b,
            t_max: 1.0,
            max_iterations: conf.max_toi_iterations,
            max_root_iterations: conf.max_toi_root_iterations,
        });

        // Scale the sub-interval time back onto the full step.
        let alpha = if output.state == ToiState::Touching {
            (alpha0 + (1.0 - alpha0) * output.t).min(1.0)
        } else {
            1.0
        };

        Some(alpha)
    }

    /// Runs the TOI sub-stepper after the regular solve
    fn solve_toi(&mut self, conf: &StepConf, stats: &mut StepStats) {
        if self.flags.contains(WorldFlags::STEP_COMPLETE) {
            for (_, body) in self.bodies.iter_mut() {
                body.set_in_island(false);
                body.sweep_mut().alpha0 = 0.0;
            }
            for (_, contact) in self.contact_manager.contacts.iter_mut() {
                contact.set_in_island(false);
                contact.toi_count = 0;
                contact.invalidate_toi();
            }
        }

        // Sub-step until no contact has a time of impact inside the
        // remainder of the step.
        loop {
            let mut min_contact: Option<ContactHandle> = None;
            let mut min_alpha = 1.0_f32;

            for handle in self.contact_manager.contacts.handles() {
                stats.toi.contacts_checked += 1;
                let alpha = match self.compute_contact_toi(handle, conf) {
                    Some(alpha) => alpha,
                    None => continue,
                };
                if let Some(contact) = self.contact_manager.contacts.get_mut(handle) {
                    contact.set_toi(alpha);
                }
                if alpha < min_alpha {
                    min_contact = Some(handle);
                    min_alpha = alpha;
                }
            }

            let min_contact = match min_contact {
                Some(handle) if min_alpha < 1.0 - 10.0 * crate::math::EPSILON => handle,
                _ => {
                    self.flags.insert(WorldFlags::STEP_COMPLETE);
                    break;
                }
            };

            let (handle_a, handle_b) = match self.contact_manager.contacts.get(min_contact) {
                Some(contact) => (contact.body_a(), contact.body_b()),
                None => break,
            };

            // Advance the two bodies to the impact time.
            let backup_a = self.bodies.get(handle_a).map(|b| *b.sweep());
            let backup_b = self.bodies.get(handle_b).map(|b| *b.sweep());
            if let Some(body) = self.bodies.get_mut(handle_a) {
                body.advance(min_alpha);
            }
            if let Some(body) = self.bodies.get_mut(handle_b) {
                body.advance(min_alpha);
            }

            // Narrow phase at the impact configuration.
            let touching = {
                let (body_a, body_b) =
                    match (self.bodies.get(handle_a), self.bodies.get(handle_b)) {
                        (Some(a), Some(b)) => (a, b),
                        _ => break,
                    };
                match self.contact_manager.contacts.get_mut(min_contact) {
                    Some(contact) => {
                        let (_, touching, _) = contact.update(body_a, body_b);
                        contact.invalidate_toi();
                        contact.toi_count += 1;
                        touching && contact.is_enabled()
                    }
                    None => break,
                }
            };

            if !touching {
                // A grazing pass; put the bodies back and move on.
                if let (Some(body), Some(sweep)) = (self.bodies.get_mut(handle_a), backup_a) {
                    *body.sweep_mut() = sweep;
                    body.synchronize_transform();
                }
                if let (Some(body), Some(sweep)) = (self.bodies.get_mut(handle_b), backup_b) {
                    *body.sweep_mut() = sweep;
                    body.synchronize_transform();
                }
                continue;
            }

            if let Some(body) = self.bodies.get_mut(handle_a) {
                body.set_awake(true);
            }
            if let Some(body) = self.bodies.get_mut(handle_b) {
                body.set_awake(true);
            }

            // Build a mini island around the impact.
            self.island.clear();
            let index_a = self.island.add_body(handle_a);
            let index_b = self.island.add_body(handle_b);
            if let Some(body) = self.bodies.get_mut(handle_a) {
                body.island_index = index_a;
                body.set_in_island(true);
            }
            if let Some(body) = self.bodies.get_mut(handle_b) {
                body.island_index = index_b;
                body.set_in_island(true);
            }
            if let Some(contact) = self.contact_manager.contacts.get_mut(min_contact) {
                contact.set_in_island(true);
            }
            self.island.add_contact(min_contact);

            for seed in [handle_a, handle_b] {
                let is_dynamic = self
                    .bodies
                    .get(seed)
                    .map(|b| b.body_type() == BodyType::Dynamic)
                    .unwrap_or(false);
                if !is_dynamic {
                    continue;
                }

                let edges = self
                    .bodies
                    .get(seed)
                    .map(|b| b.contact_edges.clone())
                    .unwrap_or_default();
                let seed_is_bullet = self
                    .bodies
                    .get(seed)
                    .map(|b| b.is_bullet())
                    .unwrap_or(false);

                for edge in edges {
                    let contact = match self.contact_manager.contacts.get(edge.contact) {
                        Some(contact) => contact,
                        None => continue,
                    };
                    if contact.is_in_island() {
                        continue;
                    }

                    let other = edge.other;
                    let (other_type, other_bullet, other_in_island) =
                        match self.bodies.get(other) {
                            Some(body) => {
                                (body.body_type(), body.is_bullet(), body.is_in_island())
                            }
                            None => continue,
                        };

                    // Ordinary dynamic neighbors wait for the next
                    // regular solve.
                    if other_type == BodyType::Dynamic && !seed_is_bullet && !other_bullet {
                        continue;
                    }

                    if self.contact_is_sensor(contact) {
                        continue;
                    }

                    // Tentatively move the neighbor to the impact time.
                    let backup = self.bodies.get(other).map(|b| *b.sweep());
                    if !other_in_island {
                        if let Some(body) = self.bodies.get_mut(other) {
                            body.advance(min_alpha);
                        }
                    }

                    let (pair_a, pair_b) = match self.contact_manager.contacts.get(edge.contact) {
                        Some(contact) => (contact.body_a(), contact.body_b()),
                        None => continue,
                    };
                    let touching = {
                        let (body_a, body_b) =
                            match (self.bodies.get(pair_a), self.bodies.get(pair_b)) {
                                (Some(a), Some(b)) => (a, b),
                                _ => continue,
                            };
                        match self.contact_manager.contacts.get_mut(edge.contact) {
                            Some(contact) => {
                                let (_, touching, _) = contact.update(body_a, body_b);
                                touching && contact.is_enabled()
                            }
                            None => continue,
                        }
                    };

                    if !touching {
                        if !other_in_island {
                            if let (Some(body), Some(sweep)) =
                                (self.bodies.get_mut(other), backup)
                            {
                                *body.sweep_mut() = sweep;
                                body.synchronize_transform();
                            }
                        }
                        continue;
                    }

                    if let Some(contact) = self.contact_manager.contacts.get_mut(edge.contact) {
                        contact.set_in_island(true);
                    }
                    self.island.add_contact(edge.contact);
                    stats.toi.contacts_added += 1;

                    if !other_in_island {
                        let index = self.island.add_body(other);
                        if let Some(body) = self.bodies.get_mut(other) {
                            body.island_index = index;
                            body.set_in_island(true);
                            if body.body_type().is_speedable() {
                                body.set_awake(true);
                            }
                        }
                    }
                }
            }

            stats.toi.islands_found += 1;

            // Finish out the step from the impact time.
            let mut sub_conf = conf.clone();
            sub_conf.dt = (1.0 - min_alpha) * conf.dt;
            sub_conf.dt_ratio = 1.0;
            sub_conf.do_warm_start = false;

            self.island.solve_toi(
                &sub_conf,
                index_a,
                index_b,
                &mut self.bodies,
                &mut self.contact_manager.contacts,
                self.contact_listener.as_deref_mut(),
            );

            // Let the island bodies generate new pairs and fresh TOIs.
            let island_bodies = self.island.bodies.clone();
            for body_handle in island_bodies {
                let edges = {
                    let body = match self.bodies.get_mut(body_handle) {
                        Some(body) => body,
                        None => continue,
                    };
                    body.set_in_island(false);
                    if body.body_type() != BodyType::Dynamic {
                        continue;
                    }
                    body.synchronize_fixtures_internal(&mut self.contact_manager.broad_phase);
                    body.contact_edges.clone()
                };
                for edge in edges {
                    if let Some(contact) = self.contact_manager.contacts.get_mut(edge.contact) {
                        contact.invalidate_toi();
                        contact.set_in_island(false);
                    }
                }
            }

            self.contact_manager.find_new_contacts(
                &mut self.bodies,
                &self.joints,
                self.contact_filter.as_deref(),
            );

            if self.flags.contains(WorldFlags::SUB_STEPPING) {
                self.flags.remove(WorldFlags::STEP_COMPLETE);
                break;
            }
        }
    }

    // === Queries ===

    /// Visits every fixture child whose fat AABB overlaps the query box
    ///
    /// The visitor returns false to end the query early.
    pub fn query_aabb(
        &self,
        aabb: &Aabb,
        mut visit: impl FnMut(BodyHandle, FixtureId, usize) -> bool,
    ) {
        self.contact_manager.broad_phase.query(aabb, |proxy_id| {
            let proxy = self.contact_manager.broad_phase.user_data(proxy_id);
            visit(proxy.body, proxy.fixture, proxy.child_index)
        });
    }

    /// Casts a ray through the world, visiting each fixture hit
    ///
    /// The visitor controls the traversal: stop, continue unclipped,
    /// or clip the ray at the reported fraction to find the closest
    /// hit.
    pub fn ray_cast(
        &self,
        p1: Vec2,
        p2: Vec2,
        mut visit: impl FnMut(BodyHandle, FixtureId, Vec2, Vec2, f32) -> RayCastBehavior,
    ) {
        let input = RayCastInput::new(p1, p2);

        self.contact_manager
            .broad_phase
            .ray_cast(&input, |sub_input, proxy_id| {
                let proxy = self.contact_manager.broad_phase.user_data(proxy_id);

                let hit = self.bodies.get(proxy.body).and_then(|body| {
                    body.fixture(proxy.fixture).and_then(|fixture| {
                        fixture
                            .shape()
                            .ray_cast(sub_input, &body.transform(), proxy.child_index)
                    })
                });

                match hit {
                    Some(output) => {
                        let point = sub_input.p1
                            + (sub_input.p2 - sub_input.p1) * output.fraction;
                        match visit(
                            proxy.body,
                            proxy.fixture,
                            point,
                            output.normal,
                            output.fraction,
                        ) {
                            RayCastBehavior::Stop => 0.0,
                            RayCastBehavior::Continue => sub_input.max_fraction,
                            RayCastBehavior::Clip(fraction) => fraction,
                        }
                    }
                    None => sub_input.max_fraction,
                }
            });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldDef::default())
    }
}
