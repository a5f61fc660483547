use crate::bodies::{Body, BodyType, FixtureProxy};
use crate::collision::BroadPhase;
use crate::constraints::Joint;
use crate::core::contact::{mix_friction, mix_restitution, shape_rank};
use crate::core::events::PreStepStats;
use crate::core::storage::{BodyStorage, ContactStorage, JointStorage, Storage};
use crate::core::{BodyHandle, Contact, ContactEdge, ContactFilter, ContactHandle, ContactListener};

/// Owns the broad-phase and all contacts, keeping the two consistent
///
/// New broad-phase pairs become contacts, and contacts whose proxies
/// stop overlapping are destroyed. Narrow-phase refreshes and listener
/// dispatch also run here.
pub struct ContactManager {
    pub(crate) broad_phase: BroadPhase<FixtureProxy>,
    pub(crate) contacts: ContactStorage<Contact>,
}

impl ContactManager {
    /// Creates a new empty contact manager
    pub fn new() -> Self {
        Self {
            broad_phase: BroadPhase::new(),
            contacts: ContactStorage::new(),
        }
    }

    /// Returns the number of live contacts
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Runs broad-phase pair generation and creates contacts for new
    /// pairs, returning how many were added
    pub(crate) fn find_new_contacts(
        &mut self,
        bodies: &mut BodyStorage<Body>,
        joints: &JointStorage<Box<dyn Joint>>,
        filter: Option<&(dyn ContactFilter + '_)>,
    ) -> u32 {
        let mut pairs = Vec::new();
        self.broad_phase.update_pairs(|a, b| pairs.push((*a, *b)));

        let mut added = 0;
        for (proxy_a, proxy_b) in pairs {
            if self.add_pair(proxy_a, proxy_b, bodies, joints, filter) {
                added += 1;
            }
        }
        added
    }

    /// Creates a contact for a broad-phase pair unless a rule forbids it
    fn add_pair(
        &mut self,
        proxy_a: FixtureProxy,
        proxy_b: FixtureProxy,
        bodies: &mut BodyStorage<Body>,
        joints: &JointStorage<Box<dyn Joint>>,
        filter: Option<&(dyn ContactFilter + '_)>,
    ) -> bool {
        // A body never collides with itself.
        if proxy_a.body == proxy_b.body {
            return false;
        }

        // Only one contact may exist per fixture-child pair; scan one
        // body's edges for a duplicate.
        if let Some(body_b) = bodies.get(proxy_b.body) {
            for edge in body_b.contact_edges() {
                if edge.other != proxy_a.body {
                    continue;
                }
                if let Some(contact) = self.contacts.get(edge.contact) {
                    let same = (contact.fixture_a() == proxy_a.fixture
                        && contact.fixture_b() == proxy_b.fixture
                        && contact.child_a() == proxy_a.child_index
                        && contact.child_b() == proxy_b.child_index)
                        || (contact.fixture_a() == proxy_b.fixture
                            && contact.fixture_b() == proxy_a.fixture
                            && contact.child_a() == proxy_b.child_index
                            && contact.child_b() == proxy_a.child_index);
                    if same {
                        return false;
                    }
                }
            }
        }

        if !Self::should_collide_bodies(bodies, joints, proxy_a.body, proxy_b.body) {
            return false;
        }

        let (fixture_a, fixture_b) = match (
            bodies
                .get(proxy_a.body)
                .and_then(|b| b.fixture(proxy_a.fixture)),
            bodies
                .get(proxy_b.body)
                .and_then(|b| b.fixture(proxy_b.fixture)),
        ) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };

        // The registered collision filter wins; the fixture bits are
        // the default policy.
        let allowed = match filter {
            Some(filter) => filter.should_collide(fixture_a, fixture_b),
            None => fixture_a.filter().should_collide(fixture_b.filter()),
        };
        if !allowed {
            return false;
        }

        let sensor = fixture_a.is_sensor() || fixture_b.is_sensor();
        let friction = mix_friction(fixture_a.friction(), fixture_b.friction());
        let restitution = mix_restitution(fixture_a.restitution(), fixture_b.restitution());

        // Order the pair so the shape with the richer collision role
        // takes the A side.
        let flip = shape_rank(fixture_b.shape().as_ref()) > shape_rank(fixture_a.shape().as_ref());
        let (first, second) = if flip {
            (proxy_b, proxy_a)
        } else {
            (proxy_a, proxy_b)
        };

        let contact = Contact::new(
            first.body,
            first.fixture,
            first.child_index,
            second.body,
            second.fixture,
            second.child_index,
            friction,
            restitution,
        );
        let handle = self.contacts.add(contact);

        if let Some(body) = bodies.get_mut(first.body) {
            body.contact_edges.push(ContactEdge {
                contact: handle,
                other: second.body,
            });
        }
        if let Some(body) = bodies.get_mut(second.body) {
            body.contact_edges.push(ContactEdge {
                contact: handle,
                other: first.body,
            });
        }

        if !sensor {
            if let Some(body) = bodies.get_mut(first.body) {
                body.set_awake(true);
            }
            if let Some(body) = bodies.get_mut(second.body) {
                body.set_awake(true);
            }
        }

        true
    }

    /// Returns whether two bodies are allowed to collide at all
    pub(crate) fn should_collide_bodies(
        bodies: &BodyStorage<Body>,
        joints: &JointStorage<Box<dyn Joint>>,
        handle_a: BodyHandle,
        handle_b: BodyHandle,
    ) -> bool {
        let (body_a, body_b) = match (bodies.get(handle_a), bodies.get(handle_b)) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };

        // At least one body must respond to the collision.
        if body_a.body_type() != BodyType::Dynamic && body_b.body_type() != BodyType::Dynamic {
            return false;
        }

        // A joint may forbid collision between the bodies it connects.
        for edge in body_a.joint_edges() {
            if edge.other == handle_b {
                if let Some(joint) = joints.get(edge.joint) {
                    if !joint.collide_connected() {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Destroys a contact, unlinking it from both bodies
    pub(crate) fn destroy_contact(
        &mut self,
        handle: ContactHandle,
        bodies: &mut BodyStorage<Body>,
        listener: Option<&mut (dyn ContactListener + '_)>,
    ) {
        let contact = match self.contacts.get(handle) {
            Some(contact) => contact,
            None => return,
        };

        if contact.is_touching() {
            if let Some(listener) = listener {
                listener.end_contact(contact);
            }
        }

        let body_a = contact.body_a();
        let body_b = contact.body_b();

        if let Some(body) = bodies.get_mut(body_a) {
            body.contact_edges.retain(|edge| edge.contact != handle);
        }
        if let Some(body) = bodies.get_mut(body_b) {
            body.contact_edges.retain(|edge| edge.contact != handle);
        }

        self.contacts.remove(handle);
    }

    /// Refreshes the narrow-phase state of every contact
    ///
    /// Re-filters flagged contacts, destroys contacts whose proxies
    /// separated, updates manifolds, and dispatches begin, end, and
    /// pre-solve callbacks.
    pub(crate) fn collide(
        &mut self,
        bodies: &mut BodyStorage<Body>,
        joints: &JointStorage<Box<dyn Joint>>,
        mut listener: Option<&mut (dyn ContactListener + '_)>,
        filter: Option<&(dyn ContactFilter + '_)>,
        stats: &mut PreStepStats,
    ) {
        for handle in self.contacts.handles() {
            let contact = match self.contacts.get(handle) {
                Some(contact) => contact,
                None => continue,
            };

            let handle_a = contact.body_a();
            let handle_b = contact.body_b();
            let fixture_id_a = contact.fixture_a();
            let fixture_id_b = contact.fixture_b();
            let child_a = contact.child_a();
            let child_b = contact.child_b();

            if contact.needs_filtering() {
                if !Self::should_collide_bodies(bodies, joints, handle_a, handle_b) {
                    self.destroy_contact(handle, bodies, listener.as_deref_mut());
                    stats.destroyed += 1;
                    continue;
                }

                let allowed = match (
                    bodies.get(handle_a).and_then(|b| b.fixture(fixture_id_a)),
                    bodies.get(handle_b).and_then(|b| b.fixture(fixture_id_b)),
                ) {
                    (Some(fixture_a), Some(fixture_b)) => match filter {
                        Some(filter) => filter.should_collide(fixture_a, fixture_b),
                        None => fixture_a.filter().should_collide(fixture_b.filter()),
                    },
                    _ => false,
                };
                if !allowed {
                    self.destroy_contact(handle, bodies, listener.as_deref_mut());
                    stats.destroyed += 1;
                    continue;
                }

                if let Some(contact) = self.contacts.get_mut(handle) {
                    contact.clear_filter_flag();
                }
            }

            let (body_a, body_b) = match (bodies.get(handle_a), bodies.get(handle_b)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };

            // Sleeping pairs keep their state untouched.
            let active_a = body_a.is_awake() && body_a.body_type().is_speedable();
            let active_b = body_b.is_awake() && body_b.body_type().is_speedable();
            if !active_a && !active_b {
                stats.ignored += 1;
                continue;
            }

            let (proxy_id_a, proxy_id_b) = match (
                body_a.fixture(fixture_id_a).and_then(|f| f.proxy_ids().get(child_a)),
                body_b.fixture(fixture_id_b).and_then(|f| f.proxy_ids().get(child_b)),
            ) {
                (Some(a), Some(b)) => (*a, *b),
                _ => {
                    self.destroy_contact(handle, bodies, listener.as_deref_mut());
                    stats.destroyed += 1;
                    continue;
                }
            };

            // The pair ends when the fat AABBs separate.
            if !self.broad_phase.test_overlap(proxy_id_a, proxy_id_b) {
                self.destroy_contact(handle, bodies, listener.as_deref_mut());
                stats.destroyed += 1;
                continue;
            }

            let sensor = body_a
                .fixture(fixture_id_a)
                .map(|f| f.is_sensor())
                .unwrap_or(false)
                || body_b
                    .fixture(fixture_id_b)
                    .map(|f| f.is_sensor())
                    .unwrap_or(false);

            let contact = match self.contacts.get_mut(handle) {
                Some(contact) => contact,
                None => continue,
            };
            let (was_touching, touching, old_manifold) = contact.update(body_a, body_b);
            stats.updated += 1;

            if let Some(listener) = listener.as_deref_mut() {
                if !was_touching && touching {
                    listener.begin_contact(contact);
                }
                if was_touching && !touching {
                    listener.end_contact(contact);
                }
                if touching && !sensor && contact.manifold().point_count() > 0 {
                    listener.pre_solve(contact, &old_manifold);
                }
            }
        }
    }
}

impl Default for ContactManager {
    fn default() -> Self {
        Self::new()
    }
}
