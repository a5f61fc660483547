use crate::bodies::Fixture;
use crate::collision::{Manifold, MAX_MANIFOLD_POINTS};
use crate::core::{BodyHandle, Contact, FixtureId, JointHandle};

/// Solver impulses reported to `ContactListener::post_solve`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactImpulses {
    /// Normal impulse per manifold point
    pub normal: [f32; MAX_MANIFOLD_POINTS],

    /// Tangent impulse per manifold point
    pub tangent: [f32; MAX_MANIFOLD_POINTS],

    /// Number of valid entries
    pub count: usize,
}

/// Receives contact lifecycle notifications during a step
///
/// All methods are called synchronously with the world locked, so
/// implementations must not create or destroy bodies, fixtures, or
/// joints; defer such work until the step returns.
pub trait ContactListener {
    /// Two fixtures have started touching
    fn begin_contact(&mut self, _contact: &Contact) {}

    /// Two fixtures have stopped touching
    fn end_contact(&mut self, _contact: &Contact) {}

    /// A touching contact is about to be solved
    ///
    /// The previous manifold is provided; disabling the contact here
    /// skips its response for this step only.
    fn pre_solve(&mut self, _contact: &mut Contact, _old_manifold: &Manifold) {}

    /// A contact has been solved with the given impulses
    fn post_solve(&mut self, _contact: &Contact, _impulses: &ContactImpulses, _iterations: u32) {}
}

/// Vetoes contact creation between fixture pairs
pub trait ContactFilter {
    /// Returns whether the two fixtures should be allowed to collide
    fn should_collide(&self, _fixture_a: &Fixture, _fixture_b: &Fixture) -> bool {
        true
    }
}

/// Notified when attached objects are destroyed implicitly
///
/// Destroying a body destroys its fixtures and joints as a cascade;
/// this listener is how user code learns about the casualties.
pub trait DestructionListener {
    /// A fixture is being destroyed along with its body
    fn say_goodbye_fixture(&mut self, _body: BodyHandle, _fixture: FixtureId) {}

    /// A joint is being destroyed because one of its bodies died
    fn say_goodbye_joint(&mut self, _joint: JointHandle) {}
}

/// Statistics for the pre-solve phase of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreStepStats {
    /// Contacts skipped because neither body could move
    pub ignored: u32,

    /// Contacts destroyed because their proxies separated
    pub destroyed: u32,

    /// Contacts whose manifolds were recomputed
    pub updated: u32,

    /// Contacts created from new broad-phase pairs
    pub added: u32,
}

/// Statistics for the regular solver phase of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegStepStats {
    /// Islands assembled
    pub islands_found: u32,

    /// Islands whose position constraints fully converged
    pub islands_solved: u32,

    /// Contacts added to islands
    pub contacts_added: u32,

    /// Bodies put to sleep at the end of the phase
    pub bodies_slept: u32,
}

/// Statistics for the TOI phase of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToiStepStats {
    /// Mini islands assembled around TOI events
    pub islands_found: u32,

    /// Contacts inspected for a time of impact
    pub contacts_checked: u32,

    /// Contacts added while rebuilding TOI islands
    pub contacts_added: u32,
}

/// Per-phase statistics returned by `World::step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepStats {
    pub pre: PreStepStats,
    pub reg: RegStepStats,
    pub toi: ToiStepStats,
}
