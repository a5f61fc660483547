/// Type of rigid body, determining how it behaves in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyType {
    /// Static bodies never move and have no velocity or mass
    #[default]
    Static,

    /// Kinematic bodies carry velocity but are unaffected by forces
    /// or impacts
    Kinematic,

    /// Dynamic bodies are fully simulated with mass and velocity
    Dynamic,
}

impl BodyType {
    /// Returns whether bodies of this type can have a velocity
    #[inline]
    pub fn is_speedable(&self) -> bool {
        !matches!(self, BodyType::Static)
    }

    /// Returns whether bodies of this type respond to forces and impulses
    #[inline]
    pub fn is_accelerable(&self) -> bool {
        matches!(self, BodyType::Dynamic)
    }
}
