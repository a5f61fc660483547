use crate::collision::DistanceProxy;
use crate::core::POLYGON_VERTEX_RADIUS;
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::{Edge, MassData, Shape};
use std::any::Any;

/// A sequence of edges, typically used for terrain
///
/// Each segment is exposed as one child edge. Interior children carry
/// their neighbor vertices so collisions stay one-sided along the
/// chain. Chains do not collide with themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    /// The vertices of the chain
    vertices: Vec<Vec2>,

    /// Whether the last vertex connects back to the first
    looped: bool,

    /// Ghost vertex before the first vertex of an open chain
    prev_vertex: Option<Vec2>,

    /// Ghost vertex after the last vertex of an open chain
    next_vertex: Option<Vec2>,

    /// Radius of the rounded segment ends
    vertex_radius: f32,
}

impl Chain {
    /// Creates an open chain through the given vertices
    pub fn new(vertices: &[Vec2]) -> Self {
        debug_assert!(vertices.len() >= 2);
        Self {
            vertices: vertices.to_vec(),
            looped: false,
            prev_vertex: None,
            next_vertex: None,
            vertex_radius: POLYGON_VERTEX_RADIUS,
        }
    }

    /// Creates a closed loop through the given vertices
    pub fn new_loop(vertices: &[Vec2]) -> Self {
        debug_assert!(vertices.len() >= 3);
        Self {
            vertices: vertices.to_vec(),
            looped: true,
            prev_vertex: None,
            next_vertex: None,
            vertex_radius: POLYGON_VERTEX_RADIUS,
        }
    }

    /// Sets the ghost vertices that establish one-sided collision at
    /// the open ends of the chain
    pub fn set_ghost_vertices(&mut self, prev: Option<Vec2>, next: Option<Vec2>) {
        self.prev_vertex = prev;
        self.next_vertex = next;
    }

    /// Returns the vertices of the chain
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Returns whether the chain forms a closed loop
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// Returns the child edge at the given index with neighbor
    /// information filled in
    pub fn child_edge(&self, child_index: usize) -> Edge {
        debug_assert!(child_index < self.child_count());
        let count = self.vertices.len();

        let v1 = self.vertices[child_index];
        let v2 = self.vertices[(child_index + 1) % count];

        let ghost1 = if child_index > 0 {
            Some(self.vertices[child_index - 1])
        } else if self.looped {
            Some(self.vertices[count - 1])
        } else {
            self.prev_vertex
        };

        let ghost2 = if child_index + 2 < count {
            Some(self.vertices[child_index + 2])
        } else if self.looped {
            Some(self.vertices[(child_index + 2) % count])
        } else {
            self.next_vertex
        };

        let mut edge = Edge::with_ghosts(v1, v2, ghost1, ghost2);
        edge.vertex_radius = self.vertex_radius;
        edge
    }
}

impl Shape for Chain {
    fn shape_type(&self) -> &'static str {
        "chain"
    }

    fn child_count(&self) -> usize {
        if self.looped {
            self.vertices.len()
        } else {
            self.vertices.len() - 1
        }
    }

    fn vertex_radius(&self) -> f32 {
        self.vertex_radius
    }

    fn compute_aabb(&self, transform: &Transform, child_index: usize) -> Aabb {
        let count = self.vertices.len();
        let v1 = transform.transform_point(self.vertices[child_index]);
        let v2 = transform.transform_point(self.vertices[(child_index + 1) % count]);

        Aabb::new(v1.min(&v2), v1.max(&v2)).expand(self.vertex_radius)
    }

    fn compute_mass(&self, _density: f32) -> MassData {
        // Chains are boundaries, not solids.
        MassData::default()
    }

    fn distance_proxy(&self, child_index: usize) -> DistanceProxy {
        let count = self.vertices.len();
        DistanceProxy::new(
            vec![
                self.vertices[child_index],
                self.vertices[(child_index + 1) % count],
            ],
            self.vertex_radius,
        )
    }

    fn ray_cast(
        &self,
        input: &RayCastInput,
        transform: &Transform,
        child_index: usize,
    ) -> Option<RayCastOutput> {
        self.child_edge(child_index).ray_cast(input, transform, 0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        Box::new(self.clone())
    }
}
