mod broad_phase;
mod collide_circle;
mod collide_edge;
mod collide_polygon;
mod distance;
mod dynamic_tree;
mod manifold;
mod time_of_impact;

pub use broad_phase::BroadPhase;
pub use collide_circle::{collide_circles, collide_polygon_circle};
pub use collide_edge::{collide_edge_circle, collide_edge_polygon};
pub use collide_polygon::collide_polygons;
pub use distance::{distance, test_overlap, DistanceOutput, DistanceProxy, SimplexCache};
pub use dynamic_tree::{DynamicTree, NULL_NODE};
pub use manifold::{
    clip_segment_to_line, ClipVertex, ContactFeature, FeatureKind, Manifold, ManifoldKind,
    ManifoldPoint, WorldManifold, MAX_MANIFOLD_POINTS,
};
pub use time_of_impact::{time_of_impact, SeparationFinder, ToiInput, ToiOutput, ToiState};
