use crate::collision::dynamic_tree::{DynamicTree, NULL_NODE};
use crate::math::{Aabb, RayCastInput, Vec2};
use std::collections::HashSet;

/// Broad-phase collision detection over a dynamic AABB tree
///
/// Tracks which proxies moved since the last pair update and emits
/// candidate pairs for exactly those, each at most once per update.
#[derive(Debug, Clone)]
pub struct BroadPhase<T> {
    tree: DynamicTree<T>,
    move_buffer: Vec<i32>,
    moved: HashSet<i32>,
    pair_buffer: Vec<(i32, i32)>,
    proxy_count: usize,
}

impl<T: Clone> BroadPhase<T> {
    /// Creates a new empty broad-phase
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            move_buffer: Vec::new(),
            moved: HashSet::new(),
            pair_buffer: Vec::new(),
            proxy_count: 0,
        }
    }

    /// Creates a proxy and schedules it for pair generation
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> i32 {
        let id = self.tree.create_proxy(aabb, user_data);
        self.proxy_count += 1;
        self.buffer_move(id);
        id
    }

    /// Destroys a proxy
    pub fn destroy_proxy(&mut self, id: i32) {
        self.unbuffer_move(id);
        self.proxy_count -= 1;
        self.tree.destroy_proxy(id);
    }

    /// Moves a proxy to a new tight AABB
    ///
    /// The proxy is scheduled for pair generation only when it left
    /// its fat AABB.
    pub fn move_proxy(&mut self, id: i32, aabb: &Aabb, displacement: Vec2) {
        if self.tree.move_proxy(id, aabb, displacement) {
            self.buffer_move(id);
        }
    }

    /// Schedules a proxy for pair generation without moving it
    pub fn touch_proxy(&mut self, id: i32) {
        self.buffer_move(id);
    }

    /// Returns the user data attached to a proxy
    pub fn user_data(&self, id: i32) -> &T {
        self.tree.user_data(id)
    }

    /// Returns the fat AABB of a proxy
    pub fn fat_aabb(&self, id: i32) -> &Aabb {
        self.tree.fat_aabb(id)
    }

    /// Tests whether the fat AABBs of two proxies overlap
    pub fn test_overlap(&self, id_a: i32, id_b: i32) -> bool {
        self.tree.fat_aabb(id_a).overlaps(self.tree.fat_aabb(id_b))
    }

    /// Returns the number of live proxies
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Returns the height of the underlying tree
    pub fn tree_height(&self) -> i32 {
        self.tree.height()
    }

    /// Returns the maximum child height imbalance of the tree
    pub fn tree_balance(&self) -> i32 {
        self.tree.max_balance()
    }

    /// Returns the tree's surface-area quality metric
    pub fn tree_quality(&self) -> f32 {
        self.tree.area_ratio()
    }

    fn buffer_move(&mut self, id: i32) {
        if self.moved.insert(id) {
            self.move_buffer.push(id);
        }
    }

    fn unbuffer_move(&mut self, id: i32) {
        if self.moved.remove(&id) {
            if let Some(pos) = self.move_buffer.iter().position(|&m| m == id) {
                self.move_buffer[pos] = NULL_NODE;
            }
        }
    }

    /// Emits every overlapping pair involving a moved proxy
    ///
    /// Pairs are ordered `(min, max)` and deduplicated, so each pair is
    /// reported at most once per call. The moved set is cleared.
    pub fn update_pairs(&mut self, mut emit: impl FnMut(&T, &T)) {
        self.pair_buffer.clear();

        for i in 0..self.move_buffer.len() {
            let query_id = self.move_buffer[i];
            if query_id == NULL_NODE {
                continue;
            }

            let fat_aabb = *self.tree.fat_aabb(query_id);
            let moved = &self.moved;
            let pair_buffer = &mut self.pair_buffer;

            self.tree.query(&fat_aabb, |other_id| {
                if other_id == query_id {
                    return true;
                }

                // When both proxies moved, only the lower id reports
                // the pair.
                if moved.contains(&other_id) && other_id > query_id {
                    return true;
                }

                pair_buffer.push((query_id.min(other_id), query_id.max(other_id)));
                true
            });
        }

        self.move_buffer.clear();
        self.moved.clear();

        self.pair_buffer.sort_unstable();
        self.pair_buffer.dedup();

        for i in 0..self.pair_buffer.len() {
            let (a, b) = self.pair_buffer[i];
            emit(self.tree.user_data(a), self.tree.user_data(b));
        }
    }

    /// Queries the tree for proxies overlapping an AABB
    pub fn query(&self, aabb: &Aabb, visit: impl FnMut(i32) -> bool) {
        self.tree.query(aabb, visit);
    }

    /// Casts a ray through the tree
    pub fn ray_cast(&self, input: &RayCastInput, visit: impl FnMut(&RayCastInput, i32) -> f32) {
        self.tree.ray_cast(input, visit);
    }
}

impl<T: Clone> Default for BroadPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}
