use crate::core::AABB_EXTENSION;
use crate::math::{Aabb, RayCastInput, Vec2};

/// Sentinel index meaning "no node"
pub const NULL_NODE: i32 = -1;

/// Multiplier applied to a proxy's displacement when predicting motion
const DISPLACEMENT_MULTIPLIER: f32 = 2.0;

#[derive(Debug, Clone)]
struct TreeNode<T> {
    /// Fat AABB enclosing the node's subtree
    aabb: Aabb,

    /// Payload stored on leaves
    user_data: Option<T>,

    /// Parent when allocated, next free index otherwise
    parent_or_next: i32,

    child1: i32,
    child2: i32,

    /// Leaf = 0, free = -1
    height: i32,
}

impl<T> TreeNode<T> {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// A balanced binary tree of fat AABBs used by the broad-phase
///
/// Leaves are proxies holding user data; internal nodes enclose their
/// children. Stored AABBs are expanded beyond the tight bounds so that
/// small movements do not force re-insertion.
#[derive(Debug, Clone)]
pub struct DynamicTree<T> {
    nodes: Vec<TreeNode<T>>,
    root: i32,
    free_list: i32,
}

impl<T: Clone> DynamicTree<T> {
    /// Creates a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: NULL_NODE,
        }
    }

    fn allocate_node(&mut self) -> i32 {
        if self.free_list == NULL_NODE {
            self.nodes.push(TreeNode {
                aabb: Aabb::default(),
                user_data: None,
                parent_or_next: NULL_NODE,
                child1: NULL_NODE,
                child2: NULL_NODE,
                height: -1,
            });
            return (self.nodes.len() - 1) as i32;
        }

        let id = self.free_list;
        let node = &mut self.nodes[id as usize];
        self.free_list = node.parent_or_next;
        node.parent_or_next = NULL_NODE;
        node.child1 = NULL_NODE;
        node.child2 = NULL_NODE;
        node.height = 0;
        id
    }

    fn free_node(&mut self, id: i32) {
        let node = &mut self.nodes[id as usize];
        node.user_data = None;
        node.height = -1;
        node.parent_or_next = self.free_list;
        self.free_list = id;
    }

    /// Creates a proxy for the given tight AABB and returns its id
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> i32 {
        let id = self.allocate_node();
        self.nodes[id as usize].aabb = aabb.expand(AABB_EXTENSION);
        self.nodes[id as usize].user_data = Some(user_data);
        self.nodes[id as usize].height = 0;
        self.insert_leaf(id);
        id
    }

    /// Removes a proxy from the tree
    pub fn destroy_proxy(&mut self, id: i32) {
        debug_assert!(self.nodes[id as usize].is_leaf());
        self.remove_leaf(id);
        self.free_node(id);
    }

    /// Moves a proxy to a new tight AABB
    ///
    /// Returns true when the proxy had to be re-inserted, meaning the
    /// caller should mark it for pair generation. The stored fat AABB
    /// absorbs small motions.
    pub fn move_proxy(&mut self, id: i32, aabb: &Aabb, displacement: Vec2) -> bool {
        debug_assert!(self.nodes[id as usize].is_leaf());

        let fat = aabb
            .expand(AABB_EXTENSION)
            .displace(displacement * DISPLACEMENT_MULTIPLIER);

        if self.nodes[id as usize].aabb.contains(aabb) {
            return false;
        }

        self.remove_leaf(id);
        self.nodes[id as usize].aabb = fat;
        self.insert_leaf(id);
        true
    }

    /// Returns the user data of a proxy
    pub fn user_data(&self, id: i32) -> &T {
        self.nodes[id as usize]
            .user_data
            .as_ref()
            .expect("proxy id does not refer to a leaf")
    }

    /// Returns the fat AABB of a proxy
    pub fn fat_aabb(&self, id: i32) -> &Aabb {
        &self.nodes[id as usize].aabb
    }

    fn insert_leaf(&mut self, leaf: i32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent_or_next = NULL_NODE;
            return;
        }

        // Descend toward the sibling that minimizes added surface area.
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut index = self.root;
        while !self.nodes[index as usize].is_leaf() {
            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;

            let area = self.nodes[index as usize].aabb.perimeter();
            let combined_area = self.nodes[index as usize].aabb.union(&leaf_aabb).perimeter();

            // Cost of creating a new parent for this node and the leaf.
            let cost = 2.0 * combined_area;
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost1 = self.descend_cost(child1, &leaf_aabb) + inheritance_cost;
            let cost2 = self.descend_cost(child2, &leaf_aabb) + inheritance_cost;

            if cost < cost1 && cost < cost2 {
                break;
            }

            index = if cost1 < cost2 { child1 } else { child2 };
        }

        let sibling = index;

        // Splice in a new parent.
        let old_parent = self.nodes[sibling as usize].parent_or_next;
        let new_parent = self.allocate_node();
        self.nodes[new_parent as usize].parent_or_next = old_parent;
        self.nodes[new_parent as usize].aabb = leaf_aabb.union(&self.nodes[sibling as usize].aabb);
        self.nodes[new_parent as usize].height = self.nodes[sibling as usize].height + 1;
        self.nodes[new_parent as usize].child1 = sibling;
        self.nodes[new_parent as usize].child2 = leaf;
        self.nodes[sibling as usize].parent_or_next = new_parent;
        self.nodes[leaf as usize].parent_or_next = new_parent;

        if old_parent != NULL_NODE {
            if self.nodes[old_parent as usize].child1 == sibling {
                self.nodes[old_parent as usize].child1 = new_parent;
            } else {
                self.nodes[old_parent as usize].child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }

        // Re-fit and re-balance ancestors.
        let mut index = self.nodes[leaf as usize].parent_or_next;
        while index != NULL_NODE {
            index = self.balance(index);

            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;
            self.nodes[index as usize].height = 1 + self.nodes[child1 as usize]
                .height
                .max(self.nodes[child2 as usize].height);
            self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                .aabb
                .union(&self.nodes[child2 as usize].aabb);

            index = self.nodes[index as usize].parent_or_next;
        }
    }

    fn descend_cost(&self, child: i32, leaf_aabb: &Aabb) -> f32 {
        let child_aabb = &self.nodes[child as usize].aabb;
        let combined = leaf_aabb.union(child_aabb).perimeter();
        if self.nodes[child as usize].is_leaf() {
            combined
        } else {
            combined - child_aabb.perimeter()
        }
    }

    fn remove_leaf(&mut self, leaf: i32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent_or_next;
        let grand_parent = self.nodes[parent as usize].parent_or_next;
        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grand_parent != NULL_NODE {
            if self.nodes[grand_parent as usize].child1 == parent {
                self.nodes[grand_parent as usize].child1 = sibling;
            } else {
                self.nodes[grand_parent as usize].child2 = sibling;
            }
            self.nodes[sibling as usize].parent_or_next = grand_parent;
            self.free_node(parent);

            let mut index = grand_parent;
            while index != NULL_NODE {
                index = self.balance(index);

                let child1 = self.nodes[index as usize].child1;
                let child2 = self.nodes[index as usize].child2;
                self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                    .aabb
                    .union(&self.nodes[child2 as usize].aabb);
                self.nodes[index as usize].height = 1 + self.nodes[child1 as usize]
                    .height
                    .max(self.nodes[child2 as usize].height);

                index = self.nodes[index as usize].parent_or_next;
            }
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent_or_next = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Performs a left or right rotation when the subtree at `a` is
    /// unbalanced, returning the new subtree root
    fn balance(&mut self, a: i32) -> i32 {
        if self.nodes[a as usize].is_leaf() || self.nodes[a as usize].height < 2 {
            return a;
        }

        let b = self.nodes[a as usize].child1;
        let c = self.nodes[a as usize].child2;
        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        if balance > 1 {
            return self.rotate_up(a, c, b, true);
        }
        if balance < -1 {
            return self.rotate_up(a, b, c, false);
        }

        a
    }

    /// Promotes `promoted` above `a`, demoting `other` to keep the
    /// tree's invariants; `promoted_is_child2` selects the direction
    fn rotate_up(&mut self, a: i32, promoted: i32, other: i32, promoted_is_child2: bool) -> i32 {
        let f = self.nodes[promoted as usize].child1;
        let g = self.nodes[promoted as usize].child2;

        self.nodes[promoted as usize].child1 = a;
        self.nodes[promoted as usize].parent_or_next = self.nodes[a as usize].parent_or_next;
        self.nodes[a as usize].parent_or_next = promoted;

        let parent = self.nodes[promoted as usize].parent_or_next;
        if parent != NULL_NODE {
            if self.nodes[parent as usize].child1 == a {
                self.nodes[parent as usize].child1 = promoted;
            } else {
                self.nodes[parent as usize].child2 = promoted;
            }
        } else {
            self.root = promoted;
        }

        // Move the taller grandchild up under the old root.
        let (keep, give) = if self.nodes[f as usize].height > self.nodes[g as usize].height {
            (f, g)
        } else {
            (g, f)
        };

        self.nodes[promoted as usize].child2 = keep;
        if promoted_is_child2 {
            self.nodes[a as usize].child2 = give;
        } else {
            self.nodes[a as usize].child1 = give;
        }
        self.nodes[give as usize].parent_or_next = a;

        self.nodes[a as usize].aabb = self.nodes[other as usize]
            .aabb
            .union(&self.nodes[give as usize].aabb);
        self.nodes[promoted as usize].aabb = self.nodes[a as usize]
            .aabb
            .union(&self.nodes[keep as usize].aabb);

        self.nodes[a as usize].height = 1 + self.nodes[other as usize]
            .height
            .max(self.nodes[give as usize].height);
        self.nodes[promoted as usize].height = 1 + self.nodes[a as usize]
            .height
            .max(self.nodes[keep as usize].height);

        promoted
    }

    /// Returns the height of the tree
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Returns the maximum height difference between any node's children
    pub fn max_balance(&self) -> i32 {
        let mut max_balance = 0;
        for node in &self.nodes {
            if node.height <= 1 {
                continue;
            }
            let balance = (self.nodes[node.child2 as usize].height
                - self.nodes[node.child1 as usize].height)
                .abs();
            max_balance = max_balance.max(balance);
        }
        max_balance
    }

    /// Returns the ratio of total node perimeter to root perimeter
    ///
    /// A quality metric: lower values mean a tighter tree.
    pub fn area_ratio(&self) -> f32 {
        if self.root == NULL_NODE {
            return 0.0;
        }

        let root_area = self.nodes[self.root as usize].aabb.perimeter();
        let mut total_area = 0.0;
        for node in &self.nodes {
            if node.height < 0 {
                continue;
            }
            total_area += node.aabb.perimeter();
        }

        total_area / root_area
    }

    /// Visits every proxy whose fat AABB overlaps the query AABB
    ///
    /// The visitor returns false to terminate the query early.
    pub fn query(&self, aabb: &Aabb, mut visit: impl FnMut(i32) -> bool) {
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }

            let node = &self.nodes[id as usize];
            if !node.aabb.overlaps(aabb) {
                continue;
            }

            if node.is_leaf() {
                if !visit(id) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Casts a ray through the tree, visiting candidate proxies
    ///
    /// The visitor returns a new maximum fraction: zero terminates the
    /// cast, the input's fraction continues unchanged, and anything in
    /// between clips the remaining segment.
    pub fn ray_cast(&self, input: &RayCastInput, mut visit: impl FnMut(&RayCastInput, i32) -> f32) {
        let p1 = input.p1;
        let p2 = input.p2;
        let mut r = p2 - p1;
        debug_assert!(r.length_squared() > 0.0);
        r = r.normalize();

        // v is perpendicular to the segment.
        let v = r.perpendicular();
        let abs_v = v.abs();

        let mut max_fraction = input.max_fraction;

        let mut segment_aabb = {
            let t = p1 + (p2 - p1) * max_fraction;
            Aabb::new(p1.min(&t), p1.max(&t))
        };

        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }

            let node = &self.nodes[id as usize];
            if !node.aabb.overlaps(&segment_aabb) {
                continue;
            }

            // Separating axis test against the segment's direction.
            let c = node.aabb.center();
            let h = node.aabb.half_extents();
            let separation = v.dot(&(p1 - c)).abs() - abs_v.dot(&h);
            if separation > 0.0 {
                continue;
            }

            if node.is_leaf() {
                let sub_input = RayCastInput {
                    p1,
                    p2,
                    max_fraction,
                };

                let value = visit(&sub_input, id);
                if value == 0.0 {
                    return;
                }

                if value > 0.0 {
                    max_fraction = value;
                    let t = p1 + (p2 - p1) * max_fraction;
                    segment_aabb = Aabb::new(p1.min(&t), p1.max(&t));
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }
}

impl<T: Clone> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
