//! Octree broad phase over rigid-body bounding regions
//!
//! Each entry is stored at the lowest node whose extent fully contains its
//! bounding region. Entries that straddle a split plane stay at the internal
//! node instead of being forced into one child. Leaves split lazily once they
//! overflow and subtrees merge back when removals leave them sparse.
//!
//! New bodies never enter the tree directly: they are queued with
//! [`Octree::add_to_pending`] and placed by [`Octree::process_pending`] at a
//! fixed point of the frame.

use crate::debug::DebugDrawSystem;
use crate::foundation::math::Vec4;
use crate::physics::collision::{Aabb, BoundingRegion, Ray};
use crate::physics::{BodyArena, BodyHandle, Lifecycle};
use serde::{Deserialize, Serialize};
use std::mem;

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Resident entries a leaf holds before it splits
    pub max_entries_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Smallest child edge length a split may produce
    pub min_node_size: f32,

    /// Collapse subtrees whose entry count drops to the capacity
    pub merge_on_remove: bool,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entries_per_node: 8,
            max_depth: 8,
            min_node_size: 0.5,
            merge_on_remove: true,
        }
    }
}

/// Errors raised by structural octree operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OctreeError {
    /// The region does not fit inside the root extent
    #[error("bounding region of body {handle:?} lies outside the octree root extent")]
    OutOfBounds {
        /// Body whose region was rejected
        handle: BodyHandle,
    },
}

/// A resident entry: a non-owning body handle and its world-space region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeEntry {
    /// Body this entry stands for
    pub handle: BodyHandle,
    /// World-space region as of the last placement or update
    pub region: BoundingRegion,
}

/// A queued body with its model-space region template
#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    handle: BodyHandle,
    template: BoundingRegion,
}

/// Nearest region hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Body whose region was hit
    pub handle: BodyHandle,
    /// The region the ray entered
    pub region: BoundingRegion,
    /// Entry distance along the ray, zero when the origin is inside
    pub t: f32,
}

impl RayHit {
    fn is_nearer_than(&self, other: &RayHit) -> bool {
        self.t < other.t || (self.t == other.t && self.handle < other.handle)
    }
}

/// What one [`Octree::process_pending`] pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingReport {
    /// Bodies inserted into the tree
    pub placed: usize,
    /// Bodies whose region did not fit the root extent; marked dead
    pub rejected: Vec<BodyHandle>,
}

/// What one [`Octree::update`] pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Bodies advanced by the integrator
    pub integrated: usize,
    /// Entries that changed node
    pub relocated: usize,
    /// Intersecting region pairs found
    pub overlapping_pairs: usize,
    /// Per-body collision responses that reflected a velocity
    pub resolved_collisions: usize,
    /// Bodies whose region left the root extent; no longer in the tree
    pub escaped: Vec<BodyHandle>,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: Aabb,

    entries: Vec<OctreeEntry>,

    /// Empty for a leaf, otherwise exactly 8 octants
    children: Vec<OctreeNode>,

    depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: Vec::new(),
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Entries resident at this node, not including descendants
    pub fn entries(&self) -> &[OctreeEntry] {
        &self.entries
    }

    /// Child octants; empty for a leaf
    pub fn children(&self) -> &[OctreeNode] {
        &self.children
    }

    /// Depth in the tree (0 = root)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn can_subdivide(&self, config: &OctreeConfig) -> bool {
        self.depth < config.max_depth && self.bounds.size().min() * 0.5 >= config.min_node_size
    }

    /// Index of the child that fully contains `bounds`, if any
    ///
    /// A region touching a split plane stays at this node, so regions in
    /// different children are always strictly apart.
    fn child_for(&self, bounds: &Aabb) -> Option<usize> {
        if self.is_leaf() {
            return None;
        }

        let center = self.bounds.center();
        let mut index = 0;
        for axis in 0..3 {
            if bounds.min[axis] > center[axis] {
                index |= 1 << axis;
            } else if bounds.max[axis] >= center[axis] {
                return None;
            }
        }

        self.children[index].bounds.contains_aabb(bounds).then_some(index)
    }

    fn subdivide(&mut self, config: &OctreeConfig) {
        log::trace!("Splitting octree node at depth {} ({} entries)", self.depth, self.entries.len());

        self.children = (0..8)
            .map(|octant| OctreeNode::new(self.bounds.octant(octant), self.depth + 1))
            .collect();

        for entry in mem::take(&mut self.entries) {
            self.insert_contained(entry, config);
        }
    }

    /// Place an entry already known to fit inside this node
    fn insert_contained(&mut self, entry: OctreeEntry, config: &OctreeConfig) {
        if self.is_leaf() {
            if self.entries.len() < config.max_entries_per_node || !self.can_subdivide(config) {
                self.entries.push(entry);
                return;
            }
            self.subdivide(config);
        }

        match self.child_for(&entry.region.enclosing_box()) {
            Some(index) => self.children[index].insert_contained(entry, config),
            None => self.entries.push(entry),
        }
    }

    fn remove(&mut self, handle: BodyHandle, config: &OctreeConfig) -> Option<OctreeEntry> {
        let removed = match self.entries.iter().position(|e| e.handle == handle) {
            Some(index) => self.entries.swap_remove(index),
            None => self
                .children
                .iter_mut()
                .find_map(|child| child.remove(handle, config))?,
        };

        if config.merge_on_remove {
            self.try_merge(config);
        }
        Some(removed)
    }

    /// Collapse the children into this node when the subtree is sparse
    fn try_merge(&mut self, config: &OctreeConfig) {
        if self.is_leaf() || self.count_entries() > config.max_entries_per_node {
            return;
        }

        log::trace!("Merging octree node at depth {}", self.depth);
        for mut child in mem::take(&mut self.children) {
            child.drain_into(&mut self.entries);
        }
    }

    fn drain_into(&mut self, out: &mut Vec<OctreeEntry>) {
        out.append(&mut self.entries);
        for child in &mut self.children {
            child.drain_into(out);
        }
        self.children.clear();
    }

    /// Refresh regions from the bodies and move entries to their new nodes
    ///
    /// Returns the entries that no longer fit this node; the caller places
    /// them at the nearest ancestor that still contains them.
    fn resort(&mut self, bodies: &BodyArena, config: &OctreeConfig, relocated: &mut usize) -> Vec<OctreeEntry> {
        let mut arrivals = Vec::new();
        for child in &mut self.children {
            arrivals.extend(child.resort(bodies, config, relocated));
        }

        let mut outgoing = Vec::new();
        for mut entry in mem::take(&mut self.entries) {
            let Some(body) = bodies.get(entry.handle) else {
                log::warn!("Dropping octree entry {:?}: body no longer exists", entry.handle);
                continue;
            };
            entry.region.update_from_transform(&body.transform());

            let bounds = entry.region.enclosing_box();
            if !self.bounds.contains_aabb(&bounds) {
                *relocated += 1;
                outgoing.push(entry);
            } else if let Some(index) = self.child_for(&bounds) {
                *relocated += 1;
                self.children[index].insert_contained(entry, config);
            } else {
                self.entries.push(entry);
            }
        }

        for entry in arrivals {
            if self.bounds.contains_aabb(&entry.region.enclosing_box()) {
                self.insert_contained(entry, config);
            } else {
                outgoing.push(entry);
            }
        }

        if config.merge_on_remove {
            self.try_merge(config);
        }
        outgoing
    }

    /// Intersecting pairs within this node and against every ancestor entry
    fn collect_overlaps(&self, ancestors: &mut Vec<OctreeEntry>, pairs: &mut Vec<(OctreeEntry, OctreeEntry)>) {
        for (i, a) in self.entries.iter().enumerate() {
            for b in &self.entries[i + 1..] {
                if a.region.intersects(&b.region) {
                    pairs.push((*a, *b));
                }
            }
            for ancestor in ancestors.iter() {
                if ancestor.region.intersects(&a.region) {
                    pairs.push((*ancestor, *a));
                }
            }
        }

        if self.is_leaf() {
            return;
        }

        let depth_mark = ancestors.len();
        ancestors.extend_from_slice(&self.entries);
        for child in &self.children {
            child.collect_overlaps(ancestors, pairs);
        }
        ancestors.truncate(depth_mark);
    }

    fn ray_nearest(&self, ray: &Ray, best: &mut Option<RayHit>) {
        let Some((node_tmin, _)) = ray.intersects_aabb(&self.bounds) else {
            return;
        };
        // Every region here lies inside the node, so none can be nearer than its entry point
        if matches!(best, Some(hit) if node_tmin.max(0.0) > hit.t) {
            return;
        }

        for entry in &self.entries {
            if let Some((tmin, _)) = ray.intersects_bounding_region(&entry.region) {
                let hit = RayHit {
                    handle: entry.handle,
                    region: entry.region,
                    t: tmin.max(0.0),
                };
                if best.as_ref().map_or(true, |current| hit.is_nearer_than(current)) {
                    *best = Some(hit);
                }
            }
        }

        for child in &self.children {
            child.ray_nearest(ray, best);
        }
    }

    fn ray_all(&self, ray: &Ray, hits: &mut Vec<RayHit>) {
        if ray.intersects_aabb(&self.bounds).is_none() {
            return;
        }

        hits.extend(self.entries.iter().filter_map(|entry| {
            ray.intersects_bounding_region(&entry.region).map(|(tmin, _)| RayHit {
                handle: entry.handle,
                region: entry.region,
                t: tmin.max(0.0),
            })
        }));

        for child in &self.children {
            child.ray_all(ray, hits);
        }
    }

    fn find(&self, handle: BodyHandle) -> Option<&OctreeEntry> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .or_else(|| self.children.iter().find_map(|child| child.find(handle)))
    }

    fn collect_handles(&self, out: &mut Vec<BodyHandle>) {
        out.extend(self.entries.iter().map(|e| e.handle));
        for child in &self.children {
            child.collect_handles(out);
        }
    }

    /// Get all leaf nodes (for visualization)
    pub fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a OctreeNode>) {
        if self.is_leaf() {
            leaves.push(self);
        } else {
            for child in &self.children {
                child.collect_leaves(leaves);
            }
        }
    }

    fn draw(&self, debug: &mut DebugDrawSystem) {
        // Shallow nodes red, deep nodes green
        let shade = 1.0 / (1.0 + self.depth as f32);
        debug.draw_aabb(&self.bounds, Vec4::new(shade, 1.0 - shade, 0.2, 1.0), 0.0);
        for child in &self.children {
            child.draw(debug);
        }
    }

    /// Count total entries in this node and all children
    pub fn count_entries(&self) -> usize {
        self.entries.len() + self.children.iter().map(OctreeNode::count_entries).sum::<usize>()
    }

    /// Count this node and all descendants
    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(OctreeNode::count_nodes).sum::<usize>()
    }

    /// Every entry fits its node and no child of that node
    #[cfg(test)]
    pub(crate) fn placement_is_valid(&self) -> bool {
        self.entries.iter().all(|entry| {
            let bounds = entry.region.enclosing_box();
            self.bounds.contains_aabb(&bounds) && self.child_for(&bounds).is_none()
        }) && self.children.iter().all(OctreeNode::placement_is_valid)
    }
}

/// Octree spatial partitioning structure over rigid-body handles
#[derive(Debug, Clone)]
pub struct Octree {
    root: OctreeNode,
    config: OctreeConfig,
    pending: Vec<PendingEntry>,
}

impl Octree {
    /// Create an empty octree over fixed world bounds
    pub fn new(world_bounds: Aabb, config: OctreeConfig) -> Self {
        log::debug!(
            "Created octree over {:?}..{:?} (capacity {}, max depth {})",
            world_bounds.min,
            world_bounds.max,
            config.max_entries_per_node,
            config.max_depth
        );
        Self {
            root: OctreeNode::new(world_bounds, 0),
            config,
            pending: Vec::new(),
        }
    }

    /// Root extent; the tree never grows past it
    pub fn bounds(&self) -> &Aabb {
        &self.root.bounds
    }

    /// Active configuration
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Root node, for traversal and visualization
    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Queue a body for insertion at the next [`Octree::process_pending`]
    ///
    /// `template` is the model-space region; it is posed by the body's
    /// transform when the queue drains.
    pub fn add_to_pending(&mut self, handle: BodyHandle, template: BoundingRegion) {
        self.pending.push(PendingEntry { handle, template });
    }

    /// Number of queued insertions
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain the pending queue into the tree
    ///
    /// Queued bodies that have since been removed from the arena, or were
    /// marked dead before placement, are dropped. Bodies that do not fit the
    /// root extent are marked dead instead of placed and listed in
    /// [`PendingReport::rejected`]; the rest of the queue is still placed.
    pub fn process_pending(&mut self, bodies: &mut BodyArena) -> PendingReport {
        let mut report = PendingReport::default();

        for PendingEntry { handle, mut template } in mem::take(&mut self.pending) {
            let Some(body) = bodies.get_mut(handle) else {
                log::debug!("Skipping pending body {:?}: already removed", handle);
                continue;
            };
            if body.is_dead() {
                continue;
            }

            template.update_from_transform(&body.transform());
            match self.insert(handle, template) {
                Ok(()) => {
                    body.set_lifecycle(Lifecycle::Active);
                    report.placed += 1;
                }
                Err(err) => {
                    log::error!("Rejected pending body {}: {}", body.instance_id(), err);
                    body.set_lifecycle(Lifecycle::Dead);
                    report.rejected.push(handle);
                }
            }
        }
        report
    }

    /// Place a world-space region directly
    pub fn insert(&mut self, handle: BodyHandle, region: BoundingRegion) -> Result<(), OctreeError> {
        if !self.root.bounds.contains_aabb(&region.enclosing_box()) {
            return Err(OctreeError::OutOfBounds { handle });
        }

        self.root.insert_contained(OctreeEntry { handle, region }, &self.config);
        Ok(())
    }

    /// Remove a body from the tree or the pending queue
    pub fn remove(&mut self, handle: BodyHandle) -> Option<OctreeEntry> {
        if let Some(index) = self.pending.iter().position(|p| p.handle == handle) {
            let pending = self.pending.remove(index);
            return Some(OctreeEntry {
                handle,
                region: pending.template,
            });
        }
        self.root.remove(handle, &self.config)
    }

    /// Whether the body is resident in the tree
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.find(handle).is_some()
    }

    /// The resident entry for a body
    pub fn find(&self, handle: BodyHandle) -> Option<&OctreeEntry> {
        self.root.find(handle)
    }

    /// Advance every resident body, re-sort the tree, then resolve contacts
    ///
    /// Dynamic bodies are integrated by `dt`; static and dead bodies only
    /// let their collision cooldown run. Entries whose region leaves the
    /// root extent are removed and listed in [`UpdateReport::escaped`].
    pub fn update(&mut self, bodies: &mut BodyArena, dt: f32, debug: &mut DebugDrawSystem) -> UpdateReport {
        let mut report = UpdateReport::default();

        let mut handles = Vec::with_capacity(self.root.count_entries());
        self.root.collect_handles(&mut handles);
        for handle in handles {
            let Some(body) = bodies.get_mut(handle) else {
                continue;
            };
            if body.is_dynamic() && !body.is_dead() {
                body.update(dt);
                report.integrated += 1;
            } else {
                body.hold(dt);
            }
        }

        let escaped = self.root.resort(bodies, &self.config, &mut report.relocated);
        for entry in escaped {
            log::debug!("Body {:?} left the octree root extent", entry.handle);
            report.escaped.push(entry.handle);
        }

        let mut pairs = Vec::new();
        self.root.collect_overlaps(&mut Vec::new(), &mut pairs);
        report.overlapping_pairs = pairs.len();

        for (a, b) in pairs {
            let Some(normal) = a.region.contact_normal(&b.region) else {
                log::trace!("No contact normal between {:?} and {:?}", a.handle, b.handle);
                continue;
            };
            let Some([first, second]) = bodies.get_disjoint_mut([a.handle, b.handle]) else {
                continue;
            };
            if first.is_dead() || second.is_dead() {
                continue;
            }

            if first.handle_collision(second.instance_id(), &normal) {
                report.resolved_collisions += 1;
            }
            if second.handle_collision(first.instance_id(), &-normal) {
                report.resolved_collisions += 1;
            }
        }

        self.root.draw(debug);
        report
    }

    /// Nearest region hit by the ray
    ///
    /// The result is the globally minimal entry distance; ties go to the
    /// lower handle so traversal order never changes the answer.
    pub fn check_collisions_ray(&self, ray: &Ray) -> Option<RayHit> {
        let mut best = None;
        self.root.ray_nearest(ray, &mut best);
        best
    }

    /// Every region hit by the ray, nearest first
    pub fn ray_candidates(&self, ray: &Ray) -> Vec<RayHit> {
        let mut hits = Vec::new();
        self.root.ray_all(ray, &mut hits);
        hits.sort_by(|a, b| a.t.total_cmp(&b.t).then(a.handle.cmp(&b.handle)));
        hits
    }

    /// Get all leaf nodes (for visualization)
    pub fn leaves(&self) -> Vec<&OctreeNode> {
        let mut leaves = Vec::new();
        self.root.collect_leaves(&mut leaves);
        leaves
    }

    /// Total resident entries
    pub fn entry_count(&self) -> usize {
        self.root.count_entries()
    }

    /// Total nodes including the root
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    /// Release every node and drop the pending queue
    pub fn destroy(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.pending.clear();
    }
}
