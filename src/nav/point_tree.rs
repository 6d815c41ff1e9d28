//! Point index over grid cells: a 2-d tree stored in a flat node arena.
//!
//! Both spatial indices sit on top of this structure. It supports:
//!
//! - **Incremental insert:** amortized O(log n). The agent index feeds points
//!   one per tick, the obstacle index adds the occasional new cell. An insert
//!   that lands deeper than `log_{10/7}(n)` rebuilds the subtree under its
//!   lowest ancestor whose larger child holds over 7/10 of its points
//!   (scapegoat rebalancing), so sorted input cannot degrade into a list.
//! - **Bulk build:** median split, balanced. Used by full rebuilds.
//! - **Nearest visit:** best-first traversal that yields points in
//!   non-decreasing distance under a chosen [`Metric`]. Consumers stop pulling
//!   whenever they have enough, so filtering stale entries costs nothing extra.
//! - **Range visit:** every point inside an inclusive [`CellRect`].
//!
//! There is no removal. Callers tombstone entries and rebuild.
//!
//! # Ordering invariant
//!
//! For a node splitting on axis `a` with key `v`, every point in the low
//! subtree has `p.a <= v` and every point in the high subtree has `p.a >= v`.
//! Inserts go low only when strictly less, bulk build may put equal keys on
//! either side, so searches treat both halves as touching the split line.

use smallvec::SmallVec;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::nav::coord::{Axis, CellRect, Coord, Metric};

type NodeId = u32;

/// Weight balance ratio `NUM / DEN` tolerated before a subtree is rebuilt.
const BALANCE_NUM: u64 = 7;
const BALANCE_DEN: u64 = 10;

#[derive(Debug, Clone)]
struct Node<T> {
    coord: Coord,
    item: T,
    axis: Axis,
    low: Option<NodeId>,
    high: Option<NodeId>,
    /// Points in the subtree rooted here, this one included.
    size: u32,
}

/// Insert rejected because the point lies outside the tree's hard limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds(pub Coord);

/// A point yielded by [`PointTree::nearest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor<T> {
    pub coord: Coord,
    pub item: T,
    /// Distance from the query origin in metric units.
    pub distance: u64,
}

#[derive(Debug, Clone)]
pub struct PointTree<T> {
    nodes: Vec<Node<T>>,
    limits: Option<CellRect>,
    extent: Option<CellRect>,
}

impl<T> Default for PointTree<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            limits: None,
            extent: None,
        }
    }
}

impl<T: Copy> PointTree<T> {
    /// Unbounded tree: any coordinate may be inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree that rejects points outside `limits`.
    pub fn with_limits(limits: CellRect, capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            limits: Some(limits),
            extent: None,
        }
    }

    /// Balanced tree over `entries`. Entries outside `limits` are dropped.
    pub fn build(limits: Option<CellRect>, mut entries: Vec<(Coord, T)>) -> Self {
        if let Some(limits) = limits {
            entries.retain(|(c, _)| limits.contains(*c));
        }
        let mut tree = Self {
            nodes: Vec::with_capacity(entries.len()),
            limits,
            extent: None,
        };
        for (c, _) in &entries {
            tree.grow_extent(*c);
        }
        tree.build_subtree(&mut entries, Axis::X, None, &mut Vec::new());
        tree
    }

    /// Median-split build of `entries`. The subtree root goes into `slot` when
    /// given; other nodes take ids from `spare` before growing the arena.
    fn build_subtree(
        &mut self,
        entries: &mut [(Coord, T)],
        axis: Axis,
        slot: Option<NodeId>,
        spare: &mut Vec<NodeId>,
    ) -> Option<NodeId> {
        if entries.is_empty() {
            return None;
        }
        let mid = entries.len() / 2;
        entries.select_nth_unstable_by_key(mid, |(c, _)| c.axis(axis));
        let (coord, item) = entries[mid];

        let node = Node {
            coord,
            item,
            axis,
            low: None,
            high: None,
            size: entries.len() as u32,
        };
        let id = match slot.or_else(|| spare.pop()) {
            Some(id) => {
                self.nodes[id as usize] = node;
                id
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as NodeId
            }
        };

        let (low, rest) = entries.split_at_mut(mid);
        let high = &mut rest[1..];
        let low_id = self.build_subtree(low, axis.next(), None, spare);
        let high_id = self.build_subtree(high, axis.next(), None, spare);
        let node = &mut self.nodes[id as usize];
        node.low = low_id;
        node.high = high_id;
        Some(id)
    }

    /// Rebuilds the subtree under `root` balanced, reusing its node ids.
    /// `root` keeps its id, so the parent link stays valid.
    fn rebuild_subtree(&mut self, root: NodeId) {
        let count = self.nodes[root as usize].size as usize;
        let axis = self.nodes[root as usize].axis;
        let mut entries = Vec::with_capacity(count);
        let mut spare = Vec::with_capacity(count);
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            entries.push((node.coord, node.item));
            if id != root {
                spare.push(id);
            }
            stack.extend(node.low);
            stack.extend(node.high);
        }
        self.build_subtree(&mut entries, axis, Some(root), &mut spare);
    }

    /// Deepest insert path, in edges, tolerated for the current size.
    fn depth_budget(&self) -> usize {
        let ratio = BALANCE_DEN as f64 / BALANCE_NUM as f64;
        ((self.nodes.len() as f64).ln() / ratio.ln()) as usize
    }

    /// Lowest ancestor on `path` whose child toward `leaf` is too heavy.
    fn find_scapegoat(&self, path: &[NodeId], leaf: NodeId) -> Option<NodeId> {
        let mut child_size = u64::from(self.nodes[leaf as usize].size);
        for &ancestor in path.iter().rev() {
            let size = u64::from(self.nodes[ancestor as usize].size);
            if child_size * BALANCE_DEN > size * BALANCE_NUM {
                return Some(ancestor);
            }
            child_size = size;
        }
        None
    }

    /// Nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut stack: SmallVec<[(NodeId, usize); 32]> = SmallVec::new();
        stack.push((0, 1));
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let node = &self.nodes[id as usize];
            for child in [node.low, node.high].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        deepest
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Hard limits, if any.
    pub fn limits(&self) -> Option<CellRect> {
        self.limits
    }

    /// Tight bounding box of the inserted points.
    pub fn extent(&self) -> Option<CellRect> {
        self.extent
    }

    /// True when an insert at `c` would be accepted.
    pub fn accepts(&self, c: Coord) -> bool {
        self.limits.map_or(true, |limits| limits.contains(c))
    }

    /// Drops all points but keeps the allocation and the limits.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.extent = None;
    }

    pub fn insert(&mut self, coord: Coord, item: T) -> Result<(), OutOfBounds> {
        if !self.accepts(coord) {
            return Err(OutOfBounds(coord));
        }
        self.grow_extent(coord);

        let id = self.nodes.len() as NodeId;
        let mut path: SmallVec<[NodeId; 48]> = SmallVec::new();
        let mut axis = Axis::X;
        if !self.nodes.is_empty() {
            let mut current: NodeId = 0;
            loop {
                path.push(current);
                let node = &mut self.nodes[current as usize];
                node.size += 1;
                let go_low = coord.axis(node.axis) < node.coord.axis(node.axis);
                let next = if go_low { node.low } else { node.high };
                match next {
                    Some(child) => current = child,
                    None => {
                        if go_low {
                            node.low = Some(id);
                        } else {
                            node.high = Some(id);
                        }
                        axis = node.axis.next();
                        break;
                    }
                }
            }
        }
        self.nodes.push(Node {
            coord,
            item,
            axis,
            low: None,
            high: None,
            size: 1,
        });

        if path.len() > self.depth_budget() {
            if let Some(scapegoat) = self.find_scapegoat(&path, id) {
                self.rebuild_subtree(scapegoat);
            }
        }
        Ok(())
    }

    fn grow_extent(&mut self, c: Coord) {
        match &mut self.extent {
            Some(extent) => extent.include(c),
            None => self.extent = Some(CellRect::point(c)),
        }
    }

    /// Points ordered by non-decreasing distance from `origin`, stopping past
    /// `limit` (in metric units, see [`Metric::limit`]).
    pub fn nearest(&self, origin: Coord, metric: Metric, limit: u64) -> Nearest<'_, T> {
        let mut queue = BinaryHeap::new();
        if let Some(extent) = self.extent {
            let distance = metric.distance_to_rect(origin, &extent);
            if distance <= limit && !self.nodes.is_empty() {
                queue.push(Reverse(Pending {
                    distance,
                    kind: PendingKind::Subtree(extent),
                    node: 0,
                }));
            }
        }
        Nearest {
            tree: self,
            origin,
            metric,
            limit,
            queue,
        }
    }

    /// Calls `visit` for every point inside `rect`.
    pub fn for_each_in_range(&self, rect: CellRect, mut visit: impl FnMut(Coord, T)) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(0);
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if rect.contains(node.coord) {
                visit(node.coord, node.item);
            }
            let split = node.coord.axis(node.axis);
            if let Some(low) = node.low {
                if rect.min.axis(node.axis) <= split {
                    stack.push(low);
                }
            }
            if let Some(high) = node.high {
                if rect.max.axis(node.axis) >= split {
                    stack.push(high);
                }
            }
        }
    }

    pub fn in_range(&self, rect: CellRect) -> Vec<(Coord, T)> {
        let mut out = Vec::new();
        self.for_each_in_range(rect, |c, item| out.push((c, item)));
        out
    }

    pub fn contains(&self, c: Coord) -> bool {
        let mut found = false;
        self.for_each_in_range(CellRect::point(c), |_, _| found = true);
        found
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, T)> + '_ {
        self.nodes.iter().map(|n| (n.coord, n.item))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    /// Exact distance to the node's own point.
    Point,
    /// Lower bound for the subtree rooted at the node, covering this rect.
    Subtree(CellRect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    distance: u64,
    kind: PendingKind,
    node: NodeId,
}

impl Pending {
    fn rank(&self) -> u8 {
        match self.kind {
            PendingKind::Point => 0,
            PendingKind::Subtree(_) => 1,
        }
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Points before subtrees at equal distance, then arena order for determinism.
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Iterator returned by [`PointTree::nearest`].
pub struct Nearest<'a, T> {
    tree: &'a PointTree<T>,
    origin: Coord,
    metric: Metric,
    limit: u64,
    queue: BinaryHeap<Reverse<Pending>>,
}

impl<T: Copy> Iterator for Nearest<'_, T> {
    type Item = Neighbor<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some(Reverse(pending)) = self.queue.pop() {
            let node = &tree.nodes[pending.node as usize];
            let rect = match pending.kind {
                PendingKind::Point => {
                    return Some(Neighbor {
                        coord: node.coord,
                        item: node.item,
                        distance: pending.distance,
                    });
                }
                PendingKind::Subtree(rect) => rect,
            };

            let distance = self.metric.distance(self.origin, node.coord);
            if distance <= self.limit {
                self.queue.push(Reverse(Pending {
                    distance,
                    kind: PendingKind::Point,
                    node: pending.node,
                }));
            }

            let (low_rect, high_rect) = rect.split(node.axis, node.coord.axis(node.axis));
            for (child, child_rect) in [(node.low, low_rect), (node.high, high_rect)] {
                let Some(child) = child else { continue };
                let bound = self.metric.distance_to_rect(self.origin, &child_rect);
                if bound <= self.limit {
                    self.queue.push(Reverse(Pending {
                        distance: bound,
                        kind: PendingKind::Subtree(child_rect),
                        node: child,
                    }));
                }
            }
        }
        None
    }
}
