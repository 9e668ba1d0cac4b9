use crate::piece::Piece;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// Shared leaf / "no parent" node. Always black, never carries a piece.
pub(crate) const SENTINEL: NodeId = NodeId(0);

/// Parent marker of a node that has been removed from the tree.
const DETACHED: NodeId = NodeId(usize::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeColor {
    Red,
    Black,
}

#[derive(Debug, Clone)]
pub(crate) struct TreeNode {
    piece: Piece,
    color: NodeColor,
    parent: NodeId,
    left: NodeId,
    right: NodeId,
    /// Total piece length of the left subtree.
    size_left: usize,
    /// Total line feed count of the left subtree.
    lf_left: usize,
}

impl TreeNode {
    fn new(piece: Piece, color: NodeColor) -> Self {
        Self {
            piece,
            color,
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            size_left: 0,
            lf_left: 0,
        }
    }
}

fn add_signed(value: usize, delta: isize) -> usize {
    let result = value.checked_add_signed(delta);
    debug_assert!(result.is_some(), "aggregate underflow: {value} + {delta}");
    result.unwrap_or(0)
}

/// Red-black tree of pieces ordered by document position.
///
/// Nodes live in an arena; [`SENTINEL`] (slot 0) plays the role of every
/// leaf and of the root's parent. Freed slots are recycled.
#[derive(Debug, Clone)]
pub(crate) struct RbTree {
    nodes: Vec<TreeNode>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Default for RbTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RbTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![TreeNode::new(Piece::default(), NodeColor::Black)],
            free: Vec::new(),
            root: SENTINEL,
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root == SENTINEL
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    pub(crate) fn piece(&self, id: NodeId) -> &Piece {
        &self.nodes[id.0].piece
    }

    /// Swap in a new piece without touching the aggregates.
    /// Callers follow up with [`RbTree::update_metadata`].
    pub(crate) fn set_piece(&mut self, id: NodeId, piece: Piece) {
        debug_assert!(id != SENTINEL);
        self.nodes[id.0].piece = piece;
    }

    pub(crate) fn size_left(&self, id: NodeId) -> usize {
        self.nodes[id.0].size_left
    }

    pub(crate) fn lf_left(&self, id: NodeId) -> usize {
        self.nodes[id.0].lf_left
    }

    pub(crate) fn left(&self, id: NodeId) -> NodeId {
        self.nodes[id.0].left
    }

    pub(crate) fn right(&self, id: NodeId) -> NodeId {
        self.nodes[id.0].right
    }

    pub(crate) fn parent(&self, id: NodeId) -> NodeId {
        self.nodes[id.0].parent
    }

    fn color(&self, id: NodeId) -> NodeColor {
        self.nodes[id.0].color
    }

    fn set_color(&mut self, id: NodeId, color: NodeColor) {
        self.nodes[id.0].color = color;
    }

    fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        self.nodes[id.0].parent = parent;
    }

    fn set_left(&mut self, id: NodeId, left: NodeId) {
        self.nodes[id.0].left = left;
    }

    fn set_right(&mut self, id: NodeId, right: NodeId) {
        self.nodes[id.0].right = right;
    }

    /// `false` once a node has been deleted from the tree.
    pub(crate) fn is_attached(&self, id: NodeId) -> bool {
        id != SENTINEL && self.nodes.get(id.0).is_some_and(|n| n.parent != DETACHED)
    }

    fn alloc(&mut self, piece: Piece) -> NodeId {
        let node = TreeNode::new(piece, NodeColor::Red);
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        node.parent = DETACHED;
        node.left = SENTINEL;
        node.right = SENTINEL;
        self.free.push(id);
    }

    fn reset_sentinel(&mut self) {
        let sentinel = &mut self.nodes[SENTINEL.0];
        sentinel.parent = SENTINEL;
        sentinel.left = SENTINEL;
        sentinel.right = SENTINEL;
        sentinel.color = NodeColor::Black;
        sentinel.size_left = 0;
        sentinel.lf_left = 0;
    }

    pub(crate) fn leftmost(&self, mut x: NodeId) -> NodeId {
        while self.left(x) != SENTINEL {
            x = self.left(x);
        }
        x
    }

    pub(crate) fn rightmost(&self, mut x: NodeId) -> NodeId {
        while self.right(x) != SENTINEL {
            x = self.right(x);
        }
        x
    }

    /// In-order successor, or [`SENTINEL`] for the last node.
    pub(crate) fn next(&self, node: NodeId) -> NodeId {
        if node == SENTINEL {
            return SENTINEL;
        }
        if self.right(node) != SENTINEL {
            return self.leftmost(self.right(node));
        }
        let mut x = node;
        while self.parent(x) != SENTINEL {
            if self.left(self.parent(x)) == x {
                break;
            }
            x = self.parent(x);
        }
        self.parent(x)
    }

    /// In-order predecessor, or [`SENTINEL`] for the first node.
    pub(crate) fn prev(&self, node: NodeId) -> NodeId {
        if node == SENTINEL {
            return SENTINEL;
        }
        if self.left(node) != SENTINEL {
            return self.rightmost(self.left(node));
        }
        let mut x = node;
        while self.parent(x) != SENTINEL {
            if self.right(self.parent(x)) == x {
                break;
            }
            x = self.parent(x);
        }
        self.parent(x)
    }

    /// Total length of the subtree rooted at `x`.
    fn calculate_size(&self, mut x: NodeId) -> usize {
        let mut size = 0;
        while x != SENTINEL {
            let node = &self.nodes[x.0];
            size += node.size_left + node.piece.length;
            x = node.right;
        }
        size
    }

    /// Total line feed count of the subtree rooted at `x`.
    fn calculate_lf(&self, mut x: NodeId) -> usize {
        let mut lf = 0;
        while x != SENTINEL {
            let node = &self.nodes[x.0];
            lf += node.lf_left + node.piece.line_feed_cnt;
            x = node.right;
        }
        lf
    }

    /// Document offset at which `node` starts.
    pub(crate) fn offset_of(&self, node: NodeId) -> usize {
        if node == SENTINEL {
            return 0;
        }
        let mut pos = self.size_left(node);
        let mut x = node;
        while x != self.root {
            let parent = self.parent(x);
            if self.right(parent) == x {
                pos += self.size_left(parent) + self.piece(parent).length;
            }
            x = parent;
        }
        pos
    }

    fn left_rotate(&mut self, x: NodeId) {
        let y = self.right(x);

        let (x_size_left, x_lf_left, x_len, x_lf) = {
            let xn = &self.nodes[x.0];
            (xn.size_left, xn.lf_left, xn.piece.length, xn.piece.line_feed_cnt)
        };
        // y adopts x and x's left subtree on its left side
        {
            let yn = &mut self.nodes[y.0];
            yn.size_left += x_size_left + x_len;
            yn.lf_left += x_lf_left + x_lf;
        }

        let y_left = self.left(y);
        self.set_right(x, y_left);
        if y_left != SENTINEL {
            self.set_parent(y_left, x);
        }

        let x_parent = self.parent(x);
        self.set_parent(y, x_parent);
        if x_parent == SENTINEL {
            self.root = y;
        } else if self.left(x_parent) == x {
            self.set_left(x_parent, y);
        } else {
            self.set_right(x_parent, y);
        }

        self.set_left(y, x);
        self.set_parent(x, y);
    }

    fn right_rotate(&mut self, y: NodeId) {
        let x = self.left(y);

        let x_right = self.right(x);
        self.set_left(y, x_right);
        if x_right != SENTINEL {
            self.set_parent(x_right, y);
        }

        let y_parent = self.parent(y);
        self.set_parent(x, y_parent);

        // y loses x and x's left subtree
        let (x_size_left, x_lf_left, x_len, x_lf) = {
            let xn = &self.nodes[x.0];
            (xn.size_left, xn.lf_left, xn.piece.length, xn.piece.line_feed_cnt)
        };
        {
            let yn = &mut self.nodes[y.0];
            yn.size_left -= x_size_left + x_len;
            yn.lf_left -= x_lf_left + x_lf;
        }

        if y_parent == SENTINEL {
            self.root = x;
        } else if self.right(y_parent) == y {
            self.set_right(y_parent, x);
        } else {
            self.set_left(y_parent, x);
        }

        self.set_right(x, y);
        self.set_parent(y, x);
    }

    /// Insert `piece` immediately after `node` in document order.
    ///
    /// On an empty tree `node` is ignored. A [`SENTINEL`] `node` on a
    /// non-empty tree appends after the last piece.
    pub(crate) fn insert_right(&mut self, node: NodeId, piece: Piece) -> NodeId {
        let z = self.alloc(piece);

        if self.root == SENTINEL {
            self.root = z;
            self.set_color(z, NodeColor::Black);
        } else {
            let node = if node == SENTINEL {
                self.rightmost(self.root)
            } else {
                node
            };
            if self.right(node) == SENTINEL {
                self.set_right(node, z);
                self.set_parent(z, node);
            } else {
                let next = self.leftmost(self.right(node));
                self.set_left(next, z);
                self.set_parent(z, next);
            }
        }

        self.fix_insert(z);
        z
    }

    /// Insert `piece` immediately before `node` in document order.
    ///
    /// A [`SENTINEL`] `node` on a non-empty tree prepends before the first piece.
    pub(crate) fn insert_left(&mut self, node: NodeId, piece: Piece) -> NodeId {
        let z = self.alloc(piece);

        if self.root == SENTINEL {
            self.root = z;
            self.set_color(z, NodeColor::Black);
        } else {
            let node = if node == SENTINEL {
                self.leftmost(self.root)
            } else {
                node
            };
            if self.left(node) == SENTINEL {
                self.set_left(node, z);
                self.set_parent(z, node);
            } else {
                let prev = self.rightmost(self.left(node));
                self.set_right(prev, z);
                self.set_parent(z, prev);
            }
        }

        self.fix_insert(z);
        z
    }

    fn fix_insert(&mut self, mut x: NodeId) {
        self.recompute_metadata(x);

        while x != self.root && self.color(self.parent(x)) == NodeColor::Red {
            let parent = self.parent(x);
            let grand = self.parent(parent);
            if parent == self.left(grand) {
                let uncle = self.right(grand);
                if self.color(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    x = grand;
                } else {
                    if x == self.right(parent) {
                        x = parent;
                        self.left_rotate(x);
                    }
                    let parent = self.parent(x);
                    let grand = self.parent(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    self.right_rotate(grand);
                }
            } else {
                let uncle = self.left(grand);
                if self.color(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    x = grand;
                } else {
                    if x == self.left(parent) {
                        x = parent;
                        self.right_rotate(x);
                    }
                    let parent = self.parent(x);
                    let grand = self.parent(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    self.left_rotate(grand);
                }
            }
        }

        let root = self.root;
        self.set_color(root, NodeColor::Black);
    }

    /// Unlink `z` and release its slot.
    pub(crate) fn delete(&mut self, z: NodeId) {
        debug_assert!(self.is_attached(z), "deleting a detached node");

        let (x, y) = if self.left(z) == SENTINEL {
            (self.right(z), z)
        } else if self.right(z) == SENTINEL {
            (self.left(z), z)
        } else {
            let y = self.leftmost(self.right(z));
            (self.right(y), y)
        };

        if y == self.root {
            self.root = x;
            // x may be the sentinel when the only node goes away
            self.set_color(x, NodeColor::Black);
            self.detach(z);
            self.reset_sentinel();
            let root = self.root;
            if root != SENTINEL {
                self.set_parent(root, SENTINEL);
            }
            return;
        }

        let y_was_red = self.color(y) == NodeColor::Red;

        let y_parent = self.parent(y);
        if y == self.left(y_parent) {
            self.set_left(y_parent, x);
        } else {
            self.set_right(y_parent, x);
        }

        if y == z {
            self.set_parent(x, y_parent);
            self.recompute_metadata(x);
        } else {
            if y_parent == z {
                self.set_parent(x, y);
            } else {
                self.set_parent(x, y_parent);
            }

            // x's ancestry changed; fix the aggregates below z first
            self.recompute_metadata(x);

            let (z_left, z_right, z_parent, z_color, z_size_left, z_lf_left) = {
                let zn = &self.nodes[z.0];
                (zn.left, zn.right, zn.parent, zn.color, zn.size_left, zn.lf_left)
            };
            {
                let yn = &mut self.nodes[y.0];
                yn.left = z_left;
                yn.right = z_right;
                yn.parent = z_parent;
                yn.color = z_color;
            }

            if z == self.root {
                self.root = y;
            } else if z == self.left(z_parent) {
                self.set_left(z_parent, y);
            } else {
                self.set_right(z_parent, y);
            }

            if self.left(y) != SENTINEL {
                let l = self.left(y);
                self.set_parent(l, y);
            }
            if self.right(y) != SENTINEL {
                let r = self.right(y);
                self.set_parent(r, y);
            }

            // y takes z's place, so it also takes z's left aggregate
            self.nodes[y.0].size_left = z_size_left;
            self.nodes[y.0].lf_left = z_lf_left;
            self.recompute_metadata(y);
        }

        self.detach(z);

        let x_parent = self.parent(x);
        if self.left(x_parent) == x {
            let new_size_left = self.calculate_size(x);
            let new_lf_left = self.calculate_lf(x);
            let (old_size_left, old_lf_left) = (self.size_left(x_parent), self.lf_left(x_parent));
            if new_size_left != old_size_left || new_lf_left != old_lf_left {
                let delta = new_size_left as isize - old_size_left as isize;
                let lf_delta = new_lf_left as isize - old_lf_left as isize;
                self.nodes[x_parent.0].size_left = new_size_left;
                self.nodes[x_parent.0].lf_left = new_lf_left;
                self.update_metadata(x_parent, delta, lf_delta);
            }
        }

        self.recompute_metadata(x_parent);

        if y_was_red {
            self.reset_sentinel();
            return;
        }

        self.fix_delete(x);
        self.reset_sentinel();
    }

    fn fix_delete(&mut self, mut x: NodeId) {
        while x != self.root && self.color(x) == NodeColor::Black {
            let parent = self.parent(x);
            if x == self.left(parent) {
                let mut w = self.right(parent);
                if self.color(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.left_rotate(parent);
                    w = self.right(self.parent(x));
                }
                if self.color(self.left(w)) == NodeColor::Black
                    && self.color(self.right(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.right(w)) == NodeColor::Black {
                        let wl = self.left(w);
                        self.set_color(wl, NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.right_rotate(w);
                        w = self.right(self.parent(x));
                    }
                    let parent = self.parent(x);
                    self.set_color(w, self.color(parent));
                    self.set_color(parent, NodeColor::Black);
                    let wr = self.right(w);
                    self.set_color(wr, NodeColor::Black);
                    self.left_rotate(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.left(parent);
                if self.color(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.right_rotate(parent);
                    w = self.left(self.parent(x));
                }
                if self.color(self.left(w)) == NodeColor::Black
                    && self.color(self.right(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.left(w)) == NodeColor::Black {
                        let wr = self.right(w);
                        self.set_color(wr, NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.left_rotate(w);
                        w = self.left(self.parent(x));
                    }
                    let parent = self.parent(x);
                    self.set_color(w, self.color(parent));
                    self.set_color(parent, NodeColor::Black);
                    let wl = self.left(w);
                    self.set_color(wl, NodeColor::Black);
                    self.right_rotate(parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, NodeColor::Black);
    }

    /// Propagate a length / line feed change of `x`'s piece to its ancestors.
    pub(crate) fn update_metadata(&mut self, mut x: NodeId, delta: isize, lf_delta: isize) {
        while x != self.root && x != SENTINEL {
            let parent = self.parent(x);
            if self.left(parent) == x {
                let pn = &mut self.nodes[parent.0];
                pn.size_left = add_signed(pn.size_left, delta);
                pn.lf_left = add_signed(pn.lf_left, lf_delta);
            }
            x = parent;
        }
    }

    /// Recount the aggregates invalidated by a shape change at `x`.
    pub(crate) fn recompute_metadata(&mut self, mut x: NodeId) {
        if x == self.root {
            return;
        }

        // climb to the first ancestor whose left subtree contains x
        while x != self.root && x == self.right(self.parent(x)) {
            x = self.parent(x);
        }
        if x == self.root {
            // x was appended at the very end
            return;
        }

        x = self.parent(x);
        let left = self.left(x);
        let delta = self.calculate_size(left) as isize - self.size_left(x) as isize;
        let lf_delta = self.calculate_lf(left) as isize - self.lf_left(x) as isize;
        {
            let xn = &mut self.nodes[x.0];
            xn.size_left = add_signed(xn.size_left, delta);
            xn.lf_left = add_signed(xn.lf_left, lf_delta);
        }

        while x != self.root && (delta != 0 || lf_delta != 0) {
            let parent = self.parent(x);
            if self.left(parent) == x {
                let pn = &mut self.nodes[parent.0];
                pn.size_left = add_signed(pn.size_left, delta);
                pn.lf_left = add_signed(pn.lf_left, lf_delta);
            }
            x = parent;
        }
    }

    pub(crate) fn iter(&self) -> InOrder<'_> {
        InOrder {
            tree: self,
            stack: Vec::new(),
            current: self.root,
        }
    }

    /// Verify the red-black rules, parent links and both aggregates by full
    /// recomputation.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.root == SENTINEL {
            return Ok(());
        }
        if self.color(self.root) != NodeColor::Black {
            return Err("root is red".to_string());
        }
        if self.parent(self.root) != SENTINEL {
            return Err("root has a parent".to_string());
        }
        let sentinel = &self.nodes[SENTINEL.0];
        if sentinel.size_left != 0 || sentinel.lf_left != 0 || sentinel.color != NodeColor::Black {
            return Err("sentinel was modified".to_string());
        }
        self.check_subtree(self.root).map(|_| ())
    }

    /// Returns `(size, line feeds, black height)` of the subtree.
    fn check_subtree(&self, x: NodeId) -> Result<(usize, usize, usize), String> {
        if x == SENTINEL {
            return Ok((0, 0, 1));
        }
        let node = &self.nodes[x.0];
        for child in [node.left, node.right] {
            if child != SENTINEL && self.parent(child) != x {
                return Err(format!("broken parent link below {x:?}"));
            }
            if node.color == NodeColor::Red && self.color(child) == NodeColor::Red {
                return Err(format!("red node {x:?} has a red child"));
            }
        }

        let (left_size, left_lf, left_black) = self.check_subtree(node.left)?;
        let (right_size, right_lf, right_black) = self.check_subtree(node.right)?;

        if left_size != node.size_left {
            return Err(format!(
                "size_left of {x:?} is {} but the left subtree holds {left_size}",
                node.size_left
            ));
        }
        if left_lf != node.lf_left {
            return Err(format!(
                "lf_left of {x:?} is {} but the left subtree holds {left_lf}",
                node.lf_left
            ));
        }
        if left_black != right_black {
            return Err(format!("unequal black height below {x:?}"));
        }

        let black = left_black + usize::from(node.color == NodeColor::Black);
        Ok((
            left_size + node.piece.length + right_size,
            left_lf + node.piece.line_feed_cnt + right_lf,
            black,
        ))
    }
}

/// Explicit-stack in-order traversal.
pub(crate) struct InOrder<'a> {
    tree: &'a RbTree,
    stack: Vec<NodeId>,
    current: NodeId,
}

impl Iterator for InOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while self.current != SENTINEL {
            self.stack.push(self.current);
            self.current = self.tree.left(self.current);
        }
        let node = self.stack.pop()?;
        self.current = self.tree.right(node);
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::BufferCursor;

    fn piece(length: usize, lf: usize) -> Piece {
        Piece::new(1, BufferCursor::new(0, 0), BufferCursor::new(lf, 0), length, lf)
    }

    fn lengths(tree: &RbTree) -> Vec<usize> {
        tree.iter().map(|id| tree.piece(id).length).collect()
    }

    #[test]
    fn append_keeps_order_and_aggregates() {
        let mut tree = RbTree::new();
        let mut last = SENTINEL;
        for len in 1..=64 {
            last = tree.insert_right(last, piece(len, len % 3));
            tree.check_invariants().unwrap();
        }
        assert_eq!(lengths(&tree), (1..=64).collect::<Vec<_>>());
        assert_eq!(tree.node_count(), 64);
    }

    #[test]
    fn insert_left_prepends() {
        let mut tree = RbTree::new();
        let mut first = SENTINEL;
        for len in 1..=32 {
            first = tree.insert_left(first, piece(len, 0));
            tree.check_invariants().unwrap();
        }
        assert_eq!(lengths(&tree), (1..=32).rev().collect::<Vec<_>>());
    }

    #[test]
    fn next_and_prev_walk_in_order() {
        let mut tree = RbTree::new();
        let mut last = SENTINEL;
        let mut ids = Vec::new();
        for len in 1..=20 {
            last = tree.insert_right(last, piece(len, 0));
            ids.push(last);
        }
        for pair in ids.windows(2) {
            assert_eq!(tree.next(pair[0]), pair[1]);
            assert_eq!(tree.prev(pair[1]), pair[0]);
        }
        assert_eq!(tree.next(ids[19]), SENTINEL);
        assert_eq!(tree.prev(ids[0]), SENTINEL);
    }

    #[test]
    fn offset_of_sums_predecessors() {
        let mut tree = RbTree::new();
        let mut last = SENTINEL;
        let mut ids = Vec::new();
        for _ in 0..10 {
            last = tree.insert_right(last, piece(5, 1));
            ids.push(last);
        }
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(tree.offset_of(*id), i * 5);
        }
    }

    #[test]
    fn delete_every_other_then_all() {
        let mut tree = RbTree::new();
        let mut last = SENTINEL;
        let mut ids = Vec::new();
        for len in 1..=50 {
            last = tree.insert_right(last, piece(len, len % 2));
            ids.push(last);
        }
        for id in ids.iter().step_by(2) {
            tree.delete(*id);
            assert!(!tree.is_attached(*id));
            tree.check_invariants().unwrap();
        }
        assert_eq!(lengths(&tree), (2..=50).step_by(2).collect::<Vec<_>>());

        for id in ids.iter().skip(1).step_by(2) {
            tree.delete(*id);
            tree.check_invariants().unwrap();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut tree = RbTree::new();
        let a = tree.insert_right(SENTINEL, piece(1, 0));
        let b = tree.insert_right(a, piece(2, 0));
        tree.delete(a);
        let c = tree.insert_left(b, piece(3, 0));
        assert_eq!(c, a);
        assert!(tree.is_attached(c));
        assert_eq!(lengths(&tree), vec![3, 2]);
    }

    #[test]
    fn update_metadata_propagates_piece_growth() {
        let mut tree = RbTree::new();
        let mut last = SENTINEL;
        let mut ids = Vec::new();
        for _ in 0..15 {
            last = tree.insert_right(last, piece(4, 1));
            ids.push(last);
        }
        let target = ids[3];
        let mut grown = *tree.piece(target);
        grown.length += 6;
        grown.line_feed_cnt += 2;
        tree.set_piece(target, grown);
        tree.update_metadata(target, 6, 2);
        tree.check_invariants().unwrap();
        assert_eq!(tree.offset_of(ids[4]), 4 * 4 + 6);
    }
}
